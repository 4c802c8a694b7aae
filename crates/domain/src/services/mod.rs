//! Domain services for Family Guard.
//!
//! Services contain business logic that operates on domain models.

pub mod enforcement;
pub mod notification;
pub mod pairing;
pub mod schedule;

pub use enforcement::{evaluate_block, ForegroundAction, ForegroundTracker};

pub use notification::{
    BlockedAppAttemptPayload, MockNotificationService, NotificationResult, NotificationService,
    NotificationType, PushMessage, TamperAlertPayload,
};

pub use pairing::{InsertOutcome, PairingCodeStore, PairingError, PairingService};

pub use schedule::{is_blocked_by_schedule, matching_rule, time_of_day_ms};
