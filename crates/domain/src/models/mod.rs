//! Domain models for Family Guard.

pub mod alert;
pub mod app_limit;
pub mod block;
pub mod block_attempt;
pub mod child;
pub mod pairing_code;
pub mod schedule_rule;
pub mod usage;

pub use alert::{TamperAlertRequest, TamperKind};
pub use app_limit::AppLimit;
pub use block::{AppStatus, BlockFlag, BlockReason};
pub use block_attempt::BlockAttemptLog;
pub use child::{Child, Parent};
pub use pairing_code::{PairingCode, PairingCodeRejection, PAIRING_CODE_TTL_SECS};
pub use schedule_rule::{RuleScope, ScheduleRule};
pub use usage::UsageRecord;
