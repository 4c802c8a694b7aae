//! Repository implementations for database operations.

pub mod activity;
pub mod controls;
pub mod pairing_code;
pub mod parent;

pub use activity::{BlockAttemptRepository, UsageRepository, UsageUpsert};
pub use controls::{
    AppLimitRepository, BlockFlagRepository, ScheduleRuleInput, ScheduleRuleRepository,
};
pub use pairing_code::{LinkDeviceInput, LinkOutcome, PairingCodeRepository};
pub use parent::{ChildRepository, ParentRepository};
