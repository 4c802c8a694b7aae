//! Database entity definitions.

pub mod activity;
pub mod controls;
pub mod pairing_code;
pub mod parent;

pub use activity::{BlockAttemptLogEntity, DailyUsageRowEntity, UsageRecordEntity};
pub use controls::{AppLimitEntity, AppStatusEntity, BlockFlagEntity, ScheduleRuleEntity};
pub use pairing_code::PairingCodeEntity;
pub use parent::{ChildEntity, ParentEntity};
