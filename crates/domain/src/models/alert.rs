//! Tamper alerts raised by a child device.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Kind of tampering detected on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TamperKind {
    /// Device-admin protection was switched off.
    DeviceAdminDisabled,
    /// The usage-access permission was revoked.
    UsageAccessRevoked,
    /// Someone attempted to uninstall the monitor.
    UninstallAttempt,
}

impl TamperKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TamperKind::DeviceAdminDisabled => "device_admin_disabled",
            TamperKind::UsageAccessRevoked => "usage_access_revoked",
            TamperKind::UninstallAttempt => "uninstall_attempt",
        }
    }
}

impl std::fmt::Display for TamperKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TamperKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device_admin_disabled" => Ok(TamperKind::DeviceAdminDisabled),
            "usage_access_revoked" => Ok(TamperKind::UsageAccessRevoked),
            "uninstall_attempt" => Ok(TamperKind::UninstallAttempt),
            other => Err(format!("unknown tamper kind: {}", other)),
        }
    }
}

/// Tamper alert sent by a child device.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TamperAlertRequest {
    pub kind: TamperKind,
    #[validate(length(max = 500, message = "detail must be at most 500 characters"))]
    pub detail: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Response to a tamper alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TamperAlertResponse {
    pub notified: bool,
}
