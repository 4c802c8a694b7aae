//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// Milliseconds in one day; the exclusive upper bound for a time of day.
pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Number of digits in a pairing code.
pub const PAIRING_CODE_DIGITS: usize = 6;

/// Maximum length of an application package identifier.
const MAX_PACKAGE_NAME_LENGTH: usize = 255;

lazy_static! {
    /// Java-style package identifier: dot separated segments starting with a letter.
    static ref PACKAGE_NAME_RE: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)*$").unwrap();
}

/// Validates an application package identifier such as `com.example.app`.
pub fn validate_package_name(package_name: &str) -> Result<(), ValidationError> {
    if package_name.is_empty() || package_name.len() > MAX_PACKAGE_NAME_LENGTH {
        let mut err = ValidationError::new("package_name_length");
        err.message = Some("Package name must be between 1 and 255 characters".into());
        return Err(err);
    }

    if !PACKAGE_NAME_RE.is_match(package_name) {
        let mut err = ValidationError::new("package_name_format");
        err.message = Some("Package name has an invalid format".into());
        return Err(err);
    }

    Ok(())
}

/// Validates a pairing code: exactly six ASCII digits.
pub fn validate_pairing_code(code: &str) -> Result<(), ValidationError> {
    if code.len() == PAIRING_CODE_DIGITS && code.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("pairing_code_format");
        err.message = Some("Pairing code must be exactly 6 digits".into());
        Err(err)
    }
}

/// Validates a time of day expressed in milliseconds since local midnight.
///
/// The inclusive upper bound lets a window end exactly at midnight.
pub fn validate_time_of_day_ms(millis: i64) -> Result<(), ValidationError> {
    if (0..=MILLIS_PER_DAY).contains(&millis) {
        Ok(())
    } else {
        let mut err = ValidationError::new("time_of_day_range");
        err.message = Some("Time of day must be between 0 and 86400000 milliseconds".into());
        Err(err)
    }
}

/// Validates a display name is non-blank.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}
