use crate::utils::error::{Result, UpgradeError};
use std::path::Path;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &Path) -> Result<()> {
    let display = path.to_string_lossy();
    if display.trim().is_empty() {
        return Err(UpgradeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: display.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if display.contains('\0') {
        return Err(UpgradeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: display.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(UpgradeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(UpgradeError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Sentinel exit codes must be distinct, otherwise a "nothing to do"
/// result could never be told apart from a partial failure.
pub fn validate_distinct_codes(codes: &[(&str, i32)]) -> Result<()> {
    for (i, (name, code)) in codes.iter().enumerate() {
        if *code == 0 {
            return Err(UpgradeError::InvalidConfigValueError {
                field: name.to_string(),
                value: code.to_string(),
                reason: "Sentinel exit code cannot be 0".to_string(),
            });
        }
        if let Some((other, _)) = codes[i + 1..].iter().find(|(_, c)| c == code) {
            return Err(UpgradeError::ConfigValidationError {
                field: name.to_string(),
                message: format!("exit code {} is also used by {}", code, other),
            });
        }
    }
    Ok(())
}
