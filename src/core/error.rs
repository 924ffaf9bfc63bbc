use thiserror::Error;

/// Why a stage fell back to its cleared result.
#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum InputError {
    #[error("{field} is missing or not a number")]
    NotANumber { field: &'static str },
    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: f64 },
    #[error("{field} must be > 0, got {value}")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must be at most {max}, got {value}")]
    TooLarge {
        field: &'static str,
        value: f64,
        max: f64,
    },
    #[error("terminal balance is not finite")]
    NonFiniteResult,
}

pub(crate) fn non_negative(field: &'static str, value: f64) -> Result<f64, InputError> {
    if !value.is_finite() {
        return Err(InputError::NotANumber { field });
    }
    if value < 0.0 {
        return Err(InputError::Negative { field, value });
    }
    Ok(value)
}

pub(crate) fn positive(field: &'static str, value: f64) -> Result<f64, InputError> {
    let value = non_negative(field, value)?;
    if value <= 0.0 {
        return Err(InputError::NotPositive { field, value });
    }
    Ok(value)
}

/// Period counts are truncated toward zero, the way a form's integer parse does.
pub(crate) fn period_count(field: &'static str, value: f64) -> Result<u32, InputError> {
    let value = non_negative(field, value)?.trunc();
    if value > u32::MAX as f64 {
        return Err(InputError::TooLarge {
            field,
            value,
            max: u32::MAX as f64,
        });
    }
    Ok(value as u32)
}
