use thiserror::Error;

/// Invalid parameters detected when a component is constructed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamsError {
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("no pairs configured")]
    NoPairs,

    #[error("pair {0} uses the same symbol for both legs")]
    SameLeg(String),

    #[error("pair {0} configured twice")]
    DuplicatePair(String),

    #[error("strategy kind '{0}' needs a meta labeler")]
    MissingMetaLabeler(&'static str),
}

impl ParamsError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Fails with `ParamsError::Invalid` unless `value` is finite and strictly positive.
pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<(), ParamsError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ParamsError::invalid(field, format!("must be > 0, got {value}")))
    }
}

/// Fails unless `value` is finite and non-negative.
pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<(), ParamsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ParamsError::invalid(field, format!("must be >= 0, got {value}")))
    }
}
