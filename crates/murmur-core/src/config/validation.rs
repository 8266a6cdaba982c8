//! Configuration validation utilities and rules

use crate::MurmurError;
use std::fmt;
use std::time::Duration;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Value is out of acceptable range
    OutOfRange {
        /// Dotted field path
        field: String,
        /// Inclusive lower bound
        min: Option<f64>,
        /// Inclusive upper bound
        max: Option<f64>,
        /// Value found
        actual: f64,
    },
    /// Custom validation failed
    Custom {
        /// Dotted field path
        field: String,
        /// Description of the failure
        message: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::OutOfRange {
                field,
                min,
                max,
                actual,
            } => {
                let range_desc = match (min, max) {
                    (Some(min), Some(max)) => format!("between {min} and {max}"),
                    (Some(min), None) => format!("at least {min}"),
                    (None, Some(max)) => format!("at most {max}"),
                    (None, None) => "in valid range".to_string(),
                };
                write!(f, "Field '{field}' must be {range_desc} (got {actual})")
            }
            ValidationError::Custom { field, message } => {
                write!(f, "Field '{field}': {message}")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for MurmurError {
    fn from(err: ValidationError) -> Self {
        MurmurError::invalid(err.to_string())
    }
}

/// Configuration validator that accumulates validation rules
pub struct ConfigValidator {
    errors: Vec<ValidationError>,
    field_prefix: String,
}

impl ConfigValidator {
    /// Validator whose field names are reported under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            errors: Vec::new(),
            field_prefix: prefix.into(),
        }
    }

    fn field(&self, name: &str) -> String {
        if self.field_prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", self.field_prefix, name)
        }
    }

    /// Require `value` to lie within `[min, max]`.
    pub fn range(&mut self, name: &str, value: u64, min: u64, max: u64) -> &mut Self {
        if value < min || value > max {
            self.errors.push(ValidationError::OutOfRange {
                field: self.field(name),
                min: Some(min as f64),
                max: Some(max as f64),
                actual: value as f64,
            });
        }
        self
    }

    /// Require `value` to be non-zero.
    pub fn positive(&mut self, name: &str, value: u64) -> &mut Self {
        if value == 0 {
            self.errors.push(ValidationError::OutOfRange {
                field: self.field(name),
                min: Some(1.0),
                max: None,
                actual: 0.0,
            });
        }
        self
    }

    /// Require a non-zero duration.
    pub fn non_zero_duration(&mut self, name: &str, value: Duration) -> &mut Self {
        if value.is_zero() {
            self.errors.push(ValidationError::Custom {
                field: self.field(name),
                message: "duration must be greater than zero".to_string(),
            });
        }
        self
    }

    /// Errors collected so far.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Fold collected errors into one result.
    pub fn finish(self) -> Result<(), MurmurError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        let message = self
            .errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        Err(MurmurError::invalid(message))
    }
}
