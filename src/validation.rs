use crate::errors::{DomainError, DomainResult, ValidationError};
use regex::Regex;
use std::sync::OnceLock;

/// A trait that values should implement for validation.
pub trait Validate {
    /// Validates the value and returns an error if validation fails.
    fn validate(&self) -> DomainResult<()>;
}

// Table names: alphanumeric, starting with a letter, 3 to 63 characters
fn table_name_regex() -> &'static Regex {
    static TABLE_NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    TABLE_NAME_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]{2,62}$").unwrap())
}

fn ticks_key_regex() -> &'static Regex {
    static TICKS_KEY_REGEX: OnceLock<Regex> = OnceLock::new();
    TICKS_KEY_REGEX.get_or_init(|| Regex::new(r"^[0-9]{19}$").unwrap())
}

/// Maximum size of a partition or row key, in bytes
pub const MAX_KEY_LENGTH: usize = 1024;

/// Struct for configuring validations in a fluent style
#[derive(Default)]
pub struct ValidationBuilder<T> {
    field_name: String,
    value: Option<T>,
    errors: Vec<ValidationError>,
}

/// Generic validation implementations
impl<T> ValidationBuilder<T> {
    pub fn new(field_name: &str, value: Option<T>) -> Self {
        Self {
            field_name: field_name.to_string(),
            value,
            errors: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self
    where T: Default + PartialEq {
        if self.value.is_none() || self.value == Some(T::default()) {
            self.errors.push(ValidationError::required(&self.field_name));
        }
        self
    }

    pub fn validate_with<F>(mut self, validator: F) -> Self
    where F: FnOnce(&T) -> Result<(), ValidationError> {
        if let Some(value) = &self.value {
            if let Err(err) = validator(value) {
                self.errors.push(err);
            }
        }
        self
    }

    /// First error, if any
    pub fn finish(self) -> Result<(), ValidationError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Complete validation and return result
    pub fn validate(self) -> DomainResult<()> {
        self.finish().map_err(DomainError::Validation)
    }
}

/// String-specific validations
impl ValidationBuilder<String> {
    pub fn min_length(mut self, min: usize) -> Self {
        if let Some(value) = &self.value {
            if value.len() < min {
                self.errors.push(ValidationError::min_length(&self.field_name, min));
            }
        }
        self
    }

    pub fn max_length(mut self, max: usize) -> Self {
        if let Some(value) = &self.value {
            if value.len() > max {
                self.errors.push(ValidationError::max_length(&self.field_name, max));
            }
        }
        self
    }

    pub fn matches_pattern(mut self, pattern: &Regex, message: &str) -> Self {
        if let Some(value) = &self.value {
            if !pattern.is_match(value) {
                self.errors.push(ValidationError::format(&self.field_name, message));
            }
        }
        self
    }

    pub fn table_name(self) -> Self {
        self.matches_pattern(
            table_name_regex(),
            "must be 3-63 alphanumeric characters starting with a letter",
        )
    }

    pub fn ticks_key(self) -> Self {
        self.matches_pattern(ticks_key_regex(), "must be 19 decimal digits")
    }

    /// Partition/row key character rules of the table store
    pub fn table_key(mut self) -> Self {
        if let Some(value) = &self.value {
            if let Some(bad) = value.chars().find(|c| is_forbidden_key_char(*c)) {
                self.errors.push(ValidationError::format(
                    &self.field_name,
                    &format!("contains disallowed character {:?}", bad),
                ));
            }
        }
        self
    }
}

/// Numeric range validation
impl<T: PartialOrd + std::fmt::Display + Copy> ValidationBuilder<T> {
    pub fn range(mut self, min: T, max: T) -> Self {
        if let Some(value) = self.value {
            if value < min || value > max {
                self.errors.push(ValidationError::range(&self.field_name, min, max));
            }
        }
        self
    }
}

pub fn is_forbidden_key_char(c: char) -> bool {
    matches!(c, '/' | '\\' | '#' | '?') || c.is_control()
}

/// Validate a table name against the store's naming rules
pub fn validate_table_name(name: &str) -> Result<(), ValidationError> {
    ValidationBuilder::new("table_name", Some(name.to_string()))
        .required()
        .table_name()
        .finish()
}

/// Validate a partition or row key
pub fn validate_key(field: &str, key: &str) -> Result<(), ValidationError> {
    ValidationBuilder::new(field, Some(key.to_string()))
        .required()
        .max_length(MAX_KEY_LENGTH)
        .table_key()
        .finish()
}
