use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::validation::{Validate, ValidationBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Largest page the store returns for a single query request
pub const MAX_PAGE_SIZE: usize = 1000;
/// Largest number of actions in one transaction
pub const MAX_BATCH_SIZE: usize = 100;

/// What import does when a row cannot be converted into an entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportErrorPolicy {
    /// Stop at the first bad row and return its error
    #[default]
    FailFast,
    /// Record the bad row in the import report and continue
    SkipInvalidRows,
}

impl FromStr for ImportErrorPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_fast" | "failfast" => Ok(Self::FailFast),
            "skip_invalid_rows" | "skip" => Ok(Self::SkipInvalidRows),
            _ => Err(ValidationError::invalid_value(
                "import_error_policy",
                "expected fail_fast or skip_invalid_rows",
            )),
        }
    }
}

/// Tunables of the extension layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtensionsConfig {
    pub page_size: usize,
    pub batch_size: usize,
    pub import_flush_threshold: usize,
    pub ignored_properties: Vec<String>,
    pub import_error_policy: ImportErrorPolicy,
    /// Import values under unknown type tags as plain strings instead of failing
    pub lenient_type_tags: bool,
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
            batch_size: MAX_BATCH_SIZE,
            import_flush_threshold: MAX_BATCH_SIZE,
            ignored_properties: vec!["odata.etag".to_string()],
            import_error_policy: ImportErrorPolicy::FailFast,
            lenient_type_tags: false,
        }
    }
}

impl Validate for ExtensionsConfig {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("page_size", Some(self.page_size))
            .range(1, MAX_PAGE_SIZE)
            .validate()?;
        ValidationBuilder::new("batch_size", Some(self.batch_size))
            .range(1, MAX_BATCH_SIZE)
            .validate()?;
        ValidationBuilder::new("import_flush_threshold", Some(self.import_flush_threshold))
            .range(1, usize::MAX)
            .validate()?;
        Ok(())
    }
}

impl ExtensionsConfig {
    /// Load from the process environment, reading a `.env` file first if present.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> DomainResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; used by `from_env` and tests
    pub fn from_lookup<F>(lookup: F) -> DomainResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("TABLES_PAGE_SIZE") {
            config.page_size = parse_usize("TABLES_PAGE_SIZE", &value)?;
        }
        if let Some(value) = lookup("TABLES_BATCH_SIZE") {
            config.batch_size = parse_usize("TABLES_BATCH_SIZE", &value)?;
        }
        if let Some(value) = lookup("TABLES_IMPORT_FLUSH_THRESHOLD") {
            config.import_flush_threshold = parse_usize("TABLES_IMPORT_FLUSH_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("TABLES_IGNORED_PROPERTIES") {
            config.ignored_properties = value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup("TABLES_IMPORT_ERROR_POLICY") {
            config.import_error_policy = value.parse::<ImportErrorPolicy>()?;
        }
        if let Some(value) = lookup("TABLES_LENIENT_TYPE_TAGS") {
            config.lenient_type_tags = value.trim().parse::<bool>().map_err(|_| {
                ValidationError::invalid_value("TABLES_LENIENT_TYPE_TAGS", "expected true or false")
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> DomainResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> DomainResult<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| DomainError::Configuration(format!("Invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_ignored(&self, property: &str) -> bool {
        self.ignored_properties.iter().any(|p| p == property)
    }
}

fn parse_usize(field: &str, value: &str) -> Result<usize, ValidationError> {
    value
        .trim()
        .parse::<usize>()
        .map_err(|_| ValidationError::invalid_value(field, "expected a positive integer"))
}
