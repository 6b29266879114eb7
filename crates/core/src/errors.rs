use thiserror::Error;

use crate::catalog::CatalogError;
use crate::config::ConfigError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid category `{category}`: {reason}")]
    InvalidCategory { category: String, reason: String },
    #[error("index {index} is out of range for category `{category}` ({len} entries)")]
    IndexOutOfRange { category: String, index: usize, len: usize },
    #[error("option {index} of exclusive category `{category}` is not selected")]
    UnselectedOption { category: String, index: usize },
}

impl DomainError {
    pub(crate) fn invalid_category(category: &str, reason: impl Into<String>) -> Self {
        Self::InvalidCategory { category: category.to_owned(), reason: reason.into() }
    }

    pub(crate) fn out_of_range(category: &str, index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { category: category.to_owned(), index, len }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("invalid configuration format: {0}")]
    InvalidFormat(String),
    #[error("configuration is not valid JSON: {0}")]
    ParseError(String),
    #[error("could not encode configuration: {0}")]
    Encode(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error("catalog failure: {0}")]
    Catalog(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Short message suitable for showing to the person at the keyboard.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(_) => "That change could not be applied to the calculator.",
            Self::Snapshot(SnapshotError::InvalidFormat(_)) => "Invalid configuration file format.",
            Self::Snapshot(SnapshotError::ParseError(_)) => {
                "Error loading configuration: the file is not valid JSON."
            }
            Self::Snapshot(SnapshotError::Encode(_)) => "The configuration could not be saved.",
            Self::Catalog(_) => "The pricing catalog could not be loaded.",
            Self::Configuration(_) => "The calculator configuration is invalid.",
        }
    }

    /// Stable machine-readable class used in command outcomes.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::InvalidCategory { .. }) => "invalid_category",
            Self::Domain(DomainError::IndexOutOfRange { .. }) => "index_out_of_range",
            Self::Domain(DomainError::UnselectedOption { .. }) => "unselected_option",
            Self::Snapshot(SnapshotError::InvalidFormat(_)) => "invalid_format",
            Self::Snapshot(SnapshotError::ParseError(_)) => "parse_error",
            Self::Snapshot(SnapshotError::Encode(_)) => "encode",
            Self::Catalog(_) => "catalog",
            Self::Configuration(_) => "config_validation",
        }
    }
}

impl From<CatalogError> for ApplicationError {
    fn from(error: CatalogError) -> Self {
        Self::Catalog(error.to_string())
    }
}

impl From<ConfigError> for ApplicationError {
    fn from(error: ConfigError) -> Self {
        Self::Configuration(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::PricingCatalog;
    use crate::config::ConfigError;
    use crate::errors::{ApplicationError, DomainError, SnapshotError};

    #[test]
    fn snapshot_errors_map_to_user_safe_messages() {
        let invalid = ApplicationError::from(SnapshotError::InvalidFormat("missing state".into()));
        assert_eq!(invalid.user_message(), "Invalid configuration file format.");
        assert_eq!(invalid.error_class(), "invalid_format");

        let parse = ApplicationError::from(SnapshotError::ParseError("eof".into()));
        assert_eq!(parse.error_class(), "parse_error");
        assert!(parse.user_message().starts_with("Error loading configuration"));
    }

    #[test]
    fn domain_errors_keep_their_context_in_display() {
        let error = ApplicationError::from(DomainError::out_of_range("Metrics", 5, 2));

        assert_eq!(error.error_class(), "index_out_of_range");
        assert_eq!(
            error.to_string(),
            "index 5 is out of range for category `Metrics` (2 entries)"
        );
    }

    #[test]
    fn catalog_and_config_failures_are_flattened_to_text() {
        let catalog = PricingCatalog::from_json("{ not json").map_err(ApplicationError::from);
        let Err(catalog) = catalog else {
            panic!("malformed catalog should fail");
        };
        assert_eq!(catalog.error_class(), "catalog");

        let config = ApplicationError::from(ConfigError::Validation("bad level".into()));
        assert_eq!(config.error_class(), "config_validation");
        assert_eq!(
            config.to_string(),
            "configuration failure: configuration validation failed: bad level"
        );
    }
}
