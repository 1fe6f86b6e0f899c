//! Error types for the reveal crate.

/// Result type alias for reveal operations.
pub type Result<T> = std::result::Result<T, RevealError>;

/// Errors that can occur while configuring a reveal controller.
///
/// The reveal path itself never fails; these cover parsing and validating
/// configuration supplied from outside.
#[derive(Debug, thiserror::Error)]
pub enum RevealError {
    /// Root margin syntax error.
    #[error("Invalid root margin '{input}' at column {column}: {message}")]
    InvalidRootMargin {
        input: String,
        message: String,
        column: u32,
    },

    /// A configuration value is outside its contract.
    #[error("Invalid value for '{field}': {message}")]
    InvalidConfig {
        field: &'static str,
        message: String,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse reveal configuration: {source}")]
    ConfigParse {
        #[source]
        source: toml::de::Error,
    },
}

impl RevealError {
    /// Create a root margin error.
    pub fn invalid_root_margin(
        input: impl Into<String>,
        message: impl Into<String>,
        column: u32,
    ) -> Self {
        Self::InvalidRootMargin {
            input: input.into(),
            message: message.into(),
            column,
        }
    }

    /// Create a configuration value error.
    pub fn invalid_config(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            message: message.into(),
        }
    }
}

impl From<toml::de::Error> for RevealError {
    fn from(source: toml::de::Error) -> Self {
        Self::ConfigParse { source }
    }
}
