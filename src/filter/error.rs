//! Error types for the filter system

use thiserror::Error;

/// Errors that can occur while filtering messages or enforcing actions
#[derive(Debug, Error)]
pub enum FilterError {
    /// Discord API error
    #[error("Discord API error: {0}")]
    DiscordApi(#[from] Box<serenity::Error>),

    /// Bad or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error
    #[error("Filter error: {0}")]
    Other(String),
}

impl From<serenity::Error> for FilterError {
    fn from(error: serenity::Error) -> Self {
        Self::DiscordApi(Box::new(error))
    }
}

impl From<String> for FilterError {
    fn from(message: String) -> Self {
        Self::Other(message)
    }
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = FilterError::Config("missing guild row".to_string());
        assert_eq!(error.to_string(), "Configuration error: missing guild row");

        let error = FilterError::from("something went wrong".to_string());
        assert_eq!(error.to_string(), "Filter error: something went wrong");
    }
}
