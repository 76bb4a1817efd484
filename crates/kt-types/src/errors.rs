use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for knobtune
#[derive(Error, Debug)]
pub enum TuneError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Warm start error: {0}")]
    WarmStart(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// How a failure is reported to the controller.
///
/// Configuration errors are detected before the first evaluation; everything
/// else surfaces during the search loop and is reported as unexpected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorClass {
    Config,
    Unexpected,
}

impl TuneError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) | Self::WarmStart(_) => ErrorClass::Config,
            _ => ErrorClass::Unexpected,
        }
    }

    /// Text sent to the controller in a failure message.
    pub fn report(&self) -> String {
        match self.class() {
            ErrorClass::Config => self.to_string(),
            ErrorClass::Unexpected => format!("Unexpected Error: {self}"),
        }
    }
}

/// Result type alias for knobtune operations
pub type TuneResult<T> = Result<T, TuneError>;

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::errors::TuneError::Config(format!($($arg)*))
    };
}

/// Macro for creating warm start errors
#[macro_export]
macro_rules! warm_start_error {
    ($($arg:tt)*) => {
        $crate::errors::TuneError::WarmStart(format!($($arg)*))
    };
}

/// Macro for creating engine errors
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {
        $crate::errors::TuneError::Engine(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::errors::TuneError::Internal(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = config_error!("the ref value of {} is out of range", "x");
        assert_eq!(
            error.to_string(),
            "Configuration error: the ref value of x is out of range"
        );
    }

    #[test]
    fn test_error_classes() {
        assert_eq!(config_error!("bad").class(), ErrorClass::Config);
        assert_eq!(warm_start_error!("bad").class(), ErrorClass::Config);
        assert_eq!(engine_error!("bad").class(), ErrorClass::Unexpected);
        assert_eq!(
            TuneError::Protocol("not a number".into()).class(),
            ErrorClass::Unexpected
        );
    }

    #[test]
    fn test_unexpected_report_is_wrapped() {
        let report = internal_error!("Something went wrong").report();
        assert!(report.starts_with("Unexpected Error:"));
        assert!(report.contains("Something went wrong"));

        let report = config_error!("Missing required field: {}", "ref").report();
        assert!(!report.starts_with("Unexpected"));
    }

    #[test]
    fn test_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: TuneError = json_err.into();
        match err {
            TuneError::Serialization(_) => (),
            _ => panic!("Expected Serialization error"),
        }
    }
}
