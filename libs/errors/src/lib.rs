//! Unified error handling for the PAJ GPS tracker bridge
//!
//! Every crate in the workspace returns [`TrackerError`], so the service
//! boundary only has to decide how to log and degrade, never how to convert.

use thiserror::Error;

// ============================================================================
// TrackerError - Main error type
// ============================================================================

/// Main error type for all tracker bridge crates
#[derive(Debug, Error)]
pub enum TrackerError {
    // ======================================
    // Configuration Errors
    // ======================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    // ======================================
    // Transport & Upstream API Errors
    // ======================================
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Timeout waiting for response from {0}")]
    Timeout(String),

    #[error("API error: status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Unexpected payload: {0}")]
    UnexpectedPayload(String),

    #[error("Refresh failed earlier in this window: {0}")]
    RefreshFailed(String),

    // ======================================
    // Resource Errors
    // ======================================
    #[error("Device not found: {0}")]
    DeviceNotFound(u64),

    #[error("Unknown alert type: {0}")]
    UnknownAlertType(u8),

    // ======================================
    // File & Serialization Errors
    // ======================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias using TrackerError
pub type Result<T> = std::result::Result<T, TrackerError>;

impl TrackerError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid-field configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create an unexpected-payload error
    pub fn payload(msg: impl Into<String>) -> Self {
        Self::UnexpectedPayload(msg.into())
    }

    /// True for failures of the upstream fetch itself (network, auth, top-level payload)
    pub fn is_transport(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::Timeout | ErrorCategory::Permission
        ) || matches!(self, Self::UnexpectedPayload(_) | Self::RefreshFailed(_))
    }

    /// Get error code (for logs)
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIGURATION_ERROR",
            Self::InvalidConfig { .. } => "INVALID_CONFIG",
            Self::Http(_) => "HTTP_ERROR",
            Self::Timeout(_) => "TIMEOUT",
            Self::Api { .. } => "API_ERROR",
            Self::Auth(_) => "AUTH_FAILED",
            Self::UnexpectedPayload(_) => "UNEXPECTED_PAYLOAD",
            Self::RefreshFailed(_) => "REFRESH_FAILED",
            Self::DeviceNotFound(_) => "DEVICE_NOT_FOUND",
            Self::UnknownAlertType(_) => "UNKNOWN_ALERT_TYPE",
            Self::Io(_) => "IO_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Get error category (for classification)
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::InvalidConfig { .. } => ErrorCategory::Configuration,
            Self::Http(_) | Self::Api { .. } | Self::RefreshFailed(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Auth(_) => ErrorCategory::Permission,
            Self::DeviceNotFound(_) => ErrorCategory::NotFound,
            Self::UnknownAlertType(_) => ErrorCategory::Validation,
            Self::UnexpectedPayload(_) | Self::Io(_) | Self::Serialization(_) => {
                ErrorCategory::Internal
            },
        }
    }

    /// Get log level
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;
        match self.category() {
            ErrorCategory::Internal | ErrorCategory::Permission => Level::ERROR,
            ErrorCategory::Network | ErrorCategory::Timeout => Level::WARN,
            ErrorCategory::Validation | ErrorCategory::NotFound => Level::INFO,
            ErrorCategory::Configuration => Level::ERROR,
        }
    }
}

/// Error category enum - used for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Timeout,
    Permission,
    Validation,
    NotFound,
    Internal,
}

// Conversion traits for common error types
impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            let url = err
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "upstream".to_string());
            Self::Timeout(url)
        } else {
            Self::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// Helper macros for creating errors
#[macro_export]
macro_rules! config_error {
    ($msg:expr) => {
        $crate::TrackerError::Config($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::TrackerError::Config(format!($fmt, $($arg)*))
    };
}

#[macro_export]
macro_rules! payload_error {
    ($msg:expr) => {
        $crate::TrackerError::UnexpectedPayload($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::TrackerError::UnexpectedPayload(format!($fmt, $($arg)*))
    };
}
