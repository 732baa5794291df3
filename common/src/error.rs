//! Error types for screen capture and remote editing.

use thiserror::Error;

/// Errors raised while acquiring or driving a capture session
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The user or the browser refused the capture request
    #[error("Screen capture permission denied: {0}")]
    PermissionDenied(String),

    /// The user dismissed the picker or no capturable source exists
    #[error("No capture source available: {0}")]
    NoSourceAvailable(String),

    /// A capture session is already running
    #[error("A capture session is already active")]
    Busy,

    /// The recording sink could not be created or driven
    #[error("Recorder error: {0}")]
    Recorder(String),

    /// Any other platform failure
    #[error("Platform error: {0}")]
    Platform(String),
}

/// Failures reaching the edit endpoint at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Network unreachable, aborted, CORS failure and similar
    #[error("Network error: {0}")]
    Network(String),

    /// The request outlived its deadline and was aborted
    #[error("Request timed out after {0} seconds")]
    TimedOut(u64),
}

/// Errors from a remote edit round-trip
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    /// The service answered with a non-success status
    #[error("Edit rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The request never produced a response
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The request was aborted by the client-side deadline
    #[error("Edit timed out after {0} seconds")]
    Timeout(u64),
}

impl From<TransportError> for EditError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Network(message) => EditError::Transport(message),
            TransportError::TimedOut(secs) => EditError::Timeout(secs),
        }
    }
}

/// Invalid user-supplied capture settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unsupported frame rate: {0}")]
    FrameRate(String),

    #[error("Unsupported resolution: {0}")]
    Resolution(String),

    #[error("Bitrate {0} kbps outside {min}..={max} kbps in steps of {step}", min = crate::config::Bitrate::MIN_KBPS, max = crate::config::Bitrate::MAX_KBPS, step = crate::config::Bitrate::STEP_KBPS)]
    Bitrate(u32),

    #[error("Invalid bitrate input: {0}")]
    BitrateInput(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for capture operations
pub type Result<T> = std::result::Result<T, CaptureError>;

/// Result type for edit operations
pub type EditResult<T> = std::result::Result<T, EditError>;
