//! Error types for subtitles-core
//!
//! This module defines error types using thiserror for ergonomic error handling.
//! Errors are categorized by domain (fingerprint, remote service, host, etc.)
//! so callers can decide what to show and whether a retry makes sense.
//!
//! ## Propagation Policy
//!
//! Remote faults never escape the session, search and download coordinators as
//! panics: every transport problem is caught at the component boundary and turned
//! into one of the variants below. The background task runner goes one step
//! further and flattens errors into [`SubtitleError::user_message`] strings, which
//! is what the host shows in its status label.
//!
//! ### Fingerprint (local, fatal to that search)
//! - `SizeTooSmall`, `SeekError`
//!
//! ### Remote service (recoverable, surfaced as a message)
//! - `LoginFailed`, `ContactError`, `MalformedPayload`, `XmlRpcFault`,
//!   `InvalidXmlRpc`, `UnexpectedStatus`
//!
//! ### Terminal but not a fault
//! - `NoResults`

use thiserror::Error;

/// Result type alias using our SubtitleError type
pub type Result<T> = std::result::Result<T, SubtitleError>;

/// Message shown when logging in to the service fails.
pub const LOGIN_FAILED_MESSAGE: &str = "Could not contact the OpenSubtitles website";

/// Message shown when a search or download request cannot reach the service.
pub const CONTACT_ERROR_MESSAGE: &str = "Could not contact the OpenSubtitles website.";

/// Message shown when neither the hash nor the title query found anything.
pub const NO_RESULTS_MESSAGE: &str = "No results found.";

/// Main error type for subtitles-core
#[derive(Error, Debug)]
pub enum SubtitleError {
    // ===== Fingerprint Errors =====

    /// File is smaller than the two 64 KiB hashing windows
    #[error("File too small to fingerprint: {size} bytes (need at least {minimum} bytes)")]
    SizeTooSmall {
        size: u64,
        minimum: u64,
    },

    /// Seeking to the tail window landed somewhere unexpected
    #[error("Seek to offset {expected} failed (stream reported {actual})")]
    SeekError {
        expected: u64,
        actual: u64,
    },

    // ===== Remote Service Errors =====

    /// LogIn was rejected, returned no token, or could not be sent
    #[error("Login failed: {reason}")]
    LoginFailed {
        reason: String,
    },

    /// Any transport fault during search or download
    #[error("Could not contact the OpenSubtitles website: {reason}")]
    ContactError {
        reason: String,
    },

    /// Neither the hash nor the title query returned anything
    #[error("No results found")]
    NoResults,

    /// Download response is missing its payload or the payload does not decode
    #[error("Malformed subtitle payload: {0}")]
    MalformedPayload(String),

    /// The XML-RPC endpoint answered with a `<fault>`
    #[error("XML-RPC fault {code}: {message}")]
    XmlRpcFault {
        code: i64,
        message: String,
    },

    /// Response body is not a well-formed XML-RPC document
    #[error("Invalid XML-RPC response: {0}")]
    InvalidXmlRpc(String),

    /// Server returned a non-success HTTP status
    #[error("Server responded with unexpected status code: {status_code}")]
    UnexpectedStatus {
        status_code: u16,
    },

    // ===== Host/Media Errors =====

    /// Host has no media loaded
    #[error("No media is currently loaded")]
    NoCurrentMedia,

    /// Media cannot have subtitles fetched (stream scheme or audio file)
    #[error("Subtitles are not available for this media: {0}")]
    UnsupportedMedia(String),

    /// Media location cannot be turned into a local path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    // ===== Configuration Errors =====

    /// Settings file or client configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // ===== General Errors =====

    /// A background operation panicked or was aborted
    #[error("Background task failed: {0}")]
    TaskFailed(String),

    /// Internal error that should not normally occur
    #[error("Internal error: {0}")]
    InternalError(String),

    // ===== External Library Errors =====

    /// HTTP client error from reqwest
    #[error("HTTP client error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// Helper methods for creating common errors
impl SubtitleError {
    /// Create a ContactError from any displayable fault
    pub fn contact<S: ToString>(reason: S) -> Self {
        SubtitleError::ContactError {
            reason: reason.to_string(),
        }
    }

    /// Create a LoginFailed error
    pub fn login_failed<S: Into<String>>(reason: S) -> Self {
        SubtitleError::LoginFailed {
            reason: reason.into(),
        }
    }

    /// Create a MalformedPayload error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        SubtitleError::MalformedPayload(message.into())
    }

    /// Create an InvalidXmlRpc error
    pub fn invalid_xmlrpc<S: Into<String>>(message: S) -> Self {
        SubtitleError::InvalidXmlRpc(message.into())
    }

    /// Create an InternalError with a message
    pub fn internal<S: Into<String>>(message: S) -> Self {
        SubtitleError::InternalError(message.into())
    }

    /// Check if error came from talking to the remote service
    ///
    /// These are the faults the coordinators swallow and convert into a
    /// `ContactError` at their boundary.
    pub fn is_transport_fault(&self) -> bool {
        matches!(
            self,
            SubtitleError::ContactError { .. }
                | SubtitleError::XmlRpcFault { .. }
                | SubtitleError::InvalidXmlRpc(_)
                | SubtitleError::UnexpectedStatus { .. }
                | SubtitleError::ReqwestError(_)
        )
    }

    /// Check if error means the file could not be fingerprinted
    ///
    /// The caller must refuse to search when this returns `true`.
    pub fn is_fingerprint_error(&self) -> bool {
        matches!(
            self,
            SubtitleError::SizeTooSmall { .. } | SubtitleError::SeekError { .. }
        )
    }

    /// Check if a retry on user action may succeed
    pub fn is_retryable(&self) -> bool {
        self.is_transport_fault()
            || matches!(
                self,
                SubtitleError::LoginFailed { .. } | SubtitleError::MalformedPayload(_)
            )
    }

    /// Get user-friendly error message suitable for a status label
    ///
    /// Remote failures map onto the service's fixed messages; everything else
    /// falls back to the `Display` text.
    pub fn user_message(&self) -> String {
        match self {
            SubtitleError::LoginFailed { .. } => LOGIN_FAILED_MESSAGE.to_string(),
            SubtitleError::NoResults => NO_RESULTS_MESSAGE.to_string(),
            SubtitleError::MalformedPayload(_) => CONTACT_ERROR_MESSAGE.to_string(),
            e if e.is_transport_fault() => CONTACT_ERROR_MESSAGE.to_string(),
            SubtitleError::SizeTooSmall { .. } => {
                "The file is too small to look up subtitles for.".to_string()
            }
            SubtitleError::SeekError { .. } => {
                "The file could not be read to look up subtitles.".to_string()
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_user_messages() {
        assert_eq!(
            SubtitleError::login_failed("rejected").user_message(),
            "Could not contact the OpenSubtitles website"
        );
        assert_eq!(
            SubtitleError::contact("timeout").user_message(),
            "Could not contact the OpenSubtitles website."
        );
        assert_eq!(
            SubtitleError::malformed("missing data").user_message(),
            "Could not contact the OpenSubtitles website."
        );
        assert_eq!(SubtitleError::NoResults.user_message(), "No results found.");
    }

    #[test]
    fn test_fault_categories() {
        let fault = SubtitleError::XmlRpcFault {
            code: 503,
            message: "Service unavailable".to_string(),
        };
        assert!(fault.is_transport_fault());
        assert!(fault.is_retryable());
        assert!(!SubtitleError::NoResults.is_transport_fault());
        assert!(!SubtitleError::NoResults.is_retryable());

        let small = SubtitleError::SizeTooSmall {
            size: 10,
            minimum: 131072,
        };
        assert!(small.is_fingerprint_error());
        assert!(!small.is_retryable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: SubtitleError = io.into();
        assert!(matches!(err, SubtitleError::IoError(_)));
        assert!(err.user_message().contains("gone"));
    }
}
