//! Error types for rollcall.
//!
//! This module defines all error types used throughout the rollcall crate.
//! Wizard-facing errors are grouped the way the wizard renders them: validation
//! failures stay on their step, media errors block crop mode, and collaborator
//! errors are shown verbatim next to the submit action.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for rollcall operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Wizard Errors ===
    /// A step's fields failed validation.
    #[error("{message}")]
    Validation {
        /// Key of the step that failed.
        step: &'static str,
        /// User-facing reason.
        message: String,
    },

    /// Submission was attempted without an authenticated identity.
    #[error("No authenticated user found. Please try logging in again.")]
    NotAuthenticated,

    /// Submission was attempted before the review step was reached.
    #[error("submission is only available from the review step")]
    NotAtReview,

    /// A crop or submission is already in flight.
    #[error("{operation} already in progress")]
    Busy {
        /// The operation that is still running.
        operation: &'static str,
    },

    /// The wizard has already completed or been closed.
    #[error("wizard is no longer active")]
    WizardClosed,

    /// The shared directory password was wrong.
    #[error("Incorrect password")]
    IncorrectPassword,

    // === Media Errors ===
    /// The selected file is not an image.
    #[error("File must be an image")]
    NotAnImage,

    /// The selected image format cannot be decoded here.
    #[error("{format} images not supported. Please use JPG or PNG.")]
    UnsupportedImageFormat {
        /// Short name of the rejected format.
        format: String,
    },

    /// Image decoding or encoding failed.
    #[error("image processing failed: {0}")]
    Image(#[from] image::ImageError),

    /// A saved picture could not be turned back into a crop source.
    #[error("Failed to prepare image for editing")]
    ImagePreparation,

    /// A data URI was malformed.
    #[error("invalid data URI: {reason}")]
    DataUri {
        /// What was wrong with it.
        reason: String,
    },

    // === Collaborator Errors ===
    /// An external collaborator (identity, store, object store) failed.
    ///
    /// The collaborator's own message is shown unchanged.
    #[error("{message}")]
    Collaborator {
        /// Which collaborator failed.
        service: &'static str,
        /// The collaborator's message.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for rollcall operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a validation error for a step.
    #[must_use]
    pub fn validation(step: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            step,
            message: message.into(),
        }
    }

    /// Create a collaborator error carrying the collaborator's message.
    #[must_use]
    pub fn collaborator(service: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            service,
            message: message.into(),
        }
    }

    /// Create an unsupported image format error.
    #[must_use]
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedImageFormat {
            format: format.into(),
        }
    }

    /// Create a data URI error.
    #[must_use]
    pub fn data_uri(reason: impl Into<String>) -> Self {
        Self::DataUri {
            reason: reason.into(),
        }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a step validation failure.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error came from screening or processing an image.
    #[must_use]
    pub fn is_media(&self) -> bool {
        matches!(
            self,
            Self::NotAnImage
                | Self::UnsupportedImageFormat { .. }
                | Self::Image(_)
                | Self::ImagePreparation
                | Self::DataUri { .. }
        )
    }

    /// Check if this error came from an external collaborator.
    #[must_use]
    pub fn is_collaborator(&self) -> bool {
        matches!(self, Self::Collaborator { .. })
    }

    /// Check if this error means nobody is signed in.
    #[must_use]
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, Self::NotAuthenticated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotAnImage;
        assert_eq!(err.to_string(), "File must be an image");

        let err = Error::internal("test error");
        assert_eq!(err.to_string(), "internal error: test error");
    }

    #[test]
    fn test_collaborator_message_is_verbatim() {
        let err = Error::collaborator("profile store", "duplicate key value violates constraint");
        assert_eq!(err.to_string(), "duplicate key value violates constraint");
        assert!(err.is_collaborator());
        assert!(!err.is_media());
    }

    #[test]
    fn test_validation_error() {
        let err = Error::validation("identity", "Name is required");
        assert_eq!(err.to_string(), "Name is required");
        assert!(err.is_validation());
        assert!(!Error::NotAuthenticated.is_validation());
    }

    #[test]
    fn test_unsupported_format_display() {
        let err = Error::unsupported_format("HEIC");
        assert_eq!(
            err.to_string(),
            "HEIC images not supported. Please use JPG or PNG."
        );
        assert!(err.is_media());
    }

    #[test]
    fn test_media_classification() {
        assert!(Error::NotAnImage.is_media());
        assert!(Error::ImagePreparation.is_media());
        assert!(Error::data_uri("missing comma").is_media());
        assert!(!Error::IncorrectPassword.is_media());
    }

    #[test]
    fn test_unauthenticated() {
        assert!(Error::NotAuthenticated.is_unauthenticated());
        assert!(Error::NotAuthenticated.to_string().contains("logging in"));
        assert!(!Error::WizardClosed.is_unauthenticated());
    }

    #[test]
    fn test_busy_display() {
        let err = Error::Busy {
            operation: "submission",
        };
        assert_eq!(err.to_string(), "submission already in progress");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "zoom_min must be at least 1.0".to_string(),
        };
        assert!(err.to_string().contains("zoom_min"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
