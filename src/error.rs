/*!
 * Error types for siteport
 */

use crate::cache::CacheSide;
use siteport_core_manifest::ContentType;
use std::fmt;
use std::io;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, MigrationError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;
pub const EXIT_INTEGRITY: i32 = 3;

/// Extension registration mistakes, reported while the plan is being built
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("extension '{extension}' declares no extension kind")]
    NoKinds { extension: &'static str },

    #[error("extension '{extension}' declares kind '{kind}' more than once")]
    DuplicateKind {
        extension: &'static str,
        kind: String,
    },

    #[error("generic extension '{extension}' was registered without content types")]
    EmptyContentTypes { extension: &'static str },

    #[error("generic extension '{extension}' names unknown content type '{content_type}'")]
    UnknownContentType {
        extension: &'static str,
        content_type: ContentType,
    },
}

#[derive(Debug, Error)]
pub enum MigrationError {
    /// Extension registration failed
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    /// An extension in a chain returned an error; the chain was aborted
    #[error("extension '{extension}' failed in {kind}: {source}")]
    Extension {
        kind: String,
        extension: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A single item could not be migrated
    #[error("{content_type} item {source_id}: {message}")]
    Item {
        content_type: ContentType,
        source_id: Uuid,
        message: String,
    },

    /// A listing, pull, convert or publish call failed
    #[error("{operation} of {content_type} failed: {source}")]
    Endpoint {
        content_type: ContentType,
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Bulk reference load failed; the cache stays unloaded
    #[error("{side} reference cache load for {content_type} failed: {source}")]
    CacheLoad {
        content_type: ContentType,
        side: CacheSide,
        #[source]
        source: anyhow::Error,
    },

    /// No endpoint collaborator registered for a content type
    #[error("no {collaborator} registered for {content_type}")]
    MissingCollaborator {
        content_type: ContentType,
        collaborator: &'static str,
    },

    /// Content type tag with no concrete content type behind it
    #[error("unknown content type '{0}'")]
    UnknownContentType(ContentType),

    /// Manifest operation failed
    #[error("manifest error: {0}")]
    Manifest(#[from] siteport_core_manifest::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The run was cancelled
    #[error("migration canceled")]
    Canceled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl MigrationError {
    /// Item-level failure with a message
    pub fn item<S: Into<String>>(content_type: ContentType, source_id: Uuid, message: S) -> Self {
        MigrationError::Item {
            content_type,
            source_id,
            message: message.into(),
        }
    }

    pub fn endpoint(content_type: ContentType, operation: &'static str, source: anyhow::Error) -> Self {
        MigrationError::Endpoint {
            content_type,
            operation,
            source,
        }
    }

    pub fn missing(content_type: ContentType, collaborator: &'static str) -> Self {
        MigrationError::MissingCollaborator {
            content_type,
            collaborator,
        }
    }

    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MigrationError::Registration(_)
            | MigrationError::Config(_)
            | MigrationError::MissingCollaborator { .. }
            | MigrationError::UnknownContentType(_) => EXIT_FATAL,
            MigrationError::Manifest(_) => EXIT_INTEGRITY,
            _ => EXIT_PARTIAL,
        }
    }

    /// Check if this error prevents the run from starting or continuing
    pub fn is_fatal(&self) -> bool {
        match self {
            MigrationError::Registration(_) => true,
            MigrationError::Config(_) => true,
            MigrationError::MissingCollaborator { .. } => true,
            MigrationError::UnknownContentType(_) => true,
            MigrationError::Manifest(_) => true,

            MigrationError::Extension { .. } => false,
            MigrationError::Item { .. } => false,
            MigrationError::Endpoint { .. } => false,
            MigrationError::CacheLoad { .. } => false,
            MigrationError::Canceled => false,
            MigrationError::Io(_) => false,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, MigrationError::Canceled)
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            MigrationError::Registration(_) => ErrorCategory::Registration,
            MigrationError::Extension { .. } => ErrorCategory::Extension,
            MigrationError::Item { .. } => ErrorCategory::Item,
            MigrationError::Endpoint { .. } => ErrorCategory::Endpoint,
            MigrationError::CacheLoad { .. } => ErrorCategory::Cache,
            MigrationError::MissingCollaborator { .. } | MigrationError::UnknownContentType(_) => {
                ErrorCategory::Validation
            }
            MigrationError::Manifest(_) => ErrorCategory::Manifest,
            MigrationError::Config(_) => ErrorCategory::Configuration,
            MigrationError::Canceled => ErrorCategory::Cancellation,
            MigrationError::Io(_) => ErrorCategory::IoError,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Extension registration errors
    Registration,
    /// Extension chain failures
    Extension,
    /// Isolated per-item failures
    Item,
    /// Endpoint collaborator failures
    Endpoint,
    /// Reference cache load failures
    Cache,
    /// Plan validation errors
    Validation,
    /// Manifest integrity and persistence errors
    Manifest,
    /// Configuration errors
    Configuration,
    /// Cooperative cancellation
    Cancellation,
    /// I/O operation errors
    IoError,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Registration => write!(f, "registration"),
            ErrorCategory::Extension => write!(f, "extension"),
            ErrorCategory::Item => write!(f, "item"),
            ErrorCategory::Endpoint => write!(f, "endpoint"),
            ErrorCategory::Cache => write!(f, "cache"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Manifest => write!(f, "manifest"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Cancellation => write!(f, "cancellation"),
            ErrorCategory::IoError => write!(f, "io"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER: ContentType = ContentType::new("user");

    #[test]
    fn test_exit_codes() {
        let reg = MigrationError::from(RegistrationError::NoKinds { extension: "Empty" });
        assert_eq!(reg.exit_code(), EXIT_FATAL);
        assert!(reg.is_fatal());

        let manifest = MigrationError::from(siteport_core_manifest::Error::validation("stale"));
        assert_eq!(manifest.exit_code(), EXIT_INTEGRITY);

        let item = MigrationError::item(USER, Uuid::nil(), "license limit");
        assert_eq!(item.exit_code(), EXIT_PARTIAL);
        assert!(!item.is_fatal());
    }

    #[test]
    fn test_extension_error_keeps_source() {
        let err = MigrationError::Extension {
            kind: "filter<user>".to_string(),
            extension: "DenyAll",
            source: anyhow::anyhow!("boom"),
        };
        assert_eq!(err.category(), ErrorCategory::Extension);
        assert!(err.to_string().contains("DenyAll"));
        assert!(err.to_string().contains("boom"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_category_display() {
        assert_eq!(MigrationError::Canceled.category().to_string(), "cancellation");
        assert_eq!(
            MigrationError::missing(USER, "source listing").to_string(),
            "no source listing registered for user"
        );
    }
}
