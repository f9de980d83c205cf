//! Error types for organization logging reconciliation.

use std::borrow::Cow;

use thiserror::Error;

/// Errors that can occur while reconciling a resource.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The requested resource was not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An internal error occurred.
    #[error("SDK error: {0}")]
    Sdk(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Invalid request from client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The remote document populated a logging backend but omitted one of
    /// its required fields.
    #[error("Incomplete remote data: {object} is missing '{field}'")]
    IncompleteRemoteData {
        /// What was incomplete (`s3 logging`, `org`, ...).
        object: &'static str,
        /// The wire name of the missing field.
        field: &'static str,
    },

    /// The API answered with a status outside 2xx that is not a
    /// not-found on read.
    #[error("Transport error: HTTP {status}: {message}")]
    Transport {
        /// HTTP status code.
        status: u16,
        /// Response body or reason phrase.
        message: String,
    },

    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProviderError {
    /// Get the error message without the category prefix of `Display`.
    pub fn message(&self) -> Cow<'_, str> {
        match self {
            Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Sdk(msg)
            | Self::Configuration(msg)
            | Self::UnknownResource(msg)
            | Self::InvalidRequest(msg)
            | Self::Transport { message: msg, .. } => Cow::Borrowed(msg),
            Self::IncompleteRemoteData { object, field } => {
                Cow::Owned(format!("{} is missing '{}'", object, field))
            }
            Self::Http(err) => Cow::Owned(err.to_string()),
            Self::Serialization(err) => Cow::Owned(err.to_string()),
        }
    }

    /// The HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::NotFound("org/acme".to_string());
        assert_eq!(format!("{}", err), "Resource not found: org/acme");

        let err = ProviderError::Validation("invalid input".to_string());
        assert_eq!(format!("{}", err), "Validation error: invalid input");

        let err = ProviderError::UnknownResource("cpln_gvc".to_string());
        assert_eq!(format!("{}", err), "Unknown resource type: cpln_gvc");
    }

    #[test]
    fn test_incomplete_remote_data_display() {
        let err = ProviderError::IncompleteRemoteData {
            object: "logzio logging",
            field: "listenerHost",
        };
        assert_eq!(
            format!("{}", err),
            "Incomplete remote data: logzio logging is missing 'listenerHost'"
        );
        assert_eq!(err.message(), "logzio logging is missing 'listenerHost'");
    }

    #[test]
    fn test_transport_error() {
        let err = ProviderError::Transport {
            status: 503,
            message: "upstream unavailable".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Transport error: HTTP 503: upstream unavailable"
        );
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.message(), "upstream unavailable");
    }

    #[test]
    fn test_serialization_from() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: ProviderError = parse.unwrap_err().into();
        assert!(matches!(err, ProviderError::Serialization(_)));
        assert_eq!(err.status(), None);
        assert!(err.message().contains("line 1"));
    }

    #[test]
    fn test_message_method() {
        let err = ProviderError::Configuration("org is required".to_string());
        assert_eq!(err.message(), "org is required");

        let err = ProviderError::InvalidRequest("bad request".to_string());
        assert_eq!(err.message(), "bad request");
    }
}
