//! Error types for client lookup, callback validation and secret verification.
//!
//! Every expected rejection of an authorization or token request maps to one
//! of the request-level variants below. `Storage`, `Integrity` and
//! `Configuration` (converted from [`ConfigError`]) are server-side failures
//! and are never shown to the caller in detail.

use std::fmt;

use crate::config::ConfigError;

/// Errors produced by the OAuth client core.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The client identifier is not registered.
    #[error("Unknown client: {client_id}")]
    UnknownClient {
        /// The identifier the caller presented.
        client_id: String,
    },

    /// The requested callback is relative or malformed.
    #[error("Invalid callback URI: {reason}")]
    InvalidCallbackUri {
        /// Why the URI was rejected.
        reason: String,
    },

    /// The requested callback is well-formed but not registered for the client.
    #[error("Callback URI is not registered for this client")]
    CallbackNotRegistered,

    /// No callback was requested and the client has no default callback.
    #[error("No callback URI available")]
    NoCallbackAvailable,

    /// The presented client secret did not match.
    #[error("Client secret mismatch")]
    SecretMismatch,

    /// The request carried malformed or conflicting client credentials.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of why the request is invalid.
        message: String,
    },

    /// The client registry failed to answer.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// A stored client record violates its own invariants.
    #[error("Data integrity error: {message}")]
    Integrity {
        /// Description of the violated invariant.
        message: String,
    },

    /// The configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `UnknownClient` error.
    #[must_use]
    pub fn unknown_client(client_id: impl Into<String>) -> Self {
        Self::UnknownClient {
            client_id: client_id.into(),
        }
    }

    /// Creates a new `InvalidCallbackUri` error.
    #[must_use]
    pub fn invalid_callback_uri(reason: impl Into<String>) -> Self {
        Self::InvalidCallbackUri {
            reason: reason.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Integrity` error.
    #[must_use]
    pub fn integrity(message: impl Into<String>) -> Self {
        Self::Integrity {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns `true` if the request itself was at fault (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownClient { .. }
                | Self::InvalidCallbackUri { .. }
                | Self::CallbackNotRegistered
                | Self::NoCallbackAvailable
                | Self::SecretMismatch
                | Self::InvalidRequest { .. }
        )
    }

    /// Returns `true` if the server failed (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. } | Self::Integrity { .. } | Self::Configuration { .. }
        )
    }

    /// Returns `true` for rejections of the callback target.
    #[must_use]
    pub fn is_callback_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCallbackUri { .. }
                | Self::CallbackNotRegistered
                | Self::NoCallbackAvailable
        )
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownClient { .. } => ErrorCategory::Authentication,
            Self::SecretMismatch => ErrorCategory::Authentication,
            Self::InvalidCallbackUri { .. } => ErrorCategory::Validation,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::CallbackNotRegistered => ErrorCategory::Redirection,
            Self::NoCallbackAvailable => ErrorCategory::Redirection,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Integrity { .. } => ErrorCategory::Internal,
            Self::Configuration { .. } => ErrorCategory::Configuration,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::UnknownClient { .. } => "invalid_client",
            Self::SecretMismatch => "invalid_client",
            Self::InvalidCallbackUri { .. } => "invalid_request",
            Self::CallbackNotRegistered => "invalid_request",
            Self::NoCallbackAvailable => "invalid_request",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::Storage { .. } => "server_error",
            Self::Integrity { .. } => "server_error",
            Self::Configuration { .. } => "server_error",
        }
    }

    /// Returns a message that is safe to show to an unauthenticated caller.
    ///
    /// Unknown clients and wrong secrets read the same, callback errors never
    /// echo the URI, and server-side details are hidden.
    #[must_use]
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::UnknownClient { .. } | Self::SecretMismatch => "client authentication failed",
            Self::InvalidCallbackUri { .. } => "redirect_uri is not a valid absolute URI",
            Self::CallbackNotRegistered => "redirect_uri is not registered for this client",
            Self::NoCallbackAvailable => "redirect_uri is required",
            Self::InvalidRequest { .. } => "malformed client credentials",
            Self::Storage { .. } | Self::Integrity { .. } | Self::Configuration { .. } => {
                "internal server error"
            }
        }
    }
}

impl From<ConfigError> for AuthError {
    fn from(e: ConfigError) -> Self {
        Self::configuration(e.to_string())
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Client identity could not be established.
    Authentication,
    /// The callback target was refused.
    Redirection,
    /// Request validation errors.
    Validation,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
    /// Internal defects such as corrupted records.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authentication => write!(f, "authentication"),
            Self::Redirection => write!(f, "redirection"),
            Self::Validation => write!(f, "validation"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
