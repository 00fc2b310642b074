//! # octofhir-oauth-clients
//!
//! Client identity and redirection-target validation for the OctoFHIR
//! OAuth 2.0 authorization server.
//!
//! This crate provides:
//! - Client registry lookup by client identifier
//! - Callback (redirect URI) resolution that refuses open redirects
//! - Constant-time client secret verification
//! - Client authentication for the token endpoint
//!
//! ## Overview
//!
//! An authorization request names a client and, optionally, a callback. The
//! client is looked up, the callback is resolved against the client's
//! registration, and only then does the request proceed to consent. The
//! client's secret is checked later, at the token endpoint.
//!
//! ## Modules
//!
//! - [`config`] - Callback policy, secret policy and static registrations
//! - [`error`] - Error taxonomy
//! - [`oauth`] - Redirect validation, secret verification, client authentication
//! - [`registry`] - Client registry trait and in-memory implementation
//! - [`types`] - Client records and absolute callback URIs

pub mod config;
pub mod error;
pub mod oauth;
pub mod registry;
pub mod types;

pub use config::{
    CallbackPolicyConfig, ClientRegistration, ConfigError, OAuthClientsConfig, SecretPolicyConfig,
};
pub use error::{AuthError, ErrorCategory};
pub use oauth::{
    AuthenticatedClient, AuthorizationGate, AuthorizedCallback, CallbackOutcome,
    CallbackResolution, ClientAuthMethod, ClientCredentials, ErrorDelivery, RedirectValidator,
    SecretFormat, SecretVerdict, authenticate_client, authenticate_client_with_format,
    generate_client_secret, hash_client_secret, resolve_callback, verify_decoy_secret,
    verify_secret,
};
pub use registry::{ClientRegistry, InMemoryClientRegistry, lookup_client};
pub use types::{
    AbsoluteUri, CallbackMatching, ClientCredential, ClientRecord, ClientRecordBuilder,
    ClientSecret, ClientValidationError, UriError,
};

/// Type alias for client validation results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use octofhir_oauth_clients::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{ConfigError, OAuthClientsConfig};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::oauth::{
        AuthenticatedClient, AuthorizationGate, AuthorizedCallback, CallbackOutcome,
        CallbackResolution, ClientAuthMethod, ClientCredentials, ErrorDelivery, RedirectValidator,
        SecretFormat, SecretVerdict, authenticate_client, authenticate_client_with_format,
        resolve_callback, verify_secret,
    };
    pub use crate::registry::{ClientRegistry, InMemoryClientRegistry, lookup_client};
    pub use crate::types::{AbsoluteUri, CallbackMatching, ClientRecord};
}
