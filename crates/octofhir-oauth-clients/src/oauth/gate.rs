//! Authorization gate.
//!
//! Ties the client registry, the redirect validator and client
//! authentication together for an authorization server's request handlers.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use octofhir_oauth_clients::oauth::{AuthorizationGate, RedirectValidator};
//!
//! let gate = AuthorizationGate::new(registry, RedirectValidator::new());
//!
//! // Authorization endpoint: identity is claimed, not yet proven.
//! let authorized = gate.authorize_callback("my-app", request.redirect_uri.as_deref()).await?;
//! // ... consent, then deliver the code to `authorized.callback`.
//!
//! // Token endpoint: the client proves possession of its secret.
//! let client = gate.authenticate(&credentials).await?;
//! ```

use std::sync::Arc;

use crate::AuthResult;
use crate::config::OAuthClientsConfig;
use crate::oauth::client_auth::{
    AuthenticatedClient, ClientCredentials, authenticate_client_with_format,
};
use crate::oauth::redirect::{CallbackOutcome, CallbackResolution, RedirectValidator};
use crate::oauth::secret::SecretFormat;
use crate::registry::{ClientRegistry, InMemoryClientRegistry, lookup_client};
use crate::types::{AbsoluteUri, ClientRecord};

/// An authorization request whose callback has been accepted.
#[derive(Debug, Clone)]
pub struct AuthorizedCallback {
    /// The (unauthenticated) client the request claims to come from.
    pub client: ClientRecord,

    /// Where the authorization result goes.
    pub callback: AbsoluteUri,

    /// Whether the callback was the default or explicitly requested.
    pub outcome: CallbackOutcome,
}

/// Entry point for the authorization and token endpoints.
pub struct AuthorizationGate {
    registry: Arc<dyn ClientRegistry>,
    validator: RedirectValidator,
    secret_format: SecretFormat,
}

impl AuthorizationGate {
    /// Creates a new gate.
    ///
    /// # Arguments
    ///
    /// * `registry` - Registry for looking up clients
    /// * `validator` - Callback resolution policy
    #[must_use]
    pub fn new(registry: Arc<dyn ClientRegistry>, validator: RedirectValidator) -> Self {
        Self {
            registry,
            validator,
            secret_format: SecretFormat::default(),
        }
    }

    /// Creates a gate whose validator follows `config.callbacks` and whose
    /// secret format follows `config.secrets`.
    #[must_use]
    pub fn from_config(registry: Arc<dyn ClientRegistry>, config: &OAuthClientsConfig) -> Self {
        Self::new(registry, RedirectValidator::from_config(&config.callbacks))
            .with_secret_format(SecretFormat::from_hash_at_rest(config.secrets.hash_at_rest))
    }

    /// Creates a gate over an in-memory registry seeded from `config.clients`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the configuration is invalid.
    pub fn from_registrations(config: &OAuthClientsConfig) -> AuthResult<Self> {
        let registry = InMemoryClientRegistry::from_config(config)?;
        Ok(Self::from_config(Arc::new(registry), config))
    }

    /// Sets the format the registry stores secrets in.
    #[must_use]
    pub fn with_secret_format(mut self, format: SecretFormat) -> Self {
        self.secret_format = format;
        self
    }

    /// Looks up the client and resolves the requested callback.
    ///
    /// Use this instead of [`authorize_callback`](Self::authorize_callback)
    /// when the caller needs the rejection outcome itself, for example to
    /// apply [`RedirectValidator::error_delivery`].
    ///
    /// # Errors
    ///
    /// Returns lookup errors and integrity defects. Callback rejections are
    /// reported in the returned resolution.
    pub async fn resolve(
        &self,
        client_id: &str,
        requested: Option<&str>,
    ) -> AuthResult<(ClientRecord, CallbackResolution)> {
        let client = lookup_client(self.registry.as_ref(), client_id).await?;
        let resolution = self.validator.resolve(&client, requested)?;
        Ok((client, resolution))
    }

    /// Checks an authorization request's client and callback.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The client is not registered (`UnknownClient`)
    /// - No callback was requested and none is registered (`NoCallbackAvailable`)
    /// - The callback is not an absolute URI (`InvalidCallbackUri`)
    /// - The callback is not registered (`CallbackNotRegistered`)
    /// - The registry fails or returns a corrupt record
    ///
    /// # Security
    ///
    /// A successful result does not authenticate the client.
    #[tracing::instrument(skip_all, fields(client_id = %client_id))]
    pub async fn authorize_callback(
        &self,
        client_id: &str,
        requested: Option<&str>,
    ) -> AuthResult<AuthorizedCallback> {
        // 1. Look up the claimed client
        // 2. Resolve the callback against its registration
        let (client, resolution) = self.resolve(client_id, requested).await?;
        let outcome = resolution.outcome();

        // 3. Accept or map the rejection to an error
        match resolution.into_result() {
            Ok(callback) => {
                tracing::debug!(outcome = %outcome, "Authorization callback accepted");
                Ok(AuthorizedCallback {
                    client,
                    callback,
                    outcome,
                })
            }
            Err(e) => {
                tracing::info!(
                    outcome = %outcome,
                    category = %e.category(),
                    "Authorization callback rejected"
                );
                Err(e)
            }
        }
    }

    /// Authenticates a client at the token endpoint.
    ///
    /// # Errors
    ///
    /// See [`authenticate_client`](crate::oauth::authenticate_client).
    pub async fn authenticate(
        &self,
        credentials: &ClientCredentials,
    ) -> AuthResult<AuthenticatedClient> {
        authenticate_client_with_format(self.registry.as_ref(), credentials, self.secret_format)
            .await
    }

    /// Gets the client registry reference.
    #[must_use]
    pub fn registry(&self) -> &Arc<dyn ClientRegistry> {
        &self.registry
    }

    /// Gets the redirect validator.
    #[must_use]
    pub fn validator(&self) -> &RedirectValidator {
        &self.validator
    }

    /// Gets the secret storage format.
    #[must_use]
    pub fn secret_format(&self) -> SecretFormat {
        self.secret_format
    }
}

impl std::fmt::Debug for AuthorizationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGate")
            .field("validator", &self.validator)
            .field("secret_format", &self.secret_format)
            .finish_non_exhaustive()
    }
}
