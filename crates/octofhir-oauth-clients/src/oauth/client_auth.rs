//! Client authentication for the token endpoint.
//!
//! The authorization step only identifies a client; possession of the
//! client's secret is proven here, in a later request.
//!
//! # Authentication Methods
//!
//! - `none` - Public clients (client_id only)
//! - `client_secret_basic` - HTTP Basic Auth with client_id:client_secret
//! - `client_secret_post` - client_id and client_secret in request body
//!
//! A request using more than one method is rejected.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::AuthResult;
use crate::error::AuthError;
use crate::oauth::secret::{SecretFormat, verify_decoy_secret, verify_secret};
use crate::registry::{ClientRegistry, lookup_client};
use crate::types::ClientRecord;

/// Result of successful client authentication.
#[derive(Debug, Clone)]
pub struct AuthenticatedClient {
    /// The authenticated client.
    pub client: ClientRecord,

    /// The authentication method used.
    pub auth_method: ClientAuthMethod,
}

/// Token endpoint authentication methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    /// No client authentication (public clients).
    None,

    /// Client secret via HTTP Basic Auth.
    ClientSecretBasic,

    /// Client secret in request body.
    ClientSecretPost,
}

impl ClientAuthMethod {
    /// Returns the method name as registered with OAuth metadata.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
        }
    }
}

impl fmt::Display for ClientAuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Client credentials extracted from a token request.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// The claimed client identifier.
    pub client_id: String,

    /// The presented secret, if any.
    pub client_secret: Option<String>,

    /// Where the credentials came from.
    pub method: ClientAuthMethod,
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("method", &self.method)
            .finish()
    }
}

impl ClientCredentials {
    /// Extracts credentials from the `Authorization` header and body parameters.
    ///
    /// The Basic header takes priority. A body `client_id` alongside it must
    /// name the same client; a body `client_secret` alongside it is an error.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the Basic header is malformed, both
    /// methods carry a secret, the identifiers disagree, or no client_id is
    /// present at all.
    pub fn from_request(
        basic_header: Option<&str>,
        body_client_id: Option<&str>,
        body_client_secret: Option<&str>,
    ) -> AuthResult<Self> {
        // 1. HTTP Basic Auth
        if let Some(header) = basic_header {
            let (client_id, client_secret) = parse_basic_auth(header).ok_or_else(|| {
                AuthError::invalid_request("Malformed Basic authorization header")
            })?;

            if body_client_secret.is_some() {
                return Err(AuthError::invalid_request(
                    "Multiple client authentication methods used",
                ));
            }
            if body_client_id.is_some_and(|id| id != client_id) {
                return Err(AuthError::invalid_request(
                    "client_id in body does not match Authorization header",
                ));
            }

            return Ok(Self {
                client_id,
                client_secret: Some(client_secret),
                method: ClientAuthMethod::ClientSecretBasic,
            });
        }

        // 2. client_secret_post / public client
        let client_id = body_client_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AuthError::invalid_request("client_id is required"))?;

        let method = if body_client_secret.is_some() {
            ClientAuthMethod::ClientSecretPost
        } else {
            ClientAuthMethod::None
        };

        Ok(Self {
            client_id: client_id.to_string(),
            client_secret: body_client_secret.map(str::to_string),
            method,
        })
    }
}

/// Authenticates a client at the token endpoint.
///
/// Public clients presenting no secret authenticate with method `none`.
/// Every other combination must present the registered secret.
///
/// Unknown clients are compared against an Argon2 decoy, matching a registry
/// loaded with the default secret policy. Use
/// [`authenticate_client_with_format`] for registries holding plain secrets.
///
/// # Errors
///
/// - `UnknownClient` if the client is not registered
/// - `SecretMismatch` if the secret is absent, wrong, or presented by a
///   public client
/// - registry and integrity errors from [`lookup_client`]
pub async fn authenticate_client(
    registry: &dyn ClientRegistry,
    credentials: &ClientCredentials,
) -> AuthResult<AuthenticatedClient> {
    authenticate_client_with_format(registry, credentials, SecretFormat::default()).await
}

/// Authenticates a client whose registry stores secrets in `format`.
///
/// # Errors
///
/// See [`authenticate_client`].
///
/// # Security
///
/// An unknown client, or a public client presenting a secret, is refused
/// only after a comparison against a decoy secret in `format`. The refusal
/// takes as long as a wrong secret for a registered client.
#[tracing::instrument(skip_all, fields(client_id = %credentials.client_id, method = %credentials.method))]
pub async fn authenticate_client_with_format(
    registry: &dyn ClientRegistry,
    credentials: &ClientCredentials,
    format: SecretFormat,
) -> AuthResult<AuthenticatedClient> {
    let presented = credentials.client_secret.as_deref().map(str::as_bytes);

    let client = match lookup_client(registry, &credentials.client_id).await {
        Ok(client) => client,
        Err(e @ AuthError::UnknownClient { .. }) => {
            verify_decoy_secret(format, presented);
            return Err(e);
        }
        Err(e) => return Err(e),
    };

    if !client.is_confidential() {
        if presented.is_none() {
            return Ok(AuthenticatedClient {
                client,
                auth_method: ClientAuthMethod::None,
            });
        }
        verify_decoy_secret(format, presented);
        tracing::warn!("Public client presented a secret");
        return Err(AuthError::SecretMismatch);
    }

    if let Err(e) = verify_secret(&client, presented).into_result() {
        tracing::warn!("Client secret verification failed");
        return Err(e);
    }

    tracing::debug!("Client authenticated");
    Ok(AuthenticatedClient {
        client,
        auth_method: credentials.method,
    })
}

/// Parses an HTTP Basic Authorization header value.
///
/// Returns `(client_id, client_secret)` if the header is valid Basic auth.
pub fn parse_basic_auth(header_value: &str) -> Option<(String, String)> {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    let encoded = header_value.trim().strip_prefix("Basic ")?;
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // Split on first colon (secret may contain colons)
    let (client_id, client_secret) = credentials.split_once(':')?;
    if client_id.is_empty() {
        return None;
    }

    Some((client_id.to_string(), client_secret.to_string()))
}
