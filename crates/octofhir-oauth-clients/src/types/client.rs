//! OAuth 2.0 client records.
//!
//! A [`ClientRecord`] is the registered description of a client: its
//! identifier, its credential, an optional default callback and the set of
//! callbacks it may request. Records are plain data; the redirect validator
//! and secret verifier only ever borrow them.

use std::collections::BTreeSet;
use std::fmt;

use argon2::password_hash::PasswordHash;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::callback::{AbsoluteUri, CallbackMatching, UriError};

// =============================================================================
// Secret Material
// =============================================================================

/// Raw secret bytes. `Debug` never prints the contents.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    /// Wraps raw secret bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Returns the secret bytes.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBytes([REDACTED])")
    }
}

impl Serialize for SecretBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for SecretBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map(Self).map_err(serde::de::Error::custom)
    }
}

/// How a confidential client's secret is held.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", content = "value", rename_all = "snake_case")]
pub enum ClientSecret {
    /// The secret itself (hex-encoded when serialized).
    Plain(SecretBytes),

    /// An Argon2id PHC string, as produced by
    /// [`hash_client_secret`](crate::oauth::secret::hash_client_secret).
    Argon2(String),
}

impl ClientSecret {
    /// Creates a plain secret from bytes.
    #[must_use]
    pub fn plain(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Plain(SecretBytes::new(bytes))
    }

    /// Creates a secret from a stored Argon2 PHC hash.
    #[must_use]
    pub fn argon2(phc: impl Into<String>) -> Self {
        Self::Argon2(phc.into())
    }

    /// Returns `true` if there is no secret material at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Plain(bytes) => bytes.is_empty(),
            Self::Argon2(phc) => phc.is_empty(),
        }
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain(_) => f.write_str("Plain([REDACTED])"),
            Self::Argon2(_) => f.write_str("Argon2([REDACTED])"),
        }
    }
}

/// Whether a client holds a shared secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "secret", rename_all = "snake_case")]
pub enum ClientCredential {
    /// No secret; secret verification always fails for such clients.
    Public,

    /// A client able to keep a secret.
    Confidential(ClientSecret),
}

impl ClientCredential {
    /// Returns the secret of a confidential client.
    #[must_use]
    pub fn secret(&self) -> Option<&ClientSecret> {
        match self {
            Self::Public => None,
            Self::Confidential(secret) => Some(secret),
        }
    }
}

// =============================================================================
// Client Record
// =============================================================================

/// A registered OAuth 2.0 client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRecord {
    /// Registry key and the identifier clients present.
    pub client_id: String,

    /// Credential used at the token endpoint.
    pub credential: ClientCredential,

    /// Callback used when a request names none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_callback: Option<AbsoluteUri>,

    /// Callbacks a request may name. The default callback is not implied;
    /// it must be listed here to be requested explicitly.
    pub allowed_callbacks: BTreeSet<AbsoluteUri>,
}

impl ClientRecord {
    /// Starts building a record for `client_id`.
    #[must_use]
    pub fn builder(client_id: impl Into<String>) -> ClientRecordBuilder {
        ClientRecordBuilder::new(client_id)
    }

    /// Validates the record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record is unusable for authorization.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.client_id.is_empty() {
            return Err(ClientValidationError::EmptyClientId);
        }

        if self.allowed_callbacks.is_empty() {
            return Err(ClientValidationError::NoAllowedCallbacks);
        }

        if let ClientCredential::Confidential(secret) = &self.credential {
            if secret.is_empty() {
                return Err(ClientValidationError::EmptySecret);
            }
            if let ClientSecret::Argon2(phc) = secret {
                PasswordHash::new(phc).map_err(|_| ClientValidationError::MalformedSecretHash)?;
            }
        }

        Ok(())
    }

    /// Checks if `uri` is one of the registered callbacks.
    #[must_use]
    pub fn is_callback_allowed(&self, uri: &AbsoluteUri) -> bool {
        self.allowed_callbacks.contains(uri)
    }

    /// Checks if `uri` matches a registered callback under `matching`.
    #[must_use]
    pub fn is_callback_allowed_with(&self, uri: &AbsoluteUri, matching: CallbackMatching) -> bool {
        match matching {
            CallbackMatching::Exact => self.is_callback_allowed(uri),
            CallbackMatching::LoopbackAnyPort => self
                .allowed_callbacks
                .iter()
                .any(|registered| uri.matches(registered, matching)),
        }
    }

    /// Returns `true` if the client holds a secret.
    #[must_use]
    pub fn is_confidential(&self) -> bool {
        matches!(self.credential, ClientCredential::Confidential(_))
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`ClientRecord`] that parses callbacks and validates the result.
#[derive(Debug, Clone)]
pub struct ClientRecordBuilder {
    client_id: String,
    credential: ClientCredential,
    default_callback: Option<String>,
    allowed_callbacks: Vec<String>,
}

impl ClientRecordBuilder {
    /// Creates a builder for a public client.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            credential: ClientCredential::Public,
            default_callback: None,
            allowed_callbacks: Vec::new(),
        }
    }

    /// Sets a plain shared secret, making the client confidential.
    #[must_use]
    pub fn secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.credential = ClientCredential::Confidential(ClientSecret::plain(secret));
        self
    }

    /// Sets an Argon2 PHC hash as the secret, making the client confidential.
    #[must_use]
    pub fn secret_hash(mut self, phc: impl Into<String>) -> Self {
        self.credential = ClientCredential::Confidential(ClientSecret::argon2(phc));
        self
    }

    /// Sets the credential directly.
    #[must_use]
    pub fn credential(mut self, credential: ClientCredential) -> Self {
        self.credential = credential;
        self
    }

    /// Sets the default callback.
    #[must_use]
    pub fn default_callback(mut self, uri: impl Into<String>) -> Self {
        self.default_callback = Some(uri.into());
        self
    }

    /// Adds an allowed callback.
    #[must_use]
    pub fn allow_callback(mut self, uri: impl Into<String>) -> Self {
        self.allowed_callbacks.push(uri.into());
        self
    }

    /// Adds several allowed callbacks.
    #[must_use]
    pub fn allow_callbacks<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_callbacks
            .extend(uris.into_iter().map(Into::into));
        self
    }

    /// Parses the callbacks and validates the record.
    ///
    /// # Errors
    ///
    /// Returns an error if any callback is not an absolute URI or the
    /// resulting record fails [`ClientRecord::validate`].
    pub fn build(self) -> Result<ClientRecord, ClientValidationError> {
        let default_callback = self
            .default_callback
            .map(|uri| parse_callback(&uri))
            .transpose()?;

        let allowed_callbacks = self
            .allowed_callbacks
            .iter()
            .map(|uri| parse_callback(uri))
            .collect::<Result<BTreeSet<_>, _>>()?;

        let record = ClientRecord {
            client_id: self.client_id,
            credential: self.credential,
            default_callback,
            allowed_callbacks,
        };
        record.validate()?;
        Ok(record)
    }
}

fn parse_callback(uri: &str) -> Result<AbsoluteUri, ClientValidationError> {
    AbsoluteUri::parse(uri).map_err(|source| ClientValidationError::InvalidCallback {
        uri: uri.to_string(),
        source,
    })
}

// =============================================================================
// Validation Error
// =============================================================================

/// Errors that can occur during client validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientValidationError {
    /// Client ID cannot be empty.
    #[error("Client ID cannot be empty")]
    EmptyClientId,

    /// At least one allowed callback is required.
    #[error("At least one allowed callback is required")]
    NoAllowedCallbacks,

    /// Confidential clients require a non-empty secret.
    #[error("Confidential clients require a non-empty secret")]
    EmptySecret,

    /// The stored secret hash is not a valid PHC string.
    #[error("Client secret hash is not a valid PHC string")]
    MalformedSecretHash,

    /// A callback is not an absolute URI.
    #[error("Invalid callback '{uri}': {source}")]
    InvalidCallback {
        /// The offending callback as configured.
        uri: String,
        /// Why it was rejected.
        #[source]
        source: UriError,
    },
}

// =============================================================================
// Tests
// =============================================================================
