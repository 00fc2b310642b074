//! Configuration for client registrations and callback policy.
//!
//! ```toml
//! [callbacks]
//! matching = "exact"                # or "loopback_any_port"
//! redirect_errors_to_default = false
//!
//! [secrets]
//! min_plain_secret_len = 16
//! hash_at_rest = true
//!
//! [[clients]]
//! client_id = "c1"
//! secret = "change-me-please-now"
//! default_callback = "https://a.example/cb"
//! allowed_callbacks = ["https://a.example/cb"]
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::oauth::secret::hash_client_secret;
use crate::types::{AbsoluteUri, CallbackMatching, ClientRecord};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthClientsConfig {
    /// Callback matching and error delivery.
    pub callbacks: CallbackPolicyConfig,

    /// Requirements on configured secrets.
    pub secrets: SecretPolicyConfig,

    /// Statically registered clients.
    pub clients: Vec<ClientRegistration>,
}

/// Callback policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CallbackPolicyConfig {
    /// How requested callbacks are compared with registered ones.
    /// Default: exact.
    pub matching: CallbackMatching,

    /// Whether an unregistered-callback error may be redirected to the
    /// client's default callback. Default: false (errors are shown in-band).
    pub redirect_errors_to_default: bool,
}

/// Secret policy for statically configured clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretPolicyConfig {
    /// Minimum length of a configured plain secret, in bytes.
    /// Default: 16.
    pub min_plain_secret_len: usize,

    /// Hash configured plain secrets with Argon2id when loading them.
    /// Default: true.
    pub hash_at_rest: bool,
}

impl Default for SecretPolicyConfig {
    fn default() -> Self {
        Self {
            min_plain_secret_len: 16,
            hash_at_rest: true,
        }
    }
}

/// A statically configured client.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientRegistration {
    pub client_id: String,

    /// Plain secret. Prefer setting it through the environment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// Pre-computed Argon2id PHC hash, as an alternative to `secret`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_callback: Option<String>,

    pub allowed_callbacks: Vec<String>,
}

impl fmt::Debug for ClientRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistration")
            .field("client_id", &self.client_id)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field(
                "secret_hash",
                &self.secret_hash.as_ref().map(|_| "[REDACTED]"),
            )
            .field("default_callback", &self.default_callback)
            .field("allowed_callbacks", &self.allowed_callbacks)
            .finish()
    }
}

impl ClientRegistration {
    /// Validates the registration against the secret policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the registration is unusable.
    pub fn validate(&self, secrets: &SecretPolicyConfig) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::InvalidValue(
                "clients: client_id cannot be empty".to_string(),
            ));
        }

        let id = &self.client_id;

        if self.secret.is_some() && self.secret_hash.is_some() {
            return Err(ConfigError::InvalidValue(format!(
                "client '{id}': set either secret or secret_hash, not both"
            )));
        }

        if let Some(secret) = &self.secret {
            if secret.len() < secrets.min_plain_secret_len {
                return Err(ConfigError::InvalidValue(format!(
                    "client '{id}': secret must be at least {} bytes",
                    secrets.min_plain_secret_len
                )));
            }
        }

        if self.allowed_callbacks.is_empty() {
            return Err(ConfigError::Missing(format!(
                "client '{id}': allowed_callbacks"
            )));
        }

        for uri in self.default_callback.iter().chain(&self.allowed_callbacks) {
            AbsoluteUri::parse(uri).map_err(|e| {
                ConfigError::InvalidValue(format!("client '{id}': callback '{uri}': {e}"))
            })?;
        }

        Ok(())
    }

    /// Converts the registration into a validated record.
    ///
    /// A plain secret is hashed with Argon2id when `secrets.hash_at_rest` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the registration is invalid or hashing fails.
    pub fn to_record(&self, secrets: &SecretPolicyConfig) -> Result<ClientRecord, ConfigError> {
        self.validate(secrets)?;

        let mut builder = ClientRecord::builder(&self.client_id)
            .allow_callbacks(self.allowed_callbacks.iter().cloned());

        if let Some(default) = &self.default_callback {
            builder = builder.default_callback(default.clone());
        }

        builder = match (&self.secret, &self.secret_hash) {
            (Some(secret), _) if secrets.hash_at_rest => {
                let hash = hash_client_secret(secret).map_err(|e| {
                    ConfigError::InvalidValue(format!(
                        "client '{}': failed to hash secret: {e}",
                        self.client_id
                    ))
                })?;
                builder.secret_hash(hash)
            }
            (Some(secret), _) => builder.secret(secret.as_bytes()),
            (None, Some(hash)) => builder.secret_hash(hash.clone()),
            (None, None) => builder,
        };

        builder
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("client '{}': {e}", self.client_id)))
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration sources could not be read or merged.
    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl OAuthClientsConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - `min_plain_secret_len` is zero
    /// - Two registrations share a client_id
    /// - Any registration is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secrets.min_plain_secret_len == 0 {
            return Err(ConfigError::InvalidValue(
                "secrets.min_plain_secret_len must be > 0".to_string(),
            ));
        }

        let mut seen = std::collections::HashSet::new();
        for registration in &self.clients {
            registration.validate(&self.secrets)?;
            if !seen.insert(registration.client_id.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "duplicate client_id '{}'",
                    registration.client_id
                )));
            }
        }

        Ok(())
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not parse or fails validation.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Load(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

pub mod loader {
    use super::{ConfigError, OAuthClientsConfig};
    use config::{Config, Environment, File};
    use std::path::{Path, PathBuf};

    /// Default configuration file, looked up in the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "oauth-clients.toml";

    /// Environment variable prefix, e.g. `OCTOFHIR_OAUTH__CALLBACKS__MATCHING=loopback_any_port`.
    pub const ENV_PREFIX: &str = "OCTOFHIR_OAUTH";

    /// Loads configuration from a TOML file and environment overrides.
    ///
    /// An explicit `path` must exist. Without one, [`DEFAULT_CONFIG_FILE`]
    /// is used if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, the sources do not merge or
    /// deserialize, or the result fails validation.
    pub fn load_config(path: Option<&Path>) -> Result<OAuthClientsConfig, ConfigError> {
        let mut builder = Config::builder();
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::Missing(format!("config file {}", p.display())));
                }
                builder = builder.add_source(File::from(p.to_path_buf()));
            }
            None => {
                let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    builder = builder.add_source(File::from(default_path));
                }
            }
        }
        // Environment variable overrides, e.g., OCTOFHIR_OAUTH__SECRETS__HASH_AT_REST=false
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| ConfigError::Load(format!("config build error: {e}")))?;
        let merged: OAuthClientsConfig = cfg
            .try_deserialize()
            .map_err(|e| ConfigError::Load(format!("config deserialize error: {e}")))?;
        merged.validate()?;
        tracing::debug!(
            clients = merged.clients.len(),
            "Loaded OAuth clients configuration"
        );
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ClientCredential, ClientSecret};

    fn make_registration() -> ClientRegistration {
        ClientRegistration {
            client_id: "c1".to_string(),
            secret: Some("0123456789abcdef".to_string()),
            default_callback: Some("https://a.example/cb".to_string()),
            allowed_callbacks: vec!["https://a.example/cb".to_string()],
            ..Default::default()
        }
    }

    fn plain_policy() -> SecretPolicyConfig {
        SecretPolicyConfig {
            hash_at_rest: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = OAuthClientsConfig::default();
        assert_eq!(config.callbacks.matching, CallbackMatching::Exact);
        assert!(!config.callbacks.redirect_errors_to_default);
        assert_eq!(config.secrets.min_plain_secret_len, 16);
        assert!(config.secrets.hash_at_rest);
        assert!(config.clients.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_str() {
        let config = OAuthClientsConfig::from_toml_str(
            r#"
            [callbacks]
            matching = "loopback_any_port"

            [[clients]]
            client_id = "c1"
            secret = "0123456789abcdef"
            allowed_callbacks = ["https://a.example/cb"]
            "#,
        )
        .unwrap();
        assert_eq!(config.callbacks.matching, CallbackMatching::LoopbackAnyPort);
        assert_eq!(config.clients.len(), 1);
        assert_eq!(config.clients[0].client_id, "c1");
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut registration = make_registration();
        registration.secret = Some("short".to_string());
        let err = registration.validate(&plain_policy()).unwrap_err();
        assert!(err.to_string().contains("at least 16"));
    }

    #[test]
    fn test_secret_and_hash_rejected() {
        let mut registration = make_registration();
        registration.secret_hash = Some("$argon2id$v=19$...".to_string());
        assert!(registration.validate(&plain_policy()).is_err());
    }

    #[test]
    fn test_relative_callback_rejected() {
        let mut registration = make_registration();
        registration.allowed_callbacks.push("/cb".to_string());
        let err = registration.validate(&plain_policy()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_missing_callbacks_rejected() {
        let mut registration = make_registration();
        registration.allowed_callbacks.clear();
        let err = registration.validate(&plain_policy()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn test_duplicate_client_ids_rejected() {
        let config = OAuthClientsConfig {
            secrets: plain_policy(),
            clients: vec![make_registration(), make_registration()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_to_record_plain() {
        let record = make_registration().to_record(&plain_policy()).unwrap();
        assert_eq!(record.client_id, "c1");
        assert_eq!(
            record.credential,
            ClientCredential::Confidential(ClientSecret::plain(b"0123456789abcdef".to_vec()))
        );
        assert!(record.default_callback.is_some());
    }

    #[test]
    fn test_to_record_hashes_at_rest() {
        let record = make_registration()
            .to_record(&SecretPolicyConfig::default())
            .unwrap();
        assert!(matches!(
            record.credential,
            ClientCredential::Confidential(ClientSecret::Argon2(ref phc)) if phc.starts_with("$argon2id$")
        ));
    }

    #[test]
    fn test_to_record_public() {
        let mut registration = make_registration();
        registration.secret = None;
        let record = registration.to_record(&plain_policy()).unwrap();
        assert!(!record.is_confidential());
    }

    #[test]
    fn test_registration_debug_redacts_secret() {
        let debug = format!("{:?}", make_registration());
        assert!(!debug.contains("0123456789abcdef"));
    }
}
