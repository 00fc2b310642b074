//! In-memory client registry backed by a concurrent map.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::AuthResult;
use crate::config::{ConfigError, OAuthClientsConfig};
use crate::error::AuthError;
use crate::types::ClientRecord;

use super::ClientRegistry;

/// A [`ClientRegistry`] holding records in a `DashMap`.
#[derive(Debug, Default)]
pub struct InMemoryClientRegistry {
    clients: DashMap<String, ClientRecord>,
}

impl InMemoryClientRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from the static registrations in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or two registrations
    /// share a client identifier.
    pub fn from_config(config: &OAuthClientsConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let registry = Self::new();
        for registration in &config.clients {
            let record = registration.to_record(&config.secrets)?;
            registry.clients.insert(record.client_id.clone(), record);
        }

        tracing::info!(
            clients = registry.len(),
            "Loaded OAuth client registrations"
        );
        Ok(registry)
    }

    /// Registers or replaces a client after validating it.
    ///
    /// Returns the previously registered record, if any.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the record fails validation.
    pub fn register(&self, record: ClientRecord) -> AuthResult<Option<ClientRecord>> {
        record
            .validate()
            .map_err(|e| AuthError::invalid_request(e.to_string()))?;

        tracing::info!(client_id = %record.client_id, "Registered OAuth client");
        Ok(self.clients.insert(record.client_id.clone(), record))
    }

    /// Removes a client, returning its record.
    pub fn remove(&self, client_id: &str) -> Option<ClientRecord> {
        self.clients.remove(client_id).map(|(_, record)| record)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[async_trait]
impl ClientRegistry for InMemoryClientRegistry {
    async fn lookup(&self, client_id: &str) -> AuthResult<Option<ClientRecord>> {
        Ok(self
            .clients
            .get(client_id)
            .map(|entry| entry.value().clone()))
    }
}
