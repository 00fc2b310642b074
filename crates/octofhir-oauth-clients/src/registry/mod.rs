//! Client registry.
//!
//! Defines the read interface for looking up client registrations and the
//! [`lookup_client`] entry point that turns a lookup into a checked
//! [`ClientRecord`]. Persistent implementations live with the storage
//! backend; [`InMemoryClientRegistry`] serves tests and statically
//! configured deployments.

pub mod memory;

use async_trait::async_trait;

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::ClientRecord;

pub use memory::InMemoryClientRegistry;

// =============================================================================
// Client Registry Trait
// =============================================================================

/// Read access to registered OAuth 2.0 clients.
///
/// # Example
///
/// ```ignore
/// use octofhir_oauth_clients::registry::ClientRegistry;
///
/// async fn example(registry: &impl ClientRegistry) {
///     if let Some(client) = registry.lookup("my-app").await? {
///         println!("default callback: {:?}", client.default_callback);
///     }
/// }
/// ```
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    /// Find a client by its identifier.
    ///
    /// Returns `None` if no such client is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn lookup(&self, client_id: &str) -> AuthResult<Option<ClientRecord>>;
}

/// Looks up a client and checks the returned record.
///
/// # Errors
///
/// - `UnknownClient` if the registry has no such client
/// - `Integrity` if the registry returned a record for a different
///   identifier, or a record that fails validation
/// - any error returned by the registry itself
#[tracing::instrument(skip_all, fields(client_id = %client_id))]
pub async fn lookup_client(
    registry: &dyn ClientRegistry,
    client_id: &str,
) -> AuthResult<ClientRecord> {
    let Some(record) = registry.lookup(client_id).await? else {
        tracing::debug!("Client not found");
        return Err(AuthError::unknown_client(client_id));
    };

    if record.client_id != client_id {
        tracing::warn!(
            returned_client_id = %record.client_id,
            "Registry returned a record for a different client"
        );
        return Err(AuthError::integrity(
            "registry returned a mismatched client record",
        ));
    }

    if let Err(e) = record.validate() {
        tracing::warn!(error = %e, "Registered client record is invalid");
        return Err(AuthError::integrity(format!("invalid client record: {e}")));
    }

    Ok(record)
}

// =============================================================================
// Tests
// =============================================================================
