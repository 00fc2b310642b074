//! Integration tests for the authorization and token endpoint checks.
//!
//! These tests drive the full flow through the public API: registry lookup,
//! callback resolution, then secret verification in a separate request.

use std::sync::Arc;

use octofhir_oauth_clients::prelude::*;
use octofhir_oauth_clients::{ClientCredential, ClientSecret, OAuthClientsConfig};

/// Registry with the two reference clients:
/// - `c1`: secret "s3cr3t", no default, callback `https://app.example/cb`
/// - `c2`: secret "s3cr3t", default and only callback `https://app.example/default`
fn make_registry() -> InMemoryClientRegistry {
    let registry = InMemoryClientRegistry::new();
    registry
        .register(
            ClientRecord::builder("c1")
                .secret("s3cr3t")
                .allow_callback("https://app.example/cb")
                .build()
                .expect("valid c1"),
        )
        .expect("register c1");
    registry
        .register(
            ClientRecord::builder("c2")
                .secret("s3cr3t")
                .default_callback("https://app.example/default")
                .allow_callback("https://app.example/default")
                .build()
                .expect("valid c2"),
        )
        .expect("register c2");
    registry
}

fn make_gate() -> AuthorizationGate {
    AuthorizationGate::new(Arc::new(make_registry()), RedirectValidator::new())
}

// =============================================================================
// Client c1
// =============================================================================

#[tokio::test]
async fn test_c1_registered_callback_accepted() {
    let registry = make_registry();
    let record = lookup_client(&registry, "c1").await.unwrap();

    let resolution = resolve_callback(&record, Some("https://app.example/cb")).unwrap();
    assert_eq!(resolution.outcome(), CallbackOutcome::AcceptedExplicit);
    assert_eq!(
        resolution.effective_callback().map(AbsoluteUri::as_str),
        Some("https://app.example/cb")
    );
}

#[tokio::test]
async fn test_c1_callback_with_extra_query_rejected() {
    let registry = make_registry();
    let record = lookup_client(&registry, "c1").await.unwrap();

    let resolution = resolve_callback(&record, Some("https://app.example/cb?x=1")).unwrap();
    assert_eq!(resolution.outcome(), CallbackOutcome::RejectedNotRegistered);
    assert!(resolution.effective_callback().is_none());
}

#[tokio::test]
async fn test_c1_absent_callback_without_default() {
    let registry = make_registry();
    let record = lookup_client(&registry, "c1").await.unwrap();

    let resolution = resolve_callback(&record, None).unwrap();
    assert_eq!(resolution.outcome(), CallbackOutcome::RejectedNoCallback);
    assert!(resolution.effective_callback().is_none());
}

#[tokio::test]
async fn test_c1_evil_callback_rejected_without_fallback() {
    let registry = make_registry();
    let record = lookup_client(&registry, "c1").await.unwrap();

    let resolution = resolve_callback(&record, Some("https://evil.example/cb")).unwrap();
    assert_eq!(resolution.outcome(), CallbackOutcome::RejectedNotRegistered);
    assert!(resolution.effective_callback().is_none());
}

#[tokio::test]
async fn test_c1_relative_callback_invalid() {
    let registry = make_registry();
    let record = lookup_client(&registry, "c1").await.unwrap();

    let resolution = resolve_callback(&record, Some("/cb")).unwrap();
    assert_eq!(resolution.outcome(), CallbackOutcome::RejectedInvalidUri);
}

#[tokio::test]
async fn test_c1_secret_verification() {
    let registry = make_registry();
    let record = lookup_client(&registry, "c1").await.unwrap();

    assert_eq!(
        verify_secret(&record, Some(b"s3cr3t")),
        SecretVerdict::Accepted
    );
    assert_eq!(
        verify_secret(&record, Some(b"s3cr3T")),
        SecretVerdict::Rejected
    );
    assert_eq!(verify_secret(&record, None), SecretVerdict::Rejected);
}

// =============================================================================
// Client c2
// =============================================================================

#[tokio::test]
async fn test_c2_absent_callback_uses_default() {
    let registry = make_registry();
    let record = lookup_client(&registry, "c2").await.unwrap();

    let resolution = resolve_callback(&record, None).unwrap();
    assert_eq!(resolution.outcome(), CallbackOutcome::AcceptedDefault);
    assert_eq!(
        resolution.effective_callback().map(AbsoluteUri::as_str),
        Some("https://app.example/default")
    );
}

#[tokio::test]
async fn test_c2_default_requested_explicitly() {
    let registry = make_registry();
    let record = lookup_client(&registry, "c2").await.unwrap();

    let resolution = resolve_callback(&record, Some("https://app.example/default")).unwrap();
    assert_eq!(resolution.outcome(), CallbackOutcome::AcceptedExplicit);
}

// =============================================================================
// Unknown clients
// =============================================================================

#[tokio::test]
async fn test_unknown_client_is_distinct_from_unregistered_callback() {
    let gate = make_gate();

    let unknown = gate.authorize_callback("c9", None).await.unwrap_err();
    assert!(matches!(unknown, AuthError::UnknownClient { .. }));

    let unregistered = gate
        .authorize_callback("c1", Some("https://evil.example/cb"))
        .await
        .unwrap_err();
    assert!(matches!(unregistered, AuthError::CallbackNotRegistered));

    assert_ne!(unknown.category(), unregistered.category());
}

// =============================================================================
// Full flow
// =============================================================================

#[tokio::test]
async fn test_authorize_then_token_exchange() {
    let gate = make_gate();

    // Authorization request: identity claimed only.
    let authorized = gate.authorize_callback("c2", None).await.unwrap();
    assert_eq!(authorized.outcome, CallbackOutcome::AcceptedDefault);
    assert_eq!(authorized.callback.as_str(), "https://app.example/default");

    // Token request: the client proves possession of its secret.
    let header = "Basic YzI6czNjcjN0"; // base64("c2:s3cr3t")
    let creds = ClientCredentials::from_request(Some(header), None, None).unwrap();
    let authenticated = gate.authenticate(&creds).await.unwrap();
    assert_eq!(authenticated.client.client_id, "c2");
    assert_eq!(
        authenticated.auth_method,
        ClientAuthMethod::ClientSecretBasic
    );
}

#[tokio::test]
async fn test_token_exchange_wrong_secret() {
    let gate = make_gate();
    let creds = ClientCredentials::from_request(None, Some("c1"), Some("guess")).unwrap();

    let err = gate.authenticate(&creds).await.unwrap_err();
    assert!(matches!(err, AuthError::SecretMismatch));
    assert_eq!(err.oauth_error_code(), "invalid_client");
}

#[tokio::test]
async fn test_gate_from_config_with_hashed_secrets() {
    let config = OAuthClientsConfig::from_toml_str(
        r#"
        [callbacks]
        redirect_errors_to_default = true

        [[clients]]
        client_id = "portal"
        secret = "portal-secret-0123456789"
        default_callback = "https://portal.example/cb"
        allowed_callbacks = ["https://portal.example/cb", "https://portal.example/alt"]
        "#,
    )
    .unwrap();

    let gate = AuthorizationGate::from_registrations(&config).unwrap();
    assert_eq!(gate.secret_format(), SecretFormat::Argon2);

    let (client, resolution) = gate
        .resolve("portal", Some("https://portal.example/other"))
        .await
        .unwrap();
    assert!(matches!(
        client.credential,
        ClientCredential::Confidential(ClientSecret::Argon2(_))
    ));
    assert_eq!(
        gate.validator().error_delivery(&client, &resolution),
        ErrorDelivery::RedirectToDefault(AbsoluteUri::parse("https://portal.example/cb").unwrap())
    );

    let creds =
        ClientCredentials::from_request(None, Some("portal"), Some("portal-secret-0123456789"))
            .unwrap();
    assert!(gate.authenticate(&creds).await.is_ok());
}
