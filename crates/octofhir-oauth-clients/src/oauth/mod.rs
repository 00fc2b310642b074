//! OAuth 2.0 client checks for the authorization and token endpoints.
//!
//! - [`redirect`] - Callback resolution for authorization requests
//! - [`secret`] - Client secret verification, generation and hashing
//! - [`client_auth`] - Credential extraction and client authentication
//! - [`gate`] - Facade combining registry lookup with the checks above

pub mod client_auth;
pub mod gate;
pub mod redirect;
pub mod secret;

pub use client_auth::{
    AuthenticatedClient, ClientAuthMethod, ClientCredentials, authenticate_client,
    authenticate_client_with_format, parse_basic_auth,
};
pub use gate::{AuthorizationGate, AuthorizedCallback};
pub use redirect::{
    CallbackOutcome, CallbackResolution, ErrorDelivery, RedirectValidator, resolve_callback,
};
pub use secret::{
    SecretFormat, SecretVerdict, generate_client_secret, hash_client_secret, verify_decoy_secret,
    verify_secret,
};
