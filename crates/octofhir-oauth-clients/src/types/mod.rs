//! Domain types shared by the registry, the redirect validator and the
//! secret verifier.
//!
//! ## Domain Types
//!
//! - [`ClientRecord`] - Registered OAuth 2.0 client
//! - [`ClientCredential`] - Public or confidential client kind
//! - [`AbsoluteUri`] - Normalized absolute callback URI
//! - [`CallbackMatching`] - How requested callbacks are compared

pub mod callback;
pub mod client;

pub use callback::{AbsoluteUri, CallbackMatching, UriError};
pub use client::{
    ClientCredential, ClientRecord, ClientRecordBuilder, ClientSecret, ClientValidationError,
    SecretBytes,
};
