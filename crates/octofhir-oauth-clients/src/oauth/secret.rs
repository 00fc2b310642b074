//! Client secret generation, hashing and verification.
//!
//! # Security
//!
//! - Generated secrets are 256-bit random values with a `cs_` prefix
//! - Plain secrets are compared as SHA-256 digests with a constant-time
//!   equality, so neither the mismatch position nor the length leaks
//! - Hashed secrets use Argon2id with an OsRng salt, in PHC string format
//! - Secret material is never logged
//! - A request that fails before a secret is compared (unknown client,
//!   public client) still pays for one comparison against a decoy record

use std::collections::BTreeSet;
use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::AuthResult;
use crate::error::AuthError;
use crate::types::{ClientCredential, ClientRecord, ClientSecret};

/// Storage format of the secrets a registry holds.
///
/// Selects which decoy [`verify_decoy_secret`] compares against, so that a
/// rejected request costs the same as a real comparison would.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SecretFormat {
    /// Secrets stored as raw bytes.
    Plain,

    /// Secrets stored as Argon2id PHC hashes.
    #[default]
    Argon2,
}

impl SecretFormat {
    /// Returns the format a registry loaded with this hashing policy holds.
    #[must_use]
    pub fn from_hash_at_rest(hash_at_rest: bool) -> Self {
        if hash_at_rest {
            Self::Argon2
        } else {
            Self::Plain
        }
    }
}

static PLAIN_DECOY: LazyLock<ClientRecord> =
    LazyLock::new(|| decoy_record(ClientSecret::plain(generate_client_secret())));

static ARGON2_DECOY: LazyLock<ClientRecord> = LazyLock::new(|| {
    let secret = match hash_client_secret(&generate_client_secret()) {
        Ok(phc) => ClientSecret::argon2(phc),
        Err(e) => {
            tracing::error!(error = %e, "Failed to hash decoy client secret");
            ClientSecret::plain(generate_client_secret())
        }
    };
    decoy_record(secret)
});

fn decoy_record(secret: ClientSecret) -> ClientRecord {
    ClientRecord {
        client_id: "decoy".to_string(),
        credential: ClientCredential::Confidential(secret),
        default_callback: None,
        allowed_callbacks: BTreeSet::new(),
    }
}

/// Result of checking a presented secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretVerdict {
    Accepted,
    Rejected,
}

impl SecretVerdict {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Converts a rejection into [`AuthError::SecretMismatch`].
    ///
    /// # Errors
    ///
    /// Returns `SecretMismatch` if the verdict is `Rejected`.
    pub fn into_result(self) -> AuthResult<()> {
        match self {
            Self::Accepted => Ok(()),
            Self::Rejected => Err(AuthError::SecretMismatch),
        }
    }
}

/// Checks a presented secret against the client's registered secret.
///
/// An absent or empty secret is always rejected, as is any secret presented
/// for a public client. Plain secrets are compared in constant time; Argon2
/// hashes are checked with the Argon2 verifier.
#[must_use]
pub fn verify_secret(record: &ClientRecord, presented: Option<&[u8]>) -> SecretVerdict {
    let Some(presented) = presented.filter(|p| !p.is_empty()) else {
        return SecretVerdict::Rejected;
    };

    let secret = match &record.credential {
        ClientCredential::Public => return SecretVerdict::Rejected,
        ClientCredential::Confidential(secret) => secret,
    };

    let matched = match secret {
        ClientSecret::Plain(expected) => {
            !expected.is_empty() && constant_time_eq(expected.expose(), presented)
        }
        ClientSecret::Argon2(phc) => match PasswordHash::new(phc) {
            Ok(parsed) => Argon2::default()
                .verify_password(presented, &parsed)
                .is_ok(),
            Err(e) => {
                tracing::warn!(
                    client_id = %record.client_id,
                    error = %e,
                    "Stored client secret hash is malformed"
                );
                false
            }
        },
    };

    if matched {
        SecretVerdict::Accepted
    } else {
        SecretVerdict::Rejected
    }
}

/// Compares two byte strings in time independent of their contents and lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let a = Sha256::digest(a);
    let b = Sha256::digest(b);
    a.as_slice().ct_eq(b.as_slice()).into()
}

/// Compares `presented` against a random secret stored in `format`.
///
/// Always rejects. Used where a request is refused without a registered
/// secret to compare against, so that the refusal takes as long as a wrong
/// secret would.
pub fn verify_decoy_secret(format: SecretFormat, presented: Option<&[u8]>) -> SecretVerdict {
    let decoy = match format {
        SecretFormat::Plain => &*PLAIN_DECOY,
        SecretFormat::Argon2 => &*ARGON2_DECOY,
    };
    let _ = std::hint::black_box(verify_secret(decoy, presented));
    SecretVerdict::Rejected
}

/// Generates a new client secret.
///
/// # Format
///
/// `cs_{64 hex characters}` (67 characters total)
#[must_use]
pub fn generate_client_secret() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    format!("cs_{}", hex::encode(bytes))
}

/// Hashes a client secret for storage using Argon2id.
///
/// # Errors
///
/// Returns `argon2::password_hash::Error` if hashing fails.
pub fn hash_client_secret(secret: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(secret.as_bytes(), &salt)?;
    Ok(hash.to_string())
}
