use crate::error::error_model::AccountError;
use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::SaltString;
use argon2::{Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use secrecy::{ExposeSecret, SecretString};
use tracing::error;

/// Length of every lifecycle token hash.
pub const TOKEN_LENGTH: usize = 32;

const TOKEN_ALPHABET: [char; 62] = [
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j',
    'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '0', '1',
    '2', '3', '4', '5', '6', '7', '8', '9',
];

// No look-alike characters (i, l, o, 0, 1, ...), the password is read from an email.
const PASSWORD_ALPHABET: [char; 52] = [
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v',
    'w', 'x', 'y', 'z', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'K', 'M', 'N', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '2', '3', '4', '5', '6', '7', '8', '9',
];

/// Random bytes straight from the operating system. A missing entropy source
/// panics: the process cannot issue tokens without it.
fn os_random(size: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; size];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Generates an opaque token of `length` characters drawn uniformly from
/// `[A-Za-z0-9]`.
///
/// Each random byte is masked to 6 bits and values outside the 62 letter
/// alphabet are rejected, so there is no modulo bias.
///
/// # Example
///
/// ```rust
/// # use user_accounts::util::crypto_helper::{generate_token, TOKEN_LENGTH};
/// let token = generate_token(TOKEN_LENGTH);
/// assert_eq!(token.len(), 32);
/// assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn generate_token(length: usize) -> String {
    if length == 0 {
        return String::new();
    }
    nanoid::format(os_random, &TOKEN_ALPHABET, length)
}

/// Generates a human friendly password for accounts created without one.
pub fn generate_password(length: usize) -> String {
    if length == 0 {
        return String::new();
    }
    nanoid::format(os_random, &PASSWORD_ALPHABET, length)
}

/// One-way password storage.
pub trait PasswordEncoder: Send + Sync {
    /// Hashes `plaintext` into a self-describing digest.
    fn hash(&self, plaintext: &str) -> Result<String, AccountError>;

    /// Constant-time check of `plaintext` against a stored digest. A digest
    /// that cannot be parsed never matches.
    fn verify(&self, digest: &str, plaintext: &str) -> bool;

    /// Spends the same work as `verify` without a real digest, for unknown
    /// accounts.
    fn dummy_verify(&self, _plaintext: &str) {}
}

/// Argon2id encoder keyed with a server side pepper.
pub struct Argon2Encoder {
    pepper: SecretString,
    params: Params,
    dummy_hash: String,
}

impl Argon2Encoder {
    pub fn new(pepper: SecretString) -> Result<Self, AccountError> {
        Self::with_params(pepper, Params::default())
    }

    /// Same as `new` with explicit cost parameters (tests use cheap ones).
    pub fn with_params(pepper: SecretString, params: Params) -> Result<Self, AccountError> {
        let mut encoder = Self {
            pepper,
            params,
            dummy_hash: String::new(),
        };
        encoder.dummy_hash = encoder.hash(&generate_password(16))?;
        Ok(encoder)
    }

    fn argon2(&self) -> Result<Argon2<'_>, AccountError> {
        Argon2::new_with_secret(
            self.pepper.expose_secret().as_bytes(),
            argon2::Algorithm::Argon2id,
            Version::V0x13,
            self.params.clone(),
        )
        .map_err(|e| {
            error!("Invalid Argon2 configuration: {}", e);
            AccountError::PasswordHash {
                message: e.to_string(),
            }
        })
    }
}

impl PasswordEncoder for Argon2Encoder {
    fn hash(&self, plaintext: &str) -> Result<String, AccountError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = self.argon2()?;
        let password_hash = argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| {
                error!("Error hashing password: {}", e);
                AccountError::PasswordHash {
                    message: e.to_string(),
                }
            })?
            .to_string();
        Ok(password_hash)
    }

    fn verify(&self, digest: &str, plaintext: &str) -> bool {
        let Ok(parsed_hash) = PasswordHash::new(digest) else {
            error!("Stored password digest is not a valid PHC string");
            return false;
        };
        match self.argon2() {
            Ok(argon2) => argon2
                .verify_password(plaintext.as_bytes(), &parsed_hash)
                .is_ok(),
            Err(_) => false,
        }
    }

    fn dummy_verify(&self, plaintext: &str) {
        // Trigger a fake check to avoid returning immediately.
        let _ = self.verify(&self.dummy_hash, plaintext);
    }
}
