//! Secret key generation.
//!
//! Randomness comes from v4 UUIDs, which draw from the operating system
//! CSPRNG. Bytes 6 and 8 carry the version and variant bits and are skipped.
//! Bytes are mapped onto the alphabet by rejection sampling so every character
//! is equally likely.

use uuid::Uuid;

use crate::domain::error::DomainError;

/// Characters Django's own `get_random_secret_key` draws from.
pub const SECRET_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*(-_=+)";

pub const DEFAULT_SECRET_LENGTH: usize = 50;

// Largest multiple of the alphabet size that fits in a byte.
const ACCEPT_BELOW: u8 = (256 / SECRET_ALPHABET.len() * SECRET_ALPHABET.len()) as u8;

/// Generate a secret of `length` characters.
pub fn generate_secret(length: usize) -> Result<String, DomainError> {
    if length == 0 {
        return Err(DomainError::InvalidParameter {
            name: "secret_length".into(),
            reason: "must be at least 1".into(),
        });
    }

    let mut secret = String::with_capacity(length);
    while secret.len() < length {
        let uuid = Uuid::new_v4();
        let usable = uuid
            .as_bytes()
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 6 && *i != 8)
            .map(|(_, b)| *b)
            .filter(|b| *b < ACCEPT_BELOW);

        for byte in usable {
            secret.push(SECRET_ALPHABET[byte as usize % SECRET_ALPHABET.len()] as char);
            if secret.len() == length {
                break;
            }
        }
    }
    Ok(secret)
}
