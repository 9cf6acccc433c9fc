//! Hash functions and key derivation for the SCRAM mechanisms.

use base64::{engine::general_purpose::STANDARD as Base64, Engine};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2;
use sha1::{Digest, Sha1 as Sha1_hash};
use sha2::Sha256 as Sha256_hash;

use crate::error::MechanismError;

/// Generate a nonce for SCRAM authentication.
pub fn generate_nonce() -> Result<String, MechanismError> {
    let mut data = [0u8; 32];
    getrandom::getrandom(&mut data)?;
    Ok(Base64.encode(data))
}

/// A trait which defines the needed methods for SCRAM.
pub trait ScramProvider: Send {
    /// The name of the hash function.
    fn name() -> &'static str;

    /// A function which hashes the data using the hash function.
    fn hash(data: &[u8]) -> Vec<u8>;

    /// A function which performs an HMAC using the hash function.
    fn hmac(data: &[u8], key: &[u8]) -> Result<Vec<u8>, MechanismError>;

    /// A function which does PBKDF2 key derivation using the hash function.
    fn derive(password: &str, salt: &[u8], iterations: u32) -> Result<Vec<u8>, MechanismError>;
}

/// A `ScramProvider` which provides SCRAM-SHA-1
pub struct Sha1;

impl ScramProvider for Sha1 {
    fn name() -> &'static str {
        "SHA-1"
    }

    fn hash(data: &[u8]) -> Vec<u8> {
        Sha1_hash::digest(data).to_vec()
    }

    fn hmac(data: &[u8], key: &[u8]) -> Result<Vec<u8>, MechanismError> {
        type HmacSha1 = Hmac<Sha1_hash>;
        let mut mac = HmacSha1::new_from_slice(key)?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn derive(password: &str, salt: &[u8], iterations: u32) -> Result<Vec<u8>, MechanismError> {
        let mut result = vec![0; 20];
        pbkdf2::<Hmac<Sha1_hash>>(password.as_bytes(), salt, iterations, &mut result)?;
        Ok(result)
    }
}

/// A `ScramProvider` which provides SCRAM-SHA-256
pub struct Sha256;

impl ScramProvider for Sha256 {
    fn name() -> &'static str {
        "SHA-256"
    }

    fn hash(data: &[u8]) -> Vec<u8> {
        Sha256_hash::digest(data).to_vec()
    }

    fn hmac(data: &[u8], key: &[u8]) -> Result<Vec<u8>, MechanismError> {
        type HmacSha256 = Hmac<Sha256_hash>;
        let mut mac = HmacSha256::new_from_slice(key)?;
        mac.update(data);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    fn derive(password: &str, salt: &[u8], iterations: u32) -> Result<Vec<u8>, MechanismError> {
        let mut result = vec![0; 32];
        pbkdf2::<Hmac<Sha256_hash>>(password.as_bytes(), salt, iterations, &mut result)?;
        Ok(result)
    }
}
