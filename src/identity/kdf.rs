//! Password hashing: PBKDF2-HMAC-SHA256, 100,000 iterations, 32-byte output,
//! stored as `salt_hex$hash_hex` --- mirrors the hex-newtype convention the
//! rest of the pack uses for content-addressed hashes.

use hmac::Hmac;
use rand::RngCore;
use sha2::Sha256;

const OUTPUT_LEN: usize = 32;
const SALT_LEN: usize = 16;

/// A validated password hash: `<salt-hex>$<hash-hex>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PasswordHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

pub fn hash_password(password: &str, iterations: u32) -> PasswordHash {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    PasswordHash(encode(password, &salt, iterations))
}

pub fn verify_password(password: &str, stored: &PasswordHash, iterations: u32) -> bool {
    let Some((salt_hex, expected_hex)) = stored.0.split_once('$') else { return false };
    let Ok(salt) = hex::decode(salt_hex) else { return false };
    let derived = derive(password, &salt, iterations);
    hex::encode(derived) == expected_hex
}

fn encode(password: &str, salt: &[u8], iterations: u32) -> String {
    format!("{}${}", hex::encode(salt), hex::encode(derive(password, salt, iterations)))
}

fn derive(password: &str, salt: &[u8], iterations: u32) -> [u8; OUTPUT_LEN] {
    let mut out = [0u8; OUTPUT_LEN];
    pbkdf2::pbkdf2::<Hmac<Sha256>>(password.as_bytes(), salt, iterations, &mut out)
        .expect("fixed-size output buffer matches algorithm requirements");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_correct_and_rejects_incorrect_password() {
        let hash = hash_password("hunter2", 1000);
        assert!(verify_password("hunter2", &hash, 1000));
        assert!(!verify_password("wrong", &hash, 1000));
    }

    #[test]
    fn two_hashes_of_same_password_differ_by_salt() {
        let a = hash_password("same", 1000);
        let b = hash_password("same", 1000);
        assert_ne!(a.as_str(), b.as_str());
    }
}
