use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use rand::RngCore;
use sha2::{Digest, Sha256};

const NONCE_SIZE: usize = 12;

/// AES-256-GCM cipher for connection credentials. The nonce is prepended to
/// the ciphertext. Constructed once at startup and injected wherever
/// credentials are written or used; plaintext never crosses a storage or
/// logging boundary.
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    pub fn new(master_key: &[u8]) -> Result<Self> {
        if master_key.len() != 32 {
            return Err(anyhow::anyhow!(
                "Master key must be 32 bytes, got {}",
                master_key.len()
            ));
        }

        let cipher = Aes256Gcm::new_from_slice(master_key)
            .map_err(|err| anyhow::anyhow!("Invalid master key length: {:?}", err))?;

        Ok(Self { cipher })
    }

    /// Build a cipher from the `LEADFLOW_MASTER_KEY` passphrase. A 64-char
    /// hex string is used as the raw key; any other string is hashed with
    /// SHA-256 to derive one.
    pub fn from_passphrase(passphrase: &str) -> Result<Self> {
        if passphrase.trim().is_empty() {
            return Err(anyhow::anyhow!("Master key passphrase must not be empty"));
        }
        if passphrase.len() == 64
            && let Ok(raw) = hex::decode(passphrase)
        {
            return Self::new(&raw);
        }
        let digest = Sha256::digest(passphrase.as_bytes());
        Self::new(&digest)
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let mut ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|err| anyhow::anyhow!("Failed to encrypt credentials: {:?}", err))?;
        let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        output.extend_from_slice(&nonce_bytes);
        output.append(&mut ciphertext);
        Ok(output)
    }

    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        if ciphertext.len() < NONCE_SIZE {
            return Err(anyhow::anyhow!("Ciphertext is too short"));
        }

        let (nonce_bytes, payload) = ciphertext.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, payload)
            .map_err(|err| anyhow::anyhow!("Failed to decrypt credentials: {:?}", err))?;
        Ok(plaintext)
    }

    /// Encrypt a credential string for storage, base64-encoded for JSON
    /// transport.
    pub fn encrypt_string(&self, plaintext: &str) -> Result<String> {
        Ok(STANDARD.encode(self.encrypt(plaintext.as_bytes())?))
    }

    pub fn decrypt_string(&self, encoded: &str) -> Result<String> {
        let ciphertext = STANDARD.decode(encoded)?;
        let plaintext = self.decrypt(&ciphertext)?;
        Ok(String::from_utf8(plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        [0xAB; 32]
    }

    #[test]
    fn roundtrip() {
        let cipher = CredentialCipher::new(&test_key()).unwrap();
        let plaintext = b"{\"token\":\"sk-test\"}";
        let ciphertext = cipher.encrypt(plaintext).unwrap();
        let decrypted = cipher.decrypt(&ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn string_roundtrip() {
        let cipher = CredentialCipher::from_passphrase("local-dev-key").unwrap();
        let encoded = cipher.encrypt_string("secret value").unwrap();
        assert_ne!(encoded, "secret value");
        assert_eq!(cipher.decrypt_string(&encoded).unwrap(), "secret value");
    }

    #[test]
    fn hex_passphrase_used_verbatim() {
        let hex_key = "ab".repeat(32);
        let a = CredentialCipher::from_passphrase(&hex_key).unwrap();
        let b = CredentialCipher::new(&test_key()).unwrap();
        let ciphertext = a.encrypt_string("x").unwrap();
        assert_eq!(b.decrypt_string(&ciphertext).unwrap(), "x");
    }

    #[test]
    fn wrong_key_size_rejected() {
        let key = [0u8; 31];
        let err = CredentialCipher::new(&key).err().expect("31 bytes must fail");
        assert!(err.to_string().contains("32"), "{err}");
    }

    #[test]
    fn tampered_ciphertext_rejected() {
        let cipher = CredentialCipher::new(&test_key()).unwrap();
        let mut ciphertext = cipher.encrypt(b"sensitive").unwrap();
        let idx = NONCE_SIZE + 1;
        ciphertext[idx] ^= 0xFF;
        assert!(cipher.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn different_key_cannot_decrypt() {
        let a = CredentialCipher::new(&[0x11; 32]).unwrap();
        let b = CredentialCipher::new(&[0x22; 32]).unwrap();
        let ciphertext = a.encrypt(b"payload").unwrap();
        assert!(b.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn empty_passphrase_rejected() {
        assert!(CredentialCipher::from_passphrase("  ").is_err());
    }
}
