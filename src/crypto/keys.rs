//! X25519 key management
//!
//! Link keys authenticate the client to its provider; public keys identify
//! correspondents in the key store. Acknowledgment keys are the one-time
//! secrets the transport hands back for each reliable send.

use std::fmt;

use rand::{RngCore, rngs::OsRng};
use x25519_dalek::{PublicKey as DalekPublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::{KeyError, PRIVATE_KEY_SIZE, PUBLIC_KEY_SIZE};

/// An X25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; PUBLIC_KEY_SIZE]);

impl PublicKey {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; PUBLIC_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Parse from a byte slice of exactly [`PUBLIC_KEY_SIZE`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, KeyError> {
        let raw: [u8; PUBLIC_KEY_SIZE] =
            bytes.try_into().map_err(|_| KeyError::InvalidLength {
                expected: PUBLIC_KEY_SIZE,
                actual: bytes.len(),
            })?;
        Ok(Self(raw))
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(s.trim())?;
        Self::from_slice(&bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.0
    }

    /// Hex encoding of the key.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A static X25519 keypair used as the session's link key.
///
/// The private key is zeroized on drop.
#[derive(Clone)]
pub struct LinkKeypair {
    /// Private key (32 bytes) - zeroized on drop
    private: [u8; PRIVATE_KEY_SIZE],
    /// Public key (32 bytes)
    public: PublicKey,
}

impl LinkKeypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut private = [0u8; PRIVATE_KEY_SIZE];
        OsRng.fill_bytes(&mut private);
        let keypair = Self::from_private_bytes(private);
        private.zeroize();
        keypair
    }

    /// Derive the keypair from existing private key material.
    pub fn from_private_bytes(private: [u8; PRIVATE_KEY_SIZE]) -> Self {
        let secret = StaticSecret::from(private);
        let public = DalekPublicKey::from(&secret);
        Self {
            private: secret.to_bytes(),
            public: PublicKey(*public.as_bytes()),
        }
    }

    /// Load a keypair from a hex-encoded private key.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let mut bytes = hex::decode(s.trim())?;
        let result = <[u8; PRIVATE_KEY_SIZE]>::try_from(bytes.as_slice())
            .map(Self::from_private_bytes)
            .map_err(|_| KeyError::InvalidLength {
                expected: PRIVATE_KEY_SIZE,
                actual: bytes.len(),
            });
        bytes.zeroize();
        result
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        self.public
    }

    /// Get the private key.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn private_key(&self) -> &[u8; PRIVATE_KEY_SIZE] {
        &self.private
    }

    /// Hex encoding of the private key, for persisting the identity.
    pub fn to_hex(&self) -> String {
        hex::encode(self.private)
    }
}

impl fmt::Debug for LinkKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkKeypair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl Drop for LinkKeypair {
    fn drop(&mut self) {
        self.private.zeroize();
    }
}

/// One-time key for decrypting the acknowledgment of a single send.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct AckKey(Vec<u8>);

impl AckKey {
    /// Wrap key bytes produced by the transport.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for AckKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AckKey({} bytes)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypair_generation() {
        let kp1 = LinkKeypair::generate();
        let kp2 = LinkKeypair::generate();

        assert_ne!(kp1.public_key(), kp2.public_key());
        assert_ne!(kp1.private_key(), kp2.private_key());
    }

    #[test]
    fn test_keypair_hex_reload() {
        let kp = LinkKeypair::generate();
        let reloaded = LinkKeypair::from_hex(&kp.to_hex()).unwrap();
        assert_eq!(kp.public_key(), reloaded.public_key());
    }

    #[test]
    fn test_keypair_known_vector() {
        // RFC 7748 section 6.1, Alice's key pair.
        let kp = LinkKeypair::from_hex(
            "77076d0a7318a57d3c16c17251b26645df4c2f87ebc0992ab177fba51db92c2a",
        )
        .unwrap();
        assert_eq!(
            kp.public_key().to_hex(),
            "8520f0098930a754748b7ddcb43ef75a0dbf3a0d26381af4eba4a98eaa9b4e6a"
        );
    }

    #[test]
    fn test_keypair_rejects_bad_input() {
        assert!(matches!(
            LinkKeypair::from_hex("not hex"),
            Err(KeyError::InvalidHex(_))
        ));
        assert_eq!(
            LinkKeypair::from_hex("abcd").unwrap_err(),
            KeyError::InvalidLength {
                expected: PRIVATE_KEY_SIZE,
                actual: 2
            }
        );
    }

    #[test]
    fn test_public_key_from_slice() {
        let key = PublicKey::from_slice(&[7u8; PUBLIC_KEY_SIZE]).unwrap();
        assert_eq!(key.as_bytes(), &[7u8; PUBLIC_KEY_SIZE]);
        assert!(PublicKey::from_slice(&[7u8; 31]).is_err());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let kp = LinkKeypair::generate();
        let debug = format!("{:?}", kp);
        assert!(!debug.contains(&kp.to_hex()));

        let ack = AckKey::new(vec![0xAA; 32]);
        assert_eq!(format!("{:?}", ack), "AckKey(32 bytes)");
    }
}
