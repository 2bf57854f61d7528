//! User identities.
//!
//! An identity is an ed25519 keypair. Its canonical string form is
//! `base64url(seed || public)` without padding, 64 bytes before encoding.
//! The public half travels on its own as `base64url(public)`.

use crate::error::{CryptoError, CryptoResult};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroizing;

/// Size of the secret seed in bytes.
pub const SEED_SIZE: usize = 32;

/// Size of a public key in bytes.
pub const PUBLIC_KEY_SIZE: usize = 32;

/// Size of a signature in bytes.
pub const SIGNATURE_SIZE: usize = 64;

/// A cryptographic identity used to authenticate against a hub.
///
/// The secret half is zeroized on drop and never printed by `Debug`.
#[derive(Clone)]
pub struct Identity {
    signing_key: SigningKey,
}

impl Identity {
    /// Generates a fresh identity from the OS random number generator.
    #[must_use]
    pub fn random() -> Self {
        let mut seed = Zeroizing::new([0u8; SEED_SIZE]);
        rand::rngs::OsRng.fill_bytes(&mut seed[..]);
        Self::from_seed(&seed)
    }

    /// Builds an identity from a 32-byte secret seed.
    #[must_use]
    pub fn from_seed(seed: &[u8; SEED_SIZE]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Returns the public half of this identity.
    #[must_use]
    pub fn public(&self) -> PublicKey {
        PublicKey {
            bytes: self.signing_key.verifying_key().to_bytes(),
        }
    }

    /// Signs `message` with the identity's secret key.
    #[must_use]
    pub fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl PartialEq for Identity {
    fn eq(&self, other: &Self) -> bool {
        self.public() == other.public()
    }
}

impl Eq for Identity {}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("public", &self.public().to_string())
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut raw = Zeroizing::new([0u8; SEED_SIZE + PUBLIC_KEY_SIZE]);
        raw[..SEED_SIZE].copy_from_slice(self.signing_key.as_bytes());
        raw[SEED_SIZE..].copy_from_slice(self.signing_key.verifying_key().as_bytes());
        f.write_str(&URL_SAFE_NO_PAD.encode(&raw[..]))
    }
}

impl FromStr for Identity {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(s.trim())
                .map_err(|e| CryptoError::MalformedIdentity(format!("invalid base64: {e}")))?,
        );

        if raw.len() != SEED_SIZE + PUBLIC_KEY_SIZE {
            return Err(CryptoError::MalformedIdentity(format!(
                "expected {} bytes, got {}",
                SEED_SIZE + PUBLIC_KEY_SIZE,
                raw.len()
            )));
        }

        let mut seed = Zeroizing::new([0u8; SEED_SIZE]);
        seed.copy_from_slice(&raw[..SEED_SIZE]);
        let identity = Self::from_seed(&seed);

        if identity.public().as_bytes()[..] != raw[SEED_SIZE..] {
            return Err(CryptoError::MalformedIdentity(
                "public key does not match secret seed".to_string(),
            ));
        }

        Ok(identity)
    }
}

/// The public half of an [`Identity`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicKey {
    bytes: [u8; PUBLIC_KEY_SIZE],
}

impl PublicKey {
    /// Returns the raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_SIZE] {
        &self.bytes
    }

    /// Verifies an ed25519 signature over `message`.
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> CryptoResult<()> {
        let key = VerifyingKey::from_bytes(&self.bytes)
            .map_err(|_| CryptoError::MalformedIdentity("invalid public key".to_string()))?;
        let signature =
            Signature::from_slice(signature).map_err(|_| CryptoError::InvalidSignature)?;
        key.verify(message, &signature)
            .map_err(|_| CryptoError::InvalidSignature)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({self})")
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(self.bytes))
    }
}

impl FromStr for PublicKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = URL_SAFE_NO_PAD
            .decode(s.trim())
            .map_err(|e| {
                CryptoError::MalformedIdentity(format!("invalid public key base64: {e}"))
            })?;
        let bytes: [u8; PUBLIC_KEY_SIZE] = raw.as_slice().try_into().map_err(|_| {
            CryptoError::MalformedIdentity(format!(
                "public key must be {PUBLIC_KEY_SIZE} bytes, got {}",
                raw.len()
            ))
        })?;
        VerifyingKey::from_bytes(&bytes)
            .map_err(|_| CryptoError::MalformedIdentity("not an ed25519 point".to_string()))?;
        Ok(Self { bytes })
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
