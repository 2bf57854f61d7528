//! Credential resolution.
//!
//! A session is opened with exactly one of two credential kinds:
//!
//! - [`StaticCredential`]: an application key and secret, sent as-is
//! - [`SignedCredential`]: an application key plus an HMAC-SHA256 assertion
//!   over `"{identity}:{expiration}"`, keyed with the application secret.
//!   The secret itself never leaves the resolver.
//!
//! Signed credentials are bound to one identity and are rejected once the
//! current time passes their expiration.

use crate::error::{CryptoError, CryptoResult};
use crate::identity::{Identity, PublicKey};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use std::time::Duration;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Application key and secret pair.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct StaticCredential {
    key: String,
    secret: String,
}

impl StaticCredential {
    /// Returns the application key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the application secret.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredential")
            .field("key", &self.key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Time-bound assertion signed with the application secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCredential {
    key: String,
    identity: PublicKey,
    signature: String,
    signed_message: String,
    expiration: DateTime<Utc>,
}

impl SignedCredential {
    /// Reassembles a signed credential from its transmitted parts.
    ///
    /// Nothing is verified here; see [`SignedCredential::verify`].
    #[must_use]
    pub fn from_parts(
        key: impl Into<String>,
        identity: PublicKey,
        signature: impl Into<String>,
        signed_message: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            key: key.into(),
            identity,
            signature: signature.into(),
            signed_message: signed_message.into(),
            expiration,
        }
    }

    /// Returns the application key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the identity this credential is bound to.
    #[must_use]
    pub fn identity(&self) -> PublicKey {
        self.identity
    }

    /// Returns the base64url HMAC signature.
    #[must_use]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Returns the exact message that was signed.
    #[must_use]
    pub fn signed_message(&self) -> &str {
        &self.signed_message
    }

    /// Returns the expiration timestamp.
    #[must_use]
    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    /// Verifies the signature against `secret` and checks expiry at `now`.
    ///
    /// This is the check a hub performs; clients only hold the signature.
    pub fn verify(&self, secret: &str, now: DateTime<Utc>) -> CryptoResult<()> {
        if self.signed_message != signed_message(&self.identity, self.expiration) {
            return Err(CryptoError::InvalidSignature);
        }

        let signature = URL_SAFE_NO_PAD
            .decode(&self.signature)
            .map_err(|_| CryptoError::InvalidSignature)?;
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| CryptoError::InvalidSignature)?;
        mac.update(self.signed_message.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| CryptoError::InvalidSignature)?;

        self.check_fresh(now)
    }

    /// Fails with [`CryptoError::CredentialExpired`] once `now` is past the expiration.
    pub fn check_fresh(&self, now: DateTime<Utc>) -> CryptoResult<()> {
        if now > self.expiration {
            return Err(CryptoError::CredentialExpired {
                expired_at: self.expiration,
            });
        }
        Ok(())
    }
}

/// The credential a session is established with.
#[derive(Debug, Clone)]
pub enum Credential {
    /// Application key and secret.
    Static(StaticCredential),
    /// Identity-bound, time-limited assertion.
    Signed(SignedCredential),
}

impl Credential {
    /// Returns the application key carried by either kind.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Static(c) => c.key(),
            Self::Signed(c) => c.key(),
        }
    }

    /// Returns the expiration, if this credential has one.
    #[must_use]
    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Static(_) => None,
            Self::Signed(c) => Some(c.expiration()),
        }
    }

    /// Returns true if this credential may act for `identity`.
    ///
    /// Static credentials are application-wide; signed ones name a single identity.
    #[must_use]
    pub fn authorizes(&self, identity: &PublicKey) -> bool {
        match self {
            Self::Static(_) => true,
            Self::Signed(c) => c.identity() == *identity,
        }
    }

    /// Fails if this credential has expired at `now`.
    pub fn check_fresh(&self, now: DateTime<Utc>) -> CryptoResult<()> {
        match self {
            Self::Static(_) => Ok(()),
            Self::Signed(c) => c.check_fresh(now),
        }
    }
}

impl From<StaticCredential> for Credential {
    fn from(c: StaticCredential) -> Self {
        Self::Static(c)
    }
}

impl From<SignedCredential> for Credential {
    fn from(c: SignedCredential) -> Self {
        Self::Signed(c)
    }
}

/// Builds the message a signed credential covers.
///
/// The expiration is rendered as RFC 3339 with millisecond precision.
#[must_use]
pub fn signed_message(identity: &PublicKey, expiration: DateTime<Utc>) -> String {
    format!(
        "{identity}:{}",
        expiration.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

/// Resolves a static application credential.
///
/// # Errors
///
/// Returns [`CryptoError::MissingCredential`] if `key` or `secret` is blank.
pub fn resolve_static_credential(key: &str, secret: &str) -> CryptoResult<Credential> {
    let key = require("key", key)?;
    let secret = require("secret", secret)?;
    Ok(Credential::Static(StaticCredential { key, secret }))
}

/// Resolves a signed credential for `identity`, valid for `ttl` from now.
///
/// # Errors
///
/// Returns [`CryptoError::MissingCredential`] if `key` or `secret` is blank.
pub fn resolve_signed_credential(
    key: &str,
    secret: &str,
    identity: &Identity,
    ttl: Duration,
) -> CryptoResult<Credential> {
    resolve_signed_credential_at(key, secret, identity, ttl, Utc::now())
}

/// Like [`resolve_signed_credential`], with an explicit issue time.
pub fn resolve_signed_credential_at(
    key: &str,
    secret: &str,
    identity: &Identity,
    ttl: Duration,
    now: DateTime<Utc>,
) -> CryptoResult<Credential> {
    let key = require("key", key)?;
    require("secret", secret)?;

    let ttl = TimeDelta::from_std(ttl).map_err(|e| CryptoError::InvalidTtl(e.to_string()))?;
    let expiration = now
        .checked_add_signed(ttl)
        .ok_or_else(|| CryptoError::InvalidTtl("expiration overflows".to_string()))?;
    // Truncate to the precision the signed message carries.
    let expiration = DateTime::from_timestamp_millis(expiration.timestamp_millis())
        .ok_or_else(|| CryptoError::InvalidTtl("expiration out of range".to_string()))?;

    let public = identity.public();
    let message = signed_message(&public, expiration);

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| CryptoError::MissingCredential("secret"))?;
    mac.update(message.as_bytes());
    let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(Credential::Signed(SignedCredential {
        key,
        identity: public,
        signature,
        signed_message: message,
        expiration,
    }))
}

/// Rejects blank values; accepted values are kept exactly as given.
fn require(field: &'static str, value: &str) -> CryptoResult<String> {
    if value.trim().is_empty() {
        return Err(CryptoError::MissingCredential(field));
    }
    Ok(value.to_string())
}
