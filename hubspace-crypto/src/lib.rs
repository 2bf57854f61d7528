//! Identities and credentials for talking to a hub.
//!
//! - [`Identity`]: an ed25519 keypair that signs token challenges
//! - [`Credential`]: either a static application key/secret pair or a
//!   time-bound assertion signed with the application secret
//!
//! Nothing here touches the network or persists key material.

mod credential;
mod error;
mod identity;

pub use credential::{
    resolve_signed_credential, resolve_signed_credential_at, resolve_static_credential,
    signed_message, Credential, SignedCredential, StaticCredential,
};
pub use error::{CryptoError, CryptoResult};
pub use identity::{Identity, PublicKey, PUBLIC_KEY_SIZE, SEED_SIZE, SIGNATURE_SIZE};
