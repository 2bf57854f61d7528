//! Transport layer abstraction.
//!
//! A [`HubTransport`] carries the logical hub calls. Sessions never talk to
//! the network directly, so the same client code runs against a remote hub
//! ([`HttpTransport`]) or an in-process one ([`MemoryHub`]).

mod http;
mod memory;

pub use http::HttpTransport;
pub use memory::MemoryHub;

use crate::error::HubResult;
use crate::space::SpaceInfo;
use async_trait::async_trait;
use hubspace_crypto::{Credential, PublicKey};
use hubspace_model::{CollectionConfig, Document, IndexSpec, Query};
use hubspace_types::{InstanceId, SpaceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A token issued by the hub for one identity.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "token")]
    value: String,
    identity: PublicKey,
}

impl Token {
    pub fn new(value: impl Into<String>, identity: PublicKey) -> Self {
        Self {
            value: value.into(),
            identity,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// The identity this token acts for.
    pub fn identity(&self) -> PublicKey {
        self.identity
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"[REDACTED]")
            .field("identity", &self.identity)
            .finish()
    }
}

/// A one-time challenge the identity must sign to obtain a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    /// Bytes to sign, as sent by the hub.
    pub nonce: String,
}

/// Credential and token presented with an identity-scoped call.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub credential: Credential,
    pub token: Token,
}

/// The logical calls a hub answers.
#[async_trait]
pub trait HubTransport: Send + Sync {
    /// Checks that the hub accepts `credential`.
    async fn verify_credential(&self, credential: &Credential) -> HubResult<()>;

    /// Requests a token challenge for `identity`.
    async fn token_challenge(
        &self,
        credential: &Credential,
        identity: &PublicKey,
    ) -> HubResult<Challenge>;

    /// Exchanges a signed challenge for a token.
    async fn issue_token(
        &self,
        credential: &Credential,
        identity: &PublicKey,
        challenge: &Challenge,
        signature: &[u8],
    ) -> HubResult<Token>;

    /// Creates a space, or returns it if the caller already owns it.
    async fn new_space(
        &self,
        ctx: &RequestContext,
        id: SpaceId,
        name: Option<&str>,
    ) -> HubResult<SpaceInfo>;

    async fn space_info(&self, ctx: &RequestContext, id: SpaceId) -> HubResult<SpaceInfo>;

    /// Spaces owned by the caller, ordered by id.
    async fn list_spaces(&self, ctx: &RequestContext) -> HubResult<Vec<SpaceInfo>>;

    async fn new_collection(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        config: &CollectionConfig,
    ) -> HubResult<()>;

    /// Replaces a collection's schema and indexes in one step.
    async fn update_collection(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        config: &CollectionConfig,
    ) -> HubResult<()>;

    async fn delete_collection(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        name: &str,
    ) -> HubResult<()>;

    async fn list_collections(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
    ) -> HubResult<Vec<CollectionConfig>>;

    async fn collection_info(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        name: &str,
    ) -> HubResult<CollectionConfig>;

    /// Inserts a batch. Either every instance is stored or none is.
    async fn create_instances(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        instances: &[Document],
    ) -> HubResult<Vec<InstanceId>>;

    /// Replaces existing instances. Either every instance is stored or none is.
    async fn save_instances(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        instances: &[Document],
    ) -> HubResult<()>;

    async fn delete_instances(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        ids: &[InstanceId],
    ) -> HubResult<()>;

    async fn find_instances(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        query: &Query,
    ) -> HubResult<Vec<Document>>;

    async fn find_instance_by_id(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        id: &InstanceId,
    ) -> HubResult<Document>;

    async fn list_indexes(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
    ) -> HubResult<Vec<IndexSpec>>;
}
