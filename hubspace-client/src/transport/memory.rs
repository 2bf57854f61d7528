//! In-process hub.
//!
//! `MemoryHub` keeps spaces, collections and instances in memory and
//! enforces the same rules a remote hub does: credential checks, challenge
//! signatures, token ownership, schema validation, unique indexes and
//! all-or-nothing batches.

use super::{Challenge, HubTransport, RequestContext, Token};
use crate::error::{HubError, HubResult};
use crate::space::SpaceInfo;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use hubspace_crypto::{Credential, PublicKey};
use hubspace_model::{CollectionConfig, Document, IndexSpec, Query, values_equal};
use hubspace_types::{InstanceId, SpaceId};
use rand::RngCore;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::{debug, info};

struct PendingChallenge {
    identity: PublicKey,
    nonce: String,
}

struct CollectionRecord {
    config: CollectionConfig,
    instances: BTreeMap<String, Document>,
}

struct SpaceRecord {
    info: SpaceInfo,
    collections: BTreeMap<String, CollectionRecord>,
}

#[derive(Default)]
struct HubState {
    apps: HashMap<String, String>,
    offline: bool,
    challenges: HashMap<String, PendingChallenge>,
    tokens: HashMap<String, PublicKey>,
    spaces: BTreeMap<SpaceId, SpaceRecord>,
}

impl HubState {
    fn ensure_online(&self) -> HubResult<()> {
        if self.offline {
            return Err(HubError::Network("hub unreachable".to_string()));
        }
        Ok(())
    }

    fn check_credential(&self, credential: &Credential) -> HubResult<()> {
        let secret = self
            .apps
            .get(credential.key())
            .ok_or_else(|| HubError::Authentication("unknown application key".to_string()))?;

        match credential {
            Credential::Static(c) if c.secret() == secret => Ok(()),
            Credential::Static(_) => Err(HubError::Authentication(
                "application secret does not match".to_string(),
            )),
            Credential::Signed(c) => Ok(c.verify(secret, Utc::now())?),
        }
    }

    /// Returns the identity the request acts for.
    fn caller(&self, ctx: &RequestContext) -> HubResult<PublicKey> {
        self.ensure_online()?;
        self.check_credential(&ctx.credential)?;
        match self.tokens.get(ctx.token.value()) {
            Some(identity) if *identity == ctx.token.identity() => Ok(*identity),
            _ => Err(HubError::Authentication("token rejected".to_string())),
        }
    }

    fn space(&self, id: SpaceId) -> HubResult<&SpaceRecord> {
        self.spaces
            .get(&id)
            .ok_or_else(|| HubError::NotFound(format!("space {id}")))
    }

    fn space_mut(&mut self, id: SpaceId) -> HubResult<&mut SpaceRecord> {
        self.spaces
            .get_mut(&id)
            .ok_or_else(|| HubError::NotFound(format!("space {id}")))
    }

    fn collection(&self, space: SpaceId, name: &str) -> HubResult<&CollectionRecord> {
        self.space(space)?
            .collections
            .get(name)
            .ok_or_else(|| HubError::NotFound(format!("collection {name}")))
    }

    fn collection_mut(&mut self, space: SpaceId, name: &str) -> HubResult<&mut CollectionRecord> {
        self.space_mut(space)?
            .collections
            .get_mut(name)
            .ok_or_else(|| HubError::NotFound(format!("collection {name}")))
    }
}

/// A hub that lives in the current process.
///
/// ```
/// # tokio_test::block_on(async {
/// use hubspace_client::{MemoryHub, Session};
/// use hubspace_crypto::{resolve_static_credential, Identity};
/// use std::sync::Arc;
///
/// let hub = Arc::new(MemoryHub::with_api_key("app", "s3cret"));
/// let credential = resolve_static_credential("app", "s3cret").unwrap();
/// let session = Session::connect(hub, credential).await.unwrap();
/// let user = session.authorize(&Identity::random()).await.unwrap();
/// let space = user.create_space(Some("notes"), None).await.unwrap();
/// assert!(user.list_spaces().await.unwrap().iter().any(|s| s.id == space.id()));
/// # });
/// ```
#[derive(Default)]
pub struct MemoryHub {
    state: Mutex<HubState>,
}

impl MemoryHub {
    /// Creates a hub with no registered applications.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a hub that accepts one application key.
    pub fn with_api_key(key: impl Into<String>, secret: impl Into<String>) -> Self {
        let mut state = HubState::default();
        state.apps.insert(key.into(), secret.into());
        Self {
            state: Mutex::new(state),
        }
    }

    /// Registers another application key.
    pub async fn register_api_key(&self, key: impl Into<String>, secret: impl Into<String>) {
        self.state.lock().await.apps.insert(key.into(), secret.into());
    }

    /// Makes every call fail with a network error while `offline` is set.
    pub async fn set_offline(&self, offline: bool) {
        self.state.lock().await.offline = offline;
    }

    /// Invalidates every issued token.
    pub async fn revoke_tokens(&self) {
        let mut state = self.state.lock().await;
        let count = state.tokens.len();
        state.tokens.clear();
        info!(count, "Revoked hub tokens");
    }

    /// Number of tokens currently accepted.
    pub async fn token_count(&self) -> usize {
        self.state.lock().await.tokens.len()
    }
}

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn check_indexes(indexes: &[IndexSpec]) -> HubResult<()> {
    let mut seen = HashSet::new();
    for index in indexes {
        if index.field.trim().is_empty() {
            return Err(HubError::InvalidSchema("index field is empty".to_string()));
        }
        if !seen.insert(index.field.as_str()) {
            return Err(HubError::InvalidSchema(format!(
                "duplicate index on `{}`",
                index.field
            )));
        }
    }
    Ok(())
}

fn check_definition(config: &CollectionConfig) -> HubResult<()> {
    if config.name.trim().is_empty() {
        return Err(HubError::InvalidSchema("collection name is empty".to_string()));
    }
    config.schema.check_definition()?;
    check_indexes(&config.indexes)
}

/// Fails with `AlreadyExists` if two instances share a value on a unique index.
fn check_unique<'a, I>(indexes: &[IndexSpec], instances: I) -> HubResult<()>
where
    I: Iterator<Item = &'a Document> + Clone,
{
    for index in indexes.iter().filter(|i| i.unique) {
        let mut seen: Vec<&Value> = Vec::new();
        for instance in instances.clone() {
            let Some(value) = instance.get(&index.field) else {
                continue;
            };
            if seen.iter().any(|s| values_equal(s, value)) {
                return Err(HubError::AlreadyExists(format!(
                    "unique index `{}` already holds {value}",
                    index.field
                )));
            }
            seen.push(value);
        }
    }
    Ok(())
}

fn instance_id(instance: &Document) -> HubResult<String> {
    instance
        .id()
        .map(str::to_string)
        .ok_or_else(|| HubError::SchemaViolation {
            instance: String::new(),
            reasons: vec!["_id: expected string".to_string()],
        })
}

#[async_trait]
impl HubTransport for MemoryHub {
    async fn verify_credential(&self, credential: &Credential) -> HubResult<()> {
        let state = self.state.lock().await;
        state.ensure_online()?;
        state.check_credential(credential)
    }

    async fn token_challenge(
        &self,
        credential: &Credential,
        identity: &PublicKey,
    ) -> HubResult<Challenge> {
        let mut state = self.state.lock().await;
        state.ensure_online()?;
        state.check_credential(credential)?;
        if !credential.authorizes(identity) {
            return Err(HubError::Authentication(format!(
                "credential is not valid for identity {identity}"
            )));
        }

        let challenge = Challenge {
            id: random_token(),
            nonce: random_token(),
        };
        state.challenges.insert(
            challenge.id.clone(),
            PendingChallenge {
                identity: *identity,
                nonce: challenge.nonce.clone(),
            },
        );
        Ok(challenge)
    }

    async fn issue_token(
        &self,
        credential: &Credential,
        identity: &PublicKey,
        challenge: &Challenge,
        signature: &[u8],
    ) -> HubResult<Token> {
        let mut state = self.state.lock().await;
        state.ensure_online()?;
        state.check_credential(credential)?;

        let pending = state
            .challenges
            .remove(&challenge.id)
            .ok_or_else(|| HubError::Authentication("unknown or used challenge".to_string()))?;
        if pending.identity != *identity || pending.nonce != challenge.nonce {
            return Err(HubError::Authentication(
                "challenge was issued for another identity".to_string(),
            ));
        }
        identity.verify(pending.nonce.as_bytes(), signature)?;

        let token = Token::new(random_token(), *identity);
        state.tokens.insert(token.value().to_string(), *identity);
        debug!(%identity, "Issued token");
        Ok(token)
    }

    async fn new_space(
        &self,
        ctx: &RequestContext,
        id: SpaceId,
        name: Option<&str>,
    ) -> HubResult<SpaceInfo> {
        let mut state = self.state.lock().await;
        let caller = state.caller(ctx)?;

        if let Some(existing) = state.spaces.get(&id) {
            if existing.info.owner == caller {
                return Ok(existing.info.clone());
            }
            return Err(HubError::AlreadyExists(format!("space {id}")));
        }

        let info = SpaceInfo {
            id,
            name: name.map(str::to_string),
            created_at: Utc::now(),
            owner: caller,
            peers: 1,
            addresses: vec![format!("/memory/{id}")],
        };
        state.spaces.insert(
            id,
            SpaceRecord {
                info: info.clone(),
                collections: BTreeMap::new(),
            },
        );
        info!(space = %id, "Created space");
        Ok(info)
    }

    async fn space_info(&self, ctx: &RequestContext, id: SpaceId) -> HubResult<SpaceInfo> {
        let state = self.state.lock().await;
        state.caller(ctx)?;
        Ok(state.space(id)?.info.clone())
    }

    async fn list_spaces(&self, ctx: &RequestContext) -> HubResult<Vec<SpaceInfo>> {
        let state = self.state.lock().await;
        let caller = state.caller(ctx)?;
        Ok(state
            .spaces
            .values()
            .filter(|s| s.info.owner == caller)
            .map(|s| s.info.clone())
            .collect())
    }

    async fn new_collection(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        config: &CollectionConfig,
    ) -> HubResult<()> {
        let mut state = self.state.lock().await;
        state.caller(ctx)?;
        let record = state.space_mut(space)?;
        if record.collections.contains_key(&config.name) {
            return Err(HubError::AlreadyExists(format!("collection {}", config.name)));
        }
        check_definition(config)?;

        let mut config = config.clone();
        config.schema = config.schema.with_required_id();
        record.collections.insert(
            config.name.clone(),
            CollectionRecord {
                config,
                instances: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn update_collection(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        config: &CollectionConfig,
    ) -> HubResult<()> {
        let mut state = self.state.lock().await;
        state.caller(ctx)?;
        let record = state.collection_mut(space, &config.name)?;
        check_definition(config)?;
        check_unique(&config.indexes, record.instances.values()).map_err(|e| match e {
            HubError::AlreadyExists(msg) => {
                HubError::InvalidSchema(format!("stored instances conflict: {msg}"))
            }
            other => other,
        })?;

        let mut config = config.clone();
        config.schema = config.schema.with_required_id();
        record.config = config;
        Ok(())
    }

    async fn delete_collection(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        name: &str,
    ) -> HubResult<()> {
        let mut state = self.state.lock().await;
        state.caller(ctx)?;
        state
            .space_mut(space)?
            .collections
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| HubError::NotFound(format!("collection {name}")))
    }

    async fn list_collections(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
    ) -> HubResult<Vec<CollectionConfig>> {
        let state = self.state.lock().await;
        state.caller(ctx)?;
        Ok(state
            .space(space)?
            .collections
            .values()
            .map(|c| c.config.clone())
            .collect())
    }

    async fn collection_info(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        name: &str,
    ) -> HubResult<CollectionConfig> {
        let state = self.state.lock().await;
        state.caller(ctx)?;
        Ok(state.collection(space, name)?.config.clone())
    }

    async fn create_instances(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        instances: &[Document],
    ) -> HubResult<Vec<InstanceId>> {
        let mut state = self.state.lock().await;
        state.caller(ctx)?;
        let record = state.collection_mut(space, collection)?;

        let mut staged = Vec::with_capacity(instances.len());
        let mut batch_ids = HashSet::new();
        for instance in instances {
            let mut instance = instance.clone();
            if instance.needs_id() {
                instance.set_id(InstanceId::new());
            }
            record.config.schema.validate(&instance)?;
            let id = instance_id(&instance)?;
            if record.instances.contains_key(&id) || !batch_ids.insert(id.clone()) {
                return Err(HubError::AlreadyExists(format!("instance {id}")));
            }
            staged.push((id, instance));
        }
        check_unique(
            &record.config.indexes,
            record.instances.values().chain(staged.iter().map(|(_, d)| d)),
        )?;

        let mut ids = Vec::with_capacity(staged.len());
        for (id, instance) in staged {
            let assigned = InstanceId::try_from(id.clone())
                .map_err(|e| HubError::Protocol(e.to_string()))?;
            ids.push(assigned);
            record.instances.insert(id, instance);
        }
        debug!(collection, count = ids.len(), "Created instances");
        Ok(ids)
    }

    async fn save_instances(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        instances: &[Document],
    ) -> HubResult<()> {
        let mut state = self.state.lock().await;
        state.caller(ctx)?;
        let record = state.collection_mut(space, collection)?;

        let mut staged: BTreeMap<String, Document> = BTreeMap::new();
        for instance in instances {
            let id = instance_id(instance)?;
            if !record.instances.contains_key(&id) {
                return Err(HubError::NotFound(format!("instance {id}")));
            }
            record.config.schema.validate(instance)?;
            if staged.insert(id.clone(), instance.clone()).is_some() {
                return Err(HubError::AlreadyExists(format!("instance {id} appears twice")));
            }
        }
        check_unique(
            &record.config.indexes,
            record
                .instances
                .iter()
                .filter(|(id, _)| !staged.contains_key(*id))
                .map(|(_, d)| d)
                .chain(staged.values()),
        )?;

        record.instances.extend(staged);
        Ok(())
    }

    async fn delete_instances(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        ids: &[InstanceId],
    ) -> HubResult<()> {
        let mut state = self.state.lock().await;
        state.caller(ctx)?;
        let record = state.collection_mut(space, collection)?;

        if let Some(missing) = ids.iter().find(|id| !record.instances.contains_key(id.as_str())) {
            return Err(HubError::NotFound(format!("instance {missing}")));
        }
        for id in ids {
            record.instances.remove(id.as_str());
        }
        Ok(())
    }

    async fn find_instances(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        query: &Query,
    ) -> HubResult<Vec<Document>> {
        let state = self.state.lock().await;
        state.caller(ctx)?;
        Ok(state
            .collection(space, collection)?
            .instances
            .values()
            .filter(|d| query.matches(d))
            .cloned()
            .collect())
    }

    async fn find_instance_by_id(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        id: &InstanceId,
    ) -> HubResult<Document> {
        let state = self.state.lock().await;
        state.caller(ctx)?;
        state
            .collection(space, collection)?
            .instances
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| HubError::NotFound(format!("instance {id}")))
    }

    async fn list_indexes(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
    ) -> HubResult<Vec<IndexSpec>> {
        let state = self.state.lock().await;
        state.caller(ctx)?;
        Ok(state.collection(space, collection)?.config.indexes.clone())
    }
}
