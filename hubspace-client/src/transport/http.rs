//! HTTP/JSON hub transport.
//!
//! Every call is a JSON request under `{api_base_url}/v1`. The credential
//! travels in `x-hub-key` plus either `x-hub-secret` (static) or
//! `x-hub-sig` / `x-hub-sig-msg` (signed); identity-scoped calls add the
//! token as bearer auth.

use super::{Challenge, HubTransport, RequestContext, Token};
use crate::config::HubConfig;
use crate::error::{HubError, HubResult};
use crate::space::SpaceInfo;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hubspace_crypto::{Credential, PublicKey};
use hubspace_model::{CollectionConfig, Document, IndexSpec, Query};
use hubspace_types::{InstanceId, SpaceId};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const HEADER_KEY: &str = "x-hub-key";
const HEADER_SECRET: &str = "x-hub-secret";
const HEADER_SIG: &str = "x-hub-sig";
const HEADER_SIG_MSG: &str = "x-hub-sig-msg";

#[derive(Debug, Serialize)]
struct ChallengeRequest<'a> {
    identity: &'a PublicKey,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    challenge: &'a str,
    identity: &'a PublicKey,
    signature: String,
}

#[derive(Debug, Serialize)]
struct NewSpaceRequest<'a> {
    id: SpaceId,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SpaceList {
    spaces: Vec<SpaceInfo>,
}

#[derive(Debug, Deserialize)]
struct CollectionList {
    collections: Vec<CollectionConfig>,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    indexes: Vec<IndexSpec>,
}

#[derive(Debug, Serialize)]
struct InstancesRequest<'a> {
    instances: &'a [Document],
}

#[derive(Debug, Deserialize)]
struct InstanceList {
    instances: Vec<Document>,
}

#[derive(Debug, Deserialize)]
struct CreatedIds {
    ids: Vec<InstanceId>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    ids: &'a [InstanceId],
}

#[derive(Debug, Serialize)]
struct FindRequest<'a> {
    query: &'a Query,
}

/// Error body returned by the hub on non-success statuses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    instance: Option<String>,
    #[serde(default)]
    reasons: Vec<String>,
}

/// Hub transport over HTTP.
pub struct HttpTransport {
    config: HubConfig,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport from `config`.
    pub fn new(config: HubConfig) -> HubResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| HubError::Configuration(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1{path}", self.config.api_base_url.trim_end_matches('/'))
    }

    fn space_url(&self, space: SpaceId, rest: &str) -> String {
        self.url(&format!("/spaces/{space}{rest}"))
    }

    fn collection_url(&self, space: SpaceId, collection: &str, rest: &str) -> String {
        self.space_url(
            space,
            &format!("/collections/{}{rest}", urlencoding::encode(collection)),
        )
    }

    fn with_credential(request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        let request = request.header(HEADER_KEY, credential.key());
        match credential {
            Credential::Static(c) => request.header(HEADER_SECRET, c.secret()),
            Credential::Signed(c) => request
                .header(HEADER_SIG, c.signature())
                .header(HEADER_SIG_MSG, c.signed_message()),
        }
    }

    fn authorized(request: RequestBuilder, ctx: &RequestContext) -> RequestBuilder {
        Self::with_credential(request, &ctx.credential).bearer_auth(ctx.token.value())
    }

    async fn send(request: RequestBuilder, what: &str) -> HubResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| HubError::Network(format!("{what} failed: {e}")))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(%status, error = %e, "{what}: failed to read error body");
                String::new()
            }
        };
        warn!(%status, "{what} rejected by hub");
        Err(status_error(status, &body))
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> HubResult<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| HubError::Network(format!("{what}: failed to read response: {e}")))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| HubError::Protocol(format!("{what}: undecodable response: {e}")))
    }
}

/// Maps a non-success status and its body to a [`HubError`].
fn status_error(status: StatusCode, body: &str) -> HubError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed.message.clone().unwrap_or_else(|| {
        if body.trim().is_empty() {
            status.to_string()
        } else {
            body.trim().to_string()
        }
    });

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => HubError::Authentication(message),
        StatusCode::NOT_FOUND => HubError::NotFound(message),
        StatusCode::CONFLICT => HubError::AlreadyExists(message),
        StatusCode::UNPROCESSABLE_ENTITY if parsed.code.as_deref() == Some("invalid_schema") => {
            HubError::InvalidSchema(message)
        }
        StatusCode::UNPROCESSABLE_ENTITY => HubError::SchemaViolation {
            instance: parsed.instance.unwrap_or_default(),
            reasons: if parsed.reasons.is_empty() {
                vec![message]
            } else {
                parsed.reasons
            },
        },
        StatusCode::BAD_REQUEST => HubError::InvalidSchema(message),
        s if s.is_server_error() => HubError::Network(format!("hub returned {s}: {message}")),
        s => HubError::Protocol(format!("unexpected status {s}: {message}")),
    }
}

#[async_trait]
impl HubTransport for HttpTransport {
    async fn verify_credential(&self, credential: &Credential) -> HubResult<()> {
        debug!("Verifying credential");
        let url = self.url("/credentials/verify");
        let request = Self::with_credential(self.client.get(url), credential);
        Self::send(request, "credential check").await?;
        Ok(())
    }

    async fn token_challenge(
        &self,
        credential: &Credential,
        identity: &PublicKey,
    ) -> HubResult<Challenge> {
        let url = self.url("/tokens/challenge");
        let request = Self::with_credential(self.client.post(url), credential)
            .json(&ChallengeRequest { identity });
        let response = Self::send(request, "token challenge").await?;
        Self::decode(response, "token challenge").await
    }

    async fn issue_token(
        &self,
        credential: &Credential,
        identity: &PublicKey,
        challenge: &Challenge,
        signature: &[u8],
    ) -> HubResult<Token> {
        let body = TokenRequest {
            challenge: &challenge.id,
            identity,
            signature: URL_SAFE_NO_PAD.encode(signature),
        };
        let url = self.url("/tokens");
        let request = Self::with_credential(self.client.post(url), credential).json(&body);
        let response = Self::send(request, "token issue").await?;
        Self::decode(response, "token issue").await
    }

    async fn new_space(
        &self,
        ctx: &RequestContext,
        id: SpaceId,
        name: Option<&str>,
    ) -> HubResult<SpaceInfo> {
        let request = Self::authorized(self.client.post(self.url("/spaces")), ctx)
            .json(&NewSpaceRequest { id, name });
        let response = Self::send(request, "create space").await?;
        Self::decode(response, "create space").await
    }

    async fn space_info(&self, ctx: &RequestContext, id: SpaceId) -> HubResult<SpaceInfo> {
        let request = Self::authorized(self.client.get(self.space_url(id, "")), ctx);
        let response = Self::send(request, "space info").await?;
        Self::decode(response, "space info").await
    }

    async fn list_spaces(&self, ctx: &RequestContext) -> HubResult<Vec<SpaceInfo>> {
        let request = Self::authorized(self.client.get(self.url("/spaces")), ctx);
        let response = Self::send(request, "list spaces").await?;
        let list: SpaceList = Self::decode(response, "list spaces").await?;
        Ok(list.spaces)
    }

    async fn new_collection(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        config: &CollectionConfig,
    ) -> HubResult<()> {
        let url = self.space_url(space, "/collections");
        let request = Self::authorized(self.client.post(url), ctx).json(config);
        Self::send(request, "create collection").await?;
        Ok(())
    }

    async fn update_collection(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        config: &CollectionConfig,
    ) -> HubResult<()> {
        let url = self.collection_url(space, &config.name, "");
        let request = Self::authorized(self.client.put(url), ctx).json(config);
        Self::send(request, "update collection").await?;
        Ok(())
    }

    async fn delete_collection(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        name: &str,
    ) -> HubResult<()> {
        let url = self.collection_url(space, name, "");
        let request = Self::authorized(self.client.delete(url), ctx);
        Self::send(request, "delete collection").await?;
        Ok(())
    }

    async fn list_collections(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
    ) -> HubResult<Vec<CollectionConfig>> {
        let request = Self::authorized(self.client.get(self.space_url(space, "/collections")), ctx);
        let response = Self::send(request, "list collections").await?;
        let list: CollectionList = Self::decode(response, "list collections").await?;
        Ok(list.collections)
    }

    async fn collection_info(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        name: &str,
    ) -> HubResult<CollectionConfig> {
        let request = Self::authorized(self.client.get(self.collection_url(space, name, "")), ctx);
        let response = Self::send(request, "collection info").await?;
        Self::decode(response, "collection info").await
    }

    async fn create_instances(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        instances: &[Document],
    ) -> HubResult<Vec<InstanceId>> {
        let url = self.collection_url(space, collection, "/instances");
        let request =
            Self::authorized(self.client.post(url), ctx).json(&InstancesRequest { instances });
        let response = Self::send(request, "create instances").await?;
        let created: CreatedIds = Self::decode(response, "create instances").await?;
        if created.ids.len() != instances.len() {
            return Err(HubError::Protocol(format!(
                "hub returned {} ids for {} instances",
                created.ids.len(),
                instances.len()
            )));
        }
        Ok(created.ids)
    }

    async fn save_instances(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        instances: &[Document],
    ) -> HubResult<()> {
        let url = self.collection_url(space, collection, "/instances");
        let request =
            Self::authorized(self.client.put(url), ctx).json(&InstancesRequest { instances });
        Self::send(request, "save instances").await?;
        Ok(())
    }

    async fn delete_instances(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        ids: &[InstanceId],
    ) -> HubResult<()> {
        let url = self.collection_url(space, collection, "/instances");
        let request = Self::authorized(self.client.delete(url), ctx).json(&DeleteRequest { ids });
        Self::send(request, "delete instances").await?;
        Ok(())
    }

    async fn find_instances(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        query: &Query,
    ) -> HubResult<Vec<Document>> {
        let url = self.collection_url(space, collection, "/instances/find");
        let request = Self::authorized(self.client.post(url), ctx).json(&FindRequest { query });
        let response = Self::send(request, "find instances").await?;
        let list: InstanceList = Self::decode(response, "find instances").await?;
        Ok(list.instances)
    }

    async fn find_instance_by_id(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
        id: &InstanceId,
    ) -> HubResult<Document> {
        let rest = format!("/instances/{}", urlencoding::encode(id.as_str()));
        let url = self.collection_url(space, collection, &rest);
        let request = Self::authorized(self.client.get(url), ctx);
        let response = Self::send(request, "find instance").await?;
        Self::decode(response, "find instance").await
    }

    async fn list_indexes(
        &self,
        ctx: &RequestContext,
        space: SpaceId,
        collection: &str,
    ) -> HubResult<Vec<IndexSpec>> {
        let url = self.collection_url(space, collection, "/indexes");
        let request = Self::authorized(self.client.get(url), ctx);
        let response = Self::send(request, "list indexes").await?;
        let list: IndexList = Self::decode(response, "list indexes").await?;
        Ok(list.indexes)
    }
}
