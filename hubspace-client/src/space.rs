//! Spaces: independently addressable logical databases on a hub.

use crate::error::HubResult;
use crate::session::UserSession;
use chrono::{DateTime, Utc};
use hubspace_crypto::PublicKey;
use hubspace_types::SpaceId;
use serde::{Deserialize, Serialize};
use tracing::info;

/// What the hub reports about a space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceInfo {
    pub id: SpaceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Identity that created the space.
    pub owner: PublicKey,
    /// Number of hub peers replicating the space.
    #[serde(default)]
    pub peers: u32,
    /// Addresses the space can be reached at.
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// A space opened by one identity.
///
/// Handles only carry identifiers. Two handles to the same space see the
/// same collections and instances.
#[derive(Debug, Clone)]
pub struct SpaceHandle {
    pub(crate) user: UserSession,
    id: SpaceId,
}

impl SpaceHandle {
    pub fn id(&self) -> SpaceId {
        self.id
    }

    /// The identity-scoped session this handle acts through.
    pub fn user(&self) -> &UserSession {
        &self.user
    }

    /// Fetches the current [`SpaceInfo`].
    pub async fn info(&self) -> HubResult<SpaceInfo> {
        self.user.space_info(self.id).await
    }
}

impl UserSession {
    /// Creates a space owned by this identity.
    ///
    /// With a `seed`, the id is derived from it, so repeating the call returns
    /// the same space. A seeded id already owned by another identity fails
    /// with `AlreadyExists`.
    pub async fn create_space(
        &self,
        name: Option<&str>,
        seed: Option<&[u8]>,
    ) -> HubResult<SpaceHandle> {
        let id = seed.map_or_else(SpaceId::random, SpaceId::from_seed);
        let created = self
            .call(move |hub, ctx| async move { hub.new_space(&ctx, id, name).await })
            .await?;
        info!(space = %created.id, seeded = id.is_seeded(), "Space ready");
        Ok(self.space_handle(created.id))
    }

    /// Opens an existing space. Fails with `NotFound` if the hub has no such space.
    pub async fn open_space(&self, id: SpaceId) -> HubResult<SpaceHandle> {
        self.space_info(id).await?;
        Ok(self.space_handle(id))
    }

    /// Spaces owned by this identity, ordered by id.
    pub async fn list_spaces(&self) -> HubResult<Vec<SpaceInfo>> {
        let mut spaces = self
            .call(|hub, ctx| async move { hub.list_spaces(&ctx).await })
            .await?;
        spaces.sort_by_key(|s| s.id);
        Ok(spaces)
    }

    pub async fn space_info(&self, id: SpaceId) -> HubResult<SpaceInfo> {
        self.call(move |hub, ctx| async move { hub.space_info(&ctx, id).await })
            .await
    }

    fn space_handle(&self, id: SpaceId) -> SpaceHandle {
        SpaceHandle {
            user: self.clone(),
            id,
        }
    }
}
