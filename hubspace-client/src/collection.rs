//! Collections and their instances.

use crate::error::{HubError, HubResult};
use crate::space::SpaceHandle;
use crate::session::UserSession;
use hubspace_model::{CollectionConfig, CollectionSchema, Document, IndexSpec, Query};
use hubspace_types::{InstanceId, SpaceId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};

impl SpaceHandle {
    /// Creates a collection with no indexes.
    ///
    /// The schema must declare `_id` as a string property.
    pub async fn create_collection(
        &self,
        name: &str,
        schema: CollectionSchema,
    ) -> HubResult<CollectionHandle> {
        self.create_collection_with(CollectionConfig::new(name, schema))
            .await
    }

    /// Creates a collection from a full definition, indexes included.
    pub async fn create_collection_with(
        &self,
        config: CollectionConfig,
    ) -> HubResult<CollectionHandle> {
        let space = self.id();
        let config = &config;
        self.user
            .call(move |hub, ctx| async move { hub.new_collection(&ctx, space, config).await })
            .await?;
        info!(%space, collection = %config.name, "Created collection");
        Ok(self.collection(&config.name))
    }

    /// Creates a collection whose schema is inferred from `sample`.
    pub async fn create_collection_from_sample(
        &self,
        name: &str,
        sample: &Value,
    ) -> HubResult<CollectionHandle> {
        let schema = CollectionSchema::infer(name, sample)?;
        self.create_collection(name, schema).await
    }

    /// Replaces the schema and indexes of a collection atomically.
    ///
    /// Existing instances are not re-validated against the new schema.
    pub async fn update_collection(
        &self,
        name: &str,
        schema: CollectionSchema,
        indexes: Vec<IndexSpec>,
    ) -> HubResult<()> {
        let space = self.id();
        let config = CollectionConfig {
            name: name.to_string(),
            schema,
            indexes,
        };
        let config = &config;
        self.user
            .call(move |hub, ctx| async move { hub.update_collection(&ctx, space, config).await })
            .await?;
        info!(%space, collection = name, "Updated collection");
        Ok(())
    }

    pub async fn delete_collection(&self, name: &str) -> HubResult<()> {
        let space = self.id();
        self.user
            .call(move |hub, ctx| async move { hub.delete_collection(&ctx, space, name).await })
            .await
    }

    /// Definitions of every collection in the space, ordered by name.
    pub async fn list_collections(&self) -> HubResult<Vec<CollectionConfig>> {
        let space = self.id();
        let mut collections = self
            .user
            .call(move |hub, ctx| async move { hub.list_collections(&ctx, space).await })
            .await?;
        collections.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(collections)
    }

    pub async fn collection_info(&self, name: &str) -> HubResult<CollectionConfig> {
        let space = self.id();
        self.user
            .call(move |hub, ctx| async move { hub.collection_info(&ctx, space, name).await })
            .await
    }

    pub async fn list_indexes(&self, name: &str) -> HubResult<Vec<IndexSpec>> {
        self.collection(name).list_indexes().await
    }

    /// Returns a handle to a collection without contacting the hub.
    pub fn collection(&self, name: &str) -> CollectionHandle {
        CollectionHandle {
            user: self.user.clone(),
            space: self.id(),
            name: name.to_string(),
        }
    }
}

/// Instance operations on one collection.
#[derive(Debug, Clone)]
pub struct CollectionHandle {
    user: UserSession,
    space: SpaceId,
    name: String,
}

impl CollectionHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn space(&self) -> SpaceId {
        self.space
    }

    /// Inserts a batch and returns the ids in input order.
    ///
    /// Instances with an empty or missing `_id` get a fresh one. The batch is
    /// all-or-nothing: a duplicate id, a unique-index clash or a schema
    /// violation anywhere leaves the collection untouched.
    pub async fn create(&self, instances: &[Document]) -> HubResult<Vec<InstanceId>> {
        if instances.is_empty() {
            return Ok(Vec::new());
        }
        let (space, name) = (self.space, self.name.as_str());
        let ids = self
            .user
            .call(move |hub, ctx| async move {
                hub.create_instances(&ctx, space, name, instances).await
            })
            .await?;
        debug!(collection = name, count = ids.len(), "Created instances");
        Ok(ids)
    }

    /// Serializes each value and inserts the batch.
    pub async fn create_as<T: Serialize>(&self, values: &[T]) -> HubResult<Vec<InstanceId>> {
        let instances = values
            .iter()
            .map(Document::from_serializable)
            .collect::<Result<Vec<_>, _>>()?;
        self.create(&instances).await
    }

    /// Instances matching `query`, as a snapshot.
    pub async fn find(&self, query: &Query) -> HubResult<Vec<Document>> {
        let (space, name) = (self.space, self.name.as_str());
        self.user
            .call(move |hub, ctx| async move { hub.find_instances(&ctx, space, name, query).await })
            .await
    }

    /// Like [`CollectionHandle::find`], deserializing each instance.
    pub async fn find_as<T: DeserializeOwned>(&self, query: &Query) -> HubResult<Vec<T>> {
        self.find(query)
            .await?
            .iter()
            .map(|doc| doc.to_typed().map_err(Into::into))
            .collect()
    }

    pub async fn find_by_id(&self, id: &InstanceId) -> HubResult<Document> {
        let (space, name) = (self.space, self.name.as_str());
        self.user
            .call(move |hub, ctx| async move {
                hub.find_instance_by_id(&ctx, space, name, id).await
            })
            .await
    }

    /// Replaces existing instances, matched by `_id`. All-or-nothing.
    pub async fn save(&self, instances: &[Document]) -> HubResult<()> {
        if instances.is_empty() {
            return Ok(());
        }
        let (space, name) = (self.space, self.name.as_str());
        self.user
            .call(move |hub, ctx| async move {
                hub.save_instances(&ctx, space, name, instances).await
            })
            .await
    }

    /// Removes instances by id. Fails with `NotFound`, removing nothing, if any id is unknown.
    pub async fn delete(&self, ids: &[InstanceId]) -> HubResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let (space, name) = (self.space, self.name.as_str());
        self.user
            .call(move |hub, ctx| async move { hub.delete_instances(&ctx, space, name, ids).await })
            .await
    }

    /// Returns true if every id in `ids` exists.
    pub async fn has(&self, ids: &[InstanceId]) -> HubResult<bool> {
        // A missing collection is NotFound, not `false`.
        self.info().await?;
        for id in ids {
            match self.find_by_id(id).await {
                Ok(_) => {}
                Err(HubError::NotFound(_)) => return Ok(false),
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }

    pub async fn list_indexes(&self) -> HubResult<Vec<IndexSpec>> {
        let (space, name) = (self.space, self.name.as_str());
        self.user
            .call(move |hub, ctx| async move { hub.list_indexes(&ctx, space, name).await })
            .await
    }

    /// The collection's current definition.
    pub async fn info(&self) -> HubResult<CollectionConfig> {
        let (space, name) = (self.space, self.name.as_str());
        self.user
            .call(move |hub, ctx| async move { hub.collection_info(&ctx, space, name).await })
            .await
    }
}
