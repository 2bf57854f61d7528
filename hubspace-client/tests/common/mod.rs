//! Shared test helpers for hub client tests.

#![allow(dead_code)]

use hubspace_client::{
    CollectionHandle, CollectionSchema, FieldSchema, MemoryHub, Session, SpaceHandle, UserSession,
};
use hubspace_crypto::{Credential, Identity, resolve_static_credential};
use std::sync::Arc;

pub const APP_KEY: &str = "test-app";
pub const APP_SECRET: &str = "test-secret";

/// Returns a deterministic identity from a one-byte seed.
pub fn identity(n: u8) -> Identity {
    Identity::from_seed(&[n; 32])
}

pub fn static_credential() -> Credential {
    resolve_static_credential(APP_KEY, APP_SECRET).unwrap()
}

pub fn memory_hub() -> Arc<MemoryHub> {
    Arc::new(MemoryHub::with_api_key(APP_KEY, APP_SECRET))
}

/// Connects a session to `hub` with the static test credential.
pub async fn connect(hub: &Arc<MemoryHub>) -> Session {
    Session::connect(hub.clone(), static_credential()).await.unwrap()
}

/// Connects and authorizes a fresh identity.
pub async fn user(hub: &Arc<MemoryHub>) -> UserSession {
    connect(hub).await.authorize(&Identity::random()).await.unwrap()
}

/// Schema used by most instance tests: a post with a bounded score.
pub fn post_schema() -> CollectionSchema {
    CollectionSchema::with_instance_id()
        .title("Post")
        .property("title", FieldSchema::string().min_length(1))
        .property("score", FieldSchema::integer().minimum(0.0))
        .require("title")
}

/// Creates a space holding an empty "Post" collection.
pub async fn post_collection(user: &UserSession) -> (SpaceHandle, CollectionHandle) {
    let space = user.create_space(Some("blog"), None).await.unwrap();
    let posts = space.create_collection("Post", post_schema()).await.unwrap();
    (space, posts)
}
