//! Async client for hubspace document hubs.
//!
//! A hub hosts **spaces** (logical databases), each holding named
//! **collections** of JSON instances that conform to a collection schema.
//!
//! - [`Session`]: an application credential plus a per-identity token cache
//! - [`UserSession`]: a session scoped to one [`Identity`]
//! - [`SpaceHandle`]: create, open and inspect spaces and their collections
//! - [`CollectionHandle`]: create, find, save and delete instances
//! - [`HubTransport`]: the logical hub calls, implemented by
//!   [`HttpTransport`] and the in-process [`MemoryHub`]
//!
//! ```no_run
//! # async fn run() -> hubspace_client::HubResult<()> {
//! use hubspace_client::{HubConfig, Session};
//! use hubspace_crypto::Identity;
//! use hubspace_model::{CollectionSchema, Document, Query};
//!
//! let (config, credential) = HubConfig::from_env()?;
//! let session = Session::connect_with_config(config, credential).await?;
//! let user = session.authorize(&Identity::random()).await?;
//!
//! let space = user.create_space(Some("blog"), None).await?;
//! let posts = space
//!     .create_collection("Post", CollectionSchema::with_instance_id())
//!     .await?;
//! posts.create(&[Document::new()]).await?;
//! let all = posts.find(&Query::all()).await?;
//! # let _ = all;
//! # Ok(())
//! # }
//! ```

mod collection;
mod config;
mod error;
mod session;
mod space;
pub mod transport;

pub use collection::CollectionHandle;
pub use config::{ENV_API_URL, ENV_KEY, ENV_SECRET, HubConfig};
pub use error::{HubError, HubResult};
pub use session::{Session, UserSession};
pub use space::{SpaceHandle, SpaceInfo};
pub use transport::{Challenge, HttpTransport, HubTransport, MemoryHub, RequestContext, Token};

pub use hubspace_crypto::{Credential, Identity, PublicKey};
pub use hubspace_model::{
    CollectionConfig, CollectionSchema, Document, FieldSchema, FieldType, IndexSpec, Query, field,
};
pub use hubspace_types::{InstanceId, SpaceId};
