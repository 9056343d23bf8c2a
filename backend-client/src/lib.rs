//! Collaborators the list controller consumes: the catalog query backend and
//! the identity, favorites and permission providers.
//!
//! Everything is behind `async_trait` interfaces so the controller and views
//! receive them injected. The in-memory implementations back the CLI and the
//! test suites.

mod api;
mod error;
mod identity;
mod memory;

pub use api::CatalogApi;
pub use api::EntityQuery;
pub use api::EntityQueryResponse;
pub use api::RequestId;
pub use error::CatalogClientError;
pub use error::Result;
pub use identity::IdentityApi;
pub use identity::Identity;
pub use identity::InMemoryStarredEntities;
pub use identity::PermissionApi;
pub use identity::StarredEntitiesApi;
pub use identity::StaticIdentity;
pub use identity::StaticPermissions;
pub use identity::resolve_user_context;
pub use memory::InMemoryCatalog;
pub use memory::InMemoryCatalogConfig;
