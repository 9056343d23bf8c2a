//! Shared data model for the catalog list: entities as the backend returns
//! them, entity references, and the facet identifiers pickers write to.

mod entity;
mod entity_ref;
mod error;
mod facet;

pub use entity::DEFAULT_OWNER_KIND;
pub use entity::Entity;
pub use entity::EntityLink;
pub use entity::EntityMetadata;
pub use entity::EntityRelation;
pub use entity::RELATION_MEMBER_OF;
pub use entity::RELATION_OWNED_BY;
pub use entity_ref::DEFAULT_NAMESPACE;
pub use entity_ref::EntityRef;
pub use error::ProtocolError;
pub use facet::FacetId;
pub use facet::UserScope;
