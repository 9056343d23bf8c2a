use crate::error::CatalogClientError;
use crate::error::Result;
use async_trait::async_trait;
use catalog_filter::UserContext;
use catalog_protocol::Entity;
use catalog_protocol::EntityRef;
use catalog_protocol::RELATION_MEMBER_OF;
use std::collections::BTreeSet;
use std::sync::RwLock;

/// Who is browsing, as resolved by the identity provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Identity {
    pub user_ref: Option<EntityRef>,
    /// Groups (and the user itself) whose ownership counts as the caller's.
    pub ownership_refs: BTreeSet<EntityRef>,
}

impl Identity {
    pub fn guest() -> Self {
        Self::default()
    }

    pub fn user(user_ref: EntityRef) -> Self {
        Self {
            ownership_refs: BTreeSet::from([user_ref.clone()]),
            user_ref: Some(user_ref),
        }
    }

    /// Identity of a `User` entity: the user plus every group it is a
    /// `memberOf`.
    pub fn from_user_entity(user: &Entity) -> Result<Self> {
        let user_ref = user.entity_ref().ok_or_else(|| {
            CatalogClientError::Identity(format!("invalid user entity {}", user.metadata.name))
        })?;
        Ok(Self::user(user_ref).with_groups(user.relation_targets(RELATION_MEMBER_OF)))
    }

    pub fn with_groups<I>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = EntityRef>,
    {
        self.ownership_refs.extend(groups);
        self
    }
}

#[async_trait]
pub trait IdentityApi: Send + Sync {
    async fn identity(&self) -> Result<Identity>;
}

#[async_trait]
pub trait StarredEntitiesApi: Send + Sync {
    async fn starred(&self) -> Result<BTreeSet<EntityRef>>;
}

/// A resolved capability check. Only the boolean outcome is consumed.
#[async_trait]
pub trait PermissionApi: Send + Sync {
    async fn authorize(&self, permission: &str) -> bool;
}

#[derive(Clone, Debug, Default)]
pub struct StaticIdentity {
    identity: Identity,
}

impl StaticIdentity {
    pub fn new(identity: Identity) -> Self {
        Self { identity }
    }
}

#[async_trait]
impl IdentityApi for StaticIdentity {
    async fn identity(&self) -> Result<Identity> {
        Ok(self.identity.clone())
    }
}

/// Favorites kept in memory; mutations are seen by the next
/// [`resolve_user_context`].
#[derive(Debug, Default)]
pub struct InMemoryStarredEntities {
    starred: RwLock<BTreeSet<EntityRef>>,
}

impl InMemoryStarredEntities {
    pub fn new<I>(refs: I) -> Self
    where
        I: IntoIterator<Item = EntityRef>,
    {
        Self {
            starred: RwLock::new(refs.into_iter().collect()),
        }
    }

    /// Stars or unstars `entity_ref`; returns whether it is starred now.
    pub fn toggle(&self, entity_ref: &EntityRef) -> bool {
        let Ok(mut starred) = self.starred.write() else {
            return false;
        };
        if starred.remove(entity_ref) {
            false
        } else {
            starred.insert(entity_ref.clone());
            true
        }
    }

    pub fn is_starred(&self, entity_ref: &EntityRef) -> bool {
        self.starred
            .read()
            .map(|starred| starred.contains(entity_ref))
            .unwrap_or(false)
    }
}

#[async_trait]
impl StarredEntitiesApi for InMemoryStarredEntities {
    async fn starred(&self) -> Result<BTreeSet<EntityRef>> {
        let starred = self
            .starred
            .read()
            .map_err(|_| CatalogClientError::Identity("starred store poisoned".to_string()))?;
        Ok(starred.clone())
    }
}

/// Grants a fixed set of permissions.
#[derive(Clone, Debug, Default)]
pub struct StaticPermissions {
    granted: BTreeSet<String>,
}

impl StaticPermissions {
    pub fn granting<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            granted: permissions.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl PermissionApi for StaticPermissions {
    async fn authorize(&self, permission: &str) -> bool {
        self.granted.contains(permission)
    }
}

/// Resolves identity and favorites into the context the `user` facet
/// compiles against.
pub async fn resolve_user_context(
    identity: &dyn IdentityApi,
    starred: &dyn StarredEntitiesApi,
) -> Result<UserContext> {
    let identity = identity.identity().await?;
    let starred = starred.starred().await?;
    Ok(UserContext {
        user_ref: identity.user_ref,
        ownership_refs: identity.ownership_refs,
        starred,
    })
}
