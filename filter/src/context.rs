use catalog_protocol::EntityRef;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeSet;

/// Caller identity and favorites, resolved before the `user` facet is
/// compiled.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_ref: Option<EntityRef>,
    /// Refs that count as "owned by me": the user itself plus its groups.
    pub ownership_refs: BTreeSet<EntityRef>,
    pub starred: BTreeSet<EntityRef>,
}

impl UserContext {
    pub fn new(user_ref: EntityRef) -> Self {
        let ownership_refs = BTreeSet::from([user_ref.clone()]);
        Self {
            user_ref: Some(user_ref),
            ownership_refs,
            starred: BTreeSet::new(),
        }
    }

    pub fn with_ownership_refs<I>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = EntityRef>,
    {
        self.ownership_refs.extend(refs);
        self
    }

    pub fn with_starred<I>(mut self, refs: I) -> Self
    where
        I: IntoIterator<Item = EntityRef>,
    {
        self.starred = refs.into_iter().collect();
        self
    }
}
