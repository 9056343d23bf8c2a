//! The catalog list controller.
//!
//! A [`ListController`] owns the facets of one catalog view. Every mutation
//! recompiles the compound filter, issues a backend request under a fresh
//! request id, and re-derives the options of every picker. Responses are
//! applied only when they answer the latest request, so the published
//! [`ListSnapshot`] always reflects the last mutation regardless of the
//! order in which responses arrive.
//!
//! Controllers share nothing; wrap one in a [`ListScope`] to tie its
//! teardown to a lexical scope.

mod config;
mod controller;
mod error;
mod executor;
pub mod page;
mod scope;
mod snapshot;

pub use config::ListConfig;
pub use controller::ListController;
pub use controller::ListControllerBuilder;
pub use controller::Subscription;
pub use error::ConfigError;
pub use error::QueryFailure;
pub use error::Result;
pub use page::CatalogPageConfig;
pub use scope::ListScope;
pub use snapshot::ListPhase;
pub use snapshot::ListSnapshot;
pub use snapshot::QueryState;
