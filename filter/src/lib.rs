//! Facets, the predicate compiler and the option deriver.
//!
//! ```text
//! FacetSet ──compile(UserContext)──> CompoundFilter ──> backend query
//!     │                                    │
//!     └──────── OptionDeriver <── responses (entities + FilterCoverage)
//!                    │
//!                    └──> OptionSet per facet (other facets applied)
//! ```
//!
//! Everything here is synchronous and pure; the async side lives in
//! `catalog-list`.

mod compile;
mod context;
mod deriver;
mod error;
mod facet;
mod options;
mod value;

pub use compile::CompoundFilter;
pub use compile::Predicate;
pub use compile::compile_facet;
pub use context::UserContext;
pub use deriver::FilterCoverage;
pub use deriver::OptionDeriver;
pub use error::FilterError;
pub use error::Result;
pub use facet::Facet;
pub use facet::FacetRegistration;
pub use facet::FacetSet;
pub use facet::SetOutcome;
pub use options::FacetOption;
pub use options::OptionSet;
pub use options::derive_options;
pub use options::facet_values;
pub use value::FacetValue;
