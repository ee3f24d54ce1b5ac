//! Relation edges of the fetch graph.
//!
//! - [`LinkKind`]: the relation kinds that can be loaded.
//! - [`KeyGroups`]: a parent batch grouped by join-key tuple.
//! - [`Linkage`]: one configured relation, with its batched fetch and link step.

mod keys;
mod kind;
mod linkage;

pub use keys::{JoinKey, KeyGroups};
pub use kind::LinkKind;
pub use linkage::Linkage;
