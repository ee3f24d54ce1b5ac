//! # datagraph-query
//!
//! Eager loading of configured object graphs with one fetch per relation level.
//!
//! A graph is configured per entity: which columns are readable, which
//! relations to include (recursively), derived method names, aliases and named
//! subsets. Loading a graph fetches the root records, then for each included
//! relation issues a single batched fetch for every parent of that level and
//! links the children back by join key. The same configuration answers which
//! dotted paths (`"job.name"`) a caller may read or assign.
//!
//! ## Building a graph
//!
//! ```rust
//! use datagraph_query::{
//!     EntityDescription, FetchRequest, Graph, MemoryStore, NodeConfig, Record,
//!     RelationDescription, SchemaDefinition,
//! };
//!
//! let schema = SchemaDefinition::new()
//!     .entity(
//!         EntityDescription::new("emps", ["id", "first_name", "ssn", "job_id"])
//!             .relation(RelationDescription::belongs_to("job", "jobs", ["job_id"], ["id"])),
//!     )
//!     .entity(EntityDescription::new("jobs", ["id", "name"]));
//!
//! let config = NodeConfig::new()
//!     .except(["ssn"])
//!     .include("job", NodeConfig::new().only(["name"]));
//!
//! let graph = Graph::build(&schema, "emps", &config).unwrap();
//! let paths: Vec<_> = graph.get_paths().iter().cloned().collect();
//! assert_eq!(paths, vec!["id", "first_name", "job_id", "job.name"]);
//! ```
//!
//! ## Fetching
//!
//! ```rust
//! # use datagraph_query::*;
//! # let schema = SchemaDefinition::new()
//! #     .entity(
//! #         EntityDescription::new("emps", ["id", "job_id"])
//! #             .relation(RelationDescription::belongs_to("job", "jobs", ["job_id"], ["id"])),
//! #     )
//! #     .entity(EntityDescription::new("jobs", ["id", "name"]));
//! # let config = NodeConfig::new().include("job", NodeConfig::new());
//! # let graph = Graph::build(&schema, "emps", &config).unwrap();
//! let store = MemoryStore::new()
//!     .with_table("emps", vec![
//!         Record::from_pairs([("id", 1), ("job_id", 7)]),
//!         Record::from_pairs([("id", 2), ("job_id", 7)]),
//!     ])
//!     .with_table("jobs", vec![Record::from_pairs([("id", 7)])]);
//!
//! let emps = futures::executor::block_on(graph.find(&store, FetchRequest::new())).unwrap();
//! assert_eq!(emps.len(), 2);
//! assert_eq!(store.fetch_count(), 2);
//! ```
//!
//! ## Modules
//!
//! - [`config`]: per-entity configuration, loadable from TOML or JSON
//! - [`schema`]: entity metadata and the [`SchemaIntrospector`] seam
//! - [`store`]: fetch requests and the [`RecordStore`] seam
//! - [`node`], [`relations`]: the fetch graph and its batched linking
//! - [`graph`]: aliases, subsets and path validation
//! - [`logging`]: environment-driven `tracing` setup

pub mod config;
pub mod error;
pub mod filter;
pub mod graph;
pub mod logging;
pub mod node;
pub mod paths;
pub mod policy;
pub mod record;
pub mod relations;
pub mod schema;
pub mod store;
pub mod types;

pub use config::NodeConfig;
pub use error::{GraphError, GraphResult};
pub use filter::{Filter, FilterValue};
pub use graph::{DEFAULT_SUBSET, Graph};
pub use node::Node;
pub use paths::{NestPaths, PathSet};
pub use policy::AccessPolicy;
pub use record::{Record, RelationValue};
pub use relations::{JoinKey, KeyGroups, LinkKind, Linkage};
pub use schema::{
    EntityDescription, RelationDescription, RelationKind, SchemaDefinition, SchemaIntrospector,
};
pub use store::{BoxFuture, FetchRequest, MemoryStore, RecordStore};
pub use types::{OrderBy, OrderByField, SortOrder};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::NodeConfig;
    pub use crate::error::{GraphError, GraphResult};
    pub use crate::filter::{Filter, FilterValue};
    pub use crate::graph::Graph;
    pub use crate::node::Node;
    pub use crate::record::{Record, RelationValue};
    pub use crate::schema::{
        EntityDescription, RelationDescription, SchemaDefinition, SchemaIntrospector,
    };
    pub use crate::store::{FetchRequest, MemoryStore, RecordStore};
    pub use crate::types::{OrderByField, SortOrder};
}
