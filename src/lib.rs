//! # datagraph
//!
//! Eager loading of configured object graphs, with path-level access control.
//!
//! datagraph provides:
//! - Per-entity configuration of readable columns, derived methods and
//!   included relations, loadable from TOML or JSON
//! - Batched loading: one fetch per relation level, whatever the number of
//!   parent records, including composite keys and indirect relations
//! - Dotted path views (`get_paths`, `set_paths`) with aliases and named
//!   subsets to validate what callers read and assign
//!
//! ## Quick Start
//!
//! ```rust
//! use datagraph::prelude::*;
//!
//! # fn main() -> Result<(), GraphError> {
//! let schema = SchemaDefinition::from_toml_str(r#"
//!     [entities.emps]
//!     columns = ["id", "first_name", "ssn", "dept_id"]
//!
//!     [[entities.emps.relations]]
//!     name = "dept"
//!     kind = "belongs_to"
//!     target = "depts"
//!     local_columns = ["dept_id"]
//!     foreign_columns = ["id"]
//!
//!     [entities.depts]
//!     columns = ["id", "name"]
//! "#)?;
//!
//! let config = NodeConfig::from_toml_str(r#"
//!     except = ["ssn"]
//!
//!     [include.dept]
//!     only = ["name"]
//!
//!     [subsets]
//!     public = ["first_name", "dept.name"]
//! "#)?;
//!
//! let graph = Graph::build(&schema, "emps", &config)?;
//! graph.validate("public", &["first_name", "dept.name"])?;
//! assert!(graph.validate("public", &["ssn"]).is_err());
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use datagraph_query::*;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use datagraph_query::prelude::*;
    pub use datagraph_query::{DEFAULT_SUBSET, logging};
}
