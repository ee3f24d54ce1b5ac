//! Graph configuration for one entity and its included relations.
//!
//! The same structure is used at every level; nested under `include`, the
//! `order_by`/`limit`/`group_by` keys modify the relation fetch.
//!
//! ```rust
//! use datagraph_query::NodeConfig;
//!
//! let config = NodeConfig::from_toml_str(r#"
//!     only = ["first_name", "last_name"]
//!     methods = ["full_name"]
//!
//!     [include.job]
//!     only = ["name"]
//!
//!     [aliases]
//!     name = ["first_name", "last_name"]
//! "#).unwrap();
//!
//! assert_eq!(config.include["job"].only, Some(vec!["name".to_string()]));
//! ```

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};
use crate::types::{OrderBy, OrderByField};

/// Configuration of a node in the fetch graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NodeConfig {
    /// Readable columns; all declared columns when unset.
    pub only: Option<Vec<String>>,
    /// Columns removed from the readable set (ignored when `only` is set).
    pub except: Option<Vec<String>>,
    /// Columns always fetched, even when not readable.
    pub always: Vec<String>,
    /// Derived, read-only values exposed as paths.
    pub methods: Vec<String>,
    /// Relations to load, with their own configuration.
    pub include: IndexMap<String, NodeConfig>,
    /// Alias name to the paths it stands for.
    pub aliases: IndexMap<String, Vec<String>>,
    /// Named subsets registered on a graph built from this configuration.
    pub subsets: IndexMap<String, Vec<String>>,
    /// Ordering of the relation fetch.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderByField>,
    /// Row limit of the relation fetch (applies to the whole batch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Grouping columns of the relation fetch.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_by: Vec<String>,
}

fn strings(items: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    items.into_iter().map(Into::into).collect()
}

impl NodeConfig {
    /// Create an empty configuration (all columns, no relations).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict readable columns.
    pub fn only(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.only = Some(strings(columns));
        self
    }

    /// Remove readable columns.
    pub fn except(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.except = Some(strings(columns));
        self
    }

    /// Always fetch these columns.
    pub fn always(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.always = strings(columns);
        self
    }

    /// Expose derived methods as paths.
    pub fn methods(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.methods = strings(names);
        self
    }

    /// Include a relation.
    pub fn include(mut self, relation: impl Into<String>, config: NodeConfig) -> Self {
        self.include.insert(relation.into(), config);
        self
    }

    /// Define an alias.
    pub fn alias(
        mut self,
        name: impl Into<String>,
        paths: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.aliases.insert(name.into(), strings(paths));
        self
    }

    /// Define a named subset.
    pub fn subset(
        mut self,
        name: impl Into<String>,
        paths: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.subsets.insert(name.into(), strings(paths));
        self
    }

    /// Order the relation fetch.
    pub fn order_by(mut self, fields: impl IntoIterator<Item = OrderByField>) -> Self {
        self.order_by = fields.into_iter().collect();
        self
    }

    /// Limit the relation fetch.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Group the relation fetch.
    pub fn group_by(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.group_by = strings(columns);
        self
    }

    /// Configuration of the hop node of an indirect relation: nothing readable
    /// on the hop itself, with the real target included under `source`.
    pub fn through(source: impl Into<String>, target: NodeConfig) -> Self {
        Self::new().only(Vec::<String>::new()).include(source, target)
    }

    /// The configured ordering, if any.
    pub fn ordering(&self) -> Option<OrderBy> {
        if self.order_by.is_empty() {
            None
        } else {
            Some(OrderBy::from(self.order_by.clone()))
        }
    }

    /// Parse a configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> GraphResult<Self> {
        toml::from_str(content).map_err(|e| GraphError::Toml { source: e })
    }

    /// Parse a configuration from a JSON string.
    pub fn from_json_str(content: &str) -> GraphResult<Self> {
        serde_json::from_str(content).map_err(|e| GraphError::Json { source: e })
    }

    /// Load a configuration file; `.json` files are read as JSON, anything else as TOML.
    pub fn from_file(path: impl AsRef<Path>) -> GraphResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| GraphError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_toml_str(&content),
        }
    }
}
