//! The caller-facing wrapper around a root [`Node`].
//!
//! A [`Graph`] adds alias resolution and named subsets to the node it wraps.
//! Subsets are narrowed copies of the node, registered once and used to check
//! which paths a caller may read or assign.
//!
//! ```rust
//! use datagraph_query::{Graph, NodeConfig, SchemaDefinition, EntityDescription};
//!
//! let schema = SchemaDefinition::new()
//!     .entity(EntityDescription::new("emps", ["id", "first_name", "ssn"]));
//! let config = NodeConfig::new().subset("public", ["id", "first_name"]);
//!
//! let graph = Graph::build(&schema, "emps", &config).unwrap();
//! assert!(graph.validate("public", &["first_name"]).is_ok());
//!
//! let err = graph.validate("public", &["ssn", "first_name"]).unwrap_err();
//! assert_eq!(err.to_string(), r#"inaccessible: ["ssn"]"#);
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::config::NodeConfig;
use crate::error::{GraphError, GraphResult};
use crate::node::Node;
use crate::paths::{NestPaths, PathSet, check_aliases, missing_paths, resolve_aliases};
use crate::record::Record;
use crate::schema::SchemaIntrospector;
use crate::store::{FetchRequest, RecordStore};

/// Name of the subset registered to the full graph.
pub const DEFAULT_SUBSET: &str = "default";

/// A root node with aliases and named subsets.
#[derive(Debug, Clone)]
pub struct Graph {
    node: Arc<Node>,
    aliases: IndexMap<String, Vec<String>>,
    subsets: IndexMap<String, Arc<Node>>,
}

impl Graph {
    /// Wrap a node. Its aliases are used for resolution and the `"default"`
    /// subset is registered to the node itself.
    pub fn new(node: Node) -> Self {
        let node = Arc::new(node);
        let mut subsets = IndexMap::new();
        subsets.insert(DEFAULT_SUBSET.to_string(), Arc::clone(&node));

        Self {
            aliases: node.aliases().clone(),
            node,
            subsets,
        }
    }

    /// Build the graph of `entity` and register the configured subsets.
    pub fn build(
        schema: &dyn SchemaIntrospector,
        entity: &str,
        config: &NodeConfig,
    ) -> GraphResult<Self> {
        let mut graph = Self::new(Node::build(schema, entity, config)?);
        for (name, paths) in &config.subsets {
            graph.register(name, Some(paths.as_slice()));
        }
        Ok(graph)
    }

    /// Merge extra aliases over the node's aliases.
    pub fn with_aliases(mut self, aliases: IndexMap<String, Vec<String>>) -> GraphResult<Self> {
        self.aliases.extend(aliases);
        check_aliases(&self.aliases)?;
        Ok(self)
    }

    /// The wrapped node.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Aliases used by [`Graph::resolve`].
    pub fn aliases(&self) -> &IndexMap<String, Vec<String>> {
        &self.aliases
    }

    /// Readable paths of the full graph.
    pub fn get_paths(&self) -> &PathSet {
        self.node.get_paths()
    }

    /// Assignable paths of the full graph.
    pub fn set_paths(&self) -> &PathSet {
        self.node.set_paths()
    }

    /// Readable and assignable paths of the full graph.
    pub fn paths(&self) -> PathSet {
        self.get_paths()
            .iter()
            .chain(self.set_paths().iter())
            .cloned()
            .collect()
    }

    /// The relation tree of the full graph.
    pub fn nest_paths(&self) -> &NestPaths {
        self.node.nest_paths()
    }

    /// Replace aliases with their expansions, flattened and de-duplicated.
    pub fn resolve(&self, paths: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
        resolve_aliases(&self.aliases, paths)
    }

    /// A graph narrowed to the resolved `paths`.
    pub fn only(&self, paths: impl IntoIterator<Item = impl AsRef<str>>) -> Graph {
        self.derive(self.node.only(&self.resolve(paths)))
    }

    /// A graph without the resolved `paths`.
    pub fn except(&self, paths: impl IntoIterator<Item = impl AsRef<str>>) -> Graph {
        self.derive(self.node.except(&self.resolve(paths)))
    }

    fn derive(&self, node: Node) -> Graph {
        let mut graph = Graph::new(node);
        graph.aliases = self.aliases.clone();
        graph
    }

    /// Register the subset `only(paths)` under `name`, returning it; with
    /// `None`, unregister `name` and return the subset it held.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        paths: Option<&[String]>,
    ) -> Option<Arc<Node>> {
        let name = name.into();
        match paths {
            Some(paths) => {
                let subset = Arc::new(self.node.only(&self.resolve(paths)));
                debug!(
                    subset = %name,
                    paths = subset.get_paths().len(),
                    "registered subset"
                );
                self.subsets.insert(name, Arc::clone(&subset));
                Some(subset)
            }
            None => {
                debug!(subset = %name, "unregistered subset");
                self.subsets.shift_remove(&name)
            }
        }
    }

    /// Unregister a subset.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<Node>> {
        self.register(name, None)
    }

    /// Look up a registered subset.
    pub fn subset(&self, name: &str) -> GraphResult<&Node> {
        self.subsets
            .get(name)
            .map(|node| &**node)
            .ok_or_else(|| GraphError::unknown_subset(name))
    }

    /// Names of the registered subsets.
    pub fn subsets(&self) -> impl Iterator<Item = &str> {
        self.subsets.keys().map(String::as_str)
    }

    /// Check that every path is readable through the named subset.
    ///
    /// Paths are not alias-resolved. On failure the error lists every
    /// offending path, in request order.
    pub fn validate(&self, subset: &str, paths: &[impl AsRef<str>]) -> GraphResult<()> {
        let subset = self.subset(subset)?;
        let missing = missing_paths(paths.iter().map(|p| p.as_ref()), subset.get_paths());
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GraphError::inaccessible(missing))
        }
    }

    /// Check that every path of a nested write payload is assignable through
    /// the named subset.
    ///
    /// The payload is flattened with the full graph's relation tree, so a
    /// relation left out of the subset is reported by its leaf paths.
    pub fn validate_attrs(&self, subset: &str, attrs: &Value) -> GraphResult<()> {
        let subset = self.subset(subset)?;
        let paths = self.nest_paths().patherize(attrs);
        let missing = missing_paths(paths.iter().map(String::as_str), subset.set_paths());
        if missing.is_empty() {
            Ok(())
        } else {
            Err(GraphError::inaccessible(missing))
        }
    }

    /// Fetch through the full graph.
    pub async fn find(
        &self,
        store: &dyn RecordStore,
        request: FetchRequest,
    ) -> GraphResult<Vec<Record>> {
        self.node.find(store, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EntityDescription, RelationDescription, SchemaDefinition};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> SchemaDefinition {
        SchemaDefinition::new()
            .entity(
                EntityDescription::new("emps", ["id", "first_name", "last_name", "ssn", "job_id"])
                    .relation(RelationDescription::belongs_to("job", "jobs", ["job_id"], ["id"])),
            )
            .entity(EntityDescription::new("jobs", ["id", "name"]))
    }

    fn config() -> NodeConfig {
        NodeConfig::new()
            .except(["job_id"])
            .include("job", NodeConfig::new())
            .alias("name", ["first_name", "last_name"])
            .subset("public", ["name", "job.name"])
    }

    fn graph() -> Graph {
        Graph::build(&schema(), "emps", &config()).unwrap()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_registers_default_and_config_subsets() {
        let graph = graph();
        assert_eq!(graph.subsets().collect::<Vec<_>>(), vec!["default", "public"]);

        let public = graph.subset("public").unwrap();
        let paths: Vec<_> = public.get_paths().iter().cloned().collect();
        assert_eq!(paths, vec!["first_name", "last_name", "job.name"]);
    }

    #[test]
    fn test_validate_reports_exact_offenders() {
        let graph = graph();
        assert!(graph.validate("public", &["first_name", "job.name"]).is_ok());

        let err = graph.validate("public", &["ssn", "first_name", "job.id"]).unwrap_err();
        assert_eq!(err.paths(), Some(&["ssn".to_string(), "job.id".to_string()][..]));
    }

    #[test]
    fn test_validate_does_not_resolve_aliases() {
        let err = graph().validate("public", &["name"]).unwrap_err();
        assert_eq!(err.paths(), Some(&["name".to_string()][..]));
    }

    #[test]
    fn test_unknown_subset() {
        let err = graph().validate("admin", &["id"]).unwrap_err();
        assert!(matches!(err, GraphError::UnknownSubset { ref name } if name == "admin"));
    }

    #[test]
    fn test_register_and_unregister() {
        let mut graph = graph();
        let subset = graph.register("ids", Some(&strings(&["id", "job.id"])[..])).unwrap();
        assert_eq!(subset.get_paths().len(), 2);

        assert!(graph.unregister("ids").is_some());
        assert!(graph.subset("ids").is_err());

        graph.register(DEFAULT_SUBSET, None);
        assert!(matches!(
            graph.subset(DEFAULT_SUBSET),
            Err(GraphError::UnknownSubset { .. })
        ));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let graph = graph();
        let once = graph.resolve(["name", "id", "first_name"]);
        assert_eq!(once, vec!["first_name", "last_name", "id"]);
        assert_eq!(graph.resolve(&once), once);
    }

    #[test]
    fn test_with_aliases_merges_and_checks() {
        let mut extra = IndexMap::new();
        extra.insert("title".to_string(), strings(&["job.name"]));
        let graph = graph().with_aliases(extra).unwrap();
        assert_eq!(graph.resolve(["title", "name"]), vec!["job.name", "first_name", "last_name"]);

        let mut nested = IndexMap::new();
        nested.insert("everything".to_string(), strings(&["name", "ssn"]));
        assert!(matches!(
            graph.with_aliases(nested),
            Err(GraphError::NestedAlias { .. })
        ));
    }

    #[test]
    fn test_only_and_except_resolve_aliases() {
        let graph = graph();

        let only = graph.only(["name"]);
        let paths: Vec<_> = only.get_paths().iter().cloned().collect();
        assert_eq!(paths, vec!["first_name", "last_name"]);

        let except = graph.except(["name", "ssn", "job"]);
        let paths: Vec<_> = except.get_paths().iter().cloned().collect();
        assert_eq!(paths, vec!["id"]);
    }

    #[test]
    fn test_validate_attrs() {
        let graph = graph();
        let ok = json!({"first_name": "Kim", "job": {"name": "CEO"}});
        assert!(graph.validate_attrs("public", &ok).is_ok());

        let bad = json!({"ssn": "123", "job": {"id": 4, "name": "CEO"}, "first_name": "Kim"});
        let err = graph.validate_attrs("public", &bad).unwrap_err();
        let mut paths = err.paths().unwrap().to_vec();
        paths.sort();
        assert_eq!(paths, vec!["job.id", "ssn"]);
    }

    #[test]
    fn test_paths_union() {
        let graph = graph();
        assert_eq!(graph.paths(), *graph.get_paths());
    }
}
