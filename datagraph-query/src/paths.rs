//! Dotted paths into the fetch tree.
//!
//! A path such as `"job.name"` addresses the `name` column of the node reached
//! through the `job` relation. Paths are collected into ordered, de-duplicated
//! [`PathSet`]s.

use indexmap::{IndexMap, IndexSet};
use serde_json::Value;

use crate::error::{GraphError, GraphResult};

/// An ordered set of dotted paths.
pub type PathSet = IndexSet<String>;

/// Split a path into its first segment and the remainder, if any.
pub fn split_path(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    }
}

/// Join a relation name and a child path.
pub fn join_path(relation: &str, path: &str) -> String {
    let mut joined = String::with_capacity(relation.len() + 1 + path.len());
    joined.push_str(relation);
    joined.push('.');
    joined.push_str(path);
    joined
}

/// Paths grouped by their first segment.
#[derive(Debug, Default)]
pub(crate) struct PathTree<'a> {
    /// Paths with a single segment.
    pub leaves: IndexSet<&'a str>,
    /// Remainders of multi-segment paths, keyed by first segment.
    pub nested: IndexMap<&'a str, Vec<String>>,
}

impl<'a> PathTree<'a> {
    pub fn new(paths: &'a [String]) -> Self {
        let mut tree = Self::default();
        for path in paths {
            match split_path(path) {
                (head, Some(rest)) => tree.nested.entry(head).or_default().push(rest.to_string()),
                (head, None) => {
                    tree.leaves.insert(head);
                }
            }
        }
        tree
    }
}

/// Replace every alias with its expansion, one level deep, keeping first
/// occurrences in order.
///
/// ```rust
/// use indexmap::IndexMap;
/// use datagraph_query::paths::resolve_aliases;
///
/// let mut aliases = IndexMap::new();
/// aliases.insert("name".to_string(), vec!["first_name".to_string(), "last_name".to_string()]);
///
/// let resolved = resolve_aliases(&aliases, ["name", "id", "first_name"]);
/// assert_eq!(resolved, vec!["first_name", "last_name", "id"]);
/// ```
pub fn resolve_aliases(
    aliases: &IndexMap<String, Vec<String>>,
    paths: impl IntoIterator<Item = impl AsRef<str>>,
) -> Vec<String> {
    let mut resolved = PathSet::new();
    for path in paths {
        let path = path.as_ref();
        match aliases.get(path) {
            Some(expansion) => resolved.extend(expansion.iter().cloned()),
            None => {
                resolved.insert(path.to_string());
            }
        }
    }
    resolved.into_iter().collect()
}

/// Check that no alias expands to a different alias.
///
/// With this property alias resolution is idempotent.
pub fn check_aliases(aliases: &IndexMap<String, Vec<String>>) -> GraphResult<()> {
    for (alias, expansion) in aliases {
        if let Some(path) = expansion
            .iter()
            .find(|p| *p != alias && aliases.contains_key(p.as_str()))
        {
            return Err(GraphError::NestedAlias {
                alias: alias.clone(),
                path: path.clone(),
            });
        }
    }
    Ok(())
}

/// Paths of `requested` missing from `allowed`, in request order, without duplicates.
pub fn missing_paths<'a>(
    requested: impl IntoIterator<Item = &'a str>,
    allowed: &PathSet,
) -> Vec<String> {
    let mut missing = PathSet::new();
    for path in requested {
        if !allowed.contains(path) {
            missing.insert(path.to_string());
        }
    }
    missing.into_iter().collect()
}

/// The relation tree of a node, used to flatten nested write payloads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestPaths {
    /// Assignable columns at this level.
    pub columns: Vec<String>,
    /// Nested relations.
    pub relations: IndexMap<String, NestPaths>,
}

impl NestPaths {
    /// Flatten a nested payload into dotted paths.
    ///
    /// Keys naming a relation recurse into object values, or into each object
    /// of an array value; every other key is a leaf path.
    ///
    /// ```rust
    /// use datagraph_query::paths::NestPaths;
    /// use serde_json::json;
    ///
    /// let mut nest = NestPaths::default();
    /// nest.relations.insert("job".into(), NestPaths::default());
    ///
    /// let paths = nest.patherize(&json!({"first_name": "Kim", "job": {"name": "CEO"}}));
    /// let paths: Vec<_> = paths.into_iter().collect();
    /// assert_eq!(paths, vec!["first_name", "job.name"]);
    /// ```
    pub fn patherize(&self, attrs: &Value) -> PathSet {
        let mut paths = PathSet::new();
        self.collect(attrs, None, &mut paths);
        paths
    }

    fn collect(&self, attrs: &Value, prefix: Option<&str>, paths: &mut PathSet) {
        let Value::Object(map) = attrs else {
            return;
        };

        for (key, value) in map {
            let path = match prefix {
                Some(prefix) => join_path(prefix, key),
                None => key.clone(),
            };

            match (self.relations.get(key), value) {
                (Some(nested), Value::Object(_)) => nested.collect(value, Some(&path), paths),
                (Some(nested), Value::Array(items)) if items.iter().all(Value::is_object) => {
                    for item in items {
                        nested.collect(item, Some(&path), paths);
                    }
                }
                _ => {
                    paths.insert(path);
                }
            }
        }
    }
}
