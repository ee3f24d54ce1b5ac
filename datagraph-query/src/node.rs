//! One entity in the fetch graph.
//!
//! A [`Node`] carries the access policy of its entity and the linkages to the
//! relations configured under `include`. The graph is a tree: a relation cycle
//! in the schema produces separate nodes at each depth the configuration
//! reaches.

use std::sync::OnceLock;

use futures::future::try_join_all;
use indexmap::IndexMap;
use tracing::debug;

use crate::config::NodeConfig;
use crate::error::{GraphError, GraphResult};
use crate::paths::{NestPaths, PathSet, PathTree, check_aliases, join_path};
use crate::policy::AccessPolicy;
use crate::record::Record;
use crate::relations::{KeyGroups, Linkage};
use crate::schema::SchemaIntrospector;
use crate::store::{BoxFuture, FetchRequest, RecordStore};

/// A configured entity and its configured relations.
#[derive(Debug, Clone)]
pub struct Node {
    entity: String,
    primary_key: Vec<String>,
    policy: AccessPolicy,
    linkages: IndexMap<String, Linkage>,
    aliases: IndexMap<String, Vec<String>>,
    select: Vec<String>,
    get_paths: OnceLock<PathSet>,
    set_paths: OnceLock<PathSet>,
    nest_paths: OnceLock<NestPaths>,
}

impl Node {
    /// Build the node of `entity` and, recursively, of every included relation.
    pub fn build(
        schema: &dyn SchemaIntrospector,
        entity: &str,
        config: &NodeConfig,
    ) -> GraphResult<Self> {
        let description = schema.describe(entity)?;
        check_aliases(&config.aliases)?;

        let mut linkages = IndexMap::with_capacity(config.include.len());
        for (name, child_config) in &config.include {
            let relation = description
                .find_relation(name)
                .ok_or_else(|| GraphError::unknown_relation(&description.name, name))?;
            let linkage = Linkage::build(schema, &description, relation, child_config)?;
            linkages.insert(name.clone(), linkage);
        }

        let policy = AccessPolicy::from_config(&description, config);
        Ok(Self::assemble(
            description.name,
            description.primary_key,
            policy,
            linkages,
            config.aliases.clone(),
        ))
    }

    fn assemble(
        entity: String,
        primary_key: Vec<String>,
        policy: AccessPolicy,
        linkages: IndexMap<String, Linkage>,
        aliases: IndexMap<String, Vec<String>>,
    ) -> Self {
        let select = policy.allowed_columns(linkages.values().flat_map(|l| l.parent_columns()));
        Self {
            entity,
            primary_key,
            policy,
            linkages,
            aliases,
            select,
            get_paths: OnceLock::new(),
            set_paths: OnceLock::new(),
            nest_paths: OnceLock::new(),
        }
    }

    /// Entity name.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Primary key columns.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// Access policy.
    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Configured relations, in configuration order.
    pub fn linkages(&self) -> &IndexMap<String, Linkage> {
        &self.linkages
    }

    /// A configured relation.
    pub fn linkage(&self, name: &str) -> Option<&Linkage> {
        self.linkages.get(name)
    }

    /// The node reached through a configured relation (the target node, also
    /// for indirect relations).
    pub fn child(&self, name: &str) -> Option<&Node> {
        self.linkages.get(name).map(Linkage::node)
    }

    /// Configured aliases.
    pub fn aliases(&self) -> &IndexMap<String, Vec<String>> {
        &self.aliases
    }

    /// The column selection of an unrestricted fetch: readable columns,
    /// `always` columns and the parent-side join columns of every relation.
    pub fn query_columns(&self) -> &[String] {
        &self.select
    }

    /// Readable paths: columns, methods, and the readable paths of every
    /// relation prefixed with its name.
    pub fn get_paths(&self) -> &PathSet {
        self.get_paths.get_or_init(|| {
            let mut paths: PathSet = self.policy.readable().cloned().collect();
            for (name, linkage) in &self.linkages {
                paths.extend(linkage.node().get_paths().iter().map(|p| join_path(name, p)));
            }
            paths
        })
    }

    /// Assignable paths: columns, and the assignable paths of every relation.
    pub fn set_paths(&self) -> &PathSet {
        self.set_paths.get_or_init(|| {
            let mut paths: PathSet = self.policy.assignable().cloned().collect();
            for (name, linkage) in &self.linkages {
                paths.extend(linkage.node().set_paths().iter().map(|p| join_path(name, p)));
            }
            paths
        })
    }

    /// The relation tree, for flattening nested write payloads.
    pub fn nest_paths(&self) -> &NestPaths {
        self.nest_paths.get_or_init(|| NestPaths {
            columns: self.policy.assignable().cloned().collect(),
            relations: self
                .linkages
                .iter()
                .map(|(name, linkage)| (name.clone(), linkage.node().nest_paths().clone()))
                .collect(),
        })
    }

    /// A new node narrowed to `paths`.
    ///
    /// Leaf paths narrow the columns and methods. A path like `"job.name"`
    /// narrows the `job` relation to `["name"]`; a bare relation name keeps the
    /// whole relation. Relations not referenced are dropped.
    pub fn only(&self, paths: &[String]) -> Node {
        let tree = PathTree::new(paths);

        let mut linkages = IndexMap::new();
        for (name, linkage) in &self.linkages {
            if tree.leaves.contains(name.as_str()) {
                linkages.insert(name.clone(), linkage.clone());
            } else if let Some(nested) = tree.nested.get(name.as_str()) {
                linkages.insert(name.clone(), linkage.only(nested));
            }
        }

        self.narrowed(self.policy.only(&tree.leaves), linkages)
    }

    /// A new node without `paths`.
    ///
    /// Leaf paths remove columns, methods or whole relations; nested paths
    /// narrow the relation they start with. Other relations are kept.
    pub fn except(&self, paths: &[String]) -> Node {
        let tree = PathTree::new(paths);

        let mut linkages = IndexMap::new();
        for (name, linkage) in &self.linkages {
            if tree.leaves.contains(name.as_str()) {
                continue;
            }
            let linkage = match tree.nested.get(name.as_str()) {
                Some(nested) => linkage.except(nested),
                None => linkage.clone(),
            };
            linkages.insert(name.clone(), linkage);
        }

        self.narrowed(self.policy.except(&tree.leaves), linkages)
    }

    fn narrowed(&self, policy: AccessPolicy, linkages: IndexMap<String, Linkage>) -> Node {
        Self::assemble(
            self.entity.clone(),
            self.primary_key.clone(),
            policy,
            linkages,
            self.aliases.clone(),
        )
    }

    /// Rewrite the column selection of a request for this node.
    ///
    /// Requested columns are restricted to readable ones (an empty request
    /// means all of them), then `always` columns, join columns and `required`
    /// are added. Filter, ordering, limit and grouping are kept.
    pub fn scope(&self, request: FetchRequest, required: &[String]) -> FetchRequest {
        let join_columns = self.linkages.values().flat_map(|l| l.parent_columns());
        let columns = self
            .policy
            .select(&request.columns, join_columns.chain(required));

        FetchRequest {
            entity: self.entity.clone(),
            columns,
            ..request
        }
    }

    /// Fetch the records matching `request` with every configured relation
    /// linked onto them.
    ///
    /// Each relation level costs one fetch, whatever the number of parents.
    pub async fn find(
        &self,
        store: &dyn RecordStore,
        request: FetchRequest,
    ) -> GraphResult<Vec<Record>> {
        self.fetch_and_link(store, request, &[]).await
    }

    pub(crate) fn fetch_and_link<'a>(
        &'a self,
        store: &'a dyn RecordStore,
        request: FetchRequest,
        required: &'a [String],
    ) -> BoxFuture<'a, GraphResult<Vec<Record>>> {
        Box::pin(async move {
            let request = self.scope(request, required);
            debug!(
                entity = %self.entity,
                columns = ?request.columns,
                filter = ?request.filter,
                "fetch"
            );

            let mut records = store.fetch(request).await?;
            self.link(store, &mut records).await?;
            Ok(records)
        })
    }

    /// Load every configured relation for a batch of already fetched records.
    ///
    /// Relations are fetched concurrently, one fetch each, and attached in
    /// configuration order once all of them have been loaded.
    pub async fn link(&self, store: &dyn RecordStore, parents: &mut [Record]) -> GraphResult<()> {
        if parents.is_empty() || self.linkages.is_empty() {
            return Ok(());
        }

        let batch: &[Record] = parents;
        let groups: Vec<KeyGroups> = self.linkages.values().map(|l| l.group(batch)).collect();

        let loads = self
            .linkages
            .values()
            .zip(&groups)
            .map(|(linkage, groups)| linkage.load(store, groups));
        let children = try_join_all(loads).await?;

        for ((linkage, groups), children) in self.linkages.values().zip(&groups).zip(children) {
            linkage.attach(parents, groups, children);
        }
        Ok(())
    }
}
