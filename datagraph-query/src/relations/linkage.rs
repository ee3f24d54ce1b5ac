//! One edge of the fetch graph and its batched fetch/link algorithm.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::NodeConfig;
use crate::error::{GraphError, GraphResult};
use crate::filter::Filter;
use crate::node::Node;
use crate::paths::join_path;
use crate::record::{Record, RelationValue};
use crate::schema::{EntityDescription, RelationDescription, SchemaIntrospector};
use crate::store::{FetchRequest, RecordStore};
use crate::types::OrderBy;

use super::keys::KeyGroups;
use super::kind::LinkKind;

/// A relation from a parent node to a child node.
///
/// An indirect (`through`) relation is loaded via a hop node on the
/// intermediate entity: nothing on the hop is readable, and the real target is
/// included under the source relation. After the fetch, each hop record is
/// replaced by the target(s) it carries.
#[derive(Debug, Clone)]
pub struct Linkage {
    name: String,
    kind: LinkKind,
    through: Option<String>,
    parent_columns: Vec<String>,
    child_columns: Vec<String>,
    child_node: Arc<Node>,
    order_by: Option<OrderBy>,
    limit: Option<u64>,
    group_by: Vec<String>,
    conditions: Option<Filter>,
}

impl Linkage {
    /// Build the linkage for a declared relation of `parent`.
    pub fn build(
        schema: &dyn SchemaIntrospector,
        parent: &EntityDescription,
        relation: &RelationDescription,
        config: &NodeConfig,
    ) -> GraphResult<Self> {
        let kind = LinkKind::of(&parent.name, relation)?;

        let (hop, through, child_config) = match &relation.through {
            Some(via) => {
                let hop = parent
                    .find_relation(via)
                    .ok_or_else(|| GraphError::unknown_relation(&parent.name, via))?;
                if hop.through.is_some() {
                    return Err(GraphError::UnsupportedRelationKind {
                        entity: parent.name.clone(),
                        relation: relation.name.clone(),
                        kind: format!("{} :through indirect `{}`", relation.kind, via),
                    });
                }
                LinkKind::of(&parent.name, hop)?;

                let source = relation.source_name().to_string();
                let hop_config = NodeConfig::through(source.clone(), config.clone());
                (hop, Some(source), Cow::Owned(hop_config))
            }
            None => (relation, None, Cow::Borrowed(config)),
        };

        if hop.local_columns.is_empty() || hop.local_columns.len() != hop.foreign_columns.len() {
            return Err(GraphError::JoinColumnMismatch {
                entity: parent.name.clone(),
                relation: hop.name.clone(),
                local: hop.local_columns.clone(),
                foreign: hop.foreign_columns.clone(),
            });
        }

        let child_node = Node::build(schema, &hop.target, &child_config)?;
        let order_by = child_config
            .ordering()
            .or_else(|| Some(OrderBy::from(hop.order_by.clone())).filter(|o| !o.is_empty()));

        Ok(Self {
            name: relation.name.clone(),
            kind,
            through,
            parent_columns: hop.local_columns.clone(),
            child_columns: hop.foreign_columns.clone(),
            child_node: Arc::new(child_node),
            order_by,
            limit: child_config.limit,
            group_by: child_config.group_by.clone(),
            conditions: hop.conditions.clone(),
        })
    }

    /// Relation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relation kind.
    pub fn kind(&self) -> LinkKind {
        self.kind
    }

    /// Source relation on the hop entity, for indirect relations.
    pub fn through(&self) -> Option<&str> {
        self.through.as_deref()
    }

    /// Key columns read from parent records.
    pub fn parent_columns(&self) -> &[String] {
        &self.parent_columns
    }

    /// Key columns read from fetched child records.
    pub fn child_columns(&self) -> &[String] {
        &self.child_columns
    }

    /// The node fetched by this linkage (the hop node for indirect relations).
    pub fn child_node(&self) -> &Node {
        &self.child_node
    }

    /// The node records end up as once linked: the target node, also for
    /// indirect relations.
    pub fn node(&self) -> &Node {
        match &self.through {
            Some(source) => self.child_node.child(source).unwrap_or(&self.child_node),
            None => &self.child_node,
        }
    }

    /// Ordering of the batched fetch.
    pub fn order_by(&self) -> Option<&OrderBy> {
        self.order_by.as_ref()
    }

    /// Row limit of the batched fetch.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Grouping columns of the batched fetch.
    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    /// Static predicate ANDed into the batched fetch.
    pub fn conditions(&self) -> Option<&Filter> {
        self.conditions.as_ref()
    }

    /// A copy whose child node is narrowed to `paths`.
    pub fn only(&self, paths: &[String]) -> Self {
        self.inherit(paths, Node::only)
    }

    /// A copy whose child node excludes `paths`.
    pub fn except(&self, paths: &[String]) -> Self {
        self.inherit(paths, Node::except)
    }

    fn inherit(&self, paths: &[String], narrow: impl FnOnce(&Node, &[String]) -> Node) -> Self {
        let paths: Cow<'_, [String]> = match &self.through {
            Some(source) => Cow::Owned(paths.iter().map(|p| join_path(source, p)).collect()),
            None => Cow::Borrowed(paths),
        };

        Self {
            child_node: Arc::new(narrow(&*self.child_node, paths.as_ref())),
            ..self.clone()
        }
    }

    /// Group a parent batch by this relation's parent key.
    pub fn group(&self, parents: &[Record]) -> KeyGroups {
        KeyGroups::from_records(parents, &self.parent_columns)
    }

    /// The single child fetch for a grouped parent batch.
    pub fn request(&self, groups: &KeyGroups) -> FetchRequest {
        let mut filter = Filter::in_keys(&self.child_columns, groups.tuples());
        if let Some(conditions) = &self.conditions {
            filter = filter.and_then(conditions.clone());
        }

        let mut request = FetchRequest::new()
            .filter(filter)
            .group_by(self.group_by.iter().cloned());
        if let Some(order) = &self.order_by {
            request = request.order_by(order.clone());
        }
        if let Some(limit) = self.limit {
            request = request.limit(limit);
        }
        request
    }

    /// Fetch the children of a grouped batch and materialize their subtree.
    ///
    /// Issues at most one fetch; none when no parent has a usable key.
    pub async fn load(
        &self,
        store: &dyn RecordStore,
        groups: &KeyGroups,
    ) -> GraphResult<Vec<Record>> {
        if groups.is_empty() {
            trace!(relation = %self.name, parents = groups.parent_count(), "no join keys, skipping fetch");
            return Ok(Vec::new());
        }

        debug!(
            relation = %self.name,
            kind = %self.kind,
            entity = %self.child_node.entity(),
            parents = groups.parent_count(),
            keys = groups.len(),
            "batched relation fetch"
        );

        let children = self
            .child_node
            .fetch_and_link(store, self.request(groups), &self.child_columns)
            .await?;

        debug!(relation = %self.name, rows = children.len(), "relation fetched");
        Ok(children)
    }

    /// Attach fetched children to the parents sharing their key.
    ///
    /// Every parent ends up with this relation set: parents without a match
    /// get `One(None)` or an empty `Many`.
    pub fn attach(&self, parents: &mut [Record], groups: &KeyGroups, children: Vec<Record>) {
        let mut visited = vec![false; parents.len()];

        for mut child in children {
            let key = child.key(&self.child_columns);
            let Some(indices) = groups.get(&key) else {
                trace!(relation = %self.name, "fetched child matches no parent");
                continue;
            };

            let unwrapped = self.unwrap_through(&mut child);
            let targets = unwrapped.as_deref().unwrap_or(std::slice::from_ref(&child));
            for &index in indices {
                let first = !visited[index];
                visited[index] = true;
                self.set_child(&mut parents[index], targets, first);
            }
        }

        let dedupe = self.kind.is_many() && self.through.is_some();
        for (parent, visited) in parents.iter_mut().zip(visited) {
            if !visited {
                parent.set_relation(&self.name, self.empty());
            } else if dedupe {
                if let Some(RelationValue::Many(records)) = parent.relation_mut(&self.name) {
                    dedupe_records(records);
                }
            }
        }
    }

    /// For indirect relations, detach the target(s) from a hop record.
    fn unwrap_through(&self, hop: &mut Record) -> Option<Vec<Record>> {
        let source = self.through.as_ref()?;
        Some(match hop.take_relation(source) {
            Some(RelationValue::One(Some(target))) => vec![*target],
            Some(RelationValue::Many(targets)) => targets,
            Some(RelationValue::One(None)) | None => Vec::new(),
        })
    }

    fn set_child(&self, parent: &mut Record, targets: &[Record], first: bool) {
        match self.kind {
            LinkKind::BelongsTo | LinkKind::HasOne => {
                if !first {
                    warn!(relation = %self.name, "several children matched a singular relation; keeping the last");
                }
                if first || !targets.is_empty() {
                    let target = targets.last().cloned().map(Box::new);
                    parent.set_relation(&self.name, RelationValue::One(target));
                }
            }
            LinkKind::HasMany => {
                if first {
                    parent.set_relation(&self.name, RelationValue::Many(targets.to_vec()));
                } else if let Some(RelationValue::Many(records)) = parent.relation_mut(&self.name) {
                    records.extend_from_slice(targets);
                }
            }
        }
    }

    fn empty(&self) -> RelationValue {
        if self.kind.is_many() {
            RelationValue::Many(Vec::new())
        } else {
            RelationValue::One(None)
        }
    }
}

/// Collapse repeated records, keeping first occurrences in order.
fn dedupe_records(records: &mut Vec<Record>) {
    let mut unique: Vec<Record> = Vec::with_capacity(records.len());
    for record in records.drain(..) {
        if !unique.contains(&record) {
            unique.push(record);
        }
    }
    *records = unique;
}
