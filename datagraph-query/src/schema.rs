//! Entity metadata: columns and declared relations.
//!
//! Graph construction reads metadata through the [`SchemaIntrospector`] trait.
//! [`SchemaDefinition`] is a static implementation that can be built in code or
//! loaded from TOML/JSON:
//!
//! ```toml
//! [entities.emps]
//! columns = ["id", "first_name", "job_id", "dept_id"]
//! primary_key = ["id"]
//!
//! [[entities.emps.relations]]
//! name = "job"
//! kind = "belongs_to"
//! target = "jobs"
//! local_columns = ["job_id"]
//! foreign_columns = ["id"]
//! ```

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};
use crate::filter::Filter;
use crate::types::OrderByField;

/// Source of entity metadata.
pub trait SchemaIntrospector: Send + Sync {
    /// Describe the columns and relations of an entity.
    fn describe(&self, entity: &str) -> GraphResult<EntityDescription>;
}

/// Relation kinds a host schema may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Parent holds the foreign key.
    BelongsTo,
    /// Child holds the foreign key, one child.
    HasOne,
    /// Child holds the foreign key, many children.
    HasMany,
    /// Join-table relation without an intermediate entity.
    HasAndBelongsToMany,
}

impl RelationKind {
    /// The snake_case name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BelongsTo => "belongs_to",
            Self::HasOne => "has_one",
            Self::HasMany => "has_many",
            Self::HasAndBelongsToMany => "has_and_belongs_to_many",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relation declared on an entity.
///
/// `local_columns` live on the declaring entity, `foreign_columns` on the
/// target, paired by position. Indirect relations name the hop relation on the
/// declaring entity in `through`, and the relation on the hop entity in
/// `source` (defaulting to this relation's name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDescription {
    /// Name of the relation (field name).
    pub name: String,
    /// Kind of relation.
    pub kind: RelationKind,
    /// Target entity.
    pub target: String,
    /// Key columns on the declaring entity.
    #[serde(default)]
    pub local_columns: Vec<String>,
    /// Key columns on the target entity.
    #[serde(default)]
    pub foreign_columns: Vec<String>,
    /// Hop relation for indirect relations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub through: Option<String>,
    /// Relation on the hop entity reaching the final target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Static predicate on the target, ANDed into every fetch.
    #[serde(skip)]
    pub conditions: Option<Filter>,
    /// Default ordering of fetched targets.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order_by: Vec<OrderByField>,
}

impl RelationDescription {
    fn new(
        name: impl Into<String>,
        kind: RelationKind,
        target: impl Into<String>,
        local_columns: impl IntoIterator<Item = impl Into<String>>,
        foreign_columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            target: target.into(),
            local_columns: local_columns.into_iter().map(Into::into).collect(),
            foreign_columns: foreign_columns.into_iter().map(Into::into).collect(),
            through: None,
            source: None,
            conditions: None,
            order_by: Vec::new(),
        }
    }

    /// Declare a belongs-to relation.
    pub fn belongs_to(
        name: impl Into<String>,
        target: impl Into<String>,
        local_columns: impl IntoIterator<Item = impl Into<String>>,
        foreign_columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::new(name, RelationKind::BelongsTo, target, local_columns, foreign_columns)
    }

    /// Declare a has-one relation.
    pub fn has_one(
        name: impl Into<String>,
        target: impl Into<String>,
        local_columns: impl IntoIterator<Item = impl Into<String>>,
        foreign_columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::new(name, RelationKind::HasOne, target, local_columns, foreign_columns)
    }

    /// Declare a has-many relation.
    pub fn has_many(
        name: impl Into<String>,
        target: impl Into<String>,
        local_columns: impl IntoIterator<Item = impl Into<String>>,
        foreign_columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::new(name, RelationKind::HasMany, target, local_columns, foreign_columns)
    }

    /// Make this relation indirect via the named hop relation.
    pub fn through(mut self, hop: impl Into<String>) -> Self {
        self.through = Some(hop.into());
        self
    }

    /// Name the relation on the hop entity that reaches the target.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a static predicate on the target.
    pub fn conditions(mut self, filter: Filter) -> Self {
        self.conditions = Some(filter);
        self
    }

    /// Set the default ordering of targets.
    pub fn order_by(mut self, fields: impl IntoIterator<Item = OrderByField>) -> Self {
        self.order_by = fields.into_iter().collect();
        self
    }

    /// The relation on the hop entity, for indirect relations.
    pub fn source_name(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }
}

/// Columns and relations of one entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDescription {
    /// Entity name; filled from the map key when loaded from a file.
    #[serde(default)]
    pub name: String,
    /// Declared columns, in schema order.
    pub columns: Vec<String>,
    /// Primary key columns.
    #[serde(default)]
    pub primary_key: Vec<String>,
    /// Declared relations.
    #[serde(default)]
    pub relations: Vec<RelationDescription>,
}

impl EntityDescription {
    /// Describe an entity with the given columns.
    pub fn new(name: impl Into<String>, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            primary_key: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Set the primary key columns.
    pub fn primary_key(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Declare a relation.
    pub fn relation(mut self, relation: RelationDescription) -> Self {
        self.relations.push(relation);
        self
    }

    /// Look up a declared relation.
    pub fn find_relation(&self, name: &str) -> Option<&RelationDescription> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Check whether a column is declared.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

/// A static schema, keyed by entity name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefinition {
    /// Entity descriptions.
    #[serde(default)]
    pub entities: IndexMap<String, EntityDescription>,
}

impl SchemaDefinition {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity description.
    pub fn entity(mut self, description: EntityDescription) -> Self {
        self.entities.insert(description.name.clone(), description);
        self
    }

    /// Parse a schema from a TOML string.
    pub fn from_toml_str(content: &str) -> GraphResult<Self> {
        let schema: Self = toml::from_str(content).map_err(|e| GraphError::Toml { source: e })?;
        Ok(schema.named())
    }

    /// Parse a schema from a JSON string.
    pub fn from_json_str(content: &str) -> GraphResult<Self> {
        let schema: Self =
            serde_json::from_str(content).map_err(|e| GraphError::Json { source: e })?;
        Ok(schema.named())
    }

    /// Load a schema file; `.json` files are read as JSON, anything else as TOML.
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

    fn named(mut self) -> Self {
        for (name, description) in self.entities.iter_mut() {
            if description.name.is_empty() {
                description.name = name.clone();
            }
        }
        self
    }
}

impl SchemaIntrospector for SchemaDefinition {
    fn describe(&self, entity: &str) -> GraphResult<EntityDescription> {
        self.entities
            .get(entity)
            .cloned()
            .ok_or_else(|| GraphError::unknown_entity(entity))
    }
}
