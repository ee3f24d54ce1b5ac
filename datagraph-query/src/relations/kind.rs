//! The closed set of relation kinds the linkage layer can load.

use std::fmt;

use crate::error::{GraphError, GraphResult};
use crate::schema::{RelationDescription, RelationKind};

/// Kind of a loadable relation edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    /// The parent holds the key of a single child (e.g., Emp belongs to Job).
    BelongsTo,
    /// A single child holds the key of the parent (e.g., User has one Profile).
    HasOne,
    /// Many children hold the key of the parent (e.g., Dept has many Emps).
    HasMany,
}

impl LinkKind {
    /// Resolve the link kind of a declared relation.
    ///
    /// Fails for kinds the linkage layer cannot load, and for indirect
    /// belongs-to relations.
    pub fn of(entity: &str, relation: &RelationDescription) -> GraphResult<Self> {
        let unsupported = |kind: String| GraphError::UnsupportedRelationKind {
            entity: entity.to_string(),
            relation: relation.name.clone(),
            kind,
        };

        let kind = match relation.kind {
            RelationKind::BelongsTo => Self::BelongsTo,
            RelationKind::HasOne => Self::HasOne,
            RelationKind::HasMany => Self::HasMany,
            other => return Err(unsupported(other.to_string())),
        };

        if kind == Self::BelongsTo && relation.through.is_some() {
            return Err(unsupported(format!("{} :through", relation.kind)));
        }

        Ok(kind)
    }

    /// Check if this relation links many children to a parent.
    pub fn is_many(&self) -> bool {
        matches!(self, Self::HasMany)
    }

    /// Check if this relation links at most one child to a parent.
    pub fn is_one(&self) -> bool {
        !self.is_many()
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BelongsTo => "belongs_to",
            Self::HasOne => "has_one",
            Self::HasMany => "has_many",
        })
    }
}
