//! Error types for graph construction, fetching and path validation.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur while building or using a data graph.
#[derive(Error, Debug, Diagnostic)]
pub enum GraphError {
    /// One or more paths are not reachable through the active subset.
    #[error("inaccessible: {paths:?}")]
    #[diagnostic(
        code(datagraph::inaccessible_path),
        help("only paths returned by `get_paths`/`set_paths` of the subset may be used")
    )]
    InaccessiblePath { paths: Vec<String> },

    /// A relation kind the linkage layer cannot load.
    #[error("currently unsupported relation kind `{kind}` for `{entity}.{relation}`")]
    #[diagnostic(code(datagraph::unsupported_relation_kind))]
    UnsupportedRelationKind {
        entity: String,
        relation: String,
        kind: String,
    },

    /// A subset name that was never registered.
    #[error("no such subset: {name:?}")]
    #[diagnostic(code(datagraph::unknown_subset))]
    UnknownSubset { name: String },

    /// The schema introspector does not know the entity.
    #[error("unknown entity `{entity}`")]
    #[diagnostic(code(datagraph::unknown_entity))]
    UnknownEntity { entity: String },

    /// A configured relation is not declared on the entity.
    #[error("unknown relation `{entity}.{relation}`")]
    #[diagnostic(code(datagraph::unknown_relation))]
    UnknownRelation { entity: String, relation: String },

    /// Local and foreign join columns differ in arity.
    #[error(
        "relation `{entity}.{relation}` joins {local:?} to {foreign:?}; key columns must pair up"
    )]
    #[diagnostic(code(datagraph::join_column_mismatch))]
    JoinColumnMismatch {
        entity: String,
        relation: String,
        local: Vec<String>,
        foreign: Vec<String>,
    },

    /// An alias expansion refers to another alias.
    #[error("alias `{alias}` expands to `{path}`, which is itself an alias")]
    #[diagnostic(
        code(datagraph::nested_alias),
        help("aliases are resolved one level deep; expand `{path}` inline instead")
    )]
    NestedAlias { alias: String, path: String },

    /// The record store failed to execute a fetch.
    #[error("fetch from `{entity}` failed: {message}")]
    #[diagnostic(code(datagraph::store))]
    Store { entity: String, message: String },

    /// Error reading a configuration or schema file.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(datagraph::io_error))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML")]
    #[diagnostic(code(datagraph::toml_error))]
    Toml {
        #[source]
        source: toml::de::Error,
    },

    /// JSON parsing error.
    #[error("failed to parse JSON")]
    #[diagnostic(code(datagraph::json_error))]
    Json {
        #[source]
        source: serde_json::Error,
    },
}

impl GraphError {
    /// Create an inaccessible path error.
    pub fn inaccessible(paths: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::InaccessiblePath {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Create an unknown subset error.
    pub fn unknown_subset(name: impl Into<String>) -> Self {
        Self::UnknownSubset { name: name.into() }
    }

    /// Create an unknown entity error.
    pub fn unknown_entity(entity: impl Into<String>) -> Self {
        Self::UnknownEntity {
            entity: entity.into(),
        }
    }

    /// Create an unknown relation error.
    pub fn unknown_relation(entity: impl Into<String>, relation: impl Into<String>) -> Self {
        Self::UnknownRelation {
            entity: entity.into(),
            relation: relation.into(),
        }
    }

    /// Create a store failure error.
    pub fn store(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// The offending paths, if this is an inaccessible path error.
    pub fn paths(&self) -> Option<&[String]> {
        match self {
            Self::InaccessiblePath { paths } => Some(paths),
            _ => None,
        }
    }

    /// Whether this error reflects a static misconfiguration of the graph.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedRelationKind { .. }
                | Self::UnknownEntity { .. }
                | Self::UnknownRelation { .. }
                | Self::JoinColumnMismatch { .. }
                | Self::NestedAlias { .. }
        )
    }
}
