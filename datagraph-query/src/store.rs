//! The record store seam: the only way the graph reads data.
//!
//! A store executes one [`FetchRequest`] at a time. The graph never issues
//! joins; every relation level is one request with a key filter.
//!
//! [`MemoryStore`] evaluates requests against in-memory tables and records
//! every request it serves, which makes fetch counts observable in tests.

use std::cmp::Ordering;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::error::{GraphError, GraphResult};
use crate::filter::Filter;
use crate::record::Record;
use crate::types::{OrderBy, SortOrder};

/// A boxed future for store operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One fetch against a single entity.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Entity to read.
    pub entity: String,
    /// Columns to return; empty means every column.
    pub columns: Vec<String>,
    /// Row predicate.
    pub filter: Filter,
    /// Result ordering.
    pub order_by: Option<OrderBy>,
    /// Maximum number of rows.
    pub limit: Option<u64>,
    /// Grouping columns; one row is returned per distinct group.
    pub group_by: Vec<String>,
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self {
            entity: String::new(),
            columns: Vec::new(),
            filter: Filter::None,
            order_by: None,
            limit: None,
            group_by: Vec::new(),
        }
    }
}

impl FetchRequest {
    /// Create an unfiltered request; the entity is filled in by the node that runs it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an unfiltered request for an entity.
    pub fn for_entity(entity: impl Into<String>) -> Self {
        Self::new().entity(entity)
    }

    /// Set the entity.
    pub fn entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = entity.into();
        self
    }

    /// Restrict the returned columns.
    pub fn columns(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the row predicate.
    pub fn filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Add a predicate, ANDed with the current one.
    pub fn and_filter(mut self, filter: Filter) -> Self {
        self.filter = std::mem::take(&mut self.filter).and_then(filter);
        self
    }

    /// Set the ordering.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.order_by = Some(order.into());
        self
    }

    /// Limit the number of rows.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Return one row per distinct value of `columns`.
    pub fn group_by(mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Return at most one row.
    pub fn first(self) -> Self {
        self.limit(1)
    }
}

/// A source of records.
///
/// # Example
///
/// ```rust
/// use datagraph_query::store::{BoxFuture, FetchRequest, RecordStore};
/// use datagraph_query::{GraphResult, Record};
///
/// struct Empty;
///
/// impl RecordStore for Empty {
///     fn fetch<'a>(&'a self, _request: FetchRequest) -> BoxFuture<'a, GraphResult<Vec<Record>>> {
///         Box::pin(async move { Ok(Vec::new()) })
///     }
/// }
/// ```
pub trait RecordStore: Send + Sync {
    /// Execute one request.
    fn fetch<'a>(&'a self, request: FetchRequest) -> BoxFuture<'a, GraphResult<Vec<Record>>>;
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn fetch<'a>(&'a self, request: FetchRequest) -> BoxFuture<'a, GraphResult<Vec<Record>>> {
        (**self).fetch(request)
    }
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn fetch<'a>(&'a self, request: FetchRequest) -> BoxFuture<'a, GraphResult<Vec<Record>>> {
        (**self).fetch(request)
    }
}

/// In-memory tables keyed by entity name.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<IndexMap<String, Vec<Record>>>,
    log: Mutex<Vec<FetchRequest>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a table.
    pub fn with_table(self, entity: impl Into<String>, rows: impl IntoIterator<Item = Record>) -> Self {
        self.tables.write().insert(entity.into(), rows.into_iter().collect());
        self
    }

    /// Append a row to a table, creating the table if needed.
    pub fn insert(&self, entity: impl Into<String>, row: Record) {
        self.tables.write().entry(entity.into()).or_default().push(row);
    }

    /// Every request served so far, in order.
    pub fn fetch_log(&self) -> Vec<FetchRequest> {
        self.log.lock().clone()
    }

    /// Number of requests served so far.
    pub fn fetch_count(&self) -> usize {
        self.log.lock().len()
    }

    /// Forget the served requests.
    pub fn clear_log(&self) {
        self.log.lock().clear();
    }

    fn execute(&self, request: &FetchRequest) -> GraphResult<Vec<Record>> {
        let tables = self.tables.read();
        let rows = tables
            .get(&request.entity)
            .ok_or_else(|| GraphError::store(&request.entity, "no such table"))?;

        let mut matched: Vec<&Record> = rows.iter().filter(|r| request.filter.matches(r)).collect();

        if !request.group_by.is_empty() {
            let mut seen = IndexSet::new();
            matched.retain(|r| seen.insert(r.key(&request.group_by)));
        }

        if let Some(order) = &request.order_by {
            matched.sort_by(|a, b| compare_rows(order, a, b));
        }

        if let Some(limit) = request.limit {
            matched.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        Ok(matched
            .into_iter()
            .map(|r| {
                if request.columns.is_empty() {
                    r.clone()
                } else {
                    r.project(&request.columns)
                }
            })
            .collect())
    }
}

impl RecordStore for MemoryStore {
    fn fetch<'a>(&'a self, request: FetchRequest) -> BoxFuture<'a, GraphResult<Vec<Record>>> {
        Box::pin(async move {
            let rows = self.execute(&request);
            trace!(
                entity = %request.entity,
                filter = ?request.filter,
                rows = rows.as_ref().map(Vec::len).unwrap_or(0),
                "memory fetch"
            );
            self.log.lock().push(request);
            rows
        })
    }
}

/// Row comparison for an ordering; nulls sort first when ascending.
fn compare_rows(order: &OrderBy, a: &Record, b: &Record) -> Ordering {
    for field in order.fields() {
        let value = |r: &Record| r.get(&field.column).filter(|v| !v.is_null()).cloned();
        let ordering = match (value(a), value(b)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.partial_cmp_value(&y).unwrap_or(Ordering::Equal),
        };
        let ordering = match field.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
