//! Filter types for restricting fetches.
//!
//! A [`Filter`] is a small predicate tree. Stores backed by SQL render it with
//! [`Filter::to_sql`]; in-memory stores evaluate it with [`Filter::matches`].
//!
//! ```rust
//! use datagraph_query::{Filter, FilterValue};
//!
//! let filter = Filter::and([
//!     Filter::In("dept_id".into(), vec![10.into(), 20.into()]),
//!     Filter::Contains("name".into(), "c".into()),
//! ]);
//!
//! let (sql, params) = filter.to_sql(0);
//! assert_eq!(sql, "(dept_id IN ($1, $2) AND name LIKE $3)");
//! assert_eq!(params.len(), 3);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::record::Record;

/// A single column value, used both in records and as a filter operand.
///
/// Equality and hashing are total: floats compare by bit pattern so values can
/// take part in join-key tuples.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
}

impl FilterValue {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// This value as a join-key cell.
    ///
    /// Whole floats within `i64` range become integers, so keys hash and
    /// compare equal exactly when [`Filter::matches`] finds them equal.
    pub fn to_key(&self) -> FilterValue {
        const BOUND: f64 = 9_223_372_036_854_775_808.0;
        match self {
            Self::Float(v) if v.fract() == 0.0 && (-BOUND..BOUND).contains(v) => Self::Int(*v as i64),
            other => other.clone(),
        }
    }

    /// Compare two non-null values of compatible types.
    ///
    /// Integers and floats compare numerically; mismatched types have no order.
    pub fn partial_cmp_value(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Int(b)) => a.partial_cmp(b),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::String(a), Self::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

impl PartialEq for FilterValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for FilterValue {}

impl Hash for FilterValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int(v) => v.hash(state),
            Self::Float(v) => v.to_bits().hash(state),
            Self::String(v) => v.hash(state),
        }
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{:?}", v),
        }
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for FilterValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for FilterValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

static NULL: FilterValue = FilterValue::Null;

/// A complete filter that can be rendered to SQL or evaluated against a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// No filter (always true).
    None,

    /// Equals comparison.
    Equals(String, FilterValue),
    /// Not equals comparison.
    NotEquals(String, FilterValue),

    /// Less than comparison.
    Lt(String, FilterValue),
    /// Less than or equal comparison.
    Lte(String, FilterValue),
    /// Greater than comparison.
    Gt(String, FilterValue),
    /// Greater than or equal comparison.
    Gte(String, FilterValue),

    /// In a list of values.
    In(String, Vec<FilterValue>),
    /// Not in a list of values.
    NotIn(String, Vec<FilterValue>),
    /// Column tuple in a list of value tuples (composite keys).
    InTuple(Vec<String>, Vec<Vec<FilterValue>>),

    /// Contains (LIKE %value%).
    Contains(String, FilterValue),

    /// Is null check.
    IsNull(String),
    /// Is not null check.
    IsNotNull(String),

    /// Logical AND of multiple filters.
    And(Vec<Filter>),
    /// Logical OR of multiple filters.
    Or(Vec<Filter>),
    /// Logical NOT of a filter.
    Not(Box<Filter>),
}

impl Filter {
    /// Create an empty filter (matches everything).
    pub fn none() -> Self {
        Self::None
    }

    /// Check if this filter is empty.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Membership of a column tuple in a set of key tuples.
    ///
    /// Single-column keys collapse to a plain `IN`.
    pub fn in_keys(columns: &[String], keys: Vec<Vec<FilterValue>>) -> Self {
        if columns.len() == 1 {
            let values = keys.into_iter().filter_map(|k| k.into_iter().next()).collect();
            Self::In(columns[0].clone(), values)
        } else {
            Self::InTuple(columns.to_vec(), keys)
        }
    }

    /// Create an AND filter.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::And(filters),
        }
    }

    /// Create an OR filter.
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut filters: Vec<_> = filters.into_iter().filter(|f| !f.is_none()).collect();
        match filters.len() {
            0 => Self::None,
            1 => filters.remove(0),
            _ => Self::Or(filters),
        }
    }

    /// Create a NOT filter.
    pub fn not(filter: Filter) -> Self {
        if filter.is_none() {
            return Self::None;
        }
        Self::Not(Box::new(filter))
    }

    /// Combine with another filter using AND.
    pub fn and_then(self, other: Filter) -> Self {
        if self.is_none() {
            return other;
        }
        if other.is_none() {
            return self;
        }
        match self {
            Self::And(mut filters) => {
                filters.push(other);
                Self::And(filters)
            }
            _ => Self::And(vec![self, other]),
        }
    }

    /// Evaluate the filter against a record.
    ///
    /// Missing columns read as null, and comparisons involving null never match.
    pub fn matches(&self, record: &Record) -> bool {
        let get = |col: &str| record.get(col).unwrap_or(&NULL);
        let cmp = |col: &str, val: &FilterValue| {
            let lhs = get(col);
            if lhs.is_null() || val.is_null() {
                None
            } else {
                lhs.partial_cmp_value(val)
            }
        };

        match self {
            Self::None => true,
            Self::Equals(col, val) => {
                if val.is_null() {
                    get(col).is_null()
                } else {
                    cmp(col, val) == Some(Ordering::Equal)
                }
            }
            Self::NotEquals(col, val) => {
                if val.is_null() {
                    !get(col).is_null()
                } else {
                    matches!(cmp(col, val), Some(o) if o != Ordering::Equal)
                }
            }
            Self::Lt(col, val) => cmp(col, val) == Some(Ordering::Less),
            Self::Lte(col, val) => matches!(cmp(col, val), Some(Ordering::Less | Ordering::Equal)),
            Self::Gt(col, val) => cmp(col, val) == Some(Ordering::Greater),
            Self::Gte(col, val) => {
                matches!(cmp(col, val), Some(Ordering::Greater | Ordering::Equal))
            }
            Self::In(col, values) => values
                .iter()
                .any(|v| !v.is_null() && cmp(col, v) == Some(Ordering::Equal)),
            Self::NotIn(col, values) => {
                !get(col).is_null()
                    && values
                        .iter()
                        .all(|v| !v.is_null() && cmp(col, v) != Some(Ordering::Equal))
            }
            Self::InTuple(cols, tuples) => tuples.iter().any(|tuple| {
                tuple.len() == cols.len()
                    && cols
                        .iter()
                        .zip(tuple)
                        .all(|(c, v)| !v.is_null() && cmp(c, v) == Some(Ordering::Equal))
            }),
            Self::Contains(col, val) => match (get(col), val) {
                (FilterValue::String(s), FilterValue::String(needle)) => s.contains(needle.as_str()),
                _ => false,
            },
            Self::IsNull(col) => get(col).is_null(),
            Self::IsNotNull(col) => !get(col).is_null(),
            Self::And(filters) => filters.iter().all(|f| f.matches(record)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(record)),
            Self::Not(filter) => !filter.matches(record),
        }
    }

    /// Generate SQL for this filter with parameter placeholders.
    /// Returns (sql, params) where params are the values to bind.
    pub fn to_sql(&self, param_offset: usize) -> (String, Vec<FilterValue>) {
        let mut params = Vec::new();
        let sql = self.to_sql_with_params(param_offset, &mut params);
        (sql, params)
    }

    fn push_param(param_offset: usize, params: &mut Vec<FilterValue>, value: FilterValue) -> String {
        params.push(value);
        format!("${}", param_offset + params.len())
    }

    fn to_sql_with_params(&self, offset: usize, params: &mut Vec<FilterValue>) -> String {
        match self {
            Self::None => "TRUE".to_string(),

            Self::Equals(col, val) => {
                if val.is_null() {
                    format!("{} IS NULL", col)
                } else {
                    let p = Self::push_param(offset, params, val.clone());
                    format!("{} = {}", col, p)
                }
            }
            Self::NotEquals(col, val) => {
                if val.is_null() {
                    format!("{} IS NOT NULL", col)
                } else {
                    let p = Self::push_param(offset, params, val.clone());
                    format!("{} != {}", col, p)
                }
            }

            Self::Lt(col, val) => {
                format!("{} < {}", col, Self::push_param(offset, params, val.clone()))
            }
            Self::Lte(col, val) => {
                format!("{} <= {}", col, Self::push_param(offset, params, val.clone()))
            }
            Self::Gt(col, val) => {
                format!("{} > {}", col, Self::push_param(offset, params, val.clone()))
            }
            Self::Gte(col, val) => {
                format!("{} >= {}", col, Self::push_param(offset, params, val.clone()))
            }

            Self::In(col, values) => {
                if values.is_empty() {
                    return "FALSE".to_string();
                }
                let placeholders: Vec<_> = values
                    .iter()
                    .map(|v| Self::push_param(offset, params, v.clone()))
                    .collect();
                format!("{} IN ({})", col, placeholders.join(", "))
            }
            Self::NotIn(col, values) => {
                if values.is_empty() {
                    return "TRUE".to_string();
                }
                let placeholders: Vec<_> = values
                    .iter()
                    .map(|v| Self::push_param(offset, params, v.clone()))
                    .collect();
                format!("{} NOT IN ({})", col, placeholders.join(", "))
            }
            Self::InTuple(cols, tuples) => {
                if tuples.is_empty() {
                    return "FALSE".to_string();
                }
                let rows: Vec<_> = tuples
                    .iter()
                    .map(|tuple| {
                        let cells: Vec<_> = tuple
                            .iter()
                            .map(|v| Self::push_param(offset, params, v.clone()))
                            .collect();
                        format!("({})", cells.join(", "))
                    })
                    .collect();
                format!("({}) IN ({})", cols.join(", "), rows.join(", "))
            }

            Self::Contains(col, val) => {
                let value = match val {
                    FilterValue::String(s) => FilterValue::String(format!("%{}%", s)),
                    other => other.clone(),
                };
                format!("{} LIKE {}", col, Self::push_param(offset, params, value))
            }

            Self::IsNull(col) => format!("{} IS NULL", col),
            Self::IsNotNull(col) => format!("{} IS NOT NULL", col),

            Self::And(filters) => {
                if filters.is_empty() {
                    return "TRUE".to_string();
                }
                let parts: Vec<_> = filters
                    .iter()
                    .map(|f| f.to_sql_with_params(offset, params))
                    .collect();
                format!("({})", parts.join(" AND "))
            }
            Self::Or(filters) => {
                if filters.is_empty() {
                    return "FALSE".to_string();
                }
                let parts: Vec<_> = filters
                    .iter()
                    .map(|f| f.to_sql_with_params(offset, params))
                    .collect();
                format!("({})", parts.join(" OR "))
            }
            Self::Not(filter) => {
                let inner = filter.to_sql_with_params(offset, params);
                format!("NOT ({})", inner)
            }
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::None
    }
}
