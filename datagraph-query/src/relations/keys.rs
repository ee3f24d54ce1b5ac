//! Grouping of a parent batch by join-key tuple.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::filter::FilterValue;
use crate::record::Record;

/// The ordered values of a relation's key columns for one record.
pub type JoinKey = SmallVec<[FilterValue; 2]>;

/// Parents of one batch grouped by their join-key tuple.
///
/// Groups keep first-seen key order, and each group lists parent indices in
/// batch order. Tuples containing a null never match a child and are left out.
#[derive(Debug, Clone, Default)]
pub struct KeyGroups {
    groups: IndexMap<JoinKey, SmallVec<[usize; 1]>>,
    parents: usize,
}

impl KeyGroups {
    /// Group `records` by the values of `columns`.
    pub fn from_records(records: &[Record], columns: &[String]) -> Self {
        let mut groups: IndexMap<JoinKey, SmallVec<[usize; 1]>> = IndexMap::new();
        for (index, record) in records.iter().enumerate() {
            let key = record.key(columns);
            if key.iter().any(FilterValue::is_null) {
                continue;
            }
            groups.entry(key).or_default().push(index);
        }
        Self {
            groups,
            parents: records.len(),
        }
    }

    /// Indices of the parents sharing `key`.
    pub fn get(&self, key: &JoinKey) -> Option<&[usize]> {
        self.groups.get(key).map(|g| g.as_slice())
    }

    /// The distinct key tuples, in first-seen order.
    pub fn tuples(&self) -> Vec<Vec<FilterValue>> {
        self.groups.keys().map(|k| k.to_vec()).collect()
    }

    /// Number of distinct key tuples.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no parent has a usable key.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Size of the grouped batch, including parents left out for null keys.
    pub fn parent_count(&self) -> usize {
        self.parents
    }
}
