//! Raw records returned by a store and the relation slots linking attaches to them.

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::filter::FilterValue;
use crate::relations::JoinKey;

/// The value of a linked relation on a record.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationValue {
    /// A singular relation (belongs-to, has-one); `None` marks "no match".
    One(Option<Box<Record>>),
    /// A plural relation (has-many), in the order the child fetch returned rows.
    Many(Vec<Record>),
}

impl RelationValue {
    /// The single linked record, if this is a populated singular relation.
    pub fn as_one(&self) -> Option<&Record> {
        match self {
            Self::One(record) => record.as_deref(),
            Self::Many(_) => None,
        }
    }

    /// The linked records, if this is a plural relation.
    pub fn as_many(&self) -> Option<&[Record]> {
        match self {
            Self::Many(records) => Some(records),
            Self::One(_) => None,
        }
    }

    /// Whether nothing was linked.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::One(record) => record.is_none(),
            Self::Many(records) => records.is_empty(),
        }
    }
}

impl Serialize for RelationValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::One(record) => record.serialize(serializer),
            Self::Many(records) => records.serialize(serializer),
        }
    }
}

/// One row of an entity, plus the relations linked onto it.
///
/// A relation name missing from [`Record::relations`] is unset; after a
/// fetch-and-link pass every configured relation is present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: IndexMap<String, FilterValue>,
    relations: IndexMap<String, RelationValue>,
}

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record from column/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<FilterValue>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            relations: IndexMap::new(),
        }
    }

    /// Read a column value.
    pub fn get(&self, column: &str) -> Option<&FilterValue> {
        self.fields.get(column)
    }

    /// Set a column value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<FilterValue>) {
        self.fields.insert(column.into(), value.into());
    }

    /// Column values in insertion order.
    pub fn fields(&self) -> &IndexMap<String, FilterValue> {
        &self.fields
    }

    /// Keep only the named columns, in the given order.
    pub fn project(&self, columns: &[String]) -> Self {
        let fields = columns
            .iter()
            .filter_map(|c| self.fields.get(c).map(|v| (c.clone(), v.clone())))
            .collect();
        Self {
            fields,
            relations: IndexMap::new(),
        }
    }

    /// Read the ordered tuple of the given key columns; missing columns read as
    /// null and numeric cells are normalized with [`FilterValue::to_key`].
    pub fn key(&self, columns: &[String]) -> JoinKey {
        columns
            .iter()
            .map(|c| self.fields.get(c).map_or(FilterValue::Null, FilterValue::to_key))
            .collect()
    }

    /// A linked relation, if it has been set.
    pub fn relation(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name)
    }

    /// Linked relations in the order they were set.
    pub fn relations(&self) -> &IndexMap<String, RelationValue> {
        &self.relations
    }

    /// Assign a relation slot.
    pub fn set_relation(&mut self, name: impl Into<String>, value: RelationValue) {
        self.relations.insert(name.into(), value);
    }

    pub(crate) fn relation_mut(&mut self, name: &str) -> Option<&mut RelationValue> {
        self.relations.get_mut(name)
    }

    /// Remove a relation slot, returning its value.
    pub fn take_relation(&mut self, name: &str) -> Option<RelationValue> {
        self.relations.shift_remove(name)
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + self.relations.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        for (k, v) in &self.relations {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}
