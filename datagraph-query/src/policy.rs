//! Column-level access policy for one entity.

use indexmap::IndexSet;
use tracing::warn;

use crate::config::NodeConfig;
use crate::schema::EntityDescription;

/// What a node may read, expose and fetch.
///
/// Readable columns are the declared columns narrowed by `only`/`except`.
/// `always` columns are fetched but not exposed as paths, and `methods` are
/// exposed as readable paths but never fetched or assigned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessPolicy {
    columns: Vec<String>,
    always: Vec<String>,
    methods: Vec<String>,
}

impl AccessPolicy {
    /// Compute the policy of an entity under a configuration.
    pub fn from_config(description: &EntityDescription, config: &NodeConfig) -> Self {
        let columns = description
            .columns
            .iter()
            .filter(|c| match (&config.only, &config.except) {
                (Some(only), _) => only.contains(c),
                (None, Some(except)) => !except.contains(c),
                (None, None) => true,
            })
            .cloned()
            .collect();

        let mut always = IndexSet::new();
        for column in &config.always {
            if description.has_column(column) {
                always.insert(column.clone());
            } else {
                warn!(
                    entity = %description.name,
                    column = %column,
                    "ignoring unknown `always` column"
                );
            }
        }

        let methods: IndexSet<String> = config.methods.iter().cloned().collect();

        Self {
            columns,
            always: always.into_iter().collect(),
            methods: methods.into_iter().collect(),
        }
    }

    /// Readable columns, in schema order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Columns fetched regardless of readability.
    pub fn always(&self) -> &[String] {
        &self.always
    }

    /// Derived, read-only names.
    pub fn methods(&self) -> &[String] {
        &self.methods
    }

    /// Leaf names readable at this level: columns, then methods.
    pub fn readable(&self) -> impl Iterator<Item = &String> {
        self.columns.iter().chain(self.methods.iter())
    }

    /// Leaf names assignable at this level.
    pub fn assignable(&self) -> impl Iterator<Item = &String> {
        self.columns.iter()
    }

    /// The fetch selection: readable columns, then `always` columns, then the
    /// given join columns, without duplicates.
    pub fn allowed_columns<'a>(
        &'a self,
        join_columns: impl IntoIterator<Item = &'a String>,
    ) -> Vec<String> {
        self.select(&[], join_columns)
    }

    /// Restrict a requested selection to readable columns and add what must
    /// always be fetched. An empty request selects every readable column.
    pub fn select<'a>(
        &'a self,
        requested: &'a [String],
        required: impl IntoIterator<Item = &'a String>,
    ) -> Vec<String> {
        let mut selection: IndexSet<&String> = if requested.is_empty() {
            self.columns.iter().collect()
        } else {
            requested
                .iter()
                .filter(|c| self.columns.contains(c))
                .collect()
        };
        selection.extend(self.always.iter());
        selection.extend(required);
        selection.into_iter().cloned().collect()
    }

    /// Keep only the named leaves.
    pub fn only(&self, names: &IndexSet<&str>) -> Self {
        Self {
            columns: retain(&self.columns, |c| names.contains(c)),
            always: self.always.clone(),
            methods: retain(&self.methods, |m| names.contains(m)),
        }
    }

    /// Drop the named leaves.
    pub fn except(&self, names: &IndexSet<&str>) -> Self {
        Self {
            columns: retain(&self.columns, |c| !names.contains(c)),
            always: self.always.clone(),
            methods: retain(&self.methods, |m| !names.contains(m)),
        }
    }
}

fn retain(items: &[String], keep: impl Fn(&str) -> bool) -> Vec<String> {
    items.iter().filter(|i| keep(i)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emps() -> EntityDescription {
        EntityDescription::new("emps", ["id", "first_name", "last_name", "ssn", "job_id"])
    }

    fn names<'a>(items: &[&'a str]) -> IndexSet<&'a str> {
        items.iter().copied().collect()
    }

    #[test]
    fn test_only_intersects_schema() {
        let config = NodeConfig::new().only(["first_name", "bogus"]);
        let policy = AccessPolicy::from_config(&emps(), &config);
        assert_eq!(policy.columns(), &["first_name"]);
    }

    #[test]
    fn test_except_subtracts() {
        let config = NodeConfig::new().except(["ssn"]);
        let policy = AccessPolicy::from_config(&emps(), &config);
        assert_eq!(policy.columns(), &["id", "first_name", "last_name", "job_id"]);
    }

    #[test]
    fn test_only_wins_over_except() {
        let config = NodeConfig::new().only(["ssn"]).except(["ssn"]);
        let policy = AccessPolicy::from_config(&emps(), &config);
        assert_eq!(policy.columns(), &["ssn"]);
    }

    #[test]
    fn test_allowed_columns_add_always_and_join_keys() {
        let config = NodeConfig::new().only(["first_name"]).always(["id", "nope"]);
        let policy = AccessPolicy::from_config(&emps(), &config);
        let join = vec!["job_id".to_string(), "first_name".to_string()];

        assert_eq!(policy.always(), &["id"]);
        assert_eq!(policy.allowed_columns(&join), vec!["first_name", "id", "job_id"]);
    }

    #[test]
    fn test_select_filters_request() {
        let config = NodeConfig::new().except(["ssn"]);
        let policy = AccessPolicy::from_config(&emps(), &config);
        let requested = vec!["ssn".to_string(), "last_name".to_string()];
        let required = vec!["id".to_string()];

        assert_eq!(policy.select(&requested, &required), vec!["last_name", "id"]);
    }

    #[test]
    fn test_methods_readable_not_assignable() {
        let config = NodeConfig::new().only(["first_name"]).methods(["full_name"]);
        let policy = AccessPolicy::from_config(&emps(), &config);

        let readable: Vec<_> = policy.readable().cloned().collect();
        let assignable: Vec<_> = policy.assignable().cloned().collect();
        assert_eq!(readable, vec!["first_name", "full_name"]);
        assert_eq!(assignable, vec!["first_name"]);
    }

    #[test]
    fn test_narrowing() {
        let config = NodeConfig::new().methods(["full_name"]).always(["id"]);
        let policy = AccessPolicy::from_config(&emps(), &config);

        let only = policy.only(&names(&["first_name", "full_name"]));
        assert_eq!(only.columns(), &["first_name"]);
        assert_eq!(only.methods(), &["full_name"]);
        assert_eq!(only.always(), &["id"]);

        let except = policy.except(&names(&["ssn", "full_name"]));
        assert_eq!(except.columns(), &["id", "first_name", "last_name", "job_id"]);
        assert!(except.methods().is_empty());
    }
}
