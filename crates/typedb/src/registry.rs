//! The metadata registry: one validated descriptor per registered model type.
//!
//! A [`Registry`] is an explicit object rather than hidden process state; the
//! [`Db`](crate::Db) handle owns one via `Arc`. All registrations must
//! complete before concurrent query traffic begins; registration is not
//! synchronized against queries, and lookups after that point are read-only.

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use crate::error::{DbError, DbResult};
use crate::schema::{ColumnDef, ModelQueries, Record};

/// Per-model registration options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelOptions {
    /// Enable change-tracked partial updates for this type.
    pub partial_update: bool,
}

/// Immutable shape of one registered model type.
#[derive(Debug, Clone)]
pub struct ModelDescriptor {
    pub type_name: &'static str,
    pub table: &'static str,
    pub columns: &'static [ColumnDef],
    pub partial_update: bool,
    /// Descriptor index of the primary key column, if the type has one.
    pub pk: Option<usize>,
    /// Composite groups: group name → member indices, sorted alphabetically
    /// by field name. The sort is the documented tie-break that fixes both
    /// lookup-method naming and parameter order in generated SQL.
    pub composites: BTreeMap<&'static str, Vec<usize>>,
    /// Every `QueryByX` name this type is required to answer.
    pub required_lookups: Vec<String>,
    validate: fn() -> Vec<String>,
}

impl ModelDescriptor {
    fn build<T: Record + ModelQueries + 'static>(options: ModelOptions) -> Self {
        let columns = T::columns();
        let pk = columns.iter().position(|c| c.primary);

        let mut composites: BTreeMap<&'static str, Vec<usize>> = BTreeMap::new();
        for (idx, col) in columns.iter().enumerate() {
            if let Some(group) = col.composite {
                composites.entry(group).or_default().push(idx);
            }
        }
        for members in composites.values_mut() {
            members.sort_by_key(|&idx| columns[idx].pascal);
        }

        let mut required_lookups = Vec::new();
        if let Some(idx) = pk {
            required_lookups.push(columns[idx].lookup_name());
        }
        for col in columns.iter().filter(|c| c.unique) {
            required_lookups.push(col.lookup_name());
        }
        for members in composites.values() {
            required_lookups.push(composite_lookup_name(columns, members));
        }

        Self {
            type_name: std::any::type_name::<T>(),
            table: T::table_name(),
            columns,
            partial_update: options.partial_update,
            pk,
            composites,
            required_lookups,
            validate: missing_lookups::<T>,
        }
    }

    pub fn pk_column(&self) -> Option<&ColumnDef> {
        self.pk.map(|idx| &self.columns[idx])
    }

    /// Lookup names this type's `query_by` fails to answer.
    pub fn missing_lookups(&self) -> Vec<String> {
        (self.validate)()
    }

    /// The alphabetically-sorted lookup name for a composite group.
    pub fn composite_lookup_name(&self, group: &str) -> Option<String> {
        self.composites
            .get(group)
            .map(|members| composite_lookup_name(self.columns, members))
    }
}

fn composite_lookup_name(columns: &[ColumnDef], members: &[usize]) -> String {
    let mut name = String::from("QueryBy");
    for &idx in members {
        name.push_str(columns[idx].pascal);
    }
    name
}

fn missing_lookups<T: Record + ModelQueries + 'static>() -> Vec<String> {
    let descriptor = ModelDescriptor::build::<T>(ModelOptions::default());
    descriptor
        .required_lookups
        .iter()
        .filter(|name| T::query_by(name).is_none())
        .cloned()
        .collect()
}

/// Maps registered model types to their descriptors.
///
/// Cheap to clone: instances share the same table through `Arc`.
#[derive(Clone, Default)]
pub struct Registry {
    models: Arc<RwLock<HashMap<TypeId, Arc<ModelDescriptor>>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model type with default options.
    ///
    /// # Panics
    ///
    /// Panics when the type is missing a lookup method required by a
    /// primary, unique, or composite field. This is intentionally a hard
    /// startup failure: a missing lookup is otherwise undiscoverable until
    /// the corresponding load path is exercised.
    pub fn register<T: Record + ModelQueries + 'static>(&self) {
        self.register_with_options::<T>(ModelOptions::default());
    }

    /// Register a model type, overriding any previous registration.
    ///
    /// # Panics
    ///
    /// Same validation as [`Registry::register`].
    pub fn register_with_options<T: Record + ModelQueries + 'static>(
        &self,
        options: ModelOptions,
    ) {
        let descriptor = ModelDescriptor::build::<T>(options);
        let missing = descriptor.missing_lookups();
        if !missing.is_empty() {
            panic!(
                "typedb: model validation failed for {}: missing method(s) {}",
                descriptor.type_name,
                missing.join(", ")
            );
        }
        self.models
            .write()
            .expect("registry lock poisoned")
            .insert(TypeId::of::<T>(), Arc::new(descriptor));
    }

    /// Register a model type without the lookup check.
    ///
    /// The missing-lookup failure is deferred to the [`validate_all`] sweep at
    /// `Db::open` (or skipped entirely by `Db::open_without_validation`, in
    /// which case a missing lookup surfaces as a per-call validation error).
    ///
    /// [`validate_all`]: Registry::validate_all
    pub fn register_unchecked<T: Record + ModelQueries + 'static>(&self, options: ModelOptions) {
        let descriptor = ModelDescriptor::build::<T>(options);
        self.models
            .write()
            .expect("registry lock poisoned")
            .insert(TypeId::of::<T>(), Arc::new(descriptor));
    }

    /// O(1) descriptor retrieval by type identity.
    pub fn descriptor<T: Record + 'static>(&self) -> DbResult<Arc<ModelDescriptor>> {
        self.models
            .read()
            .expect("registry lock poisoned")
            .get(&TypeId::of::<T>())
            .cloned()
            .ok_or_else(|| DbError::Unregistered(std::any::type_name::<T>().to_string()))
    }

    /// Re-run lookup validation across every registered model.
    ///
    /// Used by `Db::open`; returns a configuration error naming every
    /// missing method.
    pub fn validate_all(&self) -> DbResult<()> {
        let models = self.models.read().expect("registry lock poisoned");
        let mut problems = Vec::new();
        for descriptor in models.values() {
            for name in descriptor.missing_lookups() {
                problems.push(format!("{}: missing {name}", descriptor.type_name));
            }
        }
        if problems.is_empty() {
            Ok(())
        } else {
            Err(DbError::config(format!(
                "model validation failed: {}",
                problems.join("; ")
            )))
        }
    }

    pub fn is_empty(&self) -> bool {
        self.models.read().expect("registry lock poisoned").is_empty()
    }

    /// Clear all registrations. Test isolation only.
    pub fn reset(&self) {
        self.models.write().expect("registry lock poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Kind;
    use crate::value::{ToValue, Value, decode_column};

    #[derive(Default)]
    struct Account {
        id: i64,
        email: String,
    }

    static ACCOUNT_COLUMNS: &[ColumnDef] = &[
        ColumnDef {
            field: "id",
            pascal: "Id",
            column: "id",
            kind: Kind::Int,
            nullable: false,
            primary: true,
            unique: false,
            composite: None,
            auto_timestamp: false,
            nolog: false,
        },
        ColumnDef {
            field: "email",
            pascal: "Email",
            column: "email",
            kind: Kind::Text,
            nullable: false,
            primary: false,
            unique: true,
            composite: None,
            auto_timestamp: false,
            nolog: false,
        },
    ];

    impl Record for Account {
        fn table_name() -> &'static str {
            "accounts"
        }

        fn columns() -> &'static [ColumnDef] {
            ACCOUNT_COLUMNS
        }

        fn values(&self) -> Vec<Value> {
            vec![self.id.to_value(), self.email.to_value()]
        }

        fn put(&mut self, column: &str, value: Value) -> DbResult<()> {
            match column {
                "id" => self.id = decode_column(column, value)?,
                "email" => self.email = decode_column(column, value)?,
                _ => {}
            }
            Ok(())
        }
    }

    impl ModelQueries for Account {
        fn query_by(name: &str) -> Option<&'static str> {
            match name {
                "QueryById" => Some("SELECT id, email FROM accounts WHERE id = ?"),
                "QueryByEmail" => Some("SELECT id, email FROM accounts WHERE email = ?"),
                _ => None,
            }
        }
    }

    struct Incomplete {
        id: i64,
    }

    impl Record for Incomplete {
        fn table_name() -> &'static str {
            "incomplete"
        }

        fn columns() -> &'static [ColumnDef] {
            &ACCOUNT_COLUMNS[..1]
        }

        fn values(&self) -> Vec<Value> {
            vec![self.id.to_value()]
        }

        fn put(&mut self, _column: &str, _value: Value) -> DbResult<()> {
            Ok(())
        }
    }

    impl ModelQueries for Incomplete {
        fn query_by(_name: &str) -> Option<&'static str> {
            None
        }
    }

    #[test]
    fn register_and_lookup() {
        let registry = Registry::new();
        registry.register::<Account>();
        let desc = registry.descriptor::<Account>().unwrap();
        assert_eq!(desc.table, "accounts");
        assert_eq!(desc.pk, Some(0));
        assert_eq!(
            desc.required_lookups,
            vec!["QueryById".to_string(), "QueryByEmail".to_string()]
        );
    }

    #[test]
    fn unregistered_type_errors() {
        let registry = Registry::new();
        let err = registry.descriptor::<Account>().unwrap_err();
        assert!(matches!(err, DbError::Unregistered(_)));
    }

    #[test]
    fn missing_lookup_panics_with_method_name() {
        let registry = Registry::new();
        let panic = std::panic::catch_unwind(|| registry.register::<Incomplete>())
            .expect_err("registration must panic");
        let msg = panic
            .downcast_ref::<String>()
            .cloned()
            .unwrap_or_default();
        assert!(msg.contains("validation failed"), "got: {msg}");
        assert!(msg.contains("QueryById"), "got: {msg}");
    }

    #[test]
    fn reregistration_overrides_options() {
        let registry = Registry::new();
        registry.register::<Account>();
        assert!(!registry.descriptor::<Account>().unwrap().partial_update);
        registry.register_with_options::<Account>(ModelOptions {
            partial_update: true,
        });
        assert!(registry.descriptor::<Account>().unwrap().partial_update);
    }

    #[test]
    fn reset_clears_registrations() {
        let registry = Registry::new();
        registry.register::<Account>();
        registry.reset();
        assert!(registry.is_empty());
        assert!(registry.descriptor::<Account>().is_err());
    }
}
