//! Typed records bound to a table.
//!
//! A record type implements [`Model`] by supplying its schema, its identity
//! field, and a descriptor table over its fields. No runtime reflection is
//! involved: the descriptor table is plain construction-time registration,
//! and the field boxes carry their own database keys and key flags.
//!
//! ```rust
//! use dynamodb_mapper::model::{Model, field};
//! use dynamodb_mapper::schema::DynamoSchema;
//!
//! #[derive(Debug)]
//! struct Todo {
//!     id: field::Id<uuid::Uuid>,
//!     title: field::Field<String>,
//!     order: field::Field<i32>,
//!     completed: field::Field<bool>,
//! }
//!
//! // The descriptor table is wired at construction time; `Default` is the
//! // canonical constructor the query builder relies on.
//! impl Default for Todo {
//!     fn default() -> Self {
//!         Self {
//!             id: field::Id::new("TodoID"),
//!             title: field::Field::new("Title"),
//!             order: field::Field::new("Order"),
//!             completed: field::Field::new("Completed"),
//!         }
//!     }
//! }
//!
//! impl Model for Todo {
//!     type Id = uuid::Uuid;
//!
//!     fn schema() -> DynamoSchema {
//!         DynamoSchema::from("Todo")
//!     }
//!
//!     fn id(&self) -> &field::Id<Self::Id> {
//!         &self.id
//!     }
//!
//!     fn id_mut(&mut self) -> &mut field::Id<Self::Id> {
//!         &mut self.id
//!     }
//!
//!     fn fields(&self) -> Vec<&dyn field::AnyField> {
//!         vec![&self.id, &self.title, &self.order, &self.completed]
//!     }
//!
//!     fn fields_mut(&mut self) -> Vec<&mut dyn field::AnyField> {
//!         vec![&mut self.id, &mut self.title, &mut self.order, &mut self.completed]
//!     }
//! }
//! ```

/// Field boxes and their value lifecycle.
pub mod field;

use crate::database::output;
use crate::query::builder;
use crate::{codec, database, error, query, schema};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::{Serialize, de::DeserializeOwned};

/// A typed record bound to a table.
///
/// Implementors supply the schema, the identity field, and the field
/// descriptor table. `fields()` must list every field including the identity
/// field; exactly one field per record is the identity.
pub trait Model: Default {
    /// The identity value type.
    type Id: Serialize + DeserializeOwned + Clone;

    /// The schema the record is stored under.
    fn schema() -> schema::DynamoSchema;

    /// The identity field.
    fn id(&self) -> &field::Id<Self::Id>;

    /// The identity field, mutably.
    fn id_mut(&mut self) -> &mut field::Id<Self::Id>;

    /// The field descriptor table, identity field included.
    fn fields(&self) -> Vec<&dyn field::AnyField>;

    /// The field descriptor table, mutably.
    fn fields_mut(&mut self) -> Vec<&mut dyn field::AnyField>;

    /// Collect the pending input of all fields into a value map, keyed by
    /// database key in declaration order.
    fn input(&self) -> Result<IndexMap<String, query::QueryValue>, error::EncodingError> {
        let mut input = IndexMap::new();
        for field in self.fields() {
            if let Some(attribute) = field.input_attribute()? {
                input.insert(field.key().to_string(), query::QueryValue::Bind(attribute));
            }
        }
        Ok(input)
    }

    /// Populate the record's fields from database output.
    fn load_output(&mut self, output: &output::DatabaseOutput) -> Result<(), error::ModelError> {
        for field in self.fields_mut() {
            field.load_output(output)?;
        }
        Ok(())
    }

    /// The item key identifying this record.
    ///
    /// Assembled from the key-flagged fields' pending input, the schema's
    /// static key defaults (when not already present), and finally the
    /// identity field's current value.
    fn database_key(&self) -> Result<codec::Item, error::EncodingError> {
        let mut key = codec::Item::new();
        for field in self.fields() {
            if field.is_partition_key() || field.is_sort_key() {
                if let Some(attribute) = field.input_attribute()? {
                    key.insert(field.key().to_string(), attribute);
                }
            }
        }
        let schema = Self::schema();
        for descriptor in [schema.partition_key, schema.sort_key].into_iter().flatten() {
            if let Some(default_value) = descriptor.default_value {
                key.entry(descriptor.key)
                    .or_insert(types::AttributeValue::S(default_value));
            }
        }
        if !key.contains_key(self.id().key()) {
            if let Some(value) = self.id().get() {
                key.insert(self.id().key().to_string(), codec::to_attribute_value(value)?);
            }
        }
        Ok(key)
    }
}

/// Identity types that can be generated on first save.
pub trait GeneratedId {
    /// Produce a fresh identity value.
    fn generated() -> Self;
}

impl GeneratedId for uuid::Uuid {
    fn generated() -> Self {
        Self::new_v4()
    }
}

impl GeneratedId for String {
    fn generated() -> Self {
        uuid::Uuid::new_v4().to_string()
    }
}

/// The thin CRUD convenience layer over the query builder.
///
/// Every method delegates entirely to [`builder::QueryBuilder`]; there is no
/// independent state here.
#[allow(async_fn_in_trait)]
pub trait ModelCrud: Model {
    /// Start a query for this record type.
    fn query(database: &database::Database) -> builder::QueryBuilder<'_, Self>
    where
        Self: Sized,
    {
        builder::QueryBuilder::new(database)
    }

    /// Create or update this record, generating an identity on first save
    /// when none was assigned.
    async fn save(&mut self, database: &database::Database) -> Result<(), error::Error>
    where
        Self: Sized,
        Self::Id: GeneratedId,
    {
        if self.id().exists() {
            self.update(database).await
        } else {
            if self.id().get().is_none() {
                self.id_mut().set(Self::Id::generated());
            }
            self.create(database).await
        }
    }

    /// Write this record as a new item.
    async fn create(&mut self, database: &database::Database) -> Result<(), error::Error>
    where
        Self: Sized,
    {
        let input = self.input()?;
        let output = Self::query(database)
            .set_map(input)
            .action(query::Action::Create)
            .run()
            .await?;
        if let Some(output) = output {
            self.load_output(&output)?;
        }
        self.id_mut().set_exists(true);
        Ok(())
    }

    /// Update the stored item identified by this record's identity.
    ///
    /// # Panics
    ///
    /// Panics when the record has no identity value; updating without one is
    /// a programming error.
    async fn update(&mut self, database: &database::Database) -> Result<(), error::Error>
    where
        Self: Sized,
    {
        let id = self
            .id()
            .get()
            .cloned()
            .expect("an update requires an identity value");
        let input = self.input()?;
        let output = Self::query(database)
            .filter_id(&id)?
            .set_map(input)
            .action(query::Action::Update)
            .run()
            .await?;
        if let Some(output) = output {
            self.load_output(&output)?;
        }
        Ok(())
    }

    /// Fetch the record with the given identity, if any.
    async fn find(
        id: &Self::Id,
        database: &database::Database,
    ) -> Result<Option<Self>, error::Error>
    where
        Self: Sized,
    {
        Self::query(database).filter_id(id)?.first().await
    }

    /// Delete the record with the given identity.
    async fn delete(id: &Self::Id, database: &database::Database) -> Result<(), error::Error>
    where
        Self: Sized,
    {
        Self::query(database)
            .filter_id(id)?
            .action(query::Action::Delete)
            .run()
            .await
            .map(|_| ())
    }

    /// Write several records in one batch request.
    ///
    /// The store caps one batch at 25 items; chunking beyond that is the
    /// caller's responsibility.
    async fn batch_create(
        items: &mut [Self],
        database: &database::Database,
    ) -> Result<(), error::Error>
    where
        Self: Sized,
        Self::Id: GeneratedId,
    {
        let mut rows = Vec::with_capacity(items.len());
        for item in items.iter_mut() {
            if item.id().get().is_none() {
                item.id_mut().set(Self::Id::generated());
            }
            rows.push(item.input()?);
        }
        Self::query(database)
            .set_many(rows)
            .action(query::Action::BatchCreate)
            .run()
            .await?;
        for item in items {
            item.id_mut().set_exists(true);
        }
        Ok(())
    }

    /// Delete several records in one batch request.
    async fn batch_delete(items: &[Self], database: &database::Database) -> Result<(), error::Error>
    where
        Self: Sized,
    {
        let mut keys = Vec::with_capacity(items.len());
        for item in items {
            let key = item.database_key()?;
            let entries: IndexMap<String, query::QueryValue> = key
                .into_iter()
                .map(|(name, attribute)| (name, query::QueryValue::Bind(attribute)))
                .collect();
            keys.push(entries);
        }
        Self::query(database)
            .set_many(keys)
            .action(query::Action::BatchDelete)
            .run()
            .await
            .map(|_| ())
    }
}

impl<M: Model> ModelCrud for M {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DynamoSchema, KeyDescriptor};

    #[derive(Debug)]
    struct Todo {
        id: field::Id<uuid::Uuid>,
        title: field::Field<String>,
        order: field::Field<i32>,
        completed: field::Field<bool>,
    }

    impl Default for Todo {
        fn default() -> Self {
            Self {
                id: field::Id::new("TodoID"),
                title: field::Field::new("Title"),
                order: field::Field::new("Order"),
                completed: field::Field::new("Completed"),
            }
        }
    }

    impl Model for Todo {
        type Id = uuid::Uuid;

        fn schema() -> DynamoSchema {
            DynamoSchema::from("Todo")
        }

        fn id(&self) -> &field::Id<Self::Id> {
            &self.id
        }

        fn id_mut(&mut self) -> &mut field::Id<Self::Id> {
            &mut self.id
        }

        fn fields(&self) -> Vec<&dyn field::AnyField> {
            vec![&self.id, &self.title, &self.order, &self.completed]
        }

        fn fields_mut(&mut self) -> Vec<&mut dyn field::AnyField> {
            vec![
                &mut self.id,
                &mut self.title,
                &mut self.order,
                &mut self.completed,
            ]
        }
    }

    // Keys come from static schema defaults here, not from the fields.
    #[derive(Debug)]
    struct ListedTodo {
        id: field::Id<uuid::Uuid>,
    }

    impl Default for ListedTodo {
        fn default() -> Self {
            Self {
                id: field::Id::plain("TodoID"),
            }
        }
    }

    impl Model for ListedTodo {
        type Id = uuid::Uuid;

        fn schema() -> DynamoSchema {
            DynamoSchema::new("Todo")
                .partition_key(KeyDescriptor::with_default("ListID", "list"))
        }

        fn id(&self) -> &field::Id<Self::Id> {
            &self.id
        }

        fn id_mut(&mut self) -> &mut field::Id<Self::Id> {
            &mut self.id
        }

        fn fields(&self) -> Vec<&dyn field::AnyField> {
            vec![&self.id]
        }

        fn fields_mut(&mut self) -> Vec<&mut dyn field::AnyField> {
            vec![&mut self.id]
        }
    }

    fn todo(id: uuid::Uuid) -> Todo {
        let mut todo = Todo::default();
        todo.id.set(id);
        todo.title.set("Buy milk".to_string());
        todo.order.set(2);
        todo.completed.set(false);
        todo
    }

    #[test]
    fn test_input_collects_dirty_fields_in_declaration_order() {
        let id = uuid::Uuid::new_v4();
        let input = todo(id).input().unwrap();

        let keys: Vec<&String> = input.keys().collect();
        assert_eq!(keys, ["TodoID", "Title", "Order", "Completed"]);
        assert_eq!(
            input["TodoID"],
            query::QueryValue::Bind(types::AttributeValue::S(id.to_string()))
        );
        assert_eq!(
            input["Order"],
            query::QueryValue::Bind(types::AttributeValue::N("2".to_string()))
        );
    }

    #[test]
    fn test_untouched_fields_are_not_input() {
        let mut todo = Todo::default();
        todo.title.set("Buy milk".to_string());

        let input = todo.input().unwrap();
        assert_eq!(input.len(), 1);
        assert!(input.contains_key("Title"));
    }

    #[test]
    fn test_load_output_round_trip() {
        let id = uuid::Uuid::new_v4();
        let row = codec::Item::from([
            (
                "TodoID".to_string(),
                types::AttributeValue::S(id.to_string()),
            ),
            (
                "Title".to_string(),
                types::AttributeValue::S("Buy milk".to_string()),
            ),
            (
                "Order".to_string(),
                types::AttributeValue::N("2".to_string()),
            ),
            ("Completed".to_string(), types::AttributeValue::Bool(false)),
        ]);

        let mut decoded = Todo::default();
        decoded
            .load_output(&output::DatabaseOutput::Single(row))
            .unwrap();

        assert_eq!(decoded.id.get(), Some(&id));
        assert_eq!(decoded.title.get(), Some(&"Buy milk".to_string()));
        assert_eq!(decoded.order.get(), Some(&2));
        assert_eq!(decoded.completed.get(), Some(&false));
        assert!(decoded.id.exists());
    }

    #[test]
    fn test_database_key_uses_key_flagged_field() {
        let id = uuid::Uuid::new_v4();
        let key = todo(id).database_key().unwrap();

        assert_eq!(key.len(), 1);
        assert_eq!(
            key["TodoID"],
            types::AttributeValue::S(id.to_string())
        );
    }

    #[test]
    fn test_database_key_merges_schema_defaults_and_identity() {
        let id = uuid::Uuid::new_v4();
        let mut listed = ListedTodo::default();
        listed.id.set(id);

        let key = listed.database_key().unwrap();

        assert_eq!(
            key["ListID"],
            types::AttributeValue::S("list".to_string())
        );
        assert_eq!(
            key["TodoID"],
            types::AttributeValue::S(id.to_string())
        );
    }

    #[test]
    fn test_generated_ids() {
        let left = uuid::Uuid::generated();
        let right = uuid::Uuid::generated();
        assert_ne!(left, right);

        let text = String::generated();
        assert!(uuid::Uuid::parse_str(&text).is_ok());
    }
}
