use crate::database::{Database, output};
use crate::model::{Model, field};
use crate::{codec, error, query};

use indexmap::IndexMap;
use serde::Serialize;
use std::marker::PhantomData;

/// Builds and runs a query for a record type.
///
/// Field references are selector closures over the record's default
/// instance, so filters and sets are checked against the record's own field
/// types.
///
/// ```rust,no_run
/// # use dynamodb_mapper::database::Database;
/// # use dynamodb_mapper::model::{Model, ModelCrud, field};
/// # use dynamodb_mapper::query::FilterMethod;
/// # use dynamodb_mapper::schema::DynamoSchema;
/// # #[derive(Debug)]
/// # struct Todo {
/// #     id: field::Id<uuid::Uuid>,
/// #     completed: field::Field<bool>,
/// # }
/// # impl Default for Todo {
/// #     fn default() -> Self {
/// #         Self { id: field::Id::new("TodoID"), completed: field::Field::new("Completed") }
/// #     }
/// # }
/// # impl Model for Todo {
/// #     type Id = uuid::Uuid;
/// #     fn schema() -> DynamoSchema { DynamoSchema::from("Todo") }
/// #     fn id(&self) -> &field::Id<Self::Id> { &self.id }
/// #     fn id_mut(&mut self) -> &mut field::Id<Self::Id> { &mut self.id }
/// #     fn fields(&self) -> Vec<&dyn field::AnyField> { vec![&self.id, &self.completed] }
/// #     fn fields_mut(&mut self) -> Vec<&mut dyn field::AnyField> {
/// #         vec![&mut self.id, &mut self.completed]
/// #     }
/// # }
/// # async fn example(database: &Database) -> Result<(), Box<dyn std::error::Error>> {
/// let open = Todo::query(database)
///     .filter(|todo| &todo.completed, FilterMethod::Equal, &false)?
///     .limit(20)
///     .all()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct QueryBuilder<'a, M: Model> {
    /// The query being built.
    pub query: query::DynamoQuery,
    database: &'a Database,
    model: PhantomData<fn() -> M>,
}

impl<'a, M: Model> QueryBuilder<'a, M> {
    /// Create a builder for the record's schema.
    pub fn new(database: &'a Database) -> Self {
        Self {
            query: query::DynamoQuery::new(M::schema()),
            database,
            model: PhantomData,
        }
    }

    /// Limit the number of items the read evaluates.
    pub fn limit(self, limit: i32) -> Self {
        self.set_option(query::options::QueryOption::Limit(limit))
    }

    /// Request a strongly consistent read.
    pub fn consistent_read(self, consistent: bool) -> Self {
        self.set_option(query::options::QueryOption::ConsistentRead(consistent))
    }

    /// Read a secondary index instead of the base table.
    pub fn index(self, name: impl Into<String>) -> Self {
        self.set_option(query::options::QueryOption::IndexName(name.into()))
    }

    /// Push a raw option directive.
    pub fn set_option(mut self, option: query::options::QueryOption) -> Self {
        self.query.options.push(option);
        self
    }

    /// Set the action the query invokes.
    pub fn action(mut self, action: query::Action) -> Self {
        self.query.action = action;
        self
    }

    /// Override the sort key.
    pub fn set_sort_key<T: Serialize>(
        mut self,
        key: &str,
        value: &T,
        method: query::FilterMethod,
    ) -> Result<Self, error::Error> {
        let value = query::QueryValue::bind(value)?;
        self.query.set_sort_key(key, value, method);
        Ok(self)
    }

    /// Override the partition key.
    pub fn set_partition_key<T: Serialize>(
        mut self,
        key: &str,
        value: &T,
    ) -> Result<Self, error::Error> {
        let value = query::QueryValue::bind(value)?;
        self.query.set_partition_key(key, value);
        Ok(self)
    }

    /// Set a single field to a value, producing a one-entry input map.
    pub fn set<V, F>(mut self, field: F, value: &V) -> Result<Self, error::Error>
    where
        V: Serialize,
        F: FnOnce(&M) -> &field::Field<V>,
    {
        let model = M::default();
        let key = field(&model).key().to_string();
        let entries = IndexMap::from([(key, query::QueryValue::bind(value)?)]);
        self.query.input.push(query::QueryValue::Map(entries));
        Ok(self)
    }

    /// Append a prepared input value map.
    pub fn set_map(mut self, entries: IndexMap<String, query::QueryValue>) -> Self {
        self.query.input.push(query::QueryValue::Map(entries));
        self
    }

    /// Append one input value map per row, for the batch actions.
    pub fn set_many(mut self, rows: Vec<IndexMap<String, query::QueryValue>>) -> Self {
        for entries in rows {
            self.query.input.push(query::QueryValue::Map(entries));
        }
        self
    }

    /// Filter on a field.
    ///
    /// The field's key flags route the comparison into the key-condition or
    /// the filter expression when the request renders.
    pub fn filter<V, F>(
        mut self,
        field: F,
        method: query::FilterMethod,
        value: &V,
    ) -> Result<Self, error::Error>
    where
        V: Serialize,
        F: FnOnce(&M) -> &field::Field<V>,
    {
        let model = M::default();
        let field = field(&model);
        let field_key = query::FieldFilterKey {
            key: field.key().to_string(),
            is_partition_key: field.is_partition_key(),
            is_sort_key: field.is_sort_key(),
        };
        self.query.filters.push(query::Filter::Field(
            field_key,
            method,
            query::QueryValue::bind(value)?,
        ));
        Ok(self)
    }

    /// Filter on a field being equal to a value.
    pub fn filter_eq<V, F>(self, field: F, value: &V) -> Result<Self, error::Error>
    where
        V: Serialize,
        F: FnOnce(&M) -> &field::Field<V>,
    {
        self.filter(field, query::FilterMethod::Equal, value)
    }

    /// Filter on a field not being equal to a value.
    pub fn filter_ne<V, F>(self, field: F, value: &V) -> Result<Self, error::Error>
    where
        V: Serialize,
        F: FnOnce(&M) -> &field::Field<V>,
    {
        self.filter(field, query::FilterMethod::NotEqual, value)
    }

    /// Filter on the record's identity field being equal to a value.
    pub fn filter_id(mut self, id: &M::Id) -> Result<Self, error::Error> {
        let model = M::default();
        let identity = model.id();
        let field_key = query::FieldFilterKey {
            key: identity.key().to_string(),
            is_partition_key: identity.is_partition_key(),
            is_sort_key: identity.is_sort_key(),
        };
        self.query.filters.push(query::Filter::Field(
            field_key,
            query::FilterMethod::Equal,
            query::QueryValue::bind(id)?,
        ));
        Ok(self)
    }

    /// Run the query and hand back the raw output, if the action produces
    /// any.
    pub async fn run(self) -> Result<Option<output::DatabaseOutput>, error::Error> {
        self.database.execute(self.query).await
    }

    /// Run the query and decode every row into a record.
    pub async fn all(self) -> Result<Vec<M>, error::Error> {
        match self.run().await? {
            Some(output::DatabaseOutput::List(rows, _)) => {
                rows.into_iter().map(model_from_row).collect()
            }
            Some(output::DatabaseOutput::Single(row)) => Ok(vec![model_from_row(row)?]),
            None => Ok(Vec::new()),
        }
    }

    /// Run the query and decode the first row, if any.
    pub async fn first(self) -> Result<Option<M>, error::Error> {
        let mut items = self.limit(1).all().await?;
        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(items.remove(0)))
        }
    }

    /// Run one page of the query.
    ///
    /// Pass the last evaluated key from a previous page to continue from
    /// where it left off; continuation tokens stay in the caller's hands.
    pub async fn paginate(
        self,
        limit: i32,
        last: Option<codec::Item>,
    ) -> Result<output::PaginatedResponse<M>, error::Error> {
        let mut builder = self.limit(limit);
        if let Some(last) = last {
            builder =
                builder.set_option(query::options::QueryOption::ExclusiveStartKey(last));
        }
        match builder.run().await? {
            Some(output::DatabaseOutput::List(rows, continuation)) => {
                let items = rows
                    .into_iter()
                    .map(model_from_row)
                    .collect::<Result<_, _>>()?;
                Ok(output::PaginatedResponse {
                    items,
                    last_evaluated_key: continuation,
                })
            }
            Some(output::DatabaseOutput::Single(row)) => Ok(output::PaginatedResponse {
                items: vec![model_from_row(row)?],
                last_evaluated_key: None,
            }),
            None => Ok(output::PaginatedResponse {
                items: Vec::new(),
                last_evaluated_key: None,
            }),
        }
    }

    /// Run the query as an update.
    pub async fn update(self) -> Result<Option<output::DatabaseOutput>, error::Error> {
        self.action(query::Action::Update).run().await
    }

    /// Run the query as a create.
    pub async fn create(self) -> Result<Option<output::DatabaseOutput>, error::Error> {
        self.action(query::Action::Create).run().await
    }

    /// Run the query as a delete.
    pub async fn delete(self) -> Result<(), error::Error> {
        self.action(query::Action::Delete).run().await.map(|_| ())
    }
}

fn model_from_row<M: Model>(row: codec::Item) -> Result<M, error::Error> {
    let mut model = M::default();
    model.load_output(&output::DatabaseOutput::Single(row))?;
    Ok(model)
}
