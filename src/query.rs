//! The request-in-progress model.
//!
//! A [`DynamoQuery`] accumulates an action, input value maps, filters, and
//! option directives against a schema. Rendering into provider expression
//! strings happens in [`options::OptionsContainer`]; picking the low-level
//! request shape happens in [`crate::database`].

/// The typed query builder entry points.
pub mod builder;

/// Option directives and the accumulator they fold into.
pub mod options;

use crate::{codec, error, schema};

use aws_sdk_dynamodb::types;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// The action a query invokes on the database.
///
/// `Read` resolves to a scan or an indexed query depending on the keys
/// present; `Scan` and `Query` force one or the other explicitly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Put a single new item.
    Create,
    /// Read items, choosing scan or query from the accumulated keys.
    Read,
    /// Update a single existing item.
    Update,
    /// Delete a single item by key.
    Delete,
    /// Force a full-table scan.
    Scan,
    /// Force an indexed query.
    Query,
    /// Put many items in one batch request.
    BatchCreate,
    /// Delete many items in one batch request.
    BatchDelete,
}

/// A value carried by a query.
///
/// Binds are run through the codec eagerly, so a `Bind` always holds a valid
/// attribute value; a `Map` is the equivalent of a row, keyed by database
/// key.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryValue {
    /// A single encoded value.
    Bind(types::AttributeValue),
    /// A row of named values, in insertion order.
    Map(IndexMap<String, QueryValue>),
}

impl QueryValue {
    /// Encode a serializable value into a bind.
    pub fn bind<T>(value: &T) -> Result<Self, error::EncodingError>
    where
        T: Serialize + ?Sized,
    {
        Ok(Self::Bind(codec::to_attribute_value(value)?))
    }

    /// The attribute value this query value carries.
    pub fn attribute_value(&self) -> types::AttributeValue {
        match self {
            Self::Bind(attribute) => attribute.clone(),
            Self::Map(entries) => types::AttributeValue::M(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.attribute_value()))
                    .collect(),
            ),
        }
    }

    /// The entries of a `Map` value.
    ///
    /// # Panics
    ///
    /// Panics when called on a `Bind`; query input must be map-shaped, so a
    /// bind here is a programming error.
    pub(crate) fn as_map(&self) -> &IndexMap<String, QueryValue> {
        match self {
            Self::Map(entries) => entries,
            Self::Bind(_) => panic!("expected a value map in query input"),
        }
    }
}

/// How a filter compares a field against a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterMethod {
    /// The field equals the value.
    Equal,
    /// The field does not equal the value.
    ///
    /// Never valid on a partition or sort key condition.
    NotEqual,
    /// The field begins with the value (string fields only).
    BeginsWith,
}

impl FilterMethod {
    /// Render a comparison in the provider's expression syntax.
    pub(crate) fn render(self, name: &str, value: &str) -> String {
        match self {
            Self::Equal => format!("{name} = {value}"),
            Self::NotEqual => format!("{name} <> {value}"),
            Self::BeginsWith => format!("begins_with({name}, {value})"),
        }
    }
}

impl fmt::Display for FilterMethod {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "<>"),
            Self::BeginsWith => write!(f, "begins_with"),
        }
    }
}

/// A field's database key along with its key flags.
///
/// The flags decide whether a filter on the field lands in the key-condition
/// expression or the filter expression.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldFilterKey {
    /// The database key of the field.
    pub key: String,
    /// Whether the field is the partition key.
    pub is_partition_key: bool,
    /// Whether the field is the sort key.
    pub is_sort_key: bool,
}

impl FieldFilterKey {
    /// A filter key for a plain, non-key field.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// A filter key flagged as the partition key.
    pub fn partition(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_partition_key: true,
            is_sort_key: false,
        }
    }

    /// A filter key flagged as the sort key.
    pub fn sort(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_partition_key: false,
            is_sort_key: true,
        }
    }
}

/// A filter set on a query.
#[derive(Clone, Debug, PartialEq)]
pub enum Filter {
    /// A comparison against a specific field.
    Field(FieldFilterKey, FilterMethod, QueryValue),
}

impl Filter {
    /// The key-map entry this filter contributes when filters establish an
    /// item's identity (update and delete paths).
    pub(crate) fn key_entry(&self) -> (String, types::AttributeValue) {
        match self {
            Self::Field(field_key, _, value) => {
                (field_key.key.clone(), value.attribute_value())
            }
        }
    }
}

/// A request in progress.
#[derive(Clone, Debug)]
pub struct DynamoQuery {
    /// The action to take on the database.
    pub action: Action,
    /// The schema the query operates on.
    pub schema: schema::DynamoSchema,
    /// Value maps to be written; exactly one for single-item create and
    /// update, one per item for the batch variants.
    pub input: Vec<QueryValue>,
    /// Option directives, applied in order (last write wins, except the
    /// appending expression directives).
    pub options: Vec<options::QueryOption>,
    /// Filters, routed per-field into the key-condition or filter expression.
    pub filters: Vec<Filter>,
}

impl DynamoQuery {
    /// Create a query for a schema.
    ///
    /// Any schema key descriptor carrying a default value is installed
    /// immediately as the matching key override with an equality method, so
    /// table-level static keys apply without per-call wiring.
    pub fn new(schema: schema::DynamoSchema) -> Self {
        let mut query = Self {
            action: Action::Read,
            schema,
            input: Vec::new(),
            options: Vec::new(),
            filters: Vec::new(),
        };
        let partition_key = query.schema.partition_key.clone();
        if let Some(descriptor) = partition_key {
            if let Some(default_value) = descriptor.default_value {
                query.set_partition_key(
                    descriptor.key,
                    QueryValue::Bind(types::AttributeValue::S(default_value)),
                );
            }
        }
        let sort_key = query.schema.sort_key.clone();
        if let Some(descriptor) = sort_key {
            if let Some(default_value) = descriptor.default_value {
                query.set_sort_key(
                    descriptor.key,
                    QueryValue::Bind(types::AttributeValue::S(default_value)),
                    FilterMethod::Equal,
                );
            }
        }
        query
    }

    /// Override the partition key for this query.
    ///
    /// Overrides stack: whatever is set last wins when the options fold.
    pub fn set_partition_key(&mut self, key: impl Into<String>, value: QueryValue) {
        self.options
            .push(options::QueryOption::PartitionKey(key.into(), value));
    }

    /// Override the sort key for this query.
    pub fn set_sort_key(
        &mut self,
        key: impl Into<String>,
        value: QueryValue,
        method: FilterMethod,
    ) {
        self.options
            .push(options::QueryOption::SortKey(key.into(), value, method));
    }

    /// The effective partition key override, after folding the options.
    pub fn partition_key(&self) -> Option<(String, QueryValue)> {
        self.options_container().partition_key
    }

    /// The effective sort key override, after folding the options.
    pub fn sort_key(&self) -> Option<(String, QueryValue, FilterMethod)> {
        self.options_container().sort_key
    }

    /// Fold the option stack and filters into an options container.
    pub fn options_container(&self) -> options::OptionsContainer {
        options::OptionsContainer::from_query(self)
    }

    /// The item key established by this query's filters and partition key.
    pub(crate) fn key(&self) -> codec::Item {
        let mut key = codec::Item::new();
        for filter in &self.filters {
            let (name, value) = filter.key_entry();
            key.insert(name, value);
        }
        if let Some((name, value)) = self.partition_key() {
            key.insert(name, value.attribute_value());
        }
        key
    }
}
