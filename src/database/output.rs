use crate::{codec, error};

use aws_sdk_dynamodb::types;
use serde::de::DeserializeOwned;

/// Raw rows produced by one execution call.
///
/// Multi-row reads produce `List` (with the continuation cursor when the
/// store returned one); single-item writes produce `Single`. The output is
/// consumed immediately by the decoder to materialize typed records and is
/// not retained afterward.
#[derive(Clone, Debug, PartialEq)]
pub enum DatabaseOutput {
    /// Zero or more rows plus an optional continuation key.
    List(Vec<codec::Item>, Option<codec::Item>),
    /// A single row.
    Single(codec::Item),
}

impl DatabaseOutput {
    /// Whether the output holds an attribute for the given field key.
    pub fn contains(&self, field: &str) -> bool {
        self.attribute(field).is_some()
    }

    fn attribute(&self, field: &str) -> Option<&types::AttributeValue> {
        match self {
            Self::List(rows, _) => rows.iter().find_map(|row| row.get(field)),
            Self::Single(row) => row.get(field),
        }
    }

    /// Decode the attribute stored under the given field key.
    ///
    /// A missing attribute is [`error::ModelError::NotFound`]; a decode
    /// failure is wrapped as [`error::ModelError::InvalidField`] carrying the
    /// field key and the expected Rust type.
    pub fn decode<T: DeserializeOwned>(&self, field: &str) -> Result<T, error::ModelError> {
        let attribute = self.attribute(field).ok_or(error::ModelError::NotFound)?;
        codec::from_attribute_value(attribute.clone()).map_err(|source| {
            error::ModelError::InvalidField {
                key: field.to_string(),
                expected: std::any::type_name::<T>(),
                source,
            }
        })
    }

    /// The continuation key, when the store reported more rows to fetch.
    pub fn continuation_key(&self) -> Option<&codec::Item> {
        match self {
            Self::List(_, continuation) => continuation.as_ref(),
            Self::Single(_) => None,
        }
    }
}

/// One page of typed results plus the cursor for the next page.
///
/// Retrieve the first page by passing no last evaluated key; pass the
/// returned key back in to retrieve the next page. A `None` key means the
/// last page was reached.
#[derive(Clone, Debug)]
pub struct PaginatedResponse<M> {
    /// The records in this page.
    pub items: Vec<M>,
    /// The cursor to pass back for the next page, if any.
    pub last_evaluated_key: Option<codec::Item>,
}
