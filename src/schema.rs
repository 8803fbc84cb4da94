use std::fmt;

/// A table identity plus its optional partition and sort key descriptors.
///
/// A schema built from a bare table name has no keys and is only usable for
/// scan-style reads; key-based operations fail fast when the key they need is
/// absent.
///
/// ```rust
/// use dynamodb_mapper::schema::{DynamoSchema, KeyDescriptor};
///
/// let todos = DynamoSchema::from("Todo");
/// let lists = DynamoSchema::new("Todo")
///     .partition_key(KeyDescriptor::with_default("ListID", "list"));
/// ```
#[derive(Clone, Debug, Default)]
pub struct DynamoSchema {
    /// The table name.
    pub table_name: String,
    /// The partition key descriptor, if the table has one.
    pub partition_key: Option<KeyDescriptor>,
    /// The sort key descriptor, if the table has one.
    pub sort_key: Option<KeyDescriptor>,
}

impl DynamoSchema {
    /// Create a schema with no keys.
    pub fn new(table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            partition_key: None,
            sort_key: None,
        }
    }

    /// Attach a partition key descriptor.
    pub fn partition_key(mut self, descriptor: KeyDescriptor) -> Self {
        self.partition_key = Some(descriptor);
        self
    }

    /// Attach a sort key descriptor.
    pub fn sort_key(mut self, descriptor: KeyDescriptor) -> Self {
        self.sort_key = Some(descriptor);
        self
    }
}

impl From<&str> for DynamoSchema {
    fn from(table_name: &str) -> Self {
        Self::new(table_name)
    }
}

impl From<String> for DynamoSchema {
    fn from(table_name: String) -> Self {
        Self::new(table_name)
    }
}

// Equality is over the table name and key names only; default values do not
// participate.
impl PartialEq for DynamoSchema {
    fn eq(&self, other: &Self) -> bool {
        self.table_name == other.table_name
            && self.partition_key.as_ref().map(|key| &key.key)
                == other.partition_key.as_ref().map(|key| &key.key)
            && self.sort_key.as_ref().map(|key| &key.key)
                == other.sort_key.as_ref().map(|key| &key.key)
    }
}

impl Eq for DynamoSchema {}

/// A key attribute name plus an optional static default value.
///
/// A default value lets a table-level fixed key (say, a constant partition
/// value) apply to every query automatically; it is captured as its display
/// text because key defaults always travel as string attributes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyDescriptor {
    /// The attribute name of the key.
    pub key: String,
    /// The static default value, if any.
    pub default_value: Option<String>,
}

impl KeyDescriptor {
    /// Create a descriptor with no default value.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            default_value: None,
        }
    }

    /// Create a descriptor with a static default value.
    pub fn with_default(key: impl Into<String>, default_value: impl fmt::Display) -> Self {
        Self {
            key: key.into(),
            default_value: Some(default_value.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::bare_table_names(
        DynamoSchema::from("Todo"),
        DynamoSchema::new("Todo"),
        true
    )]
    #[case::different_tables(
        DynamoSchema::from("Todo"),
        DynamoSchema::from("List"),
        false
    )]
    #[case::default_values_do_not_affect_equality(
        DynamoSchema::new("Todo")
            .partition_key(KeyDescriptor::with_default("ListID", "list")),
        DynamoSchema::new("Todo")
            .partition_key(KeyDescriptor::new("ListID")),
        true
    )]
    #[case::key_names_do_affect_equality(
        DynamoSchema::new("Todo")
            .partition_key(KeyDescriptor::new("ListID")),
        DynamoSchema::new("Todo")
            .partition_key(KeyDescriptor::new("TodoID")),
        false
    )]
    #[case::sort_key_names_compared(
        DynamoSchema::new("Todo").sort_key(KeyDescriptor::new("Order")),
        DynamoSchema::new("Todo"),
        false
    )]
    fn test_schema_equality(
        #[case] left: DynamoSchema,
        #[case] right: DynamoSchema,
        #[case] equal: bool,
    ) {
        assert_eq!(left == right, equal);
    }

    #[test]
    fn test_default_value_captured_as_text() {
        let descriptor = KeyDescriptor::with_default("Order", 42);
        assert_eq!(descriptor.default_value.as_deref(), Some("42"));
    }
}
