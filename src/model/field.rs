use crate::database::output;
use crate::{codec, error};

use aws_sdk_dynamodb::types;
use serde::{Serialize, de::DeserializeOwned};

/// The value lifecycle of a field.
///
/// A field starts `Unset`, becomes `Input` through user assignment, and
/// becomes `Output` when loaded from database output. The transitions are
/// pure overwrites: an assignment replaces stored output until it is
/// explicitly cleared, and loading output replaces pending input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum FieldState<V> {
    /// No value yet.
    #[default]
    Unset,
    /// A value assigned by the user, pending write.
    Input(V),
    /// A value decoded from database output.
    Output(V),
}

impl<V> FieldState<V> {
    /// Record a user assignment.
    pub fn assign(&mut self, value: V) {
        *self = Self::Input(value);
    }

    /// Record a value decoded from database output.
    pub fn load_from_output(&mut self, value: V) {
        *self = Self::Output(value);
    }

    /// Drop any value.
    pub fn clear(&mut self) {
        *self = Self::Unset;
    }

    /// The current value, regardless of where it came from.
    pub fn value(&self) -> Option<&V> {
        match self {
            Self::Unset => None,
            Self::Input(value) | Self::Output(value) => Some(value),
        }
    }

    /// Whether the state holds pending user input.
    pub fn has_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }
}

/// A database field descriptor bound to a record.
///
/// Couples the static database key and the partition/sort flags to the
/// field's current [`FieldState`].
///
/// ```rust
/// use dynamodb_mapper::model::field::Field;
///
/// let mut title: Field<String> = Field::new("Title");
/// title.set("Buy milk".to_string());
/// assert_eq!(title.get(), Some(&"Buy milk".to_string()));
/// ```
#[derive(Clone, Debug)]
pub struct Field<V> {
    key: &'static str,
    partition_key: bool,
    sort_key: bool,
    state: FieldState<V>,
}

impl<V> Field<V> {
    /// A plain field with no key flags.
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            partition_key: false,
            sort_key: false,
            state: FieldState::Unset,
        }
    }

    /// A field flagged as the table's partition key.
    pub fn partition_key(key: &'static str) -> Self {
        Self {
            partition_key: true,
            ..Self::new(key)
        }
    }

    /// A field flagged as the table's sort key.
    pub fn sort_key(key: &'static str) -> Self {
        Self {
            sort_key: true,
            ..Self::new(key)
        }
    }

    /// The database key.
    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Whether the field is the table's partition key.
    pub fn is_partition_key(&self) -> bool {
        self.partition_key
    }

    /// Whether the field is the table's sort key.
    pub fn is_sort_key(&self) -> bool {
        self.sort_key
    }

    /// The current value, input taking precedence per the state transitions.
    pub fn get(&self) -> Option<&V> {
        self.state.value()
    }

    /// Assign a value, marking it as pending input.
    pub fn set(&mut self, value: V) {
        self.state.assign(value);
    }

    /// Clear any value.
    pub fn clear(&mut self) {
        self.state.clear();
    }

    /// The field's current state.
    pub fn state(&self) -> &FieldState<V> {
        &self.state
    }
}

/// Object-safe view of a field, the entry in a record's descriptor table.
pub trait AnyField {
    /// The database key.
    fn key(&self) -> &str;

    /// Whether the field is the table's partition key.
    fn is_partition_key(&self) -> bool;

    /// Whether the field is the table's sort key.
    fn is_sort_key(&self) -> bool;

    /// Whether the field holds pending user input.
    fn has_input(&self) -> bool;

    /// The encoded pending input, or `None` when the field has none.
    fn input_attribute(&self) -> Result<Option<types::AttributeValue>, error::EncodingError>;

    /// Load the field's value from database output, when present there.
    fn load_output(&mut self, output: &output::DatabaseOutput) -> Result<(), error::ModelError>;
}

impl<V> AnyField for Field<V>
where
    V: Serialize + DeserializeOwned,
{
    fn key(&self) -> &str {
        self.key
    }

    fn is_partition_key(&self) -> bool {
        self.partition_key
    }

    fn is_sort_key(&self) -> bool {
        self.sort_key
    }

    fn has_input(&self) -> bool {
        self.state.has_input()
    }

    fn input_attribute(&self) -> Result<Option<types::AttributeValue>, error::EncodingError> {
        match &self.state {
            FieldState::Input(value) => Ok(Some(codec::to_attribute_value(value)?)),
            _ => Ok(None),
        }
    }

    fn load_output(&mut self, output: &output::DatabaseOutput) -> Result<(), error::ModelError> {
        if output.contains(self.key) {
            let value = output.decode::<V>(self.key)?;
            self.state.load_from_output(value);
        }
        Ok(())
    }
}

/// The identity field of a record.
///
/// Wraps a [`Field`] and tracks whether the identity is known to exist in
/// the database, which decides between create and update on save. The
/// underlying field defaults to carrying the partition key flag; use
/// [`Id::sort_key`] or [`Id::plain`] for tables keyed differently.
#[derive(Clone, Debug)]
pub struct Id<V> {
    field: Field<V>,
    exists: bool,
}

impl<V> Id<V> {
    /// An identity field flagged as the partition key.
    pub fn new(key: &'static str) -> Self {
        Self {
            field: Field::partition_key(key),
            exists: false,
        }
    }

    /// An identity field flagged as the sort key.
    pub fn sort_key(key: &'static str) -> Self {
        Self {
            field: Field::sort_key(key),
            exists: false,
        }
    }

    /// An identity field with no key flags (for tables whose keys are
    /// static schema defaults).
    pub fn plain(key: &'static str) -> Self {
        Self {
            field: Field::new(key),
            exists: false,
        }
    }

    /// The database key.
    pub fn key(&self) -> &'static str {
        self.field.key()
    }

    /// Whether the identity field is the table's partition key.
    pub fn is_partition_key(&self) -> bool {
        self.field.is_partition_key()
    }

    /// Whether the identity field is the table's sort key.
    pub fn is_sort_key(&self) -> bool {
        self.field.is_sort_key()
    }

    /// The current identity value.
    pub fn get(&self) -> Option<&V> {
        self.field.get()
    }

    /// Assign the identity value.
    pub fn set(&mut self, value: V) {
        self.field.set(value);
    }

    /// Whether this identity is known to exist in the database.
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Record whether this identity exists in the database.
    pub fn set_exists(&mut self, exists: bool) {
        self.exists = exists;
    }
}

impl<V> AnyField for Id<V>
where
    V: Serialize + DeserializeOwned,
{
    fn key(&self) -> &str {
        self.field.key()
    }

    fn is_partition_key(&self) -> bool {
        AnyField::is_partition_key(&self.field)
    }

    fn is_sort_key(&self) -> bool {
        AnyField::is_sort_key(&self.field)
    }

    fn has_input(&self) -> bool {
        AnyField::has_input(&self.field)
    }

    fn input_attribute(&self) -> Result<Option<types::AttributeValue>, error::EncodingError> {
        self.field.input_attribute()
    }

    fn load_output(&mut self, output: &output::DatabaseOutput) -> Result<(), error::ModelError> {
        self.field.load_output(output)?;
        // A decoded identity means the row came from the database.
        if matches!(self.field.state(), FieldState::Output(_)) {
            self.exists = true;
        }
        Ok(())
    }
}
