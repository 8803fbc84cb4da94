//! Bidirectional codec between Rust values and DynamoDB attribute values.
//!
//! The encoder walks a [`serde::Serialize`] value and produces owned
//! [`types::AttributeValue`]s bottom-up; the decoder drives a
//! [`serde::Deserialize`] visitor over a stored attribute value. Numbers are
//! always carried as decimal text, so round-trips never lose precision.
//!
//! Sets need a declaration from the call site: a Rust sequence encodes as a
//! list (`L`) unless it is passed through [`to_set`], which picks the string
//! or number set variant from the first element.

/// Decoding from attribute values and from the persisted JSON wire shape.
pub mod decoder;

/// Encoding into attribute values.
pub mod encoder;

/// The persisted JSON wire shape (single-key tag objects).
pub mod wire;

pub use decoder::{from_attribute_value, from_item, from_items};
pub use encoder::{to_attribute_value, to_item, to_items};
pub use wire::{from_slice, to_vec};

use crate::error;

use aws_sdk_dynamodb::types;
use serde::Serialize;

/// An item row: attribute values keyed by attribute name.
pub type Item = std::collections::HashMap<String, types::AttributeValue>;

/// The wire descriptor of an attribute value's kind (`"S"`, `"N"`, ...).
pub(crate) fn attribute_kind(attribute: &types::AttributeValue) -> &'static str {
    match attribute {
        types::AttributeValue::S(_) => "S",
        types::AttributeValue::N(_) => "N",
        types::AttributeValue::B(_) => "B",
        types::AttributeValue::Ss(_) => "SS",
        types::AttributeValue::Ns(_) => "NS",
        types::AttributeValue::Bs(_) => "BS",
        types::AttributeValue::Bool(_) => "BOOL",
        types::AttributeValue::Null(_) => "NULL",
        types::AttributeValue::L(_) => "L",
        types::AttributeValue::M(_) => "M",
        _ => "unknown",
    }
}

#[derive(Clone, Copy, PartialEq)]
enum SetKind {
    String,
    Number,
}

/// Encode a sequence with declared set semantics.
///
/// The set kind cannot be inferred from the sequence type alone, so this is
/// the explicit entry point for it: the first element's encoded kind picks
/// between a string set and a number set, and a later element of the other
/// kind is an error. Elements that encode as anything other than a string or
/// a number are an error.
///
/// The wire format has no empty set, so an empty input encodes as an empty
/// list instead.
///
/// ```rust
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_mapper::codec;
///
/// let set = codec::to_set(&["a", "b"]).unwrap();
/// assert_eq!(set, AttributeValue::Ss(vec!["a".to_string(), "b".to_string()]));
/// ```
pub fn to_set<T: Serialize>(values: &[T]) -> Result<types::AttributeValue, error::EncodingError> {
    if values.is_empty() {
        return Ok(types::AttributeValue::L(Vec::new()));
    }
    let mut kind: Option<SetKind> = None;
    let mut members = Vec::with_capacity(values.len());
    for value in values {
        let (member_kind, text) = match to_attribute_value(value)? {
            types::AttributeValue::S(text) => (SetKind::String, text),
            types::AttributeValue::N(text) => (SetKind::Number, text),
            other => {
                return Err(error::EncodingError::UnsupportedType(format!(
                    "set member must encode as a string or a number, found {}",
                    attribute_kind(&other)
                )));
            }
        };
        match kind {
            None => kind = Some(member_kind),
            Some(kind) if kind == member_kind => {}
            Some(_) => {
                return Err(error::EncodingError::UnsupportedType(
                    "set members must all be strings or all be numbers".to_string(),
                ));
            }
        }
        members.push(text);
    }
    match kind {
        Some(SetKind::String) => Ok(types::AttributeValue::Ss(members)),
        Some(SetKind::Number) => Ok(types::AttributeValue::Ns(members)),
        None => Err(error::EncodingError::InternalInconsistency),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::string_set(
        vec![
            serde_json::json!("a"),
            serde_json::json!("b"),
        ],
        types::AttributeValue::Ss(
            vec![
                "a".to_string(),
                "b".to_string(),
            ]
        )
    )]
    #[case::number_set(
        vec![
            serde_json::json!(1),
            serde_json::json!(2),
            serde_json::json!(3),
        ],
        types::AttributeValue::Ns(
            vec![
                "1".to_string(),
                "2".to_string(),
                "3".to_string(),
            ]
        )
    )]
    #[case::empty_becomes_empty_list(
        vec![],
        types::AttributeValue::L(Vec::new())
    )]
    fn test_to_set(
        #[case] values: Vec<serde_json::Value>,
        #[case] expected: types::AttributeValue,
    ) {
        assert_eq!(to_set(&values).unwrap(), expected);
    }

    #[rstest]
    #[case::mixed_kinds(vec![serde_json::json!("a"), serde_json::json!(1)])]
    #[case::unsupported_member(vec![serde_json::json!(true)])]
    fn test_to_set_rejects(#[case] values: Vec<serde_json::Value>) {
        assert!(matches!(
            to_set(&values),
            Err(error::EncodingError::UnsupportedType(_))
        ));
    }
}
