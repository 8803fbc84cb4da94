use crate::{codec, error};

use aws_sdk_dynamodb::{primitives, types};
use serde::{Serialize, ser};
use std::collections;

/// Encode a value as a single attribute value.
///
/// Booleans become `BOOL`, every integer and float width becomes `N` carrying
/// its natural decimal text, strings become `S`, byte slices become `B`,
/// `None` and unit become `NULL`, sequences become `L`, and maps and structs
/// become `M`. `Some(x)` encodes as `x`.
///
/// ```rust
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_mapper::codec;
///
/// let attribute = codec::to_attribute_value(&42).unwrap();
/// assert_eq!(attribute, AttributeValue::N("42".to_string()));
/// ```
pub fn to_attribute_value<T>(value: &T) -> Result<types::AttributeValue, error::EncodingError>
where
    T: Serialize + ?Sized,
{
    value.serialize(AttributeValueSerializer)
}

/// Encode a value as an item row.
///
/// The value must encode as a map (a struct or a string-keyed map); anything
/// else is an `UnsupportedType` error.
pub fn to_item<T>(value: &T) -> Result<codec::Item, error::EncodingError>
where
    T: Serialize + ?Sized,
{
    match to_attribute_value(value)? {
        types::AttributeValue::M(entries) => Ok(entries),
        other => Err(error::EncodingError::UnsupportedType(format!(
            "expected a map-shaped value at the top level, found {}",
            codec::attribute_kind(&other)
        ))),
    }
}

/// Encode a slice of values as item rows.
pub fn to_items<T: Serialize>(values: &[T]) -> Result<Vec<codec::Item>, error::EncodingError> {
    values.iter().map(to_item).collect()
}

/// Recursive-descent serializer returning owned attribute values bottom-up.
struct AttributeValueSerializer;

impl ser::Serializer for AttributeValueSerializer {
    type Ok = types::AttributeValue;
    type Error = error::EncodingError;
    type SerializeSeq = ListSerializer;
    type SerializeTuple = ListSerializer;
    type SerializeTupleStruct = ListSerializer;
    type SerializeTupleVariant = VariantListSerializer;
    type SerializeMap = MapSerializer;
    type SerializeStruct = StructSerializer;
    type SerializeStructVariant = VariantStructSerializer;

    fn serialize_bool(self, value: bool) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::Bool(value))
    }

    fn serialize_i8(self, value: i8) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::N(value.to_string()))
    }

    fn serialize_i16(self, value: i16) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::N(value.to_string()))
    }

    fn serialize_i32(self, value: i32) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::N(value.to_string()))
    }

    fn serialize_i64(self, value: i64) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::N(value.to_string()))
    }

    fn serialize_i128(self, value: i128) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::N(value.to_string()))
    }

    fn serialize_u8(self, value: u8) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::N(value.to_string()))
    }

    fn serialize_u16(self, value: u16) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::N(value.to_string()))
    }

    fn serialize_u32(self, value: u32) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::N(value.to_string()))
    }

    fn serialize_u64(self, value: u64) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::N(value.to_string()))
    }

    fn serialize_u128(self, value: u128) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::N(value.to_string()))
    }

    fn serialize_f32(self, value: f32) -> Result<Self::Ok, Self::Error> {
        if !value.is_finite() {
            return Err(error::EncodingError::UnsupportedType(
                "non-finite floats have no attribute representation".to_string(),
            ));
        }
        Ok(types::AttributeValue::N(value.to_string()))
    }

    fn serialize_f64(self, value: f64) -> Result<Self::Ok, Self::Error> {
        if !value.is_finite() {
            return Err(error::EncodingError::UnsupportedType(
                "non-finite floats have no attribute representation".to_string(),
            ));
        }
        Ok(types::AttributeValue::N(value.to_string()))
    }

    fn serialize_char(self, value: char) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::S(value.to_string()))
    }

    fn serialize_str(self, value: &str) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::S(value.to_string()))
    }

    fn serialize_bytes(self, value: &[u8]) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::B(primitives::Blob::new(
            value.to_vec(),
        )))
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::Null(true))
    }

    fn serialize_some<T>(self, value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::Null(true))
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::Null(true))
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::S(variant.to_string()))
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize + ?Sized,
    {
        let entries =
            collections::HashMap::from([(variant.to_string(), value.serialize(Self)?)]);
        Ok(types::AttributeValue::M(entries))
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Ok(ListSerializer {
            elements: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        self.serialize_seq(Some(len))
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Ok(VariantListSerializer {
            variant,
            elements: Vec::with_capacity(len),
        })
    }

    fn serialize_map(self, len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(MapSerializer {
            entries: collections::HashMap::with_capacity(len.unwrap_or(0)),
            next_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(StructSerializer {
            entries: collections::HashMap::with_capacity(len),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
        len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Ok(VariantStructSerializer {
            variant,
            entries: collections::HashMap::with_capacity(len),
        })
    }
}

struct ListSerializer {
    elements: Vec<types::AttributeValue>,
}

impl ser::SerializeSeq for ListSerializer {
    type Ok = types::AttributeValue;
    type Error = error::EncodingError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize + ?Sized,
    {
        self.elements.push(value.serialize(AttributeValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::L(self.elements))
    }
}

impl ser::SerializeTuple for ListSerializer {
    type Ok = types::AttributeValue;
    type Error = error::EncodingError;

    fn serialize_element<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

impl ser::SerializeTupleStruct for ListSerializer {
    type Ok = types::AttributeValue;
    type Error = error::EncodingError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize + ?Sized,
    {
        ser::SerializeSeq::serialize_element(self, value)
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        ser::SerializeSeq::end(self)
    }
}

struct VariantListSerializer {
    variant: &'static str,
    elements: Vec<types::AttributeValue>,
}

impl ser::SerializeTupleVariant for VariantListSerializer {
    type Ok = types::AttributeValue;
    type Error = error::EncodingError;

    fn serialize_field<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize + ?Sized,
    {
        self.elements.push(value.serialize(AttributeValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let entries = collections::HashMap::from([(
            self.variant.to_string(),
            types::AttributeValue::L(self.elements),
        )]);
        Ok(types::AttributeValue::M(entries))
    }
}

struct MapSerializer {
    entries: collections::HashMap<String, types::AttributeValue>,
    next_key: Option<String>,
}

impl ser::SerializeMap for MapSerializer {
    type Ok = types::AttributeValue;
    type Error = error::EncodingError;

    fn serialize_key<T>(&mut self, key: &T) -> Result<(), Self::Error>
    where
        T: Serialize + ?Sized,
    {
        self.next_key = Some(key.serialize(MapKeySerializer)?);
        Ok(())
    }

    fn serialize_value<T>(&mut self, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize + ?Sized,
    {
        // A value without a preceding key is a serde contract violation.
        let key = self
            .next_key
            .take()
            .ok_or(error::EncodingError::InternalInconsistency)?;
        self.entries
            .insert(key, value.serialize(AttributeValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::M(self.entries))
    }
}

struct StructSerializer {
    entries: collections::HashMap<String, types::AttributeValue>,
}

impl ser::SerializeStruct for StructSerializer {
    type Ok = types::AttributeValue;
    type Error = error::EncodingError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize + ?Sized,
    {
        self.entries
            .insert(key.to_string(), value.serialize(AttributeValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(types::AttributeValue::M(self.entries))
    }
}

struct VariantStructSerializer {
    variant: &'static str,
    entries: collections::HashMap<String, types::AttributeValue>,
}

impl ser::SerializeStructVariant for VariantStructSerializer {
    type Ok = types::AttributeValue;
    type Error = error::EncodingError;

    fn serialize_field<T>(&mut self, key: &'static str, value: &T) -> Result<(), Self::Error>
    where
        T: Serialize + ?Sized,
    {
        self.entries
            .insert(key.to_string(), value.serialize(AttributeValueSerializer)?);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        let entries = collections::HashMap::from([(
            self.variant.to_string(),
            types::AttributeValue::M(self.entries),
        )]);
        Ok(types::AttributeValue::M(entries))
    }
}

/// Map keys must land as strings; stringlike and integer keys are accepted.
struct MapKeySerializer;

macro_rules! serialize_key_to_string {
    ($method:ident, $ty:ty) => {
        fn $method(self, value: $ty) -> Result<Self::Ok, Self::Error> {
            Ok(value.to_string())
        }
    };
}

impl ser::Serializer for MapKeySerializer {
    type Ok = String;
    type Error = error::EncodingError;
    type SerializeSeq = ser::Impossible<String, error::EncodingError>;
    type SerializeTuple = ser::Impossible<String, error::EncodingError>;
    type SerializeTupleStruct = ser::Impossible<String, error::EncodingError>;
    type SerializeTupleVariant = ser::Impossible<String, error::EncodingError>;
    type SerializeMap = ser::Impossible<String, error::EncodingError>;
    type SerializeStruct = ser::Impossible<String, error::EncodingError>;
    type SerializeStructVariant = ser::Impossible<String, error::EncodingError>;

    serialize_key_to_string!(serialize_i8, i8);
    serialize_key_to_string!(serialize_i16, i16);
    serialize_key_to_string!(serialize_i32, i32);
    serialize_key_to_string!(serialize_i64, i64);
    serialize_key_to_string!(serialize_u8, u8);
    serialize_key_to_string!(serialize_u16, u16);
    serialize_key_to_string!(serialize_u32, u32);
    serialize_key_to_string!(serialize_u64, u64);
    serialize_key_to_string!(serialize_char, char);

    fn serialize_str(self, value: &str) -> Result<Self::Ok, Self::Error> {
        Ok(value.to_string())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        variant: &'static str,
    ) -> Result<Self::Ok, Self::Error> {
        Ok(variant.to_string())
    }

    fn serialize_bool(self, _value: bool) -> Result<Self::Ok, Self::Error> {
        Err(Self::key_error())
    }

    fn serialize_f32(self, _value: f32) -> Result<Self::Ok, Self::Error> {
        Err(Self::key_error())
    }

    fn serialize_f64(self, _value: f64) -> Result<Self::Ok, Self::Error> {
        Err(Self::key_error())
    }

    fn serialize_bytes(self, _value: &[u8]) -> Result<Self::Ok, Self::Error> {
        Err(Self::key_error())
    }

    fn serialize_none(self) -> Result<Self::Ok, Self::Error> {
        Err(Self::key_error())
    }

    fn serialize_some<T>(self, _value: &T) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize + ?Sized,
    {
        Err(Self::key_error())
    }

    fn serialize_unit(self) -> Result<Self::Ok, Self::Error> {
        Err(Self::key_error())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        Err(Self::key_error())
    }

    fn serialize_newtype_struct<T>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize + ?Sized,
    {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok, Self::Error>
    where
        T: Serialize + ?Sized,
    {
        Err(Self::key_error())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Err(Self::key_error())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Err(Self::key_error())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Err(Self::key_error())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(Self::key_error())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Err(Self::key_error())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Err(Self::key_error())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(Self::key_error())
    }
}

impl MapKeySerializer {
    fn key_error() -> error::EncodingError {
        error::EncodingError::UnsupportedType("map key must be stringlike".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use serde::Serialize;
    use serde_json::json;

    #[rstest]
    #[case::boolean(json!(true), types::AttributeValue::Bool(true))]
    #[case::integer(json!(42), types::AttributeValue::N("42".to_string()))]
    #[case::negative(json!(-7), types::AttributeValue::N("-7".to_string()))]
    #[case::float(json!(123.45), types::AttributeValue::N("123.45".to_string()))]
    #[case::string(json!("hello"), types::AttributeValue::S("hello".to_string()))]
    #[case::null(json!(null), types::AttributeValue::Null(true))]
    #[case::list(
        json!(["a", "b"]),
        types::AttributeValue::L(
            vec![
                types::AttributeValue::S("a".to_string()),
                types::AttributeValue::S("b".to_string()),
            ]
        )
    )]
    #[case::map(
        json!({"a": 1}),
        types::AttributeValue::M(
            collections::HashMap::from(
                [(
                    "a".to_string(),
                    types::AttributeValue::N("1".to_string()),
                )]
            )
        )
    )]
    fn test_to_attribute_value(
        #[case] value: serde_json::Value,
        #[case] expected: types::AttributeValue,
    ) {
        assert_eq!(to_attribute_value(&value).unwrap(), expected);
    }

    #[derive(Serialize)]
    struct Address {
        street: String,
        number: u16,
    }

    #[derive(Serialize)]
    struct Person {
        name: String,
        age: u8,
        nickname: Option<String>,
        address: Address,
        tags: Vec<String>,
    }

    #[test]
    fn test_nested_struct_encodes_as_nested_map() {
        let person = Person {
            name: "Jane".to_string(),
            age: 40,
            nickname: None,
            address: Address {
                street: "Main".to_string(),
                number: 7,
            },
            tags: vec!["a".to_string()],
        };

        let item = to_item(&person).unwrap();

        assert_eq!(
            item["name"],
            types::AttributeValue::S("Jane".to_string())
        );
        assert_eq!(item["age"], types::AttributeValue::N("40".to_string()));
        assert_eq!(item["nickname"], types::AttributeValue::Null(true));
        assert_eq!(
            item["address"],
            types::AttributeValue::M(collections::HashMap::from([
                (
                    "street".to_string(),
                    types::AttributeValue::S("Main".to_string())
                ),
                (
                    "number".to_string(),
                    types::AttributeValue::N("7".to_string())
                ),
            ]))
        );
        assert_eq!(
            item["tags"],
            types::AttributeValue::L(vec![types::AttributeValue::S("a".to_string())])
        );
    }

    #[test]
    fn test_some_encodes_as_wrapped_value() {
        let attribute = to_attribute_value(&Some(3_i64)).unwrap();
        assert_eq!(attribute, types::AttributeValue::N("3".to_string()));
    }

    #[test]
    fn test_unit_enum_variant_encodes_as_string() {
        #[derive(Serialize)]
        enum Status {
            Active,
        }
        let attribute = to_attribute_value(&Status::Active).unwrap();
        assert_eq!(attribute, types::AttributeValue::S("Active".to_string()));
    }

    #[test]
    fn test_to_item_rejects_scalars() {
        assert!(matches!(
            to_item(&42),
            Err(error::EncodingError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_non_finite_float_is_unsupported() {
        assert!(matches!(
            to_attribute_value(&f64::NAN),
            Err(error::EncodingError::UnsupportedType(_))
        ));
    }
}
