use crate::{codec, error};

use aws_sdk_dynamodb::types;
use serde::de::{self, DeserializeOwned, IntoDeserializer, Visitor};
use std::collections::hash_map;

/// Decode a single attribute value into a target type.
///
/// Scalars unwrap the attribute by its kind and coerce: number text is parsed
/// through the target type's parser, so malformed text surfaces as a
/// [`error::DecodingError::TypeMismatch`] rather than a panic. `NULL` decodes
/// as `None` for optional targets.
///
/// ```rust
/// use aws_sdk_dynamodb::types::AttributeValue;
/// use dynamodb_mapper::codec;
///
/// let order: i32 = codec::from_attribute_value(AttributeValue::N("2".to_string())).unwrap();
/// assert_eq!(order, 2);
/// ```
pub fn from_attribute_value<T: DeserializeOwned>(
    attribute: types::AttributeValue,
) -> Result<T, error::DecodingError> {
    T::deserialize(AttributeValueDeserializer { input: attribute })
}

/// Decode an item row into a target type.
pub fn from_item<T: DeserializeOwned>(item: codec::Item) -> Result<T, error::DecodingError> {
    from_attribute_value(types::AttributeValue::M(item))
}

/// Decode a list of item rows into a list of target values.
pub fn from_items<T: DeserializeOwned>(
    items: Vec<codec::Item>,
) -> Result<Vec<T>, error::DecodingError> {
    items.into_iter().map(from_item).collect()
}

/// Deserializer over a single owned attribute value.
pub(crate) struct AttributeValueDeserializer {
    pub(crate) input: types::AttributeValue,
}

macro_rules! deserialize_number {
    ($method:ident, $visit:ident, $ty:ty) => {
        fn $method<V>(self, visitor: V) -> Result<V::Value, Self::Error>
        where
            V: Visitor<'de>,
        {
            match self.input {
                types::AttributeValue::N(text) => match text.parse::<$ty>() {
                    Ok(number) => visitor.$visit(number),
                    Err(_) => Err(error::DecodingError::mismatch(
                        stringify!($ty),
                        format!("N: {text}"),
                    )),
                },
                other => Err(error::DecodingError::mismatch(
                    stringify!($ty),
                    codec::attribute_kind(&other),
                )),
            }
        }
    };
}

impl<'de> de::Deserializer<'de> for AttributeValueDeserializer {
    type Error = error::DecodingError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            types::AttributeValue::S(text) => visitor.visit_string(text),
            types::AttributeValue::N(text) => visit_number_text(text, visitor),
            types::AttributeValue::Bool(value) => visitor.visit_bool(value),
            types::AttributeValue::Null(_) => visitor.visit_unit(),
            types::AttributeValue::B(blob) => visitor.visit_byte_buf(blob.into_inner()),
            types::AttributeValue::L(elements) => {
                visitor.visit_seq(SeqDeserializer::new(elements))
            }
            types::AttributeValue::Ss(members) => visitor.visit_seq(SeqDeserializer::new(
                members.into_iter().map(types::AttributeValue::S).collect(),
            )),
            types::AttributeValue::Ns(members) => visitor.visit_seq(SeqDeserializer::new(
                members.into_iter().map(types::AttributeValue::N).collect(),
            )),
            types::AttributeValue::Bs(members) => visitor.visit_seq(SeqDeserializer::new(
                members.into_iter().map(types::AttributeValue::B).collect(),
            )),
            types::AttributeValue::M(entries) => visitor.visit_map(MapDeserializer::new(entries)),
            other => Err(error::DecodingError::mismatch(
                "attribute",
                codec::attribute_kind(&other),
            )),
        }
    }

    fn deserialize_bool<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            types::AttributeValue::Bool(value) => visitor.visit_bool(value),
            other => Err(error::DecodingError::mismatch(
                "bool",
                codec::attribute_kind(&other),
            )),
        }
    }

    deserialize_number!(deserialize_i8, visit_i8, i8);
    deserialize_number!(deserialize_i16, visit_i16, i16);
    deserialize_number!(deserialize_i32, visit_i32, i32);
    deserialize_number!(deserialize_i64, visit_i64, i64);
    deserialize_number!(deserialize_i128, visit_i128, i128);
    deserialize_number!(deserialize_u8, visit_u8, u8);
    deserialize_number!(deserialize_u16, visit_u16, u16);
    deserialize_number!(deserialize_u32, visit_u32, u32);
    deserialize_number!(deserialize_u64, visit_u64, u64);
    deserialize_number!(deserialize_u128, visit_u128, u128);
    deserialize_number!(deserialize_f32, visit_f32, f32);
    deserialize_number!(deserialize_f64, visit_f64, f64);

    fn deserialize_char<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            types::AttributeValue::S(text) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(value), None) => visitor.visit_char(value),
                    _ => Err(error::DecodingError::mismatch("char", format!("S: {text}"))),
                }
            }
            other => Err(error::DecodingError::mismatch(
                "char",
                codec::attribute_kind(&other),
            )),
        }
    }

    fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            types::AttributeValue::S(text) => visitor.visit_string(text),
            other => Err(error::DecodingError::mismatch(
                "string",
                codec::attribute_kind(&other),
            )),
        }
    }

    fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            types::AttributeValue::B(blob) => visitor.visit_byte_buf(blob.into_inner()),
            other => Err(error::DecodingError::mismatch(
                "bytes",
                codec::attribute_kind(&other),
            )),
        }
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            types::AttributeValue::Null(_) => visitor.visit_none(),
            other => visitor.visit_some(AttributeValueDeserializer { input: other }),
        }
    }

    fn deserialize_unit<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            types::AttributeValue::Null(_) => visitor.visit_unit(),
            other => Err(error::DecodingError::mismatch(
                "unit",
                codec::attribute_kind(&other),
            )),
        }
    }

    fn deserialize_unit_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            types::AttributeValue::L(elements) => {
                visitor.visit_seq(SeqDeserializer::new(elements))
            }
            types::AttributeValue::Ss(members) => visitor.visit_seq(SeqDeserializer::new(
                members.into_iter().map(types::AttributeValue::S).collect(),
            )),
            types::AttributeValue::Ns(members) => visitor.visit_seq(SeqDeserializer::new(
                members.into_iter().map(types::AttributeValue::N).collect(),
            )),
            types::AttributeValue::Bs(members) => visitor.visit_seq(SeqDeserializer::new(
                members.into_iter().map(types::AttributeValue::B).collect(),
            )),
            other => Err(error::DecodingError::mismatch(
                "sequence",
                codec::attribute_kind(&other),
            )),
        }
    }

    fn deserialize_tuple<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            types::AttributeValue::M(entries) => visitor.visit_map(MapDeserializer::new(entries)),
            other => Err(error::DecodingError::mismatch(
                "map",
                codec::attribute_kind(&other),
            )),
        }
    }

    fn deserialize_struct<V>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        match self.input {
            types::AttributeValue::S(variant) => visitor.visit_enum(variant.into_deserializer()),
            types::AttributeValue::M(entries) => {
                let mut entries = entries.into_iter();
                let (variant, value) = entries.next().ok_or_else(|| {
                    error::DecodingError::mismatch("enum variant", "empty M")
                })?;
                if entries.next().is_some() {
                    return Err(error::DecodingError::TooManyValues);
                }
                visitor.visit_enum(EnumDeserializer { variant, value })
            }
            other => Err(error::DecodingError::mismatch(
                "enum variant",
                codec::attribute_kind(&other),
            )),
        }
    }

    fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        self.deserialize_any(visitor)
    }
}

fn visit_number_text<'de, V>(
    text: String,
    visitor: V,
) -> Result<V::Value, error::DecodingError>
where
    V: Visitor<'de>,
{
    if let Ok(number) = text.parse::<i64>() {
        visitor.visit_i64(number)
    } else if let Ok(number) = text.parse::<u64>() {
        visitor.visit_u64(number)
    } else if let Ok(number) = text.parse::<f64>() {
        visitor.visit_f64(number)
    } else {
        Err(error::DecodingError::mismatch(
            "number",
            format!("N: {text}"),
        ))
    }
}

struct SeqDeserializer {
    elements: std::vec::IntoIter<types::AttributeValue>,
}

impl SeqDeserializer {
    fn new(elements: Vec<types::AttributeValue>) -> Self {
        Self {
            elements: elements.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqDeserializer {
    type Error = error::DecodingError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        match self.elements.next() {
            Some(element) => seed
                .deserialize(AttributeValueDeserializer { input: element })
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.elements.len())
    }
}

struct MapDeserializer {
    entries: hash_map::IntoIter<String, types::AttributeValue>,
    next_value: Option<types::AttributeValue>,
}

impl MapDeserializer {
    fn new(entries: codec::Item) -> Self {
        Self {
            entries: entries.into_iter(),
            next_value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapDeserializer {
    type Error = error::DecodingError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>, Self::Error>
    where
        K: de::DeserializeSeed<'de>,
    {
        match self.entries.next() {
            Some((key, value)) => {
                self.next_value = Some(value);
                seed.deserialize(key.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value, Self::Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        // A value without a preceding key is a serde contract violation.
        let value = self
            .next_value
            .take()
            .ok_or_else(|| error::DecodingError::Message("value without a key".to_string()))?;
        seed.deserialize(AttributeValueDeserializer { input: value })
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct EnumDeserializer {
    variant: String,
    value: types::AttributeValue,
}

impl<'de> de::EnumAccess<'de> for EnumDeserializer {
    type Error = error::DecodingError;
    type Variant = VariantDeserializer;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
    where
        V: de::DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(self.variant.into_deserializer())?;
        Ok((variant, VariantDeserializer { value: self.value }))
    }
}

struct VariantDeserializer {
    value: types::AttributeValue,
}

impl<'de> de::VariantAccess<'de> for VariantDeserializer {
    type Error = error::DecodingError;

    fn unit_variant(self) -> Result<(), Self::Error> {
        match self.value {
            types::AttributeValue::Null(_) => Ok(()),
            other => Err(error::DecodingError::mismatch(
                "unit variant",
                codec::attribute_kind(&other),
            )),
        }
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
    where
        T: de::DeserializeSeed<'de>,
    {
        seed.deserialize(AttributeValueDeserializer { input: self.value })
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_seq(
            AttributeValueDeserializer { input: self.value },
            visitor,
        )
    }

    fn struct_variant<V>(
        self,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        de::Deserializer::deserialize_map(
            AttributeValueDeserializer { input: self.value },
            visitor,
        )
    }
}
