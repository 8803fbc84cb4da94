use crate::codec::{self, decoder, encoder};
use crate::error;

use aws_sdk_dynamodb::{primitives, types};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

/// Encode a value into the persisted JSON wire shape.
///
/// A map-shaped value becomes a JSON object whose values are single-key tag
/// objects (`{"S": "text"}`, `{"N": "123.45"}`, ...); any other value becomes
/// a single tag object. Numbers travel as decimal strings, binary as base64.
pub fn to_vec<T>(value: &T) -> Result<Vec<u8>, error::EncodingError>
where
    T: Serialize + ?Sized,
{
    let json = match encoder::to_attribute_value(value)? {
        types::AttributeValue::M(entries) => item_to_json(&entries)?,
        other => attribute_to_json(&other)?,
    };
    serde_json::to_vec(&json).map_err(|error| error::EncodingError::Message(error.to_string()))
}

/// Decode a value from raw JSON wire bytes.
///
/// The bytes may hold an item map, a list of item maps, one bare tagged
/// attribute, or plain untagged JSON. The shapes are attempted in exactly
/// that order and the first one that decodes into the target wins. The
/// ordering is a deliberate, implementation-defined heuristic (an ambiguous
/// payload is resolved by whichever shape matches first), pinned by test.
pub fn from_slice<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, error::DecodingError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|error| error::DecodingError::Message(error.to_string()))?;
    if let Ok(item) = item_from_json(&value) {
        if let Ok(decoded) = decoder::from_item(item) {
            return Ok(decoded);
        }
    }
    if let Ok(items) = items_from_json(&value) {
        let list = types::AttributeValue::L(
            items.into_iter().map(types::AttributeValue::M).collect(),
        );
        if let Ok(decoded) = decoder::from_attribute_value(list) {
            return Ok(decoded);
        }
    }
    if let Ok(attribute) = attribute_from_json(&value) {
        if let Ok(decoded) = decoder::from_attribute_value(attribute) {
            return Ok(decoded);
        }
    }
    serde_json::from_value(value).map_err(|error| error::DecodingError::Message(error.to_string()))
}

/// Render one attribute value as its single-key tag object.
pub(crate) fn attribute_to_json(
    attribute: &types::AttributeValue,
) -> Result<Value, error::EncodingError> {
    let json = match attribute {
        types::AttributeValue::S(text) => serde_json::json!({ "S": text }),
        types::AttributeValue::N(text) => serde_json::json!({ "N": text }),
        types::AttributeValue::Bool(value) => serde_json::json!({ "BOOL": value }),
        types::AttributeValue::Null(value) => serde_json::json!({ "NULL": value }),
        types::AttributeValue::B(blob) => {
            serde_json::json!({ "B": BASE64.encode(blob.as_ref()) })
        }
        types::AttributeValue::Ss(members) => serde_json::json!({ "SS": members }),
        types::AttributeValue::Ns(members) => serde_json::json!({ "NS": members }),
        types::AttributeValue::Bs(members) => {
            let encoded: Vec<String> = members
                .iter()
                .map(|blob| BASE64.encode(blob.as_ref()))
                .collect();
            serde_json::json!({ "BS": encoded })
        }
        types::AttributeValue::L(elements) => {
            let elements: Vec<Value> = elements
                .iter()
                .map(attribute_to_json)
                .collect::<Result<_, _>>()?;
            serde_json::json!({ "L": elements })
        }
        types::AttributeValue::M(entries) => {
            serde_json::json!({ "M": item_to_json(entries)? })
        }
        other => {
            return Err(error::EncodingError::UnsupportedType(format!(
                "attribute kind {} has no wire representation",
                codec::attribute_kind(other)
            )));
        }
    };
    Ok(json)
}

pub(crate) fn item_to_json(item: &codec::Item) -> Result<Value, error::EncodingError> {
    let mut entries = Map::with_capacity(item.len());
    for (key, attribute) in item {
        entries.insert(key.clone(), attribute_to_json(attribute)?);
    }
    Ok(Value::Object(entries))
}

/// Parse one single-key tag object back into an attribute value.
pub(crate) fn attribute_from_json(
    value: &Value,
) -> Result<types::AttributeValue, error::DecodingError> {
    let entries = value
        .as_object()
        .ok_or_else(|| error::DecodingError::mismatch("attribute", json_kind(value)))?;
    let mut entries = entries.iter();
    let (tag, payload) = entries
        .next()
        .ok_or_else(|| error::DecodingError::mismatch("attribute", "empty object"))?;
    if entries.next().is_some() {
        return Err(error::DecodingError::TooManyValues);
    }
    let attribute = match (tag.as_str(), payload) {
        ("S", Value::String(text)) => types::AttributeValue::S(text.clone()),
        ("N", Value::String(text)) => types::AttributeValue::N(text.clone()),
        ("BOOL", Value::Bool(value)) => types::AttributeValue::Bool(*value),
        ("NULL", Value::Bool(value)) => types::AttributeValue::Null(*value),
        ("B", Value::String(text)) => {
            let bytes = BASE64
                .decode(text)
                .map_err(|_| error::DecodingError::mismatch("base64 binary", tag.clone()))?;
            types::AttributeValue::B(primitives::Blob::new(bytes))
        }
        ("SS", Value::Array(members)) => {
            types::AttributeValue::Ss(string_members(members, "SS")?)
        }
        ("NS", Value::Array(members)) => {
            types::AttributeValue::Ns(string_members(members, "NS")?)
        }
        ("BS", Value::Array(members)) => {
            let members = string_members(members, "BS")?;
            let mut blobs = Vec::with_capacity(members.len());
            for member in members {
                let bytes = BASE64
                    .decode(&member)
                    .map_err(|_| error::DecodingError::mismatch("base64 binary", member.clone()))?;
                blobs.push(primitives::Blob::new(bytes));
            }
            types::AttributeValue::Bs(blobs)
        }
        ("L", Value::Array(elements)) => {
            let elements: Vec<types::AttributeValue> = elements
                .iter()
                .map(attribute_from_json)
                .collect::<Result<_, _>>()?;
            types::AttributeValue::L(elements)
        }
        ("M", nested @ Value::Object(_)) => types::AttributeValue::M(item_from_json(nested)?),
        _ => {
            return Err(error::DecodingError::mismatch(
                "attribute tag",
                format!("{tag}: {}", json_kind(payload)),
            ));
        }
    };
    Ok(attribute)
}

pub(crate) fn item_from_json(value: &Value) -> Result<codec::Item, error::DecodingError> {
    let entries = value
        .as_object()
        .ok_or_else(|| error::DecodingError::mismatch("item object", json_kind(value)))?;
    let mut item = codec::Item::with_capacity(entries.len());
    for (key, attribute) in entries {
        item.insert(key.clone(), attribute_from_json(attribute)?);
    }
    Ok(item)
}

fn items_from_json(value: &Value) -> Result<Vec<codec::Item>, error::DecodingError> {
    let rows = value
        .as_array()
        .ok_or_else(|| error::DecodingError::mismatch("item array", json_kind(value)))?;
    rows.iter().map(item_from_json).collect()
}

fn string_members(members: &[Value], tag: &str) -> Result<Vec<String>, error::DecodingError> {
    members
        .iter()
        .map(|member| {
            member
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| error::DecodingError::mismatch("set member string", tag.to_string()))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
