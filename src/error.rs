use aws_sdk_dynamodb::{error, operation};
use std::{error::Error as StdError, fmt};

type SdkScanError = error::SdkError<operation::scan::ScanError>;
type SdkQueryError = error::SdkError<operation::query::QueryError>;
type SdkPutItemError = error::SdkError<operation::put_item::PutItemError>;
type SdkUpdateItemError = error::SdkError<operation::update_item::UpdateItemError>;
type SdkBatchWriteItemError = error::SdkError<operation::batch_write_item::BatchWriteItemError>;

/// Errors raised while encoding a record into attribute values.
///
/// These indicate programmer or schema errors rather than recoverable runtime
/// conditions: a value shape the attribute format cannot represent, or a
/// violated invariant inside the encoder itself.
#[derive(Debug, PartialEq)]
pub enum EncodingError {
    /// The value cannot be represented as any attribute value variant.
    UnsupportedType(String),
    /// The encoder reached a state that violates its own invariants.
    ///
    /// Should be unreachable through the public entry points.
    InternalInconsistency,
    /// A custom message produced through the `serde` error machinery.
    Message(String),
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UnsupportedType(detail) => write!(f, "unsupported type: {detail}"),
            Self::InternalInconsistency => write!(f, "internal encoder inconsistency"),
            Self::Message(message) => write!(f, "{message}"),
        }
    }
}

impl StdError for EncodingError {}

impl serde::ser::Error for EncodingError {
    fn custom<T: fmt::Display>(message: T) -> Self {
        Self::Message(message.to_string())
    }
}

/// Errors raised while decoding attribute values back into a record.
///
/// These describe a shape mismatch between the stored data and the target
/// type and always carry enough context for the caller to report which field
/// or kind was expected.
#[derive(Debug, PartialEq)]
pub enum DecodingError {
    /// A required attribute was missing from the stored item.
    NotFound(String),
    /// The stored attribute kind does not match the requested type.
    TypeMismatch {
        /// The type the caller asked for.
        expected: &'static str,
        /// The attribute kind (or malformed content) actually found.
        actual: String,
    },
    /// A single value was requested but the stored data held several.
    TooManyValues,
    /// A custom message produced through the `serde` error machinery.
    Message(String),
}

impl DecodingError {
    pub(crate) fn mismatch(expected: &'static str, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected,
            actual: actual.into(),
        }
    }
}

impl fmt::Display for DecodingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::NotFound(field) => write!(f, "attribute not found: {field}"),
            Self::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected {expected}, found {actual}")
            }
            Self::TooManyValues => write!(f, "too many values for a single-value target"),
            Self::Message(message) => write!(f, "{message}"),
        }
    }
}

impl StdError for DecodingError {}

impl serde::de::Error for DecodingError {
    fn custom<T: fmt::Display>(message: T) -> Self {
        Self::Message(message.to_string())
    }
}

/// Errors raised at the record level, wrapping a decode failure with the
/// identity of the owning field.
#[derive(Debug)]
pub enum ModelError {
    /// An attribute could not be interpreted for the model.
    AttributeError,
    /// No row matched the request.
    NotFound,
    /// A field failed to decode from database output.
    InvalidField {
        /// The database key of the failing field.
        key: String,
        /// The Rust type the field expected.
        expected: &'static str,
        /// The underlying decode failure.
        source: DecodingError,
    },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AttributeError => write!(f, "attribute error"),
            Self::NotFound => write!(f, "not found"),
            Self::InvalidField {
                key,
                expected,
                source,
            } => write!(
                f,
                "invalid field, expected '{expected}' for key '{key}': {source}"
            ),
        }
    }
}

impl StdError for ModelError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::InvalidField { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Any error surfaced by this crate.
///
/// Codec and model failures are typed; store-side failures are forwarded
/// unchanged so callers can apply their own retry policy. This crate performs
/// no retries of its own.
#[derive(Debug)]
pub enum Error {
    /// A record could not be encoded into attribute values.
    Encoding(EncodingError),
    /// Stored attribute values could not be decoded into a record.
    Decoding(DecodingError),
    /// A record-level failure, carrying the owning field's identity.
    Model(ModelError),
    /// A Scan operation failed in the store.
    Scan(SdkScanError),
    /// A Query operation failed in the store.
    Query(SdkQueryError),
    /// A PutItem operation failed in the store.
    PutItem(SdkPutItemError),
    /// An UpdateItem operation failed in the store.
    UpdateItem(SdkUpdateItemError),
    /// A BatchWriteItem operation failed in the store.
    BatchWriteItem(SdkBatchWriteItemError),
}

impl Error {
    /// Whether the error originated in this crate's codec rather than the
    /// store.
    pub fn is_codec_error(&self) -> bool {
        matches!(self, Self::Encoding(_) | Self::Decoding(_))
    }

    /// Whether the error means no row matched the request.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Model(ModelError::NotFound))
    }
}

macro_rules! impl_from_error {
    ($name:ty, $variant:ident) => {
        impl From<$name> for Error {
            fn from(error: $name) -> Self {
                Self::$variant(error)
            }
        }
    };
}

impl_from_error!(EncodingError, Encoding);
impl_from_error!(DecodingError, Decoding);
impl_from_error!(ModelError, Model);
impl_from_error!(SdkScanError, Scan);
impl_from_error!(SdkQueryError, Query);
impl_from_error!(SdkPutItemError, PutItem);
impl_from_error!(SdkUpdateItemError, UpdateItem);
impl_from_error!(SdkBatchWriteItemError, BatchWriteItem);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Encoding(error) => write!(f, "encoding failed: {error}"),
            Self::Decoding(error) => write!(f, "decoding failed: {error}"),
            Self::Model(error) => write!(f, "model error: {error}"),
            Self::Scan(error) => write!(f, "scan failed: {error}"),
            Self::Query(error) => write!(f, "query failed: {error}"),
            Self::PutItem(error) => write!(f, "put item failed: {error}"),
            Self::UpdateItem(error) => write!(f, "update item failed: {error}"),
            Self::BatchWriteItem(error) => write!(f, "batch write item failed: {error}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Encoding(error) => Some(error),
            Self::Decoding(error) => Some(error),
            Self::Model(error) => Some(error),
            Self::Scan(error) => Some(error),
            Self::Query(error) => Some(error),
            Self::PutItem(error) => Some(error),
            Self::UpdateItem(error) => Some(error),
            Self::BatchWriteItem(error) => Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    #[case::unsupported(
        EncodingError::UnsupportedType("map key".to_string()),
        "unsupported type: map key"
    )]
    #[case::inconsistency(
        EncodingError::InternalInconsistency,
        "internal encoder inconsistency"
    )]
    fn test_encoding_error_display(#[case] error: EncodingError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::not_found(
        DecodingError::NotFound("TodoID".to_string()),
        "attribute not found: TodoID"
    )]
    #[case::mismatch(
        DecodingError::mismatch("i32", "S"),
        "type mismatch: expected i32, found S"
    )]
    #[case::too_many(DecodingError::TooManyValues, "too many values for a single-value target")]
    fn test_decoding_error_display(#[case] error: DecodingError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_invalid_field_carries_context() {
        let error = ModelError::InvalidField {
            key: "Order".to_string(),
            expected: "i32",
            source: DecodingError::mismatch("i32", "S"),
        };
        let rendered = error.to_string();
        assert!(rendered.contains("Order"));
        assert!(rendered.contains("i32"));
    }

    #[test]
    fn test_error_conversion() {
        let error: Error = DecodingError::TooManyValues.into();
        assert!(error.is_codec_error());
        assert!(!error.is_not_found());

        let error: Error = ModelError::NotFound.into();
        assert!(error.is_not_found());
    }
}
