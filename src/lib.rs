#![deny(missing_docs)]

//! # DynamoDB Mapper
//!
//! An object-mapping layer between strongly-typed Rust records and DynamoDB's
//! sparse, dynamically-typed attribute format.
//!
//! ## Overview
//!
//! The crate is built around two cores:
//! - a reflection-free, bidirectional **attribute codec** ([`mod@codec`])
//!   converting records to and from tagged attribute values, preserving
//!   round-trip fidelity for nested structures, optional fields, and
//!   homogeneous sets;
//! - a **query model** ([`mod@query`]) that accumulates filters, key
//!   conditions, and options, and renders them into the provider's
//!   placeholder-based expression syntax, routing key-flagged fields into
//!   the key-condition expression and everything else into the filter
//!   expression.
//!
//! On top of those sit the schema and field descriptors ([`mod@schema`],
//! [`mod@model`]) and the execution dispatcher ([`mod@database`]), which
//! picks scan vs. indexed query and the put/update/delete/batch request
//! shapes.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use dynamodb_mapper::database::Database;
//! use dynamodb_mapper::model::{Model, ModelCrud, field};
//! use dynamodb_mapper::query::FilterMethod;
//! use dynamodb_mapper::schema::DynamoSchema;
//!
//! #[derive(Debug)]
//! struct Todo {
//!     id: field::Id<uuid::Uuid>,
//!     title: field::Field<String>,
//!     order: field::Field<i32>,
//!     completed: field::Field<bool>,
//! }
//!
//! impl Default for Todo {
//!     fn default() -> Self {
//!         Self {
//!             id: field::Id::new("TodoID"),
//!             title: field::Field::new("Title"),
//!             order: field::Field::new("Order"),
//!             completed: field::Field::new("Completed"),
//!         }
//!     }
//! }
//!
//! impl Model for Todo {
//!     type Id = uuid::Uuid;
//!
//!     fn schema() -> DynamoSchema {
//!         DynamoSchema::from("Todo")
//!     }
//!
//!     fn id(&self) -> &field::Id<Self::Id> {
//!         &self.id
//!     }
//!
//!     fn id_mut(&mut self) -> &mut field::Id<Self::Id> {
//!         &mut self.id
//!     }
//!
//!     fn fields(&self) -> Vec<&dyn field::AnyField> {
//!         vec![&self.id, &self.title, &self.order, &self.completed]
//!     }
//!
//!     fn fields_mut(&mut self) -> Vec<&mut dyn field::AnyField> {
//!         vec![&mut self.id, &mut self.title, &mut self.order, &mut self.completed]
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = aws_sdk_dynamodb::config::Config::builder().build();
//! let database = Database::new(aws_sdk_dynamodb::Client::from_conf(config));
//!
//! // Save a record; the identity is generated on first save.
//! let mut todo = Todo::default();
//! todo.title.set("Buy milk".to_string());
//! todo.order.set(2);
//! todo.completed.set(false);
//! todo.save(&database).await?;
//!
//! // Filters on key-flagged fields become key conditions; the rest become
//! // filter expressions.
//! let open = Todo::query(&database)
//!     .filter(|todo| &todo.completed, FilterMethod::Equal, &false)?
//!     .limit(20)
//!     .all()
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - `tracing`: instrument query execution with `tracing` spans.
//!
//! ## Modules
//!
//! - [`mod@codec`] - attribute encoding and decoding, plus the JSON wire shape
//! - [`mod@schema`] - table identity and key descriptors
//! - [`mod@model`] - typed records, field descriptors, CRUD convenience
//! - [`mod@query`] - the query model, options accumulator, and builder
//! - [`mod@database`] - execution dispatch against the store client
//! - [`mod@error`] - the error taxonomy

/// Attribute value encoding and decoding.
pub mod codec;

/// Query execution against the store client.
pub mod database;

/// The error taxonomy: codec, model, and store passthrough errors.
pub mod error;

/// Typed records and their field descriptor tables.
pub mod model;

/// The query model: actions, filters, options, and the typed builder.
pub mod query;

/// Table identity and key descriptors.
pub mod schema;

pub use database::Database;
pub use database::output::{DatabaseOutput, PaginatedResponse};
pub use error::{DecodingError, EncodingError, Error, ModelError};
pub use model::{GeneratedId, Model, ModelCrud};
pub use query::builder::QueryBuilder;
pub use query::{Action, DynamoQuery, FilterMethod};
pub use schema::{DynamoSchema, KeyDescriptor};
