//! Core types for contentdb.
//!
//! This crate holds everything that does not touch the database engine:
//!
//! - `Value` and `DataType`, the tagged value with lazy coercion
//! - `ContentValues`, the typed key/value container used to build INSERTs
//! - `Error` and `Result`
//! - identifier quoting and INSERT generation

pub mod content_values;
pub mod error;
pub mod identifiers;
pub mod value;

pub use content_values::ContentValues;
pub use error::{
    ConnectionError, ConnectionErrorKind, Error, QueryError, QueryErrorKind, Result,
};
pub use identifiers::{insert_sql, quote_ident};
pub use value::{DataType, Value};
