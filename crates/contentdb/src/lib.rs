//! contentdb - typed key/value inserts and forward-only cursors over SQLite.
//!
//! contentdb provides:
//!
//! - `ContentValues`, a typed key/value bag that becomes one INSERT
//! - `Database`, a thread-safe connection handle with polling-style errors
//! - `Cursor`, a forward-only iterator that owns its prepared statement
//! - `Registry`, which hands out one shared handle per database file
//! - `bridge`, an id-based surface for embedding in another runtime
//!
//! # Quick Start
//!
//! ```ignore
//! use contentdb::prelude::*;
//!
//! let db = open_database("/tmp/notes.db");
//! db.exec("CREATE TABLE IF NOT EXISTS notes (id INTEGER, body TEXT)");
//!
//! let mut values = ContentValues::new();
//! values.put_integer("id", 1);
//! values.put_string("body", "hello");
//! if !db.insert("notes", &values) {
//!     eprintln!("insert failed: {}", db.get_error());
//! }
//!
//! let mut cursor = db.query_with_args("SELECT body FROM notes WHERE id = ?", &["1"]);
//! if cursor.move_to_first() {
//!     loop {
//!         println!("{}", cursor.get_string(0));
//!         if !cursor.move_to_next() {
//!             break;
//!         }
//!     }
//! }
//! ```
//!
//! # Errors
//!
//! Engine failures do not panic or return `Err`. Operations report `false`,
//! `0` or an after-last cursor, and [`Database::get_error`] describes the
//! most recent failure. [`Database::try_exec`] is available for callers that
//! prefer `?`.

pub mod bridge;

pub use contentdb_core::{
    ConnectionError, ConnectionErrorKind, ContentValues, DataType, Error, QueryError,
    QueryErrorKind, Result, Value, quote_ident,
};

pub use contentdb_sqlite::{
    Cursor, Database, DatabaseConfig, OpenFlags, Registry, canonical_path,
    open_database, open_in_memory_database, sqlite_version, sqlite_version_number,
};

pub use bridge::{Bridge, HandleTable, HostValue};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use contentdb::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ContentValues, Cursor, DataType, Database, DatabaseConfig, Error, OpenFlags, Registry,
        Result, Value, open_database, open_in_memory_database,
    };
}
