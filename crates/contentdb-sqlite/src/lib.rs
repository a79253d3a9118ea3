//! SQLite engine layer for contentdb.
//!
// FFI bindings require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! This crate binds libsqlite3 directly through hand-written FFI declarations
//! and builds the handle, cursor and registry on top of them.
//!
//! # Features
//!
//! - `Database`: a thread-safe handle with exec, typed insert, parameterized
//!   query and transaction control
//! - `Cursor`: a forward-only row iterator that owns its statement
//! - `Registry`: one shared handle per database file, tracked by weak reference
//! - Configurable open flags and busy timeout
//!
//! # Example
//!
//! ```rust,ignore
//! use contentdb_sqlite::open_in_memory_database;
//! use contentdb_core::ContentValues;
//!
//! let db = open_in_memory_database();
//! db.exec("CREATE TABLE users (id INTEGER, name TEXT)");
//!
//! let mut values = ContentValues::new();
//! values.put_integer("id", 1);
//! values.put_string("name", "Alice");
//! assert!(db.insert("users", &values));
//!
//! let mut cursor = db.query_with_args("SELECT name FROM users WHERE id = ?", &["1"]);
//! while cursor.move_to_next() {
//!     println!("{}", cursor.get_string(0));
//! }
//! ```
//!
//! # Thread Safety
//!
//! `Database` is both `Send` and `Sync`; a mutex serializes every engine call
//! on a handle. `Cursor` is `Send` but meant for one owner at a time.

pub mod connection;
pub mod cursor;
pub mod ffi;
pub mod registry;
mod statement;

use std::sync::Arc;

pub use connection::{Database, DatabaseConfig, OpenFlags};
pub use cursor::Cursor;
pub use registry::{Registry, canonical_path};

/// Open `path` through the process-wide registry.
pub fn open_database(path: &str) -> Arc<Database> {
    Registry::global().open_database(path)
}

/// Open a private in-memory database.
pub fn open_in_memory_database() -> Database {
    Registry::global().open_in_memory_database()
}

/// Re-export the SQLite library version.
pub fn sqlite_version() -> &'static str {
    ffi::version()
}

/// Re-export the SQLite library version number.
pub fn sqlite_version_number() -> i32 {
    ffi::version_number()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlite_version() {
        let version = sqlite_version();
        assert!(
            version.starts_with('3'),
            "Expected SQLite 3.x, got {}",
            version
        );
    }

    #[test]
    fn test_sqlite_version_number() {
        let num = sqlite_version_number();
        assert!(
            num >= 3_000_000,
            "Expected SQLite 3.x.x (>= 3000000), got {}",
            num
        );
    }

    #[test]
    fn test_global_registry_dedup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("global.db").to_string_lossy().to_string();
        let a = open_database(&path);
        let b = open_database(&path);
        assert!(Arc::ptr_eq(&a, &b));
        assert!(std::ptr::eq(Registry::global(), Registry::global()));
    }
}
