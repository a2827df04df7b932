//! SQLite driver for SQLRecord.
//!
// FFI calls into libsqlite3 require unsafe code - this is expected for database drivers
#![allow(unsafe_code)]
//!
//! This crate provides a synchronous SQLite executor on top of libsqlite3
//! (compiled from the bundled amalgamation). It implements the `Executor`
//! trait from sqlrecord-core, so a `SqliteConnection` can back a
//! `sqlrecord::Connection` directly.
//!
//! # Example
//!
//! ```rust
//! use sqlrecord_core::{Executor, Value};
//! use sqlrecord_sqlite::SqliteConnection;
//!
//! let conn = SqliteConnection::open_memory().unwrap();
//! conn.execute_raw("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)").unwrap();
//!
//! let id = conn
//!     .insert("INSERT INTO users (name) VALUES (?)", &[Value::from("Alice")])
//!     .unwrap();
//! assert_eq!(id, 1);
//! ```
//!
//! # Type Mapping
//!
//! | Value | SQLite Type |
//! |-------|-------------|
//! | `Bool` | INTEGER (0/1) |
//! | `Int`, `BigInt` | INTEGER |
//! | `Double` | REAL |
//! | `Text` | TEXT |
//! | `Bytes` | BLOB |
//! | `DateTime` | TEXT (RFC 3339) |
//! | `Json` | TEXT |
//! | `Null` | NULL |
//!
//! INTEGER columns read back as `Int` when they fit in 32 bits, else `BigInt`.
//!
//! # Thread Safety
//!
//! `SqliteConnection` is both `Send` and `Sync`, using internal mutex
//! synchronization to protect the underlying SQLite handle.

pub mod connection;
pub mod types;

pub use connection::{SqliteConfig, SqliteConnection};

/// The SQLite library version.
pub fn sqlite_version() -> String {
    // SAFETY: sqlite3_libversion returns a static NUL-terminated string
    unsafe { std::ffi::CStr::from_ptr(libsqlite3_sys::sqlite3_libversion()) }
        .to_string_lossy()
        .into_owned()
}

/// The SQLite library version number.
pub fn sqlite_version_number() -> i32 {
    // SAFETY: no arguments, no preconditions
    unsafe { libsqlite3_sys::sqlite3_libversion_number() }
}
