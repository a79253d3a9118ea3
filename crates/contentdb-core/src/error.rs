//! Error types for contentdb operations.
//!
//! The public handle and cursor APIs report failures by return value and
//! `get_error()`. These types are what the engine helpers produce internally
//! and what the strict `try_*` entry points hand back to callers.

use std::fmt;

/// The primary error type for contentdb operations.
#[derive(Debug)]
pub enum Error {
    /// Opening or using the engine connection failed
    Connection(ConnectionError),
    /// Preparing, binding or stepping a statement failed
    Query(QueryError),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub path: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// The engine could not open the database
    Open,
    /// The handle was never opened successfully
    NotOpen,
    /// The path cannot be passed to the engine
    InvalidPath,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    /// Engine result code, when one was reported
    pub code: Option<i32>,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Statement could not be compiled
    Prepare,
    /// A parameter could not be bound
    Bind,
    /// Constraint violation (unique, not null, foreign key)
    Constraint,
    /// Database is busy or locked by another connection
    Busy,
    /// Permission denied or read-only database
    Permission,
    /// Table or column not found
    NotFound,
    /// Value too large
    TooBig,
    /// Interrupted
    Interrupted,
    /// Engine API misuse
    Misuse,
    /// Other database error
    Database,
}

impl Error {
    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }

    /// Get the engine result code, if available
    pub fn code(&self) -> Option<i32> {
        match self {
            Error::Query(q) => q.code,
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e),
            Error::Query(e) => write!(f, "Query error: {}", e),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{} ({})", self.message, path)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "{} (code {})", self.message, code)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

/// Result type alias for contentdb operations.
pub type Result<T> = std::result::Result<T, Error>;
