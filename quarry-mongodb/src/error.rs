//! Error types for MongoDB operations.

use mongodb::error::ErrorKind;
use quarry_query::QueryError;
use thiserror::Error;

/// Result type for MongoDB operations.
pub type MongoResult<T> = Result<T, MongoError>;

/// Errors that can occur during MongoDB operations.
#[derive(Error, Debug)]
pub enum MongoError {
    /// MongoDB driver error.
    #[error("mongodb error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// BSON serialization error.
    #[error("bson error: {0}")]
    Bson(#[from] bson::ser::Error),

    /// BSON deserialization error.
    #[error("bson deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Timeout error.
    #[error("operation timed out after {0}ms")]
    Timeout(u64),
}

impl MongoError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Driver(e) => matches!(
                *e.kind,
                ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. }
            ),
            _ => false,
        }
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<MongoError> for QueryError {
    fn from(err: MongoError) -> Self {
        if err.is_connection_error() {
            let message = err.to_string();
            return QueryError::connection(message).with_source(err);
        }

        match err {
            MongoError::Driver(e) => match *e.kind {
                ErrorKind::Authentication { ref message, .. } => {
                    QueryError::authentication_failed(message.clone()).with_source(e)
                }
                ErrorKind::Command(ref command) => {
                    QueryError::command(format!("{} ({})", command.message, command.code_name))
                        .with_source(e)
                }
                _ => QueryError::database(e.to_string()).with_source(e),
            },
            MongoError::Bson(e) => QueryError::serialization(e.to_string()).with_source(e),
            MongoError::BsonDe(e) => QueryError::deserialization(e.to_string()).with_source(e),
            MongoError::Config(msg) => QueryError::configuration(msg),
            MongoError::Connection(msg) => QueryError::connection(msg),
            MongoError::Timeout(ms) => QueryError::timeout(ms),
        }
    }
}
