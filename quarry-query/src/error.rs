//! Error types for query construction and execution with actionable messages.
//!
//! Every error carries:
//! - An error code for programmatic handling
//! - Suggestions for fixing the issue
//! - Context about the class, field and operation involved
//!
//! # Error Codes
//!
//! Error codes follow a pattern: Q{category}{number}
//! - 1xxx: Query construction errors (path, operator, filter, projection)
//! - 3xxx: Connection errors (timeout, auth)
//! - 5xxx: Execution errors (timeout, server errors)
//! - 6xxx: Data errors (serialization)
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use quarry_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::path_resolution("Person", "address.zip", "zip");
//! assert_eq!(err.code, ErrorCode::PathResolution);
//! assert_eq!(err.code.code(), "Q1002");
//! assert!(err.to_string().contains("address.zip"));
//! ```

use std::fmt;
use thiserror::Error;

use quarry_mapping::MappingError;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Query construction errors (1xxx)
    /// A field path does not resolve against the mapped class (Q1002).
    PathResolution = 1002,
    /// Unknown filter operator (Q1003).
    UnsupportedOperator = 1003,
    /// Filter condition cannot be parsed (Q1004).
    MalformedFilter = 1004,
    /// Inclusion and exclusion mixed in one projection (Q1005).
    ProjectionConflict = 1005,
    /// A codec failed to encode a filter value (Q1006).
    ValueCoercion = 1006,
    /// The entity type is not mapped (Q1007).
    NotMapped = 1007,
    /// Invalid query argument (Q1008).
    InvalidQuery = 1008,

    // Connection errors (3xxx)
    /// Database connection failed (Q3001).
    ConnectionFailed = 3001,
    /// Connection timeout (Q3003).
    ConnectionTimeout = 3003,
    /// Authentication failed (Q3004).
    AuthenticationFailed = 3004,

    // Query execution errors (5xxx)
    /// Query timeout (Q5001).
    QueryTimeout = 5001,
    /// The server rejected a command (Q5002).
    CommandFailed = 5002,
    /// General database error (Q5005).
    DatabaseError = 5005,

    // Data errors (6xxx)
    /// Serialization error (Q6002).
    SerializationError = 6002,
    /// Deserialization error (Q6003).
    DeserializationError = 6003,

    // Configuration errors (7xxx)
    /// Invalid configuration (Q7001).
    InvalidConfiguration = 7001,
    /// Missing configuration (Q7002).
    MissingConfiguration = 7002,
    /// Invalid connection string (Q7003).
    InvalidConnectionString = 7003,

    // Internal errors (9xxx)
    /// Internal error (Q9001).
    Internal = 9001,
    /// Unknown error (Q9999).
    Unknown = 9999,
}

impl ErrorCode {
    /// Get the error code string (e.g., "Q1002").
    pub fn code(&self) -> String {
        format!("Q{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::PathResolution => "Field path cannot be resolved",
            Self::UnsupportedOperator => "Unsupported filter operator",
            Self::MalformedFilter => "Malformed filter condition",
            Self::ProjectionConflict => "Conflicting projection",
            Self::ValueCoercion => "Value coercion failed",
            Self::NotMapped => "Type is not mapped",
            Self::InvalidQuery => "Invalid query argument",
            Self::ConnectionFailed => "Database connection failed",
            Self::ConnectionTimeout => "Connection timeout",
            Self::AuthenticationFailed => "Authentication failed",
            Self::QueryTimeout => "Query timeout",
            Self::CommandFailed => "Command failed",
            Self::DatabaseError => "Database error",
            Self::SerializationError => "Serialization error",
            Self::DeserializationError => "Deserialization error",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::MissingConfiguration => "Missing configuration",
            Self::InvalidConnectionString => "Invalid connection string",
            Self::Internal => "Internal error",
            Self::Unknown => "Unknown error",
        }
    }

    /// Whether the error was raised while building a query, before any I/O.
    pub fn is_construction(&self) -> bool {
        (*self as u16) / 1000 == 1
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The mapped class involved.
    pub class: Option<String>,
    /// The field or path involved.
    pub field: Option<String>,
    /// The compiled filter document (if available).
    pub filter: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur while building or running a query.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the mapped class.
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.context.class = Some(class.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the compiled filter.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.context.filter = Some(filter.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Create a path resolution error.
    pub fn path_resolution(
        class: impl Into<String>,
        path: impl Into<String>,
        segment: impl Into<String>,
    ) -> Self {
        let class = class.into();
        let path = path.into();
        let segment = segment.into();
        Self::new(
            ErrorCode::PathResolution,
            format!(
                "The field '{}' could not be found in '{}' while validating '{}'",
                segment, class, path
            ),
        )
        .with_class(&class)
        .with_field(&path)
        .with_suggestion(format!("Check that '{}' is mapped on '{}'", segment, class))
        .with_code_suggestion(
            "Disable validation to pass the path through unchanged",
            "datastore.find::<T>()?.disable_validation()",
        )
    }

    /// Create an unsupported operator error.
    pub fn unsupported_operator(token: impl Into<String>) -> Self {
        let token = token.into();
        Self::new(
            ErrorCode::UnsupportedOperator,
            format!("Unknown operator '{}'", token),
        )
        .with_help("Supported operators: = == eq != <> ne > gt >= gte < lt <= lte exists type mod size in nin all elem elemMatch near nearSphere within geoWithin")
    }

    /// Create a malformed filter error.
    pub fn malformed_filter(condition: impl Into<String>) -> Self {
        let condition = condition.into();
        Self::new(
            ErrorCode::MalformedFilter,
            format!("'{}' is not a legal filter condition", condition),
        )
        .with_field(&condition)
        .with_code_suggestion(
            "A condition is a field path optionally followed by an operator",
            "query.filter(\"age >\", 5)",
        )
    }

    /// Create a projection conflict error.
    pub fn projection_conflict(field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::ProjectionConflict,
            format!(
                "Cannot mix included and excluded fields in one projection (at '{}')",
                field
            ),
        )
        .with_field(&field)
        .with_help("Only '_id' may be excluded from an inclusion projection")
    }

    /// Create a value coercion error.
    pub fn value_coercion(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        let message = message.into();
        Self::new(
            ErrorCode::ValueCoercion,
            format!("Failed to encode value for '{}': {}", field, message),
        )
        .with_field(&field)
    }

    /// Create a not mapped error.
    pub fn not_mapped(class: impl Into<String>) -> Self {
        let class = class.into();
        Self::new(
            ErrorCode::NotMapped,
            format!("'{}' is not a mapped class", class),
        )
        .with_class(&class)
        .with_code_suggestion(
            "Register the type before querying it",
            "mapper.map::<T>()?",
        )
    }

    /// Create an invalid query argument error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidQuery, message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::ConnectionFailed, format!("Connection error: {}", message))
            .with_suggestion("Check that the database server is running")
            .with_suggestion("Verify the connection URI is correct")
    }

    /// Create a connection timeout error.
    pub fn connection_timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::ConnectionTimeout,
            format!("Connection timed out after {}ms", duration_ms),
        )
        .with_code_suggestion(
            "Increase the connect timeout in your connection string",
            "mongodb://host/db?connectTimeoutMS=30000",
        )
    }

    /// Create an authentication error.
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::AuthenticationFailed,
            format!("Authentication failed: {}", message),
        )
        .with_suggestion("Check username and password in connection string")
        .with_suggestion("Verify the authSource of the user")
    }

    /// Create a timeout error.
    pub fn timeout(duration_ms: u64) -> Self {
        Self::new(
            ErrorCode::QueryTimeout,
            format!("Query timed out after {}ms", duration_ms),
        )
        .with_suggestion("Add indexes to support the filter")
        .with_suggestion("Increase max_time if the query is expected to be slow")
    }

    /// Create a command error.
    pub fn command(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CommandFailed, message.into())
    }

    /// Create a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializationError, message.into())
    }

    /// Create a deserialization error.
    pub fn deserialization(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(
            ErrorCode::DeserializationError,
            format!("Failed to deserialize result: {}", message),
        )
        .with_suggestion("Check that the entity type matches the stored documents")
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::DatabaseError, message)
            .with_suggestion("Check the server logs for more details")
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message))
    }

    // ============== Error Checks ==============

    /// Check if the error was raised while building the query.
    pub fn is_construction_error(&self) -> bool {
        self.code.is_construction()
    }

    /// Check if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::QueryTimeout | ErrorCode::ConnectionTimeout
        )
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConnectionFailed
                | ErrorCode::ConnectionTimeout
                | ErrorCode::AuthenticationFailed
        )
    }

    /// Check if this error is retryable.
    ///
    /// Construction errors never are.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::ConnectionTimeout | ErrorCode::QueryTimeout
        )
    }

    // ============== Display Functions ==============

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref class) = self.context.class {
            output.push_str(&format!("  → Class: {}\n", class));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }

        // long filters are truncated on a char boundary
        if let Some(ref filter) = self.context.filter {
            let display = if filter.chars().count() > 200 {
                format!("{}...", filter.chars().take(200).collect::<String>())
            } else {
                filter.clone()
            };
            output.push_str(&format!("  → Filter: {}\n", display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!(
                        "     ```\n     {}\n     ```\n",
                        code.replace('\n', "\n     ")
                    ));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

impl From<MappingError> for QueryError {
    fn from(err: MappingError) -> Self {
        match &err {
            MappingError::NotMapped { name } => {
                let name = name.clone();
                Self::not_mapped(name).with_source(err)
            }
            _ => Self::configuration(err.to_string()).with_source(err),
        }
    }
}

impl From<bson::ser::Error> for QueryError {
    fn from(err: bson::ser::Error) -> Self {
        Self::serialization(err.to_string()).with_source(err)
    }
}

impl From<bson::de::Error> for QueryError {
    fn from(err: bson::de::Error) -> Self {
        Self::deserialization(err.to_string()).with_source(err)
    }
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}
