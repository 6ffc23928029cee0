//! Error types for entity mapping and configuration.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;

/// Errors that can occur while registering or looking up mapped classes.
#[derive(Error, Debug, Diagnostic)]
pub enum MappingError {
    /// Error reading a file.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(quarry::mapping::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A type or class name was looked up but never registered.
    #[error("`{name}` is not a mapped class")]
    #[diagnostic(
        code(quarry::mapping::not_mapped),
        help("register the type with `Mapper::map::<T>()` before querying it")
    )]
    NotMapped { name: String },

    /// Invalid class definition.
    #[error("invalid mapped class `{name}`: {message}")]
    #[diagnostic(code(quarry::mapping::invalid_class))]
    InvalidClass { name: String, message: String },

    /// Invalid field definition.
    #[error("invalid field `{class}.{field}`: {message}")]
    #[diagnostic(code(quarry::mapping::invalid_field))]
    InvalidField {
        class: String,
        field: String,
        message: String,
    },

    /// Two definitions share a name.
    #[error("duplicate {kind} `{name}`")]
    #[diagnostic(code(quarry::mapping::duplicate))]
    Duplicate { kind: String, name: String },

    /// A field or parent points at a class that is not registered.
    #[error("unknown class `{target}` referenced from `{class}.{field}`")]
    #[diagnostic(code(quarry::mapping::unknown_reference))]
    UnknownReference {
        class: String,
        field: String,
        target: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    #[diagnostic(code(quarry::mapping::config_error))]
    ConfigError { message: String },

    /// TOML parsing error.
    #[error("failed to parse TOML")]
    #[diagnostic(code(quarry::mapping::toml_error))]
    TomlError {
        #[source]
        source: toml::de::Error,
    },

    /// Validation error with multiple issues.
    #[error("mapping validation failed with {count} error(s)")]
    #[diagnostic(code(quarry::mapping::validation_failed))]
    ValidationFailed {
        count: usize,
        #[related]
        errors: Vec<MappingError>,
    },
}

impl MappingError {
    /// Create a not mapped error.
    pub fn not_mapped(name: impl Into<String>) -> Self {
        Self::NotMapped { name: name.into() }
    }

    /// Create an invalid class error.
    pub fn invalid_class(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidClass {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid field error.
    pub fn invalid_field(
        class: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidField {
            class: class.into(),
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate definition error.
    pub fn duplicate(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Create an unknown reference error.
    pub fn unknown_reference(
        class: impl Into<String>,
        field: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        Self::UnknownReference {
            class: class.into(),
            field: field.into(),
            target: target.into(),
        }
    }

    /// Check if this is a not mapped error.
    pub fn is_not_mapped(&self) -> bool {
        matches!(self, Self::NotMapped { .. })
    }
}
