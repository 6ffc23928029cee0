//! Resolution of dotted field paths against mapped classes.
//!
//! A path such as `addresses.0.city` is walked segment by segment starting at
//! the queried class. Declared field names are rewritten to their stored
//! keys, array indexes and positional operators pass through unchanged.
//!
//! ```rust
//! use quarry_mapping::{MappedClass, MappedField, Mapper};
//! use quarry_query::path::resolve;
//!
//! let mapper = Mapper::new();
//! mapper.add_class(MappedClass::new("Address").field(MappedField::new("city").stored_as("c"))).unwrap();
//! let person = mapper
//!     .add_class(MappedClass::new("Person").field(MappedField::new("address").stored_as("addr").embedded("Address")))
//!     .unwrap();
//!
//! let target = resolve(&mapper, &person, "address.city", true).unwrap();
//! assert_eq!(target.translated(), "addr.c");
//! ```

use std::sync::Arc;

use quarry_mapping::{MappedClass, MappedField, Mapper};
use tracing::trace;

use crate::error::{QueryError, QueryResult};

/// The result of resolving a path.
#[derive(Debug, Clone)]
pub struct PathTarget {
    path: String,
    segments: Vec<String>,
    translated: String,
    field: Option<MappedField>,
}

impl PathTarget {
    /// The path as written.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Translated segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The path with declared names rewritten to stored keys.
    pub fn translated(&self) -> &str {
        &self.translated
    }

    /// The last mapped field reached, if the path ends on one.
    pub fn field(&self) -> Option<&MappedField> {
        self.field.as_ref()
    }

    /// Consume the target, returning the translated path and terminal field.
    pub fn into_parts(self) -> (String, Option<MappedField>) {
        (self.translated, self.field)
    }
}

/// Whether a segment is an array index or a positional operator.
pub fn is_positional(segment: &str) -> bool {
    segment.starts_with('$')
        || (!segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()))
}

/// Where the walk currently is.
enum Cursor {
    /// Inside a mapped class; segments are looked up.
    Class(Arc<MappedClass>),
    /// Below a plain value field; more field segments are a validation error.
    Value(String),
    /// Below a map field or an unresolved segment; segments pass through.
    Opaque,
}

/// Resolve `path` against `class`.
///
/// With `validate_names` set, a segment that names no mapped field fails with
/// a path resolution error. Without it the unresolved remainder is kept as
/// written.
pub fn resolve(
    mapper: &Mapper,
    class: &Arc<MappedClass>,
    path: &str,
    validate_names: bool,
) -> QueryResult<PathTarget> {
    let mut segments = Vec::new();
    let mut field: Option<MappedField> = None;
    let mut cursor = Cursor::Class(Arc::clone(class));

    for segment in path.split('.') {
        if is_positional(segment) {
            segments.push(segment.to_string());
            continue;
        }

        match cursor {
            Cursor::Opaque => {
                segments.push(segment.to_string());
                field = None;
                continue;
            }
            Cursor::Value(ref parent) => {
                if validate_names {
                    return Err(QueryError::path_resolution(class.name(), path, segment)
                        .with_help(format!(
                            "'{parent}' is not an embedded field; dot-notation cannot go past it"
                        )));
                }
                segments.push(segment.to_string());
                field = None;
                cursor = Cursor::Opaque;
                continue;
            }
            Cursor::Class(ref current) => match mapper.field(current, segment) {
                Some((_, found)) => {
                    segments.push(found.db_key.to_string());
                    cursor = next_cursor(mapper, &found, validate_names)?;
                    field = Some(found);
                }
                None if validate_names => {
                    return Err(QueryError::path_resolution(current.name(), path, segment));
                }
                None => {
                    segments.push(segment.to_string());
                    field = None;
                    cursor = Cursor::Opaque;
                }
            },
        }
    }

    let translated = segments.join(".");
    trace!(class = %class.name, path, translated = %translated, "Resolved path");

    Ok(PathTarget {
        path: path.to_string(),
        segments,
        translated,
        field,
    })
}

fn next_cursor(mapper: &Mapper, field: &MappedField, validate_names: bool) -> QueryResult<Cursor> {
    if field.is_map() {
        return Ok(Cursor::Opaque);
    }

    match field.embedded_class() {
        Some(embedded) => match mapper.class(embedded) {
            Ok(class) => Ok(Cursor::Class(class)),
            Err(err) if validate_names => Err(err.into()),
            Err(_) => Ok(Cursor::Opaque),
        },
        None => Ok(Cursor::Value(field.name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use pretty_assertions::assert_eq;

    fn mapper() -> (Mapper, Arc<MappedClass>) {
        let mapper = Mapper::new();
        mapper
            .add_class(
                MappedClass::new("Inner")
                    .field(MappedField::new("c"))
                    .field(MappedField::new("zip").stored_as("z")),
            )
            .unwrap();
        mapper
            .add_class(
                MappedClass::new("Middle")
                    .field(MappedField::new("b").stored_as("y").embedded("Inner")),
            )
            .unwrap();
        mapper
            .add_class(MappedClass::new("Base").field(MappedField::new("id").id()))
            .unwrap();
        let outer = mapper
            .add_class(
                MappedClass::new("Outer")
                    .parent("Base")
                    .field(MappedField::new("a").stored_as("x").embedded("Middle"))
                    .field(MappedField::new("tags").collection())
                    .field(MappedField::new("items").collection().embedded("Inner"))
                    .field(MappedField::new("attributes").map())
                    .field(MappedField::new("name")),
            )
            .unwrap();
        (mapper, outer)
    }

    #[test]
    fn test_renamed_embedded_path() {
        let (mapper, outer) = mapper();
        let target = resolve(&mapper, &outer, "a.b.c", true).unwrap();
        assert_eq!(target.translated(), "x.y.c");
        assert_eq!(target.segments().len(), 3);
        assert_eq!(target.field().map(|f| f.name()), Some("c"));
    }

    #[test]
    fn test_stored_keys_resolve() {
        let (mapper, outer) = mapper();
        let target = resolve(&mapper, &outer, "x.y.z", true).unwrap();
        assert_eq!(target.translated(), "x.y.z");
        assert_eq!(target.field().map(|f| f.name()), Some("zip"));
    }

    #[test]
    fn test_inherited_field() {
        let (mapper, outer) = mapper();
        let target = resolve(&mapper, &outer, "id", true).unwrap();
        assert_eq!(target.translated(), "_id");
    }

    #[test]
    fn test_array_index_keeps_class() {
        let (mapper, outer) = mapper();
        let target = resolve(&mapper, &outer, "items.0.zip", true).unwrap();
        assert_eq!(target.translated(), "items.0.z");

        let target = resolve(&mapper, &outer, "tags.3", true).unwrap();
        assert_eq!(target.translated(), "tags.3");
        assert_eq!(target.field().map(|f| f.name()), Some("tags"));
    }

    #[test]
    fn test_positional_operator() {
        let (mapper, outer) = mapper();
        let target = resolve(&mapper, &outer, "items.$.zip", true).unwrap();
        assert_eq!(target.translated(), "items.$.z");
    }

    #[test]
    fn test_unknown_field_with_validation() {
        let (mapper, outer) = mapper();
        let err = resolve(&mapper, &outer, "a.b.missing", true).unwrap_err();
        assert_eq!(err.code, ErrorCode::PathResolution);
        assert!(err.message.contains("missing"));
        assert!(err.message.contains("a.b.missing"));
    }

    #[test]
    fn test_unknown_field_without_validation() {
        let (mapper, outer) = mapper();
        let target = resolve(&mapper, &outer, "a.unknown.deeper", false).unwrap();
        assert_eq!(target.translated(), "x.unknown.deeper");
        assert!(target.field().is_none());
    }

    #[test]
    fn test_map_field_is_opaque() {
        let (mapper, outer) = mapper();
        let target = resolve(&mapper, &outer, "attributes.color.shade", true).unwrap();
        assert_eq!(target.translated(), "attributes.color.shade");
    }

    #[test]
    fn test_dot_notation_past_value_field() {
        let (mapper, outer) = mapper();
        let err = resolve(&mapper, &outer, "name.first", true).unwrap_err();
        assert_eq!(err.code, ErrorCode::PathResolution);

        let target = resolve(&mapper, &outer, "name.first", false).unwrap();
        assert_eq!(target.translated(), "name.first");
    }

    #[test]
    fn test_segment_count_preserved() {
        let (mapper, outer) = mapper();
        for path in ["a.b.c", "items.0.zip", "a.nope.x.y", "attributes.k"] {
            let target = resolve(&mapper, &outer, path, false).unwrap();
            assert_eq!(
                target.translated().split('.').count(),
                path.split('.').count(),
                "{path}"
            );
        }
    }

    #[test]
    fn test_is_positional() {
        assert!(is_positional("0"));
        assert!(is_positional("12"));
        assert!(is_positional("$"));
        assert!(is_positional("$[]"));
        assert!(!is_positional("a1"));
        assert!(!is_positional(""));
    }
}
