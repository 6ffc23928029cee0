//! Coercion of filter values into BSON.

use bson::Bson;
use quarry_mapping::{Codec, MappedField};

use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::operator::FilterOperator;

/// Coerce a filter value for `field` and `operator`.
///
/// The field codec is used when the value (for lists, its first element) has
/// the codec's encoder type. List elements of any other type are converted
/// as plain values. `$in`/`$nin` always receive an array.
pub fn coerce(
    field: Option<&MappedField>,
    operator: FilterOperator,
    value: FilterValue,
) -> QueryResult<Bson> {
    if value.is_null() {
        let is_collection = field.is_some_and(|f| f.is_collection);
        return Ok(if operator.wraps_scalars() && is_collection {
            Bson::Array(Vec::new())
        } else {
            Bson::Null
        });
    }

    let is_list = value.is_list();
    let encoded = encode(field, &value)?;

    if operator.wraps_scalars() && !is_list {
        Ok(Bson::Array(vec![encoded]))
    } else {
        Ok(encoded)
    }
}

fn encode(field: Option<&MappedField>, value: &FilterValue) -> QueryResult<Bson> {
    let Some((field, codec)) = field.and_then(|f| f.get_codec().map(|c| (f, c))) else {
        return value.to_bson();
    };

    let applies = value
        .runtime_value()
        .is_some_and(|first| codec.accepts(first));
    if !applies {
        return value.to_bson();
    }

    match value {
        FilterValue::List(items) => items
            .iter()
            .map(|item| encode_one(field, codec.as_ref(), item))
            .collect::<QueryResult<Vec<_>>>()
            .map(Bson::Array),
        FilterValue::Native(Bson::Array(items)) => items
            .iter()
            .map(|item| {
                if codec.accepts(item) {
                    encode_any(field, codec.as_ref(), item)
                } else {
                    Ok(item.clone())
                }
            })
            .collect::<QueryResult<Vec<_>>>()
            .map(Bson::Array),
        other => encode_one(field, codec.as_ref(), other),
    }
}

fn encode_one(field: &MappedField, codec: &dyn Codec, value: &FilterValue) -> QueryResult<Bson> {
    match value.runtime_value() {
        Some(any) if !value.is_list() && codec.accepts(any) => encode_any(field, codec, any),
        _ => value.to_bson(),
    }
}

fn encode_any(
    field: &MappedField,
    codec: &dyn Codec,
    value: &dyn std::any::Any,
) -> QueryResult<Bson> {
    codec
        .encode(value)
        .map_err(|e| QueryError::value_coercion(field.name(), e.to_string()).with_source(e))
}
