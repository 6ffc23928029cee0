//! Values accepted by filters before coercion.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bson::oid::ObjectId;
use bson::{Bson, Document};
use serde::Serialize;

use crate::error::{QueryError, QueryResult};

/// A filter value as handed to the query builder.
///
/// Scalars convert into [`FilterValue::Native`]. Domain objects keep their
/// Rust type in [`FilterValue::Object`] so a field codec can pick them up.
#[derive(Debug, Clone)]
pub enum FilterValue {
    /// Null value.
    Null,
    /// A value already in BSON form.
    Native(Bson),
    /// List of values.
    List(Vec<FilterValue>),
    /// A domain object encoded by a codec, or by serde when no codec applies.
    Object(ObjectValue),
}

impl FilterValue {
    /// Wrap a domain object.
    pub fn object<T>(value: T) -> Self
    where
        T: Serialize + Any + Send + Sync,
    {
        Self::Object(ObjectValue::new(value))
    }

    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null | Self::Native(Bson::Null))
    }

    /// Check if this value is a list or a BSON array.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_) | Self::Native(Bson::Array(_)))
    }

    /// The Rust value a codec would be offered.
    ///
    /// For lists this is the first element.
    pub fn runtime_value(&self) -> Option<&dyn Any> {
        match self {
            Self::Null => None,
            Self::Native(Bson::Array(items)) => items.first().map(|b| b as &dyn Any),
            Self::Native(bson) => Some(bson as &dyn Any),
            Self::List(items) => items.first().and_then(Self::runtime_value),
            Self::Object(object) => Some(object.as_any()),
        }
    }

    /// Encode without a codec.
    pub fn to_bson(&self) -> QueryResult<Bson> {
        match self {
            Self::Null => Ok(Bson::Null),
            Self::Native(bson) => Ok(bson.clone()),
            Self::List(items) => items
                .iter()
                .map(Self::to_bson)
                .collect::<QueryResult<Vec<_>>>()
                .map(Bson::Array),
            Self::Object(object) => object.to_bson(),
        }
    }
}

impl PartialEq for FilterValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Native(a), Self::Native(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

trait ErasedObject: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn type_name(&self) -> &'static str;
    fn to_bson(&self) -> Result<Bson, bson::ser::Error>;
}

impl<T> ErasedObject for T
where
    T: Serialize + Any + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn to_bson(&self) -> Result<Bson, bson::ser::Error> {
        bson::to_bson(self)
    }
}

/// A type-erased domain object.
#[derive(Clone)]
pub struct ObjectValue {
    inner: Arc<dyn ErasedObject>,
}

impl ObjectValue {
    /// Wrap a value.
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Any + Send + Sync,
    {
        Self {
            inner: Arc::new(value),
        }
    }

    /// The wrapped value.
    pub fn as_any(&self) -> &dyn Any {
        self.inner.as_any()
    }

    /// Name of the wrapped type.
    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    /// Encode through serde.
    pub fn to_bson(&self) -> QueryResult<Bson> {
        self.inner.to_bson().map_err(|e| {
            QueryError::serialization(format!("failed to encode `{}`: {}", self.type_name(), e))
                .with_source(e)
        })
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectValue").field(&self.type_name()).finish()
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.type_name() == other.type_name()
                && matches!((self.to_bson(), other.to_bson()), (Ok(a), Ok(b)) if a == b))
    }
}

macro_rules! native_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FilterValue {
                fn from(v: $ty) -> Self {
                    Self::Native(Bson::from(v))
                }
            }
        )*
    };
}

native_from!(
    bool,
    i32,
    i64,
    f32,
    f64,
    String,
    &str,
    Document,
    ObjectId,
    bson::DateTime,
    bson::Regex,
);

impl From<u32> for FilterValue {
    fn from(v: u32) -> Self {
        Self::Native(Bson::Int64(i64::from(v)))
    }
}

impl From<Bson> for FilterValue {
    fn from(v: Bson) -> Self {
        match v {
            Bson::Null => Self::Null,
            other => Self::Native(other),
        }
    }
}

impl From<serde_json::Value> for FilterValue {
    fn from(v: serde_json::Value) -> Self {
        Bson::from(v).into()
    }
}

impl From<ObjectValue> for FilterValue {
    fn from(v: ObjectValue) -> Self {
        Self::Object(v)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>, const N: usize> From<[T; N]> for FilterValue {
    fn from(v: [T; N]) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<FilterValue>> From<Option<T>> for FilterValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}
