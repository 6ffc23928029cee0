//! Codecs that turn Rust values into BSON trees.
//!
//! A field may carry a codec. When a filter value has exactly the codec's
//! encoder type, the query layer encodes it through the codec instead of
//! relying on the value's own representation.
//!
//! ```rust
//! use std::any::Any;
//! use bson::Bson;
//! use quarry_mapping::codec::{Codec, SerdeCodec};
//!
//! #[derive(serde::Serialize)]
//! struct Point { x: i32, y: i32 }
//!
//! let codec = SerdeCodec::<Point>::new();
//! let encoded = codec.encode(&Point { x: 1, y: 2 } as &dyn Any).unwrap();
//! assert!(matches!(encoded, Bson::Document(_)));
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;

use bson::Bson;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by a codec while encoding.
#[derive(Error, Debug)]
pub enum CodecError {
    /// The value handed to the codec is not of its encoder type.
    #[error("codec for `{expected}` cannot encode a `{found}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// The codec failed to produce a BSON value.
    #[error("failed to encode `{type_name}`: {message}")]
    Encode {
        type_name: &'static str,
        message: String,
    },
}

/// Encodes values of one Rust type into BSON.
pub trait Codec: Send + Sync + fmt::Debug {
    /// The type this codec accepts.
    fn encoder_type(&self) -> TypeId;

    /// Human readable name of the encoder type.
    fn type_name(&self) -> &'static str;

    /// Encode a value. The value must be of [`Codec::encoder_type`].
    fn encode(&self, value: &dyn Any) -> Result<Bson, CodecError>;

    /// Whether `value` has exactly the encoder type.
    fn accepts(&self, value: &dyn Any) -> bool {
        value.type_id() == self.encoder_type()
    }
}

/// A codec that encodes through the type's `serde::Serialize` impl.
pub struct SerdeCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeCodec<T> {
    /// Create a new serde codec.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for SerdeCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeCodec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeCodec")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Serialize + 'static> Codec for SerdeCodec<T> {
    fn encoder_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn encode(&self, value: &dyn Any) -> Result<Bson, CodecError> {
        let value = value
            .downcast_ref::<T>()
            .ok_or(CodecError::TypeMismatch {
                expected: self.type_name(),
                found: "<other>",
            })?;
        bson::to_bson(value).map_err(|e| CodecError::Encode {
            type_name: self.type_name(),
            message: e.to_string(),
        })
    }
}

/// A codec backed by a closure.
pub struct FnCodec<T, F> {
    encode: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> FnCodec<T, F>
where
    F: Fn(&T) -> Result<Bson, CodecError> + Send + Sync,
{
    /// Wrap an encoding closure.
    pub fn new(encode: F) -> Self {
        Self {
            encode,
            _marker: PhantomData,
        }
    }
}

impl<T, F> fmt::Debug for FnCodec<T, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCodec")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T, F> Codec for FnCodec<T, F>
where
    T: 'static,
    F: Fn(&T) -> Result<Bson, CodecError> + Send + Sync,
{
    fn encoder_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn encode(&self, value: &dyn Any) -> Result<Bson, CodecError> {
        let value = value
            .downcast_ref::<T>()
            .ok_or(CodecError::TypeMismatch {
                expected: self.type_name(),
                found: "<other>",
            })?;
        (self.encode)(value)
    }
}
