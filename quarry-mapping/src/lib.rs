//! # quarry-mapping
//!
//! Entity mapping metadata for the Quarry ODM.
//!
//! This crate provides:
//! - [`MappedClass`] / [`MappedField`] descriptions of how Rust types are stored
//! - A [`Mapper`] registry populated at startup
//! - [`Codec`]s that encode field values into BSON
//! - Configuration parsing for `quarry.toml` files
//!
//! ## Example
//!
//! ```rust
//! use quarry_mapping::{Entity, MappedClass, MappedField, Mapper};
//!
//! struct Person;
//!
//! impl Entity for Person {
//!     fn mapped_class() -> MappedClass {
//!         MappedClass::new("Person")
//!             .collection("people")
//!             .field(MappedField::new("id").id())
//!             .field(MappedField::new("name"))
//!             .field(MappedField::new("age").stored_as("a"))
//!     }
//! }
//!
//! let mapper = Mapper::new();
//! mapper.map::<Person>().unwrap();
//!
//! let class = mapper.mapped_class::<Person>().unwrap();
//! assert_eq!(class.own_field("age").unwrap().db_key(), "a");
//! ```

pub mod class;
pub mod codec;
pub mod config;
pub mod error;
pub mod field;
pub mod mapper;

pub use class::MappedClass;
pub use codec::{Codec, CodecError, FnCodec, SerdeCodec};
pub use config::QuarryConfig;
pub use error::{MappingError, MappingResult};
pub use field::{FieldKind, ID_KEY, MappedField};
pub use mapper::{DEFAULT_DISCRIMINATOR_KEY, Entity, Mapper, MapperOptions};
