//! # Quarry
//!
//! A mapping-aware query builder and ODM for MongoDB.
//!
//! Quarry provides:
//! - Mapping metadata describing how Rust types are stored as documents
//! - Fluent and string based query construction that translates field
//!   names into stored keys
//! - Value coercion through per-field codecs
//! - An async execution seam with a MongoDB implementation
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quarry::prelude::*;
//!
//! #[derive(serde::Deserialize)]
//! struct Person {
//!     name: String,
//!     age: i32,
//! }
//!
//! impl Entity for Person {
//!     fn mapped_class() -> MappedClass {
//!         MappedClass::new("Person")
//!             .collection("people")
//!             .field(MappedField::new("name"))
//!             .field(MappedField::new("age").stored_as("a"))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = quarry::mongodb::MongoClient::builder()
//!         .uri("mongodb://localhost:27017")
//!         .database("shop")
//!         .build()
//!         .await?;
//!
//!     let mapper = Arc::new(Mapper::new());
//!     mapper.map::<Person>()?;
//!
//!     let datastore = client.datastore(mapper);
//!     let mut query = datastore.find::<Person>()?;
//!     query.filter("age >=", 18)?.field("name").starts_with("A")?;
//!
//!     let adults: Vec<Person> = query.find().await?;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Mapping metadata, codecs and configuration.
pub mod mapping {
    pub use quarry_mapping::*;
}

/// Query construction and execution.
pub mod query {
    pub use quarry_query::*;
}

/// MongoDB driver integration.
#[cfg(feature = "mongodb")]
#[cfg_attr(docsrs, doc(cfg(feature = "mongodb")))]
pub mod mongodb {
    pub use quarry_mongodb::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::mapping::{Entity, MappedClass, MappedField, Mapper, QuarryConfig};
    pub use crate::query::prelude::*;
    pub use crate::query::{FieldEnd, QueryExecutor};
}

// Re-export key types at the crate root
pub use mapping::{Mapper, MappingError, QuarryConfig};
pub use query::{Datastore, Query, QueryError, QueryResult};
