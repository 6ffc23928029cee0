//! # quarry-mongodb
//!
//! MongoDB driver integration for the Quarry ODM.
//!
//! This crate provides:
//! - Connection management with the official MongoDB driver
//! - Built-in connection pooling
//! - [`MongoEngine`], a [`QueryExecutor`](quarry_query::QueryExecutor) that runs
//!   compiled queries
//! - Mapping of driver errors onto [`QueryError`](quarry_query::QueryError)
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use quarry_mapping::Mapper;
//! use quarry_mongodb::MongoClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Create a client (connection pooling is built-in)
//!     let client = MongoClient::builder()
//!         .uri("mongodb://localhost:27017")
//!         .database("shop")
//!         .build()
//!         .await?;
//!
//!     let mapper = Arc::new(Mapper::new());
//!     mapper.map::<Product>()?;
//!
//!     let datastore = client.datastore(mapper);
//!     let cheap: Vec<Product> = datastore
//!         .find::<Product>()?
//!         .filter("price <", 10)?
//!         .find()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod engine;
pub mod error;

pub use bson::oid::ObjectId;
pub use bson::{Bson, Document, doc};
pub use client::{MongoClient, MongoClientBuilder};
pub use config::{MongoConfig, MongoConfigBuilder};
pub use engine::MongoEngine;
pub use error::{MongoError, MongoResult};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::{MongoClient, MongoClientBuilder};
    pub use crate::config::{MongoConfig, MongoConfigBuilder};
    pub use crate::engine::MongoEngine;
    pub use crate::error::{MongoError, MongoResult};
    pub use bson::oid::ObjectId;
    pub use bson::{Bson, Document, doc};
}
