//! # quarry-query
//!
//! Query construction for the Quarry ODM.
//!
//! This crate turns fluent, string and operator based filters into MongoDB
//! filter, projection and sort documents:
//! - Path resolution against mapped classes (renamed keys, embedded classes,
//!   inheritance, array indexes)
//! - Value coercion through per-field codecs
//! - AND/OR criteria trees with operator merging and `$not` wrapping
//! - A [`Datastore`] that hands out [`Query`] builders bound to a
//!   [`QueryExecutor`]
//!
//! ## Filters
//!
//! ```rust
//! use std::sync::Arc;
//! use bson::doc;
//! use quarry_mapping::{MappedClass, MappedField, Mapper};
//! use quarry_query::Query;
//!
//! let mapper = Arc::new(Mapper::new());
//! let class = mapper
//!     .add_class(
//!         MappedClass::new("Person")
//!             .field(MappedField::new("name"))
//!             .field(MappedField::new("age").stored_as("a")),
//!     )
//!     .unwrap();
//!
//! let mut query: Query<(), ()> = Query::new(mapper, class, "people", ());
//! query.filter("age >", 5).unwrap().filter("name", "Bob").unwrap();
//!
//! assert_eq!(query.get_query_document(), doc! { "a": { "$gt": 5 }, "name": "Bob" });
//! ```
//!
//! ## Field Ends
//!
//! ```rust
//! # use std::sync::Arc;
//! # use bson::doc;
//! # use quarry_mapping::{MappedClass, MappedField, Mapper};
//! # use quarry_query::Query;
//! # let mapper = Arc::new(Mapper::new());
//! # let class = mapper
//! #     .add_class(MappedClass::new("Person").field(MappedField::new("age")).field(MappedField::new("tags")))
//! #     .unwrap();
//! let mut query: Query<(), ()> = Query::new(mapper, class, "people", ());
//! query.field("age").not().greater_than(65).unwrap();
//! query.field("tags").r#in("rust").unwrap();
//!
//! assert_eq!(
//!     query.get_query_document(),
//!     doc! { "age": { "$not": { "$gt": 65 } }, "tags": { "$in": ["rust"] } }
//! );
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use quarry_query::{ErrorCode, QueryError};
//!
//! let err = QueryError::malformed_filter("a b c d e f g");
//! assert_eq!(err.code, ErrorCode::MalformedFilter);
//! assert!(err.is_construction_error());
//! ```

pub mod criteria;
pub mod datastore;
pub mod error;
pub mod field_end;
pub mod filter;
pub mod logging;
pub mod operator;
pub mod path;
pub mod query;
pub mod traits;
pub mod types;
pub mod value;

pub use criteria::{Criteria, CriteriaContainer, CriteriaJoin, FieldCriteria};
pub use datastore::{Datastore, DatastoreOptions};
pub use error::{ErrorCode, ErrorContext, QueryError, QueryResult, Suggestion};
pub use field_end::{CriteriaSink, FieldEnd, ValidationContext};
pub use filter::{FilterValue, ObjectValue};
pub use operator::FilterOperator;
pub use path::PathTarget;
pub use query::Query;
pub use traits::{BoxFuture, CountRequest, FindRequest, QueryExecutor};
pub use types::{
    ArraySlice, BsonType, CountOptions, FindOptions, Hint, Meta, Point, ReadConcern,
    ReadPreference, Shape, Sort, SortOrder,
};

// Re-export logging utilities
pub use logging::{
    get_log_format, get_log_level, init as init_logging, init_debug, init_with_level,
    is_debug_enabled,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::criteria::{Criteria, CriteriaContainer};
    pub use crate::datastore::Datastore;
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::FilterValue;
    pub use crate::operator::FilterOperator;
    pub use crate::query::Query;
    pub use crate::traits::QueryExecutor;
    pub use crate::types::{ArraySlice, BsonType, Meta, ReadConcern, ReadPreference, Shape, Sort};
}
