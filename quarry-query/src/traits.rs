//! The seam between query construction and a database driver.

use std::future::Future;
use std::pin::Pin;

use bson::Document;
use smol_str::SmolStr;

use crate::error::QueryResult;
use crate::types::{CountOptions, FindOptions, ReadConcern, ReadPreference};

/// A boxed future used by [`QueryExecutor`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A compiled find operation.
#[derive(Debug, Clone, PartialEq)]
pub struct FindRequest {
    /// Collection to query.
    pub collection: SmolStr,
    /// Filter document.
    pub filter: Document,
    /// Projection document, if any.
    pub projection: Option<Document>,
    /// Sort document, if any.
    pub sort: Option<Document>,
    /// Read preference override.
    pub read_preference: Option<ReadPreference>,
    /// Read concern override.
    pub read_concern: Option<ReadConcern>,
    /// Cursor options.
    pub options: FindOptions,
}

/// A compiled count operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CountRequest {
    /// Collection to count in.
    pub collection: SmolStr,
    /// Filter document.
    pub filter: Document,
    /// Read preference override.
    pub read_preference: Option<ReadPreference>,
    /// Read concern override.
    pub read_concern: Option<ReadConcern>,
    /// Count options.
    pub options: CountOptions,
}

/// Runs compiled queries against a database.
///
/// Implementations receive fully built documents and pass the options
/// through to the driver unexamined.
///
/// ```rust,ignore
/// #[derive(Clone)]
/// struct Recording(Arc<Mutex<Vec<FindRequest>>>);
///
/// impl QueryExecutor for Recording {
///     fn find(&self, request: FindRequest) -> BoxFuture<'_, QueryResult<Vec<Document>>> {
///         Box::pin(async move {
///             self.0.lock().push(request);
///             Ok(Vec::new())
///         })
///     }
///     // ...
/// }
/// ```
pub trait QueryExecutor: Clone + Send + Sync {
    /// Return the documents matching the request.
    fn find(&self, request: FindRequest) -> BoxFuture<'_, QueryResult<Vec<Document>>>;

    /// Count the documents matching the request.
    fn count(&self, request: CountRequest) -> BoxFuture<'_, QueryResult<u64>>;

    /// Return the server's query plan for the request.
    fn explain(&self, request: FindRequest) -> BoxFuture<'_, QueryResult<Document>>;
}
