//! MongoDB implementation of the query executor.

use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::Collection;
use mongodb::options::{self, CollectionOptions};
use quarry_query::traits::{BoxFuture, CountRequest, FindRequest, QueryExecutor};
use quarry_query::{CountOptions, FindOptions, Hint, QueryResult, ReadConcern, ReadPreference};
use tracing::debug;

use crate::client::MongoClient;
use crate::config::{read_concern, selection_criteria};
use crate::error::MongoError;

/// Runs compiled queries with the official MongoDB driver.
#[derive(Clone)]
pub struct MongoEngine {
    client: MongoClient,
}

impl MongoEngine {
    /// Create a new MongoDB engine with the given client.
    pub fn new(client: MongoClient) -> Self {
        Self { client }
    }

    /// Get a reference to the client.
    pub fn client(&self) -> &MongoClient {
        &self.client
    }

    fn collection(
        &self,
        name: &str,
        read_preference: Option<ReadPreference>,
        concern: Option<ReadConcern>,
    ) -> Collection<Document> {
        if read_preference.is_none() && concern.is_none() {
            return self.client.collection_doc(name);
        }

        let mut options = CollectionOptions::default();
        options.selection_criteria = read_preference.map(selection_criteria);
        options.read_concern = concern.map(read_concern);
        self.client
            .database()
            .collection_with_options(name, options)
    }
}

fn driver_hint(hint: Hint) -> options::Hint {
    match hint {
        Hint::Keys(keys) => options::Hint::Keys(keys),
        Hint::Name(name) => options::Hint::Name(name),
    }
}

fn find_options(
    projection: Option<Document>,
    sort: Option<Document>,
    opts: FindOptions,
) -> options::FindOptions {
    let mut options = options::FindOptions::default();
    options.projection = projection;
    options.sort = sort;
    options.limit = opts.limit;
    options.skip = opts.skip;
    options.batch_size = opts.batch_size;
    options.max_time = opts.max_time;
    options.comment = opts.comment;
    options.hint = opts.hint.map(driver_hint);
    options.no_cursor_timeout = opts.no_cursor_timeout;
    options.allow_partial_results = opts.allow_partial_results;
    options
}

fn count_options(opts: CountOptions) -> options::CountOptions {
    let mut options = options::CountOptions::default();
    options.limit = opts.limit;
    options.skip = opts.skip;
    options.max_time = opts.max_time;
    options.hint = opts.hint.map(driver_hint);
    options
}

/// `explain` command for a find request at `queryPlanner` verbosity.
fn explain_command(request: &FindRequest) -> Document {
    let mut find = doc! {
        "find": request.collection.as_str(),
        "filter": request.filter.clone(),
    };
    if let Some(projection) = &request.projection {
        find.insert("projection", projection.clone());
    }
    if let Some(sort) = &request.sort {
        find.insert("sort", sort.clone());
    }
    if let Some(limit) = request.options.limit {
        find.insert("limit", limit);
    }
    if let Some(skip) = request.options.skip {
        find.insert("skip", Bson::Int64(skip as i64));
    }
    if let Some(hint) = &request.options.hint {
        match hint {
            Hint::Keys(keys) => find.insert("hint", keys.clone()),
            Hint::Name(name) => find.insert("hint", name.clone()),
        };
    }
    if let Some(concern) = request.read_concern {
        find.insert("readConcern", doc! { "level": concern.as_str() });
    }

    doc! { "explain": find, "verbosity": "queryPlanner" }
}

impl QueryExecutor for MongoEngine {
    fn find(&self, request: FindRequest) -> BoxFuture<'_, QueryResult<Vec<Document>>> {
        Box::pin(async move {
            debug!(
                collection = %request.collection,
                filter = %request.filter,
                "Executing find"
            );

            let collection =
                self.collection(&request.collection, request.read_preference, request.read_concern);
            let options = find_options(request.projection, request.sort, request.options);

            let cursor = collection
                .find(request.filter, options)
                .await
                .map_err(MongoError::from)?;
            let documents: Vec<Document> = cursor.try_collect().await.map_err(MongoError::from)?;

            debug!(count = documents.len(), "Find returned documents");
            Ok(documents)
        })
    }

    fn count(&self, request: CountRequest) -> BoxFuture<'_, QueryResult<u64>> {
        Box::pin(async move {
            debug!(
                collection = %request.collection,
                filter = %request.filter,
                "Executing count"
            );

            let collection =
                self.collection(&request.collection, request.read_preference, request.read_concern);
            let count = collection
                .count_documents(request.filter, count_options(request.options))
                .await
                .map_err(MongoError::from)?;
            Ok(count)
        })
    }

    fn explain(&self, request: FindRequest) -> BoxFuture<'_, QueryResult<Document>> {
        Box::pin(async move {
            let command = explain_command(&request);
            debug!(command = %command, "Executing explain");

            let plan = self
                .client
                .database()
                .run_command(command, request.read_preference.map(selection_criteria))
                .await
                .map_err(MongoError::from)?;
            Ok(plan)
        })
    }
}
