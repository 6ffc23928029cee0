//! Entry point for building queries.

use std::sync::Arc;

use bson::Bson;
use quarry_mapping::{Entity, ID_KEY, Mapper, QuarryConfig};
use serde::de::DeserializeOwned;
use smol_str::SmolStr;
use tracing::debug;

use crate::error::QueryResult;
use crate::filter::FilterValue;
use crate::query::Query;
use crate::traits::QueryExecutor;

/// Query settings applied to every query a [`Datastore`] creates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatastoreOptions {
    /// Validate paths and values.
    pub validate: bool,
    /// Default cursor batch size.
    pub batch_size: Option<u32>,
    /// Log each query before it runs.
    pub log_queries: bool,
}

impl Default for DatastoreOptions {
    fn default() -> Self {
        Self {
            validate: true,
            batch_size: None,
            log_queries: false,
        }
    }
}

impl From<&QuarryConfig> for DatastoreOptions {
    fn from(config: &QuarryConfig) -> Self {
        Self {
            validate: config.query.validate,
            batch_size: config.query.batch_size,
            log_queries: config.debug.log_queries,
        }
    }
}

/// Creates queries bound to mapped entity types.
#[derive(Debug, Clone)]
pub struct Datastore<E> {
    mapper: Arc<Mapper>,
    executor: E,
    options: DatastoreOptions,
}

impl<E: QueryExecutor> Datastore<E> {
    /// Create a datastore with default options.
    pub fn new(mapper: Arc<Mapper>, executor: E) -> Self {
        Self::with_options(mapper, executor, DatastoreOptions::default())
    }

    /// Create a datastore with options.
    pub fn with_options(mapper: Arc<Mapper>, executor: E, options: DatastoreOptions) -> Self {
        Self {
            mapper,
            executor,
            options,
        }
    }

    /// The mapping registry.
    pub fn mapper(&self) -> &Arc<Mapper> {
        &self.mapper
    }

    /// The executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// The options.
    pub fn options(&self) -> &DatastoreOptions {
        &self.options
    }

    /// A query over `T`'s collection.
    pub fn find<T: Entity>(&self) -> QueryResult<Query<T, E>> {
        let class = self.mapper.mapped_class::<T>()?;
        let collection = class.collection.clone();
        self.query_on(class, collection)
    }

    /// Alias of [`Datastore::find`].
    pub fn create_query<T: Entity>(&self) -> QueryResult<Query<T, E>> {
        self.find::<T>()
    }

    /// A query over `T` stored in another collection.
    pub fn find_in<T: Entity>(&self, collection: impl Into<SmolStr>) -> QueryResult<Query<T, E>> {
        let class = self.mapper.mapped_class::<T>()?;
        self.query_on(class, collection.into())
    }

    fn query_on<T>(
        &self,
        class: Arc<quarry_mapping::MappedClass>,
        collection: SmolStr,
    ) -> QueryResult<Query<T, E>> {
        debug!(class = %class.name, collection = %collection, "Creating query");
        let mut query = Query::new(
            Arc::clone(&self.mapper),
            class,
            collection,
            self.executor.clone(),
        );
        if !self.options.validate {
            query.disable_validation();
        }
        query
            .set_batch_size(self.options.batch_size)
            .set_log_queries(self.options.log_queries);
        Ok(query)
    }

    /// Entities whose id is one of `ids`.
    pub async fn get<T>(&self, ids: impl Into<FilterValue>) -> QueryResult<Vec<T>>
    where
        T: Entity + DeserializeOwned,
    {
        let mut query = self.find::<T>()?;
        query.disable_validation().field(ID_KEY).r#in(ids)?;
        query.find().await
    }

    /// The entity with id `id`.
    pub async fn get_by_id<T>(&self, id: impl Into<FilterValue>) -> QueryResult<Option<T>>
    where
        T: Entity + DeserializeOwned,
    {
        let mut query = self.find::<T>()?;
        query.disable_validation().field(ID_KEY).equal(id)?;
        query.first().await
    }

    /// Number of entities in `T`'s collection.
    pub async fn get_count<T: Entity>(&self) -> QueryResult<u64> {
        self.find::<T>()?.count().await
    }

    /// Whether an entity with id `id` exists.
    pub async fn exists<T: Entity>(&self, id: impl Into<Bson>) -> QueryResult<bool> {
        let mut query = self.find::<T>()?;
        query.disable_validation().field(ID_KEY).equal(id.into())?;
        Ok(query.count().await? > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::query::tests::RecordingExecutor;
    use bson::doc;
    use pretty_assertions::assert_eq;
    use quarry_mapping::{MappedClass, MappedField};
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Book {
        #[serde(rename = "_id")]
        id: i32,
        title: String,
    }

    impl Entity for Book {
        fn mapped_class() -> MappedClass {
            MappedClass::new("Book")
                .collection("books")
                .field(MappedField::new("id").id())
                .field(MappedField::new("title"))
        }
    }

    struct Unmapped;

    impl Entity for Unmapped {
        fn mapped_class() -> MappedClass {
            MappedClass::new("Unmapped")
        }
    }

    fn datastore(executor: RecordingExecutor) -> Datastore<RecordingExecutor> {
        let mapper = Mapper::new();
        mapper.map::<Book>().unwrap();
        Datastore::new(Arc::new(mapper), executor)
    }

    #[test]
    fn test_find_binds_collection() {
        let ds = datastore(RecordingExecutor::default());
        let query = ds.find::<Book>().unwrap();
        assert_eq!(query.collection(), "books");
        assert!(query.is_validating_names());

        let query = ds.find_in::<Book>("archive").unwrap();
        assert_eq!(query.collection(), "archive");
    }

    #[test]
    fn test_unmapped_type() {
        let ds = datastore(RecordingExecutor::default());
        let err = ds.find::<Unmapped>().unwrap_err();
        assert_eq!(err.code, ErrorCode::NotMapped);
    }

    #[test]
    fn test_options_from_config() {
        let config = QuarryConfig::from_str(
            r#"
            [query]
            validate = false
            batch_size = 100
            "#,
        )
        .unwrap();

        let mapper = Mapper::new();
        mapper.map::<Book>().unwrap();
        let ds = Datastore::with_options(
            Arc::new(mapper),
            RecordingExecutor::default(),
            DatastoreOptions::from(&config),
        );
        let query = ds.create_query::<Book>().unwrap();
        assert!(!query.is_validating_names());
        assert!(!query.is_validating_types());
    }

    #[tokio::test]
    async fn test_get_by_ids() {
        let executor = RecordingExecutor::with_documents(vec![
            doc! { "_id": 1, "title": "Dune" },
            doc! { "_id": 2, "title": "Emma" },
        ]);
        let ds = datastore(executor.clone());

        let books: Vec<Book> = ds.get(vec![1, 2]).await.unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(
            executor.finds.lock()[0].filter,
            doc! { "_id": { "$in": [1, 2] } }
        );
    }

    #[tokio::test]
    async fn test_get_by_id() {
        let executor = RecordingExecutor::with_documents(vec![doc! { "_id": 7, "title": "Ulysses" }]);
        let ds = datastore(executor.clone());

        let book: Option<Book> = ds.get_by_id(7).await.unwrap();
        assert_eq!(
            book,
            Some(Book {
                id: 7,
                title: "Ulysses".into()
            })
        );
        let finds = executor.finds.lock();
        assert_eq!(finds[0].filter, doc! { "_id": 7 });
        assert_eq!(finds[0].options.limit, Some(1));
    }

    #[tokio::test]
    async fn test_counts() {
        let executor = RecordingExecutor::with_documents(vec![doc! {}, doc! {}]);
        let ds = datastore(executor.clone());

        assert_eq!(ds.get_count::<Book>().await.unwrap(), 2);
        assert!(ds.exists::<Book>(1).await.unwrap());
        assert_eq!(executor.counts.lock()[0].collection, "books");
        assert_eq!(executor.counts.lock()[1].filter, doc! { "_id": 1 });
    }
}
