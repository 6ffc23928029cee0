//! The fluent query builder.
//!
//! A [`Query`] is bound to one mapped class and one collection. Criteria are
//! appended to a root AND container; filter, projection and sort documents
//! are compiled on demand and never cached.
//!
//! ```rust,ignore
//! let mut query = datastore.find::<Person>()?;
//! query
//!     .filter("age >", 21)?
//!     .filter("name", "Bob")?
//!     .order_by("-age")?
//!     .project("name", true)?;
//!
//! let people: Vec<Person> = query.find().await?;
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bson::{Bson, Document, doc};
use quarry_mapping::{ID_KEY, MappedClass, Mapper};
use serde::de::DeserializeOwned;
use smol_str::SmolStr;
use tracing::{debug, info};

use crate::criteria::{Criteria, CriteriaContainer, CriteriaJoin, FieldCriteria, merge_or_and};
use crate::error::{QueryError, QueryResult};
use crate::field_end::{CriteriaSink, FieldEnd, ValidationContext};
use crate::filter::FilterValue;
use crate::operator::FilterOperator;
use crate::path;
use crate::traits::{CountRequest, FindRequest, QueryExecutor};
use crate::types::{
    ArraySlice, CountOptions, FindOptions, Meta, ReadConcern, ReadPreference, Sort,
};

/// Most tokens a filter condition may have.
const MAX_CONDITION_TOKENS: usize = 6;

/// A query over one mapped class.
pub struct Query<T, E> {
    mapper: Arc<Mapper>,
    class: Arc<MappedClass>,
    collection: SmolStr,
    executor: E,
    root: CriteriaContainer,
    validate_names: bool,
    validate_types: bool,
    base_query: Option<Document>,
    projection: Document,
    include_fields: Option<bool>,
    sort: Document,
    read_concern: Option<ReadConcern>,
    read_preference: Option<ReadPreference>,
    batch_size: Option<u32>,
    log_queries: bool,
    _entity: PhantomData<fn() -> T>,
}

impl<T, E> Query<T, E> {
    /// Create a query on `collection` for `class`.
    pub fn new(
        mapper: Arc<Mapper>,
        class: Arc<MappedClass>,
        collection: impl Into<SmolStr>,
        executor: E,
    ) -> Self {
        Self {
            mapper,
            class,
            collection: collection.into(),
            executor,
            root: CriteriaContainer::new(CriteriaJoin::And),
            validate_names: true,
            validate_types: true,
            base_query: None,
            projection: Document::new(),
            include_fields: None,
            sort: Document::new(),
            read_concern: None,
            read_preference: None,
            batch_size: None,
            log_queries: false,
            _entity: PhantomData,
        }
    }

    /// The queried class.
    pub fn mapped_class(&self) -> &Arc<MappedClass> {
        &self.class
    }

    /// The collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Whether unknown paths are rejected.
    pub fn is_validating_names(&self) -> bool {
        self.validate_names
    }

    /// Whether operator/value mismatches are reported.
    pub fn is_validating_types(&self) -> bool {
        self.validate_types
    }

    /// Default cursor batch size for `find`.
    pub fn set_batch_size(&mut self, batch_size: Option<u32>) -> &mut Self {
        self.batch_size = batch_size;
        self
    }

    /// Log every compiled query at info level before it runs.
    pub fn set_log_queries(&mut self, enabled: bool) -> &mut Self {
        self.log_queries = enabled;
        self
    }

    fn validation_context(&self) -> ValidationContext<'_> {
        ValidationContext {
            mapper: &self.mapper,
            class: &self.class,
            validate_names: self.validate_names,
            validate_types: self.validate_types,
        }
    }

    // ==================== Criteria ====================

    /// Start a condition on `name` that is appended to this query.
    pub fn field(&mut self, name: &str) -> FieldEnd<&mut Self> {
        FieldEnd::new(self, name)
    }

    /// Start a detached condition for [`Query::and`] and [`Query::or`].
    pub fn criteria(&self, name: &str) -> FieldEnd<ValidationContext<'_>> {
        FieldEnd::new(self.validation_context(), name)
    }

    /// Append a condition of the form `"field"` or `"field op"`.
    ///
    /// Without an operator the condition is an equality test.
    pub fn filter(
        &mut self,
        condition: &str,
        value: impl Into<FilterValue>,
    ) -> QueryResult<&mut Self> {
        let parts: Vec<&str> = condition.split_whitespace().collect();
        if parts.is_empty() || parts.len() > MAX_CONDITION_TOKENS {
            return Err(QueryError::malformed_filter(condition));
        }

        let operator = match parts.len() {
            1 => FilterOperator::Equal,
            _ => FilterOperator::from_token(&parts[1..].join(" "))
                .map_err(|e| e.with_filter(condition))?,
        };

        let criteria = self
            .validation_context()
            .field_criteria(parts[0], operator, value.into(), false)
            .map_err(|e| e.with_filter(condition))?;
        self.root.add(criteria);
        Ok(self)
    }

    /// Append a group of conditions that must all match.
    pub fn and(&mut self, criteria: impl IntoIterator<Item = Criteria>) -> &mut Self {
        self.root.add(CriteriaContainer::and(criteria));
        self
    }

    /// Append a group of conditions of which one must match.
    pub fn or(&mut self, criteria: impl IntoIterator<Item = Criteria>) -> &mut Self {
        self.root.add(CriteriaContainer::or(criteria));
        self
    }

    /// Append prebuilt criteria.
    pub fn add(&mut self, criteria: impl Into<Criteria>) -> &mut Self {
        self.root.add(criteria);
        self
    }

    /// `$text` search.
    pub fn search(&mut self, text: &str) -> &mut Self {
        self.add_text_search(doc! { "$search": text })
    }

    /// `$text` search using the stemming rules of `language`.
    pub fn search_with_language(&mut self, text: &str, language: &str) -> &mut Self {
        self.add_text_search(doc! { "$search": text, "$language": language })
    }

    fn add_text_search(&mut self, search: Document) -> &mut Self {
        self.root.add(FieldCriteria::new(
            "$text",
            "$text",
            FilterOperator::Equal,
            Bson::Document(search),
            false,
        ));
        self
    }

    /// `$where` with a JavaScript expression.
    pub fn r#where(&mut self, js: impl Into<String>) -> &mut Self {
        self.root.add(FieldCriteria::new(
            "$where",
            "$where",
            FilterOperator::Equal,
            Bson::JavaScriptCode(js.into()),
            false,
        ));
        self
    }

    // ==================== Sorting ====================

    /// Append sort keys. Later calls add to earlier ones.
    pub fn order(&mut self, sorts: impl IntoIterator<Item = Sort>) -> QueryResult<&mut Self> {
        // resolve every key before touching the sort so a bad path leaves it intact
        let mut resolved = Document::new();
        for sort in sorts {
            let key = if sort.field == Sort::NATURAL {
                sort.field.to_string()
            } else {
                path::resolve(&self.mapper, &self.class, &sort.field, self.validate_names)?
                    .into_parts()
                    .0
            };
            resolved.insert(key, sort.order.as_i32());
        }
        for (key, order) in resolved {
            self.sort.insert(key, order);
        }
        Ok(self)
    }

    /// Append sort keys from a list such as `"name, -age"`.
    pub fn order_by(&mut self, spec: &str) -> QueryResult<&mut Self> {
        let sorts = Sort::parse_list(spec)?;
        self.order(sorts)
    }

    /// Sort on server metadata such as the text score.
    pub fn order_meta(&mut self, meta: Meta) -> &mut Self {
        for (key, value) in meta.to_document() {
            self.sort.insert(key, value);
        }
        self
    }

    // ==================== Projection ====================

    fn check_projection(&mut self, key: &str, include: bool) -> QueryResult<()> {
        match self.include_fields {
            Some(current) if current != include => {
                if !(current && key == ID_KEY) {
                    return Err(QueryError::projection_conflict(key));
                }
            }
            Some(_) => {}
            None => self.include_fields = Some(include),
        }
        Ok(())
    }

    /// Include or exclude a field.
    ///
    /// Inclusion and exclusion cannot be mixed, except that `_id` may be
    /// excluded from an inclusion projection.
    pub fn project(&mut self, field: &str, include: bool) -> QueryResult<&mut Self> {
        let (key, _) =
            path::resolve(&self.mapper, &self.class, field, self.validate_names)?.into_parts();
        self.check_projection(&key, include)?;
        self.projection.insert(key, if include { 1 } else { 0 });
        Ok(self)
    }

    /// Project part of an array field.
    pub fn project_slice(&mut self, field: &str, slice: ArraySlice) -> QueryResult<&mut Self> {
        let (key, _) =
            path::resolve(&self.mapper, &self.class, field, self.validate_names)?.into_parts();
        self.check_projection(&key, true)?;
        self.projection.insert(key, slice.to_document());
        Ok(self)
    }

    /// Project server metadata such as the text score.
    pub fn project_meta(&mut self, meta: Meta) -> QueryResult<&mut Self> {
        self.check_projection(meta.field(), true)?;
        for (key, value) in meta.to_document() {
            self.projection.insert(key, value);
        }
        Ok(self)
    }

    /// Include every persisted field of the class.
    pub fn retrieve_known_fields(&mut self) -> QueryResult<&mut Self> {
        for field in self.mapper.persistence_fields(&self.class) {
            self.check_projection(field.db_key(), true)?;
            self.projection.insert(field.db_key(), 1);
        }
        Ok(self)
    }

    // ==================== Settings ====================

    /// Reject unknown paths and report operator/value mismatches.
    pub fn enable_validation(&mut self) -> &mut Self {
        self.validate_names = true;
        self.validate_types = true;
        self
    }

    /// Pass unknown paths through as written and skip value checks.
    pub fn disable_validation(&mut self) -> &mut Self {
        self.validate_names = false;
        self.validate_types = false;
        self
    }

    /// Read concern for this query.
    pub fn set_read_concern(&mut self, concern: ReadConcern) -> &mut Self {
        self.read_concern = Some(concern);
        self
    }

    /// Read preference for this query.
    pub fn set_read_preference(&mut self, preference: ReadPreference) -> &mut Self {
        self.read_preference = Some(preference);
        self
    }

    /// A raw filter that the criteria are merged into.
    pub fn set_query_document(&mut self, document: Document) -> &mut Self {
        self.base_query = Some(document);
        self
    }

    // ==================== Compilation ====================

    /// The filter document.
    pub fn get_query_document(&self) -> Document {
        let mut document = self.base_query.clone().unwrap_or_default();
        let mut criteria = Document::new();
        self.root.contribute_to(&mut criteria);
        if !criteria.is_empty() {
            merge_or_and(&mut document, criteria);
        }
        document
    }

    /// The projection document, if any field was projected.
    ///
    /// Inclusion projections of classes with a discriminator also include
    /// the discriminator key.
    pub fn get_fields(&self) -> Option<Document> {
        if self.projection.is_empty() {
            return None;
        }

        let mut fields = self.projection.clone();
        if self.include_fields == Some(true) && self.class.uses_discriminator() {
            fields.insert(self.mapper.discriminator_key(), 1);
        }
        Some(fields)
    }

    /// The sort document, if any.
    pub fn get_sort_document(&self) -> Option<Document> {
        if self.sort.is_empty() {
            None
        } else {
            Some(self.sort.clone())
        }
    }

    /// An independent copy of this query.
    pub fn clone_query(&self) -> Self
    where
        E: Clone,
    {
        self.clone()
    }

    fn find_request(&self, mut options: FindOptions) -> FindRequest {
        if options.batch_size.is_none() {
            options.batch_size = self.batch_size;
        }
        FindRequest {
            collection: self.collection.clone(),
            filter: self.get_query_document(),
            projection: self.get_fields(),
            sort: self.get_sort_document(),
            read_preference: self.read_preference,
            read_concern: self.read_concern,
            options,
        }
    }

    fn count_request(&self, options: CountOptions) -> CountRequest {
        CountRequest {
            collection: self.collection.clone(),
            filter: self.get_query_document(),
            read_preference: self.read_preference,
            read_concern: self.read_concern,
            options,
        }
    }

    fn log_request(&self, operation: &str) {
        if self.log_queries {
            info!(collection = %self.collection, operation, query = %self, "Running query");
        }
    }
}

impl<T, E: QueryExecutor> Query<T, E> {
    // ==================== Execution ====================

    /// Run the query and return raw documents.
    pub async fn find_documents(&self, options: FindOptions) -> QueryResult<Vec<Document>> {
        let request = self.find_request(options);
        self.log_request("find");
        debug!(
            collection = %request.collection,
            filter = %request.filter,
            "Executing find"
        );
        self.executor.find(request).await
    }

    /// Count the matching documents.
    pub async fn count(&self) -> QueryResult<u64> {
        self.count_with(CountOptions::default()).await
    }

    /// Count the matching documents with options.
    pub async fn count_with(&self, options: CountOptions) -> QueryResult<u64> {
        let request = self.count_request(options);
        self.log_request("count");
        debug!(
            collection = %request.collection,
            filter = %request.filter,
            "Executing count"
        );
        self.executor.count(request).await
    }

    /// The server's query plan.
    pub async fn explain(&self) -> QueryResult<Document> {
        let request = self.find_request(FindOptions::default());
        self.log_request("explain");
        self.executor.explain(request).await
    }
}

impl<T: DeserializeOwned, E: QueryExecutor> Query<T, E> {
    /// Run the query.
    pub async fn find(&self) -> QueryResult<Vec<T>> {
        self.find_with(FindOptions::default()).await
    }

    /// Run the query with cursor options.
    pub async fn find_with(&self, options: FindOptions) -> QueryResult<Vec<T>> {
        self.find_documents(options)
            .await?
            .into_iter()
            .map(|document| bson::from_document(document).map_err(QueryError::from))
            .collect()
    }

    /// The first matching entity.
    pub async fn first(&self) -> QueryResult<Option<T>> {
        self.first_with(FindOptions::default()).await
    }

    /// The first matching entity with cursor options. The limit is forced to one.
    pub async fn first_with(&self, options: FindOptions) -> QueryResult<Option<T>> {
        Ok(self.find_with(options.limit(1)).await?.into_iter().next())
    }
}

impl<'q, T, E> CriteriaSink for &'q mut Query<T, E> {
    type Output = &'q mut Query<T, E>;

    fn context(&self) -> ValidationContext<'_> {
        self.validation_context()
    }

    fn accept(self, criteria: Criteria) -> Self::Output {
        self.root.add(criteria);
        self
    }
}

impl<T, E: Clone> Clone for Query<T, E> {
    fn clone(&self) -> Self {
        Self {
            mapper: Arc::clone(&self.mapper),
            class: Arc::clone(&self.class),
            collection: self.collection.clone(),
            executor: self.executor.clone(),
            root: self.root.clone(),
            validate_names: self.validate_names,
            validate_types: self.validate_types,
            base_query: self.base_query.clone(),
            projection: self.projection.clone(),
            include_fields: self.include_fields,
            sort: self.sort.clone(),
            read_concern: self.read_concern,
            read_preference: self.read_preference,
            batch_size: self.batch_size,
            log_queries: self.log_queries,
            _entity: PhantomData,
        }
    }
}

impl<T, E> fmt::Debug for Query<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("class", &self.class.name)
            .field("collection", &self.collection)
            .field("criteria", &self.root)
            .field("validate_names", &self.validate_names)
            .field("validate_types", &self.validate_types)
            .finish_non_exhaustive()
    }
}

impl<T, E> fmt::Display for Query<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ query: {}", self.get_query_document())?;
        if let Some(fields) = self.get_fields() {
            write!(f, ", projection: {fields}")?;
        }
        if let Some(sort) = self.get_sort_document() {
            write!(f, ", sort: {sort}")?;
        }
        write!(f, " }}")
    }
}
