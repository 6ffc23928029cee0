//! Integration tests for query construction and execution.
//!
//! These tests drive the public API end to end:
//! - Entity registration and path translation
//! - Codec based value coercion
//! - Fluent field ends and AND/OR groups
//! - Datastore lookups through an in-memory executor

use std::sync::Arc;

use bson::{Bson, Document, Regex, doc};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use quarry::mapping::{CodecError, Entity, FnCodec, MappedClass, MappedField, Mapper};
use quarry::query::{
    BoxFuture, CountRequest, Datastore, DatastoreOptions, ErrorCode, FilterValue, FindRequest,
    Query, QueryExecutor, QueryResult, ReadPreference, Sort,
};
use serde::{Deserialize, Serialize};

/// Answers every find with the stored documents and records the requests.
#[derive(Clone, Default)]
struct MemoryExecutor {
    documents: Arc<Mutex<Vec<Document>>>,
    finds: Arc<Mutex<Vec<FindRequest>>>,
    counts: Arc<Mutex<Vec<CountRequest>>>,
}

impl MemoryExecutor {
    fn with_documents(documents: Vec<Document>) -> Self {
        let executor = Self::default();
        *executor.documents.lock() = documents;
        executor
    }

    fn last_find(&self) -> FindRequest {
        self.finds.lock().last().cloned().expect("no find recorded")
    }
}

impl QueryExecutor for MemoryExecutor {
    fn find(&self, request: FindRequest) -> BoxFuture<'_, QueryResult<Vec<Document>>> {
        Box::pin(async move {
            let limit = request.options.limit;
            self.finds.lock().push(request);
            let documents = self.documents.lock().clone();
            Ok(match limit {
                Some(limit) if limit > 0 => documents.into_iter().take(limit as usize).collect(),
                _ => documents,
            })
        })
    }

    fn count(&self, request: CountRequest) -> BoxFuture<'_, QueryResult<u64>> {
        Box::pin(async move {
            self.counts.lock().push(request);
            Ok(self.documents.lock().len() as u64)
        })
    }

    fn explain(&self, request: FindRequest) -> BoxFuture<'_, QueryResult<Document>> {
        Box::pin(async move { Ok(doc! { "queryPlanner": { "parsedQuery": request.filter } }) })
    }
}

#[derive(Debug, Clone, Serialize)]
struct Money {
    cents: i64,
}

#[derive(Debug, PartialEq, Deserialize)]
struct Person {
    #[serde(rename = "_id")]
    id: i32,
    name: String,
}

impl Entity for Person {
    fn mapped_class() -> MappedClass {
        MappedClass::new("Person")
            .collection("people")
            .field(MappedField::new("id").id())
            .field(MappedField::new("name").stored_as("n"))
            .field(MappedField::new("age"))
            .field(MappedField::new("tags").collection())
            .field(
                MappedField::new("addresses")
                    .stored_as("addrs")
                    .collection()
                    .embedded("Address"),
            )
            .field(MappedField::new("attributes").map())
    }
}

#[derive(Debug, PartialEq, Deserialize)]
struct Employee {
    #[serde(rename = "_id")]
    id: i32,
}

impl Entity for Employee {
    fn mapped_class() -> MappedClass {
        MappedClass::new("Employee")
            .collection("people")
            .parent("Person")
            .discriminator("Employee")
            .field(MappedField::new("salary").codec(FnCodec::<Money, _>::new(
                |money: &Money| -> Result<Bson, CodecError> { Ok(Bson::Int64(money.cents)) },
            )))
    }
}

fn mapper() -> Arc<Mapper> {
    let mapper = Mapper::new();
    mapper
        .add_class(
            MappedClass::new("Address")
                .field(MappedField::new("city").stored_as("c"))
                .field(MappedField::new("zip")),
        )
        .unwrap();
    mapper.map::<Person>().unwrap();
    mapper.map::<Employee>().unwrap();
    mapper.validate().unwrap();
    Arc::new(mapper)
}

fn datastore(executor: MemoryExecutor) -> Datastore<MemoryExecutor> {
    Datastore::new(mapper(), executor)
}

fn people() -> Query<Person, MemoryExecutor> {
    datastore(MemoryExecutor::default()).find::<Person>().unwrap()
}

// ============================================================================
// Path translation
// ============================================================================

#[test]
fn test_filter_uses_stored_keys() {
    let mut query = people();
    query
        .filter("name", "Ann")
        .unwrap()
        .filter("addresses.city", "Oslo")
        .unwrap();

    assert_eq!(
        query.get_query_document(),
        doc! { "n": "Ann", "addrs.c": "Oslo" }
    );
}

#[test]
fn test_positional_segments_pass_through() {
    let mut query = people();
    query
        .filter("addresses.0.city", "Oslo")
        .unwrap()
        .filter("addresses.$.zip", "0150")
        .unwrap();

    assert_eq!(
        query.get_query_document(),
        doc! { "addrs.0.c": "Oslo", "addrs.$.zip": "0150" }
    );
}

#[test]
fn test_map_fields_are_opaque() {
    let mut query = people();
    query.filter("attributes.eyeColor", "green").unwrap();
    assert_eq!(
        query.get_query_document(),
        doc! { "attributes.eyeColor": "green" }
    );
}

#[test]
fn test_inherited_fields_resolve_on_subclass() {
    let ds = datastore(MemoryExecutor::default());
    let mut query = ds.find::<Employee>().unwrap();
    query.filter("name", "Ann").unwrap().filter("age >", 30).unwrap();

    assert_eq!(
        query.get_query_document(),
        doc! { "n": "Ann", "age": { "$gt": 30 } }
    );
}

#[test]
fn test_unknown_field_fails_with_context() {
    let mut query = people();
    let err = query.filter("nickname", "Al").unwrap_err();
    assert_eq!(err.code, ErrorCode::PathResolution);
    assert!(err.to_string().contains("nickname"));
}

#[test]
fn test_disabled_validation_keeps_path() {
    let mut query = people();
    query.disable_validation();
    query.filter("nickname", "Al").unwrap();
    assert_eq!(query.get_query_document(), doc! { "nickname": "Al" });
}

// ============================================================================
// Value coercion
// ============================================================================

#[test]
fn test_codec_encodes_matching_values() {
    let ds = datastore(MemoryExecutor::default());
    let mut query = ds.find::<Employee>().unwrap();
    query
        .filter("salary >=", FilterValue::object(Money { cents: 5_000 }))
        .unwrap();

    assert_eq!(
        query.get_query_document(),
        doc! { "salary": { "$gte": 5_000_i64 } }
    );
}

#[test]
fn test_codec_encodes_list_elements() {
    let ds = datastore(MemoryExecutor::default());
    let mut query = ds.find::<Employee>().unwrap();
    query
        .field("salary")
        .r#in(FilterValue::List(vec![
            FilterValue::object(Money { cents: 100 }),
            FilterValue::object(Money { cents: 200 }),
        ]))
        .unwrap();

    assert_eq!(
        query.get_query_document(),
        doc! { "salary": { "$in": [100_i64, 200_i64] } }
    );
}

#[test]
fn test_values_without_codec_use_serde() {
    let mut query = people();
    query.disable_validation();
    query
        .filter("wallet", FilterValue::object(Money { cents: 7 }))
        .unwrap();

    assert_eq!(
        query.get_query_document(),
        doc! { "wallet": { "cents": 7_i64 } }
    );
}

#[test]
fn test_in_wraps_scalars_and_nulls() {
    let mut query = people();
    query.filter("tags in", "rust").unwrap();
    assert_eq!(query.get_query_document(), doc! { "tags": { "$in": ["rust"] } });

    let mut query = people();
    query.filter("tags nin", Option::<&str>::None).unwrap();
    assert_eq!(query.get_query_document(), doc! { "tags": { "$nin": [] } });
}

// ============================================================================
// Criteria
// ============================================================================

#[test]
fn test_field_end_operations_compose() {
    let mut query = people();
    query
        .field("name")
        .starts_with("An")
        .unwrap()
        .field("tags")
        .size_eq(2)
        .unwrap()
        .field("age")
        .not()
        .less_than(18)
        .unwrap();

    assert_eq!(
        query.get_query_document(),
        doc! {
            "n": Regex { pattern: "^An".into(), options: String::new() },
            "tags": { "$size": 2 },
            "age": { "$not": { "$lt": 18 } },
        }
    );
}

#[test]
fn test_regex_input_is_escaped() {
    let mut query = people();
    query.field("name").contains_ignore_case("a.b").unwrap();
    assert_eq!(
        query.get_query_document(),
        doc! { "n": Regex { pattern: "a\\.b".into(), options: "i".into() } }
    );
}

#[test]
fn test_nested_or_inside_and() {
    let mut query = people();
    let young = query.criteria("age").less_than(18).unwrap();
    let named = query.criteria("name").equal("Ann").unwrap();
    query.or([young, named]);
    query.filter("tags", "admin").unwrap();

    assert_eq!(
        query.get_query_document(),
        doc! {
            "$or": [ { "age": { "$lt": 18 } }, { "n": "Ann" } ],
            "tags": "admin",
        }
    );
}

#[test]
fn test_same_field_range_merges() {
    let mut query = people();
    query
        .filter("age >=", 18)
        .unwrap()
        .filter("age <", 65)
        .unwrap();
    assert_eq!(
        query.get_query_document(),
        doc! { "age": { "$gte": 18, "$lt": 65 } }
    );
}

#[test]
fn test_filter_errors() {
    let mut query = people();

    let err = query.filter("age a b c d e f", 1).unwrap_err();
    assert_eq!(err.code, ErrorCode::MalformedFilter);

    let err = query.filter("age ~=", 1).unwrap_err();
    assert_eq!(err.code, ErrorCode::UnsupportedOperator);

    assert!(query.get_query_document().is_empty());
}

// ============================================================================
// Projection and sort
// ============================================================================

#[test]
fn test_projection_and_sort_use_stored_keys() {
    let mut query = people();
    query
        .project("name", true)
        .unwrap()
        .order_by("-age, addresses.city")
        .unwrap()
        .order([Sort::natural_ascending()])
        .unwrap();

    assert_eq!(query.get_fields(), Some(doc! { "n": 1 }));
    assert_eq!(
        query.get_sort_document(),
        Some(doc! { "age": -1, "addrs.c": 1, "$natural": 1 })
    );
}

// ============================================================================
// Execution
// ============================================================================

#[tokio::test]
async fn test_find_sends_compiled_request() {
    let executor = MemoryExecutor::with_documents(vec![doc! { "_id": 1, "name": "Ann" }]);
    let ds = datastore(executor.clone());

    let mut query = ds.find::<Person>().unwrap();
    query
        .filter("age >", 21)
        .unwrap()
        .project("name", true)
        .unwrap()
        .set_read_preference(ReadPreference::SecondaryPreferred);

    let found = query.find().await.unwrap();
    assert_eq!(found, vec![Person { id: 1, name: "Ann".into() }]);

    let request = executor.last_find();
    assert_eq!(request.collection.as_str(), "people");
    assert_eq!(request.filter, doc! { "age": { "$gt": 21 } });
    assert_eq!(request.projection, Some(doc! { "n": 1 }));
    assert_eq!(request.read_preference, Some(ReadPreference::SecondaryPreferred));
}

#[tokio::test]
async fn test_datastore_lookups_by_id() {
    let executor = MemoryExecutor::with_documents(vec![
        doc! { "_id": 1, "name": "Ann" },
        doc! { "_id": 2, "name": "Bob" },
    ]);
    let ds = datastore(executor.clone());

    let all: Vec<Person> = ds.get::<Person>(vec![1, 2]).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(executor.last_find().filter, doc! { "_id": { "$in": [1, 2] } });

    let one: Option<Person> = ds.get_by_id::<Person>(1).await.unwrap();
    assert_eq!(one, Some(Person { id: 1, name: "Ann".into() }));
    let request = executor.last_find();
    assert_eq!(request.filter, doc! { "_id": 1 });
    assert_eq!(request.options.limit, Some(1));

    assert!(ds.exists::<Person>(1).await.unwrap());
    assert_eq!(ds.get_count::<Person>().await.unwrap(), 2);
    assert_eq!(executor.counts.lock().len(), 2);
}

#[tokio::test]
async fn test_explain_returns_plan() {
    let mut query = people();
    query.filter("name", "Ann").unwrap();
    let plan = query.explain().await.unwrap();
    assert_eq!(plan, doc! { "queryPlanner": { "parsedQuery": { "n": "Ann" } } });
}

#[tokio::test]
async fn test_datastore_options_apply_to_queries() {
    let executor = MemoryExecutor::default();
    let options = DatastoreOptions {
        validate: false,
        batch_size: Some(250),
        log_queries: true,
    };
    let ds = Datastore::with_options(mapper(), executor.clone(), options);

    let mut query = ds.find::<Person>().unwrap();
    assert!(!query.is_validating_names());
    query.filter("nickname", "Al").unwrap();
    query.find().await.unwrap();

    let request = executor.last_find();
    assert_eq!(request.filter, doc! { "nickname": "Al" });
    assert_eq!(request.options.batch_size, Some(250));
}
