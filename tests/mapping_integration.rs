//! Integration tests for mapping metadata.
//!
//! Covers class registration, inheritance lookups and codec selection as
//! seen by queries.

use std::sync::Arc;

use bson::doc;
use pretty_assertions::assert_eq;
use quarry::mapping::{
    Entity, FieldKind, ID_KEY, MappedClass, MappedField, Mapper, MappingError, SerdeCodec,
};
use quarry::query::{ErrorCode, FilterValue, Query};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
struct Coordinates {
    lat: f64,
    lng: f64,
}

struct Venue;

impl Entity for Venue {
    fn mapped_class() -> MappedClass {
        MappedClass::new("Venue")
            .collection("venues")
            .field(MappedField::new("id").id())
            .field(MappedField::new("title").stored_as("t"))
            .field(
                MappedField::new("location")
                    .stored_as("loc")
                    .codec(SerdeCodec::<Coordinates>::new()),
            )
    }
}

struct Stadium;

impl Entity for Stadium {
    fn mapped_class() -> MappedClass {
        MappedClass::new("Stadium")
            .collection("venues")
            .parent("Venue")
            .discriminator("stadium")
            .field(MappedField::new("capacity").stored_as("cap"))
    }
}

fn mapper() -> Arc<Mapper> {
    let mapper = Mapper::new();
    mapper.map::<Venue>().unwrap();
    mapper.map::<Stadium>().unwrap();
    Arc::new(mapper)
}

#[test]
fn test_entities_register_once() {
    let mapper = mapper();
    assert!(mapper.is_mapped::<Venue>());
    assert_eq!(mapper.classes().len(), 2);

    let err = mapper.map::<Venue>().unwrap_err();
    assert!(matches!(err, MappingError::Duplicate { .. }));
}

#[test]
fn test_unmapped_entity_lookup() {
    let mapper = Mapper::new();
    let err = mapper.mapped_class::<Venue>().unwrap_err();
    assert!(err.is_not_mapped());
}

#[test]
fn test_id_field_uses_id_key() {
    let mapper = mapper();
    let class = mapper.mapped_class::<Venue>().unwrap();
    assert_eq!(class.id_field().unwrap().db_key(), ID_KEY);
}

#[test]
fn test_inherited_lookup_reports_declaring_class() {
    let mapper = mapper();
    let stadium = mapper.mapped_class::<Stadium>().unwrap();

    let (declaring, field) = mapper.field(&stadium, "title").unwrap();
    assert_eq!(declaring.name(), "Venue");
    assert_eq!(field.db_key(), "t");
    assert_eq!(field.kind, FieldKind::Value);

    let keys: Vec<String> = mapper
        .persistence_fields(&stadium)
        .iter()
        .map(|f| f.db_key().to_string())
        .collect();
    assert_eq!(keys, vec!["_id", "t", "loc", "cap"]);
}

#[test]
fn test_dangling_references_fail_validation() {
    let mapper = Mapper::new();
    mapper
        .add_class(
            MappedClass::new("Order")
                .parent("Document")
                .field(MappedField::new("lines").collection().embedded("OrderLine")),
        )
        .unwrap();

    let err = mapper.validate().unwrap_err();
    assert!(matches!(err, MappingError::ValidationFailed { count: 2, .. }));
}

#[test]
fn test_invalid_stored_keys_rejected() {
    let mapper = Mapper::new();
    let err = mapper
        .add_class(MappedClass::new("Bad").field(MappedField::new("price").stored_as("p.x")))
        .unwrap_err();
    assert!(matches!(err, MappingError::InvalidField { .. }));
}

#[test]
fn test_codec_applies_only_to_its_type() {
    let mapper = mapper();
    let class = mapper.mapped_class::<Venue>().unwrap();

    let mut query: Query<(), ()> = Query::new(Arc::clone(&mapper), Arc::clone(&class), "venues", ());
    query
        .filter(
            "location",
            FilterValue::object(Coordinates { lat: 59.9, lng: 10.7 }),
        )
        .unwrap();
    assert_eq!(
        query.get_query_document(),
        doc! { "loc": { "lat": 59.9, "lng": 10.7 } }
    );

    // A native document skips the codec and is stored as given
    let mut query: Query<(), ()> = Query::new(mapper, class, "venues", ());
    query.filter("location", doc! { "type": "Point" }).unwrap();
    assert_eq!(
        query.get_query_document(),
        doc! { "loc": { "type": "Point" } }
    );
}

#[test]
fn test_subclass_query_rejects_sibling_fields() {
    let mapper = mapper();
    let venue = mapper.mapped_class::<Venue>().unwrap();

    let mut query: Query<(), ()> = Query::new(mapper, venue, "venues", ());
    let err = query.filter("capacity >", 10_000).unwrap_err();
    assert_eq!(err.code, ErrorCode::PathResolution);
}
