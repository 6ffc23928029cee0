//! Common types used in query building.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bson::{Bson, Document, doc};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// Ascending order (A-Z, 0-9, oldest first).
    #[default]
    Asc,
    /// Descending order (Z-A, 9-0, newest first).
    Desc,
}

impl SortOrder {
    /// The value stored in a sort document.
    pub fn as_i32(&self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "ascending",
            Self::Desc => "descending",
        })
    }
}

/// Sort specification for a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// The field path to sort by.
    pub field: Cow<'static, str>,
    /// The sort order.
    pub order: SortOrder,
}

impl Sort {
    /// Document key for natural (insertion) order.
    pub const NATURAL: &'static str = "$natural";

    /// Create a new sort.
    pub fn new(field: impl Into<Cow<'static, str>>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }

    /// Sort ascending by a field.
    pub fn ascending(field: impl Into<Cow<'static, str>>) -> Self {
        Self::new(field, SortOrder::Asc)
    }

    /// Sort descending by a field.
    pub fn descending(field: impl Into<Cow<'static, str>>) -> Self {
        Self::new(field, SortOrder::Desc)
    }

    /// Natural order.
    pub const fn natural_ascending() -> Self {
        Self {
            field: Cow::Borrowed(Self::NATURAL),
            order: SortOrder::Asc,
        }
    }

    /// Reverse natural order.
    pub const fn natural_descending() -> Self {
        Self {
            field: Cow::Borrowed(Self::NATURAL),
            order: SortOrder::Desc,
        }
    }

    /// Parse a comma separated sort list such as `"name, -age"`.
    ///
    /// A leading `-` sorts descending.
    pub fn parse_list(spec: &str) -> Result<Vec<Self>, QueryError> {
        spec.split(',')
            .map(str::trim)
            .map(|part| {
                let (field, order) = match part.strip_prefix('-') {
                    Some(field) => (field.trim(), SortOrder::Desc),
                    None => (part, SortOrder::Asc),
                };
                if field.is_empty() {
                    return Err(QueryError::invalid_query(format!(
                        "empty field in sort specification '{spec}'"
                    ))
                    .with_field("order_by"));
                }
                Ok(Self::new(field.to_string(), order))
            })
            .collect()
    }
}

/// Projections and sorts on server computed metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Meta {
    field: String,
    kind: MetaKind,
}

/// Kinds of `$meta` data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKind {
    /// Relevance score of a `$text` search.
    TextScore,
}

impl MetaKind {
    fn as_str(&self) -> &'static str {
        match self {
            Self::TextScore => "textScore",
        }
    }
}

impl Meta {
    /// Default field name for the text score.
    pub const SCORE: &'static str = "score";

    /// Text score stored under `score`.
    pub fn text_score() -> Self {
        Self::text_score_as(Self::SCORE)
    }

    /// Text score stored under a custom field.
    pub fn text_score_as(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: MetaKind::TextScore,
        }
    }

    /// The field the metadata is exposed as.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// `{field: {"$meta": kind}}`
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert(self.field.clone(), doc! { "$meta": self.kind.as_str() });
        document
    }
}

/// A `$slice` projection of an array field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArraySlice {
    skip: Option<i32>,
    limit: i32,
}

impl ArraySlice {
    /// Return the first `limit` elements (the last ones when negative).
    pub fn limit(limit: i32) -> Self {
        Self { skip: None, limit }
    }

    /// Skip `skip` elements, then return `limit` elements.
    pub fn skip_limit(skip: i32, limit: i32) -> Self {
        Self {
            skip: Some(skip),
            limit,
        }
    }

    /// The projection value: `{"$slice": n}` or `{"$slice": [skip, limit]}`.
    pub fn to_document(&self) -> Document {
        match self.skip {
            Some(skip) => doc! { "$slice": [skip, self.limit] },
            None => doc! { "$slice": self.limit },
        }
    }
}

/// A legacy coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    /// X (longitude).
    pub x: f64,
    /// Y (latitude).
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<Point> for Bson {
    fn from(point: Point) -> Self {
        Bson::Array(vec![Bson::Double(point.x), Bson::Double(point.y)])
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

/// Shapes usable with `$geoWithin`.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// `$box` from bottom left to upper right.
    Box {
        /// Bottom left corner.
        bottom_left: Point,
        /// Upper right corner.
        upper_right: Point,
    },
    /// `$center` on a flat plane.
    Center {
        /// Center point.
        center: Point,
        /// Radius in coordinate units.
        radius: f64,
    },
    /// `$centerSphere` on a sphere.
    CenterSphere {
        /// Center point.
        center: Point,
        /// Radius in radians.
        radius: f64,
    },
    /// `$polygon` through the given points.
    Polygon(Vec<Point>),
    /// `$geometry` with a GeoJSON object.
    Geometry(Document),
}

impl Shape {
    /// Create a box.
    pub fn bbox(bottom_left: impl Into<Point>, upper_right: impl Into<Point>) -> Self {
        Self::Box {
            bottom_left: bottom_left.into(),
            upper_right: upper_right.into(),
        }
    }

    /// Create a flat circle.
    pub fn center(center: impl Into<Point>, radius: f64) -> Self {
        Self::Center {
            center: center.into(),
            radius,
        }
    }

    /// Create a spherical circle.
    pub fn center_sphere(center: impl Into<Point>, radius: f64) -> Self {
        Self::CenterSphere {
            center: center.into(),
            radius,
        }
    }

    /// Create a polygon.
    pub fn polygon(points: impl IntoIterator<Item = impl Into<Point>>) -> Self {
        Self::Polygon(points.into_iter().map(Into::into).collect())
    }

    /// The shape operator and its geometry.
    pub fn to_document(&self) -> Document {
        match self {
            Self::Box {
                bottom_left,
                upper_right,
            } => doc! { "$box": [Bson::from(*bottom_left), Bson::from(*upper_right)] },
            Self::Center { center, radius } => {
                doc! { "$center": [Bson::from(*center), *radius] }
            }
            Self::CenterSphere { center, radius } => {
                doc! { "$centerSphere": [Bson::from(*center), *radius] }
            }
            Self::Polygon(points) => doc! {
                "$polygon": points.iter().copied().map(Bson::from).collect::<Vec<_>>()
            },
            Self::Geometry(geometry) => doc! { "$geometry": geometry.clone() },
        }
    }
}

/// BSON types for `$type` checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BsonType {
    /// 64-bit float.
    Double,
    /// UTF-8 string.
    String,
    /// Embedded document.
    Object,
    /// Array.
    Array,
    /// Binary data.
    Binary,
    /// ObjectId.
    ObjectId,
    /// Boolean.
    Boolean,
    /// UTC datetime.
    Date,
    /// Null.
    Null,
    /// Regular expression.
    Regex,
    /// JavaScript code.
    JavaScript,
    /// JavaScript code with scope.
    JavaScriptWithScope,
    /// 32-bit integer.
    Int32,
    /// Timestamp.
    Timestamp,
    /// 64-bit integer.
    Int64,
    /// 128-bit decimal.
    Decimal128,
    /// Min key.
    MinKey,
    /// Max key.
    MaxKey,
}

impl BsonType {
    /// Numeric type code.
    pub fn code(&self) -> i32 {
        match self {
            Self::Double => 1,
            Self::String => 2,
            Self::Object => 3,
            Self::Array => 4,
            Self::Binary => 5,
            Self::ObjectId => 7,
            Self::Boolean => 8,
            Self::Date => 9,
            Self::Null => 10,
            Self::Regex => 11,
            Self::JavaScript => 13,
            Self::JavaScriptWithScope => 15,
            Self::Int32 => 16,
            Self::Timestamp => 17,
            Self::Int64 => 18,
            Self::Decimal128 => 19,
            Self::MinKey => -1,
            Self::MaxKey => 127,
        }
    }

    /// String alias accepted by `$type`.
    pub fn alias(&self) -> &'static str {
        match self {
            Self::Double => "double",
            Self::String => "string",
            Self::Object => "object",
            Self::Array => "array",
            Self::Binary => "binData",
            Self::ObjectId => "objectId",
            Self::Boolean => "bool",
            Self::Date => "date",
            Self::Null => "null",
            Self::Regex => "regex",
            Self::JavaScript => "javascript",
            Self::JavaScriptWithScope => "javascriptWithScope",
            Self::Int32 => "int",
            Self::Timestamp => "timestamp",
            Self::Int64 => "long",
            Self::Decimal128 => "decimal",
            Self::MinKey => "minKey",
            Self::MaxKey => "maxKey",
        }
    }
}

/// Read preference mode for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadPreference {
    /// Read from the primary only.
    Primary,
    /// Prefer the primary.
    PrimaryPreferred,
    /// Read from secondaries only.
    Secondary,
    /// Prefer secondaries.
    SecondaryPreferred,
    /// Lowest latency member.
    Nearest,
}

impl ReadPreference {
    /// Mode name as used in connection strings.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::PrimaryPreferred => "primaryPreferred",
            Self::Secondary => "secondary",
            Self::SecondaryPreferred => "secondaryPreferred",
            Self::Nearest => "nearest",
        }
    }
}

impl FromStr for ReadPreference {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "primary" => Ok(Self::Primary),
            "primarypreferred" => Ok(Self::PrimaryPreferred),
            "secondary" => Ok(Self::Secondary),
            "secondarypreferred" => Ok(Self::SecondaryPreferred),
            "nearest" => Ok(Self::Nearest),
            _ => Err(QueryError::configuration(format!(
                "unknown read preference '{s}'"
            ))),
        }
    }
}

impl fmt::Display for ReadPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read concern level for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadConcern {
    /// Return the node's most recent data.
    Local,
    /// Like local, without causal guarantees on sharded clusters.
    Available,
    /// Data acknowledged by a majority.
    Majority,
    /// Linearizable reads.
    Linearizable,
    /// Snapshot reads.
    Snapshot,
}

impl ReadConcern {
    /// Level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Available => "available",
            Self::Majority => "majority",
            Self::Linearizable => "linearizable",
            Self::Snapshot => "snapshot",
        }
    }
}

impl FromStr for ReadConcern {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "available" => Ok(Self::Available),
            "majority" => Ok(Self::Majority),
            "linearizable" => Ok(Self::Linearizable),
            "snapshot" => Ok(Self::Snapshot),
            _ => Err(QueryError::configuration(format!(
                "unknown read concern '{s}'"
            ))),
        }
    }
}

impl fmt::Display for ReadConcern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index hint.
#[derive(Debug, Clone, PartialEq)]
pub enum Hint {
    /// Index key pattern.
    Keys(Document),
    /// Index name.
    Name(String),
}

/// Cursor options for find operations.
///
/// Projection and sort are set on the query itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Maximum number of documents to return.
    pub limit: Option<i64>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
    /// Cursor batch size.
    pub batch_size: Option<u32>,
    /// Server side time limit.
    pub max_time: Option<Duration>,
    /// Comment attached to the query.
    pub comment: Option<String>,
    /// Index hint.
    pub hint: Option<Hint>,
    /// Keep idle cursors open.
    pub no_cursor_timeout: Option<bool>,
    /// Return partial results from a sharded cluster with unavailable shards.
    pub allow_partial_results: Option<bool>,
}

impl FindOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limit.
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the batch size.
    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Set the server side time limit.
    pub fn max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    /// Attach a comment.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Set an index hint.
    pub fn hint(mut self, hint: Hint) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Keep idle cursors open.
    pub fn no_cursor_timeout(mut self, value: bool) -> Self {
        self.no_cursor_timeout = Some(value);
        self
    }

    /// Allow partial results.
    pub fn allow_partial_results(mut self, value: bool) -> Self {
        self.allow_partial_results = Some(value);
        self
    }
}

/// Options for count operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountOptions {
    /// Maximum number of documents to count.
    pub limit: Option<u64>,
    /// Number of documents to skip.
    pub skip: Option<u64>,
    /// Server side time limit.
    pub max_time: Option<Duration>,
    /// Index hint.
    pub hint: Option<Hint>,
}

impl CountOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limit.
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the server side time limit.
    pub fn max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    /// Set an index hint.
    pub fn hint(mut self, hint: Hint) -> Self {
        self.hint = Some(hint);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_sort_list() {
        let sorts = Sort::parse_list("name, -age,  -created").unwrap();
        assert_eq!(
            sorts,
            vec![
                Sort::ascending("name"),
                Sort::descending("age"),
                Sort::descending("created"),
            ]
        );
    }

    #[test]
    fn test_parse_sort_list_rejects_empty_field() {
        assert!(Sort::parse_list("name, ,age").is_err());
        assert!(Sort::parse_list("-").is_err());
    }

    #[test]
    fn test_natural_sort() {
        assert_eq!(Sort::natural_descending().field, "$natural");
        assert_eq!(Sort::natural_descending().order.as_i32(), -1);
    }

    #[test]
    fn test_meta_document() {
        assert_eq!(
            Meta::text_score().to_document(),
            doc! { "score": { "$meta": "textScore" } }
        );
        assert_eq!(Meta::text_score_as("rank").field(), "rank");
    }

    #[test]
    fn test_array_slice_document() {
        assert_eq!(ArraySlice::limit(5).to_document(), doc! { "$slice": 5 });
        assert_eq!(
            ArraySlice::skip_limit(10, 5).to_document(),
            doc! { "$slice": [10, 5] }
        );
    }

    #[test]
    fn test_shape_documents() {
        assert_eq!(
            Shape::bbox((0.0, 0.0), (2.0, 3.0)).to_document(),
            doc! { "$box": [[0.0, 0.0], [2.0, 3.0]] }
        );
        assert_eq!(
            Shape::center((1.0, 1.0), 5.0).to_document(),
            doc! { "$center": [[1.0, 1.0], 5.0] }
        );
        assert_eq!(
            Shape::polygon([(0.0, 0.0), (3.0, 6.0), (6.0, 0.0)]).to_document(),
            doc! { "$polygon": [[0.0, 0.0], [3.0, 6.0], [6.0, 0.0]] }
        );
    }

    #[test]
    fn test_read_preference_parse() {
        assert_eq!(
            "secondaryPreferred".parse::<ReadPreference>().unwrap(),
            ReadPreference::SecondaryPreferred
        );
        assert!("fastest".parse::<ReadPreference>().is_err());
        assert_eq!("MAJORITY".parse::<ReadConcern>().unwrap(), ReadConcern::Majority);
    }

    #[test]
    fn test_bson_type_codes() {
        assert_eq!(BsonType::String.code(), 2);
        assert_eq!(BsonType::Int64.alias(), "long");
        assert_eq!(BsonType::MinKey.code(), -1);
    }

    #[test]
    fn test_find_options_builder() {
        let options = FindOptions::new().limit(10).skip(5).comment("report");
        assert_eq!(options.limit, Some(10));
        assert_eq!(options.skip, Some(5));
        assert_eq!(options.comment.as_deref(), Some("report"));
        assert!(options.hint.is_none());
    }
}
