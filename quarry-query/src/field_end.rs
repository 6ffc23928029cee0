//! Per-field continuation of the fluent builder.
//!
//! `query.field("age")` returns a [`FieldEnd`]; calling an operation on it
//! resolves the path, coerces the value and hands the resulting criteria to
//! a [`CriteriaSink`]. For a [`Query`](crate::Query) the sink appends to the
//! root container. For a [`ValidationContext`] it returns the detached
//! [`Criteria`] for use with `and`/`or`.
//!
//! ```rust,ignore
//! query.field("age").greater_than(21)?;
//! query.field("name").not().starts_with("A")?;
//!
//! let young = query.criteria("age").less_than(18)?;
//! let old = query.criteria("age").greater_than(65)?;
//! query.or([young, old]);
//! ```

use std::sync::Arc;

use bson::{Bson, Regex};
use quarry_mapping::{MappedClass, Mapper};
use tracing::{trace, warn};

use crate::criteria::{Criteria, FieldCriteria};
use crate::error::QueryResult;
use crate::filter::FilterValue;
use crate::operator::FilterOperator;
use crate::path;
use crate::types::{BsonType, Point, Shape};
use crate::value;

/// Everything needed to turn a path and a value into criteria.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Mapping registry.
    pub mapper: &'a Mapper,
    /// The queried class.
    pub class: &'a Arc<MappedClass>,
    /// Fail on unknown paths.
    pub validate_names: bool,
    /// Warn on operator/value mismatches.
    pub validate_types: bool,
}

impl<'a> ValidationContext<'a> {
    /// Resolve `field`, coerce `value` and build a leaf.
    pub fn field_criteria(
        &self,
        field: &str,
        operator: FilterOperator,
        value: FilterValue,
        not: bool,
    ) -> QueryResult<FieldCriteria> {
        let target = path::resolve(self.mapper, self.class, field, self.validate_names)?;
        let value = value::coerce(target.field(), operator, value)?;

        if self.validate_types {
            if let Err(mismatch) = operator.check_value(&value) {
                warn!(
                    class = %self.class.name,
                    field,
                    operator = %operator,
                    "{}",
                    mismatch
                );
            }
        }

        let (translated, _) = target.into_parts();
        trace!(field, path = %translated, operator = %operator, not, "Built criteria");
        Ok(FieldCriteria::new(field, translated, operator, value, not))
    }
}

/// Receives the criteria built by a [`FieldEnd`].
pub trait CriteriaSink {
    /// What an operation returns.
    type Output;

    /// The context paths and values are resolved in.
    fn context(&self) -> ValidationContext<'_>;

    /// Take the finished criteria.
    fn accept(self, criteria: Criteria) -> Self::Output;
}

impl<'a> CriteriaSink for ValidationContext<'a> {
    type Output = Criteria;

    fn context(&self) -> ValidationContext<'_> {
        *self
    }

    fn accept(self, criteria: Criteria) -> Criteria {
        criteria
    }
}

/// Operations on a single field.
#[must_use = "a field end does nothing until an operation is called"]
pub struct FieldEnd<S> {
    sink: S,
    field: String,
    not: bool,
}

impl<S: CriteriaSink> FieldEnd<S> {
    /// Start a field end for `field`.
    pub fn new(sink: S, field: impl Into<String>) -> Self {
        Self {
            sink,
            field: field.into(),
            not: false,
        }
    }

    /// The path as written.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Negate the next operation.
    pub fn not(mut self) -> Self {
        self.not = !self.not;
        self
    }

    fn add(self, operator: FilterOperator, value: impl Into<FilterValue>) -> QueryResult<S::Output> {
        let criteria =
            self.sink
                .context()
                .field_criteria(&self.field, operator, value.into(), self.not)?;
        Ok(self.sink.accept(criteria.into()))
    }

    /// `field == value`
    pub fn equal(self, value: impl Into<FilterValue>) -> QueryResult<S::Output> {
        self.add(FilterOperator::Equal, value)
    }

    /// `$ne`
    pub fn not_equal(self, value: impl Into<FilterValue>) -> QueryResult<S::Output> {
        self.add(FilterOperator::NotEqual, value)
    }

    /// `$gt`
    pub fn greater_than(self, value: impl Into<FilterValue>) -> QueryResult<S::Output> {
        self.add(FilterOperator::GreaterThan, value)
    }

    /// `$gte`
    pub fn greater_than_or_eq(self, value: impl Into<FilterValue>) -> QueryResult<S::Output> {
        self.add(FilterOperator::GreaterThanOrEqual, value)
    }

    /// `$lt`
    pub fn less_than(self, value: impl Into<FilterValue>) -> QueryResult<S::Output> {
        self.add(FilterOperator::LessThan, value)
    }

    /// `$lte`
    pub fn less_than_or_eq(self, value: impl Into<FilterValue>) -> QueryResult<S::Output> {
        self.add(FilterOperator::LessThanOrEqual, value)
    }

    /// `{"$exists": true}`
    pub fn exists(self) -> QueryResult<S::Output> {
        self.add(FilterOperator::Exists, true)
    }

    /// `{"$exists": false}`
    pub fn does_not_exist(self) -> QueryResult<S::Output> {
        self.add(FilterOperator::Exists, false)
    }

    /// `$in`; a single value is wrapped into a list.
    pub fn r#in(self, values: impl Into<FilterValue>) -> QueryResult<S::Output> {
        self.add(FilterOperator::In, values)
    }

    /// Alias of [`FieldEnd::r#in`].
    pub fn has_any_of(self, values: impl Into<FilterValue>) -> QueryResult<S::Output> {
        self.r#in(values)
    }

    /// `$nin`; a single value is wrapped into a list.
    pub fn not_in(self, values: impl Into<FilterValue>) -> QueryResult<S::Output> {
        self.add(FilterOperator::NotIn, values)
    }

    /// Alias of [`FieldEnd::not_in`].
    pub fn has_none_of(self, values: impl Into<FilterValue>) -> QueryResult<S::Output> {
        self.not_in(values)
    }

    /// `$all`
    pub fn has_all_of(self, values: impl Into<FilterValue>) -> QueryResult<S::Output> {
        self.add(FilterOperator::All, values)
    }

    /// Array field contains `value`.
    pub fn has_this_one(self, value: impl Into<FilterValue>) -> QueryResult<S::Output> {
        self.add(FilterOperator::Equal, value)
    }

    /// `$elemMatch` against an embedded document.
    pub fn has_this_element(self, value: impl Into<FilterValue>) -> QueryResult<S::Output> {
        self.add(FilterOperator::ElementMatch, value)
    }

    /// `$size`
    pub fn size_eq(self, size: i32) -> QueryResult<S::Output> {
        self.add(FilterOperator::Size, size)
    }

    /// `{"$mod": [divisor, remainder]}`
    pub fn modulo(self, divisor: i64, remainder: i64) -> QueryResult<S::Output> {
        self.add(
            FilterOperator::Mod,
            Bson::Array(vec![Bson::Int64(divisor), Bson::Int64(remainder)]),
        )
    }

    /// `$type` with the numeric type code.
    pub fn type_of(self, bson_type: BsonType) -> QueryResult<S::Output> {
        self.add(FilterOperator::Type, bson_type.code())
    }

    /// Substring match.
    pub fn contains(self, text: &str) -> QueryResult<S::Output> {
        self.regex(regex_lite::escape(text), false)
    }

    /// Case insensitive substring match.
    pub fn contains_ignore_case(self, text: &str) -> QueryResult<S::Output> {
        self.regex(regex_lite::escape(text), true)
    }

    /// Prefix match.
    pub fn starts_with(self, prefix: &str) -> QueryResult<S::Output> {
        self.regex(format!("^{}", regex_lite::escape(prefix)), false)
    }

    /// Case insensitive prefix match.
    pub fn starts_with_ignore_case(self, prefix: &str) -> QueryResult<S::Output> {
        self.regex(format!("^{}", regex_lite::escape(prefix)), true)
    }

    /// Suffix match.
    pub fn ends_with(self, suffix: &str) -> QueryResult<S::Output> {
        self.regex(format!("{}$", regex_lite::escape(suffix)), false)
    }

    /// Case insensitive suffix match.
    pub fn ends_with_ignore_case(self, suffix: &str) -> QueryResult<S::Output> {
        self.regex(format!("{}$", regex_lite::escape(suffix)), true)
    }

    /// Whole value match ignoring case.
    pub fn equal_ignore_case(self, text: &str) -> QueryResult<S::Output> {
        self.regex(format!("^{}$", regex_lite::escape(text)), true)
    }

    fn regex(self, pattern: String, ignore_case: bool) -> QueryResult<S::Output> {
        let regex = Regex {
            pattern,
            options: if ignore_case { "i" } else { "" }.to_string(),
        };
        self.add(FilterOperator::Equal, Bson::RegularExpression(regex))
    }

    /// `$near` a legacy coordinate pair.
    pub fn near(self, x: f64, y: f64) -> QueryResult<S::Output> {
        self.add(FilterOperator::Near, Bson::from(Point::new(x, y)))
    }

    /// `$nearSphere` a legacy coordinate pair.
    pub fn near_sphere(self, x: f64, y: f64) -> QueryResult<S::Output> {
        self.add(FilterOperator::NearSphere, Bson::from(Point::new(x, y)))
    }

    /// `$geoWithin` a shape.
    pub fn within(self, shape: Shape) -> QueryResult<S::Output> {
        self.add(FilterOperator::GeoWithin, shape.to_document())
    }
}
