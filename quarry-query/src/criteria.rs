//! The filter expression tree.
//!
//! Leaves ([`FieldCriteria`]) hold one resolved path, operator and coerced
//! value. Containers join their children with `$and` or `$or`.
//!
//! AND containers merge child documents key by key. Two operator documents on
//! the same path merge when their operators differ, so
//! `age > 1` and `age < 10` become `{"age": {"$gt": 1, "$lt": 10}}`. Any
//! other collision switches the whole container to the `{"$and": [...]}`
//! form.

use std::fmt;

use bson::{Bson, Document};

use crate::operator::FilterOperator;

/// How a container joins its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CriteriaJoin {
    /// All children must match.
    And,
    /// At least one child must match.
    Or,
}

impl CriteriaJoin {
    fn keyword(&self) -> &'static str {
        match self {
            Self::And => "$and",
            Self::Or => "$or",
        }
    }
}

/// A node of the filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    /// A single field condition.
    Field(FieldCriteria),
    /// A group of conditions.
    Container(CriteriaContainer),
}

impl Criteria {
    /// Add this node's document to `target`.
    pub fn contribute_to(&self, target: &mut Document) {
        match self {
            Self::Field(field) => field.contribute_to(target),
            Self::Container(container) => container.contribute_to(target),
        }
    }

    /// The node's document on its own.
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        self.contribute_to(&mut document);
        document
    }
}

impl From<FieldCriteria> for Criteria {
    fn from(criteria: FieldCriteria) -> Self {
        Self::Field(criteria)
    }
}

impl From<CriteriaContainer> for Criteria {
    fn from(container: CriteriaContainer) -> Self {
        Self::Container(container)
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(field) => field.fmt(f),
            Self::Container(container) => container.fmt(f),
        }
    }
}

/// A condition on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCriteria {
    field: String,
    path: String,
    operator: FilterOperator,
    value: Bson,
    not: bool,
}

impl FieldCriteria {
    /// Create a condition. `path` is the translated path.
    pub fn new(
        field: impl Into<String>,
        path: impl Into<String>,
        operator: FilterOperator,
        value: Bson,
        not: bool,
    ) -> Self {
        Self {
            field: field.into(),
            path: path.into(),
            operator,
            value,
            not,
        }
    }

    /// The path as written by the caller.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The translated path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The operator.
    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    /// The coerced value.
    pub fn value(&self) -> &Bson {
        &self.value
    }

    /// Whether the condition is negated.
    pub fn is_not(&self) -> bool {
        self.not
    }

    /// The value stored under the path.
    fn condition(&self) -> Bson {
        let condition = match self.operator.token() {
            None => self.value.clone(),
            Some(token) => {
                let mut operator = Document::new();
                operator.insert(token, self.value.clone());
                Bson::Document(operator)
            }
        };

        if self.not {
            let mut not = Document::new();
            not.insert("$not", condition);
            Bson::Document(not)
        } else {
            condition
        }
    }

    /// Add `{path: condition}` to `target`.
    pub fn contribute_to(&self, target: &mut Document) {
        let mut document = Document::new();
        document.insert(self.path.clone(), self.condition());
        merge_or_and(target, document);
    }
}

impl fmt::Display for FieldCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.not {
            write!(f, "not ")?;
        }
        write!(f, "{} {} {}", self.field, self.operator, self.value)
    }
}

/// A group of conditions joined with AND or OR.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaContainer {
    join: CriteriaJoin,
    children: Vec<Criteria>,
}

impl CriteriaContainer {
    /// Create an empty container.
    pub fn new(join: CriteriaJoin) -> Self {
        Self {
            join,
            children: Vec::new(),
        }
    }

    /// Create an AND container.
    pub fn and(children: impl IntoIterator<Item = Criteria>) -> Self {
        Self {
            join: CriteriaJoin::And,
            children: children.into_iter().collect(),
        }
    }

    /// Create an OR container.
    pub fn or(children: impl IntoIterator<Item = Criteria>) -> Self {
        Self {
            join: CriteriaJoin::Or,
            children: children.into_iter().collect(),
        }
    }

    /// The join.
    pub fn join(&self) -> CriteriaJoin {
        self.join
    }

    /// Child nodes in insertion order.
    pub fn children(&self) -> &[Criteria] {
        &self.children
    }

    /// Append a child.
    pub fn add(&mut self, criteria: impl Into<Criteria>) {
        self.children.push(criteria.into());
    }

    /// Whether the container has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Add this container's document to `target`.
    ///
    /// Empty containers contribute nothing.
    pub fn contribute_to(&self, target: &mut Document) {
        let documents: Vec<Document> = self
            .children
            .iter()
            .map(Criteria::to_document)
            .filter(|document| !document.is_empty())
            .collect();

        if documents.is_empty() {
            return;
        }

        let produced = match self.join {
            CriteriaJoin::Or => wrap(CriteriaJoin::Or, documents),
            CriteriaJoin::And => {
                let mut merged = Document::new();
                let collided = documents
                    .iter()
                    .any(|document| !try_merge(&mut merged, document));
                if collided {
                    wrap(CriteriaJoin::And, documents)
                } else {
                    merged
                }
            }
        };

        merge_or_and(target, produced);
    }
}

impl fmt::Display for CriteriaContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = match self.join {
            CriteriaJoin::And => " and ",
            CriteriaJoin::Or => " or ",
        };
        write!(f, "(")?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                f.write_str(separator)?;
            }
            write!(f, "{child}")?;
        }
        write!(f, ")")
    }
}

fn wrap(join: CriteriaJoin, documents: Vec<Document>) -> Document {
    let mut document = Document::new();
    document.insert(
        join.keyword(),
        Bson::Array(documents.into_iter().map(Bson::Document).collect()),
    );
    document
}

/// Whether every key of a non-empty document is a query operator.
fn is_operator_document(value: &Bson) -> Option<&Document> {
    match value {
        Bson::Document(document)
            if !document.is_empty() && document.keys().all(|k| k.starts_with('$')) =>
        {
            Some(document)
        }
        _ => None,
    }
}

fn can_merge(target: &Document, document: &Document) -> bool {
    document.iter().all(|(key, value)| match target.get(key) {
        None => true,
        Some(existing) => match (is_operator_document(existing), is_operator_document(value)) {
            (Some(existing), Some(incoming)) => {
                incoming.keys().all(|k| !existing.contains_key(k))
            }
            _ => false,
        },
    })
}

/// Merge `document` into `target` if no key collides. Leaves `target`
/// untouched otherwise.
fn try_merge(target: &mut Document, document: &Document) -> bool {
    if !can_merge(target, document) {
        return false;
    }

    for (key, value) in document {
        if let (Some(Bson::Document(existing)), Bson::Document(incoming)) =
            (target.get_mut(key), value)
        {
            for (op, operand) in incoming {
                existing.insert(op.clone(), operand.clone());
            }
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
    true
}

/// Merge `document` into `target`, falling back to `$and` of both.
pub(crate) fn merge_or_and(target: &mut Document, document: Document) {
    if try_merge(target, &document) {
        return;
    }

    let existing = std::mem::take(target);
    *target = wrap(CriteriaJoin::And, vec![existing, document]);
}
