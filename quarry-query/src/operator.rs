//! Filter operators and their textual aliases.

use std::fmt;
use std::str::FromStr;

use bson::Bson;

use crate::error::{QueryError, QueryResult};

/// Canonical filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    /// `field == value`
    Equal,
    /// `$ne`
    NotEqual,
    /// `$gt`
    GreaterThan,
    /// `$gte`
    GreaterThanOrEqual,
    /// `$lt`
    LessThan,
    /// `$lte`
    LessThanOrEqual,
    /// `$exists`
    Exists,
    /// `$type`
    Type,
    /// `$mod`
    Mod,
    /// `$size`
    Size,
    /// `$in`
    In,
    /// `$nin`
    NotIn,
    /// `$all`
    All,
    /// `$elemMatch`
    ElementMatch,
    /// `$near`
    Near,
    /// `$nearSphere`
    NearSphere,
    /// `$geoWithin`
    GeoWithin,
}

impl FilterOperator {
    /// Every operator, in declaration order.
    pub const ALL: [FilterOperator; 17] = [
        Self::Equal,
        Self::NotEqual,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::Exists,
        Self::Type,
        Self::Mod,
        Self::Size,
        Self::In,
        Self::NotIn,
        Self::All,
        Self::ElementMatch,
        Self::Near,
        Self::NearSphere,
        Self::GeoWithin,
    ];

    /// Resolve an operator from its textual form.
    pub fn from_token(token: &str) -> QueryResult<Self> {
        let token = token.trim();
        Self::ALL
            .into_iter()
            .find(|op| op.aliases().iter().any(|alias| *alias == token))
            .ok_or_else(|| QueryError::unsupported_operator(token))
    }

    /// Textual forms accepted in filter conditions.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Equal => &["=", "==", "eq"],
            Self::NotEqual => &["!=", "<>", "ne"],
            Self::GreaterThan => &[">", "gt"],
            Self::GreaterThanOrEqual => &[">=", "gte"],
            Self::LessThan => &["<", "lt"],
            Self::LessThanOrEqual => &["<=", "lte"],
            Self::Exists => &["exists"],
            Self::Type => &["type"],
            Self::Mod => &["mod"],
            Self::Size => &["size"],
            Self::In => &["in"],
            Self::NotIn => &["nin"],
            Self::All => &["all"],
            Self::ElementMatch => &["elem", "elemMatch"],
            Self::Near => &["near"],
            Self::NearSphere => &["nearSphere"],
            Self::GeoWithin => &["within", "geoWithin"],
        }
    }

    /// The query operator key. `Equal` has none.
    pub fn token(&self) -> Option<&'static str> {
        match self {
            Self::Equal => None,
            Self::NotEqual => Some("$ne"),
            Self::GreaterThan => Some("$gt"),
            Self::GreaterThanOrEqual => Some("$gte"),
            Self::LessThan => Some("$lt"),
            Self::LessThanOrEqual => Some("$lte"),
            Self::Exists => Some("$exists"),
            Self::Type => Some("$type"),
            Self::Mod => Some("$mod"),
            Self::Size => Some("$size"),
            Self::In => Some("$in"),
            Self::NotIn => Some("$nin"),
            Self::All => Some("$all"),
            Self::ElementMatch => Some("$elemMatch"),
            Self::Near => Some("$near"),
            Self::NearSphere => Some("$nearSphere"),
            Self::GeoWithin => Some("$geoWithin"),
        }
    }

    /// Whether scalar values are wrapped into a one element array.
    pub fn wraps_scalars(&self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Check that a coerced value fits the operator.
    ///
    /// Returns a description of the mismatch. Only operators with a fixed
    /// value shape are checked.
    pub fn check_value(&self, value: &Bson) -> Result<(), String> {
        let ok = match self {
            Self::Size => matches!(value, Bson::Int32(_) | Bson::Int64(_)),
            Self::Exists => matches!(value, Bson::Boolean(_)),
            Self::Mod => match value {
                Bson::Array(items) => items.len() == 2 && items.iter().all(is_number),
                _ => false,
            },
            Self::In | Self::NotIn | Self::All => matches!(value, Bson::Array(_)),
            Self::ElementMatch => matches!(value, Bson::Document(_)),
            Self::Type => matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::String(_)),
            _ => true,
        };

        if ok {
            Ok(())
        } else {
            Err(format!(
                "value of type {:?} is not valid for {}",
                value.element_type(),
                self
            ))
        }
    }
}

fn is_number(value: &Bson) -> bool {
    matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

impl FromStr for FilterOperator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token().unwrap_or("="))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_symbolic_aliases() {
        assert_eq!(FilterOperator::from_token(">").unwrap(), FilterOperator::GreaterThan);
        assert_eq!(FilterOperator::from_token(">=").unwrap(), FilterOperator::GreaterThanOrEqual);
        assert_eq!(FilterOperator::from_token("<>").unwrap(), FilterOperator::NotEqual);
        assert_eq!(FilterOperator::from_token("==").unwrap(), FilterOperator::Equal);
    }

    #[test]
    fn test_word_aliases() {
        assert_eq!(FilterOperator::from_token("nin").unwrap(), FilterOperator::NotIn);
        assert_eq!(FilterOperator::from_token("elem").unwrap(), FilterOperator::ElementMatch);
        assert_eq!(
            FilterOperator::from_token("elemMatch").unwrap(),
            FilterOperator::ElementMatch
        );
        assert_eq!(FilterOperator::from_token("within").unwrap(), FilterOperator::GeoWithin);
        assert_eq!("gte".parse::<FilterOperator>().unwrap(), FilterOperator::GreaterThanOrEqual);
    }

    #[test]
    fn test_unknown_operator() {
        let err = FilterOperator::from_token("~=").unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedOperator);
    }

    #[test]
    fn test_aliases_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for op in FilterOperator::ALL {
            for alias in op.aliases() {
                assert!(seen.insert(*alias), "duplicate alias {alias}");
            }
        }
    }

    #[test]
    fn test_tokens() {
        assert_eq!(FilterOperator::Equal.token(), None);
        assert_eq!(FilterOperator::NotIn.token(), Some("$nin"));
        assert_eq!(FilterOperator::GeoWithin.token(), Some("$geoWithin"));
    }

    #[test]
    fn test_check_value() {
        assert!(FilterOperator::Size.check_value(&Bson::Int32(3)).is_ok());
        assert!(FilterOperator::Size.check_value(&Bson::String("3".into())).is_err());
        assert!(FilterOperator::Exists.check_value(&Bson::Boolean(true)).is_ok());
        assert!(
            FilterOperator::Mod
                .check_value(&Bson::Array(vec![4.into(), 0.into()]))
                .is_ok()
        );
        assert!(FilterOperator::Mod.check_value(&Bson::Array(vec![4.into()])).is_err());
        assert!(FilterOperator::In.check_value(&Bson::Int32(1)).is_err());
        assert!(FilterOperator::GreaterThan.check_value(&Bson::Null).is_ok());
    }
}
