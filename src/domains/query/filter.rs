use crate::types::{Entity, PARTITION_KEY, ROW_KEY};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Comparison operators understood by the table store's filter language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "eq",
            ComparisonOperator::Ne => "ne",
            ComparisonOperator::Gt => "gt",
            ComparisonOperator::Ge => "ge",
            ComparisonOperator::Lt => "lt",
            ComparisonOperator::Le => "le",
        }
    }

    fn holds(&self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            ComparisonOperator::Eq => ordering == Equal,
            ComparisonOperator::Ne => ordering != Equal,
            ComparisonOperator::Gt => ordering == Greater,
            ComparisonOperator::Ge => ordering != Less,
            ComparisonOperator::Lt => ordering == Less,
            ComparisonOperator::Le => ordering != Greater,
        }
    }
}

/// Server-side filter over string columns.
///
/// `Display` renders the OData expression sent to the store; `matches`
/// evaluates the same expression locally with ordinal string comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Filter {
    Compare {
        column: String,
        op: ComparisonOperator,
        value: String,
    },
    And(Box<Filter>, Box<Filter>),
    Or(Box<Filter>, Box<Filter>),
}

impl Filter {
    pub fn compare(column: impl Into<String>, op: ComparisonOperator, value: impl Into<String>) -> Self {
        Filter::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(column, ComparisonOperator::Eq, value)
    }

    pub fn ge(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(column, ComparisonOperator::Ge, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::compare(column, ComparisonOperator::Lt, value)
    }

    pub fn partition_key_eq(partition_key: impl Into<String>) -> Self {
        Self::equals(PARTITION_KEY, partition_key)
    }

    pub fn row_key_eq(row_key: impl Into<String>) -> Self {
        Self::equals(ROW_KEY, row_key)
    }

    pub fn and(self, other: Filter) -> Self {
        Filter::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Filter) -> Self {
        Filter::Or(Box::new(self), Box::new(other))
    }

    /// Evaluate against any column source. Missing columns never match.
    pub fn matches_with<F>(&self, column_value: &F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            Filter::Compare { column, op, value } => column_value(column.as_str())
                .map(|actual| op.holds(actual.as_str().cmp(value.as_str())))
                .unwrap_or(false),
            Filter::And(left, right) => left.matches_with(column_value) && right.matches_with(column_value),
            Filter::Or(left, right) => left.matches_with(column_value) || right.matches_with(column_value),
        }
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        self.matches_with(&|column: &str| entity.column_text(column))
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Compare { .. } => write!(f, "{}", self),
            _ => write!(f, "({})", self),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Compare { column, op, value } => {
                write!(f, "{} {} '{}'", column, op.as_str(), value.replace('\'', "''"))
            }
            Filter::And(left, right) => {
                left.fmt_operand(f)?;
                f.write_str(" and ")?;
                right.fmt_operand(f)
            }
            Filter::Or(left, right) => {
                left.fmt_operand(f)?;
                f.write_str(" or ")?;
                right.fmt_operand(f)
            }
        }
    }
}

/// Next Unicode scalar value after `c`, skipping the surrogate gap
fn next_char(c: char) -> Option<char> {
    match c {
        '\u{D7FF}' => Some('\u{E000}'),
        char::MAX => None,
        _ => char::from_u32(c as u32 + 1),
    }
}

/// "Column starts with prefix" as the half-open range `[prefix, prefix')`
/// where `prefix'` has its last character incremented by one.
///
/// When the last character is already `char::MAX` there is no finite upper
/// bound and the filter is `column ge prefix` alone. An empty prefix also
/// yields the lower bound only, which matches every value.
pub fn starts_with(column: &str, prefix: &str) -> Filter {
    let lower = Filter::ge(column, prefix);

    let mut chars = prefix.chars();
    let upper = chars
        .next_back()
        .and_then(next_char)
        .map(|last| {
            let mut bound = chars.as_str().to_string();
            bound.push(last);
            bound
        });

    match upper {
        Some(bound) => lower.and(Filter::lt(column, bound)),
        None => lower,
    }
}
