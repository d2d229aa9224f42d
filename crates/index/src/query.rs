//! Typed index queries
//!
//! A query is a conjunction of per-column predicates: every clause must hold
//! for a key to match. Predicates are typed against the index's column
//! declaration at evaluation time; a clause naming an unknown column or
//! carrying a mismatched value type is an error, not an empty result.

use std::ops::Bound;

use crate::column::IndexValue;

/// Per-column predicate
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Exact cell match
    Equals(IndexValue),
    /// Cell within a range
    Range {
        lower: Bound<IndexValue>,
        upper: Bound<IndexValue>,
    },
    /// Text cell starting with a prefix; text columns only
    Prefix(String),
}

/// Conjunction of column predicates
#[derive(Debug, Clone, Default)]
pub struct IndexQuery {
    clauses: Vec<(String, Predicate)>,
}

impl IndexQuery {
    pub fn new() -> Self {
        IndexQuery::default()
    }

    /// Require a column to equal a value
    pub fn equals(mut self, column: impl Into<String>, value: impl Into<IndexValue>) -> Self {
        self.clauses.push((column.into(), Predicate::Equals(value.into())));
        self
    }

    /// Require a column to fall within explicit bounds
    pub fn range(
        mut self,
        column: impl Into<String>,
        lower: Bound<IndexValue>,
        upper: Bound<IndexValue>,
    ) -> Self {
        self.clauses
            .push((column.into(), Predicate::Range { lower, upper }));
        self
    }

    /// Require `low <= column <= high`
    pub fn between(
        mut self,
        column: impl Into<String>,
        low: impl Into<IndexValue>,
        high: impl Into<IndexValue>,
    ) -> Self {
        self.clauses.push((
            column.into(),
            Predicate::Range {
                lower: Bound::Included(low.into()),
                upper: Bound::Included(high.into()),
            },
        ));
        self
    }

    /// Require `column >= low`
    pub fn at_least(mut self, column: impl Into<String>, low: impl Into<IndexValue>) -> Self {
        self.clauses.push((
            column.into(),
            Predicate::Range {
                lower: Bound::Included(low.into()),
                upper: Bound::Unbounded,
            },
        ));
        self
    }

    /// Require `column <= high`
    pub fn at_most(mut self, column: impl Into<String>, high: impl Into<IndexValue>) -> Self {
        self.clauses.push((
            column.into(),
            Predicate::Range {
                lower: Bound::Unbounded,
                upper: Bound::Included(high.into()),
            },
        ));
        self
    }

    /// Require a text column to start with a prefix
    pub fn prefix(mut self, column: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.clauses
            .push((column.into(), Predicate::Prefix(prefix.into())));
        self
    }

    pub fn clauses(&self) -> &[(String, Predicate)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_accumulates_clauses() {
        let query = IndexQuery::new()
            .equals("department", "ops")
            .between("age", 30i64, 40i64)
            .prefix("name", "al");
        assert_eq!(query.clauses().len(), 3);
        assert!(!query.is_empty());
    }

    #[test]
    fn test_at_least_is_half_open() {
        let query = IndexQuery::new().at_least("age", 21i64);
        match &query.clauses()[0].1 {
            Predicate::Range { lower, upper } => {
                assert_eq!(*lower, Bound::Included(IndexValue::Integer(21)));
                assert_eq!(*upper, Bound::Unbounded);
            }
            other => panic!("unexpected predicate: {other:?}"),
        }
    }
}
