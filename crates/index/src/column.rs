//! Typed index columns and values
//!
//! Secondary indexes declare their columns up front, each with one of three
//! types. `IndexValue` carries a single cell; its ordering is total (variant
//! rank first, then value, reals via `total_cmp`) so it can key a `BTreeMap`,
//! but in practice a column's tree only ever holds one variant because rows
//! are type-checked against the column declaration before insertion.
//!
//! NaN is rejected at construction. An index over NaN cells would have no
//! usable order, so a handler producing one gets its whole row skipped.

use std::cmp::Ordering;

/// Declared type of an index column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexedType {
    Integer,
    Real,
    Text,
}

/// One cell of an index row
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    Integer(i64),
    Real(f64),
    Text(String),
}

impl IndexValue {
    /// A real cell; `None` for NaN
    pub fn real(value: f64) -> Option<IndexValue> {
        if value.is_nan() {
            None
        } else {
            Some(IndexValue::Real(value))
        }
    }

    pub fn text(value: impl Into<String>) -> IndexValue {
        IndexValue::Text(value.into())
    }

    /// Whether this cell matches a declared column type
    pub fn matches_type(&self, ty: IndexedType) -> bool {
        matches!(
            (self, ty),
            (IndexValue::Integer(_), IndexedType::Integer)
                | (IndexValue::Real(_), IndexedType::Real)
                | (IndexValue::Text(_), IndexedType::Text)
        )
    }

    /// Whether this cell can never be stored (NaN)
    pub fn is_storable(&self) -> bool {
        match self {
            IndexValue::Real(r) => !r.is_nan(),
            _ => true,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            IndexValue::Integer(_) => 0,
            IndexValue::Real(_) => 1,
            IndexValue::Text(_) => 2,
        }
    }
}

impl Eq for IndexValue {}

impl Ord for IndexValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (IndexValue::Integer(a), IndexValue::Integer(b)) => a.cmp(b),
            (IndexValue::Real(a), IndexValue::Real(b)) => a.total_cmp(b),
            (IndexValue::Text(a), IndexValue::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for IndexValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<i64> for IndexValue {
    fn from(v: i64) -> Self {
        IndexValue::Integer(v)
    }
}

impl From<&str> for IndexValue {
    fn from(v: &str) -> Self {
        IndexValue::Text(v.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(v: String) -> Self {
        IndexValue::Text(v)
    }
}

impl std::fmt::Display for IndexValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexValue::Integer(v) => write!(f, "{v}"),
            IndexValue::Real(v) => write!(f, "{v}"),
            IndexValue::Text(v) => write!(f, "{v}"),
        }
    }
}

/// A named, typed column in an index declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexColumn {
    pub name: String,
    pub ty: IndexedType,
}
