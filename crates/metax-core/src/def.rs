//! # Metadata Definitions, Values, and Cache-Key Arguments
//!
//! A [`MetadataDef`] identifies one category of metadata question — "what is the
//! row count", "where does this column come from" — together with the shape of
//! the answer. Definitions are `'static` values compared by name; handlers,
//! providers, and the cache all key on them.
//!
//! The set of definitions is open in the same way node kinds are: downstream
//! code can declare its own `static` definition and register handlers for it
//! without touching this module. The statics below are the definitions the
//! built-in handler crate implements.

use crate::expr::{ColumnRef, Expr, TableRef};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a category of metadata and its handler contract.
///
/// Two definitions are the same definition iff their names are equal; the
/// statics in this module are the canonical instances for the built-in kinds.
#[derive(Debug)]
pub struct MetadataDef {
    /// Stable name, used as the leading cache-key discriminator.
    pub name: &'static str,
}

impl PartialEq for MetadataDef {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for MetadataDef {}

impl fmt::Display for MetadataDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Estimated number of output rows. Result: `MetadataValue::Double`.
pub static ROW_COUNT: MetadataDef = MetadataDef { name: "rowCount" };

/// Fraction of a node's output that satisfies a predicate, in [0.0, 1.0].
/// Takes the predicate as an argument. Result: `MetadataValue::Double`.
pub static SELECTIVITY: MetadataDef = MetadataDef {
    name: "selectivity",
};

/// Base-table origins of one output column, addressed by output ordinal.
/// Result: `MetadataValue::Origins`.
pub static COLUMN_ORIGINS: MetadataDef = MetadataDef {
    name: "columnOrigins",
};

/// Accumulated cost of computing a node and its entire subtree.
/// Result: `MetadataValue::Double`.
pub static CUMULATIVE_COST: MetadataDef = MetadataDef {
    name: "cumulativeCost",
};

/// Base-table origin of a derived column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnOrigin {
    /// The base table the column traces back to.
    pub table: TableRef,
    /// The originating column within that table.
    pub column: ColumnRef,
    /// True when the output column is computed *from* the origin rather than
    /// being a direct copy of it (e.g., it passed through an expression or an
    /// aggregate function).
    pub derived: bool,
}

/// Result of a metadata computation.
///
/// The variant is determined by the metadata definition; typed accessors on
/// `MetadataQuery` unwrap the expected variant and report a type mismatch
/// otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    /// A numeric answer (row count, selectivity, cost).
    Double(f64),
    /// A set of base-table column origins.
    Origins(Vec<ColumnOrigin>),
}

impl MetadataValue {
    pub fn as_double(&self) -> Option<f64> {
        match self {
            MetadataValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_origins(&self) -> Option<&[ColumnOrigin]> {
        match self {
            MetadataValue::Origins(o) => Some(o),
            _ => None,
        }
    }
}

/// One discriminator in a cache key: an argument of the specific query.
///
/// A full cache key is `(node, [Def(name), args...])` — the definition name
/// followed by the query's arguments in order. Keys are compared exactly,
/// never partially, so every variant must be value-comparable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MetadataArg {
    /// The metadata definition's name. Always the first key element.
    Def(&'static str),
    /// An output-column ordinal (column origins).
    Column(usize),
    /// A predicate expression (selectivity).
    Pred(Expr),
    /// A signed integer argument.
    Int(i64),
    /// A floating-point argument, wrapped for Eq/Hash support.
    Float(OrderedFloat<f64>),
    /// A free-form text argument.
    Text(String),
}
