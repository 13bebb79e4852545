//! # Predicate Selectivity Estimation
//!
//! Estimates the fraction of a node's output that satisfies a predicate.
//!
//! - **Equality**: 1 / NDV (uniform distribution assumption), resolved against
//!   the base-table statistics of the referenced column.
//! - **Range** (`<`, `<=`, `>`, `>=`): fixed 1/3 heuristic.
//! - **IS NULL / IS NOT NULL**: the column's null fraction (or its complement).
//! - **AND**: conjunct selectivities multiplied (independence assumption).
//! - **OR**: disjunct selectivities summed, capped at 1.
//! - **NOT**: complement.
//! - **Default**: 0.1 when no better estimate is available.

use crate::lookup::scan_column_stats;
use metax_core::catalog::Catalog;
use metax_core::def::{MetadataArg, MetadataDef, MetadataValue, SELECTIVITY};
use metax_core::error::MetadataError;
use metax_core::expr::{BinaryOp, Expr, ScalarValue, UnaryOp};
use metax_core::plan::PlanNode;
use metax_core::query::MetadataQuery;
use metax_core::stats::{DEFAULT_FILTER_SELECTIVITY, DEFAULT_RANGE_SELECTIVITY};
use std::sync::Arc;

/// Built-in selectivity handler. Applies to any node kind: estimation only
/// depends on the predicate and on the base-table statistics reachable below
/// the node.
pub struct SelectivityRules {
    catalog: Arc<dyn Catalog>,
}

impl SelectivityRules {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    fn estimate(&self, node: &PlanNode, predicate: &Expr) -> f64 {
        match predicate {
            // Constant predicates select everything or nothing.
            Expr::Literal(ScalarValue::Bool(true)) => 1.0,
            Expr::Literal(ScalarValue::Bool(false)) | Expr::Literal(ScalarValue::Null) => 0.0,

            Expr::And(conjuncts) => conjuncts
                .iter()
                .map(|c| self.estimate(node, c))
                .product(),
            Expr::Or(disjuncts) => disjuncts
                .iter()
                .map(|d| self.estimate(node, d))
                .sum::<f64>()
                .min(1.0),

            Expr::UnaryOp { op, operand } => match op {
                UnaryOp::Not => (1.0 - self.estimate(node, operand)).clamp(0.0, 1.0),
                UnaryOp::IsNull => self.null_fraction(node, operand),
                UnaryOp::IsNotNull => 1.0 - self.null_fraction(node, operand),
                UnaryOp::Neg => DEFAULT_FILTER_SELECTIVITY,
            },

            Expr::BinaryOp { op, left, right } => match op {
                BinaryOp::Eq => self.equality(node, left, right),
                BinaryOp::NotEq => (1.0 - self.equality(node, left, right)).clamp(0.0, 1.0),
                _ if op.is_range() => DEFAULT_RANGE_SELECTIVITY,
                _ => DEFAULT_FILTER_SELECTIVITY,
            },

            _ => DEFAULT_FILTER_SELECTIVITY,
        }
    }

    /// Equality selectivity: 1 / NDV of the referenced column.
    fn equality(&self, node: &PlanNode, left: &Expr, right: &Expr) -> f64 {
        let column = match (left, right) {
            (Expr::Column(c), _) => Some(c),
            (_, Expr::Column(c)) => Some(c),
            _ => None,
        };
        column
            .and_then(|c| scan_column_stats(&*self.catalog, node, c))
            .map(|stats| 1.0 / stats.distinct_count.max(1.0))
            .unwrap_or(DEFAULT_FILTER_SELECTIVITY)
    }

    fn null_fraction(&self, node: &PlanNode, operand: &Expr) -> f64 {
        match operand {
            Expr::Column(c) => scan_column_stats(&*self.catalog, node, c)
                .map(|stats| stats.null_fraction)
                .unwrap_or(DEFAULT_FILTER_SELECTIVITY),
            _ => DEFAULT_FILTER_SELECTIVITY,
        }
    }
}

impl metax_core::handler::MetadataHandler for SelectivityRules {
    fn def(&self) -> &'static MetadataDef {
        &SELECTIVITY
    }

    fn invoke(
        &self,
        node: &Arc<PlanNode>,
        _mq: &mut MetadataQuery,
        args: &[MetadataArg],
    ) -> Result<MetadataValue, MetadataError> {
        let predicate = match args.first() {
            Some(MetadataArg::Pred(expr)) => expr,
            _ => {
                return Err(MetadataError::TypeMismatch {
                    def: SELECTIVITY.name,
                })
            }
        };
        Ok(MetadataValue::Double(self.estimate(node, predicate)))
    }
}
