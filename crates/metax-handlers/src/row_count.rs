//! # Row Count Derivation
//!
//! Estimates the number of rows each logical operator produces. Estimates are
//! derived bottom-up through the metadata query, so every child answer is
//! cached and shared with other definitions (cost asks for the same row
//! counts).
//!
//! ## Formulas
//!
//! - **Scan**: catalog row count, scaled by the pushed-down predicate's
//!   selectivity when one is present.
//! - **Filter**: input rows × predicate selectivity.
//! - **Join**: |L| × |R| / max(NDV(L.key), NDV(R.key)) per equi-join column
//!   pair, selectivities multiplied under the independence assumption. The
//!   max-NDV denominator is the standard containment assumption: the smaller
//!   key domain is fully contained in the larger one. Outer joins are floored
//!   at the preserved side; semi joins are capped at the left side; anti joins
//!   keep what the inner estimate removes.
//! - **Aggregate**: product of group-key NDVs, capped by input rows. A global
//!   aggregate always produces one row.
//! - **Limit**: rows remaining after the offset, capped at the limit count.
//! - **Project / Sort**: pass through the input cardinality.
//!
//! Estimates are floored at one row except below a Limit, which may genuinely
//! produce nothing.

use crate::lookup::column_ndv;
use metax_core::catalog::Catalog;
use metax_core::def::{MetadataArg, MetadataDef, MetadataValue, ROW_COUNT};
use metax_core::error::MetadataError;
use metax_core::expr::{BinaryOp, ColumnRef, Expr};
use metax_core::plan::{JoinType, PlanNode, PlanOp};
use metax_core::query::MetadataQuery;
use metax_core::stats::DEFAULT_ROW_COUNT;
use std::sync::Arc;

/// Built-in row count handler covering every logical node kind.
pub struct RowCountRules {
    catalog: Arc<dyn Catalog>,
}

impl RowCountRules {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    fn join_rows(
        &self,
        node: &Arc<PlanNode>,
        mq: &mut MetadataQuery,
        join_type: JoinType,
        condition: &Expr,
    ) -> Result<f64, MetadataError> {
        let left = required_child(node, 0)?;
        let right = required_child(node, 1)?;
        let left_rows = mq.row_count(&left)?;
        let right_rows = mq.row_count(&right)?;

        // Accumulate selectivity per equi-join column pair; a join without
        // equi-join columns degenerates to the cross product.
        let mut selectivity = 1.0_f64;
        for (left_col, right_col) in equi_join_columns(&left, &right, condition, &*self.catalog) {
            let left_ndv = column_ndv(&*self.catalog, &left, left_col, left_rows);
            let right_ndv = column_ndv(&*self.catalog, &right, right_col, right_rows);
            selectivity /= left_ndv.max(right_ndv).max(1.0);
        }
        let inner = (left_rows * right_rows * selectivity).max(1.0);

        let rows = match join_type {
            JoinType::Inner | JoinType::Cross => inner,
            JoinType::Left => inner.max(left_rows),
            JoinType::Right => inner.max(right_rows),
            JoinType::Full => inner.max(left_rows).max(right_rows),
            JoinType::Semi => inner.min(left_rows),
            JoinType::Anti => (left_rows - inner.min(left_rows)).max(1.0),
        };
        Ok(rows)
    }

    fn aggregate_rows(
        &self,
        node: &Arc<PlanNode>,
        mq: &mut MetadataQuery,
        group_by: &[Expr],
    ) -> Result<f64, MetadataError> {
        // Global aggregate: exactly one output row.
        if group_by.is_empty() {
            return Ok(1.0);
        }
        let input = required_child(node, 0)?;
        let input_rows = mq.row_count(&input)?;

        // Worst case: every combination of group-key values exists, so the
        // group count is the product of the keys' NDVs, capped by input rows.
        let mut rows = 1.0_f64;
        for key in group_by {
            let ndv = match key {
                Expr::Column(col) => column_ndv(&*self.catalog, &input, col, input_rows),
                _ => input_rows,
            };
            rows *= ndv;
        }
        Ok(rows.min(input_rows).max(1.0))
    }
}

impl metax_core::handler::MetadataHandler for RowCountRules {
    fn def(&self) -> &'static MetadataDef {
        &ROW_COUNT
    }

    fn invoke(
        &self,
        node: &Arc<PlanNode>,
        mq: &mut MetadataQuery,
        _args: &[MetadataArg],
    ) -> Result<MetadataValue, MetadataError> {
        let rows = match node.op() {
            PlanOp::Scan { table, predicate, .. } => {
                let base = self
                    .catalog
                    .table_stats(table)
                    .map(|stats| stats.row_count)
                    .unwrap_or(DEFAULT_ROW_COUNT);
                match predicate {
                    Some(pred) => {
                        let sel = mq.selectivity(node, pred)?;
                        (base * sel).max(1.0)
                    }
                    None => base,
                }
            }
            PlanOp::Filter { predicate } => {
                let input = required_child(node, 0)?;
                let input_rows = mq.row_count(&input)?;
                let sel = mq.selectivity(&input, predicate)?;
                (input_rows * sel).max(1.0)
            }
            PlanOp::Project { .. } | PlanOp::Sort { .. } => {
                let input = required_child(node, 0)?;
                mq.row_count(&input)?
            }
            PlanOp::Join {
                join_type,
                condition,
            } => self.join_rows(node, mq, *join_type, condition)?,
            PlanOp::Aggregate { group_by, .. } => self.aggregate_rows(node, mq, group_by)?,
            PlanOp::Limit { offset, count } => {
                let input = required_child(node, 0)?;
                let input_rows = mq.row_count(&input)?;
                (input_rows - *offset as f64).max(0.0).min(*count as f64)
            }
        };
        Ok(MetadataValue::Double(rows))
    }
}

/// Missing child means the plan is malformed; surface it as a computation
/// failure rather than panicking inside a handler.
pub(crate) fn required_child(
    node: &Arc<PlanNode>,
    index: usize,
) -> Result<Arc<PlanNode>, MetadataError> {
    node.child(index).cloned().ok_or_else(|| {
        MetadataError::Computation(
            format!("{:?} node {} is missing input {index}", node.kind(), node.id()).into(),
        )
    })
}

/// Extract sided equi-join column pairs from a join condition.
///
/// Walks the condition's conjuncts for `column = column` comparisons. Each
/// pair is oriented so that the first column resolves against the left input;
/// a pair written right-to-left in the condition is swapped.
fn equi_join_columns<'a>(
    left: &PlanNode,
    right: &PlanNode,
    condition: &'a Expr,
    catalog: &dyn Catalog,
) -> Vec<(&'a ColumnRef, &'a ColumnRef)> {
    let mut pairs = Vec::new();
    for conjunct in condition.conjuncts() {
        if let Expr::BinaryOp {
            op: BinaryOp::Eq,
            left: lhs,
            right: rhs,
        } = conjunct
        {
            if let (Expr::Column(a), Expr::Column(b)) = (lhs.as_ref(), rhs.as_ref()) {
                let a_on_left = crate::lookup::scan_column_stats(catalog, left, a).is_some();
                let b_on_left = crate::lookup::scan_column_stats(catalog, left, b).is_some();
                if !a_on_left && b_on_left {
                    pairs.push((b, a));
                } else {
                    pairs.push((a, b));
                }
            }
        }
    }
    pairs
}
