//! # Cumulative Cost Derivation
//!
//! Estimates the accumulated expense of computing a node and its entire
//! subtree. Costs are **additive**: a node's cumulative cost is the sum of its
//! children's cumulative costs plus a local term proportional to the rows the
//! node processes. At the logical level only the CPU-like dimension is
//! meaningful; physical concerns (memory for hash tables, network for
//! exchanges) belong to the physical planner's cost model.
//!
//! Local terms:
//!
//! - **Scan**: base-table rows read.
//! - **Filter / Project / Aggregate**: one pass over the input rows.
//! - **Join**: one pass over each input (build + probe analog).
//! - **Sort**: n·log₂(n) comparisons over the input.
//! - **Limit**: rows actually emitted.

use crate::row_count::required_child;
use metax_core::catalog::Catalog;
use metax_core::def::{MetadataArg, MetadataDef, MetadataValue, CUMULATIVE_COST};
use metax_core::error::MetadataError;
use metax_core::plan::{PlanNode, PlanOp};
use metax_core::query::MetadataQuery;
use metax_core::stats::DEFAULT_ROW_COUNT;
use std::sync::Arc;

/// Built-in cumulative cost handler covering every logical node kind.
pub struct CostRules {
    catalog: Arc<dyn Catalog>,
}

impl CostRules {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }
}

impl metax_core::handler::MetadataHandler for CostRules {
    fn def(&self) -> &'static MetadataDef {
        &CUMULATIVE_COST
    }

    fn invoke(
        &self,
        node: &Arc<PlanNode>,
        mq: &mut MetadataQuery,
        _args: &[MetadataArg],
    ) -> Result<MetadataValue, MetadataError> {
        let mut children_cost = 0.0_f64;
        for child in node.children() {
            children_cost += mq.cumulative_cost(child)?;
        }

        let local = match node.op() {
            // A scan reads every base-table row, before any pushed-down
            // predicate reduces the output.
            PlanOp::Scan { table, .. } => self
                .catalog
                .table_stats(table)
                .map(|stats| stats.row_count)
                .unwrap_or(DEFAULT_ROW_COUNT),
            PlanOp::Filter { .. } | PlanOp::Project { .. } | PlanOp::Aggregate { .. } => {
                let input = required_child(node, 0)?;
                mq.row_count(&input)?
            }
            PlanOp::Join { .. } => {
                let left = required_child(node, 0)?;
                let right = required_child(node, 1)?;
                mq.row_count(&left)? + mq.row_count(&right)?
            }
            PlanOp::Sort { .. } => {
                let input = required_child(node, 0)?;
                let rows = mq.row_count(&input)?;
                if rows > 1.0 {
                    rows * rows.log2()
                } else {
                    1.0
                }
            }
            PlanOp::Limit { .. } => mq.row_count(node)?,
        };

        Ok(MetadataValue::Double(children_cost + local))
    }
}
