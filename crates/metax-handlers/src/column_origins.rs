//! # Column Origin Derivation
//!
//! Traces an output column, addressed by ordinal, back to the base-table
//! columns it came from. Rule authors use origins to decide whether a
//! predicate can be pushed below an operator or which table a statistic
//! should be read from.
//!
//! A column that is a direct copy of a base-table column has a single
//! non-derived origin. A column computed from other columns — through a
//! projection expression or an aggregate function — carries the origins of
//! every column it reads, all marked derived. An empty origin set means the
//! column cannot be traced (e.g., a pure literal), which is "unknown", not
//! "no value".

use crate::row_count::required_child;
use metax_core::def::{ColumnOrigin, MetadataArg, MetadataDef, MetadataValue, COLUMN_ORIGINS};
use metax_core::error::MetadataError;
use metax_core::expr::Expr;
use metax_core::plan::{JoinType, PlanNode, PlanOp};
use metax_core::query::MetadataQuery;
use std::sync::Arc;

/// Built-in column origin handler covering every logical node kind.
pub struct ColumnOriginRules;

impl ColumnOriginRules {
    /// Origins of an expression at an output position: a bare column reference
    /// passes through unchanged; anything else unions the origins of every
    /// column it reads and marks them derived.
    fn expr_origins(
        &self,
        input: &Arc<PlanNode>,
        mq: &mut MetadataQuery,
        expr: &Expr,
    ) -> Result<Vec<ColumnOrigin>, MetadataError> {
        if let Expr::Column(col) = expr {
            return mq.column_origins(input, col.index as usize);
        }
        let mut origins: Vec<ColumnOrigin> = Vec::new();
        for col in expr.columns() {
            for origin in mq.column_origins(input, col.index as usize)? {
                let derived = ColumnOrigin {
                    derived: true,
                    ..origin
                };
                if !origins.contains(&derived) {
                    origins.push(derived);
                }
            }
        }
        Ok(origins)
    }
}

impl metax_core::handler::MetadataHandler for ColumnOriginRules {
    fn def(&self) -> &'static MetadataDef {
        &COLUMN_ORIGINS
    }

    fn invoke(
        &self,
        node: &Arc<PlanNode>,
        mq: &mut MetadataQuery,
        args: &[MetadataArg],
    ) -> Result<MetadataValue, MetadataError> {
        let ordinal = match args.first() {
            Some(MetadataArg::Column(i)) => *i,
            _ => {
                return Err(MetadataError::TypeMismatch {
                    def: COLUMN_ORIGINS.name,
                })
            }
        };

        let origins = match node.op() {
            PlanOp::Scan { table, columns, .. } => match columns.get(ordinal) {
                Some(column) => vec![ColumnOrigin {
                    table: table.clone(),
                    column: column.clone(),
                    derived: false,
                }],
                // Ordinal outside the scan's column list: untraceable.
                None => vec![],
            },

            PlanOp::Filter { .. } | PlanOp::Sort { .. } | PlanOp::Limit { .. } => {
                let input = required_child(node, 0)?;
                mq.column_origins(&input, ordinal)?
            }

            PlanOp::Project { exprs, .. } => {
                let input = required_child(node, 0)?;
                match exprs.get(ordinal) {
                    Some(expr) => self.expr_origins(&input, mq, expr)?,
                    None => vec![],
                }
            }

            PlanOp::Join { join_type, .. } => {
                let left = required_child(node, 0)?;
                match join_type {
                    // Semi and anti joins expose only the left side.
                    JoinType::Semi | JoinType::Anti => mq.column_origins(&left, ordinal)?,
                    _ => {
                        let left_arity = left.output_arity();
                        if ordinal < left_arity {
                            mq.column_origins(&left, ordinal)?
                        } else {
                            let right = required_child(node, 1)?;
                            mq.column_origins(&right, ordinal - left_arity)?
                        }
                    }
                }
            }

            PlanOp::Aggregate {
                group_by,
                aggregates,
            } => {
                let input = required_child(node, 0)?;
                if let Some(key) = group_by.get(ordinal) {
                    self.expr_origins(&input, mq, key)?
                } else {
                    match aggregates.get(ordinal - group_by.len()) {
                        // Aggregate outputs are always computed values.
                        Some(agg) => {
                            let mut origins = self.expr_origins(&input, mq, &agg.arg)?;
                            for origin in &mut origins {
                                origin.derived = true;
                            }
                            origins
                        }
                        None => vec![],
                    }
                }
            }
        };

        Ok(MetadataValue::Origins(origins))
    }
}
