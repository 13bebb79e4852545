//! Column-statistics resolution against the base tables of a subtree.
//!
//! Handlers frequently need the NDV or null fraction of a column referenced at
//! some interior node. Statistics live only at scans, so resolution walks the
//! subtree to the scan whose table matches the column's qualifier and reads
//! the catalog there.

use metax_core::catalog::Catalog;
use metax_core::expr::ColumnRef;
use metax_core::plan::{PlanNode, PlanOp};
use metax_core::stats::ColumnStatistics;

/// Find base-table statistics for `col` among the scans under `node`.
///
/// A qualified column (`col.table == Some(..)`) only matches the scan of that
/// table; an unqualified column matches the first scan whose table carries a
/// column of that name. Returns `None` when no scan resolves the column.
pub fn scan_column_stats(
    catalog: &dyn Catalog,
    node: &PlanNode,
    col: &ColumnRef,
) -> Option<ColumnStatistics> {
    match node.op() {
        PlanOp::Scan { table, .. } => {
            if let Some(qualifier) = col.table.as_deref() {
                if qualifier != table.name {
                    return None;
                }
            }
            catalog
                .table_stats(table)
                .and_then(|stats| stats.column_stats.get(&col.name).cloned())
        }
        _ => node
            .children()
            .iter()
            .find_map(|child| scan_column_stats(catalog, child, col)),
    }
}

/// NDV of `col` under `node`, falling back to `fallback` when unresolvable.
///
/// The fallback is conventionally the relation's row count: assuming all
/// values distinct is the conservative choice for join cardinality.
pub fn column_ndv(catalog: &dyn Catalog, node: &PlanNode, col: &ColumnRef, fallback: f64) -> f64 {
    scan_column_stats(catalog, node, col)
        .map(|stats| stats.distinct_count)
        .unwrap_or(fallback)
}
