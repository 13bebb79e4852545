//! # Logical Plan Nodes
//!
//! This module defines the plan representation that metadata is computed about.
//! The metadata core itself never traverses or rewrites plans; it only needs two
//! things from a node:
//!
//! - **Identity**: cache rows are keyed by node identity, not structure. Two
//!   structurally identical Scans are distinct nodes with distinct cached
//!   metadata. Every node gets a process-unique [`NodeId`] at construction and
//!   equality compares ids only.
//! - **Runtime-kind introspection**: dispatch is by [`NodeKind`], the field-free
//!   discriminant of [`PlanOp`]. Handlers cover kinds; the "unhandled" control
//!   signal carries the kind of the node that had no coverage.
//!
//! Nodes are immutable and shared via `Arc`: a node is created once with its
//! children and never mutated. Transformation logic that replaces a node's
//! children builds a new node and invalidates the old node's cache row.

use crate::expr::{AggExpr, ColumnRef, Expr, SortKey, TableRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-unique identifier of a plan node. Allocated at node construction;
/// identity comparison and cache keying use this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// SQL join types.
///
/// The join type affects cardinality derivation: only Inner and Cross joins use
/// the plain equi-join formula; outer joins are floored at the preserved side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    /// Inner join: only matching rows from both sides.
    Inner,
    /// Left outer join: all rows from left, matching from right (or NULLs).
    Left,
    /// Right outer join: all rows from right, matching from left (or NULLs).
    Right,
    /// Full outer join: all rows from both sides, NULLs where no match.
    Full,
    /// Semi join: left rows that have at least one match on the right.
    Semi,
    /// Anti join: left rows that have no match on the right.
    Anti,
    /// Cross join: Cartesian product of both sides (no condition).
    Cross,
}

/// Logical plan operators.
///
/// These describe *what* a node computes. Children are not stored here; they
/// live on the [`PlanNode`] wrapper so that operators stay plain data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlanOp {
    /// Table scan: reads rows from a base table. Always a leaf node.
    Scan {
        table: TableRef,
        columns: Vec<ColumnRef>,
        predicate: Option<Expr>,
    },
    /// Filter: applies a predicate to its single child.
    Filter { predicate: Expr },
    /// Projection: computes output expressions from its child's columns.
    Project { exprs: Vec<Expr>, aliases: Vec<String> },
    /// Join: combines two child relations on the given condition.
    Join { join_type: JoinType, condition: Expr },
    /// Aggregate: groups rows by `group_by` keys and computes aggregates.
    Aggregate {
        group_by: Vec<Expr>,
        aggregates: Vec<AggExpr>,
    },
    /// Sort: orders the output by the given sort keys.
    Sort { order: Vec<SortKey> },
    /// Limit: returns at most `count` rows starting from `offset`.
    Limit { offset: u64, count: u64 },
}

impl PlanOp {
    pub fn kind(&self) -> NodeKind {
        match self {
            PlanOp::Scan { .. } => NodeKind::Scan,
            PlanOp::Filter { .. } => NodeKind::Filter,
            PlanOp::Project { .. } => NodeKind::Project,
            PlanOp::Join { .. } => NodeKind::Join,
            PlanOp::Aggregate { .. } => NodeKind::Aggregate,
            PlanOp::Sort { .. } => NodeKind::Sort,
            PlanOp::Limit { .. } => NodeKind::Limit,
        }
    }
}

/// Kind discriminant for dispatch (without operator data).
///
/// Handlers are registered and revised per `NodeKind`; this is the "runtime
/// subtype" that the unhandled signal reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Scan,
    Filter,
    Project,
    Join,
    Aggregate,
    Sort,
    Limit,
}

impl NodeKind {
    /// Every logical node kind, in declaration order.
    pub const ALL: [NodeKind; 7] = [
        NodeKind::Scan,
        NodeKind::Filter,
        NodeKind::Project,
        NodeKind::Join,
        NodeKind::Aggregate,
        NodeKind::Sort,
        NodeKind::Limit,
    ];
}

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// A vertex of the logical plan: an operator plus its children and identity.
#[derive(Debug)]
pub struct PlanNode {
    id: NodeId,
    op: PlanOp,
    children: Vec<Arc<PlanNode>>,
}

impl PlanNode {
    /// Create a new node with a fresh identity.
    pub fn new(op: PlanOp, children: Vec<Arc<PlanNode>>) -> Arc<Self> {
        Arc::new(Self {
            id: NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed)),
            op,
            children,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn op(&self) -> &PlanOp {
        &self.op
    }

    /// Runtime kind of this node, used for handler dispatch.
    pub fn kind(&self) -> NodeKind {
        self.op.kind()
    }

    pub fn children(&self) -> &[Arc<PlanNode>] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&Arc<PlanNode>> {
        self.children.get(index)
    }

    /// Number of columns in this node's output row.
    ///
    /// Column-origin derivation addresses columns by output ordinal and needs
    /// this to split a Join's output into its left and right blocks.
    pub fn output_arity(&self) -> usize {
        match &self.op {
            PlanOp::Scan { columns, .. } => columns.len(),
            PlanOp::Project { exprs, .. } => exprs.len(),
            // Semi and anti joins produce only the left side's columns.
            PlanOp::Join { join_type, .. } => match join_type {
                JoinType::Semi | JoinType::Anti => self
                    .children
                    .first()
                    .map(|c| c.output_arity())
                    .unwrap_or(0),
                _ => self.children.iter().map(|c| c.output_arity()).sum(),
            },
            PlanOp::Aggregate {
                group_by,
                aggregates,
            } => group_by.len() + aggregates.len(),
            PlanOp::Filter { .. } | PlanOp::Sort { .. } | PlanOp::Limit { .. } => self
                .children
                .first()
                .map(|c| c.output_arity())
                .unwrap_or(0),
        }
    }
}

/// Identity-based equality: two nodes are equal only if they are the same node.
impl PartialEq for PlanNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for PlanNode {}

impl Hash for PlanNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ScalarValue;

    fn scan(schema: &str, name: &str, cols: &[&str]) -> Arc<PlanNode> {
        let columns = cols
            .iter()
            .enumerate()
            .map(|(i, c)| ColumnRef {
                table: Some(name.into()),
                name: (*c).into(),
                index: i as u32,
            })
            .collect();
        PlanNode::new(
            PlanOp::Scan {
                table: TableRef::new(schema, name),
                columns,
                predicate: None,
            },
            vec![],
        )
    }

    #[test]
    fn identity_not_structure() {
        let a = scan("tpch", "orders", &["o_orderkey"]);
        let b = scan("tpch", "orders", &["o_orderkey"]);
        // Structurally identical scans are still distinct nodes.
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
        assert_eq!(a, a.clone());
    }

    #[test]
    fn join_output_arity_spans_both_sides() {
        let left = scan("tpch", "orders", &["o_orderkey", "o_custkey"]);
        let right = scan("tpch", "customer", &["c_custkey"]);
        let join = PlanNode::new(
            PlanOp::Join {
                join_type: JoinType::Inner,
                condition: Expr::Literal(ScalarValue::Bool(true)),
            },
            vec![left, right],
        );
        assert_eq!(join.output_arity(), 3);
        assert_eq!(join.kind(), NodeKind::Join);
    }

    #[test]
    fn passthrough_arity_follows_child() {
        let input = scan("tpch", "orders", &["o_orderkey", "o_custkey"]);
        let limit = PlanNode::new(
            PlanOp::Limit {
                offset: 0,
                count: 10,
            },
            vec![input],
        );
        assert_eq!(limit.output_arity(), 2);
    }
}
