//! # Metadata Handlers
//!
//! A handler answers one metadata definition for one or more node kinds. The
//! trait is object-safe and type-erased: arguments arrive as [`MetadataArg`]
//! discriminators and answers leave as [`MetadataValue`], so a single handler
//! representation serves every definition. The typed query methods on
//! `MetadataQuery` do the unwrapping.
//!
//! ## Handler Lifecycle
//!
//! - **Unbound**: every query method starts from [`initial_handler`], a stub
//!   that signals [`MetadataError::Unhandled`] for any node. Because the trait
//!   is erased, one stub type covers every definition with no per-definition
//!   code.
//! - **Bound**: the first revision produces a [`DispatchHandler`] covering the
//!   requested kind.
//! - **Bound-Extended**: later revisions produce a new composite that covers
//!   additional kinds. Composites are immutable snapshots; extension copies and
//!   never removes coverage, so a reader holding an old snapshot observes at
//!   worst stale-but-valid coverage, never a regression.

use crate::def::{MetadataArg, MetadataDef, MetadataValue};
use crate::error::MetadataError;
use crate::plan::{NodeKind, PlanNode};
use crate::query::MetadataQuery;
use std::collections::HashMap;
use std::sync::Arc;

/// Polymorphic dispatcher answering one metadata definition.
///
/// Handlers may recurse through the passed `MetadataQuery` to ask for metadata
/// of child nodes; those answers flow through the same cache and revision
/// machinery as top-level queries.
pub trait MetadataHandler: Send + Sync {
    /// The definition this handler answers.
    fn def(&self) -> &'static MetadataDef;

    /// Compute the metadata value for `node`.
    ///
    /// Returns `Err(MetadataError::Unhandled(kind))` when this handler has no
    /// coverage for the node's kind; any other error is a real failure and
    /// propagates to the caller unchanged.
    fn invoke(
        &self,
        node: &Arc<PlanNode>,
        mq: &mut MetadataQuery,
        args: &[MetadataArg],
    ) -> Result<MetadataValue, MetadataError>;
}

/// Bootstrap stub: the initial handler reference for every query method.
///
/// Any invocation immediately signals `Unhandled` with the runtime kind of the
/// node it was invoked on, which is what triggers the first revision.
pub fn initial_handler(def: &'static MetadataDef) -> Arc<dyn MetadataHandler> {
    Arc::new(UnboundHandler { def })
}

struct UnboundHandler {
    def: &'static MetadataDef,
}

impl MetadataHandler for UnboundHandler {
    fn def(&self) -> &'static MetadataDef {
        self.def
    }

    fn invoke(
        &self,
        node: &Arc<PlanNode>,
        _mq: &mut MetadataQuery,
        _args: &[MetadataArg],
    ) -> Result<MetadataValue, MetadataError> {
        Err(MetadataError::Unhandled(node.kind()))
    }
}

/// Composite handler dispatching on node kind.
///
/// This is the "bound" form a provider returns from revision: a map from node
/// kind to the handler registered for that kind. Kinds outside the map signal
/// `Unhandled`, which sends the caller back through revision.
#[derive(Clone)]
pub struct DispatchHandler {
    def: &'static MetadataDef,
    coverage: HashMap<NodeKind, Arc<dyn MetadataHandler>>,
}

impl DispatchHandler {
    pub fn new(def: &'static MetadataDef) -> Self {
        Self {
            def,
            coverage: HashMap::new(),
        }
    }

    /// Whether this composite can answer for `kind`.
    pub fn covers(&self, kind: NodeKind) -> bool {
        self.coverage.contains_key(&kind)
    }

    /// A new composite that additionally routes `kind` to `handler`.
    ///
    /// Existing coverage is carried over untouched; re-extending an already
    /// covered kind replaces its entry.
    pub fn extended(&self, kind: NodeKind, handler: Arc<dyn MetadataHandler>) -> Self {
        let mut coverage = self.coverage.clone();
        coverage.insert(kind, handler);
        Self {
            def: self.def,
            coverage,
        }
    }

    /// Kinds this composite currently covers.
    pub fn covered_kinds(&self) -> impl Iterator<Item = NodeKind> + '_ {
        self.coverage.keys().copied()
    }
}

impl MetadataHandler for DispatchHandler {
    fn def(&self) -> &'static MetadataDef {
        self.def
    }

    fn invoke(
        &self,
        node: &Arc<PlanNode>,
        mq: &mut MetadataQuery,
        args: &[MetadataArg],
    ) -> Result<MetadataValue, MetadataError> {
        match self.coverage.get(&node.kind()) {
            Some(handler) => handler.invoke(node, mq, args),
            None => Err(MetadataError::Unhandled(node.kind())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{COLUMN_ORIGINS, CUMULATIVE_COST, ROW_COUNT, SELECTIVITY};
    use crate::expr::{Expr, ScalarValue, TableRef};
    use crate::plan::{JoinType, PlanOp};
    use crate::provider::RegistryProvider;

    fn empty_query() -> MetadataQuery {
        MetadataQuery::new(Arc::new(RegistryProvider::new()))
    }

    fn sample_nodes() -> Vec<Arc<PlanNode>> {
        let scan = PlanNode::new(
            PlanOp::Scan {
                table: TableRef::new("s", "t"),
                columns: vec![],
                predicate: None,
            },
            vec![],
        );
        let filter = PlanNode::new(
            PlanOp::Filter {
                predicate: Expr::Literal(ScalarValue::Bool(true)),
            },
            vec![scan.clone()],
        );
        let join = PlanNode::new(
            PlanOp::Join {
                join_type: JoinType::Inner,
                condition: Expr::Literal(ScalarValue::Bool(true)),
            },
            vec![scan.clone(), filter.clone()],
        );
        vec![scan, filter, join]
    }

    #[test]
    fn unbound_stub_signals_unhandled_with_actual_kind() {
        let mut mq = empty_query();
        for def in [&ROW_COUNT, &SELECTIVITY, &COLUMN_ORIGINS, &CUMULATIVE_COST] {
            let stub = initial_handler(def);
            assert_eq!(stub.def(), def);
            for node in sample_nodes() {
                match stub.invoke(&node, &mut mq, &[]) {
                    Err(MetadataError::Unhandled(kind)) => assert_eq!(kind, node.kind()),
                    other => panic!("expected Unhandled, got {other:?}"),
                }
            }
        }
    }

    struct FixedDouble(f64);

    impl MetadataHandler for FixedDouble {
        fn def(&self) -> &'static MetadataDef {
            &ROW_COUNT
        }

        fn invoke(
            &self,
            _node: &Arc<PlanNode>,
            _mq: &mut MetadataQuery,
            _args: &[MetadataArg],
        ) -> Result<MetadataValue, MetadataError> {
            Ok(MetadataValue::Double(self.0))
        }
    }

    #[test]
    fn extension_adds_coverage_without_losing_any() {
        let mut mq = empty_query();
        let nodes = sample_nodes();
        let scan = &nodes[0];
        let filter = &nodes[1];

        let bound = DispatchHandler::new(&ROW_COUNT).extended(NodeKind::Scan, Arc::new(FixedDouble(5.0)));
        assert!(bound.covers(NodeKind::Scan));
        assert!(!bound.covers(NodeKind::Filter));
        assert!(matches!(
            bound.invoke(filter, &mut mq, &[]),
            Err(MetadataError::Unhandled(NodeKind::Filter))
        ));

        let extended = bound.extended(NodeKind::Filter, Arc::new(FixedDouble(7.0)));
        assert!(extended.covers(NodeKind::Scan));
        assert!(extended.covers(NodeKind::Filter));
        assert_eq!(
            extended.invoke(scan, &mut mq, &[]).unwrap(),
            MetadataValue::Double(5.0)
        );
        assert_eq!(
            extended.invoke(filter, &mut mq, &[]).unwrap(),
            MetadataValue::Double(7.0)
        );

        // The earlier snapshot is untouched by extension.
        assert!(!bound.covers(NodeKind::Filter));
    }
}
