//! # Metadata Query Facade
//!
//! `MetadataQuery` is what rule authors hold: one instance per optimization
//! session, owning the result cache and one cached handler reference per
//! metadata definition. The typed methods (`row_count`, `selectivity`,
//! `column_origins`, `cumulative_cost`) all run the same protocol:
//!
//! 1. Return the cached value if the (node, key) entry exists.
//! 2. Invoke the cached handler (initially the unbound bootstrap stub).
//! 3. On `Unhandled(kind)`: revise against the active provider, replace the
//!    cached handler reference, and retry the invocation exactly once.
//! 4. A second `Unhandled` is surfaced as a fatal `NoImplementation` — the
//!    definition has no implementation for that kind. Nothing is cached on any
//!    error path.
//! 5. Cache and return the computed value.
//!
//! The revise/retry loop is a plain synchronous call sequence within one call
//! stack; the core runs no threads and defines no suspension points. Handlers
//! recurse back into the same `MetadataQuery` for child metadata, so child
//! answers land in the same cache.

use crate::cache::MetadataCache;
use crate::context;
use crate::def::{
    ColumnOrigin, MetadataArg, MetadataDef, MetadataValue, COLUMN_ORIGINS, CUMULATIVE_COST,
    ROW_COUNT, SELECTIVITY,
};
use crate::error::MetadataError;
use crate::expr::Expr;
use crate::handler::{initial_handler, MetadataHandler};
use crate::plan::{NodeKind, PlanNode};
use crate::provider::MetadataProvider;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Per-session metadata query interface.
///
/// One instance belongs to one optimization session on one thread at a time;
/// all methods take `&mut self`, which rules out concurrent use of a single
/// instance without external synchronization.
pub struct MetadataQuery {
    cache: MetadataCache,
    provider: Arc<dyn MetadataProvider>,
    handlers: HashMap<&'static str, Arc<dyn MetadataHandler>>,
}

impl MetadataQuery {
    /// Create a fresh query with an empty cache against `provider`.
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            cache: MetadataCache::new(),
            provider,
            handlers: HashMap::new(),
        }
    }

    /// The session's result cache.
    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Mutable access to the cache primitives (`get`/`put`/`clear_row`).
    pub fn cache_mut(&mut self) -> &mut MetadataCache {
        &mut self.cache
    }

    /// Invalidate every cached result for `node`.
    ///
    /// Transformation logic must call this whenever a node's children or
    /// derivable properties change.
    pub fn clear_cache(&mut self, node: &PlanNode) {
        self.cache.clear_row(node.id());
    }

    /// Obtain a handler covering `kind` for `def` from the active provider.
    ///
    /// The thread-scoped override provider takes precedence over the session
    /// default. The returned handler also covers every kind previously revised
    /// through the same provider.
    pub fn revise(
        &mut self,
        kind: NodeKind,
        def: &'static MetadataDef,
    ) -> Result<Arc<dyn MetadataHandler>, MetadataError> {
        let provider = context::current_override().unwrap_or_else(|| self.provider.clone());
        debug!(def = def.name, ?kind, "revising metadata handler");
        provider.revise(kind, def)
    }

    /// Estimated number of rows produced by `node`.
    pub fn row_count(&mut self, node: &Arc<PlanNode>) -> Result<f64, MetadataError> {
        self.query_value(&ROW_COUNT, node, &[])?
            .as_double()
            .ok_or(MetadataError::TypeMismatch {
                def: ROW_COUNT.name,
            })
    }

    /// Fraction of `node`'s output that satisfies `predicate`, in [0.0, 1.0].
    pub fn selectivity(
        &mut self,
        node: &Arc<PlanNode>,
        predicate: &Expr,
    ) -> Result<f64, MetadataError> {
        self.query_value(
            &SELECTIVITY,
            node,
            &[MetadataArg::Pred(predicate.clone())],
        )?
        .as_double()
        .ok_or(MetadataError::TypeMismatch {
            def: SELECTIVITY.name,
        })
    }

    /// Base-table origins of `node`'s output column at ordinal `column`.
    ///
    /// An empty result means the origins are unknown (e.g., the column is
    /// synthesized), not that the column has no value.
    pub fn column_origins(
        &mut self,
        node: &Arc<PlanNode>,
        column: usize,
    ) -> Result<Vec<ColumnOrigin>, MetadataError> {
        self.query_value(&COLUMN_ORIGINS, node, &[MetadataArg::Column(column)])?
            .as_origins()
            .map(|o| o.to_vec())
            .ok_or(MetadataError::TypeMismatch {
                def: COLUMN_ORIGINS.name,
            })
    }

    /// Accumulated cost of computing `node` and its entire subtree.
    pub fn cumulative_cost(&mut self, node: &Arc<PlanNode>) -> Result<f64, MetadataError> {
        self.query_value(&CUMULATIVE_COST, node, &[])?
            .as_double()
            .ok_or(MetadataError::TypeMismatch {
                def: CUMULATIVE_COST.name,
            })
    }

    /// The cached handler reference for `def`, bootstrapping the unbound stub
    /// on first use.
    fn handler(&mut self, def: &'static MetadataDef) -> Arc<dyn MetadataHandler> {
        self.handlers
            .entry(def.name)
            .or_insert_with(|| initial_handler(def))
            .clone()
    }

    /// Shared cache-check / invoke / revise-and-retry protocol.
    fn query_value(
        &mut self,
        def: &'static MetadataDef,
        node: &Arc<PlanNode>,
        args: &[MetadataArg],
    ) -> Result<MetadataValue, MetadataError> {
        let mut key = Vec::with_capacity(args.len() + 1);
        key.push(MetadataArg::Def(def.name));
        key.extend_from_slice(args);

        if let Some(value) = self.cache.get(node.id(), &key) {
            trace!(def = def.name, node = %node.id(), "metadata cache hit");
            return Ok(value.clone());
        }

        let handler = self.handler(def);
        let value = match handler.invoke(node, self, args) {
            Ok(value) => value,
            Err(MetadataError::Unhandled(kind)) => {
                // First miss for this kind: extend coverage and retry once.
                let revised = self.revise(kind, def)?;
                self.handlers.insert(def.name, revised.clone());
                match revised.invoke(node, self, args) {
                    Ok(value) => value,
                    Err(MetadataError::Unhandled(kind)) => {
                        // Revision claimed success but the handler still has no
                        // coverage; surface as fatal rather than loop.
                        return Err(MetadataError::NoImplementation {
                            kind,
                            def: def.name,
                        });
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };

        self.cache.put(node.id(), key, value.clone());
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::override_provider;
    use crate::expr::TableRef;
    use crate::plan::PlanOp;
    use crate::provider::RegistryProvider;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn scan_node() -> Arc<PlanNode> {
        PlanNode::new(
            PlanOp::Scan {
                table: TableRef::new("s", "t"),
                columns: vec![],
                predicate: None,
            },
            vec![],
        )
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

    /// Counts invocations before delegating to a fixed answer.
    struct CountingHandler {
        invocations: Arc<AtomicUsize>,
        value: f64,
    }

    impl MetadataHandler for CountingHandler {
        fn def(&self) -> &'static MetadataDef {
            &ROW_COUNT
        }

        fn invoke(
            &self,
            _node: &Arc<PlanNode>,
            _mq: &mut MetadataQuery,
            _args: &[MetadataArg],
        ) -> Result<MetadataValue, MetadataError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            Ok(MetadataValue::Double(self.value))
        }
    }

    /// Counts revise calls before delegating to an inner provider.
    struct CountingProvider {
        inner: Arc<dyn MetadataProvider>,
        revisions: Arc<AtomicUsize>,
    }

    impl MetadataProvider for CountingProvider {
        fn revise(
            &self,
            kind: NodeKind,
            def: &'static MetadataDef,
        ) -> Result<Arc<dyn MetadataHandler>, MetadataError> {
            self.revisions.fetch_add(1, Ordering::SeqCst);
            self.inner.revise(kind, def)
        }
    }

    #[test]
    fn first_query_revises_then_answers() {
        let mut registry = RegistryProvider::new();
        registry.register(NodeKind::Scan, &ROW_COUNT, Arc::new(FixedDouble(123.0)));
        let mut mq = MetadataQuery::new(Arc::new(registry));

        let node = scan_node();
        assert_eq!(mq.row_count(&node).unwrap(), 123.0);
        assert_eq!(mq.cache().len(), 1);
    }

    #[test]
    fn revision_happens_once_per_kind_and_cache_absorbs_repeats() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let revisions = Arc::new(AtomicUsize::new(0));

        let mut registry = RegistryProvider::new();
        registry.register(
            NodeKind::Scan,
            &ROW_COUNT,
            Arc::new(CountingHandler {
                invocations: invocations.clone(),
                value: 5.0,
            }),
        );
        let provider = CountingProvider {
            inner: Arc::new(registry),
            revisions: revisions.clone(),
        };
        let mut mq = MetadataQuery::new(Arc::new(provider));

        let node = scan_node();
        assert_eq!(mq.row_count(&node).unwrap(), 5.0);
        assert_eq!(mq.row_count(&node).unwrap(), 5.0);
        assert_eq!(mq.row_count(&node).unwrap(), 5.0);

        // One revision to bind Scan; one computation; repeats served from cache.
        assert_eq!(revisions.load(Ordering::SeqCst), 1);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);

        // A second node of the same kind reuses the bound handler: no new
        // revision, but a fresh computation.
        let other = scan_node();
        assert_eq!(mq.row_count(&other).unwrap(), 5.0);
        assert_eq!(revisions.load(Ordering::SeqCst), 1);
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn missing_implementation_is_fatal_and_not_cached() {
        let mut mq = MetadataQuery::new(Arc::new(RegistryProvider::new()));
        let node = scan_node();

        assert!(matches!(
            mq.row_count(&node),
            Err(MetadataError::NoImplementation {
                kind: NodeKind::Scan,
                def: "rowCount",
            })
        ));
        assert!(mq.cache().is_empty());

        // A later override can still answer: the failure was not cached.
        let mut registry = RegistryProvider::new();
        registry.register(NodeKind::Scan, &ROW_COUNT, Arc::new(FixedDouble(9.0)));
        let overriding: Arc<dyn MetadataProvider> = Arc::new(registry);
        let _guard = override_provider(overriding);
        assert_eq!(mq.row_count(&node).unwrap(), 9.0);
    }

    #[test]
    fn clear_cache_forces_recomputation() {
        let invocations = Arc::new(AtomicUsize::new(0));
        let mut registry = RegistryProvider::new();
        registry.register(
            NodeKind::Scan,
            &ROW_COUNT,
            Arc::new(CountingHandler {
                invocations: invocations.clone(),
                value: 5.0,
            }),
        );
        let mut mq = MetadataQuery::new(Arc::new(registry));

        let node = scan_node();
        mq.row_count(&node).unwrap();
        mq.clear_cache(&node);
        mq.row_count(&node).unwrap();
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn thread_override_takes_precedence_and_releases() {
        let mut default_registry = RegistryProvider::new();
        default_registry.register(NodeKind::Scan, &ROW_COUNT, Arc::new(FixedDouble(1.0)));
        let mut mq = MetadataQuery::new(Arc::new(default_registry));

        let mut override_registry = RegistryProvider::new();
        override_registry.register(NodeKind::Scan, &ROW_COUNT, Arc::new(FixedDouble(2.0)));
        let overriding: Arc<dyn MetadataProvider> = Arc::new(override_registry);

        let first = scan_node();
        {
            let _guard = override_provider(overriding);
            assert_eq!(mq.row_count(&first).unwrap(), 2.0);
        }
        // The handler bound under the override keeps answering for this kind —
        // coverage never regresses — but new revisions use the default again.
        let second = scan_node();
        assert_eq!(mq.row_count(&second).unwrap(), 2.0);
    }

    struct FailingHandler;

    impl MetadataHandler for FailingHandler {
        fn def(&self) -> &'static MetadataDef {
            &ROW_COUNT
        }

        fn invoke(
            &self,
            _node: &Arc<PlanNode>,
            _mq: &mut MetadataQuery,
            _args: &[MetadataArg],
        ) -> Result<MetadataValue, MetadataError> {
            Err(MetadataError::Computation("stats backend offline".into()))
        }
    }

    #[test]
    fn computation_errors_propagate_unchanged_and_are_not_cached() {
        let mut registry = RegistryProvider::new();
        registry.register(NodeKind::Scan, &ROW_COUNT, Arc::new(FailingHandler));
        let mut mq = MetadataQuery::new(Arc::new(registry));

        let node = scan_node();
        assert!(matches!(
            mq.row_count(&node),
            Err(MetadataError::Computation(_))
        ));
        assert!(mq.cache().is_empty());
    }
}
