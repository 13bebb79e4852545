//! # Metadata Providers
//!
//! A provider produces and incrementally extends handlers for (node kind,
//! metadata definition) pairs. It is the sole extensibility point of the
//! dispatch machinery: supporting a new node kind means registering a handler
//! with a provider, never editing a switch over all kinds.
//!
//! ## Revision Contract
//!
//! `revise(kind, def)` returns a handler that answers `def` for `kind` *and*
//! for every kind previously revised through the same provider. Coverage is
//! monotonic: no revision ever removes a covered kind. Revising an already
//! covered pair is idempotent and returns the current composite unchanged.
//!
//! ## Sharing
//!
//! Providers are `Send + Sync` and may be shared across sessions and threads.
//! The fold state is a mutex-guarded map of immutable [`DispatchHandler`]
//! snapshots; concurrent revisions for the same pair may race to extend, but
//! the loser merely redoes work the winner already did — readers never observe
//! coverage going backwards.

use crate::def::MetadataDef;
use crate::error::MetadataError;
use crate::handler::{DispatchHandler, MetadataHandler};
use crate::plan::NodeKind;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Registry/factory that produces and extends metadata handlers.
pub trait MetadataProvider: Send + Sync {
    /// Obtain a handler answering `def` for `kind`, folded together with all
    /// coverage previously revised through this provider.
    ///
    /// Fails with [`MetadataError::NoImplementation`] when the provider cannot
    /// produce any handler for the pair.
    fn revise(
        &self,
        kind: NodeKind,
        def: &'static MetadataDef,
    ) -> Result<Arc<dyn MetadataHandler>, MetadataError>;
}

/// Ahead-of-time, explicitly populated provider.
///
/// Registrations are installed up front with [`RegistryProvider::register`]
/// and are immutable once the provider is shared. Revision only selects from
/// them; it never creates handlers out of thin air.
#[derive(Default)]
pub struct RegistryProvider {
    registrations: HashMap<(NodeKind, &'static str), Arc<dyn MetadataHandler>>,
    bound: Mutex<HashMap<&'static str, Arc<DispatchHandler>>>,
}

impl RegistryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` as the implementation of `def` for `kind`.
    ///
    /// Later registrations for the same pair replace earlier ones. This takes
    /// `&mut self`: populate the registry before wrapping it in an `Arc`.
    pub fn register(
        &mut self,
        kind: NodeKind,
        def: &'static MetadataDef,
        handler: Arc<dyn MetadataHandler>,
    ) {
        self.registrations.insert((kind, def.name), handler);
    }

    /// Whether an implementation is registered for the pair.
    pub fn is_registered(&self, kind: NodeKind, def: &'static MetadataDef) -> bool {
        self.registrations.contains_key(&(kind, def.name))
    }
}

impl MetadataProvider for RegistryProvider {
    fn revise(
        &self,
        kind: NodeKind,
        def: &'static MetadataDef,
    ) -> Result<Arc<dyn MetadataHandler>, MetadataError> {
        let mut bound = self.bound.lock();
        let current = bound
            .entry(def.name)
            .or_insert_with(|| Arc::new(DispatchHandler::new(def)));

        // Deduplicate: an already covered pair returns the existing composite.
        if current.covers(kind) {
            return Ok(current.clone());
        }

        let registration = self
            .registrations
            .get(&(kind, def.name))
            .cloned()
            .ok_or(MetadataError::NoImplementation {
                kind,
                def: def.name,
            })?;

        let extended = Arc::new(current.extended(kind, registration));
        *current = extended.clone();
        Ok(extended)
    }
}

/// Provider that consults an ordered list of providers.
///
/// Revision asks each provider in order and folds the first success into its
/// own composite, so coverage obtained from different links of the chain
/// accumulates into a single monotonically growing handler. A pair no link can
/// answer fails with `NoImplementation`.
pub struct ChainedProvider {
    providers: Vec<Arc<dyn MetadataProvider>>,
    bound: Mutex<HashMap<&'static str, Arc<DispatchHandler>>>,
}

impl ChainedProvider {
    pub fn new(providers: Vec<Arc<dyn MetadataProvider>>) -> Self {
        Self {
            providers,
            bound: Mutex::new(HashMap::new()),
        }
    }
}

impl MetadataProvider for ChainedProvider {
    fn revise(
        &self,
        kind: NodeKind,
        def: &'static MetadataDef,
    ) -> Result<Arc<dyn MetadataHandler>, MetadataError> {
        let mut bound = self.bound.lock();
        let current = bound
            .entry(def.name)
            .or_insert_with(|| Arc::new(DispatchHandler::new(def)));

        if current.covers(kind) {
            return Ok(current.clone());
        }

        for provider in &self.providers {
            match provider.revise(kind, def) {
                Ok(handler) => {
                    let extended = Arc::new(current.extended(kind, handler));
                    *current = extended.clone();
                    return Ok(extended);
                }
                // This link has no implementation; try the next one.
                Err(MetadataError::NoImplementation { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(MetadataError::NoImplementation {
            kind,
            def: def.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::def::{MetadataArg, MetadataValue, ROW_COUNT, SELECTIVITY};
    use crate::expr::TableRef;
    use crate::plan::{PlanNode, PlanOp};
    use crate::query::MetadataQuery;

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

    #[test]
    fn revise_fails_without_registration() {
        let provider = RegistryProvider::new();
        match provider.revise(NodeKind::Scan, &ROW_COUNT) {
            Err(MetadataError::NoImplementation { kind, def }) => {
                assert_eq!(kind, NodeKind::Scan);
                assert_eq!(def, "rowCount");
            }
            Ok(_) => panic!("expected NoImplementation, got Ok(handler)"),
            Err(other) => panic!("expected NoImplementation, got {other:?}"),
        }
    }

    #[test]
    fn revise_is_idempotent_for_covered_pairs() {
        let mut provider = RegistryProvider::new();
        provider.register(NodeKind::Scan, &ROW_COUNT, Arc::new(FixedDouble(3.0)));

        let first = provider.revise(NodeKind::Scan, &ROW_COUNT).unwrap();
        let second = provider.revise(NodeKind::Scan, &ROW_COUNT).unwrap();

        let mut mq = MetadataQuery::new(Arc::new(RegistryProvider::new()));
        let node = scan_node();
        assert_eq!(
            first.invoke(&node, &mut mq, &[]).unwrap(),
            MetadataValue::Double(3.0)
        );
        assert_eq!(
            second.invoke(&node, &mut mq, &[]).unwrap(),
            MetadataValue::Double(3.0)
        );
        // Same composite, not a rebuilt one.
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn coverage_accumulates_across_revisions() {
        let mut provider = RegistryProvider::new();
        provider.register(NodeKind::Scan, &ROW_COUNT, Arc::new(FixedDouble(1.0)));
        provider.register(NodeKind::Filter, &ROW_COUNT, Arc::new(FixedDouble(2.0)));

        provider.revise(NodeKind::Scan, &ROW_COUNT).unwrap();
        let after_filter = provider.revise(NodeKind::Filter, &ROW_COUNT).unwrap();

        // The second revision still covers the first kind.
        let mut mq = MetadataQuery::new(Arc::new(RegistryProvider::new()));
        let node = scan_node();
        assert_eq!(
            after_filter.invoke(&node, &mut mq, &[]).unwrap(),
            MetadataValue::Double(1.0)
        );
    }

    #[test]
    fn coverage_is_tracked_per_definition() {
        let mut provider = RegistryProvider::new();
        provider.register(NodeKind::Scan, &ROW_COUNT, Arc::new(FixedDouble(1.0)));

        provider.revise(NodeKind::Scan, &ROW_COUNT).unwrap();
        // Same kind under a different definition is still unregistered.
        assert!(matches!(
            provider.revise(NodeKind::Scan, &SELECTIVITY),
            Err(MetadataError::NoImplementation { .. })
        ));
    }

    #[test]
    fn chained_provider_falls_through_links_in_order() {
        let mut first = RegistryProvider::new();
        first.register(NodeKind::Scan, &ROW_COUNT, Arc::new(FixedDouble(10.0)));
        let mut second = RegistryProvider::new();
        second.register(NodeKind::Scan, &ROW_COUNT, Arc::new(FixedDouble(99.0)));
        second.register(NodeKind::Filter, &ROW_COUNT, Arc::new(FixedDouble(20.0)));

        let chained = ChainedProvider::new(vec![Arc::new(first), Arc::new(second)]);

        let mut mq = MetadataQuery::new(Arc::new(RegistryProvider::new()));
        let node = scan_node();

        // Scan resolves from the first link even though the second also has it.
        let h = chained.revise(NodeKind::Scan, &ROW_COUNT).unwrap();
        assert_eq!(
            h.invoke(&node, &mut mq, &[]).unwrap(),
            MetadataValue::Double(10.0)
        );

        // Filter falls through to the second link, and the fold keeps Scan coverage.
        let h = chained.revise(NodeKind::Filter, &ROW_COUNT).unwrap();
        assert_eq!(
            h.invoke(&node, &mut mq, &[]).unwrap(),
            MetadataValue::Double(10.0)
        );

        assert!(matches!(
            chained.revise(NodeKind::Join, &ROW_COUNT),
            Err(MetadataError::NoImplementation { .. })
        ));
    }
}
