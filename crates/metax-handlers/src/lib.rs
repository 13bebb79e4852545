//! # Built-in Metadata Handlers
//!
//! This crate provides the default handler implementations for the metadata
//! definitions shipped by `metax-core`:
//!
//! - **`row_count`**: Cardinality derivation — catalog row counts at scans,
//!   selectivity scaling through filters, the equi-join NDV formula at joins,
//!   group-key NDV products at aggregates.
//! - **`selectivity`**: Predicate selectivity — NDV-based equality estimates,
//!   the 1/3 range heuristic, null-fraction estimates for IS NULL, and
//!   combination rules for AND/OR/NOT.
//! - **`column_origins`**: Traces output columns back to base-table columns,
//!   marking columns that pass through expressions or aggregate functions as
//!   derived.
//! - **`cost`**: Cumulative cost as an additive accumulation of per-node row
//!   processing over the subtree.
//!
//! [`default_metadata_provider`] wires all of them into a registry covering
//! every logical node kind. Deployments with custom operators register
//! additional handlers on the returned registry, or chain their own provider
//! in front of it.

pub mod column_origins;
pub mod cost;
pub mod lookup;
pub mod row_count;
pub mod selectivity;

use metax_core::catalog::Catalog;
use metax_core::def::{COLUMN_ORIGINS, CUMULATIVE_COST, ROW_COUNT, SELECTIVITY};
use metax_core::handler::MetadataHandler;
use metax_core::plan::NodeKind;
use metax_core::provider::RegistryProvider;
use std::sync::Arc;

/// Create a registry provider with all built-in handlers.
///
/// Each handler is registered once per logical node kind, so coverage is still
/// extended kind by kind as queries demand it.
pub fn default_metadata_provider(catalog: Arc<dyn Catalog>) -> RegistryProvider {
    let mut provider = RegistryProvider::new();

    let row_count: Arc<dyn MetadataHandler> =
        Arc::new(row_count::RowCountRules::new(catalog.clone()));
    let selectivity: Arc<dyn MetadataHandler> =
        Arc::new(selectivity::SelectivityRules::new(catalog.clone()));
    let origins: Arc<dyn MetadataHandler> = Arc::new(column_origins::ColumnOriginRules);
    let cost: Arc<dyn MetadataHandler> = Arc::new(cost::CostRules::new(catalog));

    for kind in NodeKind::ALL {
        provider.register(kind, &ROW_COUNT, row_count.clone());
        provider.register(kind, &SELECTIVITY, selectivity.clone());
        provider.register(kind, &COLUMN_ORIGINS, origins.clone());
        provider.register(kind, &CUMULATIVE_COST, cost.clone());
    }

    provider
}
