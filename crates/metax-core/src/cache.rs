//! # Metadata Result Cache
//!
//! Per-session table from (node, argument key) to previously computed metadata.
//! The cache exists so that rule authors can ask the same question repeatedly —
//! every costing pass asks for row counts of the same subtrees — without paying
//! for recomputation.
//!
//! ## Keying and Invalidation
//!
//! Entries are keyed by node *identity* plus the exact argument list of the
//! query (definition name first, then discriminators). Invalidation is
//! row-level only: [`MetadataCache::clear_row`] drops every entry for a node at
//! once, regardless of arguments. Transformation logic must clear a node's row
//! whenever its children or derivable properties change; there is no
//! finer-grained invalidation and no size-based eviction — growth is bounded by
//! session lifetime.
//!
//! ## Threading
//!
//! One cache belongs to one optimization session. All operations take
//! `&mut self`, so a single instance cannot be written from two threads without
//! external synchronization; confining one instance per thread is the intended
//! usage.

use crate::def::{MetadataArg, MetadataValue};
use crate::plan::NodeId;
use std::collections::HashMap;

/// Result cache with row-level invalidation.
///
/// Absence of an entry means "uncomputed or invalidated", never "known to be
/// undefined" — failed computations are not cached.
#[derive(Debug, Default)]
pub struct MetadataCache {
    rows: HashMap<NodeId, HashMap<Vec<MetadataArg>, MetadataValue>>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a previously computed result. Keys match exactly or not at all.
    pub fn get(&self, node: NodeId, key: &[MetadataArg]) -> Option<&MetadataValue> {
        self.rows.get(&node).and_then(|row| row.get(key))
    }

    /// Store a computed result, replacing any previous value under the same key.
    pub fn put(&mut self, node: NodeId, key: Vec<MetadataArg>, value: MetadataValue) {
        self.rows.entry(node).or_default().insert(key, value);
    }

    /// Remove every entry keyed by `node`, regardless of arguments.
    ///
    /// The next access for any key under this node recomputes.
    pub fn clear_row(&mut self, node: NodeId) {
        self.rows.remove(&node);
    }

    /// Total number of cached entries across all rows.
    pub fn len(&self) -> usize {
        self.rows.values().map(|row| row.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.values().all(|row| row.is_empty())
    }
}
