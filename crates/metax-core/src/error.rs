//! Error and control-signal types for metadata queries.
//!
//! `Unhandled` is not a failure: it is the signal that drives lazy dispatch.
//! A query method catches it exactly once, revises its handler, and retries.
//! Everything else in [`MetadataError`] is a genuine error surfaced to the caller.

use crate::plan::NodeKind;
use std::error::Error;

/// Errors produced by the metadata query core.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The currently bound handler has no coverage for this node kind.
    ///
    /// This is the control signal of the revise-and-retry protocol, raised by
    /// the unbound bootstrap stub and by dispatch composites that have not yet
    /// been extended to the kind. It must be handled by calling
    /// `MetadataQuery::revise` and retrying the invocation once.
    #[error("no handler bound for node kind {0:?}")]
    Unhandled(NodeKind),

    /// The provider cannot produce a handler for this (kind, definition) pair,
    /// or a freshly revised handler still signaled `Unhandled`.
    ///
    /// Unlike `Unhandled`, this is fatal: the metadata definition simply has no
    /// implementation for the node kind. It is never retried and never cached.
    #[error("no {def} implementation registered for node kind {kind:?}")]
    NoImplementation {
        kind: NodeKind,
        def: &'static str,
    },

    /// A handler returned a value whose variant does not match the result type
    /// of its metadata definition, or a query was invoked with malformed
    /// arguments for the definition.
    #[error("handler for {def} returned a mismatched value type")]
    TypeMismatch { def: &'static str },

    /// The concrete computation inside a bound handler failed.
    ///
    /// The core treats this as opaque: it propagates unchanged, is not retried,
    /// and is never cached as an answer.
    #[error("metadata computation failed: {0}")]
    Computation(#[source] Box<dyn Error + Send + Sync>),
}
