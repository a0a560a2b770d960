//! Typed failure model for the widget.
//!
//! Every fallible operation in the crate maps to exactly one `WidgetError`
//! variant:
//!
//! ```text
//! dynamic document rejected -> InvalidGraphKind
//! attrs not JSON-encodable  -> Serialization
//! GEXF reader failed        -> Parse (the GexfError, surfaced unchanged)
//! ```
//!
//! ## Rules
//!
//! - `thiserror` for enum derivation; no manual `Display` impls.
//! - No `.unwrap()` in this module.
//! - Messages name the node id, edge pair, field, or element involved so
//!   the failure can be traced back to the input.

use crate::gexf::GexfError;

// ---------------------------------------------------------------------------
// WidgetError - the top-level error type
// ---------------------------------------------------------------------------

/// All failure modes of widget construction and state synchronization.
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    /// The value offered as a graph document does not have the required
    /// shape (node list, edge list, directed flag). Only the dynamic
    /// document path can produce this; typed graph sources are shaped by
    /// construction.
    #[error("not a usable graph document: {reason}")]
    InvalidGraphKind { reason: String },

    /// A node or edge attribute set cannot be represented in the
    /// synchronized JSON state.
    #[error("cannot serialize {context} into the synchronized state: {reason}")]
    Serialization { context: String, reason: String },

    /// GEXF parsing failed.
    #[error(transparent)]
    Parse(#[from] GexfError),
}

impl WidgetError {
    /// An `InvalidGraphKind` with the given reason.
    pub fn invalid_graph(reason: impl Into<String>) -> Self {
        Self::InvalidGraphKind {
            reason: reason.into(),
        }
    }

    /// A `Serialization` error for the named node, edge, or field.
    pub fn serialization(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Serialization {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}
