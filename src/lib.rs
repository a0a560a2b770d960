//! NeuCAD - Kernel-Side Graph View Widget
//!
//! This crate is the kernel half of the NeuCAD notebook widget: it snapshots
//! attributed graphs into the wire document the front-end renders and keeps
//! the display state synchronized over a message channel.
//!
//! ## Data Flow
//! Graph source -> snapshot -> `GraphData` -> `Open`/`Update` messages -> front-end
//!
//! ## Quick Start
//!
//! ```rust
//! use neucad::{AttrGraph, ChannelSink, NeuCad, SyncMessage};
//!
//! let mut graph = AttrGraph::directed();
//! graph.add_node("a");
//! graph.add_edge("a", "b");
//!
//! let (sink, receiver) = ChannelSink::unbounded();
//! let mut widget = NeuCad::builder().height(650).sink(sink).build(&graph)?;
//!
//! // Construction announces the complete state once.
//! assert!(matches!(receiver.try_recv()?, SyncMessage::Open { .. }));
//!
//! // Setters publish single-field updates.
//! widget.set_start_layout(true);
//! assert!(matches!(receiver.try_recv()?, SyncMessage::Update { .. }));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Core error handling
pub mod error;

// Graph sources and the owned attribute graph
pub mod graph;

// The synchronized graph document
pub mod data;

// Display defaults and control-panel settings
pub mod settings;

// State synchronization protocol and sinks
pub mod sync;

// The widget view model
pub mod widget;

// GEXF document parsing
pub mod gexf;

// Public re-exports for the common surface
pub use data::{EdgeRecord, GraphData, NodeRecord};
pub use error::WidgetError;
pub use gexf::{parse_gexf, parse_gexf_file, parse_gexf_str, GexfError};
pub use graph::{AttrGraph, AttrMap, GraphSource};
pub use settings::{
    control_panel_defaults, DEFAULT_HEIGHT, DEFAULT_LAYOUT_ALG, LAYOUT_CIRCULAR,
    LAYOUT_FORCE_ATLAS, LAYOUT_RANDOM,
};
pub use sync::{ChannelSink, FnSink, StatePatch, SyncMessage, SyncSink};
pub use widget::{NeuCad, NeuCadBuilder, NodeSizeMode};
