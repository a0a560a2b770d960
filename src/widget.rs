//! The NeuCad widget: kernel-side view model of the graph display.
//!
//! The widget owns the synchronized fields the front-end renders from and
//! the protocol that keeps both sides in step:
//!
//! ```text
//! NeuCadBuilder::build(&graph)
//!         │  snapshot + overlay defaults
//!         ▼
//!      NeuCad ──────Open{full state}──────▶ SyncSink ──▶ front-end
//!         │
//!         ├─ set_height(650) ──Update{"height":650}──▶
//!         │
//!         ◀─ apply_remote(Update{…}) ── (no echo) ── front-end edits
//! ```
//!
//! Field changes go out as single-field `Update`s; inbound messages are
//! applied without re-publishing. Unknown inbound fields are kept in the
//! `extra` map and travel with the full state, so front-end additions this
//! crate predates keep working.

use std::fmt;
use std::io::BufRead;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::data::{json_kind, GraphData};
use crate::error::WidgetError;
use crate::gexf;
use crate::graph::{AttrMap, GraphSource};
use crate::settings::{control_panel_defaults, overlay, DEFAULT_HEIGHT, DEFAULT_LAYOUT_ALG};
use crate::sync::{StatePatch, SyncMessage, SyncSink};

// =============================================================================
// FRONT-END CONTRACT
// =============================================================================

/// Module metadata announced with the full state so the notebook can locate
/// the view implementation. These strings must match the front-end package.
pub const VIEW_NAME: &str = "NeuCADView";
pub const MODEL_NAME: &str = "NeuCADModel";
pub const MODULE_NAME: &str = "ipyneuCAD";
pub const MODULE_VERSION: &str = "^0.1.0";

/// Wire names of the synchronized fields.
pub mod field {
    pub const LAYOUT_ALG: &str = "layoutAlg";
    pub const DATA: &str = "data";
    pub const HEIGHT: &str = "height";
    pub const START_LAYOUT: &str = "start_layout";
    pub const GUI_SETTINGS: &str = "datGUISettings";
    pub const NODE_SIZE: &str = "nodeSize";
}

/// How the front-end scales node circles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NodeSizeMode {
    #[default]
    #[serde(rename = "degree")]
    Degree,
    #[serde(rename = "inDegree")]
    InDegree,
    #[serde(rename = "outDegree")]
    OutDegree,
}

impl NodeSizeMode {
    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Degree => "degree",
            Self::InDegree => "inDegree",
            Self::OutDegree => "outDegree",
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "degree" => Some(Self::Degree),
            "inDegree" => Some(Self::InDegree),
            "outDegree" => Some(Self::OutDegree),
            _ => None,
        }
    }
}

fn is_reserved_field(key: &str) -> bool {
    matches!(
        key,
        field::LAYOUT_ALG
            | field::DATA
            | field::HEIGHT
            | field::START_LAYOUT
            | field::GUI_SETTINGS
            | field::NODE_SIZE
    ) || key.starts_with("_view")
        || key.starts_with("_model")
}

// =============================================================================
// WIDGET
// =============================================================================

/// Kernel-side graph view widget.
///
/// Holds the synchronized display state and a deep snapshot of the graph.
/// Every setter publishes one single-field `Update`; `attach` announces the
/// complete state with one `Open`. Without a sink the widget is a plain
/// value and setters just mutate.
pub struct NeuCad {
    model_id: Uuid,
    layout_alg: String,
    data: GraphData,
    height: u32,
    start_layout: bool,
    gui_settings: AttrMap,
    node_size: NodeSizeMode,
    extra: StatePatch,
    sink: Option<Box<dyn SyncSink>>,
}

impl fmt::Debug for NeuCad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NeuCad")
            .field("model_id", &self.model_id)
            .field("layout_alg", &self.layout_alg)
            .field("height", &self.height)
            .field("start_layout", &self.start_layout)
            .field("node_size", &self.node_size)
            .field("nodes", &self.data.node_count())
            .field("edges", &self.data.edge_count())
            .finish_non_exhaustive()
    }
}

impl NeuCad {
    pub fn builder() -> NeuCadBuilder {
        NeuCadBuilder::new()
    }

    /// A widget with all defaults, snapshotting the given graph.
    pub fn new<G: GraphSource>(graph: &G) -> Result<Self, WidgetError> {
        Self::builder().build(graph)
    }

    /// A widget with all defaults over a parsed GEXF document.
    pub fn from_gexf<R: BufRead>(reader: R) -> Result<Self, WidgetError> {
        Self::builder().build_from_gexf(reader)
    }

    /// A widget with all defaults over a GEXF file on disk.
    pub fn from_gexf_path(path: impl AsRef<Path>) -> Result<Self, WidgetError> {
        Self::builder().build_from_gexf_path(path)
    }

    // -- Synchronized field access --

    /// Channel identity of this widget instance.
    pub fn model_id(&self) -> Uuid {
        self.model_id
    }

    pub fn layout_alg(&self) -> &str {
        &self.layout_alg
    }

    pub fn data(&self) -> &GraphData {
        &self.data
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn start_layout(&self) -> bool {
        self.start_layout
    }

    pub fn gui_settings(&self) -> &AttrMap {
        &self.gui_settings
    }

    pub fn node_size(&self) -> NodeSizeMode {
        self.node_size
    }

    /// Pass-through state this crate does not type.
    pub fn extra(&self) -> &StatePatch {
        &self.extra
    }

    // -- Setters: mutate, then publish one single-field update --

    /// Unknown layout names are passed through; the front-end falls back
    /// with a console warning.
    pub fn set_layout_alg(&mut self, alg: impl Into<String>) {
        self.layout_alg = alg.into();
        self.publish_field(field::LAYOUT_ALG, Value::String(self.layout_alg.clone()));
    }

    /// Re-snapshot a graph into the widget.
    pub fn set_data<G: GraphSource>(&mut self, graph: &G) -> Result<(), WidgetError> {
        let data = GraphData::snapshot(graph)?;
        self.replace_data(data);
        Ok(())
    }

    /// Adopt an already-built document.
    pub fn replace_data(&mut self, data: GraphData) {
        self.data = data;
        self.publish_field(field::DATA, self.data.to_value());
    }

    pub fn set_height(&mut self, pixels: u32) {
        self.height = pixels;
        self.publish_field(field::HEIGHT, Value::from(pixels));
    }

    pub fn set_start_layout(&mut self, on: bool) {
        self.start_layout = on;
        self.publish_field(field::START_LAYOUT, Value::Bool(on));
    }

    pub fn set_node_size(&mut self, mode: NodeSizeMode) {
        self.node_size = mode;
        self.publish_field(field::NODE_SIZE, Value::String(mode.as_wire().into()));
    }

    /// Insert or replace one control-panel key.
    pub fn set_gui_setting(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.gui_settings.insert(key.into(), value.into());
        self.publish_field(field::GUI_SETTINGS, Value::Object(self.gui_settings.clone()));
    }

    /// Replace the whole control-panel map.
    pub fn replace_gui_settings(&mut self, settings: AttrMap) {
        self.gui_settings = settings;
        self.publish_field(field::GUI_SETTINGS, Value::Object(self.gui_settings.clone()));
    }

    /// Set a pass-through synced field. Reserved wire names are ignored
    /// with a warning; they have typed setters.
    pub fn set_state_override(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        if is_reserved_field(&key) {
            tracing::warn!(field = %key, "reserved field name ignored as state override");
            return;
        }
        let value = value.into();
        self.extra.insert(key.clone(), value.clone());
        if let Some(sink) = self.sink.as_mut() {
            sink.publish(SyncMessage::single(key, value));
        }
    }

    // -- Channel binding --

    /// Install a sink and announce the complete state with one `Open`.
    /// An already-attached sink is replaced.
    pub fn attach(&mut self, sink: impl SyncSink + 'static) {
        self.sink = Some(Box::new(sink));
        let state = self.full_state();
        self.publish(SyncMessage::Open { state });
    }

    /// Remove and return the sink, leaving the widget unpublished.
    pub fn detach(&mut self) -> Option<Box<dyn SyncSink>> {
        self.sink.take()
    }

    /// The complete wire state: module metadata, every synchronized field
    /// under its wire name, and the pass-through extras. Reserved names
    /// cannot be shadowed by extras.
    pub fn full_state(&self) -> StatePatch {
        let mut state = self.extra.clone();
        state.insert("_model_module".into(), MODULE_NAME.into());
        state.insert("_model_module_version".into(), MODULE_VERSION.into());
        state.insert("_model_name".into(), MODEL_NAME.into());
        state.insert("_view_module".into(), MODULE_NAME.into());
        state.insert("_view_module_version".into(), MODULE_VERSION.into());
        state.insert("_view_name".into(), VIEW_NAME.into());
        state.insert(field::LAYOUT_ALG.into(), self.layout_alg.clone().into());
        state.insert(field::DATA.into(), self.data.to_value());
        state.insert(field::HEIGHT.into(), self.height.into());
        state.insert(field::START_LAYOUT.into(), self.start_layout.into());
        state.insert(
            field::GUI_SETTINGS.into(),
            Value::Object(self.gui_settings.clone()),
        );
        state.insert(field::NODE_SIZE.into(), self.node_size.as_wire().into());
        state
    }

    /// Apply an inbound message without echoing it back out.
    ///
    /// Returns the wire names of the typed fields that changed. Unknown
    /// fields land in `extra` (not reported). `RequestState` is the one
    /// inbound message that publishes: it answers with the full state.
    pub fn apply_remote(
        &mut self,
        message: SyncMessage,
    ) -> Result<Vec<&'static str>, WidgetError> {
        match message {
            SyncMessage::Update { state } | SyncMessage::Open { state } => self.apply_state(state),
            SyncMessage::RequestState => {
                let state = self.full_state();
                self.publish(SyncMessage::Update { state });
                Ok(Vec::new())
            }
        }
    }

    fn apply_state(&mut self, state: StatePatch) -> Result<Vec<&'static str>, WidgetError> {
        tracing::debug!(fields = state.len(), "applying inbound state");
        let mut applied = Vec::new();
        for (key, value) in state {
            match key.as_str() {
                field::LAYOUT_ALG => {
                    self.layout_alg = expect_string(field::LAYOUT_ALG, value)?;
                    applied.push(field::LAYOUT_ALG);
                }
                field::DATA => {
                    self.data = GraphData::from_value(value)?;
                    applied.push(field::DATA);
                }
                field::HEIGHT => {
                    self.height = expect_u32(field::HEIGHT, value)?;
                    applied.push(field::HEIGHT);
                }
                field::START_LAYOUT => {
                    self.start_layout = expect_bool(field::START_LAYOUT, value)?;
                    applied.push(field::START_LAYOUT);
                }
                field::GUI_SETTINGS => {
                    self.gui_settings = expect_object(field::GUI_SETTINGS, value)?;
                    applied.push(field::GUI_SETTINGS);
                }
                field::NODE_SIZE => {
                    self.node_size = expect_node_size(value)?;
                    applied.push(field::NODE_SIZE);
                }
                _ => {
                    tracing::debug!(field = %key, "unknown synced field kept as extra state");
                    self.extra.insert(key, value);
                }
            }
        }
        Ok(applied)
    }

    fn publish(&mut self, message: SyncMessage) {
        if let Some(sink) = self.sink.as_mut() {
            sink.publish(message);
        }
    }

    fn publish_field(&mut self, field: &'static str, value: Value) {
        tracing::trace!(field, "publishing state update");
        self.publish(SyncMessage::single(field, value));
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Construction-time options, mirroring the keyword arguments the widget
/// historically took. Everything defaults; `build` snapshots the graph and
/// publishes the `Open` if a sink was supplied.
pub struct NeuCadBuilder {
    layout_alg: String,
    height: u32,
    start_layout: bool,
    gui_overrides: AttrMap,
    node_size: NodeSizeMode,
    extra: StatePatch,
    sink: Option<Box<dyn SyncSink>>,
}

impl Default for NeuCadBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NeuCadBuilder {
    pub fn new() -> Self {
        Self {
            layout_alg: DEFAULT_LAYOUT_ALG.to_string(),
            height: DEFAULT_HEIGHT,
            start_layout: false,
            gui_overrides: AttrMap::new(),
            node_size: NodeSizeMode::default(),
            extra: StatePatch::new(),
            sink: None,
        }
    }

    pub fn layout_alg(mut self, alg: impl Into<String>) -> Self {
        self.layout_alg = alg.into();
        self
    }

    pub fn height(mut self, pixels: u32) -> Self {
        self.height = pixels;
        self
    }

    pub fn start_layout(mut self, on: bool) -> Self {
        self.start_layout = on;
        self
    }

    /// One control-panel override. Applied on top of fresh defaults at
    /// build time; unknown keys are kept.
    pub fn gui_setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.gui_overrides.insert(key.into(), value.into());
        self
    }

    /// A batch of control-panel overrides.
    pub fn gui_settings(mut self, overrides: AttrMap) -> Self {
        self.gui_overrides.extend(overrides);
        self
    }

    pub fn node_size(mut self, mode: NodeSizeMode) -> Self {
        self.node_size = mode;
        self
    }

    /// A pass-through synced field. Reserved wire names are ignored with a
    /// warning; they have dedicated builder methods.
    pub fn state_override(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if is_reserved_field(&key) {
            tracing::warn!(field = %key, "reserved field name ignored as state override");
            return self;
        }
        self.extra.insert(key, value.into());
        self
    }

    pub fn sink(mut self, sink: impl SyncSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Snapshot the graph and build the widget. On snapshot failure no
    /// widget exists and nothing was published.
    pub fn build<G: GraphSource>(self, graph: &G) -> Result<NeuCad, WidgetError> {
        let data = GraphData::snapshot(graph)?;
        Ok(self.assemble(data))
    }

    /// Adopt an already-validated document without re-snapshotting.
    pub fn build_from_data(self, data: GraphData) -> NeuCad {
        self.assemble(data)
    }

    /// Parse GEXF and build, honoring every builder option. Parse errors
    /// surface unchanged under `WidgetError::Parse`.
    pub fn build_from_gexf<R: BufRead>(self, reader: R) -> Result<NeuCad, WidgetError> {
        let graph = gexf::parse_gexf(reader)?;
        self.build(&graph)
    }

    /// Parse a GEXF file from disk and build.
    pub fn build_from_gexf_path(self, path: impl AsRef<Path>) -> Result<NeuCad, WidgetError> {
        let graph = gexf::parse_gexf_file(path)?;
        self.build(&graph)
    }

    fn assemble(self, data: GraphData) -> NeuCad {
        let mut gui_settings = control_panel_defaults();
        overlay(&mut gui_settings, &self.gui_overrides);

        let mut widget = NeuCad {
            model_id: Uuid::new_v4(),
            layout_alg: self.layout_alg,
            data,
            height: self.height,
            start_layout: self.start_layout,
            gui_settings,
            node_size: self.node_size,
            extra: self.extra,
            sink: self.sink,
        };
        tracing::debug!(
            model_id = %widget.model_id,
            nodes = widget.data.node_count(),
            edges = widget.data.edge_count(),
            "widget constructed"
        );
        if widget.sink.is_some() {
            let state = widget.full_state();
            widget.publish(SyncMessage::Open { state });
        }
        widget
    }
}

// =============================================================================
// INBOUND FIELD DECODING
// =============================================================================

fn inbound_context(field: &'static str) -> String {
    format!("field `{field}` from the front-end")
}

fn expect_string(field: &'static str, value: Value) -> Result<String, WidgetError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(WidgetError::serialization(
            inbound_context(field),
            format!("expected a string, got {}", json_kind(&other)),
        )),
    }
}

fn expect_bool(field: &'static str, value: Value) -> Result<bool, WidgetError> {
    match value {
        Value::Bool(flag) => Ok(flag),
        other => Err(WidgetError::serialization(
            inbound_context(field),
            format!("expected a boolean, got {}", json_kind(&other)),
        )),
    }
}

fn expect_u32(field: &'static str, value: Value) -> Result<u32, WidgetError> {
    let number = match &value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        _ => None,
    };
    number.ok_or_else(|| {
        WidgetError::serialization(
            inbound_context(field),
            format!("expected an unsigned integer, got {}", json_kind(&value)),
        )
    })
}

fn expect_object(field: &'static str, value: Value) -> Result<AttrMap, WidgetError> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(WidgetError::serialization(
            inbound_context(field),
            format!("expected an object, got {}", json_kind(&other)),
        )),
    }
}

fn expect_node_size(value: Value) -> Result<NodeSizeMode, WidgetError> {
    let mode = match &value {
        Value::String(raw) => NodeSizeMode::from_wire(raw),
        _ => None,
    };
    mode.ok_or_else(|| {
        WidgetError::serialization(
            inbound_context(field::NODE_SIZE),
            "expected one of `degree`, `inDegree`, `outDegree`".to_string(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::AttrGraph;
    use crate::settings::LAYOUT_CIRCULAR;
    use crate::sync::ChannelSink;
    use crossbeam_channel::Receiver;
    use serde_json::json;

    fn sample_graph() -> AttrGraph {
        let mut g = AttrGraph::directed();
        g.add_node("a").insert("label".into(), json!("Alpha"));
        g.add_edge("a", "b").insert("weight".into(), json!(1.0));
        g
    }

    fn wired_widget() -> (NeuCad, Receiver<SyncMessage>) {
        let (sink, receiver) = ChannelSink::unbounded();
        let widget = NeuCad::builder()
            .sink(sink)
            .build(&sample_graph())
            .unwrap();
        (widget, receiver)
    }

    /// Drain and return the construction-time Open state.
    fn drain_open(receiver: &Receiver<SyncMessage>) -> StatePatch {
        match receiver.try_recv().unwrap() {
            SyncMessage::Open { state } => state,
            other => panic!("expected Open first, got {other:?}"),
        }
    }

    #[test]
    fn defaults_match_the_front_end_contract() {
        let widget = NeuCad::new(&AttrGraph::undirected()).unwrap();
        assert_eq!(widget.layout_alg(), "FA");
        assert_eq!(widget.height(), 500);
        assert!(!widget.start_layout());
        assert_eq!(widget.node_size(), NodeSizeMode::Degree);
        assert_eq!(widget.gui_settings()["autoPlace"], json!(false));
        assert_eq!(widget.gui_settings()["closeOnTop"], json!(true));
    }

    #[test]
    fn builder_overlays_gui_settings_on_fresh_defaults() {
        let widget = NeuCad::builder()
            .gui_setting("closeOnTop", false)
            .gui_setting("width", 320)
            .build(&sample_graph())
            .unwrap();

        let gui = widget.gui_settings();
        assert_eq!(gui["closeOnTop"], json!(false), "override wins");
        assert_eq!(gui["width"], json!(320), "unknown key kept");
        assert_eq!(gui["autoPlace"], json!(false), "default survives");
    }

    #[test]
    fn gui_settings_are_not_shared_between_instances() {
        let mut first = NeuCad::new(&AttrGraph::directed()).unwrap();
        first.set_gui_setting("resizable", false);

        let second = NeuCad::new(&AttrGraph::directed()).unwrap();
        assert_eq!(second.gui_settings()["resizable"], json!(true));
    }

    #[test]
    fn construction_publishes_exactly_one_open_with_full_state() {
        let (_widget, receiver) = wired_widget();

        let state = drain_open(&receiver);
        assert!(receiver.try_recv().is_err(), "only the Open is published");

        assert_eq!(state["_view_name"], json!(VIEW_NAME));
        assert_eq!(state["_model_name"], json!(MODEL_NAME));
        assert_eq!(state["_view_module"], json!(MODULE_NAME));
        assert_eq!(state["layoutAlg"], json!("FA"));
        assert_eq!(state["height"], json!(500));
        assert_eq!(state["start_layout"], json!(false));
        assert_eq!(state["nodeSize"], json!("degree"));
        assert_eq!(state["data"]["directed"], json!(true));
        assert_eq!(state["data"]["nodes"][0][0], json!("a"));
        assert_eq!(state["datGUISettings"]["scrollable"], json!(false));
    }

    #[test]
    fn widgets_without_a_sink_publish_nothing_until_attached() {
        let mut widget = NeuCad::new(&sample_graph()).unwrap();
        widget.set_height(640);
        widget.set_layout_alg(LAYOUT_CIRCULAR);

        let (sink, receiver) = ChannelSink::unbounded();
        widget.attach(sink);

        let state = drain_open(&receiver);
        assert_eq!(state["height"], json!(640), "Open carries current values");
        assert_eq!(state["layoutAlg"], json!("circular"));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn setters_publish_single_field_updates() {
        let (mut widget, receiver) = wired_widget();
        drain_open(&receiver);

        widget.set_height(650);
        widget.set_start_layout(true);
        widget.set_node_size(NodeSizeMode::InDegree);

        assert_eq!(
            receiver.try_recv().unwrap(),
            SyncMessage::single("height", json!(650))
        );
        assert_eq!(
            receiver.try_recv().unwrap(),
            SyncMessage::single("start_layout", json!(true))
        );
        assert_eq!(
            receiver.try_recv().unwrap(),
            SyncMessage::single("nodeSize", json!("inDegree"))
        );
    }

    #[test]
    fn set_data_republishes_the_document() {
        let (mut widget, receiver) = wired_widget();
        drain_open(&receiver);

        let mut bigger = sample_graph();
        bigger.add_node("c");
        widget.set_data(&bigger).unwrap();

        let msg = receiver.try_recv().unwrap();
        let state = msg.state().unwrap();
        assert_eq!(state.len(), 1);
        assert_eq!(state["data"]["nodes"][2][0], json!("c"));
        assert_eq!(widget.data().node_count(), 3);
    }

    #[test]
    fn apply_remote_updates_fields_without_echo() {
        let (mut widget, receiver) = wired_widget();
        drain_open(&receiver);

        let mut state = StatePatch::new();
        state.insert("height".into(), json!(720));
        state.insert("layoutAlg".into(), json!("random"));
        let applied = widget.apply_remote(SyncMessage::Update { state }).unwrap();

        assert_eq!(widget.height(), 720);
        assert_eq!(widget.layout_alg(), "random");
        assert_eq!(applied.len(), 2);
        assert!(applied.contains(&"height"));
        assert!(receiver.try_recv().is_err(), "inbound updates must not echo");
    }

    #[test]
    fn apply_remote_decodes_inbound_data_documents() {
        let (mut widget, receiver) = wired_widget();
        drain_open(&receiver);

        let mut state = StatePatch::new();
        state.insert(
            "data".into(),
            json!({"nodes": [["x", {}]], "edges": [], "directed": false}),
        );
        widget.apply_remote(SyncMessage::Update { state }).unwrap();

        assert_eq!(widget.data().node_count(), 1);
        assert!(!widget.data().directed);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn apply_remote_rejects_malformed_data_as_invalid_graph() {
        let mut widget = NeuCad::new(&sample_graph()).unwrap();

        let mut state = StatePatch::new();
        state.insert("data".into(), json!({"nodes": "oops"}));
        let err = widget
            .apply_remote(SyncMessage::Update { state })
            .unwrap_err();

        assert!(matches!(err, WidgetError::InvalidGraphKind { .. }));
    }

    #[test]
    fn apply_remote_rejects_wrong_field_types() {
        let mut widget = NeuCad::new(&sample_graph()).unwrap();

        let mut state = StatePatch::new();
        state.insert("height".into(), json!("tall"));
        let err = widget
            .apply_remote(SyncMessage::Update { state })
            .unwrap_err();

        match err {
            WidgetError::Serialization { context, .. } => {
                assert!(context.contains("height"), "context was: {context}");
            }
            other => panic!("expected Serialization, got {other:?}"),
        }
    }

    #[test]
    fn unknown_inbound_fields_are_kept_as_extra_state() {
        let mut widget = NeuCad::new(&sample_graph()).unwrap();

        let mut state = StatePatch::new();
        state.insert("opacity".into(), json!(0.5));
        let applied = widget.apply_remote(SyncMessage::Update { state }).unwrap();

        assert!(applied.is_empty());
        assert_eq!(widget.extra()["opacity"], json!(0.5));
        assert_eq!(widget.full_state()["opacity"], json!(0.5));
    }

    #[test]
    fn request_state_answers_with_the_full_state() {
        let (mut widget, receiver) = wired_widget();
        drain_open(&receiver);

        widget.apply_remote(SyncMessage::RequestState).unwrap();

        match receiver.try_recv().unwrap() {
            SyncMessage::Update { state } => {
                assert_eq!(state["_view_name"], json!(VIEW_NAME));
                assert_eq!(state["height"], json!(500));
            }
            other => panic!("expected Update, got {other:?}"),
        }
    }

    #[test]
    fn from_gexf_honors_builder_options() {
        let xml = r#"<gexf><graph defaultedgetype="directed">
            <nodes><node id="n0" label="Zero"/><node id="n1"/></nodes>
            <edges><edge source="n0" target="n1"/></edges>
        </graph></gexf>"#;

        let widget = NeuCad::builder()
            .height(250)
            .layout_alg(LAYOUT_CIRCULAR)
            .start_layout(true)
            .build_from_gexf(xml.as_bytes())
            .unwrap();

        assert_eq!(widget.height(), 250);
        assert_eq!(widget.layout_alg(), "circular");
        assert!(widget.start_layout());
        assert_eq!(widget.data().node_count(), 2);
        assert_eq!(widget.data().edge_count(), 1);
        assert!(widget.data().directed);
    }

    #[test]
    fn gexf_errors_surface_under_parse() {
        let err = NeuCad::from_gexf("<gexf><graph>".as_bytes()).unwrap_err();
        assert!(matches!(err, WidgetError::Parse(_)));
    }

    #[test]
    fn snapshot_failure_means_no_widget_and_no_publish() {
        let mut g: petgraph::Graph<(), f64> = petgraph::Graph::new();
        let a = g.add_node(());
        g.add_edge(a, a, 1.0);

        let (sink, receiver) = ChannelSink::unbounded();
        let result = NeuCad::builder().sink(sink).build(&g);

        assert!(result.is_err());
        assert!(receiver.try_recv().is_err(), "nothing may be published");
    }

    #[test]
    fn reserved_names_cannot_be_overridden() {
        let widget = NeuCad::builder()
            .state_override("height", 900)
            .state_override("_view_name", "Impostor")
            .state_override("badge", "beta")
            .build(&sample_graph())
            .unwrap();

        assert_eq!(widget.height(), 500);
        assert!(widget.extra().get("height").is_none());
        let state = widget.full_state();
        assert_eq!(state["_view_name"], json!(VIEW_NAME));
        assert_eq!(state["badge"], json!("beta"));
    }

    #[test]
    fn model_ids_are_unique_per_instance() {
        let first = NeuCad::new(&AttrGraph::directed()).unwrap();
        let second = NeuCad::new(&AttrGraph::directed()).unwrap();
        assert_ne!(first.model_id(), second.model_id());
    }

    #[test]
    fn detach_stops_publishing() {
        let (mut widget, receiver) = wired_widget();
        drain_open(&receiver);

        let sink = widget.detach();
        assert!(sink.is_some());
        widget.set_height(999);
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn node_size_mode_wire_names_round_trip() {
        for mode in [
            NodeSizeMode::Degree,
            NodeSizeMode::InDegree,
            NodeSizeMode::OutDegree,
        ] {
            assert_eq!(NodeSizeMode::from_wire(mode.as_wire()), Some(mode));
            assert_eq!(serde_json::to_value(mode).unwrap(), json!(mode.as_wire()));
        }
        assert_eq!(NodeSizeMode::from_wire("diameter"), None);
    }
}
