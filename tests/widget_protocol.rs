//! Widget Protocol Tests - Kernel/Front-End Synchronization Without a Browser
//!
//! These tests drive the widget the way a comm channel would: construction
//! announces the full state, setters stream single-field updates, and
//! inbound messages from the peer are applied without echoing. The GEXF
//! scenarios go through real files on disk.

use neucad::widget::{field, MODEL_NAME, MODULE_NAME, MODULE_VERSION, VIEW_NAME};
use neucad::{
    AttrGraph, ChannelSink, GraphData, NeuCad, NodeSizeMode, StatePatch, SyncMessage, WidgetError,
};
use petgraph::Graph;
use serde::Serialize;
use serde_json::json;
use std::io::Write;

fn city_graph() -> AttrGraph {
    let mut g = AttrGraph::directed();
    g.add_node("amsterdam")
        .insert("population".into(), json!(921_402));
    g.add_node("brussels")
        .insert("population".into(), json!(1_222_637));
    g.add_edge("amsterdam", "brussels")
        .insert("km".into(), json!(173));
    g
}

/// Test 1: Construction over a channel announces the complete state once,
/// with the module metadata the front-end needs to locate its view class.
#[test]
fn open_carries_the_complete_state() {
    let (sink, receiver) = ChannelSink::unbounded();
    let _widget = NeuCad::builder()
        .layout_alg("circular")
        .height(420)
        .gui_setting("closeOnTop", false)
        .sink(sink)
        .build(&city_graph())
        .unwrap();

    let state = match receiver.try_recv().unwrap() {
        SyncMessage::Open { state } => state,
        other => panic!("expected Open, got {other:?}"),
    };
    assert!(receiver.try_recv().is_err(), "exactly one message");

    // Module metadata.
    assert_eq!(state["_view_name"], json!(VIEW_NAME));
    assert_eq!(state["_model_name"], json!(MODEL_NAME));
    assert_eq!(state["_view_module"], json!(MODULE_NAME));
    assert_eq!(state["_model_module"], json!(MODULE_NAME));
    assert_eq!(state["_view_module_version"], json!(MODULE_VERSION));
    assert_eq!(state["_model_module_version"], json!(MODULE_VERSION));

    // Synchronized fields under their wire names.
    assert_eq!(state[field::LAYOUT_ALG], json!("circular"));
    assert_eq!(state[field::HEIGHT], json!(420));
    assert_eq!(state[field::START_LAYOUT], json!(false));
    assert_eq!(state[field::NODE_SIZE], json!("degree"));
    assert_eq!(state[field::GUI_SETTINGS]["closeOnTop"], json!(false));
    assert_eq!(state[field::GUI_SETTINGS]["resizable"], json!(true));

    // The graph document, positional.
    let data = &state[field::DATA];
    assert_eq!(data["directed"], json!(true));
    assert_eq!(data["nodes"][0], json!(["amsterdam", {"population": 921_402}]));
    assert_eq!(
        data["edges"][0],
        json!(["amsterdam", "brussels", {"km": 173}])
    );
}

/// Test 2: Setters stream one single-field update each, in call order.
#[test]
fn setters_stream_updates_in_order() {
    let (sink, receiver) = ChannelSink::unbounded();
    let mut widget = NeuCad::builder().sink(sink).build(&city_graph()).unwrap();
    receiver.try_recv().unwrap(); // the Open

    widget.set_layout_alg("random");
    widget.set_height(777);
    widget.set_node_size(NodeSizeMode::OutDegree);
    widget.set_gui_setting("scrollable", true);

    let expected = [
        (field::LAYOUT_ALG, json!("random")),
        (field::HEIGHT, json!(777)),
        (field::NODE_SIZE, json!("outDegree")),
    ];
    for (name, value) in expected {
        assert_eq!(receiver.try_recv().unwrap(), SyncMessage::single(name, value));
    }

    // The GUI update ships the whole map, with the mutation applied.
    let gui = receiver.try_recv().unwrap();
    let state = gui.state().unwrap();
    assert_eq!(state[field::GUI_SETTINGS]["scrollable"], json!(true));
    assert!(receiver.try_recv().is_err());
}

/// Test 3: Full wire round trip. The kernel state travels as JSON text and
/// reassembles into an equal state on the other side.
#[test]
fn full_state_round_trips_through_json_text() {
    let kernel = NeuCad::builder()
        .height(333)
        .start_layout(true)
        .node_size(NodeSizeMode::InDegree)
        .build(&city_graph())
        .unwrap();

    let wire = serde_json::to_string(&SyncMessage::Open {
        state: kernel.full_state(),
    })
    .unwrap();
    let inbound: SyncMessage = serde_json::from_str(&wire).unwrap();

    let mut replica = NeuCad::builder().build_from_data(GraphData::default());
    replica.apply_remote(inbound).unwrap();

    assert_eq!(replica.height(), 333);
    assert!(replica.start_layout());
    assert_eq!(replica.node_size(), NodeSizeMode::InDegree);
    assert_eq!(replica.data(), kernel.data());
    assert_eq!(replica.full_state(), kernel.full_state());
}

/// Test 4: The inbound edit loop. Front-end edits apply without echo;
/// `request_state` replays the full state.
#[test]
fn inbound_edits_apply_without_echo() {
    let (sink, receiver) = ChannelSink::unbounded();
    let mut widget = NeuCad::builder().sink(sink).build(&city_graph()).unwrap();
    receiver.try_recv().unwrap();

    let mut state = StatePatch::new();
    state.insert(field::HEIGHT.into(), json!(512));
    state.insert(
        field::DATA.into(),
        json!({"nodes": [["solo", {}]], "edges": [], "directed": false}),
    );
    state.insert("theme".into(), json!("dark"));
    widget.apply_remote(SyncMessage::Update { state }).unwrap();

    assert_eq!(widget.height(), 512);
    assert_eq!(widget.data().node_count(), 1);
    assert_eq!(widget.extra()["theme"], json!("dark"));
    assert!(receiver.try_recv().is_err(), "no echo");

    widget.apply_remote(SyncMessage::RequestState).unwrap();
    let replay = receiver.try_recv().unwrap();
    let state = replay.state().unwrap();
    assert_eq!(replay.method_name(), "update");
    assert_eq!(state[field::HEIGHT], json!(512));
    assert_eq!(state["theme"], json!("dark"));
}

/// Test 5: Typed petgraph weights serialize straight into the document.
#[test]
fn petgraph_weights_become_attribute_objects() {
    #[derive(Serialize)]
    struct Station {
        name: &'static str,
        zone: u8,
    }
    #[derive(Serialize)]
    struct Link {
        minutes: u32,
    }

    let mut tube: Graph<Station, Link> = Graph::new();
    let aldgate = tube.add_node(Station {
        name: "Aldgate",
        zone: 1,
    });
    let barbican = tube.add_node(Station {
        name: "Barbican",
        zone: 1,
    });
    tube.add_edge(aldgate, barbican, Link { minutes: 4 });

    let widget = NeuCad::new(&tube).unwrap();
    let data = widget.data().to_value();
    assert_eq!(data["nodes"][0], json!(["0", {"name": "Aldgate", "zone": 1}]));
    assert_eq!(data["edges"][0], json!(["0", "1", {"minutes": 4}]));
    assert_eq!(data["directed"], json!(true));
}

/// Test 6: GEXF from disk, end to end. Declared attributes resolve to their
/// titles, defaults fill in, and the widget announces the parsed document.
#[test]
fn gexf_file_flows_into_the_protocol() {
    let doc = r#"<?xml version="1.0" encoding="UTF-8"?>
<gexf xmlns="http://www.gexf.net/1.2draft" version="1.2">
  <graph mode="static" defaultedgetype="directed">
    <attributes class="node">
      <attribute id="0" title="url" type="string"/>
      <attribute id="1" title="indegree" type="float"/>
      <attribute id="2" title="frog" type="boolean">
        <default>true</default>
      </attribute>
    </attributes>
    <nodes>
      <node id="0" label="Gephi">
        <attvalues>
          <attvalue for="0" value="https://gephi.org"/>
          <attvalue for="1" value="1"/>
        </attvalues>
      </node>
      <node id="1" label="Webatlas">
        <attvalues>
          <attvalue for="0" value="http://webatlas.fr"/>
          <attvalue for="1" value="2"/>
          <attvalue for="2" value="false"/>
        </attvalues>
      </node>
    </nodes>
    <edges>
      <edge id="0" source="0" target="1"/>
    </edges>
  </graph>
</gexf>"#;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(doc.as_bytes()).unwrap();

    let (sink, receiver) = ChannelSink::unbounded();
    let widget = NeuCad::builder()
        .sink(sink)
        .build_from_gexf_path(file.path())
        .unwrap();

    let data = widget.data();
    assert!(data.directed);
    assert_eq!(data.node_count(), 2);
    assert_eq!(data.nodes[0].id(), "0");
    assert_eq!(data.nodes[0].attrs()["label"], json!("Gephi"));
    assert_eq!(data.nodes[0].attrs()["url"], json!("https://gephi.org"));
    assert_eq!(data.nodes[0].attrs()["indegree"], json!(1.0));
    assert_eq!(data.nodes[0].attrs()["frog"], json!(true), "default fills in");
    assert_eq!(data.nodes[1].attrs()["frog"], json!(false));
    assert_eq!(data.edges[0].source(), "0");
    assert_eq!(data.edges[0].target(), "1");

    let announced = receiver.try_recv().unwrap();
    assert_eq!(announced.method_name(), "open");
    let state = announced.state().unwrap();
    assert_eq!(state[field::DATA], data.to_value());
}

/// Test 7: A broken GEXF document surfaces as a parse error before any
/// widget exists or any message is published.
#[test]
fn broken_gexf_fails_before_publishing() {
    let (sink, receiver) = ChannelSink::unbounded();
    let err = NeuCad::builder()
        .sink(sink)
        .build_from_gexf("<gexf><nodes></graph></gexf>".as_bytes())
        .unwrap_err();

    assert!(matches!(err, WidgetError::Parse(_)));
    assert!(receiver.try_recv().is_err());
}
