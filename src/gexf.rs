//! GEXF 1.2 reader.
//!
//! Parses a GEXF document into an [`AttrGraph`], following the common
//! reader semantics for the format:
//!
//! - `<graph defaultedgetype="directed">` selects directedness; anything
//!   else (including absence) reads as undirected.
//! - `<attributes class="node|edge">` declare typed attributes. Supported
//!   types: `string`, `integer`, `long`, `float`, `double`, `boolean`,
//!   `liststring` (pipe-separated), `anyURI`. A `<default>` decodes with
//!   the declared type at declaration time and fills in for elements that
//!   carry no matching `<attvalue>`.
//! - `<attvalue for="…" value="…">` decodes through the declaration table;
//!   referencing an undeclared id is an error.
//! - Edge endpoints that were never declared as nodes are created
//!   implicitly with empty attributes.
//! - `viz` extension elements (`color`, `position`, `size`, `shape`,
//!   `thickness`) collect under a `"viz"` attribute object.
//!
//! Namespace prefixes are handled leniently (local names decide), `<meta>`
//! subtrees and unknown elements are skipped, and text is unescaped. The
//! parser is a pull loop over `quick-xml` events; nothing is buffered
//! beyond the current element.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;

use crate::graph::{AttrGraph, AttrMap};

// =============================================================================
// ERRORS
// =============================================================================

/// Failure modes of the GEXF reader.
#[derive(Debug, thiserror::Error)]
pub enum GexfError {
    /// The XML itself is malformed.
    #[error("invalid XML at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// The document could not be read at all.
    #[error("cannot read GEXF document: {0}")]
    Io(#[from] std::io::Error),

    /// A required XML attribute is absent.
    #[error("<{element}> is missing required attribute `{attribute}`")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    /// An `<attvalue>` references an id with no `<attribute>` declaration.
    #[error("attvalue references undeclared attribute id `{attr_id}`")]
    UndeclaredAttribute { attr_id: String },

    /// A value does not decode as its declared type.
    #[error("cannot decode `{raw}` as {expected} for attribute `{title}`")]
    InvalidValue {
        title: String,
        raw: String,
        expected: &'static str,
    },

    /// The document is well-formed XML but not a usable GEXF document.
    #[error("malformed GEXF document: {reason}")]
    Structure { reason: String },
}

// =============================================================================
// PUBLIC ENTRY POINTS
// =============================================================================

/// Parse a GEXF document from any buffered reader.
pub fn parse_gexf<R: BufRead>(reader: R) -> Result<AttrGraph, GexfError> {
    GexfParser::new(reader).parse()
}

/// Parse a GEXF document held in memory.
pub fn parse_gexf_str(xml: &str) -> Result<AttrGraph, GexfError> {
    parse_gexf(xml.as_bytes())
}

/// Parse a GEXF file from disk.
pub fn parse_gexf_file(path: impl AsRef<Path>) -> Result<AttrGraph, GexfError> {
    let file = File::open(path)?;
    parse_gexf(BufReader::new(file))
}

// =============================================================================
// DECLARATION TABLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrClass {
    Node,
    Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttrType {
    String,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    ListString,
    AnyUri,
}

impl AttrType {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "string" => Some(Self::String),
            "integer" => Some(Self::Integer),
            "long" => Some(Self::Long),
            "float" => Some(Self::Float),
            "double" => Some(Self::Double),
            "boolean" => Some(Self::Boolean),
            "liststring" => Some(Self::ListString),
            "anyURI" => Some(Self::AnyUri),
            _ => None,
        }
    }

    fn expected_name(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Integer => "an integer",
            Self::Long => "a long",
            Self::Float => "a float",
            Self::Double => "a double",
            Self::Boolean => "a boolean",
            Self::ListString => "a liststring",
            Self::AnyUri => "an anyURI",
        }
    }
}

/// One `<attribute>` declaration: display title, declared type, optional
/// typed default.
#[derive(Debug, Clone)]
struct AttrDecl {
    title: String,
    ty: AttrType,
    default: Option<Value>,
}

/// Decode a raw attvalue (or default) with its declared type.
fn decode_typed(title: &str, ty: AttrType, raw: &str) -> Result<Value, GexfError> {
    let decoded = match ty {
        AttrType::String | AttrType::AnyUri => Some(Value::String(raw.to_string())),
        AttrType::Integer | AttrType::Long => raw.trim().parse::<i64>().ok().map(Value::from),
        AttrType::Float | AttrType::Double => raw
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        AttrType::Boolean => match raw.trim() {
            "true" | "True" | "TRUE" | "1" => Some(Value::Bool(true)),
            "false" | "False" | "FALSE" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        AttrType::ListString => Some(Value::Array(
            raw.split('|')
                .map(|part| Value::String(part.to_string()))
                .collect(),
        )),
    };
    decoded.ok_or_else(|| GexfError::InvalidValue {
        title: title.to_string(),
        raw: raw.to_string(),
        expected: ty.expected_name(),
    })
}

// =============================================================================
// PARSER
// =============================================================================

struct GexfParser<R: BufRead> {
    reader: Reader<R>,
    node_decls: HashMap<String, AttrDecl>,
    edge_decls: HashMap<String, AttrDecl>,
}

impl<R: BufRead> GexfParser<R> {
    fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);
        Self {
            reader,
            node_decls: HashMap::new(),
            edge_decls: HashMap::new(),
        }
    }

    fn decls(&self, class: AttrClass) -> &HashMap<String, AttrDecl> {
        match class {
            AttrClass::Node => &self.node_decls,
            AttrClass::Edge => &self.edge_decls,
        }
    }

    fn parse(mut self) -> Result<AttrGraph, GexfError> {
        let mut graph = None;
        let mut buf = Vec::new();
        loop {
            match self.read_event(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"gexf" => {}
                    b"graph" => graph = Some(self.parse_graph(&e)?),
                    _ => self.skip_subtree()?,
                },
                Event::Empty(e) => {
                    if e.local_name().as_ref() == b"graph" {
                        graph = Some(self.graph_shell(&e)?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        graph.ok_or_else(|| GexfError::Structure {
            reason: "document has no <graph> element".into(),
        })
    }

    /// An empty graph with directedness taken from `defaultedgetype`.
    fn graph_shell(&self, start: &BytesStart) -> Result<AttrGraph, GexfError> {
        let attrs = string_attrs(start)?;
        let directed = attrs.get("defaultedgetype").map(String::as_str) == Some("directed");
        Ok(AttrGraph::new(directed))
    }

    /// Consume `<graph>…</graph>` and build the graph.
    fn parse_graph(&mut self, start: &BytesStart) -> Result<AttrGraph, GexfError> {
        let mut graph = self.graph_shell(start)?;
        let mut buf = Vec::new();
        loop {
            match self.read_event(&mut buf)? {
                Event::Start(e) => match e.local_name().as_ref() {
                    b"attributes" => self.parse_attr_decls(&e, false)?,
                    b"nodes" => self.parse_nodes(&mut graph)?,
                    b"edges" => self.parse_edges(&mut graph)?,
                    _ => self.skip_subtree()?,
                },
                Event::Empty(e) => {
                    if e.local_name().as_ref() == b"attributes" {
                        self.parse_attr_decls(&e, true)?;
                    }
                }
                Event::End(e) if e.local_name().as_ref() == b"graph" => break,
                Event::Eof => {
                    return Err(GexfError::Structure {
                        reason: "unterminated <graph> element".into(),
                    })
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(graph)
    }

    /// Consume an `<attributes>` block into the matching declaration table.
    fn parse_attr_decls(&mut self, start: &BytesStart, empty: bool) -> Result<(), GexfError> {
        let attrs = string_attrs(start)?;
        let class = match attrs.get("class").map(String::as_str) {
            Some("node") => AttrClass::Node,
            Some("edge") => AttrClass::Edge,
            Some(other) => {
                return Err(GexfError::Structure {
                    reason: format!("attributes class must be `node` or `edge`, got `{other}`"),
                })
            }
            None => {
                return Err(GexfError::MissingAttribute {
                    element: "attributes",
                    attribute: "class",
                })
            }
        };
        if empty {
            return Ok(());
        }

        let mut decls = Vec::new();
        let mut buf = Vec::new();
        loop {
            match self.read_event(&mut buf)? {
                Event::Start(e) if e.local_name().as_ref() == b"attribute" => {
                    decls.push(self.parse_attr_decl(&e, false)?);
                }
                Event::Empty(e) if e.local_name().as_ref() == b"attribute" => {
                    decls.push(self.parse_attr_decl(&e, true)?);
                }
                Event::Start(_) => self.skip_subtree()?,
                Event::End(e) if e.local_name().as_ref() == b"attributes" => break,
                Event::Eof => {
                    return Err(GexfError::Structure {
                        reason: "unterminated <attributes> element".into(),
                    })
                }
                _ => {}
            }
            buf.clear();
        }

        let table = match class {
            AttrClass::Node => &mut self.node_decls,
            AttrClass::Edge => &mut self.edge_decls,
        };
        table.extend(decls);
        Ok(())
    }

    /// Read one `<attribute>` declaration, including a `<default>` child.
    fn parse_attr_decl(
        &mut self,
        start: &BytesStart,
        empty: bool,
    ) -> Result<(String, AttrDecl), GexfError> {
        let attrs = string_attrs(start)?;
        let id = attrs.get("id").cloned().ok_or(GexfError::MissingAttribute {
            element: "attribute",
            attribute: "id",
        })?;
        // The title may be omitted; readers fall back to the id.
        let title = attrs.get("title").cloned().unwrap_or_else(|| id.clone());
        let ty = match attrs.get("type").map(String::as_str) {
            None => AttrType::String,
            Some(raw) => AttrType::parse(raw).ok_or_else(|| GexfError::Structure {
                reason: format!("unsupported attribute type `{raw}` for `{title}`"),
            })?,
        };

        let mut default = None;
        if !empty {
            let mut buf = Vec::new();
            loop {
                match self.read_event(&mut buf)? {
                    Event::Start(e) if e.local_name().as_ref() == b"default" => {
                        let text = self.read_text_until(b"default")?;
                        default = Some(decode_typed(&title, ty, text.trim())?);
                    }
                    Event::Start(_) => self.skip_subtree()?,
                    Event::End(e) if e.local_name().as_ref() == b"attribute" => break,
                    Event::Eof => {
                        return Err(GexfError::Structure {
                            reason: "unterminated <attribute> element".into(),
                        })
                    }
                    _ => {}
                }
                buf.clear();
            }
        }

        Ok((id, AttrDecl { title, ty, default }))
    }

    /// Consume `<nodes>…</nodes>`, adding every node to the graph.
    fn parse_nodes(&mut self, graph: &mut AttrGraph) -> Result<(), GexfError> {
        let mut buf = Vec::new();
        loop {
            match self.read_event(&mut buf)? {
                Event::Start(e) if e.local_name().as_ref() == b"node" => {
                    let (id, attrs) = self.parse_node(&e, false)?;
                    graph.add_node_with(id, attrs);
                }
                Event::Empty(e) if e.local_name().as_ref() == b"node" => {
                    let (id, attrs) = self.parse_node(&e, true)?;
                    graph.add_node_with(id, attrs);
                }
                Event::Start(_) => self.skip_subtree()?,
                Event::End(e) if e.local_name().as_ref() == b"nodes" => break,
                Event::Eof => {
                    return Err(GexfError::Structure {
                        reason: "unterminated <nodes> element".into(),
                    })
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(())
    }

    /// Read one `<node>`: inline attributes, attvalues, viz, defaults.
    fn parse_node(
        &mut self,
        start: &BytesStart,
        empty: bool,
    ) -> Result<(String, AttrMap), GexfError> {
        let inline = string_attrs(start)?;
        let id = inline
            .get("id")
            .cloned()
            .ok_or(GexfError::MissingAttribute {
                element: "node",
                attribute: "id",
            })?;

        let mut attrs = AttrMap::new();
        // Every declared node carries a label; the id stands in when the
        // document omits one.
        let label = inline.get("label").cloned().unwrap_or_else(|| id.clone());
        attrs.insert("label".into(), Value::String(label));
        if let Some(pid) = inline.get("pid") {
            attrs.insert("pid".into(), Value::String(pid.clone()));
        }

        let mut viz = AttrMap::new();
        if !empty {
            self.parse_element_body(b"node", AttrClass::Node, &mut attrs, &mut viz)?;
        }
        apply_defaults(&self.node_decls, &mut attrs);
        if !viz.is_empty() {
            attrs.insert("viz".into(), Value::Object(viz));
        }

        Ok((id, attrs))
    }

    /// Consume `<edges>…</edges>`, adding every edge to the graph.
    fn parse_edges(&mut self, graph: &mut AttrGraph) -> Result<(), GexfError> {
        let mut buf = Vec::new();
        loop {
            match self.read_event(&mut buf)? {
                Event::Start(e) if e.local_name().as_ref() == b"edge" => {
                    let (source, target, attrs) = self.parse_edge(&e, false)?;
                    graph.add_edge_with(source, target, attrs);
                }
                Event::Empty(e) if e.local_name().as_ref() == b"edge" => {
                    let (source, target, attrs) = self.parse_edge(&e, true)?;
                    graph.add_edge_with(source, target, attrs);
                }
                Event::Start(_) => self.skip_subtree()?,
                Event::End(e) if e.local_name().as_ref() == b"edges" => break,
                Event::Eof => {
                    return Err(GexfError::Structure {
                        reason: "unterminated <edges> element".into(),
                    })
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(())
    }

    /// Read one `<edge>`: endpoints, weight, attvalues, viz, defaults.
    fn parse_edge(
        &mut self,
        start: &BytesStart,
        empty: bool,
    ) -> Result<(String, String, AttrMap), GexfError> {
        let inline = string_attrs(start)?;
        let source = inline
            .get("source")
            .cloned()
            .ok_or(GexfError::MissingAttribute {
                element: "edge",
                attribute: "source",
            })?;
        let target = inline
            .get("target")
            .cloned()
            .ok_or(GexfError::MissingAttribute {
                element: "edge",
                attribute: "target",
            })?;

        let mut attrs = AttrMap::new();
        if let Some(id) = inline.get("id") {
            attrs.insert("id".into(), Value::String(id.clone()));
        }
        if let Some(label) = inline.get("label") {
            attrs.insert("label".into(), Value::String(label.clone()));
        }
        if let Some(weight) = inline.get("weight") {
            attrs.insert(
                "weight".into(),
                decode_typed("weight", AttrType::Double, weight)?,
            );
        }

        let mut viz = AttrMap::new();
        if !empty {
            self.parse_element_body(b"edge", AttrClass::Edge, &mut attrs, &mut viz)?;
        }
        apply_defaults(&self.edge_decls, &mut attrs);
        if !viz.is_empty() {
            attrs.insert("viz".into(), Value::Object(viz));
        }

        Ok((source, target, attrs))
    }

    /// Consume the children of a `<node>` or `<edge>` up to its end tag:
    /// attvalues through the declaration table, viz extension elements,
    /// everything else skipped.
    fn parse_element_body(
        &mut self,
        end: &'static [u8],
        class: AttrClass,
        attrs: &mut AttrMap,
        viz: &mut AttrMap,
    ) -> Result<(), GexfError> {
        let mut buf = Vec::new();
        loop {
            match self.read_event(&mut buf)? {
                // Viz children carry no nested content we care about; a
                // Start's end tag falls through the catch-all below.
                Event::Start(e) | Event::Empty(e) if is_viz_element(&e) => {
                    let element = string_attrs(&e)?;
                    collect_viz(e.local_name().as_ref(), &element, viz)?;
                }
                Event::Start(e) => match e.local_name().as_ref() {
                    b"attvalues" => self.parse_attvalues(class, attrs)?,
                    _ => self.skip_subtree()?,
                },
                Event::Empty(_) => {}
                Event::End(e) if e.local_name().as_ref() == end => break,
                Event::Eof => {
                    return Err(GexfError::Structure {
                        reason: "unterminated node or edge element".into(),
                    })
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(())
    }

    /// Consume `<attvalues>…</attvalues>`.
    fn parse_attvalues(&mut self, class: AttrClass, attrs: &mut AttrMap) -> Result<(), GexfError> {
        let mut buf = Vec::new();
        loop {
            match self.read_event(&mut buf)? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"attvalue" => {
                    let element = string_attrs(&e)?;
                    // `for` is the GEXF spelling; `id` appears in the wild.
                    let attr_id = element
                        .get("for")
                        .or_else(|| element.get("id"))
                        .cloned()
                        .ok_or(GexfError::MissingAttribute {
                            element: "attvalue",
                            attribute: "for",
                        })?;
                    let raw = element
                        .get("value")
                        .cloned()
                        .ok_or(GexfError::MissingAttribute {
                            element: "attvalue",
                            attribute: "value",
                        })?;
                    let decl = self.decls(class).get(&attr_id).ok_or_else(|| {
                        GexfError::UndeclaredAttribute {
                            attr_id: attr_id.clone(),
                        }
                    })?;
                    attrs.insert(decl.title.clone(), decode_typed(&decl.title, decl.ty, &raw)?);
                }
                Event::Start(_) => self.skip_subtree()?,
                Event::End(e) if e.local_name().as_ref() == b"attvalues" => break,
                Event::Eof => {
                    return Err(GexfError::Structure {
                        reason: "unterminated <attvalues> element".into(),
                    })
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(())
    }

    /// Skip the rest of the element whose `Start` was just consumed.
    fn skip_subtree(&mut self) -> Result<(), GexfError> {
        let mut depth = 1usize;
        let mut buf = Vec::new();
        while depth > 0 {
            match self.read_event(&mut buf)? {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                Event::Eof => {
                    return Err(GexfError::Structure {
                        reason: "unexpected end of document inside a skipped element".into(),
                    })
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(())
    }

    /// Collect text content up to the named end tag.
    fn read_text_until(&mut self, end: &'static [u8]) -> Result<String, GexfError> {
        let mut out = String::new();
        let mut buf = Vec::new();
        loop {
            match self.read_event(&mut buf)? {
                Event::Text(t) => out.push_str(&unescape_text(t.as_ref())?),
                Event::CData(t) => out.push_str(&String::from_utf8_lossy(t.as_ref())),
                Event::Start(_) => self.skip_subtree()?,
                Event::End(e) if e.local_name().as_ref() == end => break,
                Event::Eof => {
                    return Err(GexfError::Structure {
                        reason: "unexpected end of document inside element text".into(),
                    })
                }
                _ => {}
            }
            buf.clear();
        }
        Ok(out)
    }

    fn read_event<'b>(&mut self, buf: &'b mut Vec<u8>) -> Result<Event<'b>, GexfError> {
        let position = u64::try_from(self.reader.buffer_position()).unwrap_or(0);
        self.reader
            .read_event_into(buf)
            .map_err(|source| GexfError::Xml { position, source })
    }
}

// =============================================================================
// ELEMENT HELPERS
// =============================================================================

/// All XML attributes of an element as local-name to unescaped text.
fn string_attrs(start: &BytesStart) -> Result<HashMap<String, String>, GexfError> {
    let mut out = HashMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|err| GexfError::Structure {
            reason: format!("malformed attribute in element: {err}"),
        })?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = unescape_text(attr.value.as_ref())?;
        out.insert(key, value);
    }
    Ok(out)
}

fn unescape_text(raw: &[u8]) -> Result<String, GexfError> {
    let text = String::from_utf8_lossy(raw);
    match quick_xml::escape::unescape(&text) {
        Ok(unescaped) => Ok(unescaped.into_owned()),
        Err(err) => Err(GexfError::Structure {
            reason: format!("bad escape sequence in `{text}`: {err}"),
        }),
    }
}

fn is_viz_element(start: &BytesStart) -> bool {
    matches!(
        start.local_name().as_ref(),
        b"color" | b"position" | b"size" | b"shape" | b"thickness"
    )
}

/// Fold one viz extension element into the viz object.
fn collect_viz(
    local: &[u8],
    element: &HashMap<String, String>,
    viz: &mut AttrMap,
) -> Result<(), GexfError> {
    match local {
        b"color" => {
            let mut color = AttrMap::new();
            for channel in ["r", "g", "b"] {
                let raw = element.get(channel).ok_or(GexfError::MissingAttribute {
                    element: "viz:color",
                    attribute: "r, g and b",
                })?;
                color.insert(
                    channel.into(),
                    decode_typed("viz:color", AttrType::Integer, raw)?,
                );
            }
            if let Some(alpha) = element.get("a") {
                color.insert(
                    "a".into(),
                    decode_typed("viz:color", AttrType::Double, alpha)?,
                );
            }
            viz.insert("color".into(), Value::Object(color));
        }
        b"position" => {
            let mut position = AttrMap::new();
            for axis in ["x", "y"] {
                let raw = element.get(axis).ok_or(GexfError::MissingAttribute {
                    element: "viz:position",
                    attribute: "x and y",
                })?;
                position.insert(
                    axis.into(),
                    decode_typed("viz:position", AttrType::Double, raw)?,
                );
            }
            let z = match element.get("z") {
                Some(raw) => decode_typed("viz:position", AttrType::Double, raw)?,
                None => Value::from(0.0),
            };
            position.insert("z".into(), z);
            viz.insert("position".into(), Value::Object(position));
        }
        b"size" => {
            let raw = element.get("value").ok_or(GexfError::MissingAttribute {
                element: "viz:size",
                attribute: "value",
            })?;
            viz.insert("size".into(), decode_typed("viz:size", AttrType::Double, raw)?);
        }
        b"shape" => {
            let raw = element.get("value").ok_or(GexfError::MissingAttribute {
                element: "viz:shape",
                attribute: "value",
            })?;
            viz.insert("shape".into(), Value::String(raw.clone()));
        }
        b"thickness" => {
            let raw = element.get("value").ok_or(GexfError::MissingAttribute {
                element: "viz:thickness",
                attribute: "value",
            })?;
            viz.insert(
                "thickness".into(),
                decode_typed("viz:thickness", AttrType::Double, raw)?,
            );
        }
        _ => {}
    }
    Ok(())
}

/// Fill in declared defaults for attributes the element did not carry.
fn apply_defaults(decls: &HashMap<String, AttrDecl>, attrs: &mut AttrMap) {
    for decl in decls.values() {
        if let Some(default) = &decl.default {
            if !attrs.contains_key(&decl.title) {
                attrs.insert(decl.title.clone(), default.clone());
            }
        }
    }
}
