//! Graph files.
//!
//! Graphs are stored as gzipped node-link JSON (the layout networkx and D3
//! read), which is also what later stages load back. A GEXF copy is written
//! next to it for Gephi.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::common::{read_gz, with_suffix, write_gz, UNKNOWN};
use crate::error::{Error, Result};
use crate::network::{AuthorNode, Graph};

pub const NODE_LINK_EXT: &str = ".json.gz";
pub const GEXF_EXT: &str = ".gexf";

#[derive(Serialize, Deserialize, Debug)]
pub struct NodeLinkData {
    #[serde(default)]
    pub directed: bool,
    #[serde(default)]
    pub multigraph: bool,
    pub nodes: Vec<NodeLinkNode>,
    pub links: Vec<NodeLinkLink>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NodeLinkNode {
    pub id: String,
    #[serde(default = "unknown")]
    pub country: String,
    #[serde(default = "unknown")]
    pub primary_subfield: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NodeLinkLink {
    pub source: String,
    pub target: String,
    #[serde(default = "unit_weight")]
    pub weight: u32,
}

fn unknown() -> String {
    UNKNOWN.to_string()
}

fn unit_weight() -> u32 {
    1
}

impl From<&Graph> for NodeLinkData {
    fn from(graph: &Graph) -> Self {
        Self {
            directed: false,
            multigraph: false,
            nodes: graph
                .nodes()
                .map(|n| NodeLinkNode {
                    id: n.author_id.clone(),
                    country: n.country.clone(),
                    primary_subfield: n.primary_subfield.clone(),
                })
                .collect(),
            links: graph
                .edges()
                .map(|e| {
                    let (source, target) = e.key.ends();
                    NodeLinkLink {
                        source: source.to_string(),
                        target: target.to_string(),
                        weight: e.weight,
                    }
                })
                .collect(),
        }
    }
}

impl NodeLinkData {
    /// Rebuilds a graph, rejecting anything that is not a simple undirected
    /// graph whose links point at listed nodes.
    pub fn into_graph(self, path: &Path) -> Result<Graph> {
        let bad = |message: String| Error::GraphFormat {
            path: path.to_path_buf(),
            message,
        };
        if self.directed || self.multigraph {
            return Err(bad("expected a simple undirected graph".to_string()));
        }
        let mut graph = Graph::new();
        for node in self.nodes {
            graph.upsert_node(AuthorNode {
                author_id: node.id,
                country: node.country,
                primary_subfield: node.primary_subfield,
            });
        }
        for link in self.links {
            if link.source == link.target {
                return Err(bad(format!("self loop on {}", link.source)));
            }
            for end in [&link.source, &link.target] {
                if graph.node(end).is_none() {
                    return Err(bad(format!("link end {} is not a node", end)));
                }
            }
            graph.set_edge(&link.source, &link.target, link.weight);
        }
        Ok(graph)
    }
}

pub fn node_link_path(stem: &Path) -> PathBuf {
    with_suffix(stem, NODE_LINK_EXT)
}

pub fn load_graph(stem: &Path) -> Result<Graph> {
    let path = node_link_path(stem);
    let data: NodeLinkData = read_gz(&path).map_err(|err| match err {
        Error::Json(e) => Error::GraphFormat {
            path: path.clone(),
            message: e.to_string(),
        },
        other => other,
    })?;
    data.into_graph(&path)
}

/// Writes both the node-link file and the GEXF export of `graph`.
pub fn save_graph(stem: &Path, graph: &Graph) -> Result<()> {
    write_gz(&node_link_path(stem), &NodeLinkData::from(graph))?;
    let gexf_path = with_suffix(stem, GEXF_EXT);
    let file = File::create(&gexf_path).map_err(|e| Error::io(&gexf_path, e))?;
    let mut writer = BufWriter::new(file);
    write_gexf(&mut writer, graph)
        .and_then(|_| writer.flush())
        .map_err(|e| Error::io(&gexf_path, e))
}

pub fn write_gexf<W: Write>(w: &mut W, graph: &Graph) -> std::io::Result<()> {
    writeln!(w, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(w, r#"<gexf xmlns="http://gexf.net/1.2" version="1.2">"#)?;
    writeln!(w, "  <meta>")?;
    writeln!(w, "    <creator>{}</creator>", env!("CARGO_PKG_NAME"))?;
    writeln!(w, "  </meta>")?;
    writeln!(w, r#"  <graph defaultedgetype="undirected" mode="static">"#)?;
    writeln!(w, r#"    <attributes class="node" mode="static">"#)?;
    writeln!(w, r#"      <attribute id="0" title="country" type="string" />"#)?;
    writeln!(
        w,
        r#"      <attribute id="1" title="primary_subfield" type="string" />"#
    )?;
    writeln!(w, "    </attributes>")?;
    writeln!(w, "    <nodes>")?;
    for node in graph.nodes() {
        let id = escape_xml(&node.author_id);
        writeln!(w, r#"      <node id="{}" label="{}">"#, id, id)?;
        writeln!(w, "        <attvalues>")?;
        writeln!(
            w,
            r#"          <attvalue for="0" value="{}" />"#,
            escape_xml(&node.country)
        )?;
        writeln!(
            w,
            r#"          <attvalue for="1" value="{}" />"#,
            escape_xml(&node.primary_subfield)
        )?;
        writeln!(w, "        </attvalues>")?;
        writeln!(w, "      </node>")?;
    }
    writeln!(w, "    </nodes>")?;
    writeln!(w, "    <edges>")?;
    for (i, edge) in graph.edges().enumerate() {
        let (source, target) = edge.key.ends();
        writeln!(
            w,
            r#"      <edge id="{}" source="{}" target="{}" weight="{}" />"#,
            i,
            escape_xml(source),
            escape_xml(target),
            edge.weight
        )?;
    }
    writeln!(w, "    </edges>")?;
    writeln!(w, "  </graph>")?;
    writeln!(w, "</gexf>")
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
