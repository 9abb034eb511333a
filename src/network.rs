//! Co-authorship graphs.
//!
//! A [`Graph`] wraps a petgraph `UnGraph` next to an author-id index. Nothing
//! is ever removed, so node and edge indices follow first appearance and
//! iteration (and everything written from it) is stable for a stable input
//! order.

use hashbrown::HashMap;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use crate::common::UNKNOWN;
use crate::records::PublicationRecord;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey(String, String);

#[derive(Debug, Clone, PartialEq)]
pub struct AuthorNode {
    pub author_id: String,
    pub country: String,
    pub primary_subfield: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollaborationEdge {
    pub key: EdgeKey,
    pub weight: u32,
}

/// Undirected collaboration graph; every edge's endpoints exist as nodes.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    graph: UnGraph<AuthorNode, u32>,
    author_index: HashMap<String, NodeIndex>,
}

impl EdgeKey {
    /// Canonical key of an unordered pair; `None` for a self pair.
    pub fn new(a: &str, b: &str) -> Option<Self> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Some(Self(a.to_string(), b.to_string())),
            std::cmp::Ordering::Greater => Some(Self(b.to_string(), a.to_string())),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn ends(&self) -> (&str, &str) {
        (&self.0, &self.1)
    }
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn nodes(&self) -> impl Iterator<Item = &AuthorNode> + '_ {
        self.graph.node_weights()
    }

    /// Edges in insertion order, keyed canonically.
    pub fn edges(&self) -> impl Iterator<Item = CollaborationEdge> + '_ {
        self.graph.edge_references().filter_map(|e| {
            let key = EdgeKey::new(
                &self.graph[e.source()].author_id,
                &self.graph[e.target()].author_id,
            )?;
            Some(CollaborationEdge {
                key,
                weight: *e.weight(),
            })
        })
    }

    pub fn node(&self, author_id: &str) -> Option<&AuthorNode> {
        self.author_index.get(author_id).map(|&i| &self.graph[i])
    }

    pub fn weight(&self, a: &str, b: &str) -> Option<u32> {
        let (ia, ib) = (*self.author_index.get(a)?, *self.author_index.get(b)?);
        self.graph.find_edge(ia, ib).map(|e| self.graph[e])
    }

    /// Underlying petgraph graph; node indices are positions in [`Graph::nodes`].
    pub fn as_petgraph(&self) -> &UnGraph<AuthorNode, u32> {
        &self.graph
    }

    /// Inserts the node or replaces the labels of an existing one.
    pub fn upsert_node(&mut self, node: AuthorNode) {
        match self.author_index.get(&node.author_id) {
            Some(&i) => self.graph[i] = node,
            None => {
                let id = node.author_id.clone();
                let i = self.graph.add_node(node);
                self.author_index.insert(id, i);
            }
        }
    }

    /// Sets the weight of an edge. Endpoints missing from the graph are
    /// added with `Unknown` labels, and a self pair is ignored.
    pub fn set_edge(&mut self, a: &str, b: &str, weight: u32) {
        self.put_edge(a, b, |w| *w = weight);
    }

    /// Applies `update` to the weight of the `a`-`b` edge, starting from 0
    /// for a new edge.
    pub(crate) fn put_edge(&mut self, a: &str, b: &str, update: impl FnOnce(&mut u32)) {
        if a == b {
            return;
        }
        let (ia, ib) = (self.ensure_node(a), self.ensure_node(b));
        match self.graph.find_edge(ia, ib) {
            Some(e) => update(&mut self.graph[e]),
            None => {
                let mut weight = 0;
                update(&mut weight);
                self.graph.add_edge(ia, ib, weight);
            }
        }
    }

    fn ensure_node(&mut self, author_id: &str) -> NodeIndex {
        match self.author_index.get(author_id) {
            Some(&i) => i,
            None => {
                let i = self.graph.add_node(AuthorNode::unlabelled(author_id));
                self.author_index.insert(author_id.to_string(), i);
                i
            }
        }
    }
}

impl AuthorNode {
    pub fn new(author_id: &str, country: &str, primary_subfield: &str) -> Self {
        Self {
            author_id: author_id.to_string(),
            country: country.to_string(),
            primary_subfield: primary_subfield.to_string(),
        }
    }

    fn unlabelled(author_id: &str) -> Self {
        Self::new(author_id, UNKNOWN, UNKNOWN)
    }
}

/// Per-author subfield occurrence counts, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubfieldTally(Vec<(String, u32)>);

impl SubfieldTally {
    pub fn add(&mut self, subfield: &str) {
        match self.0.iter_mut().find(|(name, _)| name == subfield) {
            Some((_, count)) => *count += 1,
            None => self.0.push((subfield.to_string(), 1)),
        }
    }

    pub fn get(&self, subfield: &str) -> u32 {
        self.0
            .iter()
            .find(|(name, _)| name == subfield)
            .map_or(0, |(_, c)| *c)
    }

    /// Most frequent subfield; the first one seen wins ties.
    pub fn primary(&self) -> &str {
        let mut best: Option<&(String, u32)> = None;
        for entry in &self.0 {
            if best.map_or(true, |b| entry.1 > b.1) {
                best = Some(entry);
            }
        }
        best.map_or(UNKNOWN, |(name, _)| name.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct AuthorTally {
    pub author_id: String,
    pub primary_country: String,
    pub subfields: SubfieldTally,
}

/// One network-build pass over a set of publication records.
///
/// Nodes enter the graph on first sight with their country; the primary
/// subfield is only settled in [`NetworkBuilder::finish`].
#[derive(Debug, Default)]
pub struct NetworkBuilder {
    authors: Vec<AuthorTally>,
    author_index: HashMap<String, usize>,
    graph: Graph,
    records_seen: usize,
}

impl NetworkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn absorb(&mut self, record: &PublicationRecord) {
        self.records_seen += 1;
        let mut co_authors: Vec<&str> = Vec::new();
        for authorship in &record.authorships {
            let Some(author_id) = authorship.qualifying_id() else {
                continue;
            };
            let i = match self.author_index.get(author_id) {
                Some(&i) => i,
                None => {
                    let country = authorship.primary_country();
                    self.graph
                        .upsert_node(AuthorNode::new(author_id, country, UNKNOWN));
                    self.author_index
                        .insert(author_id.to_string(), self.authors.len());
                    self.authors.push(AuthorTally {
                        author_id: author_id.to_string(),
                        primary_country: country.to_string(),
                        subfields: SubfieldTally::default(),
                    });
                    self.authors.len() - 1
                }
            };
            self.authors[i].subfields.add(&record.subfield);
            if !co_authors.contains(&author_id) {
                co_authors.push(author_id);
            }
        }

        for (n, a) in co_authors.iter().enumerate() {
            for b in &co_authors[n + 1..] {
                self.graph.put_edge(a, b, |w| *w = w.saturating_add(1));
            }
        }
    }

    pub fn tallies(&self) -> &[AuthorTally] {
        &self.authors
    }

    pub fn records_seen(&self) -> usize {
        self.records_seen
    }

    pub fn finish(self) -> Graph {
        let mut graph = self.graph;
        for tally in &self.authors {
            graph.upsert_node(AuthorNode::new(
                &tally.author_id,
                &tally.primary_country,
                tally.subfields.primary(),
            ));
        }
        graph
    }
}

pub fn build_network<'a, I>(records: I) -> Graph
where
    I: IntoIterator<Item = &'a PublicationRecord>,
{
    let mut builder = NetworkBuilder::new();
    for record in records {
        builder.absorb(record);
    }
    builder.finish()
}
