use serde::Deserialize;

use crate::network::Graph;

/// How a merge treats an edge present in both graphs.
///
/// Node labels always come from the graph merged last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// The later graph's weight replaces the earlier one (graph union).
    #[default]
    Overwrite,
    /// Weights of shared edges are summed.
    Additive,
}

impl Graph {
    pub fn merge(&mut self, other: &Graph, policy: MergePolicy) {
        for node in other.nodes() {
            self.upsert_node(node.clone());
        }
        for edge in other.edges() {
            let (a, b) = edge.key.ends();
            let weight = edge.weight;
            match policy {
                MergePolicy::Overwrite => self.put_edge(a, b, |w| *w = weight),
                MergePolicy::Additive => self.put_edge(a, b, |w| *w = w.saturating_add(weight)),
            }
        }
    }
}

pub fn merge(mut earlier: Graph, later: &Graph, policy: MergePolicy) -> Graph {
    earlier.merge(later, policy);
    earlier
}

/// Folds graphs left to right into one, starting from an empty graph.
pub fn merge_all<'a, I>(graphs: I, policy: MergePolicy) -> Graph
where
    I: IntoIterator<Item = &'a Graph>,
{
    graphs
        .into_iter()
        .fold(Graph::new(), |acc, g| merge(acc, g, policy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::AuthorNode;

    fn pair(weight: u32, country: &str) -> Graph {
        let mut g = Graph::new();
        g.upsert_node(AuthorNode::new("A", country, "Software"));
        g.upsert_node(AuthorNode::new("B", country, "Software"));
        g.set_edge("A", "B", weight);
        g
    }

    #[test]
    fn overwrite_takes_the_later_weight() {
        let merged = merge(pair(3, "BR"), &pair(5, "US"), MergePolicy::Overwrite);
        assert_eq!(merged.weight("A", "B"), Some(5));
        assert_eq!(merged.node("A").unwrap().country, "US");
        assert_eq!(merged.node_count(), 2);
    }

    #[test]
    fn additive_sums_shared_edges() {
        let merged = merge(pair(3, "BR"), &pair(5, "US"), MergePolicy::Additive);
        assert_eq!(merged.weight("A", "B"), Some(8));
        assert_eq!(merged.node("B").unwrap().country, "US");
    }

    #[test]
    fn additive_saturates_instead_of_overflowing() {
        let merged = merge(pair(u32::MAX - 1, "BR"), &pair(5, "BR"), MergePolicy::Additive);
        assert_eq!(merged.weight("A", "B"), Some(u32::MAX));
    }

    #[test]
    fn policy_reads_lowercase() {
        let p: MergePolicy = serde_json::from_str("\"additive\"").unwrap();
        assert_eq!(p, MergePolicy::Additive);
    }
}
