// Call graph structures for solgraph.
// Nodes and edges keep their insertion order so rendering is deterministic.

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::domain::ast::FunctionKind;
use crate::domain::index::FunctionId;
use crate::domain::resolver::{MissingTarget, UnresolvedReason};

/// Identity of a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Function(FunctionId),
    Missing(MissingTarget),
    /// Distinct call texts stay distinct nodes.
    Unresolved {
        text: String,
        reason: UnresolvedReason,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeKind {
    Function { kind: FunctionKind, has_body: bool },
    Missing,
    Unresolved { reason: UnresolvedReason },
}

/// A node in the call graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    /// Stable identifier derived from creation order (`n0`, `n1`, ...).
    pub id: String,
    pub label: String,
    /// Owning contract; `None` for unresolved calls.
    pub contract: Option<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub entry: bool,
    pub excluded: bool,
}

/// Directed edge between two node positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    pub from: usize,
    pub to: usize,
}

/// The call graph itself.
#[derive(Debug, Default)]
pub struct CallGraph {
    nodes: IndexMap<NodeKey, GraphNode>,
    edges: IndexSet<GraphEdge>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node unless its key is already present. Returns its position.
    pub fn add_node(
        &mut self,
        key: NodeKey,
        label: impl Into<String>,
        contract: Option<String>,
        kind: NodeKind,
    ) -> usize {
        if let Some(pos) = self.nodes.get_index_of(&key) {
            return pos;
        }
        let pos = self.nodes.len();
        self.nodes.insert(
            key,
            GraphNode {
                id: format!("n{}", pos),
                label: label.into(),
                contract,
                kind,
                entry: false,
                excluded: false,
            },
        );
        pos
    }

    /// Returns false if the edge already existed.
    pub fn add_edge(&mut self, from: usize, to: usize) -> bool {
        self.edges.insert(GraphEdge { from, to })
    }

    pub fn mark_entry(&mut self, pos: usize) {
        if let Some((_, node)) = self.nodes.get_index_mut(pos) {
            node.entry = true;
        }
    }

    pub fn mark_excluded(&mut self, pos: usize) {
        if let Some((_, node)) = self.nodes.get_index_mut(pos) {
            node.excluded = true;
        }
    }

    pub fn position(&self, key: &NodeKey) -> Option<usize> {
        self.nodes.get_index_of(key)
    }

    pub fn node(&self, pos: usize) -> Option<&GraphNode> {
        self.nodes.get_index(pos).map(|(_, node)| node)
    }

    /// Nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    /// Edges in creation order.
    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn find_by_label(&self, label: &str) -> Option<&GraphNode> {
        self.nodes.values().find(|n| n.label == label)
    }

    /// Labels of the nodes `label` points to, in edge order.
    pub fn callees_of(&self, label: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| self.node(e.from).map_or(false, |n| n.label == label))
            .filter_map(|e| self.node(e.to))
            .map(|n| n.label.as_str())
            .collect()
    }

    pub fn has_edge(&self, from_label: &str, to_label: &str) -> bool {
        self.callees_of(from_label).contains(&to_label)
    }

    /// Edges as pairs of node references.
    pub fn edge_nodes(&self) -> impl Iterator<Item = (&GraphNode, &GraphNode)> {
        self.edges
            .iter()
            .filter_map(|e| Some((self.node(e.from)?, self.node(e.to)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(name: &str) -> NodeKey {
        NodeKey::Function(FunctionId {
            contract: "A".to_string(),
            name: name.to_string(),
            params: 0,
            ordinal: 0,
        })
    }

    fn kind() -> NodeKind {
        NodeKind::Function {
            kind: FunctionKind::Function,
            has_body: true,
        }
    }

    #[test]
    fn test_nodes_and_edges_are_sets() {
        let mut cg = CallGraph::new();
        let foo = cg.add_node(key("foo"), "A.foo(0)", Some("A".into()), kind());
        let bar = cg.add_node(key("bar"), "A.bar(0)", Some("A".into()), kind());
        assert_eq!(cg.add_node(key("foo"), "ignored", None, kind()), foo);

        assert!(cg.add_edge(foo, bar));
        assert!(!cg.add_edge(foo, bar));
        assert!(cg.add_edge(bar, bar));

        assert_eq!(cg.node_count(), 2);
        assert_eq!(cg.edge_count(), 2);
        assert_eq!(cg.node(bar).map(|n| n.id.as_str()), Some("n1"));
        assert!(cg.has_edge("A.bar(0)", "A.bar(0)"));
    }

    #[test]
    fn test_unresolved_nodes_keyed_by_text() {
        let mut cg = CallGraph::new();
        let reason = UnresolvedReason::ExternalInterfaceCall;
        let a = cg.add_node(
            NodeKey::Unresolved { text: "t.transfer(a, 1)".into(), reason },
            "t.transfer(a, 1)",
            None,
            NodeKind::Unresolved { reason },
        );
        let b = cg.add_node(
            NodeKey::Unresolved { text: "t.approve(a, 1)".into(), reason },
            "t.approve(a, 1)",
            None,
            NodeKind::Unresolved { reason },
        );
        assert_ne!(a, b);
    }
}
