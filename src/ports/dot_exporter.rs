//! Call Graph DOT Exporter
//!
//! Exports a CallGraph as Graphviz DOT, one cluster per contract.

use indexmap::IndexMap;

use crate::domain::ast::FunctionKind;
use crate::domain::callgraph::{CallGraph, GraphNode, NodeKind};
use crate::error::Result;
use crate::ports::GraphExporter;

pub struct DotExporter {
    /// Group nodes into one `subgraph cluster_*` per contract.
    pub clusters: bool,
}

impl Default for DotExporter {
    fn default() -> Self {
        Self { clusters: true }
    }
}

impl GraphExporter for DotExporter {
    fn render(&self, cg: &CallGraph) -> Result<String> {
        Ok(self.to_dot(cg))
    }
}

impl DotExporter {
    /// Convert a CallGraph to a DOT string.
    pub fn to_dot(&self, cg: &CallGraph) -> String {
        let mut lines = Vec::new();

        lines.push("digraph CallGraph {".to_string());
        lines.push("    rankdir=LR;".to_string());
        lines.push("    node [fontname=\"Helvetica\", fontsize=11];".to_string());
        lines.push("    edge [fontname=\"Helvetica\", fontsize=10];".to_string());
        lines.push("".to_string());

        if self.clusters {
            // Contracts in first-appearance order; unresolved calls stay outside.
            let mut groups: IndexMap<&str, Vec<&GraphNode>> = IndexMap::new();
            let mut loose = Vec::new();
            for node in cg.nodes() {
                match node.contract.as_deref() {
                    Some(contract) => groups.entry(contract).or_default().push(node),
                    None => loose.push(node),
                }
            }
            for (i, (contract, nodes)) in groups.iter().enumerate() {
                lines.push(format!("    subgraph cluster_{} {{", i));
                lines.push(format!("        label=\"{}\";", Self::escape_label(contract)));
                lines.push("        style=\"rounded\";".to_string());
                lines.push("        color=\"#6c7086\";".to_string());
                for node in nodes {
                    lines.push(format!("        {}", Self::node_line(node)));
                }
                lines.push("    }".to_string());
            }
            for node in loose {
                lines.push(format!("    {}", Self::node_line(node)));
            }
        } else {
            for node in cg.nodes() {
                lines.push(format!("    {}", Self::node_line(node)));
            }
        }

        lines.push("".to_string());

        for (from, to) in cg.edge_nodes() {
            let style = match to.kind {
                NodeKind::Unresolved { .. } | NodeKind::Missing => " [style=dashed]",
                NodeKind::Function { .. } => "",
            };
            lines.push(format!("    {} -> {}{};", from.id, to.id, style));
        }

        lines.push("}".to_string());
        lines.push("".to_string());

        lines.join("\n")
    }

    fn node_line(node: &GraphNode) -> String {
        let label = match node.kind {
            NodeKind::Unresolved { reason } => format!("{}\n({})", node.label, reason.tag()),
            NodeKind::Missing => format!("{}\n(missing)", node.label),
            NodeKind::Function { .. } => node.label.clone(),
        };
        let (shape, fill) = Self::node_style(&node.kind);

        let mut style = vec!["filled"];
        if node.entry {
            style.push("bold");
        }
        let bodiless = matches!(
            node.kind,
            NodeKind::Function { has_body: false, kind } if kind != FunctionKind::Event
        );
        if node.excluded || matches!(node.kind, NodeKind::Missing) {
            style.push("dashed");
        } else if bodiless {
            style.push("dotted");
        }

        format!(
            "{} [label=\"{}\", shape={}, style=\"{}\", fillcolor=\"{}\"];",
            node.id,
            Self::escape_label(&label),
            shape,
            style.join(","),
            fill
        )
    }

    fn node_style(kind: &NodeKind) -> (&'static str, &'static str) {
        match kind {
            NodeKind::Function { kind, .. } => match kind {
                FunctionKind::Modifier => ("house", "#f9e2af"), // Yellow
                FunctionKind::Event => ("oval", "#cba6f7"),     // Purple
                FunctionKind::Constructor | FunctionKind::Fallback | FunctionKind::Receive => {
                    ("box", "#a6e3a1") // Green
                }
                FunctionKind::Function => ("box", "#89b4fa"), // Blue
            },
            NodeKind::Missing => ("box", "#bac2de"),
            NodeKind::Unresolved { .. } => ("octagon", "#f38ba8"), // Red
        }
    }

    fn escape_label(label: &str) -> String {
        label
            .replace('\\', "\\\\")
            .replace('"', "\\\"")
            .replace('\n', "\\n")
    }
}
