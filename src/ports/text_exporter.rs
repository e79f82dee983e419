// Plain text exporter: an indented call tree from the entry point.
// A node already printed is shown once more with a trailing `...` and not expanded again.

use std::collections::HashSet;

use crate::domain::callgraph::{CallGraph, NodeKind};
use crate::error::Result;
use crate::ports::GraphExporter;

pub struct TextExporter;

impl GraphExporter for TextExporter {
    fn render(&self, cg: &CallGraph) -> Result<String> {
        let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); cg.node_count()];
        for edge in cg.edges() {
            adjacency[edge.from].push(edge.to);
        }

        let mut out = String::new();
        let mut printed = HashSet::new();
        let roots = (0..cg.node_count()).filter(|&i| cg.node(i).map_or(false, |n| n.entry));
        for root in roots {
            write_tree(cg, &adjacency, root, 0, &mut printed, &mut out);
        }
        Ok(out)
    }
}

fn write_tree(
    cg: &CallGraph,
    adjacency: &[Vec<usize>],
    pos: usize,
    depth: usize,
    printed: &mut HashSet<usize>,
    out: &mut String,
) {
    let Some(node) = cg.node(pos) else {
        return;
    };
    let mut line = format!("{}{}", "    ".repeat(depth), node.label);
    match node.kind {
        NodeKind::Unresolved { reason } => line.push_str(&format!(" [unresolved: {}]", reason)),
        NodeKind::Missing => line.push_str(" [missing]"),
        NodeKind::Function { .. } if node.excluded => line.push_str(" [ignored]"),
        NodeKind::Function { .. } => {}
    }

    let first_visit = printed.insert(pos);
    if !first_visit && !adjacency[pos].is_empty() {
        line.push_str(" ...");
    }
    out.push_str(&line);
    out.push('\n');

    if first_visit {
        for &callee in &adjacency[pos] {
            write_tree(cg, adjacency, callee, depth + 1, printed, out);
        }
    }
}
