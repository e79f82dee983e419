//! Graph Builder
//!
//! Depth-first walk from the entry point. Every definition's body is walked at
//! most once, which is what makes recursive and mutually recursive call graphs
//! terminate.

use std::collections::HashSet;

use crate::domain::call_site::collect_call_sites;
use crate::domain::callgraph::{CallGraph, NodeKey, NodeKind};
use crate::domain::entry_point::EntryPoint;
use crate::domain::exclusion::{is_excluded, IgnoreRule};
use crate::domain::index::{AstIndex, FunctionId, FunctionRef};
use crate::domain::resolver::{CallResolver, Resolution, Scope};

pub struct GraphBuilder<'a> {
    index: &'a AstIndex<'a>,
    resolver: CallResolver<'a>,
    rules: &'a [IgnoreRule],
}

/// Traversal state, scoped to one `build` call.
#[derive(Default)]
struct Walk {
    graph: CallGraph,
    expanded: HashSet<FunctionId>,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(index: &'a AstIndex<'a>, rules: &'a [IgnoreRule]) -> Self {
        Self {
            index,
            resolver: CallResolver::new(index),
            rules,
        }
    }

    pub fn build(&self, entry: EntryPoint<'a>) -> CallGraph {
        let mut walk = Walk::default();
        let root = self.function_node(&mut walk.graph, entry.function);
        walk.graph.mark_entry(root);
        self.visit(entry.function, entry.dispatch, root, &mut walk);

        log::info!(
            "built call graph from {}: {} nodes, {} edges, {} bodies walked",
            entry.function.id(),
            walk.graph.node_count(),
            walk.graph.edge_count(),
            walk.expanded.len()
        );
        walk.graph
    }

    fn visit(&self, function: FunctionRef<'a>, dispatch: &'a str, node: usize, walk: &mut Walk) {
        let id = function.id();
        if !walk.expanded.insert(id.clone()) {
            return;
        }
        if is_excluded(&id, self.rules) {
            log::debug!("not expanding ignored {}", id);
            walk.graph.mark_excluded(node);
            return;
        }

        let scope = Scope::new(function, dispatch);
        for site in collect_call_sites(function.def) {
            match self.resolver.resolve(&site, &scope) {
                Resolution::Resolved(candidates) => {
                    let targets: Vec<(FunctionRef<'a>, usize)> = candidates
                        .into_iter()
                        .map(|c| (c, self.function_node(&mut walk.graph, c)))
                        .collect();
                    for (_, target) in &targets {
                        walk.graph.add_edge(node, *target);
                    }
                    for (callee, target) in targets {
                        let next = self.next_dispatch(dispatch, callee);
                        self.visit(callee, next, target, walk);
                    }
                }
                Resolution::Unresolved(reason) => {
                    let target = walk.graph.add_node(
                        NodeKey::Unresolved {
                            text: site.text.clone(),
                            reason,
                        },
                        site.text.clone(),
                        None,
                        NodeKind::Unresolved { reason },
                    );
                    walk.graph.add_edge(node, target);
                }
                Resolution::Missing(missing) => {
                    let label = format!("{}.{}({})", missing.contract, missing.name, missing.params);
                    let contract = Some(missing.contract.clone());
                    let target =
                        walk.graph
                            .add_node(NodeKey::Missing(missing), label, contract, NodeKind::Missing);
                    walk.graph.add_edge(node, target);
                }
                Resolution::Builtin => {}
            }
        }
    }

    /// Callees inherited by the dispatch contract keep its dispatch; anything
    /// else is dispatched from its own contract.
    fn next_dispatch(&self, dispatch: &'a str, callee: FunctionRef<'a>) -> &'a str {
        if self
            .index
            .linearization_of(dispatch)
            .iter()
            .any(|level| level == callee.owner())
        {
            dispatch
        } else {
            callee.owner()
        }
    }

    fn function_node(&self, graph: &mut CallGraph, function: FunctionRef<'a>) -> usize {
        let id = function.id();
        let mut label = format!("{}.{}({})", id.contract, id.name, id.params);
        let siblings = self
            .index
            .lookup_functions(&id.contract, &id.name, Some(id.params))
            .len();
        if siblings > 1 {
            label.push_str(&format!(" [{}]", function.def.param_types().join(", ")));
        }
        graph.add_node(
            NodeKey::Function(id),
            label,
            Some(function.owner().to_string()),
            NodeKind::Function {
                kind: function.def.kind,
                has_body: function.def.has_body(),
            },
        )
    }
}
