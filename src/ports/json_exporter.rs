use serde::Serialize;

use crate::domain::callgraph::{CallGraph, GraphNode};
use crate::error::Result;
use crate::ports::GraphExporter;

#[derive(Debug, Serialize)]
pub struct GraphDto<'a> {
    pub entry: Option<&'a str>,
    pub nodes: Vec<&'a GraphNode>,
    pub edges: Vec<EdgeDto<'a>>,
}

#[derive(Debug, Serialize)]
pub struct EdgeDto<'a> {
    pub from: &'a str,
    pub to: &'a str,
}

impl<'a> From<&'a CallGraph> for GraphDto<'a> {
    fn from(cg: &'a CallGraph) -> Self {
        GraphDto {
            entry: cg.nodes().find(|n| n.entry).map(|n| n.id.as_str()),
            nodes: cg.nodes().collect(),
            edges: cg
                .edge_nodes()
                .map(|(from, to)| EdgeDto {
                    from: &from.id,
                    to: &to.id,
                })
                .collect(),
        }
    }
}

pub struct JsonExporter;

impl GraphExporter for JsonExporter {
    fn render(&self, cg: &CallGraph) -> Result<String> {
        let mut json = serde_json::to_string_pretty(&GraphDto::from(cg))?;
        json.push('\n');
        Ok(json)
    }
}
