use crate::domain::ast::SourceUnit;
use crate::domain::callgraph::CallGraph;
use crate::error::Result;

pub mod dot_exporter;
pub mod json_exporter;
pub mod text_exporter;

/// Turns one source file into its lowered syntax tree.
pub trait SourceParser: Sync {
    fn parse(&self, path: &str, source: &str) -> Result<SourceUnit>;
}

/// Renders a finished call graph.
pub trait GraphExporter {
    fn render(&self, cg: &CallGraph) -> Result<String>;

    fn export(&self, cg: &CallGraph, path: &str) -> Result<()> {
        let content = self.render(cg)?;
        std::fs::write(path, content).map_err(|source| crate::error::SolgraphError::Io {
            path: path.to_string(),
            source,
        })
    }
}
