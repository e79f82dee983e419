//! The analysis pipeline: load, index, select the entry, traverse, render.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::callgraph::CallGraph;
use crate::domain::entry_point::{select_entry, EntryRequest};
use crate::domain::exclusion::parse_rules;
use crate::domain::index::AstIndex;
use crate::domain::traversal::GraphBuilder;
use crate::infrastructure::SourceLoader;
use crate::ports::{GraphExporter, SourceParser};

/// Everything one analysis needs to know.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub file: PathBuf,
    pub entry: EntryRequest,
    /// `Contract:Function[:Count]` rules.
    pub ignore: Vec<String>,
    pub include_paths: Vec<PathBuf>,
}

impl AnalysisRequest {
    /// The contract defaults to the file stem and the function to `fallback`.
    pub fn new(
        file: impl Into<PathBuf>,
        contract: Option<String>,
        function: Option<String>,
        params: Option<usize>,
    ) -> Self {
        let file = file.into();
        let contract = contract.unwrap_or_else(|| {
            file.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        Self {
            entry: EntryRequest::new(contract, function.unwrap_or_default(), params),
            file,
            ignore: Vec::new(),
            include_paths: Vec::new(),
        }
    }
}

pub struct AnalyzeUsecase<'a> {
    pub parser: &'a dyn SourceParser,
    pub exporter: &'a dyn GraphExporter,
}

impl<'a> AnalyzeUsecase<'a> {
    pub fn build_graph(&self, request: &AnalysisRequest) -> Result<CallGraph> {
        let rules = parse_rules(&request.ignore).context("Invalid ignore list")?;

        let loader = SourceLoader::new(self.parser, request.include_paths.clone());
        let units = loader
            .load(&request.file)
            .with_context(|| format!("Failed to load {}", request.file.display()))?;

        let index = AstIndex::build(&units);
        let entry = select_entry(&index, &request.entry)
            .with_context(|| format!("Cannot start from {}", request.entry))?;

        Ok(GraphBuilder::new(&index, &rules).build(entry))
    }

    /// Build the graph and write it to `export_path`, or to stdout.
    pub fn run(&self, request: &AnalysisRequest, export_path: Option<&Path>) -> Result<()> {
        let cg = self.build_graph(request)?;
        match export_path {
            Some(path) => self
                .exporter
                .export(&cg, &path.to_string_lossy())
                .with_context(|| format!("Failed to write {}", path.display())),
            None => {
                let rendered = self.exporter.render(&cg)?;
                std::io::stdout()
                    .lock()
                    .write_all(rendered.as_bytes())
                    .context("Failed to write to stdout")
            }
        }
    }
}
