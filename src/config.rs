//! Configuration loading from a `solgraph.toml` file.
//!
//! Every field is optional; command line flags override or extend it.
//!
//! ```toml
//! ignore = ["SafeMath:add", "Ownable:owner:0"]
//! include-paths = ["node_modules", "lib"]
//! format = "dot"
//! clusters = true
//! jobs = 4
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::Deserialize;

use crate::error::{Result, SolgraphError};
use crate::ports::dot_exporter::DotExporter;
use crate::ports::json_exporter::JsonExporter;
use crate::ports::text_exporter::TextExporter;
use crate::ports::GraphExporter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Dot,
    Json,
    Text,
}

impl OutputFormat {
    pub fn exporter(self, clusters: bool) -> Box<dyn GraphExporter> {
        match self {
            OutputFormat::Dot => Box::new(DotExporter { clusters }),
            OutputFormat::Json => Box::new(JsonExporter),
            OutputFormat::Text => Box::new(TextExporter),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Directories searched for non-relative imports, after the root file's directory.
    #[serde(default)]
    pub include_paths: Vec<PathBuf>,
    pub format: Option<OutputFormat>,
    pub clusters: Option<bool>,
    pub jobs: Option<usize>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| SolgraphError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::parse(&content).map_err(|message| SolgraphError::Config {
            path: path.display().to_string(),
            message,
        })?;

        // Relative include paths are relative to the config file.
        if let Some(dir) = path.parent() {
            for include in &mut config.include_paths {
                if include.is_relative() {
                    *include = dir.join(&*include);
                }
            }
        }
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        toml::from_str(content).map_err(|e| e.message().to_string())
    }
}
