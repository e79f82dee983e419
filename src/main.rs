// Command-line entry point for solgraph.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use solgraph::application::{AnalysisRequest, AnalyzeUsecase};
use solgraph::config::{Config, OutputFormat};
use solgraph::infrastructure::concurrency::init_thread_pool;
use solgraph::infrastructure::TreeSitterSolidityParser;

#[derive(Parser, Debug)]
#[command(author, version, about = "Static call graph of a Solidity entry point", long_about = None)]
struct Cli {
    /// Solidity source file
    file: PathBuf,

    /// Contract holding the entry function (default: the file name without extension)
    contract: Option<String>,

    /// Entry function (default: fallback; the contract's own name selects the constructor)
    function: Option<String>,

    /// Parameter count of the entry function, to pick between overloads
    count: Option<usize>,

    /// Do not expand this function (Contract:Function[:Count]); repeatable
    #[arg(short, long, value_name = "RULE")]
    ignore: Vec<String>,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Extra directory to search for imports; repeatable
    #[arg(short = 'I', long = "include", value_name = "DIR")]
    include: Vec<PathBuf>,

    /// Do not group nodes by contract in DOT output
    #[arg(long)]
    no_clusters: bool,

    /// Worker threads for parsing (default: half the cores)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    init_thread_pool(cli.jobs.or(config.jobs))?;

    let mut request = AnalysisRequest::new(&cli.file, cli.contract, cli.function, cli.count);
    request.ignore = config.ignore.iter().chain(&cli.ignore).cloned().collect();
    request.include_paths = config.include_paths.iter().chain(&cli.include).cloned().collect();

    let format = cli.format.or(config.format).unwrap_or_default();
    let clusters = !cli.no_clusters && config.clusters.unwrap_or(true);
    let exporter = format.exporter(clusters);

    let parser = TreeSitterSolidityParser;
    let usecase = AnalyzeUsecase {
        parser: &parser,
        exporter: exporter.as_ref(),
    };

    usecase.run(&request, cli.output.as_deref())?;
    if let Some(path) = &cli.output {
        log::info!("call graph written to {} ({:?})", path.display(), format);
    }
    Ok(())
}
