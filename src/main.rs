// Command-line entry point for callviz.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use callviz::api::{self, dto::GenerateRequest, server};
use callviz::infrastructure::concurrency::init_thread_pool;
use callviz::infrastructure::config::Config;
use callviz::infrastructure::logging::init_logging;
use callviz::ports::dot_exporter::DotExporter;
use callviz::ports::DocumentExporter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Dot,
    Json,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Recorded workspace snapshot (JSON)
    #[arg(short, long, required_unless_present = "serve")]
    snapshot: Option<PathBuf>,

    /// Output file path (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Dot)]
    format: OutputFormat,

    /// Write the anchor -> source lookup table here (JSON)
    #[arg(long)]
    lookup: Option<PathBuf>,

    /// Language policy (go, rust, python, typescript)
    #[arg(long)]
    lang: Option<String>,

    /// Workspace root used for directory clusters
    #[arg(long)]
    root: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Only the call graph around the function at path:line:column
    #[arg(long)]
    focus: Option<String>,

    /// Levels of calls to follow with --focus
    #[arg(long, requires = "focus")]
    depth: Option<usize>,

    /// Run the JSON-lines daemon on this port instead
    #[arg(long)]
    serve: Option<u16>,

    /// Worker threads (default: half the cores)
    #[arg(long)]
    threads: Option<usize>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    init_thread_pool(cli.threads)?;

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(port) = cli.serve {
        return server::start_server(port, config.render);
    }

    let request = GenerateRequest {
        snapshot: cli.snapshot.context("--snapshot is required")?,
        lang: cli.lang,
        root: cli.root,
        focus: cli.focus,
        depth: cli.depth,
    };
    let generated = api::generate(&request)?;

    let content = match cli.format {
        OutputFormat::Dot => DotExporter::new(config.render).render(&generated.document),
        OutputFormat::Json => serde_json::to_string_pretty(&generated)?,
    };

    match &cli.output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "graph written");
        }
        None => print!("{}", content),
    }

    if let Some(path) = &cli.lookup {
        let json = serde_json::to_string_pretty(&generated.lookup)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    }

    info!(
        tables = generated.document.tables.len(),
        edges = generated.stats.kept,
        discarded = generated.stats.discarded(),
        "call graph generated"
    );
    Ok(())
}
