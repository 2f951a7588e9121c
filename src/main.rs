use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use tdat::classify::{NoopClassifier, ThreadClassifier};
use tdat::cli::{Cli, OutputFormat};
use tdat::pools::PoolRegistry;
use tdat::rules::RuleEngine;
use tdat::session::{AnalysisSession, InputFile};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_pools(args: &Cli) -> Result<PoolRegistry> {
    match &args.pools {
        Some(path) => PoolRegistry::from_toml(path),
        None => PoolRegistry::default_pools(),
    }
}

fn load_classifier(args: &Cli) -> Result<Box<dyn ThreadClassifier>> {
    if args.no_rules {
        return Ok(Box::new(NoopClassifier));
    }
    let engine = match &args.rules {
        Some(path) => RuleEngine::from_toml(path)?,
        None => RuleEngine::default_rules()?,
    };
    Ok(Box::new(engine))
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    // Configuration problems are fatal; per-file problems end up in the report
    let pools = load_pools(&args)?;
    let classifier = load_classifier(&args)?;

    if args.usages.len() > args.dumps.len() {
        tracing::warn!(
            "{} usage files given for {} dumps; extra usage files are ignored",
            args.usages.len(),
            args.dumps.len()
        );
    }

    let dumps: Vec<InputFile> = args.dumps.iter().map(InputFile::path).collect();
    let usages: Vec<InputFile> = args.usages.iter().map(InputFile::path).collect();

    let session = AnalysisSession::new(&pools, classifier.as_ref());
    let report = session.analyze(&dumps, &usages);
    if report.is_empty() {
        tracing::warn!("no threads recovered from {} dumps", dumps.len());
    }

    let rendered = match args.format {
        OutputFormat::Json => report.to_json_pretty()? + "\n",
        OutputFormat::Text => report.render_text(),
    };

    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("Failed to write report to {}", path.display()))?,
        None => print!("{}", rendered),
    }

    Ok(())
}
