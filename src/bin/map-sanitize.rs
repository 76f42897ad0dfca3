//! map-sanitize CLI - reads tap messages on stdin (or a file), writes sanitized
//! messages on stdout.

use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process;

use map_sanitize::{ConfigSource, ErrorPolicy, SanitizeConfig, SanitizeMapper, StreamProcessor};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "map-sanitize")]
#[command(version, about = "Normalize field names and string values in a tap/target stream", long_about = None)]
struct Cli {
    /// Config file (JSON or YAML), or ENV to read MAP_SANITIZE_* variables. Repeatable.
    #[arg(short, long, value_name = "PATH|ENV")]
    config: Vec<String>,

    /// Read messages from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// What to do with a message that cannot be mapped
    #[arg(long, value_enum, default_value_t = ErrorPolicy::Abort)]
    on_error: ErrorPolicy,

    /// Print mapper name, version and settings schema as JSON, then exit
    #[arg(long)]
    about: bool,
}

fn main() {
    let cli = Cli::parse();

    // stdout carries the message stream, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(cli) {
        tracing::error!("{}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.about {
        println!("{}", serde_json::to_string_pretty(&SanitizeMapper::about())?);
        return Ok(());
    }

    let sources: Vec<ConfigSource> = cli.config.iter().map(|c| ConfigSource::parse(c)).collect();
    if sources.contains(&ConfigSource::Env) {
        dotenv::dotenv().ok();
    }

    let mapper = SanitizeMapper::new(SanitizeConfig::load(&sources)?);
    tracing::info!(
        config = ?mapper.config(),
        steps = ?mapper.rules().step_names(),
        "Loaded configuration"
    );

    let input: Box<dyn BufRead> = match &cli.input {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    let stdout = io::stdout().lock();
    StreamProcessor::new(&mapper)
        .with_policy(cli.on_error)
        .run(input, io::BufWriter::new(stdout))?;

    Ok(())
}
