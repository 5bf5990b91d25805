use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use insight_core::DatasetStore;
use insightql::{
    load_snapshots, remove_snapshot, write_snapshot, Config, DatasetKind, InsightFacade,
};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "insightql")]
#[command(about = "InsightQL - JSON queries over section and room datasets", long_about = None)]
struct Args {
    /// Directory containing insightql.toml and .env
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Data directory path (overrides config)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Maximum number of records a query may produce (overrides config)
    #[arg(long)]
    max_results: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a query read from FILE, or from stdin when FILE is "-"
    Query { file: String },
    /// List loaded datasets
    List,
    /// Add a dataset from a JSON array of records and save its snapshot
    Add {
        id: String,
        #[arg(value_parser = parse_kind)]
        kind: DatasetKind,
        file: PathBuf,
    },
    /// Remove a dataset and its snapshot
    Remove { id: String },
}

fn parse_kind(s: &str) -> Result<DatasetKind, String> {
    match s {
        "sections" => Ok(DatasetKind::Sections),
        "rooms" => Ok(DatasetKind::Rooms),
        other => Err(format!("unknown dataset kind '{}', expected sections or rooms", other)),
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load(&args.config_dir)?;
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }
    if let Some(max_results) = args.max_results {
        anyhow::ensure!(max_results > 0, "--max-results must be greater than zero");
        config.max_results = max_results;
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut facade = InsightFacade::with_limits(config.limits());
    load_snapshots(&mut facade, &config.data_dir)?;

    match args.command {
        Command::Query { file } => {
            let query = read_json(&file)?;
            let results = facade.perform_query(&query)?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::List => {
            println!("{}", serde_json::to_string_pretty(&facade.list_datasets())?);
        }
        Command::Add { id, kind, file } => {
            let records = match read_json(&file.to_string_lossy())? {
                Value::Array(records) => records,
                _ => anyhow::bail!("{} must contain a JSON array of records", file.display()),
            };
            let ids = facade.add_dataset(&id, kind, records)?;
            let dataset = facade
                .store()
                .dataset(&id)
                .context("dataset missing right after insert")?;
            let path = write_snapshot(&config.data_dir, dataset)?;
            tracing::info!("Saved snapshot {}", path.display());
            println!("{}", serde_json::to_string_pretty(&ids)?);
        }
        Command::Remove { id } => {
            let removed = facade.remove_dataset(&id)?;
            remove_snapshot(&config.data_dir, &removed)?;
            println!("{}", serde_json::to_string(&removed)?);
        }
    }

    Ok(())
}

fn read_json(source: &str) -> anyhow::Result<Value> {
    let content = if source == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("Failed to read {}", source))?
    };
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON from {}", source))
}
