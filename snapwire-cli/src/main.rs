/*!
Snapwire CLI - command-line interface for the snapwire snapshot store.

Dumps JSON documents into timestamped snapshots, loads them back as JSON,
and lists, prunes, or inspects the snapshot directory.
*/

use anyhow::Context;
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand};
use snapwire_core::{
    snapshot::{format_timestamp, parse_timestamp},
    value::{mapping_from_json, mapping_to_json},
    SnapshotFile, SnapshotStore, SnapwireError, StoreConfig,
};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "snapwire")]
#[command(about = "CLI for the snapwire snapshot store")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Snapshot directory (overrides the config file)
    #[arg(short, long, global = true, env = "SNAPWIRE_DIR")]
    dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a JSON object as a new snapshot
    Dump {
        /// JSON file holding a top-level object
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Print a snapshot as JSON
    Load {
        /// Load the snapshot closest to this time instead of the newest
        #[arg(long)]
        at: Option<String>,
    },
    /// List snapshots
    List {
        /// Order by distance to this time instead of newest first
        #[arg(long)]
        at: Option<String>,
    },
    /// Remove the given number of snapshots, most recent first
    Prune {
        #[arg(short = 'n', long)]
        count: usize,
    },
    /// Delete one snapshot
    Delete {
        /// Snapshot identifier (file name or path)
        snapshot_id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Decode any snapshot file and print its contents
    Inspect {
        file: PathBuf,
    },
}

#[derive(Tabled)]
struct SnapshotInfo {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Created")]
    timestamp: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Size")]
    size: String,
}

impl From<&SnapshotFile> for SnapshotInfo {
    fn from(snapshot: &SnapshotFile) -> Self {
        let modified: DateTime<Local> = snapshot.modified().into();
        SnapshotInfo {
            id: snapshot.id(),
            timestamp: snapshot.timestamp().format("%Y-%m-%d %H:%M:%S%.6f UTC").to_string(),
            modified: modified.format("%Y-%m-%d %H:%M:%S").to_string(),
            size: format_size(snapshot.size()),
        }
    }
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    snapwire_core::init_observability(cli.json_logs, cli.verbose)?;

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Dump { input } => dump_snapshot(config, &input)?,
        Commands::Load { at } => load_snapshot(config, at.as_deref())?,
        Commands::List { at } => list_snapshots(config, at.as_deref())?,
        Commands::Prune { count } => prune_snapshots(config, count)?,
        Commands::Delete { snapshot_id, force } => delete_snapshot(config, &snapshot_id, force)?,
        Commands::Inspect { file } => inspect_file(&config, &file)?,
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<StoreConfig, anyhow::Error> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(dir) = &cli.dir {
        config.dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

fn parse_target(at: Option<&str>) -> Result<Option<DateTime<Utc>>, anyhow::Error> {
    at.map(parse_timestamp).transpose().map_err(Into::into)
}

fn dump_snapshot(config: StoreConfig, input: &Path) -> Result<(), anyhow::Error> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let json: serde_json::Value = serde_json::from_str(&raw)?;
    let serde_json::Value::Object(object) = json else {
        anyhow::bail!("{} must contain a JSON object", input.display());
    };
    let doc = mapping_from_json(object)?;

    let store = SnapshotStore::open(config)?;
    let snapshot = store.dump(&doc)?;
    info!(id = %snapshot.id(), "Dumped {} entries", doc.len());
    println!("{}", snapshot.id());
    Ok(())
}

fn load_snapshot(config: StoreConfig, at: Option<&str>) -> Result<(), anyhow::Error> {
    let target = parse_target(at)?;
    let store = SnapshotStore::open(config)?;
    let doc = store.load(target)?;
    println!("{}", serde_json::to_string_pretty(&mapping_to_json(&doc)?)?);
    Ok(())
}

fn list_snapshots(config: StoreConfig, at: Option<&str>) -> Result<(), anyhow::Error> {
    let target = parse_target(at)?;
    if let Some(target) = target {
        info!("Listing snapshots nearest to {}", format_timestamp(target));
    }

    let store = SnapshotStore::open(config)?;
    let snapshots = store.list(target)?;

    if snapshots.is_empty() {
        println!("No snapshots found in {}", store.dir().display());
    } else {
        let rows: Vec<SnapshotInfo> = snapshots.iter().map(SnapshotInfo::from).collect();
        println!("{}", Table::new(rows));
    }
    Ok(())
}

fn prune_snapshots(config: StoreConfig, count: usize) -> Result<(), anyhow::Error> {
    let store = SnapshotStore::open(config)?;
    let removed = store.prune(count)?;
    println!("✓ Removed {removed} snapshot(s)");
    Ok(())
}

fn delete_snapshot(
    config: StoreConfig,
    snapshot_id: &str,
    force: bool,
) -> Result<(), anyhow::Error> {
    if !force {
        print!("Are you sure you want to delete snapshot '{snapshot_id}'? (y/N): ");
        use std::io::{self, Write};
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().to_lowercase().starts_with('y') {
            println!("Deletion cancelled");
            return Ok(());
        }
    }

    let store = SnapshotStore::open(config)?;
    match store.prune_snapshot(snapshot_id) {
        Ok(()) => println!("✓ Snapshot deleted successfully"),
        Err(e @ SnapwireError::SnapshotNotFound(_)) => {
            error!("✗ {}", e);
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn inspect_file(config: &StoreConfig, file: &Path) -> Result<(), anyhow::Error> {
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let codec = config.build_codec();
    let doc = codec.decode(&bytes)?;

    println!("File: {}", file.display());
    println!("  Size: {}", format_size(bytes.len() as u64));
    println!("  Entries: {}", doc.len());
    println!("{}", serde_json::to_string_pretty(&mapping_to_json(&doc)?)?);
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
