//! # Herdbook Sync CLI
//!
//! Runs one sync pass of a local farm database against Firestore.
//!
//! ## Usage
//! ```bash
//! # Push everything dirty using ~/.config/herdbook/sync.toml
//! cargo run -p herdbook-sync -- --db ./herdbook_dev.db
//!
//! # Explicit config, only show what would be pushed
//! cargo run -p herdbook-sync -- --config ./sync.toml --db ./herdbook_dev.db --pending
//! ```
//!
//! Exit code is non-zero when the pass aborts or any table fails.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use herdbook_db::{Database, DbConfig};
use herdbook_sync::{
    init_tracing, FirestoreClient, NetworkMonitor, SyncConfig, SyncManager, TcpProbe,
};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(error = %e, "Sync failed");
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Parsed command line.
#[derive(Debug, PartialEq)]
struct Args {
    config_path: Option<PathBuf>,
    db_path: String,
    pending_only: bool,
    help: bool,
}

/// Parses the arguments after the program name.
fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args {
        config_path: None,
        db_path: String::from("./herdbook_dev.db"),
        pending_only: false,
        help: false,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = iter.next().ok_or("--config requires a path")?;
                parsed.config_path = Some(PathBuf::from(value));
            }
            "--db" | "-d" => {
                let value = iter.next().ok_or("--db requires a path")?;
                parsed.db_path = value.clone();
            }
            "--pending" | "-p" => parsed.pending_only = true,
            "--help" | "-h" => parsed.help = true,
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    Ok(parsed)
}

fn print_help() {
    println!("Herdbook Sync");
    println!();
    println!("Usage: herdbook-sync [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>  Sync config file (default: platform config dir)");
    println!("  -d, --db <PATH>      Database file path (default: ./herdbook_dev.db)");
    println!("  -p, --pending        Print dirty rows per table and exit");
    println!("  -h, --help           Show this help message");
    if let Some(path) = SyncConfig::default_config_path() {
        println!();
        println!("Default config: {}", path.display());
    }
}

/// Returns whether every table synced.
async fn run() -> Result<bool, Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let Args {
        config_path,
        db_path,
        pending_only,
        help,
    } = parse_args(&args)?;

    if help {
        print_help();
        return Ok(true);
    }

    let config = SyncConfig::load(config_path)?;
    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("🐄 Herdbook Sync");
    println!("================");
    println!("Database: {}", db_path);
    println!("Scope:    {}", config.scope());
    println!();

    let remote = Arc::new(FirestoreClient::new(&config.remote)?);

    let monitor = NetworkMonitor::default();
    let probe = TcpProbe::from_settings(&config.network);
    monitor.report(probe.check().await);

    let manager = SyncManager::new(db.clone(), remote, config)?.with_network(monitor);

    if pending_only {
        for (table, pending) in manager.pending_counts().await? {
            println!("  {:<20} {}", table.table_name(), pending);
        }
        db.close().await;
        return Ok(true);
    }

    let start = std::time::Instant::now();
    let report = manager.sync_all().await;
    db.close().await;
    let report = report?;

    for result in &report.results {
        println!("✓ {:<20} {}", result.table.table_name(), result.synced_count);
    }
    for failure in &report.failures {
        println!("✗ {:<20} {}", failure.table.table_name(), failure.error);
    }

    info!(
        synced = report.total_synced(),
        failed = report.failures.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Sync pass complete"
    );
    println!();
    println!("Pushed {} rows in {:?}", report.total_synced(), start.elapsed());

    Ok(report.is_complete())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args_defaults_and_values() {
        let parsed = parse_args(&[]).unwrap();
        assert_eq!(parsed.db_path, "./herdbook_dev.db");
        assert!(parsed.config_path.is_none());

        let parsed = parse_args(&args(&["-c", "sync.toml", "--db", "farm.db", "-p"])).unwrap();
        assert_eq!(parsed.config_path, Some(PathBuf::from("sync.toml")));
        assert_eq!(parsed.db_path, "farm.db");
        assert!(parsed.pending_only);
    }

    #[test]
    fn test_parse_args_rejects_missing_values() {
        assert!(parse_args(&args(&["--db"])).is_err());
        assert!(parse_args(&args(&["--pending", "--config"])).is_err());
        assert!(parse_args(&args(&["--dbb", "farm.db"])).is_err());
    }
}
