//! walrog CLI
//!
//! Inspect segment files and append records from the command line.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use walrog::config::{DEFAULT_BUFFER_SIZE, DEFAULT_SEGMENT_SIZE};
use walrog::wal::SegmentStore;
use walrog::{Wal, WalOptions, WalRecovery};

/// walrog CLI
#[derive(Parser, Debug)]
#[command(name = "walrog")]
#[command(about = "Inspect and write segmented write-ahead logs")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every record of one segment file
    Dump {
        /// Segment file (wal_NNN.log)
        segment: PathBuf,
    },

    /// Verify every segment in a log directory
    Verify {
        /// Log directory
        dir: PathBuf,
    },

    /// Append each line read from stdin as one record
    Append {
        /// Log directory
        #[arg(short, long, default_value = "/tmp/WalFolder")]
        dir: PathBuf,

        /// Buffer size in bytes
        #[arg(short, long, default_value_t = DEFAULT_BUFFER_SIZE)]
        buffer_size: u32,

        /// Segment size in bytes (multiple of the buffer size)
        #[arg(short, long, default_value_t = DEFAULT_SEGMENT_SIZE)]
        segment_size: u32,
    },
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,walrog=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Dump { segment } => dump(&segment),
        Commands::Verify { dir } => verify(&dir),
        Commands::Append {
            dir,
            buffer_size,
            segment_size,
        } => append(dir, buffer_size, segment_size),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(category = %e.category(), "{}", e);
            ExitCode::FAILURE
        }
    }
}

fn dump(segment: &Path) -> walrog::Result<()> {
    let entries = WalRecovery::recover(segment)?;
    for entry in &entries {
        println!(
            "lsn={} len={} payload={}",
            entry.lsn,
            entry.payload.len(),
            String::from_utf8_lossy(&entry.payload)
        );
    }
    tracing::info!("{} records in {}", entries.len(), segment.display());
    Ok(())
}

fn verify(dir: &Path) -> walrog::Result<()> {
    let mut failed = None;

    for (id, path) in SegmentStore::list_segments(dir)? {
        match WalRecovery::verify(&path) {
            Ok(summary) => println!(
                "segment {:03}: ok, {} records, {} bytes, lsn {:?}..={:?}",
                id, summary.entries, summary.bytes, summary.first_lsn, summary.last_lsn
            ),
            Err(e) => {
                println!("segment {:03}: CORRUPT: {}", id, e);
                failed.get_or_insert(e);
            }
        }
    }

    match failed {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn append(dir: PathBuf, buffer_size: u32, segment_size: u32) -> walrog::Result<()> {
    let options = WalOptions::builder()
        .dir(dir)
        .buffer_size(buffer_size)
        .segment_size(segment_size)
        .build();

    let mut wal = Wal::open(options)?;
    let mut count = 0u64;

    for line in io::stdin().lock().lines() {
        let line = line?;
        wal.append(line.as_bytes())?;
        count += 1;
    }

    let next_lsn = wal.next_lsn();
    wal.close().map_err(|(wal, e)| {
        tracing::warn!(buffered = wal.buffered(), "close failed, buffered records not persisted");
        e
    })?;
    tracing::info!("appended {} records, next lsn {}", count, next_lsn);
    Ok(())
}
