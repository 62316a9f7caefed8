// Centralized logging infrastructure for termgraph.
// Structured tracing for the store lifecycle: base builds, snapshot
// restore/save, and query execution.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the logging infrastructure with default verbosity.
/// This should be called once at application startup.
pub fn init_logging() -> Result<()> {
    init_logging_with_level(false, false)
}

/// Initialize logging with configurable verbosity.
pub fn init_logging_with_level(verbose: bool, quiet: bool) -> Result<()> {
    // Determine the filter level based on flags
    let filter_level = if quiet {
        // In quiet mode, suppress everything except errors
        EnvFilter::new("error")
    } else if verbose {
        // In verbose mode, show debug info for termgraph and info for others
        EnvFilter::new("termgraph=debug,info")
    } else {
        // Default: show warnings and errors for termgraph, only errors for
        // dependencies. Users can enable more with RUST_LOG.
        EnvFilter::new("termgraph=warn,error")
    };

    // Quiet takes precedence over the environment variable so that quiet
    // ALWAYS suppresses logs regardless of RUST_LOG
    let env_filter = if quiet {
        EnvFilter::new("error")
    } else if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::try_from_default_env().unwrap_or(filter_level)
    } else {
        filter_level
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(!quiet)
        .with_thread_ids(!quiet)
        .with_ansi(true);

    match tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
    {
        Ok(()) => {
            if !quiet {
                info!("termgraph observability initialized");
            }
            Ok(())
        }
        Err(_) => {
            // Already initialized, which is fine in test environments
            Ok(())
        }
    }
}

/// High-level store operations for structured lifecycle logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Operation {
    /// Base indices were built from the configured source files
    BaseBuild {
        concepts: usize,
        relations: usize,
    },
    /// Cache copies were restored from a snapshot file
    SnapshotRestore {
        path: PathBuf,
        entries: usize,
    },
    /// Cache copies were persisted to a snapshot file
    SnapshotSave {
        path: PathBuf,
        entries: usize,
    },
    Shutdown,
}

/// Log a completed operation with its outcome.
pub fn log_operation(op: &Operation, result: &Result<()>) {
    match result {
        Ok(()) => info!("operation completed: {:?}", op),
        Err(e) => error!(error = %e, "operation failed: {:?}", op),
    }
}
