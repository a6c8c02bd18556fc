//! Command-line and environment configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::db::{data_dir, default_db_path};
use crate::filter::Timings;
use crate::models::Role;

/// Browse and manage a catalog of dance songs.
#[derive(Parser, Debug)]
#[command(name = "dance-catalog")]
#[command(version)]
pub struct Args {
    /// SQLite database file
    #[arg(long, env = "DANCE_CATALOG_DB")]
    pub db: Option<PathBuf>,

    /// Allow creating, editing and deleting songs
    #[arg(long, env = "DANCE_CATALOG_ADMIN")]
    pub admin: bool,

    /// Initial song list query, e.g. `q=cha&filter=incomplete&tags=Early+Night`
    #[arg(long, default_value = "")]
    pub query: String,

    /// Quiet period before a typed search is committed
    #[arg(long, default_value_t = 300)]
    pub debounce_ms: u64,

    /// How long after a keystroke location changes to the search are ignored
    #[arg(long, default_value_t = 700)]
    pub guard_ms: u64,

    /// Directory for log files
    #[arg(long, env = "DANCE_CATALOG_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Bulk import songs from a CSV file
    Import {
        /// CSV file with a header row
        file: PathBuf,
    },
    /// Print the songs matching a query and exit
    List {
        /// Same syntax as `--query`
        #[arg(long, default_value = "")]
        query: String,
    },
}

/// Resolved settings the rest of the program consumes.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub role: Role,
    pub initial_query: String,
    pub timings: Timings,
    pub command: Option<Command>,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let db_path = match args.db {
            Some(path) => path,
            None => default_db_path()?,
        };
        let log_dir = match args.log_dir {
            Some(dir) => dir,
            None => data_dir()?.join("logs"),
        };

        Ok(Self {
            db_path,
            log_dir,
            role: if args.admin { Role::Admin } else { Role::Viewer },
            initial_query: args.query,
            timings: Timings {
                debounce: Duration::from_millis(args.debounce_ms),
                guard: Duration::from_millis(args.guard_ms),
            },
            command: args.command,
        })
    }
}
