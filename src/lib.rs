//! Core library surface for the dance catalog TUI.
//!
//! The binary only parses configuration and wires these modules together, so
//! the filtering logic and persistence layer stay usable from tests and
//! other tooling.
pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod logging;
pub mod models;
pub mod ui;

/// Persistence entry points used during start-up.
pub use db::{ensure_schema, fetch_song_summaries, fetch_songs_by_tag, import_songs_from_path};

/// Filter state and the pure function deriving the visible rows from it.
pub use filter::{compute_derived_view, FilterState, TagIndex};

pub use models::{Role, Song, SongSummary};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
