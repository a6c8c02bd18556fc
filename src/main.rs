//! Binary entry point: resolve configuration, start logging, open the SQLite
//! store, then either run a one-shot subcommand or the TUI.
use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use dance_catalog::config::{Args, Command, Config};
use dance_catalog::filter::{from_query, HistoryLocation};
use dance_catalog::{
    compute_derived_view, ensure_schema, fetch_song_summaries, fetch_songs_by_tag,
    import_songs_from_path, logging, run_app, App, TagIndex,
};

fn main() -> Result<()> {
    let config = Config::from_args(Args::parse())?;
    let _log_guard = logging::init(&config.log_dir)?;
    info!(db = %config.db_path.display(), "starting dance catalog");

    let mut conn = ensure_schema(&config.db_path)?;

    match &config.command {
        Some(Command::Import { file }) => {
            let summary = import_songs_from_path(&mut conn, file)
                .with_context(|| format!("failed to import {}", file.display()))?;
            println!(
                "Imported {} songs ({} skipped).",
                summary.imported, summary.skipped
            );
            Ok(())
        }
        Some(Command::List { query }) => {
            let songs = fetch_song_summaries(&conn)?;
            let index = TagIndex::new(fetch_songs_by_tag(&conn)?);
            let view = compute_derived_view(&songs, &from_query(query), &index);
            for song in &view {
                println!("{}\t{}\t{}", song.id, song.title, song.artist);
            }
            Ok(())
        }
        None => {
            let location = HistoryLocation::new(&config.initial_query);
            let mut app = App::new(conn, config.role, location, config.timings)?;
            run_app(&mut app)
        }
    }
}
