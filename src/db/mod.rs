//! Persistence module split across logical submodules.

mod connection;
mod import;
mod songs;
mod tags;

pub use connection::{apply_schema, data_dir, default_db_path, ensure_schema, FILTER_TAGS};
pub use import::{import_songs, import_songs_from_path, ImportSummary};
pub use songs::{
    count_song_views, create_song, delete_song, fetch_artists, fetch_song, fetch_song_summaries,
    log_song_view, update_song,
};
pub use tags::{
    create_song_with_tags, fetch_filter_tags, fetch_songs_by_tag, fetch_tags_for_song,
    set_song_tags, update_song_with_tags,
};
