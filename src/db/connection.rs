use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use rusqlite::{params, Connection};
use tracing::debug;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".dance-catalog";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "songs.sqlite";

/// Tags offered in the song list's filter menu. Other tags may exist in the
/// database but are neither filterable nor editable from the form.
pub const FILTER_TAGS: [&str; 4] = [
    "Wednesday Lessons",
    "Friday Lessons",
    "Early Night",
    "Late Night",
];

/// Open (creating if needed) the database at `path`, run lazy migrations, and
/// return a live connection.
pub fn ensure_schema(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(path).context("failed to open SQLite database")?;
    apply_schema(&conn)?;
    debug!(path = %path.display(), "database ready");
    Ok(conn)
}

/// Create every table and seed the filterable tags. Safe to run repeatedly;
/// tests call it on in-memory connections.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS songs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            song_link TEXT,
            spotify_link TEXT,
            dance_name TEXT,
            dance_instructions_link TEXT,
            dance_choreographer TEXT,
            step_sheet_link TEXT,
            dance_counts INTEGER,
            wall_counts INTEGER,
            starting_weight_foot TEXT,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )
    .context("failed to create songs table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tags (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )
    .context("failed to create tags table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS song_tags (
            song_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (song_id, tag_id),
            FOREIGN KEY(song_id) REFERENCES songs(id) ON DELETE CASCADE,
            FOREIGN KEY(tag_id) REFERENCES tags(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create song_tags table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS song_views (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            song_id INTEGER NOT NULL,
            viewed_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY(song_id) REFERENCES songs(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create song_views table")?;

    for name in FILTER_TAGS {
        conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![name])
            .with_context(|| format!("failed to seed tag {name}"))?;
    }

    Ok(())
}

/// Directory holding the database and log files inside the user's home.
pub fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

/// Resolve the default absolute path to the SQLite database.
pub fn default_db_path() -> Result<PathBuf> {
    Ok(data_dir()?.join(DB_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent_and_seeds_filter_tags_once() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, FILTER_TAGS.len() as i64);
    }

    #[test]
    fn ensure_schema_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("songs.sqlite");

        ensure_schema(&path).unwrap();

        assert!(path.exists());
    }
}
