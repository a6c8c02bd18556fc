use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};

use super::tags::fetch_tags_for_song;
use crate::models::{Song, SongDraft, SongSummary};

const SONG_COLUMNS: &str = "id, title, artist, song_link, spotify_link, dance_name,
     dance_instructions_link, dance_choreographer, step_sheet_link, dance_counts,
     wall_counts, starting_weight_foot, created_at, updated_at";

/// Fetch the list-screen snapshot of every song, most recently updated
/// first. Ties on the second-resolution timestamp fall back to the newest id.
pub fn fetch_song_summaries(conn: &Connection) -> Result<Vec<SongSummary>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, title, artist, dance_name, dance_choreographer, dance_instructions_link
             FROM songs
             ORDER BY updated_at DESC, id DESC",
        )
        .context("failed to prepare song summary query")?;

    let songs = stmt
        .query_map([], |row| {
            Ok(SongSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                artist: row.get(2)?,
                dance_name: row.get(3)?,
                dance_choreographer: row.get(4)?,
                dance_instructions_link: row.get(5)?,
            })
        })
        .context("failed to iterate song summaries")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect song summaries")?;

    Ok(songs)
}

/// Retrieve distinct artists for the form's auto-complete. The ordering sorts
/// by lowercase first but falls back to the original text to keep accents and
/// capitalization intact.
pub fn fetch_artists(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT artist FROM songs
             WHERE artist <> ''
             ORDER BY LOWER(artist), artist",
        )
        .context("failed to prepare artist query")?;

    let mut rows = stmt.query([]).context("failed to execute artist query")?;

    let mut artists = Vec::new();
    while let Some(row) = rows.next().context("failed to fetch artist row")? {
        let artist: String = row.get(0).context("failed to read artist value")?;
        artists.push(artist);
    }

    Ok(artists)
}

fn song_from_row(row: &Row<'_>) -> rusqlite::Result<Song> {
    Ok(Song {
        id: row.get(0)?,
        title: row.get(1)?,
        artist: row.get(2)?,
        song_link: row.get(3)?,
        spotify_link: row.get(4)?,
        dance_name: row.get(5)?,
        dance_instructions_link: row.get(6)?,
        dance_choreographer: row.get(7)?,
        step_sheet_link: row.get(8)?,
        dance_counts: row.get(9)?,
        wall_counts: row.get(10)?,
        starting_weight_foot: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
        tags: Vec::new(),
    })
}

/// Load one song with its tags. `None` when the id does not exist.
pub fn fetch_song(conn: &Connection, id: i64) -> Result<Option<Song>> {
    let song = conn
        .query_row(
            &format!("SELECT {SONG_COLUMNS} FROM songs WHERE id = ?1"),
            params![id],
            song_from_row,
        )
        .optional()
        .context("failed to load song")?;

    match song {
        Some(mut song) => {
            song.tags = fetch_tags_for_song(conn, id)?;
            Ok(Some(song))
        }
        None => Ok(None),
    }
}

/// Insert the row without any bookkeeping. Shared by the form flow and the
/// CSV importer, which runs it inside a transaction.
pub(crate) fn insert_song_row(conn: &Connection, draft: &SongDraft) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO songs (
            title, artist, song_link, spotify_link, dance_name, dance_instructions_link,
            dance_choreographer, step_sheet_link, dance_counts, wall_counts, starting_weight_foot
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            draft.title,
            draft.artist,
            draft.song_link,
            draft.spotify_link,
            draft.dance_name,
            draft.dance_instructions_link,
            draft.dance_choreographer,
            draft.step_sheet_link,
            draft.dance_counts,
            draft.wall_counts,
            draft.starting_weight_foot,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Insert a brand new song and echo the hydrated record so callers can jump
/// straight to its detail screen.
pub fn create_song(conn: &Connection, draft: &SongDraft) -> Result<Song> {
    let id = insert_song_row(conn, draft).context("failed to insert song")?;
    info!(id, title = %draft.title, "created song");
    fetch_song(conn, id)?.ok_or_else(|| anyhow!("Song not found"))
}

/// Overwrite every editable field and bump `updated_at`.
pub fn update_song(conn: &Connection, id: i64, draft: &SongDraft) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE songs SET
                title = ?1, artist = ?2, song_link = ?3, spotify_link = ?4, dance_name = ?5,
                dance_instructions_link = ?6, dance_choreographer = ?7, step_sheet_link = ?8,
                dance_counts = ?9, wall_counts = ?10, starting_weight_foot = ?11,
                updated_at = CURRENT_TIMESTAMP
             WHERE id = ?12",
            params![
                draft.title,
                draft.artist,
                draft.song_link,
                draft.spotify_link,
                draft.dance_name,
                draft.dance_instructions_link,
                draft.dance_choreographer,
                draft.step_sheet_link,
                draft.dance_counts,
                draft.wall_counts,
                draft.starting_weight_foot,
                id,
            ],
        )
        .context("failed to update song")?;

    if updated == 0 {
        Err(anyhow!("Song not found"))
    } else {
        info!(id, "updated song");
        Ok(())
    }
}

/// Permanently delete a song. Tags and view rows cascade.
pub fn delete_song(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn
        .execute("DELETE FROM songs WHERE id = ?1", params![id])
        .context("failed to delete song")?;

    if deleted == 0 {
        Err(anyhow!("Song not found"))
    } else {
        info!(id, "deleted song");
        Ok(())
    }
}

/// Record that the detail screen was opened for a song.
pub fn log_song_view(conn: &Connection, song_id: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO song_views (song_id) VALUES (?1)",
        params![song_id],
    )
    .context("failed to record song view")?;
    debug!(song_id, "logged song view");
    Ok(())
}

pub fn count_song_views(conn: &Connection, song_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM song_views WHERE song_id = ?1",
        params![song_id],
        |row| row.get(0),
    )
    .context("failed to count song views")
}
