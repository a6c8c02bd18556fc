use std::collections::HashMap;

use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, Connection};
use tracing::info;

use super::connection::FILTER_TAGS;
use super::songs::{create_song, update_song};
use crate::models::{Song, SongDraft, Tag};

fn filter_tag_placeholders() -> String {
    (1..=FILTER_TAGS.len())
        .map(|idx| format!("?{idx}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Tags shown in the filter menu and the edit form, in seeding order.
pub fn fetch_filter_tags(conn: &Connection) -> Result<Vec<Tag>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT id, name FROM tags WHERE name IN ({}) ORDER BY id",
            filter_tag_placeholders()
        ))
        .context("failed to prepare tag query")?;

    let tags = stmt
        .query_map(params_from_iter(FILTER_TAGS), |row| {
            Ok(Tag {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .context("failed to load tags")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect tags")?;

    Ok(tags)
}

/// Map each filterable tag to the ids of the songs carrying it. Tags without
/// songs are present with an empty list.
pub fn fetch_songs_by_tag(conn: &Connection) -> Result<HashMap<String, Vec<i64>>> {
    let mut map: HashMap<String, Vec<i64>> = fetch_filter_tags(conn)?
        .into_iter()
        .map(|tag| (tag.name, Vec::new()))
        .collect();

    let mut stmt = conn
        .prepare(&format!(
            "SELECT t.name, st.song_id
             FROM song_tags st
             INNER JOIN tags t ON t.id = st.tag_id
             WHERE t.name IN ({})
             ORDER BY st.song_id",
            filter_tag_placeholders()
        ))
        .context("failed to prepare tag index query")?;

    let mut rows = stmt
        .query(params_from_iter(FILTER_TAGS))
        .context("failed to execute tag index query")?;

    while let Some(row) = rows.next().context("failed to fetch tag index row")? {
        let name: String = row.get(0).context("failed to read tag name")?;
        let song_id: i64 = row.get(1).context("failed to read song id")?;
        map.entry(name).or_default().push(song_id);
    }

    Ok(map)
}

/// Sorted tag names attached to one song.
pub fn fetch_tags_for_song(conn: &Connection, song_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT t.name FROM tags t
             INNER JOIN song_tags st ON st.tag_id = t.id
             WHERE st.song_id = ?1
             ORDER BY t.name COLLATE NOCASE",
        )
        .context("failed to prepare song tag query")?;

    let names = stmt
        .query_map([song_id], |row| row.get(0))
        .context("failed to iterate song tags")?
        .collect::<Result<Vec<String>, _>>()
        .context("failed to collect song tags")?;

    Ok(names)
}

/// Trimmed, sorted, de-duplicated tag names.
fn normalize_tags(names: &[String]) -> Vec<&str> {
    let mut requested: Vec<&str> = names.iter().map(|name| name.trim()).collect();
    requested.retain(|name| !name.is_empty());
    requested.sort_unstable();
    requested.dedup();
    requested
}

fn tags_unchanged(conn: &Connection, song_id: i64, requested: &[&str]) -> Result<bool> {
    let mut current = fetch_tags_for_song(conn, song_id)?;
    current.sort_unstable();
    Ok(current.iter().map(String::as_str).eq(requested.iter().copied()))
}

/// Rewrite the `song_tags` rows of a song. Runs inside the caller's
/// transaction.
fn write_song_tags(conn: &Connection, song_id: i64, requested: &[&str]) -> Result<()> {
    conn.execute("DELETE FROM song_tags WHERE song_id = ?1", params![song_id])
        .context("failed to clear song tags")?;
    for name in requested {
        conn.execute("INSERT OR IGNORE INTO tags (name) VALUES (?1)", params![name])
            .context("failed to create tag")?;
        conn.execute(
            "INSERT INTO song_tags (song_id, tag_id)
             SELECT ?1, id FROM tags WHERE name = ?2",
            params![song_id, name],
        )
        .context("failed to link tag to song")?;
    }
    info!(song_id, tags = ?requested, "updated song tags");
    Ok(())
}

/// Replace the tag set of a song. Returns `false` without touching the
/// database when the requested set equals the stored one.
pub fn set_song_tags(conn: &Connection, song_id: i64, names: &[String]) -> Result<bool> {
    let requested = normalize_tags(names);
    if tags_unchanged(conn, song_id, &requested)? {
        return Ok(false);
    }

    let tx = conn
        .unchecked_transaction()
        .context("failed to start tag transaction")?;
    write_song_tags(&tx, song_id, &requested)?;
    tx.commit().context("failed to commit song tags")?;
    Ok(true)
}

/// Insert a song together with its tags. Nothing is written unless both
/// steps succeed.
pub fn create_song_with_tags(
    conn: &Connection,
    draft: &SongDraft,
    names: &[String],
) -> Result<Song> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start song transaction")?;
    let song = create_song(&tx, draft)?;
    let requested = normalize_tags(names);
    if !requested.is_empty() {
        write_song_tags(&tx, song.id, &requested)?;
    }
    tx.commit().context("failed to commit new song")?;
    Ok(song)
}

/// Update a song and replace its tags in one transaction. Returns whether
/// the tag set changed.
pub fn update_song_with_tags(
    conn: &Connection,
    song_id: i64,
    draft: &SongDraft,
    names: &[String],
) -> Result<bool> {
    let tx = conn
        .unchecked_transaction()
        .context("failed to start song transaction")?;
    update_song(&tx, song_id, draft)?;
    let requested = normalize_tags(names);
    let changed = !tags_unchanged(&tx, song_id, &requested)?;
    if changed {
        write_song_tags(&tx, song_id, &requested)?;
    }
    tx.commit().context("failed to commit song update")?;
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::{apply_schema, fetch_song_summaries};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn
    }

    fn song(conn: &Connection, title: &str) -> i64 {
        let draft = SongDraft {
            title: title.to_string(),
            artist: "Unknown".to_string(),
            ..SongDraft::default()
        };
        create_song(conn, &draft).unwrap().id
    }

    #[test]
    fn filter_tags_keep_seeding_order() {
        let conn = test_conn();
        let names: Vec<String> = fetch_filter_tags(&conn)
            .unwrap()
            .into_iter()
            .map(|tag| tag.name)
            .collect();
        assert_eq!(names, FILTER_TAGS.map(str::to_string).to_vec());
    }

    #[test]
    fn songs_by_tag_ignores_unlisted_tags() {
        let conn = test_conn();
        let a = song(&conn, "A");
        let b = song(&conn, "B");
        set_song_tags(&conn, a, &["Early Night".to_string(), "Archived".to_string()]).unwrap();
        set_song_tags(&conn, b, &["Early Night".to_string(), "Late Night".to_string()]).unwrap();

        let map = fetch_songs_by_tag(&conn).unwrap();

        assert_eq!(map.get("Early Night"), Some(&vec![a, b]));
        assert_eq!(map.get("Late Night"), Some(&vec![b]));
        assert_eq!(map.get("Friday Lessons"), Some(&Vec::new()));
        assert!(!map.contains_key("Archived"));
    }

    #[test]
    fn set_song_tags_reports_unchanged_sets() {
        let conn = test_conn();
        let id = song(&conn, "Electric Slide");
        let tags = vec!["Late Night".to_string(), "Early Night".to_string()];

        assert!(set_song_tags(&conn, id, &tags).unwrap());
        let reordered = vec!["Early Night".to_string(), "Late Night".to_string()];
        assert!(!set_song_tags(&conn, id, &reordered).unwrap());
        assert_eq!(fetch_tags_for_song(&conn, id).unwrap(), reordered);

        assert!(set_song_tags(&conn, id, &[]).unwrap());
        assert!(fetch_tags_for_song(&conn, id).unwrap().is_empty());
    }

    fn refuse_tag_links(conn: &Connection) {
        conn.execute_batch(
            "CREATE TRIGGER refuse_song_tags BEFORE INSERT ON song_tags
             BEGIN SELECT RAISE(ABORT, 'tag write refused'); END;",
        )
        .unwrap();
    }

    #[test]
    fn failed_tag_write_rolls_back_the_new_song() {
        let conn = test_conn();
        refuse_tag_links(&conn);
        let draft = SongDraft {
            title: "Electric Slide".to_string(),
            artist: "Marcia Griffiths".to_string(),
            ..SongDraft::default()
        };

        let result = create_song_with_tags(&conn, &draft, &["Late Night".to_string()]);

        assert!(result.is_err());
        assert!(fetch_song_summaries(&conn).unwrap().is_empty());
    }

    #[test]
    fn failed_tag_write_rolls_back_the_update() {
        let conn = test_conn();
        let id = song(&conn, "Electric Slide");
        refuse_tag_links(&conn);
        let draft = SongDraft {
            title: "Cupid Shuffle".to_string(),
            artist: "Cupid".to_string(),
            ..SongDraft::default()
        };

        let result = update_song_with_tags(&conn, id, &draft, &["Late Night".to_string()]);

        assert!(result.is_err());
        let summaries = fetch_song_summaries(&conn).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].title, "Electric Slide");
    }

    #[test]
    fn create_with_tags_links_them() {
        let conn = test_conn();
        let draft = SongDraft {
            title: "Tush Push".to_string(),
            artist: "Various".to_string(),
            ..SongDraft::default()
        };

        let created =
            create_song_with_tags(&conn, &draft, &[" Early Night ".to_string()]).unwrap();

        assert_eq!(
            fetch_tags_for_song(&conn, created.id).unwrap(),
            vec!["Early Night".to_string()]
        );
    }
}
