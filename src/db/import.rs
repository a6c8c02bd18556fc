use std::fs::File;
use std::io::Read;
use std::path::Path;

use rusqlite::Connection;
use tracing::{info, warn};

use super::songs::insert_song_row;
use crate::error::ImportError;
use crate::models::{non_blank, SongDraft};

/// Outcome of a bulk import, reported back to the CLI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Import songs from a CSV file on disk. See [`import_songs`] for the column
/// layout.
pub fn import_songs_from_path(
    conn: &mut Connection,
    path: &Path,
) -> Result<ImportSummary, ImportError> {
    let file = File::open(path)?;
    info!(path = %path.display(), "importing songs");
    import_songs(conn, file)
}

/// Import songs from CSV. The first row is a header. Columns are positional:
/// `id, title, artist, song_link, dance_name, dance_counts, wall_counts,
/// starting_weight_foot, dance_instructions_link, step_sheet_link,
/// dance_choreographer`. The `id` column is ignored. All rows are written in
/// one transaction; a database failure rolls the whole file back.
pub fn import_songs<R: Read>(
    conn: &mut Connection,
    reader: R,
) -> Result<ImportSummary, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let tx = conn.transaction()?;
    let mut summary = ImportSummary::default();

    for (idx, record) in csv_reader.records().enumerate() {
        let record = record?;
        // Header is line 1.
        let line = idx + 2;
        match draft_from_record(&record) {
            Some(draft) => {
                insert_song_row(&tx, &draft)?;
                summary.imported += 1;
            }
            None => {
                warn!(line, "skipping CSV row without a title");
                summary.skipped += 1;
            }
        }
    }

    tx.commit()?;
    info!(imported = summary.imported, skipped = summary.skipped, "import finished");
    Ok(summary)
}

fn draft_from_record(record: &csv::StringRecord) -> Option<SongDraft> {
    let cell = |idx: usize| record.get(idx).unwrap_or("").trim();

    let title = non_blank(cell(1))?;
    let wall_counts = match cell(6) {
        walls if walls.eq_ignore_ascii_case("circle") => Some(0),
        walls => parse_leading_int(walls),
    };

    Some(SongDraft {
        title,
        artist: cell(2).to_string(),
        song_link: non_blank(cell(3)),
        spotify_link: None,
        dance_name: non_blank(cell(4)),
        dance_counts: parse_leading_int(cell(5)),
        wall_counts,
        starting_weight_foot: non_blank(cell(7)),
        dance_instructions_link: non_blank(cell(8)),
        step_sheet_link: non_blank(cell(9)),
        dance_choreographer: non_blank(cell(10)),
    })
}

/// Parse the leading run of digits (with an optional sign), so spreadsheet
/// values like `32 counts` still import. Anything else is treated as absent.
fn parse_leading_int(value: &str) -> Option<i64> {
    let value = value.trim();
    let sign_len = usize::from(value.starts_with(['-', '+']));
    let digits = value[sign_len..]
        .chars()
        .take_while(char::is_ascii_digit)
        .count();
    if digits == 0 {
        return None;
    }
    value[..sign_len + digits].parse().ok()
}
