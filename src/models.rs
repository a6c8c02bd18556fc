//! Domain models that mirror the SQLite schema and get passed throughout the
//! TUI. These types stay light-weight data holders so other layers can focus
//! on presentation, filtering and persistence logic.

use std::fmt;

/// Snapshot of a song as shown in the list screen. The list loads these once
/// per mount and never mutates them; a reload replaces the whole vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongSummary {
    /// Primary key from the SQLite store.
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub dance_name: Option<String>,
    pub dance_choreographer: Option<String>,
    /// Link to a video or page teaching the dance. Songs without one are
    /// considered incomplete.
    pub dance_instructions_link: Option<String>,
}

impl SongSummary {
    /// Whether the song still needs dance instructions. Blank strings count
    /// as missing so hand-edited rows behave like imported ones.
    pub fn is_incomplete(&self) -> bool {
        self.dance_instructions_link
            .as_deref()
            .map_or(true, |link| link.trim().is_empty())
    }

    /// The four text fields the fuzzy search looks at, in ranking order.
    pub fn searchable_fields(&self) -> [&str; 4] {
        [
            &self.title,
            &self.artist,
            self.dance_name.as_deref().unwrap_or(""),
            self.dance_choreographer.as_deref().unwrap_or(""),
        ]
    }
}

/// Full song record used by the detail screen and the edit form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub artist: String,
    pub song_link: Option<String>,
    pub spotify_link: Option<String>,
    pub dance_name: Option<String>,
    pub dance_instructions_link: Option<String>,
    pub dance_choreographer: Option<String>,
    pub step_sheet_link: Option<String>,
    pub dance_counts: Option<i64>,
    /// Number of walls; `0` encodes a circle dance.
    pub wall_counts: Option<i64>,
    pub starting_weight_foot: Option<String>,
    /// SQLite `CURRENT_TIMESTAMP` text (`YYYY-MM-DD HH:MM:SS`, UTC).
    pub created_at: String,
    pub updated_at: String,
    /// Names of the tags attached to the song, sorted.
    pub tags: Vec<String>,
}

impl Song {
    /// Compose a `Title - Artist` string that omits the hyphen if the artist
    /// is blank.
    pub fn display_title(&self) -> String {
        if self.artist.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.artist)
        }
    }

    /// Human-readable wall count, spelling out circle dances.
    pub fn walls_label(&self) -> String {
        match self.wall_counts {
            Some(0) => "Circle".to_string(),
            Some(walls) => walls.to_string(),
            None => String::new(),
        }
    }
}

/// Validated field values ready to be written to the `songs` table. Produced
/// by the song form and the CSV importer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongDraft {
    pub title: String,
    pub artist: String,
    pub song_link: Option<String>,
    pub spotify_link: Option<String>,
    pub dance_name: Option<String>,
    pub dance_instructions_link: Option<String>,
    pub dance_choreographer: Option<String>,
    pub step_sheet_link: Option<String>,
    pub dance_counts: Option<i64>,
    pub wall_counts: Option<i64>,
    pub starting_weight_foot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Who is driving the application. Mutations are restricted to admins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Viewer,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Trim a free-form input and map blank values to `None`.
pub fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(link: Option<&str>) -> SongSummary {
        SongSummary {
            id: 1,
            title: "Boot Scootin' Boogie".to_string(),
            artist: "Brooks & Dunn".to_string(),
            dance_name: None,
            dance_choreographer: None,
            dance_instructions_link: link.map(str::to_string),
        }
    }

    #[test]
    fn blank_instructions_link_counts_as_incomplete() {
        assert!(summary(None).is_incomplete());
        assert!(summary(Some("   ")).is_incomplete());
        assert!(!summary(Some("https://example.com/steps")).is_incomplete());
    }

    #[test]
    fn non_blank_trims_and_drops_empty_values() {
        assert_eq!(non_blank("  Early Night "), Some("Early Night".to_string()));
        assert_eq!(non_blank("\t"), None);
    }
}
