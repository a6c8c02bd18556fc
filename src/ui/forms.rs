use std::collections::BTreeSet;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::error::FormError;
use crate::models::{non_blank, Song, SongDraft, Tag};

/// Columns taken by a right-aligned field label and its `: ` separator.
pub(crate) const LABEL_WIDTH: u16 = 15;

/// Fields within the song form, in focus order. `Tags` is a checkbox row
/// rather than a text input.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SongField {
    Title,
    Artist,
    DanceName,
    DanceChoreographer,
    DanceCounts,
    WallCounts,
    StartingWeightFoot,
    DanceInstructionsLink,
    StepSheetLink,
    SongLink,
    SpotifyLink,
    Tags,
}

impl Default for SongField {
    fn default() -> Self {
        SongField::Title
    }
}

impl SongField {
    pub(crate) const ALL: [SongField; 12] = [
        SongField::Title,
        SongField::Artist,
        SongField::DanceName,
        SongField::DanceChoreographer,
        SongField::DanceCounts,
        SongField::WallCounts,
        SongField::StartingWeightFoot,
        SongField::DanceInstructionsLink,
        SongField::StepSheetLink,
        SongField::SongLink,
        SongField::SpotifyLink,
        SongField::Tags,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            SongField::Title => "Title",
            SongField::Artist => "Artist",
            SongField::DanceName => "Dance",
            SongField::DanceChoreographer => "Choreographer",
            SongField::DanceCounts => "Counts",
            SongField::WallCounts => "Walls",
            SongField::StartingWeightFoot => "Starting foot",
            SongField::DanceInstructionsLink => "Instructions",
            SongField::StepSheetLink => "Step sheet",
            SongField::SongLink => "Song link",
            SongField::SpotifyLink => "Spotify",
            SongField::Tags => "Tags",
        }
    }

    fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or_default()
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn is_required(self) -> bool {
        matches!(self, SongField::Title | SongField::Artist)
    }
}

/// Form state for song creation/editing, including artist autocomplete and
/// the tag checkboxes.
#[derive(Default, Clone)]
pub(crate) struct SongForm {
    pub(crate) title: String,
    pub(crate) artist: String,
    pub(crate) dance_name: String,
    pub(crate) dance_choreographer: String,
    pub(crate) dance_counts: String,
    pub(crate) wall_counts: String,
    pub(crate) starting_weight_foot: String,
    pub(crate) dance_instructions_link: String,
    pub(crate) step_sheet_link: String,
    pub(crate) song_link: String,
    pub(crate) spotify_link: String,
    /// Every filter tag the song may carry, in display order.
    pub(crate) available_tags: Vec<String>,
    pub(crate) selected_tags: BTreeSet<String>,
    pub(crate) tag_cursor: usize,
    pub(crate) active: SongField,
    pub(crate) error: Option<String>,
    pub(crate) suggestion: Option<String>,
    pub(crate) autocomplete_disabled: bool,
}

impl SongForm {
    /// Blank form for a new song.
    pub(crate) fn new(tags: &[Tag]) -> Self {
        Self {
            available_tags: tags.iter().map(|tag| tag.name.clone()).collect(),
            ..Self::default()
        }
    }

    /// Populate the form from an existing song when entering edit mode.
    pub(crate) fn from_song(song: &Song, tags: &[Tag]) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_default();
        Self {
            title: song.title.clone(),
            artist: song.artist.clone(),
            dance_name: text(&song.dance_name),
            dance_choreographer: text(&song.dance_choreographer),
            dance_counts: song.dance_counts.map(|c| c.to_string()).unwrap_or_default(),
            wall_counts: song.walls_label(),
            starting_weight_foot: text(&song.starting_weight_foot),
            dance_instructions_link: text(&song.dance_instructions_link),
            step_sheet_link: text(&song.step_sheet_link),
            song_link: text(&song.song_link),
            spotify_link: text(&song.spotify_link),
            selected_tags: song.tags.iter().cloned().collect(),
            ..Self::new(tags)
        }
    }

    fn value(&self, field: SongField) -> Option<&String> {
        match field {
            SongField::Title => Some(&self.title),
            SongField::Artist => Some(&self.artist),
            SongField::DanceName => Some(&self.dance_name),
            SongField::DanceChoreographer => Some(&self.dance_choreographer),
            SongField::DanceCounts => Some(&self.dance_counts),
            SongField::WallCounts => Some(&self.wall_counts),
            SongField::StartingWeightFoot => Some(&self.starting_weight_foot),
            SongField::DanceInstructionsLink => Some(&self.dance_instructions_link),
            SongField::StepSheetLink => Some(&self.step_sheet_link),
            SongField::SongLink => Some(&self.song_link),
            SongField::SpotifyLink => Some(&self.spotify_link),
            SongField::Tags => None,
        }
    }

    fn value_mut(&mut self, field: SongField) -> Option<&mut String> {
        match field {
            SongField::Title => Some(&mut self.title),
            SongField::Artist => Some(&mut self.artist),
            SongField::DanceName => Some(&mut self.dance_name),
            SongField::DanceChoreographer => Some(&mut self.dance_choreographer),
            SongField::DanceCounts => Some(&mut self.dance_counts),
            SongField::WallCounts => Some(&mut self.wall_counts),
            SongField::StartingWeightFoot => Some(&mut self.starting_weight_foot),
            SongField::DanceInstructionsLink => Some(&mut self.dance_instructions_link),
            SongField::StepSheetLink => Some(&mut self.step_sheet_link),
            SongField::SongLink => Some(&mut self.song_link),
            SongField::SpotifyLink => Some(&mut self.spotify_link),
            SongField::Tags => None,
        }
    }

    /// Move focus to the next field, wrapping around.
    pub(crate) fn toggle_field(&mut self) {
        self.active = self.active.next();
        if self.active != SongField::Artist {
            self.clear_suggestion();
        }
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = self.active.previous();
        if self.active != SongField::Artist {
            self.clear_suggestion();
        }
    }

    /// Insert a character into the active field. The tag row ignores typing.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        let active = self.active;
        let Some(value) = self.value_mut(active) else {
            return false;
        };
        value.push(ch);
        if active == SongField::Artist {
            self.autocomplete_disabled = false;
        }
        true
    }

    /// Remove a character from the active field.
    pub(crate) fn backspace(&mut self) {
        let active = self.active;
        if let Some(value) = self.value_mut(active) {
            value.pop();
        }
        if active == SongField::Artist {
            self.autocomplete_disabled = false;
        }
    }

    /// Move the checkbox cursor on the tag row.
    pub(crate) fn move_tag_cursor(&mut self, delta: isize) {
        let len = self.available_tags.len();
        if len == 0 {
            return;
        }
        let next = (self.tag_cursor as isize + delta).rem_euclid(len as isize);
        self.tag_cursor = next as usize;
    }

    /// Check or uncheck the tag under the cursor.
    pub(crate) fn toggle_tag_at_cursor(&mut self) -> bool {
        let Some(tag) = self.available_tags.get(self.tag_cursor) else {
            return false;
        };
        if !self.selected_tags.remove(tag) {
            self.selected_tags.insert(tag.clone());
        }
        true
    }

    pub(crate) fn selected_tags(&self) -> Vec<String> {
        self.selected_tags.iter().cloned().collect()
    }

    /// Validate and normalize form inputs before they are written to the
    /// database.
    pub(crate) fn parse_inputs(&self) -> Result<SongDraft, FormError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FormError::Required("Title"));
        }
        let artist = self.artist.trim();
        if artist.is_empty() {
            return Err(FormError::Required("Artist"));
        }

        Ok(SongDraft {
            title: title.to_string(),
            artist: artist.to_string(),
            song_link: non_blank(&self.song_link),
            spotify_link: non_blank(&self.spotify_link),
            dance_name: non_blank(&self.dance_name),
            dance_instructions_link: non_blank(&self.dance_instructions_link),
            dance_choreographer: non_blank(&self.dance_choreographer),
            step_sheet_link: non_blank(&self.step_sheet_link),
            dance_counts: parse_count("Counts", &self.dance_counts)?,
            wall_counts: parse_walls(&self.wall_counts)?,
            starting_weight_foot: non_blank(&self.starting_weight_foot),
        })
    }

    /// Update the artist autocomplete suggestion based on current input.
    pub(crate) fn update_suggestion(&mut self, artists: &[String]) {
        if self.active != SongField::Artist {
            self.clear_suggestion();
            return;
        }

        if self.autocomplete_disabled || self.artist.chars().count() < 2 {
            self.clear_suggestion();
            return;
        }

        let current_lower = self.artist.to_lowercase();
        let maybe_match = artists
            .iter()
            .find(|candidate| candidate.to_lowercase().starts_with(&current_lower));

        self.suggestion = match maybe_match {
            Some(candidate) if candidate.to_lowercase() == current_lower => None,
            Some(candidate) => Some(candidate.clone()),
            None => None,
        };
    }

    /// Apply the suggested artist, marking autocomplete as satisfied.
    pub(crate) fn accept_suggestion(&mut self) -> bool {
        if self.suggestion_suffix().is_some() {
            if let Some(candidate) = self.suggestion.take() {
                self.artist = candidate;
                self.autocomplete_disabled = true;
                return true;
            }
        }
        false
    }

    /// Explicitly disable autocomplete for the rest of this interaction.
    pub(crate) fn cancel_autocomplete(&mut self) -> bool {
        if self.has_active_suggestion() {
            self.autocomplete_disabled = true;
            self.suggestion = None;
            return true;
        }
        false
    }

    fn clear_suggestion(&mut self) {
        self.suggestion = None;
    }

    /// Return the remaining characters to display as a ghosted autocomplete
    /// hint.
    pub(crate) fn suggestion_suffix(&self) -> Option<String> {
        let candidate = self.suggestion.as_ref()?;
        let suffix: String = candidate.chars().skip(self.artist.chars().count()).collect();
        (!suffix.is_empty()).then_some(suffix)
    }

    pub(crate) fn has_active_suggestion(&self) -> bool {
        self.active == SongField::Artist && self.suggestion.is_some()
    }

    /// Render a styled line for the modal form, optionally appending the
    /// autocomplete suffix.
    pub(crate) fn build_line(&self, field: SongField) -> Line<'static> {
        let is_active = self.active == field;
        let label = Span::raw(format!(
            "{:>width$}: ",
            field.label(),
            width = LABEL_WIDTH as usize - 2
        ));

        let Some(value) = self.value(field) else {
            return self.build_tag_line(label, is_active);
        };

        let placeholder = if field.is_required() {
            "<required>"
        } else {
            "<optional>"
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        let mut spans = vec![label];
        if value.is_empty() && !is_active {
            spans.push(Span::styled(placeholder.to_string(), style));
        } else {
            spans.push(Span::styled(value.clone(), style));
        }
        if field == SongField::Artist && is_active {
            if let Some(suffix) = self.suggestion_suffix() {
                spans.push(Span::styled(suffix, Style::default().fg(Color::DarkGray)));
            }
        }

        Line::from(spans)
    }

    fn build_tag_line(&self, label: Span<'static>, is_active: bool) -> Line<'static> {
        let mut spans = vec![label];
        for (idx, tag) in self.available_tags.iter().enumerate() {
            let mark = if self.selected_tags.contains(tag) { "x" } else { " " };
            let mut style = Style::default();
            if is_active && idx == self.tag_cursor {
                style = style.fg(Color::Yellow).add_modifier(Modifier::BOLD);
            }
            spans.push(Span::styled(format!("[{mark}] {tag}"), style));
            spans.push(Span::raw("  "));
        }
        Line::from(spans)
    }

    /// Character length of the requested field. Zero for the tag row.
    pub(crate) fn value_len(&self, field: SongField) -> usize {
        self.value(field).map_or(0, |value| value.chars().count())
    }
}

fn parse_count(field: &'static str, raw: &str) -> Result<Option<i64>, FormError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<i64>()
        .map(Some)
        .map_err(|_| FormError::NotANumber {
            field,
            value: trimmed.to_string(),
        })
}

/// Walls accept a number or the word "circle", which is stored as `0`.
fn parse_walls(raw: &str) -> Result<Option<i64>, FormError> {
    if raw.trim().eq_ignore_ascii_case("circle") {
        return Ok(Some(0));
    }
    parse_count("Walls", raw)
}

/// State for confirming permanent song deletion.
pub(crate) struct ConfirmSongDelete {
    pub(crate) id: i64,
    pub(crate) title: String,
}

impl ConfirmSongDelete {
    pub(crate) fn from(song: &Song) -> Self {
        Self {
            id: song.id,
            title: song.display_title(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn tags() -> Vec<Tag> {
        ["Early Night", "Late Night"]
            .iter()
            .enumerate()
            .map(|(idx, name)| Tag {
                id: idx as i64 + 1,
                name: name.to_string(),
            })
            .collect()
    }

    fn type_into(form: &mut SongForm, text: &str) {
        for ch in text.chars() {
            form.push_char(ch);
        }
    }

    #[test]
    fn title_and_artist_are_required() {
        let mut form = SongForm::new(&tags());
        assert_eq!(form.parse_inputs(), Err(FormError::Required("Title")));

        type_into(&mut form, "Tush Push");
        assert_eq!(form.parse_inputs(), Err(FormError::Required("Artist")));
    }

    #[test]
    fn parses_counts_and_circle_walls() {
        let mut form = SongForm::new(&tags());
        form.title = "Cotton Eye Joe".to_string();
        form.artist = "Rednex".to_string();
        form.dance_counts = " 32 ".to_string();
        form.wall_counts = "Circle".to_string();
        form.dance_name = "   ".to_string();

        let draft = form.parse_inputs().unwrap();

        assert_eq!(draft.dance_counts, Some(32));
        assert_eq!(draft.wall_counts, Some(0));
        assert_eq!(draft.dance_name, None);
    }

    #[test]
    fn rejects_non_numeric_counts() {
        let mut form = SongForm::new(&tags());
        form.title = "Tush Push".to_string();
        form.artist = "Various".to_string();
        form.dance_counts = "lots".to_string();

        let err = form.parse_inputs().unwrap_err();
        assert_eq!(err.to_string(), "Counts must be a whole number, got \"lots\".");
    }

    #[test]
    fn edit_form_round_trips_a_song() {
        let song = Song {
            id: 7,
            title: "Copperhead Road".to_string(),
            artist: "Steve Earle".to_string(),
            song_link: None,
            spotify_link: None,
            dance_name: Some("Copperhead Road".to_string()),
            dance_instructions_link: Some("https://example.com".to_string()),
            dance_choreographer: None,
            step_sheet_link: None,
            dance_counts: Some(40),
            wall_counts: Some(4),
            starting_weight_foot: Some("Left".to_string()),
            created_at: String::new(),
            updated_at: String::new(),
            tags: vec!["Late Night".to_string()],
        };

        let form = SongForm::from_song(&song, &tags());
        let draft = form.parse_inputs().unwrap();

        assert_eq!(draft.title, song.title);
        assert_eq!(draft.wall_counts, Some(4));
        assert_eq!(draft.dance_instructions_link, song.dance_instructions_link);
        assert_eq!(form.selected_tags(), vec!["Late Night".to_string()]);
    }

    #[test]
    fn tag_row_toggles_under_cursor() {
        let mut form = SongForm::new(&tags());
        form.active = SongField::Tags;
        assert!(!form.push_char('x'));

        form.move_tag_cursor(-1);
        assert_eq!(form.tag_cursor, 1);
        form.toggle_tag_at_cursor();
        assert_eq!(form.selected_tags(), vec!["Late Night".to_string()]);
        form.toggle_tag_at_cursor();
        assert!(form.selected_tags().is_empty());
    }

    #[test]
    fn artist_autocomplete_suggests_and_accepts() {
        let artists = vec!["Brooks & Dunn".to_string(), "Garth Brooks".to_string()];
        let mut form = SongForm::new(&tags());
        form.toggle_field();
        assert_eq!(form.active, SongField::Artist);

        type_into(&mut form, "br");
        form.update_suggestion(&artists);
        assert_eq!(form.suggestion_suffix().as_deref(), Some("ooks & Dunn"));

        assert!(form.accept_suggestion());
        assert_eq!(form.artist, "Brooks & Dunn");
        form.update_suggestion(&artists);
        assert!(!form.has_active_suggestion());
    }

    #[test]
    fn focus_wraps_in_both_directions() {
        let mut form = SongForm::default();
        form.previous_field();
        assert_eq!(form.active, SongField::Tags);
        form.toggle_field();
        assert_eq!(form.active, SongField::Title);
    }
}
