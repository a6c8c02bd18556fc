use std::time::Instant;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::db::{fetch_filter_tags, fetch_song_summaries, fetch_songs_by_tag};
use crate::filter::{FilterController, HistoryLocation, TagIndex, Timings};
use crate::models::{Song, SongSummary, Tag};

/// State behind the song list: the loaded catalog, the filter controller and
/// the rows currently on screen.
pub(crate) struct SongListScreen {
    pub(crate) songs: Vec<SongSummary>,
    pub(crate) tag_index: TagIndex,
    pub(crate) tags: Vec<Tag>,
    pub(crate) controller: FilterController,
    pub(crate) view: Vec<SongSummary>,
    pub(crate) selected: usize,
}

impl SongListScreen {
    /// Load songs and tags, then seed the filters from the location.
    pub(crate) fn load(
        conn: &Connection,
        location: &HistoryLocation,
        timings: Timings,
    ) -> Result<Self> {
        let songs = fetch_song_summaries(conn).context("failed to load songs")?;
        let tag_index = TagIndex::new(fetch_songs_by_tag(conn)?);
        let tags = fetch_filter_tags(conn)?;
        Ok(Self::new(
            songs,
            tag_index,
            tags,
            FilterController::mount(location, timings),
        ))
    }

    pub(crate) fn new(
        songs: Vec<SongSummary>,
        tag_index: TagIndex,
        tags: Vec<Tag>,
        controller: FilterController,
    ) -> Self {
        let mut screen = Self {
            songs,
            tag_index,
            tags,
            controller,
            view: Vec::new(),
            selected: 0,
        };
        screen.refresh_view();
        screen
    }

    /// Recompute the visible rows, keeping the selection on the same song
    /// when it is still visible.
    pub(crate) fn refresh_view(&mut self) {
        let selected_id = self.current_song().map(|song| song.id);
        self.view = self.controller.derived_view(&self.songs, &self.tag_index);
        self.selected = selected_id
            .and_then(|id| self.view.iter().position(|song| song.id == id))
            .unwrap_or(0);
        self.ensure_in_bounds();
    }

    /// Replace the catalog after a mutation without touching the filters.
    pub(crate) fn reload(&mut self, conn: &Connection) -> Result<()> {
        self.songs = fetch_song_summaries(conn).context("failed to reload songs")?;
        self.tag_index = TagIndex::new(fetch_songs_by_tag(conn)?);
        self.refresh_view();
        Ok(())
    }

    /// Pull back/forward navigation into the filters.
    pub(crate) fn sync(&mut self, location: &HistoryLocation, now: Instant) -> bool {
        let changed = self.controller.sync_from_location(location, now);
        if changed {
            self.refresh_view();
        }
        changed
    }

    pub(crate) fn current_song(&self) -> Option<&SongSummary> {
        self.view.get(self.selected)
    }

    pub(crate) fn select_song(&mut self, id: i64) {
        if let Some(idx) = self.view.iter().position(|song| song.id == id) {
            self.selected = idx;
        }
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.view.is_empty() {
            return;
        }
        let last = self.view.len() as isize - 1;
        self.selected = (self.selected as isize + offset).clamp(0, last) as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.view.len().saturating_sub(1);
    }

    pub(crate) fn ensure_in_bounds(&mut self) {
        if self.selected >= self.view.len() {
            self.selected = self.view.len().saturating_sub(1);
        }
    }

    /// Short description of the active filters for the list title.
    pub(crate) fn filter_summary(&self) -> String {
        let state = self.controller.state();
        let mut parts = Vec::new();
        if state.incomplete_only {
            parts.push("incomplete".to_string());
        }
        parts.extend(state.active_tags.iter().cloned());
        if parts.is_empty() {
            format!("{} songs", self.view.len())
        } else {
            format!(
                "{} of {} songs · {}",
                self.view.len(),
                self.songs.len(),
                parts.join(", ")
            )
        }
    }
}

/// A single song opened from the list.
pub(crate) struct SongDetailScreen {
    pub(crate) song: Song,
    pub(crate) views: i64,
}

/// Cursor inside the filter popup. Row 0 is the incomplete toggle, the
/// remaining rows follow the tag order.
#[derive(Default, Clone, Copy)]
pub(crate) struct FilterMenuState {
    pub(crate) cursor: usize,
}

impl FilterMenuState {
    pub(crate) fn move_cursor(&mut self, delta: isize, tag_count: usize) {
        let last = tag_count as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, last) as usize;
    }

    /// The tag under the cursor, or `None` when it sits on the incomplete row.
    pub(crate) fn selected_tag<'a>(&self, tags: &'a [Tag]) -> Option<&'a Tag> {
        self.cursor.checked_sub(1).and_then(|idx| tags.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn summary(id: i64, title: &str, link: Option<&str>) -> SongSummary {
        SongSummary {
            id,
            title: title.to_string(),
            artist: String::new(),
            dance_name: None,
            dance_choreographer: None,
            dance_instructions_link: link.map(str::to_string),
        }
    }

    fn screen(query: &str) -> SongListScreen {
        let location = HistoryLocation::new(query);
        let tags = vec![Tag {
            id: 1,
            name: "Early Night".to_string(),
        }];
        SongListScreen::new(
            vec![
                summary(1, "Tush Push", Some("x")),
                summary(2, "Cowboy Cha Cha", None),
                summary(3, "Copperhead Road", None),
            ],
            TagIndex::new(HashMap::from([("Early Night".to_string(), vec![2])])),
            tags,
            FilterController::mount(&location, Timings::default()),
        )
    }

    #[test]
    fn mount_applies_the_location_query() {
        let screen = screen("filter=incomplete");
        assert_eq!(screen.view.len(), 2);
        assert_eq!(screen.filter_summary(), "2 of 3 songs · incomplete");
    }

    #[test]
    fn selection_follows_the_song_across_refreshes() {
        let mut screen = screen("");
        screen.select_song(3);
        assert_eq!(screen.selected, 2);

        let mut location = HistoryLocation::new("");
        screen.controller.toggle_incomplete(&mut location);
        screen.refresh_view();

        assert_eq!(screen.current_song().map(|song| song.id), Some(3));
    }

    #[test]
    fn selection_is_clamped() {
        let mut screen = screen("");
        screen.move_selection(10);
        assert_eq!(screen.selected, 2);
        screen.move_selection(-10);
        assert_eq!(screen.selected, 0);
        screen.select_last();
        assert_eq!(screen.selected, 2);
    }

    #[test]
    fn sync_picks_up_back_navigation() {
        let mut screen = screen("");
        let mut location = HistoryLocation::new("");
        screen.controller.toggle_tag("Early Night", &mut location);
        screen.refresh_view();
        assert_eq!(screen.view.len(), 1);

        location.back();
        assert!(screen.sync(&location, Instant::now()));
        assert_eq!(screen.view.len(), 3);
    }

    #[test]
    fn filter_menu_rows_map_to_tags() {
        let tags = vec![Tag {
            id: 1,
            name: "Early Night".to_string(),
        }];
        let mut menu = FilterMenuState::default();
        assert!(menu.selected_tag(&tags).is_none());
        menu.move_cursor(5, tags.len());
        assert_eq!(menu.cursor, 1);
        assert_eq!(menu.selected_tag(&tags).map(|t| t.name.as_str()), Some("Early Night"));
    }
}
