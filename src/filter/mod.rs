//! Song list filtering: the filter state, the tag index, and the pure
//! function turning both into the rows the list screen shows.

pub mod controller;
pub mod fuzzy;
pub mod location;
pub mod query;

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::models::SongSummary;

pub use controller::{FilterController, SearchPhase, Timings};
pub use location::{HistoryLocation, Location};
pub use query::{from_query, to_query};

/// Everything the user can filter the song list by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    pub search_text: String,
    /// Only show songs without dance instructions.
    pub incomplete_only: bool,
    pub active_tags: BTreeSet<String>,
}

impl FilterState {
    /// Add the tag if absent, remove it if present. Returns whether the tag
    /// is active afterwards.
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        if self.active_tags.remove(tag) {
            false
        } else {
            self.active_tags.insert(tag.to_string());
            true
        }
    }

    /// Number shown on the filter menu badge.
    pub fn active_filter_count(&self) -> usize {
        self.active_tags.len() + usize::from(self.incomplete_only)
    }
}

/// Tag name to the ids of the songs carrying it. Built once per list load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIndex {
    songs_by_tag: HashMap<String, HashSet<i64>>,
}

impl TagIndex {
    pub fn new(map: HashMap<String, Vec<i64>>) -> Self {
        map.into_iter().collect()
    }

    /// Union of the songs of every listed tag. Unknown tags contribute
    /// nothing.
    pub fn songs_with_any<'a, I>(&self, tags: I) -> HashSet<i64>
    where
        I: IntoIterator<Item = &'a String>,
    {
        tags.into_iter()
            .filter_map(|tag| self.songs_by_tag.get(tag))
            .flatten()
            .copied()
            .collect()
    }

    pub fn song_count(&self, tag: &str) -> usize {
        self.songs_by_tag.get(tag).map_or(0, HashSet::len)
    }
}

impl FromIterator<(String, Vec<i64>)> for TagIndex {
    fn from_iter<T: IntoIterator<Item = (String, Vec<i64>)>>(iter: T) -> Self {
        Self {
            songs_by_tag: iter
                .into_iter()
                .map(|(tag, ids)| (tag, ids.into_iter().collect()))
                .collect(),
        }
    }
}

/// Compute the visible rows. Filters run in a fixed order: completeness,
/// then tags (OR across active tags), then fuzzy search. Search re-sorts by
/// score, best first, keeping input order among equal scores; without a
/// search the input order is kept.
pub fn compute_derived_view(
    songs: &[SongSummary],
    state: &FilterState,
    index: &TagIndex,
) -> Vec<SongSummary> {
    let tagged = (!state.active_tags.is_empty()).then(|| index.songs_with_any(&state.active_tags));

    let filtered = songs
        .iter()
        .filter(|song| !state.incomplete_only || song.is_incomplete())
        .filter(|song| tagged.as_ref().map_or(true, |ids| ids.contains(&song.id)));

    let query = state.search_text.trim();
    if query.is_empty() {
        return filtered.cloned().collect();
    }

    let mut scored: Vec<(f64, &SongSummary)> = filtered
        .filter_map(|song| fuzzy::best_match(query, song.searchable_fields()).map(|s| (s, song)))
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.into_iter().map(|(_, song)| song.clone()).collect()
}
