//! Keeps the song list's [`FilterState`] and the location query in step.
//!
//! Toggles commit to the location immediately. Typing in the search box is
//! debounced: each keystroke restarts the timer and only the final text is
//! committed once input goes quiet. While typing, and for a short guard
//! window afterwards, search text coming back from the location is ignored so
//! an in-flight edit is never overwritten. All time is passed in explicitly.

use std::time::{Duration, Instant};

use tracing::debug;

use super::location::Location;
use super::query::{from_query, to_query};
use super::{compute_derived_view, FilterState, TagIndex};
use crate::models::SongSummary;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_GUARD: Duration = Duration::from_millis(700);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Quiet period after the last keystroke before the search is committed.
    pub debounce: Duration,
    /// How long after the last keystroke inbound search text is ignored.
    pub guard: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            guard: DEFAULT_GUARD,
        }
    }
}

/// Where the search field is in its edit/commit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    /// A commit is scheduled; a newer keystroke replaces both instants.
    TypingDebouncing {
        commit_at: Instant,
        guard_until: Instant,
    },
    /// Writing the location. Only observable from inside [`FilterController::poll`].
    Committing,
    /// Committed, but still inside the guard window of the last keystroke.
    Settling { guard_until: Instant },
}

pub struct FilterController {
    state: FilterState,
    phase: SearchPhase,
    timings: Timings,
    /// Last query read from or written to the location.
    last_seen_query: String,
    /// Search text from `last_seen_query` was held back by the guard and
    /// still has to be adopted once the guard expires.
    search_held_back: bool,
    focus_requested: bool,
}

impl FilterController {
    /// Seed the controller from the location, as on page load.
    pub fn mount(location: &impl Location, timings: Timings) -> Self {
        let query = location.current_query();
        Self {
            state: from_query(&query),
            phase: SearchPhase::Idle,
            timings,
            last_seen_query: query,
            search_held_back: false,
            focus_requested: false,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    pub fn has_pending_commit(&self) -> bool {
        matches!(self.phase, SearchPhase::TypingDebouncing { .. })
    }

    /// Record a keystroke. The text is visible immediately; the location is
    /// updated later by [`poll`](Self::poll).
    pub fn set_search_text(&mut self, text: impl Into<String>, now: Instant) {
        self.state.search_text = text.into();
        self.search_held_back = false;
        self.phase = SearchPhase::TypingDebouncing {
            commit_at: now + self.timings.debounce,
            guard_until: now + self.timings.guard,
        };
    }

    /// Advance timers. Returns `true` when a debounced commit fired or when
    /// search text held back during the guard window was adopted from the
    /// location.
    pub fn poll(&mut self, now: Instant, location: &mut impl Location) -> bool {
        match self.phase {
            SearchPhase::TypingDebouncing {
                commit_at,
                guard_until,
            } if now >= commit_at => {
                self.phase = SearchPhase::Committing;
                self.commit(location);
                self.phase = if now < guard_until {
                    SearchPhase::Settling { guard_until }
                } else {
                    SearchPhase::Idle
                };
                true
            }
            SearchPhase::Settling { guard_until } if now >= guard_until => {
                self.phase = SearchPhase::Idle;
                if !std::mem::take(&mut self.search_held_back) {
                    return false;
                }
                let incoming = from_query(&self.last_seen_query).search_text;
                debug!(search = %incoming, "adopting search text from location");
                let changed = incoming != self.state.search_text;
                self.state.search_text = incoming;
                changed
            }
            _ => false,
        }
    }

    /// Flip the "incomplete only" filter and commit right away. Returns the
    /// new value.
    pub fn toggle_incomplete(&mut self, location: &mut impl Location) -> bool {
        self.state.incomplete_only = !self.state.incomplete_only;
        self.commit(location);
        self.state.incomplete_only
    }

    /// Add or remove a tag filter and commit right away. Returns whether the
    /// tag is now active.
    pub fn toggle_tag(&mut self, tag: &str, location: &mut impl Location) -> bool {
        let active = self.state.toggle_tag(tag);
        self.commit(location);
        active
    }

    /// Empty the search box, drop any pending commit, write the location
    /// immediately, and ask the UI to focus the search input.
    pub fn clear_search(&mut self, location: &mut impl Location) {
        self.state.search_text.clear();
        self.phase = SearchPhase::Idle;
        self.search_held_back = false;
        self.commit(location);
        self.focus_requested = true;
    }

    /// Returns and resets the refocus request raised by
    /// [`clear_search`](Self::clear_search).
    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_requested)
    }

    /// Pull external changes (back/forward) from the location. Returns `true`
    /// when the in-memory state changed.
    pub fn sync_from_location(&mut self, location: &impl Location, now: Instant) -> bool {
        let query = location.current_query();
        if query == self.last_seen_query {
            return false;
        }

        let incoming = from_query(&query);
        self.last_seen_query = query;
        let before = self.state.clone();

        if self.search_guarded(now) {
            debug!(
                ignored = %incoming.search_text,
                "keeping in-flight search text over location"
            );
            // A pending debounce commits the typed text over this entry.
            // Once committed, the entry's own text wins when the guard ends.
            self.search_held_back = matches!(self.phase, SearchPhase::Settling { .. });
            self.state.incomplete_only = incoming.incomplete_only;
            self.state.active_tags = incoming.active_tags;
        } else {
            self.state = incoming;
            self.phase = SearchPhase::Idle;
            self.search_held_back = false;
        }

        self.state != before
    }

    /// Drop a pending commit, e.g. when the list screen goes away.
    pub fn cancel_pending(&mut self) {
        if !matches!(self.phase, SearchPhase::Idle) {
            debug!("cancelled pending search commit");
        }
        self.phase = SearchPhase::Idle;
        self.search_held_back = false;
    }

    pub fn derived_view(&self, songs: &[SongSummary], index: &TagIndex) -> Vec<SongSummary> {
        compute_derived_view(songs, &self.state, index)
    }

    fn search_guarded(&self, now: Instant) -> bool {
        match self.phase {
            SearchPhase::TypingDebouncing { .. } | SearchPhase::Committing => true,
            SearchPhase::Settling { guard_until } => now < guard_until,
            SearchPhase::Idle => false,
        }
    }

    fn commit(&mut self, location: &mut impl Location) {
        let query = to_query(&self.state);
        if query != location.current_query() {
            debug!(%query, "committing filter state");
            location.navigate(&query);
        }
        self.last_seen_query = query;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::filter::location::HistoryLocation;

    /// Location that records every navigation.
    #[derive(Default)]
    struct RecordingLocation {
        query: String,
        navigations: Vec<String>,
    }

    impl Location for RecordingLocation {
        fn current_query(&self) -> String {
            self.query.clone()
        }

        fn navigate(&mut self, query: &str) {
            self.query = query.to_string();
            self.navigations.push(query.to_string());
        }
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    #[test]
    fn mount_seeds_state_from_location() {
        let location = RecordingLocation {
            query: "q=cha&filter=incomplete&tags=Late+Night".to_string(),
            ..Default::default()
        };
        let controller = FilterController::mount(&location, Timings::default());

        assert_eq!(controller.state().search_text, "cha");
        assert!(controller.state().incomplete_only);
        assert!(controller.state().active_tags.contains("Late Night"));
        assert_eq!(controller.phase(), SearchPhase::Idle);
    }

    #[test]
    fn rapid_keystrokes_produce_one_commit_with_the_final_text() {
        let mut location = RecordingLocation::default();
        let mut controller = FilterController::mount(&location, Timings::default());
        let t0 = Instant::now();

        for (step, text) in ["t", "tu", "tus", "tush"].into_iter().enumerate() {
            let now = t0 + ms(100 * step as u64);
            controller.set_search_text(text, now);
            assert!(!controller.poll(now + ms(50), &mut location));
        }
        assert_eq!(controller.state().search_text, "tush");
        assert!(location.navigations.is_empty());

        // Last keystroke at t0+300ms.
        assert!(!controller.poll(t0 + ms(599), &mut location));
        assert!(controller.poll(t0 + ms(600), &mut location));
        assert!(!controller.poll(t0 + ms(2_000), &mut location));

        assert_eq!(location.navigations, vec!["q=tush".to_string()]);
        assert_eq!(controller.phase(), SearchPhase::Idle);
    }

    #[test]
    fn commit_enters_settling_until_the_guard_expires() {
        let mut location = RecordingLocation::default();
        let mut controller = FilterController::mount(&location, Timings::default());
        let t0 = Instant::now();

        controller.set_search_text("boot", t0);
        assert!(controller.has_pending_commit());
        controller.poll(t0 + ms(300), &mut location);
        assert_eq!(
            controller.phase(),
            SearchPhase::Settling {
                guard_until: t0 + ms(700)
            }
        );

        controller.poll(t0 + ms(700), &mut location);
        assert_eq!(controller.phase(), SearchPhase::Idle);
    }

    #[test]
    fn toggles_commit_synchronously() {
        let mut location = RecordingLocation::default();
        let mut controller = FilterController::mount(&location, Timings::default());

        assert!(controller.toggle_incomplete(&mut location));
        assert!(controller.toggle_tag("Early Night", &mut location));

        assert_eq!(
            location.navigations,
            vec![
                "filter=incomplete".to_string(),
                "filter=incomplete&tags=Early+Night".to_string(),
            ]
        );
    }

    #[test]
    fn toggling_a_tag_twice_restores_the_original_set() {
        let mut location = RecordingLocation {
            query: "tags=Late+Night".to_string(),
            ..Default::default()
        };
        let mut controller = FilterController::mount(&location, Timings::default());
        let original = controller.state().active_tags.clone();

        assert!(controller.toggle_tag("Friday Lessons", &mut location));
        assert!(!controller.toggle_tag("Friday Lessons", &mut location));

        assert_eq!(controller.state().active_tags, original);
        assert_eq!(location.query, "tags=Late+Night");
    }

    #[test]
    fn clear_search_cancels_the_debounce_and_requests_focus() {
        let mut location = RecordingLocation::default();
        let mut controller = FilterController::mount(&location, Timings::default());
        let t0 = Instant::now();

        controller.set_search_text("electric", t0);
        controller.poll(t0 + ms(300), &mut location);
        controller.set_search_text("electric sl", t0 + ms(400));
        controller.clear_search(&mut location);

        assert_eq!(controller.state().search_text, "");
        assert!(!controller.has_pending_commit());
        assert!(controller.take_focus_request());
        assert!(!controller.take_focus_request());
        assert!(!controller.poll(t0 + ms(1_000), &mut location));
        assert_eq!(
            location.navigations,
            vec!["q=electric".to_string(), "".to_string()]
        );
    }

    #[test]
    fn back_navigation_overwrites_state_when_idle() {
        let mut history = HistoryLocation::default();
        let mut controller = FilterController::mount(&history, Timings::default());
        let t0 = Instant::now();

        controller.toggle_tag("Early Night", &mut history);
        controller.toggle_incomplete(&mut history);
        assert!(!controller.sync_from_location(&history, t0));

        history.back();
        assert!(controller.sync_from_location(&history, t0));
        assert!(!controller.state().incomplete_only);
        assert!(controller.state().active_tags.contains("Early Night"));

        history.back();
        assert!(controller.sync_from_location(&history, t0));
        assert_eq!(controller.state(), &FilterState::default());
    }

    #[test]
    fn location_changes_while_typing_keep_the_search_text() {
        let mut location = RecordingLocation::default();
        let mut controller = FilterController::mount(&location, Timings::default());
        let t0 = Instant::now();

        controller.set_search_text("wagon", t0);
        location.query = "q=stale&filter=incomplete".to_string();
        assert!(controller.sync_from_location(&location, t0 + ms(100)));
        assert_eq!(controller.state().search_text, "wagon");
        assert!(controller.state().incomplete_only);

        assert!(controller.poll(t0 + ms(300), &mut location));
        assert_eq!(location.query, "q=wagon&filter=incomplete");

        // Still inside the guard window.
        location.query = "q=older".to_string();
        controller.sync_from_location(&location, t0 + ms(500));
        assert_eq!(controller.state().search_text, "wagon");
        assert!(!controller.state().incomplete_only);

        // Guard expired.
        location.query = "q=late".to_string();
        assert!(controller.sync_from_location(&location, t0 + ms(800)));
        assert_eq!(controller.state().search_text, "late");
        assert_eq!(controller.phase(), SearchPhase::Idle);
    }

    #[test]
    fn history_step_during_guard_is_adopted_when_the_guard_ends() {
        let mut history = HistoryLocation::new("q=boot");
        let mut controller = FilterController::mount(&history, Timings::default());
        let t0 = Instant::now();

        controller.set_search_text("boots", t0);
        assert!(controller.poll(t0 + ms(300), &mut history));
        assert_eq!(history.current_query(), "q=boots");

        history.back();
        controller.sync_from_location(&history, t0 + ms(400));
        assert_eq!(controller.state().search_text, "boots");

        assert!(!controller.poll(t0 + ms(699), &mut history));
        assert!(controller.poll(t0 + ms(700), &mut history));
        assert_eq!(controller.state().search_text, "boot");
        assert_eq!(controller.phase(), SearchPhase::Idle);
        assert_eq!(history.current_query(), "q=boot");
        assert!(history.can_go_forward());
    }

    #[test]
    fn typing_after_a_held_back_step_keeps_the_new_text() {
        let mut history = HistoryLocation::new("q=boot");
        let mut controller = FilterController::mount(&history, Timings::default());
        let t0 = Instant::now();

        controller.set_search_text("boots", t0);
        controller.poll(t0 + ms(300), &mut history);
        history.back();
        controller.sync_from_location(&history, t0 + ms(400));

        controller.set_search_text("bootsy", t0 + ms(500));
        assert!(controller.poll(t0 + ms(800), &mut history));
        assert!(!controller.poll(t0 + ms(1_200), &mut history));
        assert_eq!(controller.state().search_text, "bootsy");
        assert_eq!(history.current_query(), "q=bootsy");
    }

    #[test]
    fn cancel_pending_drops_the_scheduled_commit() {
        let mut location = RecordingLocation::default();
        let mut controller = FilterController::mount(&location, Timings::default());
        let t0 = Instant::now();

        controller.set_search_text("achy", t0);
        controller.cancel_pending();

        assert!(!controller.poll(t0 + ms(1_000), &mut location));
        assert!(location.navigations.is_empty());
    }
}
