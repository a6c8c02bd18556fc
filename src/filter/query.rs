//! Canonical query-string form of a [`FilterState`]. This is what gets
//! written to the location history and what `--query` accepts.

use url::form_urlencoded;

use super::FilterState;

pub const SEARCH_PARAM: &str = "q";
pub const FILTER_PARAM: &str = "filter";
pub const INCOMPLETE_VALUE: &str = "incomplete";
pub const TAGS_PARAM: &str = "tags";

/// Serialize the state. Empty dimensions are omitted, so the unfiltered state
/// is the empty string. Tags are comma-joined in sorted order; tag names
/// themselves must not contain commas.
pub fn to_query(state: &FilterState) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    if !state.search_text.is_empty() {
        serializer.append_pair(SEARCH_PARAM, &state.search_text);
    }
    if state.incomplete_only {
        serializer.append_pair(FILTER_PARAM, INCOMPLETE_VALUE);
    }
    if !state.active_tags.is_empty() {
        let joined = state
            .active_tags
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        serializer.append_pair(TAGS_PARAM, &joined);
    }
    serializer.finish()
}

/// Parse a query string (with or without the leading `?`). Unknown keys are
/// ignored; any `filter` value other than `incomplete` means "not filtered".
pub fn from_query(query: &str) -> FilterState {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut state = FilterState::default();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            SEARCH_PARAM => state.search_text = value.into_owned(),
            FILTER_PARAM => state.incomplete_only = value == INCOMPLETE_VALUE,
            TAGS_PARAM => {
                state.active_tags = value
                    .split(',')
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {}
        }
    }
    state
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use pretty_assertions::assert_eq;

    use super::*;

    fn tags(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn serialization_round_trips() {
        let texts = ["", "abc"];
        let toggles = [true, false];
        let tag_sets = [tags(&[]), tags(&["Early Night"]), tags(&["Early Night", "Late Night"])];

        for text in texts {
            for incomplete_only in toggles {
                for active_tags in &tag_sets {
                    let state = FilterState {
                        search_text: text.to_string(),
                        incomplete_only,
                        active_tags: active_tags.clone(),
                    };
                    assert_eq!(from_query(&to_query(&state)), state);
                }
            }
        }
    }

    #[test]
    fn empty_state_serializes_to_empty_query() {
        assert_eq!(to_query(&FilterState::default()), "");
        assert_eq!(from_query(""), FilterState::default());
    }

    #[test]
    fn canonical_form_encodes_spaces_and_joins_tags() {
        let state = FilterState {
            search_text: "boot scoot".to_string(),
            incomplete_only: true,
            active_tags: tags(&["Late Night", "Early Night"]),
        };
        assert_eq!(
            to_query(&state),
            "q=boot+scoot&filter=incomplete&tags=Early+Night%2CLate+Night"
        );
    }

    #[test]
    fn parses_hand_written_queries() {
        let state = from_query("?tags=Early%20Night,,Late%20Night&filter=all&utm=x");
        assert_eq!(state.active_tags, tags(&["Early Night", "Late Night"]));
        assert!(!state.incomplete_only);
        assert_eq!(state.search_text, "");
    }
}
