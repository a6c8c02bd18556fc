//! Approximate string scoring for the song search box.
//!
//! A field scores `1.0` when it contains the query verbatim (less a small
//! penalty the further into the field the match starts). Otherwise the query
//! is compared against every window of the field of roughly the same length
//! using normalized Damerau-Levenshtein similarity, scaled below any exact
//! hit. Matching is case-insensitive.

/// Minimum score for a song to stay in the search results. One edit in a
/// three-letter query scores `0.6` and stays out; one edit in four letters
/// scores `0.675` and gets in.
pub const MATCH_THRESHOLD: f64 = 0.65;

/// Maximum penalty applied to an exact substring hit at the very end of a field.
const POSITION_PENALTY: f64 = 0.1;
/// Scale applied to typo-tolerant matches so they rank below exact hits.
const APPROXIMATE_WEIGHT: f64 = 0.9;

/// Score `query` against one field. Returns a value in `0.0..=1.0`.
pub fn similarity(query: &str, field: &str) -> f64 {
    let query = query.trim().to_lowercase();
    let field = field.to_lowercase();
    if query.is_empty() || field.trim().is_empty() {
        return 0.0;
    }

    let field_chars: Vec<char> = field.chars().collect();
    if let Some(byte_pos) = field.find(&query) {
        let char_pos = field[..byte_pos].chars().count();
        return 1.0 - POSITION_PENALTY * char_pos as f64 / field_chars.len() as f64;
    }

    let query_len = query.chars().count();
    let mut window_lengths = [query_len.saturating_sub(1).max(1), query_len, query_len + 1]
        .map(|len| len.min(field_chars.len()))
        .to_vec();
    window_lengths.dedup();

    let mut best = 0.0_f64;
    for len in window_lengths {
        for window in field_chars.windows(len) {
            let window: String = window.iter().collect();
            best = best.max(strsim::normalized_damerau_levenshtein(&query, &window));
        }
    }
    best * APPROXIMATE_WEIGHT
}

/// Best score across several fields, or `None` when nothing clears
/// [`MATCH_THRESHOLD`].
pub fn best_match<'a, I>(query: &str, fields: I) -> Option<f64>
where
    I: IntoIterator<Item = &'a str>,
{
    fields
        .into_iter()
        .map(|field| similarity(query, field))
        .fold(None, |best: Option<f64>, score| match best {
            Some(current) if current >= score => Some(current),
            _ => Some(score),
        })
        .filter(|score| *score >= MATCH_THRESHOLD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_substring_scores_highest_at_the_start() {
        assert_eq!(similarity("cowboy", "Cowboy Cha Cha"), 1.0);
        let later = similarity("cha", "Cowboy Cha Cha");
        assert!(later < 1.0 && later > 0.9, "got {later}");
    }

    #[test]
    fn single_typo_still_matches() {
        let score = similarity("dess", "Dress Blues");
        assert!(score >= MATCH_THRESHOLD, "got {score}");
        assert!(score < 1.0);
    }

    #[test]
    fn unrelated_text_does_not_match() {
        assert!(similarity("dess", "Cowboy Cha Cha") < MATCH_THRESHOLD);
        assert_eq!(best_match("dess", ["Cowboy Cha Cha", "Brooks & Dunn", "", ""]), None);
    }

    #[test]
    fn one_typo_in_a_three_letter_query_is_not_a_match() {
        assert_eq!(best_match("cow", ["Friends in Low Places", "Garth Brooks"]), None);
        assert_eq!(best_match("tsh", ["The Dance"]), None);
        assert!(best_match("cow", ["Cowboy Cha Cha"]).is_some());
    }

    #[test]
    fn one_typo_in_a_longer_query_still_matches() {
        let score = best_match("dess", ["Desperado"]).unwrap();
        assert!(score >= MATCH_THRESHOLD && score < 1.0, "got {score}");
    }

    #[test]
    fn blank_inputs_score_zero() {
        assert_eq!(similarity("", "anything"), 0.0);
        assert_eq!(similarity("boot", "   "), 0.0);
    }

    #[test]
    fn best_match_takes_the_strongest_field() {
        let score = best_match("garth", ["Friends in Low Places", "Garth Brooks"]).unwrap();
        assert_eq!(score, 1.0);
    }

    #[test]
    fn field_shorter_than_query_is_compared_whole() {
        let score = similarity("slides", "slide");
        assert!(score >= MATCH_THRESHOLD && score < 1.0, "got {score}");
        let score = similarity("sldie", "slide");
        assert!(score >= MATCH_THRESHOLD, "got {score}");
    }
}
