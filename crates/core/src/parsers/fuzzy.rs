use strsim::levenshtein;

/// Match a single token against a candidate list, tolerating typos up to
/// `max_distance` edits. Exact matches win; otherwise the closest candidate
/// within tolerance is returned. Short tokens are only matched exactly, since
/// two edits on a four-letter word reaches an unrelated word too easily.
pub fn fuzzy_match<'a>(
    token: &str,
    candidates: &[&'a str],
    max_distance: usize,
) -> Option<&'a str> {
    let token = token.to_ascii_lowercase();
    if let Some(exact) = candidates.iter().find(|candidate| **candidate == token) {
        return Some(exact);
    }

    if token.len() < 5 {
        return None;
    }

    candidates
        .iter()
        .map(|candidate| (*candidate, levenshtein(&token, candidate)))
        .filter(|(_, distance)| *distance <= max_distance)
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Lowercased alphanumeric tokens of a message.
pub fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|t| !t.is_empty())
        .map(|t| t.trim_matches('\'').to_owned())
        .filter(|t| !t.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_wins_regardless_of_length() {
        assert_eq!(fuzzy_match("mon", &["monday", "mon"], 2), Some("mon"));
    }

    #[test]
    fn single_typo_within_tolerance_matches() {
        assert_eq!(fuzzy_match("fridey", &["friday", "monday"], 2), Some("friday"));
        assert_eq!(fuzzy_match("tommorow", &["tomorrow"], 2), Some("tomorrow"));
    }

    #[test]
    fn short_tokens_do_not_fuzzy_match() {
        assert_eq!(fuzzy_match("free", &["friday"], 2), None);
    }

    #[test]
    fn distance_beyond_tolerance_is_rejected() {
        assert_eq!(fuzzy_match("saturday", &["sunday"], 2), None);
    }

    #[test]
    fn tokenizer_keeps_apostrophes_inside_words() {
        assert_eq!(tokens("8 o'clock, please!"), vec!["8", "o'clock", "please"]);
    }
}
