//! Word-boundary-aware truncation shared by the sanitizer and formatter.

/// Truncate `text` to at most `max_chars` characters, appending `suffix`.
///
/// Counts characters, not bytes, so multi-byte input is never split inside
/// a code point. When the hard cut would land mid-word, the cut moves back
/// to the nearest preceding space, but only if that space falls within the
/// last 20% of the budget; otherwise the exact character boundary wins.
pub fn truncate_with_suffix(text: &str, max_chars: usize, suffix: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return text.to_string();
    }

    let suffix_chars = suffix.chars().count();
    if suffix_chars >= max_chars {
        // Degenerate budget: the suffix alone would overflow it.
        return chars.iter().take(max_chars).collect();
    }

    let budget = max_chars - suffix_chars;
    let at_word_boundary = chars.get(budget).map_or(true, |c| c.is_whitespace());

    let mut cut = budget;
    if !at_word_boundary {
        let boundary_floor = budget.saturating_sub(budget / 5);
        let last_space = chars[..budget].iter().rposition(|c| *c == ' ');
        if let Some(space_idx) = last_space {
            if space_idx >= boundary_floor {
                cut = space_idx;
            }
        }
    }

    let mut truncated: String = chars[..cut].iter().collect();
    truncated.truncate(truncated.trim_end().len());
    truncated.push_str(suffix);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_passes_through() {
        assert_eq!(truncate_with_suffix("Dashboard", 20, "..."), "Dashboard");
    }

    #[test]
    fn truncates_at_word_boundary_with_suffix() {
        assert_eq!(truncate_with_suffix("This is a test title", 12, "..."), "This is a...");
    }

    #[test]
    fn hard_cut_when_no_nearby_space() {
        let out = truncate_with_suffix("Antidisestablishmentarianism", 12, "...");
        assert_eq!(out, "Antidises...");
        assert_eq!(out.chars().count(), 12);
    }

    #[test]
    fn early_space_does_not_pull_cut_back_too_far() {
        // Only spaces in the last 20% of the budget qualify as boundaries.
        let out = truncate_with_suffix("Hi extraordinarily-long-word", 16, "...");
        assert_eq!(out.chars().count(), 16);
        assert!(out.ends_with("..."));
        assert_ne!(out, "Hi...");
    }

    #[test]
    fn multibyte_input_never_splits_code_points() {
        let out = truncate_with_suffix("日本語のページタイトルです", 8, "...");
        assert_eq!(out.chars().count(), 8);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn suffix_wider_than_budget_falls_back_to_hard_cut() {
        assert_eq!(truncate_with_suffix("abcdef", 2, "..."), "ab");
    }
}
