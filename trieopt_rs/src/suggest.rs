//! "Did you mean" hints for mistyped long options.

use strsim::levenshtein;

/// Largest edit distance still worth suggesting.
const MAX_DISTANCE: usize = 2;

/// Closest candidate to `input` within [`MAX_DISTANCE`] edits, comparing
/// case-insensitively. Ties keep the earliest candidate.
pub fn suggest_similar<'a, I>(input: &str, candidates: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let input_lower = input.to_lowercase();
    let mut best_match: Option<(&str, usize)> = None;

    for candidate in candidates {
        let distance = levenshtein(&input_lower, &candidate.to_lowercase());
        if distance > MAX_DISTANCE {
            continue;
        }
        match best_match {
            Some((_, best)) if distance >= best => {}
            _ => best_match = Some((candidate, distance)),
        }
    }

    best_match.map(|(candidate, _)| candidate)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggests_close_match() {
        let names = ["--verbose", "--version", "--output"];
        assert_eq!(suggest_similar("--verbos", names), Some("--verbose"));
        assert_eq!(suggest_similar("--OUTPUT", names), Some("--output"));
    }

    #[test]
    fn test_no_suggestion_when_far() {
        let names = ["--verbose", "--output"];
        assert_eq!(suggest_similar("--color", names), None);
        assert_eq!(suggest_similar("--x", std::iter::empty()), None);
    }
}
