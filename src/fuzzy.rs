//! Approximate name matching for resource resolution.
//!
//! Scores are token-sort ratios in `[0, 100]`: both strings are lower-cased,
//! split on whitespace, sorted, re-joined, and compared with an
//! insertion/deletion edit distance normalized by the combined length.

/// Default minimum score for a candidate to count as a match.
pub const MIN_MATCH_SCORE: f64 = 60.0;

/// Threshold used when collecting "did you mean" hints.
pub const SUGGESTION_SCORE: f64 = 30.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch<'a, T> {
    pub item: &'a T,
    pub score: f64,
    pub matched_value: String,
}

/// Similarity of two strings in `[0, 100]`, insensitive to case and word order.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sort_tokens(a), &sort_tokens(b))
}

fn sort_tokens(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut tokens: Vec<&str> = lower.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Normalized indel similarity: `200 * LCS / (len(a) + len(b))`.
fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    let lcs = longest_common_subsequence(&a, &b);
    200.0 * lcs as f64 / total as f64
}

fn longest_common_subsequence(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut row = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            row[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                row[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut row);
    }
    prev[b.len()]
}

/// Highest-scoring candidate at or above `threshold`.
///
/// Ties keep the candidate encountered first.
pub fn find_best_match<'a, T, K>(
    query: &str,
    items: &'a [T],
    key: K,
    threshold: f64,
) -> Option<FuzzyMatch<'a, T>>
where
    K: Fn(&T) -> String,
{
    let mut best: Option<FuzzyMatch<'a, T>> = None;
    for item in items {
        let value = key(item);
        let score = token_sort_ratio(query, &value);
        if score >= threshold && best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(FuzzyMatch {
                item,
                score,
                matched_value: value,
            });
        }
    }
    best
}

/// All candidates at or above `threshold`, best first, truncated to `limit`.
pub fn find_matches<'a, T, K>(
    query: &str,
    items: &'a [T],
    key: K,
    limit: usize,
    threshold: f64,
) -> Vec<FuzzyMatch<'a, T>>
where
    K: Fn(&T) -> String,
{
    let mut matches: Vec<FuzzyMatch<'a, T>> = items
        .iter()
        .filter_map(|item| {
            let value = key(item);
            let score = token_sort_ratio(query, &value);
            (score >= threshold).then_some(FuzzyMatch {
                item,
                score,
                matched_value: value,
            })
        })
        .collect();
    // stable: equal scores keep listing order
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(limit);
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec![
            "Frontend".to_string(),
            "Backend API".to_string(),
            "Mobile App".to_string(),
            "Design System".to_string(),
        ]
    }

    #[test]
    fn test_identical_scores_100() {
        assert_eq!(token_sort_ratio("Backend API", "backend api"), 100.0);
    }

    #[test]
    fn test_word_order_ignored() {
        assert_eq!(token_sort_ratio("api backend", "Backend API"), 100.0);
    }

    #[test]
    fn test_known_ratio() {
        // "abcd" vs "abce": LCS 3, total 8
        assert_eq!(token_sort_ratio("abcd", "abce"), 75.0);
        assert_eq!(token_sort_ratio("abc", ""), 0.0);
        assert_eq!(token_sort_ratio("", ""), 100.0);
    }

    #[test]
    fn test_best_match_exact_wins() {
        let items = names();
        let m = find_best_match("frontend", &items, |s| s.clone(), MIN_MATCH_SCORE).unwrap();
        assert_eq!(m.item, "Frontend");
        assert_eq!(m.score, 100.0);
    }

    #[test]
    fn test_best_match_typo() {
        let items = names();
        let m = find_best_match("mobil app", &items, |s| s.clone(), MIN_MATCH_SCORE).unwrap();
        assert_eq!(m.matched_value, "Mobile App");
    }

    #[test]
    fn test_best_match_below_threshold() {
        let items = names();
        assert!(find_best_match("zzzz", &items, |s| s.clone(), MIN_MATCH_SCORE).is_none());
    }

    #[test]
    fn test_empty_candidates() {
        let items: Vec<String> = Vec::new();
        assert!(find_best_match("x", &items, |s| s.clone(), MIN_MATCH_SCORE).is_none());
        assert!(find_matches("x", &items, |s| s.clone(), 5, MIN_MATCH_SCORE).is_empty());
    }

    #[test]
    fn test_tie_keeps_first() {
        let items = vec!["Alpha".to_string(), "alpha".to_string()];
        let m = find_best_match("ALPHA", &items, |s| s.clone(), MIN_MATCH_SCORE).unwrap();
        assert!(std::ptr::eq(m.item, &items[0]));
    }

    #[test]
    fn test_find_matches_sorted_and_limited() {
        let items = vec![
            "Release".to_string(),
            "Release 2".to_string(),
            "Released".to_string(),
            "Other".to_string(),
        ];
        let matches = find_matches("release", &items, |s| s.clone(), 2, MIN_MATCH_SCORE);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].matched_value, "Release");
        assert!(matches[0].score >= matches[1].score);
    }
}
