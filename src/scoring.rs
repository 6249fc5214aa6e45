//! Relevance and similarity scoring.
//!
//! Search results are ranked by a heuristic score combining match quality
//! against title/description, specificity (hierarchy level), and a flat
//! bonus for priority segments. Similar-code results carry a similarity in
//! [0, 1] based on shared ancestry depth. All constants live in
//! [`ScoringConfig`](crate::config::ScoringConfig).

use crate::config::ScoringConfig;
use crate::models::UnspscCode;

/// Relevance of a code for a search term. Zero means no match at all.
///
/// Match quality is evaluated best-first: exact title, title prefix, title
/// substring, then description substring. Level and priority-segment
/// bonuses are added on top of any match.
pub fn relevance(scoring: &ScoringConfig, record: &UnspscCode, term: &str) -> i64 {
    let term_lower = term.to_lowercase();
    let title_lower = record.title.to_lowercase();

    let match_score = if title_lower == term_lower {
        scoring.exact_title
    } else if title_lower.starts_with(&term_lower) {
        scoring.title_prefix
    } else if title_lower.contains(&term_lower) {
        scoring.title_substring
    } else if record
        .description
        .as_deref()
        .map(|d| d.to_lowercase().contains(&term_lower))
        .unwrap_or(false)
    {
        scoring.description_substring
    } else {
        return 0;
    };

    let mut score = match_score + record.level as i64 * scoring.level_weight;
    if let Some(segment) = &record.segment {
        if scoring.priority_segments.iter().any(|s| s == segment) {
            score += scoring.priority_bonus;
        }
    }
    score
}

/// Similarity of a family sibling: higher when it also shares the 6-digit
/// class prefix.
pub fn sibling_similarity(scoring: &ScoringConfig, shares_class: bool) -> f64 {
    if shares_class {
        scoring.similarity_same_class
    } else {
        scoring.similarity_same_family
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(code: &str, title: &str, description: Option<&str>) -> UnspscCode {
        UnspscCode::from_code(code, title, description.map(str::to_string)).unwrap()
    }

    #[test]
    fn test_exact_title_outranks_everything() {
        let scoring = ScoringConfig::default();
        let exact = relevance(&scoring, &record("25171501", "drill", None), "drill");
        let prefix = relevance(&scoring, &record("25171502", "drill press", None), "drill");
        let substr = relevance(&scoring, &record("25171503", "hammer drill", None), "drill");
        let desc = relevance(
            &scoring,
            &record("25171504", "rotary tool", Some("a drill accessory")),
            "drill",
        );
        assert!(exact > prefix);
        assert!(prefix > substr);
        assert!(substr > desc);
        assert!(desc > 0);
    }

    #[test]
    fn test_no_match_scores_zero() {
        let scoring = ScoringConfig::default();
        let rec = record("25171501", "Sheet rubber", Some("vulcanized"));
        assert_eq!(relevance(&scoring, &rec, "drill"), 0);
    }

    #[test]
    fn test_level_weight_favors_specific_codes() {
        let scoring = ScoringConfig::default();
        let commodity = relevance(&scoring, &record("25171501", "drill", None), "drill");
        let family = relevance(&scoring, &record("25170000", "drill", None), "drill");
        assert_eq!(commodity - family, 2 * scoring.level_weight);
    }

    #[test]
    fn test_priority_segment_bonus() {
        let scoring = ScoringConfig::default();
        let tools = relevance(&scoring, &record("27111501", "drill", None), "drill");
        let other = relevance(&scoring, &record("25111501", "drill", None), "drill");
        assert_eq!(tools - other, scoring.priority_bonus);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let scoring = ScoringConfig::default();
        let rec = record("25171501", "Cordless Drills", None);
        assert!(relevance(&scoring, &rec, "DRILL") > 0);
    }

    #[test]
    fn test_sibling_similarity_constants() {
        let scoring = ScoringConfig::default();
        assert_eq!(sibling_similarity(&scoring, true), 0.9);
        assert_eq!(sibling_similarity(&scoring, false), 0.7);
    }
}
