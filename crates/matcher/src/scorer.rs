//! Per-cell comparison rules.
//!
//! Every comparison first sanitizes both sides down to `[A-Za-z0-9 ]`. The
//! exact rule then dispatches on the stored [`Value`] tag; the fuzzy rule
//! only relaxes text cells, numeric cells stay exact.

use catalog::Value;
use serde::{Deserialize, Serialize};

use crate::types::MatchError;

/// Minimum plain similarity ratio accepted by the fuzzy rule.
pub const RATIO_THRESHOLD: u32 = 70;
/// Minimum best-window similarity ratio accepted by the fuzzy rule.
pub const PARTIAL_RATIO_THRESHOLD: u32 = 85;
/// Score contributed by an exact acceptance.
pub const EXACT_SCORE: u32 = 100;

/// Strip every character outside `[A-Za-z0-9 ]`.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ')
        .collect()
}

/// Sanitize and case-fold.
pub fn normalize(input: &str) -> String {
    let mut out = sanitize(input);
    out.make_ascii_lowercase();
    out
}

/// Similarity of two strings on a 0 to 100 scale.
pub fn ratio(a: &str, b: &str) -> u32 {
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u32
}

/// Best [`ratio`] between the shorter string and every equally long window
/// of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return if long.is_empty() { 100 } else { 0 };
    }

    // Windows share the needle's length, so the distance alone ranks them.
    let mut best_distance = short.len();
    let mut candidate = Vec::with_capacity(short.len());
    for window in long.windows(short.len()) {
        candidate.clear();
        candidate.extend_from_slice(window);
        let distance = strsim::generic_levenshtein(&short, &candidate);
        best_distance = best_distance.min(distance);
        if best_distance == 0 {
            break;
        }
    }
    let similarity = 1.0 - best_distance as f64 / short.len() as f64;
    (similarity * 100.0).round() as u32
}

/// Thresholds for the fuzzy rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScorerConfig {
    #[serde(default = "ScorerConfig::default_ratio_threshold")]
    pub ratio_threshold: u32,
    #[serde(default = "ScorerConfig::default_partial_ratio_threshold")]
    pub partial_ratio_threshold: u32,
}

impl ScorerConfig {
    pub(crate) fn default_ratio_threshold() -> u32 {
        RATIO_THRESHOLD
    }

    pub(crate) fn default_partial_ratio_threshold() -> u32 {
        PARTIAL_RATIO_THRESHOLD
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if self.ratio_threshold > 100 {
            return Err(MatchError::InvalidConfig(
                "ratio_threshold must be between 0 and 100".into(),
            ));
        }
        if self.partial_ratio_threshold > 100 {
            return Err(MatchError::InvalidConfig(
                "partial_ratio_threshold must be between 0 and 100".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            ratio_threshold: RATIO_THRESHOLD,
            partial_ratio_threshold: PARTIAL_RATIO_THRESHOLD,
        }
    }
}

/// A query value prepared once per request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryValue {
    text: String,
    integer: Option<i64>,
    float: Option<f64>,
}

impl QueryValue {
    pub fn parse(raw: &str) -> Self {
        let text = normalize(raw);
        let trimmed = text.trim();
        Self {
            integer: trimmed.parse().ok(),
            float: trimmed.parse::<f64>().ok().filter(|f| f.is_finite()),
            text,
        }
    }

    /// Sanitized, case-folded text form.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn as_integer(&self) -> Option<i64> {
        self.integer
    }
}

/// Which check accepted a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Exact,
    Substring,
    Ratio,
    PartialRatio,
}

/// An accepted comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub kind: MatchKind,
    pub score: u32,
}

impl Verdict {
    fn exact() -> Self {
        Self {
            kind: MatchKind::Exact,
            score: EXACT_SCORE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Scorer {
    config: ScorerConfig,
}

impl Scorer {
    pub fn new(config: ScorerConfig) -> Result<Self, MatchError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScorerConfig {
        &self.config
    }

    /// Compare one stored cell against one query value.
    ///
    /// Returns `None` when the pair does not match. Unparseable numeric
    /// queries are plain non-matches.
    pub fn score(&self, stored: &Value, query: &QueryValue, fuzzy: bool) -> Option<Verdict> {
        match stored {
            Value::Integer(v) => {
                let equal = match (query.integer, query.float) {
                    (Some(q), _) => *v == q,
                    (None, Some(q)) => *v as f64 == q,
                    (None, None) => false,
                };
                equal.then(Verdict::exact)
            }
            Value::Float(v) => (query.float == Some(*v)).then(Verdict::exact),
            Value::Text(s) if fuzzy => self.fuzzy_text(&normalize(s), query.text()),
            Value::Text(s) => (normalize(s) == query.text()).then(Verdict::exact),
            Value::Null => None,
        }
    }

    /// Convenience wrapper that prepares `raw` on the fly.
    pub fn matches(&self, stored: &Value, raw: &str, fuzzy: bool) -> bool {
        self.score(stored, &QueryValue::parse(raw), fuzzy).is_some()
    }

    fn fuzzy_text(&self, stored: &str, query: &str) -> Option<Verdict> {
        if stored.contains(query) {
            return Some(Verdict {
                kind: MatchKind::Substring,
                score: query.chars().count() as u32,
            });
        }

        let plain = ratio(query, stored);
        if plain >= self.config.ratio_threshold {
            return Some(Verdict {
                kind: MatchKind::Ratio,
                score: plain,
            });
        }

        let partial = partial_ratio(query, stored);
        (partial >= self.config.partial_ratio_threshold).then_some(Verdict {
            kind: MatchKind::PartialRatio,
            score: partial,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> Scorer {
        Scorer::default()
    }

    #[test]
    fn sanitize_strips_everything_but_alphanumerics_and_spaces() {
        assert_eq!(sanitize("Fire-Sword!"), "FireSword");
        assert_eq!(sanitize("a' OR 1=1 --"), "a OR 11 ");
        assert_eq!(normalize("Long Spear-man"), "long spearman");
    }

    #[test]
    fn exact_text_is_case_insensitive() {
        let s = scorer();
        assert!(s.matches(&Value::from("Rare"), "rare", false));
        assert!(s.matches(&Value::from("Rare"), "RARE", false));
        assert!(!s.matches(&Value::from("Rare"), "rar", false));
    }

    #[test]
    fn exact_text_ignores_punctuation_on_both_sides() {
        let s = scorer();
        assert!(s.matches(&Value::from("Ring of Fire!"), "ring of fire", false));
        // "Ring-of" collapses to "Ringof", which is a different word.
        assert!(!s.matches(&Value::from("Ring of Fire"), "Ring-of Fire", false));
    }

    #[test]
    fn integers_compare_numerically() {
        let s = scorer();
        assert!(s.matches(&Value::Integer(7), "07", false));
        assert!(s.matches(&Value::Integer(7), " 7 ", false));
        assert!(!s.matches(&Value::Integer(7), "8", false));
        assert!(!s.matches(&Value::Integer(7), "seven", false));
    }

    #[test]
    fn floats_compare_numerically() {
        let s = scorer();
        assert!(s.matches(&Value::Float(7.0), "7", false));
        assert!(s.matches(&Value::Float(12.0), "0012", false));
        assert!(!s.matches(&Value::Float(7.5), "75", false));
        assert!(!s.matches(&Value::Float(f64::INFINITY), "inf", false));
    }

    #[test]
    fn null_never_matches() {
        let s = scorer();
        assert!(!s.matches(&Value::Null, "", false));
        assert!(!s.matches(&Value::Null, "", true));
    }

    #[test]
    fn fuzzy_does_not_relax_numbers() {
        let s = scorer();
        assert!(!s.matches(&Value::Integer(17), "1", true));
        assert!(s.matches(&Value::Integer(17), "17", true));
    }

    #[test]
    fn substring_acceptance_scores_query_length() {
        let verdict = scorer()
            .score(&Value::from("Longbowman"), &QueryValue::parse("LONG"), true)
            .expect("substring");
        assert_eq!(verdict.kind, MatchKind::Substring);
        assert_eq!(verdict.score, 4);
    }

    #[test]
    fn substring_wins_even_when_ratio_is_low() {
        let query = QueryValue::parse("bow");
        assert!(ratio(query.text(), "longbowman") < RATIO_THRESHOLD);
        assert!(scorer().score(&Value::from("Longbowman"), &query, true).is_some());
    }

    #[test]
    fn ratio_accepts_small_typos() {
        let verdict = scorer()
            .score(&Value::from("Longbowman"), &QueryValue::parse("longbowmen"), true)
            .expect("one substitution");
        assert_eq!(verdict.kind, MatchKind::Ratio);
        assert_eq!(verdict.score, 90);
    }

    #[test]
    fn partial_ratio_accepts_typo_inside_longer_text() {
        let query = QueryValue::parse("spearmen");
        let stored = "heavy long spearman of the guard";
        assert!(ratio(query.text(), stored) < RATIO_THRESHOLD);
        let verdict = scorer()
            .score(&Value::from(stored), &query, true)
            .expect("partial");
        assert_eq!(verdict.kind, MatchKind::PartialRatio);
        assert!(verdict.score >= PARTIAL_RATIO_THRESHOLD);
    }

    #[test]
    fn unrelated_text_is_rejected() {
        assert!(!scorer().matches(&Value::from("Fire Sword"), "frost", true));
    }

    #[test]
    fn ratio_bounds() {
        assert_eq!(ratio("abc", "abc"), 100);
        assert_eq!(ratio("", ""), 100);
        assert_eq!(ratio("abc", "xyz"), 0);
        assert_eq!(partial_ratio("", "abc"), 0);
        assert_eq!(partial_ratio("bow", "longbowman"), 100);
        assert_eq!(partial_ratio("longbowman", "bow"), 100);
    }

    #[test]
    fn partial_ratio_agrees_with_ratio_on_best_window() {
        // "spearmen" vs the window "spearman": one substitution in eight.
        let stored = "heavy long spearman of the guard";
        assert_eq!(partial_ratio("spearmen", stored), ratio("spearmen", "spearman"));
        assert_eq!(partial_ratio("spearmen", stored), 88);
    }

    #[test]
    fn config_rejects_out_of_range_thresholds() {
        let err = Scorer::new(ScorerConfig {
            ratio_threshold: 101,
            ..ScorerConfig::default()
        })
        .expect_err("threshold above 100");
        assert!(err.to_string().contains("ratio_threshold"));
    }
}
