//! Relevance scoring for fetched pages.

use crate::research::types::ContextBag;

/// Weight of each occurrence of a query token.
const QUERY_TOKEN_WEIGHT: f64 = 0.2;
/// Weight of each occurrence of a context field.
const CONTEXT_WEIGHT: f64 = 0.3;
/// Weight of each occurrence of a domain term.
const DOMAIN_TERM_WEIGHT: f64 = 0.1;
/// Flat bonus when every query token appears.
const ALL_TOKENS_BONUS: f64 = 5.0;
/// Upper bound of any score.
pub const MAX_SCORE: f64 = 100.0;

/// Market vocabulary rewarded in any page.
const DOMAIN_TERMS: &[&str] = &[
    "market",
    "analysis",
    "trend",
    "opportunity",
    "strategy",
    "marketing",
    "competition",
    "audience",
    "growth",
    "demand",
    "innovation",
    "technology",
];

/// Deterministic keyword-density scorer.
#[derive(Clone, Debug)]
pub struct RelevanceScorer {
    domain_terms: Vec<String>,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self {
            domain_terms: DOMAIN_TERMS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl RelevanceScorer {
    /// Scorer over the default market vocabulary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scorer over a custom domain vocabulary.
    #[must_use]
    pub fn with_domain_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            domain_terms: terms
                .into_iter()
                .map(|t| t.into().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Score `content` against `query` and `context`, in `0.0..=100.0`.
    ///
    /// Matching is case-insensitive substring counting. The raw sum is
    /// divided by `chars / 1000 + 1` so long pages need density, not
    /// length, to rank high.
    ///
    /// Appending one more occurrence of a query token that adds `n`
    /// characters raises the score only while the current score is at most
    /// `1000 * 0.2 / n` (about 22 for `" electric"`). Ordinary prose sits
    /// well below that; pages that are little more than repeated keywords
    /// can lose a fraction of a point.
    #[must_use]
    pub fn score(&self, content: &str, query: &str, context: &ContextBag) -> f64 {
        if content.is_empty() {
            return 0.0;
        }

        let content = content.to_lowercase();
        let query = query.to_lowercase();
        let tokens: Vec<&str> = query.split_whitespace().collect();

        let mut raw = 0.0;

        for token in tokens.iter().filter(|t| t.chars().count() > 2) {
            raw += QUERY_TOKEN_WEIGHT * occurrences(&content, token);
        }

        for field in context.fields() {
            let field = field.to_lowercase();
            if field.chars().count() > 2 {
                raw += CONTEXT_WEIGHT * occurrences(&content, &field);
            }
        }

        for term in &self.domain_terms {
            raw += DOMAIN_TERM_WEIGHT * occurrences(&content, term);
        }

        if tokens.len() > 1 && tokens.iter().all(|t| content.contains(t)) {
            raw += ALL_TOKENS_BONUS;
        }

        let length = f64::from(u32::try_from(content.chars().count()).unwrap_or(u32::MAX));
        let normalized = raw / (length / 1000.0 + 1.0);
        normalized.clamp(0.0, MAX_SCORE)
    }
}

/// Non-overlapping occurrence count of `needle` in `haystack`.
fn occurrences(haystack: &str, needle: &str) -> f64 {
    let count = haystack.matches(needle).count();
    f64::from(u32::try_from(count).unwrap_or(u32::MAX))
}
