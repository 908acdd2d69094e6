//! Related-query derivation for aggressive crawls.

use crate::research::types::ContextBag;
use crate::scraping::config::MarketLocale;

/// Most related queries ever derived for one request.
pub const MAX_RELATED_QUERIES: usize = 5;

/// Derive related queries from the context and the original query.
///
/// Segment and product phrasings come first, generic market-analysis
/// phrasings last. Candidates contained in the original query and repeats
/// are dropped; at most [`MAX_RELATED_QUERIES`] are returned.
#[must_use]
pub fn related_queries(
    original: &str,
    context: &ContextBag,
    locale: &MarketLocale,
    year: i32,
) -> Vec<String> {
    let country = &locale.country_name;
    let mut candidates = Vec::new();

    if let Some(segment) = context.segment() {
        candidates.extend([
            format!("{segment} statistics {country} {year}"),
            format!("{segment} market growth"),
            format!("key players {segment}"),
            format!("future trends {segment}"),
            format!("{segment} challenges {country}"),
        ]);
    }

    if let Some(product) = context.product() {
        candidates.extend([
            format!("how to sell {product} online"),
            format!("average price {product} market"),
            format!("{product} demand {country}"),
        ]);
    }

    candidates.extend([
        format!("SWOT analysis {original}"),
        format!("investment opportunities {original}"),
        format!("success cases {original}"),
    ]);

    let original_lower = original.to_lowercase();
    let mut unique: Vec<String> = Vec::new();
    for candidate in candidates {
        if original_lower.contains(&candidate.to_lowercase()) || unique.contains(&candidate) {
            continue;
        }
        unique.push(candidate);
        if unique.len() == MAX_RELATED_QUERIES {
            break;
        }
    }

    unique
}
