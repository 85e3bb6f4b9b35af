//! Nearest-name matching of translated country names against the
//! boundary dataset's canonical names.
//!
//! Scores follow the usual weighted-ratio heuristic: the best of a plain
//! edit-distance ratio, a substring ratio when lengths differ a lot, and
//! token-order-insensitive ratios, each on a 0-100 scale.

use crate::error::PipelineError;
use crate::types::{MatchedName, NameMapping};
use anyhow::Result;
use strsim::normalized_levenshtein;
use tracing::{debug, info, warn};
use unidecode::unidecode;

const TOKEN_SCALE: f64 = 0.95;

/// Folds accents, lowercases, and reduces punctuation to single spaces.
pub fn normalize(s: &str) -> String {
    unidecode(s)
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    normalized_levenshtein(a, b) * 100.0
}

/// Best ratio of the shorter string against every equal-length window of the longer.
fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() { (a, b) } else { (b, a) };
    let long: Vec<char> = long.chars().collect();
    let width = short.chars().count();
    if width == 0 {
        return 0.0;
    }
    long.windows(width)
        .map(|w| ratio(short, &w.iter().collect::<String>()))
        .fold(0.0, f64::max)
}

fn sorted_tokens(s: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.dedup();
    tokens
}

fn token_sort(a: &str, b: &str, scorer: fn(&str, &str) -> f64) -> f64 {
    let mut ta: Vec<&str> = a.split_whitespace().collect();
    let mut tb: Vec<&str> = b.split_whitespace().collect();
    ta.sort_unstable();
    tb.sort_unstable();
    scorer(&ta.join(" "), &tb.join(" "))
}

fn token_set(a: &str, b: &str, scorer: fn(&str, &str) -> f64) -> f64 {
    let ta = sorted_tokens(a);
    let tb = sorted_tokens(b);
    let common: Vec<&str> = ta.iter().filter(|t| tb.contains(t)).copied().collect();
    let only_a: Vec<&str> = ta.iter().filter(|t| !tb.contains(t)).copied().collect();
    let only_b: Vec<&str> = tb.iter().filter(|t| !ta.contains(t)).copied().collect();

    let base = common.join(" ");
    let with = |rest: &[&str]| format!("{} {}", base, rest.join(" ")).trim().to_string();
    let combined_a = with(&only_a[..]);
    let combined_b = with(&only_b[..]);

    [
        scorer(&base, &combined_a),
        scorer(&base, &combined_b),
        scorer(&combined_a, &combined_b),
    ]
    .into_iter()
    .fold(0.0, f64::max)
}

/// Weighted similarity of two names, 0..=100.
pub fn score(query: &str, candidate: &str) -> u8 {
    let a = normalize(query);
    let b = normalize(candidate);
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let base = ratio(&a, &b);
    let (la, lb) = (a.chars().count() as f64, b.chars().count() as f64);
    let len_ratio = la.max(lb) / la.min(lb);

    let best = if len_ratio >= 1.5 {
        let partial_scale = if len_ratio > 8.0 { 0.6 } else { 0.9 };
        [
            base,
            partial_ratio(&a, &b) * partial_scale,
            token_sort(&a, &b, partial_ratio) * TOKEN_SCALE * partial_scale,
            token_set(&a, &b, partial_ratio) * TOKEN_SCALE * partial_scale,
        ]
        .into_iter()
        .fold(0.0, f64::max)
    } else {
        [
            base,
            token_sort(&a, &b, ratio) * TOKEN_SCALE,
            token_set(&a, &b, ratio) * TOKEN_SCALE,
        ]
        .into_iter()
        .fold(0.0, f64::max)
    };

    best.round().clamp(0.0, 100.0) as u8
}

/// Index and score of the closest candidate. The first one wins ties.
pub fn best_match(query: &str, candidates: &[String]) -> Option<(usize, u8)> {
    let mut best: Option<(usize, u8)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let s = score(query, candidate);
        if best.map_or(true, |(_, top)| s > top) {
            best = Some((i, s));
        }
    }
    best
}

/// Pairs each source name with its translation's closest canonical name.
pub fn create_mapping(
    sources: &[String],
    english: &[String],
    candidates: &[String],
    warn_below: Option<u8>,
) -> Result<NameMapping> {
    if candidates.is_empty() {
        return Err(PipelineError::NoCandidates.into());
    }

    let mut mapping = NameMapping::default();
    for (source, english) in sources.iter().zip(english) {
        let Some((i, score)) = best_match(english, candidates) else { continue };
        let canonical = candidates[i].clone();
        debug!("{} -> {} -> {} ({})", source, english, canonical, score);
        if warn_below.is_some_and(|threshold| score < threshold) {
            warn!("Weak match for {:?}: {:?} -> {:?} scored {}", source, english, canonical, score);
        }
        mapping.push(MatchedName {
            source: source.clone(),
            english: english.clone(),
            canonical,
            score,
        });
    }

    info!("Matched {} names against {} candidates", mapping.len(), candidates.len());
    Ok(mapping)
}
