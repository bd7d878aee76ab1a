//! Fuzzy matching utilities
//!
//! Edit-distance similarity on a 0-100 scale. [`score`] compares whole
//! strings; [`partial_score`] slides the shorter string over the longer one
//! and keeps the best window, which is what short wake and interrupt words
//! embedded in a longer utterance need.

use strsim::normalized_levenshtein;

/// Maximum similarity value
pub const MAX_SCORE: f64 = 100.0;

/// Normalized Levenshtein similarity in `[0, 100]`
///
/// `100 * (1 - distance / max(len(a), len(b)))`, measured in characters.
/// Symmetric, and 100 for identical strings (including two empty ones).
pub fn score(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b) * MAX_SCORE
}

/// Best [`score`] of the shorter string against any equally long window of
/// the longer one
///
/// Returns 0 when either side is empty, so an empty phrase never spots.
pub fn partial_score(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };

    let short_len = short.chars().count();
    if short_len == 0 {
        return 0.0;
    }

    let long_chars: Vec<char> = long.chars().collect();
    if long_chars.len() == short_len {
        return score(short, long);
    }

    let mut best = 0.0f64;
    for window in long_chars.windows(short_len) {
        let candidate: String = window.iter().collect();
        let s = score(short, &candidate);
        if s > best {
            best = s;
            if best >= MAX_SCORE {
                break;
            }
        }
    }
    best
}
