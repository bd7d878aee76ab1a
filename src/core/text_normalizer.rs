//! Text Normalizer
//!
//! Cleans text on its way into and out of the pipeline: recognizer output
//! before matching, and conversational replies before they are spoken.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Lazy matches, single line only: `(smiles)`, `[pauses]`
    static ref STAGE_DIRECTION: Regex =
        Regex::new(r"\(.*?\)|\[.*?\]").expect("stage direction pattern is valid");
}

/// Lower-case and trim recognized text; `None` if nothing is left
pub fn normalize_utterance(text: &str) -> Option<String> {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

/// Make a model reply speakable on one line
///
/// Strips parenthetical and bracketed stage directions, then joins the
/// remaining non-blank lines with single spaces.
pub fn clean_reply(reply: &str) -> String {
    let stripped = STAGE_DIRECTION.replace_all(reply, "");
    stripped
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
