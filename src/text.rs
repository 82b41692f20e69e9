//! Question normalization shared by the table selector and the response cache.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, strip diacritics and collapse whitespace.
///
/// `"  Qual o  Ticket Médio?"` becomes `"qual o ticket medio?"`.
pub fn normalize_question(input: &str) -> String {
    let stripped: String = input
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
