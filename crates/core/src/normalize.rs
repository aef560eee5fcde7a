//! Canonicalization of visually-ambiguous character variants.
//!
//! Submitted spreadsheets routinely mix the Arabic and Persian forms of
//! yeh and kaf, which are indistinguishable on screen but compare
//! unequal. Uploads are canonicalized to the Persian forms before
//! parsing so combo-box and text matching does not fail spuriously.

/// Arabic yeh (U+064A), canonicalized to Persian yeh (U+06CC).
const ARABIC_YEH: char = '\u{064A}';
const PERSIAN_YEH: char = '\u{06CC}';

/// Arabic kaf (U+0643), canonicalized to Persian keh (U+06A9).
const ARABIC_KAF: char = '\u{0643}';
const PERSIAN_KEH: char = '\u{06A9}';

/// Replace Arabic yeh/kaf with their Persian equivalents.
pub fn normalize_persian(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            ARABIC_YEH => PERSIAN_YEH,
            ARABIC_KAF => PERSIAN_KEH,
            other => other,
        })
        .collect()
}
