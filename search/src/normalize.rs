//! Text normalization shared by index build and query handling.
//!
//! Every string that reaches a scorer goes through the same pipeline:
//! compatibility decomposition, combining-mark strip, lowercase, whitespace
//! collapse. Applying the pipeline twice yields the same string, so already
//! normalized text can be fed back in safely.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Unicode fold: NFKD + diacritic strip + lowercase.
///
/// NFKD also folds full-width and half-width compatibility forms, so
/// `"ＭＣ１０２"` comes out as `"mc102"` and `"café"` as `"cafe"`.
pub fn normalize(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split on any Unicode whitespace, dropping empty tokens.
pub fn split_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Rejoin words with single spaces, trimming the ends.
pub fn collapse_whitespace(text: &str) -> String {
    split_words(text).join(" ")
}

/// The search normalization pipeline: `collapse_whitespace(normalize(s))`.
pub fn search_text(text: &str) -> String {
    collapse_whitespace(&normalize(text))
}

/// Replace every byte outside `[A-Za-z0-9]` with `_`.
///
/// Multi-byte characters expand to one underscore per byte, which keeps the
/// output a function of the raw encoding and always a valid path segment.
pub fn sanitise_path_segment(text: &str) -> String {
    text.bytes()
        .map(|b| if b.is_ascii_alphanumeric() { b as char } else { '_' })
        .collect()
}

pub fn is_ascii_alnum(c: char) -> bool {
    c.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_case_and_diacritics() {
        assert_eq!(normalize("Física Térmica"), "fisica termica");
        assert_eq!(normalize("ALGORITMOS"), "algoritmos");
    }

    #[test]
    fn folds_width_variants() {
        assert_eq!(normalize("ＭＣ１０２"), "mc102");
    }

    #[test]
    fn collapses_mixed_whitespace() {
        assert_eq!(collapse_whitespace("  a \t b\n\nc "), "a b c");
        assert_eq!(collapse_whitespace(""), "");
        assert_eq!(collapse_whitespace(" \n\t "), "");
    }

    #[test]
    fn pipeline_is_idempotent() {
        for s in ["  Cálculo  I ", "F\u{a0}128", "ＡＢＣ def", "ação e\treação"] {
            let once = search_text(s);
            assert_eq!(search_text(&once), once);
        }
    }

    #[test]
    fn sanitise_replaces_non_alnum_bytes() {
        assert_eq!(sanitise_path_segment("Discipline"), "Discipline");
        assert_eq!(sanitise_path_segment("a b/c.json"), "a_b_c_json");
        // 'ç' is two bytes in UTF-8, so it becomes two underscores
        assert_eq!(sanitise_path_segment("aço"), "a__o");
    }

    #[test]
    fn sanitise_is_idempotent() {
        for s in ["Cache", "weird dir!", "ação", "../escape"] {
            let once = sanitise_path_segment(s);
            assert_eq!(sanitise_path_segment(&once), once);
            assert!(once.chars().all(|c| is_ascii_alnum(c) || c == '_'));
        }
    }
}
