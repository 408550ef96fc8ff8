//! Canonical forms for raw supplier field values.
//!
//! A [`Normalizer`] is constructed once and passed by reference to every
//! component that needs it. All methods are total: they never fail and map
//! empty input to empty output.

use regex::Regex;

/// Pure string canonicalization used for every identity lookup.
///
/// Brand aliases, articuls, and category names all go through
/// [`Normalizer::key`], so a value written by one component is found by
/// another regardless of case, punctuation, or spacing.
#[derive(Debug, Clone)]
pub struct Normalizer {
    outside_key_alphabet: Regex,
    outside_cyrillic: Regex,
    separators: Regex,
    whitespace: Regex,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            outside_key_alphabet: Regex::new("[^а-яёa-z0-9]").expect("valid key regex"),
            outside_cyrillic: Regex::new("[^а-яё ]").expect("valid cyrillic regex"),
            separators: Regex::new(r#"[()\[\]{}\\/,.;:!?"'«»]"#).expect("valid separator regex"),
            whitespace: Regex::new(r"\s+").expect("valid whitespace regex"),
        }
    }

    /// Lower-cases and drops every character outside Cyrillic letters,
    /// Latin letters, and digits. Hyphens, spaces, and punctuation vanish, so
    /// `"AB-12"` and `"ab 12"` share the key `"ab12"`.
    #[must_use]
    pub fn key(&self, raw: &str) -> String {
        self.outside_key_alphabet
            .replace_all(&raw.to_lowercase(), "")
            .into_owned()
    }

    /// Display form of a product name: trimmed, inner whitespace collapsed.
    #[must_use]
    pub fn name(&self, raw: &str) -> String {
        self.whitespace.replace_all(raw.trim(), " ").into_owned()
    }

    /// Identity form of a product name: the display form, lower-cased.
    #[must_use]
    pub fn name_key(&self, raw: &str) -> String {
        self.name(raw).to_lowercase()
    }

    /// Canonical keyphrase: lower-cased with whitespace normalized.
    #[must_use]
    pub fn phrase(&self, raw: &str) -> String {
        self.name(&raw.to_lowercase())
    }

    /// Lower-cases and replaces bracket, slash, and punctuation characters
    /// with spaces so they act as token boundaries.
    #[must_use]
    pub fn strip_separators(&self, raw: &str) -> String {
        self.separators
            .replace_all(&raw.to_lowercase(), " ")
            .into_owned()
    }

    /// Removes every character that is not a lower-case Cyrillic letter or a
    /// plain space. Input is expected to be lower-cased already.
    #[must_use]
    pub fn cyrillic_only(&self, lowered: &str) -> String {
        let spaced = self.whitespace.replace_all(lowered, " ");
        self.outside_cyrillic.replace_all(&spaced, "").into_owned()
    }

    /// `true` if `phrase` consists solely of lower-case Cyrillic letters and
    /// spaces.
    #[must_use]
    pub fn is_cyrillic_only(&self, phrase: &str) -> bool {
        !self.outside_cyrillic.is_match(phrase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_folds_case_and_strips_hyphens() {
        let n = Normalizer::new();
        assert_eq!(n.key("AB-12"), "ab12");
        assert_eq!(n.key("ab12"), "ab12");
        assert_eq!(n.key(" Ab 1-2 "), "ab12");
    }

    #[test]
    fn key_keeps_cyrillic_latin_and_digits() {
        let n = Normalizer::new();
        assert_eq!(n.key("ЛУКОЙЛ Люкс 5W-40"), "лукойллюкс5w40");
        assert_eq!(n.key("Ёлка"), "ёлка");
    }

    #[test]
    fn key_drops_other_scripts_and_symbols() {
        let n = Normalizer::new();
        assert_eq!(n.key("Brēz™ & Co."), "brzco");
        assert_eq!(n.key("---"), "");
    }

    #[test]
    fn key_of_empty_is_empty() {
        let n = Normalizer::new();
        assert_eq!(n.key(""), "");
    }

    #[test]
    fn name_collapses_whitespace() {
        let n = Normalizer::new();
        assert_eq!(n.name("  Filter \t Oil\n "), "Filter Oil");
        assert_eq!(n.name_key("  Filter \t Oil\n "), "filter oil");
    }

    #[test]
    fn phrase_is_lowercase_and_single_spaced() {
        let n = Normalizer::new();
        assert_eq!(n.phrase("  Тормозной   Диск "), "тормозной диск");
    }

    #[test]
    fn strip_separators_turns_brackets_into_spaces() {
        let n = Normalizer::new();
        assert_eq!(
            n.strip_separators("Диск (передний)/Левый, шт."),
            "диск  передний  левый  шт "
        );
    }

    #[test]
    fn cyrillic_only_removes_latin_and_digits() {
        let n = Normalizer::new();
        assert_eq!(
            n.cyrillic_only("диск тормозной trw df4000 передний"),
            "диск тормозной   передний"
        );
    }

    #[test]
    fn is_cyrillic_only_detects_mixed_script() {
        let n = Normalizer::new();
        assert!(n.is_cyrillic_only("тормозной диск"));
        assert!(!n.is_cyrillic_only("масло 5w40"));
        assert!(!n.is_cyrillic_only("oil filter"));
    }
}
