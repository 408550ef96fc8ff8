use std::collections::HashSet;
use std::path::Path;

use csv::{ReaderBuilder, Trim};

use crate::normalize::Normalizer;
use crate::ConfigError;

/// One line of the category reference file: the category name followed by
/// its keyphrases (representative first). Keyphrases are trimmed but not yet
/// normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRow {
    pub name: String,
    pub keyphrases: Vec<String>,
}

/// Read `name;representative keyphrase;extra, extra, ...` rows.
///
/// Both keyphrase columns are split on commas. Rows with an empty name or no
/// keyphrase are returned as-is so the seeder can report them.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be opened or is not valid CSV.
pub fn load_categories(path: &Path) -> Result<Vec<CategoryRow>, ConfigError> {
    let display = path.display().to_string();
    let csv_err = |e| ConfigError::ReferenceFileCsv {
        path: display.clone(),
        source: e,
    };

    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(csv_err)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        let name = record.get(0).unwrap_or_default().to_string();
        let keyphrases = record
            .iter()
            .skip(1)
            .flat_map(|column| column.split(','))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        rows.push(CategoryRow { name, keyphrases });
    }
    Ok(rows)
}

/// A keyphrase prepared for matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyphrase {
    pub phrase: String,
    pub category_id: i64,
    tokens: Vec<String>,
    cyrillic_only: bool,
}

impl Keyphrase {
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// Keyphrases in match priority order: longest first, then by phrase, then
/// by category id.
#[derive(Debug, Clone, Default)]
pub struct MatchTable {
    phrases: Vec<Keyphrase>,
}

impl MatchTable {
    /// Builds the table from `(keyphrase, category_id)` pairs. Phrases that
    /// normalize to nothing are dropped; a phrase listed twice keeps the
    /// lower category id.
    #[must_use]
    pub fn new<I>(pairs: I, normalizer: &Normalizer) -> Self
    where
        I: IntoIterator<Item = (String, i64)>,
    {
        let mut phrases: Vec<Keyphrase> = pairs
            .into_iter()
            .filter_map(|(raw, category_id)| {
                let phrase = normalizer.phrase(&raw);
                let tokens: Vec<String> = normalizer
                    .strip_separators(&phrase)
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                if tokens.is_empty() {
                    return None;
                }
                let cyrillic_only = normalizer.is_cyrillic_only(&tokens.join(" "));
                Some(Keyphrase {
                    phrase,
                    category_id,
                    tokens,
                    cyrillic_only,
                })
            })
            .collect();

        phrases.sort_by(|a, b| {
            b.phrase
                .chars()
                .count()
                .cmp(&a.phrase.chars().count())
                .then_with(|| a.phrase.cmp(&b.phrase))
                .then_with(|| a.category_id.cmp(&b.category_id))
        });
        phrases.dedup_by(|later, earlier| later.phrase == earlier.phrase);

        Self { phrases }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    #[must_use]
    pub fn phrases(&self) -> &[Keyphrase] {
        &self.phrases
    }

    /// First keyphrase whose every token appears among the tokens of `name`.
    ///
    /// Cyrillic-only keyphrases are compared against the name with all
    /// non-Cyrillic characters removed, so `"тормозной диск"` still matches
    /// `"Диск TRW-тормозной"`.
    #[must_use]
    pub fn find_match(&self, name: &str, normalizer: &Normalizer) -> Option<&Keyphrase> {
        let stripped = normalizer.strip_separators(name);
        let tokens: HashSet<&str> = stripped.split_whitespace().collect();
        let cyrillic = normalizer.cyrillic_only(&stripped);
        let cyrillic_tokens: HashSet<&str> = cyrillic.split_whitespace().collect();

        self.phrases.iter().find(|kp| {
            let haystack = if kp.cyrillic_only {
                &cyrillic_tokens
            } else {
                &tokens
            };
            kp.tokens.iter().all(|t| haystack.contains(t.as_str()))
        })
    }

    /// Evaluates `names` in order and returns the match of the first name
    /// that matches anything.
    #[must_use]
    pub fn classify<S: AsRef<str>>(&self, names: &[S], normalizer: &Normalizer) -> Option<&Keyphrase> {
        names
            .iter()
            .find_map(|name| self.find_match(name.as_ref(), normalizer))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn table(pairs: &[(&str, i64)]) -> MatchTable {
        MatchTable::new(
            pairs.iter().map(|(p, c)| ((*p).to_string(), *c)),
            &Normalizer::new(),
        )
    }

    #[test]
    fn longer_phrase_wins_over_generic() {
        let t = table(&[("диск", 2), ("тормозной диск", 1)]);
        let m = t
            .find_match("диск тормозной передний", &Normalizer::new())
            .expect("should match");
        assert_eq!(m.category_id, 1);
        assert_eq!(m.phrase, "тормозной диск");
    }

    #[test]
    fn ordering_is_length_then_phrase_then_category() {
        let t = table(&[("ab", 3), ("abc", 9), ("aa", 4), ("ab", 1)]);
        let order: Vec<(&str, i64)> = t
            .phrases()
            .iter()
            .map(|k| (k.phrase.as_str(), k.category_id))
            .collect();
        assert_eq!(order, vec![("abc", 9), ("aa", 4), ("ab", 1)]);
    }

    #[test]
    fn match_is_set_containment_not_substring() {
        let t = table(&[("oil filter", 5)]);
        let n = Normalizer::new();
        assert!(t.find_match("Filter, oil (W712/75)", &n).is_some());
        assert!(t.find_match("oilfilter housing", &n).is_none());
        assert!(t.find_match("oil filters", &n).is_none());
    }

    #[test]
    fn cyrillic_phrase_ignores_latin_noise_in_name() {
        let t = table(&[("тормозной диск", 1)]);
        let n = Normalizer::new();
        assert!(t.find_match("Диск TRW-тормозной [DF4000]", &n).is_some());
    }

    #[test]
    fn mixed_script_phrase_matches_unfiltered_name() {
        let t = table(&[("масло 5w40", 3)]);
        let n = Normalizer::new();
        assert!(t.find_match("Масло моторное 5W40 4л", &n).is_some());
        assert!(t.find_match("Масло моторное 10W40 4л", &n).is_none());
    }

    #[test]
    fn classify_takes_first_matching_name() {
        let t = table(&[("свеча", 1), ("фильтр", 2)]);
        let names = ["Прокладка", "Фильтр воздушный", "Свеча зажигания"];
        let m = t.classify(&names, &Normalizer::new()).expect("should match");
        assert_eq!(m.category_id, 2);
    }

    #[test]
    fn classify_without_match_is_none() {
        let t = table(&[("свеча", 1)]);
        assert!(t.classify(&["Щетка стеклоочистителя"], &Normalizer::new()).is_none());
    }

    #[test]
    fn blank_phrases_are_dropped() {
        let t = table(&[("  ", 1), ("()", 2), ("ремень", 3)]);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn load_categories_splits_keyphrases() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# name;keyphrase;extras").unwrap();
        writeln!(file, "Тормозные диски;тормозной диск;диск тормозной, brake disc").unwrap();
        writeln!(file, "Фильтры;фильтр").unwrap();
        writeln!(file, ";orphan").unwrap();
        let rows = load_categories(file.path()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name, "Тормозные диски");
        assert_eq!(
            rows[0].keyphrases,
            vec!["тормозной диск", "диск тормозной", "brake disc"]
        );
        assert_eq!(rows[1].keyphrases, vec!["фильтр"]);
        assert!(rows[2].name.is_empty());
    }
}
