use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Synonyms of one lookup key, split into single words and multi-word phrases.
#[derive(Debug, Clone, Default)]
pub struct SynonymSet {
    pub words: Vec<String>,
    pub phrases: Vec<Vec<String>>,
}

/// Lexical synonym source, keyed by surface terms or underscore-joined
/// phrases. The engine only consumes this interface; where the synonyms come
/// from is the caller's business.
pub trait Lexicon {
    fn synonyms(&self, key: &str) -> SynonymSet;
}

/// Used when no thesaurus is supplied: every lookup comes back empty.
pub struct EmptyLexicon;

impl Lexicon for EmptyLexicon {
    fn synonyms(&self, _key: &str) -> SynonymSet {
        SynonymSet::default()
    }
}

/// Thesaurus loaded from a JSON file of the form
/// `{ "key": ["synonym", "multi word synonym", ...], ... }`.
/// Entries containing whitespace or underscores become multi-word phrases.
pub struct FileLexicon {
    entries: HashMap<String, SynonymSet>,
}

impl FileLexicon {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("read thesaurus file {}", path.display()))?;
        let raw: HashMap<String, Vec<String>> = serde_json::from_str(&text)
            .with_context(|| format!("malformed thesaurus file {}", path.display()))?;
        Ok(Self::from_entries(raw))
    }

    pub fn from_entries(raw: HashMap<String, Vec<String>>) -> Self {
        let mut entries = HashMap::with_capacity(raw.len());
        for (key, synonyms) in raw {
            let mut set = SynonymSet::default();
            for synonym in synonyms {
                let words: Vec<String> = synonym
                    .split(|c: char| c.is_whitespace() || c == '_')
                    .filter(|w| !w.is_empty())
                    .map(|w| w.to_string())
                    .collect();
                match words.len() {
                    0 => {}
                    1 => set.words.push(words.into_iter().next().expect("one word")),
                    _ => set.phrases.push(words),
                }
            }
            entries.insert(key, set);
        }
        Self { entries }
    }
}

impl Lexicon for FileLexicon {
    fn synonyms(&self, key: &str) -> SynonymSet {
        self.entries.get(key).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_words_and_phrases() {
        let mut raw = HashMap::new();
        raw.insert(
            "damages".to_string(),
            vec!["compensation".to_string(), "monetary_award".to_string()],
        );
        let lex = FileLexicon::from_entries(raw);

        let set = lex.synonyms("damages");
        assert_eq!(set.words, vec!["compensation"]);
        assert_eq!(set.phrases, vec![vec!["monetary".to_string(), "award".to_string()]]);
        assert!(lex.synonyms("unknown").words.is_empty());
    }
}
