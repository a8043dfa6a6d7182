use crate::analyzer::Analyzer;
use crate::index::DocId;
use anyhow::{bail, Context, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

lazy_static! {
    static ref PHRASE_RE: Regex = Regex::new(r#""(.+?)""#).expect("valid regex");
}

/// One term's use within a phrase: how often it occurs and at which
/// within-phrase positions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermUsage {
    pub tf: u32,
    pub positions: Vec<u32>,
}

pub type QueryPhrase = HashMap<String, TermUsage>;

/// A parsed query: the raw phrase strings, their stemmed term tables (used
/// against the index), the parallel surface-form tables (used only for
/// synonym lookup, populated where stemming changed the token), and any
/// relevance-feedback document lists.
#[derive(Debug, Default)]
pub struct ParsedQuery {
    pub raw_phrases: Vec<String>,
    pub phrases: Vec<QueryPhrase>,
    pub surface_phrases: Vec<QueryPhrase>,
    pub positive_docs: Vec<DocId>,
    pub negative_docs: Vec<DocId>,
}

pub fn parse_query_file(path: &Path, analyzer: &Analyzer) -> Result<ParsedQuery> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("read query file {}", path.display()))?;
    parse_query(&text, analyzer)
}

/// First line: zero or more double-quoted phrases (multiple phrases are
/// conjunctive). Subsequent non-empty lines: `+ <id>` / `- <id>` relevance
/// markers, accepted but not applied to ranking.
pub fn parse_query(text: &str, analyzer: &Analyzer) -> Result<ParsedQuery> {
    let mut lines = text.lines();
    let first = lines.next().unwrap_or("");

    let mut query = ParsedQuery::default();
    for cap in PHRASE_RE.captures_iter(first) {
        let raw = cap[1].to_string();
        let (stemmed, surface) = parse_phrase(&raw, analyzer);
        query.raw_phrases.push(raw);
        query.phrases.push(stemmed);
        query.surface_phrases.push(surface);
    }

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (sign, id) = match (fields.next(), fields.next(), fields.next()) {
            (Some(sign @ ("+" | "-")), Some(id), None) => (sign, id),
            _ => bail!("malformed relevance-feedback line: {line:?}"),
        };
        let id: DocId = id
            .parse()
            .with_context(|| format!("malformed document ID in feedback line: {line:?}"))?;
        if sign == "+" {
            query.positive_docs.push(id);
        } else {
            query.negative_docs.push(id);
        }
    }
    Ok(query)
}

/// Tokenize one phrase into its stemmed and surface term tables. Positions
/// number the kept (non-stopword) tokens; the surface table only records
/// tokens whose stemmed form differs from the case-folded original.
fn parse_phrase(phrase: &str, analyzer: &Analyzer) -> (QueryPhrase, QueryPhrase) {
    let mut stemmed: QueryPhrase = HashMap::new();
    let mut surface: QueryPhrase = HashMap::new();
    let mut pos: u32 = 0;
    for token in analyzer.tokens(phrase) {
        if analyzer.is_stopword(&token) {
            continue;
        }
        let stem = analyzer.stem(&token);
        if stem != token {
            add_usage(&mut surface, token, pos);
        }
        add_usage(&mut stemmed, stem, pos);
        pos += 1;
    }
    (stemmed, surface)
}

/// Build a phrasal sub-query from already-separated words, for scoring
/// synonym phrases against the index.
pub fn phrase_from_terms(words: &[String], analyzer: &Analyzer) -> QueryPhrase {
    let mut phrase: QueryPhrase = HashMap::new();
    let mut pos: u32 = 0;
    for word in words {
        let Some(term) = analyzer.normalize(word) else { continue };
        add_usage(&mut phrase, term, pos);
        pos += 1;
    }
    phrase
}

fn add_usage(phrase: &mut QueryPhrase, term: String, pos: u32) {
    let usage = phrase.entry(term).or_default();
    usage.tf += 1;
    usage.positions.push(pos);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_quoted_phrases() {
        let a = Analyzer::new();
        let q = parse_query(r#""fertility treatment" "damages""#, &a).unwrap();
        assert_eq!(q.raw_phrases, vec!["fertility treatment", "damages"]);
        assert_eq!(q.phrases.len(), 2);
        assert_eq!(q.surface_phrases.len(), 2);
    }

    #[test]
    fn positions_skip_stopwords() {
        let a = Analyzer::new();
        let q = parse_query(r#""breach of duty""#, &a).unwrap();
        let phrase = &q.phrases[0];
        // "of" dropped, so "duty" sits at position 1
        let breach = phrase.get("breach").unwrap();
        let duty = phrase.get(&a.stem("duty")).unwrap();
        assert_eq!(breach.positions, vec![0]);
        assert_eq!(duty.positions, vec![1]);
    }

    #[test]
    fn surface_form_kept_only_when_stem_differs() {
        let a = Analyzer::new();
        let q = parse_query(r#""running fox""#, &a).unwrap();
        // "running" stems to "run"; "fox" is unchanged
        assert!(q.surface_phrases[0].contains_key("running"));
        assert!(!q.surface_phrases[0].contains_key("fox"));
        assert!(q.phrases[0].contains_key("run"));
        assert!(q.phrases[0].contains_key("fox"));
    }

    #[test]
    fn empty_phrase_is_retained() {
        let a = Analyzer::new();
        let q = parse_query(r#""the of" "negligence""#, &a).unwrap();
        assert_eq!(q.phrases.len(), 2);
        assert!(q.phrases[0].is_empty());
        assert!(!q.phrases[1].is_empty());
    }

    #[test]
    fn feedback_lines() {
        let a = Analyzer::new();
        let q = parse_query("\"negligence\"\n+ 246391\n- 3992148\n", &a).unwrap();
        assert_eq!(q.positive_docs, vec![246391]);
        assert_eq!(q.negative_docs, vec![3992148]);
    }

    #[test]
    fn malformed_feedback_line_is_fatal() {
        let a = Analyzer::new();
        assert!(parse_query("\"negligence\"\n* 12\n", &a).is_err());
        assert!(parse_query("\"negligence\"\n+ twelve\n", &a).is_err());
    }
}
