use crate::analyzer::Analyzer;
use crate::index::{idf, log_tf, Dictionary, DocId, DocLengthTable, PositionalPosting};
use crate::lexicon::Lexicon;
use crate::query::{phrase_from_terms, ParsedQuery, QueryPhrase, TermUsage};
use crate::store::PostingsReader;
use anyhow::Result;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

pub type ScoreMap = HashMap<DocId, f64>;

/// Scoring knobs. All of these are contract configuration, not fixed law:
/// synonym pass weights, the two proximity tiers (slack added on top of each
/// term pair's phrase-position offset), the court bonus table (full codes and
/// two-letter prefix/suffix classes share one table), and the landmark bonus.
/// Field bonuses are additive on the normalized cosine score.
#[derive(Debug, Clone)]
pub struct ScoreConfig {
    pub phrase_synonym_weight: f64,
    pub word_synonym_weight: f64,
    pub tight_slack: u32,
    pub loose_slack: u32,
    pub court_bonus: HashMap<String, f64>,
    pub landmark_bonus: f64,
    pub max_synonyms_per_key: usize,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        let court_bonus = [("SGCA", 0.10), ("SGHC", 0.07), ("CA", 0.05), ("HC", 0.03)]
            .into_iter()
            .map(|(code, bonus)| (code.to_string(), bonus))
            .collect();
        Self {
            phrase_synonym_weight: 0.5,
            word_synonym_weight: 0.25,
            tight_slack: 0,
            loose_slack: 2,
            court_bonus,
            landmark_bonus: 0.05,
            max_synonyms_per_key: 5,
        }
    }
}

pub struct Scorer<'a> {
    dictionary: &'a Dictionary,
    doc_lengths: &'a DocLengthTable,
    analyzer: &'a Analyzer,
    lexicon: &'a dyn Lexicon,
    config: ScoreConfig,
}

impl<'a> Scorer<'a> {
    pub fn new(
        dictionary: &'a Dictionary,
        doc_lengths: &'a DocLengthTable,
        analyzer: &'a Analyzer,
        lexicon: &'a dyn Lexicon,
        config: ScoreConfig,
    ) -> Self {
        Self { dictionary, doc_lengths, analyzer, lexicon, config }
    }

    /// Full pipeline: cosine scoring with phrase verification, length
    /// normalization, synonym expansion, field re-ranking, then the ranked
    /// document-ID list.
    pub fn run(&self, reader: &mut PostingsReader, query: &ParsedQuery) -> Result<Vec<DocId>> {
        let scores = self.score(reader, query)?;
        tracing::debug!(candidates = scores.len(), "query scored");
        Ok(rank(&scores))
    }

    pub fn score(&self, reader: &mut PostingsReader, query: &ParsedQuery) -> Result<ScoreMap> {
        let mut scores = self.base_scores(reader, &query.phrases)?;
        self.normalize(&mut scores);
        self.expand(reader, query, &mut scores)?;
        self.rerank_fields(&mut scores);
        Ok(scores)
    }

    /// Stage A: score each phrase, then AND the phrases. Scores sum only over
    /// documents that survive every non-empty phrase; an empty phrase
    /// contributes nothing and does not veto.
    fn base_scores(&self, reader: &mut PostingsReader, phrases: &[QueryPhrase]) -> Result<ScoreMap> {
        let mut per_phrase: Vec<ScoreMap> = Vec::new();
        for phrase in phrases {
            if phrase.is_empty() {
                continue;
            }
            per_phrase.push(self.score_phrase(reader, phrase, None, Some(self.config.tight_slack))?);
        }
        let Some(first) = per_phrase.first() else {
            return Ok(HashMap::new());
        };

        let mut common: HashSet<DocId> = first.keys().copied().collect();
        for phrase_scores in &per_phrase[1..] {
            common.retain(|doc_id| phrase_scores.contains_key(doc_id));
        }
        let mut scores = HashMap::with_capacity(common.len());
        for doc_id in common {
            let total: f64 = per_phrase.iter().map(|m| m[&doc_id]).sum();
            scores.insert(doc_id, total);
        }
        Ok(scores)
    }

    /// Score one phrase as a cosine accumulation over its terms' posting
    /// lists, optionally restricted to an existing candidate set, optionally
    /// followed by positional verification with the given slack tier.
    fn score_phrase(
        &self,
        reader: &mut PostingsReader,
        phrase: &QueryPhrase,
        restrict: Option<&HashSet<DocId>>,
        proximity_slack: Option<u32>,
    ) -> Result<ScoreMap> {
        let mut scores: ScoreMap = HashMap::new();
        let mut cache: HashMap<&str, Vec<PositionalPosting>> = HashMap::new();
        let n = self.dictionary.collection_size;

        for (term, usage) in phrase {
            // absent term: zero contribution, not an error
            let Some(entry) = self.dictionary.terms.get(term) else { continue };
            let query_weight = log_tf(usage.tf) * idf(n, entry.doc_frequency);
            let postings = reader.read_postings(entry.ptr)?;
            for posting in &postings {
                if let Some(allowed) = restrict {
                    if !allowed.contains(&posting.doc_id) {
                        continue;
                    }
                }
                *scores.entry(posting.doc_id).or_insert(0.0) +=
                    query_weight * log_tf(posting.positions.len() as u32);
            }
            cache.insert(term.as_str(), postings);
        }

        if let Some(slack) = proximity_slack {
            verify_proximity(phrase, &cache, slack, &mut scores);
        }
        Ok(scores)
    }

    /// Stage B: cosine normalization by document length. Zero-length
    /// documents are excluded rather than divided by zero.
    fn normalize(&self, scores: &mut ScoreMap) {
        scores.retain(|doc_id, score| match self.doc_lengths.get(doc_id) {
            Some(&len) if len > 0.0 => {
                *score /= len;
                true
            }
            _ => false,
        });
    }

    /// Stage C: synonym expansion, strictly re-weighting the existing
    /// candidate set. The phrase pass looks up each multi-word phrase as an
    /// underscore-joined key; multi-word synonyms become verified phrasal
    /// sub-queries at the loose proximity tier, single-word synonyms join the
    /// pass's bag. The word pass looks up every stemmed and surface query
    /// term and keeps single-word synonyms only. Each bag scores as one
    /// disjunctive, unverified pseudo-phrase over the candidate set.
    fn expand(
        &self,
        reader: &mut PostingsReader,
        query: &ParsedQuery,
        scores: &mut ScoreMap,
    ) -> Result<()> {
        let candidates: HashSet<DocId> = scores.keys().copied().collect();
        if candidates.is_empty() {
            return Ok(());
        }

        let mut original_terms: HashSet<&str> = HashSet::new();
        for phrase in query.phrases.iter().chain(query.surface_phrases.iter()) {
            original_terms.extend(phrase.keys().map(String::as_str));
        }

        // phrase-synonym pass
        let mut boost: ScoreMap = HashMap::new();
        let mut phrase_bag: HashSet<String> = HashSet::new();
        for raw in &query.raw_phrases {
            let words: Vec<&str> = raw.split_whitespace().collect();
            if words.len() < 2 {
                continue;
            }
            let key = words.join("_").to_lowercase();
            let set = self.lexicon.synonyms(&key);
            for phrase_words in set.phrases.iter().take(self.config.max_synonyms_per_key) {
                let sub = phrase_from_terms(phrase_words, self.analyzer);
                if sub.is_empty() {
                    continue;
                }
                let mut sub_scores =
                    self.score_phrase(reader, &sub, Some(&candidates), Some(self.config.loose_slack))?;
                self.normalize(&mut sub_scores);
                for (doc_id, s) in sub_scores {
                    *boost.entry(doc_id).or_insert(0.0) += s;
                }
            }
            self.collect_bag_words(&set.words, &original_terms, &mut phrase_bag);
        }
        for (doc_id, s) in self.score_bag(reader, &phrase_bag, &candidates)? {
            *boost.entry(doc_id).or_insert(0.0) += s;
        }
        for (doc_id, s) in boost {
            if let Some(score) = scores.get_mut(&doc_id) {
                *score += self.config.phrase_synonym_weight * s;
            }
        }

        // word-synonym pass
        let mut word_bag: HashSet<String> = HashSet::new();
        for phrase in query.phrases.iter().chain(query.surface_phrases.iter()) {
            for term in phrase.keys() {
                let set = self.lexicon.synonyms(term);
                self.collect_bag_words(&set.words, &original_terms, &mut word_bag);
            }
        }
        for (doc_id, s) in self.score_bag(reader, &word_bag, &candidates)? {
            if let Some(score) = scores.get_mut(&doc_id) {
                *score += self.config.word_synonym_weight * s;
            }
        }
        Ok(())
    }

    fn collect_bag_words(
        &self,
        words: &[String],
        original_terms: &HashSet<&str>,
        bag: &mut HashSet<String>,
    ) {
        for word in words.iter().take(self.config.max_synonyms_per_key) {
            if original_terms.contains(word.as_str()) {
                continue;
            }
            if let Some(term) = self.analyzer.normalize(word) {
                if !original_terms.contains(term.as_str()) {
                    bag.insert(term);
                }
            }
        }
    }

    fn score_bag(
        &self,
        reader: &mut PostingsReader,
        bag: &HashSet<String>,
        candidates: &HashSet<DocId>,
    ) -> Result<ScoreMap> {
        if bag.is_empty() {
            return Ok(HashMap::new());
        }
        let mut pseudo: QueryPhrase = HashMap::new();
        for term in bag {
            pseudo.insert(term.clone(), TermUsage { tf: 1, positions: Vec::new() });
        }
        let mut bag_scores = self.score_phrase(reader, &pseudo, Some(candidates), None)?;
        self.normalize(&mut bag_scores);
        Ok(bag_scores)
    }

    /// Stage D: court and landmark bonuses. An exact court-code match wins;
    /// otherwise the two-letter prefix and suffix are each checked against
    /// the same table and every match applies. Documents without a court are
    /// untouched by the court component.
    fn rerank_fields(&self, scores: &mut ScoreMap) {
        for (doc_id, score) in scores.iter_mut() {
            if let Some(Some(court)) = self.dictionary.courts.get(doc_id) {
                if let Some(bonus) = self.config.court_bonus.get(court.as_str()) {
                    *score += bonus;
                } else {
                    let chars: Vec<char> = court.chars().collect();
                    if chars.len() >= 2 {
                        let prefix: String = chars[..2].iter().collect();
                        let suffix: String = chars[chars.len() - 2..].iter().collect();
                        if let Some(bonus) = self.config.court_bonus.get(prefix.as_str()) {
                            *score += bonus;
                        }
                        if let Some(bonus) = self.config.court_bonus.get(suffix.as_str()) {
                            *score += bonus;
                        }
                    }
                }
            }
            if self.dictionary.landmarks.get(doc_id).copied().unwrap_or(false) {
                *score += self.config.landmark_bonus;
            }
        }
    }
}

/// Stage E: descending score, ties broken by ascending document ID so runs
/// are deterministic.
pub fn rank(scores: &ScoreMap) -> Vec<DocId> {
    let mut ranked: Vec<(DocId, f64)> = scores.iter().map(|(&d, &s)| (d, s)).collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.into_iter().map(|(doc_id, _)| doc_id).collect()
}

/// Drop from `scores` every document that fails the phrase's positional
/// constraints. All (term, position) pairs are ordered by phrase position;
/// each later pair intersects against the first, with allowed distance equal
/// to the pair's position offset plus the slack tier; the per-pair document
/// sets are then intersected.
fn verify_proximity(
    phrase: &QueryPhrase,
    cache: &HashMap<&str, Vec<PositionalPosting>>,
    slack: u32,
    scores: &mut ScoreMap,
) {
    if phrase.len() < 2 {
        return;
    }
    let mut pairs: Vec<(&str, u32)> = Vec::new();
    for (term, usage) in phrase {
        if !cache.contains_key(term.as_str()) {
            continue;
        }
        for &pos in &usage.positions {
            pairs.push((term.as_str(), pos));
        }
    }
    if pairs.len() < 2 {
        return;
    }
    pairs.sort_by_key(|&(_, pos)| pos);

    let (anchor_term, anchor_pos) = pairs[0];
    let mut surviving: Option<HashSet<DocId>> = None;
    for &(term, pos) in &pairs[1..] {
        let max_diff = (pos - anchor_pos) + slack;
        let docs: HashSet<DocId> = positional_intersect(&cache[anchor_term], &cache[term], max_diff)
            .into_iter()
            .collect();
        surviving = Some(match surviving {
            None => docs,
            Some(prev) => prev.intersection(&docs).copied().collect(),
        });
    }
    if let Some(surviving) = surviving {
        scores.retain(|doc_id, _| surviving.contains(doc_id));
    }
}

/// Sorted-merge intersection of two posting lists: walk both doc-ID-sorted
/// lists in lockstep and accept a document when some pair of positions across
/// the two lists differs by at most `max_diff`.
fn positional_intersect(
    a: &[PositionalPosting],
    b: &[PositionalPosting],
    max_diff: u32,
) -> Vec<DocId> {
    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].doc_id.cmp(&b[j].doc_id) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                if positions_within(&a[i].positions, &b[j].positions, max_diff) {
                    out.push(a[i].doc_id);
                }
                i += 1;
                j += 1;
            }
        }
    }
    out
}

fn positions_within(xs: &[u32], ys: &[u32], max_diff: u32) -> bool {
    let (mut x, mut y) = (0, 0);
    while x < xs.len() && y < ys.len() {
        if xs[x].abs_diff(ys[y]) <= max_diff {
            return true;
        }
        if xs[x] < ys[y] {
            x += 1;
        } else {
            y += 1;
        }
    }
    false
}
