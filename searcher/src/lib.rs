use anyhow::{Context, Result};
use core::analyzer::Analyzer;
use core::lexicon::{EmptyLexicon, FileLexicon, Lexicon};
use core::query::parse_query_file;
use core::score::{rank, ScoreConfig, Scorer};
use core::store::{load_dictionary, PostingsReader};
use std::fs;
use std::path::Path;

pub struct SearchArgs<'a> {
    pub dictionary: &'a Path,
    pub postings: &'a Path,
    pub query: &'a Path,
    pub output: &'a Path,
    pub thesaurus: Option<&'a Path>,
    pub top: Option<usize>,
}

/// Evaluate one query file against a sealed index and write the ranked
/// document-ID list to the output file as a single whitespace-separated line.
/// Nothing is written on error.
pub fn run_search(args: &SearchArgs) -> Result<()> {
    let (dictionary, doc_lengths) = load_dictionary(args.dictionary)?;
    let mut reader = PostingsReader::open(args.postings)?;
    tracing::info!(
        terms = dictionary.terms.len(),
        documents = dictionary.collection_size,
        "index loaded"
    );

    let analyzer = Analyzer::new();
    let query = parse_query_file(args.query, &analyzer)?;
    tracing::debug!(
        phrases = query.phrases.len(),
        positive = query.positive_docs.len(),
        negative = query.negative_docs.len(),
        "query parsed"
    );

    let lexicon: Box<dyn Lexicon> = match args.thesaurus {
        Some(path) => Box::new(FileLexicon::load(path)?),
        None => Box::new(EmptyLexicon),
    };

    let scorer = Scorer::new(
        &dictionary,
        &doc_lengths,
        &analyzer,
        lexicon.as_ref(),
        ScoreConfig::default(),
    );
    let scores = scorer.score(&mut reader, &query)?;
    let mut ranked = rank(&scores);
    if let Some(top) = args.top {
        ranked.truncate(top);
    }
    tracing::info!(results = ranked.len(), "query evaluated");

    let line = ranked
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" ");
    fs::write(args.output, line + "\n")
        .with_context(|| format!("write results to {}", args.output.display()))?;
    Ok(())
}
