use crate::analyzer::Analyzer;
use crate::index::{log_tf, Dictionary, DiskPointer, DocId, DocLengthTable, DocumentRecord, PositionalPosting, TermEntry};
use crate::store::{save_dictionary, PostingsReader, PostingsWriter};
use anyhow::{bail, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Build-time knobs. `flush_threshold` is the number of documents accumulated
/// in memory before the partial postings map is spilled to disk; it bounds
/// peak memory independent of collection size.
#[derive(Debug, Clone, Copy)]
pub struct BuilderConfig {
    pub flush_threshold: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self { flush_threshold: 3500 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub documents: u32,
    pub terms: usize,
    pub flushes: usize,
}

/// Convert a document stream into the sealed dictionary + postings files.
/// Records must arrive in strictly ascending ID order; that ordering is what
/// lets the final merge concatenate flush fragments instead of sorting.
pub fn build_index<I>(
    analyzer: &Analyzer,
    records: I,
    dictionary_path: &Path,
    postings_path: &Path,
    config: BuilderConfig,
) -> Result<BuildStats>
where
    I: IntoIterator<Item = DocumentRecord>,
{
    let mut builder = IndexBuilder::new(analyzer, config, postings_path);
    for record in records {
        builder.add_document(record)?;
    }
    builder.seal(dictionary_path, postings_path)
}

struct IndexBuilder<'a> {
    analyzer: &'a Analyzer,
    config: BuilderConfig,
    // term -> entries appended in document order; cleared at every flush
    postings: HashMap<String, Vec<PositionalPosting>>,
    // one term -> pointer directory per flush, in flush order
    fragments: Vec<HashMap<String, DiskPointer>>,
    fragment_writer: Option<PostingsWriter>,
    fragment_path: PathBuf,
    courts: HashMap<DocId, Option<String>>,
    landmarks: HashMap<DocId, bool>,
    doc_lengths: DocLengthTable,
    last_doc_id: Option<DocId>,
    docs_since_flush: usize,
    documents: u32,
}

impl<'a> IndexBuilder<'a> {
    fn new(analyzer: &'a Analyzer, config: BuilderConfig, postings_path: &Path) -> Self {
        let mut fragment_path = postings_path.to_path_buf();
        fragment_path.set_extension("tmp");
        Self {
            analyzer,
            config,
            postings: HashMap::new(),
            fragments: Vec::new(),
            fragment_writer: None,
            fragment_path,
            courts: HashMap::new(),
            landmarks: HashMap::new(),
            doc_lengths: HashMap::new(),
            last_doc_id: None,
            docs_since_flush: 0,
            documents: 0,
        }
    }

    fn add_document(&mut self, record: DocumentRecord) -> Result<()> {
        if let Some(last) = self.last_doc_id {
            if record.id <= last {
                bail!("documents must arrive in ascending ID order: {} after {}", record.id, last);
            }
        }
        self.last_doc_id = Some(record.id);

        // positional term table for this document
        let mut term_positions: HashMap<String, Vec<u32>> = HashMap::new();
        for (term, pos) in self.analyzer.tokenize(&record.content) {
            term_positions.entry(term).or_default().push(pos);
        }

        let doc_length = term_positions
            .values()
            .map(|positions| {
                let w = log_tf(positions.len() as u32);
                w * w
            })
            .sum::<f64>()
            .sqrt();

        for (term, positions) in term_positions {
            self.postings
                .entry(term)
                .or_default()
                .push(PositionalPosting { doc_id: record.id, positions });
        }

        // zero-term documents still get metadata and a 0.0 length
        self.doc_lengths.insert(record.id, doc_length);
        self.courts.insert(record.id, record.court);
        self.landmarks.insert(record.id, record.landmark);
        self.documents += 1;
        self.docs_since_flush += 1;

        if self.docs_since_flush > self.config.flush_threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// Spill the in-memory postings map to the temporary fragment file.
    /// Metadata tables stay resident; they are cheap and feed the final
    /// dictionary directly.
    fn flush(&mut self) -> Result<()> {
        if self.postings.is_empty() {
            self.docs_since_flush = 0;
            return Ok(());
        }
        if self.fragment_writer.is_none() {
            self.fragment_writer = Some(PostingsWriter::create(&self.fragment_path)?);
        }
        let writer = self.fragment_writer.as_mut().expect("fragment writer open");

        let mut directory = HashMap::with_capacity(self.postings.len());
        for (term, list) in self.postings.drain() {
            let ptr = writer.append_postings(&list)?;
            directory.insert(term, ptr);
        }
        tracing::debug!(terms = directory.len(), fragment = self.fragments.len(), "flushed partial index");
        self.fragments.push(directory);
        self.docs_since_flush = 0;
        Ok(())
    }

    /// Merge all flush fragments into the final postings file and persist the
    /// dictionary. Each term's fragment lists are concatenated in flush order;
    /// no comparison-based merge is needed because every fragment is already
    /// sorted by document ID and flushes never reorder documents.
    fn seal(mut self, dictionary_path: &Path, postings_path: &Path) -> Result<BuildStats> {
        self.flush()?;
        let flushes = self.fragments.len();
        if let Some(writer) = self.fragment_writer.take() {
            writer.finish()?;
        }

        // term -> fragment pointers, preserving flush order per term
        let mut fragment_ptrs: HashMap<String, Vec<DiskPointer>> = HashMap::new();
        for fragment in &self.fragments {
            for (term, ptr) in fragment {
                fragment_ptrs.entry(term.clone()).or_default().push(*ptr);
            }
        }
        let mut terms: Vec<String> = fragment_ptrs.keys().cloned().collect();
        terms.sort_unstable();

        let mut dictionary = Dictionary {
            terms: HashMap::with_capacity(terms.len()),
            courts: std::mem::take(&mut self.courts),
            landmarks: std::mem::take(&mut self.landmarks),
            collection_size: self.documents,
        };

        let mut writer = PostingsWriter::create(postings_path)?;
        if !terms.is_empty() {
            let mut reader = PostingsReader::open(&self.fragment_path)?;
            for term in terms {
                let mut merged: Vec<PositionalPosting> = Vec::new();
                for ptr in &fragment_ptrs[&term] {
                    merged.extend(reader.read_postings(*ptr)?);
                }
                debug_assert!(merged.windows(2).all(|w| w[0].doc_id < w[1].doc_id));
                let ptr = writer.append_postings(&merged)?;
                dictionary
                    .terms
                    .insert(term, TermEntry { doc_frequency: merged.len() as u32, ptr });
            }
        }
        writer.finish()?;

        if self.fragment_path.exists() {
            fs::remove_file(&self.fragment_path)?;
        }

        save_dictionary(dictionary_path, &dictionary, &self.doc_lengths)?;
        let stats = BuildStats {
            documents: self.documents,
            terms: dictionary.terms.len(),
            flushes,
        };
        tracing::info!(
            documents = stats.documents,
            terms = stats.terms,
            flushes = stats.flushes,
            "index sealed"
        );
        Ok(stats)
    }
}
