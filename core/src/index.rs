use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type DocId = u32;

/// One document as delivered by the corpus adapter, in ascending-ID order.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: DocId,
    pub content: String,
    pub court: Option<String>,
    pub landmark: bool,
}

/// One document's occurrences of one term. Positions are zero-based token
/// positions within the document's content stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionalPosting {
    pub doc_id: DocId,
    pub positions: Vec<u32>,
}

/// Byte range of one serialized posting list in the postings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskPointer {
    pub offset: u64,
    pub length: u32,
}

/// Directory record for one term: document frequency plus where its posting
/// list lives on disk. No posting bytes are loaded until explicitly requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermEntry {
    pub doc_frequency: u32,
    pub ptr: DiskPointer,
}

/// The in-memory side of the sealed index: term directory, per-document court
/// and landmark metadata, and the collection size used for idf.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Dictionary {
    pub terms: HashMap<String, TermEntry>,
    pub courts: HashMap<DocId, Option<String>>,
    pub landmarks: HashMap<DocId, bool>,
    pub collection_size: u32,
}

/// Euclidean norm of each document's log-tf vector, computed once at build
/// time. Documents with no indexable terms carry 0.0.
pub type DocLengthTable = HashMap<DocId, f64>;

/// Log-scaled term frequency: 1 + log10(tf), 0 for an absent term.
pub fn log_tf(tf: u32) -> f64 {
    if tf == 0 {
        0.0
    } else {
        1.0 + (tf as f64).log10()
    }
}

/// Inverse document frequency: log10(N / df).
pub fn idf(collection_size: u32, doc_frequency: u32) -> f64 {
    if collection_size == 0 || doc_frequency == 0 {
        0.0
    } else {
        (collection_size as f64 / doc_frequency as f64).log10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_tf_values() {
        assert_eq!(log_tf(0), 0.0);
        assert_eq!(log_tf(1), 1.0);
        assert!((log_tf(3) - 1.477).abs() < 1e-3);
    }

    #[test]
    fn idf_values() {
        assert_eq!(idf(10, 10), 0.0);
        assert!((idf(100, 1) - 2.0).abs() < 1e-12);
        assert_eq!(idf(0, 5), 0.0);
        assert_eq!(idf(5, 0), 0.0);
    }
}
