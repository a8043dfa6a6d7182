use core::analyzer::Analyzer;
use core::builder::{build_index, BuilderConfig};
use core::store::{load_dictionary, PostingsReader};
use core::{DocId, DocumentRecord, PositionalPosting};
use std::collections::HashMap;
use std::path::Path;

fn record(id: DocId, content: &str) -> DocumentRecord {
    DocumentRecord { id, content: content.to_string(), court: None, landmark: false }
}

/// Build an index in `dir` and return every term's posting list.
fn build_and_read(
    dir: &Path,
    docs: Vec<DocumentRecord>,
    flush_threshold: usize,
) -> (core::Dictionary, core::DocLengthTable, HashMap<String, Vec<PositionalPosting>>) {
    let analyzer = Analyzer::new();
    let dict_path = dir.join("dictionary.bin");
    let post_path = dir.join("postings.bin");
    build_index(
        &analyzer,
        docs,
        &dict_path,
        &post_path,
        BuilderConfig { flush_threshold },
    )
    .unwrap();

    let (dictionary, doc_lengths) = load_dictionary(&dict_path).unwrap();
    let mut reader = PostingsReader::open(&post_path).unwrap();
    let mut postings = HashMap::new();
    for (term, entry) in &dictionary.terms {
        postings.insert(term.clone(), reader.read_postings(entry.ptr).unwrap());
    }
    (dictionary, doc_lengths, postings)
}

#[test]
fn round_trip_df_matches_posting_lists() {
    let dir = tempfile::tempdir().unwrap();
    let docs = vec![
        record(1, "negligence appeal appeal"),
        record(2, "negligence damages"),
        record(3, "damages damages appeal"),
    ];
    let (dictionary, _, postings) = build_and_read(dir.path(), docs, 3500);

    assert_eq!(dictionary.collection_size, 3);
    for (term, entry) in &dictionary.terms {
        let list = &postings[term];
        assert_eq!(entry.doc_frequency as usize, list.len(), "df mismatch for {term}");
        // ordering invariant: strictly increasing doc IDs
        assert!(list.windows(2).all(|w| w[0].doc_id < w[1].doc_id), "unsorted postings for {term}");
        // no posting may be empty of positions
        assert!(list.iter().all(|p| !p.positions.is_empty()));
    }
}

#[test]
fn positions_recorded_per_document() {
    let dir = tempfile::tempdir().unwrap();
    let docs = vec![record(10, "appeal dismissed appeal")];
    let (dictionary, _, postings) = build_and_read(dir.path(), docs, 3500);

    let analyzer = Analyzer::new();
    let appeal = analyzer.normalize("appeal").unwrap();
    let list = &postings[&appeal];
    assert_eq!(list, &vec![PositionalPosting { doc_id: 10, positions: vec![0, 2] }]);
    assert_eq!(dictionary.terms[&appeal].doc_frequency, 1);
}

#[test]
fn merge_equivalence_across_flush_thresholds() {
    let docs = vec![
        record(1, "contract breach remedy"),
        record(2, "breach of contract"),
        record(3, "remedy sought damages"),
        record(4, "contract damages"),
        record(5, "remedy remedy remedy"),
    ];

    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();
    let dir_c = tempfile::tempdir().unwrap();
    // no flushing, flush every document, and the scenario threshold of 2
    let (dict_a, len_a, post_a) = build_and_read(dir_a.path(), docs.clone(), 3500);
    let (dict_b, len_b, post_b) = build_and_read(dir_b.path(), docs.clone(), 1);
    let (dict_c, len_c, post_c) = build_and_read(dir_c.path(), docs, 2);

    assert_eq!(post_a, post_b);
    assert_eq!(post_a, post_c);
    assert_eq!(len_a, len_b);
    assert_eq!(len_a, len_c);
    for (term, entry) in &dict_a.terms {
        assert_eq!(entry.doc_frequency, dict_b.terms[term].doc_frequency);
        assert_eq!(entry.doc_frequency, dict_c.terms[term].doc_frequency);
    }
    assert_eq!(dict_a.collection_size, dict_b.collection_size);
}

#[test]
fn doc_length_is_log_tf_norm() {
    // one "alpha", three "beta": sqrt(1^2 + (1 + log10 3)^2) ~= 1.780
    let dir = tempfile::tempdir().unwrap();
    let docs = vec![record(1, "alpha beta beta beta")];
    let (_, doc_lengths, _) = build_and_read(dir.path(), docs, 3500);
    assert!((doc_lengths[&1] - 1.780).abs() < 1e-3);
}

#[test]
fn metadata_survives_flushes() {
    let dir = tempfile::tempdir().unwrap();
    let docs = vec![
        DocumentRecord {
            id: 1,
            content: "negligence".to_string(),
            court: Some("SGCA".to_string()),
            landmark: true,
        },
        DocumentRecord {
            id: 2,
            content: "negligence".to_string(),
            court: None,
            landmark: false,
        },
        DocumentRecord {
            id: 3,
            content: "damages".to_string(),
            court: Some("SGHC".to_string()),
            landmark: false,
        },
    ];
    let (dictionary, _, _) = build_and_read(dir.path(), docs, 1);
    assert_eq!(dictionary.courts[&1], Some("SGCA".to_string()));
    assert_eq!(dictionary.courts[&2], None);
    assert_eq!(dictionary.courts[&3], Some("SGHC".to_string()));
    assert_eq!(dictionary.landmarks[&1], true);
    assert_eq!(dictionary.landmarks[&3], false);
}
