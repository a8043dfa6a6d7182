use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use core::analyzer::Analyzer;
use core::builder::{build_index, BuilderConfig};
use core::{DocId, DocumentRecord};
use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// One case file on disk: `<doc_id>.json` holding the extracted fields.
#[derive(Debug, Deserialize)]
struct CaseFile {
    content: String,
    #[serde(default)]
    court: Option<String>,
    #[serde(default)]
    landmark: bool,
}

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build a positional inverted index over a case corpus", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the index from a directory of case files
    Build {
        /// Directory of <doc_id>.json case files
        #[arg(long)]
        input: String,
        /// Output dictionary file path
        #[arg(long)]
        dictionary: String,
        /// Output postings file path
        #[arg(long)]
        postings: String,
        /// Documents accumulated in memory before a flush to disk
        #[arg(long, default_value_t = 3500)]
        flush_threshold: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, dictionary, postings, flush_threshold } => {
            run_build(&input, &dictionary, &postings, flush_threshold)
        }
    }
}

fn run_build(input: &str, dictionary: &str, postings: &str, flush_threshold: usize) -> Result<()> {
    let files = collect_case_files(Path::new(input))?;
    if files.is_empty() {
        bail!("no case files found under {input}");
    }
    tracing::info!(files = files.len(), input, "corpus scanned");

    let records = files
        .into_iter()
        .map(|(id, path)| read_case(id, &path))
        .collect::<Result<Vec<DocumentRecord>>>()?;

    let analyzer = Analyzer::new();
    let config = BuilderConfig { flush_threshold };
    let stats = build_index(
        &analyzer,
        records,
        Path::new(dictionary),
        Path::new(postings),
        config,
    )?;
    tracing::info!(
        documents = stats.documents,
        terms = stats.terms,
        flushes = stats.flushes,
        dictionary,
        postings,
        "index build complete"
    );
    Ok(())
}

/// Scan the corpus directory for `<doc_id>.json` files and return them sorted
/// by numeric ID, the order the builder requires.
fn collect_case_files(input: &Path) -> Result<Vec<(DocId, PathBuf)>> {
    let mut files: Vec<(DocId, PathBuf)> = Vec::new();
    for entry in WalkDir::new(input) {
        let entry = entry.with_context(|| format!("scan corpus directory {}", input.display()))?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .with_context(|| format!("unreadable file name {}", path.display()))?;
        let id: DocId = stem
            .parse()
            .with_context(|| format!("case file name is not a document ID: {}", path.display()))?;
        files.push((id, path.to_path_buf()));
    }
    files.sort_by_key(|(id, _)| *id);
    Ok(files)
}

fn read_case(id: DocId, path: &Path) -> Result<DocumentRecord> {
    let f = File::open(path).with_context(|| format!("open case file {}", path.display()))?;
    let case: CaseFile = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("malformed case file {}", path.display()))?;
    Ok(DocumentRecord {
        id,
        content: case.content,
        court: case.court,
        landmark: case.landmark,
    })
}
