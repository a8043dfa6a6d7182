use anyhow::Result;
use clap::Parser;
use searcher::{run_search, SearchArgs};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "searcher")]
#[command(about = "Rank case documents against a phrase query", long_about = None)]
struct Args {
    /// Dictionary file produced by the indexer
    #[arg(long)]
    dictionary: PathBuf,
    /// Postings file produced by the indexer
    #[arg(long)]
    postings: PathBuf,
    /// Query file: quoted phrases plus optional +/- feedback lines
    #[arg(long)]
    query: PathBuf,
    /// Output file for the ranked document-ID line
    #[arg(long)]
    output: PathBuf,
    /// Optional JSON thesaurus for synonym expansion
    #[arg(long)]
    thesaurus: Option<PathBuf>,
    /// Emit only the first N ranked documents
    #[arg(long)]
    top: Option<usize>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    run_search(&SearchArgs {
        dictionary: &args.dictionary,
        postings: &args.postings,
        query: &args.query,
        output: &args.output,
        thesaurus: args.thesaurus.as_deref(),
        top: args.top,
    })
}
