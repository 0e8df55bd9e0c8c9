mod extract;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use docsearch_core::persist::IndexPaths;
use docsearch_core::{DiskIndexWriter, DocumentTokens, Encoding, PositionalInvertedIndex};
use extract::{extractor_for, DocumentRecord};
use tracing_subscriber::{EnvFilter, fmt};
use walkdir::WalkDir;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "docsearch-indexer")]
#[command(about = "Build positional disk indexes, one per document type", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum EncodingArg {
    /// 4-byte little-endian integers
    Fixed,
    /// Variable-byte integers
    Vbyte,
}

impl From<EncodingArg> for Encoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Fixed => Encoding::FixedWidth,
            EncodingArg::Vbyte => Encoding::VariableByte,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build indexes from a file or directory of .txt/.json/.jsonl/.xml/.html/.pdf/.docx documents
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: String,
        /// Output directory; each document type gets its own subdirectory
        #[arg(long)]
        output: String,
        /// Integer encoding for the postings files
        #[arg(long, value_enum, default_value_t = EncodingArg::Vbyte)]
        encoding: EncodingArg,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, encoding } => build_indexes(Path::new(&input), Path::new(&output), encoding.into()),
    }
}

fn collect_files(input_path: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            if entry.path().is_file() {
                files.push(entry.path().to_path_buf());
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    }
    files
}

/// Group every extractable document by type, then build one independent
/// index per type under `output/<type>`.
fn build_indexes(input: &Path, output: &Path, encoding: Encoding) -> Result<()> {
    fs::create_dir_all(output)?;
    let mut collections: BTreeMap<&'static str, Vec<DocumentRecord>> = BTreeMap::new();
    for file in collect_files(input) {
        let Some(extractor) = extractor_for(&file) else {
            tracing::warn!(path = %file.display(), "skipping unsupported file");
            continue;
        };
        match extractor.extract(&file) {
            Ok(records) => collections.entry(extractor.filetype()).or_default().extend(records),
            Err(err) => tracing::warn!(path = %file.display(), error = %err, "failed to extract"),
        }
    }

    for (filetype, records) in collections {
        let mut index = PositionalInvertedIndex::new();
        for record in &records {
            index.add_document(&DocumentTokens::from_detected_text(&record.title, &record.body))?;
        }
        tracing::info!(filetype, num_docs = index.num_docs(), num_terms = index.vocabulary_len(), "ingested documents");
        let paths = IndexPaths::new(output.join(filetype));
        DiskIndexWriter::new(&index, paths, encoding).write_index()?;
    }

    tracing::info!(output = %output.display(), "index build complete");
    Ok(())
}
