//! CLI tool for extracting slide records from Keynote files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use slydb::config::{ExtractOptions, IndexOptions};
use slydb::index::{self, ExtractionOutcome};
use slydb::KeynoteFile;
use std::io::Write;
use std::path::PathBuf;

/// Extract slide text, notes and thumbnails from Keynote presentations.
#[derive(Parser, Debug)]
#[command(name = "slydb")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract every .key file under a directory
    Index {
        /// Directory to search
        root: PathBuf,

        /// Write successful records to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export deduplicated thumbnails into this directory
        #[arg(short, long)]
        thumbnails: Option<PathBuf>,

        /// Skip paths containing this text (case-insensitive, repeatable)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Strip everything up to this text from record paths
        #[arg(long)]
        root_prefix: Option<String>,

        /// Number of worker threads (default: one per core)
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Print the record of one .key file as JSON
    Dump {
        /// Input Keynote file
        file: PathBuf,

        /// Strip everything up to this text from the record path
        #[arg(long)]
        root_prefix: Option<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match args.command {
        Command::Index {
            root,
            output,
            thumbnails,
            exclude,
            root_prefix,
            workers,
        } => {
            let mut extract = ExtractOptions::new();
            extract.root_prefix = root_prefix;
            extract.thumbnail_dir = thumbnails;

            let mut options = IndexOptions::new().with_extract(extract);
            options.exclude.extend(exclude);
            options.workers = workers;

            run_index(&root, output, &options)
        },
        Command::Dump { file, root_prefix } => {
            let mut options = ExtractOptions::new();
            options.root_prefix = root_prefix;
            run_dump(&file, options)
        },
    }
}

fn run_index(root: &std::path::Path, output: Option<PathBuf>, options: &IndexOptions) -> Result<()> {
    anyhow::ensure!(root.is_dir(), "{} is not a directory", root.display());

    let outcomes = index::index_path(root, options);
    let mut failed = 0;
    for outcome in &outcomes {
        match outcome {
            ExtractionOutcome::Extracted { path, record } => {
                println!("{}\t{} slides", path.display(), record.slides.len());
            },
            ExtractionOutcome::Failed { path, cause } => {
                failed += 1;
                eprintln!("{}\t{}", path.display(), cause);
            },
        }
    }

    if let Some(output) = output {
        let written = index::write_records(&output, &outcomes)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        eprintln!("Wrote {} records to {}", written, output.display());
    }

    eprintln!("{} documents, {} failed", outcomes.len(), failed);
    Ok(())
}

fn run_dump(file: &std::path::Path, options: ExtractOptions) -> Result<()> {
    let doc = KeynoteFile::open_with(file, options)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let record = doc
        .record()
        .with_context(|| format!("Failed to extract {}", file.display()))?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &record)?;
    writeln!(out)?;
    Ok(())
}
