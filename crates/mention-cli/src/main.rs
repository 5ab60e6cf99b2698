//! Mentions CLI
//!
//! Command-line front end for the mention index: build it, query it, and keep
//! it in sync with a directory of notes.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use mention_core::MentionConfig;
use mention_indexer::{
    ChangeOutcome, FileWatcher, FsDocumentStore, IndexEngine, IndexStore, LoadReport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mentions")]
#[command(about = "Index and query @mentions across a folder of notes")]
#[command(version)]
struct Cli {
    /// Corpus root (default: current directory)
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Config file (default: <config dir>/mentions/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Follow symbolic links while listing the corpus
    #[arg(long, global = true)]
    follow_symlinks: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bring the index up to date with the corpus
    Index,

    /// List every known mention
    List,

    /// Show the occurrences of one mention
    Show {
        /// Mention name as written after the trigger, quotes included
        name: String,
    },

    /// Name the mention at a position
    At {
        /// Document path relative to the root
        path: String,

        /// 1-based line number
        line: usize,

        /// Byte offset within the line
        offset: usize,
    },

    /// Index, then follow changes until interrupted
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => MentionConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => MentionConfig::load().context("Failed to load config")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Watch before the initial load so edits made during it are queued.
    let watcher = match cli.command {
        Commands::Watch => Some(
            FileWatcher::start(&cli.root, &config.watch)
                .with_context(|| format!("Failed to watch {}", cli.root.display()))?,
        ),
        _ => None,
    };

    let engine = open_engine(&cli.root, cli.follow_symlinks, config).await?;
    let report = engine
        .initialize()
        .await
        .context("Failed to load the corpus")?;

    let result = match cli.command {
        Commands::Index => {
            print_report(&report);
            Ok(())
        }
        Commands::List => cmd_list(&engine),
        Commands::Show { name } => cmd_show(&engine, &name),
        Commands::At { path, line, offset } => cmd_at(&engine, &path, line, offset),
        Commands::Watch => match watcher {
            Some(watcher) => cmd_watch(&engine, watcher, &report).await,
            None => Ok(()),
        },
    };

    engine
        .shutdown()
        .await
        .context("Failed to save the index")?;

    result
}

async fn open_engine(
    root: &Path,
    follow_symlinks: bool,
    config: MentionConfig,
) -> Result<IndexEngine> {
    let documents = FsDocumentStore::new(root)
        .with_context(|| format!("Corpus root {} is not readable", root.display()))?
        .follow_symlinks(follow_symlinks);

    let index_dir = config
        .index_dir()
        .join(IndexStore::corpus_key(documents.root()));
    let store = IndexStore::open(index_dir.clone())
        .await
        .with_context(|| format!("Failed to open index at {}", index_dir.display()))?;

    info!(root = ?documents.root(), index = ?index_dir, "Opened index");

    let engine = IndexEngine::new(config, Arc::new(documents), Arc::new(store))?;
    Ok(engine)
}

fn print_report(report: &LoadReport) {
    println!(
        "✓ Indexed {} documents in {}ms",
        report.documents, report.duration_ms
    );
    println!("  Reindexed:  {}", report.reindexed);
    println!("  Unchanged:  {}", report.unchanged);
    if report.failed > 0 {
        println!("  Unreadable: {}", report.failed);
    }
    if report.removed_files + report.removed_mentions > 0 {
        println!(
            "  Removed:    {} documents, {} mentions",
            report.removed_files, report.removed_mentions
        );
    }
}

fn cmd_list(engine: &IndexEngine) -> Result<()> {
    let trigger = &engine.config().trigger_phrase;

    for name in engine.mention_names() {
        let count = engine.store().occurrence_count(&name);
        let primary = engine
            .mention(&name)
            .map(|m| m.is_primary)
            .unwrap_or(false);
        let marker = if primary { " (self)" } else { "" };
        println!("{}{:<32} {:>5}{}", trigger, name, count, marker);
    }

    Ok(())
}

fn cmd_show(engine: &IndexEngine, name: &str) -> Result<()> {
    let name = name
        .strip_prefix(engine.config().trigger_phrase.as_str())
        .unwrap_or(name);

    if engine.mention(name).is_none() {
        anyhow::bail!("Unknown mention: {}", name);
    }

    let occurrences = engine.occurrences_for(name);
    println!("{} occurrences of {}", occurrences.len(), name);
    for occurrence in occurrences {
        let done = if occurrence.is_task_complete { " ✓" } else { "" };
        println!(
            "  {}:{}:{}  {}{}",
            occurrence.path,
            occurrence.line_number,
            occurrence.start,
            occurrence.text.trim(),
            done
        );
    }

    Ok(())
}

fn cmd_at(engine: &IndexEngine, path: &str, line: usize, offset: usize) -> Result<()> {
    match engine.mention_at(path, line, offset) {
        Some(name) => println!("{}", name),
        None => println!("No mention at {}:{}:{}", path, line, offset),
    }
    Ok(())
}

async fn cmd_watch(
    engine: &IndexEngine,
    mut watcher: FileWatcher,
    report: &LoadReport,
) -> Result<()> {
    print_report(report);

    engine.subscribe(|mention, path| {
        println!("~ {} changed in {}", mention.name, path);
    });

    println!("Watching {} (Ctrl+C to stop)", watcher.root().display());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
            event = watcher.next() => {
                let Some(event) = event else { break };
                let path = event.path().unwrap_or_default().to_string();
                match engine.handle_event(event).await {
                    Ok(ChangeOutcome::Loaded(report)) => print_report(&report),
                    Ok(outcome) => debug!(path = %path, ?outcome, "Applied change"),
                    Err(e) if e.is_document_error() => {
                        warn!(path = %path, error = %e, "Skipping document");
                    }
                    Err(e) => return Err(e).context("Failed to apply corpus change"),
                }
            }
        }
    }

    Ok(())
}
