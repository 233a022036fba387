use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use services::{Clock, EngineConfig, StudyService};
use vocab_core::model::{LearnerId, Rating, WordId};
use vocab_core::scheduler::format_interval;

/// Spaced-repetition vocabulary trainer.
#[derive(Parser)]
#[command(name = "vocab")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Per-learner SM-2 vocabulary scheduler", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Learner identifier; without one every command does nothing
    #[arg(short, long, global = true)]
    learner: Option<LearnerId>,

    /// Local database (overrides VOCAB_DB_URL)
    #[arg(long, global = true)]
    db: Option<String>,

    /// Content directory (overrides VOCAB_CONTENT_DIR)
    #[arg(long, global = true)]
    content: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show XP, unit progress and deck statistics
    Status,

    /// Create the cards of a unit
    Start { unit: u32 },

    /// List due words, for one unit or all of them
    Due {
        #[arg(long)]
        unit: Option<u32>,
    },

    /// Record one answer: no-clue, got-one or got-both
    Answer {
        word: WordId,
        rating: Rating,
        /// Schedule the real due date immediately instead of keeping the card in session
        #[arg(long)]
        final_answer: bool,
    },

    /// Study interactively, reading one rating per line from stdin
    Study {
        unit: u32,
        #[arg(long)]
        shuffle: bool,
    },

    /// Move in-session cards to their real due dates
    Finalize {
        #[arg(long)]
        unit: Option<u32>,
    },

    /// Mark a unit as completed
    Complete { unit: u32 },

    /// Delete the learner's deck everywhere
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut config = EngineConfig::from_env();
    if let Some(db) = cli.db {
        config.db_url = db;
    }
    if let Some(dir) = cli.content {
        config.content_dir = dir;
    }
    config.db_url = normalize_sqlite_url(&config.db_url);
    prepare_sqlite_file(&config.db_url)?;

    let mut svc = StudyService::connect(config, Clock::default())
        .await
        .context("opening the deck store")?;
    if svc.open(cli.learner).await.is_none() {
        info!("no learner given, nothing to do");
        return Ok(());
    }

    match cli.command {
        Commands::Status => print_status(&svc),
        Commands::Start { unit } => {
            let report = svc.start_unit(unit).await?;
            println!(
                "unit {unit}: {} new cards, {} recovered",
                report.created, report.recovered
            );
        }
        Commands::Due { unit } => {
            let words = svc.due_words(unit).await?;
            if words.is_empty() {
                println!("nothing to review");
            }
            for w in words {
                println!("{}\t{}\t{}", w.card.word_id, w.item.source, w.item.target);
            }
        }
        Commands::Answer {
            word,
            rating,
            final_answer,
        } => {
            let mut answer = vocab_core::session::Answer::from_rating(word, rating);
            if final_answer {
                answer = answer.final_answer();
            }
            if let Some(recorded) = svc.record_answer(&answer).await? {
                println!(
                    "{}: next in {} (+{} xp)",
                    recorded.word_id,
                    format_interval(recorded.outcome.interval),
                    recorded.xp_awarded
                );
                if let Some(unit) = recorded.completed_unit {
                    println!("unit {unit} completed");
                }
            }
        }
        Commands::Study { unit, shuffle } => study(&mut svc, unit, shuffle).await?,
        Commands::Finalize { unit } => {
            let changed = svc.finalize_session(unit).await?;
            println!("{changed} cards scheduled");
        }
        Commands::Complete { unit } => {
            if svc.mark_unit_completed(unit).await? {
                println!("unit {unit} marked completed");
            } else {
                println!("unit {unit} was already completed");
            }
        }
        Commands::Reset => {
            svc.reset().await?;
            println!("deck reset");
        }
    }

    if let Some(warning) = svc.take_warning() {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

fn print_status(svc: &StudyService) {
    let stats = svc.stats();
    println!(
        "xp {}  cards {}  learned {}  mastered {}  reviews {}",
        stats.xp, stats.total_cards, stats.completed_cards, stats.mastered_cards, stats.total_reviews
    );
    for p in svc.all_unit_progress() {
        let state = if p.is_completed {
            "done"
        } else if p.can_access {
            "open"
        } else {
            "locked"
        };
        println!(
            "unit {:>2}  {:<6}  {}/{} learned  ease {:.2}",
            p.unit.value(), state, p.completed_words, p.total_words, p.average_ease_factor
        );
    }
}

async fn study(svc: &mut StudyService, unit: u32, shuffle: bool) -> Result<()> {
    svc.start_unit(unit).await?;
    let words = svc.due_words(Some(unit)).await?;
    let mut queue = svc.session_queue(Some(unit), shuffle)?;

    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    while let Some(word) = queue.current().cloned() {
        match words.iter().find(|w| w.card.word_id == word) {
            Some(w) => println!("{}  (no-clue / got-one / got-both)", w.item.source),
            None => println!("{word}  (no-clue / got-one / got-both)"),
        }

        let Some(line) = lines.next() else {
            break;
        };
        let rating: Rating = match line?.trim().parse() {
            Ok(rating) => rating,
            Err(e) => {
                eprintln!("{e}");
                continue;
            }
        };

        if let Some(result) = svc.answer_current(&mut queue, Some(unit), rating).await? {
            if let Some(w) = words.iter().find(|w| w.card.word_id == word) {
                println!("  {}", w.item.target);
            }
            if result.requeued_at.is_some() {
                println!("  again soon");
            }
            if let Some(done) = result.recorded.completed_unit {
                println!("  unit {done} completed");
            }
        }
    }

    let changed = svc.finalize_session(Some(unit)).await?;
    let progress = queue.progress();
    println!(
        "answered {}, requeued {}, {} cards scheduled",
        progress.answered, progress.requeued, changed
    );
    Ok(())
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database url: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}
