use anyhow::Context;
use clap::{Parser, Subcommand};
use lumen_core::{JournalEntry, JournalRepository, LumenConfig, Safety};
use lumen_memory::{InMemoryJournal, PatternReport, SqliteJournal};
use lumen_reasoning::{JournalService, ReflectionResult, Submission};
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lumen", author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "lumen.toml", env = "LUMEN_CONFIG")]
    config: PathBuf,

    /// Path to the journal database (overrides the config file)
    #[arg(short, long)]
    db: Option<String>,

    /// Keep entries in memory only; nothing is written to disk
    #[arg(long)]
    ephemeral: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a journal entry. Reads stdin when TEXT is omitted.
    Write { text: Option<String> },
    /// Show past entries most similar to TEXT
    Similar { text: String },
    /// Show emotional patterns across the journal
    Stats,
    /// List recent entries
    History {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Interactive session (default)
    Repl,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();
    init_logging(args.json);

    let mut config = LumenConfig::load_or_default(&args.config)?;
    if let Some(db) = &args.db {
        config.storage.db_path = db.clone();
    }

    let repository: Arc<dyn JournalRepository> = if args.ephemeral {
        info!("Ephemeral session: entries are kept in memory only");
        Arc::new(InMemoryJournal::new())
    } else {
        info!("Opening journal at {}...", config.storage.db_path);
        Arc::new(SqliteJournal::new(&config.storage.db_path).await?)
    };
    let service = JournalService::from_config(&config, repository)
        .context("Failed to initialise journal service")?;

    match args.command.unwrap_or(Command::Repl) {
        Command::Write { text } => {
            let text = match text {
                Some(t) => t,
                None => {
                    let mut buf = String::new();
                    io::stdin()
                        .read_to_string(&mut buf)
                        .context("Failed to read entry from stdin")?;
                    buf
                }
            };
            let submission = service.submit(&text).await?;
            print_submission(&submission);
        }
        Command::Similar { text } => {
            let matches = service.similar_to(&text).await?;
            print_matches(&matches);
        }
        Command::Stats => {
            let report = service.patterns().await?;
            print_report(&report);
        }
        Command::History { limit } => {
            let history = service.history().await?;
            if history.is_empty() {
                println!("No entries yet.");
            }
            let skip = history.len().saturating_sub(limit);
            for entry in &history[skip..] {
                print_entry_line(entry);
            }
        }
        Command::Repl => repl(&service).await?,
    }

    Ok(())
}

async fn repl(service: &JournalService) -> anyhow::Result<()> {
    println!("Lumen journal. Write an entry and press Enter.");
    println!("Commands: 'stats', 'history', 'similar <text>', 'quit'.");
    print!("> ");
    io::stdout().flush()?;

    let stdin = io::stdin();
    let mut input = String::new();

    loop {
        input.clear();
        if stdin.read_line(&mut input)? == 0 {
            break;
        }
        let trimmed = input.trim();

        if trimmed == "quit" || trimmed == "exit" {
            break;
        }

        if !trimmed.is_empty() {
            let outcome = match trimmed {
                "stats" => service.patterns().await.map(|r| print_report(&r)),
                "history" => service.history().await.map(|h| {
                    let skip = h.len().saturating_sub(10);
                    h[skip..].iter().for_each(print_entry_line);
                }),
                _ if trimmed.starts_with("similar ") => service
                    .similar_to(&trimmed["similar ".len()..])
                    .await
                    .map(|m| print_matches(&m)),
                _ => service.submit(trimmed).await.map(|s| print_submission(&s)),
            };
            if let Err(e) = outcome {
                error!("Request failed: {}", e);
                println!("\n[Error]: {}\n", e);
            }
        }

        print!("> ");
        io::stdout().flush()?;
    }

    Ok(())
}

// ============================================================================
// Output
// ============================================================================

fn print_submission(sub: &Submission) {
    let entry = &sub.entry;
    println!();
    println!(
        "Sentiment: {:+.2}   Emotion: {}   Saved as {}",
        entry.sentiment, entry.emotion, entry.id
    );

    match entry.safety {
        Safety::Crisis(_) => {
            println!();
            println!("It sounds like you may be going through something very painful.");
            println!("You don't have to face it alone. Please consider reaching out:");
            for r in &sub.resources {
                println!("  - {}: {}", r.region, r.contact);
            }
            println!("If you are in immediate danger, contact your local emergency number.");
        }
        Safety::Flagged | Safety::None => {
            println!();
            println!("{}", entry.reflection);
            if !entry.summary.is_empty() {
                println!("\nSummary: {}", entry.summary);
            }
            for (i, f) in entry.followups.iter().enumerate() {
                println!("  {}. {}", i + 1, f.question);
                println!("     ({})", f.rationale);
            }
            if !entry.tone.is_empty() {
                println!("Tone: {}", entry.tone);
            }
        }
    }

    if let Some(generation) = &sub.generation {
        if let ReflectionResult::Unstructured { backend, raw_text } = &generation.result {
            println!("\nRaw response from '{}':\n{}", backend, raw_text);
        }
    }

    if !sub.similar.is_empty() {
        println!("\nSimilar past entries:");
        print_matches(&sub.similar);
    }
    println!();
}

fn print_matches(matches: &[(JournalEntry, f32)]) {
    if matches.is_empty() {
        println!("Not enough entries to compare yet.");
    }
    for (entry, score) in matches {
        println!(
            "  [{:.2}] {} {}",
            score,
            entry.timestamp.format("%Y-%m-%d"),
            first_line(&entry.text, 70)
        );
    }
}

fn print_entry_line(entry: &JournalEntry) {
    println!(
        "{} {} {:+.2} {:<17} {}",
        entry.id,
        entry.timestamp.format("%Y-%m-%d %H:%M"),
        entry.sentiment,
        entry.emotion.as_str(),
        first_line(&entry.text, 60)
    );
}

fn print_report(report: &PatternReport) {
    if report.total_entries == 0 {
        println!("No entries yet.");
        return;
    }
    println!("Entries: {}", report.total_entries);

    if let Some(s) = &report.sentiment {
        println!(
            "Sentiment: mean {:+.2}, min {:+.2}, max {:+.2}, std {:.2}",
            s.mean, s.min, s.max, s.std_dev
        );
    }

    println!("\nEmotions:");
    for (label, count) in &report.emotion_frequencies {
        println!("  {:<17} {}", label.as_str(), count);
    }

    if !report.transitions.is_empty() {
        println!("\nEmotion shifts:");
        for ((from, to), count) in report.transitions.iter().take(5) {
            println!("  {} -> {}: {}", from, to, count);
        }
    }

    if !report.low_sentiment_terms.is_empty() {
        let terms: Vec<String> = report
            .low_sentiment_terms
            .iter()
            .map(|(t, c)| format!("{} ({})", t, c))
            .collect();
        println!("\nOn low days you often mention: {}", terms.join(", "));
    }

    println!(
        "\nSafety: {} none, {} flagged, {} crisis",
        report.safety.none, report.safety.flagged, report.safety.crisis
    );
}

fn first_line(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("");
    if line.chars().count() > max {
        format!("{}...", line.chars().take(max).collect::<String>())
    } else {
        line.to_string()
    }
}
