//! Leo - self-learning keyword responder
//!
//! Command-line front end: answers questions, edits the knowledge table and
//! moves snapshots in and out of the persisted store.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use leo::{
    config::LeoConfig,
    responder::{Responder, SharedResponder, StatsReport},
    store::{SnapshotStore, StoredSnapshot},
};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "leo")]
#[command(version)]
#[command(about = "Self-learning keyword responder for school subjects")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "LEO_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Snapshot file (overrides storage.data_file)
    #[arg(short, long)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },

    #[command(flatten)]
    Knowledge(KnowledgeCommand),
}

/// Commands that work on the persisted responder
#[derive(Subcommand)]
enum KnowledgeCommand {
    /// Answer a single question
    Ask {
        /// Question text
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Interactive session reading questions from stdin
    Chat,

    /// Add or overwrite a knowledge entry
    Add {
        #[arg(long)]
        category: String,

        #[arg(long)]
        keyword: String,

        #[arg(long)]
        answer: String,
    },

    /// Export the knowledge snapshot as JSON
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import a knowledge snapshot
    Import {
        /// Snapshot JSON file
        file: PathBuf,

        /// Merge into the current table instead of replacing it
        #[arg(long)]
        merge: bool,
    },

    /// Wipe the table, counters and conversation log
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,

        /// Delete the snapshot file so the next start reseeds the bundled table
        #[arg(long)]
        purge: bool,
    },

    /// Show counters and table sizes
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("leo={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        config.storage.data_file = data;
    }

    match cli.command {
        Commands::Config { default } => show_config(if default { None } else { Some(&config) }),
        Commands::Knowledge(command) => run_command(command, &config).await,
    }
}

async fn run_command(command: KnowledgeCommand, config: &LeoConfig) -> Result<()> {
    let store = SnapshotStore::new(
        config.storage.data_file.clone(),
        config.storage.persisted_history,
    );
    let mut responder = open_responder(config, &store).await?;

    match command {
        KnowledgeCommand::Ask { question } => {
            println!("{}", responder.answer(&question.join(" ")));
            store.save_responder(&responder).await?;
        }
        KnowledgeCommand::Chat => {
            run_chat(SharedResponder::new(responder), &store).await?;
        }
        KnowledgeCommand::Add {
            category,
            keyword,
            answer,
        } => {
            responder.add_knowledge(&category, &keyword, &answer)?;
            store.save_responder(&responder).await?;
            println!("Added {} / {}", category.trim(), keyword.trim());
        }
        KnowledgeCommand::Export { output } => {
            let json = responder.export_knowledge().to_json_pretty()?;
            match output {
                Some(path) => {
                    tokio::fs::write(&path, json)
                        .await
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Exported to {}", path.display());
                }
                None => println!("{}", json),
            }
        }
        KnowledgeCommand::Import { file, merge } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            if merge {
                let value = serde_json::from_str(&text)
                    .with_context(|| format!("{} is not valid JSON", file.display()))?;
                let merged = responder.merge_knowledge(&value)?;
                println!("Merged {} entries", merged);
            } else {
                responder.import_knowledge_json(&text)?;
                println!(
                    "Imported {} keywords in {} categories",
                    responder.table().keyword_count(),
                    responder.table().category_count()
                );
            }
            store.save_responder(&responder).await?;
        }
        KnowledgeCommand::Reset { yes, purge } => {
            if !yes {
                bail!("refusing to reset without --yes");
            }
            if purge {
                store.clear().await?;
                println!("Snapshot {} removed", store.path().display());
            } else {
                responder.reset_learning();
                store.save_responder(&responder).await?;
                println!("Knowledge table and counters cleared");
            }
        }
        KnowledgeCommand::Stats { json } => {
            let report = responder.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_stats(&report);
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<LeoConfig> {
    if let Some(path) = path {
        return LeoConfig::load(path).with_context(|| format!("loading {}", path.display()));
    }

    let default_path = dirs_next::config_dir().map(|p| p.join("leo").join("config.toml"));
    match default_path {
        Some(path) if path.exists() => {
            tracing::debug!("Using configuration file {}", path.display());
            LeoConfig::load(&path).with_context(|| format!("loading {}", path.display()))
        }
        _ => Ok(LeoConfig::default()),
    }
}

async fn open_responder(config: &LeoConfig, store: &SnapshotStore) -> Result<Responder> {
    match store.load().await? {
        Some(stored) => {
            let mut responder = Responder::new(config);
            stored.restore_into(&mut responder);
            Ok(responder)
        }
        None => {
            tracing::info!(
                "No snapshot at {}, starting fresh",
                store.path().display()
            );
            Ok(Responder::from_config(config))
        }
    }
}

async fn run_chat(responder: SharedResponder, store: &SnapshotStore) -> Result<()> {
    println!("Leo is listening. Type a question, or 'exit' to quit.");

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        let answer = responder.answer(line).await;
        stdout.write_all(format!("{}\n", answer).as_bytes()).await?;
    }

    let history = store.persisted_history();
    let stored = responder
        .inspect(|r| StoredSnapshot::capture(r, history))
        .await;
    store.save(&stored).await?;
    Ok(())
}

fn print_stats(report: &StatsReport) {
    println!("Requests:           {}", report.total_requests);
    println!("Successful matches: {}", report.successful_matches);
    println!("Accuracy:           {:.1}%", report.accuracy * 100.0);
    println!("Learned phrases:    {}", report.learned_phrases);
    if let Some(at) = report.last_learning {
        println!("Last learning:      {}", at.to_rfc3339());
    }
    println!(
        "Knowledge:          {} keywords in {} categories",
        report.total_keywords, report.categories
    );
    for (category, count) in &report.category_keywords {
        println!("  {:<20} {}", category, count);
    }
    if !report.last_conversation_entries.is_empty() {
        println!();
        println!("Recent conversation:");
        for entry in &report.last_conversation_entries {
            println!("  [{:?}] {}", entry.sender, entry.text);
        }
    }
}

fn show_config(config: Option<&LeoConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
