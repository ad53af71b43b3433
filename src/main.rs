use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;

use recall_core::database::db::{advance_day, delete_card, get_current_date, insert_new_card};
use recall_core::export::{export_json_to_path, import_json_for_user};
use recall_core::models::{
    compute_daily_stats, compute_next_review, compute_retention_rate, forecast, preview_intervals,
    select_due, select_upcoming,
};
use recall_core::{
    Card, CardRepository, Error, ItemId, LapsePolicy, Quality, ReviewSession, SchedulerConfig,
    SqliteCardRepository,
};

#[derive(Parser)]
#[command(name = "recall", about = "Spaced-repetition review scheduler", version)]
struct Cli {
    /// SQLite database holding card state and the current date
    #[arg(long, global = true, env = "RECALL_DB", default_value = "db.sqlite3")]
    db: PathBuf,

    /// Whose cards to work with
    #[arg(long, global = true, default_value = "default")]
    user: String,

    /// TOML scheduler config
    #[arg(long, global = true, env = "RECALL_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured lapse policy
    #[arg(long, global = true)]
    lapse_policy: Option<LapsePolicy>,

    /// Output format
    #[arg(long, global = true, default_value = "plain")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Start learning items (creates fresh cards, skips existing ones)
    Add {
        #[arg(required = true)]
        item_ids: Vec<ItemId>,
    },

    /// Forget an item's schedule
    Remove { item_id: ItemId },

    /// Record a single review
    Review {
        item_id: ItemId,
        /// Recall quality, 0 (blackout) to 5 (perfect)
        #[arg(value_parser = clap::value_parser!(u8).range(0..=5))]
        quality: u8,
    },

    /// Review every due card, reading one quality per line from stdin
    Study,

    /// List cards due now
    Due,

    /// Forecast reviews coming due
    Upcoming {
        #[arg(long, default_value_t = 7)]
        days: u32,
    },

    /// Show the interval each quality would give an item
    Preview { item_id: ItemId },

    /// Daily counts and retention
    Stats,

    /// Move the current date forward
    AdvanceDay {
        #[arg(long, default_value_t = 1)]
        days: u32,
    },

    /// Write all cards of the user to a JSON snapshot
    Export { path: PathBuf },

    /// Load the user's cards from a JSON snapshot, replacing stored state
    Import { path: PathBuf },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => SchedulerConfig::load(path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?,
        None => SchedulerConfig::default(),
    };
    if let Some(policy) = cli.lapse_policy {
        config.lapse_policy = policy;
    }

    let repo = SqliteCardRepository::open(&cli.db, Utc::now())
        .with_context(|| format!("failed to open database '{}'", cli.db.display()))?;

    run(cli, config, repo)
}

fn run(cli: Cli, config: SchedulerConfig, mut repo: SqliteCardRepository) -> Result<()> {
    let now = get_current_date(repo.connection())?;
    let offset = config.day_offset()?;
    let user = cli.user.as_str();

    match cli.command {
        Command::Add { item_ids } => {
            for item_id in item_ids {
                if insert_new_card(&Card::new(user, item_id, now), repo.connection())? {
                    println!("Added item {}", item_id);
                } else {
                    log::warn!("Item {} is already scheduled for '{}'", item_id, user);
                    println!("Item {} already scheduled, skipped", item_id);
                }
            }
        }

        Command::Remove { item_id } => {
            if !delete_card(user, item_id, repo.connection())? {
                return Err(not_found(user, item_id).into());
            }
            println!("Removed item {}", item_id);
        }

        Command::Review { item_id, quality } => {
            let card = repo.load(user, item_id)?.ok_or_else(|| not_found(user, item_id))?;
            let next = compute_next_review(&card, Quality::new(quality)?, now, &config)?;
            repo.save(&next)?;
            print_cards(cli.format, &[next], offset)?;
        }

        Command::Study => study(repo, user, now, config)?,

        Command::Due => {
            let due = select_due(&repo.list(user)?, now);
            print_cards(cli.format, &due, offset)?;
        }

        Command::Upcoming { days } => {
            let cards = repo.list(user)?;
            let per_day = forecast(&cards, now, days, offset);
            match cli.format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "horizon_days": days,
                        "cards": select_upcoming(&cards, now, days),
                        "forecast": per_day,
                    }))?
                ),
                OutputFormat::Plain => {
                    if per_day.is_empty() {
                        println!("Nothing due in the next {} days", days);
                    }
                    for day in per_day {
                        println!("{}  {}", day.date.format("%Y-%m-%d"), day.due);
                    }
                }
            }
        }

        Command::Preview { item_id } => {
            let card = repo.load(user, item_id)?.ok_or_else(|| not_found(user, item_id))?;
            let intervals = preview_intervals(&card, now, &config)?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::to_string(&intervals)?),
                OutputFormat::Plain => {
                    for (quality, days) in Quality::all().zip(intervals) {
                        println!("quality {} -> {}", quality, format_interval(days));
                    }
                }
            }
        }

        Command::Stats => {
            let cards = repo.list(user)?;
            let stats = compute_daily_stats(&cards, now, offset);
            let retention = compute_retention_rate(&cards);
            match cli.format {
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&json!({
                        "date": format_date(now, offset),
                        "stats": stats,
                        "retention_rate": retention,
                    }))?
                ),
                OutputFormat::Plain => {
                    println!("Date:           {}", format_date(now, offset));
                    println!("Due today:      {}", stats.due_today);
                    println!("Reviewed today: {}", stats.reviewed_today);
                    println!("New cards:      {}", stats.new_cards);
                    println!("Total cards:    {}", stats.total_cards);
                    println!("Retention:      {:.1}%", retention);
                }
            }
        }

        Command::AdvanceDay { days } => {
            let date = advance_day(repo.connection(), days)?;
            println!("Current date is now {}", format_date(date, offset));
        }

        Command::Export { path } => {
            let cards = repo.list(user)?;
            export_json_to_path(&cards, now, &path)
                .with_context(|| format!("failed to export to '{}'", path.display()))?;
            println!("Exported {} cards to '{}'", cards.len(), path.display());
        }

        Command::Import { path } => {
            let cards = import_json_for_user(&path, user)
                .with_context(|| format!("failed to import '{}'", path.display()))?;
            for card in &cards {
                repo.save(card)?;
            }
            println!("Imported {} cards from '{}'", cards.len(), path.display());
        }
    }

    Ok(())
}

fn study(
    repo: SqliteCardRepository,
    user: &str,
    now: DateTime<Utc>,
    config: SchedulerConfig,
) -> Result<()> {
    let offset = config.day_offset()?;
    let mut session = ReviewSession::start(repo, user, now, config)?;
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut round = 0;

    while !session.is_completed() {
        if session.round_number() != round {
            round = session.round_number();
            println!("{}", session.phase_message());
        }
        let Some(card) = session.current_card() else {
            break;
        };

        print!("Item {} quality [0-5]: ", card.item_id);
        io::stdout().flush()?;

        let Some(line) = lines.next().transpose()? else {
            println!();
            break;
        };
        let quality = match line.parse::<Quality>() {
            Ok(quality) => quality,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        if let Some(next) = session.grade_current_card(quality)? {
            println!(
                "  next review {} (in {})",
                format_date(next.next_review_date, offset),
                format_interval(next.interval_days)
            );
        }
        session.next_card();
    }

    if session.is_completed() {
        println!("Session complete");
    } else {
        println!("Session stopped, {} cards left this round", session.remaining_count());
    }
    Ok(())
}

fn not_found(user: &str, item_id: ItemId) -> Error {
    Error::CardNotFound {
        user_id: user.to_string(),
        item_id,
    }
}

fn print_cards(format: OutputFormat, cards: &[Card], offset: FixedOffset) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(cards)?),
        OutputFormat::Plain => {
            if cards.is_empty() {
                println!("No cards");
            }
            for card in cards {
                println!(
                    "item {:>6}  due {}  interval {:>5}  reps {:>3}  EF {:.2}",
                    card.item_id,
                    format_date(card.next_review_date, offset),
                    format_interval(card.interval_days),
                    card.repetition_count,
                    card.ease_factor
                );
            }
        }
    }
    Ok(())
}

/// Formats a date as YYYY-MM-DD on the configured local day
fn format_date(date: DateTime<Utc>, offset: FixedOffset) -> String {
    date.with_timezone(&offset).format("%Y-%m-%d").to_string()
}

fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}
