//! study-review: spaced repetition reviews for questions asked while studying.

use anyhow::Context;
use clap::{Parser, Subcommand};
use parking_lot::Mutex;
use review_scheduler::auto_create::auto_create;
use review_scheduler::config::Config;
use review_scheduler::database::SqliteQuestionLog;
use review_scheduler::database::db;
use review_scheduler::database::question_log::log_question;
use review_scheduler::export::json::{CardExport, export_json_to_path, import_cards, import_json};
use review_scheduler::models::review_session::rate_card;
use review_scheduler::models::sm2::preview_intervals;
use review_scheduler::models::{
    NewCard, Quality, QuestionEntry, RatingOutcome, ReviewCard, ReviewSession,
};
use rusqlite::Connection;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "study-review", version, about = "Spaced repetition review scheduler")]
struct Args {
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "STUDY_REVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database path, overrides the config file
    #[arg(long, env = "STUDY_REVIEW_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a card by hand
    Add {
        #[arg(long, env = "STUDY_OWNER")]
        owner: String,
        #[arg(long)]
        topic: String,
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
    },
    /// Record an answered question in the question log
    Ask {
        #[arg(long, env = "STUDY_OWNER")]
        owner: String,
        #[arg(long)]
        topic: String,
        #[arg(long)]
        question: String,
        #[arg(long)]
        answer: String,
    },
    /// Turn recently asked questions into review cards
    AutoCreate {
        #[arg(long, env = "STUDY_OWNER")]
        owner: String,
    },
    /// List cards due now, most overdue first
    Due {
        #[arg(long, env = "STUDY_OWNER")]
        owner: String,
        #[arg(long)]
        json: bool,
    },
    /// List all cards
    List {
        #[arg(long, env = "STUDY_OWNER")]
        owner: String,
    },
    /// Review due cards interactively
    Review {
        #[arg(long, env = "STUDY_OWNER")]
        owner: String,
    },
    /// Rate a single card
    Rate {
        #[arg(long, env = "STUDY_OWNER")]
        owner: String,
        #[arg(long)]
        card: Uuid,
        #[arg(long)]
        quality: String,
    },
    /// Show the interval each rating would give a card
    Preview {
        #[arg(long, env = "STUDY_OWNER")]
        owner: String,
        #[arg(long)]
        card: Uuid,
    },
    /// Export cards to JSON
    Export {
        #[arg(long, env = "STUDY_OWNER")]
        owner: String,
        #[arg(long)]
        path: PathBuf,
    },
    /// Import cards from JSON
    Import {
        #[arg(long, env = "STUDY_OWNER")]
        owner: String,
        #[arg(long)]
        path: PathBuf,
    },
    /// Show the simulated date
    Clock,
    /// Move the simulated date one day forward
    AdvanceDay,
    /// Seed sample questions and cards
    Demo {
        #[arg(long, env = "STUDY_OWNER", default_value = "demo-user")]
        owner: String,
    },
}

/// Reward policy of the points subsystem; the scheduler only reports pass/fail.
fn points_for(outcome: &RatingOutcome) -> u32 {
    if outcome.passed { 10 } else { 5 }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with_writer(io::stderr)
        .init();

    let db_path = args.db.unwrap_or_else(|| config.db_path());
    let conn = db::init_database(&db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;

    match args.command {
        Command::Add { owner, topic, question, answer } => {
            let now = db::current_time(&conn)?;
            let card = db::add_card(&owner, NewCard::new(topic, question, answer), now, &conn)?;
            println!("Card {} due {}", card.id, format_date(&card));
        }
        Command::Ask { owner, topic, question, answer } => {
            let entry = QuestionEntry {
                topic,
                question,
                answer,
                created_at: db::current_time(&conn)?,
            };
            log_question(&owner, &entry, &conn)?;
            println!("Question logged.");
        }
        Command::AutoCreate { owner } => {
            let now = db::current_time(&conn)?;
            let log = SqliteQuestionLog::new(&conn);
            let created = auto_create(&owner, &log, &config.auto_create, now, &conn)?;
            println!("Created {created} new review cards");
        }
        Command::Due { owner, json } => {
            let now = db::current_time(&conn)?;
            let due = db::select_due(&owner, now, &conn)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&due)?);
            } else if due.is_empty() {
                println!("All caught up! No cards due.");
            } else {
                print_cards(&due);
            }
        }
        Command::List { owner } => {
            let cards = db::list_cards(&owner, &conn)?;
            print_cards(&cards);
        }
        Command::Review { owner } => run_review(&owner, conn)?,
        Command::Rate { owner, card, quality } => {
            let quality: Quality = quality.parse()?;
            let now = db::current_time(&conn)?;
            let outcome = rate_card(&owner, card, quality, now, &conn)?;
            println!(
                "{} (+{} points). Next review in {} day(s).",
                if outcome.passed { "Correct" } else { "Needs work" },
                points_for(&outcome),
                outcome.schedule.interval
            );
        }
        Command::Preview { owner, card } => {
            let card = db::get_card(&owner, card, &conn)?;
            let now = db::current_time(&conn)?;
            for (quality, days) in preview_intervals(&card.schedule, now).iter().enumerate() {
                println!("  {quality}: {days} day(s)");
            }
        }
        Command::Export { owner, path } => {
            let export = CardExport {
                cards: db::list_cards(&owner, &conn)?,
                exported_at: db::current_time(&conn)?,
                owner_id: owner,
            };
            export_json_to_path(&export, &path)?;
            println!("Exported {} cards to {}", export.cards.len(), path.display());
        }
        Command::Import { owner, path } => {
            let export = import_json(&path)?;
            let created = import_cards(&owner, export, &conn)?;
            println!("Imported {created} cards");
        }
        Command::Clock => {
            println!(
                "{} (offset {} day(s))",
                db::current_time(&conn)?.format("%Y-%m-%d %H:%M"),
                db::clock_offset_days(&conn)?
            );
        }
        Command::AdvanceDay => {
            let offset = db::advance_day(&conn)?;
            println!("Simulated clock is now {offset} day(s) ahead");
        }
        Command::Demo { owner } => seed_demo(&owner, &conn)?,
    }
    Ok(())
}

fn format_date(card: &ReviewCard) -> String {
    card.schedule.next_review_date.format("%Y-%m-%d").to_string()
}

fn print_cards(cards: &[ReviewCard]) {
    for card in cards {
        println!(
            "{}  [{}] {}  (due {}, interval {}d, reps {}, EF {:.2})",
            card.id,
            card.topic,
            card.question,
            format_date(card),
            card.schedule.interval,
            card.schedule.repetitions,
            card.schedule.ease_factor
        );
    }
}

fn prompt(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    text: &str,
) -> anyhow::Result<Option<String>> {
    print!("{text}");
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?.trim().to_string())),
        None => Ok(None),
    }
}

fn run_review(owner: &str, conn: Connection) -> anyhow::Result<()> {
    let now = db::current_time(&conn)?;
    let conn = Arc::new(Mutex::new(conn));
    let mut session = ReviewSession::start(owner, now, Arc::clone(&conn))?;
    if session.is_completed() {
        println!("All caught up! No cards due.");
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut points = 0;

    while let Some(card) = session.current_card() {
        println!("\n{}  [{}]", session.phase_message(), card.topic);
        println!("Q: {}", card.question);
        match prompt(&mut lines, "Press Enter to reveal (q to quit) ")? {
            Some(input) if input != "q" => {}
            _ => break,
        }
        println!("A: {}", session.reveal()?.answer);

        loop {
            let Some(input) = prompt(&mut lines, "Rate your recall 0-5: ")? else {
                return finish(&session, points);
            };
            let quality = match input.parse::<Quality>() {
                Ok(q) => q,
                Err(e) => {
                    println!("{e}");
                    continue;
                }
            };
            let now = db::current_time(&conn.lock())?;
            match session.rate(quality, now) {
                Ok(outcome) => {
                    points += points_for(&outcome);
                    println!("Next review in {} day(s).", outcome.schedule.interval);
                    break;
                }
                Err(e) if e.is_retryable() => {
                    println!("{e}");
                    return finish(&session, points);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
    finish(&session, points)
}

fn finish(session: &ReviewSession, points: u32) -> anyhow::Result<()> {
    let stats = session.stats();
    println!(
        "\nReviewed {} of {} cards, {} correct ({:.0}%). You earned {points} points!",
        stats.rated,
        session.total_count(),
        stats.correct,
        stats.accuracy() * 100.0
    );
    Ok(())
}

fn seed_demo(owner: &str, conn: &Connection) -> anyhow::Result<()> {
    let now = db::current_time(conn)?;
    let samples = [
        (
            "Physics",
            "What is Newton's second law of motion?",
            "The force acting on an object equals its mass times its acceleration (F = ma).",
        ),
        (
            "Mathematics",
            "How do you calculate the derivative of x²?",
            "The derivative of x² is 2x, by the power rule.",
        ),
        (
            "Biology",
            "What is photosynthesis?",
            "Plants converting sunlight, carbon dioxide, and water into glucose and oxygen.",
        ),
    ];
    for (topic, question, answer) in samples {
        let entry = QuestionEntry {
            topic: topic.to_string(),
            question: question.to_string(),
            answer: answer.to_string(),
            created_at: now,
        };
        log_question(owner, &entry, conn)?;
    }

    let [physics_entry, maths_entry, _] = samples;
    let mut physics = ReviewCard::new(
        owner,
        NewCard::new(physics_entry.0, physics_entry.1, physics_entry.2),
        now,
    );
    physics.schedule.next_review_date = now;
    let mut maths = ReviewCard::new(
        owner,
        NewCard::new(maths_entry.0, maths_entry.1, maths_entry.2),
        now,
    );
    maths.schedule.interval = 3;
    maths.schedule.repetitions = 1;
    maths.schedule.ease_factor = 2.6;
    maths.schedule.next_review_date = now + chrono::Duration::days(2);
    let created = [physics, maths]
        .iter()
        .map(|card| db::insert_card(card, conn))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|written| *written)
        .count();

    println!("Demo data created for '{owner}': 3 questions logged, {created} cards added.");
    Ok(())
}
