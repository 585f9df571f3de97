//! Serenity CLI
//!
//! Terminal front end for the wellness companion.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use serenity_lib::catalog::{self, TipCategory};
use serenity_lib::config::AppConfig;
use serenity_lib::error::{Result, SerenityError};
use serenity_lib::journal::{self, DiaryEntry, WellnessEntry, DEFAULT_MOOD};
use serenity_lib::memory_match::{FlipOutcome, MemoryMatch};
use serenity_lib::recorder::RECORDING_LIMIT;
use serenity_lib::settings::SecretSlot;
use serenity_lib::App;

/// How long a mismatched memory pair stays face up
const MISMATCH_DELAY: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "serenity")]
#[command(about = "Serenity, your wellness companion")]
#[command(version)]
struct Cli {
    /// Data directory (database, logs, audio)
    #[arg(long, env = "SERENITY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Echo log lines to stderr
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with Serenity
    Chat {
        /// Read replies aloud
        #[arg(short, long)]
        speak: bool,
    },
    /// Manage API keys
    Key {
        #[arg(value_enum)]
        service: Service,
        /// New key; omit to show whether one is set
        value: Option<String>,
        /// Remove the stored key
        #[arg(long)]
        clear: bool,
    },
    /// Daily wellness check-in
    Wellness {
        #[command(subcommand)]
        action: WellnessAction,
    },
    /// Daily diary
    Diary {
        #[command(subcommand)]
        action: DiaryAction,
    },
    /// Health tips
    Tips {
        #[command(subcommand)]
        action: TipsAction,
    },
    /// Account session
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Play memory match
    Memory,
    /// Record a voice note (stops after 5 seconds or on Enter)
    Record {
        /// Output file
        #[arg(short, long, default_value = "voice-note.wav")]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Service {
    Perplexity,
    Elevenlabs,
}

impl Service {
    fn slot(self) -> SecretSlot {
        match self {
            Service::Perplexity => SecretSlot::Llm,
            Service::Elevenlabs => SecretSlot::Speech,
        }
    }
}

#[derive(Subcommand)]
enum WellnessAction {
    /// Save today's check-in (replaces an earlier one from today)
    Log {
        /// Mood 0 (very low) to 4 (excellent)
        #[arg(short, long, default_value_t = DEFAULT_MOOD)]
        mood: u8,
        /// Hours slept
        #[arg(long, default_value_t = 7.0)]
        sleep: f64,
        /// Glasses of water
        #[arg(long, default_value_t = 0)]
        water: u32,
        /// Stress 0 (none) to 4 (very high)
        #[arg(long, default_value_t = 2)]
        stress: u8,
        #[arg(long)]
        exercised: bool,
        #[arg(long)]
        meditated: bool,
        /// Free-form reflection
        #[arg(short, long, default_value = "")]
        reflection: String,
    },
    /// Show past check-ins
    History,
}

#[derive(Subcommand)]
enum DiaryAction {
    /// Write today's entry (replaces an earlier one from today)
    Write {
        title: String,
        body: String,
        #[arg(short, long, default_value_t = DEFAULT_MOOD)]
        mood: u8,
        /// Answer to today's reflection prompt
        #[arg(short, long, default_value = "")]
        answer: String,
    },
    /// Show today's entry or a fresh draft with a reflection prompt
    Today,
    /// List entries, newest first
    List,
    /// Show the full entry for a past day
    Show {
        /// Day as YYYY-MM-DD
        date: String,
    },
}

#[derive(Subcommand)]
enum TipsAction {
    /// Show a random tip
    Random {
        /// Save it as well
        #[arg(short, long)]
        save: bool,
    },
    /// List all tips, optionally for one category
    List {
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show saved tips
    Saved,
    /// Remove a saved tip
    Remove { tip: String },
}

#[derive(Subcommand)]
enum AuthAction {
    SignIn {
        email: String,
        password: String,
    },
    SignUp {
        email: String,
        password: String,
        name: String,
    },
    SignOut,
    /// Show the current session
    Whoami,
}

type Input = Lines<BufReader<Stdin>>;

async fn prompt(input: &mut Input, label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

fn parse_day(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| SerenityError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", s.trim())))
}

fn print_diary_entry(entry: &DiaryEntry) {
    println!("{} {} {}\n\n{}", entry.date, journal::mood_emoji(entry.mood), entry.title, entry.body);
    println!("\nReflection: {}", entry.reflection_prompt);
    if !entry.reflection_answer.is_empty() {
        println!("{}", entry.reflection_answer);
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len - 3).collect::<String>())
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        if e.is_user_facing() {
            eprintln!("{}", e);
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    config.log_to_console |= cli.verbose;

    let app = App::init(config)?;

    match cli.command {
        Commands::Chat { speak } => chat(&app, speak).await?,

        Commands::Key { service, value, clear } => {
            let slot = service.slot();
            if clear {
                app.settings.clear_secret(slot)?;
                println!("{} API key removed", slot.service_name());
            } else if let Some(value) = value {
                app.settings.set_secret(slot, &value)?;
                println!("{} API key saved", slot.service_name());
            } else if app.settings.has_secret(slot) {
                println!("{} API key is set", slot.service_name());
            } else {
                println!("{} API key is not set", slot.service_name());
            }
        }

        Commands::Wellness { action } => match action {
            WellnessAction::Log {
                mood,
                sleep,
                water,
                stress,
                exercised,
                meditated,
                reflection,
            } => {
                let entry = app.journal.upsert_wellness_for_today(WellnessEntry {
                    date: app.journal.today(),
                    mood,
                    sleep_hours: sleep,
                    water_glasses: water,
                    stress_level: stress,
                    exercised,
                    meditated,
                    reflection_text: reflection,
                })?;
                println!(
                    "Saved check-in for {}: {} {}",
                    entry.date,
                    journal::mood_emoji(entry.mood),
                    journal::mood_label(entry.mood)
                );
            }
            WellnessAction::History => {
                let entries = app.journal.load_wellness()?;
                if entries.is_empty() {
                    println!("No check-ins yet.");
                }
                for e in entries {
                    println!(
                        "{}  {} {:<9}  sleep {:>4.1}h  water {:>2}  stress {}/4{}{}",
                        e.date,
                        journal::mood_emoji(e.mood),
                        journal::mood_label(e.mood),
                        e.sleep_hours,
                        e.water_glasses,
                        e.stress_level,
                        if e.exercised { "  exercised" } else { "" },
                        if e.meditated { "  meditated" } else { "" },
                    );
                }
            }
        },

        Commands::Diary { action } => match action {
            DiaryAction::Write {
                title,
                body,
                mood,
                answer,
            } => {
                let draft = app.journal.diary_draft()?;
                let entry = app.journal.upsert_diary_for_today(DiaryEntry {
                    title,
                    body,
                    mood,
                    reflection_answer: answer,
                    ..draft
                })?;
                println!("Saved diary entry for {}: {}", entry.date, entry.title);
            }
            DiaryAction::Today => {
                let entry = app.journal.diary_draft()?;
                if entry.title.is_empty() {
                    println!("No entry yet for {}.", entry.date);
                    println!("\nReflection: {}", entry.reflection_prompt);
                } else {
                    print_diary_entry(&entry);
                }
            }
            DiaryAction::Show { date } => {
                let date = parse_day(&date)?;
                match app.journal.diary_on(date)? {
                    Some(entry) => print_diary_entry(&entry),
                    None => println!("No diary entry for {}.", date),
                }
            }
            DiaryAction::List => {
                let entries = app.journal.diary_newest_first()?;
                if entries.is_empty() {
                    println!("No diary entries yet.");
                }
                for e in entries {
                    println!("{} {} {}: {}", e.date, journal::mood_emoji(e.mood), e.title, truncate(&e.body, 50));
                }
            }
        },

        Commands::Tips { action } => match action {
            TipsAction::Random { save } => {
                let tip = catalog::random_health_tip();
                println!("[{}] {}", tip.category, tip.text);
                if save && app.tips.save(tip.text)? {
                    println!("Saved.");
                }
            }
            TipsAction::List { category } => {
                let tips = match category {
                    Some(name) => {
                        let category = name.parse::<TipCategory>().map_err(SerenityError::Validation)?;
                        catalog::health_tips_in(category)
                    }
                    None => catalog::all_health_tips().iter().collect(),
                };
                for tip in tips {
                    println!("[{}] {}", tip.category, tip.text);
                }
            }
            TipsAction::Saved => {
                let saved = app.tips.saved()?;
                if saved.is_empty() {
                    println!("No saved tips yet.");
                }
                for tip in saved {
                    println!("- {}", tip);
                }
            }
            TipsAction::Remove { tip } => {
                if app.tips.remove(&tip)? {
                    println!("Removed.");
                } else {
                    println!("That tip wasn't saved.");
                }
            }
        },

        Commands::Auth { action } => match action {
            AuthAction::SignIn { email, password } => {
                let session = app.session.sign_in(&email, &password).await?;
                println!("Signed in as {}", session.email);
            }
            AuthAction::SignUp { email, password, name } => {
                let session = app.session.sign_up(&email, &password, &name).await?;
                println!("Welcome, {}!", session.name.as_deref().unwrap_or(&session.email));
            }
            AuthAction::SignOut => {
                app.session.sign_out()?;
                println!("Signed out");
            }
            AuthAction::Whoami => match app.session.current() {
                Some(session) => println!(
                    "{}{} ({})",
                    session.email,
                    session.name.map(|n| format!(" / {}", n)).unwrap_or_default(),
                    session.id
                ),
                None => println!("Not signed in"),
            },
        },

        Commands::Memory => memory_game().await?,

        Commands::Record { output } => {
            if let Err(e) = app.recorder.start().await {
                println!("{}", e);
                return Ok(());
            }
            println!("Recording... press Enter to stop ({}s max)", RECORDING_LIMIT.as_secs());

            let mut input = BufReader::new(tokio::io::stdin()).lines();
            tokio::select! {
                _ = input.next_line() => {}
                _ = tokio::time::sleep(RECORDING_LIMIT) => println!("Time's up."),
            }

            match app.recorder.stop().await {
                Ok(audio) => {
                    tokio::fs::write(&output, &audio).await?;
                    println!("Saved {} bytes to {}", audio.len(), output.display());
                }
                Err(e) => println!("{}", e),
            }
        }
    }

    Ok(())
}

async fn chat(app: &App, speak: bool) -> Result<()> {
    println!("Type 'quit' to exit, '/end' to stop the current game.\n");
    for message in app.engine.transcript() {
        println!("serenity> {}\n", message.text);
    }

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = prompt(&mut input, "you> ").await? else {
            break;
        };

        match line.as_str() {
            "" => continue,
            "quit" | "exit" => break,
            "/end" => {
                match app.engine.abandon_game() {
                    Some(game) => println!("Stopped {}.\n", game.kind().as_str().replace('_', " ")),
                    None => println!("No game in progress.\n"),
                }
                continue;
            }
            _ => {}
        }

        match app.engine.submit_user_message(&line).await {
            Ok(reply) => {
                println!("serenity> {}\n", reply.text);
                if speak {
                    app.speech.speak(&reply.text).await;
                }
            }
            Err(e) => println!("{}\n", e),
        }
    }

    app.speech.stop();
    Ok(())
}

async fn memory_game() -> Result<()> {
    let mut game = MemoryMatch::new();
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    println!("Find all {} pairs. Type a card number, 'reset' or 'quit'.\n", game.pairs());

    loop {
        println!("{}", game.render());
        println!(
            "{}",
            (0..game.cards().len()).map(|i| format!("{:<2}", i)).collect::<Vec<_>>().join(" ")
        );
        let Some(line) = prompt(&mut input, &format!("moves {} | matches {}> ", game.moves(), game.matches())).await?
        else {
            break;
        };

        match line.as_str() {
            "quit" | "exit" => break,
            "reset" => {
                game.reset();
                continue;
            }
            _ => {}
        }

        let Ok(index) = line.parse::<usize>() else {
            println!("Pick a card number.\n");
            continue;
        };

        match game.flip(index) {
            FlipOutcome::Ignored => println!("Can't flip that one.\n"),
            FlipOutcome::FirstCard => {}
            FlipOutcome::Match => println!("A match!\n"),
            FlipOutcome::Mismatch => {
                println!("{}\nNo match.\n", game.render());
                tokio::time::sleep(MISMATCH_DELAY).await;
                game.settle();
            }
            FlipOutcome::Completed => {
                println!("{}\nCongratulations! You found all pairs in {} moves.", game.render(), game.moves());
                break;
            }
        }
    }
    Ok(())
}
