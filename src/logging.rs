//! Structured logging module for Serenity
//!
//! Writes one file per day to the configured log directory with categories:
//! - CHAT: Turn engine replies and LLM fallbacks
//! - GAME: Mini-game starts and endings
//! - SPEECH: Voice synthesis and recording
//! - JOURNAL: Wellness, diary and saved tip writes
//! - SESSION: Sign in / sign out and settings changes
//! - ERROR: Recovered failures

use chrono::{Local, Utc};
use once_cell::sync::Lazy;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Log categories for structured logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogCategory {
    Chat,
    Game,
    Speech,
    Journal,
    Session,
    Error,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Chat => "CHAT",
            LogCategory::Game => "GAME",
            LogCategory::Speech => "SPEECH",
            LogCategory::Journal => "JOURNAL",
            LogCategory::Session => "SESSION",
            LogCategory::Error => "ERROR",
        }
    }
}

struct LogTarget {
    dir: PathBuf,
    echo: bool,
}

/// Where log lines go; None until `init_logging` runs
static LOG_TARGET: Lazy<Mutex<Option<LogTarget>>> = Lazy::new(|| Mutex::new(None));

fn log_file_path(dir: &Path) -> PathBuf {
    let today = Local::now().format("%Y-%m-%d").to_string();
    dir.join(format!("serenity-{}.log", today))
}

/// Initialize the logging system - creates the log directory if needed
pub fn init_logging(log_dir: &Path, echo: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)?;
    }

    if let Ok(mut target) = LOG_TARGET.lock() {
        *target = Some(LogTarget {
            dir: log_dir.to_path_buf(),
            echo,
        });
    }

    log(LogCategory::Session, None, "Serenity logging initialized");
    Ok(())
}

/// Render a log line; the session id is shortened to 8 characters
pub fn format_line(category: LogCategory, session_id: Option<&str>, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let session_context = session_id
        .map(|id| format!("session={} | ", id.chars().take(8).collect::<String>()))
        .unwrap_or_default();

    format!("[{}] [{}] {}{}\n", timestamp, category.as_str(), session_context, message)
}

/// Log a message with category and optional session context
pub fn log(category: LogCategory, session_id: Option<&str>, message: &str) {
    let log_line = format_line(category, session_id, message);

    let Ok(target) = LOG_TARGET.lock() else {
        return;
    };
    let Some(target) = target.as_ref() else {
        return;
    };

    if target.echo {
        eprint!("{}", log_line);
    }

    if let Ok(mut file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path(&target.dir))
    {
        let _ = file.write_all(log_line.as_bytes());
    }
}

pub fn log_chat(session_id: Option<&str>, message: &str) {
    log(LogCategory::Chat, session_id, message);
}

pub fn log_game(session_id: Option<&str>, message: &str) {
    log(LogCategory::Game, session_id, message);
}

pub fn log_speech(message: &str) {
    log(LogCategory::Speech, None, message);
}

pub fn log_journal(message: &str) {
    log(LogCategory::Journal, None, message);
}

pub fn log_session(session_id: Option<&str>, message: &str) {
    log(LogCategory::Session, session_id, message);
}

/// Log a recovered error
pub fn log_error(session_id: Option<&str>, message: &str) {
    log(LogCategory::Error, session_id, message);
}

/// Clean up old log files (keep last 7 days)
pub fn cleanup_old_logs(log_dir: &Path) -> Result<usize, Box<dyn std::error::Error>> {
    let mut deleted = 0;

    if !log_dir.exists() {
        return Ok(0);
    }

    let cutoff = Utc::now() - chrono::Duration::days(7);

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                let modified_time: chrono::DateTime<Utc> = modified.into();
                if modified_time < cutoff && fs::remove_file(&path).is_ok() {
                    deleted += 1;
                }
            }
        }
    }

    Ok(deleted)
}
