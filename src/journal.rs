//! Wellness check-ins and diary entries
//!
//! Both collections hold at most one record per calendar day. Saving always
//! targets today: an existing record for today is replaced, older days are
//! never touched.

use crate::db::{self, Database};
use crate::error::{Result, SerenityError};
use crate::logging;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

pub const MOOD_LABELS: [&str; 5] = ["Very Low", "Low", "Neutral", "Good", "Excellent"];
pub const MOOD_EMOJIS: [&str; 5] = ["😔", "😐", "🙂", "😊", "😁"];
pub const DEFAULT_MOOD: u8 = 3;
const MAX_LEVEL: u8 = 4;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct WellnessEntry {
    pub date: NaiveDate,
    pub mood: u8,
    pub sleep_hours: f64,
    pub water_glasses: u32,
    pub stress_level: u8,
    pub exercised: bool,
    pub meditated: bool,
    pub reflection_text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DiaryEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub title: String,
    pub body: String,
    pub mood: u8,
    pub reflection_prompt: String,
    pub reflection_answer: String,
}

impl DiaryEntry {
    /// Blank entry for `date` with a fresh id and a random reflection prompt
    pub fn blank(date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            title: String::new(),
            body: String::new(),
            mood: DEFAULT_MOOD,
            reflection_prompt: crate::catalog::random_reflection_prompt().to_string(),
            reflection_answer: String::new(),
        }
    }
}

pub fn mood_label(mood: u8) -> &'static str {
    MOOD_LABELS.get(mood as usize).copied().unwrap_or("Unknown")
}

pub fn mood_emoji(mood: u8) -> &'static str {
    MOOD_EMOJIS.get(mood as usize).copied().unwrap_or("?")
}

fn validate_level(name: &str, value: u8) -> Result<()> {
    if value > MAX_LEVEL {
        return Err(SerenityError::Validation(format!(
            "{} must be between 0 and {}",
            name, MAX_LEVEL
        )));
    }
    Ok(())
}

pub fn validate_wellness(entry: &WellnessEntry) -> Result<()> {
    validate_level("Mood", entry.mood)?;
    validate_level("Stress level", entry.stress_level)?;
    if !(0.0..=24.0).contains(&entry.sleep_hours) {
        return Err(SerenityError::Validation(
            "Sleep hours must be between 0 and 24".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_diary(entry: &DiaryEntry) -> Result<()> {
    if entry.title.trim().is_empty() {
        return Err(SerenityError::Validation("Please add a title for your entry".to_string()));
    }
    if entry.body.trim().is_empty() {
        return Err(SerenityError::Validation(
            "Please write something in your diary entry".to_string(),
        ));
    }
    validate_level("Mood", entry.mood)
}

/// Another writer saved a more recent version of the same day
fn newer_entry_exists(what: &str, date: NaiveDate) -> SerenityError {
    SerenityError::Validation(format!(
        "A newer {} for {} was saved elsewhere. Reload to see it.",
        what, date
    ))
}

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

pub struct JournalStore {
    db: Arc<Database>,
    today: Clock,
}

impl JournalStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self::with_clock(db, Box::new(|| Local::now().date_naive()))
    }

    /// Use a custom notion of "today" (tests, replays)
    pub fn with_clock(db: Arc<Database>, today: Clock) -> Self {
        Self { db, today }
    }

    pub fn today(&self) -> NaiveDate {
        (self.today)()
    }

    // ============ Wellness ============

    pub fn load_wellness(&self) -> Result<Vec<WellnessEntry>> {
        self.db.get_wellness_entries()
    }

    pub fn wellness_for_today(&self) -> Result<Option<WellnessEntry>> {
        let today = self.today();
        Ok(self.load_wellness()?.into_iter().find(|e| e.date == today))
    }

    /// Save `entry` as today's check-in, replacing any earlier one from today
    pub fn upsert_wellness_for_today(&self, entry: WellnessEntry) -> Result<WellnessEntry> {
        validate_wellness(&entry)?;
        let entry = WellnessEntry {
            date: self.today(),
            ..entry
        };

        if !self.db.upsert_wellness_entry(&entry, &db::write_timestamp())? {
            logging::log_journal(&format!("Wellness write for {} lost to a newer write", entry.date));
            return Err(newer_entry_exists("check-in", entry.date));
        }
        logging::log_journal(&format!(
            "Wellness entry saved for {} (mood: {})",
            entry.date,
            mood_label(entry.mood)
        ));
        Ok(entry)
    }

    // ============ Diary ============

    pub fn load_diary(&self) -> Result<Vec<DiaryEntry>> {
        self.db.get_diary_entries()
    }

    /// Entries for the sidebar, most recent day first
    pub fn diary_newest_first(&self) -> Result<Vec<DiaryEntry>> {
        let mut entries = self.load_diary()?;
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(entries)
    }

    pub fn diary_for_today(&self) -> Result<Option<DiaryEntry>> {
        self.diary_on(self.today())
    }

    pub fn diary_on(&self, date: NaiveDate) -> Result<Option<DiaryEntry>> {
        Ok(self.load_diary()?.into_iter().find(|e| e.date == date))
    }

    /// Today's entry if one exists, otherwise a blank draft for today
    pub fn diary_draft(&self) -> Result<DiaryEntry> {
        Ok(self
            .diary_for_today()?
            .unwrap_or_else(|| DiaryEntry::blank(self.today())))
    }

    pub fn upsert_diary_for_today(&self, entry: DiaryEntry) -> Result<DiaryEntry> {
        validate_diary(&entry)?;
        let entry = DiaryEntry {
            date: self.today(),
            ..entry
        };

        if !self.db.upsert_diary_entry(&entry, &db::write_timestamp())? {
            logging::log_journal(&format!("Diary write for {} lost to a newer write", entry.date));
            return Err(newer_entry_exists("diary entry", entry.date));
        }
        logging::log_journal(&format!("Diary entry saved for {}: {}", entry.date, entry.title));
        Ok(entry)
    }
}
