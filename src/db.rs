use crate::error::Result;
use crate::journal::{DiaryEntry, WellnessEntry};
use chrono::{NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Named single-value storage slots. Each holds one serialized value and is
/// overwritten on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    LlmApiKey,
    SpeechApiKey,
    Session,
    SavedHealthTips,
}

impl Slot {
    pub fn key(&self) -> &'static str {
        match self {
            Slot::LlmApiKey => "llm_api_key",
            Slot::SpeechApiKey => "speech_api_key",
            Slot::Session => "session",
            Slot::SavedHealthTips => "saved_health_tips",
        }
    }
}

/// Write timestamp with fixed width so string comparison matches time order
pub fn write_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// SQLite-backed durable store for one user profile
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            "
            -- Single-value slots (secrets, session, saved tips)
            CREATE TABLE IF NOT EXISTS storage_slots (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Daily mood / habit check-ins, one per calendar day
            CREATE TABLE IF NOT EXISTS wellness_entries (
                date TEXT PRIMARY KEY,
                mood INTEGER NOT NULL,
                sleep_hours REAL NOT NULL,
                water_glasses INTEGER NOT NULL,
                stress_level INTEGER NOT NULL,
                exercised INTEGER NOT NULL,
                meditated INTEGER NOT NULL,
                reflection_text TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Diary entries, one per calendar day
            CREATE TABLE IF NOT EXISTS diary_entries (
                date TEXT PRIMARY KEY,
                id TEXT NOT NULL,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                mood INTEGER NOT NULL,
                reflection_prompt TEXT NOT NULL,
                reflection_answer TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(f(&conn)?)
    }

    // ============ Slots ============

    pub fn read_slot(&self, slot: Slot) -> Result<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT value FROM storage_slots WHERE key = ?1",
                params![slot.key()],
                |row| row.get(0),
            )
            .optional()
        })
    }

    pub fn write_slot(&self, slot: Slot, value: &str) -> Result<()> {
        let now = write_timestamp();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO storage_slots (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![slot.key(), value, now],
            )?;
            Ok(())
        })
    }

    pub fn clear_slot(&self, slot: Slot) -> Result<()> {
        self.with_connection(|conn| {
            conn.execute("DELETE FROM storage_slots WHERE key = ?1", params![slot.key()])?;
            Ok(())
        })
    }

    // ============ Wellness ============

    /// Insert or replace the entry for `entry.date`. A write carrying an older
    /// timestamp than the stored row is ignored; returns whether the row changed.
    pub fn upsert_wellness_entry(&self, entry: &WellnessEntry, updated_at: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "INSERT INTO wellness_entries (date, mood, sleep_hours, water_glasses, stress_level, exercised, meditated, reflection_text, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(date) DO UPDATE SET
                    mood = excluded.mood,
                    sleep_hours = excluded.sleep_hours,
                    water_glasses = excluded.water_glasses,
                    stress_level = excluded.stress_level,
                    exercised = excluded.exercised,
                    meditated = excluded.meditated,
                    reflection_text = excluded.reflection_text,
                    updated_at = excluded.updated_at
                 WHERE excluded.updated_at >= wellness_entries.updated_at",
                params![
                    entry.date.format(DATE_FORMAT).to_string(),
                    entry.mood,
                    entry.sleep_hours,
                    entry.water_glasses,
                    entry.stress_level,
                    entry.exercised,
                    entry.meditated,
                    entry.reflection_text,
                    updated_at
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_wellness_entries(&self) -> Result<Vec<WellnessEntry>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT date, mood, sleep_hours, water_glasses, stress_level, exercised, meditated, reflection_text
                 FROM wellness_entries
                 ORDER BY date ASC",
            )?;
            let entries = stmt.query_map([], wellness_from_row)?;
            entries.collect()
        })
    }

    // ============ Diary ============

    /// Same replace-by-date semantics as `upsert_wellness_entry`
    pub fn upsert_diary_entry(&self, entry: &DiaryEntry, updated_at: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let changed = conn.execute(
                "INSERT INTO diary_entries (date, id, title, body, mood, reflection_prompt, reflection_answer, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(date) DO UPDATE SET
                    id = excluded.id,
                    title = excluded.title,
                    body = excluded.body,
                    mood = excluded.mood,
                    reflection_prompt = excluded.reflection_prompt,
                    reflection_answer = excluded.reflection_answer,
                    updated_at = excluded.updated_at
                 WHERE excluded.updated_at >= diary_entries.updated_at",
                params![
                    entry.date.format(DATE_FORMAT).to_string(),
                    entry.id.to_string(),
                    entry.title,
                    entry.body,
                    entry.mood,
                    entry.reflection_prompt,
                    entry.reflection_answer,
                    updated_at
                ],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_diary_entries(&self) -> Result<Vec<DiaryEntry>> {
        self.with_connection(|conn| {
            let mut stmt = conn.prepare(
                "SELECT date, id, title, body, mood, reflection_prompt, reflection_answer
                 FROM diary_entries
                 ORDER BY date ASC",
            )?;
            let entries = stmt.query_map([], diary_from_row)?;
            entries.collect()
        })
    }
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
}

fn parse_date(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn wellness_from_row(row: &Row) -> rusqlite::Result<WellnessEntry> {
    Ok(WellnessEntry {
        date: parse_date(row, 0)?,
        mood: row.get(1)?,
        sleep_hours: row.get(2)?,
        water_glasses: row.get(3)?,
        stress_level: row.get(4)?,
        exercised: row.get(5)?,
        meditated: row.get(6)?,
        reflection_text: row.get(7)?,
    })
}

fn diary_from_row(row: &Row) -> rusqlite::Result<DiaryEntry> {
    let raw_id: String = row.get(1)?;
    Ok(DiaryEntry {
        date: parse_date(row, 0)?,
        id: Uuid::parse_str(&raw_id).map_err(|e| conversion_error(1, e))?,
        title: row.get(2)?,
        body: row.get(3)?,
        mood: row.get(4)?,
        reflection_prompt: row.get(5)?,
        reflection_answer: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wellness(date: NaiveDate, mood: u8) -> WellnessEntry {
        WellnessEntry {
            date,
            mood,
            sleep_hours: 7.5,
            water_glasses: 6,
            stress_level: 1,
            exercised: true,
            meditated: false,
            reflection_text: "Walked by the river".to_string(),
        }
    }

    #[test]
    fn test_slot_roundtrip_and_clear() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.read_slot(Slot::LlmApiKey).unwrap(), None);

        db.write_slot(Slot::LlmApiKey, "pplx-1").unwrap();
        db.write_slot(Slot::LlmApiKey, "pplx-2").unwrap();
        assert_eq!(db.read_slot(Slot::LlmApiKey).unwrap().as_deref(), Some("pplx-2"));
        assert_eq!(db.read_slot(Slot::SpeechApiKey).unwrap(), None);

        db.clear_slot(Slot::LlmApiKey).unwrap();
        assert_eq!(db.read_slot(Slot::LlmApiKey).unwrap(), None);
    }

    #[test]
    fn test_stale_write_is_ignored() {
        let db = Database::open_in_memory().unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

        assert!(db.upsert_wellness_entry(&wellness(day, 2), "2026-03-14T10:00:00.000000Z").unwrap());
        assert!(!db.upsert_wellness_entry(&wellness(day, 4), "2026-03-14T09:00:00.000000Z").unwrap());

        let entries = db.get_wellness_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].mood, 2);
    }

    #[test]
    fn test_wellness_entries_ordered_by_date() {
        let db = Database::open_in_memory().unwrap();
        let later = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
        let earlier = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        db.upsert_wellness_entry(&wellness(later, 3), &write_timestamp()).unwrap();
        db.upsert_wellness_entry(&wellness(earlier, 1), &write_timestamp()).unwrap();

        let dates: Vec<_> = db.get_wellness_entries().unwrap().into_iter().map(|e| e.date).collect();
        assert_eq!(dates, vec![earlier, later]);
    }
}
