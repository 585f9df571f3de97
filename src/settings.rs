//! API key storage for the external collaborators
//!
//! Presence of a key gates the feature: no LLM key means static chat replies,
//! no speech key means the on-device voice.

use crate::db::{Database, Slot};
use crate::error::{Result, SerenityError};
use crate::logging;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretSlot {
    Llm,
    Speech,
}

impl SecretSlot {
    fn slot(&self) -> Slot {
        match self {
            SecretSlot::Llm => Slot::LlmApiKey,
            SecretSlot::Speech => Slot::SpeechApiKey,
        }
    }

    pub fn service_name(&self) -> &'static str {
        match self {
            SecretSlot::Llm => "Perplexity",
            SecretSlot::Speech => "ElevenLabs",
        }
    }
}

pub struct SettingsStore {
    db: Arc<Database>,
}

impl SettingsStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn secret(&self, slot: SecretSlot) -> Result<Option<String>> {
        self.db.read_slot(slot.slot())
    }

    /// True when a key is stored; read failures count as "not configured"
    pub fn has_secret(&self, slot: SecretSlot) -> bool {
        matches!(self.secret(slot), Ok(Some(_)))
    }

    pub fn set_secret(&self, slot: SecretSlot, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Err(SerenityError::Validation(format!(
                "Please enter a valid {} API key",
                slot.service_name()
            )));
        }
        self.db.write_slot(slot.slot(), value)?;
        logging::log_session(None, &format!("{} API key saved", slot.service_name()));
        Ok(())
    }

    pub fn clear_secret(&self, slot: SecretSlot) -> Result<()> {
        self.db.clear_slot(slot.slot())?;
        logging::log_session(None, &format!("{} API key removed", slot.service_name()));
        Ok(())
    }
}
