//! Saved health tips

use crate::db::{Database, Slot};
use crate::error::{Result, SerenityError};
use crate::logging;
use std::sync::Arc;

/// Health tips the user has kept, in the order they were saved
pub struct TipShelf {
    db: Arc<Database>,
}

impl TipShelf {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn saved(&self) -> Result<Vec<String>> {
        match self.db.read_slot(Slot::SavedHealthTips)? {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn write(&self, tips: &[String]) -> Result<()> {
        self.db.write_slot(Slot::SavedHealthTips, &serde_json::to_string(tips)?)
    }

    /// Returns false when the tip was already saved
    pub fn save(&self, tip: &str) -> Result<bool> {
        let tip = tip.trim();
        if tip.is_empty() {
            return Err(SerenityError::Validation("Nothing to save".to_string()));
        }
        let mut tips = self.saved()?;
        if tips.iter().any(|t| t == tip) {
            return Ok(false);
        }
        tips.push(tip.to_string());
        self.write(&tips)?;
        logging::log_journal(&format!("Saved health tip ({} total)", tips.len()));
        Ok(true)
    }

    /// Returns false when the tip was not saved
    pub fn remove(&self, tip: &str) -> Result<bool> {
        let mut tips = self.saved()?;
        let before = tips.len();
        tips.retain(|t| t != tip.trim());
        if tips.len() == before {
            return Ok(false);
        }
        self.write(&tips)?;
        logging::log_journal(&format!("Removed health tip ({} left)", tips.len()));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    fn shelf() -> TipShelf {
        TipShelf::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn test_save_deduplicates() {
        let shelf = shelf();
        let tip = catalog::HEALTH_TIPS[0].text;
        assert!(shelf.save(tip).unwrap());
        assert!(!shelf.save(tip).unwrap());
        assert!(shelf.save(catalog::HEALTH_TIPS[1].text).unwrap());
        assert_eq!(
            shelf.saved().unwrap(),
            vec![tip.to_string(), catalog::HEALTH_TIPS[1].text.to_string()]
        );
    }

    #[test]
    fn test_remove() {
        let shelf = shelf();
        shelf.save("Drink a glass of water.").unwrap();
        assert!(!shelf.remove("Stretch.").unwrap());
        assert!(shelf.remove("Drink a glass of water.").unwrap());
        assert!(shelf.saved().unwrap().is_empty());
    }

    #[test]
    fn test_blank_tip_rejected() {
        let shelf = shelf();
        assert!(matches!(shelf.save("  "), Err(SerenityError::Validation(_))));
        assert!(shelf.saved().unwrap().is_empty());
    }

    #[test]
    fn test_stored_as_json_array() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        TipShelf::new(db.clone()).save("Sleep well.").unwrap();
        assert_eq!(
            db.read_slot(Slot::SavedHealthTips).unwrap().as_deref(),
            Some(r#"["Sleep well."]"#)
        );
    }
}
