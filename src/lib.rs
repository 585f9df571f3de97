pub mod catalog;
pub mod config;
pub mod db;
pub mod elevenlabs;
pub mod engine;
pub mod error;
pub mod game;
pub mod journal;
pub mod logging;
pub mod memory_match;
pub mod perplexity;
pub mod recorder;
pub mod session;
pub mod settings;
pub mod speech;
pub mod tips;

use config::AppConfig;
use db::Database;
use elevenlabs::ElevenLabsClient;
use engine::TurnEngine;
use error::{Result, SerenityError};
use journal::JournalStore;
use perplexity::PerplexityClient;
use recorder::{CommandMicrophone, VoiceRecorder};
use session::{HttpIdentityProvider, IdentityProvider, SessionStore, SimulatedIdentityProvider};
use settings::SettingsStore;
use speech::{FileAudioOutput, LocalVoice, SpeechAdapter, SystemVoice};
use std::sync::Arc;
use tips::TipShelf;

// ============ App Initialization ============

/// Everything the front end needs, wired to one database
pub struct App {
    pub config: AppConfig,
    pub settings: Arc<SettingsStore>,
    pub journal: JournalStore,
    pub tips: TipShelf,
    pub session: SessionStore,
    pub engine: TurnEngine,
    pub speech: SpeechAdapter,
    pub recorder: VoiceRecorder,
}

impl App {
    /// Open the store, start logging and restore the previous session
    pub fn init(config: AppConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        if let Err(e) = logging::init_logging(&config.log_dir, config.log_to_console) {
            eprintln!("Failed to initialize logging: {}", e);
        }
        // Keep the last 7 days
        let _ = logging::cleanup_old_logs(&config.log_dir);

        let db = Arc::new(Database::open(&config.db_path())?);
        let settings = Arc::new(SettingsStore::new(db.clone()));

        let llm = PerplexityClient::new(&config.llm_model).map_err(|e| SerenityError::Config(e.to_string()))?;
        let synthesizer = ElevenLabsClient::new().map_err(|e| SerenityError::Config(e.to_string()))?;
        let identity: Arc<dyn IdentityProvider> = match &config.identity_url {
            Some(url) => Arc::new(HttpIdentityProvider::new(url).map_err(|e| SerenityError::Config(e.to_string()))?),
            None => Arc::new(SimulatedIdentityProvider::new(config.auth_latency)),
        };

        let voice = SystemVoice::new();
        let voice: Option<Arc<dyn LocalVoice>> = if voice.is_available() {
            Some(Arc::new(voice))
        } else {
            None
        };

        let session = SessionStore::new(db.clone(), identity);
        match session.restore() {
            Ok(Some(_)) => {}
            Ok(None) => logging::log_session(None, "No saved session"),
            Err(e) => logging::log_error(None, &format!("Could not restore session: {}", e)),
        }

        let app = Self {
            engine: TurnEngine::new(settings.clone(), Arc::new(llm), config.fallback_delay),
            speech: SpeechAdapter::new(
                settings.clone(),
                Arc::new(synthesizer),
                Arc::new(FileAudioOutput::new(&config.data_dir)),
                voice,
            ),
            recorder: VoiceRecorder::new(Arc::new(CommandMicrophone::new())),
            journal: JournalStore::new(db.clone()),
            tips: TipShelf::new(db),
            session,
            settings,
            config,
        };

        logging::log_session(app.session.current().map(|s| s.id).as_deref(), "App initialized");
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn temp_config(name: &str) -> AppConfig {
        let dir = std::env::temp_dir().join(format!("serenity-test-{}-{}", name, uuid::Uuid::new_v4()));
        let mut config = AppConfig::default().with_data_dir(dir);
        config.fallback_delay = Duration::ZERO;
        config.auth_latency = Duration::ZERO;
        config
    }

    #[tokio::test]
    async fn test_session_survives_restart() {
        let config = temp_config("restart");

        let app = App::init(config.clone()).unwrap();
        assert!(app.session.current().is_none());
        let session = app.session.sign_in("sam@example.com", "pw").await.unwrap();
        drop(app);

        let app = App::init(config.clone()).unwrap();
        assert_eq!(app.session.current(), Some(session));
        assert!(config.db_path().exists());

        let _ = std::fs::remove_dir_all(&config.data_dir);
    }

    #[tokio::test]
    async fn test_chat_without_key_uses_static_reply() {
        let config = temp_config("chat");
        let app = App::init(config.clone()).unwrap();

        let reply = app.engine.submit_user_message("hello").await.unwrap();
        assert!(catalog::FALLBACK_RESPONSES.contains(&reply.text.as_str()));

        let _ = std::fs::remove_dir_all(&config.data_dir);
    }
}
