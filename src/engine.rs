//! Conversational turn engine
//!
//! Owns the chat transcript and the active mini-game. Every user submission
//! goes through `submit_user_message`, which decides in strict priority
//! order:
//! 1. an answer to the active game (if any)
//! 2. a command from the fixed vocabulary
//! 3. the language model (if an API key is configured)
//! 4. a canned fallback reply
//!
//! While a game is active, commands and chat are unreachable: even the text
//! "play trivia" is treated as an answer.

use crate::catalog;
use crate::game::{GameKind, GameSession};
use crate::logging;
use crate::perplexity::{self, LanguageModel};
use crate::settings::{SecretSlot, SettingsStore};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

pub const GREETING: &str =
    "Hello! I'm Serenity, your AI wellness companion. How are you feeling today?";
pub const APOLOGY: &str = "I'm having trouble connecting right now. Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
    System,
}

impl Speaker {
    /// Role name used by chat-completion APIs
    pub fn as_role(&self) -> &'static str {
        match self {
            Speaker::User => "user",
            Speaker::Assistant => "assistant",
            Speaker::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub speaker: Speaker,
}

impl ChatMessage {
    pub fn user(text: &str) -> Self {
        Self {
            text: text.to_string(),
            speaker: Speaker::User,
        }
    }

    pub fn assistant(text: &str) -> Self {
        Self {
            text: text.to_string(),
            speaker: Speaker::Assistant,
        }
    }
}

/// Games solved in this conversation, per game
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub trivia: u32,
    pub word_guess: u32,
    pub riddle: u32,
}

impl Scoreboard {
    pub fn score(&self, kind: GameKind) -> u32 {
        match kind {
            GameKind::Trivia => self.trivia,
            GameKind::WordGuess => self.word_guess,
            GameKind::Riddle => self.riddle,
        }
    }

    fn record_win(&mut self, kind: GameKind) -> u32 {
        let score = match kind {
            GameKind::Trivia => &mut self.trivia,
            GameKind::WordGuess => &mut self.word_guess,
            GameKind::Riddle => &mut self.riddle,
        };
        *score += 1;
        *score
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    pub transcript: Vec<ChatMessage>,
    pub active_game: Option<GameSession>,
    pub scores: Scoreboard,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            transcript: vec![ChatMessage::assistant(GREETING)],
            active_game: None,
            scores: Scoreboard::default(),
        }
    }
}

/// Which branch produced a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Game,
    Command,
    Llm,
    /// The model call failed and the apology was used
    LlmFallback,
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnReply {
    pub text: String,
    pub source: ReplySource,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("Still working on the previous message")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    StartGame(GameKind),
    ListGames,
    HealthTip,
    ReflectionPrompt,
}

/// Exact (trimmed, case-folded) match against the command vocabulary
pub fn parse_command(text: &str) -> Option<Command> {
    match text.trim().to_lowercase().as_str() {
        "play trivia" | "let's play trivia" => Some(Command::StartGame(GameKind::Trivia)),
        "play word guess" | "let's play word guess" => Some(Command::StartGame(GameKind::WordGuess)),
        "play riddles" | "let's play riddles" => Some(Command::StartGame(GameKind::Riddle)),
        "list games" | "what games can we play" => Some(Command::ListGames),
        "health tip" | "give me a health tip" => Some(Command::HealthTip),
        "reflection prompt" => Some(Command::ReflectionPrompt),
        _ => None,
    }
}

/// Clears the busy flag when the turn finishes, however it finishes
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct TurnEngine {
    conversation_id: String,
    state: Mutex<EngineState>,
    busy: AtomicBool,
    settings: Arc<SettingsStore>,
    llm: Arc<dyn LanguageModel>,
    fallback_delay: Duration,
}

impl TurnEngine {
    pub fn new(settings: Arc<SettingsStore>, llm: Arc<dyn LanguageModel>, fallback_delay: Duration) -> Self {
        let conversation_id = Uuid::new_v4().to_string();
        logging::log_chat(Some(&conversation_id), "Conversation started");
        Self {
            conversation_id,
            state: Mutex::new(EngineState::default()),
            busy: AtomicBool::new(false),
            settings,
            llm,
            fallback_delay,
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> EngineState {
        self.lock_state().clone()
    }

    pub fn transcript(&self) -> Vec<ChatMessage> {
        self.lock_state().transcript.clone()
    }

    pub fn active_game(&self) -> Option<GameSession> {
        self.lock_state().active_game.clone()
    }

    pub fn scores(&self) -> Scoreboard {
        self.lock_state().scores
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Drop the active game without answering it
    pub fn abandon_game(&self) -> Option<GameSession> {
        let abandoned = self.lock_state().active_game.take();
        if let Some(ref game) = abandoned {
            logging::log_game(Some(&self.conversation_id), &format!("{} abandoned", game.kind().as_str()));
        }
        abandoned
    }

    /// Process one user turn and return the assistant's reply.
    ///
    /// Empty text and submissions while a turn is in flight are rejected
    /// without touching the transcript.
    pub async fn submit_user_message(&self, text: &str) -> Result<TurnReply, EngineError> {
        if text.trim().is_empty() {
            return Err(EngineError::EmptyMessage);
        }
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::Busy);
        }
        let _guard = BusyGuard(&self.busy);

        // Game answers and commands resolve without suspending
        let (local_reply, history) = {
            let mut state = self.lock_state();
            let reply = match state.active_game.take() {
                Some(game) => Some(self.play_turn(&mut state, game, text)),
                None => parse_command(text).map(|command| self.run_command(&mut state, command)),
            };
            let history = if reply.is_none() {
                state
                    .transcript
                    .iter()
                    .map(|m| perplexity::ChatMessage::new(m.speaker.as_role(), &m.text))
                    .collect()
            } else {
                Vec::new()
            };
            (reply, history)
        };

        let reply = match local_reply {
            Some(reply) => reply,
            None => self.chat_reply(history, text).await,
        };

        let mut state = self.lock_state();
        state.transcript.push(ChatMessage::user(text));
        state.transcript.push(ChatMessage::assistant(&reply.text));
        Ok(reply)
    }

    fn play_turn(&self, state: &mut EngineState, game: GameSession, text: &str) -> TurnReply {
        let kind = game.kind();
        let answer = game.answer(text);
        let mut reply = answer.reply;
        if answer.next.is_none() {
            let score = if answer.solved {
                state.scores.record_win(kind)
            } else {
                state.scores.score(kind)
            };
            reply = format!("{}\n{} score: {}", reply, kind.display_name(), score);
            logging::log_game(
                Some(&self.conversation_id),
                &format!("{} finished (solved: {}, score: {})", kind.as_str(), answer.solved, score),
            );
        }
        state.active_game = answer.next;
        TurnReply {
            text: reply,
            source: ReplySource::Game,
        }
    }

    fn run_command(&self, state: &mut EngineState, command: Command) -> TurnReply {
        let text = match command {
            Command::StartGame(kind) => {
                let (session, intro) = GameSession::start(kind);
                logging::log_game(Some(&self.conversation_id), &format!("{} started", kind.as_str()));
                state.active_game = Some(session);
                intro
            }
            Command::ListGames => catalog::list_games(),
            Command::HealthTip => {
                let tip = catalog::random_health_tip();
                format!("Here's a health tip ({}): {}", tip.category, tip.text)
            }
            Command::ReflectionPrompt => format!(
                "Here's something to reflect on: {}",
                catalog::random_reflection_prompt()
            ),
        };
        TurnReply {
            text,
            source: ReplySource::Command,
        }
    }

    async fn chat_reply(&self, history: Vec<perplexity::ChatMessage>, text: &str) -> TurnReply {
        let api_key = match self.settings.secret(SecretSlot::Llm) {
            Ok(key) => key,
            Err(e) => {
                logging::log_error(Some(&self.conversation_id), &format!("Could not read API key: {}", e));
                None
            }
        };

        match api_key {
            Some(key) => match self.llm.chat_completion(&key, history, text).await {
                Ok(reply) => TurnReply {
                    text: reply,
                    source: ReplySource::Llm,
                },
                Err(e) => {
                    logging::log_error(Some(&self.conversation_id), &format!("LLM request failed: {}", e));
                    TurnReply {
                        text: APOLOGY.to_string(),
                        source: ReplySource::LlmFallback,
                    }
                }
            },
            None => {
                tokio::time::sleep(self.fallback_delay).await;
                logging::log_chat(Some(&self.conversation_id), "No API key, using static reply");
                TurnReply {
                    text: catalog::random_fallback_response().to_string(),
                    source: ReplySource::Static,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use async_trait::async_trait;
    use std::error::Error;
    use tokio::sync::Notify;

    type Call = (Vec<perplexity::ChatMessage>, String);

    /// Replies with a fixed text (or fails) and records what it was sent
    struct ScriptedModel {
        reply: Option<String>,
        calls: Mutex<Vec<Call>>,
    }

    impl ScriptedModel {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn chat_completion(
            &self,
            _api_key: &str,
            history: Vec<perplexity::ChatMessage>,
            user_message: &str,
        ) -> Result<String, Box<dyn Error + Send + Sync>> {
            self.calls.lock().unwrap().push((history, user_message.to_string()));
            self.reply.clone().ok_or_else(|| "connection reset".into())
        }
    }

    /// Blocks until released so a turn stays in flight
    struct GatedModel {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl LanguageModel for GatedModel {
        async fn chat_completion(
            &self,
            _api_key: &str,
            _history: Vec<perplexity::ChatMessage>,
            _user_message: &str,
        ) -> Result<String, Box<dyn Error + Send + Sync>> {
            self.gate.notified().await;
            Ok("Thanks for waiting.".to_string())
        }
    }

    fn settings(with_key: bool) -> Arc<SettingsStore> {
        let store = SettingsStore::new(Arc::new(Database::open_in_memory().unwrap()));
        if with_key {
            store.set_secret(SecretSlot::Llm, "pplx-test").unwrap();
        }
        Arc::new(store)
    }

    fn engine(with_key: bool, model: Arc<dyn LanguageModel>) -> TurnEngine {
        TurnEngine::new(settings(with_key), model, Duration::ZERO)
    }

    #[test]
    fn test_parse_command_is_exact() {
        assert_eq!(parse_command("  Play Trivia "), Some(Command::StartGame(GameKind::Trivia)));
        assert_eq!(parse_command("let's play word guess"), Some(Command::StartGame(GameKind::WordGuess)));
        assert_eq!(parse_command("LET'S PLAY RIDDLES"), Some(Command::StartGame(GameKind::Riddle)));
        assert_eq!(parse_command("what games can we play"), Some(Command::ListGames));
        assert_eq!(parse_command("health tip"), Some(Command::HealthTip));
        assert_eq!(parse_command("play trivia please"), None);
        assert_eq!(parse_command("trivia"), None);
        assert_eq!(parse_command("what games can we play?"), None);
    }

    #[tokio::test]
    async fn test_static_fallback_without_key() {
        let model = ScriptedModel::ok("unused");
        let engine = engine(false, model.clone());

        let reply = engine.submit_user_message("hello").await.unwrap();
        assert_eq!(reply.source, ReplySource::Static);
        assert!(catalog::FALLBACK_RESPONSES.contains(&reply.text.as_str()));
        assert!(model.calls().is_empty());

        let transcript = engine.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[0], ChatMessage::assistant(GREETING));
        assert_eq!(transcript[1], ChatMessage::user("hello"));
        assert_eq!(transcript[2], ChatMessage::assistant(&reply.text));
    }

    #[tokio::test]
    async fn test_empty_message_rejected() {
        let engine = engine(false, ScriptedModel::ok("unused"));
        assert_eq!(engine.submit_user_message("   ").await, Err(EngineError::EmptyMessage));
        assert_eq!(engine.transcript().len(), 1);
    }

    #[tokio::test]
    async fn test_llm_gets_history_and_new_message() {
        let model = ScriptedModel::ok("That sounds like a long day.");
        let engine = engine(true, model.clone());

        let reply = engine.submit_user_message("I'm exhausted").await.unwrap();
        assert_eq!(reply.source, ReplySource::Llm);
        assert_eq!(reply.text, "That sounds like a long day.");

        engine.submit_user_message("work was a lot").await.unwrap();
        let calls = model.calls();
        assert_eq!(calls.len(), 2);

        let (history, user) = &calls[1];
        assert_eq!(user, "work was a lot");
        let roles: Vec<_> = history.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["assistant", "user", "assistant"]);
        assert_eq!(history[1].content, "I'm exhausted");
    }

    #[tokio::test]
    async fn test_llm_failure_maps_to_apology() {
        let engine = engine(true, ScriptedModel::failing());
        let reply = engine.submit_user_message("hello?").await.unwrap();
        assert_eq!(reply.text, APOLOGY);
        assert_eq!(reply.source, ReplySource::LlmFallback);
        assert_eq!(engine.transcript().len(), 3);
    }

    #[tokio::test]
    async fn test_play_trivia_starts_game() {
        let model = ScriptedModel::ok("unused");
        let engine = engine(true, model.clone());

        let reply = engine.submit_user_message("Play Trivia").await.unwrap();
        assert_eq!(reply.source, ReplySource::Command);

        match engine.active_game() {
            Some(GameSession::Trivia { question, options, .. }) => {
                assert!(reply.text.contains(&question));
                for option in &options {
                    assert!(reply.text.contains(option.as_str()));
                }
            }
            other => panic!("expected trivia, got {:?}", other),
        }
        assert!(model.calls().is_empty());
    }

    #[tokio::test]
    async fn test_play_trivia_during_trivia_is_an_answer() {
        let engine = engine(false, ScriptedModel::ok("unused"));
        engine.submit_user_message("play trivia").await.unwrap();
        let correct = match engine.active_game() {
            Some(GameSession::Trivia { correct_answer, .. }) => correct_answer,
            other => panic!("expected trivia, got {:?}", other),
        };

        let reply = engine.submit_user_message("play trivia").await.unwrap();
        assert_eq!(reply.source, ReplySource::Game);
        assert!(reply.text.contains(&correct));
        assert!(!reply.text.starts_with("Let's play trivia"));
        assert!(engine.active_game().is_none());
    }

    #[tokio::test]
    async fn test_chat_unreachable_during_word_guess() {
        let model = ScriptedModel::ok("unused");
        let engine = engine(true, model.clone());
        engine.submit_user_message("play word guess").await.unwrap();

        let reply = engine.submit_user_message("how are you?").await.unwrap();
        assert_eq!(reply.source, ReplySource::Game);
        assert!(matches!(engine.active_game(), Some(GameSession::WordGuess { .. })));

        let reply = engine.submit_user_message("list games").await.unwrap();
        assert_eq!(reply.source, ReplySource::Game);
        assert!(model.calls().is_empty());

        let secret = match engine.active_game() {
            Some(GameSession::WordGuess { secret_word }) => secret_word,
            other => panic!("expected word guess, got {:?}", other),
        };
        let reply = engine.submit_user_message(&secret.to_uppercase()).await.unwrap();
        assert!(reply.text.starts_with("You got it!"));
        assert!(engine.active_game().is_none());

        let reply = engine.submit_user_message("how are you?").await.unwrap();
        assert_eq!(reply.source, ReplySource::Llm);
    }

    #[tokio::test]
    async fn test_trivia_score_counts_correct_answers_only() {
        let engine = engine(false, ScriptedModel::ok("unused"));
        let correct_answer = |engine: &TurnEngine| match engine.active_game() {
            Some(GameSession::Trivia { correct_answer, .. }) => correct_answer,
            other => panic!("expected trivia, got {:?}", other),
        };

        engine.submit_user_message("play trivia").await.unwrap();
        let answer = correct_answer(&engine);
        let reply = engine.submit_user_message(&answer.to_lowercase()).await.unwrap();
        assert!(reply.text.ends_with("Trivia score: 1"));

        engine.submit_user_message("play trivia").await.unwrap();
        let reply = engine.submit_user_message("definitely not it").await.unwrap();
        assert!(reply.text.ends_with("Trivia score: 1"));

        engine.submit_user_message("play trivia").await.unwrap();
        let answer = correct_answer(&engine);
        let reply = engine.submit_user_message(&answer).await.unwrap();
        assert!(reply.text.ends_with("Trivia score: 2"));

        assert_eq!(engine.scores().trivia, 2);
        assert_eq!(engine.scores().score(GameKind::Riddle), 0);
    }

    #[tokio::test]
    async fn test_riddle_hint_keeps_game() {
        let engine = engine(false, ScriptedModel::ok("unused"));
        engine.submit_user_message("let's play riddles").await.unwrap();

        let reply = engine.submit_user_message("hint").await.unwrap();
        assert!(reply.text.starts_with("Hint: "));
        match engine.active_game() {
            Some(GameSession::Riddle { hint_revealed, .. }) => assert!(hint_revealed),
            other => panic!("expected riddle, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_abandon_game() {
        let engine = engine(false, ScriptedModel::ok("unused"));
        engine.submit_user_message("play riddles").await.unwrap();
        assert!(engine.abandon_game().is_some());
        assert!(engine.abandon_game().is_none());

        let reply = engine.submit_user_message("play trivia").await.unwrap();
        assert_eq!(reply.source, ReplySource::Command);
    }

    #[tokio::test]
    async fn test_info_commands() {
        let engine = engine(false, ScriptedModel::ok("unused"));
        let reply = engine.submit_user_message("list games").await.unwrap();
        assert!(reply.text.contains("play trivia"));

        let reply = engine.submit_user_message("health tip").await.unwrap();
        assert!(catalog::HEALTH_TIPS.iter().any(|t| reply.text.contains(t.text)));
        assert!(engine.active_game().is_none());
    }

    #[tokio::test]
    async fn test_overlapping_submission_is_rejected() {
        let gate = Arc::new(Notify::new());
        let engine = Arc::new(engine(true, Arc::new(GatedModel { gate: gate.clone() })));

        let first = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.submit_user_message("hello").await })
        };
        while !engine.is_busy() {
            tokio::task::yield_now().await;
        }

        assert_eq!(engine.submit_user_message("anyone there?").await, Err(EngineError::Busy));
        assert_eq!(engine.transcript().len(), 1);

        gate.notify_one();
        let reply = first.await.unwrap().unwrap();
        assert_eq!(reply.text, "Thanks for waiting.");
        assert!(!engine.is_busy());
        assert_eq!(engine.transcript().len(), 3);
    }
}
