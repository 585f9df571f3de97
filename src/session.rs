//! Local account session
//!
//! Identity comes from an `IdentityProvider`. The built-in simulated provider
//! accepts any credentials after a short delay; `HttpIdentityProvider` talks
//! to a real auth service. The signed-in session is persisted in the
//! `session` slot and restored on the next start.

use crate::db::{Database, Slot};
use crate::error::{Result, SerenityError};
use crate::logging;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

const SIGN_IN_FAILED: &str = "Login failed. Please try again.";
const SIGN_UP_FAILED: &str = "Sign up failed. Please try again.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> std::result::Result<Session, Box<dyn Error + Send + Sync>>;
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> std::result::Result<Session, Box<dyn Error + Send + Sync>>;
}

// ============ Simulated provider ============

/// Accepts any credentials and mints a fresh id after `latency`
pub struct SimulatedIdentityProvider {
    latency: Duration,
}

impl SimulatedIdentityProvider {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait]
impl IdentityProvider for SimulatedIdentityProvider {
    async fn sign_in(&self, email: &str, _password: &str) -> std::result::Result<Session, Box<dyn Error + Send + Sync>> {
        tokio::time::sleep(self.latency).await;
        Ok(Session {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: None,
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        name: &str,
    ) -> std::result::Result<Session, Box<dyn Error + Send + Sync>> {
        tokio::time::sleep(self.latency).await;
        Ok(Session {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            name: Some(name.to_string()),
        })
    }
}

// ============ Remote provider ============

#[derive(Debug, Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

/// POSTs credentials as JSON to `{base}/auth/sign-in` and `{base}/auth/sign-up`
/// and expects a `Session` back
pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: &str) -> std::result::Result<Self, Box<dyn Error + Send + Sync>> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: &Credentials<'_>) -> std::result::Result<Session, Box<dyn Error + Send + Sync>> {
        let response = self.client.post(self.endpoint(path)).json(body).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("Identity API error ({}): {}", status, error_text).into());
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> std::result::Result<Session, Box<dyn Error + Send + Sync>> {
        let body = Credentials {
            email,
            password,
            name: None,
        };
        self.post("sign-in", &body).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> std::result::Result<Session, Box<dyn Error + Send + Sync>> {
        let body = Credentials {
            email,
            password,
            name: Some(name),
        };
        self.post("sign-up", &body).await
    }
}

// ============ Session store ============

pub struct SessionStore {
    db: Arc<Database>,
    provider: Arc<dyn IdentityProvider>,
    current: Mutex<Option<Session>>,
}

fn require(value: &str, message: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SerenityError::Validation(message.to_string()));
    }
    Ok(())
}

impl SessionStore {
    pub fn new(db: Arc<Database>, provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            db,
            provider,
            current: Mutex::new(None),
        }
    }

    fn current_slot(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current(&self) -> Option<Session> {
        self.current_slot().clone()
    }

    /// Load the session saved by a previous run. A corrupt record is
    /// discarded rather than treated as an error.
    pub fn restore(&self) -> Result<Option<Session>> {
        let restored = match self.db.read_slot(Slot::Session)? {
            Some(json) => match serde_json::from_str::<Session>(&json) {
                Ok(session) => Some(session),
                Err(e) => {
                    logging::log_error(None, &format!("Discarding unreadable session: {}", e));
                    self.db.clear_slot(Slot::Session)?;
                    None
                }
            },
            None => None,
        };
        if let Some(ref session) = restored {
            logging::log_session(Some(&session.id), "Session restored");
        }
        *self.current_slot() = restored.clone();
        Ok(restored)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
        require(email, "Please enter your email")?;
        require(password, "Please enter your password")?;

        let session = match self.provider.sign_in(email.trim(), password).await {
            Ok(session) => session,
            Err(e) => {
                logging::log_error(None, &format!("Sign in error: {}", e));
                return Err(SerenityError::Auth(SIGN_IN_FAILED.to_string()));
            }
        };
        self.persist(session, SIGN_IN_FAILED)
    }

    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> Result<Session> {
        require(name, "Please enter your name")?;
        require(email, "Please enter your email")?;
        require(password, "Please enter your password")?;

        let session = match self.provider.sign_up(email.trim(), password, name.trim()).await {
            Ok(session) => session,
            Err(e) => {
                logging::log_error(None, &format!("Sign up error: {}", e));
                return Err(SerenityError::Auth(SIGN_UP_FAILED.to_string()));
            }
        };
        self.persist(session, SIGN_UP_FAILED)
    }

    fn persist(&self, session: Session, failure: &str) -> Result<Session> {
        let stored = serde_json::to_string(&session)
            .map_err(SerenityError::from)
            .and_then(|json| self.db.write_slot(Slot::Session, &json));
        if let Err(e) = stored {
            logging::log_error(Some(&session.id), &format!("Could not store session: {}", e));
            return Err(SerenityError::Auth(failure.to_string()));
        }

        logging::log_session(Some(&session.id), &format!("Signed in as {}", session.email));
        *self.current_slot() = Some(session.clone());
        Ok(session)
    }

    pub fn sign_out(&self) -> Result<()> {
        self.db.clear_slot(Slot::Session)?;
        if let Some(session) = self.current_slot().take() {
            logging::log_session(Some(&session.id), "Signed out");
        }
        Ok(())
    }
}
