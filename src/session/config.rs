//! Session configuration.

use std::time::Duration;

use crate::chunk::DEFAULT_MAX_MESSAGE_SIZE;
use crate::connection::AuthToken;
use crate::error::BoltError;
use crate::packstream::{Dict, PackValue};

/// Settings for one session. Built with chained setters:
///
/// ```
/// use std::time::Duration;
/// use boltq::session::SessionConfig;
///
/// let config = SessionConfig::new()
///     .basic_auth("neo4j", "secret")
///     .database("got")
///     .read_timeout(Duration::from_secs(30));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sent in HELLO as `user_agent`.
    pub user_agent: String,
    pub auth: AuthToken,
    /// Target database, sent with every RUN as `db`.
    pub database: Option<String>,
    /// Upper bound for a single server read. `None` waits forever.
    pub read_timeout: Option<Duration>,
    /// Largest reassembled inbound message accepted.
    pub max_message_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("boltq/{}", env!("CARGO_PKG_VERSION")),
            auth: AuthToken::None,
            database: None,
            read_timeout: None,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn auth(mut self, auth: AuthToken) -> Self {
        self.auth = auth;
        self
    }

    pub fn basic_auth(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth(AuthToken::basic(username, password))
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Rejects settings no session could run with.
    pub fn validate(&self) -> Result<(), BoltError> {
        if self.user_agent.trim().is_empty() {
            return Err(BoltError::Config("user agent must not be empty".into()));
        }
        if self.read_timeout == Some(Duration::ZERO) {
            return Err(BoltError::Config("read timeout must be greater than zero".into()));
        }
        if self.max_message_size == 0 {
            return Err(BoltError::Config("max message size must be greater than zero".into()));
        }
        if self.database.as_deref().is_some_and(|db| db.is_empty()) {
            return Err(BoltError::Config("database name must not be empty".into()));
        }
        Ok(())
    }

    /// The RUN `extra` dictionary implied by this config.
    pub(crate) fn run_extra(&self) -> Dict {
        let mut extra = Dict::new();
        if let Some(db) = &self.database {
            extra.insert("db".to_string(), PackValue::from(db.as_str()));
        }
        extra
    }
}
