//! Connection layer: the byte transport beneath a session.
//!
//! A [`Session`](crate::session::Session) talks to the server through the
//! [`Transport`] trait. [`BoltConnection`] implements it over any async byte
//! stream (TCP in production, in-memory duplex pipes in tests).

pub mod bolt;
pub mod handshake;

pub use bolt::BoltConnection;

use std::fmt;

use async_trait::async_trait;

use crate::error::BoltError;
use crate::message::{ClientMessage, ServerMessage};
use crate::packstream::{Dict, PackValue};

/// Message-level transport used by a session.
///
/// `send` only queues; nothing reaches the server before `flush`. This lets a
/// session write several pipelined commands in one round trip.
#[async_trait]
pub trait Transport: Send {
    /// Negotiated protocol version as `(major, minor)`.
    fn version(&self) -> (u8, u8);

    /// Queues one message for the server.
    fn send(&mut self, msg: &ClientMessage) -> Result<(), BoltError>;

    /// Writes every queued message.
    async fn flush(&mut self) -> Result<(), BoltError>;

    /// Reads the next server message. Must be cancel-safe.
    async fn recv(&mut self) -> Result<ServerMessage, BoltError>;
}

/// Credentials presented during HELLO/LOGON.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum AuthToken {
    #[default]
    None,
    Basic { username: String, password: String },
}

impl AuthToken {
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
        }
    }

    /// Auth entries as they appear in HELLO (pre-5.1) or LOGON.
    pub(crate) fn to_dict(&self) -> Dict {
        let mut dict = Dict::from([("scheme".to_string(), PackValue::from(self.scheme()))]);
        if let Self::Basic { username, password } = self {
            dict.insert("principal".to_string(), PackValue::from(username.as_str()));
            dict.insert("credentials".to_string(), PackValue::from(password.as_str()));
        }
        dict
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}
