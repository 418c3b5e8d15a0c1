//! Client-to-server messages.

use crate::packstream::{Dict, PackValue};

/// A message sent from the client to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Initialize the connection. Carries credentials before protocol 5.1.
    Hello { extra: Dict },

    /// Authenticate after HELLO (protocol 5.1+).
    Logon { auth: Dict },

    /// Gracefully close the connection.
    Goodbye,

    /// Abort outstanding work and return the connection to a clean state.
    Reset,

    /// Prepare a query. Results are requested separately with PULL.
    Run {
        query: String,
        parameters: Dict,
        extra: Dict,
    },

    /// Stream results of the last RUN.
    Pull { extra: Dict },
}

impl ClientMessage {
    /// A PULL requesting every remaining record.
    pub fn pull_all() -> Self {
        Self::Pull {
            extra: Dict::from([("n".to_string(), PackValue::Integer(-1))]),
        }
    }

    /// Message name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "HELLO",
            Self::Logon { .. } => "LOGON",
            Self::Goodbye => "GOODBYE",
            Self::Reset => "RESET",
            Self::Run { .. } => "RUN",
            Self::Pull { .. } => "PULL",
        }
    }
}
