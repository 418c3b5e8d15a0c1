//! Server-to-client messages.

use crate::packstream::{Dict, PackValue};

/// A message sent from the server in answer to one client command.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// The command completed. Metadata depends on the command.
    Success { metadata: Dict },

    /// One row of results, still in wire form.
    Record { data: Vec<PackValue> },

    /// The command failed; metadata carries `code` and `message`.
    Failure { metadata: Dict },

    /// The command was skipped because an earlier one failed.
    Ignored,
}

impl ServerMessage {
    /// Message name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Success { .. } => "SUCCESS",
            Self::Record { .. } => "RECORD",
            Self::Failure { .. } => "FAILURE",
            Self::Ignored => "IGNORED",
        }
    }
}
