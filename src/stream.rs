//! Response state machine for one outstanding command.
//!
//! ```text
//! Pending ──RECORD──▶ Streaming ──RECORD──▶ Streaming
//!    │                    │
//!    ├──SUCCESS───────────┴──▶ Completed
//!    ├──FAILURE───────────────▶ Failed
//!    └──IGNORED───────────────▶ Ignored
//! ```
//!
//! Only PULL responses may carry records. Any message after a terminal state
//! is a protocol violation.

use std::fmt;

use crate::error::{BoltError, ServerFailure};
use crate::message::ServerMessage;
use crate::packstream::{Dict, PackValue};

/// The command a response stream answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Run,
    Pull,
    Reset,
}

impl CommandKind {
    pub fn yields_records(self) -> bool {
        matches!(self, Self::Pull)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Run => "RUN",
            Self::Pull => "PULL",
            Self::Reset => "RESET",
        })
    }
}

/// Where a response stream is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Command written, nothing read yet.
    Pending,
    /// At least one record read.
    Streaming,
    /// SUCCESS read. Terminal.
    Completed,
    /// FAILURE read. Terminal.
    Failed,
    /// IGNORED read. Terminal.
    Ignored,
}

impl StreamState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Ignored)
    }
}

/// What one accepted message means for the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Record(Vec<PackValue>),
    Completed(Dict),
    Failed(ServerFailure),
    Ignored,
}

/// Tracks the responses to a single command.
#[derive(Debug)]
pub struct ResponseStream {
    kind: CommandKind,
    state: StreamState,
    records: usize,
}

impl ResponseStream {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            state: StreamState::Pending,
            records: 0,
        }
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Number of records accepted so far.
    pub fn records(&self) -> usize {
        self.records
    }

    /// Returns whether `msg` is valid in the current state.
    pub fn accepts(&self, msg: &ServerMessage) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        match msg {
            ServerMessage::Record { .. } => self.kind.yields_records(),
            ServerMessage::Success { .. }
            | ServerMessage::Failure { .. }
            | ServerMessage::Ignored => true,
        }
    }

    /// Consumes the next message for this command and advances the state.
    pub fn accept(&mut self, msg: ServerMessage) -> Result<StreamEvent, BoltError> {
        if !self.accepts(&msg) {
            return Err(BoltError::protocol(format!(
                "{} received for {} response in state {:?}",
                msg.name(),
                self.kind,
                self.state
            )));
        }
        let event = match msg {
            ServerMessage::Record { data } => {
                self.records += 1;
                self.state = StreamState::Streaming;
                StreamEvent::Record(data)
            }
            ServerMessage::Success { metadata } => {
                self.state = StreamState::Completed;
                StreamEvent::Completed(metadata)
            }
            ServerMessage::Failure { metadata } => {
                self.state = StreamState::Failed;
                StreamEvent::Failed(ServerFailure::from_metadata(&metadata))
            }
            ServerMessage::Ignored => {
                self.state = StreamState::Ignored;
                StreamEvent::Ignored
            }
        };
        Ok(event)
    }
}
