//! boltq — pipelined Bolt query sessions for graph databases.
//!
//! A [`Session`] submits Cypher queries over one Bolt connection, matches
//! responses to commands in submission order and streams each result's
//! records lazily. Values decode into a closed model of scalars,
//! containers, nodes, relationships and paths.
//!
//! ```no_run
//! # async fn demo() -> boltq::Result<()> {
//! use boltq::{Map, Session, SessionConfig};
//!
//! let config = SessionConfig::new().basic_auth("neo4j", "secret");
//! let mut session = Session::connect("127.0.0.1:7687".parse().unwrap(), config).await?;
//!
//! let mut result = session.run("MATCH (c:Character) RETURN c", Map::new()).await?;
//! let mut records = result.records(&mut session)?;
//! while let Some(record) = records.next().await? {
//!     let character = record.field("c")?.as_node()?;
//!     println!("{}", character.property("name")?);
//! }
//! session.close().await
//! # }
//! ```
//!
//! # Architecture
//!
//! - **`packstream`** — Binary encoding/decoding of the generic wire tree
//! - **`chunk`** — Message framing (2-byte length-prefixed chunks)
//! - **`message`** — Request/response messages and their serialization
//! - **`connection`** — Handshake, authentication and the `Transport` seam
//! - **`stream`** — Per-command response state machine
//! - **`session`** — Pipelined sessions, results and summaries
//! - **`types`** — Value model: scalars, containers and graph entities

pub mod chunk;
pub mod connection;
pub mod error;
pub mod message;
pub mod packstream;
pub mod session;
pub mod stream;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{AuthToken, BoltConnection, Transport};
pub use error::{BoltError, Result, ServerFailure};
pub use session::{Outcome, QueryResult, RecordStream, ResultSummary, Session, SessionConfig, SessionState};
pub use types::{Map, Node, Path, Record, Relationship, Value};
