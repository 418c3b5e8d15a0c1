//! Query sessions: pipelined command submission over one connection.
//!
//! A [`Session`] owns a [`Transport`] and the queue of commands written to it
//! (or waiting to be written). Each [`run`](Session::run) queues a RUN and
//! its PULL; responses are matched to commands strictly in submission order.
//!
//! Commands are written in order, with one restriction: a PULL is written
//! only after its RUN has been acknowledged, and everything submitted later
//! waits behind it. A failed RUN is therefore never followed by its PULL.

mod config;
mod result;
mod summary;

pub use config::SessionConfig;
pub use result::{Outcome, QueryResult, RecordStream};
pub use summary::{Counters, ResultSummary};

use std::collections::VecDeque;
use std::net::SocketAddr;

use tokio::net::TcpStream;
use uuid::Uuid;

use crate::connection::handshake::MIN_MAJOR;
use crate::connection::{BoltConnection, Transport};
use crate::error::BoltError;
use crate::message::{ClientMessage, ServerMessage};
use crate::stream::{CommandKind, ResponseStream, StreamEvent};
use crate::types::{map_to_wire, Map, Record};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting queries.
    Ready,
    /// A command failed; nothing new runs until [`Session::reset`].
    Failed,
    /// The connection is unusable.
    Defunct,
}

/// A command in submission order.
struct Command {
    query: u64,
    /// Held until written.
    message: Option<ClientMessage>,
    stream: ResponseStream,
    /// Written, but its result was given up on; only a reset drains it.
    abandoned: bool,
}

impl Command {
    fn new(query: u64, kind: CommandKind, message: ClientMessage) -> Self {
        Self {
            query,
            message: Some(message),
            stream: ResponseStream::new(kind),
            abandoned: false,
        }
    }

    fn written(&self) -> bool {
        self.message.is_none()
    }
}

/// What reading one response did for a result.
enum Step {
    Record(Record),
    Acknowledged,
    Done,
}

/// A query session over one connection.
///
/// Not internally synchronized: all calls take `&mut self`.
pub struct Session<T> {
    transport: T,
    config: SessionConfig,
    id: Uuid,
    state: SessionState,
    /// Bumped by every reset; results from an older generation are void.
    generation: u64,
    next_query: u64,
    /// Written commands form a prefix of the queue.
    queue: VecDeque<Command>,
    /// Query whose `run` call has not returned yet. Still set on entry to a
    /// later call only if that `run` future was dropped.
    in_flight: Option<u64>,
    /// Messages handed to the transport since the last completed flush.
    unflushed: bool,
}

impl Session<BoltConnection<TcpStream>> {
    /// Connects over TCP, negotiates a protocol version and authenticates.
    pub async fn connect(addr: SocketAddr, config: SessionConfig) -> Result<Self, BoltError> {
        config.validate()?;
        let mut conn = BoltConnection::connect(addr, config.max_message_size).await?;
        conn.hello(&config.user_agent, &config.auth).await?;
        Self::new(conn, config)
    }
}

impl<T: Transport> Session<T> {
    /// Wraps an initialized transport.
    pub fn new(transport: T, config: SessionConfig) -> Result<Self, BoltError> {
        config.validate()?;
        let (major, minor) = transport.version();
        if major < MIN_MAJOR {
            return Err(BoltError::protocol(format!(
                "protocol {major}.{minor} is not supported"
            )));
        }
        let id = Uuid::new_v4();
        tracing::info!(session_id = %id, major, minor, "session opened");
        Ok(Self {
            transport,
            config,
            id,
            state: SessionState::Ready,
            generation: 0,
            next_query: 0,
            queue: VecDeque::new(),
            in_flight: None,
            unflushed: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn version(&self) -> (u8, u8) {
        self.transport.version()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Commands submitted but not yet answered.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Submits a query.
    ///
    /// With nothing else outstanding the RUN acknowledgement is read before
    /// returning, so a RUN failure is reported here. Behind undrained results
    /// it is read when this result is reached.
    ///
    /// If an earlier `run` future was dropped before returning, the session
    /// is reset first.
    pub async fn run(&mut self, query: &str, parameters: Map) -> Result<QueryResult, BoltError> {
        if self.recover_cancelled() {
            self.reset().await?;
        }
        self.check_usable()?;
        if self.state == SessionState::Failed {
            return Err(BoltError::misuse(
                "an earlier command failed; reset the session before running queries",
            ));
        }

        self.next_query += 1;
        let id = self.next_query;
        let run = ClientMessage::Run {
            query: query.to_string(),
            parameters: map_to_wire(&parameters),
            extra: self.config.run_extra(),
        };
        self.queue.push_back(Command::new(id, CommandKind::Run, run));
        self.queue
            .push_back(Command::new(id, CommandKind::Pull, ClientMessage::pull_all()));
        tracing::debug!(session_id = %self.id, query_id = id, "query submitted");

        let mut result = QueryResult::new(id, self.id, self.generation);
        self.in_flight = Some(id);
        let submitted = self.submit(&mut result).await;
        self.in_flight = None;
        submitted.map(|()| result)
    }

    async fn submit(&mut self, result: &mut QueryResult) -> Result<(), BoltError> {
        self.pump().await?;
        if self.queue.front().map(|c| c.query) == Some(result.id) {
            self.advance(result).await?;
        }
        Ok(())
    }

    /// Returns the session to a clean state.
    ///
    /// Unwritten commands are dropped, every written command's responses are
    /// drained, and every unfinished result obtained before the reset
    /// resolves as [`Outcome::Ignored`]. Safe to call repeatedly.
    pub async fn reset(&mut self) -> Result<(), BoltError> {
        self.recover_cancelled();
        self.check_usable()?;

        let before = self.queue.len();
        self.queue.retain(Command::written);
        let dropped = before - self.queue.len();

        if let Err(e) = self.transport.send(&ClientMessage::Reset) {
            return Err(self.defunct(e));
        }
        self.unflushed = true;
        self.queue.push_back(Command {
            query: 0,
            message: None,
            stream: ResponseStream::new(CommandKind::Reset),
            abandoned: false,
        });
        self.flush().await?;
        tracing::debug!(
            session_id = %self.id,
            outstanding = self.queue.len() - 1,
            dropped,
            "reset sent"
        );

        while !self.queue.is_empty() {
            let msg = match self.receive().await {
                Ok(msg) => msg,
                Err(BoltError::Timeout(limit)) => {
                    self.state = SessionState::Failed;
                    for command in &mut self.queue {
                        command.abandoned = true;
                    }
                    return Err(BoltError::Timeout(limit));
                }
                Err(e) => return Err(e),
            };
            let Some(command) = self.queue.front_mut() else {
                break;
            };
            let kind = command.stream.kind();
            match command.stream.accept(msg) {
                Ok(StreamEvent::Record(_)) => {}
                Ok(StreamEvent::Failed(failure)) if kind == CommandKind::Reset => {
                    return Err(self.defunct(BoltError::protocol(format!(
                        "RESET failed: {failure}"
                    ))));
                }
                Ok(_) => {
                    self.queue.pop_front();
                }
                Err(e) => return Err(self.defunct(e)),
            }
        }

        self.generation += 1;
        self.state = SessionState::Ready;
        tracing::debug!(session_id = %self.id, generation = self.generation, "session reset");
        Ok(())
    }

    /// Says GOODBYE and releases the connection.
    ///
    /// Dropping a session also releases it, without the GOODBYE.
    pub async fn close(mut self) -> Result<(), BoltError> {
        if self.state != SessionState::Defunct {
            self.transport.send(&ClientMessage::Goodbye)?;
            self.transport.flush().await?;
        }
        tracing::info!(session_id = %self.id, "session closed");
        Ok(())
    }

    /// Reads until `result` yields a record or ends.
    pub(crate) async fn next_record(
        &mut self,
        result: &mut QueryResult,
    ) -> Result<Option<Record>, BoltError> {
        loop {
            match self.advance(result).await? {
                Step::Record(record) => return Ok(Some(record)),
                Step::Acknowledged => {}
                Step::Done => return Ok(None),
            }
        }
    }

    /// Reads one response for `result`.
    async fn advance(&mut self, result: &mut QueryResult) -> Result<Step, BoltError> {
        if result.is_finished() {
            return Ok(Step::Done);
        }
        if result.session != self.id {
            return Err(BoltError::misuse(format!(
                "query #{} belongs to another session",
                result.id
            )));
        }
        if result.generation != self.generation {
            result.finish(Outcome::Ignored);
            return Err(BoltError::Ignored);
        }
        self.recover_cancelled();
        self.check_usable()?;

        let Some(position) = self.queue.iter().position(|c| !c.abandoned) else {
            return Err(BoltError::misuse(format!(
                "query #{} has no outstanding commands",
                result.id
            )));
        };
        let head = &self.queue[position];
        if head.query != result.id {
            return Err(BoltError::misuse(format!(
                "query #{} must be drained before query #{}",
                head.query, result.id
            )));
        }

        if self.state == SessionState::Failed && (position > 0 || !head.written()) {
            // Nothing to read for this query: it never reached the server,
            // or an abandoned response is still in the way.
            self.discard(result.id);
            result.finish(Outcome::Ignored);
            tracing::debug!(session_id = %self.id, query_id = result.id, "query skipped");
            return Err(BoltError::Ignored);
        }
        if !head.written() {
            self.pump().await?;
        }

        let msg = match self.receive().await {
            Ok(msg) => msg,
            Err(BoltError::Timeout(limit)) => {
                self.state = SessionState::Failed;
                self.discard(result.id);
                result.finish(Outcome::Interrupted(limit));
                return Err(BoltError::Timeout(limit));
            }
            Err(e) => return Err(e),
        };

        let Some(command) = self.queue.front_mut() else {
            return Err(self.defunct(BoltError::protocol(
                "response without an outstanding command",
            )));
        };
        let kind = command.stream.kind();
        let event = match command.stream.accept(msg) {
            Ok(event) => event,
            Err(e) => return Err(self.defunct(e)),
        };

        match event {
            StreamEvent::Record(data) => {
                let keys = result.record_keys();
                if data.len() != keys.len() {
                    return Err(self.defunct(BoltError::protocol(format!(
                        "record has {} fields for {} columns",
                        data.len(),
                        keys.len()
                    ))));
                }
                result.records_seen += 1;
                tracing::trace!(session_id = %self.id, query_id = result.id, "record");
                Ok(Step::Record(Record::decode(keys, &data)))
            }
            StreamEvent::Completed(metadata) => {
                self.queue.pop_front();
                if kind == CommandKind::Run {
                    if let Err(e) = result.acknowledge(metadata) {
                        return Err(self.defunct(e));
                    }
                    self.pump().await?;
                    return Ok(Step::Acknowledged);
                }
                result.complete(metadata);
                tracing::debug!(
                    session_id = %self.id,
                    query_id = result.id,
                    records = result.records_seen,
                    "query completed"
                );
                Ok(Step::Done)
            }
            StreamEvent::Failed(failure) => {
                self.queue.pop_front();
                self.discard(result.id);
                self.state = SessionState::Failed;
                tracing::debug!(
                    session_id = %self.id,
                    query_id = result.id,
                    code = %failure.code,
                    "query failed"
                );
                result.finish(Outcome::Failed(failure.clone()));
                Err(BoltError::QueryFailure(failure))
            }
            StreamEvent::Ignored => {
                self.queue.pop_front();
                self.discard(result.id);
                result.finish(Outcome::Ignored);
                tracing::debug!(session_id = %self.id, query_id = result.id, "query ignored");
                Err(BoltError::Ignored)
            }
        }
    }

    /// Writes every command that may go out now, then flushes.
    async fn pump(&mut self) -> Result<(), BoltError> {
        if self.state != SessionState::Ready {
            return Ok(());
        }
        let mut wrote = false;
        for index in 0..self.queue.len() {
            let command = &mut self.queue[index];
            if command.written() {
                continue;
            }
            // A PULL waits for its RUN to be acknowledged, which leaves it
            // at the front.
            if command.stream.kind() == CommandKind::Pull && index > 0 {
                break;
            }
            let query = command.query;
            let Some(msg) = command.message.take() else {
                continue;
            };
            if let Err(e) = self.transport.send(&msg) {
                return Err(self.defunct(e));
            }
            self.unflushed = true;
            tracing::debug!(session_id = %self.id, query_id = query, command = msg.name(), "command written");
            wrote = true;
        }
        if wrote {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), BoltError> {
        match self.transport.flush().await {
            Ok(()) => {
                self.unflushed = false;
                Ok(())
            }
            Err(e) => Err(self.defunct(e)),
        }
    }

    async fn receive(&mut self) -> Result<ServerMessage, BoltError> {
        // A flush cut short by a dropped future leaves commands queued.
        if self.unflushed {
            self.flush().await?;
        }
        let received = match self.config.read_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.transport.recv()).await {
                Ok(received) => received,
                Err(_) => {
                    tracing::warn!(session_id = %self.id, ?limit, "read timed out");
                    return Err(BoltError::Timeout(limit));
                }
            },
            None => self.transport.recv().await,
        };
        received.map_err(|e| self.defunct(e))
    }

    /// Drops the unwritten commands of `query` and abandons the written ones.
    fn discard(&mut self, query: u64) {
        self.queue.retain_mut(|c| {
            if c.query != query {
                return true;
            }
            c.abandoned = true;
            c.written()
        });
    }

    /// Gives up on the query of a `run` call whose future was dropped.
    /// Returns whether there was one; the session is then `Failed` (unless
    /// already defunct) and needs a reset.
    fn recover_cancelled(&mut self) -> bool {
        let Some(query) = self.in_flight.take() else {
            return false;
        };
        tracing::warn!(session_id = %self.id, query_id = query, "run cancelled before returning");
        self.discard(query);
        if self.state == SessionState::Ready {
            self.state = SessionState::Failed;
        }
        true
    }

    fn check_usable(&self) -> Result<(), BoltError> {
        if self.state == SessionState::Defunct {
            return Err(BoltError::protocol("session is defunct"));
        }
        Ok(())
    }

    fn defunct(&mut self, err: BoltError) -> BoltError {
        tracing::warn!(session_id = %self.id, error = %err, "session defunct");
        self.state = SessionState::Defunct;
        err
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::chunk::DEFAULT_MAX_MESSAGE_SIZE;
    use crate::connection::AuthToken;
    use crate::packstream::{PackStruct, PackValue};
    use crate::testing::{failure, fields, record, success, Peer, ScriptedTransport, Step};
    use crate::types::{tag, Value};

    const SYNTAX_ERROR: &str = "Neo.ClientError.Statement.SyntaxError";

    fn session(transport: ScriptedTransport) -> Session<ScriptedTransport> {
        Session::new(transport, SessionConfig::default()).unwrap()
    }

    fn done() -> ServerMessage {
        success(&[("type", PackValue::from("r")), ("t_last", PackValue::Integer(2))])
    }

    #[tokio::test]
    async fn count_query_yields_one_integer() {
        let mut s = session(ScriptedTransport::new([
            fields(&["count"]),
            record(vec![PackValue::Integer(42)]),
            done(),
        ]));

        let mut result = s.run("MATCH (n) RETURN count(n) AS count", Map::new()).await.unwrap();
        assert_eq!(result.fields(), Some(&["count".to_string()][..]));

        let row = result.single(&mut s).await.unwrap();
        assert_eq!(row.field("count").unwrap().as_integer().unwrap(), 42);
        assert_eq!(result.summary().unwrap().query_type.as_deref(), Some("r"));
        assert_eq!(s.transport().written_names(), ["RUN", "PULL"]);
        assert_eq!(s.pending(), 0);
    }

    #[tokio::test]
    async fn records_are_single_pass() {
        let mut s = session(ScriptedTransport::new([
            fields(&["name"]),
            record(vec![PackValue::from("Jon")]),
            record(vec![PackValue::from("Arya")]),
            record(vec![PackValue::from("Sansa")]),
            done(),
        ]));

        let mut result = s.run("MATCH (c:Character) RETURN c.name AS name", Map::new()).await.unwrap();
        assert!(matches!(
            result.summary(),
            Err(BoltError::ProtocolViolation(_))
        ));

        let mut names = Vec::new();
        let mut records = result.records(&mut s).unwrap();
        while let Some(row) = records.next().await.unwrap() {
            names.push(row.get(0).unwrap().as_str().unwrap().to_string());
        }
        assert!(records.next().await.unwrap().is_none());
        drop(records);

        assert_eq!(names, ["Jon", "Arya", "Sansa"]);
        assert_eq!(result.records_seen(), 3);
        assert!(matches!(result.records(&mut s), Err(BoltError::AlreadyConsumed)));
        assert!(matches!(result.outcome(), Some(Outcome::Completed(_))));
    }

    #[tokio::test]
    async fn empty_result_is_not_a_failure() {
        let mut s = session(ScriptedTransport::new([fields(&["n"]), done()]));
        let mut result = s.run("MATCH (n:Dragon) RETURN n", Map::new()).await.unwrap();

        let records = result.records(&mut s).unwrap().try_collect().await.unwrap();
        assert!(records.is_empty());
        assert!(result.summary().is_ok());

        let mut again = session(ScriptedTransport::new([fields(&["n"]), done()]));
        let mut result = again.run("MATCH (n:Dragon) RETURN n", Map::new()).await.unwrap();
        assert!(matches!(result.single(&mut again).await, Err(BoltError::NotFound(_))));
    }

    #[tokio::test]
    async fn run_carries_parameters_and_database() {
        let config = SessionConfig::new().database("got");
        let mut s = Session::new(ScriptedTransport::new([fields(&[]), done()]), config).unwrap();
        let params = Map::from([("name".to_string(), Value::from("Arya"))]);
        let mut result = s.run("MATCH (c {name: $name}) RETURN c", params).await.unwrap();
        result.consume(&mut s).await.unwrap();

        let ClientMessage::Run { query, parameters, extra } = &s.transport().written()[0] else {
            panic!("first message must be RUN");
        };
        assert!(query.starts_with("MATCH"));
        assert_eq!(parameters["name"].as_str(), Some("Arya"));
        assert_eq!(extra["db"].as_str(), Some("got"));
    }

    #[tokio::test]
    async fn failed_run_is_never_followed_by_pull() {
        let mut s = session(ScriptedTransport::new([failure(SYNTAX_ERROR, "Invalid input 'RETRUN'")]));

        let err = s.run("RETRUN 1", Map::new()).await.unwrap_err();
        assert_eq!(err.server_failure().unwrap().code, SYNTAX_ERROR);
        assert_eq!(s.transport().written_names(), ["RUN"]);
        assert_eq!(s.state(), SessionState::Failed);
        assert_eq!(s.pending(), 0);

        let err = s.run("RETURN 1", Map::new()).await.unwrap_err();
        assert!(matches!(err, BoltError::ProtocolViolation(_)));
        assert!(!err.is_fatal());
        assert_eq!(s.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn reset_recovers_a_failed_session() {
        let mut transport = ScriptedTransport::new([failure(SYNTAX_ERROR, "bad")]);
        transport.reply(success(&[]));
        transport.reply(fields(&["x"]));
        transport.reply(record(vec![PackValue::Integer(1)]));
        transport.reply(done());
        let mut s = session(transport);

        assert!(s.run("RETRUN 1", Map::new()).await.is_err());
        s.reset().await.unwrap();
        assert_eq!(s.state(), SessionState::Ready);

        let mut result = s.run("RETURN 1 AS x", Map::new()).await.unwrap();
        let row = result.single(&mut s).await.unwrap();
        assert_eq!(row.get(0).unwrap().as_integer().unwrap(), 1);
        assert_eq!(s.transport().written_names(), ["RUN", "RESET", "RUN", "PULL"]);
    }

    #[tokio::test]
    async fn pipelined_results_are_read_in_submission_order() {
        let mut s = session(ScriptedTransport::new([
            fields(&["a"]),
            record(vec![PackValue::Integer(1)]),
            done(),
            fields(&["b"]),
            record(vec![PackValue::Integer(2)]),
            done(),
        ]));

        let mut first = s.run("RETURN 1 AS a", Map::new()).await.unwrap();
        let mut second = s.run("RETURN 2 AS b", Map::new()).await.unwrap();
        assert!(second.fields().is_none());
        assert_eq!(s.transport().written_names(), ["RUN", "PULL", "RUN"]);

        let err = second.records(&mut s).unwrap().next().await.unwrap_err();
        assert!(err.to_string().contains("must be drained before"));
        assert!(!err.is_fatal());
        assert_eq!(s.state(), SessionState::Ready);

        let a = first.single(&mut s).await.unwrap();
        assert_eq!(a.field("a").unwrap().as_integer().unwrap(), 1);
        let summary = second.consume(&mut s).await.unwrap();
        assert_eq!(summary.fields, ["b"]);
        assert_eq!(s.transport().written_names(), ["RUN", "PULL", "RUN", "PULL"]);
        assert!(first.id() < second.id());
    }

    #[tokio::test]
    async fn results_behind_a_failure_are_ignored() {
        let mut s = session(ScriptedTransport::new([
            fields(&["n"]),
            record(vec![PackValue::Integer(1)]),
            failure("Neo.ClientError.Statement.ArithmeticError", "/ by zero"),
            ServerMessage::Ignored,
        ]));

        let mut first = s.run("UNWIND [1, 0] AS n RETURN 1 / n AS n", Map::new()).await.unwrap();
        let mut second = s.run("RETURN 2", Map::new()).await.unwrap();

        let mut rows = first.records(&mut s).unwrap();
        assert!(rows.next().await.unwrap().is_some());
        let err = rows.next().await.unwrap_err();
        assert!(matches!(err, BoltError::QueryFailure(ref f) if f.message == "/ by zero"));
        assert!(rows.next().await.unwrap().is_none());
        drop(rows);
        assert!(matches!(first.outcome(), Some(Outcome::Failed(_))));

        let err = second.records(&mut s).unwrap().next().await.unwrap_err();
        assert!(matches!(err, BoltError::Ignored));
        assert_eq!(second.outcome(), Some(&Outcome::Ignored));
        assert!(matches!(second.summary(), Err(BoltError::Ignored)));
        assert_eq!(s.pending(), 0);
        // The second PULL was never written.
        assert_eq!(s.transport().written_names(), ["RUN", "PULL", "RUN"]);
    }

    #[tokio::test]
    async fn pipelined_run_failure_surfaces_from_its_stream() {
        let mut s = session(ScriptedTransport::new([
            fields(&["a"]),
            done(),
            failure(SYNTAX_ERROR, "bad"),
        ]));

        let mut first = s.run("RETURN 1 AS a", Map::new()).await.unwrap();
        let mut second = s.run("RETRUN 2", Map::new()).await.unwrap();
        first.consume(&mut s).await.unwrap();

        let err = second.records(&mut s).unwrap().next().await.unwrap_err();
        assert!(matches!(err, BoltError::QueryFailure(_)));
        assert_eq!(s.transport().written_names(), ["RUN", "PULL", "RUN"]);
        assert_eq!(s.state(), SessionState::Failed);
    }

    #[tokio::test]
    async fn timeout_fails_the_session_until_reset() {
        let mut transport = ScriptedTransport::new([fields(&["n"])]);
        transport.push(Step::Stall);
        // Late PULL response, then the RESET acknowledgement.
        transport.reply(ServerMessage::Ignored);
        transport.reply(success(&[]));
        let config = SessionConfig::new().read_timeout(Duration::from_millis(20));
        let mut s = Session::new(transport, config).unwrap();

        let mut result = s.run("CALL apoc.util.sleep(60000)", Map::new()).await.unwrap();
        let err = result.records(&mut s).unwrap().next().await.unwrap_err();
        assert!(matches!(err, BoltError::Timeout(d) if d == Duration::from_millis(20)));
        assert_eq!(result.outcome(), Some(&Outcome::Interrupted(Duration::from_millis(20))));
        assert!(matches!(result.summary(), Err(BoltError::Timeout(_))));
        assert_eq!(s.state(), SessionState::Failed);
        assert!(s.run("RETURN 1", Map::new()).await.is_err());

        s.reset().await.unwrap();
        assert_eq!(s.state(), SessionState::Ready);
        assert_eq!(s.pending(), 0);
    }

    #[tokio::test]
    async fn reset_drops_unwritten_work_and_voids_results() {
        let mut s = session(ScriptedTransport::new([
            fields(&["a"]),
            // Drained by the reset: first PULL, second RUN, then RESET.
            record(vec![PackValue::Integer(1)]),
            done(),
            ServerMessage::Ignored,
            success(&[]),
        ]));

        let mut first = s.run("RETURN 1 AS a", Map::new()).await.unwrap();
        let _second = s.run("RETURN 2", Map::new()).await.unwrap();
        let _third = s.run("RETURN 3", Map::new()).await.unwrap();
        assert_eq!(s.pending(), 5);

        s.reset().await.unwrap();
        assert_eq!(s.pending(), 0);
        assert_eq!(s.transport().written_names(), ["RUN", "PULL", "RUN", "RESET"]);

        let err = first.records(&mut s).unwrap().next().await.unwrap_err();
        assert!(matches!(err, BoltError::Ignored));
        assert_eq!(first.outcome(), Some(&Outcome::Ignored));
        assert!(matches!(first.summary(), Err(BoltError::Ignored)));
    }

    #[tokio::test]
    async fn cancelled_run_is_reset_by_the_next_run() {
        let mut transport = ScriptedTransport::new([]);
        transport.push(Step::Stall);
        // Late RUN acknowledgement of the cancelled query, then the RESET.
        transport.reply(fields(&["x"]));
        transport.reply(success(&[]));
        transport.reply(fields(&["x"]));
        transport.reply(record(vec![PackValue::Integer(1)]));
        transport.reply(done());
        let mut s = session(transport);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(20),
            s.run("CALL apoc.util.sleep(60000)", Map::new()),
        )
        .await;
        assert!(cancelled.is_err());
        // Its RUN is on the wire, its PULL still queued.
        assert_eq!(s.pending(), 2);

        let mut result = s.run("RETURN 1 AS x", Map::new()).await.unwrap();
        let row = result.single(&mut s).await.unwrap();
        assert_eq!(row.get(0).unwrap().as_integer().unwrap(), 1);
        assert_eq!(s.state(), SessionState::Ready);
        assert_eq!(s.pending(), 0);
        assert_eq!(s.transport().written_names(), ["RUN", "RESET", "RUN", "PULL"]);
    }

    #[tokio::test]
    async fn reset_is_idempotent() {
        let mut s = session(ScriptedTransport::new([success(&[]), success(&[])]));
        s.reset().await.unwrap();
        s.reset().await.unwrap();
        assert_eq!(s.state(), SessionState::Ready);
        assert_eq!(s.transport().written_names(), ["RESET", "RESET"]);
    }

    #[tokio::test]
    async fn failed_reset_makes_the_session_defunct() {
        let mut s = session(ScriptedTransport::new([failure(
            "Neo.DatabaseError.General.UnknownError",
            "boom",
        )]));
        assert!(s.reset().await.is_err());
        assert_eq!(s.state(), SessionState::Defunct);
        assert!(matches!(s.reset().await, Err(BoltError::ProtocolViolation(_))));
    }

    #[tokio::test]
    async fn dropped_connection_makes_the_session_defunct() {
        let mut transport = ScriptedTransport::new([]);
        transport.push(Step::Drop);
        let mut s = session(transport);

        let err = s.run("RETURN 1", Map::new()).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(s.state(), SessionState::Defunct);
        assert!(matches!(
            s.run("RETURN 1", Map::new()).await,
            Err(BoltError::ProtocolViolation(_))
        ));
    }

    #[tokio::test]
    async fn record_wider_than_its_columns_is_a_violation() {
        let mut s = session(ScriptedTransport::new([
            fields(&["a"]),
            record(vec![PackValue::Integer(1), PackValue::Integer(2)]),
        ]));
        let mut result = s.run("RETURN 1 AS a", Map::new()).await.unwrap();
        let err = result.records(&mut s).unwrap().next().await.unwrap_err();
        assert!(matches!(err, BoltError::ProtocolViolation(_)));
        assert!(err.is_fatal());
        assert_eq!(s.state(), SessionState::Defunct);
    }

    #[tokio::test]
    async fn malformed_field_names_are_a_violation() {
        let mut s = session(ScriptedTransport::new([success(&[(
            "fields",
            PackValue::List(vec![PackValue::from("a"), PackValue::Integer(7)]),
        )])]));
        let err = s.run("RETURN 1 AS a, 2 AS b", Map::new()).await.unwrap_err();
        assert!(matches!(err, BoltError::ProtocolViolation(_)));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("must be a string"));
        assert_eq!(s.state(), SessionState::Defunct);
    }

    #[tokio::test]
    async fn unsupported_field_does_not_poison_the_record() {
        let date = PackValue::Struct(PackStruct::new(0x44, vec![PackValue::Integer(19_000)]));
        let mut s = session(ScriptedTransport::new([
            fields(&["name", "born"]),
            record(vec![PackValue::from("Jon"), date]),
            done(),
        ]));
        let mut result = s.run("MATCH (c) RETURN c.name AS name, c.born AS born", Map::new()).await.unwrap();
        let row = result.single(&mut s).await.unwrap();
        assert_eq!(row.field("name").unwrap().as_str().unwrap(), "Jon");
        assert!(matches!(row.field("born"), Err(BoltError::UnsupportedValue(_))));
        assert_eq!(s.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn old_protocol_versions_are_refused() {
        let transport = ScriptedTransport::new([]).with_version((2, 0));
        assert!(matches!(
            Session::new(transport, SessionConfig::default()),
            Err(BoltError::ProtocolViolation(_))
        ));
    }

    #[tokio::test]
    async fn results_cannot_cross_sessions() {
        let mut a = session(ScriptedTransport::new([fields(&["x"])]));
        let mut b = session(ScriptedTransport::new([]));
        let mut result = a.run("RETURN 1 AS x", Map::new()).await.unwrap();
        let err = result.records(&mut b).unwrap().next().await.unwrap_err();
        assert!(err.to_string().contains("another session"));
    }

    #[tokio::test]
    async fn end_to_end_over_a_duplex_pipe() {
        let (client, server) = tokio::io::duplex(8192);
        let peer = tokio::spawn(async move {
            let mut peer = Peer::accept(server, (5, 4)).await;
            peer.expect().await;
            peer.success(&[("server", PackValue::from("Neo4j/5.20.0"))]).await;
            peer.expect().await;
            peer.success(&[]).await;

            let run = peer.expect().await;
            peer.reply(fields(&["c"])).await;
            let pull = peer.expect().await;
            let node = PackStruct::new(
                tag::NODE,
                vec![
                    PackValue::Integer(7),
                    PackValue::List(vec![PackValue::from("Character")]),
                    PackValue::Dict(crate::packstream::Dict::from([(
                        "name".to_string(),
                        PackValue::from("Arya"),
                    )])),
                    PackValue::from("4:got:7"),
                ],
            );
            peer.reply(record(vec![PackValue::Struct(node)])).await;
            peer.reply(done()).await;
            let goodbye = peer.expect().await;
            (run.name(), pull.name(), goodbye)
        });

        let mut conn = BoltConnection::handshake(client, DEFAULT_MAX_MESSAGE_SIZE).await.unwrap();
        conn.hello("boltq-test", &AuthToken::basic("neo4j", "pw")).await.unwrap();
        let mut s = Session::new(conn, SessionConfig::default()).unwrap();

        let mut result = s.run("MATCH (c:Character) RETURN c LIMIT 1", Map::new()).await.unwrap();
        let row = result.single(&mut s).await.unwrap();
        let node = row.field("c").unwrap().as_node().unwrap();
        assert!(node.has_label("Character"));
        assert_eq!(node.property("name").unwrap().as_str().unwrap(), "Arya");
        s.close().await.unwrap();

        let (run, pull, goodbye) = peer.await.unwrap();
        assert_eq!((run, pull), ("RUN", "PULL"));
        assert_eq!(goodbye, ClientMessage::Goodbye);
    }
}
