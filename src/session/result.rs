//! Query results and their record streams.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::Session;
use super::summary::ResultSummary;
use crate::connection::Transport;
use crate::error::{BoltError, ServerFailure};
use crate::packstream::{Dict, PackValue};
use crate::types::Record;

/// How a query ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(ResultSummary),
    Failed(ServerFailure),
    /// Skipped because an earlier command on the session failed, or voided
    /// by a session reset.
    Ignored,
    /// No response arrived within the read timeout.
    Interrupted(Duration),
}

/// Handle to one submitted query.
///
/// Records are read through the session that ran the query, in submission
/// order across all results of that session.
#[derive(Debug)]
pub struct QueryResult {
    pub(super) id: u64,
    pub(super) session: Uuid,
    pub(super) generation: u64,
    pub(super) keys: Option<Arc<[String]>>,
    pub(super) run_metadata: Dict,
    pub(super) outcome: Option<Outcome>,
    pub(super) consumed: bool,
    pub(super) records_seen: usize,
}

impl QueryResult {
    pub(super) fn new(id: u64, session: Uuid, generation: u64) -> Self {
        Self {
            id,
            session,
            generation,
            keys: None,
            run_metadata: Dict::new(),
            outcome: None,
            consumed: false,
            records_seen: 0,
        }
    }

    /// Session-local query id, increasing in submission order.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Column names, once the server has acknowledged the query.
    pub fn fields(&self) -> Option<&[String]> {
        self.keys.as_deref()
    }

    /// `None` until the result reaches a terminal state.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// Records handed out so far.
    pub fn records_seen(&self) -> usize {
        self.records_seen
    }

    /// Opens the record stream. A result can be iterated only once.
    pub fn records<'a, T: Transport>(
        &'a mut self,
        session: &'a mut Session<T>,
    ) -> Result<RecordStream<'a, T>, BoltError> {
        if self.consumed {
            return Err(BoltError::AlreadyConsumed);
        }
        self.consumed = true;
        Ok(RecordStream {
            session,
            result: self,
        })
    }

    /// Discards any remaining records and returns the summary.
    pub async fn consume<T: Transport>(
        &mut self,
        session: &mut Session<T>,
    ) -> Result<&ResultSummary, BoltError> {
        self.consumed = true;
        while session.next_record(self).await?.is_some() {}
        self.summary()
    }

    /// Returns the only record of the result.
    pub async fn single<T: Transport>(&mut self, session: &mut Session<T>) -> Result<Record, BoltError> {
        let mut stream = self.records(session)?;
        let first = stream.next().await?;
        if stream.next().await?.is_some() {
            while stream.next().await?.is_some() {}
            return Err(BoltError::misuse("expected a single record, got several"));
        }
        first.ok_or_else(|| BoltError::NotFound("query returned no records".into()))
    }

    /// The summary of a completed result. Available only once every record
    /// has been read.
    pub fn summary(&self) -> Result<&ResultSummary, BoltError> {
        match &self.outcome {
            Some(Outcome::Completed(summary)) => Ok(summary),
            Some(Outcome::Failed(failure)) => Err(BoltError::QueryFailure(failure.clone())),
            Some(Outcome::Ignored) => Err(BoltError::Ignored),
            Some(Outcome::Interrupted(limit)) => Err(BoltError::Timeout(*limit)),
            None => Err(BoltError::misuse(
                "summary is available once all records are read",
            )),
        }
    }

    pub(super) fn record_keys(&self) -> Arc<[String]> {
        self.keys.clone().unwrap_or_else(|| Arc::from(Vec::new()))
    }

    /// Stores the RUN acknowledgement. Column names must all be strings.
    pub(super) fn acknowledge(&mut self, metadata: Dict) -> Result<(), BoltError> {
        let keys: Vec<String> = match metadata.get("fields") {
            None => Vec::new(),
            Some(PackValue::List(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(String::from).ok_or_else(|| {
                        BoltError::protocol(format!(
                            "RUN field name must be a string, got {}",
                            item.kind()
                        ))
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(BoltError::protocol(format!(
                    "RUN fields must be a list, got {}",
                    other.kind()
                )));
            }
        };
        self.keys = Some(keys.into());
        self.run_metadata = metadata;
        Ok(())
    }

    /// Builds the summary from the final PULL metadata.
    pub(super) fn complete(&mut self, metadata: Dict) {
        let fields = self.record_keys().to_vec();
        let run = std::mem::take(&mut self.run_metadata);
        self.finish(Outcome::Completed(ResultSummary::new(fields, run, metadata)));
    }

    pub(super) fn finish(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
    }
}

/// Single-pass iterator over the records of one result.
pub struct RecordStream<'a, T: Transport> {
    session: &'a mut Session<T>,
    result: &'a mut QueryResult,
}

impl<T: Transport> RecordStream<'_, T> {
    /// Next record, or `None` once the result is exhausted.
    ///
    /// A server failure is returned once as an error; later calls return
    /// `None`.
    pub async fn next(&mut self) -> Result<Option<Record>, BoltError> {
        self.session.next_record(self.result).await
    }

    pub fn fields(&self) -> Option<&[String]> {
        self.result.fields()
    }

    /// Summary of the underlying result, once exhausted.
    pub fn summary(&self) -> Result<&ResultSummary, BoltError> {
        self.result.summary()
    }

    /// Reads every remaining record into memory.
    pub async fn try_collect(mut self) -> Result<Vec<Record>, BoltError> {
        let mut records = Vec::new();
        while let Some(record) = self.next().await? {
            records.push(record);
        }
        Ok(records)
    }
}
