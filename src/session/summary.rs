//! Result summaries built from RUN and PULL metadata.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::packstream::{Dict, PackValue};

/// Metadata describing a completed query.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    pub fields: Vec<String>,
    /// `r`, `w`, `rw` or `s`.
    pub query_type: Option<String>,
    pub result_available_after: Option<Duration>,
    pub result_consumed_after: Option<Duration>,
    pub database: Option<String>,
    pub bookmark: Option<String>,
    pub counters: Counters,
    /// RUN and PULL metadata merged; PULL entries win.
    pub metadata: Dict,
}

impl ResultSummary {
    pub(crate) fn new(fields: Vec<String>, run: Dict, pull: Dict) -> Self {
        let mut metadata = run;
        metadata.extend(pull);

        let text = |key: &str| metadata.get(key).and_then(PackValue::as_str).map(String::from);
        let millis = |key: &str| {
            metadata
                .get(key)
                .and_then(PackValue::as_int)
                .and_then(|ms| u64::try_from(ms).ok())
                .map(Duration::from_millis)
        };
        let counters = match metadata.get("stats") {
            Some(PackValue::Dict(stats)) => Counters::from_stats(stats),
            _ => Counters::default(),
        };

        Self {
            query_type: text("type"),
            result_available_after: millis("t_first"),
            result_consumed_after: millis("t_last"),
            database: text("db"),
            bookmark: text("bookmark"),
            counters,
            fields,
            metadata,
        }
    }
}

/// Update counters reported under `stats`, keyed by server name
/// (`nodes-created`, `properties-set`, ...). Absent counters read as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters(BTreeMap<String, i64>);

impl Counters {
    fn from_stats(stats: &Dict) -> Self {
        Self(
            stats
                .iter()
                .filter_map(|(k, v)| v.as_int().map(|n| (k.clone(), n)))
                .collect(),
        )
    }

    pub fn get(&self, name: &str) -> i64 {
        self.0.get(name).copied().unwrap_or(0)
    }

    pub fn nodes_created(&self) -> i64 {
        self.get("nodes-created")
    }

    pub fn nodes_deleted(&self) -> i64 {
        self.get("nodes-deleted")
    }

    pub fn relationships_created(&self) -> i64 {
        self.get("relationships-created")
    }

    pub fn relationships_deleted(&self) -> i64 {
        self.get("relationships-deleted")
    }

    pub fn properties_set(&self) -> i64 {
        self.get("properties-set")
    }

    pub fn contains_updates(&self) -> bool {
        self.0.values().any(|&n| n > 0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }
}
