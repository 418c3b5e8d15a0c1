//! One row of query results.

use std::fmt;
use std::sync::Arc;

use super::value::Value;
use crate::error::BoltError;
use crate::packstream::PackValue;

/// A result row: field names shared with the rest of the result, plus one
/// decoded value per field.
///
/// Fields are decoded independently when the row arrives. A field the value
/// model cannot represent keeps its own error, reported when that field is
/// accessed; the other fields stay readable.
#[derive(Debug, Clone)]
pub struct Record {
    keys: Arc<[String]>,
    fields: Vec<Result<Value, String>>,
}

impl Record {
    pub(crate) fn decode(keys: Arc<[String]>, data: &[PackValue]) -> Self {
        let fields = data
            .iter()
            .map(|wire| Value::from_wire(wire).map_err(|e| e.to_string()))
            .collect();
        Self { keys, fields }
    }

    /// Field names, in column order.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Value at `index`, or the error that decoding it produced.
    pub fn get(&self, index: usize) -> Result<&Value, BoltError> {
        match self.fields.get(index) {
            Some(Ok(value)) => Ok(value),
            Some(Err(reason)) => Err(BoltError::UnsupportedValue(format!(
                "field {index}: {reason}"
            ))),
            None => Err(BoltError::NotFound(format!(
                "field index {index} (record has {} fields)",
                self.fields.len()
            ))),
        }
    }

    /// Value of the column named `key`.
    pub fn field(&self, key: &str) -> Result<&Value, BoltError> {
        let index = self
            .keys
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| BoltError::NotFound(format!("column `{key}`")))?;
        self.get(index)
    }

    /// All values, failing on the first field that could not be decoded.
    pub fn into_values(self) -> Result<Vec<Value>, BoltError> {
        self.fields
            .into_iter()
            .enumerate()
            .map(|(i, field)| {
                field.map_err(|reason| BoltError::UnsupportedValue(format!("field {i}: {reason}")))
            })
            .collect()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            let key = self.keys.get(i).map_or("?", String::as_str);
            match field {
                Ok(v) => write!(f, "{key}: {v}")?,
                Err(_) => write!(f, "{key}: <undecodable>")?,
            }
        }
        write!(f, "}}")
    }
}
