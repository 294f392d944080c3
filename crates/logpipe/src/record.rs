// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! A single log line paired with the timestamp it is reported under.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde_json::Value;

use crate::constants::RECORD_HEADER_BYTES;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    message: String,
    timestamp: i64,
}

impl Record {
    pub fn new(message: impl Into<String>, timestamp: i64) -> Self {
        Record {
            message: message.into(),
            timestamp,
        }
    }

    /// Builds a record from a raw input line.
    ///
    /// If the line is a JSON object with a non-zero integer `ts` field, that value becomes the
    /// timestamp. Anything else (plain text, other JSON values, a zero, float or string `ts`)
    /// falls back to `now`.
    pub fn from_line(line: impl Into<String>, now: i64) -> Self {
        let message = line.into();
        let timestamp = embedded_timestamp(&message).unwrap_or(now);
        Record { message, timestamp }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Upper bound on the serialized size of this record.
    ///
    /// The message length is doubled so that escaped quotes and control characters are
    /// covered without encoding the record.
    pub fn size(&self) -> usize {
        RECORD_HEADER_BYTES + 2 * self.message.len()
    }
}

// Only the top level `ts` key of an object counts. A repeated key resolves to its last value.
fn embedded_timestamp(line: &str) -> Option<i64> {
    let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(line) else {
        return None;
    };
    fields.get("ts").and_then(Value::as_i64).filter(|ts| *ts != 0)
}

/// Seconds since the unix epoch, or 0 if the clock is set before it.
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}
