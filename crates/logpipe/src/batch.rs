// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Accumulates records until the flusher seals them into one request.
//!
//! The batch keeps a running estimate of its serialized size so the flusher can seal it
//! before the payload crosses the intake's request limit. The estimate is the sum of
//! [`Record::size`] for every record plus [`BATCH_ENVELOPE_BYTES`]. It is always at least the
//! real encoded size for the inputs we expect, so comparing it against the high-water mark
//! is enough to keep requests under the limit.
//!
//! On the wire a batch is a bare JSON array:
//! ```json
//! [{"message":"Log entry 1","timestamp":1234567890},{"message":"Log entry 2","timestamp":1234567891}]
//! ```

use crate::constants::BATCH_ENVELOPE_BYTES;
use crate::record::Record;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    records: Vec<Record>,
    size: usize,
}

impl Default for Batch {
    fn default() -> Self {
        Batch {
            records: Vec::new(),
            size: BATCH_ENVELOPE_BYTES,
        }
    }
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: Record) {
        self.size += record.size();
        self.records.push(record);
    }

    /// Estimated size of the serialized batch in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Request body for this batch.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.records)
    }
}
