// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::batch::Batch;
use crate::errors::ShippingError;
use crate::record::Record;
use crate::sender::BatchSender;

/// Sender that records every batch it is handed and answers with scripted statuses.
///
/// Once the script runs out every attempt succeeds.
#[derive(Clone, Default)]
pub(crate) struct RecordingSender {
    calls: Arc<Mutex<Vec<Vec<Record>>>>,
    script: Arc<Mutex<VecDeque<StatusCode>>>,
}

impl RecordingSender {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_script(statuses: &[StatusCode]) -> Self {
        let sender = Self::default();
        sender.script.lock().unwrap().extend(statuses.iter().copied());
        sender
    }

    /// Every batch passed to `send`, empty ones included.
    pub(crate) fn calls(&self) -> Vec<Vec<Record>> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn messages(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .map(|batch| batch.iter().map(|r| r.message().to_string()).collect())
            .collect()
    }
}

#[async_trait]
impl BatchSender for RecordingSender {
    async fn send(&self, batch: &Batch) -> Result<(), ShippingError> {
        self.calls.lock().unwrap().push(batch.records().to_vec());
        if batch.is_empty() {
            return Ok(());
        }
        match self.script.lock().unwrap().pop_front() {
            Some(status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)) => {
                Err(ShippingError::Unauthorized(status))
            }
            Some(status) if status.as_u16() >= 400 => Err(ShippingError::Status(status)),
            _ => Ok(()),
        }
    }
}
