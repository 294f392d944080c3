// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Owns the open batch and decides when to seal it.
//!
//! The flusher runs as its own task and is the only owner of the open [`Batch`], so no lock
//! guards it. It waits on two inputs at once:
//!
//! - a record from the intake channel, appended to the open batch. If the batch estimate
//!   plus the record's estimate would cross the high-water mark, the open batch is sealed and
//!   sent first, and the record starts the next batch.
//! - a periodic tick, which seals and sends the open batch even when it is empty (the sender
//!   treats an empty batch as a no-op). This bounds how long a record waits when input is slow.
//!
//! When the intake channel closes the open batch is sent one last time and [`LogFlusher::run`]
//! returns a [`FlushSummary`]. Awaiting the task is the completion signal the reader waits for
//! before the process exits.
//!
//! Sends are sequential. While a send is in flight new records queue up in the bounded
//! channel, which in turn blocks the reader. A batch that fails to send is dropped; nothing is
//! retried or persisted. The one exception is an authentication failure, which stops the
//! flusher immediately and is returned to the caller.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error};

use crate::batch::Batch;
use crate::config::Config;
use crate::errors::ShippingError;
use crate::record::Record;
use crate::sender::BatchSender;

/// Counts of what the flusher delivered and dropped over its lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushSummary {
    pub batches_sent: usize,
    pub records_sent: usize,
    pub batches_dropped: usize,
    pub records_dropped: usize,
}

pub struct LogFlusher<S> {
    sender: S,
    batch: Batch,
    high_water_mark: usize,
    flush_interval: Duration,
    summary: FlushSummary,
}

impl<S: BatchSender> LogFlusher<S> {
    pub fn new(sender: S, config: &Config) -> Self {
        LogFlusher {
            sender,
            batch: Batch::new(),
            high_water_mark: config.high_water_mark,
            flush_interval: config.flush_interval,
            summary: FlushSummary::default(),
        }
    }

    /// Consumes records until `rx` is closed and drained.
    ///
    /// Returns early only when the intake rejects the license key.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<Record>,
    ) -> Result<FlushSummary, ShippingError> {
        let mut ticker = interval_at(Instant::now() + self.flush_interval, self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    debug!("tick: flushing {} records", self.batch.len());
                    self.flush().await?;
                }
                record = rx.recv() => match record {
                    Some(record) => self.push(record).await?,
                    None => {
                        debug!("intake closed");
                        self.flush().await?;
                        debug!("flusher drained: {:?}", self.summary);
                        return Ok(self.summary);
                    }
                }
            }
        }
    }

    async fn push(&mut self, record: Record) -> Result<(), ShippingError> {
        let incoming = record.size();
        let open = self.batch.size();
        if open + incoming > self.high_water_mark {
            debug!("forcing flush: open={open} incoming={incoming}");
            self.flush().await?;
            if self.batch.size() + incoming > self.high_water_mark {
                debug!("record of {incoming} bytes exceeds the high-water mark on its own");
            }
        }
        self.batch.append(record);
        Ok(())
    }

    /// Seals the open batch, hands it to the sender and starts a fresh one.
    async fn flush(&mut self) -> Result<(), ShippingError> {
        let batch = std::mem::take(&mut self.batch);
        match self.sender.send(&batch).await {
            Ok(()) => {
                if !batch.is_empty() {
                    self.summary.batches_sent += 1;
                    self.summary.records_sent += batch.len();
                }
                Ok(())
            }
            Err(e) if e.is_fatal() => {
                error!("{e}");
                Err(e)
            }
            Err(e) => {
                debug!("push: dropping {} records: {e}", batch.len());
                self.summary.batches_dropped += 1;
                self.summary.records_dropped += batch.len();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{BATCH_ENVELOPE_BYTES, RECORD_HEADER_BYTES};
    use crate::test_support::RecordingSender;
    use reqwest::StatusCode;
    use tracing_test::traced_test;

    fn config(high_water_mark: usize, flush_interval: Duration) -> Config {
        let mut config = Config::new(Some("key".to_string()), None).unwrap();
        config.high_water_mark = high_water_mark;
        config.flush_interval = flush_interval;
        config
    }

    // Room for exactly `n` records with a one byte message
    fn room_for(n: usize) -> usize {
        BATCH_ENVELOPE_BYTES + n * (RECORD_HEADER_BYTES + 2)
    }

    const NO_TICK: Duration = Duration::from_secs(3600);

    async fn run_with(
        sender: RecordingSender,
        config: &Config,
        messages: &[&str],
    ) -> Result<FlushSummary, ShippingError> {
        let (tx, rx) = mpsc::channel(messages.len().max(1));
        for message in messages {
            tx.send(Record::new(*message, 1)).await.unwrap();
        }
        drop(tx);
        LogFlusher::new(sender, config).run(rx).await
    }

    #[tokio::test]
    async fn test_single_batch_when_under_high_water() {
        let sender = RecordingSender::new();
        let messages: Vec<String> = (0..100).map(|i| format!("line {i}")).collect();
        let refs: Vec<&str> = messages.iter().map(String::as_str).collect();

        let summary = run_with(sender.clone(), &config(usize::MAX, NO_TICK), &refs)
            .await
            .unwrap();

        assert_eq!(sender.messages(), vec![messages]);
        assert_eq!(
            summary,
            FlushSummary {
                batches_sent: 1,
                records_sent: 100,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_high_water_seals_before_new_record() {
        let sender = RecordingSender::new();

        run_with(sender.clone(), &config(room_for(2), NO_TICK), &["a", "b", "c"])
            .await
            .unwrap();

        assert_eq!(
            sender.messages(),
            vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_batch_exactly_at_high_water_is_not_sealed() {
        let sender = RecordingSender::new();

        run_with(sender.clone(), &config(room_for(3), NO_TICK), &["a", "b", "c"])
            .await
            .unwrap();

        assert_eq!(sender.calls().len(), 1);
        assert_eq!(sender.calls()[0].len(), 3);
    }

    #[tokio::test]
    async fn test_oversized_record_travels_alone() {
        let sender = RecordingSender::new();
        let big = "x".repeat(100);

        run_with(sender.clone(), &config(room_for(1), NO_TICK), &[&big, "a"])
            .await
            .unwrap();

        // The empty open batch is sealed first, then the big record and "a" split
        assert_eq!(
            sender.messages(),
            vec![vec![], vec![big.clone()], vec!["a".to_string()]]
        );
    }

    #[tokio::test]
    async fn test_close_with_empty_batch_sends_noop() {
        let sender = RecordingSender::new();

        let summary = run_with(sender.clone(), &config(usize::MAX, NO_TICK), &[])
            .await
            .unwrap();

        assert_eq!(sender.calls(), vec![Vec::<Record>::new()]);
        assert_eq!(summary, FlushSummary::default());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_batch_is_dropped_and_next_is_sent() {
        let sender = RecordingSender::with_script(&[StatusCode::INTERNAL_SERVER_ERROR]);

        let summary = run_with(sender.clone(), &config(room_for(2), NO_TICK), &["a", "b", "c"])
            .await
            .unwrap();

        assert_eq!(sender.calls().len(), 2);
        assert_eq!(
            summary,
            FlushSummary {
                batches_sent: 1,
                records_sent: 1,
                batches_dropped: 1,
                records_dropped: 2,
            }
        );
        assert!(logs_contain("push: dropping 2 records"));
    }

    #[tokio::test]
    async fn test_forbidden_stops_flusher() {
        let sender = RecordingSender::with_script(&[StatusCode::FORBIDDEN]);

        let result = run_with(
            sender.clone(),
            &config(room_for(1), NO_TICK),
            &["a", "b", "c", "d"],
        )
        .await;

        assert!(matches!(
            result,
            Err(ShippingError::Unauthorized(StatusCode::FORBIDDEN))
        ));
        assert_eq!(sender.messages(), vec![vec!["a".to_string()]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_flushes_stale_records() {
        let sender = RecordingSender::new();
        let config = config(usize::MAX, Duration::from_secs(5));
        let (tx, rx) = mpsc::channel(8);
        let flusher = tokio::spawn(LogFlusher::new(sender.clone(), &config).run(rx));

        tx.send(Record::new("slow", 1)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(sender.calls().is_empty());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sender.messages(), vec![vec!["slow".to_string()]]);

        drop(tx);
        let summary = flusher.await.unwrap().unwrap();
        assert_eq!(summary.batches_sent, 1);
        // The final flush found nothing left
        assert_eq!(sender.calls().len(), 2);
        assert!(sender.calls()[1].is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_ticks_send_empty_batches() {
        let sender = RecordingSender::new();
        let config = config(usize::MAX, Duration::from_secs(5));
        let (tx, rx) = mpsc::channel(8);
        let flusher = tokio::spawn(LogFlusher::new(sender.clone(), &config).run(rx));

        tokio::time::sleep(Duration::from_secs(11)).await;
        drop(tx);
        let summary = flusher.await.unwrap().unwrap();

        assert_eq!(sender.calls().len(), 3);
        assert!(sender.calls().iter().all(Vec::is_empty));
        assert_eq!(summary, FlushSummary::default());
    }
}
