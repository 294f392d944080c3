// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Reads lines, turns them into records and feeds the flusher.
//!
//! [`run_pipeline`] wires the two halves together: it spawns the [`LogFlusher`] task, reads
//! the line source until it ends, then closes the intake channel and waits for the flusher to
//! drain. Shutdown is a two-phase join. The reader has to observe the end of its input, and
//! the flusher has to observe the closed channel and send its final batch, before the
//! pipeline returns.
//!
//! Pushing into the channel waits while it is full, so a slow intake throttles the reader
//! instead of growing memory.
//!
//! Termination signals are not intercepted. A killed process loses whatever is queued or
//! in flight.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tracing::debug;

use crate::config::Config;
use crate::errors::{PipelineError, ShippingError};
use crate::flusher::{FlushSummary, LogFlusher};
use crate::record::{unix_now, Record};
use crate::sender::BatchSender;

/// Line source plus the optional echo of every line read.
pub struct IngestLoop<R, W> {
    reader: R,
    echo: Option<W>,
    buf: Vec<u8>,
}

impl<R, W> IngestLoop<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, echo: Option<W>) -> Self {
        IngestLoop {
            reader,
            echo,
            buf: Vec::new(),
        }
    }

    /// Reads the next line and builds its record.
    ///
    /// Returns `None` at end of input. A read error also ends the input. Line endings
    /// (`\n` or `\r\n`) are stripped and invalid UTF-8 is replaced rather than rejected.
    pub async fn next_record(&mut self) -> Option<Record> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf).await {
            Ok(0) => return None,
            Ok(_) => {}
            Err(e) => {
                debug!("scanner: read failed: {e}");
                return None;
            }
        }

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }

        self.echo_line().await;

        let line = String::from_utf8_lossy(&self.buf).into_owned();
        Some(Record::from_line(line, unix_now()))
    }

    async fn echo_line(&mut self) {
        let Some(writer) = self.echo.as_mut() else {
            return;
        };
        if let Err(e) = write_line(writer, &self.buf).await {
            // Usually a closed stdout; keep shipping without the copy
            debug!("echo: disabled after write failure: {e}");
            self.echo = None;
        }
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &[u8]) -> io::Result<()> {
    writer.write_all(line).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await
}

/// Ships every line of `reader` through a [`LogFlusher`] backed by `sender`.
///
/// Returns once the flusher has sent its final batch. If the flusher stops early because the
/// intake rejected the license key, the pipeline returns that error right away, even while
/// the reader is still waiting for input.
pub async fn run_pipeline<R, W, S>(
    reader: R,
    echo: Option<W>,
    sender: S,
    config: &Config,
) -> Result<FlushSummary, PipelineError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: BatchSender + 'static,
{
    let (tx, rx) = mpsc::channel(config.intake_capacity);
    let mut flusher = tokio::spawn(LogFlusher::new(sender, config).run(rx));
    let mut ingest = IngestLoop::new(reader, echo);

    loop {
        let record = tokio::select! {
            joined = &mut flusher => return finish(joined),
            record = ingest.next_record() => record,
        };
        let Some(record) = record else {
            break;
        };
        tokio::select! {
            joined = &mut flusher => return finish(joined),
            sent = tx.send(record) => {
                if sent.is_err() {
                    break;
                }
            }
        }
    }

    debug!("scanner: done");
    drop(tx);
    debug!("intake channel closed, waiting for flusher");
    let result = finish(flusher.await);
    debug!("exits");
    result
}

fn finish(
    joined: Result<Result<FlushSummary, ShippingError>, JoinError>,
) -> Result<FlushSummary, PipelineError> {
    match joined {
        Ok(Ok(summary)) => Ok(summary),
        Ok(Err(e)) => Err(PipelineError::Shipping(e)),
        Err(e) => Err(PipelineError::Coordinator(e)),
    }
}
