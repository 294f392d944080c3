// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ships lines from a stream to a log intake in size- and time-bounded batches.
//!
//! ```text
//!   line source ──> IngestLoop ──(bounded channel)──> LogFlusher ──> BatchSender ──> intake
//! ```
//!
//! The reader and the flusher run concurrently and only meet at the channel and at the
//! flusher's completion. See [`ingest::run_pipeline`] for the shutdown order and
//! [`flusher`] for when batches are sealed.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batch;
pub mod config;
pub mod constants;
pub mod errors;
pub mod flusher;
pub mod http;
pub mod ingest;
pub mod record;
pub mod sender;

#[cfg(test)]
mod test_support;
