// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Size limits, defaults and environment variable names.

use std::time::Duration;

/// Byte threshold above which an open batch is sealed before the next record is added.
///
/// The intake documents a 1MiB limit for uncompressed payloads; we stay one KiB under it
/// because the per-record estimate is only approximate.
pub const HIGH_WATER_MARK_BYTES: usize = 1024 * 1023;

/// Length of `{"message":"","timestamp":1684206341000000000}`, the serialized form of a
/// record with an empty message and the widest timestamp we expect.
pub const RECORD_HEADER_BYTES: usize = 46;

/// Allowance for the array brackets and separators wrapping a batch.
pub const BATCH_ENVELOPE_BYTES: usize = 32;

/// Capacity of the channel between the line reader and the flusher.
pub const INTAKE_CHANNEL_CAPACITY: usize = 256;

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

pub const DEFAULT_ENDPOINT: &str = "https://log-api.newrelic.com/log/v1";

pub const CREDENTIAL_ENV: &str = "NR_KEY";
pub const ENDPOINT_ENV: &str = "NR_URL";
pub const LOG_LEVEL_ENV: &str = "NR_LOG_LEVEL";
pub const HTTPS_PROXY_ENV: &str = "HTTPS_PROXY";
