// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use reqwest::StatusCode;

/// Errors raised while assembling the runtime configuration. All of them are fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("provide a license key via ${}", crate::constants::CREDENTIAL_ENV)]
    MissingCredential,

    #[error("license key is not a valid header value")]
    InvalidCredential,

    #[error("bad endpoint {0}")]
    InvalidEndpoint(String),

    #[error("flush interval must be greater than zero")]
    InvalidInterval,

    #[error("intake capacity must be greater than zero")]
    InvalidCapacity,
}

/// Outcome of a single failed delivery attempt.
#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error("failed to serialize batch: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("intake rejected batch with status {0}")]
    Status(StatusCode),

    #[error("bad license key (got {})", .0.as_u16())]
    Unauthorized(StatusCode),
}

impl ShippingError {
    /// Every following attempt would fail the same way, so the process has to stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ShippingError::Unauthorized(_))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Shipping(ShippingError),

    #[error("flusher task failed: {0}")]
    Coordinator(#[from] tokio::task::JoinError),
}
