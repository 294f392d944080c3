// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! One delivery attempt per sealed batch.
//!
//! The sender never retries. A non-fatal error tells the flusher the batch was not
//! delivered; the flusher drops it. Only [`ShippingError::Unauthorized`] is fatal, because a
//! rejected license key fails every following attempt the same way.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use tracing::debug;

use crate::batch::Batch;
use crate::config::Config;
use crate::errors::{ConfigError, ShippingError};

const API_KEY_HEADER: &str = "Api-Key";

#[async_trait]
pub trait BatchSender: Send + Sync {
    /// Delivers `batch`. An empty batch succeeds without touching the network.
    async fn send(&self, batch: &Batch) -> Result<(), ShippingError>;
}

/// Posts batches to the log intake.
#[derive(Debug, Clone)]
pub struct HttpSender {
    client: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
    headers: HeaderMap,
}

impl HttpSender {
    pub fn new(config: &Config, client: reqwest::Client) -> Result<Self, ConfigError> {
        let mut api_key =
            HeaderValue::from_str(&config.credential).map_err(|_| ConfigError::InvalidCredential)?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Ok(HttpSender {
            client,
            endpoint: config.endpoint.clone(),
            timeout: config.http_timeout,
            headers,
        })
    }
}

#[async_trait]
impl BatchSender for HttpSender {
    async fn send(&self, batch: &Batch) -> Result<(), ShippingError> {
        if batch.is_empty() {
            debug!("push: nothing to flush");
            return Ok(());
        }

        let body = batch.to_json()?;
        debug!("push: {} records, {} bytes", batch.len(), body.len());

        let resp = self
            .client
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .headers(self.headers.clone())
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        // Read the body to the end so the connection goes back to the pool
        if let Err(e) = resp.bytes().await {
            debug!("push: failed to drain response body: {e}");
        }

        classify(status)
    }
}

fn classify(status: StatusCode) -> Result<(), ShippingError> {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ShippingError::Unauthorized(status)),
        status if status.as_u16() / 100 > 3 => Err(ShippingError::Status(status)),
        _ => Ok(()),
    }
}
