// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;

use reqwest::Url;

use crate::constants::{
    CREDENTIAL_ENV, DEFAULT_ENDPOINT, DEFAULT_FLUSH_INTERVAL, DEFAULT_HTTP_TIMEOUT,
    ENDPOINT_ENV, HIGH_WATER_MARK_BYTES, HTTPS_PROXY_ENV, INTAKE_CHANNEL_CAPACITY,
};
use crate::errors::ConfigError;

/// Runtime configuration, built once at startup and handed to the sender and flusher.
#[derive(Debug, Clone)]
pub struct Config {
    /// License key sent in the `Api-Key` header
    pub credential: String,
    /// Log intake URL batches are posted to
    pub endpoint: Url,
    /// Longest time a record may wait in an open batch
    pub flush_interval: Duration,
    /// Timeout for each delivery attempt
    pub http_timeout: Duration,
    /// Estimated batch size that forces a flush
    pub high_water_mark: usize,
    /// Records buffered between the reader and the flusher
    pub intake_capacity: usize,
    /// HTTPS proxy URL
    pub https_proxy: Option<String>,
    /// Copy every input line to standard output
    pub echo: bool,
}

impl Config {
    /// Creates a configuration with default tuning.
    ///
    /// An empty value counts as missing: the credential is required, the endpoint falls back
    /// to [`DEFAULT_ENDPOINT`].
    pub fn new(credential: Option<String>, endpoint: Option<String>) -> Result<Self, ConfigError> {
        let credential = credential
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingCredential)?;
        let endpoint = parse_endpoint(
            endpoint
                .as_deref()
                .filter(|url| !url.is_empty())
                .unwrap_or(DEFAULT_ENDPOINT),
        )?;

        Ok(Config {
            credential,
            endpoint,
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            high_water_mark: HIGH_WATER_MARK_BYTES,
            intake_capacity: INTAKE_CHANNEL_CAPACITY,
            https_proxy: None,
            echo: false,
        })
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new(env::var(CREDENTIAL_ENV).ok(), env::var(ENDPOINT_ENV).ok())?;
        config.https_proxy = env::var(HTTPS_PROXY_ENV).ok().filter(|url| !url.is_empty());
        Ok(config)
    }

    /// Validate the tuning values, which callers may have overridden after construction
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }
        if self.intake_capacity == 0 {
            return Err(ConfigError::InvalidCapacity);
        }
        Ok(())
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|_| ConfigError::InvalidEndpoint(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(url),
        _ => Err(ConfigError::InvalidEndpoint(raw.to_string())),
    }
}
