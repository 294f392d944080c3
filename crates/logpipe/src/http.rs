// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client construction.
//!
//! One client is built at startup and reused for every batch so pooled connections survive
//! between flushes. Timeouts are applied per request by the sender.

use core::time::Duration;
use std::error::Error;

use tracing::error;

use crate::config::Config;

/// Creates the client used to ship batches.
///
/// An unusable proxy setting is logged and the client connects directly instead, so a bad
/// `HTTPS_PROXY` never stops the pipe from starting.
#[must_use]
pub fn get_client(config: &Config) -> reqwest::Client {
    match build_client(config, true) {
        Ok(client) => client,
        Err(e) => {
            error!(
                "Unable to parse proxy configuration: {}, falling back to direct connection",
                e
            );
            match build_client(config, false) {
                Ok(client) => client,
                Err(inner) => {
                    error!(
                        "Failed to build HTTP client without proxy: {}, using reqwest defaults",
                        inner
                    );
                    reqwest::Client::builder()
                        .no_proxy()
                        .build()
                        .unwrap_or_default()
                }
            }
        }
    }
}

fn build_client(config: &Config, allow_proxy: bool) -> Result<reqwest::Client, Box<dyn Error>> {
    // Proxies come from the configuration only, never from reqwest's own environment lookup
    let mut client = reqwest::Client::builder()
        .no_proxy()
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)));

    if allow_proxy {
        if let Some(https_proxy) = &config.https_proxy {
            client = client.proxy(reqwest::Proxy::https(https_proxy)?);
        }
    }

    Ok(client.build()?)
}
