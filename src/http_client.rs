//! Outbound HTTP client
//!
//! Every call to the Xero identity and accounting endpoints goes through one
//! shared `reqwest::Client` built here.

use reqwest::{Client, Proxy};
use std::time::Duration;

use crate::model::config::{Config, TlsBackend};

/// Upstream request timeout in seconds
pub const UPSTREAM_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Build the shared HTTP client from configuration
pub fn build_from_config(config: &Config) -> anyhow::Result<Client> {
    build_client(
        config.proxy_url.as_deref(),
        UPSTREAM_TIMEOUT_SECS,
        config.tls_backend,
    )
}

/// Build HTTP Client
///
/// # Arguments
/// * `proxy_url` - Optional proxy, credentials may be embedded in the URL
/// * `timeout_secs` - Timeout in seconds
/// * `tls_backend` - TLS implementation to use
pub fn build_client(
    proxy_url: Option<&str>,
    timeout_secs: u64,
    tls_backend: TlsBackend,
) -> anyhow::Result<Client> {
    let mut builder = Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT);

    if tls_backend == TlsBackend::Rustls {
        builder = builder.use_rustls_tls();
    }

    if let Some(url) = proxy_url {
        builder = builder.proxy(Proxy::all(url)?);
        tracing::debug!("HTTP Client using proxy: {}", url);
    }

    Ok(builder.build()?)
}
