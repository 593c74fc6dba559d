use reqwest::Client as ReqwestClient;
use std::time::Duration;

use crate::config::HttpConfig;

use super::error::{SyncError, SyncResult};

/// Builds the HTTP client shared by the Cloudflare and NPM integrations
pub fn build_http_client(config: &HttpConfig) -> SyncResult<ReqwestClient> {
    build_http_client_with_timeout(config.timeout)
}

/// Every request made through the returned client is bounded by `timeout`
pub fn build_http_client_with_timeout(timeout: Duration) -> SyncResult<ReqwestClient> {
    ReqwestClient::builder()
        .timeout(timeout)
        .connect_timeout(timeout)
        .user_agent(concat!("cf-npm-sync/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| SyncError::network("building the HTTP client", e))
}
