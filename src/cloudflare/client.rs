use async_trait::async_trait;
use reqwest::Client as ReqwestClient;

use crate::cloudflare::ranges::{parse_ip_list, IpVersion};
use crate::config::CloudflareConfig;
use crate::utils::{log_api_call, SyncError, SyncResult};

/// Source of the desired set of client addresses
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IpRangeSource: Send + Sync {
    /// All published ranges, IPv4 first and then IPv6
    async fn fetch(&self) -> SyncResult<Vec<String>>;
}

/// Fetches Cloudflare's published IP ranges
pub struct CloudflareIpSource {
    client: ReqwestClient,
    base_url: String,
}

impl CloudflareIpSource {
    /// Creates a source reading `{base_url}/ips-v4` and `{base_url}/ips-v6`
    pub fn new(client: ReqwestClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(client: ReqwestClient, config: &CloudflareConfig) -> Self {
        Self::new(client, &config.ips_url)
    }

    /// Fetches a single range list
    pub async fn fetch_list(&self, version: IpVersion) -> SyncResult<Vec<String>> {
        let url = format!("{}/{}", self.base_url, version.path());

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SyncError::network(format!("fetching {version} ranges"), e))?;

        let status = response.status();
        log_api_call("GET", &url, Some(status.as_u16()));
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::UnexpectedStatus {
                context: format!("fetching {version} ranges"),
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::Format(format!("failed to read {version} ranges: {e}")))?;

        let ranges = parse_ip_list(&body);
        tracing::debug!(version = %version, count = ranges.len(), "Fetched Cloudflare ranges");
        Ok(ranges)
    }
}

#[async_trait]
impl IpRangeSource for CloudflareIpSource {
    async fn fetch(&self) -> SyncResult<Vec<String>> {
        let mut ranges = self.fetch_list(IpVersion::V4).await?;
        ranges.extend(self.fetch_list(IpVersion::V6).await?);
        Ok(ranges)
    }
}
