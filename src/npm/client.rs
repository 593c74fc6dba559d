use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Response, StatusCode};

use crate::config::NpmConfig;
use crate::npm::models::{AccessList, TokenRequest, TokenResponse};
use crate::utils::{log_api_call, SyncError, SyncResult};

/// Read and replace operations on NPM access lists
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessListApi: Send + Sync {
    /// Fetch an access list with its items and clients expanded
    async fn get_access_list(&self, id: u64) -> SyncResult<AccessList>;

    /// Overwrite the clients of an access list with `desired`, each allowed.
    ///
    /// Returns the net change in client count (`new - old`).
    async fn replace_clients(&self, id: u64, desired: &[String]) -> SyncResult<i64>;
}

/// Produces a freshly authenticated [`AccessListApi`]
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessListConnector: Send + Sync {
    async fn connect(&self) -> SyncResult<Box<dyn AccessListApi>>;
}

/// Unauthenticated handle on the NPM management API
pub struct NpmClient {
    client: ReqwestClient,
    host: String,
    identity: String,
    secret: String,
}

impl NpmClient {
    /// Creates a new NPM client; no request is made until [`NpmClient::authenticate`]
    pub fn new(
        client: ReqwestClient,
        host: impl Into<String>,
        identity: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            client,
            host: host.into().trim_end_matches('/').to_string(),
            identity: identity.into(),
            secret: secret.into(),
        }
    }

    pub fn from_config(client: ReqwestClient, config: &NpmConfig) -> Self {
        Self::new(client, &config.host, &config.email, &config.password)
    }

    /// Exchanges identity and secret for a bearer token.
    ///
    /// Every call yields a new [`NpmSession`]; tokens are never refreshed in place.
    pub async fn authenticate(&self) -> SyncResult<NpmSession> {
        let url = format!("{}/api/tokens", self.host);
        let payload = TokenRequest {
            scope: "user",
            identity: &self.identity,
            secret: &self.secret,
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| SyncError::network("requesting an access token", e))?;

        let status = response.status();
        log_api_call("POST", &url, Some(status.as_u16()));
        if !status.is_success() {
            return Err(SyncError::Auth {
                status: status.as_u16(),
                body: read_body(response).await,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Format(format!("failed to decode token response: {e}")))?;
        if token.token.is_empty() {
            return Err(SyncError::Format("token response carried an empty token".to_string()));
        }

        tracing::debug!(expires = ?token.expires, "Acquired NPM access token");

        Ok(NpmSession {
            client: self.client.clone(),
            host: self.host.clone(),
            token: token.token,
        })
    }
}

#[async_trait]
impl AccessListConnector for NpmClient {
    async fn connect(&self) -> SyncResult<Box<dyn AccessListApi>> {
        Ok(Box::new(self.authenticate().await?))
    }
}

/// Authenticated NPM client holding one bearer token
pub struct NpmSession {
    client: ReqwestClient,
    host: String,
    token: String,
}

impl std::fmt::Debug for NpmSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NpmSession")
            .field("host", &self.host)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl NpmSession {
    fn access_list_url(&self, id: u64) -> String {
        format!("{}/api/nginx/access-lists/{}", self.host, id)
    }
}

#[async_trait]
impl AccessListApi for NpmSession {
    async fn get_access_list(&self, id: u64) -> SyncResult<AccessList> {
        let url = self.access_list_url(id);

        let response = self
            .client
            .get(&url)
            .query(&[("expand", "items,clients")])
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| SyncError::network(format!("fetching access list {id}"), e))?;

        log_api_call("GET", &url, Some(response.status().as_u16()));
        let response = check_status(response, id, "fetching access list").await?;

        response
            .json()
            .await
            .map_err(|e| SyncError::Format(format!("failed to decode access list {id}: {e}")))
    }

    async fn replace_clients(&self, id: u64, desired: &[String]) -> SyncResult<i64> {
        let mut list = self.get_access_list(id).await?;
        let delta = list.set_allowed_clients(desired);

        let url = self.access_list_url(id);
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.token)
            .json(&list)
            .send()
            .await
            .map_err(|e| SyncError::network(format!("replacing access list {id}"), e))?;

        log_api_call("PUT", &url, Some(response.status().as_u16()));
        check_status(response, id, "replacing access list").await?;

        Ok(delta)
    }
}

/// Maps a non-success status on an authenticated call to the matching error
async fn check_status(response: Response, id: u64, context: &str) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = read_body(response).await;
    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SyncError::Auth {
            status: status.as_u16(),
            body,
        },
        StatusCode::NOT_FOUND => SyncError::NotFound { id, body },
        StatusCode::CONFLICT => SyncError::Conflict { id, body },
        _ => SyncError::UnexpectedStatus {
            context: format!("{context} {id}"),
            status: status.as_u16(),
            body,
        },
    })
}

async fn read_body(response: Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|e| format!("<unreadable body: {e}>"))
}
