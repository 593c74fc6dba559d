#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use cf_npm_sync::cloudflare::CloudflareIpSource;
use cf_npm_sync::npm::NpmClient;
use cf_npm_sync::reconcile::Reconciler;
use cf_npm_sync::utils::build_http_client_with_timeout;

pub const EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "changeme";
pub const LIST_ID: u64 = 3;

/// State behind the fake Cloudflare and NPM endpoints
#[derive(Debug)]
pub struct FakeState {
    pub ipv4: String,
    pub ipv6: String,
    pub ipv6_status: StatusCode,
    pub access_list: Value,
    pub put_status: StatusCode,
    pub issued_tokens: HashSet<String>,
    pub token_requests: Vec<Value>,
    pub expand_queries: Vec<String>,
    pub puts: Vec<Value>,
    pub requests: usize,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            ipv4: String::new(),
            ipv6: String::new(),
            ipv6_status: StatusCode::OK,
            access_list: access_list_json(&[]),
            put_status: StatusCode::OK,
            issued_tokens: HashSet::new(),
            token_requests: Vec::new(),
            expand_queries: Vec::new(),
            puts: Vec::new(),
            requests: 0,
        }
    }
}

type Shared = Arc<Mutex<FakeState>>;

/// Access list as NPM returns it with `expand=items,clients`
pub fn access_list_json(clients: &[&str]) -> Value {
    let clients: Vec<Value> = clients
        .iter()
        .enumerate()
        .map(|(i, address)| {
            json!({
                "id": i + 100,
                "access_list_id": LIST_ID,
                "created_on": "2024-05-01 10:00:00",
                "address": address,
                "directive": "allow"
            })
        })
        .collect();

    json!({
        "id": LIST_ID,
        "created_on": "2024-05-01 10:00:00",
        "modified_on": "2024-05-01 10:00:00",
        "owner_user_id": 1,
        "name": "Cloudflare only",
        "satisfy_any": true,
        "pass_auth": false,
        "proxy_host_count": 4,
        "items": [{"id": 9, "username": "ops", "password": ""}],
        "clients": clients
    })
}

/// In-process stand-in for both upstream services
pub struct FakeServer {
    pub base_url: String,
    pub state: Shared,
}

impl FakeServer {
    pub async fn start(state: FakeState) -> Self {
        let state = Arc::new(Mutex::new(state));

        let app = Router::new()
            .route("/ips-v4", get(ips_v4))
            .route("/ips-v6", get(ips_v6))
            .route("/api/tokens", post(issue_token))
            .route(
                "/api/nginx/access-lists/:id",
                get(get_access_list).put(put_access_list),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
        let addr = listener.local_addr().expect("fake server address");
        tokio::spawn(async move {
            axum::Server::from_tcp(listener)
                .expect("fake server listener")
                .serve(app.into_make_service())
                .await
                .expect("fake server");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    /// Addresses currently stored on the fake access list
    pub fn client_addresses(&self) -> Vec<String> {
        self.with(|s| {
            s.access_list["clients"]
                .as_array()
                .unwrap()
                .iter()
                .map(|c| c["address"].as_str().unwrap().to_string())
                .collect()
        })
    }

    pub fn npm_client(&self) -> NpmClient {
        self.npm_client_with_password(PASSWORD)
    }

    pub fn npm_client_with_password(&self, password: &str) -> NpmClient {
        NpmClient::new(http(), &self.base_url, EMAIL, password)
    }

    pub fn ip_source(&self) -> CloudflareIpSource {
        CloudflareIpSource::new(http(), &self.base_url)
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            Arc::new(self.ip_source()),
            Arc::new(self.npm_client()),
            LIST_ID,
        )
    }

    /// Variables for `Settings::from_vars` pointing at this server
    pub fn env_vars(&self) -> Vec<(String, String)> {
        vec![
            ("NPM_HOST".to_string(), self.base_url.clone()),
            ("NPM_EMAIL".to_string(), EMAIL.to_string()),
            ("NPM_PASSWORD".to_string(), PASSWORD.to_string()),
            ("NPM_ACCESS_LIST_ID".to_string(), LIST_ID.to_string()),
            ("CLOUDFLARE_IPS_URL".to_string(), self.base_url.clone()),
            ("HTTP_TIMEOUT".to_string(), "5s".to_string()),
        ]
    }
}

pub fn http() -> reqwest::Client {
    build_http_client_with_timeout(Duration::from_secs(5)).expect("http client")
}

/// Generate a random IPv4 CIDR for testing
pub fn random_cidr() -> String {
    format!(
        "{}.{}.{}.0/{}",
        rand::random::<u8>(),
        rand::random::<u8>(),
        rand::random::<u8>(),
        [16u8, 20, 22, 24][rand::random::<usize>() % 4]
    )
}

async fn ips_v4(State(state): State<Shared>) -> (StatusCode, String) {
    let mut s = state.lock().unwrap();
    s.requests += 1;
    (StatusCode::OK, s.ipv4.clone())
}

async fn ips_v6(State(state): State<Shared>) -> (StatusCode, String) {
    let mut s = state.lock().unwrap();
    s.requests += 1;
    (s.ipv6_status, s.ipv6.clone())
}

async fn issue_token(
    State(state): State<Shared>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut s = state.lock().unwrap();
    s.requests += 1;
    s.token_requests.push(body.clone());

    if body["scope"] != "user" || body["identity"] != EMAIL || body["secret"] != PASSWORD {
        return Err((
            StatusCode::UNAUTHORIZED,
            json!({"error": {"code": 401, "message": "Invalid email or password"}}).to_string(),
        ));
    }

    let token = format!("token-{}", s.issued_tokens.len() + 1);
    s.issued_tokens.insert(token.clone());
    Ok(Json(json!({"token": token, "expires": "2099-01-01T00:00:00.000Z"})))
}

fn authorize(s: &FakeState, headers: &HeaderMap) -> Result<(), (StatusCode, String)> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token {
        Some(token) if s.issued_tokens.contains(token) => Ok(()),
        _ => Err((StatusCode::UNAUTHORIZED, "{\"error\":\"Unauthorized\"}".to_string())),
    }
}

async fn get_access_list(
    State(state): State<Shared>,
    Path(id): Path<u64>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut s = state.lock().unwrap();
    s.requests += 1;
    authorize(&s, &headers)?;
    if id != LIST_ID {
        return Err((StatusCode::NOT_FOUND, "{\"error\":\"Not Found\"}".to_string()));
    }
    s.expand_queries
        .push(query.get("expand").cloned().unwrap_or_default());
    Ok(Json(s.access_list.clone()))
}

async fn put_access_list(
    State(state): State<Shared>,
    Path(id): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, String)> {
    let mut s = state.lock().unwrap();
    s.requests += 1;
    authorize(&s, &headers)?;
    if id != LIST_ID {
        return Err((StatusCode::NOT_FOUND, "{\"error\":\"Not Found\"}".to_string()));
    }
    s.puts.push(body.clone());
    if !s.put_status.is_success() {
        return Err((s.put_status, "{\"error\":\"rejected\"}".to_string()));
    }

    for field in ["name", "satisfy_any", "pass_auth", "items", "clients"] {
        s.access_list[field] = body[field].clone();
    }
    Ok(Json(s.access_list.clone()))
}
