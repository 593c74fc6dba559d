use serde::{Deserialize, Deserializer, Serialize};

/// Policy applied to a client address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Directive {
    Allow,
    Deny,
}

/// One address rule inside an access list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEntry {
    pub address: String,
    pub directive: Directive,
}

impl ClientEntry {
    /// Build an `allow` entry for the given address
    pub fn allow(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            directive: Directive::Allow,
        }
    }
}

/// An NPM access list as returned by `GET /api/nginx/access-lists/{id}?expand=items,clients`.
///
/// Only the writable fields are serialized, so the same value can be sent back
/// with `PUT`. Fields the API adds on read (owner, timestamps, per-client ids)
/// are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessList {
    #[serde(default, skip_serializing)]
    pub id: u64,
    pub name: String,
    #[serde(default, deserialize_with = "flag")]
    pub satisfy_any: bool,
    #[serde(default, deserialize_with = "flag")]
    pub pass_auth: bool,
    /// Basic-auth items; carried through untouched
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
    #[serde(default)]
    pub clients: Vec<ClientEntry>,
}

impl AccessList {
    /// Replace the clients with `addresses`, each allowed. Returns `new_len - old_len`.
    pub fn set_allowed_clients<S: AsRef<str>>(&mut self, addresses: &[S]) -> i64 {
        let before = self.clients.len() as i64;
        self.clients = addresses
            .iter()
            .map(|address| ClientEntry::allow(address.as_ref()))
            .collect();
        self.clients.len() as i64 - before
    }
}

/// Body of `POST /api/tokens`
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
    pub scope: &'a str,
    pub identity: &'a str,
    pub secret: &'a str,
}

/// Response of `POST /api/tokens`
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    #[serde(default)]
    pub expires: Option<String>,
}

// NPM stores the policy flags as tinyint and some versions return 0/1.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => value,
        Flag::Int(value) => value != 0,
    })
}
