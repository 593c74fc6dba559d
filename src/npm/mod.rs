//! Nginx Proxy Manager integration.
//! Token acquisition and full-replace updates of access list clients.

mod client;
mod models;

pub use client::{AccessListApi, AccessListConnector, NpmClient, NpmSession};
pub use models::{AccessList, ClientEntry, Directive, TokenRequest, TokenResponse};

#[cfg(test)]
pub use client::{MockAccessListApi, MockAccessListConnector};
