//! Keeps a Nginx Proxy Manager access list in sync with the IP ranges
//! Cloudflare publishes for its edge network.

pub mod cloudflare;
pub mod config;
pub mod npm;
pub mod reconcile;
pub mod service;
pub mod utils;
