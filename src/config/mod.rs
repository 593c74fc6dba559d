//! Configuration management for the sync service.
//! Settings are read from the process environment, optionally seeded from a
//! `.env` file, through explicit named lookups.

mod settings;

pub use settings::{
    parse_duration, CloudflareConfig, HttpConfig, NpmConfig, Settings, SyncConfig, SyncMode,
    DEFAULT_CLOUDFLARE_IPS_URL, DEFAULT_HTTP_TIMEOUT,
};

/// Load the application configuration
pub fn load_config() -> crate::utils::SyncResult<Settings> {
    Settings::load()
}
