use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;

use crate::utils::{SyncError, SyncResult};

/// Default base URL for the published Cloudflare range lists
pub const DEFAULT_CLOUDFLARE_IPS_URL: &str = "https://www.cloudflare.com";

/// Default timeout applied to every outbound request
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration settings for the sync service
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Nginx Proxy Manager connection and target list
    pub npm: NpmConfig,
    /// Cloudflare range list source
    pub cloudflare: CloudflareConfig,
    /// Loop behaviour
    pub sync: SyncConfig,
    /// Outbound HTTP behaviour
    pub http: HttpConfig,
    /// Prometheus listener, disabled when `None`
    pub metrics_addr: Option<SocketAddr>,
}

/// NPM-specific configuration settings
#[derive(Clone, PartialEq)]
pub struct NpmConfig {
    /// Base URL of the NPM management API
    pub host: String,
    /// Identity used to acquire a token
    pub email: String,
    /// Secret used to acquire a token
    pub password: String,
    /// Access list whose clients are kept in sync
    pub access_list_id: u64,
}

// The password stays out of logs.
impl std::fmt::Debug for NpmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NpmConfig")
            .field("host", &self.host)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("access_list_id", &self.access_list_id)
            .finish()
    }
}

/// Cloudflare range list settings
#[derive(Debug, Clone, PartialEq)]
pub struct CloudflareConfig {
    /// Base URL serving `/ips-v4` and `/ips-v6`
    pub ips_url: String,
}

/// How often and how carefully to sync
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Single-shot or continuous
    pub mode: SyncMode,
    /// Report the diff without writing
    pub dry_run: bool,
    /// Continuous mode exits on the first failed cycle
    pub fail_fast: bool,
}

/// Deployment mode, chosen by the presence of `SYNC_INTERVAL`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Run one cycle and exit
    Once,
    /// Run forever, waiting `interval` between cycles
    Continuous { interval: Duration },
}

/// Outbound HTTP settings
#[derive(Debug, Clone, PartialEq)]
pub struct HttpConfig {
    pub timeout: Duration,
}

impl Settings {
    /// Load configuration from a `.env` file (if any) and the process environment
    pub fn load() -> SyncResult<Self> {
        match dotenv::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
            Err(dotenv::Error::Io(e)) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(SyncError::DotEnv(e)),
        }

        let source = config::Config::builder()
            .add_source(config::Environment::default())
            .build()?;

        Self::from_config(&source)
    }

    /// Build settings from an explicit variable map instead of the process environment
    pub fn from_vars<I, K, V>(vars: I) -> SyncResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: config::Map<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();

        let source = config::Config::builder()
            .add_source(config::Environment::default().source(Some(map)))
            .build()?;

        Self::from_config(&source)
    }

    fn from_config(source: &config::Config) -> SyncResult<Self> {
        let npm = NpmConfig {
            host: required(source, "NPM_HOST")?
                .trim_end_matches('/')
                .to_string(),
            email: required(source, "NPM_EMAIL")?,
            password: required(source, "NPM_PASSWORD")?,
            access_list_id: parse_with(
                "NPM_ACCESS_LIST_ID",
                &required(source, "NPM_ACCESS_LIST_ID")?,
                |raw| raw.parse::<u64>().map_err(|e| e.to_string()),
            )?,
        };
        validate_url("NPM_HOST", &npm.host)?;

        let ips_url = optional(source, "CLOUDFLARE_IPS_URL")?
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_CLOUDFLARE_IPS_URL.to_string());
        validate_url("CLOUDFLARE_IPS_URL", &ips_url)?;

        let mode = match optional(source, "SYNC_INTERVAL")? {
            Some(raw) => SyncMode::Continuous {
                interval: parse_with("SYNC_INTERVAL", &raw, parse_duration)?,
            },
            None => SyncMode::Once,
        };

        let sync = SyncConfig {
            mode,
            dry_run: optional_bool(source, "SYNC_DRY_RUN")?.unwrap_or(false),
            fail_fast: optional_bool(source, "SYNC_FAIL_FAST")?.unwrap_or(false),
        };

        let http = HttpConfig {
            timeout: match optional(source, "HTTP_TIMEOUT")? {
                Some(raw) => parse_with("HTTP_TIMEOUT", &raw, parse_duration)?,
                None => DEFAULT_HTTP_TIMEOUT,
            },
        };

        let metrics_addr = match optional(source, "METRICS_ADDR")? {
            Some(raw) => Some(parse_with("METRICS_ADDR", &raw, |v| {
                v.parse::<SocketAddr>().map_err(|e| e.to_string())
            })?),
            None => None,
        };

        Ok(Self {
            npm,
            cloudflare: CloudflareConfig { ips_url },
            sync,
            http,
            metrics_addr,
        })
    }
}

/// Look up a setting by its environment name; empty values count as unset.
fn optional(source: &config::Config, key: &'static str) -> SyncResult<Option<String>> {
    // config's Environment source lowercases keys
    match source.get_string(&key.to_ascii_lowercase()) {
        Ok(value) if value.trim().is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(config::ConfigError::NotFound(_)) => Ok(None),
        Err(e) => Err(SyncError::Config(e)),
    }
}

fn required(source: &config::Config, key: &'static str) -> SyncResult<String> {
    optional(source, key)?.ok_or(SyncError::MissingSetting(key))
}

fn optional_bool(source: &config::Config, key: &'static str) -> SyncResult<Option<bool>> {
    optional(source, key)?
        .map(|raw| parse_with(key, &raw, parse_bool))
        .transpose()
}

fn parse_with<T>(
    key: &'static str,
    raw: &str,
    parse: impl FnOnce(&str) -> Result<T, String>,
) -> SyncResult<T> {
    parse(raw.trim()).map_err(|reason| SyncError::InvalidSetting { key, reason })
}

fn validate_url(key: &'static str, url: &str) -> SyncResult<()> {
    reqwest::Url::parse(url)
        .map(|_| ())
        .map_err(|e| SyncError::InvalidSetting {
            key,
            reason: format!("{url:?} is not a valid URL: {e}"),
        })
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("{other:?} is not a boolean")),
    }
}

/// Parse a duration such as `300`, `90s`, `5m` or `1h30m`.
///
/// A bare integer is a number of seconds. Zero is rejected.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("empty duration".to_string());
    }

    if let Ok(secs) = raw.parse::<u64>() {
        return non_zero(Duration::from_secs(secs), raw);
    }

    let mut total = Duration::ZERO;
    let mut rest = raw;
    while !rest.is_empty() {
        let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        if digits == 0 {
            return Err(format!("{raw:?}: expected a number at {rest:?}"));
        }
        let value: u64 = rest[..digits]
            .parse()
            .map_err(|e| format!("{raw:?}: {e}"))?;
        rest = &rest[digits..];

        let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let part = match unit {
            "ms" => Duration::from_millis(value),
            "s" => Duration::from_secs(value),
            "m" => Duration::from_secs(value.saturating_mul(60)),
            "h" => Duration::from_secs(value.saturating_mul(60 * 60)),
            "d" => Duration::from_secs(value.saturating_mul(60 * 60 * 24)),
            "" => return Err(format!("{raw:?}: missing unit after {value}")),
            other => return Err(format!("{raw:?}: unknown unit {other:?}")),
        };
        total = total.saturating_add(part);
    }

    non_zero(total, raw)
}

fn non_zero(duration: Duration, raw: &str) -> Result<Duration, String> {
    if duration.is_zero() {
        Err(format!("{raw:?}: duration must be greater than zero"))
    } else {
        Ok(duration)
    }
}
