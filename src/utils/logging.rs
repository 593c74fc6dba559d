use std::env;
use tracing_subscriber::{fmt::format::FmtSpan, fmt::time::ChronoLocal, EnvFilter};

/// Initialize the logging system with the level taken from `RUST_LOG`
pub fn init_logging() {
    // Get the log level from environment variable or default to INFO
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_level(true)
        .with_timer(ChronoLocal::rfc_3339())
        .pretty()
        .finish();

    // A second call (tests, embedding) keeps the first subscriber
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Create a new span for one reconciliation cycle
pub fn create_cycle_span(cycle_id: &str, access_list_id: u64) -> tracing::Span {
    tracing::info_span!(
        "sync_cycle",
        cycle_id = %cycle_id,
        access_list_id = %access_list_id,
        timestamp = %chrono::Utc::now()
    )
}

/// Log a sync lifecycle event
pub fn log_sync_event(event_type: &str, success: bool, details: Option<&str>) {
    if success {
        tracing::info!(
            event_type = %event_type,
            success = %success,
            details = ?details,
            timestamp = %chrono::Utc::now()
        );
    } else {
        tracing::error!(
            event_type = %event_type,
            success = %success,
            details = ?details,
            timestamp = %chrono::Utc::now()
        );
    }
}

/// Log an outbound API call against Cloudflare or NPM
pub fn log_api_call(method: &str, url: &str, status: Option<u16>) {
    match status {
        Some(code) if (200..300).contains(&code) => {
            tracing::debug!(method = %method, url = %url, status = code, event = "api_call");
        }
        _ => {
            tracing::warn!(method = %method, url = %url, status = ?status, event = "api_call");
        }
    }
}
