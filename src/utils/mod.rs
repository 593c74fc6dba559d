//! Utility modules for the sync service.
//! This module contains the error taxonomy, logging helpers and metrics
//! used across the application.

mod error;
mod http;
mod logging;
mod metrics;

pub use logging::{create_cycle_span, init_logging, log_api_call, log_sync_event};

pub use self::metrics::{init_metrics, record_cycle_failure, record_cycle_success};

pub use error::{SyncError, SyncResult};

pub use http::{build_http_client, build_http_client_with_timeout};
