use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use crate::cloudflare::CloudflareIpSource;
use crate::config::{Settings, SyncMode};
use crate::npm::NpmClient;
use crate::reconcile::{Reconciler, SyncReport};
use crate::utils::{
    build_http_client, create_cycle_span, log_sync_event, record_cycle_failure,
    record_cycle_success, SyncError, SyncResult,
};

/// Runs the reconciler once or on an interval
pub struct SyncService {
    reconciler: Reconciler,
    mode: SyncMode,
    fail_fast: bool,
}

impl SyncService {
    pub fn new(reconciler: Reconciler, mode: SyncMode) -> Self {
        Self {
            reconciler,
            mode,
            fail_fast: false,
        }
    }

    /// Continuous mode stops at the first failed cycle instead of waiting for the next one
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Wires the Cloudflare source and NPM client described by `settings`
    pub fn from_settings(settings: &Settings) -> SyncResult<Self> {
        let http = build_http_client(&settings.http)?;

        let source = CloudflareIpSource::from_config(http.clone(), &settings.cloudflare);
        let connector = NpmClient::from_config(http, &settings.npm);

        let reconciler = Reconciler::new(
            Arc::new(source),
            Arc::new(connector),
            settings.npm.access_list_id,
        )
        .with_dry_run(settings.sync.dry_run);

        Ok(Self::new(reconciler, settings.sync.mode).with_fail_fast(settings.sync.fail_fast))
    }

    /// Runs one cycle inside its own span and records the outcome
    pub async fn sync_once(&self) -> SyncResult<SyncReport> {
        let cycle_id = Uuid::new_v4().to_string();
        let span = create_cycle_span(&cycle_id, self.reconciler.access_list_id());

        let result = self.reconciler.run_cycle().instrument(span.clone()).await;

        span.in_scope(|| match &result {
            Ok(report) => {
                let (added, removed) = report.written_changes();
                record_cycle_success(report.desired, added, removed);
                tracing::info!(
                    access_list = %report.access_list_name,
                    desired = report.desired,
                    added = report.added,
                    removed = report.removed,
                    net_delta = report.net_delta,
                    outcome = ?report.outcome,
                    "{}",
                    report
                );
            }
            Err(e) => {
                record_cycle_failure(e.kind());
                log_sync_event("sync_cycle", false, Some(&e.to_string()));
            }
        });

        result
    }

    /// Runs until the mode says to stop.
    ///
    /// In continuous mode, `shutdown` resolving ends the wait between cycles
    /// and the loop returns `Ok(())`. A cycle already running is never
    /// interrupted, so `shutdown` must already be listening when this is called
    /// (see [`shutdown_signal`]).
    pub async fn run<F>(&self, shutdown: F) -> SyncResult<()>
    where
        F: Future<Output = ()>,
    {
        match self.mode {
            SyncMode::Once => self.sync_once().await.map(|_| ()),
            SyncMode::Continuous { interval } => self.run_continuous(interval, shutdown).await,
        }
    }

    async fn run_continuous<F>(&self, interval: Duration, shutdown: F) -> SyncResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        log_sync_event(
            "sync_loop_started",
            true,
            Some(&format!("syncing every {interval:?}")),
        );

        loop {
            if let Err(e) = self.sync_once().await {
                if self.fail_fast {
                    return Err(e);
                }
                tracing::warn!(
                    error = %e,
                    retry_in = ?interval,
                    "Sync cycle failed, will retry at the next interval"
                );
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = &mut shutdown => {
                    log_sync_event("sync_loop_stopped", true, Some("shutdown signal received"));
                    return Ok(());
                }
            }
        }
    }
}

/// Installs the Ctrl-C and SIGTERM handlers immediately.
///
/// The returned future resolves on the first of either signal, including one
/// delivered before it is first polled.
pub fn shutdown_signal() -> SyncResult<impl Future<Output = ()>> {
    #[cfg(unix)]
    let signal = {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt()).map_err(SyncError::Signal)?;
        let mut terminate = signal(SignalKind::terminate()).map_err(SyncError::Signal)?;

        async move {
            tokio::select! {
                _ = interrupt.recv() => tracing::info!("Received SIGINT"),
                _ = terminate.recv() => tracing::info!("Received SIGTERM"),
            }
        }
    };

    #[cfg(windows)]
    let signal = {
        let mut ctrl_c = tokio::signal::windows::ctrl_c().map_err(SyncError::Signal)?;

        async move {
            ctrl_c.recv().await;
            tracing::info!("Received Ctrl-C");
        }
    };

    Ok(signal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloudflare::MockIpRangeSource;
    use crate::npm::{
        AccessList, AccessListApi, ClientEntry, MockAccessListApi, MockAccessListConnector,
    };
    use crate::utils::SyncError;

    fn unchanged_api() -> MockAccessListApi {
        let mut api = MockAccessListApi::new();
        api.expect_get_access_list().returning(|id| {
            Ok(AccessList {
                id,
                name: "cf".to_string(),
                satisfy_any: false,
                pass_auth: false,
                items: Vec::new(),
                clients: vec![ClientEntry::allow("1.1.1.1/32")],
            })
        });
        api.expect_replace_clients().times(0);
        api
    }

    fn service(
        source: MockIpRangeSource,
        connector: MockAccessListConnector,
        mode: SyncMode,
    ) -> SyncService {
        SyncService::new(Reconciler::new(Arc::new(source), Arc::new(connector), 1), mode)
    }

    #[tokio::test]
    async fn once_mode_propagates_failure() {
        let mut source = MockIpRangeSource::new();
        source
            .expect_fetch()
            .times(1)
            .returning(|| Err(SyncError::Format("not text".to_string())));
        let connector = MockAccessListConnector::new();

        let result = service(source, connector, SyncMode::Once)
            .run(std::future::pending::<()>())
            .await;
        assert!(matches!(result, Err(SyncError::Format(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn continuous_mode_survives_failed_cycles_until_shutdown() {
        let mut source = MockIpRangeSource::new();
        let mut calls = 0;
        source.expect_fetch().times(3).returning(move || {
            calls += 1;
            if calls == 1 {
                Err(SyncError::Format("first cycle fails".to_string()))
            } else {
                Ok(vec!["1.1.1.1/32".to_string()])
            }
        });
        let mut connector = MockAccessListConnector::new();
        connector
            .expect_connect()
            .times(2)
            .returning(|| Ok(Box::new(unchanged_api()) as Box<dyn AccessListApi>));

        let interval = Duration::from_secs(60);
        // Three cycles fit before the shutdown fires at 150s.
        let shutdown = tokio::time::sleep(Duration::from_secs(150));

        let result = service(source, connector, SyncMode::Continuous { interval })
            .run(shutdown)
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn fail_fast_stops_continuous_mode() {
        let mut source = MockIpRangeSource::new();
        source
            .expect_fetch()
            .times(1)
            .returning(|| Err(SyncError::Format("boom".to_string())));
        let connector = MockAccessListConnector::new();

        let result = service(
            source,
            connector,
            SyncMode::Continuous {
                interval: Duration::from_secs(60),
            },
        )
        .with_fail_fast(true)
        .run(std::future::pending::<()>())
        .await;
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn pending_shutdown_stops_the_loop_after_the_running_cycle() {
        let mut source = MockIpRangeSource::new();
        source
            .expect_fetch()
            .times(1)
            .returning(|| Ok(vec!["1.1.1.1/32".to_string()]));
        let mut connector = MockAccessListConnector::new();
        connector
            .expect_connect()
            .times(1)
            .returning(|| Ok(Box::new(unchanged_api()) as Box<dyn AccessListApi>));

        let result = service(
            source,
            connector,
            SyncMode::Continuous {
                interval: Duration::from_secs(3600),
            },
        )
        .run(std::future::ready(()))
        .await;
        assert!(result.is_ok());
    }

    // SIGTERM raised while the first cycle runs must be caught rather than
    // killing the process, and must end the loop once that cycle is done.
    #[cfg(unix)]
    #[tokio::test]
    async fn sigterm_during_first_cycle_stops_after_it() {
        let shutdown = shutdown_signal().unwrap();

        let mut source = MockIpRangeSource::new();
        source.expect_fetch().times(1).returning(|| {
            let status = std::process::Command::new("sh")
                .arg("-c")
                .arg(format!("kill -TERM {}", std::process::id()))
                .status()
                .unwrap();
            assert!(status.success());
            Ok(vec!["1.1.1.1/32".to_string()])
        });
        let mut connector = MockAccessListConnector::new();
        connector
            .expect_connect()
            .times(1)
            .returning(|| Ok(Box::new(unchanged_api()) as Box<dyn AccessListApi>));

        let service = service(
            source,
            connector,
            SyncMode::Continuous {
                interval: Duration::from_secs(3600),
            },
        );
        let result = tokio::time::timeout(Duration::from_secs(30), service.run(shutdown)).await;
        assert!(matches!(result, Ok(Ok(()))));
    }
}
