use std::fmt;
use std::sync::Arc;

use crate::cloudflare::IpRangeSource;
use crate::npm::AccessListConnector;
use crate::reconcile::diff::{ClientDiff, DesiredSet};
use crate::utils::{SyncError, SyncResult};

/// What a cycle did to the access list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Clients already matched; nothing was written
    Unchanged,
    /// Clients were replaced
    Updated,
    /// A write was needed but skipped because of dry-run
    DryRun,
}

/// Result of one reconciliation cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub access_list_id: u64,
    pub access_list_name: String,
    pub desired: usize,
    pub added: usize,
    pub removed: usize,
    /// Client count after minus client count before
    pub net_delta: i64,
    pub outcome: SyncOutcome,
}

impl SyncReport {
    /// `(added, removed)` entries that actually reached the access list
    pub fn written_changes(&self) -> (usize, usize) {
        match self.outcome {
            SyncOutcome::Updated => (self.added, self.removed),
            SyncOutcome::Unchanged | SyncOutcome::DryRun => (0, 0),
        }
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = if self.outcome == SyncOutcome::DryRun {
            "[dry run] "
        } else {
            ""
        };

        match (self.outcome, self.net_delta) {
            (SyncOutcome::Unchanged, _) => write!(f, "no changes to access list"),
            (_, delta) if delta > 0 => write!(
                f,
                "{prefix}added {delta} IPs to access list ({} new, {} dropped)",
                self.added, self.removed
            ),
            (_, delta) if delta < 0 => write!(
                f,
                "{prefix}removed {} IPs from access list ({} new, {} dropped)",
                -delta, self.added, self.removed
            ),
            _ => write!(
                f,
                "{prefix}replaced {} IPs in access list without changing its size",
                self.added
            ),
        }
    }
}

/// Converges one access list to the published Cloudflare ranges
pub struct Reconciler {
    source: Arc<dyn IpRangeSource>,
    connector: Arc<dyn AccessListConnector>,
    access_list_id: u64,
    dry_run: bool,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn IpRangeSource>,
        connector: Arc<dyn AccessListConnector>,
        access_list_id: u64,
    ) -> Self {
        Self {
            source,
            connector,
            access_list_id,
            dry_run: false,
        }
    }

    /// Compute and report diffs without ever writing
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn access_list_id(&self) -> u64 {
        self.access_list_id
    }

    /// Runs fetch, authenticate, read, diff and (when needed) replace once.
    ///
    /// A new credential is acquired on every call. An empty range list is
    /// refused with [`SyncError::Format`] and never clears the access list.
    pub async fn run_cycle(&self) -> SyncResult<SyncReport> {
        let id = self.access_list_id;

        let desired = DesiredSet::from_entries(self.source.fetch().await?);
        if desired.is_empty() {
            return Err(SyncError::Format(
                "Cloudflare published no IP ranges; refusing to clear the access list".to_string(),
            ));
        }
        tracing::debug!(desired = desired.len(), "Desired set assembled");

        let api = self.connector.connect().await?;
        let current = api.get_access_list(id).await?;
        let diff = ClientDiff::compute(&desired, &current.clients);

        let mut report = SyncReport {
            access_list_id: id,
            access_list_name: current.name.clone(),
            desired: desired.len(),
            added: diff.added.len(),
            removed: diff.removed.len(),
            net_delta: 0,
            outcome: SyncOutcome::Unchanged,
        };

        if diff.is_empty() {
            return Ok(report);
        }

        tracing::debug!(added = ?diff.added, removed = ?diff.removed, "Access list differs");

        if self.dry_run {
            report.net_delta = desired.len() as i64 - current.clients.len() as i64;
            report.outcome = SyncOutcome::DryRun;
            return Ok(report);
        }

        report.net_delta = api.replace_clients(id, desired.as_slice()).await?;
        report.outcome = SyncOutcome::Updated;
        Ok(report)
    }
}
