//! Reconciliation logic for the sync service.
//! This module contains the desired-set diff and the reconciler that
//! converges an access list to it.

mod diff;
mod reconciler;

pub use diff::{ClientDiff, DesiredSet};
pub use reconciler::{Reconciler, SyncOutcome, SyncReport};
