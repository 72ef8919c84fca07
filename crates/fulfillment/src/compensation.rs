//! Compensation log: undo actions recorded as side effects happen, executed
//! in reverse order when a later step fails.

use std::time::Duration;

use serde::Serialize;
use store::{InventoryLedger, ReservationItem};

use crate::services::artifacts::ArtifactStore;

/// An action that undoes one side effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompensationAction {
    /// Add reserved quantities back to stock.
    ReleaseStock(Vec<ReservationItem>),
    /// Remove an uploaded document.
    DeleteDocument { key: String },
}

impl CompensationAction {
    pub fn name(&self) -> &'static str {
        match self {
            CompensationAction::ReleaseStock(_) => "release_stock",
            CompensationAction::DeleteDocument { .. } => "delete_document",
        }
    }
}

/// A compensation action that did not complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompensationFailure {
    pub action: String,
    pub reason: String,
}

/// What compensation did after a failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompensationReport {
    /// Actions attempted, in execution order.
    pub attempted: Vec<String>,
    pub failures: Vec<CompensationFailure>,
}

impl CompensationReport {
    pub fn was_attempted(&self) -> bool {
        !self.attempted.is_empty()
    }

    /// True when every attempted action completed and nothing is left unresolved.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Records an effect that could not be undone because its outcome is unknown.
    pub fn record_unresolved(&mut self, action: &str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::error!(action, %reason, "side effect left unresolved");
        metrics::counter!("compensation_failures_total", "action" => action.to_string())
            .increment(1);
        self.failures.push(CompensationFailure {
            action: action.to_string(),
            reason,
        });
    }
}

/// Ordered list of undo actions for the side effects of one fulfillment.
#[derive(Debug, Default)]
pub struct CompensationLog {
    actions: Vec<CompensationAction>,
}

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: CompensationAction) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Gives up on every recorded action without running it, reporting each
    /// as unresolved. Used when undoing could corrupt state that may already
    /// be durable.
    pub fn abandon(self, reason: &str) -> CompensationReport {
        let mut report = CompensationReport::default();
        for action in self.actions.iter().rev() {
            report.record_unresolved(action.name(), reason);
        }
        report
    }

    /// Runs every recorded action, newest first.
    ///
    /// Each action is bounded by `timeout`. Failures are logged, counted and
    /// reported; they never stop the remaining actions.
    #[tracing::instrument(skip_all, fields(actions = self.actions.len()))]
    pub async fn unwind<L, A>(
        self,
        ledger: &L,
        artifacts: &A,
        timeout: Duration,
    ) -> CompensationReport
    where
        L: InventoryLedger + ?Sized,
        A: ArtifactStore + ?Sized,
    {
        let mut report = CompensationReport::default();

        for action in self.actions.into_iter().rev() {
            let name = action.name();
            report.attempted.push(name.to_string());

            let outcome = match &action {
                CompensationAction::ReleaseStock(items) => {
                    match tokio::time::timeout(timeout, ledger.release(items)).await {
                        Ok(result) => result.map_err(|e| e.to_string()),
                        Err(_) => Err(format!("timed out after {timeout:?}")),
                    }
                }
                CompensationAction::DeleteDocument { key } => {
                    match tokio::time::timeout(timeout, artifacts.delete(key)).await {
                        Ok(result) => result.map_err(|e| e.to_string()),
                        Err(_) => Err(format!("timed out after {timeout:?}")),
                    }
                }
            };

            match outcome {
                Ok(()) => tracing::info!(action = name, "compensation step completed"),
                Err(reason) => {
                    tracing::warn!(action = name, %reason, ?action, "compensation step failed");
                    metrics::counter!("compensation_failures_total", "action" => name)
                        .increment(1);
                    report.failures.push(CompensationFailure {
                        action: name.to_string(),
                        reason,
                    });
                }
            }
        }

        report
    }
}
