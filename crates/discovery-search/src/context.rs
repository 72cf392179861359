//! Cooperative cancellation for long-running searches.
//!
//! A [`SearchContext`] is checked at every loop boundary that walks rows,
//! results, artifacts or thumbnail candidates, and before every external
//! call. Cancelling it makes the running operation unwind with
//! [`DiscoveryError::Cancelled`].
//!
//! Worker threads that already own an interrupt flag can link it with
//! [`SearchContext::with_interrupt`]; either flag being set counts as
//! cancellation.
//!
//! [`SearchEnv`] bundles the context with the external collaborators a
//! filter or attribute may call.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use discovery_core::DiscoveryConfig;

use crate::error::{DiscoveryError, DiscoveryResult, StoreError};
use crate::store::{CaseStore, CentralRepository, FileRow, StoreResult, StoreRow};

#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    cancelled: Arc<AtomicBool>,
    interrupt: Option<Arc<AtomicBool>>,
}

impl SearchContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context that also observes an externally owned interrupt flag.
    #[must_use]
    pub fn with_interrupt(interrupt: Arc<AtomicBool>) -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            interrupt: Some(interrupt),
        }
    }

    /// Request cancellation. Every clone of this context observes it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
            || self
                .interrupt
                .as_ref()
                .is_some_and(|flag| flag.load(Ordering::Acquire))
    }

    /// Return `Err(Cancelled)` if cancellation was requested.
    pub fn check(&self, stage: &'static str) -> DiscoveryResult<()> {
        if self.is_cancelled() {
            tracing::debug!(stage, "search cancelled");
            return Err(DiscoveryError::Cancelled { stage });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SearchEnv
// ---------------------------------------------------------------------------

/// Borrowed view of everything one search step may touch.
#[derive(Clone, Copy)]
pub struct SearchEnv<'a> {
    pub store: &'a dyn CaseStore,
    pub central_repo: Option<&'a dyn CentralRepository>,
    pub config: &'a DiscoveryConfig,
    pub context: &'a SearchContext,
}

impl<'a> SearchEnv<'a> {
    #[must_use]
    pub const fn new(
        store: &'a dyn CaseStore,
        central_repo: Option<&'a dyn CentralRepository>,
        config: &'a DiscoveryConfig,
        context: &'a SearchContext,
    ) -> Self {
        Self {
            store,
            central_repo,
            config,
            context,
        }
    }

    /// Central repository, or `MissingCentralRepository` naming `context`.
    pub fn require_central_repo(
        &self,
        context: &'static str,
    ) -> DiscoveryResult<&'a dyn CentralRepository> {
        self.central_repo
            .ok_or(DiscoveryError::MissingCentralRepository { context })
    }

    /// Stream the files matching `where_clause` to `on_row`.
    ///
    /// Cancellation is checked before every row and stops the scan. Returns
    /// the number of rows seen.
    pub fn find_files<F>(&self, label: &'static str, where_clause: &str, mut on_row: F) -> DiscoveryResult<usize>
    where
        F: FnMut(FileRow),
    {
        let mut cancelled = false;
        let mut rows = 0_usize;
        let outcome = self.store.find_files_where(where_clause, &mut |row| {
            if self.context.is_cancelled() {
                cancelled = true;
                return ControlFlow::Break(());
            }
            rows += 1;
            on_row(row);
            ControlFlow::Continue(())
        });
        if cancelled {
            tracing::debug!(stage = label, rows, "file query interrupted");
            return Err(DiscoveryError::Cancelled { stage: label });
        }
        outcome.map_err(|err| DiscoveryError::store(label, err))?;
        Ok(rows)
    }

    /// Run a raw select, feeding each row to `on_row`.
    ///
    /// Cancellation is checked before every row and stops the scan. A row
    /// that fails to decode does not stop the scan: the first such error is
    /// kept and returned once every row has been consumed. Returns the number
    /// of rows seen.
    pub fn select<F>(&self, label: &'static str, query: &str, mut on_row: F) -> DiscoveryResult<usize>
    where
        F: FnMut(&StoreRow) -> StoreResult<()>,
    {
        let mut row_error: Option<StoreError> = None;
        let mut cancelled = false;
        let mut rows = 0_usize;
        let outcome = self.store.select(query, &mut |row| {
            if self.context.is_cancelled() {
                cancelled = true;
                return ControlFlow::Break(());
            }
            rows += 1;
            if let Err(err) = on_row(row) {
                row_error.get_or_insert(err);
            }
            ControlFlow::Continue(())
        });
        if cancelled {
            tracing::debug!(stage = label, rows, "select interrupted");
            return Err(DiscoveryError::Cancelled { stage: label });
        }
        outcome.map_err(|err| DiscoveryError::store(label, err))?;
        if let Some(err) = row_error {
            return Err(DiscoveryError::store(label, err));
        }
        Ok(rows)
    }
}

impl std::fmt::Debug for SearchEnv<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEnv")
            .field("central_repo", &self.central_repo.is_some())
            .field("context", self.context)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_not_cancelled() {
        let ctx = SearchContext::new();
        assert!(!ctx.is_cancelled());
        assert!(ctx.check("query").is_ok());
    }

    #[test]
    fn cancel_is_visible_through_clones() {
        let ctx = SearchContext::new();
        let clone = ctx.clone();
        ctx.cancel();
        let err = clone.check("grouping").unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn interrupt_flag_counts_as_cancellation() {
        let flag = Arc::new(AtomicBool::new(false));
        let ctx = SearchContext::with_interrupt(Arc::clone(&flag));
        assert!(!ctx.is_cancelled());
        flag.store(true, Ordering::SeqCst);
        assert!(ctx.is_cancelled());
    }
}
