//! Synchronization of pending sessions.
//!
//! Runs when connectivity comes back: every session still flagged `pending`
//! is handed to the remote side and, once accepted, flagged `synced`. Items
//! are processed independently; one failure never blocks the rest.

use std::future::Future;

use serde::Serialize;

use crate::domain::{FeedingSession, Result, SyncStatus};
use crate::infrastructure::SessionStore;

/// Remote side a pending session is reconciled with.
pub trait RemoteSync {
    /// Delivers one session. Returning `Ok` lets the session be marked synced.
    fn push(&self, session: &FeedingSession) -> impl Future<Output = Result<()>>;
}

/// No remote endpoint: sessions are only marked synced locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOnlySync;

impl RemoteSync for LocalOnlySync {
    async fn push(&self, session: &FeedingSession) -> Result<()> {
        tracing::debug!(id = session.id, "No remote configured, marking synced locally");
        Ok(())
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Sessions found pending when the run started.
    pub pending: usize,
    /// Sessions now flagged synced.
    pub synced: usize,
    /// Sessions left pending after a failure.
    pub failed: usize,
}

/// Service flipping pending sessions to synced.
pub struct SyncService<R = LocalOnlySync> {
    store: SessionStore,
    remote: R,
}

impl<R: RemoteSync> SyncService<R> {
    #[must_use]
    pub const fn new(store: SessionStore, remote: R) -> Self {
        Self { store, remote }
    }

    /// Syncs every pending session.
    ///
    /// # Errors
    /// Returns error only if the pending sessions cannot be listed; per-session
    /// failures are logged and counted in the report.
    pub async fn sync_pending(&self) -> Result<SyncReport> {
        let pending = self.store.get_by_status(SyncStatus::Pending).await?;
        let mut report = SyncReport {
            pending: pending.len(),
            ..SyncReport::default()
        };

        if pending.is_empty() {
            tracing::debug!("Nothing to sync");
            return Ok(report);
        }

        for session in pending {
            let id = session.id;
            match self.sync_one(session).await {
                Ok(()) => report.synced += 1,
                Err(e) => {
                    tracing::warn!(id, error = %e, "Sync failed, session stays pending");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            synced = report.synced,
            failed = report.failed,
            "Sync completed"
        );

        Ok(report)
    }

    async fn sync_one(&self, session: FeedingSession) -> Result<()> {
        self.remote.push(&session).await?;
        self.store.update(&session.synced()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AppError, NewSession};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tempfile::{tempdir, TempDir};

    struct RejectingRemote {
        reject_id: i64,
    }

    impl RemoteSync for RejectingRemote {
        async fn push(&self, session: &FeedingSession) -> Result<()> {
            if session.id == self.reject_id {
                return Err(AppError::Sync {
                    message: "remote refused".into(),
                });
            }
            Ok(())
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap()
    }

    async fn store_with(statuses: &[SyncStatus]) -> (TempDir, SessionStore, Vec<FeedingSession>) {
        let dir = tempdir().unwrap();
        let store = SessionStore::open(&dir.path().join("feedings.db"))
            .await
            .unwrap();

        let mut saved = Vec::new();
        for (i, status) in statuses.iter().enumerate() {
            let start = t0() + Duration::hours(i64::try_from(i).unwrap());
            let session = NewSession::new(start, start + Duration::seconds(90), 120, *status).unwrap();
            saved.push(store.insert(session).await.unwrap());
        }

        (dir, store, saved)
    }

    #[tokio::test]
    async fn test_pending_session_becomes_synced() {
        let (_dir, store, saved) = store_with(&[SyncStatus::Pending]).await;
        let service = SyncService::new(store.clone(), LocalOnlySync);

        let report = service.sync_pending().await.unwrap();
        assert_eq!(
            report,
            SyncReport {
                pending: 1,
                synced: 1,
                failed: 0
            }
        );

        let all = store.get_all().await.unwrap();
        assert_eq!(all, vec![saved[0].clone().synced()]);
    }

    #[tokio::test]
    async fn test_synced_sessions_are_left_alone() {
        let (_dir, store, _) = store_with(&[SyncStatus::Synced, SyncStatus::Synced]).await;
        let service = SyncService::new(store, LocalOnlySync);

        let report = service.sync_pending().await.unwrap();
        assert_eq!(report, SyncReport::default());
    }

    #[tokio::test]
    async fn test_one_failure_does_not_block_others() {
        let (_dir, store, saved) = store_with(&[
            SyncStatus::Pending,
            SyncStatus::Pending,
            SyncStatus::Pending,
        ])
        .await;
        let service = SyncService::new(
            store.clone(),
            RejectingRemote {
                reject_id: saved[1].id,
            },
        );

        let report = service.sync_pending().await.unwrap();
        assert_eq!(report.pending, 3);
        assert_eq!(report.synced, 2);
        assert_eq!(report.failed, 1);

        let still_pending = store.get_by_status(SyncStatus::Pending).await.unwrap();
        assert_eq!(still_pending, vec![saved[1].clone()]);
    }
}
