//! Periodic cache warm-up.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::ProcurementService;
use crate::models::{GrantQuery, GrantSource};
use crate::search::SearchIndex;

/// Refetch every source on a fixed interval and reindex the automatic tenders.
pub fn spawn_refresh_task(
    service: Arc<ProcurementService>,
    search: Arc<SearchIndex>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let today = Utc::now().date_naive();

            let batch = service.fetch_tenders(None, true, today).await;
            if let Err(e) = search.replace_automatic(&batch.tenders).await {
                tracing::warn!("Failed to reindex tenders after refresh: {}", e);
            }

            let grant_query = GrantQuery {
                refresh: Some(true),
                ..Default::default()
            };
            let grants = service
                .fetch_grants(&GrantSource::ALL, &grant_query, today)
                .await;

            let cached = service.upstream().cache().len().await;
            tracing::info!(
                tenders = batch.tenders.len(),
                grants = grants.grants.len(),
                indexed = search.len(),
                cached,
                "scheduled refresh complete"
            );
        }
    })
}
