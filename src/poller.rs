//! The aggregation poll loop.
//!
//! One query per cycle, one broadcast per successful query. The next cycle is
//! scheduled from the completion of the current one, never from a wall-clock
//! grid, so a slow store stretches the cadence instead of stacking queries.

use crate::db::VoteRow;
use crate::error::Result;
use crate::tally::VoteTally;
use crate::web::broadcast::Broadcaster;
use std::time::Duration;
use tokio::sync::watch;

/// Source of aggregate vote counts. The production implementation is
/// [`crate::db::PgVoteSource`]; tests script their own.
pub trait VoteSource {
    fn fetch_counts(&self) -> impl std::future::Future<Output = Result<Vec<VoteRow>>> + Send;
}

/// Polls a [`VoteSource`] forever, handing each fresh tally to the
/// broadcaster. A failed query logs and skips that cycle's broadcast; the
/// loop itself only stops when the shutdown signal fires.
pub struct TallyPoller<S> {
    source: S,
    broadcaster: Broadcaster,
    interval: Duration,
    seed_labels: Vec<String>,
}

impl<S: VoteSource> TallyPoller<S> {
    pub fn new(
        source: S,
        broadcaster: Broadcaster,
        interval: Duration,
        seed_labels: Vec<String>,
    ) -> Self {
        Self {
            source,
            broadcaster,
            interval,
            seed_labels,
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "tally poller started");

        loop {
            match self.source.fetch_counts().await {
                Ok(rows) => {
                    let tally = VoteTally::from_rows(
                        &self.seed_labels,
                        rows.into_iter().map(|row| (row.label, row.count)),
                    );
                    tracing::debug!(categories = tally.len(), "broadcasting tally");
                    if let Err(e) = self.broadcaster.broadcast_scores(&tally).await {
                        tracing::warn!(error = %e, "failed to encode tally");
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "tally query failed, skipping this cycle");
                },
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = shutdown.changed() => {
                    tracing::info!("tally poller stopping");
                    break;
                },
            }
        }
    }
}
