//! Vote-store connectivity and the aggregation query.
//!
//! The pool is acquired once at startup behind a bounded fixed-interval
//! retry loop; the store being briefly unavailable while containers come up
//! is expected, not alarming.

use crate::error::{Result, TallycastError};
use crate::poller::VoteSource;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;

/// One row of the aggregation result.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoteRow {
    pub label: String,
    pub count: i64,
}

const VOTE_QUERY: &str = "SELECT vote AS label, COUNT(id) AS count FROM votes GROUP BY vote";

/// Connect to the vote store, retrying on a fixed interval up to
/// `max_attempts` times. Fatal after exhaustion: the service has nothing to
/// offer without a store handle.
pub async fn connect_with_retry(
    url: &str,
    max_attempts: u32,
    interval: Duration,
) -> Result<PgPool> {
    let pool = retry(max_attempts, interval, || {
        PgPoolOptions::new().max_connections(5).connect(url)
    })
    .await?;

    tracing::info!("connected to vote store");
    Ok(pool)
}

/// Run `op` until it succeeds or `max_attempts` is exhausted, sleeping
/// `interval` between attempts.
async fn retry<T, F, Fut>(max_attempts: u32, interval: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let max_attempts = max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                tracing::warn!(attempt, max_attempts, error = %e, "waiting for vote store");
                if attempt < max_attempts {
                    tokio::time::sleep(interval).await;
                }
            },
        }
    }

    Err(TallycastError::StoreUnavailable {
        attempts: max_attempts,
    })
}

/// The production [`VoteSource`]: issues the aggregation query against the
/// live pool.
#[derive(Clone)]
pub struct PgVoteSource {
    pool: PgPool,
}

impl PgVoteSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl VoteSource for PgVoteSource {
    async fn fetch_counts(&self) -> Result<Vec<VoteRow>> {
        let rows = sqlx::query_as::<_, VoteRow>(VOTE_QUERY)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
