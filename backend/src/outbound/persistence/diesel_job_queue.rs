//! PostgreSQL-backed fulfillment queue.
//!
//! Jobs live in `fulfillment_jobs`. Claiming bumps `attempts` and leases the
//! row until `locked_until`; concurrent consumers skip leased and locked
//! rows, so a job is processed by one consumer at a time. A consumer that
//! dies mid-job lets the lease lapse and the job becomes claimable again.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Double};
use diesel_async::RunQueryDsl;
use tracing::warn;

use crate::domain::ports::{
    FulfillmentJob, JobId, JobQueue, JobQueueError, JobSource, QueuedJob,
};

use super::error_mapping::{map_diesel_error, map_pool_error};
use super::models::{ClaimedJobRow, NewJobRow};
use super::pool::DbPool;
use super::schema::fulfillment_jobs;

const CLAIM_SQL: &str = "\
UPDATE fulfillment_jobs
SET attempts = attempts + 1,
    locked_until = now() + make_interval(secs => $2)
WHERE id IN (
    SELECT id FROM fulfillment_jobs
    WHERE available_at <= now()
      AND (locked_until IS NULL OR locked_until <= now())
    ORDER BY id
    LIMIT $1
    FOR UPDATE SKIP LOCKED
)
RETURNING id, payload, attempts";

/// Default time a claimed job stays invisible to other consumers.
const DEFAULT_LEASE: Duration = Duration::from_secs(15 * 60);

#[derive(Clone)]
pub struct DieselJobQueue {
    pool: DbPool,
    lease: Duration,
}

impl DieselJobQueue {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            lease: DEFAULT_LEASE,
        }
    }

    /// Override the claim lease. It must outlast the slowest job.
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }
}

fn map_error(error: diesel::result::Error) -> JobQueueError {
    map_diesel_error(error, JobQueueError::rejected, JobQueueError::unavailable)
}

fn decode(row: &ClaimedJobRow) -> Result<QueuedJob, JobQueueError> {
    let job: FulfillmentJob = serde_json::from_value(row.payload.clone())
        .map_err(|err| JobQueueError::decode(err.to_string()))?;
    Ok(QueuedJob {
        id: JobId::new(row.id),
        attempts: u32::try_from(row.attempts).unwrap_or(0),
        job,
    })
}

#[async_trait]
impl JobQueue for DieselJobQueue {
    async fn enqueue(&self, job: &FulfillmentJob) -> Result<(), JobQueueError> {
        let payload =
            serde_json::to_value(job).map_err(|err| JobQueueError::decode(err.to_string()))?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, JobQueueError::unavailable))?;

        diesel::insert_into(fulfillment_jobs::table)
            .values(&NewJobRow { payload })
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_error)
    }
}

#[async_trait]
impl JobSource for DieselJobQueue {
    async fn claim_batch(&self, max: usize) -> Result<Vec<QueuedJob>, JobQueueError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, JobQueueError::unavailable))?;
        let limit = i64::try_from(max).unwrap_or(i64::MAX);

        let rows: Vec<ClaimedJobRow> = diesel::sql_query(CLAIM_SQL)
            .bind::<BigInt, _>(limit)
            .bind::<Double, _>(self.lease.as_secs_f64())
            .load(&mut conn)
            .await
            .map_err(map_error)?;

        let mut jobs = Vec::with_capacity(rows.len());
        for row in rows {
            match decode(&row) {
                Ok(job) => jobs.push(job),
                Err(error) => {
                    // Undecodable payloads would be redelivered forever.
                    warn!(job_id = row.id, error = %error, "dropping undecodable fulfillment job");
                    diesel::delete(fulfillment_jobs::table.filter(fulfillment_jobs::id.eq(row.id)))
                        .execute(&mut conn)
                        .await
                        .map_err(map_error)?;
                }
            }
        }
        jobs.sort_by_key(|job| job.id);
        Ok(jobs)
    }

    async fn acknowledge(&self, id: JobId) -> Result<(), JobQueueError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, JobQueueError::unavailable))?;

        diesel::delete(fulfillment_jobs::table.filter(fulfillment_jobs::id.eq(id.as_i64())))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_error)
    }

    async fn release(&self, id: JobId, delay: Duration) -> Result<(), JobQueueError> {
        let delay = TimeDelta::from_std(delay)
            .map_err(|err| JobQueueError::rejected(format!("release delay: {err}")))?;
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, JobQueueError::unavailable))?;

        diesel::update(fulfillment_jobs::table.filter(fulfillment_jobs::id.eq(id.as_i64())))
            .set((
                fulfillment_jobs::locked_until.eq(None::<chrono::DateTime<Utc>>),
                fulfillment_jobs::available_at.eq(Utc::now() + delay),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_error)
    }
}
