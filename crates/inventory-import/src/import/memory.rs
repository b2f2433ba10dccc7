//! In-memory stores
//!
//! Used by the embedded `run` mode when no durable queue is wanted and by the
//! test suite. All state sits behind a single mutex per store so that every
//! trait method is atomic.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use inventory_common::text::bounded_error_message;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use super::store::{ErrorStore, ImportStores, JobStore, ProductStore};
use super::types::{ImportError, ImportJob, JobCounters, JobStatus, NewImportError, NewProduct};

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| anyhow!("{} lock poisoned", what))
}

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: Mutex<HashMap<Uuid, ImportJob>>,
    progress_outage: AtomicBool,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage; progress updates fail while unavailable
    pub fn set_progress_available(&self, available: bool) {
        self.progress_outage.store(!available, Ordering::SeqCst);
    }

    fn update<R>(&self, job_id: Uuid, f: impl FnOnce(&mut ImportJob) -> R) -> Result<R> {
        self.try_update(job_id, f)?
            .ok_or_else(|| anyhow!("Import job {} not found", job_id))
    }

    /// Conditional transitions report an unknown job as "not applied"
    fn try_update<R>(
        &self,
        job_id: Uuid,
        f: impl FnOnce(&mut ImportJob) -> R,
    ) -> Result<Option<R>> {
        let mut jobs = lock(&self.jobs, "job store")?;
        Ok(jobs.get_mut(&job_id).map(f))
    }

    /// Flip a processing job to a terminal status
    fn finish(
        &self,
        job_id: Uuid,
        status: JobStatus,
        reason: Option<&str>,
    ) -> Result<bool> {
        self.try_update(job_id, |job| {
            if job.status != JobStatus::Processing {
                return false;
            }
            job.status = status;
            job.end_time = Some(Utc::now());
            job.failure_reason = reason.map(bounded_error_message);
            true
        })
        .map(|applied| applied.unwrap_or(false))
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_job(&self, job: &ImportJob) -> Result<()> {
        let mut jobs = lock(&self.jobs, "job store")?;
        if jobs.contains_key(&job.id) {
            bail!("Import job {} already exists", job.id);
        }
        jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn get_job(&self, job_id: Uuid) -> Result<Option<ImportJob>> {
        Ok(lock(&self.jobs, "job store")?.get(&job_id).cloned())
    }

    async fn finalize_total_rows(&self, job_id: Uuid, total_rows: i64) -> Result<bool> {
        self.try_update(job_id, |job| match job.total_rows {
            Some(_) => false,
            None => {
                job.total_rows = Some(total_rows);
                true
            },
        })
        .map(|applied| applied.unwrap_or(false))
    }

    async fn increment_progress(
        &self,
        job_id: Uuid,
        processed: i64,
        failed: i64,
    ) -> Result<JobCounters> {
        if self.progress_outage.load(Ordering::SeqCst) {
            bail!("job store unavailable");
        }
        self.update(job_id, |job| {
            job.processed_rows += processed;
            job.failed_rows += failed;
            JobCounters {
                total_rows: job.total_rows,
                processed_rows: job.processed_rows,
                failed_rows: job.failed_rows,
            }
        })
    }

    async fn complete_if_done(&self, job_id: Uuid) -> Result<bool> {
        self.try_update(job_id, |job| {
            if !job.is_ready_to_complete() {
                return false;
            }
            job.status = JobStatus::Completed;
            job.end_time = Some(Utc::now());
            true
        })
        .map(|applied| applied.unwrap_or(false))
    }

    async fn fail_job(&self, job_id: Uuid, reason: &str) -> Result<bool> {
        self.finish(job_id, JobStatus::Failed, Some(reason))
    }

    async fn cancel_job(&self, job_id: Uuid) -> Result<bool> {
        self.finish(job_id, JobStatus::Cancelled, None)
    }
}

#[derive(Debug)]
pub struct MemoryErrorStore {
    errors: Mutex<Vec<ImportError>>,
    available: AtomicBool,
}

impl Default for MemoryErrorStore {
    fn default() -> Self {
        Self {
            errors: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
        }
    }
}

impl MemoryErrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage; saves fail while unavailable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl ErrorStore for MemoryErrorStore {
    async fn save_errors(&self, errors: &[NewImportError]) -> Result<()> {
        if !self.available.load(Ordering::SeqCst) {
            bail!("error store unavailable");
        }
        let mut stored = lock(&self.errors, "error store")?;
        let now = Utc::now();
        for error in errors {
            let id = stored.len() as i64 + 1;
            stored.push(ImportError {
                id,
                job_id: error.job_id,
                row_number: error.row_number,
                error_message: error.error_message.clone(),
                row_data: error.row_data.clone(),
                created_at: now,
            });
        }
        Ok(())
    }

    async fn list_errors(
        &self,
        job_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ImportError>> {
        let stored = lock(&self.errors, "error store")?;
        Ok(stored
            .iter()
            .filter(|e| e.job_id == job_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_errors(&self, job_id: Uuid) -> Result<i64> {
        let stored = lock(&self.errors, "error store")?;
        Ok(stored.iter().filter(|e| e.job_id == job_id).count() as i64)
    }
}

/// Product table with a unique constraint on `internal_id`
#[derive(Debug)]
pub struct MemoryProductStore {
    products: Mutex<Vec<NewProduct>>,
    available: AtomicBool,
    batch_calls: AtomicUsize,
}

impl Default for MemoryProductStore {
    fn default() -> Self {
        Self {
            products: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            batch_calls: AtomicUsize::new(0),
        }
    }
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage; inserts fail while unavailable
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.products.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, internal_id: &str) -> bool {
        self.products
            .lock()
            .map(|p| p.iter().any(|x| x.internal_id == internal_id))
            .unwrap_or(false)
    }

    /// Number of bulk insert attempts, successful or not
    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn ensure_available(&self) -> Result<()> {
        if !self.available.load(Ordering::SeqCst) {
            bail!("product store unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn insert_batch(&self, products: &[NewProduct]) -> Result<()> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.ensure_available()?;

        let mut stored = lock(&self.products, "product store")?;
        let mut seen: HashSet<&str> = stored.iter().map(|p| p.internal_id.as_str()).collect();
        for product in products {
            if !seen.insert(product.internal_id.as_str()) {
                bail!(
                    "duplicate key value violates unique constraint: internal_id '{}'",
                    product.internal_id
                );
            }
        }
        drop(seen);
        stored.extend(products.iter().cloned());
        Ok(())
    }

    async fn insert_one(&self, product: &NewProduct) -> Result<()> {
        self.ensure_available()?;

        let mut stored = lock(&self.products, "product store")?;
        if stored.iter().any(|p| p.internal_id == product.internal_id) {
            bail!(
                "duplicate key value violates unique constraint: internal_id '{}'",
                product.internal_id
            );
        }
        stored.push(product.clone());
        Ok(())
    }
}

/// Concrete in-memory stores, kept typed so callers can inspect them
#[derive(Clone, Default)]
pub struct MemoryStores {
    pub jobs: Arc<MemoryJobStore>,
    pub errors: Arc<MemoryErrorStore>,
    pub products: Arc<MemoryProductStore>,
}

impl MemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stores(&self) -> ImportStores {
        ImportStores {
            jobs: self.jobs.clone(),
            errors: self.errors.clone(),
            products: self.products.clone(),
        }
    }
}
