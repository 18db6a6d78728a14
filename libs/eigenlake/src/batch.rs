//! Buffered bulk ingestion
//!
//! A [`BatchWriter`] buffers records client-side and submits them in groups of
//! `batch_size` through a [`BulkInsert`] operation. Per-item failures reported by
//! the service, and whole-flush failures, are accumulated for the lifetime of the
//! writer so callers inspect them once at the end instead of per insert.
//!
//! ```text
//! OPEN ──add──▶ buffer ──(len == batch_size)──▶ flush ──▶ bulk insert
//!   │                                                        │
//!   └──────────close: final flush──▶ CLOSED ◀── failures ────┘
//! ```

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{EigenlakeError, EigenlakeResult};
use crate::models::{
    AddManyOptions, AddManyResult, FailedRecord, NewRecord, OnDuplicate, OnError, Properties,
};

pub const DEFAULT_BATCH_SIZE: usize = 200;

/// One bulk-insert request: ordered records in, accepted ids and per-item failures out
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BulkInsert: Send + Sync {
    async fn add_many(
        &self,
        records: Vec<NewRecord>,
        options: AddManyOptions,
    ) -> EigenlakeResult<AddManyResult>;
}

/// Writer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Records per flush, at least 1
    pub batch_size: usize,
    /// Parallelism hint forwarded to the bulk insert, at least 1
    pub max_concurrency: usize,
    /// Whether a whole-flush failure is returned or only recorded
    pub on_error: OnError,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: 1,
            on_error: OnError::Continue,
        }
    }
}

impl BatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    pub fn with_max_concurrency(mut self, count: usize) -> Self {
        self.max_concurrency = count.max(1);
        self
    }

    pub fn with_on_error(mut self, on_error: OnError) -> Self {
        self.on_error = on_error;
        self
    }

    fn coerced(self) -> Self {
        Self {
            batch_size: self.batch_size.max(1),
            max_concurrency: self.max_concurrency.max(1),
            on_error: self.on_error,
        }
    }
}

/// Final, read-only result of a closed writer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub failed_records: Vec<FailedRecord>,
    pub flushes: usize,
}

impl BatchSummary {
    pub fn number_errors(&self) -> usize {
        self.failed_records.len()
    }
}

pub struct BatchWriter<I: BulkInsert> {
    inserter: I,
    options: BatchOptions,
    buffer: Vec<NewRecord>,
    failed_records: Vec<FailedRecord>,
    flushes: usize,
    closed: bool,
}

impl<I: BulkInsert> BatchWriter<I> {
    pub fn new(inserter: I, options: BatchOptions) -> Self {
        let options = options.coerced();
        Self {
            inserter,
            buffer: Vec::with_capacity(options.batch_size),
            options,
            failed_records: Vec::new(),
            flushes: 0,
            closed: false,
        }
    }

    pub fn options(&self) -> BatchOptions {
        self.options
    }

    /// Records buffered and not yet flushed
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn number_errors(&self) -> usize {
        self.failed_records.len()
    }

    pub fn failed_records(&self) -> &[FailedRecord] {
        &self.failed_records
    }

    /// Buffer one record and return its id, generating one when `id` is `None`.
    ///
    /// The id means "accepted for a future flush", not "stored": a later flush may
    /// still report it in [`failed_records`](Self::failed_records). Flushes once the
    /// buffer reaches `batch_size`; under [`OnError::Raise`] that flush's failure is
    /// returned here.
    pub async fn add(
        &mut self,
        properties: Properties,
        vector: Vec<f32>,
        id: Option<String>,
    ) -> EigenlakeResult<String> {
        if self.closed {
            return Err(EigenlakeError::Validation(
                "batch writer is closed".to_string(),
            ));
        }
        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        self.buffer.push(NewRecord {
            id: Some(id.clone()),
            properties,
            vector,
        });

        if self.buffer.len() >= self.options.batch_size {
            self.flush().await?;
        }
        Ok(id)
    }

    /// Submit the whole buffer as one bulk insert. No-op when the buffer is empty.
    pub async fn flush(&mut self) -> EigenlakeResult<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let records = std::mem::replace(
            &mut self.buffer,
            Vec::with_capacity(self.options.batch_size),
        );
        let ids: Vec<String> = records
            .iter()
            .map(|r| r.id.clone().unwrap_or_default())
            .collect();
        self.flushes += 1;

        let options = AddManyOptions {
            on_duplicate: OnDuplicate::Error,
            on_error: OnError::Continue,
            batch_size: self.options.batch_size,
            max_workers: self.options.max_concurrency,
        };

        debug!(flush = self.flushes, count = ids.len(), "Flushing batch");
        match self.inserter.add_many(records, options).await {
            Ok(result) => {
                if result.number_errors() > 0 {
                    debug!(
                        flush = self.flushes,
                        failed = result.number_errors(),
                        "Batch partially failed"
                    );
                }
                self.failed_records.extend(result.failed_records);
                Ok(())
            }
            Err(err) => {
                let reason = err.detail().to_string();
                self.failed_records.extend(
                    ids.into_iter()
                        .map(|id| FailedRecord::new(id, reason.clone())),
                );
                match self.options.on_error {
                    OnError::Raise => Err(err),
                    OnError::Continue => {
                        warn!(flush = self.flushes, error = %err, "Batch failed, continuing");
                        Ok(())
                    }
                }
            }
        }
    }

    /// Flush what is left and hand back the accumulated failures.
    ///
    /// The writer rejects further adds afterwards. When the final flush fails under
    /// [`OnError::Raise`], its records are still listed in
    /// [`failed_records`](Self::failed_records).
    pub async fn close(&mut self) -> EigenlakeResult<BatchSummary> {
        self.closed = true;
        self.flush().await?;
        Ok(self.summary())
    }

    fn summary(&self) -> BatchSummary {
        let summary = BatchSummary {
            failed_records: self.failed_records.clone(),
            flushes: self.flushes,
        };
        info!(
            flushes = summary.flushes,
            failed = summary.number_errors(),
            "Batch writer closed"
        );
        summary
    }
}

impl<I: BulkInsert> Drop for BatchWriter<I> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            warn!(
                pending = self.buffer.len(),
                "Batch writer dropped with unflushed records"
            );
        }
    }
}

/// Entry point for batched ingestion into one index
pub struct IndexBatch<I: BulkInsert + Clone> {
    inserter: I,
    failed_records: Vec<FailedRecord>,
}

impl<I: BulkInsert + Clone> IndexBatch<I> {
    pub fn new(inserter: I) -> Self {
        Self {
            inserter,
            failed_records: Vec::new(),
        }
    }

    /// A writer the caller must [`close`](BatchWriter::close) explicitly
    pub fn with_size(&self, options: BatchOptions) -> BatchWriter<I> {
        BatchWriter::new(self.inserter.clone(), options)
    }

    /// Failures of the most recent [`run`](Self::run)
    pub fn failed_records(&self) -> &[FailedRecord] {
        &self.failed_records
    }

    /// Run `body` against a fresh writer, then always perform the final flush,
    /// even when `body` fails.
    ///
    /// A failing final flush takes precedence over the body's error.
    pub async fn run<T, F>(&mut self, options: BatchOptions, body: F) -> EigenlakeResult<T>
    where
        F: for<'w> FnOnce(&'w mut BatchWriter<I>) -> BoxFuture<'w, EigenlakeResult<T>>,
    {
        let mut writer = self.with_size(options);
        let outcome = body(&mut writer).await;

        let closed = writer.close().await;
        self.failed_records = std::mem::take(&mut writer.failed_records);

        closed?;
        outcome
    }
}
