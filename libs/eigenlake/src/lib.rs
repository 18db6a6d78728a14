//! Eigenlake client library
//!
//! Async client for the Eigenlake vector-indexing service.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐      ┌──────────────────┐
//! │ EigenlakeClient  │      │   BatchWriter    │ ← buffered ingestion
//! │  └ Indexes       │      └────────┬─────────┘
//! │     └ IndexHandle│               │ BulkInsert (insert-many)
//! │        records / search / settings / manage
//! └────────┬─────────┘               │
//!          │ one request per operation
//! ┌────────▼─────────────────────────▼─┐
//! │ Transport (auth, timeout, retries) │
//! └────────────────┬───────────────────┘
//!                  │ EigenlakeError
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use eigenlake::{BatchOptions, ClientConfig, EigenlakeClient, OnError};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = EigenlakeClient::new(ClientConfig::local("http://localhost", 8000))?;
//! let index = client.indexes().open("docs", "articles").await?;
//!
//! let mut writer = index
//!     .batch()
//!     .with_size(BatchOptions::new().with_batch_size(100).with_on_error(OnError::Continue));
//! let props = json!({"title": "hello"}).as_object().cloned().unwrap_or_default();
//! writer.add(props, vec![0.1, 0.2, 0.3], None).await?;
//! let summary = writer.close().await?;
//! println!("{} records failed", summary.number_errors());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod index;
pub mod models;
pub mod transport;

pub use batch::{BatchOptions, BatchSummary, BatchWriter, BulkInsert, IndexBatch};
pub use client::{CreateIndex, EigenlakeClient, Indexes};
pub use config::{ApiKey, ClientConfig};
pub use error::{EigenlakeError, EigenlakeResult, ErrorKind};
pub use index::{
    IndexHandle, IndexManage, IndexRecords, IndexSearch, IndexSettings, ListByFilter, ListObjects,
    RemoveByFilter, RemoveMany,
};
pub use models::{
    AddManyOptions, AddManyResult, FailedRecord, IndexConfig, NewRecord, ObjectPage, OnDuplicate,
    OnError, OnMissing, Properties, VectorItem,
};
pub use transport::{Response, Transport};
