use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{encode_segment, IndexHandle};
use crate::batch::BulkInsert;
use crate::error::EigenlakeResult;
use crate::models::{
    AddManyOptions, AddManyResult, NewRecord, OnDuplicate, OnError, OnMissing, Properties,
    VectorItem,
};

const DEFAULT_BATCH_SIZE: usize = 500;

#[derive(Debug, Serialize)]
struct InsertRequest<'a> {
    properties: &'a Properties,
    vector: &'a [f32],
    uuid: Option<&'a str>,
    on_duplicate: OnDuplicate,
    batch_size: usize,
    max_workers: usize,
}

#[derive(Debug, Deserialize)]
struct InsertResponse {
    uuid: String,
}

#[derive(Debug, Serialize)]
struct InsertManyRequest<'a> {
    objects: &'a [NewRecord],
    on_duplicate: OnDuplicate,
    on_error: OnError,
    batch_size: usize,
    max_workers: usize,
}

#[derive(Debug, Serialize)]
struct InsertVectorsRequest<'a> {
    vectors: &'a [VectorItem],
    batch_size: usize,
    max_workers: usize,
}

#[derive(Debug, Serialize)]
struct GetByIdRequest<'a> {
    uuid: &'a str,
    return_data: bool,
    return_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct GetByIdResponse {
    #[serde(default)]
    object: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ExistsResponse {
    #[serde(default)]
    exists: bool,
}

#[derive(Debug, Serialize)]
struct PartialRecord<'a> {
    properties: Option<&'a Properties>,
    vector: Option<&'a [f32]>,
}

/// Filtered bulk delete
#[derive(Debug, Clone, Serialize)]
pub struct RemoveMany {
    #[serde(rename = "where")]
    pub filter: Value,
    pub limit: Option<u64>,
    #[serde(rename = "delete_patent_rows")]
    pub delete_sql_rows: bool,
    #[serde(rename = "on_missing_keys")]
    pub on_missing: OnMissing,
    pub batch_size: usize,
    pub background: bool,
}

impl RemoveMany {
    pub fn new(filter: Value) -> Self {
        Self {
            filter,
            limit: None,
            delete_sql_rows: false,
            on_missing: OnMissing::Skip,
            batch_size: DEFAULT_BATCH_SIZE,
            background: true,
        }
    }
}

/// Filtered listing with keyset pagination via `after`
#[derive(Debug, Clone, Serialize)]
pub struct ListByFilter {
    #[serde(rename = "where")]
    pub filter: Value,
    pub limit: u32,
    pub after: Option<String>,
    #[serde(rename = "include_vector")]
    pub with_vector: bool,
    #[serde(rename = "include_properties")]
    pub with_properties: bool,
    #[serde(rename = "on_missing_keys")]
    pub on_missing: OnMissing,
}

impl ListByFilter {
    pub fn new(filter: Value) -> Self {
        Self {
            filter,
            limit: 100,
            after: None,
            with_vector: false,
            with_properties: true,
            on_missing: OnMissing::Skip,
        }
    }
}

/// Record-level CRUD on one index
#[derive(Debug, Clone)]
pub struct IndexRecords {
    handle: IndexHandle,
}

impl IndexRecords {
    pub(crate) fn new(handle: IndexHandle) -> Self {
        Self { handle }
    }

    /// Insert one record and return the id the service assigned or kept
    pub async fn add(&self, record: &NewRecord, on_duplicate: OnDuplicate) -> EigenlakeResult<String> {
        let request = InsertRequest {
            properties: &record.properties,
            vector: &record.vector,
            uuid: record.id.as_deref(),
            on_duplicate,
            batch_size: DEFAULT_BATCH_SIZE,
            max_workers: 1,
        };
        let response: InsertResponse = self
            .handle
            .transport()
            .post(&self.handle.sub_path("data/insert"), &request)
            .await?
            .json()?;
        Ok(response.uuid)
    }

    /// Insert many records in one request; per-item failures come back in the result
    pub async fn add_many(
        &self,
        records: &[NewRecord],
        options: AddManyOptions,
    ) -> EigenlakeResult<AddManyResult> {
        debug!(count = records.len(), on_error = %options.on_error, "Inserting records");
        let request = InsertManyRequest {
            objects: records,
            on_duplicate: options.on_duplicate,
            on_error: options.on_error,
            batch_size: options.batch_size,
            max_workers: options.max_workers,
        };
        self.handle
            .transport()
            .post(&self.handle.sub_path("data/insert-many"), &request)
            .await?
            .json()
    }

    pub async fn add_vectors(
        &self,
        vectors: &[VectorItem],
        batch_size: usize,
        max_workers: usize,
    ) -> EigenlakeResult<()> {
        let request = InsertVectorsRequest {
            vectors,
            batch_size,
            max_workers,
        };
        self.handle
            .transport()
            .post(&self.handle.sub_path("data/insert-vectors"), &request)
            .await?;
        Ok(())
    }

    /// `None` when the service reports no object for `id`
    pub async fn get(
        &self,
        id: &str,
        return_data: bool,
        return_metadata: bool,
    ) -> EigenlakeResult<Option<Value>> {
        let request = GetByIdRequest {
            uuid: id,
            return_data,
            return_metadata,
        };
        let response: GetByIdResponse = self
            .handle
            .transport()
            .post(&self.handle.sub_path("data/get-by-id"), &request)
            .await?
            .json()?;
        Ok(response.object)
    }

    pub async fn exists(&self, id: &str) -> EigenlakeResult<bool> {
        let path = self
            .handle
            .sub_path(&format!("data/exists/{}", encode_segment(id)));
        let response: ExistsResponse = self.handle.transport().get(&path, &[]).await?.json()?;
        Ok(response.exists)
    }

    pub async fn remove(&self, id: &str) -> EigenlakeResult<()> {
        let path = self.handle.sub_path(&format!("data/{}", encode_segment(id)));
        self.handle
            .transport()
            .delete(&path, &[("batch_size", DEFAULT_BATCH_SIZE.to_string())])
            .await?;
        Ok(())
    }

    pub async fn remove_many(&self, request: &RemoveMany) -> EigenlakeResult<Value> {
        self.handle
            .transport()
            .post(&self.handle.sub_path("data/delete-many"), request)
            .await?
            .json()
    }

    /// Status of a background delete started by `remove_many`
    pub async fn remove_job(&self, job_id: u64) -> EigenlakeResult<Value> {
        let path = self.handle.sub_path(&format!("data/delete-jobs/{}", job_id));
        self.handle.transport().get(&path, &[]).await?.json()
    }

    /// Partial update; absent fields are left untouched
    pub async fn update(
        &self,
        id: &str,
        properties: Option<&Properties>,
        vector: Option<&[f32]>,
    ) -> EigenlakeResult<()> {
        let path = self.handle.sub_path(&format!("data/{}", encode_segment(id)));
        let body = PartialRecord { properties, vector };
        self.handle.transport().patch(&path, &body).await?;
        Ok(())
    }

    /// Full replacement of a record's properties, optionally its vector
    pub async fn replace(
        &self,
        id: &str,
        properties: &Properties,
        vector: Option<&[f32]>,
    ) -> EigenlakeResult<()> {
        let path = self.handle.sub_path(&format!("data/{}", encode_segment(id)));
        let body = PartialRecord {
            properties: Some(properties),
            vector,
        };
        self.handle.transport().put(&path, &body).await?;
        Ok(())
    }

    pub async fn list(&self, request: &ListByFilter) -> EigenlakeResult<Value> {
        self.handle
            .transport()
            .post(&self.handle.sub_path("data/get-by-filter"), request)
            .await?
            .json()
    }
}

#[async_trait]
impl BulkInsert for IndexRecords {
    async fn add_many(
        &self,
        records: Vec<NewRecord>,
        options: AddManyOptions,
    ) -> EigenlakeResult<AddManyResult> {
        IndexRecords::add_many(self, &records, options).await
    }
}
