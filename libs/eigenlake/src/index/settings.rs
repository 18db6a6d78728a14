use serde_json::{Map, Value};

use super::IndexHandle;
use crate::error::EigenlakeResult;
use crate::models::IndexConfig;

/// Read-only view of the index configuration; every call re-reads it
#[derive(Debug, Clone)]
pub struct IndexSettings {
    handle: IndexHandle,
}

impl IndexSettings {
    pub(crate) fn new(handle: IndexHandle) -> Self {
        Self { handle }
    }

    pub async fn read(&self) -> EigenlakeResult<IndexConfig> {
        self.handle
            .transport()
            .get(&self.handle.sub_path("config"), &[])
            .await?
            .json()
    }

    pub async fn dimensions(&self) -> EigenlakeResult<u32> {
        Ok(self.read().await?.dims)
    }

    pub async fn schema(&self) -> EigenlakeResult<Map<String, Value>> {
        Ok(self.read().await?.schema)
    }

    pub async fn shards(&self) -> EigenlakeResult<Map<String, Value>> {
        Ok(self.read().await?.shards)
    }
}
