use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::{flag, IndexHandle};
use crate::error::EigenlakeResult;
use crate::models::OnMissing;

/// Administrative filtered delete
#[derive(Debug, Clone, Serialize)]
pub struct RemoveByFilter {
    #[serde(rename = "where")]
    pub filter: Value,
    #[serde(rename = "limit_object_ids")]
    pub limit_ids: Option<u64>,
    #[serde(rename = "delete_sql_metadata_rows")]
    pub delete_sql_rows: bool,
    #[serde(rename = "on_missing_keys")]
    pub on_missing: OnMissing,
    pub batch_size: usize,
    pub background: bool,
}

impl RemoveByFilter {
    pub fn new(filter: Value) -> Self {
        Self {
            filter,
            limit_ids: None,
            delete_sql_rows: false,
            on_missing: OnMissing::Skip,
            batch_size: 500,
            background: true,
        }
    }
}

/// Index lifecycle and admin operations
#[derive(Debug, Clone)]
pub struct IndexManage {
    handle: IndexHandle,
}

impl IndexManage {
    pub(crate) fn new(handle: IndexHandle) -> Self {
        Self { handle }
    }

    /// Drop the whole index
    pub async fn delete(&self, ensure_remote: bool, drop_keys_table: bool) -> EigenlakeResult<Value> {
        info!(
            namespace = self.handle.namespace(),
            index = self.handle.index(),
            "Deleting index"
        );
        self.handle
            .transport()
            .delete(
                self.handle.path(),
                &[
                    ("ensure_remote", flag(ensure_remote)),
                    ("drop_keys_table", flag(drop_keys_table)),
                ],
            )
            .await?
            .json()
    }

    pub async fn remove_by_filter(&self, request: &RemoveByFilter) -> EigenlakeResult<Value> {
        self.handle
            .transport()
            .post(&self.handle.sub_path("admin/delete-by-filter"), request)
            .await?
            .json()
    }
}
