use std::sync::Arc;

use core_config::FromEnv;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::EigenlakeResult;
use crate::index::{index_path, IndexHandle};
use crate::transport::Transport;

pub const DEFAULT_RECORD_ID_PROPERTY: &str = "document_id";

#[derive(Debug, Deserialize)]
struct ReadyResponse {
    #[serde(default)]
    ready: bool,
}

/// Parameters for creating (or fetching) an index
#[derive(Debug, Clone, Serialize)]
pub struct CreateIndex {
    pub namespace: String,
    pub index: String,
    pub dimensions: u32,
    pub schema: Option<Value>,
    pub index_options: Option<Value>,
    pub shard_count: u32,
    pub record_id_property: String,
}

impl CreateIndex {
    pub fn new(namespace: impl Into<String>, index: impl Into<String>, dimensions: u32) -> Self {
        Self {
            namespace: namespace.into(),
            index: index.into(),
            dimensions,
            schema: None,
            index_options: None,
            shard_count: 1,
            record_id_property: DEFAULT_RECORD_ID_PROPERTY.to_string(),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_index_options(mut self, options: Value) -> Self {
        self.index_options = Some(options);
        self
    }

    pub fn with_shard_count(mut self, count: u32) -> Self {
        self.shard_count = count.max(1);
        self
    }

    pub fn with_record_id_property(mut self, property: impl Into<String>) -> Self {
        self.record_id_property = property.into();
        self
    }
}

/// Client for an Eigenlake deployment
///
/// Owns one transport; clones share the underlying connection pool and configuration.
#[derive(Debug, Clone)]
pub struct EigenlakeClient {
    transport: Transport,
}

impl EigenlakeClient {
    pub fn new(config: ClientConfig) -> EigenlakeResult<Self> {
        debug!(base_url = %config.base_url, retries = config.retries, "Creating client");
        Ok(Self {
            transport: Transport::new(Arc::new(config))?,
        })
    }

    /// Build from `EIGENLAKE_*` environment variables
    pub fn from_env() -> EigenlakeResult<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Whether the service reports itself ready; any failure counts as not ready
    pub async fn ready(&self) -> bool {
        let response = match self.transport.get("/v1/health/ready", &[]).await {
            Ok(response) => response,
            Err(e) => {
                debug!(error = %e, "Readiness check failed");
                return false;
            }
        };
        response
            .json::<ReadyResponse>()
            .map(|r| r.ready)
            .unwrap_or(false)
    }

    pub fn indexes(&self) -> Indexes {
        Indexes {
            transport: self.transport.clone(),
        }
    }
}

/// Index lookup and creation
#[derive(Debug, Clone)]
pub struct Indexes {
    transport: Transport,
}

impl Indexes {
    pub async fn create_or_get(&self, request: CreateIndex) -> EigenlakeResult<IndexHandle> {
        let request = CreateIndex {
            shard_count: request.shard_count.max(1),
            ..request
        };
        self.transport
            .post("/v1/collections/get-or-create", &request)
            .await?;
        info!(
            namespace = %request.namespace,
            index = %request.index,
            dimensions = request.dimensions,
            "Index ready"
        );
        Ok(IndexHandle::new(
            self.transport.clone(),
            &request.namespace,
            &request.index,
        ))
    }

    /// Handle to an existing index; fails with `NotFound` if it does not exist
    pub async fn open(&self, namespace: &str, index: &str) -> EigenlakeResult<IndexHandle> {
        self.transport.get(&index_path(namespace, index), &[]).await?;
        Ok(self.handle(namespace, index))
    }

    /// Handle without checking that the index exists
    pub fn handle(&self, namespace: &str, index: &str) -> IndexHandle {
        IndexHandle::new(self.transport.clone(), namespace, index)
    }
}
