//! Index-scoped operations
//!
//! Each method on these views maps to exactly one transport request under
//! `/v1/collections/{namespace}/{index}`.

mod manage;
mod records;
mod search;
mod settings;

pub use manage::{IndexManage, RemoveByFilter};
pub use records::{IndexRecords, ListByFilter, RemoveMany};
pub use search::{IndexSearch, ListObjects};
pub use settings::IndexSettings;

use crate::batch::IndexBatch;
use crate::transport::Transport;

/// Percent-encode one path segment, leaving only unreserved characters
pub(crate) fn encode_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

pub(crate) fn index_path(namespace: &str, index: &str) -> String {
    format!(
        "/v1/collections/{}/{}",
        encode_segment(namespace),
        encode_segment(index)
    )
}

pub(crate) fn flag(value: bool) -> String {
    value.to_string()
}

/// Handle to one index; cheap to clone
#[derive(Debug, Clone)]
pub struct IndexHandle {
    transport: Transport,
    namespace: String,
    index: String,
    path: String,
}

impl IndexHandle {
    pub(crate) fn new(transport: Transport, namespace: &str, index: &str) -> Self {
        Self {
            path: index_path(namespace, index),
            transport,
            namespace: namespace.to_string(),
            index: index.to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn transport(&self) -> &Transport {
        &self.transport
    }

    pub(crate) fn sub_path(&self, suffix: &str) -> String {
        format!("{}/{}", self.path, suffix)
    }

    pub fn records(&self) -> IndexRecords {
        IndexRecords::new(self.clone())
    }

    pub fn search(&self) -> IndexSearch {
        IndexSearch::new(self.clone())
    }

    pub fn settings(&self) -> IndexSettings {
        IndexSettings::new(self.clone())
    }

    pub fn manage(&self) -> IndexManage {
        IndexManage::new(self.clone())
    }

    pub fn batch(&self) -> IndexBatch<IndexRecords> {
        IndexBatch::new(self.records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_path_encodes_segments() {
        assert_eq!(index_path("docs", "main"), "/v1/collections/docs/main");
        assert_eq!(
            index_path("team a/b", "idx?x"),
            "/v1/collections/team%20a%2Fb/idx%3Fx"
        );
    }

    #[test]
    fn test_unreserved_characters_kept() {
        assert_eq!(encode_segment("a-b_c.d~e"), "a-b_c.d~e");
    }
}
