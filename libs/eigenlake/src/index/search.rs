use std::collections::VecDeque;

use futures::stream::{self, Stream};
use serde::Serialize;
use serde_json::Value;

use super::{encode_segment, flag, IndexHandle};
use crate::error::EigenlakeResult;
use crate::models::ObjectPage;

#[derive(Debug, Serialize)]
struct NearVectorRequest<'a> {
    vector: &'a [f32],
    top_k: u32,
    filter: Option<&'a Value>,
}

/// Offset-paginated listing options
#[derive(Debug, Clone, Copy)]
pub struct ListObjects {
    pub limit: u32,
    pub offset: u64,
    pub with_vector: bool,
    pub with_properties: bool,
    pub newest_first: bool,
}

impl Default for ListObjects {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            with_vector: false,
            with_properties: true,
            newest_first: true,
        }
    }
}

impl ListObjects {
    fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("include_vector", flag(self.with_vector)),
            ("include_properties", flag(self.with_properties)),
            ("newest_first", flag(self.newest_first)),
        ]
    }
}

struct IterState {
    search: IndexSearch,
    options: ListObjects,
    pending: VecDeque<Value>,
    exhausted: bool,
}

/// Similarity search and object reads
#[derive(Debug, Clone)]
pub struct IndexSearch {
    handle: IndexHandle,
}

impl IndexSearch {
    pub(crate) fn new(handle: IndexHandle) -> Self {
        Self { handle }
    }

    pub async fn nearest(
        &self,
        vector: &[f32],
        limit: u32,
        filter: Option<&Value>,
    ) -> EigenlakeResult<Value> {
        let request = NearVectorRequest {
            vector,
            top_k: limit,
            filter,
        };
        self.handle
            .transport()
            .post(&self.handle.sub_path("query/near-vector"), &request)
            .await?
            .json()
    }

    pub async fn get(&self, id: &str, with_vector: bool) -> EigenlakeResult<Value> {
        let path = self
            .handle
            .sub_path(&format!("query/object/{}", encode_segment(id)));
        self.handle
            .transport()
            .get(&path, &[("include_vector", flag(with_vector))])
            .await?
            .json()
    }

    pub async fn list(&self, options: &ListObjects) -> EigenlakeResult<ObjectPage> {
        self.handle
            .transport()
            .get(&self.handle.sub_path("query/objects"), &options.query())
            .await?
            .json()
    }

    /// Stream every object, fetching `page_size` at a time.
    ///
    /// Stops on the first empty page, or after a page that carries no `next_offset`.
    pub fn iterate(
        &self,
        page_size: u32,
        mut options: ListObjects,
    ) -> impl Stream<Item = EigenlakeResult<Value>> + Send + use<> {
        options.limit = page_size;
        options.offset = 0;
        let state = IterState {
            search: self.clone(),
            options,
            pending: VecDeque::new(),
            exhausted: false,
        };

        stream::try_unfold(state, next_object)
    }
}

async fn next_object(mut state: IterState) -> EigenlakeResult<Option<(Value, IterState)>> {
    loop {
        if let Some(object) = state.pending.pop_front() {
            return Ok(Some((object, state)));
        }
        if state.exhausted {
            return Ok(None);
        }

        let page = state.search.list(&state.options).await?;
        if page.objects.is_empty() {
            return Ok(None);
        }
        match page.next_offset {
            Some(next) => state.options.offset = next,
            None => state.exhausted = true,
        }
        state.pending.extend(page.objects);
    }
}
