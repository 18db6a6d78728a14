//! Shared test utilities for the Eigenlake client
//!
//! - `TestServer`: in-process HTTP stub with request recording and scripted replies
//! - `unreachable_url`: a local address nothing listens on, for network-failure tests
//! - `TestDataBuilder`: deterministic record ids and vectors
//!
//! # Usage
//!
//! ```rust,no_run
//! use test_utils::{MockResponse, StatusCode, TestServer, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn my_client_test() {
//!     let server = TestServer::start().await;
//!     server.enqueue(MockResponse::empty(StatusCode::SERVICE_UNAVAILABLE));
//!
//!     let builder = TestDataBuilder::from_test_name("my_client_test");
//!     let vector = builder.vector(8);
//! }
//! ```

mod server;

pub use axum::http::{header, Method, StatusCode};
pub use server::{MockResponse, RecordedRequest, TestServer, unreachable_url};

/// Builder for test data with deterministic values
///
/// Seeded from the test name so reruns produce identical ids and vectors.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Record id unique within the test, e.g. `rec-12345-3`
    pub fn record_id(&self, n: usize) -> String {
        format!("rec-{}-{}", self.seed, n)
    }

    /// Vector of `dims` values in `[0, 1)`, derived from the seed
    pub fn vector(&self, dims: usize) -> Vec<f32> {
        let mut state = self.seed | 1;
        (0..dims)
            .map(|_| {
                // xorshift64
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                (state % 10_000) as f32 / 10_000.0
            })
            .collect()
    }
}
