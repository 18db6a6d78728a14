//! Index operation tests
//!
//! Each operation must issue exactly one request with the expected method,
//! path, query and JSON body, and decode the service reply.

use std::time::Duration;

use eigenlake::{
    AddManyOptions, ClientConfig, CreateIndex, EigenlakeClient, ErrorKind, IndexHandle,
    ListObjects, NewRecord, OnDuplicate, OnError, RemoveMany,
};
use futures::TryStreamExt;
use serde_json::{json, Value};
use test_utils::{Method, MockResponse, StatusCode, TestDataBuilder, TestServer};

fn client(server: &TestServer) -> EigenlakeClient {
    let config = ClientConfig::new(server.url())
        .with_retries(0)
        .with_backoff_base(Duration::from_millis(1));
    EigenlakeClient::new(config).unwrap()
}

fn handle(server: &TestServer) -> IndexHandle {
    client(server).indexes().handle("docs", "main")
}

fn props(value: Value) -> serde_json::Map<String, Value> {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_create_or_get_posts_definition() {
    let server = TestServer::start().await;

    let index = client(&server)
        .indexes()
        .create_or_get(CreateIndex::new("docs", "main", 384).with_shard_count(0))
        .await
        .unwrap();

    assert_eq!(index.path(), "/v1/collections/docs/main");
    let request = server.last_request().unwrap();
    assert_eq!(request.method, Method::POST);
    assert_eq!(request.path, "/v1/collections/get-or-create");
    let body = request.body.unwrap();
    assert_eq!(body["namespace"], "docs");
    assert_eq!(body["index"], "main");
    assert_eq!(body["dimensions"], 384);
    assert_eq!(body["shard_count"], 1);
}

#[tokio::test]
async fn test_open_missing_index_is_not_found() {
    let server = TestServer::start().await;
    server.enqueue(MockResponse::json(
        StatusCode::NOT_FOUND,
        json!({"detail": "collection not found"}),
    ));

    let err = client(&server)
        .indexes()
        .open("docs", "gone")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.detail(), "collection not found");
    assert_eq!(server.last_request().unwrap().path, "/v1/collections/docs/gone");
}

#[tokio::test]
async fn test_path_segments_are_encoded() {
    let server = TestServer::start().await;
    server.enqueue(MockResponse::json(StatusCode::OK, json!({"exists": true})));

    let index = client(&server).indexes().handle("team a", "x/y");
    assert!(index.records().exists("id 1").await.unwrap());

    assert_eq!(
        server.last_request().unwrap().path,
        "/v1/collections/team%20a/x%2Fy/data/exists/id%201"
    );
}

#[tokio::test]
async fn test_add_returns_assigned_id() {
    let server = TestServer::start().await;
    server.enqueue(MockResponse::json(StatusCode::OK, json!({"uuid": "srv-1"})));

    let record = NewRecord::new(props(json!({"title": "a"})), vec![0.5, 0.25]);
    let id = handle(&server)
        .records()
        .add(&record, OnDuplicate::Skip)
        .await
        .unwrap();

    assert_eq!(id, "srv-1");
    let request = server.last_request().unwrap();
    assert_eq!(request.path, "/v1/collections/docs/main/data/insert");
    let body = request.body.unwrap();
    assert_eq!(body["properties"], json!({"title": "a"}));
    assert_eq!(body["vector"], json!([0.5, 0.25]));
    assert_eq!(body["uuid"], Value::Null);
    assert_eq!(body["on_duplicate"], "skip");
}

#[tokio::test]
async fn test_add_many_wire_shape_and_partial_failures() {
    let server = TestServer::start().await;
    server.enqueue(MockResponse::json(
        StatusCode::OK,
        json!({
            "uuids": ["r1"],
            "failed_objects": [{"uuid": "r2", "error": "dimension mismatch"}]
        }),
    ));

    let builder = TestDataBuilder::from_test_name("add_many_wire_shape");
    let records = vec![
        NewRecord::new(props(json!({"n": 1})), builder.vector(2)).with_id("r1"),
        NewRecord::new(props(json!({"n": 2})), builder.vector(3)).with_id("r2"),
    ];
    let options = AddManyOptions {
        on_error: OnError::Continue,
        max_workers: 4,
        ..AddManyOptions::default()
    };

    let result = handle(&server)
        .records()
        .add_many(&records, options)
        .await
        .unwrap();

    assert_eq!(result.ids, vec!["r1"]);
    assert_eq!(result.number_errors(), 1);
    assert_eq!(result.failed_records[0].id, "r2");
    assert_eq!(result.failed_records[0].error, "dimension mismatch");

    let request = server.last_request().unwrap();
    assert_eq!(request.path, "/v1/collections/docs/main/data/insert-many");
    let body = request.body.unwrap();
    assert_eq!(body["objects"].as_array().unwrap().len(), 2);
    assert_eq!(body["objects"][1]["uuid"], "r2");
    assert_eq!(body["on_error"], "continue");
    assert_eq!(body["on_duplicate"], "error");
    assert_eq!(body["batch_size"], 500);
    assert_eq!(body["max_workers"], 4);
}

#[tokio::test]
async fn test_get_missing_object_is_none() {
    let server = TestServer::start().await;
    server.enqueue(MockResponse::json(StatusCode::OK, json!({"object": null})));

    let object = handle(&server)
        .records()
        .get("r9", true, false)
        .await
        .unwrap();

    assert!(object.is_none());
    let body = server.last_request().unwrap().body.unwrap();
    assert_eq!(body, json!({"uuid": "r9", "return_data": true, "return_metadata": false}));
}

#[tokio::test]
async fn test_remove_and_remove_many() {
    let server = TestServer::start().await;
    server.enqueue(MockResponse::empty(StatusCode::NO_CONTENT));
    server.enqueue(MockResponse::json(StatusCode::ACCEPTED, json!({"job_id": 7})));

    let records = handle(&server).records();
    records.remove("r1").await.unwrap();
    let job = records
        .remove_many(&RemoveMany::new(json!({"tag": "old"})))
        .await
        .unwrap();
    assert_eq!(job["job_id"], 7);

    let requests = server.requests();
    assert_eq!(requests[0].method, Method::DELETE);
    assert_eq!(requests[0].path, "/v1/collections/docs/main/data/r1");
    assert_eq!(requests[0].query.get("batch_size").map(String::as_str), Some("500"));
    assert_eq!(requests[1].path, "/v1/collections/docs/main/data/delete-many");
    assert_eq!(requests[1].body.as_ref().unwrap()["where"], json!({"tag": "old"}));
}

#[tokio::test]
async fn test_update_and_replace_methods() {
    let server = TestServer::start().await;
    let records = handle(&server).records();
    let properties = props(json!({"title": "b"}));

    records.update("r1", None, Some(&[0.1][..])).await.unwrap();
    records.replace("r1", &properties, None).await.unwrap();

    let requests = server.requests();
    assert_eq!(requests[0].method, Method::PATCH);
    assert_eq!(requests[0].body, Some(json!({"properties": null, "vector": [0.1]})));
    assert_eq!(requests[1].method, Method::PUT);
    assert_eq!(
        requests[1].body,
        Some(json!({"properties": {"title": "b"}, "vector": null}))
    );
}

#[tokio::test]
async fn test_nearest_sends_top_k() {
    let server = TestServer::start().await;
    server.enqueue(MockResponse::json(StatusCode::OK, json!({"results": []})));

    let filter = json!({"lang": "en"});
    handle(&server)
        .search()
        .nearest(&[1.0, 0.0], 5, Some(&filter))
        .await
        .unwrap();

    let request = server.last_request().unwrap();
    assert_eq!(request.path, "/v1/collections/docs/main/query/near-vector");
    assert_eq!(
        request.body,
        Some(json!({"vector": [1.0, 0.0], "top_k": 5, "filter": {"lang": "en"}}))
    );
}

#[tokio::test]
async fn test_iterate_follows_next_offset() {
    let server = TestServer::start().await;
    server.enqueue(MockResponse::json(
        StatusCode::OK,
        json!({"objects": [{"id": 1}, {"id": 2}], "next_offset": 2}),
    ));
    server.enqueue(MockResponse::json(
        StatusCode::OK,
        json!({"objects": [{"id": 3}], "next_offset": null}),
    ));

    let objects: Vec<Value> = handle(&server)
        .search()
        .iterate(2, ListObjects::default())
        .try_collect()
        .await
        .unwrap();

    assert_eq!(objects, vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]);
    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/v1/collections/docs/main/query/objects");
    assert_eq!(requests[0].query.get("limit").map(String::as_str), Some("2"));
    assert_eq!(requests[0].query.get("offset").map(String::as_str), Some("0"));
    assert_eq!(requests[1].query.get("offset").map(String::as_str), Some("2"));
}

#[tokio::test]
async fn test_iterate_stops_on_empty_page() {
    let server = TestServer::start().await;
    server.enqueue(MockResponse::json(StatusCode::OK, json!({"objects": [], "next_offset": 10})));

    let objects: Vec<Value> = handle(&server)
        .search()
        .iterate(10, ListObjects::default())
        .try_collect()
        .await
        .unwrap();

    assert!(objects.is_empty());
    assert_eq!(server.request_count(), 1);
}

#[tokio::test]
async fn test_settings_read_each_time() {
    let server = TestServer::start().await;
    server.set_fallback(MockResponse::json(
        StatusCode::OK,
        json!({"dims": 3, "schema": {"title": "text"}, "shards": null}),
    ));

    let settings = handle(&server).settings();
    assert_eq!(settings.dimensions().await.unwrap(), 3);
    let config = settings.read().await.unwrap();
    assert_eq!(config.schema["title"], "text");
    assert!(config.shards.is_empty());

    assert_eq!(server.request_count(), 2);
    assert_eq!(server.last_request().unwrap().path, "/v1/collections/docs/main/config");
}

#[tokio::test]
async fn test_delete_index_sends_flags() {
    let server = TestServer::start().await;
    server.enqueue(MockResponse::json(StatusCode::OK, json!({"deleted": true})));

    let reply = handle(&server).manage().delete(true, false).await.unwrap();
    assert_eq!(reply["deleted"], true);

    let request = server.last_request().unwrap();
    assert_eq!(request.method, Method::DELETE);
    assert_eq!(request.path, "/v1/collections/docs/main");
    assert_eq!(request.query.get("ensure_remote").map(String::as_str), Some("true"));
    assert_eq!(request.query.get("drop_keys_table").map(String::as_str), Some("false"));
}
