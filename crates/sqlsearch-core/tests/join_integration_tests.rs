//! End-to-end join tests against a mocked backend.
//!
//! Run with: `cargo test -p sqlsearch-core --test join_integration_tests`

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sqlsearch_core::{
    ActionOutput, Condition, HttpTransport, JoinConfig, JoinSelect, Operator, QueryAction,
    TableRef, TransportConfig, Where,
};

fn hits(sources: &[Value]) -> Value {
    let hits: Vec<Value> = sources
        .iter()
        .enumerate()
        .map(|(i, s)| json!({ "_id": i.to_string(), "_source": s }))
        .collect();
    json!({ "hits": { "total": { "value": hits.len(), "relation": "eq" }, "hits": hits } })
}

async fn transport(server: &MockServer) -> Arc<HttpTransport> {
    let config = TransportConfig {
        url: server.uri(),
        ..TransportConfig::default()
    };
    Arc::new(HttpTransport::new(config).expect("transport"))
}

fn rows(output: ActionOutput) -> Vec<Value> {
    match output {
        ActionOutput::Rows(rows) => rows.iter().map(|r| r.to_json()).collect(),
        ActionOutput::Hits(_) => panic!("expected joined rows"),
    }
}

#[tokio::test]
async fn test_hash_join_end_to_end() {
    // Arrange
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(&[
            json!({ "id": 1, "k": "a" }),
            json!({ "id": 2, "k": "b" }),
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/orders/_search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(hits(&[json!({ "k": "a", "v": 10 })])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let join = JoinSelect::new(
        TableRef::new("users", "a"),
        TableRef::new("orders", "b"),
        vec![Condition::fields("a.k", Operator::Eq, "b.k")],
    );
    let action = QueryAction::for_join(join, &JoinConfig::default()).expect("plan");

    // Act
    let output = action.execute(transport(&server).await).await.expect("join");

    // Assert
    assert_eq!(rows(output), vec![json!({ "id": 1, "k": "a", "v": 10 })]);
    let requests = server.received_requests().await.expect("recorded");
    let probe: Value = serde_json::from_slice(&requests[1].body).expect("json body");
    assert_eq!(
        probe["query"]["bool"]["filter"][0]["terms"]["k"],
        json!(["a", "b"])
    );
}

#[tokio::test]
async fn test_nested_loop_join_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hits(&[
            json!({ "id": 1, "max": 10 }),
            json!({ "id": 2, "max": 30 }),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/_msearch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responses": [
                hits(&[json!({ "total": 5 })]),
                hits(&[json!({ "total": 5 }), json!({ "total": 20 })]),
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let join = JoinSelect::new(
        TableRef::new("users", "a"),
        TableRef::new("orders", "b"),
        vec![Condition::fields("a.max", Operator::Gt, "b.total")],
    );
    let action = QueryAction::for_join(join, &JoinConfig::default()).expect("plan");

    let output = action.execute(transport(&server).await).await.expect("join");

    assert_eq!(
        rows(output),
        vec![
            json!({ "id": 1, "max": 10, "total": 5 }),
            json!({ "id": 2, "max": 30, "total": 5 }),
            json!({ "id": 2, "max": 30, "total": 20 }),
        ]
    );
}

#[tokio::test]
async fn test_nested_loop_item_failure_fails_join() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(hits(&[json!({ "id": 1, "max": 10 })])),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/_msearch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "responses": [ { "error": { "type": "search_phase_execution_exception" }, "status": 400 } ]
        })))
        .mount(&server)
        .await;

    let join = JoinSelect::new(
        TableRef::new("users", "a"),
        TableRef::new("orders", "b"),
        vec![Condition::fields("a.max", Operator::Gte, "b.total")],
    );
    let action = QueryAction::for_join(join, &JoinConfig::default()).expect("plan");

    let err = action
        .execute(transport(&server).await)
        .await
        .expect_err("batch should fail");

    assert_eq!(err.code(), "SQLS-003");
}

#[tokio::test]
async fn test_side_failure_reports_alias() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users/_search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let join = JoinSelect::new(
        TableRef::new("users", "u"),
        TableRef::new("orders", "o"),
        vec![Condition::fields("u.id", Operator::Eq, "o.user_id")],
    );
    let action = QueryAction::for_join(join, &JoinConfig::default()).expect("plan");

    let err = action
        .execute(transport(&server).await)
        .await
        .expect_err("side should fail");

    assert_eq!(err.code(), "SQLS-004");
    assert!(err.to_string().contains("'u'"), "got {err}");
}

#[test]
fn test_explain_matches_request() {
    let join = JoinSelect::new(
        TableRef::new("users", "a").with_where(Condition::compare("age", Operator::Gte, 21)),
        TableRef::new("orders", "b"),
        vec![Condition::fields("a.id", Operator::Eq, "b.user_id")],
    )
    .with_connected_where(Where::from(Condition::compare("b.total", Operator::Gt, 100)));
    let action = QueryAction::for_join(join, &JoinConfig::default()).expect("plan");

    let explained: Value = serde_json::from_str(&action.explain().expect("explain")).expect("json");

    assert_eq!(
        explained["first_table"]["request"]["query"]["bool"]["filter"][0]["bool"]["must"][0],
        json!({ "range": { "age": { "gte": 21 } } })
    );
    assert_eq!(explained["join"]["connected_where"], json!("b.total > 100"));
    assert_eq!(explained["join"]["keys"][0]["second"], json!("user_id"));
}
