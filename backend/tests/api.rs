use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use todo_backend::{api_router, AppState, MemoryStore, TodoService};
use tower::ServiceExt;

fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let app = api_router(AppState::new(TodoService::new(store.clone())));
    (app, store)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("json body")
    };
    (status, value)
}

async fn create(app: &Router, text: &str) -> Value {
    let (status, body) = send(app, Method::POST, "/api/todo", Some(json!({ "text": text }))).await;
    assert_eq!(status, StatusCode::CREATED, "create {text:?}: {body}");
    body["todo"].clone()
}

#[tokio::test]
async fn example_scenario() {
    let (app, _) = test_app();

    let (status, body) = send(&app, Method::POST, "/api/todo", Some(json!({ "text": "Write spec" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["todo"]["todo"], "Write spec");
    assert_eq!(body["todo"]["isCompleted"], false);
    let id = body["todo"]["id"].as_str().expect("id").to_string();

    let (status, body) = send(&app, Method::POST, "/api/todo", Some(json!({ "text": "write spec" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("already exists"));

    let uri = format!("/api/todo/{id}");
    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({ "completed": true }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["todo"]["isCompleted"], true);

    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn blank_text_is_rejected_without_creating_a_row() {
    let (app, store) = test_app();

    for body in [json!({ "text": "" }), json!({ "text": "   \t" }), json!({})] {
        let (status, response) = send(&app, Method::POST, "/api/todo", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "text required");
    }
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn malformed_create_body_is_a_client_error() {
    let (app, store) = test_app();

    let (status, response) = send(&app, Method::POST, "/api/todo", Some(json!({ "text": 42 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["success"], false);
    assert_eq!(response["error"], "text required");

    let (status, response) = send(&app, Method::POST, "/api/todo", Some(json!({ "completed": true }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "text required");
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn case_only_duplicate_leaves_one_row() {
    let (app, _) = test_app();
    create(&app, "Buy Milk").await;

    let (status, _) = send(&app, Method::POST, "/api/todo", Some(json!({ "text": "  buy milk " }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, list) = send(&app, Method::GET, "/api/todo", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["todo"], "Buy Milk");
}

#[tokio::test]
async fn renaming_onto_existing_text_conflicts_and_changes_nothing() {
    let (app, _) = test_app();
    create(&app, "Laundry").await;
    let dishes = create(&app, "Dishes").await;

    let uri = format!("/api/todo/{}", dishes["id"].as_str().unwrap());
    let (status, _) = send(&app, Method::PUT, &uri, Some(json!({ "text": "LAUNDRY" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, list) = send(&app, Method::GET, "/api/todo", None).await;
    let texts: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|todo| todo["todo"].as_str().unwrap())
        .collect();
    assert_eq!(texts, vec!["Dishes", "Laundry"]);
}

#[tokio::test]
async fn update_text_is_trimmed_and_blank_rejected() {
    let (app, _) = test_app();
    let todo = create(&app, "draft").await;
    let uri = format!("/api/todo/{}", todo["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({ "text": "  final  " }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["todo"]["todo"], "final");

    let (status, _) = send(&app, Method::PUT, &uri, Some(json!({ "text": " " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_of_unknown_id_is_not_found() {
    let (app, _) = test_app();

    let uri = format!("/api/todo/{}", uuid::Uuid::new_v4());
    let (status, body) = send(&app, Method::PUT, &uri, Some(json!({ "completed": true }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, Method::PUT, "/api/todo/not-a-uuid", Some(json!({ "completed": true }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_of_unknown_id_succeeds() {
    let (app, _) = test_app();

    let uri = format!("/api/todo/{}", uuid::Uuid::new_v4());
    let (status, body) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, _) = send(&app, Method::DELETE, "/api/todo/garbage", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn toggle_round_trips_through_list() {
    let (app, _) = test_app();
    let todo = create(&app, "Water plants").await;
    let uri = format!("/api/todo/{}", todo["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::PUT, &uri, Some(json!({ "completed": true }))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, list) = send(&app, Method::GET, "/api/todo", None).await;
    let listed = &list[0];
    assert_eq!(listed["isCompleted"], true);
    assert_eq!(listed["id"], todo["id"]);
    assert_eq!(listed["todo"], todo["todo"]);
    assert_eq!(listed["createdAt"], todo["createdAt"]);
}

#[tokio::test]
async fn list_is_newest_first_with_api_field_names() {
    let (app, _) = test_app();
    create(&app, "older").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    create(&app, "newer").await;

    let (status, list) = send(&app, Method::GET, "/api/todo", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list[0]["todo"], "newer");
    assert_eq!(list[1]["todo"], "older");

    let fields: Vec<&String> = list[0].as_object().unwrap().keys().collect();
    for name in ["id", "todo", "isCompleted", "createdAt"] {
        assert!(fields.iter().any(|f| f.as_str() == name), "missing {name}");
    }
    assert!(list[0].get("is_completed").is_none());
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn change_stream_emits_event_per_committed_write() {
    let (app, _) = test_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/todo/events")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );

    let todo = create(&app, "stream me").await;
    let (status, _) = send(&app, Method::POST, "/api/todo", Some(json!({ "text": "STREAM ME" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut body = response.into_body().into_data_stream();
    let chunk = tokio::time::timeout(Duration::from_secs(2), futures::StreamExt::next(&mut body))
        .await
        .expect("event before timeout")
        .expect("stream open")
        .expect("chunk");
    let frame = String::from_utf8(chunk.to_vec()).unwrap();

    assert!(frame.contains("event: change"), "frame: {frame}");
    assert!(frame.contains(r#""kind":"insert""#), "frame: {frame}");
    assert!(frame.contains(todo["id"].as_str().unwrap()), "frame: {frame}");
}
