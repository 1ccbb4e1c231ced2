//! In-process tests driving the demo router with `oneshot`.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use http_plug::{HttpServer, ServiceConfig};
use serde_json::json;
use tower::ServiceExt;

mod common;

fn router() -> axum::Router {
    HttpServer::new(ServiceConfig::default()).router()
}

fn request(method: Method, uri: &str, content_type: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_index_reads_nested_list() {
    let response = router()
        .oneshot(request(
            Method::GET,
            "/?list=%7B%22obj%22%3A%7B%22id%22%3A%5B7%5D%7D%7D",
            None,
            "",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let envelope = common::envelope(response).await;
    assert_eq!(envelope.status, 1);
    assert_eq!(envelope.status_number, "0000000");
    assert_eq!(envelope.status_code, "SSSSSS");
    assert_eq!(envelope.status_message, "Success");
    assert!(envelope.data.is_null());
}

#[tokio::test]
async fn test_query_array_and_string() {
    let response = router()
        .oneshot(request(
            Method::GET,
            "/echo?ids=%5B1%2C2%2C3%5D&name=Ann",
            None,
            "",
        ))
        .await
        .unwrap();

    let envelope = common::envelope(response).await;
    assert_eq!(envelope.data["method"], "GET");
    assert_eq!(envelope.data["params"]["ids"], json!([1, 2, 3]));
    assert_eq!(envelope.data["params"]["name"], "Ann");
}

#[tokio::test]
async fn test_get_ignores_json_body() {
    let response = router()
        .oneshot(request(
            Method::GET,
            "/echo?q=1",
            Some("application/json"),
            r#"{"hidden": true}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let envelope = common::envelope(response).await;
    assert_eq!(envelope.data["params"], json!({"q": "1"}));
}

#[tokio::test]
async fn test_post_json_typed_values() {
    let response = router()
        .oneshot(request(
            Method::POST,
            "/echo",
            Some("application/json"),
            r#"{"id": 5, "tags": ["a", "b"]}"#,
        ))
        .await
        .unwrap();

    let envelope = common::envelope(response).await;
    assert_eq!(envelope.data["params"]["id"], 5);
    assert_eq!(envelope.data["params"]["tags"], json!(["a", "b"]));
}

#[tokio::test]
async fn test_malformed_json_answers_500_and_keeps_query() {
    let response = router()
        .oneshot(request(
            Method::POST,
            "/echo?keep=yes",
            Some("application/json"),
            "{not json",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let envelope = common::envelope(response).await;
    assert_eq!(envelope.status, 0);
    assert_eq!(envelope.status_message, "Internal Server Error");
    assert_eq!(envelope.data, json!({"keep": "yes"}));
}

#[tokio::test]
async fn test_form_body_overrides_query_and_groups_repeats() {
    let response = router()
        .oneshot(request(
            Method::PUT,
            "/echo?name=query&tag=q",
            Some("application/x-www-form-urlencoded; charset=utf-8"),
            "name=form&tag=a&tag=b",
        ))
        .await
        .unwrap();

    let envelope = common::envelope(response).await;
    assert_eq!(envelope.data["method"], "PUT");
    assert_eq!(envelope.data["params"]["name"], "form");
    assert_eq!(envelope.data["params"]["tag"], json!(["a", "b"]));
}

#[tokio::test]
async fn test_unknown_content_type_body_ignored() {
    let response = router()
        .oneshot(request(Method::POST, "/echo?a=1", Some("text/plain"), "a=2"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let envelope = common::envelope(response).await;
    assert_eq!(envelope.data["params"], json!({"a": "1"}));
}

#[tokio::test]
async fn test_multipart_fields_and_file_summary() {
    let body = common::multipart_body(&[
        ("title", None, "hello"),
        ("doc", Some("a.txt"), "alpha"),
    ]);
    let response = router()
        .oneshot(request(
            Method::POST,
            "/echo",
            Some("multipart/form-data; boundary=XYZ"),
            &body,
        ))
        .await
        .unwrap();

    let envelope = common::envelope(response).await;
    assert_eq!(envelope.data["params"], json!({"title": "hello"}));
    assert_eq!(
        envelope.data["files"]["doc"],
        json!([{"file_name": "a.txt", "content_type": "text/plain", "size": 5}])
    );
}

#[tokio::test]
async fn test_single_file_accessor_on_two_files() {
    let body = common::multipart_body(&[
        ("file", Some("a.txt"), "alpha"),
        ("file", Some("b.txt"), "beta"),
    ]);
    let response = router()
        .oneshot(request(
            Method::POST,
            "/upload/single",
            Some("multipart/form-data; boundary=XYZ"),
            &body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let envelope = common::envelope(response).await;
    assert_eq!(envelope.status, 0);
    assert_eq!(envelope.status_message, "invalid file, maybe files instead");
}

#[tokio::test]
async fn test_plural_file_accessor_reads_every_part() {
    let body = common::multipart_body(&[
        ("file", Some("a.txt"), "alpha"),
        ("file", Some("b.txt"), "beta"),
    ]);
    let response = router()
        .oneshot(request(
            Method::POST,
            "/upload/many",
            Some("multipart/form-data; boundary=XYZ"),
            &body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let envelope = common::envelope(response).await;
    let files = envelope.data.as_array().unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0]["file_name"], "a.txt");
    assert_eq!(files[0]["bytes_read"], 5);
    assert_eq!(files[1]["file_name"], "b.txt");
    assert_eq!(files[1]["bytes_read"], 4);
}

#[tokio::test]
async fn test_missing_file_is_reported() {
    let body = common::multipart_body(&[("other", Some("a.txt"), "alpha")]);
    let response = router()
        .oneshot(request(
            Method::POST,
            "/upload/many",
            Some("multipart/form-data; boundary=XYZ"),
            &body,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::envelope(response).await.status_message, "no such file");
}

#[tokio::test]
async fn test_item_segments_and_time() {
    let response = router()
        .oneshot(request(
            Method::GET,
            "/items/42?since=2024-01-02T03:04:05Z&limit=10&verbose=true",
            None,
            "",
        ))
        .await
        .unwrap();

    let envelope = common::envelope(response).await;
    assert_eq!(envelope.data["id"], 42);
    assert_eq!(envelope.data["raw_id"], "42");
    assert_eq!(envelope.data["since"], "2024-01-02T03:04:05+00:00");
    assert_eq!(envelope.data["limit"], 10);
    assert_eq!(envelope.data["verbose"], true);
}

#[tokio::test]
async fn test_item_lenient_segment_and_bad_time() {
    let response = router()
        .oneshot(request(Method::GET, "/items/abc", None, ""))
        .await
        .unwrap();
    let envelope = common::envelope(response).await;
    assert_eq!(envelope.data["id"], 0);
    assert!(envelope.data["since"].is_null());
    assert!(envelope.data["limit"].is_null());

    let response = router()
        .oneshot(request(Method::GET, "/items/1?since=yesterday", None, ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        common::envelope(response).await.status_message,
        "use RFC3339 format string for datetime"
    );
}

#[tokio::test]
async fn test_greet_decodes_struct() {
    let response = router()
        .oneshot(request(
            Method::POST,
            "/greet",
            Some("application/json"),
            r#"{"name": "Ann", "times": 2}"#,
        ))
        .await
        .unwrap();

    let envelope = common::envelope(response).await;
    assert_eq!(envelope.data, json!(["Hello, Ann", "Hello, Ann"]));
}

#[tokio::test]
async fn test_body_failure_status_wins_over_handler_status() {
    let response = router()
        .oneshot(request(
            Method::POST,
            "/greet",
            Some("application/json"),
            "[broken",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(common::envelope(response).await.status, 0);
}

#[tokio::test]
async fn test_whoami_headers_and_basic_auth() {
    let response = router()
        .oneshot(
            Request::builder()
                .uri("/whoami?x=1")
                .header(header::HOST, "api.example.com:8080")
                .header("x-forwarded-proto", "https")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                // ann:secret
                .header(header::AUTHORIZATION, "Basic YW5uOnNlY3JldA==")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let envelope = common::envelope(response).await;
    assert_eq!(envelope.data["client_ip"], "203.0.113.9");
    assert_eq!(envelope.data["scheme"], "https");
    assert_eq!(envelope.data["host"], "api.example.com");
    assert_eq!(envelope.data["url"], "https://api.example.com:8080/whoami");
    assert_eq!(
        envelope.data["full_url"],
        "https://api.example.com:8080/whoami?x=1"
    );
    assert_eq!(envelope.data["user"], "ann");
}
