//! Output format selection through path extensions and `application.output`.

use rester::{Request, StatusCode};
use serde_json::json;

mod common;
use common::{harness, production, settings};

#[tokio::test]
async fn test_csv_extension_overrides_default_output() {
    let h = harness(production());

    let out = h.dispatcher.dispatch(Request::parse("/users.csv")).await;

    assert_eq!(out.status, StatusCode::OK);
    assert_eq!(out.headers.get("Content-Type"), Some("text/csv; charset=utf-8"));
    assert_eq!(out.text(), Some("id,name\n1,ada\n2,grace\n"));
}

#[tokio::test]
async fn test_extension_is_part_of_the_path_when_disabled() {
    let h = harness(settings(
        r#"
        [application]
        allow_output_extensions = false
        "#,
    ));

    // `7.csv` is not a number, so the handler rejects it.
    let out = h.dispatcher.dispatch(Request::parse("/users/7.csv")).await;

    assert_eq!(out.status, StatusCode::BAD_REQUEST);
    assert_eq!(out.headers.get("Content-Type"), Some("application/json"));
}

#[tokio::test]
async fn test_configured_output_is_the_default() {
    let h = harness(settings(
        r#"
        [application]
        output = "csv"
        "#,
    ));

    let out = h.dispatcher.dispatch(Request::parse("/users")).await;

    assert_eq!(out.text(), Some("id,name\n1,ada\n2,grace\n"));
}

#[tokio::test]
async fn test_unknown_extension_falls_back_to_default() {
    let h = harness(production());

    let out = h.dispatcher.dispatch(Request::parse("/users/7.yaml")).await;

    assert_eq!(out.status, StatusCode::OK);
    assert_eq!(out.headers.get("Content-Type"), Some("application/json"));
    assert_eq!(out.json().unwrap(), json!({ "id": 7 }));
}

#[tokio::test]
async fn test_failures_use_the_negotiated_format() {
    let h = harness(production());

    let out = h.dispatcher.dispatch(Request::parse("/users/abc.txt")).await;

    assert_eq!(out.status, StatusCode::BAD_REQUEST);
    assert_eq!(out.headers.get("Content-Type"), Some("text/plain; charset=utf-8"));
}
