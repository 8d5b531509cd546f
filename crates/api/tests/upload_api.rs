//! HTTP-level tests for upload targets and the style catalog.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_auth};
use moodboard_storage::is_upload_key;

#[tokio::test]
async fn upload_target_requires_auth() {
    let t = common::build_test_app();
    let response = common::post_json(t.app(), "/api/v1/uploads", serde_json::json!({})).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn upload_target_returns_fresh_upload_key() {
    let t = common::build_test_app();
    let token = t.token(1);

    let first = body_json(post_auth(t.app(), "/api/v1/uploads", &token).await).await;
    let second = body_json(post_auth(t.app(), "/api/v1/uploads", &token).await).await;

    let key = first["data"]["blob_key"].as_str().unwrap();
    assert!(is_upload_key(key));
    assert_ne!(first["data"]["blob_key"], second["data"]["blob_key"]);
    assert_eq!(first["data"]["method"], "PUT");
    assert_eq!(first["data"]["upload_url"], format!("memory://{key}"));
    assert!(first["data"]["expires_at"].is_string());
}

#[tokio::test]
async fn styles_are_public_and_list_presets_and_options() {
    let t = common::build_test_app();
    let response = get(t.app(), "/api/v1/styles").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let presets = json["data"]["presets"].as_array().unwrap();
    assert!(presets.iter().any(|p| p == "Minimalist and clean"));

    let options = json["data"]["options"].as_array().unwrap();
    let palette = options
        .iter()
        .find(|o| o["field"] == "color_palette")
        .expect("color_palette options should be listed");
    assert!(palette["values"]
        .as_array()
        .unwrap()
        .iter()
        .any(|v| v == "pastel"));
    assert!(options.iter().any(|o| o["field"] == "border_style"));
}
