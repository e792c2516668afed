#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Download redirection into consumer views and static file serving.

mod common;

use api_gateway::ApiGatewayConfig;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use token_authz_sdk::ResourceId;
use tower::ServiceExt;

use common::{
    OTHER_SECURE_ID, PUBLIC_ID, SECURE_ID, StaticAuthz, body_json, body_text, harness,
    harness_with,
};

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn selective_download_points_at_consumer_view() {
    let h = harness(StaticAuthz::new("/srv/consumer").grant("tok", &[SECURE_ID, OTHER_SECURE_ID]));

    let response = h
        .router
        .oneshot(get(&format!("/download?token=tok&id={SECURE_ID}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "consumer_url": "/consumer/tok/",
            "files": ["/consumer/tok/station1"]
        })
    );
    assert_eq!(h.authz.materialized(), [ResourceId::from(SECURE_ID)]);
}

#[tokio::test]
async fn bulk_download_exposes_every_granted_resource() {
    let h = harness(StaticAuthz::new("/srv/consumer").grant("tok", &[SECURE_ID, OTHER_SECURE_ID]));

    let response = h.router.oneshot(get("/download?token=tok")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["files"].as_array().unwrap().len(), 2);
    assert_eq!(h.authz.materialized().len(), 2);
    assert_eq!(h.authz.authorize_calls(), 0);
}

#[tokio::test]
async fn bulk_download_leaves_public_grants_out_of_the_view() {
    let h = harness(StaticAuthz::new("/srv/consumer").grant("tok", &[SECURE_ID, PUBLIC_ID]));

    let response = h.router.oneshot(get("/download?token=tok")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({
            "consumer_url": "/consumer/tok/",
            "files": ["/consumer/tok/station1"]
        })
    );
    assert_eq!(h.authz.materialized(), [ResourceId::from(SECURE_ID)]);
}

#[tokio::test]
async fn download_rejects_public_ids_and_missing_token() {
    let h = harness(StaticAuthz::new("/srv/consumer").grant("tok", &[SECURE_ID]));

    let response = h
        .router
        .clone()
        .oneshot(get(&format!("/download?token=tok&id={SECURE_ID},{PUBLIC_ID}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        body_json(response).await["detail"]
            .as_str()
            .unwrap()
            .contains("/provider/public")
    );

    let response = h
        .router
        .oneshot(get(&format!("/download?id={SECURE_ID}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(h.authz.materialized().is_empty());
}

#[tokio::test]
async fn denied_download_materializes_nothing() {
    let h = harness(StaticAuthz::new("/srv/consumer").grant("tok", &[SECURE_ID]));

    let response = h
        .router
        .oneshot(get(&format!("/download?token=tok&id={SECURE_ID},{OTHER_SECURE_ID}")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(h.authz.materialized().is_empty());
}

#[tokio::test]
async fn storage_trees_are_served_statically() {
    let consumer = tempfile::tempdir().unwrap();
    let public = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(consumer.path().join("tok")).unwrap();
    std::fs::write(consumer.path().join("tok/station1"), "secure bytes").unwrap();
    std::fs::write(public.path().join("readme.txt"), "public bytes").unwrap();

    let h = harness_with(
        StaticAuthz::new(consumer.path()),
        ApiGatewayConfig::default(),
        Some((consumer.path().to_path_buf(), public.path().to_path_buf())),
    );

    let response = h
        .router
        .clone()
        .oneshot(get("/consumer/tok/station1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "secure bytes");

    let response = h
        .router
        .clone()
        .oneshot(get("/provider/public/readme.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "public bytes");

    let response = h
        .router
        .oneshot(get("/consumer/other/station1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn static_serving_can_be_disabled() {
    let public = tempfile::tempdir().unwrap();
    std::fs::write(public.path().join("readme.txt"), "public bytes").unwrap();

    let config = ApiGatewayConfig {
        serve_static: false,
        ..ApiGatewayConfig::default()
    };
    let h = harness_with(
        StaticAuthz::new("/unused"),
        config,
        Some((public.path().to_path_buf(), public.path().to_path_buf())),
    );

    let response = h
        .router
        .oneshot(get("/provider/public/readme.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
