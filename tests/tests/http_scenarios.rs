//! Smoke tests for the `axum` HTTP surface (§6), driven without binding a
//! real socket via `tower::ServiceExt::oneshot`.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use nimbus_tests::{build_state, router};

fn request(method: &str, uri: &str, user: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-auth-user", user)
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn full_round_trip_create_container_upload_and_fetch_object() {
    let state = build_state();
    let app = router(state);

    let put_container = app
        .clone()
        .oneshot(request("PUT", "/alice/photos", "alice", Vec::new()))
        .await
        .unwrap();
    assert_eq!(put_container.status(), StatusCode::OK);

    let upload = app
        .clone()
        .oneshot(request("PUT", "/alice/photos/sunset.jpg", "alice", b"binary-pixels".to_vec()))
        .await
        .unwrap();
    assert_eq!(upload.status(), StatusCode::CREATED);

    let fetch = app
        .clone()
        .oneshot(request("GET", "/alice/photos/sunset.jpg", "alice", Vec::new()))
        .await
        .unwrap();
    assert_eq!(fetch.status(), StatusCode::OK);
    let body = to_bytes(fetch.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"binary-pixels");

    let stats = app
        .clone()
        .oneshot(request("HEAD", "/alice", "alice", Vec::new()))
        .await
        .unwrap();
    assert_eq!(stats.status(), StatusCode::OK);
}

#[tokio::test]
async fn cross_account_write_is_forbidden() {
    let state = build_state();
    let app = router(state);

    app.clone()
        .oneshot(request("PUT", "/alice/photos", "alice", Vec::new()))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(request("PUT", "/alice/photos/secret.txt", "mallory", b"nope".to_vec()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn range_and_version_query_select_the_right_bytes() {
    let state = build_state();
    let app = router(state);

    app.clone()
        .oneshot(request("PUT", "/alice/photos", "alice", Vec::new()))
        .await
        .unwrap();
    app.clone()
        .oneshot(request("PUT", "/alice/photos/note.txt", "alice", b"hello world".to_vec()))
        .await
        .unwrap();

    let full = app
        .clone()
        .oneshot(request("GET", "/alice/photos/note.txt", "alice", Vec::new()))
        .await
        .unwrap();
    let first_version = full
        .headers()
        .get("x-object-version")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    let ranged = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/alice/photos/note.txt")
                .header("x-auth-user", "alice")
                .header("range", "bytes=0-4")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(ranged.status(), StatusCode::PARTIAL_CONTENT);
    let body = to_bytes(ranged.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"hello");

    app.clone()
        .oneshot(request("PUT", "/alice/photos/note.txt", "alice", b"goodbye".to_vec()))
        .await
        .unwrap();

    let by_version = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/alice/photos/note.txt?version={first_version}"),
            "alice",
            Vec::new(),
        ))
        .await
        .unwrap();
    assert_eq!(by_version.status(), StatusCode::OK);
    let body = to_bytes(by_version.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"hello world");
}

#[tokio::test]
async fn unknown_public_token_resolves_to_none() {
    let state = build_state();
    let app = router(state);

    let response = app
        .oneshot(request("GET", "/public/does-not-exist", "anyone", Vec::new()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert!(json["path"].is_null());
}
