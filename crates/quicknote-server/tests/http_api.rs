use axum::http::StatusCode;
use axum_test::TestServer;
use quicknote_core::wire::{CreateNoteResponse, ErrorResponse, NoteResponse, ViewResponse};
use quicknote_core::ViewPolicy;
use quicknote_server::{open_notes, router, AppState};
use serde_json::json;

fn test_server() -> (tempfile::TempDir, TestServer) {
    let dir = tempfile::tempdir().unwrap();
    let notes = open_notes(dir.path(), true).unwrap();
    let app = router(AppState { notes }, None);
    (dir, TestServer::new(app).unwrap())
}

fn link_key_body() -> serde_json::Value {
    json!({
        "ciphertext": "Y2lwaGVydGV4dA==",
        "iv": "0123456789abcdef01234567",
    })
}

async fn create(server: &TestServer, body: serde_json::Value) -> String {
    let response = server.post("/api/notes").json(&body).await;
    response.assert_status(StatusCode::CREATED);
    response.json::<CreateNoteResponse>().id
}

#[tokio::test]
async fn health_is_ok() {
    let (_dir, server) = test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({"status": "ok"}));
}

#[tokio::test]
async fn create_then_get() {
    let (_dir, server) = test_server();
    let id = create(&server, link_key_body()).await;

    let response = server.get(&format!("/api/notes/{id}")).await;
    response.assert_status_ok();
    assert_eq!(response.header("cache-control"), "no-store");

    let note: NoteResponse = response.json();
    assert_eq!(note.id, id);
    assert_eq!(note.ciphertext, "Y2lwaGVydGV4dA==");
    assert_eq!(note.salt, None);
    assert!(!note.has_password);
    assert_eq!(note.view_policy, ViewPolicy::Unlimited);
    assert_eq!(note.views_remaining, None);
}

#[tokio::test]
async fn get_is_repeatable_for_unlimited_notes() {
    let (_dir, server) = test_server();
    let id = create(&server, link_key_body()).await;

    for _ in 0..3 {
        server
            .get(&format!("/api/notes/{id}"))
            .await
            .assert_status_ok();
        let counted: ViewResponse = server
            .post(&format!("/api/notes/{id}/views"))
            .await
            .json();
        assert!(counted.counted);
    }
}

#[tokio::test]
async fn burn_after_reading_over_http() {
    let (_dir, server) = test_server();
    let mut body = link_key_body();
    body["burn_after_reading"] = json!(true);
    let id = create(&server, body).await;

    // Loading the note twice (e.g. a password prompt) does not consume it.
    server.get(&format!("/api/notes/{id}")).await.assert_status_ok();
    let note: NoteResponse = server.get(&format!("/api/notes/{id}")).await.json();
    assert_eq!(note.view_policy, ViewPolicy::BurnAfterReading);
    assert_eq!(note.views_remaining, Some(1));

    let first: ViewResponse = server.post(&format!("/api/notes/{id}/views")).await.json();
    assert!(first.counted);
    let second: ViewResponse = server.post(&format!("/api/notes/{id}/views")).await.json();
    assert!(!second.counted);

    server
        .get(&format!("/api/notes/{id}"))
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn salt_must_match_password_flag() {
    let (_dir, server) = test_server();

    let mut body = link_key_body();
    body["has_password"] = json!(true);
    let response = server.post("/api/notes").json(&body).await;
    response.assert_status_bad_request();
    let err: ErrorResponse = response.json();
    assert!(err.error.contains("salt"), "{}", err.error);

    let mut body = link_key_body();
    body["salt"] = json!("00112233445566778899aabbccddeeff");
    server
        .post("/api/notes")
        .json(&body)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn zero_view_limit_is_rejected() {
    let (_dir, server) = test_server();
    let mut body = link_key_body();
    body["max_views"] = json!(0);
    server
        .post("/api/notes")
        .json(&body)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn past_expiry_is_rejected() {
    let (_dir, server) = test_server();
    let mut body = link_key_body();
    body["expires_at"] = json!(1);
    server
        .post("/api/notes")
        .json(&body)
        .await
        .assert_status_bad_request();
}

#[tokio::test]
async fn unknown_and_bogus_ids_look_identical() {
    let (_dir, server) = test_server();

    let missing = server.get("/api/notes/doesnotexist").await;
    missing.assert_status_not_found();
    let bogus = server.get("/api/notes/not%20an%20id").await;
    bogus.assert_status_not_found();

    let a: ErrorResponse = missing.json();
    let b: ErrorResponse = bogus.json();
    assert_eq!(a.error, b.error);
    assert_eq!(a.error, "note unavailable");
}

#[tokio::test]
async fn confirm_view_on_missing_note_is_noop() {
    let (_dir, server) = test_server();
    let response = server.post("/api/notes/doesnotexist/views").await;
    response.assert_status_ok();
    let view: ViewResponse = response.json();
    assert!(!view.counted);
}

#[tokio::test]
async fn limited_views_exhaust() {
    let (_dir, server) = test_server();
    let mut body = link_key_body();
    body["max_views"] = json!(2);
    let id = create(&server, body).await;

    for remaining in [2, 1] {
        let note: NoteResponse = server.get(&format!("/api/notes/{id}")).await.json();
        assert_eq!(note.views_remaining, Some(remaining));
        let view: ViewResponse = server.post(&format!("/api/notes/{id}/views")).await.json();
        assert!(view.counted);
    }

    server
        .get(&format!("/api/notes/{id}"))
        .await
        .assert_status_not_found();
}
