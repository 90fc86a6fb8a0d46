mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{body_to_json, TestApp, DEMO_TOKEN};

async fn create_document(app: &TestApp, title: &str) -> String {
    let response = app
        .post_json(
            "/api/documents",
            &json!({ "title": title, "inputLanguage": "en", "outputLanguage": "en" }),
            Some(DEMO_TOKEN),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let doc = body_to_json(response.into_body()).await.unwrap();
    doc["id"].as_str().unwrap().to_string()
}

async fn add_session(
    app: &TestApp,
    document_id: &str,
    transcript: &str,
    duration: u64,
) -> serde_json::Value {
    let response = app
        .post_json(
            &format!("/api/documents/{document_id}/sessions"),
            &json!({ "transcript": transcript, "duration": duration }),
            Some(DEMO_TOKEN),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_to_json(response.into_body()).await.unwrap()
}

async fn fetch_document(app: &TestApp, id: &str) -> serde_json::Value {
    let response = app
        .get(&format!("/api/documents/{id}"), Some(DEMO_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_to_json(response.into_body()).await.unwrap()
}

#[tokio::test]
async fn adding_sessions_recomputes_document_aggregates() {
    let app = TestApp::new();
    let id = create_document(&app, "Aggregates").await;

    let session = add_session(&app, &id, "hello world", 5).await;
    assert_eq!(session["sessionNumber"], 1);

    let doc = fetch_document(&app, &id).await;
    assert_eq!(doc["totalSessions"], 1);
    assert_eq!(doc["totalDuration"], 5);
    assert_eq!(doc["wordCount"], 2);
    assert_eq!(doc["requiresRegeneration"], true);

    add_session(&app, &id, "  one   two three ", 7).await;
    let doc = fetch_document(&app, &id).await;
    assert_eq!(doc["totalSessions"], 2);
    assert_eq!(doc["totalDuration"], 12);
    assert_eq!(doc["wordCount"], 5);
}

#[tokio::test]
async fn sessions_list_in_both_orders() {
    let app = TestApp::new();
    let id = create_document(&app, "Ordering").await;
    add_session(&app, &id, "first", 1).await;
    add_session(&app, &id, "second", 1).await;
    add_session(&app, &id, "third", 1).await;

    // the default listing is the newest-first history view
    let response = app
        .get(&format!("/api/documents/{id}/sessions"), Some(DEMO_TOKEN))
        .await
        .unwrap();
    let history = body_to_json(response.into_body()).await.unwrap();
    let numbers: Vec<u64> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["sessionNumber"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![3, 2, 1]);

    let response = app
        .get(
            &format!("/api/documents/{id}/sessions?order=asc"),
            Some(DEMO_TOKEN),
        )
        .await
        .unwrap();
    let transcript_order = body_to_json(response.into_body()).await.unwrap();
    let numbers: Vec<u64> = transcript_order
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["sessionNumber"].as_u64().unwrap())
        .collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let response = app
        .get(
            &format!("/api/documents/{id}/sessions?order=sideways"),
            Some(DEMO_TOKEN),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patching_a_session_appends_transcript_and_adds_duration() {
    let app = TestApp::new();
    let id = create_document(&app, "Patching").await;
    let session = add_session(&app, &id, "hello world", 5).await;
    let session_id = session["id"].as_str().unwrap();

    let response = app
        .patch_json(
            &format!("/api/sessions/{session_id}"),
            &json!({ "transcript": "more words", "duration": 3, "notes": "second take" }),
            Some(DEMO_TOKEN),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_to_json(response.into_body()).await.unwrap();
    assert_eq!(updated["transcript"], "hello world more words");
    assert_eq!(updated["duration"], 8);
    assert_eq!(updated["notes"], "second take");

    let doc = fetch_document(&app, &id).await;
    assert_eq!(doc["totalDuration"], 8);
    assert_eq!(doc["wordCount"], 4);
    assert_eq!(doc["requiresRegeneration"], true);
}

#[tokio::test]
async fn deleting_a_session_recomputes_aggregates() {
    let app = TestApp::new();
    let id = create_document(&app, "Shrinking").await;
    let first = add_session(&app, &id, "hello world", 5).await;
    add_session(&app, &id, "one two three", 7).await;

    let session_id = first["id"].as_str().unwrap();
    let response = app
        .delete(&format!("/api/sessions/{session_id}"), Some(DEMO_TOKEN))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let doc = fetch_document(&app, &id).await;
    assert_eq!(doc["totalSessions"], 1);
    assert_eq!(doc["totalDuration"], 7);
    assert_eq!(doc["wordCount"], 3);
}

#[tokio::test]
async fn blank_transcripts_are_rejected() {
    let app = TestApp::new();
    let id = create_document(&app, "Validation").await;

    let response = app
        .post_json(
            &format!("/api/documents/{id}/sessions"),
            &json!({ "transcript": "   ", "duration": 2 }),
            Some(DEMO_TOKEN),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
