//! Admin API tests: authentication, reference data and the audit overview.
//!
//! Run with: `cargo test -p snaphub-api --test admin_test`

mod helpers;

use axum::http::StatusCode;
use axum_test::multipart::MultipartForm;
use helpers::{
    api_path, file_part, intake_form, test_config, TestApp, ADMIN_KEY, LOCAL_BASE_URL,
};
use serde_json::{json, Value};

async fn submit(app: &TestApp, token: &str, category: &str, names: &[&str]) -> Value {
    app.client()
        .post(&api_path("/intake"))
        .multipart(intake_form(token, category, names))
        .await
        .json()
}

#[tokio::test]
async fn admin_routes_require_the_bearer_key() {
    let app = TestApp::new().await;

    let missing = app
        .client()
        .get(&api_path("/admin/departments"))
        .add_header("X-Forwarded-For", "203.0.113.10")
        .await;
    assert_eq!(missing.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = missing.json();
    assert_eq!(body["code"], "AUTHORIZATION_ERROR");

    let wrong = app
        .client()
        .get(&api_path("/admin/departments"))
        .add_header("X-Forwarded-For", "203.0.113.10")
        .authorization_bearer("not-the-admin-key")
        .await;
    assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);

    let ok = app
        .client()
        .get(&api_path("/admin/departments"))
        .authorization_bearer(ADMIN_KEY)
        .await;
    assert_eq!(ok.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn repeated_failures_block_the_client() {
    let app = TestApp::new().await;

    let mut last = StatusCode::OK;
    for _ in 0..10 {
        last = app
            .client()
            .get(&api_path("/admin/tokens"))
            .add_header("X-Forwarded-For", "198.51.100.7")
            .authorization_bearer("wrong")
            .await
            .status_code();
    }
    assert_eq!(last, StatusCode::TOO_MANY_REQUESTS);

    let blocked = app
        .client()
        .get(&api_path("/admin/tokens"))
        .add_header("X-Forwarded-For", "198.51.100.7")
        .authorization_bearer(ADMIN_KEY)
        .await;
    assert_eq!(blocked.status_code(), StatusCode::TOO_MANY_REQUESTS);

    let other_client = app
        .client()
        .get(&api_path("/admin/tokens"))
        .add_header("X-Forwarded-For", "198.51.100.8")
        .authorization_bearer(ADMIN_KEY)
        .await;
    assert_eq!(other_client.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn forwarded_for_is_ignored_without_trusted_proxies() {
    let mut config = test_config();
    config.0.base.trusted_proxy_count = 0;
    let app = TestApp::with_config(config).await;

    let mut last = StatusCode::OK;
    for i in 0..10 {
        last = app
            .client()
            .get(&api_path("/admin/tokens"))
            .add_header("X-Forwarded-For", format!("198.51.100.{}", i))
            .authorization_bearer("wrong")
            .await
            .status_code();
    }
    assert_eq!(last, StatusCode::TOO_MANY_REQUESTS);

    let rotated = app
        .client()
        .get(&api_path("/admin/tokens"))
        .add_header("X-Forwarded-For", "203.0.113.9")
        .authorization_bearer(ADMIN_KEY)
        .await;
    assert_eq!(rotated.status_code(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn department_lifecycle() {
    let app = TestApp::new().await;

    let created = app
        .client()
        .post(&api_path("/admin/departments"))
        .authorization_bearer(ADMIN_KEY)
        .json(&json!({ "name": "  Lager  " }))
        .await;
    assert_eq!(created.status_code(), StatusCode::CREATED);
    let department: Value = created.json();
    assert_eq!(department["name"], "Lager");
    let id = department["id"].as_str().unwrap_or_default().to_string();

    let renamed: Value = app
        .client()
        .patch(&api_path(&format!("/admin/departments/{}", id)))
        .authorization_bearer(ADMIN_KEY)
        .json(&json!({ "name": "Lager Nord" }))
        .await
        .json();
    assert_eq!(renamed["name"], "Lager Nord");

    let deleted = app
        .client()
        .delete(&api_path(&format!("/admin/departments/{}", id)))
        .authorization_bearer(ADMIN_KEY)
        .await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);

    let again = app
        .client()
        .delete(&api_path(&format!("/admin/departments/{}", id)))
        .authorization_bearer(ADMIN_KEY)
        .await;
    assert_eq!(again.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_names_are_rejected() {
    let app = TestApp::new().await;

    let response = app
        .client()
        .post(&api_path("/admin/categories"))
        .authorization_bearer(ADMIN_KEY)
        .json(&json!({ "name": "   " }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn issued_token_can_submit_until_deactivated() {
    let app = TestApp::new().await;
    let department = app.store.seed_department("Lager");
    let category = app.store.seed_category("Schaden", false);

    let issued = app
        .client()
        .post(&api_path("/admin/tokens"))
        .authorization_bearer(ADMIN_KEY)
        .json(&json!({
            "label": "Tor 3",
            "email": "tor3@example.com",
            "department_ids": [department.id]
        }))
        .await;
    assert_eq!(issued.status_code(), StatusCode::CREATED);
    let token: Value = issued.json();
    let secret = token["token"].as_str().unwrap_or_default().to_string();
    let token_id = token["id"].as_str().unwrap_or_default().to_string();
    assert!(!secret.is_empty());
    assert_eq!(token["department_ids"], json!([department.id]));

    let first = app
        .client()
        .post(&api_path("/intake"))
        .multipart(intake_form(&secret, &category.id.to_string(), &["a.jpg"]))
        .await;
    assert_eq!(first.status_code(), StatusCode::CREATED);

    let deactivated: Value = app
        .client()
        .put(&api_path(&format!("/admin/tokens/{}/active", token_id)))
        .authorization_bearer(ADMIN_KEY)
        .json(&json!({ "active": false }))
        .await
        .json();
    assert_eq!(deactivated["active"], false);

    let second = app
        .client()
        .post(&api_path("/intake"))
        .multipart(intake_form(&secret, &category.id.to_string(), &["b.jpg"]))
        .await;
    assert_eq!(second.status_code(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let app = TestApp::new().await;

    let response = app
        .client()
        .post(&api_path("/admin/tokens"))
        .authorization_bearer(ADMIN_KEY)
        .json(&json!({ "email": "not an address" }))
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn overview_filters_by_department_and_shows_display_names() {
    let app = TestApp::new().await;
    let lager = app.store.seed_department("Lager");
    let buero = app.store.seed_department("Büro");
    let a = app.store.seed_token("tok-a", Some("Tor 3"), None);
    let b = app.store.seed_token("tok-b", None, None);
    app.store.link(a.id, lager.id);
    app.store.link(b.id, buero.id);
    let category = app.store.seed_category("Schaden", false);

    submit(&app, "tok-a", &category.id.to_string(), &["a.jpg"]).await;
    submit(&app, "tok-b", &category.id.to_string(), &["b.jpg", "c.jpg"]).await;

    let all: Value = app
        .client()
        .get(&api_path("/admin/overview"))
        .authorization_bearer(ADMIN_KEY)
        .await
        .json();
    assert_eq!(all.as_array().map(Vec::len), Some(2));

    let filtered = app
        .client()
        .get(&api_path("/admin/overview"))
        .add_query_param("department_id", lager.id)
        .add_query_param("sort", "process_number_asc")
        .authorization_bearer(ADMIN_KEY)
        .await;
    assert_eq!(filtered.status_code(), StatusCode::OK);
    let rows: Value = filtered.json();
    assert_eq!(rows.as_array().map(Vec::len), Some(1));
    assert_eq!(rows[0]["token"], "Tor 3 (tok-a)");
    assert_eq!(rows[0]["department"], "Lager");
    assert_eq!(rows[0]["category"], "Schaden");
    assert_eq!(rows[0]["upload_count"], 1);
}

#[tokio::test]
async fn process_detail_and_upload_deletion() {
    let app = TestApp::new().await;
    app.store.seed_token("tok-a", None, None);
    let category = app.store.seed_category("Schaden", false);
    let created = submit(&app, "tok-a", &category.id.to_string(), &["a.jpg", "b.jpg"]).await;
    let process_id = created["process"]["id"].as_str().unwrap_or_default().to_string();

    let detail: Value = app
        .client()
        .get(&api_path(&format!("/admin/processes/{}", process_id)))
        .authorization_bearer(ADMIN_KEY)
        .await
        .json();
    let uploads = detail["uploads"].as_array().cloned().unwrap_or_default();
    assert_eq!(uploads.len(), 2);
    let url = uploads[0]["public_url"].as_str().unwrap_or_default();
    assert!(url.starts_with("https://files.test/"), "{url}");

    let upload_id = uploads[0]["id"].as_str().unwrap_or_default().to_string();
    let key = uploads[0]["file_path"].as_str().unwrap_or_default().to_string();
    let deleted = app
        .client()
        .delete(&api_path(&format!("/admin/uploads/{}", upload_id)))
        .authorization_bearer(ADMIN_KEY)
        .await;
    assert_eq!(deleted.status_code(), StatusCode::NO_CONTENT);
    assert!(!app.storage.has_blob(&key));
    assert_eq!(app.store.uploads_snapshot().len(), 1);
}

#[tokio::test]
async fn local_blobs_are_served_at_their_public_url() {
    let dir = tempfile::tempdir().unwrap();
    let app = TestApp::with_local_storage(dir.path()).await;
    app.store.seed_token("tok-a", None, None);
    let category = app.store.seed_category("Schaden", false);
    let created = submit(&app, "tok-a", &category.id.to_string(), &["a.jpg"]).await;
    let process_id = created["process"]["id"].as_str().unwrap_or_default().to_string();

    let detail: Value = app
        .client()
        .get(&api_path(&format!("/admin/processes/{}", process_id)))
        .authorization_bearer(ADMIN_KEY)
        .await
        .json();
    let url = detail["uploads"][0]["public_url"].as_str().unwrap_or_default();
    assert!(url.starts_with(LOCAL_BASE_URL), "{url}");
    let path = &url["http://localhost:4000".len()..];

    let served = app.client().get(path).await;
    assert_eq!(served.status_code(), StatusCode::OK);
    assert_eq!(served.as_bytes().to_vec(), b"\xff\xd8jpeg".to_vec());

    let missing = app.client().get("/files/1/nothing.jpg").await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn failed_blob_removal_keeps_the_record() {
    let app = TestApp::new().await;
    app.store.seed_token("tok-a", None, None);
    let category = app.store.seed_category("Schaden", false);
    submit(&app, "tok-a", &category.id.to_string(), &["a.jpg"]).await;
    let upload = app.store.uploads_snapshot().remove(0);
    app.storage.fail_remove_containing(&upload.file_path);

    let response = app
        .client()
        .delete(&api_path(&format!("/admin/uploads/{}", upload.id)))
        .authorization_bearer(ADMIN_KEY)
        .await;

    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);
    assert_eq!(app.store.uploads_snapshot().len(), 1);
    assert!(app.storage.has_blob(&upload.file_path));
}

#[tokio::test]
async fn admin_append_ignores_ownership() {
    let app = TestApp::new().await;
    app.store.seed_token("tok-a", None, None);
    let category = app.store.seed_category("Schaden", false);
    let created = submit(&app, "tok-a", &category.id.to_string(), &["a.jpg"]).await;
    let process_id = created["process"]["id"].as_str().unwrap_or_default().to_string();

    let response = app
        .client()
        .post(&api_path(&format!("/admin/processes/{}/files", process_id)))
        .authorization_bearer(ADMIN_KEY)
        .multipart(
            MultipartForm::new().add_part("files", file_part("scan.pdf", "application/pdf", b"%PDF")),
        )
        .await;

    assert_eq!(response.status_code(), StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["notification"]["status"], "not_requested");
    assert_eq!(app.storage.keys().len(), 2);
}

#[tokio::test]
async fn reconcile_dry_run_reports_old_orphans_only() {
    let app = TestApp::new().await;
    let old = chrono::Utc::now() - chrono::Duration::hours(2);
    app.storage.insert_blob("7/1_0_stale.jpg", b"x", old);
    app.storage.insert_blob("7/2_0_fresh.jpg", b"x", chrono::Utc::now());

    let response = app
        .client()
        .post(&api_path("/admin/maintenance/reconcile"))
        .add_query_param("dry_run", true)
        .authorization_bearer(ADMIN_KEY)
        .await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let report: Value = response.json();
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["orphaned_blobs"], json!(["7/1_0_stale.jpg"]));
    assert_eq!(report["removed"], 0);
    assert!(app.storage.has_blob("7/1_0_stale.jpg"));
}
