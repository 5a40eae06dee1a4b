use sea_orm::{DatabaseBackend, MockDatabase};

use crate::common::{TestApp, routes};

#[tokio::test]
async fn database_info_reports_source_without_url() {
    let app = TestApp::spawn(MockDatabase::new(DatabaseBackend::Postgres)).await;

    let res = app.get(routes::DATABASE_INFO).await;

    assert_eq!(res.status, 200, "{}", res.text);
    assert_eq!(res.body["database_type"], "PostgreSQL (Local)");
    assert_eq!(res.body["secret_name"], "config");
    assert_eq!(res.body["host_address"], "localhost:5432");
    assert!(!res.text.contains("postgres://"));
}

#[tokio::test]
async fn openapi_document_lists_document_routes() {
    let app = TestApp::spawn(MockDatabase::new(DatabaseBackend::Postgres)).await;

    let res = app.get(routes::OPENAPI).await;

    assert_eq!(res.status, 200);
    let paths = res.body["paths"].as_object().expect("paths object");
    for path in [
        "/api/v1/documents",
        "/api/v1/documents/{id}",
        "/api/v1/documents/{id}/process",
        "/api/v1/documents/{id}/restore",
        "/api/v1/documents/{id}/content",
        "/api/v1/system/database",
    ] {
        assert!(
            paths.keys().any(|k| k.trim_end_matches('/') == path),
            "missing {path}"
        );
    }
}
