use docproc_common::DocumentStatus;
use docproc_server::entity::document;
use sea_orm::{DatabaseBackend, MockDatabase};
use uuid::Uuid;

use crate::common::{
    MAX_FILE_SIZE, TestApp, count_row, document_row, routes, rows_affected,
};

fn mock() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

mod upload {
    use super::*;

    #[tokio::test]
    async fn stores_file_and_returns_pending_document() {
        let row = document_row(Uuid::now_v7(), DocumentStatus::Pending, false);
        let app = TestApp::spawn(mock().append_query_results([vec![row.clone()]])).await;

        let res = app
            .upload_file(
                "meeting notes.txt",
                "text/plain",
                b"Agenda. Budget review.".to_vec(),
                Some("alice"),
            )
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["id"], row.id.to_string());
        assert_eq!(res.body["status"], "Pending");
        assert_eq!(res.body["is_deleted"], false);

        let sql = app.executed_sql();
        assert_eq!(sql.len(), 1);
        let insert = &sql[0];
        assert!(insert.starts_with(r#"INSERT INTO "dps_dbo"."documents""#), "{insert}");
        assert!(insert.contains("'meeting notes.txt'"), "{insert}");
        assert!(insert.contains("'.txt'"), "{insert}");
        assert!(insert.contains("'alice'"), "{insert}");
        assert!(insert.contains("'Pending'"), "{insert}");
        assert_eq!(app.stored_file_count(), 1);
    }

    #[tokio::test]
    async fn anonymous_upload_guesses_content_type() {
        let row = document_row(Uuid::now_v7(), DocumentStatus::Pending, false);
        let app = TestApp::spawn(mock().append_query_results([vec![row]])).await;

        let res = app
            .upload_file("report.pdf", "application/octet-stream", b"%PDF".to_vec(), None)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        let insert = &app.executed_sql()[0];
        assert!(insert.contains("'application/pdf'"), "{insert}");
        assert!(insert.contains("'anonymous'"), "{insert}");
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let app = TestApp::spawn(mock()).await;

        let form = reqwest::multipart::Form::new().text("uploaded_by", "alice");
        let res = app.upload(form).await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
        assert!(app.executed_sql().is_empty());
    }

    #[tokio::test]
    async fn hidden_file_name_is_rejected() {
        let app = TestApp::spawn(mock()).await;

        let res = app
            .upload_file(".env", "text/plain", b"SECRET=1".to_vec(), None)
            .await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
        assert!(res.body["message"].as_str().unwrap().contains("hidden"));
        assert_eq!(app.stored_file_count(), 0);
    }

    #[tokio::test]
    async fn second_file_field_is_rejected_and_first_discarded() {
        let app = TestApp::spawn(mock()).await;

        let part = |name: &str| {
            reqwest::multipart::Part::bytes(b"text".to_vec())
                .file_name(name.to_string())
                .mime_str("text/plain")
                .unwrap()
        };
        let form = reqwest::multipart::Form::new()
            .part("file", part("a.txt"))
            .part("file", part("b.txt"));
        let res = app.upload(form).await;

        assert_eq!(res.status, 400, "{}", res.text);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
        assert_eq!(app.stored_file_count(), 0);
        assert!(app.executed_sql().is_empty());
    }

    #[tokio::test]
    async fn oversized_file_is_rejected() {
        let app = TestApp::spawn(mock()).await;

        let res = app
            .upload_file(
                "big.txt",
                "text/plain",
                vec![b'a'; MAX_FILE_SIZE as usize + 1],
                None,
            )
            .await;

        assert_eq!(res.status, 413, "{}", res.text);
        assert_eq!(res.error_code(), "PAYLOAD_TOO_LARGE");
        assert!(app.executed_sql().is_empty());
        assert_eq!(app.stored_file_count(), 0);
    }
}

mod reading {
    use super::*;

    #[tokio::test]
    async fn get_returns_live_document() {
        let row = document_row(Uuid::now_v7(), DocumentStatus::Completed, false);
        let app = TestApp::spawn(mock().append_query_results([vec![row.clone()]])).await;

        let res = app.get(&routes::document(row.id)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["original_file_name"], "meeting notes.txt");
        assert_eq!(res.body["status"], "Completed");

        let select = &app.executed_sql()[0];
        assert!(select.contains(r#""isdeleted" = 0"#), "{select}");
    }

    #[tokio::test]
    async fn get_of_deleted_or_missing_document_is_not_found() {
        let app =
            TestApp::spawn(mock().append_query_results([Vec::<document::Model>::new()])).await;

        let res = app.get(&routes::document(Uuid::now_v7())).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.error_code(), "NOT_FOUND");
    }

    #[tokio::test]
    async fn malformed_id_is_a_validation_error() {
        let app = TestApp::spawn(mock()).await;

        let res = app.get("/api/v1/documents/not-a-uuid").await;

        assert_eq!(res.status, 400);
        assert_eq!(res.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn list_pages_live_documents() {
        let newer = document_row(Uuid::now_v7(), DocumentStatus::Pending, false);
        let older = document_row(Uuid::now_v7(), DocumentStatus::Completed, false);
        let app = TestApp::spawn(
            mock()
                .append_query_results([[count_row(3)]])
                .append_query_results([vec![newer.clone(), older.clone()]]),
        )
        .await;

        let res = app
            .get(&format!("{}?page=1&per_page=2", routes::DOCUMENTS))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"].as_array().unwrap().len(), 2);
        assert_eq!(res.body["data"][0]["id"], newer.id.to_string());
        assert_eq!(res.body["pagination"]["total"], 3);
        assert_eq!(res.body["pagination"]["total_pages"], 2);

        for stmt in app.executed_sql() {
            assert!(stmt.contains(r#""isdeleted" = 0"#), "{stmt}");
        }
    }

    #[tokio::test]
    async fn list_far_past_the_end_is_empty_not_an_error() {
        let app = TestApp::spawn(
            mock()
                .append_query_results([[count_row(3)]])
                .append_query_results([Vec::<document::Model>::new()]),
        )
        .await;

        let res = app
            .get(&format!("{}?page=18446744073709551615", routes::DOCUMENTS))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["data"].as_array().unwrap().is_empty());
        assert_eq!(res.body["pagination"]["page"], 1_000_000);
        assert_eq!(res.body["pagination"]["total"], 3);
    }

    #[tokio::test]
    async fn list_with_include_deleted_skips_the_filter() {
        let deleted = document_row(Uuid::now_v7(), DocumentStatus::Pending, true);
        let app = TestApp::spawn(
            mock()
                .append_query_results([[count_row(1)]])
                .append_query_results([vec![deleted.clone()]]),
        )
        .await;

        let res = app
            .get(&format!("{}?include_deleted=true&status=Pending", routes::DOCUMENTS))
            .await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"][0]["is_deleted"], true);

        for stmt in app.executed_sql() {
            assert!(!stmt.contains("isdeleted"), "{stmt}");
            assert!(stmt.contains(r#""status" = 'Pending'"#), "{stmt}");
        }
    }

    #[tokio::test]
    async fn content_streams_stored_bytes() {
        let bytes = b"Quarterly numbers are up.".to_vec();
        let mut row = document_row(Uuid::now_v7(), DocumentStatus::Pending, false);
        row.file_size = bytes.len() as i64;
        let app = TestApp::spawn(mock().append_query_results([vec![row.clone()]])).await;
        app.store_file(&row, &bytes).await;

        let res = app.get(&routes::document_content(row.id)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.text.as_bytes(), bytes.as_slice());
        assert_eq!(res.header("content-type"), Some("text/plain"));
        assert_eq!(
            res.header("content-disposition"),
            Some("attachment; filename=\"meeting notes.txt\"; filename*=UTF-8''meeting%20notes.txt")
        );
    }

    #[tokio::test]
    async fn content_of_missing_file_is_not_found() {
        let row = document_row(Uuid::now_v7(), DocumentStatus::Pending, false);
        let app = TestApp::spawn(mock().append_query_results([vec![row.clone()]])).await;

        let res = app.get(&routes::document_content(row.id)).await;

        assert_eq!(res.status, 404);
        assert_eq!(res.error_code(), "NOT_FOUND");
    }
}

mod processing {
    use super::*;

    #[tokio::test]
    async fn process_summarizes_and_completes() {
        let id = Uuid::now_v7();
        let pending = document_row(id, DocumentStatus::Pending, false);
        let mut completed = document_row(id, DocumentStatus::Completed, false);
        completed.summary = Some("Quarterly numbers are up.".into());

        let app = TestApp::spawn(
            mock()
                .append_query_results([vec![pending.clone()]])
                .append_exec_results([rows_affected(1), rows_affected(1)])
                .append_query_results([vec![completed]]),
        )
        .await;
        app.store_file(&pending, b"Quarterly numbers are up.  Costs are flat.")
            .await;

        let res = app.post(&routes::document_process(id)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "Completed");

        let sql = app.executed_sql();
        assert_eq!(sql.len(), 4, "{sql:#?}");
        assert!(sql[1].contains(r#"SET "status" = 'Processing'"#), "{}", sql[1]);
        assert!(sql[1].contains(r#""status" <> 'Processing'"#), "{}", sql[1]);
        assert!(sql[2].contains(r#""status" = 'Completed'"#), "{}", sql[2]);
        assert!(
            sql[2].contains("'Quarterly numbers are up. Costs are flat.'"),
            "{}",
            sql[2]
        );
    }

    #[tokio::test]
    async fn unreadable_document_is_marked_failed() {
        let id = Uuid::now_v7();
        let mut pending = document_row(id, DocumentStatus::Pending, false);
        pending.content_type = "image/png".into();
        pending.file_extension = ".png".into();
        pending.storage_path = format!("{id}.png");
        let mut failed = pending.clone();
        failed.status = DocumentStatus::Failed;

        let app = TestApp::spawn(
            mock()
                .append_query_results([vec![pending.clone()]])
                .append_exec_results([rows_affected(1), rows_affected(1)])
                .append_query_results([vec![failed]]),
        )
        .await;
        app.store_file(&pending, &[0x89, b'P', b'N', b'G']).await;

        let res = app.post(&routes::document_process(id)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["status"], "Failed");
        let sql = app.executed_sql();
        assert!(sql[2].contains(r#""status" = 'Failed'"#), "{}", sql[2]);
        assert!(sql[2].contains("unsupported file type"), "{}", sql[2]);
    }

    #[tokio::test]
    async fn in_flight_document_conflicts() {
        // The read still says Pending; the guarded UPDATE matching no row is what counts.
        let row = document_row(Uuid::now_v7(), DocumentStatus::Pending, false);
        let app = TestApp::spawn(
            mock()
                .append_query_results([vec![row.clone()]])
                .append_exec_results([rows_affected(0)]),
        )
        .await;

        let res = app.post(&routes::document_process(row.id)).await;

        assert_eq!(res.status, 409, "{}", res.text);
        assert_eq!(res.error_code(), "CONFLICT");
        let sql = app.executed_sql();
        assert_eq!(sql.len(), 2, "{sql:#?}");
    }

    #[tokio::test]
    async fn repeated_requests_run_the_work_once() {
        let id = Uuid::now_v7();
        let pending = document_row(id, DocumentStatus::Pending, false);
        let mut completed = document_row(id, DocumentStatus::Completed, false);
        completed.summary = Some("Quarterly numbers are up.".into());

        let app = TestApp::spawn(
            mock()
                .append_query_results([vec![pending.clone()]])
                .append_exec_results([rows_affected(1), rows_affected(1)])
                .append_query_results([vec![completed], vec![pending.clone()]])
                .append_exec_results([rows_affected(0)]),
        )
        .await;
        app.store_file(&pending, b"Quarterly numbers are up.").await;

        let first = app.post(&routes::document_process(id)).await;
        let second = app.post(&routes::document_process(id)).await;

        assert_eq!(first.status, 200, "{}", first.text);
        assert_eq!(second.status, 409, "{}", second.text);
        let sql = app.executed_sql();
        let finishes = sql
            .iter()
            .filter(|s| s.contains("'Completed'") || s.contains("'Failed'"))
            .count();
        assert_eq!(finishes, 1, "{sql:#?}");
    }

    #[tokio::test]
    async fn processing_a_missing_document_is_not_found() {
        let app =
            TestApp::spawn(mock().append_query_results([Vec::<document::Model>::new()])).await;

        let res = app.post(&routes::document_process(Uuid::now_v7())).await;

        assert_eq!(res.status, 404);
    }
}

mod deletion {
    use super::*;

    #[tokio::test]
    async fn delete_flags_once_then_reports_not_found() {
        let id = Uuid::now_v7();
        let app = TestApp::spawn(
            mock().append_exec_results([rows_affected(1), rows_affected(0)]),
        )
        .await;

        let first = app.delete(&routes::document(id)).await;
        assert_eq!(first.status, 204, "{}", first.text);

        let second = app.delete(&routes::document(id)).await;
        assert_eq!(second.status, 404);
        assert_eq!(second.error_code(), "NOT_FOUND");

        let sql = app.executed_sql();
        assert!(sql.iter().all(|s| s.starts_with("UPDATE")), "{sql:#?}");
        assert!(sql[0].contains(r#"SET "isdeleted" = 1"#), "{}", sql[0]);
    }

    #[tokio::test]
    async fn restore_brings_document_back() {
        let row = document_row(Uuid::now_v7(), DocumentStatus::Completed, false);
        let app = TestApp::spawn(
            mock()
                .append_exec_results([rows_affected(1)])
                .append_query_results([vec![row.clone()]]),
        )
        .await;

        let res = app.post(&routes::document_restore(row.id)).await;

        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["is_deleted"], false);
        assert!(app.executed_sql()[0].contains(r#"SET "isdeleted" = 0"#));
    }

    #[tokio::test]
    async fn restore_of_live_document_is_not_found() {
        let app = TestApp::spawn(mock().append_exec_results([rows_affected(0)])).await;

        let res = app.post(&routes::document_restore(Uuid::now_v7())).await;

        assert_eq!(res.status, 404);
    }
}
