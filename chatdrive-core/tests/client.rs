use std::path::Path;
use std::time::Duration;

use chatdrive_core::{Backend, BackendError, CommandClient, ErrorClass};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn connect_sends_api_id() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/commands/connect"))
        .and(body_json(json!({ "apiId": 12345 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CommandClient::with_base_url(&server.uri()).unwrap();
    client.connect(12345).await.unwrap();
}

#[tokio::test]
async fn unit_reply_without_payload_is_accepted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/commands/logout"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    let client = CommandClient::with_base_url(&server.uri()).unwrap();
    client.logout().await.unwrap();
}

#[tokio::test]
async fn scan_folders_decodes_folder_list() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/commands/scan_folders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": [
                { "id": -1001, "name": "Photos" },
                { "id": -1002, "name": "Docs", "parent_id": -1001 }
            ]
        })))
        .mount(&server)
        .await;

    let client = CommandClient::with_base_url(&server.uri()).unwrap();
    let folders = client.scan_folders().await.unwrap();

    assert_eq!(folders.len(), 2);
    assert_eq!(folders[0].name, "Photos");
    assert_eq!(folders[1].parent_id, Some(-1001));
}

#[tokio::test]
async fn list_files_for_root_sends_null_folder() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/commands/get_files"))
        .and(body_json(json!({ "folderId": null })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": [{
                "id": 10,
                "folder_id": null,
                "name": "notes.txt",
                "size": 42,
                "mime_type": "text/plain",
                "file_ext": "txt",
                "created_at": "2024-01-01T00:00:00Z",
                "icon_type": "document"
            }]
        })))
        .mount(&server)
        .await;

    let client = CommandClient::with_base_url(&server.uri()).unwrap();
    let files = client.list_files(None).await.unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].size, 42);
    assert_eq!(files[0].file_ext.as_deref(), Some("txt"));
}

#[tokio::test]
async fn move_files_sends_ids_and_both_folders() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/commands/move_files"))
        .and(body_json(json!({
            "messageIds": [1, 2, 3],
            "sourceFolderId": null,
            "targetFolderId": 9
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CommandClient::with_base_url(&server.uri()).unwrap();
    client.move_files(&[1, 2, 3], None, Some(9)).await.unwrap();
}

#[tokio::test]
async fn download_file_sends_save_path() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/commands/download_file"))
        .and(body_json(json!({
            "messageId": 77,
            "savePath": "/tmp/out/report.pdf",
            "folderId": 5
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "data": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = CommandClient::with_base_url(&server.uri()).unwrap();
    client
        .download_file(77, Path::new("/tmp/out/report.pdf"), Some(5))
        .await
        .unwrap();
}

#[tokio::test]
async fn command_error_carries_structured_code() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/commands/delete_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "error": { "code": "not_found", "message": "Folder/Chat 4 gone" }
        })))
        .mount(&server)
        .await;

    let client = CommandClient::with_base_url(&server.uri()).unwrap();
    let err = client
        .delete_folder(4)
        .await
        .expect_err("expected command error");

    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Folder/Chat 4 gone");
}

#[tokio::test]
async fn http_failure_is_reported_with_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/commands/create_folder"))
        .respond_with(ResponseTemplate::new(401).set_body_string("session expired"))
        .mount(&server)
        .await;

    let client = CommandClient::with_base_url(&server.uri()).unwrap();
    let err = client
        .create_folder("Docs")
        .await
        .expect_err("expected api error");

    match &err {
        BackendError::Api { body, .. } => assert_eq!(body, "session expired"),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.classification(), ErrorClass::Auth);
}

#[tokio::test]
async fn missing_payload_for_list_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/commands/search_global"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .mount(&server)
        .await;

    let client = CommandClient::with_base_url(&server.uri()).unwrap();
    let err = client
        .search_global("report")
        .await
        .expect_err("expected decode error");

    assert!(matches!(err, BackendError::Decode { .. }));
}

#[tokio::test]
async fn probe_reports_reachable_listener() {
    let server = MockServer::start().await;
    let addr = server.address().to_string();

    let client = CommandClient::with_base_url(&server.uri())
        .unwrap()
        .with_probe(addr, Duration::from_secs(1));

    assert!(client.is_network_available().await.unwrap());
}

#[tokio::test]
async fn probe_reports_unreachable_address() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let client = CommandClient::new()
        .unwrap()
        .with_probe(addr, Duration::from_millis(500));

    assert!(!client.is_network_available().await.unwrap());
}
