//! Integration tests for task attachments: upload, download, ownership.

use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Start the server on a random port with the given upload cap and return
/// its base URL.
async fn start_test_server(max_upload_size_mb: u32) -> String {
    let tmp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let data_dir = tmp_dir.path().to_str().unwrap().to_string();
    let upload_dir = tmp_dir.path().join("uploads");
    std::fs::create_dir_all(&upload_dir).expect("Failed to create upload dir");

    let jwt_secret = taskhub_server::auth::jwt::load_or_generate_jwt_secret(&data_dir)
        .expect("Failed to generate JWT secret");

    let state = taskhub_server::state::AppState {
        store: taskhub_server::store::Store::new(),
        jwt_secret,
        connections: Arc::new(taskhub_server::ws::ConnectionRegistry::new()),
        upload_dir: upload_dir.to_str().unwrap().to_string(),
        max_upload_size_mb,
    };

    let app = taskhub_server::routes::build_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
        let _keep = tmp_dir;
    });

    format!("http://{}", addr)
}

/// Register a user and return a bearer token for them.
async fn register_and_login(base_url: &str, username: &str, email: &str) -> String {
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/auth/register", base_url))
        .json(&json!({"username": username, "email": email, "password": "pw12345678"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201, "Registration failed for {}", username);

    let resp = client
        .post(format!("{}/auth/login", base_url))
        .json(&json!({"email": email, "password": "pw12345678"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200, "Login failed for {}", username);

    let body: serde_json::Value = resp.json().await.unwrap();
    body["access_token"].as_str().unwrap().to_string()
}

/// Create a task and return its id.
async fn create_task(base_url: &str, token: &str, title: &str) -> String {
    let body: serde_json::Value = reqwest::Client::new()
        .post(format!("{}/tasks", base_url))
        .bearer_auth(token)
        .json(&json!({"title": title}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["id"].as_str().unwrap().to_string()
}

fn file_form(name: &str, data: Vec<u8>) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(data).file_name(name.to_string());
    reqwest::multipart::Form::new().part("file", part)
}

#[tokio::test]
async fn test_upload_and_download_round_trip() {
    let base_url = start_test_server(25).await;
    let token = register_and_login(&base_url, "ann", "ann@x.com").await;
    let task_id = create_task(&base_url, &token, "with attachment").await;
    let client = reqwest::Client::new();

    let content = b"meeting notes: ship on friday".to_vec();
    let resp = client
        .post(format!("{}/tasks/{}/files", base_url, task_id))
        .bearer_auth(&token)
        .multipart(file_form("notes.txt", content.clone()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["filename"], "notes.txt");
    let file_id = body["id"].as_str().unwrap();

    let resp = client
        .get(format!("{}/files/{}", base_url, file_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-type"],
        "application/octet-stream"
    );
    assert_eq!(resp.bytes().await.unwrap().to_vec(), content);
}

#[tokio::test]
async fn test_upload_requires_an_owned_task() {
    let base_url = start_test_server(25).await;
    let ann = register_and_login(&base_url, "ann", "ann@x.com").await;
    let bob = register_and_login(&base_url, "bob", "bob@x.com").await;
    let ann_task = create_task(&base_url, &ann, "ann's task").await;
    let client = reqwest::Client::new();

    // bob cannot attach to ann's task
    let resp = client
        .post(format!("{}/tasks/{}/files", base_url, ann_task))
        .bearer_auth(&bob)
        .multipart(file_form("sneaky.txt", b"hi".to_vec()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // unknown task id
    let resp = client
        .post(format!("{}/tasks/{}/files", base_url, "no-such-task"))
        .bearer_auth(&ann)
        .multipart(file_form("void.txt", b"hi".to_vec()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_download_is_owner_scoped() {
    let base_url = start_test_server(25).await;
    let ann = register_and_login(&base_url, "ann", "ann@x.com").await;
    let bob = register_and_login(&base_url, "bob", "bob@x.com").await;
    let task_id = create_task(&base_url, &ann, "private").await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .post(format!("{}/tasks/{}/files", base_url, task_id))
        .bearer_auth(&ann)
        .multipart(file_form("secret.txt", b"for ann only".to_vec()))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let file_id = body["id"].as_str().unwrap();

    let resp = client
        .get(format!("{}/files/{}", base_url, file_id))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_upload_without_file_part_is_rejected() {
    let base_url = start_test_server(25).await;
    let token = register_and_login(&base_url, "ann", "ann@x.com").await;
    let task_id = create_task(&base_url, &token, "no attachment").await;

    let form = reqwest::multipart::Form::new().text("comment", "no file here");
    let resp = reqwest::Client::new()
        .post(format!("{}/tasks/{}/files", base_url, task_id))
        .bearer_auth(&token)
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_oversize_upload_is_rejected() {
    let base_url = start_test_server(1).await;
    let token = register_and_login(&base_url, "ann", "ann@x.com").await;
    let task_id = create_task(&base_url, &token, "big attachment").await;

    // just over the 1 MB cap, but within the body-limit allowance
    let oversized = vec![0u8; 1024 * 1024 + 10 * 1024];
    let resp = reqwest::Client::new()
        .post(format!("{}/tasks/{}/files", base_url, task_id))
        .bearer_auth(&token)
        .multipart(file_form("big.bin", oversized))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);
}
