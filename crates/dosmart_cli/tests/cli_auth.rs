use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("dosmart-{nanos}-{file_name}"))
}

fn write_session(path: &Path, entries: Value) {
    let content = json!({
        "schema_version": 1,
        "entries": entries
    });
    std::fs::write(path, serde_json::to_string_pretty(&content).unwrap()).unwrap();
}

fn read_entries(path: &Path) -> Value {
    let stored: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    stored["entries"].clone()
}

fn run(server: &MockServer, store_path: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_dosmart"))
        .args(args)
        .env("DOSMART_STORE_PATH", store_path)
        .env("DOSMART_CONFIG_PATH", temp_path("missing-config.json"))
        .env("DOSMART_API_BASE_URL", format!("{}/api", server.uri()))
        .env_remove("DOSMART_PASSWORD")
        .env_remove("DOSMART_LOG")
        .output()
        .expect("failed to run dosmart")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn login_persists_token_and_username() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({ "username": "ada", "password": "pw" })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "ok", "token": "tok-1" })),
        )
        .expect(1)
        .mount(&server)
        .await;
    let store_path = temp_path("login.json");

    let output = run(&server, &store_path, &["login", "-u", "ada", "--password", "pw"]);

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Logged in as ada"));
    let entries = read_entries(&store_path);
    std::fs::remove_file(&store_path).ok();
    assert_eq!(entries["token"], "tok-1");
    assert_eq!(entries["authToken"], "tok-1");
    assert_eq!(entries["username"], "ada");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn login_failure_prints_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "error": "Invalid credentials" })),
        )
        .mount(&server)
        .await;
    let store_path = temp_path("login-fail.json");

    let output = run(&server, &store_path, &["login", "-u", "ada", "--password", "nope"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stderr.trim_end(), "ERROR: rejected - Invalid credentials");
    assert!(!store_path.exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn signup_registers_then_logs_in() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": "User registered successfully",
            "user": { "id": "u1", "username": "grace" }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "token": "tok-2" })))
        .expect(1)
        .mount(&server)
        .await;
    let store_path = temp_path("signup.json");

    let output = Command::new(env!("CARGO_BIN_EXE_dosmart"))
        .args(["signup", "-u", "grace", "--json"])
        .env("DOSMART_STORE_PATH", &store_path)
        .env("DOSMART_CONFIG_PATH", temp_path("missing-config.json"))
        .env("DOSMART_API_BASE_URL", format!("{}/api", server.uri()))
        .env("DOSMART_PASSWORD", "pw")
        .output()
        .expect("failed to run signup");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(printed["username"], "grace");
    let entries = read_entries(&store_path);
    std::fs::remove_file(&store_path).ok();
    assert_eq!(entries["token"], "tok-2");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn signup_reports_failed_follow_up_login() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "message": "ok" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let store_path = temp_path("signup-fail.json");

    let output = run(&server, &store_path, &["signup", "-u", "grace", "--password", "pw"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Login after signup failed"), "{stderr}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn logout_clears_every_session_key() {
    let server = MockServer::start().await;
    let store_path = temp_path("logout.json");
    write_session(
        &store_path,
        json!({
            "token": "tok-1",
            "authToken": "tok-1",
            "username": "ada",
            "tasks": []
        }),
    );

    let first = run(&server, &store_path, &["logout"]);
    let second = run(&server, &store_path, &["logout"]);

    assert!(first.status.success());
    assert!(second.status.success());
    let entries = read_entries(&store_path);
    std::fs::remove_file(&store_path).ok();
    assert_eq!(entries, json!({}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn whoami_accepts_valid_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/task/"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "tasks": [] })))
        .expect(1)
        .mount(&server)
        .await;
    let store_path = temp_path("whoami.json");
    write_session(&store_path, json!({ "token": "tok-1", "username": "ada" }));

    let output = run(&server, &store_path, &["whoami"]);

    std::fs::remove_file(&store_path).ok();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Logged in as ada"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn whoami_with_rejected_token_forces_logout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/task/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid token" })))
        .mount(&server)
        .await;
    let store_path = temp_path("whoami-expired.json");
    write_session(
        &store_path,
        json!({ "token": "expired", "authToken": "expired", "username": "ada" }),
    );

    let output = run(&server, &store_path, &["whoami"]);

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: unauthorized - Invalid token"), "{stderr}");
    let entries = read_entries(&store_path);
    std::fs::remove_file(&store_path).ok();
    assert_eq!(entries, json!({}));
}
