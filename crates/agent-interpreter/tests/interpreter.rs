//! End-to-end tests of the interpreter against a mock sandbox service

use agent_interpreter::{
    CodeInterpreter, ExecutionStatus, InterpreterConfig, NO_EXECUTION_MESSAGE, NO_OUTPUT_MESSAGE,
};
use agent_tools::ToolRegistry;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "test-key";
const SANDBOX_ID: &str = "vm-1";

fn interpreter(server: &MockServer, download_dir: &TempDir) -> CodeInterpreter {
    let config = InterpreterConfig::builder()
        .api_key(API_KEY)
        .base_url(server.uri())
        .no_delays()
        .output_timeout(Duration::from_secs(5))
        .download_dir(download_dir.path())
        .build()
        .unwrap();
    CodeInterpreter::new(config).unwrap()
}

fn sse(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/event-stream")
}

async fn mount_sandbox(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/vms"))
        .and(header("X-THIRI-KEY", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": SANDBOX_ID })))
        .expect(1)
        .mount(server)
        .await;
}

/// Accept one submission as `execution_id` and stream `events` for it
async fn mount_execution(server: &MockServer, execution_id: &str, events: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/vms/{SANDBOX_ID}/gateway/execute")))
        .and(header("X-THIRI-KEY", API_KEY))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "execution_id": execution_id })),
        )
        .up_to_n_times(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/vms/{SANDBOX_ID}/gateway/executions/{execution_id}/events"
        )))
        .and(header("X-THIRI-KEY", API_KEY))
        .respond_with(sse(events))
        .mount(server)
        .await;
}

async fn mount_download(server: &MockServer, execution_id: &str, file: &str, content: &str) {
    Mock::given(method("GET"))
        .and(path(format!(
            "/vms/{SANDBOX_ID}/gateway/executions/{execution_id}/download/{file}"
        )))
        .and(header("X-THIRI-KEY", API_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "content": content })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_stdout_is_reported() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    mount_execution(&server, "exec-1", "event: stdout\ndata: hi\ndata: \n\n").await;

    let interpreter = interpreter(&server, &dir);
    let output = interpreter.run_python_code("print(\"hi\")").await;

    assert_eq!(output, "STDOUT:\nhi\n");
    assert_eq!(interpreter.sandbox_id(), Some(SANDBOX_ID));
}

#[tokio::test]
async fn test_code_is_sent_base64_encoded() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;

    let code = "print(\"héllo\")";
    Mock::given(method("POST"))
        .and(path(format!("/vms/{SANDBOX_ID}/gateway/execute")))
        .and(body_json(json!({ "code": STANDARD.encode(code) })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "execution_id": "exec-1" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/vms/{SANDBOX_ID}/gateway/executions/exec-1/events"
        )))
        .respond_with(sse(""))
        .mount(&server)
        .await;

    let interpreter = interpreter(&server, &dir);
    assert_eq!(interpreter.run_python_code(code).await, NO_OUTPUT_MESSAGE);
}

#[tokio::test]
async fn test_stderr_is_reported() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    mount_execution(
        &server,
        "exec-1",
        "event: stderr\ndata: Traceback...ZeroDivisionError\n\n",
    )
    .await;

    let interpreter = interpreter(&server, &dir);
    let output = interpreter.run_python_code("1/0").await;

    assert_eq!(output, "STDERR:\nTraceback...ZeroDivisionError");
}

#[tokio::test]
async fn test_both_streams_in_arrival_order() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    mount_execution(
        &server,
        "exec-1",
        "event: stdout\ndata: a\n\n\
         event: stderr\ndata: warn\n\n\
         event: stdout\ndata: b\n\n",
    )
    .await;

    let interpreter = interpreter(&server, &dir);
    let output = interpreter.run_python_code("...").await;

    assert_eq!(output, "STDOUT:\nab\nSTDERR:\nwarn");
}

#[tokio::test]
async fn test_no_output() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    mount_execution(&server, "exec-1", ": keep-alive\n\nevent: status\ndata: running\n\n").await;

    let interpreter = interpreter(&server, &dir);
    assert_eq!(interpreter.run_python_code("x = 1").await, NO_OUTPUT_MESSAGE);

    let execution = interpreter.latest_execution().await.unwrap();
    assert_eq!(execution.status(), ExecutionStatus::Completed);
}

#[tokio::test]
async fn test_end_event_stops_collection() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    mount_execution(
        &server,
        "exec-1",
        "event: stdout\ndata: a\n\nevent: end\n\nevent: stdout\ndata: late\n\n",
    )
    .await;

    let interpreter = interpreter(&server, &dir);
    assert_eq!(interpreter.run_python_code("print('a')").await, "STDOUT:\na");
}

#[tokio::test]
async fn test_sandbox_created_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    // `expect(1)` on sandbox creation is verified when the server drops.
    mount_sandbox(&server).await;
    for (id, out) in [("exec-1", "one"), ("exec-2", "two"), ("exec-3", "three")] {
        mount_execution(&server, id, &format!("event: stdout\ndata: {out}\n\n")).await;
    }

    let interpreter = interpreter(&server, &dir);
    assert_eq!(interpreter.run_python_code("1").await, "STDOUT:\none");
    assert_eq!(interpreter.run_python_code("2").await, "STDOUT:\ntwo");
    assert_eq!(interpreter.run_python_code("3").await, "STDOUT:\nthree");

    assert_eq!(
        interpreter.execution_ids().await,
        vec!["exec-1", "exec-2", "exec-3"]
    );
    for execution_id in interpreter.execution_ids().await {
        let execution = interpreter.execution(&execution_id).await.unwrap();
        assert_eq!(execution.sandbox_id(), SANDBOX_ID);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_calls_share_one_sandbox() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path("/vms"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": SANDBOX_ID }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/vms/{SANDBOX_ID}/gateway/execute")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "execution_id": "exec-1" })))
        .expect(5)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/vms/{SANDBOX_ID}/gateway/executions/exec-1/events"
        )))
        .respond_with(sse(""))
        .mount(&server)
        .await;

    let interpreter = Arc::new(interpreter(&server, &dir));
    let handles: Vec<_> = (0..5)
        .map(|i| {
            let interpreter = Arc::clone(&interpreter);
            tokio::spawn(async move { interpreter.run_python_code(&format!("x = {i}")).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), NO_OUTPUT_MESSAGE);
    }
    assert_eq!(interpreter.sandbox_id(), Some(SANDBOX_ID));
    server.verify().await;
}

#[tokio::test]
async fn test_submission_failure_is_rendered() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("/vms/{SANDBOX_ID}/gateway/execute")))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let interpreter = interpreter(&server, &dir);
    let output = interpreter.run_python_code("print(1)").await;

    assert_eq!(
        output,
        "Error executing code: Failed to run code: 500 Internal Server Error"
    );
    assert!(interpreter.latest_execution().await.is_none());
}

#[tokio::test]
async fn test_failed_sandbox_creation_is_retried() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    Mock::given(method("POST"))
        .and(path("/vms"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/vms"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": SANDBOX_ID })))
        .mount(&server)
        .await;
    mount_execution(&server, "exec-1", "event: stdout\ndata: ok\n\n").await;

    let interpreter = interpreter(&server, &dir);
    assert_eq!(
        interpreter.run_python_code("print('ok')").await,
        "Error executing code: Failed to create sandbox: 401 Unauthorized"
    );
    assert!(interpreter.sandbox_id().is_none());

    assert_eq!(interpreter.run_python_code("print('ok')").await, "STDOUT:\nok");
    assert_eq!(interpreter.sandbox_id(), Some(SANDBOX_ID));
}

#[tokio::test]
async fn test_stream_failure_is_distinguished_from_no_output() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("/vms/{SANDBOX_ID}/gateway/execute")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "execution_id": "exec-1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/vms/{SANDBOX_ID}/gateway/executions/exec-1/events"
        )))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let interpreter = interpreter(&server, &dir);
    let output = interpreter.run_python_code("print(1)").await;

    assert_eq!(
        output,
        "Code submitted but output could not be streamed: \
         Failed to open event stream: 503 Service Unavailable"
    );
    let execution = interpreter.latest_execution().await.unwrap();
    assert!(execution.stream_error().is_some());
}

#[tokio::test]
async fn test_slow_stream_returns_after_timeout() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    Mock::given(method("POST"))
        .and(path(format!("/vms/{SANDBOX_ID}/gateway/execute")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "execution_id": "exec-1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/vms/{SANDBOX_ID}/gateway/executions/exec-1/events"
        )))
        .respond_with(sse("event: stdout\ndata: late\n\n").set_delay(Duration::from_secs(10)))
        .mount(&server)
        .await;

    let config = InterpreterConfig::builder()
        .api_key(API_KEY)
        .base_url(server.uri())
        .no_delays()
        .output_timeout(Duration::from_millis(200))
        .download_dir(dir.path())
        .build()
        .unwrap();
    let interpreter = CodeInterpreter::new(config).unwrap();

    let started = std::time::Instant::now();
    let output = interpreter.run_python_code("import time").await;

    assert_eq!(output, NO_OUTPUT_MESSAGE);
    assert!(started.elapsed() < Duration::from_secs(5));
    let execution = interpreter.latest_execution().await.unwrap();
    assert!(!execution.status().is_finished());
}

#[tokio::test]
async fn test_download_before_any_run_makes_no_request() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let interpreter = interpreter(&server, &dir);
    assert_eq!(
        interpreter.download_file_from_sandbox("output.png").await,
        NO_EXECUTION_MESSAGE
    );

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn test_image_download_registers_artifact() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    mount_execution(&server, "exec-1", "").await;

    let png: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0xff];
    let encoded = STANDARD.encode(png);
    mount_download(&server, "exec-1", "output.png", &encoded).await;

    let interpreter = interpreter(&server, &dir);
    interpreter.run_python_code("plt.savefig('output.png')").await;

    let first = interpreter.download_file_from_sandbox("output.png").await;
    let second = interpreter.download_file_from_sandbox("output.png").await;

    let saved = dir.path().join("output.png");
    assert_eq!(std::fs::read(&saved).unwrap(), png);

    let images = interpreter.artifacts().images();
    assert_eq!(images.len(), 2);
    assert_ne!(images[0].id, images[1].id);
    assert_eq!(images[0].mime_type, "image/png");
    assert_eq!(images[0].url, format!("data:image/png;base64,{encoded}"));

    assert_eq!(
        first,
        format!(
            "Image downloaded and added as artifact with ID {}, saved to {}",
            images[0].id,
            saved.display()
        )
    );
    assert!(second.contains(&images[1].id));
}

#[tokio::test]
async fn test_non_image_download_has_no_artifact() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    mount_execution(&server, "exec-1", "").await;
    mount_download(&server, "exec-1", "data.csv", &STANDARD.encode("a,b\n1,2\n")).await;

    let interpreter = interpreter(&server, &dir);
    interpreter.run_python_code("df.to_csv('data.csv')").await;

    let saved = dir.path().join("data.csv");
    assert_eq!(
        interpreter.download_file_from_sandbox("data.csv").await,
        format!("File downloaded and saved to {}", saved.display())
    );
    assert_eq!(std::fs::read_to_string(&saved).unwrap(), "a,b\n1,2\n");
    assert!(interpreter.artifacts().is_empty());
}

#[tokio::test]
async fn test_download_accepts_line_wrapped_base64() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    mount_execution(&server, "exec-1", "").await;
    mount_download(&server, "exec-1", "a.txt", "aGVsbG8=\n").await;

    let interpreter = interpreter(&server, &dir);
    interpreter.run_python_code("open('a.txt', 'w')").await;

    let output = interpreter.download_file_from_sandbox("a.txt").await;
    assert!(output.starts_with("File downloaded"), "{output}");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
        "hello"
    );
}

#[tokio::test]
async fn test_download_from_older_execution() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    mount_execution(&server, "exec-1", "").await;
    mount_execution(&server, "exec-2", "").await;
    mount_download(&server, "exec-1", "first.txt", &STANDARD.encode("first")).await;

    let interpreter = interpreter(&server, &dir);
    interpreter.run_python_code("open('first.txt', 'w')").await;
    interpreter.run_python_code("pass").await;

    let output = interpreter
        .download_file_from_execution("exec-1", "first.txt")
        .await;
    assert!(output.starts_with("File downloaded"), "{output}");
    assert_eq!(
        std::fs::read_to_string(dir.path().join("first.txt")).unwrap(),
        "first"
    );
}

#[tokio::test]
async fn test_download_errors_are_rendered() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    mount_execution(&server, "exec-1", "").await;
    mount_download(&server, "exec-1", "garbled.png", "!!not base64!!").await;
    Mock::given(method("GET"))
        .and(path(format!(
            "/vms/{SANDBOX_ID}/gateway/executions/exec-1/download/missing.png"
        )))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let interpreter = interpreter(&server, &dir);
    interpreter.run_python_code("pass").await;

    assert_eq!(
        interpreter.download_file_from_sandbox("missing.png").await,
        "Error downloading file: Failed to download file: 404 Not Found"
    );
    let garbled = interpreter.download_file_from_sandbox("garbled.png").await;
    assert!(garbled.starts_with("Error downloading file:"), "{garbled}");
    assert!(interpreter.artifacts().is_empty());
    assert!(!dir.path().join("garbled.png").exists());
}

#[tokio::test]
async fn test_tools_through_registry() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_sandbox(&server).await;
    mount_execution(&server, "exec-1", "event: stdout\ndata: 42\n\n").await;
    mount_download(&server, "exec-1", "answer.txt", &STANDARD.encode("42")).await;

    let interpreter = Arc::new(interpreter(&server, &dir));
    let registry = ToolRegistry::new();
    interpreter.register_tools(&registry);

    let output = registry
        .execute("run_python_code", json!({ "code": "print(42)" }))
        .await
        .unwrap();
    assert_eq!(output, json!("STDOUT:\n42"));

    let output = registry
        .execute(
            "download_file_from_sandbox",
            json!({ "sandbox_path": "answer.txt" }),
        )
        .await
        .unwrap();
    assert!(output.as_str().unwrap().starts_with("File downloaded"));

    let err = registry
        .execute("run_python_code", json!({ "source": "print(1)" }))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("run_python_code"));
}
