//! End-to-end rounds: HTTP request in, repository contents and callback out

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use pagesmith::App;
use pagesmith_config::Config;
use pagesmith_engine::RoundWorkflow;
use pagesmith_generation::Generator;
use pagesmith_host::{HostOp, MemoryHost};
use pagesmith_llm::{LlmBackend, LlmError, LlmInvocation, LlmResult};
use pagesmith_notify::{CallbackTransport, Notifier};
use pagesmith_publisher::{ContentPublisher, ProbePolicy};
use pagesmith_utils::error::NotifyError;
use pagesmith_utils::types::NotificationPayload;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const SECRET: &str = "s3cret";
const HOOK: &str = "https://eval.example.com/notify";

/// Answers invocations from a queue of canned responses.
struct CannedBackend {
    responses: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl CannedBackend {
    fn new(responses: impl IntoIterator<Item = String>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl LlmBackend for CannedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        if let Some(user) = inv.messages.last() {
            self.prompts.lock().unwrap().push(user.content.clone());
        }
        let raw = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LlmError::ProviderOutage("no canned response left".to_string()))?;
        Ok(LlmResult::new(raw, "canned", "test-model"))
    }

    fn provider(&self) -> &str {
        "canned"
    }
}

/// Fails the first `failures` deliveries, then records payloads.
#[derive(Default)]
struct FlakyEvaluator {
    failures: Mutex<u32>,
    received: Mutex<Vec<NotificationPayload>>,
}

#[async_trait]
impl CallbackTransport for FlakyEvaluator {
    async fn deliver(&self, url: &str, payload: &NotificationPayload) -> Result<(), NotifyError> {
        assert_eq!(url, HOOK);
        let mut failures = self.failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(NotifyError::Status(503));
        }
        self.received.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

struct Harness {
    config: Config,
    host: Arc<MemoryHost>,
    backend: Arc<CannedBackend>,
    evaluator: Arc<FlakyEvaluator>,
}

impl Harness {
    fn new(responses: Vec<String>, failed_callbacks: u32) -> Self {
        Self {
            config: Config::builder()
                .owner("octo")
                .github_token("ghp_test")
                .llm_api_key("sk-test")
                .shared_secret(SECRET)
                .build()
                .unwrap(),
            host: Arc::new(MemoryHost::new("octo")),
            backend: CannedBackend::new(responses),
            evaluator: Arc::new(FlakyEvaluator {
                failures: Mutex::new(failed_callbacks),
                received: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A fresh app over the shared host, backend and evaluator.
    fn app(&self) -> App {
        let workflow = RoundWorkflow::new(
            self.host.clone(),
            Generator::from_config(self.backend.clone(), &self.config.llm),
            ContentPublisher::new(self.host.clone(), ProbePolicy::from_config(&self.config.github)),
            Notifier::with_transport(self.evaluator.clone(), &self.config.notify),
            self.config.github.branch.clone(),
        );
        App::with_runner(self.config.clone(), Arc::new(workflow))
    }

    /// Submit one request and wait for the round to finish.
    async fn run(&self, round: u32, brief: &str) -> StatusCode {
        let app = self.app();
        let status = submit(&app, round, brief).await;
        app.shutdown().await;
        status
    }
}

async fn submit(app: &App, round: u32, brief: &str) -> StatusCode {
    let body = json!({
        "email": "student@example.com",
        "secret": SECRET,
        "task": "calc",
        "round": round,
        "nonce": "7",
        "brief": brief,
        "checks": ["Page has a title", "README explains usage"],
        "evaluation_url": HOOK,
        "attachments": [
            {"name": "sample.csv", "url": "data:text/csv;base64,YSxiCjEsMgo="}
        ]
    });
    let request = Request::builder()
        .method("POST")
        .uri("/handle_task")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    app.router().oneshot(request).await.unwrap().status()
}

fn files_response(files: &[(&str, &str)]) -> String {
    let entries: Vec<_> = files
        .iter()
        .map(|(name, content)| json!({"file_name": name, "content": content}))
        .collect();
    json!({ "files": entries }).to_string()
}

#[tokio::test(start_paused = true)]
async fn test_round_one_then_round_two() {
    let round_one = files_response(&[
        ("index.html", "<h1>Calculator</h1>"),
        ("README.md", "# Calculator\n"),
    ]);
    let round_two = files_response(&[
        ("index.html", "<h1>Calculator</h1><div id=history></div>"),
        ("history.js", "export const history = [];"),
    ]);
    let h = Harness::new(vec![round_one, round_two], 0);

    assert_eq!(h.run(1, "Build a calculator").await, StatusCode::OK);

    assert!(h.host.repository_exists("calc_7"));
    assert!(h.host.pages_enabled("calc_7"));
    assert_eq!(
        h.host.file_text("calc_7", "README.md").as_deref(),
        Some("# Calculator\n")
    );
    assert!(h.host.paths("calc_7").contains(&"LICENSE".to_string()));

    let round_one_head = h.host.head("calc_7").unwrap();
    {
        let received = h.evaluator.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        let payload = &received[0];
        assert_eq!(payload.email, "student@example.com");
        assert_eq!(payload.task, "calc");
        assert_eq!(payload.round, 1);
        assert_eq!(payload.nonce, "7");
        assert_eq!(payload.repo_url, "https://github.com/octo/calc_7");
        assert_eq!(payload.pages_url, "https://octo.github.io/calc_7/");
        assert_eq!(payload.commit_sha, round_one_head);
    }

    assert_eq!(h.run(2, "Add a history panel").await, StatusCode::OK);

    assert_eq!(
        h.host.file_text("calc_7", "index.html").as_deref(),
        Some("<h1>Calculator</h1><div id=history></div>")
    );
    assert!(h.host.file("calc_7", "history.js").is_some());
    assert_eq!(
        h.host.file_text("calc_7", "README.md").as_deref(),
        Some("# Calculator\n")
    );
    assert_eq!(h.host.call_count(HostOp::EnablePages), 1);

    let prompts = h.backend.prompts.lock().unwrap();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Build a calculator"));
    assert!(prompts[0].contains("README explains usage"));
    assert!(prompts[0].contains("sample.csv"));
    assert!(prompts[1].contains("Add a history panel"));
    assert!(prompts[1].contains("<h1>Calculator</h1>"));

    let received = h.evaluator.received.lock().unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[1].round, 2);
    assert_eq!(Some(received[1].commit_sha.clone()), h.host.head("calc_7"));
    assert_ne!(received[1].commit_sha, round_one_head);
}

#[tokio::test(start_paused = true)]
async fn test_fenced_double_encoded_response_is_published() {
    let inner = files_response(&[("index.html", "<p>fenced</p>")]);
    let raw = format!("```json\n{}\n```", serde_json::to_string(&inner).unwrap());
    let h = Harness::new(vec![raw], 0);

    assert_eq!(h.run(1, "Fenced").await, StatusCode::OK);

    assert_eq!(
        h.host.file_text("calc_7", "index.html").as_deref(),
        Some("<p>fenced</p>")
    );
    assert_eq!(h.evaluator.received.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unstructured_response_becomes_index_page() {
    let h = Harness::new(vec!["<html><body>plain</body></html>".to_string()], 0);

    assert_eq!(h.run(1, "Plain").await, StatusCode::OK);

    assert_eq!(
        h.host.file_text("calc_7", "index.html").as_deref(),
        Some("<html><body>plain</body></html>")
    );
}

#[tokio::test(start_paused = true)]
async fn test_callback_is_retried_until_accepted() {
    let h = Harness::new(vec![files_response(&[("index.html", "<p>x</p>")])], 2);

    assert_eq!(h.run(1, "Retry").await, StatusCode::OK);

    assert_eq!(*h.evaluator.failures.lock().unwrap(), 0);
    assert_eq!(h.evaluator.received.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_round_two_for_unknown_repository_does_not_notify() {
    let h = Harness::new(vec![files_response(&[("index.html", "<p>x</p>")])], 0);

    assert_eq!(h.run(2, "Revise nothing").await, StatusCode::OK);

    assert!(!h.host.repository_exists("calc_7"));
    assert!(h.backend.prompts.lock().unwrap().is_empty());
    assert!(h.evaluator.received.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_wrong_secret_never_reaches_the_host() {
    let h = Harness::new(vec![files_response(&[("index.html", "<p>x</p>")])], 0);
    let app = h.app();

    let request = Request::builder()
        .method("POST")
        .uri("/handle_task")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"secret": "nope", "task": "calc", "nonce": "7", "round": 1}).to_string(),
        ))
        .unwrap();
    let status = app.router().oneshot(request).await.unwrap().status();
    app.shutdown().await;

    assert_eq!(status, StatusCode::OK);
    assert!(h.host.calls().is_empty());
}
