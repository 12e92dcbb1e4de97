//! End-to-end dispatch tests against in-memory providers and audit log.

use flakedoc_core::audit::AuditLog;
use flakedoc_core::evidence::{LogSnippetProvider, RunMetrics, RunMetricsProvider};
use flakedoc_core::fakes::{FailingLogs, FailingMetrics, StaticLogs, StaticMetrics};
use flakedoc_rpc::envelope::RpcRequest;
use flakedoc_rpc::{serve_lines, Dispatcher};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::BufReader;

struct Harness {
    dispatcher: Dispatcher,
    audit: Arc<AuditLog>,
}

fn harness(
    metrics: Arc<dyn RunMetricsProvider>,
    logs: Arc<dyn LogSnippetProvider>,
) -> Harness {
    let audit = Arc::new(AuditLog::memory());
    let dispatcher = Dispatcher::new(metrics, logs, Arc::clone(&audit));
    Harness { dispatcher, audit }
}

fn default_harness() -> Harness {
    harness(
        Arc::new(StaticMetrics::new(RunMetrics::from_counts(20, 19, 1))),
        Arc::new(StaticLogs::with_snippets(vec![
            "ERROR: Connection reset by peer".to_string(),
        ])),
    )
}

fn request(method: &str, params: Value) -> RpcRequest {
    serde_json::from_value(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    }))
    .expect("request parses")
}

#[tokio::test]
async fn is_flaky_round_trip_and_audit() {
    let h = default_harness();
    let resp = h
        .dispatcher
        .handle(request(
            "is_flaky",
            json!({"test_name": "test_login", "history": ["pass", "fail", "pass", "fail"]}),
        ))
        .await;

    let result = resp.result.expect("result");
    assert!(resp.error.is_none());
    assert_eq!(result["flaky"], true);
    assert_eq!(result["label"], "Flaky");
    assert_eq!(result["failures"], 2);
    assert_eq!(result["runs"], 4);

    // Exactly one chained audit record for the call.
    assert_eq!(h.audit.verify().expect("verify"), 1);
    let last = h.audit.last().expect("last").expect("record");
    assert_eq!(last.event, "is_flaky");
    assert!(last.ok);
}

#[tokio::test]
async fn suggest_fix_returns_sorted_hints() {
    let h = default_harness();
    let resp = h
        .dispatcher
        .handle(request(
            "suggest_fix",
            json!({"test_name": "test_login", "history": ["pass", "fail"]}),
        ))
        .await;

    let suggestions = resp.result.expect("result")["suggestions"]
        .as_array()
        .expect("array")
        .clone();
    assert_eq!(suggestions.len(), 4);
    let mut sorted = suggestions.clone();
    sorted.sort_by_key(|v| v.as_str().map(str::to_owned));
    assert_eq!(suggestions, sorted);
}

#[tokio::test]
async fn unknown_method_is_32601_and_unaudited() {
    let h = default_harness();
    let resp = h
        .dispatcher
        .handle(request("open_pr", json!({})))
        .await;

    let err = resp.error.expect("error");
    assert_eq!(err.code, -32601);
    assert_eq!(h.audit.verify().expect("verify"), 0);
}

#[tokio::test]
async fn invalid_params_is_32602_and_unaudited() {
    let h = default_harness();
    let resp = h
        .dispatcher
        .handle(request("is_flaky", json!({"test_name": "t"})))
        .await;

    let err = resp.error.expect("error");
    assert_eq!(err.code, -32602);
    assert_eq!(h.audit.verify().expect("verify"), 0);
}

#[tokio::test]
async fn wrong_version_is_32600() {
    let h = default_harness();
    let req: RpcRequest = serde_json::from_value(json!({
        "jsonrpc": "1.0",
        "id": 5,
        "method": "is_flaky",
        "params": {"test_name": "t", "history": []},
    }))
    .expect("parses");
    let resp = h.dispatcher.handle(req).await;
    assert_eq!(resp.error.expect("error").code, -32600);
}

#[tokio::test]
async fn classify_aggregate_combines_signals() {
    let h = default_harness();
    let resp = h
        .dispatcher
        .handle(request(
            "classify_aggregate",
            json!({
                "test_name": "test_api",
                "repo": "acme/widgets",
                "run_id": 42,
                "history": ["pass", "fail", "pass", "fail"],
            }),
        ))
        .await;

    let result = resp.result.expect("result");
    // 0.6 history + 0.2 healthy pass-rate vs 0.6 infra: flake wins.
    assert_eq!(result["label"], "Flaky");
    assert_eq!(result["score"]["flake"], 0.8);
    assert_eq!(result["score"]["infra"], 0.6);
    assert_eq!(result["evidence"]["runs_total"], 20);
    assert!(result["reasons"].as_array().expect("reasons").len() >= 3);

    let last = h.audit.last().expect("last").expect("record");
    assert_eq!(last.event, "classify_aggregate");
    assert_eq!(last.result["label"], "Flaky");
    // Audit keeps the trimmed shape, not the full evidence payload.
    assert!(last.result.get("evidence").is_none());
}

#[tokio::test]
async fn provider_failure_in_direct_tool_is_audited_exception() {
    let h = harness(Arc::new(FailingMetrics), Arc::new(FailingLogs));
    let resp = h
        .dispatcher
        .handle(request("get_actions_metrics", json!({"repo": "acme/widgets"})))
        .await;

    let err = resp.error.expect("error");
    assert_eq!(err.code, -32603);
    assert!(err.message.contains("provider unavailable"));

    let last = h.audit.last().expect("last").expect("record");
    assert_eq!(last.event, "exception");
    assert!(!last.ok);
    assert_eq!(last.payload["method"], "get_actions_metrics");
}

#[tokio::test]
async fn log_snippets_previews_files() {
    let logs = StaticLogs::new(
        (0..30).map(|i| format!("job-{i}")).collect(),
        vec!["FAILED tests/test_a.py::test_x".to_string()],
    );
    let h = harness(
        Arc::new(StaticMetrics::new(RunMetrics::from_counts(1, 1, 0))),
        Arc::new(logs),
    );
    let resp = h
        .dispatcher
        .handle(request(
            "get_ci_log_snippets",
            json!({"repo": "acme/widgets", "run_id": 9}),
        ))
        .await;

    let result = resp.result.expect("result");
    assert_eq!(result["files_preview"].as_array().expect("files").len(), 20);
    assert_eq!(result["snippets"].as_array().expect("snippets").len(), 1);

    let last = h.audit.last().expect("last").expect("record");
    assert_eq!(last.result["snippets_len"], 1);
    assert_eq!(last.result["files_preview"].as_array().expect("audit files").len(), 5);
}

#[tokio::test]
async fn serve_lines_answers_parse_errors_and_requests() {
    let h = default_harness();
    let input = b"this is not json\n\
        {\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"is_flaky\",\"params\":{\"test_name\":\"t\",\"history\":[\"fail\",\"fail\"]}}\n\
        {\"id\":8}\n";
    let mut output: Vec<u8> = Vec::new();

    serve_lines(&h.dispatcher, BufReader::new(&input[..]), &mut output)
        .await
        .expect("serve");

    let responses: Vec<Value> = String::from_utf8(output)
        .expect("utf8")
        .lines()
        .map(|l| serde_json::from_str(l).expect("response json"))
        .collect();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[0]["error"]["code"], -32700);
    assert_eq!(responses[1]["id"], 7);
    assert_eq!(responses[1]["result"]["label"], "Regressing");
    // Valid JSON, invalid envelope (no method).
    assert_eq!(responses[2]["error"]["code"], -32600);
}

#[tokio::test]
async fn list_tools_names_every_tool() {
    let h = default_harness();
    let resp = h.dispatcher.handle(request("list_tools", json!({}))).await;
    let tools = resp.result.expect("result")["tools"]
        .as_array()
        .expect("tools")
        .clone();
    let names: Vec<&str> = tools
        .iter()
        .map(|t| t["name"].as_str().expect("name"))
        .collect();
    assert_eq!(
        names,
        vec![
            "is_flaky",
            "suggest_fix",
            "get_actions_metrics",
            "get_ci_log_snippets",
            "classify_aggregate",
        ]
    );
}
