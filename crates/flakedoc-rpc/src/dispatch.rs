//! Tool dispatch: route a method, validate params, execute, audit.
//!
//! Every tool invocation - success or failure - produces exactly one
//! audit record before the response goes out. Validation failures are
//! client errors and precede auditing; audit write failures are fatal
//! for the request, never swallowed.

use crate::envelope::{codes, RpcRequest, RpcResponse};
use crate::schema::{
    tool_catalog, ActionsMetricsRequest, AggregateRequest, FlakyRequest, FlakyResponse,
    LogSnippetsRequest, LogSnippetsResponse, SuggestFixRequest, SuggestFixResponse,
};
use flakedoc_core::aggregate::AggregateClassifier;
use flakedoc_core::audit::AuditLog;
use flakedoc_core::evidence::{LogSnippetProvider, RunMetricsProvider};
use flakedoc_core::history;
use flakedoc_core::suggest::suggest_fixes;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// File names echoed back to the caller.
const FILES_PREVIEW_WIRE: usize = 20;

/// File names kept in the audit record.
const FILES_PREVIEW_AUDIT: usize = 5;

/// A completed tool call, ready for auditing and response.
struct ToolSuccess {
    /// Validated request, as recorded in the audit log.
    payload: Value,
    /// Full result returned to the caller.
    result: Value,
    /// Result as recorded in the audit log (trimmed for bulky tools).
    audit_result: Value,
}

enum ToolError {
    /// Params did not match the tool schema. Client error, no audit.
    InvalidParams(String),
    /// Tool execution failed. Audited, then surfaced as -32603.
    Internal(String),
}

fn parse_params<T: serde::de::DeserializeOwned>(params: &Value) -> Result<T, ToolError> {
    serde_json::from_value(params.clone()).map_err(|err| ToolError::InvalidParams(err.to_string()))
}

fn to_wire<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).expect("tool payloads are serializable")
}

/// Routes requests to tools and records every decision.
pub struct Dispatcher {
    metrics: Arc<dyn RunMetricsProvider>,
    logs: Arc<dyn LogSnippetProvider>,
    classifier: AggregateClassifier,
    audit: Arc<AuditLog>,
}

impl Dispatcher {
    pub fn new(
        metrics: Arc<dyn RunMetricsProvider>,
        logs: Arc<dyn LogSnippetProvider>,
        audit: Arc<AuditLog>,
    ) -> Self {
        let classifier = AggregateClassifier::new(Arc::clone(&metrics), Arc::clone(&logs));
        Dispatcher {
            metrics,
            logs,
            classifier,
            audit,
        }
    }

    /// Handle one request end to end.
    pub async fn handle(&self, req: RpcRequest) -> RpcResponse {
        if !req.is_valid_version() {
            return RpcResponse::err(
                req.id,
                codes::INVALID_REQUEST,
                "Invalid Request: jsonrpc must be '2.0'",
                None,
            );
        }

        let id = req.id;
        let method = req.method;
        let params = req.params.unwrap_or_else(|| json!({}));
        debug!(%method, "dispatching");

        // Catalog metadata, not a tool invocation.
        if method == "list_tools" {
            return RpcResponse::ok(id, json!({ "tools": tool_catalog() }));
        }

        let started = Instant::now();
        let outcome = match method.as_str() {
            "is_flaky" => self.tool_is_flaky(&params),
            "suggest_fix" => self.tool_suggest_fix(&params),
            "get_actions_metrics" => self.tool_actions_metrics(&params).await,
            "get_ci_log_snippets" => self.tool_log_snippets(&params).await,
            "classify_aggregate" => self.tool_classify_aggregate(&params).await,
            other => {
                return RpcResponse::err(
                    id,
                    codes::METHOD_NOT_FOUND,
                    format!("Method not found: {other}"),
                    None,
                );
            }
        };
        let t_ms = started.elapsed().as_secs_f64() * 1000.0;

        match outcome {
            Ok(success) => {
                match self
                    .audit
                    .record(&method, success.payload, success.audit_result, true, t_ms)
                {
                    Ok(_) => RpcResponse::ok(id, success.result),
                    Err(err) => RpcResponse::err(
                        id,
                        codes::INTERNAL_ERROR,
                        format!("audit write failed: {err}"),
                        None,
                    ),
                }
            }
            Err(ToolError::InvalidParams(message)) => RpcResponse::err(
                id,
                codes::INVALID_PARAMS,
                format!("Invalid params: {message}"),
                None,
            ),
            Err(ToolError::Internal(message)) => {
                let payload = json!({"method": method, "params": params});
                if let Err(err) =
                    self.audit
                        .record("exception", payload, json!({"error": message}), false, t_ms)
                {
                    return RpcResponse::err(
                        id,
                        codes::INTERNAL_ERROR,
                        format!("audit write failed: {err}"),
                        None,
                    );
                }
                RpcResponse::err(
                    id,
                    codes::INTERNAL_ERROR,
                    format!("Internal error: {message}"),
                    Some(json!({"method": method})),
                )
            }
        }
    }

    fn tool_is_flaky(&self, params: &Value) -> Result<ToolSuccess, ToolError> {
        let req: FlakyRequest = parse_params(params)?;
        let report = history::classify_tokens(&req.history);
        let resp = FlakyResponse {
            flaky: report.flaky,
            failures: report.failures,
            runs: report.runs,
            label: report.label,
        };
        let result = to_wire(&resp);
        Ok(ToolSuccess {
            payload: to_wire(&req),
            audit_result: result.clone(),
            result,
        })
    }

    fn tool_suggest_fix(&self, params: &Value) -> Result<ToolSuccess, ToolError> {
        let req: SuggestFixRequest = parse_params(params)?;
        let outcomes = history::normalize(&req.history);
        let resp = SuggestFixResponse {
            suggestions: suggest_fixes(&outcomes),
        };
        let result = to_wire(&resp);
        Ok(ToolSuccess {
            payload: to_wire(&req),
            audit_result: result.clone(),
            result,
        })
    }

    async fn tool_actions_metrics(&self, params: &Value) -> Result<ToolSuccess, ToolError> {
        let req: ActionsMetricsRequest = parse_params(params)?;
        let metrics = self
            .metrics
            .run_metrics(&req.repo, req.branch.as_deref())
            .await
            .map_err(|err| ToolError::Internal(err.to_string()))?;
        let result = to_wire(&metrics);
        Ok(ToolSuccess {
            payload: to_wire(&req),
            audit_result: result.clone(),
            result,
        })
    }

    async fn tool_log_snippets(&self, params: &Value) -> Result<ToolSuccess, ToolError> {
        let req: LogSnippetsRequest = parse_params(params)?;
        let scan = self
            .logs
            .failure_snippets(&req.repo, req.run_id, req.max_files, req.max_snippets)
            .await
            .map_err(|err| ToolError::Internal(err.to_string()))?;

        let audit_result = json!({
            "files_preview": scan.files.iter().take(FILES_PREVIEW_AUDIT).collect::<Vec<_>>(),
            "snippets_len": scan.snippets.len(),
        });
        let resp = LogSnippetsResponse {
            files_preview: scan.files.into_iter().take(FILES_PREVIEW_WIRE).collect(),
            snippets: scan.snippets,
        };
        Ok(ToolSuccess {
            payload: to_wire(&req),
            result: to_wire(&resp),
            audit_result,
        })
    }

    async fn tool_classify_aggregate(&self, params: &Value) -> Result<ToolSuccess, ToolError> {
        let req: AggregateRequest = parse_params(params)?;
        let report = self.classifier.classify(&req).await;
        let audit_result = json!({
            "label": report.label,
            "score": report.score,
            "reasons": report.reasons,
        });
        Ok(ToolSuccess {
            payload: to_wire(&req),
            result: to_wire(&report),
            audit_result,
        })
    }
}
