//! Newline-delimited JSON-RPC server loop.
//!
//! Reads one request per line, writes one response per line, flushing
//! after each. Malformed JSON yields a -32700 response; a structurally
//! valid JSON value that is not a request envelope yields -32600.

use crate::dispatch::Dispatcher;
use crate::envelope::{codes, RpcRequest, RpcResponse};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// Serve requests from `reader`, answering on `writer`, until EOF.
pub async fn serve_lines<R, W>(
    dispatcher: &Dispatcher,
    reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(line) {
            Ok(request) => dispatcher.handle(request).await,
            Err(err) if err.is_data() => RpcResponse::err(
                Value::Null,
                codes::INVALID_REQUEST,
                format!("Invalid Request: {err}"),
                None,
            ),
            Err(err) => RpcResponse::err(
                Value::Null,
                codes::PARSE_ERROR,
                format!("Parse error: {err}"),
                None,
            ),
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
        debug!("response written");
    }
    Ok(())
}

/// Serve on stdin/stdout until the peer closes the stream.
pub async fn serve_stdio(dispatcher: &Dispatcher) -> std::io::Result<()> {
    info!("serving JSON-RPC on stdio");
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve_lines(dispatcher, stdin, stdout).await
}
