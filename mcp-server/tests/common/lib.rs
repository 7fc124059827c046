//! Test harness that drives the real server binary over stdio, speaking raw
//! line-framed JSON-RPC so tests control exactly what hits the wire.

use std::process::Stdio;
use std::sync::atomic::AtomicI64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::Context;
use assert_cmd::prelude::*;
use conduit_mcp_types::JSONRPC_VERSION;
use conduit_mcp_types::JSONRPCMessage;
use conduit_mcp_types::JSONRPCResponse;
use conduit_mcp_types::RequestId;
use serde_json::json;
use std::process::Command as StdCommand;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::process::Child;
use tokio::process::ChildStdin;
use tokio::process::ChildStdout;
use tokio::process::Command;
use tokio::time;

const READ_TIMEOUT: Duration = Duration::from_secs(10);

pub struct McpProcess {
    next_request_id: AtomicI64,
    /// Retain this child process until the harness is dropped. The Tokio
    /// runtime will make a "best effort" to reap the process after it exits,
    /// but it is not a guarantee. See the `kill_on_drop` documentation.
    #[allow(dead_code)]
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl McpProcess {
    pub async fn new() -> anyhow::Result<Self> {
        // Use assert_cmd to locate the binary path and then switch to
        // tokio::process::Command.
        let std_cmd = StdCommand::cargo_bin("conduit-mcp-server")
            .context("should find binary for conduit-mcp-server")?;
        let program = std_cmd.get_program().to_owned();

        let mut cmd = Command::new(program);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.env("RUST_LOG", "debug");

        let mut process = cmd
            .kill_on_drop(true)
            .spawn()
            .context("conduit-mcp-server proc should start")?;
        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| anyhow::format_err!("mcp should have stdin fd"))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| anyhow::format_err!("mcp should have stdout fd"))?;
        let stdout = BufReader::new(stdout);

        // Forward child stderr so failures are visible even when the test
        // harness captures output.
        if let Some(stderr) = process.stderr.take() {
            let mut stderr_reader = BufReader::new(stderr).lines();
            tokio::spawn(async move {
                while let Ok(Some(line)) = stderr_reader.next_line().await {
                    eprintln!("[mcp stderr] {line}");
                }
            });
        }

        Ok(Self {
            next_request_id: AtomicI64::new(1),
            process,
            stdin,
            stdout,
        })
    }

    /// Drive the full handshake at the given protocol revision.
    pub async fn initialize(&mut self, protocol_version: &str) -> anyhow::Result<JSONRPCResponse> {
        let id = self
            .send_request(
                "initialize",
                Some(json!({
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "0"},
                    "protocolVersion": protocol_version,
                })),
            )
            .await?;
        let response = self.read_response(id).await?;
        self.send_notification("notifications/initialized", None)
            .await?;
        Ok(response)
    }

    /// Send a request and return its id.
    pub async fn send_request(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> anyhow::Result<i64> {
        let id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let mut message = json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": id,
            "method": method,
        });
        if let Some(params) = params {
            message["params"] = params;
        }
        self.send_line(&message.to_string()).await?;
        Ok(id)
    }

    pub async fn send_notification(
        &mut self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> anyhow::Result<()> {
        let mut message = json!({
            "jsonrpc": JSONRPC_VERSION,
            "method": method,
        });
        if let Some(params) = params {
            message["params"] = params;
        }
        self.send_line(&message.to_string()).await
    }

    /// Write one raw line, valid JSON or not.
    pub async fn send_line(&mut self, line: &str) -> anyhow::Result<()> {
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.write_all(b"\n").await?;
        Ok(())
    }

    /// Read the next frame from stdout as a raw JSON value.
    pub async fn read_raw(&mut self) -> anyhow::Result<serde_json::Value> {
        let mut line = String::new();
        let n = time::timeout(READ_TIMEOUT, self.stdout.read_line(&mut line))
            .await
            .context("timed out waiting for a server frame")??;
        anyhow::ensure!(n > 0, "server closed stdout");
        Ok(serde_json::from_str(line.trim())?)
    }

    /// Read the next single message frame.
    pub async fn read_message(&mut self) -> anyhow::Result<JSONRPCMessage> {
        let value = self.read_raw().await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Read frames until the response for `id` arrives; notifications are
    /// skipped, anything else addressed to a different id is an error.
    pub async fn read_response(&mut self, id: i64) -> anyhow::Result<JSONRPCResponse> {
        loop {
            match self.read_message().await? {
                JSONRPCMessage::Response(response) => {
                    anyhow::ensure!(
                        response.id == RequestId::Integer(id),
                        "response for unexpected id: {:?}",
                        response.id
                    );
                    return Ok(response);
                }
                JSONRPCMessage::Error(err) => {
                    anyhow::bail!("server answered with an error: {:?}", err.error)
                }
                JSONRPCMessage::Notification(_) => continue,
                other => anyhow::bail!("unexpected frame: {other:?}"),
            }
        }
    }

    /// Read frames until an error for `id` arrives.
    pub async fn read_error(&mut self, id: Option<i64>) -> anyhow::Result<serde_json::Value> {
        loop {
            let value = self.read_raw().await?;
            if value.get("error").is_none() {
                continue;
            }
            let frame_id = value.get("id").cloned().unwrap_or(serde_json::Value::Null);
            match id {
                Some(id) if frame_id != json!(id) => continue,
                _ => return Ok(value),
            }
        }
    }
}
