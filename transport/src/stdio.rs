//! Subprocess transport: one JSON value per line over the child's stdio.

use std::collections::HashMap;
use std::ffi::OsString;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use conduit_mcp_types::JSONRPCMessage;
use conduit_rpc::IncomingPayload;
use conduit_rpc::decode_message;
use conduit_rpc::encode_message;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::time;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::Transport;
use crate::TransportError;
use crate::TransportEvent;

/// Capacity of the bounded channels between the transport API and the IO
/// tasks.
const CHANNEL_CAPACITY: usize = 128;

/// How long `close` waits for the child to exit after stdin is closed before
/// killing it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A transport backed by a spawned child process. The child reads requests
/// on stdin and writes responses on stdout, one compact JSON value per line;
/// stderr is diagnostic text and is forwarded to the log.
#[derive(Debug)]
pub struct StdioTransport {
    /// Retain this child process until the transport is dropped. The Tokio
    /// runtime will make a "best effort" to reap the process after it exits,
    /// but it is not a guarantee. See the `kill_on_drop` documentation.
    child: Mutex<tokio::process::Child>,
    outgoing_tx: Mutex<Option<mpsc::Sender<JSONRPCMessage>>>,
    incoming_rx: Mutex<mpsc::Receiver<TransportEvent>>,
    alive: Arc<AtomicBool>,
}

impl StdioTransport {
    /// Spawn the given command with piped stdio and wire up the IO tasks.
    pub async fn spawn(
        program: OsString,
        args: Vec<OsString>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, TransportError> {
        let mut child = Command::new(program)
            .args(args)
            .env_clear()
            .envs(create_env_for_mcp_server(env))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // As noted in the `kill_on_drop` documentation, the Tokio runtime
            // makes a "best effort" to reap-after-exit to avoid zombie
            // processes, but it is not a guarantee.
            .kill_on_drop(true)
            .spawn()
            .map_err(TransportError::Spawn)?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Spawn(std::io::Error::other("no child stdin")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Spawn(std::io::Error::other("no child stdout")))?;

        // Forward the child's stderr through a dedicated reader so a chatty
        // server cannot fill the pipe and wedge the transport.
        if let Some(stderr) = child.stderr.take() {
            let mut stderr_lines = BufReader::new(stderr).lines();
            tokio::spawn(async move {
                while let Ok(Some(line)) = stderr_lines.next_line().await {
                    info!("[mcp server stderr] {line}");
                }
            });
        }

        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<JSONRPCMessage>(CHANNEL_CAPACITY);
        let (incoming_tx, incoming_rx) = mpsc::channel::<TransportEvent>(CHANNEL_CAPACITY);
        let alive = Arc::new(AtomicBool::new(true));

        // Writer task: drains the outgoing channel onto the child's stdin.
        // Dropping the channel sender closes stdin, which is the graceful
        // shutdown signal for the child.
        tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                match encode_message(&msg) {
                    Ok(json) => {
                        debug!("MCP message to server: {json}");
                        if stdin.write_all(json.as_bytes()).await.is_err() {
                            error!("failed to write message to child stdin");
                            break;
                        }
                        if stdin.write_all(b"\n").await.is_err() {
                            error!("failed to write newline to child stdin");
                            break;
                        }
                        // No explicit flush needed on a pipe; write_all is
                        // sufficient.
                    }
                    Err(e) => error!("failed to serialize JSONRPCMessage: {e}"),
                }
            }
        });

        // Reader task: one frame per line until EOF.
        {
            let alive = alive.clone();
            let mut reader = BufReader::new(stdout);
            tokio::spawn(async move {
                let mut buf = Vec::new();
                loop {
                    buf.clear();
                    let n = match reader.read_until(b'\n', &mut buf).await {
                        Ok(n) => n,
                        Err(e) => {
                            error!("failed to read child stdout: {e}");
                            break;
                        }
                    };
                    if n == 0 {
                        break;
                    }
                    if buf.last() != Some(&b'\n') {
                        // EOF in the middle of a frame.
                        warn!("discarding partial line on EOF ({n} bytes)");
                        break;
                    }
                    let line = String::from_utf8_lossy(&buf);
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    debug!("MCP message from server: {line}");
                    let event = match decode_message(line) {
                        Ok(IncomingPayload::Single(msg)) => TransportEvent::Message(msg),
                        Ok(IncomingPayload::Batch(entries)) => TransportEvent::Batch(entries),
                        Err(e) => TransportEvent::Malformed(e),
                    };
                    if incoming_tx.send(event).await.is_err() {
                        // Receiver gone - nothing left to do.
                        break;
                    }
                }
                alive.store(false, Ordering::SeqCst);
                let _ = incoming_tx.send(TransportEvent::Closed).await;
            });
        }

        Ok(Self {
            child: Mutex::new(child),
            outgoing_tx: Mutex::new(Some(outgoing_tx)),
            incoming_rx: Mutex::new(incoming_rx),
            alive,
        })
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn send(&self, msg: JSONRPCMessage) -> Result<(), TransportError> {
        let tx = {
            let guard = self.outgoing_tx.lock().await;
            guard.clone()
        };
        match tx {
            Some(tx) => tx.send(msg).await.map_err(|_| TransportError::Closed),
            None => Err(TransportError::Closed),
        }
    }

    async fn recv(&self) -> Option<TransportEvent> {
        self.incoming_rx.lock().await.recv().await
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.alive.store(false, Ordering::SeqCst);

        // Dropping the sender ends the writer task, which closes the child's
        // stdin. Taking it twice is a no-op, which is what makes close
        // idempotent.
        {
            let mut guard = self.outgoing_tx.lock().await;
            if guard.take().is_none() {
                return Ok(());
            }
        }

        let mut child = self.child.lock().await;
        match time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => debug!("mcp server exited with {status}"),
            Ok(Err(e)) => warn!("failed waiting for mcp server to exit: {e}"),
            Err(_) => {
                warn!("mcp server did not exit in time; killing it");
                let _ = child.start_kill();
            }
        }
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn session_id(&self) -> Option<String> {
        None
    }
}

/// Environment variables that are always passed through when spawning an MCP
/// server. Servers inherit only this subset plus whatever the configuration
/// adds explicitly.
#[rustfmt::skip]
#[cfg(unix)]
const DEFAULT_ENV_VARS: &[&str] = &[
    "HOME",
    "LOGNAME",
    "PATH",
    "SHELL",
    "USER",
    "__CF_USER_TEXT_ENCODING",
    "LANG",
    "LC_ALL",
    "TERM",
    "TMPDIR",
    "TZ",
];

#[cfg(windows)]
const DEFAULT_ENV_VARS: &[&str] = &[
    "PATH",
    "PATHEXT",
    "USERNAME",
    "USERDOMAIN",
    "USERPROFILE",
    "TEMP",
    "TMP",
];

fn create_env_for_mcp_server(
    extra_env: Option<HashMap<String, String>>,
) -> HashMap<String, String> {
    DEFAULT_ENV_VARS
        .iter()
        .filter_map(|var| match std::env::var(var) {
            Ok(value) => Some((var.to_string(), value)),
            Err(_) => None,
        })
        .chain(extra_env.unwrap_or_default())
        .collect::<HashMap<_, _>>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_env_overrides_the_allowlist() {
        let env_var = "PATH";
        let extra = HashMap::from([(env_var.to_owned(), "/custom/bin".to_owned())]);
        let env = create_env_for_mcp_server(Some(extra));
        assert_eq!(env.get(env_var).map(String::as_str), Some("/custom/bin"));
    }
}
