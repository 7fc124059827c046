//! An MCP server: feature registries, one message processor per session,
//! and three front-ends (stdio, streamable HTTP, in-memory loopback).
#![deny(clippy::print_stdout, clippy::print_stderr)]

use std::io::Result as IoResult;
use std::sync::Arc;

use conduit_rpc::decode_message;
use conduit_transport::InMemoryTransport;
use conduit_transport::Transport;
use conduit_transport::TransportEvent;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWriteExt;
use tokio::io::BufReader;
use tokio::io::{self};
use tokio::sync::mpsc;
use tracing::debug;
use tracing::error;
use tracing::info;

mod http_transport;
mod message_processor;
mod outgoing_message;
mod prompts;
mod resources;
mod server;
mod tools;

use crate::message_processor::MessageProcessor;
use crate::outgoing_message::OutgoingMessage;
use crate::outgoing_message::OutgoingMessageSender;

pub use crate::http_transport::HttpServerConfig;
pub use crate::http_transport::build_router;
pub use crate::http_transport::serve_http;
pub use crate::prompts::PromptTemplate;
pub use crate::prompts::TextPromptTemplate;
pub use crate::resources::ResourceProducer;
pub use crate::resources::StaticText;
pub use crate::server::McpServer;
pub use crate::server::ServerConfig;
pub use crate::tools::FnToolHandler;
pub use crate::tools::ToolError;
pub use crate::tools::ToolHandler;
pub use crate::tools::ToolOutput;

/// Size of the bounded channels used to communicate between tasks. The value
/// is a balance between throughput and memory usage – 128 messages should be
/// plenty for an interactive session.
const CHANNEL_CAPACITY: usize = 128;

/// Serve one session over this process's stdin/stdout: one JSON value per
/// line in each direction, stderr reserved for diagnostics. Returns when
/// stdin reaches EOF.
pub async fn serve_stdio(server: Arc<McpServer>) -> IoResult<()> {
    // Set up channels. Decode outcomes share one channel so inbound frames
    // keep their arrival order.
    let (incoming_tx, mut incoming_rx) = mpsc::channel::<
        Result<conduit_rpc::IncomingPayload, conduit_rpc::CodecError>,
    >(CHANNEL_CAPACITY);
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<OutgoingMessage>();

    // Task: read from stdin, decode one frame per line.
    let stdin_reader_handle = tokio::spawn({
        async move {
            let stdin = io::stdin();
            let reader = BufReader::new(stdin);
            let mut lines = reader.lines();

            while let Some(line) = lines.next_line().await.unwrap_or_default() {
                if line.trim().is_empty() {
                    continue;
                }
                let decoded = decode_message(&line);
                if let Err(e) = &decoded {
                    error!("failed to decode frame: {e}");
                }
                if incoming_tx.send(decoded).await.is_err() {
                    // Receiver gone – nothing left to do.
                    break;
                }
            }

            debug!("stdin reader finished (EOF)");
        }
    });

    // Task: process incoming payloads.
    let processor_handle = tokio::spawn({
        let processor = MessageProcessor::new(server, OutgoingMessageSender::new(outgoing_tx));
        async move {
            while let Some(decoded) = incoming_rx.recv().await {
                match decoded {
                    Ok(payload) => processor.process_payload(payload).await,
                    Err(codec_error) => processor.report_codec_error(codec_error).await,
                }
            }
            processor.on_disconnect().await;

            info!("processor task exited (channel closed)");
        }
    });

    // Task: write outgoing messages to stdout.
    let stdout_writer_handle = tokio::spawn(async move {
        let mut stdout = io::stdout();
        while let Some(outgoing_message) = outgoing_rx.recv().await {
            let value = outgoing_message.into_wire_value();
            match serde_json::to_string(&value) {
                Ok(json) => {
                    if let Err(e) = stdout.write_all(json.as_bytes()).await {
                        error!("failed to write to stdout: {e}");
                        break;
                    }
                    if let Err(e) = stdout.write_all(b"\n").await {
                        error!("failed to write newline to stdout: {e}");
                        break;
                    }
                }
                Err(e) => error!("failed to serialize outgoing message: {e}"),
            }
        }

        info!("stdout writer exited (channel closed)");
    });

    // Wait for all tasks to finish. The typical exit path is the stdin
    // reader hitting EOF which, once it drops `incoming_tx`, propagates
    // shutdown to the processor and then to the stdout task.
    let _ = tokio::join!(stdin_reader_handle, processor_handle, stdout_writer_handle);

    Ok(())
}

/// Serve one session over an arbitrary transport. Used with one end of an
/// [`InMemoryTransport::pair`] for in-process loopback. Returns when the
/// peer disconnects.
pub async fn serve_transport(server: Arc<McpServer>, transport: Box<dyn Transport>) {
    let transport: Arc<dyn Transport> = Arc::from(transport);
    let (outgoing_tx, mut outgoing_rx) = mpsc::unbounded_channel::<OutgoingMessage>();
    let processor = MessageProcessor::new(server, OutgoingMessageSender::new(outgoing_tx));

    // Writer task: structured messages go out one at a time; rendered batch
    // arrays are unpacked back into their entries, which preserves response
    // order on a transport with message framing.
    let writer_handle = tokio::spawn({
        let transport = transport.clone();
        async move {
            while let Some(outgoing_message) = outgoing_rx.recv().await {
                match outgoing_message.into_message() {
                    Some(msg) => {
                        if transport.send(msg).await.is_err() {
                            break;
                        }
                    }
                    None => debug!("dropping raw frame on a message-framed transport"),
                }
            }
        }
    });

    loop {
        match transport.recv().await {
            Some(TransportEvent::Message(msg)) => processor.process_message(msg).await,
            Some(TransportEvent::Batch(entries)) => {
                let responses = processor.process_batch(entries).await;
                for response in responses {
                    match serde_json::from_value(response) {
                        Ok(msg) => {
                            if transport.send(msg).await.is_err() {
                                break;
                            }
                        }
                        Err(e) => error!("failed to re-frame batch response: {e}"),
                    }
                }
            }
            Some(TransportEvent::Malformed(e)) => processor.report_codec_error(e).await,
            Some(TransportEvent::Closed) => break,
            None => break,
        }
    }
    processor.on_disconnect().await;
    writer_handle.abort();
}

/// Convenience for tests and embedding: wire a server to a fresh in-memory
/// pair, serve one session on a background task, and hand back the client
/// end.
pub fn serve_in_memory(server: Arc<McpServer>) -> InMemoryTransport {
    let (client_end, server_end) = InMemoryTransport::pair();
    tokio::spawn(async move {
        serve_transport(server, Box::new(server_end)).await;
    });
    client_end
}
