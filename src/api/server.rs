//! JSON-lines daemon.
//!
//! One request per line, `{"command": ..., "params": ...}`, answered with
//! `{"status": "success", "data": ...}` or `{"status": "error", "message": ...}`.

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::api::dto::{GenerateRequest, GeneratedDto};
use crate::ports::dot_exporter::{DotExporter, RenderConfig};

#[derive(Debug, Deserialize)]
struct CommandReq {
    command: String,
    params: Option<serde_json::Value>,
}

struct ServerState {
    exporter: DotExporter,
    shutdown: AtomicBool,
    address: SocketAddr,
}

pub fn start_server(port: u16, render: RenderConfig) -> Result<()> {
    let address = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&address)
        .with_context(|| format!("Failed to bind to {}", address))?;
    serve(listener, render)
}

/// Accept connections until a client sends SHUTDOWN.
pub fn serve(listener: TcpListener, render: RenderConfig) -> Result<()> {
    let state = Arc::new(ServerState {
        exporter: DotExporter::new(render),
        shutdown: AtomicBool::new(false),
        address: listener.local_addr()?,
    });
    info!(address = %state.address, "API server listening");

    for stream in listener.incoming() {
        if state.shutdown.load(Ordering::SeqCst) {
            break;
        }
        match stream {
            Ok(stream) => {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    if let Err(e) = handle_connection(stream, &state) {
                        warn!(error = %e, "connection error");
                    }
                });
            }
            Err(e) => warn!(error = %e, "accept error"),
        }
    }

    info!("API server stopped");
    Ok(())
}

fn handle_connection(mut stream: TcpStream, state: &ServerState) -> Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut line = String::new();

    loop {
        line.clear();
        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let (response, shutdown) = match process_command(trimmed, state) {
            Ok(reply) => (
                json!({
                    "status": "success",
                    "data": reply.data
                }),
                reply.shutdown,
            ),
            Err(e) => (
                json!({
                    "status": "error",
                    "message": format!("{:#}", e)
                }),
                false,
            ),
        };

        let response_str = serde_json::to_string(&response)?;
        stream.write_all(response_str.as_bytes())?;
        stream.write_all(b"\n")?;

        if shutdown {
            info!("shutdown requested");
            state.shutdown.store(true, Ordering::SeqCst);
            // Wake the accept loop so it sees the flag.
            let _ = TcpStream::connect(state.address);
            break;
        }
    }
    Ok(())
}

struct Reply {
    data: serde_json::Value,
    shutdown: bool,
}

impl Reply {
    fn data(data: serde_json::Value) -> Self {
        Reply { data, shutdown: false }
    }
}

fn process_command(json_str: &str, state: &ServerState) -> Result<Reply> {
    let req: CommandReq = serde_json::from_str(json_str).context("Invalid JSON format")?;

    match req.command.as_str() {
        "PING" => Ok(Reply::data(json!("PONG"))),
        "GENERATE" => handle_generate(req.params, state).map(Reply::data),
        "SHUTDOWN" => Ok(Reply {
            data: json!("Shutting down..."),
            shutdown: true,
        }),
        _ => anyhow::bail!("Unknown command: {}", req.command),
    }
}

fn handle_generate(params: Option<serde_json::Value>, state: &ServerState) -> Result<serde_json::Value> {
    let params = params.ok_or_else(|| anyhow::anyhow!("Missing params for GENERATE"))?;
    let request: GenerateRequest =
        serde_json::from_value(params).context("Invalid params for GENERATE")?;

    info!(snapshot = %request.snapshot.display(), "generating");
    let generated = crate::api::generate(&request)?;
    let dto = GeneratedDto::new(generated, &state.exporter);

    Ok(serde_json::to_value(dto)?)
}
