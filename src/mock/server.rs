//! Minimal HTTP/1.1 server for the mock completion endpoints.
//!
//! Hand-rolled over a tokio `TcpListener`: the surface is four routes and
//! the streaming route needs full control over SSE frame pacing, which is
//! exactly the part HTTP test doubles don't give us.

use std::io;
use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;

use crate::chat::wire::{CompletionRequest, DONE_FRAME};
use crate::mock::generate::{chunk_frames, completion};
use crate::mock::{MockConfig, MockConfigPatch};

struct ServerState {
    config: Mutex<MockConfig>,
    rng: Mutex<StdRng>,
}

impl ServerState {
    fn new(config: MockConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config: Mutex::new(config),
            rng: Mutex::new(rng),
        }
    }

    fn config_snapshot(&self) -> MockConfig {
        match self.config.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Run the mock server on an already-bound listener until the task is
/// dropped. Binding is left to the caller so tests can use an ephemeral port.
pub async fn serve(listener: TcpListener, config: MockConfig) -> io::Result<()> {
    let addr = listener.local_addr()?;
    info!(
        "Mock server listening on {} (latency={}ms, seed={})",
        addr, config.latency, config.seed
    );
    let state = Arc::new(ServerState::new(config));

    loop {
        let (stream, peer) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, state).await {
                debug!("Connection from {} ended with error: {}", peer, e);
            }
        });
    }
}

struct Request {
    method: String,
    path: String,
    body: Vec<u8>,
}

async fn handle_connection(stream: TcpStream, state: Arc<ServerState>) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    while let Some(request) = read_request(&mut reader).await? {
        match (request.method.as_str(), request.path.as_str()) {
            ("POST", "/v1/chat/completions") => {
                let streamed = chat_completions(&request, &mut write_half, &state).await?;
                if streamed {
                    // SSE responses are Connection: close
                    return Ok(());
                }
            }
            ("GET", "/health") => {
                let body = json!({
                    "status": "ok",
                    "service": "parrot-mock-server",
                    "version": env!("CARGO_PKG_VERSION"),
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                    "config": state.config_snapshot(),
                });
                write_json(&mut write_half, 200, &body.to_string()).await?;
            }
            ("GET", "/config") => {
                let body = serde_json::to_string(&state.config_snapshot())
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                write_json(&mut write_half, 200, &body).await?;
            }
            ("POST", "/config") => {
                update_config(&request, &mut write_half, &state).await?;
            }
            (method, path) => {
                debug!("No route for {} {}", method, path);
                let body = json!({"error": {"message": format!("no route for {method} {path}")}});
                write_json(&mut write_half, 404, &body.to_string()).await?;
            }
        }
    }

    Ok(())
}

/// Read one HTTP/1.1 request. Returns `None` on a clean EOF between requests.
async fn read_request(
    reader: &mut BufReader<OwnedReadHalf>,
) -> io::Result<Option<Request>> {
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(None);
    }

    let mut parts = request_line.split_whitespace();
    let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("bad request line: {request_line:?}"),
        ));
    };
    let method = method.to_string();
    // Strip any query string; routes don't use them
    let path = path.split('?').next().unwrap_or(path).to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed mid-headers",
            ));
        }
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':')
            && name.eq_ignore_ascii_case("content-length")
        {
            content_length = value.trim().parse().map_err(|_| {
                io::Error::new(io::ErrorKind::InvalidData, "bad content-length")
            })?;
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    Ok(Some(Request { method, path, body }))
}

/// Handle a completion request. Returns true when the response was streamed
/// (and the connection should close).
async fn chat_completions(
    request: &Request,
    writer: &mut OwnedWriteHalf,
    state: &ServerState,
) -> io::Result<bool> {
    let completion_request: CompletionRequest = match serde_json::from_slice(&request.body) {
        Ok(req) => req,
        Err(e) => {
            let body = json!({"error": {"message": format!("invalid request body: {e}")}});
            write_json(writer, 400, &body.to_string()).await?;
            return Ok(false);
        }
    };

    let config = state.config_snapshot();
    if config.log_requests {
        info!(
            "Completion request: model={}, messages={}, stream={}",
            completion_request.model,
            completion_request.messages.len(),
            completion_request.stream
        );
    }

    sleep(std::time::Duration::from_millis(config.latency)).await;

    if config.include_errors {
        let roll: f64 = match state.rng.lock() {
            Ok(mut rng) => rng.gen_range(0.0..1.0),
            Err(poisoned) => poisoned.into_inner().gen_range(0.0..1.0),
        };
        if roll < 0.1 {
            warn!("Injecting simulated server error");
            let body = json!({"error": {
                "message": "Simulated API error",
                "type": "server_error",
                "code": "internal_server_error",
            }});
            write_json(writer, 500, &body.to_string()).await?;
            return Ok(false);
        }
    }

    if !completion_request.stream {
        let response = {
            let mut rng = match state.rng.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            completion(&completion_request, &config, &mut rng)
        };
        let body = serde_json::to_string(&response)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        write_json(writer, 200, &body).await?;
        return Ok(false);
    }

    // Frames are precomputed under the RNG lock, then paced without it
    let frames = {
        let mut rng = match state.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        chunk_frames(&completion_request, &config, &mut rng)
    };

    writer
        .write_all(
            b"HTTP/1.1 200 OK\r\n\
              Content-Type: text/event-stream\r\n\
              Cache-Control: no-cache\r\n\
              Connection: close\r\n\r\n",
        )
        .await?;

    for (frame, delay) in frames {
        sleep(delay).await;
        let payload = serde_json::to_string(&frame)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writer
            .write_all(format!("data: {payload}\n\n").as_bytes())
            .await?;
        writer.flush().await?;
    }
    writer
        .write_all(format!("data: {DONE_FRAME}\n\n").as_bytes())
        .await?;
    writer.flush().await?;

    Ok(true)
}

async fn update_config(
    request: &Request,
    writer: &mut OwnedWriteHalf,
    state: &ServerState,
) -> io::Result<()> {
    let patch: MockConfigPatch = match serde_json::from_slice(&request.body) {
        Ok(patch) => patch,
        Err(e) => {
            let body = json!({"error": {"message": format!("invalid config patch: {e}")}});
            return write_json(writer, 400, &body.to_string()).await;
        }
    };

    let updated = {
        let mut config = match state.config.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let reseed = config.apply(patch);
        if reseed {
            info!("Reseeding response RNG with seed {}", config.seed);
            let mut rng = match state.rng.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *rng = StdRng::seed_from_u64(config.seed);
        }
        config.clone()
    };

    let body = serde_json::to_string(&updated)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    write_json(writer, 200, &body).await
}

async fn write_json(writer: &mut OwnedWriteHalf, status: u16, body: &str) -> io::Result<()> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Unknown",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\r\n{body}",
        body.len()
    );
    writer.write_all(response.as_bytes()).await?;
    writer.flush().await
}
