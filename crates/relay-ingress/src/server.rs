use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tiny_http::{Method, Response, Server};

use crate::buffer_pool::{reserve_doubling, BufferPool, MAX_BODY_BYTES};
use crate::error::IngressError;
use crate::secret::constant_time_eq;

const JSON_CONTENT_TYPE_PREFIX: &str = "application/json";
const SECRET_HEADER: &str = "X-Telegram-Bot-Api-Secret-Token";
const READ_CHUNK: usize = 8 * 1024;
const POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Sizing and validation parameters for [`IngressServer::start`] (spec §6).
pub struct IngressConfig {
    pub port: u16,
    pub threads: usize,
    pub pool_size: usize,
    pub secret: String,
}

/// Receives a successfully parsed update. Takes ownership of the parsed
/// tree (spec §4.5 step 5).
pub type UpdateCallback = dyn Fn(serde_json::Value) + Send + Sync;

/// Process-wide webhook HTTP server exposing exactly `POST /webhook` (spec
/// §4.5).
pub struct IngressServer {
    threads: Vec<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl IngressServer {
    /// Binds the server and spawns `config.threads` blocking worker
    /// threads, each looping on `server.recv_timeout` (spec §4.5
    /// "Concurrency": "an internal thread pool ... there is no async
    /// runtime in this component").
    pub fn start(
        config: IngressConfig,
        on_update: Arc<UpdateCallback>,
    ) -> Result<Self, IngressError> {
        let server =
            Server::http(("0.0.0.0", config.port)).map_err(|e| IngressError::Bind(e.to_string()))?;
        let server = Arc::new(server);
        let pool = Arc::new(BufferPool::new(config.pool_size, READ_CHUNK));
        let secret = Arc::new(config.secret);
        let running = Arc::new(AtomicBool::new(true));

        let threads = (0..config.threads.clamp(1, 32))
            .map(|idx| {
                let server = Arc::clone(&server);
                let pool = Arc::clone(&pool);
                let secret = Arc::clone(&secret);
                let on_update = Arc::clone(&on_update);
                let running = Arc::clone(&running);
                thread::Builder::new()
                    .name(format!("relay-ingress-{idx}"))
                    .spawn(move || worker_loop(&server, &pool, &secret, on_update.as_ref(), &running))
                    .expect("failed to spawn ingress worker thread")
            })
            .collect();

        Ok(Self { threads, running })
    }

    /// Signals every worker thread to stop after its current `recv_timeout`
    /// poll and waits for them to exit.
    pub fn shutdown(self) {
        self.running.store(false, Ordering::Relaxed);
        for handle in self.threads {
            let _ = handle.join();
        }
    }
}

fn worker_loop(
    server: &Server,
    pool: &BufferPool,
    secret: &str,
    on_update: &UpdateCallback,
    running: &AtomicBool,
) {
    while running.load(Ordering::Relaxed) {
        match server.recv_timeout(POLL_TIMEOUT) {
            Ok(Some(request)) => handle_request(request, pool, secret, on_update),
            Ok(None) => continue,
            Err(_) => return,
        }
    }
}

fn handle_request(
    mut request: tiny_http::Request,
    pool: &BufferPool,
    secret: &str,
    on_update: &UpdateCallback,
) {
    if request.method() != &Method::Post || request.url() != "/webhook" {
        let _ = request.respond(Response::empty(404));
        return;
    }

    if !secret.is_empty() {
        let provided = header_value(&request, SECRET_HEADER).unwrap_or_default();
        if !constant_time_eq(&provided, secret) {
            let _ = request.respond(Response::empty(403));
            return;
        }
    }

    let content_type = header_value(&request, "Content-Type").unwrap_or_default();
    let prefix_matches = content_type
        .get(..JSON_CONTENT_TYPE_PREFIX.len())
        .is_some_and(|p| p.eq_ignore_ascii_case(JSON_CONTENT_TYPE_PREFIX));
    if !prefix_matches {
        let _ = request.respond(Response::empty(415));
        return;
    }

    let mut buffer = pool.acquire();
    let oversized = accumulate_body(&mut request, &mut buffer);
    if oversized {
        let _ = request.respond(Response::empty(413));
        return;
    }

    match serde_json::from_slice::<serde_json::Value>(&buffer) {
        Ok(value) => on_update(value),
        Err(_) => {}
    }
    let _ = request.respond(Response::from_string("ok"));
}

/// Reads the whole body, even past [`MAX_BODY_BYTES`] (so the connection
/// closes cleanly), returning whether the limit was exceeded (spec §4.5
/// "Size check").
fn accumulate_body(request: &mut tiny_http::Request, buffer: &mut Vec<u8>) -> bool {
    let reader = request.as_reader();
    let mut chunk = [0u8; READ_CHUNK];
    let mut oversized = false;

    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        if buffer.len() + n > MAX_BODY_BYTES {
            oversized = true;
            continue;
        }
        reserve_doubling(buffer, n);
        buffer.extend_from_slice(&chunk[..n]);
    }
    oversized
}

fn header_value(request: &tiny_http::Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str().to_owned())
}
