//! # Connection server
//!
//! Accept loop plus the per-connection task: read one request head, route it,
//! write the response, close. The loop runs until the shutdown future given to
//! [`Server::run`] resolves; connections already accepted finish on their own.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout,
};

use crate::{
    config::Config, exception::Exception, request::Request, response::Response, router::Router,
};

const HEAD_TERMINATOR: &[u8] = b"\r\n\r\n";
const READ_CHUNK: usize = 1024;

pub struct Server {
    router: Arc<Router>,
    config: Arc<Config>,
    active_connections: Arc<AtomicUsize>,
}

impl Server {
    pub fn new(router: Router, config: Config) -> Self {
        Self {
            router: Arc::new(router),
            config: Arc::new(config),
            active_connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of connections currently being served.
    pub fn active_connections(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.active_connections)
    }

    pub async fn run(&self, listener: TcpListener, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut id: u128 = 0;

        loop {
            let (mut stream, addr) = tokio::select! {
                _ = &mut shutdown => {
                    info!("shutdown requested, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("failed to accept connection: {}", e);
                        continue;
                    }
                },
            };
            debug!("[ID{}]TCP connection from {}", id, addr);

            let router = Arc::clone(&self.router);
            let config = Arc::clone(&self.config);
            let active = Arc::clone(&self.active_connections);
            tokio::spawn(async move {
                active.fetch_add(1, Ordering::SeqCst);
                handle_connection(&mut stream, id, &router, &config).await;
                active.fetch_sub(1, Ordering::SeqCst);
            });
            id += 1;
        }
    }
}

/// Serve exactly one request on `stream`.
async fn handle_connection(stream: &mut TcpStream, id: u128, router: &Router, config: &Config) {
    let read_timeout = Duration::from_secs(config.read_timeout_secs());
    let head = match timeout(read_timeout, read_head(stream, config.max_request_size())).await {
        Ok(Ok(Some(head))) => head,
        Ok(Ok(None)) => {
            debug!("[ID{}]connection closed before a request arrived", id);
            return;
        }
        Ok(Err(ReadError::TooLarge)) => {
            warn!("[ID{}]request head exceeds {} bytes", id, config.max_request_size());
            let response = Response::from_status_code(Exception::RequestTooLarge.status_code());
            write_response(stream, id, &response).await;
            return;
        }
        Ok(Err(ReadError::Io(e))) => {
            error!("[ID{}]error reading from TCP stream: {}", id, e);
            return;
        }
        Err(_) => {
            warn!("[ID{}]read timed out after {:?}, dropping connection", id, read_timeout);
            return;
        }
    };

    let start_time = Instant::now();
    let request = match Request::try_from(&head, id) {
        Ok(req) => req,
        Err(e) => {
            warn!("[ID{}]bad request: {}", id, e);
            let response = Response::from_status_code(e.status_code());
            write_response(stream, id, &response).await;
            return;
        }
    };

    let mut response = router.dispatch(&request);
    if config.compression() {
        response.encode(request.accept_encoding(), id);
    }
    debug!(
        "[ID{}]response built in {}ms",
        id,
        start_time.elapsed().as_millis()
    );

    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}",
        id,
        request.version(),
        request.path(),
        request.method(),
        response.status_code(),
        response.information(),
        request.user_agent(),
    );

    write_response(stream, id, &response).await;
}

#[derive(Debug)]
enum ReadError {
    TooLarge,
    Io(std::io::Error),
}

/// Read until the blank line ending the head. `Ok(None)` when the peer closed
/// without sending anything. A head cut short by EOF is returned as is and left
/// to the parser.
async fn read_head(stream: &mut TcpStream, limit: usize) -> Result<Option<Vec<u8>>, ReadError> {
    let mut head = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = stream.read(&mut chunk).await.map_err(ReadError::Io)?;
        if n == 0 {
            return Ok(if head.is_empty() { None } else { Some(head) });
        }
        // only rescan the part that could contain a new terminator
        let scan_from = head.len().saturating_sub(HEAD_TERMINATOR.len() - 1);
        head.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_terminator(&head[scan_from..]) {
            let end = scan_from + pos + HEAD_TERMINATOR.len();
            if end > limit {
                return Err(ReadError::TooLarge);
            }
            head.truncate(end);
            return Ok(Some(head));
        }
        if head.len() > limit {
            return Err(ReadError::TooLarge);
        }
    }
}

fn find_terminator(bytes: &[u8]) -> Option<usize> {
    bytes
        .windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
}

async fn write_response(stream: &mut TcpStream, id: u128, response: &Response) {
    let bytes = response.as_bytes();
    debug!("[ID{}]sending {} bytes", id, bytes.len());
    if let Err(e) = stream.write_all(&bytes).await {
        error!("[ID{}]failed to write response: {}", id, e);
        return;
    }
    if let Err(e) = stream.flush().await {
        debug!("[ID{}]flush failed: {}", id, e);
    }
    if let Err(e) = stream.shutdown().await {
        debug!("[ID{}]shutdown failed: {}", id, e);
    }
}
