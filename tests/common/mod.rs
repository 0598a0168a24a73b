// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! Spawns a real dinoweb server on an ephemeral port for the integration
//! tests and talks raw HTTP to it.

#![allow(dead_code)]

use std::{collections::HashMap, fs, net::SocketAddr, path::Path};

use dinoweb::{build_router, Config, Server};
use tempfile::TempDir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::oneshot,
};

pub const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

pub struct TestServer {
    pub addr: SocketAddr,
    /// Holds `static/` and a `server-secret` file next to it
    pub dir: TempDir,
    stop: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with("").await
    }

    /// Start a server using the repository templates and a temporary asset
    /// root. `extra` is appended to the generated TOML config.
    pub async fn start_with(extra: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let assets = dir.path().join("static");
        fs::create_dir_all(assets.join("images")).unwrap();
        fs::write(assets.join("main.css"), "main { margin: 0 auto; }\n").unwrap();
        fs::write(assets.join("images/dinoOne.png"), PNG_MAGIC).unwrap();
        fs::write(dir.path().join("server-secret"), "the password is hunter2").unwrap();

        let templates = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates");
        let toml = format!(
            "host = \"127.0.0.1\"\nport = 0\ntemplate_root = {:?}\nasset_root = {:?}\n{}",
            templates.to_string_lossy(),
            assets.to_string_lossy(),
            extra
        );
        let config = Config::from_toml_str(&toml).unwrap();
        let router = build_router(&config).unwrap();

        let listener = TcpListener::bind(config.socket_addr()).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Server::new(router, config);
        let (stop, stopped) = oneshot::channel::<()>();
        tokio::spawn(async move {
            server
                .run(listener, async move {
                    let _ = stopped.await;
                })
                .await;
        });

        Self {
            addr,
            dir,
            stop: Some(stop),
        }
    }

    /// Send `raw` as is and read until the server closes the connection. A
    /// reset after the response counts as a close.
    pub async fn send_raw(&self, raw: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream.write_all(raw).await.unwrap();
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buffer.extend_from_slice(&chunk[..n]),
            }
        }
        buffer
    }

    pub async fn request(&self, method: &str, target: &str) -> HttpResponse {
        self.request_with_headers(method, target, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: &str,
        target: &str,
        headers: &[(&str, &str)],
    ) -> HttpResponse {
        let mut raw = format!("{} {} HTTP/1.1\r\nHost: {}\r\n", method, target, self.addr);
        for (name, value) in headers {
            raw.push_str(&format!("{}: {}\r\n", name, value));
        }
        raw.push_str("\r\n");
        HttpResponse::parse(&self.send_raw(raw.as_bytes()).await)
    }

    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    /// Header names are lowercased
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has no blank line after the headers");
        let head = std::str::from_utf8(&raw[..split]).unwrap();
        let body = raw[split + 4..].to_vec();

        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap();
        let mut parts = status_line.splitn(3, ' ');
        assert_eq!(parts.next(), Some("HTTP/1.1"));
        let status = parts.next().unwrap().parse().unwrap();
        let reason = parts.next().unwrap_or_default().to_string();

        let headers = lines
            .filter_map(|line| line.split_once(": "))
            .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
            .collect();

        Self {
            status,
            reason,
            headers,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}
