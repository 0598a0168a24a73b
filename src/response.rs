use crate::{param::*, util::HtmlBuilder};

use brotli::enc::{self, backward_references::BrotliEncoderParams};
use bytes::Bytes;
use chrono::prelude::*;
use flate2::{
    write::{DeflateEncoder, GzEncoder},
    Compression,
};
use log::{debug, error};

use std::io::{self, Write};

#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    content_type: Option<String>,
    content_length: u64,
    date: DateTime<Utc>,
    content_encoding: Option<HttpEncoding>,
    server_name: String,
    content: Option<Bytes>,
}

impl Response {
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            content_type: None,
            content_length: 0,
            date: Utc::now(),
            content_encoding: None,
            server_name: SERVER_NAME.to_string(),
            content: None,
        }
    }

    /// 200 OK with an HTML body
    pub fn from_html(html: impl Into<String>) -> Self {
        let html: String = html.into();
        Self::from_bytes(Bytes::from(html), HTML_CONTENT_TYPE)
    }

    /// 200 OK with an arbitrary body
    pub fn from_bytes(content: Bytes, content_type: &str) -> Self {
        let mut response = Self::new();
        response.content_length = content.len() as u64;
        response.content_type = Some(content_type.to_string());
        response.content = Some(content);
        response
    }

    /// Minimal HTML page for an error status
    pub fn from_status_code(code: u16) -> Self {
        let note = match code {
            404 => Some("The page you asked for could not be found."),
            500 => Some("The server ran into an internal error."),
            _ => None,
        };
        let html = HtmlBuilder::from_status_code(code, note).build();
        let mut response = Self::from_html(html);
        response.set_code(code);
        response
    }

    pub fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&reason) => reason.to_string(),
            None => {
                error!("status code {} has no reason phrase", code);
                "Unknown".to_string()
            }
        };
        self
    }

    /// Drop the body for a HEAD request. `Content-Length` keeps describing the
    /// body a GET would have received.
    pub fn strip_body(&mut self) -> &mut Self {
        self.content = None;
        self
    }

    /// Compress the body with the best coding the client accepts. Bodies that
    /// are already compressed (images, fonts, archives) are left alone.
    pub fn encode(&mut self, accept_encoding: &[HttpEncoding], id: u128) -> &mut Self {
        if self.content_encoding.is_some() {
            return self;
        }
        let Some(content) = self.content.as_ref() else {
            return self;
        };
        if content.is_empty() {
            return self;
        }
        if let Some(mime) = self.content_type.as_deref() {
            if should_skip_compression(mime) {
                debug!("[ID{}]skipping compression for {}", id, mime);
                return self;
            }
        }
        let Some(encoding) = decide_encoding(accept_encoding) else {
            return self;
        };

        match compress(content.to_vec(), Some(encoding)) {
            Ok(compressed) => {
                debug!(
                    "[ID{}]{} {} -> {} bytes",
                    id,
                    encoding,
                    content.len(),
                    compressed.len()
                );
                self.content_length = compressed.len() as u64;
                self.content = Some(Bytes::from(compressed));
                self.content_encoding = Some(encoding);
            }
            Err(e) => error!("[ID{}]{} compression failed, sending identity: {}", id, encoding, e),
        }
        self
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let version: &str = match self.version {
            HttpVersion::V1_0 => "HTTP/1.0",
            HttpVersion::V1_1 => "HTTP/1.1",
        };
        let status_code: &str = &self.status_code.to_string();
        let information: &str = &self.information;
        let content_length: &str = &self.content_length.to_string();
        let date: &str = &format_date(&self.date);
        let server: &str = &self.server_name;

        let header = [
            version,
            " ",
            status_code,
            " ",
            information,
            CRLF,
            match &self.content_type {
                Some(t) => ["Content-Type: ", t.as_str(), CRLF].concat(),
                None => "".to_string(),
            }
            .as_str(),
            match self.content_encoding {
                Some(e) => format!("Content-Encoding: {}{}", e, CRLF),
                None => "".to_string(),
            }
            .as_str(),
            "Content-Length: ",
            content_length,
            CRLF,
            "Date: ",
            date,
            CRLF,
            "Server: ",
            server,
            CRLF,
            "Connection: close",
            CRLF,
            CRLF,
        ]
        .concat();
        [header.as_bytes(), self.content.as_deref().unwrap_or(b"")].concat()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    pub fn content_encoding(&self) -> Option<HttpEncoding> {
        self.content_encoding
    }

    pub fn content_length(&self) -> u64 {
        self.content_length
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn compress(data: Vec<u8>, mode: Option<HttpEncoding>) -> io::Result<Vec<u8>> {
    match mode {
        Some(HttpEncoding::Gzip) => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        Some(HttpEncoding::Deflate) => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&data)?;
            encoder.finish()
        }
        Some(HttpEncoding::Br) => {
            let params = BrotliEncoderParams::default();
            let mut output = Vec::new();
            enc::BrotliCompress(&mut io::Cursor::new(data), &mut output, &params)?;
            Ok(output)
        }
        None => Ok(data),
    }
}

fn should_skip_compression(mime_type: &str) -> bool {
    let skip_types = [
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "image/avif",
        "image/x-icon",
        "video/",
        "audio/",
        "application/zip",
        "application/gzip",
        "font/woff",
        "font/woff2",
    ];

    skip_types
        .iter()
        .any(|&skip_type| mime_type.starts_with(skip_type))
}

// gzip first, then brotli, then deflate
fn decide_encoding(accept_encoding: &[HttpEncoding]) -> Option<HttpEncoding> {
    [HttpEncoding::Gzip, HttpEncoding::Br, HttpEncoding::Deflate]
        .into_iter()
        .find(|e| accept_encoding.contains(e))
}
