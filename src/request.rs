// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求解析模块
//!
//! 将请求头的原始字节解析为 [`Request`]：
//! 1. 请求行（方法、目标、版本）
//! 2. 请求目标，拆分为百分号解码后的路径与查询字符串
//! 3. 查询字符串，解码为有序的名称/值对列表
//! 4. 服务器关心的少数请求头（`User-Agent`、`Accept-Encoding`）
//!
//! 不读取请求体，所有路由都是 GET。

use crate::{exception::Exception, param::*};
use log::{debug, error, warn};
use percent_encoding::percent_decode_str;

/// 解析完成的 HTTP 请求头。
#[derive(Debug, Clone)]
pub struct Request {
    /// 连接级别的 id，用于关联日志
    id: u128,
    method: HttpRequestMethod,
    /// 百分号解码后的路径，不含查询字符串
    path: String,
    /// 原始查询字符串（`?` 之后的部分），可能为空
    query: String,
    /// 解码后的查询参数，保持出现顺序
    query_params: Vec<(String, String)>,
    version: HttpVersion,
    user_agent: String,
    /// 客户端接受的编码，按声明顺序
    accept_encoding: Vec<HttpEncoding>,
}

impl Request {
    /// 直接由方法和请求目标（如 `/dino?age=7`）构造请求，请求头留空。
    pub fn new(method: HttpRequestMethod, target: &str) -> Self {
        let (path, query) = split_target(target);
        let query_params = parse_query(&query, 0);
        Self {
            id: 0,
            method,
            path,
            query,
            query_params,
            version: HttpVersion::V1_1,
            user_agent: String::new(),
            accept_encoding: vec![],
        }
    }

    /// 解析从套接字读取的请求头。
    ///
    /// `buffer` 至少要包含请求行；头部读到第一个空行为止，其后的内容被忽略。
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        // 1. 整个请求头必须是 UTF-8
        let request_string = match std::str::from_utf8(buffer) {
            Ok(s) => s,
            Err(_) => {
                error!("[ID{}]request head is not valid UTF-8", id);
                return Err(Exception::RequestIsNotUtf8);
            }
        };

        let mut lines = request_string.split(CRLF);
        let request_line = lines.next().unwrap_or_default();

        // 2. 请求行，例如 "GET /dino?age=7 HTTP/1.1"
        let parts: Vec<&str> = request_line.split(' ').filter(|p| !p.is_empty()).collect();
        if parts.len() < 3 {
            error!("[ID{}]malformed request line: {}", id, request_line);
            return Err(Exception::MalformedRequest);
        }

        let method = match HttpRequestMethod::parse(parts[0]) {
            Some(m) => m,
            None => {
                error!("[ID{}]unknown request method: {}", id, parts[0]);
                return Err(Exception::MalformedRequest);
            }
        };

        let version_str = parts[parts.len() - 1].to_uppercase();
        let version = match version_str.as_str() {
            "HTTP/1.1" => HttpVersion::V1_1,
            "HTTP/1.0" => HttpVersion::V1_0,
            v if v.starts_with("HTTP/") => {
                error!("[ID{}]unsupported HTTP version: {}", id, v);
                return Err(Exception::UnsupportedHttpVersion);
            }
            v => {
                error!("[ID{}]malformed HTTP version: {}", id, v);
                return Err(Exception::MalformedRequest);
            }
        };

        // 含空格的目标并不合法，浏览器与 curl 也不会发送；按拆分方式原样拼回。
        let target = parts[1..parts.len() - 1].join(" ");
        let (path, query) = split_target(&target);
        let query_params = parse_query(&query, id);

        // 3. 请求头
        let mut user_agent = String::new();
        let mut accept_encoding = vec![];
        for line in lines {
            if line.is_empty() {
                break;
            }
            let Some((name, value)) = line.split_once(':') else {
                debug!("[ID{}]skipping header line without a colon", id);
                continue;
            };
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "user-agent" => user_agent = value.to_string(),
                "accept-encoding" => accept_encoding = parse_accept_encoding(value),
                _ => {}
            }
        }

        Ok(Self {
            id,
            method,
            path,
            query,
            query_params,
            version,
            user_agent,
            accept_encoding,
        })
    }
}

impl Request {
    pub fn id(&self) -> u128 {
        self.id
    }

    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 百分号解码后的路径，不含查询字符串
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 原始查询字符串
    pub fn query(&self) -> &str {
        &self.query
    }

    /// 查询参数的第一个值（如果存在）
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// 查询参数的第一个值，缺失时返回空字符串
    pub fn query_param_or_empty(&self, name: &str) -> &str {
        self.query_param(name).unwrap_or("")
    }

    pub fn version(&self) -> &HttpVersion {
        &self.version
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn accept_encoding(&self) -> &[HttpEncoding] {
        &self.accept_encoding
    }
}

/// 将请求目标拆分为解码后的路径和原始查询字符串。
fn split_target(target: &str) -> (String, String) {
    let (raw_path, query) = match target.split_once('?') {
        Some((p, q)) => (p, q),
        None => (target, ""),
    };
    // 丢弃客户端误发的片段（#）
    let query = query.split('#').next().unwrap_or_default();
    let path = percent_decode_str(raw_path).decode_utf8_lossy().into_owned();
    (path, query.to_string())
}

fn parse_query(query: &str, id: u128) -> Vec<(String, String)> {
    if query.is_empty() {
        return vec![];
    }
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => pairs,
        Err(e) => {
            warn!("[ID{}]could not decode query string {:?}: {}", id, query, e);
            vec![]
        }
    }
}

/// 解析 `Accept-Encoding`，只保留服务器能生成的编码，并剔除以 `q=0` 明确拒绝的编码。
fn parse_accept_encoding(value: &str) -> Vec<HttpEncoding> {
    let mut encodings = vec![];
    for item in value.split(',') {
        let mut params = item.split(';');
        let coding = params.next().unwrap_or_default().trim().to_ascii_lowercase();
        let refused = params.any(|p| {
            p.trim()
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q == 0.0)
        });
        if refused {
            continue;
        }
        let encoding = match coding.as_str() {
            "gzip" => HttpEncoding::Gzip,
            "deflate" => HttpEncoding::Deflate,
            "br" => HttpEncoding::Br,
            _ => continue,
        };
        if !encodings.contains(&encoding) {
            encodings.push(encoding);
        }
    }
    encodings
}
