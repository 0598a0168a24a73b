// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与全局常量
//!
//! 请求解析器与响应构建器共用的 HTTP 常量：
//! - 状态码及其原因短语
//! - 静态资源使用的扩展名到 MIME 类型映射表
//! - 强类型的请求方法、协议版本与内容编码枚举

use std::collections::HashMap;
use std::fmt;

use lazy_static::lazy_static;

/// `Server` 响应头的取值
pub const SERVER_NAME: &str = "dinoweb";

/// HTTP 行结束符
pub const CRLF: &str = "\r\n";

/// 所有生成的 HTML 页面使用的内容类型
pub const HTML_CONTENT_TYPE: &str = "text/html;charset=utf-8";

/// 未知扩展名的兜底内容类型
pub const OCTET_STREAM: &str = "application/octet-stream";

lazy_static! {
    /// 服务器可能返回的状态码及其原因短语。
    ///
    /// 参见 [RFC 9110](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(204, "No Content");
        map.insert(304, "Not Modified");

        map.insert(400, "Bad Request");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(408, "Request Timeout");
        map.insert(414, "URI Too Long");
        map.insert(431, "Request Header Fields Too Large");

        map.insert(500, "Internal Server Error");
        map.insert(501, "Not Implemented");
        map.insert(505, "HTTP Version Not Supported");
        map
    };
}

lazy_static! {
    /// 文件扩展名到媒体类型的映射，用于填充静态资源的 `Content-Type`。
    pub static ref MIME_TYPES: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        // 文本
        map.insert("css", "text/css;charset=utf-8");
        map.insert("csv", "text/csv");
        map.insert("htm", HTML_CONTENT_TYPE);
        map.insert("html", HTML_CONTENT_TYPE);
        map.insert("js", "text/javascript;charset=utf-8");
        map.insert("mjs", "text/javascript;charset=utf-8");
        map.insert("json", "application/json");
        map.insert("map", "application/json");
        map.insert("md", "text/markdown;charset=utf-8");
        map.insert("txt", "text/plain;charset=utf-8");
        map.insert("xml", "text/xml");
        // 图片
        map.insert("avif", "image/avif");
        map.insert("bmp", "image/bmp");
        map.insert("gif", "image/gif");
        map.insert("ico", "image/x-icon");
        map.insert("jpeg", "image/jpeg");
        map.insert("jpg", "image/jpeg");
        map.insert("png", "image/png");
        map.insert("svg", "image/svg+xml");
        map.insert("webp", "image/webp");
        // 字体
        map.insert("otf", "font/otf");
        map.insert("ttf", "font/ttf");
        map.insert("woff", "font/woff");
        map.insert("woff2", "font/woff2");
        // 其他
        map.insert("pdf", "application/pdf");
        map.insert("wasm", "application/wasm");
        map.insert("zip", "application/zip");
        map
    };
}

/// 按扩展名查找媒体类型（不区分大小写）。
pub fn mime_for_extension(extension: Option<&str>) -> &'static str {
    let extension = match extension {
        Some(e) => e.to_ascii_lowercase(),
        None => return OCTET_STREAM,
    };
    MIME_TYPES.get(extension.as_str()).copied().unwrap_or(OCTET_STREAM)
}

/// 支持的 HTTP 版本。响应始终以 HTTP/1.1 写出。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    V1_0,
    V1_1,
}

/// 解析器能识别的请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpRequestMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Patch,
    Options,
}

impl HttpRequestMethod {
    /// 解析请求行中的方法字段，不区分大小写。
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "HEAD" => Some(Self::Head),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "PATCH" => Some(Self::Patch),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }
}

/// 服务器能够生成的内容编码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpEncoding {
    Gzip,
    Deflate,
    Br,
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpVersion::V1_0 => write!(f, "1.0"),
            HttpVersion::V1_1 => write!(f, "1.1"),
        }
    }
}

impl fmt::Display for HttpRequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match *self {
            HttpRequestMethod::Get => "GET",
            HttpRequestMethod::Head => "HEAD",
            HttpRequestMethod::Post => "POST",
            HttpRequestMethod::Put => "PUT",
            HttpRequestMethod::Delete => "DELETE",
            HttpRequestMethod::Patch => "PATCH",
            HttpRequestMethod::Options => "OPTIONS",
        };
        f.write_str(name)
    }
}

impl fmt::Display for HttpEncoding {
    /// `Content-Encoding` 头中使用的标记
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpEncoding::Gzip => write!(f, "gzip"),
            HttpEncoding::Deflate => write!(f, "deflate"),
            HttpEncoding::Br => write!(f, "br"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_known_extensions() {
        assert_eq!(mime_for_extension(Some("css")), "text/css;charset=utf-8");
        assert_eq!(mime_for_extension(Some("png")), "image/png");
        assert_eq!(mime_for_extension(Some("html")), HTML_CONTENT_TYPE);
    }

    #[test]
    fn test_mime_is_case_insensitive() {
        assert_eq!(mime_for_extension(Some("PNG")), "image/png");
        assert_eq!(mime_for_extension(Some("Css")), "text/css;charset=utf-8");
    }

    #[test]
    fn test_mime_unknown_or_missing() {
        assert_eq!(mime_for_extension(Some("unknown_extension")), OCTET_STREAM);
        assert_eq!(mime_for_extension(None), OCTET_STREAM);
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(HttpRequestMethod::parse("GET"), Some(HttpRequestMethod::Get));
        assert_eq!(HttpRequestMethod::parse("head"), Some(HttpRequestMethod::Head));
        assert_eq!(HttpRequestMethod::parse("BREW"), None);
    }

    #[test]
    fn test_status_codes_cover_error_kinds() {
        for code in [200, 400, 404, 431, 500] {
            assert!(STATUS_CODES.contains_key(&code), "missing {}", code);
        }
    }
}
