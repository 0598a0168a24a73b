// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 请求在读取、路由、渲染或发送过程中可能遇到的全部失败情况。
//! 每个变体只对应一个 HTTP 状态码，路由器和连接循环据此把任意 `Err` 直接转成响应。

use std::fmt;

/// 处理请求时产生的异常类型。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 请求头不是合法的 UTF-8。
    RequestIsNotUtf8,
    /// 请求行不符合 `METHOD TARGET VERSION` 格式，或方法无法识别。
    MalformedRequest,
    /// 请求使用了 1.0 与 1.1 以外的 HTTP 版本。
    UnsupportedHttpVersion,
    /// 请求头超过了配置的大小上限。
    RequestTooLarge,
    /// 没有已注册的路由能匹配该方法与路径。
    RouteNotFound,
    /// 请求的模板 id 从未被加载。
    TemplateNotFound,
    /// 请求的静态文件不存在，或不是普通文件。
    AssetNotFound,
    /// 请求的静态路径试图越出资源根目录（目录遍历）。
    InvalidPath,
    /// 文件存在但无法读取。
    InternalError,
}

use Exception::*;

impl Exception {
    /// 该异常返回给客户端时使用的 HTTP 状态码。
    pub fn status_code(&self) -> u16 {
        match self {
            RequestIsNotUtf8 | MalformedRequest | UnsupportedHttpVersion => 400,
            RequestTooLarge => 431,
            RouteNotFound | AssetNotFound | InvalidPath => 404,
            TemplateNotFound | InternalError => 500,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            MalformedRequest => write!(f, "Malformed request line"),
            UnsupportedHttpVersion => write!(f, "Unsupported HTTP version"),
            RequestTooLarge => write!(f, "Request head too large (431)"),
            RouteNotFound => write!(f, "No route matches (404)"),
            TemplateNotFound => write!(f, "Template not found"),
            AssetNotFound => write!(f, "Static asset not found (404)"),
            InvalidPath => write!(f, "Path escapes the asset root"),
            InternalError => write!(f, "Internal server error (500)"),
        }
    }
}

impl std::error::Error for Exception {}
