use bytes::Bytes;
use http::{
    HeaderMap, HeaderValue, StatusCode,
    header::{CACHE_CONTROL, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};

use crate::config::SettingOffline;

/// 响应类型
///
/// - `Basic`: 与页面同源的响应
/// - `Cors`: 跨域且可读的响应
/// - `Opaque`: 跨域 no-cors 响应
/// - `Default`: 由 worker 合成的响应
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Basic,
    Cors,
    Opaque,
    Default,
}

/// 响应快照，body 使用 `Bytes`，clone 开销很小
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub kind: ResponseKind,
}

impl FetchResponse {
    pub fn new(status: StatusCode, body: impl Into<Bytes>, kind: ResponseKind) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            kind,
        }
    }

    pub fn with_header(mut self, name: http::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// 只有同源且状态码为 200 的响应才会写入缓存
    pub fn is_cacheable(&self) -> bool {
        self.status == StatusCode::OK && self.kind == ResponseKind::Basic
    }
}

/// 非导航请求在离线时的 503 响应
pub fn service_unavailable(text: &str) -> FetchResponse {
    FetchResponse::new(
        StatusCode::SERVICE_UNAVAILABLE,
        text.to_string(),
        ResponseKind::Default,
    )
    .with_header(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    )
}

/// 合成的离线页面
///
/// 页面自包含（内联样式，无外部资源），按钮点击后重新加载当前页面
pub fn offline_page(offline: &SettingOffline) -> FetchResponse {
    let html = format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; background: #f3f4f6; color: #1f2937; display: flex; align-items: center; justify-content: center; min-height: 100vh; margin: 0; }}
main {{ background: #fff; padding: 32px; border-radius: 12px; box-shadow: 0 10px 15px -3px rgba(0, 0, 0, 0.1); text-align: center; max-width: 420px; }}
button {{ background: #3b82f6; color: #fff; border: none; padding: 10px 20px; border-radius: 6px; font-weight: 600; cursor: pointer; }}
</style>
</head>
<body>
<main>
<h1>{text}</h1>
<p>{message}</p>
<button type="button" onclick="window.location.reload()">{retry}</button>
</main>
</body>
</html>
"#,
        title = escape_html(&offline.title),
        text = escape_html(&offline.text),
        message = escape_html(&offline.message),
        retry = escape_html(&offline.retry),
    );

    FetchResponse::new(StatusCode::OK, html, ResponseKind::Default)
        .with_header(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        )
        .with_header(CACHE_CONTROL, HeaderValue::from_static("no-store"))
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
