use std::fmt::{self, Display, Formatter};

use bytes::Bytes;
use http::{
    HeaderMap, HeaderValue, Method,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};
use url::{Origin, Url};

use crate::error::Result;

/// 请求模式
///
/// `Navigate` 表示顶层文档加载（浏览器请求 HTML 页面）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    Navigate,
    SameOrigin,
    Cors,
    NoCors,
}

/// 被拦截的请求
#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub mode: RequestMode,
}

impl FetchRequest {
    pub fn new(method: Method, url: Url, mode: RequestMode) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            mode,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url, RequestMode::Cors)
    }

    /// 顶层导航请求
    pub fn navigate(url: Url) -> Self {
        let mut req = Self::new(Method::GET, url, RequestMode::Navigate);
        req.headers
            .insert(ACCEPT, HeaderValue::from_static("text/html"));
        req
    }

    /// 以 JSON 作为请求体的 POST 请求，用于重放离线提交
    pub fn post_json(url: Url, payload: &serde_json::Value) -> Result<Self> {
        let mut req = Self::new(Method::POST, url, RequestMode::Cors);
        req.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        req.body = Bytes::from(serde_json::to_vec(payload)?);
        Ok(req)
    }

    /// 根据请求头推断请求模式
    ///
    /// 优先使用 `Sec-Fetch-Mode`，否则 GET 且 `Accept` 包含 `text/html` 视为导航
    pub fn from_parts(method: Method, url: Url, headers: HeaderMap, body: Bytes) -> Self {
        let mode = infer_mode(&method, &headers);
        Self {
            method,
            url,
            headers,
            body,
            mode,
        }
    }

    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn origin(&self) -> Origin {
        self.url.origin()
    }
}

fn infer_mode(method: &Method, headers: &HeaderMap) -> RequestMode {
    let fetch_mode = headers
        .get("sec-fetch-mode")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase());
    match fetch_mode.as_deref() {
        Some("navigate") => return RequestMode::Navigate,
        Some("same-origin") => return RequestMode::SameOrigin,
        Some("no-cors") => return RequestMode::NoCors,
        Some("cors") => return RequestMode::Cors,
        _ => {}
    }

    let accepts_html = headers
        .get_all(ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.contains("text/html"));
    if method == Method::GET && accepts_html {
        RequestMode::Navigate
    } else {
        RequestMode::Cors
    }
}

/// 缓存条目的键：大写方法名 + 去除片段的绝对 URL
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
}

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.as_str().to_ascii_uppercase(),
            url: url.to_string(),
        }
    }
}

impl Display for RequestKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}
