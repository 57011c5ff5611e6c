use std::time::Duration;

use async_trait::async_trait;
use http::HeaderName;
use reqwest::Client;
use tracing::debug;
use url::{Origin, Url};

use super::{FetchRequest, FetchResponse, Fetcher, RequestMode, ResponseKind};
use crate::error::{Error, Result};

/// 基于 reqwest 的网络请求实现
///
/// 客户端内部持有连接池，clone 后共享同一个连接池
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    origin: Origin,
    timeout: Duration,
}

impl HttpFetcher {
    /// 创建请求客户端
    ///
    /// # 参数
    ///
    /// * `origin` - 页面所在的源，用于判断响应类型
    /// * `timeout` - 单个请求的超时时间
    pub fn new(origin: &Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            origin: origin.origin(),
            timeout,
        })
    }

    /// 根据最终响应地址判断响应类型
    fn classify(&self, request: &FetchRequest, response_url: &Url) -> ResponseKind {
        if response_url.origin() == self.origin {
            ResponseKind::Basic
        } else if request.mode == RequestMode::NoCors {
            ResponseKind::Opaque
        } else {
            ResponseKind::Cors
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let url = request.url.as_str();
        let mut forward_req = self
            .client
            .request(request.method.clone(), url)
            .timeout(self.timeout);
        for (name, value) in request.headers.iter() {
            if !is_exclude_header(name) {
                forward_req = forward_req.header(name.clone(), value.clone());
            }
        }
        if !request.body.is_empty() {
            forward_req = forward_req.body(request.body.clone());
        }

        let response = forward_req
            .send()
            .await
            .map_err(|err| Error::network(url, err))?;
        let status = response.status();
        let kind = self.classify(request, response.url());
        let mut headers = http::HeaderMap::new();
        copy_headers(response.headers(), &mut headers);
        let body = response
            .bytes()
            .await
            .map_err(|err| Error::network(url, err))?;
        debug!("fetch {} {} -> {} {:?}", request.method, url, status, kind);

        Ok(FetchResponse {
            status,
            headers,
            body,
            kind,
        })
    }
}

/// 检查给定的头部是否应该在转发时被排除
///
/// 逐跳头部只对单个连接有意义，转发会导致冲突；
/// `content-length` 由请求库根据实际 body 重新计算
pub fn is_exclude_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "host"
            | "connection"
            | "proxy-authenticate"
            | "upgrade"
            | "proxy-authorization"
            | "keep-alive"
            | "transfer-encoding"
            | "te"
            | "content-length"
    )
}

/// 复制 HTTP 头部，排除逐跳头部
pub fn copy_headers(from: &http::HeaderMap, to: &mut http::HeaderMap) {
    for (name, value) in from.iter() {
        if !is_exclude_header(name) {
            to.append(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_is_exclude_header() {
        // 测试应该排除的头部
        assert!(is_exclude_header(&http::header::HOST));
        assert!(is_exclude_header(&http::header::CONNECTION));
        assert!(is_exclude_header(&http::header::TRANSFER_ENCODING));
        assert!(is_exclude_header(&http::header::CONTENT_LENGTH));

        // 测试不应该排除的头部
        assert!(!is_exclude_header(&http::header::CONTENT_TYPE));
        assert!(!is_exclude_header(&http::header::AUTHORIZATION));
        assert!(!is_exclude_header(&http::header::ETAG));
    }

    #[test]
    fn test_copy_headers() {
        let mut from = http::HeaderMap::new();
        from.insert(http::header::HOST, HeaderValue::from_static("example.com"));
        from.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        from.append(http::header::SET_COOKIE, HeaderValue::from_static("a=1"));
        from.append(http::header::SET_COOKIE, HeaderValue::from_static("b=2"));

        let mut to = http::HeaderMap::new();
        copy_headers(&from, &mut to);

        assert!(to.get(http::header::HOST).is_none());
        assert_eq!(to.get(http::header::CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(to.get_all(http::header::SET_COOKIE).iter().count(), 2);
    }

    #[test]
    fn test_classify() {
        let origin = Url::parse("https://app.example.com").unwrap();
        let fetcher = HttpFetcher::new(&origin, Duration::from_secs(5)).unwrap();

        let same = FetchRequest::get(origin.join("/api/services").unwrap());
        assert_eq!(
            fetcher.classify(&same, &same.url),
            ResponseKind::Basic
        );

        let foreign = Url::parse("https://cdn.example.com/logo.png").unwrap();
        let mut req = FetchRequest::get(foreign.clone());
        assert_eq!(fetcher.classify(&req, &foreign), ResponseKind::Cors);
        req.mode = RequestMode::NoCors;
        assert_eq!(fetcher.classify(&req, &foreign), ResponseKind::Opaque);
    }
}
