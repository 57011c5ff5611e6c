use axum::{
    body::Body,
    extract::{Request, State},
    response::{IntoResponse, Response},
};
use http::Uri;
use tracing::{debug, error};
use url::Url;

use super::{
    AppState,
    error::{RouteError, RouteResult},
};
use crate::{
    consts::MAX_BODY_SIZE,
    fetch::{FetchRequest, FetchResponse, client::copy_headers},
    worker::FetchOutcome,
};

impl IntoResponse for FetchResponse {
    fn into_response(self) -> Response {
        let mut res = Response::new(Body::from(self.body));
        *res.status_mut() = self.status;
        copy_headers(&self.headers, res.headers_mut());
        res
    }
}

/// 解析请求地址
///
/// 绝对形式的 URI（正向代理风格）保留原有的源，
/// 其他请求相对于页面源解析
pub fn resolve_url(origin: &Url, uri: &Uri) -> Result<Url, url::ParseError> {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Url::parse(&uri.to_string());
    }
    let path_query = uri.path_and_query().map(|v| v.as_str()).unwrap_or("/");
    origin.join(path_query)
}

/// 把入站请求转换为 fetch 事件交给当前激活的 worker
///
/// 没有激活的 worker 或 worker 不拦截时，直接请求网络
pub async fn intercept(State(state): State<AppState>, req: Request<Body>) -> RouteResult<Response> {
    let url = resolve_url(&state.origin, req.uri()).map_err(|err| {
        debug!("Invalid request uri {}: {}", req.uri(), err);
        RouteError::BadRequest()
    })?;
    let (parts, body) = req.into_parts();
    let body = axum::body::to_bytes(body, MAX_BODY_SIZE)
        .await
        .map_err(|err| {
            error!("Failed to read request body: {}", err);
            RouteError::BadRequest()
        })?;
    let mut headers = http::HeaderMap::new();
    copy_headers(&parts.headers, &mut headers);
    let request = FetchRequest::from_parts(parts.method, url, headers, body);

    let outcome = match state.registration.active() {
        Some(worker) => worker.on_fetch(&request).await,
        None => FetchOutcome::Passthrough,
    };

    match outcome {
        FetchOutcome::Respond { response, source } => {
            debug!("{} served from {:?}", request.url, source);
            Ok(response.into_response())
        }
        FetchOutcome::Passthrough => {
            let response = state.fetcher.fetch(&request).await.map_err(|err| {
                error!("Failed to fetch {}: {}", request.url, err);
                RouteError::BadGateway()
            })?;
            Ok(response.into_response())
        }
    }
}
