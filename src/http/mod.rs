use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use axum_server::Handle;
use http::StatusCode;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tracing::{debug, error, info};
use url::Url;

use crate::{
    config::SettingHost,
    consts::{CONTROL_PREFIX, MAX_BODY_SIZE},
    fetch::Fetcher,
    middlewares::{add_version, logging_route},
    registration::Registration,
};

pub mod error;
// 页面控制接口
pub mod control;
// 将请求转换为 fetch 事件
pub mod intercept;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub registration: Arc<Registration>,
    /// 没有 worker 拦截时直接请求网络
    pub fetcher: Arc<dyn Fetcher>,
    /// 页面源，相对路径的请求基于它解析
    pub origin: Url,
}

/// 构建路由
///
/// `/__haven` 下是控制接口，其他所有请求都作为 fetch 事件交给 worker
pub fn router(state: AppState) -> Router {
    let control = Router::new()
        .route("/message", post(control::message))
        .route("/sync/{tag}", post(control::sync))
        .route("/push", post(control::push))
        .route("/notifications/click", post(control::notification_click))
        .route(
            "/queue/{category}",
            post(control::enqueue).get(control::list_queue),
        )
        .route("/version", get(control::version));

    Router::new()
        .nest(CONTROL_PREFIX, control)
        .fallback(intercept::intercept)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .with_state(state)
}

/// 关闭服务器
///
/// 等待正在处理的请求最多 30 秒
pub fn shutdown_server(handle: &Handle<SocketAddr>) {
    handle.graceful_shutdown(Some(Duration::from_secs(30)));
    info!("Server has been signaled to shut down");
}

/// 启动服务器
///
/// # 参数
///
/// * `host` - 监听地址与超时配置
/// * `state` - 路由共享状态
///
/// # 返回值
///
/// 服务器句柄，用于查询监听地址和关闭服务器
pub async fn make_server(
    host: &SettingHost,
    state: AppState,
) -> anyhow::Result<Handle<SocketAddr>> {
    debug!("make_server start with host: {:?}", host);

    let mut router = router(state).layer(
        ServiceBuilder::new()
            .layer(middleware::from_fn(add_version))
            .layer(TimeoutLayer::with_status_code(
                StatusCode::SERVICE_UNAVAILABLE,
                Duration::from_secs(host.timeout.into()),
            )),
    );
    router = logging_route(router);

    let addr = format!("{}:{}", host.ip, host.port);
    let addr: SocketAddr = addr.parse()?;

    let handle = Handle::new();
    let handle_clone = handle.clone();

    // 生成一个任务来运行服务器
    tokio::spawn(async move {
        info!("Listening on http://{}", addr);
        if let Err(err) = axum_server::bind(addr)
            .handle(handle_clone)
            .serve(router.into_make_service())
            .await
        {
            error!("Server on {} stopped: {}", addr, err);
        }
    });

    Ok(handle)
}
