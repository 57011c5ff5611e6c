//! 集成测试的公共辅助函数和工具

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use anyhow::Result;
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tempfile::TempDir;

use haven::{
    application::{build_context, register_worker, start_server},
    config::Settings,
    registration::Registration,
    worker::WorkerContext,
};

/// 模拟的诊所后端
#[derive(Clone, Default)]
pub struct OriginState {
    /// `/api/services` 被请求的次数
    pub services_hits: Arc<AtomicUsize>,
    /// 收到的预约提交
    pub appointments: Arc<Mutex<Vec<Value>>>,
}

pub struct TestOrigin {
    pub addr: SocketAddr,
    pub handle: axum_server::Handle<SocketAddr>,
    pub state: OriginState,
}

impl TestOrigin {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn services_hits(&self) -> usize {
        self.state.services_hits.load(Ordering::SeqCst)
    }

    /// 立即关闭，模拟网络断开
    pub async fn go_offline(&self) {
        self.handle.shutdown();
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

async fn services(State(state): State<OriginState>) -> impl IntoResponse {
    let hits = state.services_hits.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "services": ["cardiología", "pediatría"], "hits": hits }))
}

async fn appointments(
    State(state): State<OriginState>,
    Json(payload): Json<Value>,
) -> impl IntoResponse {
    state.appointments.lock().push(payload);
    StatusCode::CREATED
}

/// 启动模拟后端，监听随机端口
pub async fn start_origin() -> Result<TestOrigin> {
    let state = OriginState::default();
    let router = Router::new()
        .route(
            "/",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    "<html><body><h1>ZIMI</h1></body></html>",
                )
            }),
        )
        .route(
            "/static/js/bundle.js",
            get(|| async {
                (
                    [(header::CONTENT_TYPE, "application/javascript")],
                    "console.log('zimi');",
                )
            }),
        )
        .route(
            "/static/css/main.css",
            get(|| async { ([(header::CONTENT_TYPE, "text/css")], "body{margin:0}") }),
        )
        .route(
            "/manifest.json",
            get(|| async { Json(json!({ "name": "ZIMI" })) }),
        )
        .route("/api/services", get(services))
        .route("/api/appointments", post(appointments))
        .with_state(state.clone());

    let addr: SocketAddr = "127.0.0.1:0".parse()?;
    let handle = axum_server::Handle::new();
    let server = axum_server::bind(addr)
        .handle(handle.clone())
        .serve(router.into_make_service());
    tokio::spawn(async move { server.await });
    let addr = handle.listening().await.expect("Origin not listening");

    Ok(TestOrigin {
        addr,
        handle,
        state,
    })
}

pub struct TestHaven {
    pub addr: SocketAddr,
    pub handle: axum_server::Handle<SocketAddr>,
    pub registration: Arc<Registration>,
    pub ctx: WorkerContext,
    pub settings: Settings,
    _dir: TempDir,
}

impl TestHaven {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// 等待当前 worker 的后台刷新完成
    pub async fn settle(&self) {
        if let Some(active) = self.registration.active() {
            active.settle().await;
        }
    }
}

pub fn test_config(origin: &TestOrigin, version: &str, dir: &TempDir) -> String {
    format!(
        r#"
log_level = "debug"

[worker]
version = "{version}"
origin = "http://{origin}"

[storage]
cache_dir = {cache_dir:?}
queue_dir = {queue_dir:?}

[host]
ip = "127.0.0.1"
port = 0
timeout = 10
"#,
        origin = origin.addr,
        cache_dir = dir.path().join("cache"),
        queue_dir = dir.path().join("queue"),
    )
}

/// 启动 worker 宿主，注册并激活 worker
pub async fn start_haven(origin: &TestOrigin, version: &str) -> Result<TestHaven> {
    let dir = TempDir::new()?;
    let settings = Settings::parse(&test_config(origin, version, &dir))?;
    let ctx = build_context(&settings)?;
    let registration = Arc::new(Registration::new());
    register_worker(&registration, settings.worker_config()?, ctx.clone()).await?;

    let handle = start_server(&settings, registration.clone(), &ctx).await?;
    let addr = handle.listening().await.expect("Server not listening");

    Ok(TestHaven {
        addr,
        handle,
        registration,
        ctx,
        settings,
        _dir: dir,
    })
}

pub fn client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?)
}
