use std::net::SocketAddr;
use std::sync::{Arc, mpsc};

use anyhow::{Context, Result};
use axum_server::Handle;
use tracing::{debug, error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    cache::{CacheStorage, DiskCacheStorage, MemoryCacheStorage},
    config::{Settings, WorkerConfig},
    consts::{ARCH, BUILD_VERSION, COMMIT, COMPILER, NAME, OS, VERSION},
    fetch::HttpFetcher,
    http::{AppState, make_server, shutdown_server},
    notify::{ClientRegistry, MemoryNotifier},
    queue::{FileSubmissionStore, MemorySubmissionStore, SubmissionStore},
    registration::Registration,
    utils::init_logger,
    worker::{Worker, WorkerContext},
};

/// 初始化日志系统
///
/// 返回的 guard 需要持有到进程退出
pub fn initialize_logger(settings: &Settings) -> Result<WorkerGuard> {
    let guard = init_logger(settings.log_level.as_str(), settings.log_folder.as_str())
        .with_context(|| "Failed to initialize logger")?;
    info!("{} v{} ({})", NAME, VERSION, COMMIT);
    info!("Build version: {}", BUILD_VERSION);
    info!("Compiler: {}", COMPILER);
    info!("OS: {} {}", OS, ARCH);
    debug!("Configuration: {:?}", settings);
    Ok(guard)
}

/// 根据配置创建 worker 的运行环境
///
/// 配置了目录时使用磁盘存储，否则使用内存存储
pub fn build_context(settings: &Settings) -> Result<WorkerContext> {
    let config = settings.worker_config()?;

    let caches: Arc<dyn CacheStorage> = match &settings.storage.cache_dir {
        Some(dir) => {
            info!("Cache storage: {:?}", dir);
            Arc::new(DiskCacheStorage::new(dir))
        }
        None => {
            warn!("No cache_dir configured, caches are kept in memory");
            Arc::new(MemoryCacheStorage::new())
        }
    };
    let queue: Arc<dyn SubmissionStore> = match &settings.storage.queue_dir {
        Some(dir) => {
            info!("Submission queue: {:?}", dir);
            Arc::new(FileSubmissionStore::new(dir))
        }
        None => {
            warn!("No queue_dir configured, pending submissions are kept in memory");
            Arc::new(MemorySubmissionStore::new())
        }
    };
    let fetcher = HttpFetcher::new(&config.origin, config.fetch_timeout)?;

    Ok(WorkerContext {
        caches,
        fetcher: Arc::new(fetcher),
        queue,
        notifier: Arc::new(MemoryNotifier::new()),
        clients: Arc::new(ClientRegistry::new()),
    })
}

/// 用新的配置注册 worker
///
/// 安装失败时当前激活的 worker 保持不变
pub async fn register_worker(
    registration: &Registration,
    config: WorkerConfig,
    ctx: WorkerContext,
) -> Result<Arc<Worker>> {
    let cache_name = config.cache_name.clone();
    let worker = Arc::new(Worker::new(config, ctx));
    let state = registration
        .register(worker.clone())
        .await
        .with_context(|| format!("Failed to register worker {cache_name}"))?;
    info!("Worker {} is {:?}", cache_name, state);
    Ok(worker)
}

/// 启动 HTTP 服务
pub async fn start_server(
    settings: &Settings,
    registration: Arc<Registration>,
    ctx: &WorkerContext,
) -> Result<Handle<SocketAddr>> {
    let config = settings.worker_config()?;
    let state = AppState {
        registration,
        fetcher: ctx.fetcher.clone(),
        origin: config.origin,
    };
    make_server(&settings.host, state).await
}

/// 处理配置文件变更的回调函数
///
/// 缓存代名称变化时注册新 worker，新 worker 按正常流程安装和激活。
/// 页面源或超时变化时使用新的网络客户端，存储保持共享。
pub async fn handle_config_change(
    result: crate::error::Result<Settings>,
    registration: Arc<Registration>,
    ctx: WorkerContext,
) {
    let new_settings = match result {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to reload config file: {:?}", e);
            return;
        }
    };
    info!("Config file reloaded successfully");

    let config = match new_settings.worker_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid worker config: {:?}", e);
            return;
        }
    };
    let mut ctx = ctx;
    match HttpFetcher::new(&config.origin, config.fetch_timeout) {
        Ok(fetcher) => ctx.fetcher = Arc::new(fetcher),
        Err(e) => {
            error!("Failed to create fetcher: {:?}", e);
            return;
        }
    }
    let cache_name = config.cache_name.clone();
    let worker = Arc::new(Worker::new(config, ctx));
    match registration.update(worker).await {
        Ok(Some(state)) => info!("Worker {} is {:?}", cache_name, state),
        Ok(None) => {}
        Err(e) => error!("Failed to update worker {}: {:?}", cache_name, e),
    }
}

/// 优雅关闭服务器和配置监听器
///
/// 等待当前 worker 的后台刷新完成后返回
pub async fn shutdown_application(
    handle: &Handle<SocketAddr>,
    registration: &Registration,
    stop_tx: mpsc::Sender<()>,
) {
    info!("Received shutdown signal, closing server...");

    shutdown_server(handle);

    // 停止配置监听
    if let Err(err) = stop_tx.send(()) {
        error!("Failed to send stop signal to config watcher: {:?}", err);
    }

    if let Some(active) = registration.active() {
        active.settle().await;
    }

    info!("Application shutdown complete");
}
