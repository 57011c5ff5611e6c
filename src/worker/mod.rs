//! 离线缓存 worker
//!
//! 每种事件对应一个处理函数，返回的 future 就是宿主在认为事件处理完成之前
//! 必须等待的工作。worker 本身不持有事件之间的执行上下文，
//! 所有状态都在缓存存储和提交队列中。

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::future::join_all;
use serde::Serialize;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::{
    cache::CacheStorage,
    config::WorkerConfig,
    error::{Error, Result},
    fetch::{FetchRequest, Fetcher},
    notify::{Clients, Notifier},
    queue::SubmissionStore,
};

mod intercept;
mod message;
mod sync;


pub use intercept::{FetchOutcome, ResponseSource};
pub use message::{Message, MessageReply, PushMessage};
pub use sync::SyncReport;

/// worker 依赖的外部能力
#[derive(Clone)]
pub struct WorkerContext {
    pub caches: Arc<dyn CacheStorage>,
    pub fetcher: Arc<dyn Fetcher>,
    pub queue: Arc<dyn SubmissionStore>,
    pub notifier: Arc<dyn Notifier>,
    pub clients: Arc<dyn Clients>,
}

/// 激活阶段的清理结果
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct ActivateReport {
    /// 已删除的过期缓存代
    pub deleted: Vec<String>,
    /// 删除失败、被跳过的缓存代
    pub failed: Vec<String>,
    /// 关闭的通知数量
    pub dismissed: usize,
}

pub struct Worker {
    config: Arc<WorkerConfig>,
    ctx: WorkerContext,
    /// 后台刷新任务
    tasks: TaskTracker,
    skip_waiting: AtomicBool,
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("cache_name", &self.config.cache_name)
            .field("skip_waiting", &self.skip_waiting.load(Ordering::Relaxed))
            .finish()
    }
}

impl Worker {
    pub fn new(config: WorkerConfig, ctx: WorkerContext) -> Self {
        Self {
            config: Arc::new(config),
            ctx,
            tasks: TaskTracker::new(),
            skip_waiting: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// 当前缓存代名称
    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    /// 是否请求跳过等待，直接激活
    pub fn skip_waiting_requested(&self) -> bool {
        self.skip_waiting.load(Ordering::Acquire)
    }

    fn request_skip_waiting(&self) {
        self.skip_waiting.store(true, Ordering::Release);
    }

    /// 等待所有后台刷新任务结束
    pub async fn settle(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }

    /// 安装阶段
    ///
    /// 打开目标缓存代并预缓存清单中的所有资源。任意一个资源失败，
    /// 整个安装失败；此前已写入的条目留在被丢弃的缓存代中，不会被提升为当前代。
    pub async fn on_install(&self) -> Result<()> {
        let cache_name = self.cache_name();
        info!("Installing cache generation {}", cache_name);
        self.ctx.caches.open(cache_name).await?;

        for path in &self.config.precache {
            let url = self.config.origin.join(path)?;
            let request = FetchRequest::get(url);
            let response = self.ctx.fetcher.fetch(&request).await.map_err(|err| {
                error!("Failed to precache {}: {}", path, err);
                err
            })?;
            if !response.status.is_success() {
                error!("Failed to precache {}: status {}", path, response.status);
                return Err(Error::Precache {
                    url: request.url.to_string(),
                    status: response.status.as_u16(),
                });
            }
            self.ctx
                .caches
                .put(cache_name, &request.key(), &response)
                .await?;
            debug!("Precached {}", request.url);
        }

        info!(
            "Cache generation {} installed with {} resources",
            cache_name,
            self.config.precache.len()
        );
        if self.config.skip_waiting {
            self.request_skip_waiting();
        }
        Ok(())
    }

    /// 激活阶段
    ///
    /// 删除名称与目标不同的所有缓存代，同时关闭本 worker 展示的通知，
    /// 最后接管所有已打开的页面。清理失败只记录日志，不会阻止激活。
    pub async fn on_activate(&self) -> ActivateReport {
        let cache_name = self.cache_name();
        let caches = &self.ctx.caches;

        let cleanup = async {
            let mut deleted = Vec::new();
            let mut failed = Vec::new();
            let names = match caches.keys().await {
                Ok(names) => names,
                Err(err) => {
                    error!("Failed to list cache generations: {}", err);
                    return (deleted, failed);
                }
            };
            let stale = names.into_iter().filter(|name| name != cache_name);
            let results = join_all(stale.map(|name| async move {
                let result = caches.delete(&name).await;
                (name, result)
            }))
            .await;
            for (name, result) in results {
                match result {
                    Ok(_) => {
                        info!("Deleted stale cache generation {}", name);
                        deleted.push(name);
                    }
                    Err(err) => {
                        warn!("Failed to delete cache generation {}: {}", name, err);
                        failed.push(name);
                    }
                }
            }
            (deleted, failed)
        };

        let dismiss = async {
            let notifications = match self.ctx.notifier.list().await {
                Ok(list) => list,
                Err(err) => {
                    warn!("Failed to list notifications: {}", err);
                    return 0;
                }
            };
            let mut dismissed = 0;
            for notification in notifications {
                match self.ctx.notifier.close(&notification.id).await {
                    Ok(()) => dismissed += 1,
                    Err(err) => warn!("Failed to close notification {}: {}", notification.id, err),
                }
            }
            dismissed
        };

        let ((deleted, failed), dismissed) = tokio::join!(cleanup, dismiss);

        if let Err(err) = self.ctx.clients.claim().await {
            warn!("Failed to claim clients: {}", err);
        }
        info!("Cache generation {} activated", cache_name);

        ActivateReport {
            deleted,
            failed,
            dismissed,
        }
    }
}
