//! Worker 注册与生命周期
//!
//! installing -> installed -> activating -> activated，
//! 安装失败或被新 worker 取代时进入 redundant。
//! 安装与激活在同一把锁内严格有序地执行。

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{Mutex, broadcast, oneshot};
use tracing::{debug, error, info, warn};

use crate::{
    error::Result,
    worker::{ActivateReport, Message, MessageReply, Worker},
};

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

/// 页面可以订阅的注册事件
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum RegistrationEvent {
    /// 出现了新的 installing worker
    UpdateFound { cache_name: String },
    StateChange {
        cache_name: String,
        state: WorkerState,
    },
}

#[derive(Default)]
struct Slots {
    installing: Option<Arc<Worker>>,
    waiting: Option<Arc<Worker>>,
    active: Option<Arc<Worker>>,
}

pub struct Registration {
    slots: RwLock<Slots>,
    lifecycle: Mutex<()>,
    events: broadcast::Sender<RegistrationEvent>,
}

impl Default for Registration {
    fn default() -> Self {
        Self::new()
    }
}

impl Registration {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            slots: RwLock::new(Slots::default()),
            lifecycle: Mutex::new(()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistrationEvent> {
        self.events.subscribe()
    }

    pub fn active(&self) -> Option<Arc<Worker>> {
        self.slots.read().active.clone()
    }

    pub fn waiting(&self) -> Option<Arc<Worker>> {
        self.slots.read().waiting.clone()
    }

    pub fn installing(&self) -> Option<Arc<Worker>> {
        self.slots.read().installing.clone()
    }

    fn emit(&self, event: RegistrationEvent) {
        debug!("Registration event {:?}", event);
        // 没有订阅者时发送失败，忽略
        let _ = self.events.send(event);
    }

    fn set_state(&self, worker: &Worker, state: WorkerState) {
        self.emit(RegistrationEvent::StateChange {
            cache_name: worker.cache_name().to_string(),
            state,
        });
    }

    /// 注册或更新 worker
    ///
    /// 安装失败时新 worker 被丢弃，当前激活的 worker 保持不变。
    /// 安装成功后，没有激活的 worker 或新 worker 请求跳过等待时立即激活，
    /// 否则进入等待状态，直到收到 `SKIP_WAITING`。
    pub async fn register(&self, worker: Arc<Worker>) -> Result<WorkerState> {
        let _lifecycle = self.lifecycle.lock().await;

        self.slots.write().installing = Some(worker.clone());
        self.emit(RegistrationEvent::UpdateFound {
            cache_name: worker.cache_name().to_string(),
        });
        self.set_state(&worker, WorkerState::Installing);

        if let Err(err) = worker.on_install().await {
            error!("Install of {} failed: {}", worker.cache_name(), err);
            self.slots.write().installing = None;
            self.set_state(&worker, WorkerState::Redundant);
            return Err(err);
        }

        let replaced = {
            let mut slots = self.slots.write();
            slots.installing = None;
            slots.waiting.replace(worker.clone())
        };
        if let Some(replaced) = replaced {
            self.set_state(&replaced, WorkerState::Redundant);
        }
        self.set_state(&worker, WorkerState::Installed);

        let has_active = self.slots.read().active.is_some();
        if !has_active || worker.skip_waiting_requested() {
            self.activate_waiting().await;
            return Ok(WorkerState::Activated);
        }

        info!("Worker {} installed and waiting", worker.cache_name());
        Ok(WorkerState::Installed)
    }

    /// 发现新版本的 worker 时调用
    ///
    /// 与首次注册走同一流程；新 worker 的缓存代名称与当前相同时不做任何事
    pub async fn update(&self, worker: Arc<Worker>) -> Result<Option<WorkerState>> {
        if let Some(active) = self.active()
            && active.cache_name() == worker.cache_name()
        {
            debug!("Worker {} is already active", worker.cache_name());
            return Ok(None);
        }
        info!("Updating worker to {}", worker.cache_name());
        self.register(worker).await.map(Some)
    }

    /// 激活等待中的 worker，调用方需持有生命周期锁
    async fn activate_waiting(&self) -> Option<ActivateReport> {
        let (worker, previous) = {
            let mut slots = self.slots.write();
            let worker = slots.waiting.take()?;
            let previous = slots.active.take();
            (worker, previous)
        };

        self.set_state(&worker, WorkerState::Activating);
        if let Some(previous) = previous {
            // 让旧 worker 的后台刷新写完，避免写入已被删除的缓存代
            previous.settle().await;
            self.set_state(&previous, WorkerState::Redundant);
        }
        let report = worker.on_activate().await;
        if !report.failed.is_empty() {
            warn!(
                "Activation of {} skipped stale generations {:?}",
                worker.cache_name(),
                report.failed
            );
        }
        self.slots.write().active = Some(worker.clone());
        self.set_state(&worker, WorkerState::Activated);
        Some(report)
    }

    /// 页面发送控制消息
    ///
    /// `SKIP_WAITING` 发给等待中的 worker 并立即激活它；
    /// `GET_VERSION` 由当前激活的 worker 回复。
    pub async fn post_message(&self, message: Message) -> Option<MessageReply> {
        match message {
            Message::SkipWaiting => {
                let _lifecycle = self.lifecycle.lock().await;
                let Some(waiting) = self.waiting() else {
                    debug!("SKIP_WAITING without waiting worker");
                    return None;
                };
                waiting.on_message(message, None);
                if waiting.skip_waiting_requested() {
                    self.activate_waiting().await;
                }
                None
            }
            Message::GetVersion => {
                let worker = self.active()?;
                let (tx, rx) = oneshot::channel();
                worker.on_message(message, Some(tx));
                rx.await.ok()
            }
        }
    }
}
