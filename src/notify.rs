//! 通知与窗口客户端
//!
//! 推送消息以用户通知的形式展示；点击通知时可以打开窗口。
//! 浏览器中这些能力由宿主提供，这里以 trait 抽象，并附带内存实现。

use std::collections::VecDeque;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

use crate::error::Result;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Notification {
    /// 有 tag 时 id 与 tag 相同，同 tag 的通知会被替换
    pub id: String,
    pub title: String,
    pub body: String,
    pub tag: Option<String>,
    pub icon: Option<String>,
    pub actions: Vec<NotificationAction>,
    pub timestamp: DateTime<Utc>,
}

/// 通知点击事件
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct NotificationClick {
    pub id: String,
    /// 点击的操作按钮；点击通知本身时为空
    #[serde(default)]
    pub action: Option<String>,
}

/// 用户通知能力
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: Notification) -> Result<()>;

    /// 列出当前 worker 展示的所有通知
    async fn list(&self) -> Result<Vec<Notification>>;

    async fn close(&self, id: &str) -> Result<()>;
}

/// 窗口客户端能力
#[async_trait]
pub trait Clients: Send + Sync {
    /// 立即接管所有已打开的页面
    async fn claim(&self) -> Result<()>;

    async fn open_window(&self, url: &Url) -> Result<()>;
}

/// 内存通知中心，只记录日志和当前状态
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    notifications: DashMap<String, Notification>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn show(&self, notification: Notification) -> Result<()> {
        info!(
            "Show notification {}: {} - {}",
            notification.id, notification.title, notification.body
        );
        self.notifications
            .insert(notification.id.clone(), notification);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Notification>> {
        let mut list = self
            .notifications
            .iter()
            .map(|entry| entry.value().clone())
            .collect::<Vec<_>>();
        list.sort_by_key(|n| n.timestamp);
        Ok(list)
    }

    async fn close(&self, id: &str) -> Result<()> {
        self.notifications.remove(id);
        Ok(())
    }
}

/// 最多保留的已打开窗口数量
const MAX_OPENED_WINDOWS: usize = 16;

/// 内存客户端登记表
///
/// 记录是否已接管页面以及最近打开的窗口地址
#[derive(Debug, Default)]
pub struct ClientRegistry {
    claimed: Mutex<bool>,
    opened: Mutex<VecDeque<Url>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_claimed(&self) -> bool {
        *self.claimed.lock()
    }

    /// 最近打开的窗口，从旧到新
    pub fn opened_windows(&self) -> Vec<Url> {
        self.opened.lock().iter().cloned().collect()
    }
}

#[async_trait]
impl Clients for ClientRegistry {
    async fn claim(&self) -> Result<()> {
        *self.claimed.lock() = true;
        info!("Clients claimed");
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<()> {
        info!("Open window {}", url);
        let mut opened = self.opened.lock();
        if opened.len() == MAX_OPENED_WINDOWS {
            opened.pop_front();
        }
        opened.push_back(url.clone());
        Ok(())
    }
}
