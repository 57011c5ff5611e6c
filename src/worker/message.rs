use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::Worker;
use crate::{
    consts::{NOTIFICATION_ACTION_CLOSE, NOTIFICATION_ACTION_EXPLORE, NOTIFICATION_OPEN_URL},
    error::Result,
    notify::{Notification, NotificationAction, NotificationClick},
};

/// 页面发给 worker 的控制消息
///
/// ```json
/// { "type": "SKIP_WAITING" }
/// { "type": "GET_VERSION" }
/// ```
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    SkipWaiting,
    GetVersion,
}

/// 通过回复通道返回给页面的内容
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum MessageReply {
    Version { version: String },
}

/// 推送消息内容
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PushMessage {
    pub title: Option<String>,
    pub body: Option<String>,
    pub tag: Option<String>,
}

impl PushMessage {
    /// JSON 解析失败时，将整个负载作为正文
    pub fn parse(payload: &[u8]) -> Self {
        if payload.is_empty() {
            return Self::default();
        }
        serde_json::from_slice(payload).unwrap_or_else(|_| Self {
            body: Some(String::from_utf8_lossy(payload).trim().to_string()),
            ..Self::default()
        })
    }
}

impl Worker {
    pub fn on_message(&self, message: Message, reply: Option<oneshot::Sender<MessageReply>>) {
        debug!("Received message {:?}", message);
        match message {
            Message::SkipWaiting => self.request_skip_waiting(),
            Message::GetVersion => {
                let Some(reply) = reply else {
                    debug!("GET_VERSION without reply channel");
                    return;
                };
                let version = MessageReply::Version {
                    version: self.cache_name().to_string(),
                };
                if reply.send(version).is_err() {
                    debug!("GET_VERSION reply channel closed");
                }
            }
        }
    }

    /// 推送事件，以通知的形式展示
    pub async fn on_push(&self, payload: Option<Bytes>) -> Result<Notification> {
        let message = payload
            .as_deref()
            .map(PushMessage::parse)
            .unwrap_or_default();
        let push = &self.config.push;
        let id = message
            .tag
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let notification = Notification {
            id,
            title: message
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| push.title.clone()),
            body: message
                .body
                .filter(|b| !b.is_empty())
                .unwrap_or_else(|| push.body.clone()),
            tag: message.tag,
            icon: Some(push.icon.clone()),
            actions: vec![
                NotificationAction {
                    action: NOTIFICATION_ACTION_EXPLORE.to_string(),
                    title: "Ver más".to_string(),
                },
                NotificationAction {
                    action: NOTIFICATION_ACTION_CLOSE.to_string(),
                    title: "Cerrar".to_string(),
                },
            ],
            timestamp: Utc::now(),
        };
        self.ctx.notifier.show(notification.clone()).await?;
        Ok(notification)
    }

    /// 通知点击：关闭通知，查看操作或点击通知本身时打开首页
    pub async fn on_notification_click(&self, click: &NotificationClick) -> Result<()> {
        self.ctx.notifier.close(&click.id).await?;
        match click.action.as_deref() {
            Some(NOTIFICATION_ACTION_CLOSE) => {
                debug!("Notification {} dismissed", click.id);
            }
            None | Some(NOTIFICATION_ACTION_EXPLORE) => {
                let url = self.config.origin.join(NOTIFICATION_OPEN_URL)?;
                info!("Notification {} opens {}", click.id, url);
                self.ctx.clients.open_window(&url).await?;
            }
            Some(other) => debug!("Unknown notification action {}", other),
        }
        Ok(())
    }
}
