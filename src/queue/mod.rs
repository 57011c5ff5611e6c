//! 离线提交队列
//!
//! 离线时提交失败的表单（预约申请、联系留言）按类别持久化，
//! 连接恢复后由后台同步事件重放。条目只在网络请求成功后删除，
//! 因此重放语义是至少一次。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod file;
pub mod memory;

pub use file::FileSubmissionStore;
pub use memory::MemorySubmissionStore;

/// 待重放的离线提交
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PendingSubmission {
    /// 调用方分配的唯一标识
    pub id: String,
    pub category: String,
    /// 重放时 POST 的目标路径
    pub endpoint: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl PendingSubmission {
    pub fn new(
        id: impl Into<String>,
        category: impl Into<String>,
        endpoint: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            endpoint: endpoint.into(),
            payload,
            created_at: Utc::now(),
        }
    }
}

/// 持久化的提交队列
///
/// 同一类别内 id 唯一，重复追加同一 id 会替换原条目。
/// 删除按完整条目匹配，重放期间被替换的新条目不会被误删
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn append(&self, submission: PendingSubmission) -> Result<()>;

    /// 按追加顺序列出某类别的全部条目
    async fn list(&self, category: &str) -> Result<Vec<PendingSubmission>>;

    /// 删除与给定条目完全相同的条目，返回是否存在
    async fn remove(&self, submission: &PendingSubmission) -> Result<bool>;
}

/// 追加或替换同 id 的条目，保持原有顺序
pub(crate) fn upsert(items: &mut Vec<PendingSubmission>, submission: PendingSubmission) {
    match items.iter_mut().find(|item| item.id == submission.id) {
        Some(existing) => *existing = submission,
        None => items.push(submission),
    }
}

/// 删除完全相同的条目，返回是否删除
pub(crate) fn discard(items: &mut Vec<PendingSubmission>, submission: &PendingSubmission) -> bool {
    let before = items.len();
    items.retain(|item| item != submission);
    items.len() != before
}
