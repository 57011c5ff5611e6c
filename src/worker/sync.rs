use serde::Serialize;
use tracing::{debug, info, warn};

use super::Worker;
use crate::{
    error::{Error, Result},
    fetch::FetchRequest,
    queue::PendingSubmission,
};

/// 一次后台同步的结果
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub tag: String,
    /// 重放成功并已从队列删除的条目
    pub replayed: Vec<String>,
    /// 仍留在队列中的条目
    pub pending: Vec<String>,
}

impl Worker {
    /// 后台同步
    ///
    /// 读取标签对应类别的全部离线提交并逐个重放。成功（2xx）后删除，
    /// 失败的条目留在队列中等待下一次同步事件。未知标签直接忽略。
    pub async fn on_sync(&self, tag: &str) -> Result<SyncReport> {
        let mut report = SyncReport {
            tag: tag.to_string(),
            ..SyncReport::default()
        };
        let Some(sync) = self.config.sync_for_tag(tag) else {
            warn!("Ignore unknown sync tag {}", tag);
            return Ok(report);
        };

        let submissions = self.ctx.queue.list(&sync.category).await?;
        info!(
            "Sync {}: replaying {} queued {} submissions",
            tag,
            submissions.len(),
            sync.category
        );

        for submission in submissions {
            if self.replay(&submission).await {
                match self
                    .ctx
                    .queue
                    .remove(&submission)
                    .await
                {
                    Ok(true) => report.replayed.push(submission.id),
                    Ok(false) => {
                        // 重放期间同 id 的条目被替换，新内容留到下一次同步
                        debug!("Submission {} replaced during replay", submission.id);
                        report.pending.push(submission.id);
                    }
                    Err(err) => {
                        // 已发送但删除失败，下次同步会重复提交
                        warn!(
                            "Failed to remove replayed submission {}: {}",
                            submission.id, err
                        );
                        report.pending.push(submission.id);
                    }
                }
            } else {
                report.pending.push(submission.id);
            }
        }

        info!(
            "Sync {} finished: {} replayed, {} pending",
            tag,
            report.replayed.len(),
            report.pending.len()
        );
        Ok(report)
    }

    async fn replay(&self, submission: &PendingSubmission) -> bool {
        let request = match self
            .config
            .origin
            .join(&submission.endpoint)
            .map_err(Error::from)
            .and_then(|url| FetchRequest::post_json(url, &submission.payload))
        {
            Ok(request) => request,
            Err(err) => {
                warn!("Invalid queued submission {}: {}", submission.id, err);
                return false;
            }
        };

        match self.ctx.fetcher.fetch(&request).await {
            Ok(response) if response.status.is_success() => {
                debug!("Replayed submission {} to {}", submission.id, request.url);
                true
            }
            Ok(response) => {
                warn!(
                    "Replay of submission {} rejected with status {}",
                    submission.id, response.status
                );
                false
            }
            Err(err) => {
                debug!("Replay of submission {} failed: {}", submission.id, err);
                false
            }
        }
    }

    /// 将离线时提交失败的表单加入队列
    ///
    /// 未指定 id 时生成 UUID；目标路径取自类别配置
    pub async fn enqueue(
        &self,
        category: &str,
        id: Option<String>,
        payload: serde_json::Value,
    ) -> Result<PendingSubmission> {
        let sync = self
            .config
            .sync_for_category(category)
            .ok_or_else(|| Error::UnknownCategory(category.to_string()))?;
        let id = id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let submission = PendingSubmission::new(id, category, sync.endpoint.clone(), payload);
        self.ctx.queue.append(submission.clone()).await?;
        info!("Queued {} submission {}", category, submission.id);
        Ok(submission)
    }
}
