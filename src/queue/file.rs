use std::{io::ErrorKind, path::PathBuf};

use async_trait::async_trait;
use tokio::{fs, sync::Mutex};
use tracing::debug;

use super::{PendingSubmission, SubmissionStore, discard, upsert};
use crate::error::{Error, Result};

/// JSON 文件提交队列
///
/// 每个类别一个文件：`{root}/{category}.json`。
/// 读改写由互斥锁串行化，写入时先写临时文件再重命名
#[derive(Debug)]
pub struct FileSubmissionStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileSubmissionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    fn category_path(&self, category: &str) -> Result<PathBuf> {
        let valid = !category.is_empty()
            && category
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Error::Queue(format!("invalid category {:?}", category)));
        }
        Ok(self.root.join(format!("{}.json", category)))
    }

    async fn read(&self, category: &str) -> Result<Vec<PendingSubmission>> {
        let path = self.category_path(category)?;
        match fs::read(&path).await {
            Ok(content) => Ok(serde_json::from_slice(&content)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(err.into()),
        }
    }

    async fn write(&self, category: &str, items: &[PendingSubmission]) -> Result<()> {
        let path = self.category_path(category)?;
        fs::create_dir_all(&self.root).await?;
        let content = serde_json::to_vec_pretty(items)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &path).await?;
        debug!("queue {} persisted with {} items", category, items.len());
        Ok(())
    }
}

#[async_trait]
impl SubmissionStore for FileSubmissionStore {
    async fn append(&self, submission: PendingSubmission) -> Result<()> {
        let _guard = self.lock.lock().await;
        let category = submission.category.clone();
        let mut items = self.read(&category).await?;
        upsert(&mut items, submission);
        self.write(&category, &items).await
    }

    async fn list(&self, category: &str) -> Result<Vec<PendingSubmission>> {
        let _guard = self.lock.lock().await;
        self.read(category).await
    }

    async fn remove(&self, submission: &PendingSubmission) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let category = &submission.category;
        let mut items = self.read(category).await?;
        if !discard(&mut items, submission) {
            return Ok(false);
        }
        self.write(category, &items).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_persisted_across_instances() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let store = FileSubmissionStore::new(dir.path());
            for id in ["a1", "a2"] {
                store
                    .append(PendingSubmission::new(
                        id,
                        "appointment",
                        "/api/appointments",
                        json!({ "id": id }),
                    ))
                    .await
                    .unwrap();
            }
        }

        let store = FileSubmissionStore::new(dir.path());
        let items = store.list("appointment").await.unwrap();
        assert_eq!(
            items.iter().map(|i| i.id.as_str()).collect::<Vec<_>>(),
            vec!["a1", "a2"]
        );

        assert!(store.remove(&items[0]).await.unwrap());
        let store = FileSubmissionStore::new(dir.path());
        assert_eq!(store.list("appointment").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_category_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileSubmissionStore::new(dir.path().join("queue"));
        assert!(store.list("contact").await.unwrap().is_empty());
        let missing = PendingSubmission::new("x", "contact", "/api/contact", json!({}));
        assert!(!store.remove(&missing).await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_category() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileSubmissionStore::new(dir.path());
        assert!(store.list("../etc/passwd").await.is_err());
    }
}
