use async_trait::async_trait;
use dashmap::DashMap;

use super::{PendingSubmission, SubmissionStore, discard, upsert};
use crate::error::Result;

/// 内存提交队列
#[derive(Debug, Default)]
pub struct MemorySubmissionStore {
    categories: DashMap<String, Vec<PendingSubmission>>,
}

impl MemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for MemorySubmissionStore {
    async fn append(&self, submission: PendingSubmission) -> Result<()> {
        let mut items = self
            .categories
            .entry(submission.category.clone())
            .or_default();
        upsert(&mut items, submission);
        Ok(())
    }

    async fn list(&self, category: &str) -> Result<Vec<PendingSubmission>> {
        Ok(self
            .categories
            .get(category)
            .map(|items| items.clone())
            .unwrap_or_default())
    }

    async fn remove(&self, submission: &PendingSubmission) -> Result<bool> {
        let Some(mut items) = self.categories.get_mut(&submission.category) else {
            return Ok(false);
        };
        Ok(discard(&mut items, submission))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_append_list_remove() {
        let store = MemorySubmissionStore::new();
        let a1 = PendingSubmission::new(
            "a1",
            "appointment",
            "/api/appointments",
            json!({ "name": "Ana" }),
        );
        store.append(a1.clone()).await.unwrap();
        store
            .append(PendingSubmission::new(
                "c1",
                "contact",
                "/api/contact",
                json!({ "message": "Hola" }),
            ))
            .await
            .unwrap();

        let appointments = store.list("appointment").await.unwrap();
        assert_eq!(appointments.len(), 1);
        assert_eq!(appointments[0].id, "a1");

        assert!(store.remove(&a1).await.unwrap());
        assert!(!store.remove(&a1).await.unwrap());
        assert!(store.list("appointment").await.unwrap().is_empty());
        // 其他类别不受影响
        assert_eq!(store.list("contact").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_append_same_id_replaces() {
        let store = MemorySubmissionStore::new();
        for name in ["Ana", "Luis"] {
            store
                .append(PendingSubmission::new(
                    "a1",
                    "appointment",
                    "/api/appointments",
                    json!({ "name": name }),
                ))
                .await
                .unwrap();
        }
        let items = store.list("appointment").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].payload["name"], "Luis");
    }

    #[tokio::test]
    async fn test_remove_keeps_replaced_entry() {
        let store = MemorySubmissionStore::new();
        let old = PendingSubmission::new(
            "a1",
            "appointment",
            "/api/appointments",
            json!({ "name": "Ana" }),
        );
        store.append(old.clone()).await.unwrap();
        store
            .append(PendingSubmission::new(
                "a1",
                "appointment",
                "/api/appointments",
                json!({ "name": "Luis" }),
            ))
            .await
            .unwrap();

        assert!(!store.remove(&old).await.unwrap());
        let items = store.list("appointment").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].payload["name"], "Luis");
    }
}
