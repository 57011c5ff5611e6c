use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use super::CacheStorage;
use crate::{
    error::{Error, Result},
    fetch::{FetchResponse, RequestKey, ResponseKind},
};

/// 磁盘缓存存储
///
/// 目录结构：`{root}/{缓存代名称}/{md5(请求键)}.json`
#[derive(Debug, Clone)]
pub struct DiskCacheStorage {
    root: PathBuf,
}

/// 磁盘上的响应快照
#[derive(Serialize, Deserialize, Debug)]
struct StoredEntry {
    key: RequestKey,
    status: u16,
    headers: Vec<(String, String)>,
    /// base64 编码的响应体
    body: String,
    kind: ResponseKind,
    stored_at: DateTime<Utc>,
}

impl StoredEntry {
    fn new(key: &RequestKey, response: &FetchResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| match value.to_str() {
                Ok(value) => Some((name.as_str().to_string(), value.to_string())),
                Err(_) => {
                    debug!("skip non-utf8 header {} for {}", name, key);
                    None
                }
            })
            .collect();
        Self {
            key: key.clone(),
            status: response.status.as_u16(),
            headers,
            body: STANDARD.encode(&response.body),
            kind: response.kind,
            stored_at: Utc::now(),
        }
    }

    fn into_response(self) -> Result<FetchResponse> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|err| Error::Storage(format!("invalid status {}: {}", self.status, err)))?;
        let mut headers = HeaderMap::new();
        for (name, value) in self.headers {
            let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) else {
                warn!("Invalid stored header {}: {}", name, value);
                continue;
            };
            headers.append(name, value);
        }
        Ok(FetchResponse {
            status,
            headers,
            body: STANDARD.decode(self.body)?.into(),
            kind: self.kind,
        })
    }
}

impl DiskCacheStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generation_dir(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\'])
        {
            return Err(Error::Storage(format!("invalid cache name {:?}", name)));
        }
        Ok(self.root.join(name))
    }

    fn entry_path(&self, name: &str, key: &RequestKey) -> Result<PathBuf> {
        let digest = md5::compute(key.to_string().as_bytes());
        Ok(self.generation_dir(name)?.join(format!("{:x}.json", digest)))
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<()> {
        fs::create_dir_all(self.generation_dir(name)?).await?;
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(fs::try_exists(self.generation_dir(name)?).await?)
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        match fs::remove_dir_all(self.generation_dir(name)?).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    async fn lookup(&self, name: &str, key: &RequestKey) -> Result<Option<FetchResponse>> {
        let path = self.entry_path(name, key)?;
        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let entry: StoredEntry = serde_json::from_slice(&content)?;
        // md5 冲突时键不一致，视为未命中
        if &entry.key != key {
            warn!("Cache entry key mismatch at {:?}", path);
            return Ok(None);
        }
        entry.into_response().map(Some)
    }

    async fn put(&self, name: &str, key: &RequestKey, response: &FetchResponse) -> Result<()> {
        let path = self.entry_path(name, key)?;
        let content = serde_json::to_vec(&StoredEntry::new(key, response))?;
        let missing = |err: std::io::Error| match err.kind() {
            ErrorKind::NotFound => Error::CacheNotFound(name.to_string()),
            _ => err.into(),
        };
        // 先写临时文件再重命名，读者不会看到写了一半的条目；
        // 缓存代目录已被删除时写入失败，不会重新创建
        let tmp = path.with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        fs::write(&tmp, content).await.map_err(missing)?;
        if let Err(err) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(missing(err));
        }
        Ok(())
    }

    async fn entries(&self, name: &str) -> Result<Vec<RequestKey>> {
        let mut dir = match fs::read_dir(self.generation_dir(name)?).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut keys = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let content = fs::read(&path).await?;
            match serde_json::from_slice::<StoredEntry>(&content) {
                Ok(stored) => keys.push(stored.key),
                Err(err) => warn!("Skip corrupted cache entry {:?}: {}", path, err),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, header::CONTENT_TYPE};
    use url::Url;

    fn key(path: &str) -> RequestKey {
        let url = Url::parse("https://app.example.com").unwrap().join(path).unwrap();
        RequestKey::new(&Method::GET, &url)
    }

    #[tokio::test]
    async fn test_put_and_lookup() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = DiskCacheStorage::new(dir.path());
        storage.open("zimi-app-v1.1.0").await.unwrap();

        let res = FetchResponse::new(StatusCode::OK, vec![0u8, 159, 146, 150], ResponseKind::Basic)
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
        storage
            .put("zimi-app-v1.1.0", &key("/static/js/bundle.js"), &res)
            .await
            .unwrap();

        let cached = storage
            .lookup("zimi-app-v1.1.0", &key("/static/js/bundle.js"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(cached, res);
        assert!(
            storage
                .lookup("zimi-app-v1.1.0", &key("/manifest.json"))
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(
            storage.entries("zimi-app-v1.1.0").await.unwrap(),
            vec![key("/static/js/bundle.js")]
        );
    }

    #[tokio::test]
    async fn test_keys_and_delete() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = DiskCacheStorage::new(dir.path().join("cache"));
        // 根目录不存在时返回空列表
        assert!(storage.keys().await.unwrap().is_empty());

        storage.open("zimi-app-v1.0.2").await.unwrap();
        storage.open("zimi-app-v1.1.0").await.unwrap();
        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["zimi-app-v1.0.2", "zimi-app-v1.1.0"]
        );

        assert!(storage.delete("zimi-app-v1.0.2").await.unwrap());
        assert!(!storage.delete("zimi-app-v1.0.2").await.unwrap());
        assert_eq!(storage.keys().await.unwrap(), vec!["zimi-app-v1.1.0"]);
        assert!(storage.has("zimi-app-v1.1.0").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_into_deleted_generation() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = DiskCacheStorage::new(dir.path().join("cache"));
        let res = FetchResponse::new(StatusCode::OK, "home", ResponseKind::Basic);

        // 从未打开的缓存代
        assert!(matches!(
            storage.put("zimi-app-v1.0.2", &key("/"), &res).await,
            Err(Error::CacheNotFound(_))
        ));

        storage.open("zimi-app-v1.0.2").await.unwrap();
        storage.delete("zimi-app-v1.0.2").await.unwrap();
        assert!(matches!(
            storage.put("zimi-app-v1.0.2", &key("/"), &res).await,
            Err(Error::CacheNotFound(_))
        ));
        assert!(storage.keys().await.unwrap().is_empty());
        assert!(!dir.path().join("cache").join("zimi-app-v1.0.2").exists());
    }

    #[tokio::test]
    async fn test_reject_invalid_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = DiskCacheStorage::new(dir.path());
        assert!(storage.open("../escape").await.is_err());
        assert!(storage.open("").await.is_err());
    }
}
