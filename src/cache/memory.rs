use async_trait::async_trait;
use dashmap::DashMap;

use super::CacheStorage;
use crate::{
    error::{Error, Result},
    fetch::{FetchResponse, RequestKey},
};

/// 内存缓存存储，进程退出后数据丢失
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    generations: DashMap<String, DashMap<RequestKey, FetchResponse>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<()> {
        self.generations.entry(name.to_string()).or_default();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut names = self
            .generations
            .iter()
            .map(|entry| entry.key().clone())
            .collect::<Vec<_>>();
        names.sort();
        Ok(names)
    }

    async fn has(&self, name: &str) -> Result<bool> {
        Ok(self.generations.contains_key(name))
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.generations.remove(name).is_some())
    }

    async fn lookup(&self, name: &str, key: &RequestKey) -> Result<Option<FetchResponse>> {
        let Some(generation) = self.generations.get(name) else {
            return Ok(None);
        };
        Ok(generation.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, name: &str, key: &RequestKey, response: &FetchResponse) -> Result<()> {
        let Some(generation) = self.generations.get(name) else {
            return Err(Error::CacheNotFound(name.to_string()));
        };
        generation.insert(key.clone(), response.clone());
        Ok(())
    }

    async fn entries(&self, name: &str) -> Result<Vec<RequestKey>> {
        let Some(generation) = self.generations.get(name) else {
            return Ok(Vec::new());
        };
        let mut keys = generation
            .iter()
            .map(|entry| entry.key().clone())
            .collect::<Vec<_>>();
        keys.sort();
        Ok(keys)
    }
}
