//! 缓存代存储
//!
//! 每个缓存代是一个命名容器，保存 请求键 -> 响应快照。
//! 同一时刻只有一个缓存代是当前代，其余的在激活阶段被删除。

use async_trait::async_trait;

use crate::{
    error::Result,
    fetch::{FetchResponse, RequestKey},
};

pub mod disk;
pub mod memory;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;

/// 缓存存储能力
///
/// 实现需要保证单个键的读写是原子的，调用方不再额外加锁
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// 打开缓存代，不存在时创建
    async fn open(&self, name: &str) -> Result<()>;

    /// 列出所有缓存代名称
    async fn keys(&self) -> Result<Vec<String>>;

    async fn has(&self, name: &str) -> Result<bool>;

    /// 删除缓存代，返回是否存在
    async fn delete(&self, name: &str) -> Result<bool>;

    /// 在指定缓存代中查找响应
    async fn lookup(&self, name: &str, key: &RequestKey) -> Result<Option<FetchResponse>>;

    /// 写入响应，已存在的条目会被覆盖
    ///
    /// 缓存代必须已经打开；已被删除的缓存代返回 `Error::CacheNotFound`，
    /// 不会被重新创建
    async fn put(&self, name: &str, key: &RequestKey, response: &FetchResponse) -> Result<()>;

    /// 列出缓存代中的所有请求键
    async fn entries(&self, name: &str) -> Result<Vec<RequestKey>>;
}
