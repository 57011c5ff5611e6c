use async_trait::async_trait;

use crate::error::Result;

pub mod client;
pub mod request;
pub mod response;

pub use client::HttpFetcher;
pub use request::{FetchRequest, RequestKey, RequestMode};
pub use response::{FetchResponse, ResponseKind};

/// 网络请求能力
///
/// 网络不可用或连接失败时返回 `Error::Network`；
/// 服务器返回的任何状态码都视为成功的网络往返
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}
