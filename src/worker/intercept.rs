use std::sync::Arc;

use http::Method;
use tracing::{debug, warn};

use super::Worker;
use crate::{
    cache::CacheStorage,
    error::Error,
    fetch::{
        FetchRequest, FetchResponse, Fetcher, RequestKey,
        response::{offline_page, service_unavailable},
    },
};

/// 响应来源
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    /// 缓存和网络都失败后的回退响应
    Fallback,
}

/// 拦截结果
#[derive(Clone, Debug, PartialEq)]
pub enum FetchOutcome {
    Respond {
        response: FetchResponse,
        source: ResponseSource,
    },
    /// 不拦截，由宿主按默认方式请求网络
    Passthrough,
}

impl FetchOutcome {
    fn respond(response: FetchResponse, source: ResponseSource) -> Self {
        Self::Respond { response, source }
    }

    pub fn response(&self) -> Option<&FetchResponse> {
        match self {
            Self::Respond { response, .. } => Some(response),
            Self::Passthrough => None,
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            Self::Respond { source, .. } => Some(*source),
            Self::Passthrough => None,
        }
    }
}

impl Worker {
    /// 跨域且不在 API 前缀下的请求不拦截
    pub fn should_intercept(&self, request: &FetchRequest) -> bool {
        request.origin() == self.config.origin.origin() || self.is_api(request)
    }

    fn is_api(&self, request: &FetchRequest) -> bool {
        request.path().starts_with(&self.config.api_prefix)
    }

    /// 请求拦截
    ///
    /// 1. 先查当前缓存代，命中直接返回；API 请求额外触发一次不等待的后台刷新
    /// 2. 未命中时请求网络，同源 200 响应写入缓存
    /// 3. 网络失败时回退：导航请求返回缓存的首页或合成的离线页面，其他请求返回 503
    ///
    /// 只有 GET 请求会查询和写入缓存
    pub async fn on_fetch(&self, request: &FetchRequest) -> FetchOutcome {
        if !self.should_intercept(request) {
            debug!("Passthrough {}", request.url);
            return FetchOutcome::Passthrough;
        }

        let cache_name = self.cache_name();
        let key = request.key();
        let cacheable_method = request.method == Method::GET;

        if cacheable_method {
            match self.ctx.caches.lookup(cache_name, &key).await {
                Ok(Some(response)) => {
                    debug!("Cache hit {}", key);
                    if self.is_api(request) {
                        self.spawn_refresh(request.clone());
                    }
                    return FetchOutcome::respond(response, ResponseSource::Cache);
                }
                Ok(None) => debug!("Cache miss {}", key),
                Err(err) => warn!("Cache lookup failed for {}: {}", key, err),
            }
        }

        match self.ctx.fetcher.fetch(request).await {
            Ok(response) => {
                if cacheable_method && response.is_cacheable() {
                    match self.ctx.caches.put(cache_name, &key, &response).await {
                        Ok(()) => {}
                        Err(Error::CacheNotFound(_)) => {
                            debug!("Cache generation {} retired, skip storing {}", cache_name, key)
                        }
                        Err(err) => warn!("Failed to cache {}: {}", key, err),
                    }
                }
                FetchOutcome::respond(response, ResponseSource::Network)
            }
            Err(err) => {
                debug!("Network failed for {}: {}", key, err);
                self.fallback(request).await
            }
        }
    }

    async fn fallback(&self, request: &FetchRequest) -> FetchOutcome {
        if !request.is_navigation() {
            return FetchOutcome::respond(
                service_unavailable(&self.config.offline.text),
                ResponseSource::Fallback,
            );
        }

        let root = match self.config.origin.join("/") {
            Ok(root) => root,
            Err(err) => {
                warn!("Invalid origin root: {}", err);
                return FetchOutcome::respond(
                    offline_page(&self.config.offline),
                    ResponseSource::Fallback,
                );
            }
        };
        let root_key = RequestKey::new(&Method::GET, &root);
        match self.ctx.caches.lookup(self.cache_name(), &root_key).await {
            Ok(Some(response)) => FetchOutcome::respond(response, ResponseSource::Fallback),
            Ok(None) => {
                FetchOutcome::respond(offline_page(&self.config.offline), ResponseSource::Fallback)
            }
            Err(err) => {
                warn!("Cache lookup failed for {}: {}", root_key, err);
                FetchOutcome::respond(offline_page(&self.config.offline), ResponseSource::Fallback)
            }
        }
    }

    /// 后台刷新缓存条目，调用方不等待结果
    fn spawn_refresh(&self, request: FetchRequest) {
        let caches: Arc<dyn CacheStorage> = self.ctx.caches.clone();
        let fetcher: Arc<dyn Fetcher> = self.ctx.fetcher.clone();
        let cache_name = self.config.cache_name.clone();
        self.tasks.spawn(async move {
            let key = request.key();
            match fetcher.fetch(&request).await {
                Ok(response) if response.is_cacheable() => {
                    match caches.put(&cache_name, &key, &response).await {
                        Ok(()) => debug!("Refreshed {}", key),
                        Err(err) => debug!("Failed to store refresh of {}: {}", key, err),
                    }
                }
                Ok(response) => debug!("Skip refresh of {}: status {}", key, response.status),
                Err(err) => debug!("Refresh of {} failed: {}", key, err),
            }
        });
    }
}
