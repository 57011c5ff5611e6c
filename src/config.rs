use std::{fs, path::PathBuf, time::Duration};

use serde::Deserialize;
use url::Url;

use crate::{
    consts::{
        APPOINTMENT_CATEGORY, APPOINTMENT_ENDPOINT, APPOINTMENT_SYNC_TAG, BUILD_VERSION,
        CONTACT_CATEGORY, CONTACT_ENDPOINT, CONTACT_SYNC_TAG, api_prefix_default,
        cache_prefix_default, fetch_timeout_default, host_ip_default, host_port_default,
        log_folder_default, log_level_default, offline_message_default, offline_retry_default,
        offline_text_default, offline_title_default, origin_default, precache_default,
        push_body_default, push_icon_default, push_title_default, skip_waiting_default,
        timeout_default,
    },
    error::{Error, Result},
};

/// Worker 配置
#[derive(Deserialize, Clone, Debug)]
pub struct SettingWorker {
    /// 缓存代名称前缀，完整名称为 `{cache_prefix}-v{version}`
    #[serde(default = "cache_prefix_default")]
    pub cache_prefix: String,
    /// 覆盖构建期版本号
    pub version: Option<String>,
    /// 页面所在的源，例如 `https://app.example.com`
    #[serde(default = "origin_default")]
    pub origin: String,
    /// REST API 路径前缀
    #[serde(default = "api_prefix_default")]
    pub api_prefix: String,
    /// 安装阶段预缓存的资源列表
    #[serde(default = "precache_default")]
    pub precache: Vec<String>,
    /// 安装完成后立即激活
    #[serde(default = "skip_waiting_default")]
    pub skip_waiting: bool,
    /// 网络请求超时时间（秒）
    #[serde(default = "fetch_timeout_default")]
    pub fetch_timeout: u16,
}

impl Default for SettingWorker {
    fn default() -> Self {
        Self {
            cache_prefix: cache_prefix_default(),
            version: None,
            origin: origin_default(),
            api_prefix: api_prefix_default(),
            precache: precache_default(),
            skip_waiting: skip_waiting_default(),
            fetch_timeout: fetch_timeout_default(),
        }
    }
}

/// 后台同步类别
///
/// 每个同步标签对应一类离线提交，重放时 POST 到 `endpoint`
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct SettingSync {
    pub tag: String,
    pub category: String,
    pub endpoint: String,
}

fn sync_default() -> Vec<SettingSync> {
    vec![
        SettingSync {
            tag: APPOINTMENT_SYNC_TAG.to_string(),
            category: APPOINTMENT_CATEGORY.to_string(),
            endpoint: APPOINTMENT_ENDPOINT.to_string(),
        },
        SettingSync {
            tag: CONTACT_SYNC_TAG.to_string(),
            category: CONTACT_CATEGORY.to_string(),
            endpoint: CONTACT_ENDPOINT.to_string(),
        },
    ]
}

/// 离线回退页面文案
#[derive(Deserialize, Clone, Debug)]
pub struct SettingOffline {
    /// 非导航请求 503 响应的纯文本内容
    #[serde(default = "offline_text_default")]
    pub text: String,
    #[serde(default = "offline_title_default")]
    pub title: String,
    #[serde(default = "offline_message_default")]
    pub message: String,
    #[serde(default = "offline_retry_default")]
    pub retry: String,
}

impl Default for SettingOffline {
    fn default() -> Self {
        Self {
            text: offline_text_default(),
            title: offline_title_default(),
            message: offline_message_default(),
            retry: offline_retry_default(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct SettingPush {
    #[serde(default = "push_title_default")]
    pub title: String,
    #[serde(default = "push_body_default")]
    pub body: String,
    #[serde(default = "push_icon_default")]
    pub icon: String,
}

impl Default for SettingPush {
    fn default() -> Self {
        Self {
            title: push_title_default(),
            body: push_body_default(),
            icon: push_icon_default(),
        }
    }
}

/// 持久化配置
///
/// 未设置目录时使用内存存储，进程退出后数据丢失
#[derive(Deserialize, Clone, Debug, Default)]
pub struct SettingStorage {
    pub cache_dir: Option<PathBuf>,
    pub queue_dir: Option<PathBuf>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct SettingHost {
    #[serde(default = "host_ip_default")]
    pub ip: String,
    #[serde(default = "host_port_default")]
    pub port: u16,
    /// HTTP 请求超时时间（秒）
    #[serde(default = "timeout_default")]
    pub timeout: u16,
}

impl Default for SettingHost {
    fn default() -> Self {
        Self {
            ip: host_ip_default(),
            port: host_port_default(),
            timeout: timeout_default(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    #[serde(default = "log_level_default")]
    pub log_level: String,
    #[serde(default = "log_folder_default")]
    pub log_folder: String,
    #[serde(default)]
    pub worker: SettingWorker,
    #[serde(default = "sync_default")]
    pub sync: Vec<SettingSync>,
    #[serde(default)]
    pub offline: SettingOffline,
    #[serde(default)]
    pub push: SettingPush,
    #[serde(default)]
    pub storage: SettingStorage,
    #[serde(default)]
    pub host: SettingHost,
}

impl Settings {
    pub fn new(path: &str) -> Result<Self> {
        let file = fs::read_to_string(path)?;
        Self::parse(&file)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let settings: Settings = toml::from_str(content)?;
        Ok(settings)
    }

    /// 将配置文件转换为 worker 运行时配置
    pub fn worker_config(&self) -> Result<WorkerConfig> {
        WorkerConfig::from_settings(self)
    }
}

/// Worker 运行时配置
///
/// 在启动时由配置文件生成并显式传入 worker，缓存代名称由版本号派生
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub cache_name: String,
    pub version: String,
    pub origin: Url,
    pub api_prefix: String,
    pub precache: Vec<String>,
    pub skip_waiting: bool,
    pub fetch_timeout: Duration,
    pub sync: Vec<SettingSync>,
    pub offline: SettingOffline,
    pub push: SettingPush,
}

impl WorkerConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let worker = &settings.worker;
        let version = worker
            .version
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| BUILD_VERSION.to_string());
        let version = version.trim().trim_start_matches('v').to_string();
        if version.is_empty() {
            return Err(Error::Any(anyhow::anyhow!("worker version is empty")));
        }

        let origin = Url::parse(&worker.origin)?;
        let api_prefix = if worker.api_prefix.starts_with('/') {
            worker.api_prefix.clone()
        } else {
            format!("/{}", worker.api_prefix)
        };

        Ok(Self {
            cache_name: cache_name(&worker.cache_prefix, &version),
            version,
            origin,
            api_prefix,
            precache: worker.precache.clone(),
            skip_waiting: worker.skip_waiting,
            fetch_timeout: Duration::from_secs(worker.fetch_timeout.into()),
            sync: settings.sync.clone(),
            offline: settings.offline.clone(),
            push: settings.push.clone(),
        })
    }

    /// 根据同步标签查找提交类别
    pub fn sync_for_tag(&self, tag: &str) -> Option<&SettingSync> {
        self.sync.iter().find(|s| s.tag == tag)
    }

    /// 根据类别名称查找提交类别
    pub fn sync_for_category(&self, category: &str) -> Option<&SettingSync> {
        self.sync.iter().find(|s| s.category == category)
    }
}

/// 由前缀与版本号生成缓存代名称
pub fn cache_name(prefix: &str, version: &str) -> String {
    format!("{}-v{}", prefix, version.trim_start_matches('v'))
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
