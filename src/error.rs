use std::io;

use http::uri::InvalidUri;

#[allow(clippy::enum_variant_names)]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    // from
    #[error("failed io {0}")]
    Io(#[from] io::Error),
    #[error("failed to decode toml {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error("failed to handle json {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to handle http {0}")]
    Http(#[from] http::Error),
    #[error("failed to convert url {0}")]
    InvalidUri(#[from] InvalidUri),
    #[error("failed to parse url {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http client {0}")]
    Client(#[from] reqwest::Error),
    #[error("failed to decode base64 {0}")]
    Base64(#[from] base64::DecodeError),

    // worker
    #[error("network request to {url} failed: {reason}")]
    Network { url: String, reason: String },
    #[error("precache of {url} failed with status {status}")]
    Precache { url: String, status: u16 },
    #[error("cache generation {0} does not exist")]
    CacheNotFound(String),
    #[error("cache storage error {0}")]
    Storage(String),
    #[error("submission queue error {0}")]
    Queue(String),
    #[error("unknown submission category {0}")]
    UnknownCategory(String),
    #[error("internal error {0}")]
    Any(#[from] anyhow::Error),
}

impl Error {
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = Error> = anyhow::Result<T, E>;
