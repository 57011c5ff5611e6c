use std::str::FromStr;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self},
    layer::SubscriberExt,
};

/// 覆盖配置文件日志级别的环境变量
pub const LOG_ENV: &str = "HAVEN_LOG";

/// 初始化 Logger
///
/// 日志级别优先读取 `HAVEN_LOG` 环境变量，其次是配置文件。
/// 日志同时输出到控制台和日志目录，日志文件按天分割。
///
/// 返回的 guard 需要一直持有，丢弃后文件日志不再写入。
pub fn init_logger(log_level: &str, log_folder: &str) -> anyhow::Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(log_folder, "haven_log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_subscriber = fmt::layer()
        .compact()
        .with_target(false)
        .with_thread_ids(true)
        .with_ansi(false)
        .with_writer(non_blocking);

    let formatting_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stdout);

    let env_layer = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::from_str(log_level))
        .unwrap_or_else(|_| "info".into());

    let collector = tracing_subscriber::registry()
        .with(env_layer)
        .with(formatting_layer)
        .with(file_subscriber);
    tracing::subscriber::set_global_default(collector)
        .with_context(|| "to set a global collector")?;
    Ok(guard)
}
