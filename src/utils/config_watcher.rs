use notify::{EventKind, RecursiveMode, Watcher};
use std::{
    path::Path,
    sync::mpsc,
    time::{Duration, Instant},
};
use tracing::{debug, error, info};

use crate::{config::Settings, error::Result};

/// 两次重新加载之间的最小间隔
const DEBOUNCE: Duration = Duration::from_millis(500);

/// 启动配置文件监听
///
/// 配置文件发生变化时重新解析，并把结果交给回调。
/// 监听运行在独立线程上，回调不能阻塞太久。
///
/// # 参数
///
/// * `config_path` - 配置文件路径
/// * `callback` - 配置文件变化时的回调函数，参数为重新解析的结果
///
/// # 返回值
///
/// 返回一个发送器，用于发送停止信号
pub fn start_config_watcher(
    config_path: impl AsRef<Path>,
    callback: impl Fn(Result<Settings>) + Send + 'static,
) -> Result<mpsc::Sender<()>, notify::Error> {
    let (stop_tx, stop_rx) = mpsc::channel();
    let (tx, rx) = mpsc::channel();
    let config_path = config_path.as_ref().to_owned();

    let mut watcher = notify::recommended_watcher(tx)?;
    watcher.watch(&config_path, RecursiveMode::NonRecursive)?;
    info!("Watching config file: {:?}", config_path);

    std::thread::spawn(move || {
        let mut last_reload: Option<Instant> = None;

        loop {
            if stop_rx.try_recv().is_ok() {
                info!("Stopping config watcher");
                break;
            }

            match rx.recv_timeout(Duration::from_secs(1)) {
                Ok(Ok(event)) => {
                    if matches!(event.kind, EventKind::Access(_)) {
                        continue;
                    }
                    // 编辑器常以删除再写入的方式保存，需要重新 watch
                    if matches!(
                        event.kind,
                        EventKind::Remove(_) | EventKind::Modify(notify::event::ModifyKind::Name(_))
                    ) {
                        rewatch(&mut watcher, &config_path);
                    }

                    let now = Instant::now();
                    if last_reload.is_some_and(|last| now.duration_since(last) < DEBOUNCE) {
                        debug!("Config file event debounced: {:?}", event.kind);
                        continue;
                    }
                    last_reload = Some(now);

                    info!("Config file event: {:?}", event.kind);
                    callback(reload(&config_path));
                }
                Ok(Err(e)) => error!("Watch error: {:?}", e),
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    error!("Watcher channel disconnected");
                    break;
                }
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
            }
        }

        if let Err(e) = watcher.unwatch(&config_path) {
            debug!("Failed to unwatch config file: {:?}", e);
        }
    });

    Ok(stop_tx)
}

fn rewatch(watcher: &mut impl Watcher, config_path: &Path) {
    if let Err(e) = watcher.unwatch(config_path) {
        debug!("Failed to unwatch config file (ignored): {:?}", e);
    }
    match watcher.watch(config_path, RecursiveMode::NonRecursive) {
        Ok(()) => info!("Re-watching config file: {:?}", config_path),
        Err(e) => error!("Failed to re-watch config file: {:?}", e),
    }
}

fn reload(config_path: &Path) -> Result<Settings> {
    // 写入可能尚未完成，稍等片刻再读取
    std::thread::sleep(Duration::from_millis(50));
    Settings::new(&config_path.to_string_lossy())
}
