use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use haven::{
    application::{
        build_context, handle_config_change, initialize_logger, register_worker,
        shutdown_application, start_server,
    },
    cli::Cli,
    config::Settings,
    registration::Registration,
    utils::start_config_watcher,
};

use mimalloc::MiMalloc;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings = Settings::new(&args.config).with_context(|| "init config failed")?;
    let _guard = initialize_logger(&settings)?;

    let ctx = build_context(&settings)?;
    let registration = Arc::new(Registration::new());
    if let Err(e) = register_worker(&registration, settings.worker_config()?, ctx.clone()).await {
        // 没有激活的 worker 时请求直接走网络，等待下一次配置变更重试
        error!("{:?}", e);
    }

    let handle = start_server(&settings, registration.clone(), &ctx).await?;

    // 启动配置文件监听
    let runtime = tokio::runtime::Handle::current();
    let registration_clone = registration.clone();
    let stop_tx = start_config_watcher(&args.config, move |result| {
        runtime.spawn(handle_config_change(
            result,
            registration_clone.clone(),
            ctx.clone(),
        ));
    })?;

    info!("Server started");

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");

    shutdown_application(&handle, &registration, stop_tx).await;
    Ok(())
}
