pub mod config_watcher;
pub mod logging;

pub use config_watcher::start_config_watcher;
pub use logging::init_logger;
