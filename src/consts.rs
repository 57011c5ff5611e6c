use std::env;

pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const OS: &str = env::consts::OS;
pub const ARCH: &str = env::consts::ARCH;
pub const COMPILER: &str = env!("HAVEN_COMPILER");
pub const COMMIT: &str = env!("HAVEN_COMMIT");
/// 构建期版本号，用于派生缓存代名称
pub const BUILD_VERSION: &str = env!("HAVEN_BUILD_VERSION");

// config defaults
pub const LOG_LEVEL_DEFAULT: &str = "info";
pub fn log_level_default() -> String {
    LOG_LEVEL_DEFAULT.to_string()
}

pub const LOG_FOLDER_DEFAULT: &str = "./logs";
pub fn log_folder_default() -> String {
    LOG_FOLDER_DEFAULT.to_string()
}

pub const CACHE_PREFIX_DEFAULT: &str = "zimi-app";
pub fn cache_prefix_default() -> String {
    CACHE_PREFIX_DEFAULT.to_string()
}

pub const ORIGIN_DEFAULT: &str = "http://127.0.0.1:8001";
pub fn origin_default() -> String {
    ORIGIN_DEFAULT.to_string()
}

pub const API_PREFIX_DEFAULT: &str = "/api";
pub fn api_prefix_default() -> String {
    API_PREFIX_DEFAULT.to_string()
}

pub const PRECACHE_DEFAULT: [&str; 4] = [
    "/",
    "/static/js/bundle.js",
    "/static/css/main.css",
    "/manifest.json",
];
pub fn precache_default() -> Vec<String> {
    PRECACHE_DEFAULT.map(|p| p.to_string()).to_vec()
}

pub fn skip_waiting_default() -> bool {
    true
}

pub const FETCH_TIMEOUT_DEFAULT: u16 = 30;
pub fn fetch_timeout_default() -> u16 {
    FETCH_TIMEOUT_DEFAULT
}

// offline submission categories
pub const APPOINTMENT_SYNC_TAG: &str = "appointment-sync";
pub const APPOINTMENT_CATEGORY: &str = "appointment";
pub const APPOINTMENT_ENDPOINT: &str = "/api/appointments";
pub const CONTACT_SYNC_TAG: &str = "contact-sync";
pub const CONTACT_CATEGORY: &str = "contact";
pub const CONTACT_ENDPOINT: &str = "/api/contact";

// offline fallback
pub const OFFLINE_TEXT_DEFAULT: &str = "Sin conexión";
pub fn offline_text_default() -> String {
    OFFLINE_TEXT_DEFAULT.to_string()
}
pub const OFFLINE_TITLE_DEFAULT: &str = "ZIMI - Sin conexión";
pub fn offline_title_default() -> String {
    OFFLINE_TITLE_DEFAULT.to_string()
}
pub const OFFLINE_MESSAGE_DEFAULT: &str =
    "No hay conexión a Internet. Revise su conexión e inténtelo de nuevo.";
pub fn offline_message_default() -> String {
    OFFLINE_MESSAGE_DEFAULT.to_string()
}
pub const OFFLINE_RETRY_DEFAULT: &str = "Reintentar";
pub fn offline_retry_default() -> String {
    OFFLINE_RETRY_DEFAULT.to_string()
}

// push notifications
pub const PUSH_TITLE_DEFAULT: &str = "ZIMI - Instituto Médico";
pub fn push_title_default() -> String {
    PUSH_TITLE_DEFAULT.to_string()
}
pub const PUSH_BODY_DEFAULT: &str = "Nueva notificación de ZIMI";
pub fn push_body_default() -> String {
    PUSH_BODY_DEFAULT.to_string()
}
pub const PUSH_ICON_DEFAULT: &str = "/manifest-icon-192.png";
pub fn push_icon_default() -> String {
    PUSH_ICON_DEFAULT.to_string()
}
pub const NOTIFICATION_ACTION_EXPLORE: &str = "explore";
pub const NOTIFICATION_ACTION_CLOSE: &str = "close";
pub const NOTIFICATION_OPEN_URL: &str = "/";

// host
pub const HOST_IP_DEFAULT: &str = "127.0.0.1";
pub fn host_ip_default() -> String {
    HOST_IP_DEFAULT.to_string()
}
pub const HOST_PORT_DEFAULT: u16 = 8080;
pub fn host_port_default() -> u16 {
    HOST_PORT_DEFAULT
}
pub const TIMEOUT_DEFAULT: u16 = 75;
pub fn timeout_default() -> u16 {
    TIMEOUT_DEFAULT
}
/// 控制接口路径前缀
pub const CONTROL_PREFIX: &str = "/__haven";
pub const MAX_BODY_SIZE: usize = 10 * 1024 * 1024;
