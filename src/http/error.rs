use std::fmt::Display;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use serde_repr::*;
use tracing::{error, warn};

use crate::error::Error;

#[derive(thiserror::Error, Debug)]
pub enum RouteError {
    #[error("{0}")]
    Any(#[from] anyhow::Error),
    #[error("{0}")]
    Worker(#[from] Error),
    #[error("no active worker")]
    NoActiveWorker(),
    #[error("bad gateway")]
    BadGateway(),
    #[error("bad request")]
    BadRequest(),
}

#[derive(Serialize_repr, Deserialize_repr, PartialEq, Debug)]
#[repr(u16)]
pub enum ErrorCode {
    Normal = 200,
    InternalError = 1000,
    NoActiveWorker = 1001,
    UnknownCategory = 1002,
    BadGateway = 1003,
    BadRequest = 1004,
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ErrorCode::*;

        let res = match self {
            Normal => "",
            InternalError => "服务器内部错误",
            NoActiveWorker => "没有已激活的 worker",
            UnknownCategory => "未知的提交类别",
            BadGateway => "上游请求失败",
            BadRequest => "请求格式错误",
        };
        f.write_str(res)?;
        Ok(())
    }
}

/// Log and return INTERNAL_SERVER_ERROR
fn log_internal_error<T: Display>(err: T) -> (StatusCode, ErrorCode, String) {
    use ErrorCode::*;

    error!("{err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        InternalError,
        "internal server error".to_string(),
    )
}

// Tell axum how to convert `RouteError` into a response.
impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        use RouteError::*;

        let (status_code, code, err_message) = match self {
            Any(err) => log_internal_error(err),
            Worker(Error::UnknownCategory(category)) => (
                StatusCode::NOT_FOUND,
                ErrorCode::UnknownCategory,
                format!("unknown category {category}"),
            ),
            Worker(err) => log_internal_error(err),
            NoActiveWorker() => {
                warn!("Request rejected: no active worker");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorCode::NoActiveWorker,
                    "no active worker".to_string(),
                )
            }
            BadGateway() => (
                StatusCode::BAD_GATEWAY,
                ErrorCode::BadGateway,
                "bad gateway".to_string(),
            ),
            BadRequest() => (
                StatusCode::BAD_REQUEST,
                ErrorCode::BadRequest,
                "bad request".to_string(),
            ),
        };
        let body = Json(json!({
            "code": code,
            "message": code.to_string(),
            "error": err_message
        }));
        (status_code, body).into_response()
    }
}

pub type RouteResult<T, E = RouteError> = Result<T, E>;
