//! The `{status, message, result}` envelope wrapping every agent-CRUD and
//! config/credential/model response (job endpoints and `/v1/chat` return
//! their own literal shapes instead — see their modules).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

pub fn ok<T: Serialize>(message: impl Into<String>, result: Option<T>) -> Response {
    Json(serde_json::json!({
        "status": "ok",
        "message": message.into(),
        "result": result,
    }))
    .into_response()
}

pub fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(serde_json::json!({
            "status": "error",
            "message": message.into(),
            "result": serde_json::Value::Null,
        })),
    )
        .into_response()
}
