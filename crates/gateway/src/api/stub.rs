//! Config/credential/model CRUD — thin pass-through stubs.
//!
//! Credential storage and the model catalog are external collaborators
//! (a secrets manager, a provider's model-listing API) with no in-tree
//! implementation here; every route in this module returns `501 Not
//! Implemented` with a pointer to where a real deployment should wire one
//! in, mirroring how the teacher stubs routes for providers it has no
//! adapter for.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

fn not_implemented(pointer: &str) -> Response {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(serde_json::json!({
            "status": "error",
            "message": format!("not implemented: {pointer}"),
            "result": serde_json::Value::Null,
        })),
    )
        .into_response()
}

pub async fn list_config() -> Response {
    not_implemented("wire a config store into AppState")
}

pub async fn get_config() -> Response {
    not_implemented("wire a config store into AppState")
}

pub async fn put_config() -> Response {
    not_implemented("wire a config store into AppState")
}

pub async fn list_credentials() -> Response {
    not_implemented("wire a secrets manager into AppState")
}

pub async fn put_credential() -> Response {
    not_implemented("wire a secrets manager into AppState")
}

pub async fn delete_credential() -> Response {
    not_implemented("wire a secrets manager into AppState")
}

pub async fn list_models() -> Response {
    not_implemented("wire a model catalog provider into AppState")
}
