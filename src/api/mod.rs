//! REST API module.
//!
//! Contains all API routes and handlers following the dashboard contract.

mod admin;
mod alerts;
mod grants;
mod procurement;
mod search;
mod tenders;

pub use admin::*;
pub use alerts::*;
pub use grants::*;
pub use procurement::*;
pub use search::*;
pub use tenders::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};

/// Success response envelope.
///
/// `meta` fields are flattened next to `data`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(flatten)]
    pub meta: Option<Map<String, Value>>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        if let Value::Object(map) = meta {
            self.meta = Some(map);
        }
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppError>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(ApiResponse::new(data))
}

/// Create a successful API response with extra top-level fields.
pub fn success_with_meta<T: Serialize>(data: T, meta: Value) -> ApiResult<T> {
    Ok(ApiResponse::new(data).with_meta(meta))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: crate::errors::AppError) -> ApiResult<T> {
    Err(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_meta_is_flattened() {
        let response = ApiResponse::new(vec![1, 2]).with_meta(json!({"count": 2}));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"success": true, "data": [1, 2], "count": 2}));

        let bare = serde_json::to_value(ApiResponse::new("x")).unwrap();
        assert_eq!(bare, json!({"success": true, "data": "x"}));
    }
}
