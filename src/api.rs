use serde_derive::Serialize;

use crate::response::{Response, HTTP_500};


pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Serialize)]
pub struct ApiUser {
    pub id: u64,
}

#[derive(Debug, Serialize)]
pub struct ApiPost {
    pub user_id: u64,
    pub post_id: u64,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: T,
}

pub fn new_response<T>(data: T) -> ApiResponse<T> {
    ApiResponse { status: "OK".to_string(), data }
}

/// Serialize `body` into `res` as JSON, or turn `res` into a 500 on failure.
pub fn write_json<T: serde::Serialize>(res: Response, body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => res.with_payload(bytes).with_content_type(JSON_CONTENT_TYPE),
        Err(e) => {
            error!("[API] Failed to serialize response: {}", e);
            res.with_error_status(HTTP_500, "Internal Server Error")
        }
    }
}
