//! Envelope construction.
//!
//! Pure helpers shared by the dispatcher and by callers that need to produce
//! outbound requests. Nothing here validates; the inputs are assumed to be
//! well formed already.

use serde_json::Value;

use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject};
use crate::notification::JsonRpcNotification;
use crate::request::{JsonRpcRequest, RequestParams};
use crate::response::JsonRpcResponse;
use crate::types::RequestId;

/// `{jsonrpc: "2.0", result, id}`
pub fn build_result(id: Option<RequestId>, result: Value) -> JsonRpcResponse {
    JsonRpcResponse::new(id, result)
}

/// `{jsonrpc: "2.0", error: {code, message, data?}, id}`
///
/// The message is the descriptor's default; `data` is only emitted when given.
pub fn build_error(
    id: Option<RequestId>,
    descriptor: JsonRpcErrorCode,
    data: Option<Value>,
) -> JsonRpcError {
    JsonRpcError::new(id, JsonRpcErrorObject::new(descriptor, None, data))
}

/// Build an outbound call. `id: None` serializes as an explicit `"id": null`;
/// use [`build_notification`] when no response is wanted.
pub fn build_request(
    method: &str,
    params: Option<RequestParams>,
    id: Option<RequestId>,
) -> JsonRpcRequest {
    JsonRpcRequest::new(id, method.to_string(), params)
}

/// Build an outbound notification. It never carries an `id` key.
pub fn build_notification(method: &str, params: Option<RequestParams>) -> JsonRpcNotification {
    JsonRpcNotification::new(method.to_string(), params)
}
