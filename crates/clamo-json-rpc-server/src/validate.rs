//! Structural validation of one decoded request document.

use serde_json::Value;

use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject};
use crate::notification::JsonRpcNotification;
use crate::request::{JsonRpcRequest, RequestParams};
use crate::types::RequestId;
use crate::JSONRPC_VERSION;

/// A request document that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidatedRequest {
    Call(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

impl ValidatedRequest {
    /// Get the method name
    pub fn method(&self) -> &str {
        match self {
            ValidatedRequest::Call(req) => &req.method,
            ValidatedRequest::Notification(notif) => &notif.method,
        }
    }

    pub fn params(&self) -> Option<&RequestParams> {
        match self {
            ValidatedRequest::Call(req) => req.params.as_ref(),
            ValidatedRequest::Notification(notif) => notif.params.as_ref(),
        }
    }

    pub fn is_notification(&self) -> bool {
        matches!(self, ValidatedRequest::Notification(_))
    }

    /// The id to echo, if this is a call with a non-null id
    pub fn request_id(&self) -> Option<&RequestId> {
        match self {
            ValidatedRequest::Call(req) => req.id.as_ref(),
            ValidatedRequest::Notification(_) => None,
        }
    }
}

/// Why a document was refused before any operation lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub code: JsonRpcErrorCode,
    /// Echo id; `None` when absent, null, or malformed.
    pub id: Option<RequestId>,
    /// The document was an object without an `id` key.
    pub notification: bool,
}

impl Rejection {
    fn new(code: JsonRpcErrorCode, id: Option<RequestId>, notification: bool) -> Self {
        Self {
            code,
            id,
            notification,
        }
    }

    pub fn error_object(&self) -> JsonRpcErrorObject {
        JsonRpcErrorObject::new(self.code, None, None)
    }

    /// The error envelope for this rejection. Notifications are never
    /// answered, so they yield `None`.
    pub fn into_error(self) -> Option<JsonRpcError> {
        if self.notification {
            return None;
        }
        let error = self.error_object();
        Some(JsonRpcError::new(self.id, error))
    }
}

/// Validate one decoded document.
///
/// Checks run in a fixed order: object shape, `jsonrpc` tag, `method`, `id`
/// type, and only then the `params` shape. The first three and the `id` check
/// yield Invalid Request; a bad `params` shape yields Invalid params.
pub fn validate_request(value: &Value) -> Result<ValidatedRequest, Rejection> {
    let Value::Object(object) = value else {
        return Err(Rejection::new(JsonRpcErrorCode::InvalidRequest, None, false));
    };

    let raw_id = object.get("id");
    let notification = raw_id.is_none();
    let (echo_id, id_well_typed) = match raw_id {
        None | Some(Value::Null) => (None, true),
        Some(raw) => match RequestId::from_value(raw) {
            Some(id) => (Some(id), true),
            None => (None, false),
        },
    };
    let reject = |code| Rejection::new(code, echo_id.clone(), notification);

    match object.get("jsonrpc") {
        Some(Value::String(tag)) if tag == JSONRPC_VERSION => {}
        _ => return Err(reject(JsonRpcErrorCode::InvalidRequest)),
    }

    let method = match object.get("method") {
        Some(Value::String(method)) => method.clone(),
        _ => return Err(reject(JsonRpcErrorCode::InvalidRequest)),
    };

    if !id_well_typed {
        return Err(reject(JsonRpcErrorCode::InvalidRequest));
    }

    let params = match object.get("params") {
        None => None,
        Some(raw) => match RequestParams::from_value(raw.clone()) {
            Some(params) => Some(params),
            None => return Err(reject(JsonRpcErrorCode::InvalidParams)),
        },
    };

    if notification {
        Ok(ValidatedRequest::Notification(JsonRpcNotification::new(
            method, params,
        )))
    } else {
        Ok(ValidatedRequest::Call(JsonRpcRequest::new(
            echo_id, method, params,
        )))
    }
}
