use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::error_codes::{SERVER_ERROR_END, SERVER_ERROR_START};
use crate::types::RequestId;

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError(i64), // -32099 to -32000
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => -32700,
            JsonRpcErrorCode::InvalidRequest => -32600,
            JsonRpcErrorCode::MethodNotFound => -32601,
            JsonRpcErrorCode::InvalidParams => -32602,
            JsonRpcErrorCode::InternalError => -32603,
            JsonRpcErrorCode::ServerError(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::ServerError(_) => "Server error",
        }
    }

    /// Look up the descriptor for a numeric code.
    ///
    /// Returns `None` for codes that are neither one of the fixed protocol
    /// codes nor inside the reserved server band.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -32700 => Some(JsonRpcErrorCode::ParseError),
            -32600 => Some(JsonRpcErrorCode::InvalidRequest),
            -32601 => Some(JsonRpcErrorCode::MethodNotFound),
            -32602 => Some(JsonRpcErrorCode::InvalidParams),
            -32603 => Some(JsonRpcErrorCode::InternalError),
            c if (SERVER_ERROR_START..=SERVER_ERROR_END).contains(&c) => {
                Some(JsonRpcErrorCode::ServerError(c))
            }
            _ => None,
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data,
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::ParseError, None, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidRequest, None, data)
    }

    pub fn method_not_found() -> Self {
        Self::new(JsonRpcErrorCode::MethodNotFound, None, None)
    }

    pub fn invalid_params(data: Option<Value>) -> Self {
        Self::new(JsonRpcErrorCode::InvalidParams, None, data)
    }

    /// Internal error carrying the failure message as `data`.
    pub fn internal_error(message: Option<String>) -> Self {
        Self::new(
            JsonRpcErrorCode::InternalError,
            None,
            message.map(Value::String),
        )
    }

    /// Error in the reserved server band.
    ///
    /// Codes outside -32099..=-32000 are not server errors; they degrade to an
    /// internal error that keeps the message as `data`.
    pub fn server_error(code: i64, message: &str, data: Option<Value>) -> Self {
        if !(SERVER_ERROR_START..=SERVER_ERROR_END).contains(&code) {
            return Self::internal_error(Some(message.to_string()));
        }
        Self::new(
            JsonRpcErrorCode::ServerError(code),
            Some(message.to_string()),
            data,
        )
    }

    pub fn kind(&self) -> Option<JsonRpcErrorCode> {
        JsonRpcErrorCode::from_code(self.code)
    }
}

/// JSON-RPC Error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: String,
    pub error: JsonRpcErrorObject,
    /// `None` serializes as `"id": null`.
    pub id: Option<RequestId>,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            version: crate::JSONRPC_VERSION.to_string(),
            error,
            id,
        }
    }

    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorObject::parse_error(None))
    }

    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_request(None))
    }

    pub fn method_not_found(id: Option<RequestId>) -> Self {
        Self::new(id, JsonRpcErrorObject::method_not_found())
    }

    pub fn invalid_params(id: Option<RequestId>, data: Option<Value>) -> Self {
        Self::new(id, JsonRpcErrorObject::invalid_params(data))
    }

    pub fn internal_error(id: Option<RequestId>, message: Option<String>) -> Self {
        Self::new(id, JsonRpcErrorObject::internal_error(message))
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "JSON-RPC Error {}: {}",
            self.error.code, self.error.message
        )
    }
}

impl std::error::Error for JsonRpcError {}

/// Trait for errors that can be converted to JSON-RPC error objects
///
/// The default conversion reports an internal error whose `data` is the
/// error's display text.
pub trait ToJsonRpcError: std::error::Error + Send + Sync + 'static {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        JsonRpcErrorObject::internal_error(Some(self.to_string()))
    }
}

/// Failure raised by a host operation while it runs.
#[derive(Debug, Error)]
pub enum OperationError {
    #[error("{0}")]
    Failed(String),

    #[error("argument decode failed: {0}")]
    Decode(#[from] serde_json::Error),

    /// Host-defined error in the reserved server band (-32099..=-32000).
    #[error("{message}")]
    Server {
        code: i64,
        message: String,
        data: Option<Value>,
    },
}

impl OperationError {
    pub fn failed(message: impl Into<String>) -> Self {
        OperationError::Failed(message.into())
    }

    pub fn server(code: i64, message: impl Into<String>) -> Self {
        OperationError::Server {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl ToJsonRpcError for OperationError {
    fn to_error_object(&self) -> JsonRpcErrorObject {
        match self {
            OperationError::Server {
                code,
                message,
                data,
            } => JsonRpcErrorObject::server_error(*code, message, data.clone()),
            other => JsonRpcErrorObject::internal_error(Some(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_error_codes() {
        assert_eq!(JsonRpcErrorCode::ParseError.code(), -32700);
        assert_eq!(JsonRpcErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(JsonRpcErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(JsonRpcErrorCode::InvalidParams.code(), -32602);
        assert_eq!(JsonRpcErrorCode::InternalError.code(), -32603);
        assert_eq!(JsonRpcErrorCode::InvalidRequest.message(), "Invalid Request");
    }

    #[test]
    fn test_from_code() {
        assert_eq!(
            JsonRpcErrorCode::from_code(-32601),
            Some(JsonRpcErrorCode::MethodNotFound)
        );
        assert_eq!(
            JsonRpcErrorCode::from_code(-32050),
            Some(JsonRpcErrorCode::ServerError(-32050))
        );
        assert_eq!(JsonRpcErrorCode::from_code(-31999), None);
        assert_eq!(JsonRpcErrorCode::from_code(42), None);
    }

    #[test]
    fn test_error_serialization() {
        let error = JsonRpcError::method_not_found(Some(RequestId::from(1)));
        assert_eq!(
            serde_json::to_value(error).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found"},
                "id": 1
            })
        );
    }

    #[test]
    fn test_null_id_is_serialized() {
        let json = serde_json::to_value(JsonRpcError::parse_error()).unwrap();
        assert_eq!(json["id"], Value::Null);
        assert!(json.as_object().unwrap().contains_key("id"));
        assert!(!json["error"].as_object().unwrap().contains_key("data"));
    }

    #[test]
    fn test_server_error_band() {
        let inside = JsonRpcErrorObject::server_error(-32001, "Busy", None);
        assert_eq!(inside.code, -32001);
        assert_eq!(inside.message, "Busy");

        let outside = JsonRpcErrorObject::server_error(-1, "Oops", None);
        assert_eq!(outside.code, -32603);
        assert_eq!(outside.data, Some(json!("Oops")));
    }

    #[test]
    fn test_operation_error_conversion() {
        let failed = OperationError::failed("divided by zero").to_error_object();
        assert_eq!(failed.code, -32603);
        assert_eq!(failed.message, "Internal error");
        assert_eq!(failed.data, Some(json!("divided by zero")));

        let server = OperationError::server(-32010, "Quota exceeded").to_error_object();
        assert_eq!(server.kind(), Some(JsonRpcErrorCode::ServerError(-32010)));
    }
}
