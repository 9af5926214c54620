use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JsonRpcError;
use crate::types::{JsonRpcVersion, RequestId};

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub result: Value,
    pub id: Option<RequestId>,
}

impl JsonRpcResponse {
    pub fn new(id: Option<RequestId>, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            result,
            id,
        }
    }

    pub fn success(id: RequestId, result: Value) -> Self {
        Self::new(Some(id), result)
    }
}

/// Either a successful response or an error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Error response with error field. Listed first so a response lacking
    /// `error` never deserializes as one.
    Error(JsonRpcError),
    /// Successful response with result field
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    /// Create a success message
    pub fn success(id: Option<RequestId>, result: Value) -> Self {
        Self::Response(JsonRpcResponse::new(id, result))
    }

    /// Create an error message
    pub fn error(error: JsonRpcError) -> Self {
        Self::Error(error)
    }

    /// Check if this is an error response
    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    /// Get the request ID from either response or error
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Response(resp) => resp.id.as_ref(),
            JsonRpcMessage::Error(err) => err.id.as_ref(),
        }
    }
}

impl From<JsonRpcResponse> for JsonRpcMessage {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Response(response)
    }
}

impl From<JsonRpcError> for JsonRpcMessage {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

/// What the dispatcher hands back for one inbound document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcOutput {
    /// Answer to a single (non-batch) request
    Single(JsonRpcMessage),
    /// Answers to a batch, in request order; never empty
    Batch(Vec<JsonRpcMessage>),
}

impl JsonRpcOutput {
    /// Collapse a batch's answers, yielding `None` when nothing was answered.
    pub fn from_batch(messages: Vec<JsonRpcMessage>) -> Option<Self> {
        if messages.is_empty() {
            None
        } else {
            Some(JsonRpcOutput::Batch(messages))
        }
    }

    pub fn messages(&self) -> &[JsonRpcMessage] {
        match self {
            JsonRpcOutput::Single(message) => std::slice::from_ref(message),
            JsonRpcOutput::Batch(messages) => messages,
        }
    }

    pub fn to_value(&self) -> Option<Value> {
        serde_json::to_value(self).ok()
    }

    pub fn to_json_string(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}
