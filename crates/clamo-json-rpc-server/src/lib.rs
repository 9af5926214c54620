//! # Clamo JSON-RPC 2.0 Server
//!
//! A transport-agnostic JSON-RPC 2.0 request-processing engine. It takes raw
//! JSON text (or an already decoded document), validates it, resolves the
//! method against a host's exposed operations, binds `params` to the
//! operation's formal parameters, invokes it and builds the response.
//!
//! ## Features
//! - Single requests, batches and notifications
//! - Batches processed concurrently with a configurable limit, answered in request order
//! - Strict positional and named parameter binding
//! - Operation failures and panics isolated to the request that caused them
//! - Notification outcomes never reach the caller, with an optional side channel
//!
//! ```rust
//! use clamo_json_rpc_server::prelude::*;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let table = OperationTable::new()
//!     .operation("add", ParameterShape::new().required("a").required("b"), |args| async move {
//!         Ok::<_, OperationError>(json!(args.arg::<i64>(0)? + args.arg::<i64>(1)?))
//!     });
//! let dispatcher = JsonRpcDispatcher::new(table).unwrap();
//!
//! let response = dispatcher
//!     .handle_str(r#"{"jsonrpc": "2.0", "method": "add", "params": [1, 2], "id": 1}"#)
//!     .await
//!     .unwrap();
//! assert_eq!(
//!     serde_json::from_str::<serde_json::Value>(&response).unwrap(),
//!     json!({"jsonrpc": "2.0", "result": 3, "id": 1})
//! );
//! # }
//! ```

pub mod binder;
pub mod config;
pub mod dispatch;
pub mod envelope;
pub mod error;
pub mod notification;
pub mod prelude;
pub mod registry;
pub mod request;
pub mod response;
pub mod table;
pub mod types;
pub mod validate;

// Re-export main types
pub use binder::{BindError, BoundArguments, bind};
pub use config::{DEFAULT_MAX_CONCURRENCY, DispatcherConfig, NotificationMode};
pub use dispatch::{
    JsonRpcDispatcher, JsonRpcDispatcherBuilder, NotificationFailure, NotificationHook,
};
pub use envelope::{build_error, build_notification, build_request, build_result};
pub use error::{
    JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, OperationError, ToJsonRpcError,
};
pub use notification::JsonRpcNotification;
pub use registry::{
    OperationDescriptor, OperationHost, OperationRegistry, Parameter, ParameterKind,
    ParameterShape, RegistryError, ShapeError,
};
pub use request::{JsonRpcRequest, RequestParams};
pub use response::{JsonRpcMessage, JsonRpcOutput, JsonRpcResponse};
pub use table::{OperationTable, Visibility};
pub use types::{JsonRpcVersion, RequestId};
pub use validate::{Rejection, ValidatedRequest, validate_request};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Server error range: -32099 to -32000
    pub const SERVER_ERROR_START: i64 = -32099;
    pub const SERVER_ERROR_END: i64 = -32000;
}
