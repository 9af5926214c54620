//! # JSON-RPC Server Prelude
//!
//! Re-exports of the types most hosts and callers need.
//!
//! ```rust
//! use clamo_json_rpc_server::prelude::*;
//! ```

// Core JSON-RPC types
pub use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject};
pub use crate::notification::JsonRpcNotification;
pub use crate::request::{JsonRpcRequest, RequestParams};
pub use crate::response::{JsonRpcMessage, JsonRpcOutput, JsonRpcResponse};
pub use crate::types::{JsonRpcVersion, RequestId};

// Hosting operations
pub use crate::binder::{BindError, BoundArguments};
pub use crate::error::{OperationError, ToJsonRpcError};
pub use crate::registry::{OperationHost, ParameterKind, ParameterShape};
pub use crate::table::{OperationTable, Visibility};

// Dispatch
pub use crate::config::{DispatcherConfig, NotificationMode};
pub use crate::dispatch::{JsonRpcDispatcher, NotificationFailure};

// Standard error codes
pub use crate::error_codes::*;
