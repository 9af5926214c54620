//! Request dispatch
//!
//! Drives each request through validation, resolution, binding and
//! invocation, and fans batches out with a bounded, order-preserving
//! concurrency limit.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::{self, FutureExt};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::binder::{BoundArguments, bind};
use crate::config::{DispatcherConfig, NotificationMode};
use crate::envelope::{build_error, build_result};
use crate::error::{JsonRpcError, JsonRpcErrorCode, JsonRpcErrorObject, ToJsonRpcError};
use crate::notification::JsonRpcNotification;
use crate::registry::{OperationHost, OperationRegistry, RegistryError};
use crate::request::JsonRpcRequest;
use crate::response::{JsonRpcMessage, JsonRpcOutput};
use crate::types::RequestId;
use crate::validate::{ValidatedRequest, validate_request};

/// A notification outcome that was withheld from the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationFailure {
    /// `None` when the document was too malformed to name a method
    pub method: Option<String>,
    pub error: JsonRpcErrorObject,
}

/// Side channel for notification failures
pub type NotificationHook = Arc<dyn Fn(&NotificationFailure) + Send + Sync>;

/// JSON-RPC 2.0 dispatcher over one host
pub struct JsonRpcDispatcher<H: OperationHost> {
    host: Arc<H>,
    registry: Arc<OperationRegistry>,
    config: DispatcherConfig,
    notification_hook: Option<NotificationHook>,
}

impl<H: OperationHost> Clone for JsonRpcDispatcher<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
            notification_hook: self.notification_hook.clone(),
        }
    }
}

impl<H: OperationHost> JsonRpcDispatcher<H> {
    /// Dispatcher with default configuration
    pub fn new(host: H) -> Result<Self, RegistryError> {
        Self::builder(host).build()
    }

    pub fn builder(host: H) -> JsonRpcDispatcherBuilder<H> {
        Self::builder_shared(Arc::new(host))
    }

    /// Builder over a host that is also owned elsewhere
    pub fn builder_shared(host: Arc<H>) -> JsonRpcDispatcherBuilder<H> {
        JsonRpcDispatcherBuilder {
            host,
            config: DispatcherConfig::default(),
            notification_hook: None,
        }
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Dispatch raw JSON text.
    ///
    /// Unparsable text yields a single Parse error envelope. `None` means
    /// nothing should be written back.
    pub async fn handle_str(&self, text: &str) -> Option<String> {
        let output = match serde_json::from_str::<Value>(text) {
            Ok(document) => self.handle(document).await?,
            Err(e) => {
                debug!("Rejecting unparsable payload: {}", e);
                JsonRpcOutput::Single(build_error(None, JsonRpcErrorCode::ParseError, None).into())
            }
        };
        output.to_json_string()
    }

    /// Dispatch an already decoded document.
    pub async fn handle_value(&self, document: Value) -> Option<Value> {
        self.handle(document).await.and_then(|output| output.to_value())
    }

    /// Dispatch an already decoded document, keeping the typed output.
    pub async fn handle(&self, document: Value) -> Option<JsonRpcOutput> {
        match document {
            Value::Array(items) => self.handle_batch(items).await,
            single => self.handle_single(single).await.map(JsonRpcOutput::Single),
        }
    }

    /// Process batch members concurrently, at most `max_concurrency` at a
    /// time. Answers come back in request order; notifications are dropped
    /// and an all-notification batch yields `None`.
    ///
    /// Inside a Tokio runtime each member runs as its own task, so members
    /// that block their thread still overlap on a multi-threaded runtime.
    pub async fn handle_batch(&self, items: Vec<Value>) -> Option<JsonRpcOutput> {
        let limit = self.config.effective_concurrency();
        debug!("Dispatching batch of {} requests (limit {})", items.len(), limit);

        let messages: Vec<JsonRpcMessage> = stream::iter(items)
            .map(|item| self.handle_member(item))
            .buffered(limit)
            .filter_map(future::ready)
            .collect()
            .await;

        JsonRpcOutput::from_batch(messages)
    }

    #[cfg(feature = "tokio")]
    async fn handle_member(&self, item: Value) -> Option<JsonRpcMessage> {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return self.handle_single(item).await;
        };

        let fallback = answer_id(&item);
        let dispatcher = self.clone();
        match runtime
            .spawn(async move { dispatcher.handle_single(item).await })
            .await
        {
            Ok(message) => message,
            Err(e) => {
                let message = if e.is_panic() {
                    panic_message(e.into_panic().as_ref())
                } else {
                    e.to_string()
                };
                warn!("Batch member task failed: {}", message);
                fallback.map(|id| JsonRpcError::internal_error(id, Some(message)).into())
            }
        }
    }

    #[cfg(not(feature = "tokio"))]
    async fn handle_member(&self, item: Value) -> Option<JsonRpcMessage> {
        self.handle_single(item).await
    }

    /// Process one request document; `None` for notifications.
    pub async fn handle_single(&self, document: Value) -> Option<JsonRpcMessage> {
        match validate_request(&document) {
            Ok(ValidatedRequest::Call(request)) => Some(self.handle_call(request).await),
            Ok(ValidatedRequest::Notification(notification)) => {
                self.handle_notification(notification).await;
                None
            }
            Err(rejection) if rejection.notification => {
                let method = document
                    .get("method")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                discard(
                    self.notification_hook.as_ref(),
                    NotificationFailure {
                        method,
                        error: rejection.error_object(),
                    },
                );
                None
            }
            Err(rejection) => {
                debug!("Rejected request {:?}: {}", rejection.id, rejection.code);
                rejection.into_error().map(JsonRpcMessage::Error)
            }
        }
    }

    async fn handle_call(&self, request: JsonRpcRequest) -> JsonRpcMessage {
        let JsonRpcRequest {
            method, params, id, ..
        } = request;

        let Some(descriptor) = self.registry.resolve(&method) else {
            debug!("Method not found: {}", method);
            return build_error(id, JsonRpcErrorCode::MethodNotFound, None).into();
        };

        let args = match bind(&descriptor.shape, params) {
            Ok(args) => args,
            Err(e) => {
                debug!("Invalid params for {}: {}", method, e);
                let data = Value::String(e.to_string());
                return build_error(id, JsonRpcErrorCode::InvalidParams, Some(data)).into();
            }
        };

        debug!("Invoking {} with {} arguments", method, args.len());
        match invoke_isolated(self.host.as_ref(), &method, args).await {
            Ok(result) => build_result(id, result).into(),
            Err(error) => {
                warn!("Operation {} failed: {} {:?}", method, error.message, error.data);
                JsonRpcError::new(id, error).into()
            }
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        let JsonRpcNotification { method, params, .. } = notification;
        let hook = self.notification_hook.clone();

        let Some(descriptor) = self.registry.resolve(&method) else {
            discard(
                hook.as_ref(),
                NotificationFailure {
                    method: Some(method),
                    error: JsonRpcErrorObject::method_not_found(),
                },
            );
            return;
        };

        let args = match bind(&descriptor.shape, params) {
            Ok(args) => args,
            Err(e) => {
                discard(
                    hook.as_ref(),
                    NotificationFailure {
                        method: Some(method),
                        error: JsonRpcErrorObject::invalid_params(Some(Value::String(
                            e.to_string(),
                        ))),
                    },
                );
                return;
            }
        };

        let host = Arc::clone(&self.host);
        let work = async move {
            if let Err(error) = invoke_isolated(host.as_ref(), &method, args).await {
                warn!("Notification {} failed: {} {:?}", method, error.message, error.data);
                discard(
                    hook.as_ref(),
                    NotificationFailure {
                        method: Some(method),
                        error,
                    },
                );
            }
        };

        let work = match self.config.notification_mode {
            NotificationMode::Detached => match try_spawn(work) {
                Ok(()) => return,
                Err(work) => work,
            },
            NotificationMode::Inline => work,
        };
        work.await;
    }
}

/// Builder for [`JsonRpcDispatcher`]
pub struct JsonRpcDispatcherBuilder<H: OperationHost> {
    host: Arc<H>,
    config: DispatcherConfig,
    notification_hook: Option<NotificationHook>,
}

impl<H: OperationHost> JsonRpcDispatcherBuilder<H> {
    pub fn config(mut self, config: DispatcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    pub fn notification_mode(mut self, mode: NotificationMode) -> Self {
        self.config.notification_mode = mode;
        self
    }

    /// Observe notification failures that are otherwise discarded
    pub fn on_notification_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&NotificationFailure) + Send + Sync + 'static,
    {
        self.notification_hook = Some(Arc::new(hook));
        self
    }

    /// Snapshot the host's operations and build the dispatcher
    pub fn build(self) -> Result<JsonRpcDispatcher<H>, RegistryError> {
        let registry = OperationRegistry::from_host(self.host.as_ref())?;
        debug!(
            "JSON-RPC dispatcher ready with {} operations: {:?}",
            registry.len(),
            registry.operation_names()
        );
        Ok(JsonRpcDispatcher {
            host: self.host,
            registry: Arc::new(registry),
            config: self.config,
            notification_hook: self.notification_hook,
        })
    }
}

/// Invoke an operation, turning both returned errors and panics into error
/// objects.
async fn invoke_isolated<H: OperationHost>(
    host: &H,
    method: &str,
    args: BoundArguments,
) -> Result<Value, JsonRpcErrorObject> {
    match AssertUnwindSafe(host.invoke(method, args))
        .catch_unwind()
        .await
    {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(e)) => Err(e.to_error_object()),
        Err(panic) => Err(JsonRpcErrorObject::internal_error(Some(panic_message(
            panic.as_ref(),
        )))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "operation panicked".to_string()
    }
}

/// The id a failed batch member is answered with. Outer `None` means the
/// member was a notification and gets no answer.
#[cfg_attr(not(feature = "tokio"), allow(dead_code))]
fn answer_id(document: &Value) -> Option<Option<RequestId>> {
    match document {
        Value::Object(object) => object.get("id").map(RequestId::from_value),
        _ => Some(None),
    }
}

fn discard(hook: Option<&NotificationHook>, failure: NotificationFailure) {
    debug!(
        "Discarding notification failure for {:?}: {} {}",
        failure.method, failure.error.code, failure.error.message
    );
    if let Some(hook) = hook {
        hook(&failure);
    }
}

#[cfg(feature = "tokio")]
fn try_spawn<F>(work: F) -> Result<(), F>
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(work);
            Ok(())
        }
        Err(_) => Err(work),
    }
}

#[cfg(not(feature = "tokio"))]
fn try_spawn<F>(work: F) -> Result<(), F>
where
    F: Future<Output = ()> + Send + 'static,
{
    Err(work)
}
