//! Closure-backed host.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;

use crate::binder::BoundArguments;
use crate::error::OperationError;
use crate::registry::{OperationHost, ParameterShape};

type OperationFn =
    Arc<dyn Fn(BoundArguments) -> BoxFuture<'static, Result<Value, OperationError>> + Send + Sync>;

/// Whether an operation is part of the public surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Listed and callable over JSON-RPC
    Exposed,
    /// Known to the host only; callable through [`OperationTable::call_internal`]
    Internal,
}

struct TableEntry {
    shape: ParameterShape,
    visibility: Visibility,
    handler: OperationFn,
}

/// An [`OperationHost`] assembled from async closures.
///
/// ```rust
/// use clamo_json_rpc_server::prelude::*;
/// use serde_json::json;
///
/// let table = OperationTable::new()
///     .operation("add", ParameterShape::new().required("a").required("b"), |args| async move {
///         Ok::<_, OperationError>(json!(args.arg::<i64>(0)? + args.arg::<i64>(1)?))
///     });
/// assert_eq!(table.list_operations(), vec!["add".to_string()]);
/// ```
#[derive(Default)]
pub struct OperationTable {
    entries: HashMap<String, TableEntry>,
}

impl OperationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an exposed operation
    pub fn operation<F, Fut>(mut self, name: impl Into<String>, shape: ParameterShape, handler: F) -> Self
    where
        F: Fn(BoundArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, OperationError>> + Send + 'static,
    {
        self.register(name, shape, Visibility::Exposed, handler);
        self
    }

    /// Register an operation that is never reachable over JSON-RPC
    pub fn internal_operation<F, Fut>(
        mut self,
        name: impl Into<String>,
        shape: ParameterShape,
        handler: F,
    ) -> Self
    where
        F: Fn(BoundArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, OperationError>> + Send + 'static,
    {
        self.register(name, shape, Visibility::Internal, handler);
        self
    }

    /// Register an operation, replacing any previous one with the same name
    pub fn register<F, Fut>(
        &mut self,
        name: impl Into<String>,
        shape: ParameterShape,
        visibility: Visibility,
        handler: F,
    ) where
        F: Fn(BoundArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, OperationError>> + Send + 'static,
    {
        let handler: OperationFn = Arc::new(move |args| handler(args).boxed());
        self.entries.insert(
            name.into(),
            TableEntry {
                shape,
                visibility,
                handler,
            },
        );
    }

    pub fn visibility(&self, name: &str) -> Option<Visibility> {
        self.entries.get(name).map(|entry| entry.visibility)
    }

    /// Run any registered operation, exposed or internal, bypassing binding.
    pub async fn call_internal(
        &self,
        name: &str,
        args: BoundArguments,
    ) -> Result<Value, OperationError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| OperationError::failed(format!("unknown operation '{}'", name)))?;
        (entry.handler)(args).await
    }
}

impl fmt::Debug for OperationTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<(&String, Visibility)> = self
            .entries
            .iter()
            .map(|(name, entry)| (name, entry.visibility))
            .collect();
        names.sort_by(|a, b| a.0.cmp(b.0));
        f.debug_struct("OperationTable")
            .field("operations", &names)
            .finish()
    }
}

#[async_trait]
impl OperationHost for OperationTable {
    type Error = OperationError;

    fn list_operations(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.visibility == Visibility::Exposed)
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    fn describe(&self, name: &str) -> Option<ParameterShape> {
        self.entries.get(name).map(|entry| entry.shape.clone())
    }

    async fn invoke(&self, name: &str, args: BoundArguments) -> Result<Value, Self::Error> {
        match self.entries.get(name) {
            Some(entry) if entry.visibility == Visibility::Exposed => (entry.handler)(args).await,
            _ => Err(OperationError::failed(format!(
                "operation '{}' is not exposed",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::OperationRegistry;
    use serde_json::json;

    fn table() -> OperationTable {
        OperationTable::new()
            .operation(
                "add",
                ParameterShape::new().required("a").required("b"),
                |args| async move {
                    Ok::<_, OperationError>(json!(args.arg::<i64>(0)? + args.arg::<i64>(1)?))
                },
            )
            .internal_operation("private_method", ParameterShape::new(), |_| async {
                Ok::<_, OperationError>(json!("This should not be exposed"))
            })
    }

    #[test]
    fn test_only_exposed_operations_are_listed() {
        let table = table();
        assert_eq!(table.list_operations(), vec!["add".to_string()]);
        assert!(table.describe("private_method").is_some());
        assert_eq!(table.visibility("private_method"), Some(Visibility::Internal));

        let registry = OperationRegistry::from_host(&table).unwrap();
        assert!(registry.resolve("private_method").is_none());
    }

    #[tokio::test]
    async fn test_invoke_exposed_operation() {
        let result = table()
            .invoke("add", BoundArguments::Positional(vec![json!(1), json!(2)]))
            .await
            .unwrap();
        assert_eq!(result, json!(3));
    }

    #[tokio::test]
    async fn test_invoke_refuses_internal_operation() {
        let error = table()
            .invoke("private_method", BoundArguments::None)
            .await
            .unwrap_err();
        assert!(error.to_string().contains("not exposed"));
    }

    #[tokio::test]
    async fn test_call_internal() {
        let table = table();
        assert_eq!(
            table
                .call_internal("private_method", BoundArguments::None)
                .await
                .unwrap(),
            json!("This should not be exposed")
        );
        assert!(table.call_internal("nope", BoundArguments::None).await.is_err());
    }

    #[test]
    fn test_register_replaces() {
        let mut table = table();
        table.register(
            "add",
            ParameterShape::new().variadic("values"),
            Visibility::Exposed,
            |_| async { Ok::<_, OperationError>(Value::Null) },
        );
        assert!(table.describe("add").unwrap().has_variadic());
    }
}
