//! Operation registry
//!
//! A host tells the dispatcher which operations it exposes and what their
//! formal parameters look like. The registry takes a read-only snapshot of
//! that surface so resolution never calls back into the host.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::binder::BoundArguments;
use crate::error::ToJsonRpcError;

/// Kind of one formal parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    RequiredPositional,
    OptionalPositional,
    VariadicPositional,
    RequiredNamed,
    OptionalNamed,
}

impl ParameterKind {
    pub fn is_positional(&self) -> bool {
        matches!(
            self,
            ParameterKind::RequiredPositional
                | ParameterKind::OptionalPositional
                | ParameterKind::VariadicPositional
        )
    }

    pub fn is_named(&self) -> bool {
        !self.is_positional()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub kind: ParameterKind,
    pub name: String,
}

/// Formal parameter list of an operation, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterShape {
    parameters: Vec<Parameter>,
}

impl ParameterShape {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: ParameterKind, name: impl Into<String>) -> Self {
        self.parameters.push(Parameter {
            kind,
            name: name.into(),
        });
        self
    }

    pub fn required(self, name: impl Into<String>) -> Self {
        self.with(ParameterKind::RequiredPositional, name)
    }

    pub fn optional(self, name: impl Into<String>) -> Self {
        self.with(ParameterKind::OptionalPositional, name)
    }

    pub fn variadic(self, name: impl Into<String>) -> Self {
        self.with(ParameterKind::VariadicPositional, name)
    }

    pub fn required_named(self, name: impl Into<String>) -> Self {
        self.with(ParameterKind::RequiredNamed, name)
    }

    pub fn optional_named(self, name: impl Into<String>) -> Self {
        self.with(ParameterKind::OptionalNamed, name)
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    fn count(&self, kind: ParameterKind) -> usize {
        self.parameters.iter().filter(|p| p.kind == kind).count()
    }

    pub fn required_positional(&self) -> usize {
        self.count(ParameterKind::RequiredPositional)
    }

    pub fn optional_positional(&self) -> usize {
        self.count(ParameterKind::OptionalPositional)
    }

    pub fn has_variadic(&self) -> bool {
        self.count(ParameterKind::VariadicPositional) > 0
    }

    pub fn names_of(&self, kind: ParameterKind) -> impl Iterator<Item = &str> {
        self.parameters
            .iter()
            .filter(move |p| p.kind == kind)
            .map(|p| p.name.as_str())
    }

    pub fn is_named_parameter(&self, name: &str) -> bool {
        self.parameters
            .iter()
            .any(|p| p.kind.is_named() && p.name == name)
    }

    /// Check the parameter list is one a real operation could declare.
    pub fn validate(&self) -> Result<(), ShapeError> {
        let mut seen = HashSet::new();
        let mut optional_seen = false;
        let mut variadic_seen = false;

        for parameter in &self.parameters {
            if !seen.insert(parameter.name.as_str()) {
                return Err(ShapeError::DuplicateParameter(parameter.name.clone()));
            }
            match parameter.kind {
                ParameterKind::RequiredPositional => {
                    if variadic_seen {
                        return Err(ShapeError::PositionalAfterVariadic(parameter.name.clone()));
                    }
                    if optional_seen {
                        return Err(ShapeError::RequiredAfterOptional(parameter.name.clone()));
                    }
                }
                ParameterKind::OptionalPositional => {
                    if variadic_seen {
                        return Err(ShapeError::PositionalAfterVariadic(parameter.name.clone()));
                    }
                    optional_seen = true;
                }
                ParameterKind::VariadicPositional => {
                    if variadic_seen {
                        return Err(ShapeError::MultipleVariadic);
                    }
                    variadic_seen = true;
                }
                ParameterKind::RequiredNamed | ParameterKind::OptionalNamed => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("parameter '{0}' is declared more than once")]
    DuplicateParameter(String),

    #[error("required positional parameter '{0}' follows an optional one")]
    RequiredAfterOptional(String),

    #[error("positional parameter '{0}' follows the variadic slot")]
    PositionalAfterVariadic(String),

    #[error("only one variadic positional slot is allowed")]
    MultipleVariadic,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("operation '{0}' is listed but the host does not describe it")]
    UndescribedOperation(String),

    #[error("operation '{0}' is listed more than once")]
    DuplicateOperation(String),

    #[error("operation '{operation}' has an invalid parameter shape: {source}")]
    InvalidShape {
        operation: String,
        #[source]
        source: ShapeError,
    },
}

/// The callable surface a dispatcher serves.
///
/// Only names returned by [`OperationHost::list_operations`] are ever
/// resolved. `describe` may know about more operations than are listed;
/// those stay unreachable from JSON-RPC.
#[async_trait]
pub trait OperationHost: Send + Sync + 'static {
    /// The error type returned by operations
    type Error: ToJsonRpcError;

    /// Names of the operations exposed to callers
    fn list_operations(&self) -> Vec<String>;

    /// Formal parameters of a named operation, without invoking it
    fn describe(&self, name: &str) -> Option<ParameterShape>;

    /// Run an operation with arguments already bound against its shape
    async fn invoke(&self, name: &str, args: BoundArguments) -> Result<Value, Self::Error>;
}

/// Name and shape of one exposed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub name: String,
    pub shape: ParameterShape,
}

/// Read-only snapshot of a host's exposed operations
#[derive(Debug, Clone, Default)]
pub struct OperationRegistry {
    operations: HashMap<String, Arc<OperationDescriptor>>,
}

impl OperationRegistry {
    /// Snapshot the host's exposed surface, validating every shape.
    pub fn from_host<H>(host: &H) -> Result<Self, RegistryError>
    where
        H: OperationHost + ?Sized,
    {
        let mut operations = HashMap::new();

        for name in host.list_operations() {
            if operations.contains_key(&name) {
                return Err(RegistryError::DuplicateOperation(name));
            }
            let shape = host
                .describe(&name)
                .ok_or_else(|| RegistryError::UndescribedOperation(name.clone()))?;
            shape
                .validate()
                .map_err(|source| RegistryError::InvalidShape {
                    operation: name.clone(),
                    source,
                })?;
            let descriptor = Arc::new(OperationDescriptor {
                name: name.clone(),
                shape,
            });
            operations.insert(name, descriptor);
        }

        Ok(Self { operations })
    }

    /// Exact, case-sensitive lookup
    pub fn resolve(&self, name: &str) -> Option<Arc<OperationDescriptor>> {
        self.operations.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operations.contains_key(name)
    }

    /// Exposed operation names, sorted
    pub fn operation_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.operations.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}
