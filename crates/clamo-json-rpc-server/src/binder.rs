//! Parameter binding
//!
//! Checks a request's `params` against an operation's formal shape and
//! produces the arguments the operation is invoked with. Binding is all or
//! nothing: either every check passes or no arguments are produced.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::error::OperationError;
use crate::registry::{ParameterKind, ParameterShape};
use crate::request::RequestParams;

/// Arguments bound for one invocation
#[derive(Debug, Clone, PartialEq)]
pub enum BoundArguments {
    /// Called without params
    None,
    /// Called with an array, in order
    Positional(Vec<Value>),
    /// Called with an object
    Named(Map<String, Value>),
}

impl BoundArguments {
    pub fn len(&self) -> usize {
        match self {
            BoundArguments::None => 0,
            BoundArguments::Positional(values) => values.len(),
            BoundArguments::Named(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn positional(&self, index: usize) -> Option<&Value> {
        match self {
            BoundArguments::Positional(values) => values.get(index),
            _ => None,
        }
    }

    pub fn named(&self, name: &str) -> Option<&Value> {
        match self {
            BoundArguments::Named(map) => map.get(name),
            _ => None,
        }
    }

    /// Positional arguments from `start` onwards (the variadic tail)
    pub fn rest(&self, start: usize) -> &[Value] {
        match self {
            BoundArguments::Positional(values) if start < values.len() => &values[start..],
            _ => &[],
        }
    }

    /// Decode a required positional argument.
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, OperationError> {
        let value = self.positional(index).ok_or_else(|| {
            OperationError::failed(format!("missing positional argument {}", index))
        })?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Decode an optional positional argument; absent or null slots yield `None`.
    pub fn opt_arg<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, OperationError> {
        self.positional(index)
            .filter(|value| !value.is_null())
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(OperationError::from)
    }

    /// Decode a required named argument.
    pub fn named_arg<T: DeserializeOwned>(&self, name: &str) -> Result<T, OperationError> {
        let value = self
            .named(name)
            .ok_or_else(|| OperationError::failed(format!("missing named argument '{}'", name)))?;
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Decode an optional named argument; absent or null keys yield `None`.
    pub fn opt_named_arg<T: DeserializeOwned>(
        &self,
        name: &str,
    ) -> Result<Option<T>, OperationError> {
        self.named(name)
            .filter(|value| !value.is_null())
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(OperationError::from)
    }

    /// Decode the variadic tail starting at `start`.
    pub fn rest_args<T: DeserializeOwned>(&self, start: usize) -> Result<Vec<T>, OperationError> {
        self.rest(start)
            .iter()
            .map(|value| serde_json::from_value(value.clone()).map_err(OperationError::from))
            .collect()
    }
}

/// Why `params` do not fit an operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("operation cannot be called without arguments")]
    ArgumentsRequired,

    #[error("expected {expected} positional arguments, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("expected at least {minimum} positional arguments, got {actual}")]
    TooFewArguments { minimum: usize, actual: usize },

    #[error("operation requires named argument '{0}' and cannot be called positionally")]
    NamedArgumentsRequired(String),

    #[error("operation requires positional argument '{0}' and cannot be called with named arguments")]
    PositionalArgumentsRequired(String),

    #[error("missing required named argument '{0}'")]
    MissingNamedArgument(String),

    #[error("unrecognized named argument '{0}'")]
    UnknownNamedArgument(String),
}

/// Bind request params against a shape.
pub fn bind(
    shape: &ParameterShape,
    params: Option<RequestParams>,
) -> Result<BoundArguments, BindError> {
    match params {
        None => bind_absent(shape),
        Some(RequestParams::Array(values)) => bind_positional(shape, values),
        Some(RequestParams::Object(map)) => bind_named(shape, map),
    }
}

fn bind_absent(shape: &ParameterShape) -> Result<BoundArguments, BindError> {
    let needs_arguments = shape.parameters().iter().any(|p| {
        matches!(
            p.kind,
            ParameterKind::RequiredPositional | ParameterKind::RequiredNamed
        )
    });
    if needs_arguments {
        return Err(BindError::ArgumentsRequired);
    }
    Ok(BoundArguments::None)
}

fn bind_positional(
    shape: &ParameterShape,
    values: Vec<Value>,
) -> Result<BoundArguments, BindError> {
    if let Some(name) = shape.names_of(ParameterKind::RequiredNamed).next() {
        return Err(BindError::NamedArgumentsRequired(name.to_string()));
    }

    let required = shape.required_positional();
    let actual = values.len();

    if shape.has_variadic() {
        if actual < required {
            return Err(BindError::TooFewArguments {
                minimum: required,
                actual,
            });
        }
    } else {
        let expected = required + shape.optional_positional();
        if actual != expected {
            return Err(BindError::ArityMismatch { expected, actual });
        }
    }

    Ok(BoundArguments::Positional(values))
}

fn bind_named(
    shape: &ParameterShape,
    map: Map<String, Value>,
) -> Result<BoundArguments, BindError> {
    if let Some(name) = shape.names_of(ParameterKind::RequiredPositional).next() {
        return Err(BindError::PositionalArgumentsRequired(name.to_string()));
    }

    if let Some(name) = shape
        .names_of(ParameterKind::RequiredNamed)
        .find(|name| !map.contains_key(*name))
    {
        return Err(BindError::MissingNamedArgument(name.to_string()));
    }

    if let Some(key) = map.keys().find(|key| !shape.is_named_parameter(key)) {
        return Err(BindError::UnknownNamedArgument(key.clone()));
    }

    Ok(BoundArguments::Named(map))
}
