// SPDX-License-Identifier: MIT

//! Operator registry
//!
//! Name -> callable bindings in two namespaces: data sources (nullary) and
//! source-to-target ("s2t") functions (unary). An s2t function is used as a
//! predicate or as a transform depending on where the engine calls it.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{FaultGraphError, OperatorResult, Result};

/// Nullary function supplying an indicator's current value
pub type DataSourceFn = dyn Fn() -> OperatorResult<Value> + Send + Sync;

/// Unary function bound to an edge
pub type SourceToTargetFn = dyn Fn(&Value) -> OperatorResult<Value> + Send + Sync;

/// Resolved data-source handle
#[derive(Clone)]
pub struct DataSourceOp {
    name: String,
    func: Arc<DataSourceFn>,
}

impl DataSourceOp {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read(&self) -> Result<Value> {
        (self.func)().map_err(|e| FaultGraphError::DataSourceFailure {
            name: self.name.clone(),
            message: e.to_string(),
        })
    }
}

/// Resolved s2t handle used as an activation decision
#[derive(Clone)]
pub struct PredicateOp {
    name: String,
    func: Arc<SourceToTargetFn>,
}

impl PredicateOp {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the function and read its result as a truth value
    pub fn test(&self, input: &Value) -> Result<bool> {
        (self.func)(input)
            .map(|v| is_truthy(&v))
            .map_err(|e| FaultGraphError::PredicateFailure {
                name: self.name.clone(),
                message: e.to_string(),
            })
    }
}

/// Resolved s2t handle used to transform a value
#[derive(Clone)]
pub struct TransformOp {
    name: String,
    func: Arc<SourceToTargetFn>,
}

impl TransformOp {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, input: &Value) -> Result<Value> {
        (self.func)(input).map_err(|e| FaultGraphError::PredicateFailure {
            name: self.name.clone(),
            message: e.to_string(),
        })
    }
}

macro_rules! debug_by_name {
    ($($ty:ident),*) => {
        $(impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty)).field("name", &self.name).finish()
            }
        })*
    };
}

debug_by_name!(DataSourceOp, PredicateOp, TransformOp);

/// Registry of operator callables, keyed by symbolic name
#[derive(Clone, Default)]
pub struct OperatorRegistry {
    data_sources: HashMap<String, Arc<DataSourceFn>>,
    s2t: HashMap<String, Arc<SourceToTargetFn>>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a data source
    pub fn register_data_source<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn() -> OperatorResult<Value> + Send + Sync + 'static,
    {
        self.data_sources.insert(name.into(), Arc::new(func));
    }

    /// Replace a data source with one that always returns `value`
    pub fn register_fixed_value(&mut self, name: impl Into<String>, value: Value) {
        self.register_data_source(name, move || Ok(value.clone()));
    }

    /// Register (or replace) an s2t function
    pub fn register_s2t<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&Value) -> OperatorResult<Value> + Send + Sync + 'static,
    {
        self.s2t.insert(name.into(), Arc::new(func));
    }

    /// Register an infallible boolean s2t function
    pub fn register_predicate<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.register_s2t(name, move |v| Ok(Value::Bool(func(v))));
    }

    pub fn resolve_data_source(&self, name: &str) -> Result<DataSourceOp> {
        self.data_sources
            .get(name)
            .map(|func| DataSourceOp {
                name: name.to_string(),
                func: func.clone(),
            })
            .ok_or_else(|| FaultGraphError::unknown_operator(name))
    }

    pub fn resolve_predicate(&self, name: &str) -> Result<PredicateOp> {
        self.resolve_s2t(name).map(|func| PredicateOp {
            name: name.to_string(),
            func,
        })
    }

    pub fn resolve_transform(&self, name: &str) -> Result<TransformOp> {
        self.resolve_s2t(name).map(|func| TransformOp {
            name: name.to_string(),
            func,
        })
    }

    fn resolve_s2t(&self, name: &str) -> Result<Arc<SourceToTargetFn>> {
        self.s2t
            .get(name)
            .cloned()
            .ok_or_else(|| FaultGraphError::unknown_operator(name))
    }

    /// Sorted names of registered data sources
    pub fn data_source_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.data_sources.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Sorted names of registered s2t functions
    pub fn s2t_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.s2t.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for OperatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorRegistry")
            .field("data_sources", &self.data_source_names())
            .field("s2t", &self.s2t_names())
            .finish()
    }
}

/// Truth value of a JSON value: `null`, `false`, `0`, `""`, `[]` and `{}`
/// are false, everything else is true.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
