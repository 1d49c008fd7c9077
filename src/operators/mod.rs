// SPDX-License-Identifier: MIT

//! Operator bindings
//!
//! Graph nodes and edges refer to behavior by symbolic name only. The
//! [`OperatorRegistry`] is the single place where those names get real
//! callables, which lets sensor adapters and test fixtures plug in without
//! touching the compiler or the engine.

pub mod builtin;
pub mod diagnosis;
mod registry;

pub use builtin::register_builtins;
pub use diagnosis::register_diagnosis_operators;
pub use registry::{
    is_truthy, DataSourceFn, DataSourceOp, OperatorRegistry, PredicateOp, SourceToTargetFn,
    TransformOp,
};
