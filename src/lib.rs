// SPDX-License-Identifier: MIT

//! Equipment fault diagnosis over compiled condition graphs.
//!
//! Condition text is compiled into a graph of entity, virtual-group and
//! operator nodes ([`compiler`]), stored in a [`graph::Registry`], and
//! evaluated against live indicator readings by the [`engine`], which
//! resolves symbolic bindings through an [`operators::OperatorRegistry`].

pub mod compiler;
pub mod engine;
pub mod error;
pub mod graph;
pub mod loader;
pub mod operators;

pub use compiler::{Compiler, CompilerConfig};
pub use engine::{DiagnosisResult, InferenceEngine};
pub use error::{FaultGraphError, OperatorError, Result};
pub use graph::{Edge, GraphDefinition, Node, NodeCategory, Registry};
pub use operators::OperatorRegistry;
