// SPDX-License-Identifier: MIT

//! Diagnosis graph model
//!
//! This module provides the node/edge types and the [`Registry`] that owns a
//! compiled graph.

pub mod registry;
pub mod types;

pub use registry::{Checkpoint, GraphMapping, GraphStats, IdRanges, Registry};
pub use types::{
    strip_braces, Condition, Edge, ExpressionMap, GraphDefinition, Node, NodeAttributes,
    NodeCategory, NodeTable,
};
