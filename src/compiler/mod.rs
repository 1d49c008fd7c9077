// SPDX-License-Identifier: MIT

//! Expression compilation
//!
//! Condition expressions are plain text such as:
//! - `{3}||{4}||({5}||{6}||{7})`
//! - `({21} == 'Abnormal') || ({22} check '>10')`
//! - `{12}{do}`
//!
//! The [`Compiler`] writes the graph structure for each expression into a
//! [`Registry`](crate::graph::Registry). Flow charts are turned into node
//! tables and expressions by [`flow_to_inputs`].

mod clause;
mod condition;
mod expression;
mod flow;

use serde::{Deserialize, Serialize};

use crate::error::{FaultGraphError, Result};

pub use clause::{parse_clause, Clause};
pub use condition::format_condition;
pub use expression::{Compiler, Connective};
pub use flow::{flow_to_inputs, FlowItem, FlowTransition};

/// Compiler and id-range settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// First id handed out to virtual-group nodes
    pub virtual_id_start: u64,
    /// First id handed out to operator nodes
    pub operator_id_start: u64,
    /// Upper bound on group-resolution passes for one expression
    pub max_group_passes: usize,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            virtual_id_start: 10001,
            operator_id_start: 20001,
            max_group_passes: 256,
        }
    }
}

impl CompilerConfig {
    /// Reject id ranges that start together and a zero pass bound
    pub fn validate(&self) -> Result<()> {
        if self.virtual_id_start == self.operator_id_start {
            return Err(FaultGraphError::config(format!(
                "virtual and operator id ranges both start at {}",
                self.virtual_id_start
            )));
        }
        if self.max_group_passes == 0 {
            return Err(FaultGraphError::config("max_group_passes must be positive"));
        }
        Ok(())
    }
}
