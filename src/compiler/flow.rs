// SPDX-License-Identifier: MIT

//! Flow-chart conversion
//!
//! A flow document lists steps with their outgoing transitions:
//! `[{ id, text, type, subsystem?, next: [{ target, condition? }] }]`.
//! Every step becomes a node. The formatted conditions of all transitions
//! into one target are joined with ` || ` into that target's expression.

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

use super::condition::format_condition;
use crate::graph::{ExpressionMap, Node, NodeCategory};

/// One step of a flow chart
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlowItem {
    #[serde(deserialize_with = "deserialize_flow_id")]
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "type")]
    pub category: NodeCategory,
    #[serde(default)]
    pub subsystem: Option<String>,
    #[serde(default)]
    pub next: Option<Vec<FlowTransition>>,
}

/// Edge of a flow chart, with the condition written on it
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlowTransition {
    #[serde(deserialize_with = "deserialize_flow_id")]
    pub target: String,
    #[serde(default)]
    pub condition: Option<String>,
}

/// Flow charts number their steps; ids may be strings or numbers
fn deserialize_flow_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlowId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match FlowId::deserialize(deserializer)? {
        FlowId::Text(text) => text.trim().to_string(),
        FlowId::Number(number) => number.to_string(),
    })
}

/// Convert flow steps into a node table and an expression map.
///
/// Nodes keep document order; expressions are ordered by the first
/// transition into each target.
pub fn flow_to_inputs(items: &[FlowItem]) -> (Vec<Node>, ExpressionMap) {
    let nodes: Vec<Node> = items
        .iter()
        .map(|item| {
            let node = Node::new(&item.id, &item.text, item.category);
            match &item.subsystem {
                Some(subsystem) => node.with_subsystem(subsystem),
                None => node,
            }
        })
        .collect();

    let mut targets: Vec<String> = Vec::new();
    let mut clauses: HashMap<String, Vec<String>> = HashMap::new();
    for item in items {
        for transition in item.next.iter().flatten() {
            let parts = clauses
                .entry(transition.target.clone())
                .or_insert_with(|| {
                    targets.push(transition.target.clone());
                    Vec::new()
                });
            parts.push(format_condition(&item.id, transition.condition.as_deref()));
        }
    }

    let mut expressions = ExpressionMap::new();
    for target in targets {
        if let Some(parts) = clauses.remove(&target) {
            expressions.insert(target, parts.join(" || "));
        }
    }

    log::debug!(
        "Converted flow: {} node(s), {} expression(s)",
        nodes.len(),
        expressions.len()
    );
    (nodes, expressions)
}
