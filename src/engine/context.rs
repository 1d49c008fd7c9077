// SPDX-License-Identifier: MIT

//! Run-scoped inference state
//!
//! [`InferenceContext`] is the only mutable state of a diagnostic run: the
//! visited set, the indicator snapshot and the accumulating results. Each run
//! owns a fresh context, so runs never share it.

use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use super::result::DiagnosisResult;

/// Phase of a diagnostic run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    CollectingIndicators,
    Propagating,
    Done,
}

#[derive(Debug)]
pub struct InferenceContext {
    state: RunState,
    /// Node positions already expanded during this run
    visited: HashSet<usize>,
    /// Indicator values by node position
    values: HashMap<usize, Value>,
    snapshot: BTreeMap<String, Option<Value>>,
    activated_root_causes: Vec<String>,
    activated_paths: Vec<Vec<String>>,
}

impl InferenceContext {
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
            visited: HashSet::new(),
            values: HashMap::new(),
            snapshot: BTreeMap::new(),
            activated_root_causes: Vec::new(),
            activated_paths: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn transition(&mut self, next: RunState) {
        log::debug!("Run state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Record an indicator reading; `None` and JSON `null` are both absent
    pub fn record_indicator(&mut self, position: usize, id: &str, value: Option<Value>) {
        let value = value.filter(|v| !v.is_null());
        if let Some(v) = &value {
            self.values.insert(position, v.clone());
        }
        self.snapshot.insert(id.to_string(), value);
    }

    pub fn indicator_value(&self, position: usize) -> Option<&Value> {
        self.values.get(&position)
    }

    /// Mark a node visited. Returns `false` if it already was.
    pub fn visit(&mut self, position: usize) -> bool {
        self.visited.insert(position)
    }

    pub fn is_visited(&self, position: usize) -> bool {
        self.visited.contains(&position)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn record_root_cause(&mut self, id: &str, path: Vec<String>) {
        log::info!("Activated root cause {} via {}", id, path.join(" -> "));
        self.activated_root_causes.push(id.to_string());
        self.activated_paths.push(path);
    }

    pub fn into_result(self) -> DiagnosisResult {
        DiagnosisResult {
            run_id: Uuid::new_v4(),
            activated_root_causes: self.activated_root_causes,
            activated_paths: self.activated_paths,
            timestamp: Utc::now(),
            indicator_snapshot: self.snapshot,
        }
    }
}

impl Default for InferenceContext {
    fn default() -> Self {
        Self::new()
    }
}
