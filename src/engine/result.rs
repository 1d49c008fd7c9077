// SPDX-License-Identifier: MIT

//! Diagnostic run result

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::graph::Registry;

/// Outcome of one diagnostic run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub run_id: Uuid,
    /// Activated root-cause ids, in discovery order
    pub activated_root_causes: Vec<String>,
    /// First-discovered path for each activated root cause (same order)
    pub activated_paths: Vec<Vec<String>>,
    pub timestamp: DateTime<Utc>,
    /// Reading per indicator; `None` when the read failed or was unbound
    pub indicator_snapshot: BTreeMap<String, Option<Value>>,
}

impl DiagnosisResult {
    pub fn is_empty(&self) -> bool {
        self.activated_root_causes.is_empty()
    }

    /// Path that activated `root_cause`, if it was activated
    pub fn path_to(&self, root_cause: &str) -> Option<&[String]> {
        self.activated_root_causes
            .iter()
            .position(|id| id == root_cause)
            .and_then(|i| self.activated_paths.get(i))
            .map(|p| p.as_slice())
    }

    /// Human-readable report using node names from `registry`
    pub fn summary(&self, registry: &Registry) -> String {
        let label = |id: &str| {
            registry
                .get(id)
                .map(|n| n.name.clone())
                .unwrap_or_else(|| id.to_string())
        };

        let mut out = String::new();
        if self.activated_root_causes.is_empty() {
            out.push_str("No root cause activated\n");
        } else {
            out.push_str(&format!(
                "Activated root causes ({}):\n",
                self.activated_root_causes.len()
            ));
            for (id, path) in self.activated_root_causes.iter().zip(&self.activated_paths) {
                let classification = registry
                    .get(id)
                    .and_then(|n| n.attributes.classification.clone())
                    .unwrap_or_else(|| "unclassified".to_string());
                out.push_str(&format!("  - {} ({})\n", label(id), classification));
                let steps: Vec<String> = path.iter().map(|p| label(p)).collect();
                out.push_str(&format!("    path: {}\n", steps.join(" -> ")));
            }
        }

        let absent = self
            .indicator_snapshot
            .values()
            .filter(|v| v.is_none())
            .count();
        out.push_str(&format!(
            "Indicators read: {} ({} absent)\n",
            self.indicator_snapshot.len(),
            absent
        ));
        out
    }
}
