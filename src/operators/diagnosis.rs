// SPDX-License-Identifier: MIT

//! Wafer-stage diagnosis rules
//!
//! Threshold checks on rotation error and the combined vacuum/rotation rule
//! used by the wafer-stage diagnosis graph.

use serde_json::Value;

use super::registry::{is_truthy, OperatorRegistry};
use crate::error::{OperatorError, OperatorResult};

pub const ROTATION_MEAN_OVER_300: &str = "op_gt_300";
pub const ROTATION_SIGMA_OVER_350: &str = "op_gt_350";
pub const VACUUM_LOW_AND_ROTATION_OVER_100: &str = "op_rule_vac_low_and_rot_gt_100";

/// Register the diagnosis rules, replacing same-named entries
pub fn register_diagnosis_operators(registry: &mut OperatorRegistry) {
    registry.register_s2t(ROTATION_MEAN_OVER_300, greater_than(300.0));
    registry.register_s2t(ROTATION_SIGMA_OVER_350, greater_than(350.0));
    registry.register_s2t(VACUUM_LOW_AND_ROTATION_OVER_100, vacuum_low_and_rotation_over_100);
}

/// Numeric threshold; anything but a number is an error
fn greater_than(limit: f64) -> impl Fn(&Value) -> OperatorResult<Value> + Send + Sync + 'static {
    move |value| {
        value
            .as_f64()
            .map(|v| Value::Bool(v > limit))
            .ok_or_else(|| OperatorError::new(format!("expected a number, got {}", value)))
    }
}

/// `vacuum == "Low" && rotation_mean > 100` over a rule aggregate.
///
/// Inputs are looked up by node id, then by parameter name. A rotation given
/// as text is parsed; text that is not a number makes the rule false.
fn vacuum_low_and_rotation_over_100(inputs: &Value) -> OperatorResult<Value> {
    let vacuum = input(inputs, "IND_VAC_LEVEL", "vacuum_level");
    let rotation = input(inputs, "IND_ROT_MEAN", "rotation_mean");

    let (Some(vacuum), Some(rotation)) = (vacuum, rotation) else {
        return Ok(Value::Bool(false));
    };

    let rotation = match rotation {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    };
    Ok(Value::Bool(
        vacuum == "Low" && rotation.is_some_and(|r| r > 100.0),
    ))
}

fn input<'a>(inputs: &'a Value, id: &str, name: &str) -> Option<&'a Value> {
    [id, name]
        .into_iter()
        .filter_map(|key| inputs.get(key))
        .find(|v| is_truthy(v))
}
