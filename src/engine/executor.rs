// SPDX-License-Identifier: MIT

//! Graph inference engine
//!
//! A run reads every indicator, then walks the graph depth-first from each
//! indicator with a value. Edges activate through their bound predicate;
//! rule-logic nodes aggregate all of their inputs before evaluating their
//! outgoing edges; root causes are recorded with the path that reached them.

use serde_json::{Map, Value};

use super::context::{InferenceContext, RunState};
use super::result::DiagnosisResult;
use crate::graph::{NodeCategory, Registry};
use crate::operators::{DataSourceOp, OperatorRegistry, PredicateOp, TransformOp};

/// A binding as seen by the engine after load-time resolution
#[derive(Debug, Clone)]
enum Binding<T> {
    Unbound,
    Unresolved(String),
    Resolved(T),
}

impl<T> Binding<T> {
    fn resolve<F>(name: Option<&str>, resolve: F) -> Self
    where
        F: FnOnce(&str) -> crate::error::Result<T>,
    {
        match name {
            None => Binding::Unbound,
            Some(name) => match resolve(name) {
                Ok(op) => Binding::Resolved(op),
                Err(e) => {
                    log::warn!("{}; binding will never activate", e);
                    Binding::Unresolved(name.to_string())
                }
            },
        }
    }
}

#[derive(Debug)]
struct IndicatorPlan {
    node: usize,
    source: Binding<DataSourceOp>,
}

/// One edge with both endpoints present and its s2t function resolved
#[derive(Debug)]
struct EdgePlan {
    source: usize,
    target: usize,
    predicate: Binding<PredicateOp>,
    transform: Binding<TransformOp>,
}

/// Pending step of the depth-first walk
struct Frame {
    node: usize,
    value: Value,
    path: Vec<String>,
}

/// Executes diagnostic runs over a compiled graph.
///
/// Operator names are resolved once, when the engine is built; replacing an
/// operator afterwards requires building a new engine. The engine itself is
/// read-only during a run, so one engine can serve any number of runs.
pub struct InferenceEngine<'g> {
    registry: &'g Registry,
    indicators: Vec<IndicatorPlan>,
    edges: Vec<EdgePlan>,
    /// Edge plan indices by source position, in registration order
    outgoing: Vec<Vec<usize>>,
    /// Edge plan indices by target position, in registration order
    incoming: Vec<Vec<usize>>,
}

impl<'g> InferenceEngine<'g> {
    pub fn new(registry: &'g Registry, operators: &OperatorRegistry) -> Self {
        let node_count = registry.nodes().len();

        let indicators = registry
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, n)| n.category == NodeCategory::Indicator)
            .map(|(node, n)| IndicatorPlan {
                node,
                source: Binding::resolve(n.operator_binding.as_deref(), |name| {
                    operators.resolve_data_source(name)
                }),
            })
            .collect();

        let mut edges = Vec::new();
        let mut outgoing = vec![Vec::new(); node_count];
        let mut incoming = vec![Vec::new(); node_count];

        for edge in registry.edges() {
            let (Some(source), Some(target)) =
                (registry.position(&edge.source), registry.position(&edge.target))
            else {
                log::warn!(
                    "Skipping edge {} -> {}: unknown endpoint",
                    edge.source,
                    edge.target
                );
                continue;
            };

            let binding = edge.operator_binding.as_deref();
            let index = edges.len();
            edges.push(EdgePlan {
                source,
                target,
                predicate: Binding::resolve(binding, |name| operators.resolve_predicate(name)),
                transform: Binding::resolve(binding, |name| operators.resolve_transform(name)),
            });
            outgoing[source].push(index);
            incoming[target].push(index);
        }

        Self {
            registry,
            indicators,
            edges,
            outgoing,
            incoming,
        }
    }

    /// Binding names that did not resolve, in graph order
    pub fn unresolved_bindings(&self) -> Vec<&str> {
        let nodes = self.indicators.iter().filter_map(|p| match &p.source {
            Binding::Unresolved(name) => Some(name.as_str()),
            _ => None,
        });
        let edges = self.edges.iter().filter_map(|p| match &p.predicate {
            Binding::Unresolved(name) => Some(name.as_str()),
            _ => None,
        });
        nodes.chain(edges).collect()
    }

    /// Execute one diagnostic run
    pub fn run(&self) -> DiagnosisResult {
        let mut ctx = InferenceContext::new();

        ctx.transition(RunState::CollectingIndicators);
        self.collect_indicators(&mut ctx);

        ctx.transition(RunState::Propagating);
        for plan in &self.indicators {
            if let Some(value) = ctx.indicator_value(plan.node).cloned() {
                self.propagate(plan.node, value, &mut ctx);
            }
        }

        ctx.transition(RunState::Done);
        let result = ctx.into_result();
        log::info!(
            "Diagnosis finished: {} root cause(s) from {} indicator(s)",
            result.activated_root_causes.len(),
            result.indicator_snapshot.len()
        );
        result
    }

    fn collect_indicators(&self, ctx: &mut InferenceContext) {
        for plan in &self.indicators {
            let node = &self.registry.nodes()[plan.node];
            let value = match &plan.source {
                Binding::Resolved(op) => match op.read() {
                    Ok(value) => {
                        log::info!(
                            "Read {} ({}): {} {}",
                            node.name,
                            node.id,
                            value,
                            node.attributes.unit.as_deref().unwrap_or_default()
                        );
                        Some(value)
                    }
                    Err(e) => {
                        log::warn!("Read {} ({}) failed: {}", node.name, node.id, e);
                        None
                    }
                },
                Binding::Unresolved(name) => {
                    log::warn!("Indicator {} has unknown data source '{}'", node.id, name);
                    None
                }
                Binding::Unbound => {
                    log::warn!("Indicator {} has no data source", node.id);
                    None
                }
            };
            ctx.record_indicator(plan.node, &node.id, value);
        }
    }

    /// Depth-first walk from `start` carrying `value`
    fn propagate(&self, start: usize, value: Value, ctx: &mut InferenceContext) {
        let nodes = self.registry.nodes();
        let mut stack = vec![Frame {
            node: start,
            value,
            path: vec![nodes[start].id.clone()],
        }];

        while let Some(frame) = stack.pop() {
            let node = &nodes[frame.node];
            if !ctx.visit(frame.node) {
                continue;
            }

            if node.category == NodeCategory::RootCause {
                ctx.record_root_cause(&node.id, frame.path);
                continue;
            }

            let carried = if node.category == NodeCategory::RuleLogic {
                self.aggregate(frame.node, ctx)
            } else {
                frame.value
            };

            let next: Vec<Frame> = self.outgoing[frame.node]
                .iter()
                .map(|&i| &self.edges[i])
                .filter(|plan| !ctx.is_visited(plan.target) && self.activates(plan, &carried))
                .map(|plan| {
                    let mut path = frame.path.clone();
                    path.push(nodes[plan.target].id.clone());
                    Frame {
                        node: plan.target,
                        value: carried.clone(),
                        path,
                    }
                })
                .collect();

            // Reversed so the first edge is expanded first
            stack.extend(next.into_iter().rev());
        }
    }

    /// Combine every input of a rule-logic node into one keyed value
    fn aggregate(&self, rule: usize, ctx: &InferenceContext) -> Value {
        let nodes = self.registry.nodes();
        let mut inputs = Map::new();

        for plan in self.incoming[rule].iter().map(|&i| &self.edges[i]) {
            let source = &nodes[plan.source];
            let raw = if source.category == NodeCategory::Indicator {
                ctx.indicator_value(plan.source)
                    .cloned()
                    .unwrap_or(Value::Null)
            } else {
                Value::String(source.id.clone())
            };

            let value = match &plan.transform {
                Binding::Resolved(op) => op.apply(&raw).unwrap_or_else(|e| {
                    log::warn!("{}; passing {} through unchanged", e, source.id);
                    raw
                }),
                _ => raw,
            };
            inputs.insert(source.id.clone(), value);
        }

        log::debug!(
            "Aggregated rule {}: {}",
            nodes[rule].id,
            Value::Object(inputs.clone())
        );
        Value::Object(inputs)
    }

    /// Whether an edge activates for `value`; every failure means "no"
    fn activates(&self, plan: &EdgePlan, value: &Value) -> bool {
        match &plan.predicate {
            Binding::Unbound | Binding::Unresolved(_) => false,
            Binding::Resolved(op) => match op.test(value) {
                Ok(activated) => activated,
                Err(e) => {
                    log::warn!("{}", e);
                    false
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OperatorError;
    use crate::graph::{Edge, Node};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn indicator(id: &str, source: &str) -> Node {
        Node::new(id, id, NodeCategory::Indicator).with_binding(source)
    }

    fn node(id: &str, category: NodeCategory) -> Node {
        Node::new(id, id, category)
    }

    fn edge(source: &str, target: &str, s2t: Option<&str>) -> Edge {
        let edge = Edge::new(source, target, "INFERS");
        match s2t {
            Some(name) => edge.with_binding(name),
            None => edge,
        }
    }

    fn path(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn operators() -> OperatorRegistry {
        let mut ops = OperatorRegistry::new();
        ops.register_predicate("always", |_| true);
        ops.register_predicate("gt_300", |v| v.as_f64().is_some_and(|f| f > 300.0));
        ops.register_s2t("pass", |v| Ok(v.clone()));
        ops
    }

    #[test]
    fn test_single_edge_activation() {
        let mut registry = Registry::new();
        registry.register(indicator("IND", "read"));
        registry.register(node("RC", NodeCategory::RootCause));
        registry.add_edge(edge("IND", "RC", Some("gt_300")));

        let mut ops = operators();
        ops.register_fixed_value("read", json!(350));
        let result = InferenceEngine::new(&registry, &ops).run();

        assert_eq!(result.activated_root_causes, vec!["RC"]);
        assert_eq!(result.activated_paths, vec![path(&["IND", "RC"])]);

        ops.register_fixed_value("read", json!(250));
        let result = InferenceEngine::new(&registry, &ops).run();
        assert!(result.is_empty());
    }

    #[test]
    fn test_walk_through_intermediate_nodes() {
        let mut registry = Registry::new();
        registry.register(indicator("IND", "read"));
        registry.register(node("COMP", NodeCategory::Component));
        registry.register(node("SUB", NodeCategory::Subsystem));
        registry.register(node("RC", NodeCategory::RootCause));
        registry.add_edge(edge("IND", "COMP", Some("always")));
        registry.add_edge(edge("COMP", "SUB", Some("gt_300")));
        registry.add_edge(edge("SUB", "RC", Some("always")));

        let mut ops = operators();
        ops.register_fixed_value("read", json!(400));
        let result = InferenceEngine::new(&registry, &ops).run();

        assert_eq!(result.activated_paths, vec![path(&["IND", "COMP", "SUB", "RC"])]);
    }

    #[test]
    fn test_unbound_edge_never_activates() {
        let mut registry = Registry::new();
        registry.register(indicator("IND", "read"));
        registry.register(node("RC", NodeCategory::RootCause));
        registry.add_edge(edge("IND", "RC", None));

        let mut ops = operators();
        ops.register_fixed_value("read", json!(true));
        let result = InferenceEngine::new(&registry, &ops).run();

        assert!(result.is_empty());
    }

    #[test]
    fn test_unknown_binding_is_reported_and_inactive() {
        let mut registry = Registry::new();
        registry.register(indicator("IND", "read"));
        registry.register(indicator("IND_MISSING", "no_such_source"));
        registry.register(node("RC", NodeCategory::RootCause));
        registry.add_edge(edge("IND", "RC", Some("no_such_rule")));

        let mut ops = operators();
        ops.register_fixed_value("read", json!(1));
        let engine = InferenceEngine::new(&registry, &ops);

        assert_eq!(
            engine.unresolved_bindings(),
            vec!["no_such_source", "no_such_rule"]
        );
        let result = engine.run();
        assert!(result.is_empty());
        assert_eq!(result.indicator_snapshot.get("IND_MISSING"), Some(&None));
    }

    #[test]
    fn test_failing_predicate_is_isolated() {
        let mut registry = Registry::new();
        registry.register(indicator("IND", "read"));
        registry.register(node("RC_A", NodeCategory::RootCause));
        registry.register(node("RC_B", NodeCategory::RootCause));
        registry.add_edge(edge("IND", "RC_A", Some("explode")));
        registry.add_edge(edge("IND", "RC_B", Some("always")));

        let mut ops = operators();
        ops.register_fixed_value("read", json!(1));
        ops.register_s2t("explode", |_| Err(OperatorError::new("boom")));
        let result = InferenceEngine::new(&registry, &ops).run();

        assert_eq!(result.activated_root_causes, vec!["RC_B"]);
    }

    #[test]
    fn test_cycle_terminates() {
        let mut registry = Registry::new();
        registry.register(indicator("IND", "read"));
        registry.register(node("A", NodeCategory::Entity));
        registry.register(node("B", NodeCategory::Entity));
        registry.register(node("RC", NodeCategory::RootCause));
        registry.add_edge(edge("IND", "A", Some("always")));
        registry.add_edge(edge("A", "B", Some("always")));
        registry.add_edge(edge("B", "A", Some("always")));
        registry.add_edge(edge("B", "IND", Some("always")));
        registry.add_edge(edge("B", "RC", Some("always")));

        let mut ops = operators();
        ops.register_fixed_value("read", json!(1));
        let result = InferenceEngine::new(&registry, &ops).run();

        assert_eq!(result.activated_paths, vec![path(&["IND", "A", "B", "RC"])]);
    }

    #[test]
    fn test_root_cause_recorded_once_with_first_path() {
        let mut registry = Registry::new();
        registry.register(indicator("IND_1", "read_1"));
        registry.register(indicator("IND_2", "read_2"));
        registry.register(node("RC", NodeCategory::RootCause));
        registry.add_edge(edge("IND_1", "RC", Some("always")));
        registry.add_edge(edge("IND_2", "RC", Some("always")));

        let mut ops = operators();
        ops.register_fixed_value("read_1", json!(1));
        ops.register_fixed_value("read_2", json!(2));
        let result = InferenceEngine::new(&registry, &ops).run();

        assert_eq!(result.activated_root_causes, vec!["RC"]);
        assert_eq!(result.activated_paths, vec![path(&["IND_1", "RC"])]);
    }

    #[test]
    fn test_depth_first_order() {
        let mut registry = Registry::new();
        registry.register(indicator("IND", "read"));
        registry.register(node("A", NodeCategory::Entity));
        registry.register(node("B", NodeCategory::Entity));
        registry.register(node("RC_A", NodeCategory::RootCause));
        registry.register(node("RC_B", NodeCategory::RootCause));
        registry.add_edge(edge("IND", "A", Some("always")));
        registry.add_edge(edge("IND", "B", Some("always")));
        registry.add_edge(edge("A", "RC_A", Some("always")));
        registry.add_edge(edge("B", "RC_B", Some("always")));

        let mut ops = operators();
        ops.register_fixed_value("read", json!(1));
        let result = InferenceEngine::new(&registry, &ops).run();

        assert_eq!(result.activated_root_causes, vec!["RC_A", "RC_B"]);
    }

    #[test]
    fn test_rule_aggregates_all_inputs() {
        let mut registry = Registry::new();
        registry.register(indicator("A", "read_a"));
        registry.register(indicator("B", "read_b"));
        registry.register(node("COMP", NodeCategory::Component));
        registry.register(node("RULE", NodeCategory::RuleLogic));
        registry.register(node("RC", NodeCategory::RootCause));
        registry.add_edge(edge("A", "RULE", Some("pass")));
        registry.add_edge(edge("B", "RULE", Some("pass")));
        registry.add_edge(edge("COMP", "RULE", None));
        registry.add_edge(edge("RULE", "RC", Some("check_inputs")));

        let mut ops = operators();
        ops.register_fixed_value("read_a", json!("Low"));
        ops.register_fixed_value("read_b", json!(150));
        ops.register_predicate("check_inputs", |v| {
            *v == json!({"A": "Low", "B": 150, "COMP": "COMP"})
        });
        let result = InferenceEngine::new(&registry, &ops).run();

        assert_eq!(result.activated_root_causes, vec!["RC"]);
        assert_eq!(result.activated_paths, vec![path(&["A", "RULE", "RC"])]);
    }

    #[test]
    fn test_rule_uses_transformed_values() {
        let mut registry = Registry::new();
        registry.register(indicator("A", "read_a"));
        registry.register(node("RULE", NodeCategory::RuleLogic));
        registry.register(node("RC", NodeCategory::RootCause));
        registry.add_edge(edge("A", "RULE", Some("double")));
        registry.add_edge(edge("RULE", "RC", Some("a_is_20")));

        let mut ops = operators();
        ops.register_fixed_value("read_a", json!(10));
        ops.register_s2t("double", |v| {
            v.as_f64()
                .map(|f| json!(f * 2.0))
                .ok_or_else(|| OperatorError::new("not a number"))
        });
        ops.register_predicate("a_is_20", |v| v["A"].as_f64() == Some(20.0));
        let result = InferenceEngine::new(&registry, &ops).run();

        assert_eq!(result.activated_root_causes, vec!["RC"]);
    }

    #[test]
    fn test_failed_data_source_records_absent() {
        let mut registry = Registry::new();
        registry.register(indicator("IND", "broken"));
        registry.register(node("RC", NodeCategory::RootCause));
        registry.add_edge(edge("IND", "RC", Some("always")));

        let mut ops = operators();
        ops.register_data_source("broken", || Err(OperatorError::new("sensor offline")));
        let result = InferenceEngine::new(&registry, &ops).run();

        assert!(result.is_empty());
        assert_eq!(result.indicator_snapshot.get("IND"), Some(&None));
    }

    #[test]
    fn test_edges_with_unknown_endpoints_are_skipped() {
        let mut registry = Registry::new();
        registry.register(indicator("IND", "read"));
        registry.register(node("RC", NodeCategory::RootCause));
        registry.add_edge(edge("IND", "GHOST", Some("always")));
        registry.add_edge(edge("IND", "RC", Some("always")));

        let mut ops = operators();
        ops.register_fixed_value("read", json!(1));
        let result = InferenceEngine::new(&registry, &ops).run();

        assert_eq!(result.activated_root_causes, vec!["RC"]);
    }

    #[test]
    fn test_runs_are_independent() {
        let mut registry = Registry::new();
        registry.register(indicator("IND", "read"));
        registry.register(node("RC", NodeCategory::RootCause));
        registry.add_edge(edge("IND", "RC", Some("always")));

        let mut ops = operators();
        ops.register_fixed_value("read", json!(1));
        let engine = InferenceEngine::new(&registry, &ops);

        let first = engine.run();
        let second = engine.run();
        assert_eq!(first.activated_root_causes, second.activated_root_causes);
        assert_ne!(first.run_id, second.run_id);
    }
}
