// SPDX-License-Identifier: MIT

//! Graph type definitions
//!
//! This module defines the node, edge and definition types shared by the
//! compiler, the registry and the inference engine.

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::compiler::CompilerConfig;

/// Kind of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(from = "String", into = "String")]
pub enum NodeCategory {
    /// Plain entity supplied by the input data (symptoms, fault states, ...)
    #[default]
    Entity,
    /// Node with a bound data source supplying a live value
    Indicator,
    Component,
    Subsystem,
    /// Synthetic node for one parenthesized sub-expression
    VirtualGroup,
    /// Synthetic node for one occurrence of a logical connective
    Operator,
    /// Aggregation point evaluated over all inbound values
    RuleLogic,
    /// Terminal node representing a diagnosed fault origin
    RootCause,
}

impl NodeCategory {
    /// Parse a category label.
    ///
    /// Accepts the canonical `SCREAMING_SNAKE_CASE` labels, PascalCase
    /// spellings and the localized type labels used by flow-chart exports.
    /// Anything unrecognized is an [`NodeCategory::Entity`].
    pub fn from_label(label: &str) -> Self {
        let normalized: String = label
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "indicator" | "指标" => NodeCategory::Indicator,
            "component" | "部件" => NodeCategory::Component,
            "subsystem" | "分系统" | "子系统" => NodeCategory::Subsystem,
            "virtualgroup" | "虚拟分组" => NodeCategory::VirtualGroup,
            "operator" | "算子" => NodeCategory::Operator,
            "rulelogic" | "规则" => NodeCategory::RuleLogic,
            "rootcause" | "根因" => NodeCategory::RootCause,
            _ => NodeCategory::Entity,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeCategory::Entity => "ENTITY",
            NodeCategory::Indicator => "INDICATOR",
            NodeCategory::Component => "COMPONENT",
            NodeCategory::Subsystem => "SUBSYSTEM",
            NodeCategory::VirtualGroup => "VIRTUAL_GROUP",
            NodeCategory::Operator => "OPERATOR",
            NodeCategory::RuleLogic => "RULE_LOGIC",
            NodeCategory::RootCause => "ROOT_CAUSE",
        }
    }
}

impl From<String> for NodeCategory {
    fn from(label: String) -> Self {
        NodeCategory::from_label(&label)
    }
}

impl From<NodeCategory> for String {
    fn from(category: NodeCategory) -> Self {
        category.as_str().to_string()
    }
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional node attributes
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NodeAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Measurement unit (indicators)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Fault classification (root causes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
    /// Logic kind (rule-logic and operator nodes), e.g. `AND`, `||`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,
    /// Any other attribute carried by the input data
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl NodeAttributes {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.unit.is_none()
            && self.classification.is_none()
            && self.logic.is_none()
            && self.extra.is_empty()
    }
}

/// A node in the diagnosis graph
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Node {
    pub id: String,
    #[serde(alias = "label")]
    pub name: String,
    #[serde(alias = "type")]
    pub category: NodeCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsystem: Option<String>,
    #[serde(default, skip_serializing_if = "NodeAttributes::is_empty")]
    pub attributes: NodeAttributes,
    /// Symbolic data-source (indicators) or aggregation function name
    #[serde(
        default,
        alias = "operator",
        deserialize_with = "deserialize_binding",
        skip_serializing_if = "Option::is_none"
    )]
    pub operator_binding: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>, category: NodeCategory) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            subsystem: None,
            attributes: NodeAttributes::default(),
            operator_binding: None,
        }
    }

    pub fn with_binding(mut self, binding: impl Into<String>) -> Self {
        self.operator_binding = Some(binding.into());
        self
    }

    pub fn with_attributes(mut self, attributes: NodeAttributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_subsystem(mut self, subsystem: impl Into<String>) -> Self {
        self.subsystem = Some(subsystem.into());
        self
    }
}

/// Test recorded on a structural edge by the expression compiler
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// `{id} check '<text>'`
    Check(String),
    /// `{id} == '<value>'`
    Equals(String),
    /// `{id} match '<text>'`
    Match(String),
}

impl Condition {
    /// Relation label used for edges carrying this condition
    pub fn relation(&self) -> &'static str {
        match self {
            Condition::Check(_) => "check",
            Condition::Equals(_) => "equals",
            Condition::Match(_) => "match",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Check(text) => write!(f, "check '{}'", text),
            Condition::Equals(value) => write!(f, "== '{}'", value),
            Condition::Match(text) => write!(f, "match '{}'", text),
        }
    }
}

/// A directed edge in the diagnosis graph
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(default = "default_relation")]
    pub relation: String,
    /// Symbolic predicate/transform ("s2t") name; `None` for structural edges
    #[serde(
        default,
        alias = "operator",
        deserialize_with = "deserialize_binding",
        skip_serializing_if = "Option::is_none"
    )]
    pub operator_binding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

fn default_relation() -> String {
    "input".to_string()
}

impl Edge {
    /// Create a structural (unbound) edge
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation: relation.into(),
            operator_binding: None,
            condition: None,
        }
    }

    pub fn with_binding(mut self, binding: impl Into<String>) -> Self {
        self.operator_binding = Some(binding.into());
        self
    }

    pub fn with_condition(mut self, condition: Option<Condition>) -> Self {
        self.condition = condition;
        self
    }
}

/// Accepts a binding as a bare name, `{data_source: name}` or `{s2t: name}`.
///
/// Empty names and the `N/A` placeholder are treated as "no binding".
fn deserialize_binding<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct BindingObject {
        data_source: Option<String>,
        s2t: Option<String>,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BindingSpec {
        Name(String),
        Object(BindingObject),
    }

    let spec = Option::<BindingSpec>::deserialize(deserializer)?;
    let name = match spec {
        None => None,
        Some(BindingSpec::Name(name)) => Some(name),
        Some(BindingSpec::Object(obj)) => obj.data_source.or(obj.s2t),
    };

    Ok(name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty() && n != "N/A"))
}

/// Ordered mapping `target_id -> expression_text`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionMap {
    entries: Vec<(String, String)>,
}

impl ExpressionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, target: impl Into<String>, expression: impl Into<String>) {
        self.entries.push((target.into(), expression.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, e)| (t.as_str(), e.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for ExpressionMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (target, expression) in &self.entries {
            map.serialize_entry(target, expression)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ExpressionMap {
    /// Accepts `{target: expression}` or the compute form
    /// `{key: {target: "{id}", operator: "<expr>"}}`, keeping document order.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum ExpressionValue {
            Text(String),
            Compute { target: String, operator: String },
        }

        struct ExpressionMapVisitor;

        impl<'de> Visitor<'de> for ExpressionMapVisitor {
            type Value = ExpressionMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of target ids to expressions")
            }

            fn visit_map<A>(self, mut access: A) -> Result<ExpressionMap, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut map = ExpressionMap::new();
                while let Some((key, value)) = access.next_entry::<String, ExpressionValue>()? {
                    match value {
                        ExpressionValue::Text(expr) => map.insert(key, expr),
                        ExpressionValue::Compute { target, operator } => {
                            let target = strip_braces(&target);
                            if target.is_empty() {
                                return Err(de::Error::custom(format!(
                                    "expression '{}' has an empty target",
                                    key
                                )));
                            }
                            map.insert(target, operator);
                        }
                    }
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(ExpressionMapVisitor)
    }
}

/// Entry of a keyed node table: `{ "<id>": { name, type, subsystem?, ... } }`
#[derive(Debug, Clone, Deserialize)]
struct NodeEntry {
    #[serde(default, alias = "label")]
    name: String,
    #[serde(default, rename = "type", alias = "category")]
    category: NodeCategory,
    #[serde(default)]
    subsystem: Option<String>,
    #[serde(default, alias = "operator", deserialize_with = "deserialize_binding")]
    operator_binding: Option<String>,
    #[serde(flatten)]
    extra: BTreeMap<String, Value>,
}

/// Keyed node table, converted to nodes in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeTable(pub Vec<Node>);

impl Serialize for NodeTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            name: &'a str,
            #[serde(rename = "type")]
            category: NodeCategory,
            #[serde(skip_serializing_if = "Option::is_none")]
            subsystem: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            operator_binding: Option<&'a str>,
            #[serde(flatten)]
            extra: &'a BTreeMap<String, Value>,
        }

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for node in &self.0 {
            let entry = Entry {
                name: &node.name,
                category: node.category,
                subsystem: node.subsystem.as_deref(),
                operator_binding: node.operator_binding.as_deref(),
                extra: &node.attributes.extra,
            };
            map.serialize_entry(&node.id, &entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for NodeTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct NodeTableVisitor;

        impl<'de> Visitor<'de> for NodeTableVisitor {
            type Value = NodeTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of node ids to node entries")
            }

            fn visit_map<A>(self, mut access: A) -> Result<NodeTable, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut nodes = Vec::new();
                while let Some((id, entry)) = access.next_entry::<String, NodeEntry>()? {
                    let mut node = Node::new(id, entry.name, entry.category);
                    node.subsystem = entry.subsystem;
                    node.operator_binding = entry.operator_binding;
                    node.attributes.extra = entry.extra;
                    nodes.push(node);
                }
                Ok(NodeTable(nodes))
            }
        }

        deserializer.deserialize_map(NodeTableVisitor)
    }
}

/// A complete graph definition document
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GraphDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub compiler: CompilerConfig,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default, skip_serializing_if = "ExpressionMap::is_empty")]
    pub expressions: ExpressionMap,
}

/// Remove `{`/`}` from a reference like `{21}`
pub fn strip_braces(text: &str) -> String {
    text.replace(['{', '}'], "").trim().to_string()
}
