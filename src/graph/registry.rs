// SPDX-License-Identifier: MIT

//! Node/edge registry
//!
//! The canonical store for a compiled diagnosis graph. Nodes and edges keep
//! their registration order, which is also the iteration order used by the
//! inference engine.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::types::{Edge, GraphDefinition, Node, NodeAttributes, NodeCategory};
use crate::compiler::CompilerConfig;
use crate::error::{FaultGraphError, Result};

/// Monotonic numeric id source for synthetic nodes
#[derive(Debug, Clone)]
struct IdAllocator {
    start: u64,
    next: u64,
}

impl IdAllocator {
    fn new(start: u64) -> Self {
        Self { start, next: start }
    }

    /// Next id, or `None` once the range is exhausted
    fn take(&mut self) -> Option<String> {
        let id = self.next;
        self.next = id.checked_add(1)?;
        Some(id.to_string())
    }

    fn allocated(&self) -> u64 {
        self.next - self.start
    }
}

/// Registry state captured before a compilation, used to undo it
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    nodes: usize,
    edges: usize,
    next_virtual: u64,
    next_operator: u64,
}

/// Id ranges used for synthetic nodes
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct IdRanges {
    pub virtual_nodes_start: u64,
    pub operator_nodes_start: u64,
}

/// Virtual-group and operator allocation summary
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GraphMapping {
    pub virtual_to_id: BTreeMap<String, String>,
    pub id_ranges: IdRanges,
    pub virtual_count: u64,
    pub operator_count: u64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct GraphStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub virtual_nodes: u64,
    pub operator_nodes: u64,
}

/// Canonical graph store: nodes, edges and id allocators
#[derive(Debug, Clone)]
pub struct Registry {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    /// Normalized group text -> virtual node id
    virtual_memo: HashMap<String, String>,
    config: CompilerConfig,
    virtual_ids: IdAllocator,
    operator_ids: IdAllocator,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_config(&CompilerConfig::default())
    }

    /// Create a registry whose synthetic ids start where `config` says.
    ///
    /// The registry keeps `config`; a [`Compiler`](crate::compiler::Compiler)
    /// writing into it uses the same settings.
    pub fn with_config(config: &CompilerConfig) -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            edges: Vec::new(),
            virtual_memo: HashMap::new(),
            config: config.clone(),
            virtual_ids: IdAllocator::new(config.virtual_id_start),
            operator_ids: IdAllocator::new(config.operator_id_start),
        }
    }

    /// Build a registry from a definition document (nodes, then edges)
    pub fn from_definition(definition: &GraphDefinition) -> Self {
        let mut registry = Self::with_config(&definition.compiler);
        registry.load(definition);
        registry
    }

    /// Register every node and edge of `definition`
    pub fn load(&mut self, definition: &GraphDefinition) {
        for node in &definition.nodes {
            self.register(node.clone());
        }
        for edge in &definition.edges {
            self.add_edge(edge.clone());
        }
    }

    /// Insert a node. Returns `false` (and changes nothing) if the id exists.
    pub fn register(&mut self, node: Node) -> bool {
        if self.index.contains_key(&node.id) {
            log::debug!("Node {} already registered, keeping first definition", node.id);
            return false;
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Return the virtual-group id for `content`, allocating it on first sight.
    ///
    /// The flag is `true` when the node was created by this call.
    pub fn allocate_virtual(&mut self, content: &str) -> Result<(String, bool)> {
        let key = normalize(content);
        if let Some(id) = self.virtual_memo.get(&key) {
            return Ok((id.clone(), false));
        }

        let id = Self::next_free(&mut self.virtual_ids, &self.index, "virtual")?;

        self.virtual_memo.insert(key.clone(), id.clone());
        self.register(Node::new(id.clone(), key, NodeCategory::VirtualGroup));
        log::debug!("Allocated virtual node {}", id);
        Ok((id, true))
    }

    /// Allocate a fresh operator node for one occurrence of `symbol`
    pub fn allocate_operator(&mut self, symbol: &str) -> Result<String> {
        let id = Self::next_free(&mut self.operator_ids, &self.index, "operator")?;

        let attributes = NodeAttributes {
            logic: Some(symbol.to_string()),
            ..NodeAttributes::default()
        };
        self.register(Node::new(id.clone(), symbol, NodeCategory::Operator).with_attributes(attributes));
        log::debug!("Allocated operator node {} ({})", id, symbol);
        Ok(id)
    }

    /// First id from `ids` that no registered node uses
    fn next_free(
        ids: &mut IdAllocator,
        index: &HashMap<String, usize>,
        range: &str,
    ) -> Result<String> {
        loop {
            let candidate = ids.take().ok_or_else(|| {
                FaultGraphError::config(format!(
                    "{} id range starting at {} is exhausted",
                    range, ids.start
                ))
            })?;
            if !index.contains_key(&candidate) {
                return Ok(candidate);
            }
        }
    }

    /// Append an edge. Duplicates are kept.
    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Position of a node in registration order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Nodes in registration order
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edges in registration order
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Virtual node id for previously seen group text
    pub fn virtual_id(&self, content: &str) -> Option<&str> {
        self.virtual_memo.get(&normalize(content)).map(|s| s.as_str())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            next_virtual: self.virtual_ids.next,
            next_operator: self.operator_ids.next,
        }
    }

    /// Drop every node, edge, memo entry and id allocated after `checkpoint`
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        for node in self.nodes.drain(checkpoint.nodes..) {
            self.index.remove(&node.id);
        }
        self.edges.truncate(checkpoint.edges);
        let index = &self.index;
        self.virtual_memo.retain(|_, id| index.contains_key(id));
        self.virtual_ids.next = checkpoint.next_virtual;
        self.operator_ids.next = checkpoint.next_operator;
    }

    /// Export the graph in registration order
    pub fn to_definition(&self) -> GraphDefinition {
        GraphDefinition {
            compiler: self.config.clone(),
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            ..GraphDefinition::default()
        }
    }

    pub fn mapping(&self) -> GraphMapping {
        GraphMapping {
            virtual_to_id: self
                .virtual_memo
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            id_ranges: IdRanges {
                virtual_nodes_start: self.virtual_ids.start,
                operator_nodes_start: self.operator_ids.start,
            },
            virtual_count: self.virtual_ids.allocated(),
            operator_count: self.operator_ids.allocated(),
        }
    }

    pub fn stats(&self) -> GraphStats {
        GraphStats {
            total_nodes: self.nodes.len(),
            total_edges: self.edges.len(),
            virtual_nodes: self.virtual_memo.len() as u64,
            operator_nodes: self
                .nodes
                .iter()
                .filter(|n| n.category == NodeCategory::Operator)
                .count() as u64,
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// Memo key for group text: trimmed, whitespace runs collapsed
pub fn normalize(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}
