// SPDX-License-Identifier: MIT

//! Graph loader - YAML/JSON file loading and parsing
//!
//! This module handles loading graph definitions, keyed node tables,
//! expression maps, flow charts and fixed indicator values. Files ending in `.json` are
//! read as JSON, everything else as YAML.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::compiler::{flow_to_inputs, FlowItem};
use crate::error::Result;
use crate::graph::{ExpressionMap, GraphDefinition, Node, NodeTable};

/// Document format, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
            _ => Format::Yaml,
        }
    }

    fn parse<T: DeserializeOwned>(self, content: &str) -> Result<T> {
        Ok(match self {
            Format::Json => serde_json::from_str(content)?,
            Format::Yaml => serde_yaml::from_str(content)?,
        })
    }
}

/// Loads graph inputs from files
pub struct GraphLoader;

impl GraphLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a graph definition (nodes, edges, optional expressions and config)
    pub fn load_definition<P: AsRef<Path>>(&self, path: P) -> Result<GraphDefinition> {
        let definition: GraphDefinition = Self::load(path)?;
        definition.compiler.validate()?;
        Ok(definition)
    }

    /// Load a keyed node table `{ "<id>": { name, type, ... } }`
    pub fn load_node_table<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Node>> {
        let table: NodeTable = Self::load(path)?;
        Ok(table.0)
    }

    /// Load an expression map
    pub fn load_expressions<P: AsRef<Path>>(&self, path: P) -> Result<ExpressionMap> {
        Self::load(path)
    }

    /// Load a flow chart and convert it into a node table and expressions
    pub fn load_flow<P: AsRef<Path>>(&self, path: P) -> Result<(Vec<Node>, ExpressionMap)> {
        let items: Vec<FlowItem> = Self::load(path)?;
        Ok(flow_to_inputs(&items))
    }

    /// Load fixed data-source values `{ data_source_name: value }`
    pub fn load_values<P: AsRef<Path>>(&self, path: P) -> Result<BTreeMap<String, Value>> {
        Self::load(path)
    }

    /// Parse a graph definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<GraphDefinition> {
        let definition: GraphDefinition = Format::Yaml.parse(content)?;
        definition.compiler.validate()?;
        Ok(definition)
    }

    /// Parse a graph definition from a JSON string
    pub fn parse_json(content: &str) -> Result<GraphDefinition> {
        let definition: GraphDefinition = Format::Json.parse(content)?;
        definition.compiler.validate()?;
        Ok(definition)
    }

    /// Parse a JSON flow chart and convert it
    pub fn parse_flow(content: &str) -> Result<(Vec<Node>, ExpressionMap)> {
        let items: Vec<FlowItem> = Format::Json.parse(content)?;
        Ok(flow_to_inputs(&items))
    }

    fn load<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        log::debug!("Loaded {}", path.display());
        Format::from_path(path).parse(&content)
    }
}

impl Default for GraphLoader {
    fn default() -> Self {
        Self::new()
    }
}
