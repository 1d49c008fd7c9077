// SPDX-License-Identifier: MIT

//! Expression compiler
//!
//! Turns condition text into graph structure:
//! - every innermost `( ... )` group becomes a virtual-group node, shared by
//!   all groups with the same normalized text
//! - every occurrence of a connective becomes its own operator node, including
//!   occurrences inside a repeated group
//! - operands become structural edges into the operator (or the target)
//!
//! Parentheses and connectives inside quoted literals are plain text.

use std::ops::Range;

use super::clause::{contains_outside_quotes, parse_clause, split_outside_quotes};
use crate::error::{FaultGraphError, Result};
use crate::graph::{Edge, ExpressionMap, Registry};

/// Logical connectives, in the order they are tested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    Or,
    And,
    Plus,
    Do,
}

impl Connective {
    pub const PRIORITY: [Connective; 4] = [
        Connective::Or,
        Connective::And,
        Connective::Plus,
        Connective::Do,
    ];

    /// Text the expression is split on
    pub fn separator(&self) -> &'static str {
        match self {
            Connective::Or => "||",
            Connective::And => "&&",
            Connective::Plus => "+",
            Connective::Do => "{do}",
        }
    }

    /// Name given to the operator node
    pub fn symbol(&self) -> &'static str {
        match self {
            Connective::Do => "do",
            other => other.separator(),
        }
    }

    /// First connective (by priority) present outside quoted text
    fn detect(text: &str) -> Option<Connective> {
        Self::PRIORITY
            .into_iter()
            .find(|c| contains_outside_quotes(text, c.separator()))
    }
}

/// Compiles condition expressions into a [`Registry`].
///
/// Id ranges and the group pass bound come from the registry's
/// [`CompilerConfig`](super::CompilerConfig).
pub struct Compiler<'r> {
    registry: &'r mut Registry,
}

impl<'r> Compiler<'r> {
    pub fn new(registry: &'r mut Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Compile `expression` so that `target_id` reflects its logic.
    ///
    /// On failure the registry is left exactly as it was before the call.
    pub fn compile(&mut self, target_id: &str, expression: &str) -> Result<()> {
        check_balanced(expression)?;

        let checkpoint = self.registry.checkpoint();
        let result = self.compile_into(target_id, expression);
        if result.is_err() {
            self.registry.rollback(checkpoint);
        }
        result
    }

    /// Compile every entry of `expressions`, in order.
    ///
    /// A malformed expression is skipped; the failures are returned with
    /// their target ids.
    pub fn compile_all(&mut self, expressions: &ExpressionMap) -> Vec<(String, FaultGraphError)> {
        let mut failures = Vec::new();
        for (target, expression) in expressions.iter() {
            if let Err(e) = self.compile(target, expression) {
                log::error!("Failed to compile expression for {}: {}", target, e);
                failures.push((target.to_string(), e));
            }
        }
        failures
    }

    fn compile_into(&mut self, target_id: &str, expression: &str) -> Result<()> {
        let max_passes = self.registry.config().max_group_passes;
        let mut text = expression.to_string();

        // 1. Resolve innermost groups until none remain
        let mut passes = 0;
        while let Some(group) = innermost_group(&text) {
            passes += 1;
            if passes > max_passes {
                return Err(FaultGraphError::malformed(
                    expression,
                    format!("parentheses not resolved after {} passes", max_passes),
                ));
            }

            let content = text[group.start + 1..group.end - 1].to_string();
            let (virtual_id, _) = self.registry.allocate_virtual(&content)?;
            self.compile_into(&virtual_id, &content)?;

            text.replace_range(group, &format!("{{{}}}", virtual_id));
        }

        if contains_outside_quotes(&text, "(") || contains_outside_quotes(&text, ")") {
            return Err(FaultGraphError::malformed(
                expression,
                "unresolvable parenthesized group",
            ));
        }

        // 2. Split on the first connective found, by priority
        match Connective::detect(&text) {
            Some(connective) => {
                let operator_id = self.registry.allocate_operator(connective.symbol())?;
                for fragment in split_outside_quotes(&text, connective.separator()) {
                    self.link(fragment, &operator_id);
                }
                self.registry
                    .add_edge(Edge::new(operator_id, target_id, "output"));
            }
            None => self.link(&text, target_id),
        }

        Ok(())
    }

    /// Add the structural edge `fragment -> target`; empty fragments add nothing
    fn link(&mut self, fragment: &str, target_id: &str) {
        let Some(clause) = parse_clause(fragment) else {
            return;
        };

        let relation = clause
            .condition
            .as_ref()
            .map_or("input", |c| c.relation());
        self.registry.add_edge(
            Edge::new(clause.reference, target_id, relation).with_condition(clause.condition),
        );
    }
}

/// Byte range of the first non-empty group holding no unquoted parentheses,
/// parentheses included
fn innermost_group(text: &str) -> Option<Range<usize>> {
    let mut quote: Option<char> = None;
    let mut open: Option<usize> = None;

    for (i, c) in text.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => open = Some(i),
                ')' => match open.take() {
                    Some(start) if i > start + 1 => return Some(start..i + 1),
                    _ => {}
                },
                _ => {}
            },
        }
    }
    None
}

/// Reject unbalanced parentheses before anything is registered
fn check_balanced(expression: &str) -> Result<()> {
    let mut depth: i64 = 0;
    let mut quote: Option<char> = None;
    for c in expression.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(FaultGraphError::malformed(
                            expression,
                            "closing parenthesis without opening one",
                        ));
                    }
                }
                _ => {}
            },
        }
    }

    if depth != 0 {
        return Err(FaultGraphError::malformed(
            expression,
            format!("{} unclosed parenthesis", depth),
        ));
    }
    Ok(())
}
