// SPDX-License-Identifier: MIT

//! Generic s2t functions available to every graph
//!
//! Data sources are never built in; they are supplied by sensor adapters or
//! test fixtures.

use serde_json::Value;

use super::registry::{is_truthy, OperatorRegistry};

pub const PASS_VALUE: &str = "op_pass_value";
pub const IS_TRUTHY: &str = "op_is_truthy";
pub const IS_NULL: &str = "op_is_null";
pub const NOT_NULL: &str = "op_not_null";

/// Register the built-in s2t functions, replacing same-named entries
pub fn register_builtins(registry: &mut OperatorRegistry) {
    registry.register_s2t(PASS_VALUE, |v| Ok(v.clone()));
    registry.register_predicate(IS_TRUTHY, is_truthy);
    registry.register_predicate(IS_NULL, Value::is_null);
    registry.register_predicate(NOT_NULL, |v| !v.is_null());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builtins() -> OperatorRegistry {
        let mut registry = OperatorRegistry::new();
        register_builtins(&mut registry);
        registry
    }

    #[test]
    fn test_builtin_names() {
        let registry = builtins();
        assert_eq!(
            registry.s2t_names(),
            vec![IS_NULL, IS_TRUTHY, NOT_NULL, PASS_VALUE]
        );
        assert!(registry.data_source_names().is_empty());
    }

    #[test]
    fn test_pass_value() {
        let op = builtins().resolve_transform(PASS_VALUE).unwrap();
        assert_eq!(op.apply(&json!({"A": "Low"})).unwrap(), json!({"A": "Low"}));
    }

    #[test]
    fn test_null_checks() {
        let registry = builtins();
        let is_null = registry.resolve_predicate(IS_NULL).unwrap();
        let not_null = registry.resolve_predicate(NOT_NULL).unwrap();

        assert!(is_null.test(&Value::Null).unwrap());
        assert!(!not_null.test(&Value::Null).unwrap());
        assert!(not_null.test(&json!(0)).unwrap());
    }

    #[test]
    fn test_is_truthy_operator() {
        let op = builtins().resolve_predicate(IS_TRUTHY).unwrap();
        assert!(op.test(&json!("High")).unwrap());
        assert!(!op.test(&json!("")).unwrap());
    }
}
