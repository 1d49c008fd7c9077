// SPDX-License-Identifier: MIT

//! Flow-chart condition text to clause text

const COMPARISON_MARKERS: [&str; 5] = [">", "<", "=", "≥", "≤"];
const NORMAL_WORDS: [&str; 5] = ["正常", "Normal", "OK", "是", "Yes"];
const ABNORMAL_WORDS: [&str; 5] = ["异常", "Abnormal", "NG", "否", "No"];

/// Format the condition attached to `source_id` as compiler input.
///
/// Conditions are wrapped in parentheses so each becomes its own
/// virtual-group node; a missing condition is a plain reference.
pub fn format_condition(source_id: &str, condition: Option<&str>) -> String {
    let text = condition.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return format!("{{{}}}", source_id);
    }

    if COMPARISON_MARKERS.iter().any(|m| text.contains(m)) {
        return format!("({{{}}} check '{}')", source_id, text);
    }
    if NORMAL_WORDS.contains(&text) {
        return format!("({{{}}} == 'Normal')", source_id);
    }
    if ABNORMAL_WORDS.contains(&text) {
        return format!("({{{}}} == 'Abnormal')", source_id);
    }

    format!("({{{}}} match '{}')", source_id, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_condition() {
        assert_eq!(format_condition("10", None), "{10}");
        assert_eq!(format_condition("10", Some("  ")), "{10}");
    }

    #[test]
    fn test_comparison() {
        assert_eq!(
            format_condition("10", Some("M > 100ppm")),
            "({10} check 'M > 100ppm')"
        );
        assert_eq!(
            format_condition("11", Some("偏差≥2")),
            "({11} check '偏差≥2')"
        );
    }

    #[test]
    fn test_state_words() {
        assert_eq!(format_condition("3", Some("正常")), "({3} == 'Normal')");
        assert_eq!(format_condition("3", Some("NG")), "({3} == 'Abnormal')");
    }

    #[test]
    fn test_free_text_is_match() {
        assert_eq!(
            format_condition("40", Some("MCC与WQ几乎为0")),
            "({40} match 'MCC与WQ几乎为0')"
        );
    }

    #[test]
    fn test_formatted_condition_compiles() {
        use crate::compiler::Compiler;
        use crate::graph::{Condition, Registry};

        let mut registry = Registry::new();
        let expr = format!(
            "{} || {}",
            format_condition("10", Some("M > 100ppm")),
            format_condition("11", Some("Abnormal"))
        );
        Compiler::new(&mut registry)
            .compile("50", &expr)
            .unwrap();

        assert_eq!(
            registry.edges()[0].condition,
            Some(Condition::Check("M > 100ppm".to_string()))
        );
        assert_eq!(
            registry.edges()[1].condition,
            Some(Condition::Equals("Abnormal".to_string()))
        );
    }
}
