// SPDX-License-Identifier: MIT

//! Fragment parser
//!
//! A fragment is one operand of a flat expression:
//! - `{21}`
//! - `{22} check '>10'`
//! - `{21} == 'Abnormal'`
//! - `{40} match 'MCC and WQ near 0'`

use once_cell::sync::Lazy;
use regex::Regex;

use crate::graph::{strip_braces, Condition};

static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\s*([^{}]*?)\s*\}").expect("reference pattern is valid"));

/// One parsed operand: the node it refers to and the test applied to it
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub reference: String,
    pub condition: Option<Condition>,
}

/// Parse a fragment. Returns `None` for fragments that reference nothing.
pub fn parse_clause(fragment: &str) -> Option<Clause> {
    let fragment = fragment.trim();
    if fragment.is_empty() {
        return None;
    }

    let Some(caps) = REFERENCE
        .captures_iter(fragment)
        .find(|c| !c[1].eq_ignore_ascii_case("do"))
    else {
        // No braced reference: the fragment text itself names the node
        let reference = strip_braces(fragment);
        return (!reference.is_empty()).then_some(Clause {
            reference,
            condition: None,
        });
    };

    let whole = caps.get(0).map_or(0..0, |m| m.range());
    let reference = caps[1].to_string();
    if reference.is_empty() {
        return None;
    }

    let rest = fragment[whole.end..].trim();
    Some(Clause {
        reference,
        condition: parse_condition(rest),
    })
}

fn parse_condition(input: &str) -> Option<Condition> {
    if input.is_empty() {
        return None;
    }

    // Longest/most specific first
    let operators: [(&str, fn(String) -> Condition); 3] = [
        ("==", Condition::Equals),
        ("check", Condition::Check),
        ("match", Condition::Match),
    ];

    for (op_str, make) in operators {
        if let Some(pos) = find_operator(input, op_str) {
            let operand = parse_literal(&input[pos + op_str.len()..]);
            return Some(make(operand));
        }
    }

    // Trailing text without a known keyword is kept as a match test
    Some(Condition::Match(parse_literal(input)))
}

/// Position of `op` outside quoted text
fn find_operator(input: &str, op: &str) -> Option<usize> {
    let mut quote: Option<char> = None;

    for (i, c) in input.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if input[i..].starts_with(op) => return Some(i),
            None => {}
        }
    }
    None
}

/// Strip one pair of matching quotes, if present
fn parse_literal(input: &str) -> String {
    let input = input.trim();
    let quoted = input.len() >= 2
        && ((input.starts_with('\'') && input.ends_with('\''))
            || (input.starts_with('"') && input.ends_with('"')));

    if quoted {
        input[1..input.len() - 1].to_string()
    } else {
        input.to_string()
    }
}

/// Split `input` on every occurrence of `separator` outside quoted text
pub fn split_outside_quotes<'a>(input: &'a str, separator: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut skip_until = 0;

    for (i, c) in input.char_indices() {
        if i < skip_until {
            continue;
        }
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if input[i..].starts_with(separator) => {
                parts.push(&input[start..i]);
                start = i + separator.len();
                skip_until = start;
            }
            None => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

/// Whether `separator` occurs outside quoted text
pub fn contains_outside_quotes(input: &str, separator: &str) -> bool {
    find_operator(input, separator).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clause(reference: &str, condition: Option<Condition>) -> Option<Clause> {
        Some(Clause {
            reference: reference.to_string(),
            condition,
        })
    }

    #[test]
    fn test_plain_reference() {
        assert_eq!(parse_clause("{21}"), clause("21", None));
        assert_eq!(parse_clause("  { 21 }  "), clause("21", None));
    }

    #[test]
    fn test_equality_clause() {
        assert_eq!(
            parse_clause("{21} == 'Abnormal'"),
            clause("21", Some(Condition::Equals("Abnormal".to_string())))
        );
    }

    #[test]
    fn test_check_clause() {
        assert_eq!(
            parse_clause("{22} check '>10'"),
            clause("22", Some(Condition::Check(">10".to_string())))
        );
        assert_eq!(
            parse_clause("{10} check 'M > 100ppm'"),
            clause("10", Some(Condition::Check("M > 100ppm".to_string())))
        );
    }

    #[test]
    fn test_match_clause() {
        assert_eq!(
            parse_clause("{40} match 'MCC == 0'"),
            clause("40", Some(Condition::Match("MCC == 0".to_string())))
        );
    }

    #[test]
    fn test_double_quotes() {
        assert_eq!(
            parse_clause(r#"{21} == "Normal""#),
            clause("21", Some(Condition::Equals("Normal".to_string())))
        );
    }

    #[test]
    fn test_unknown_trailing_text_is_match() {
        assert_eq!(
            parse_clause("{7} nearly zero"),
            clause("7", Some(Condition::Match("nearly zero".to_string())))
        );
    }

    #[test]
    fn test_do_marker_is_not_a_reference() {
        assert_eq!(parse_clause("{do} {12}"), clause("12", None));
    }

    #[test]
    fn test_bare_text_reference() {
        assert_eq!(parse_clause("IND_VAC"), clause("IND_VAC", None));
    }

    #[test]
    fn test_empty_fragments() {
        assert_eq!(parse_clause(""), None);
        assert_eq!(parse_clause("   "), None);
        assert_eq!(parse_clause("{}"), None);
    }

    #[test]
    fn test_split_outside_quotes() {
        assert_eq!(
            split_outside_quotes("{1} || {2} || {3}", "||"),
            vec!["{1} ", " {2} ", " {3}"]
        );
        assert_eq!(
            split_outside_quotes("{1} check 'a+b' + {2}", "+"),
            vec!["{1} check 'a+b' ", " {2}"]
        );
        assert_eq!(split_outside_quotes("{1}||", "||"), vec!["{1}", ""]);
    }

    #[test]
    fn test_contains_outside_quotes() {
        assert!(contains_outside_quotes("{1} && {2}", "&&"));
        assert!(!contains_outside_quotes("{1} match 'a && b'", "&&"));
    }
}
