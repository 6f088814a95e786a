//! Block-style rendering of values for structural insertions
//!
//! Produces text in the same shape hand-written workflows use:
//! nested mappings indented by the document's unit, sequences indented
//! under their key, item mappings starting on the dash line.

use serde_yaml::Value;

/// Inline text for a scalar (or an empty collection)
pub fn scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => string(s),
        Value::Sequence(seq) if seq.is_empty() => "[]".to_string(),
        Value::Mapping(map) if map.is_empty() => "{}".to_string(),
        Value::Tagged(tagged) => scalar(&tagged.value),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

fn string(s: &str) -> String {
    if s.contains('\n') || s.contains('\r') {
        return serde_json::to_string(s).unwrap_or_default();
    }
    match serde_yaml::to_string(s) {
        Ok(text) => text.trim_end_matches('\n').to_string(),
        Err(_) => serde_json::to_string(s).unwrap_or_default(),
    }
}

fn is_block(value: &Value) -> bool {
    match value {
        Value::Sequence(seq) => !seq.is_empty(),
        Value::Mapping(map) => !map.is_empty(),
        Value::Tagged(tagged) => is_block(&tagged.value),
        _ => false,
    }
}

fn untag(value: &Value) -> &Value {
    match value {
        Value::Tagged(tagged) => untag(&tagged.value),
        other => other,
    }
}

/// `key: value` at `indent`, nested values one `unit` deeper; newline-terminated
pub fn entry(key: &str, value: &Value, indent: usize, unit: usize) -> String {
    let pad = " ".repeat(indent);
    let key = string(key);
    let value = untag(value);
    match value {
        Value::Null => format!("{pad}{key}:\n"),
        v if !is_block(v) => format!("{pad}{key}: {}\n", scalar(v)),
        v => format!("{pad}{key}:\n{}", lines(v, indent + unit, unit)),
    }
}

/// `- value` at `indent`; a mapping item starts on the dash line
pub fn item(value: &Value, indent: usize, unit: usize) -> String {
    let pad = " ".repeat(indent);
    match untag(value) {
        Value::Mapping(map) if !map.is_empty() => {
            let nested = lines(&Value::Mapping(map.clone()), indent + 2, unit);
            format!("{pad}- {}", &nested[indent + 2..])
        }
        Value::Sequence(seq) if !seq.is_empty() => {
            let nested = lines(&Value::Sequence(seq.clone()), indent + 2, unit);
            format!("{pad}- {}", &nested[indent + 2..])
        }
        v => format!("{pad}- {}\n", scalar(v)),
    }
}

/// Block lines of a collection at `indent`; scalars render as one bare line
pub fn lines(value: &Value, indent: usize, unit: usize) -> String {
    match untag(value) {
        Value::Mapping(map) if !map.is_empty() => map
            .iter()
            .map(|(k, v)| entry(&key_text(k), v, indent, unit))
            .collect(),
        Value::Sequence(seq) if !seq.is_empty() => {
            seq.iter().map(|v| item(v, indent, unit)).collect()
        }
        v => format!("{}{}\n", " ".repeat(indent), scalar(v)),
    }
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => scalar(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn scalars_quote_only_when_needed() {
        assert_eq!(scalar(&Value::from("core.local")), "core.local");
        assert_eq!(scalar(&Value::from("<% succeeded() %>")), "<% succeeded() %>");
        assert_eq!(scalar(&Value::from(3)), "3");
        assert_eq!(scalar(&Value::Null), "null");
        let quoted = scalar(&Value::from("true"));
        assert_ne!(quoted, "true");
        assert_eq!(yaml(&quoted), Value::from("true"));
        let colon = scalar(&Value::from("a: b"));
        assert_eq!(yaml(&colon), Value::from("a: b"));
    }

    #[test]
    fn multi_line_strings_stay_on_one_line() {
        let text = scalar(&Value::from("one\ntwo"));
        assert!(!text.contains('\n'));
        assert_eq!(yaml(&text), Value::from("one\ntwo"));
    }

    #[test]
    fn entry_nests_by_unit() {
        let value = yaml("action: core.local\ninput:\n  cmd: echo hi\n");
        assert_eq!(
            entry("t2", &value, 2, 2),
            "  t2:\n    action: core.local\n    input:\n      cmd: echo hi\n"
        );
        assert_eq!(entry("empty", &Value::Null, 0, 2), "empty:\n");
    }

    #[test]
    fn items_start_mappings_on_the_dash_line() {
        let rule = yaml("when: <% succeeded() %>\ndo:\n  - a\n  - b\n");
        assert_eq!(
            item(&rule, 6, 2),
            "      - when: <% succeeded() %>\n        do:\n          - a\n          - b\n"
        );
        assert_eq!(item(&Value::from("a"), 4, 2), "    - a\n");
    }

    #[test]
    fn rendered_block_parses_back() {
        let value = yaml("tasks:\n  t1:\n    next:\n      - do:\n          - a\n        publish:\n          - x: 1\n");
        let text = lines(&value, 0, 2);
        assert_eq!(yaml(&text), value);
    }
}
