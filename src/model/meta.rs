//! Workflow-level metadata: version, description, inputs and vars

use serde::Serialize;
use serde_yaml::Value;

/// One declared input or var: a bare name or `name: default`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkflowMeta {
    pub version: Option<String>,
    pub description: Option<String>,
    pub input: Vec<Param>,
    pub vars: Vec<Param>,
}

impl WorkflowMeta {
    /// Every declared name, inputs first
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.input
            .iter()
            .chain(self.vars.iter())
            .map(|p| p.name.as_str())
    }
}

/// Read `input:` / `vars:` in list or mapping form
pub(crate) fn params(value: Option<&Value>) -> Vec<Param> {
    let mut out = Vec::new();
    match value {
        Some(Value::Sequence(items)) => {
            for item in items {
                match item {
                    Value::String(name) => out.push(Param {
                        name: name.clone(),
                        default: None,
                    }),
                    Value::Mapping(map) => out.extend(mapping_params(map)),
                    _ => {}
                }
            }
        }
        Some(Value::Mapping(map)) => out.extend(mapping_params(map)),
        _ => {}
    }
    out
}

fn mapping_params(map: &serde_yaml::Mapping) -> impl Iterator<Item = Param> + '_ {
    map.iter().filter_map(|(k, v)| {
        k.as_str().map(|name| Param {
            name: name.to_string(),
            default: Some(v.clone()),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_accept_names_and_defaults() {
        let value: Value = serde_yaml::from_str("- name\n- retries: 3\n- 42\n").unwrap();
        let params = params(Some(&value));
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].name, "name");
        assert_eq!(params[0].default, None);
        assert_eq!(params[1].default, Some(Value::from(3)));
    }

    #[test]
    fn params_accept_mapping_form() {
        let value: Value = serde_yaml::from_str("a: 1\nb: x\n").unwrap();
        let meta = WorkflowMeta {
            vars: params(Some(&value)),
            input: vec![Param {
                name: "first".into(),
                default: None,
            }],
            ..WorkflowMeta::default()
        };
        let names: Vec<_> = meta.declared_names().collect();
        assert_eq!(names, vec!["first", "a", "b"]);
    }
}
