use crate::component::{ComponentArgs, Props, ReferenceMap};
use crate::config::SystemConfig;
use crate::dom::{Document, ElementHandle};
use crate::error::{ActivationError, Result};
use serde_json::Value;

/// What one discovery pass reads off a component root. Not retained after activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    pub root: ElementHandle,
    pub module_name: String,
    pub raw_args: Option<String>,
    pub raw_refs: Option<String>,
}

impl ComponentDescriptor {
    pub fn read(document: &Document, root: ElementHandle, cfg: &SystemConfig) -> Self {
        Self {
            root,
            module_name: document
                .get_attribute(root, &cfg.module_attribute)
                .unwrap_or_default(),
            raw_args: document.get_attribute(root, &cfg.args_attribute),
            raw_refs: document.get_attribute(root, &cfg.refs_attribute),
        }
    }

    /// Decodes args and refs. Absent attributes give empty props and no refs.
    pub fn decode(&self, cfg: &SystemConfig) -> Result<ComponentArgs> {
        let props = match &self.raw_args {
            Some(raw) => decode_args(&cfg.args_attribute, raw)?,
            None => Props::new(),
        };
        let refs = match &self.raw_refs {
            Some(raw) => Some(decode_refs(&cfg.refs_attribute, raw)?),
            None => None,
        };
        Ok(ComponentArgs { props, refs })
    }
}

/// Parses an args attribute, which must hold a JSON object.
pub fn decode_args(attribute: &str, raw: &str) -> Result<Props> {
    let value: Value = serde_json::from_str(raw).map_err(|e| malformed(attribute, e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(malformed(
            attribute,
            format!("expected a JSON object, found {}", json_kind(&other)),
        )),
    }
}

/// Parses a refs attribute, which must hold a JSON object of selector strings.
pub fn decode_refs(attribute: &str, raw: &str) -> Result<ReferenceMap> {
    let map = decode_args(attribute, raw)?;
    map.into_iter()
        .map(|(name, v)| match v {
            Value::String(selector) => Ok((name, selector)),
            other => Err(malformed(
                attribute,
                format!("ref {name:?} must be a selector string, found {}", json_kind(&other)),
            )),
        })
        .collect()
}

fn malformed(attribute: &str, reason: String) -> ActivationError {
    ActivationError::MalformedConfiguration {
        attribute: attribute.to_string(),
        reason,
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
