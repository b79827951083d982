use crate::error::{ActivationError, Result};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MODULE_ATTRIBUTE: &str = "data-plain-module";
pub const DEFAULT_ARGS_ATTRIBUTE: &str = "data-plain-args";
pub const DEFAULT_REFS_ATTRIBUTE: &str = "data-plain-refs";

/// How decoded props that JavaScript would call falsy (`0`, `""`, `false`) are stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FalsyValues {
    /// `0`, `""`, `false` and `null` all become `null`: indistinguishable from absent.
    #[default]
    CoerceToNull,
    /// Values are kept exactly as decoded.
    Preserve,
}

/// What a second activation pass does with roots that were already activated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reactivation {
    /// Every pass constructs a fresh instance per root.
    #[default]
    Always,
    /// Roots activated by an earlier pass of the same `System` are reported as skipped.
    SkipActivated,
}

/// The system's only configuration surface besides the registry itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemConfig {
    pub module_attribute: String,
    pub args_attribute: String,
    pub refs_attribute: String,
    pub falsy_values: FalsyValues,
    pub reactivation: Reactivation,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            module_attribute: DEFAULT_MODULE_ATTRIBUTE.to_string(),
            args_attribute: DEFAULT_ARGS_ATTRIBUTE.to_string(),
            refs_attribute: DEFAULT_REFS_ATTRIBUTE.to_string(),
            falsy_values: FalsyValues::default(),
            reactivation: Reactivation::default(),
        }
    }
}

impl SystemConfig {
    /// The older `data-plain-js-*` attribute triple.
    pub fn legacy() -> Self {
        Self {
            module_attribute: "data-plain-js-module".to_string(),
            args_attribute: "data-plain-js-args".to_string(),
            refs_attribute: "data-plain-js-refs".to_string(),
            ..Self::default()
        }
    }

    pub fn from_json(src: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(src)
            .map_err(|e| ActivationError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let src = std::fs::read_to_string(path)
            .with_context(|| format!("reading system config {}", path.display()))?;
        Self::from_json(&src).with_context(|| format!("parsing system config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        let names = [
            ("module_attribute", &self.module_attribute),
            ("args_attribute", &self.args_attribute),
            ("refs_attribute", &self.refs_attribute),
        ];
        for (field, name) in names {
            if name.is_empty() {
                return Err(ActivationError::InvalidConfig(format!("{field} is empty")));
            }
            if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
                return Err(ActivationError::InvalidConfig(format!(
                    "{field} {name:?} is not a valid attribute name"
                )));
            }
        }
        let lower = |s: &String| s.to_ascii_lowercase();
        if lower(&self.module_attribute) == lower(&self.args_attribute)
            || lower(&self.module_attribute) == lower(&self.refs_attribute)
            || lower(&self.args_attribute) == lower(&self.refs_attribute)
        {
            return Err(ActivationError::InvalidConfig(
                "module, args and refs attributes must be distinct".to_string(),
            ));
        }
        Ok(())
    }
}
