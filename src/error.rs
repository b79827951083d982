//! Activation error type: one small enum, hand-written Display, no third-party error stack.
use std::{error::Error as StdError, fmt};

#[derive(Debug)]
pub enum ActivationError {
    MissingRootElement,           // no root, or a root from another document
    UnknownModule(String),        // module attribute names nothing in the registry
    MalformedConfiguration {      // args or refs attribute is not the expected JSON
        attribute: String,
        reason: String,
    },
    InvalidSelector {             // a ref selector failed to parse
        name: String,
        selector: String,
        reason: String,
    },
    InvalidProps {                // props did not deserialize into the typed props
        component: &'static str,
        reason: String,
    },
    InvalidConfig(String),        // SystemConfig rejected by validate()
    Construction(anyhow::Error),  // constructor body failed
}

impl ActivationError {
    /// Stable category label, used in logs and report summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            ActivationError::MissingRootElement => "missing_root_element",
            ActivationError::UnknownModule(_) => "unknown_module",
            ActivationError::MalformedConfiguration { .. } => "malformed_configuration",
            ActivationError::InvalidSelector { .. } => "invalid_selector",
            ActivationError::InvalidProps { .. } => "invalid_props",
            ActivationError::InvalidConfig(_) => "invalid_config",
            ActivationError::Construction(_) => "construction",
        }
    }

    /// Maps a constructor's anyhow error back to its category when it already is one.
    pub(crate) fn from_constructor(err: anyhow::Error) -> Self {
        match err.downcast::<ActivationError>() {
            Ok(e) => e,
            Err(other) => ActivationError::Construction(other),
        }
    }
}

impl fmt::Display for ActivationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationError::MissingRootElement => {
                write!(f, "each component needs a root element")
            }
            ActivationError::UnknownModule(name) => {
                write!(f, "no component registered under module name {name:?}")
            }
            ActivationError::MalformedConfiguration { attribute, reason } => {
                write!(f, "malformed {attribute} attribute: {reason}")
            }
            ActivationError::InvalidSelector { name, selector, reason } => {
                write!(f, "ref {name:?} has invalid selector {selector:?}: {reason}")
            }
            ActivationError::InvalidProps { component, reason } => {
                write!(f, "props for {component} do not fit: {reason}")
            }
            ActivationError::InvalidConfig(reason) => write!(f, "invalid system config: {reason}"),
            ActivationError::Construction(e) => write!(f, "constructor failed: {e:#}"),
        }
    }
}

impl StdError for ActivationError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ActivationError::Construction(e) => Some(&**e),
            _ => None,
        }
    }
}

pub type Result<T = ()> = std::result::Result<T, ActivationError>;
