use crate::config::FalsyValues;
use crate::dom::{Document, ElementHandle};
use crate::error::{ActivationError, Result};
use crate::event::CustomEvent;
use crate::selector::Selector;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Decoded key-value data handed to a component constructor.
pub type Props = Map<String, Value>;

/// Prop name that never reaches a component's props.
pub const RESERVED_REFS_KEY: &str = "refs";

/// Logical name -> CSS selector, as written in the refs attribute.
pub type ReferenceMap = BTreeMap<String, String>;

/// Logical name -> first matching element (or `None`), resolved once at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedRefs {
    entries: BTreeMap<String, Option<ElementHandle>>,
}

impl ResolvedRefs {
    /// The element behind `name`; `None` if the name is unknown or its selector matched nothing.
    pub fn get(&self, name: &str) -> Option<ElementHandle> {
        self.entries.get(name).copied().flatten()
    }
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<ElementHandle>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves every selector against `document`, leaving the input untouched.
pub fn resolve_refs(document: &Document, refs: &ReferenceMap) -> Result<ResolvedRefs> {
    let mut entries = BTreeMap::new();
    for (name, selector) in refs {
        let sel = Selector::parse(selector).map_err(|e| ActivationError::InvalidSelector {
            name: name.clone(),
            selector: selector.clone(),
            reason: e.to_string(),
        })?;
        entries.insert(name.clone(), document.query_first(&sel));
    }
    Ok(ResolvedRefs { entries })
}

/// JavaScript truthiness for the JSON subset: `0`, `""`, `false`, `null` are falsy.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Arguments for one construction: decoded props plus the optional unresolved refs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentArgs {
    pub props: Props,
    pub refs: Option<ReferenceMap>,
}

impl ComponentArgs {
    pub fn new(props: Props) -> Self {
        Self { props, refs: None }
    }
    pub fn with_refs(mut self, refs: ReferenceMap) -> Self {
        self.refs = Some(refs);
        self
    }
}

/// State every component carries: its root, its props, its resolved refs.
pub struct ComponentBase {
    id: Uuid,
    document: Document,
    root: ElementHandle,
    props: Props,
    refs: Option<ResolvedRefs>,
}

impl ComponentBase {
    /// Validates the root, copies props (applying `falsy`), resolves refs.
    ///
    /// `args == None` and an empty props map are both valid: a component without props.
    /// A root from another document counts as missing. The `refs` key is reserved: a
    /// `refs` entry in `args.props` is dropped, and refs come only from `args.refs`.
    pub fn construct(
        document: &Document,
        root: Option<ElementHandle>,
        args: Option<ComponentArgs>,
        falsy: FalsyValues,
    ) -> Result<Self> {
        let root = root
            .filter(|r| document.owns(*r))
            .ok_or(ActivationError::MissingRootElement)?;
        let mut base = Self {
            id: Uuid::new_v4(),
            document: document.clone(),
            root,
            props: Props::new(),
            refs: None,
        };
        let Some(args) = args else {
            return Ok(base);
        };
        for (key, value) in args.props {
            if key == RESERVED_REFS_KEY {
                tracing::warn!(
                    root = ?root,
                    "reserved prop `refs` ignored; refs come from the refs attribute"
                );
                continue;
            }
            let value = match falsy {
                FalsyValues::CoerceToNull if is_falsy(&value) => Value::Null,
                _ => value,
            };
            base.props.insert(key, value);
        }
        if let Some(refs) = &args.refs {
            base.refs = Some(resolve_refs(document, refs)?);
        }
        Ok(base)
    }

    /// Unique per construction; two activations of one root get two ids.
    pub fn instance_id(&self) -> Uuid {
        self.id
    }
    pub fn document(&self) -> &Document {
        &self.document
    }
    pub fn root_element(&self) -> ElementHandle {
        self.root
    }
    pub fn props(&self) -> &Props {
        &self.props
    }
    /// `Some(&Value::Null)` for a key that was present but null (or coerced to null).
    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.get(key)
    }

    /// Maps the generic props onto a typed structure.
    pub fn props_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.props.clone())).map_err(|e| {
            ActivationError::InvalidProps {
                component: std::any::type_name::<T>(),
                reason: e.to_string(),
            }
        })
    }

    pub fn has_refs(&self) -> bool {
        self.refs.is_some()
    }
    pub fn refs(&self) -> Option<&ResolvedRefs> {
        self.refs.as_ref()
    }
    /// Shorthand for `refs().and_then(|r| r.get(name))`.
    pub fn ref_element(&self, name: &str) -> Option<ElementHandle> {
        self.refs.as_ref().and_then(|r| r.get(name))
    }

    /// Dispatches a bubbling, cancelable `event_name` from `element` with `detail`.
    pub fn emit(&self, element: ElementHandle, event_name: &str, detail: Value) {
        emit(&self.document, element, event_name, detail);
    }
}

impl fmt::Debug for ComponentBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentBase")
            .field("id", &self.id)
            .field("root", &self.root)
            .field("props", &self.props)
            .field("refs", &self.refs)
            .finish()
    }
}

/// Free-standing form of [`ComponentBase::emit`].
pub fn emit(document: &Document, element: ElementHandle, event_name: &str, detail: Value) {
    let event = CustomEvent::new(event_name)
        .with_detail(detail)
        .bubbles(true)
        .cancelable(true);
    document.dispatch_event(element, &event);
}

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
}
impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A live behavior attached to a root element.
pub trait Component: AsAny {
    fn base(&self) -> &ComponentBase;
}

impl dyn Component {
    pub fn downcast_ref<T: Component>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }
    pub fn is<T: Component>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({:?})", self.base().root_element())
    }
}

/// Typed construction: the registry decodes `Props` before calling `construct`.
///
/// Missing or unknown keys are governed by the props type's own serde attributes
/// (`#[serde(default)]`, `#[serde(deny_unknown_fields)]`). Under
/// [`FalsyValues::CoerceToNull`] zero-like values arrive as `null`, so such fields
/// want to be `Option`s.
pub trait Construct: Component + Sized {
    type Props: DeserializeOwned;
    fn construct(base: ComponentBase, props: Self::Props) -> anyhow::Result<Self>;
}

/// Props for components that accept none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NoProps {}

impl Component for ComponentBase {
    fn base(&self) -> &ComponentBase {
        self
    }
}

/// A bare component: root, props and refs, no behavior of its own.
impl Construct for ComponentBase {
    type Props = Props;
    fn construct(base: ComponentBase, _props: Props) -> anyhow::Result<Self> {
        Ok(base)
    }
}
