use crate::component::{Component, ComponentBase, Construct};
use crate::error::{ActivationError, Result};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

/// Builds a component from an already constructed base.
///
/// The system performs the base contract (root check, prop copy, ref resolution)
/// before calling `construct`, so no factory can skip it.
pub trait ComponentFactory {
    fn type_name(&self) -> &'static str;
    fn construct(&self, base: ComponentBase) -> Result<Box<dyn Component>>;
}

impl fmt::Debug for dyn ComponentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentFactory({})", self.type_name())
    }
}

pub type DynFactory = Rc<dyn ComponentFactory>;

/// Factory for a [`Construct`] type: decodes its props, then constructs it.
pub struct TypedFactory<C> {
    _marker: PhantomData<fn() -> C>,
}

impl<C> Default for TypedFactory<C> {
    fn default() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<C: Construct> ComponentFactory for TypedFactory<C> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }
    fn construct(&self, base: ComponentBase) -> Result<Box<dyn Component>> {
        let props = base
            .props_as::<C::Props>()
            .map_err(|e| match e {
                ActivationError::InvalidProps { reason, .. } => ActivationError::InvalidProps {
                    component: self.type_name(),
                    reason,
                },
                other => other,
            })?;
        let component = C::construct(base, props).map_err(ActivationError::from_constructor)?;
        Ok(Box::new(component))
    }
}

/// Factory backed by a closure.
pub struct FnFactory<F> {
    type_name: &'static str,
    f: F,
}

impl<F> ComponentFactory for FnFactory<F>
where
    F: Fn(ComponentBase) -> anyhow::Result<Box<dyn Component>>,
{
    fn type_name(&self) -> &'static str {
        self.type_name
    }
    fn construct(&self, base: ComponentBase) -> Result<Box<dyn Component>> {
        (self.f)(base).map_err(ActivationError::from_constructor)
    }
}

/// Module name -> factory. Built by the embedding application, read-only once handed to a `System`.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: HashMap<String, DynFactory>,
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("modules", &self.names())
            .finish()
    }
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: Construct>(&mut self, name: &str) -> &mut Self {
        self.register_factory(name, TypedFactory::<C>::default())
    }

    pub fn register_fn<F>(&mut self, name: &str, f: F) -> &mut Self
    where
        F: Fn(ComponentBase) -> anyhow::Result<Box<dyn Component>> + 'static,
    {
        self.register_factory(
            name,
            FnFactory {
                type_name: "closure",
                f,
            },
        )
    }

    /// Later registrations under the same name replace earlier ones.
    pub fn register_factory(
        &mut self,
        name: &str,
        factory: impl ComponentFactory + 'static,
    ) -> &mut Self {
        let factory: DynFactory = Rc::new(factory);
        if let Some(prev) = self.factories.insert(name.to_string(), factory) {
            tracing::warn!(
                module = %name,
                replaced = %prev.type_name(),
                "module registered more than once; last registration wins"
            );
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<DynFactory> {
        self.factories.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered module names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
