use crate::component::{Component, ComponentBase};
use crate::config::{Reactivation, SystemConfig};
use crate::descriptor::ComponentDescriptor;
use crate::dom::{Document, ElementHandle};
use crate::error::{ActivationError, Result};
use crate::registry::ComponentRegistry;
use crate::report::{ActivationEntry, ActivationReport, Outcome};
use crate::selector::Selector;
use std::cell::RefCell;
use std::collections::HashSet;

/// Finds component roots in a document and activates one component per root.
pub struct System {
    document: Document,
    registry: ComponentRegistry,
    cfg: SystemConfig,
    // roots activated by this system; consulted only under Reactivation::SkipActivated
    activated: RefCell<HashSet<ElementHandle>>,
}

impl System {
    pub fn new(document: Document, registry: ComponentRegistry) -> Self {
        Self {
            document,
            registry,
            cfg: SystemConfig::default(),
            activated: RefCell::new(HashSet::new()),
        }
    }

    pub fn with_config(
        document: Document,
        registry: ComponentRegistry,
        cfg: SystemConfig,
    ) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            document,
            registry,
            cfg,
            activated: RefCell::new(HashSet::new()),
        })
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }
    pub fn config(&self) -> &SystemConfig {
        &self.cfg
    }

    /// Every connected element carrying the module attribute, in document order.
    pub fn discover(&self) -> Vec<ComponentDescriptor> {
        let marker = Selector::has_attribute(&self.cfg.module_attribute);
        self.document
            .query_all(&marker)
            .into_iter()
            .map(|root| ComponentDescriptor::read(&self.document, root, &self.cfg))
            .collect()
    }

    /// Decodes one descriptor, builds its base, and runs the registered factory.
    pub fn activate(&self, descriptor: &ComponentDescriptor) -> Result<Box<dyn Component>> {
        let factory = self
            .registry
            .get(&descriptor.module_name)
            .ok_or_else(|| ActivationError::UnknownModule(descriptor.module_name.clone()))?;
        let args = descriptor.decode(&self.cfg)?;
        let base = ComponentBase::construct(
            &self.document,
            Some(descriptor.root),
            Some(args),
            self.cfg.falsy_values,
        )?;
        factory.construct(base)
    }

    /// One activation pass. A failing root never stops the others.
    ///
    /// Not idempotent under the default `Reactivation::Always`: a second call
    /// constructs a second instance for every root.
    pub fn init(&self) -> ActivationReport {
        self.forget_disconnected();
        let descriptors = self.discover();
        tracing::info!(
            roots = descriptors.len(),
            modules = self.registry.len(),
            "activation pass started"
        );
        let mut report = ActivationReport::default();
        for descriptor in descriptors {
            let element = self.document.describe(descriptor.root);
            let outcome = self.activate_once(&descriptor, &element);
            report.entries.push(ActivationEntry {
                root: descriptor.root,
                element,
                module: descriptor.module_name,
                outcome,
            });
        }
        let summary = report.summary();
        tracing::info!(
            discovered = summary.discovered,
            activated = summary.activated,
            skipped = summary.skipped,
            failed = summary.failures.len(),
            "activation pass finished"
        );
        report
    }

    /// Drops remembered roots that left the document, so the set tracks live roots only.
    /// A root that is detached and later re-attached is activated again.
    fn forget_disconnected(&self) {
        let mut activated = self.activated.borrow_mut();
        let before = activated.len();
        activated.retain(|root| self.document.is_connected(*root));
        if activated.len() != before {
            tracing::debug!(forgotten = before - activated.len(), "dropped disconnected roots");
        }
    }

    fn activate_once(&self, descriptor: &ComponentDescriptor, element: &str) -> Outcome {
        let module = &descriptor.module_name;
        if self.cfg.reactivation == Reactivation::SkipActivated
            && self.activated.borrow().contains(&descriptor.root)
        {
            tracing::warn!(
                element = %element,
                module = %module,
                "root already activated; skipping"
            );
            return Outcome::Skipped;
        }
        match self.activate(descriptor) {
            Ok(component) => {
                self.activated.borrow_mut().insert(descriptor.root);
                tracing::debug!(
                    element = %element,
                    module = %module,
                    instance = %component.base().instance_id(),
                    "component activated"
                );
                Outcome::Activated(component)
            }
            Err(e) => {
                tracing::error!(
                    element = %element,
                    module = %module,
                    kind = e.kind(),
                    error = %e,
                    "failed to activate component"
                );
                Outcome::Failed(e)
            }
        }
    }
}
