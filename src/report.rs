use crate::component::Component;
use crate::dom::ElementHandle;
use crate::error::ActivationError;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug)]
pub enum Outcome {
    Activated(Box<dyn Component>),
    /// Already activated by an earlier pass (only under `Reactivation::SkipActivated`).
    Skipped,
    Failed(ActivationError),
}

/// Result of activating one discovered root.
#[derive(Debug)]
pub struct ActivationEntry {
    pub root: ElementHandle,
    /// `describe()` of the root, captured at activation time.
    pub element: String,
    pub module: String,
    pub outcome: Outcome,
}

impl ActivationEntry {
    pub fn instance(&self) -> Option<&(dyn Component + 'static)> {
        match &self.outcome {
            Outcome::Activated(c) => Some(&**c),
            _ => None,
        }
    }
    pub fn error(&self) -> Option<&ActivationError> {
        match &self.outcome {
            Outcome::Failed(e) => Some(e),
            _ => None,
        }
    }
}

/// One entry per discovered root, in document order.
#[derive(Debug, Default)]
pub struct ActivationReport {
    pub entries: Vec<ActivationEntry>,
}

impl ActivationReport {
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    /// No failures (skips are not failures).
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn activated(&self) -> impl Iterator<Item = &(dyn Component + 'static)> {
        self.entries.iter().filter_map(ActivationEntry::instance)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ActivationEntry> {
        self.entries.iter().filter(|e| e.error().is_some())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &ActivationEntry> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Skipped))
    }

    pub fn instances_of<T: Component>(&self) -> impl Iterator<Item = &T> {
        self.activated().filter_map(|c| c.downcast_ref::<T>())
    }

    /// The entry for `root`, if it was discovered in this pass.
    pub fn entry(&self, root: ElementHandle) -> Option<&ActivationEntry> {
        self.entries.iter().find(|e| e.root == root)
    }

    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            discovered: self.entries.len(),
            ..ReportSummary::default()
        };
        for entry in &self.entries {
            match &entry.outcome {
                Outcome::Activated(c) => {
                    summary.activated += 1;
                    summary.instances.push(c.base().instance_id());
                }
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Failed(e) => summary.failures.push(FailureSummary {
                    element: entry.element.clone(),
                    module: entry.module.clone(),
                    kind: e.kind(),
                    message: e.to_string(),
                }),
            }
        }
        summary
    }
}

/// Serializable digest for the embedding application's error channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReportSummary {
    pub discovered: usize,
    pub activated: usize,
    pub skipped: usize,
    pub instances: Vec<Uuid>,
    pub failures: Vec<FailureSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureSummary {
    pub element: String,
    pub module: String,
    pub kind: &'static str,
    pub message: String,
}
