//! Declarative component activation for server-rendered HTML.
//!
//! Markup marks component roots with a module attribute and carries JSON props and
//! ref selectors in sibling attributes; a [`System`](system::System) finds those
//! roots and constructs one registered component per root.
pub mod component;
pub mod config;
pub mod descriptor;
pub mod dom;
pub mod error;
pub mod event;
pub mod registry;
pub mod report;
pub mod selector;
pub mod system;

pub mod prelude {
    pub use crate::component::{
        emit, Component, ComponentArgs, ComponentBase, Construct, NoProps, Props, ReferenceMap,
        ResolvedRefs,
    };
    pub use crate::config::{FalsyValues, Reactivation, SystemConfig};
    pub use crate::dom::{Document, ElementHandle};
    pub use crate::error::{ActivationError, Result};
    pub use crate::event::CustomEvent;
    pub use crate::registry::ComponentRegistry;
    pub use crate::report::{ActivationReport, Outcome};
    pub use crate::system::System;
}
