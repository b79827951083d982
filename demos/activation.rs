//! Activates a small page: a toggle panel wired through refs, a greeter, and one broken root.
use plain_modules::prelude::*;
use serde::Deserialize;
use serde_json::json;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PanelProps {
    open: Option<bool>,
}

struct TogglePanel {
    base: ComponentBase,
    open: Rc<Cell<bool>>,
}

impl Component for TogglePanel {
    fn base(&self) -> &ComponentBase {
        &self.base
    }
}

impl Construct for TogglePanel {
    type Props = PanelProps;
    fn construct(base: ComponentBase, props: PanelProps) -> anyhow::Result<Self> {
        let toggle = base
            .ref_element("toggle")
            .ok_or_else(|| anyhow::anyhow!("panel needs a toggle ref"))?;
        let open = Rc::new(Cell::new(props.open.unwrap_or(false)));
        let doc = base.document().clone();
        let root = base.root_element();
        let state = open.clone();
        base.document().add_event_listener(toggle, "click", move |_| {
            state.set(!state.get());
            emit(&doc, root, "panel:toggled", json!({ "open": state.get() }));
        });
        Ok(Self { base, open })
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_target(false)
        .init();

    let doc = Document::new();
    let body = doc.create_child(doc.document_element(), "body", &[]);
    doc.create_child(
        body,
        "section",
        &[
            ("id", "faq"),
            ("data-plain-module", "toggle-panel"),
            ("data-plain-args", r#"{"open":false}"#),
            ("data-plain-refs", r##"{"toggle":"#faq-toggle"}"##),
        ],
    );
    let button = doc.create_child(body, "button", &[("id", "faq-toggle")]);
    doc.create_child(
        body,
        "p",
        &[("data-plain-module", "greeter"), ("data-plain-args", r#"{"name":"reader"}"#)],
    );
    doc.create_child(body, "div", &[("id", "broken"), ("data-plain-module", "toggle-panel")]);

    doc.add_event_listener(body, "panel:toggled", |ev| {
        tracing::info!(detail = %ev.detail(), "panel toggled");
    });

    let mut registry = ComponentRegistry::new();
    registry.register::<TogglePanel>("toggle-panel");
    registry.register_fn("greeter", |base| {
        let name = base.prop("name").and_then(|v| v.as_str()).unwrap_or("stranger");
        tracing::info!("hello, {name}");
        Ok(Box::new(base))
    });

    let system = System::new(doc.clone(), registry);
    let report = system.init();

    doc.dispatch_event(button, &CustomEvent::new("click"));
    for panel in report.instances_of::<TogglePanel>() {
        tracing::info!(open = panel.open.get(), "panel state after click");
    }

    println!("{}", serde_json::to_string_pretty(&report.summary())?);
    Ok(())
}
