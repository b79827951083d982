use plain_modules::component::resolve_refs;
use plain_modules::prelude::*;

fn refs(pairs: &[(&str, &str)]) -> ReferenceMap {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn each_name_maps_to_the_first_match() {
    let doc = Document::new();
    let root = doc.document_element();
    let form = doc.create_child(root, "form", &[("class", "search")]);
    let input = doc.create_child(form, "input", &[("name", "q")]);
    let first_btn = doc.create_child(form, "button", &[("type", "submit")]);
    doc.create_child(form, "button", &[("type", "reset")]);

    let map = refs(&[("query", "form.search input[name=q]"), ("button", "form > button")]);
    let resolved = resolve_refs(&doc, &map).unwrap();

    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved.get("query"), Some(input));
    assert_eq!(resolved.get("button"), Some(first_btn));
    assert_eq!(resolved.get("button"), doc.query_selector("form > button").unwrap());
}

#[test]
fn unmatched_selector_resolves_to_none_without_error() {
    let doc = Document::new();
    let map = refs(&[("missing", "#nowhere")]);
    let resolved = resolve_refs(&doc, &map).unwrap();
    assert!(resolved.contains("missing"));
    assert_eq!(resolved.get("missing"), None);
    assert_eq!(resolved.iter().collect::<Vec<_>>(), vec![("missing", None)]);
}

#[test]
fn resolution_leaves_the_selector_map_untouched() {
    let doc = Document::new();
    doc.create_child(doc.document_element(), "nav", &[("id", "menu")]);
    let map = refs(&[("menu", "#menu")]);
    let before = map.clone();
    let a = resolve_refs(&doc, &map).unwrap();
    let b = resolve_refs(&doc, &map).unwrap();
    assert_eq!(map, before);
    assert_eq!(a, b);
}

#[test]
fn refs_are_resolved_once_at_construction() {
    let doc = Document::new();
    let root = doc.document_element();
    let old = doc.create_child(root, "span", &[("class", "badge")]);
    let args = ComponentArgs::default().with_refs(refs(&[("badge", ".badge")]));
    let base = ComponentBase::construct(&doc, Some(root), Some(args), FalsyValues::CoerceToNull).unwrap();

    // Swapping the matched element out does not change what the instance holds.
    let newer = doc.create_element("span");
    doc.set_attribute(newer, "class", "badge");
    doc.remove(old);
    doc.append_child(root, newer);

    assert_eq!(base.ref_element("badge"), Some(old));
    assert_eq!(doc.query_selector(".badge").unwrap(), Some(newer));
}

#[test]
fn empty_refs_attribute_still_counts_as_having_refs() {
    let doc = Document::new();
    let el = doc.create_child(
        doc.document_element(),
        "div",
        &[("data-plain-module", "widget"), ("data-plain-refs", "{}")],
    );
    let mut reg = ComponentRegistry::new();
    reg.register::<ComponentBase>("widget");
    let report = System::new(doc, reg).init();

    let widget = report.entry(el).and_then(|e| e.instance()).unwrap().base();
    assert!(widget.has_refs());
    assert!(widget.refs().is_some_and(|r| r.is_empty()));
}

#[test]
fn bad_refs_fail_their_element_only() {
    let doc = Document::new();
    let root = doc.document_element();
    let invalid = doc.create_child(root, "div", &[("data-plain-module", "w"), ("data-plain-refs", r#"{"a":"div >"}"#)]);
    let non_string = doc.create_child(root, "div", &[("data-plain-module", "w"), ("data-plain-refs", r#"{"a":5}"#)]);
    let not_object = doc.create_child(root, "div", &[("data-plain-module", "w"), ("data-plain-refs", "\"a\"")]);
    let fine = doc.create_child(root, "div", &[("data-plain-module", "w"), ("data-plain-refs", r#"{"a":"div"}"#)]);

    let mut reg = ComponentRegistry::new();
    reg.register::<ComponentBase>("w");
    let report = System::new(doc, reg).init();

    assert!(matches!(
        report.entry(invalid).and_then(|e| e.error()),
        Some(ActivationError::InvalidSelector { name, selector, .. }) if name == "a" && selector == "div >"
    ));
    assert!(matches!(
        report.entry(non_string).and_then(|e| e.error()),
        Some(ActivationError::MalformedConfiguration { attribute, .. }) if attribute == "data-plain-refs"
    ));
    assert_eq!(
        report.entry(not_object).and_then(|e| e.error()).map(|e| e.kind()),
        Some("malformed_configuration")
    );
    let fine = report.entry(fine).and_then(|e| e.instance()).unwrap().base();
    // first div in document order is the first root itself
    assert_eq!(fine.ref_element("a"), Some(invalid));
}

#[test]
fn refs_accept_structural_and_escaped_selectors() {
    let doc = Document::new();
    let root = doc.document_element();
    let list = doc.create_child(root, "ul", &[]);
    let first = doc.create_child(list, "li", &[]);
    doc.create_child(list, "li", &[("class", "x")]);
    doc.create_child(root, "h2", &[]);
    let p = doc.create_child(root, "p", &[]);
    let odd = doc.create_child(root, "div", &[("id", "a:b")]);
    let el = doc.create_child(
        root,
        "section",
        &[
            ("data-plain-module", "w"),
            (
                "data-plain-refs",
                r##"{"first":"li:first-child","next":"h2 + p","esc":"#a\\:b","plain":"li:not(.x)"}"##,
            ),
        ],
    );

    let mut reg = ComponentRegistry::new();
    reg.register::<ComponentBase>("w");
    let report = System::new(doc.clone(), reg).init();

    assert!(report.is_clean(), "{:?}", report.summary());
    let base = report.entry(el).and_then(|e| e.instance()).unwrap().base();
    assert_eq!(base.ref_element("first"), Some(first));
    assert_eq!(base.ref_element("next"), Some(p));
    assert_eq!(base.ref_element("esc"), Some(odd));
    assert_eq!(base.ref_element("plain"), Some(first));
    assert_eq!(base.ref_element("next"), doc.query_selector("h2 + p").unwrap());
}
