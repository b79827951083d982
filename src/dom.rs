//! In-memory document: an element arena shared through a cheap clonable handle.
//!
//! Everything is single-threaded; the handle is `Rc`-based and the arena sits behind a
//! `RefCell`. Borrows are never held while listener callbacks run, so listeners may
//! freely read the tree, mutate it, or dispatch further events.
//!
//! The arena only grows. `remove` detaches a subtree but its slots stay allocated
//! (and its handles stay valid) until the `Document` itself is dropped, so memory is
//! bounded by the number of elements ever created in that document.
//!
//! Handles carry the id of the document that created them. Passing a handle to a
//! different document never panics: reads come back empty, writes are ignored.
use crate::event::CustomEvent;
use crate::selector::{Selector, SelectorError, SelectorTarget};
use smallvec::SmallVec;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DOCUMENT: AtomicU64 = AtomicU64::new(1);

/// Identity of one element in one document. Equality is element identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementHandle {
    doc: u64,
    index: usize,
}

impl fmt::Debug for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ElementHandle({}:{})", self.doc, self.index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Rc<dyn Fn(&CustomEvent)>;

struct Listener {
    id: ListenerId,
    event_type: String,
    callback: Callback,
}

struct Node {
    tag: String,
    attributes: Vec<(String, String)>,
    parent: Option<usize>,
    children: Vec<usize>,
    listeners: SmallVec<[Listener; 2]>,
}

impl Node {
    fn new(tag: String) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
            parent: None,
            children: Vec::new(),
            listeners: SmallVec::new(),
        }
    }
}

struct Tree {
    nodes: Vec<Node>,
}

impl SelectorTarget for Tree {
    fn tag(&self, el: usize) -> &str {
        &self.nodes[el].tag
    }
    fn attr(&self, el: usize, name: &str) -> Option<&str> {
        self.nodes[el]
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
    fn parent(&self, el: usize) -> Option<usize> {
        self.nodes[el].parent
    }
    fn prev_sibling(&self, el: usize) -> Option<usize> {
        let siblings = &self.nodes[self.nodes[el].parent?].children;
        let at = siblings.iter().position(|c| *c == el)?;
        at.checked_sub(1).map(|i| siblings[i])
    }
    fn child_count(&self, el: usize) -> usize {
        self.nodes[el].children.len()
    }
    fn position(&self, el: usize) -> (usize, usize) {
        let Some(parent) = self.nodes[el].parent else {
            return (1, 1);
        };
        let siblings = &self.nodes[parent].children;
        let at = siblings.iter().position(|c| *c == el).unwrap_or(0);
        (at + 1, siblings.len())
    }
}

impl Tree {
    const ROOT: usize = 0;

    /// Pre-order walk of the connected tree: document order.
    fn document_order(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n].children.iter().rev().copied());
        }
        out
    }

    fn is_connected(&self, el: usize) -> bool {
        self.is_inclusive_ancestor(Self::ROOT, el)
    }

    fn is_inclusive_ancestor(&self, ancestor: usize, mut el: usize) -> bool {
        loop {
            if el == ancestor {
                return true;
            }
            match self.nodes[el].parent {
                Some(p) => el = p,
                None => return false,
            }
        }
    }
}

struct DocumentInner {
    id: u64,
    tree: RefCell<Tree>,
    next_listener: Cell<u64>,
}

/// Shared handle to one document.
#[derive(Clone)]
pub struct Document {
    inner: Rc<DocumentInner>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.inner.id)
            .field("elements", &self.inner.tree.borrow().nodes.len())
            .finish()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Document {
    /// A document holding only its `<html>` document element.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DocumentInner {
                id: NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed),
                tree: RefCell::new(Tree {
                    nodes: vec![Node::new("html".to_string())],
                }),
                next_listener: Cell::new(0),
            }),
        }
    }

    fn handle(&self, index: usize) -> ElementHandle {
        ElementHandle {
            doc: self.inner.id,
            index,
        }
    }

    /// Arena index of `el`, or `None` when it belongs to another document.
    fn idx(&self, el: ElementHandle) -> Option<usize> {
        (el.doc == self.inner.id).then_some(el.index)
    }

    /// Whether `el` was created by this document.
    pub fn owns(&self, el: ElementHandle) -> bool {
        self.idx(el).is_some()
    }

    pub fn document_element(&self) -> ElementHandle {
        self.handle(Tree::ROOT)
    }

    /// A detached element; attach it with `append_child`.
    pub fn create_element(&self, tag: &str) -> ElementHandle {
        let mut tree = self.inner.tree.borrow_mut();
        tree.nodes.push(Node::new(tag.to_ascii_lowercase()));
        self.handle(tree.nodes.len() - 1)
    }

    /// Moves `child` (with its subtree) to the end of `parent`'s children.
    /// Returns `false` when that would create a cycle or either handle is foreign.
    pub fn append_child(&self, parent: ElementHandle, child: ElementHandle) -> bool {
        let (Some(parent), Some(child)) = (self.idx(parent), self.idx(child)) else {
            return false;
        };
        let mut tree = self.inner.tree.borrow_mut();
        if tree.is_inclusive_ancestor(child, parent) {
            return false;
        }
        if let Some(old) = tree.nodes[child].parent.take() {
            tree.nodes[old].children.retain(|c| *c != child);
        }
        tree.nodes[child].parent = Some(parent);
        tree.nodes[parent].children.push(child);
        true
    }

    /// Creates an element with attributes and appends it to `parent`.
    pub fn create_child(
        &self,
        parent: ElementHandle,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> ElementHandle {
        let el = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attribute(el, name, value);
        }
        self.append_child(parent, el);
        el
    }

    /// Detaches `el` and its subtree. The document element cannot be removed.
    pub fn remove(&self, el: ElementHandle) {
        let Some(el) = self.idx(el) else { return };
        let mut tree = self.inner.tree.borrow_mut();
        if let Some(parent) = tree.nodes[el].parent.take() {
            tree.nodes[parent].children.retain(|c| *c != el);
        }
    }

    pub fn is_connected(&self, el: ElementHandle) -> bool {
        self.idx(el)
            .is_some_and(|el| self.inner.tree.borrow().is_connected(el))
    }

    pub fn parent(&self, el: ElementHandle) -> Option<ElementHandle> {
        let el = self.idx(el)?;
        let parent = self.inner.tree.borrow().nodes[el].parent;
        parent.map(|p| self.handle(p))
    }

    pub fn children(&self, el: ElementHandle) -> Vec<ElementHandle> {
        let Some(el) = self.idx(el) else {
            return Vec::new();
        };
        self.inner.tree.borrow().nodes[el]
            .children
            .iter()
            .map(|c| self.handle(*c))
            .collect()
    }

    pub fn tag_name(&self, el: ElementHandle) -> Option<String> {
        let el = self.idx(el)?;
        Some(self.inner.tree.borrow().nodes[el].tag.clone())
    }

    pub fn get_attribute(&self, el: ElementHandle, name: &str) -> Option<String> {
        let el = self.idx(el)?;
        let name = name.to_ascii_lowercase();
        self.inner.tree.borrow().attr(el, &name).map(str::to_string)
    }

    pub fn has_attribute(&self, el: ElementHandle, name: &str) -> bool {
        self.get_attribute(el, name).is_some()
    }

    /// Attribute names are ASCII-lowercased, as HTML does.
    pub fn set_attribute(&self, el: ElementHandle, name: &str, value: &str) {
        let Some(el) = self.idx(el) else { return };
        let name = name.to_ascii_lowercase();
        let mut tree = self.inner.tree.borrow_mut();
        let attrs = &mut tree.nodes[el].attributes;
        match attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => attrs.push((name, value.to_string())),
        }
    }

    pub fn remove_attribute(&self, el: ElementHandle, name: &str) {
        let Some(el) = self.idx(el) else { return };
        let name = name.to_ascii_lowercase();
        self.inner.tree.borrow_mut().nodes[el]
            .attributes
            .retain(|(k, _)| *k != name);
    }

    pub fn id(&self, el: ElementHandle) -> Option<String> {
        self.get_attribute(el, "id")
    }

    pub fn class_list(&self, el: ElementHandle) -> Vec<String> {
        self.get_attribute(el, "class")
            .map(|c| c.split_ascii_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// First connected element matching `selector`, in document order.
    pub fn query_selector(&self, selector: &str) -> Result<Option<ElementHandle>, SelectorError> {
        let sel = Selector::parse(selector)?;
        Ok(self.query_first(&sel))
    }

    /// Every connected element matching `selector`, in document order.
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementHandle>, SelectorError> {
        let sel = Selector::parse(selector)?;
        Ok(self.query_all(&sel))
    }

    pub fn query_first(&self, sel: &Selector) -> Option<ElementHandle> {
        let tree = self.inner.tree.borrow();
        tree.document_order()
            .into_iter()
            .find(|n| sel.matches(&*tree, *n))
            .map(|n| self.handle(n))
    }

    pub fn query_all(&self, sel: &Selector) -> Vec<ElementHandle> {
        let tree = self.inner.tree.borrow();
        tree.document_order()
            .into_iter()
            .filter(|n| sel.matches(&*tree, *n))
            .map(|n| self.handle(n))
            .collect()
    }

    /// Short label such as `section#main.card.wide`, for logs and reports.
    pub fn describe(&self, el: ElementHandle) -> String {
        let Some(mut out) = self.tag_name(el) else {
            return format!("{el:?} (foreign)");
        };
        if let Some(id) = self.id(el) {
            out.push('#');
            out.push_str(&id);
        }
        for class in self.class_list(el) {
            out.push('.');
            out.push_str(&class);
        }
        out
    }

    /// `None` when `el` belongs to another document.
    pub fn add_event_listener<F>(
        &self,
        el: ElementHandle,
        event_type: &str,
        callback: F,
    ) -> Option<ListenerId>
    where
        F: Fn(&CustomEvent) + 'static,
    {
        let el = self.idx(el)?;
        let id = ListenerId(self.inner.next_listener.get());
        self.inner.next_listener.set(id.0 + 1);
        self.inner.tree.borrow_mut().nodes[el].listeners.push(Listener {
            id,
            event_type: event_type.to_string(),
            callback: Rc::new(callback),
        });
        Some(id)
    }

    pub fn remove_event_listener(&self, el: ElementHandle, id: ListenerId) -> bool {
        let Some(el) = self.idx(el) else {
            return false;
        };
        let mut tree = self.inner.tree.borrow_mut();
        let listeners = &mut tree.nodes[el].listeners;
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    fn is_registered(&self, node: usize, id: ListenerId) -> bool {
        self.inner.tree.borrow().nodes[node]
            .listeners
            .iter()
            .any(|l| l.id == id)
    }

    /// Runs listeners on `target`, then on each ancestor when the event bubbles.
    /// Returns `false` if a listener prevented the default of a cancelable event.
    /// A foreign `target` runs nothing and returns `true`.
    pub fn dispatch_event(&self, target: ElementHandle, event: &CustomEvent) -> bool {
        let Some(start) = self.idx(target) else {
            return true;
        };
        event.begin_dispatch(target);
        let path: Vec<usize> = {
            let tree = self.inner.tree.borrow();
            let mut path = vec![start];
            if event.is_bubbling() {
                let mut cur = tree.nodes[start].parent;
                while let Some(p) = cur {
                    path.push(p);
                    cur = tree.nodes[p].parent;
                }
            }
            path
        };
        for node in path {
            // Additions during dispatch do not run now; removals take effect at once.
            let snapshot: SmallVec<[(ListenerId, Callback); 4]> = {
                let tree = self.inner.tree.borrow();
                tree.nodes[node]
                    .listeners
                    .iter()
                    .filter(|l| l.event_type == event.event_type())
                    .map(|l| (l.id, l.callback.clone()))
                    .collect()
            };
            event.set_current_target(Some(self.handle(node)));
            for (id, cb) in snapshot {
                if !self.is_registered(node, id) {
                    continue;
                }
                cb(event);
                if event.immediate_stopped() {
                    break;
                }
            }
            if event.propagation_stopped() {
                break;
            }
        }
        event.set_current_target(None);
        !event.default_prevented()
    }
}
