use std::{cell::RefCell, fmt, rc::Rc};

use indexmap::IndexMap;

use super::value::Value;

/// A single binding. Slots are shared between frames, so a facade that
/// aliases a slot reads and writes the original variable.
pub type Slot = Rc<RefCell<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Global,
    Function,
    /// Flattened copy of a caller's scope chain
    Facade,
}

/// One level of a lexical scope chain
pub struct Frame {
    kind: FrameKind,
    slots: RefCell<IndexMap<String, Slot>>,
    parent: Option<Rc<Frame>>,
}

impl Frame {
    pub fn global() -> Rc<Frame> {
        Rc::new(Frame {
            kind: FrameKind::Global,
            slots: RefCell::new(IndexMap::new()),
            parent: None,
        })
    }

    pub fn function(parent: Rc<Frame>) -> Rc<Frame> {
        Self::child(FrameKind::Function, parent)
    }

    pub fn facade(parent: Rc<Frame>) -> Rc<Frame> {
        Self::child(FrameKind::Facade, parent)
    }

    fn child(kind: FrameKind, parent: Rc<Frame>) -> Rc<Frame> {
        Rc::new(Frame {
            kind,
            slots: RefCell::new(IndexMap::new()),
            parent: Some(parent),
        })
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn is_global(&self) -> bool {
        self.kind == FrameKind::Global
    }

    pub fn is_facade(&self) -> bool {
        self.kind == FrameKind::Facade
    }

    pub fn parent(&self) -> Option<&Rc<Frame>> {
        self.parent.as_ref()
    }

    /// The outermost frame of this chain
    pub fn root(self: &Rc<Self>) -> Rc<Frame> {
        let mut frame = Rc::clone(self);
        while let Some(parent) = frame.parent.clone() {
            frame = parent;
        }
        frame
    }

    /// Bind `name` in this frame. Re-declaring an existing name assigns to
    /// the existing slot instead of shadowing it.
    pub fn declare(&self, name: &str, value: Value) -> Slot {
        let mut slots = self.slots.borrow_mut();
        if let Some(slot) = slots.get(name) {
            *slot.borrow_mut() = value;
            return Rc::clone(slot);
        }
        let slot = Rc::new(RefCell::new(value));
        slots.insert(name.to_string(), Rc::clone(&slot));
        slot
    }

    /// Bind `name` to `undefined` unless this frame already has it
    pub fn declare_hoisted(&self, name: &str) {
        self.slots
            .borrow_mut()
            .entry(name.to_string())
            .or_insert_with(|| Rc::new(RefCell::new(Value::Undefined)));
    }

    /// Bind `name` to an existing slot, replacing any binding of that name here
    pub fn alias(&self, name: &str, slot: Slot) {
        self.slots.borrow_mut().insert(name.to_string(), slot);
    }

    pub fn own_slot(&self, name: &str) -> Option<Slot> {
        self.slots.borrow().get(name).cloned()
    }

    /// Resolve `name` through this frame and its ancestors
    pub fn lookup(&self, name: &str) -> Option<Slot> {
        let mut frame = Some(self);
        while let Some(current) = frame {
            if let Some(slot) = current.own_slot(name) {
                return Some(slot);
            }
            frame = current.parent.as_deref();
        }
        None
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.lookup(name).map(|slot| slot.borrow().clone())
    }

    /// Own bindings in declaration order
    pub fn bindings(&self) -> Vec<(String, Slot)> {
        self.slots
            .borrow()
            .iter()
            .map(|(name, slot)| (name.clone(), Rc::clone(slot)))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.slots.borrow().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.borrow().is_empty()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("kind", &self.kind)
            .field("names", &self.names())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
