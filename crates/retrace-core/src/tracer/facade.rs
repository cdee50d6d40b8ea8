use std::rc::Rc;

use tracing::debug;

use crate::evaluator::{Frame, Slot};

/// A flattened view of a scope chain. Every non-global binding visible from
/// the starting frame is aliased into one facade frame whose parent is the
/// global frame; inner bindings shadow outer ones. Slots are shared, so
/// writes through the facade land in the original variables.
#[derive(Debug)]
pub struct ScopeFacade {
    frame: Rc<Frame>,
    locals: Vec<(String, Slot)>,
    levels: usize,
    reused_facade: bool,
}

impl ScopeFacade {
    /// Facade for code running in `frame`, whose own bindings are the
    /// caller's locals
    pub fn for_frame(frame: &Rc<Frame>) -> Self {
        let mut facade = Self::build(frame);
        if !frame.is_global() && !frame.is_facade() {
            facade.locals = frame.bindings();
        }
        facade
    }

    /// Facade over the scope a closure was defined in
    pub fn for_closure_scope(scope: &Rc<Frame>) -> Self {
        Self::build(scope)
    }

    fn build(start: &Rc<Frame>) -> Self {
        let mut facade = ScopeFacade {
            frame: Frame::facade(start.root()),
            locals: Vec::new(),
            levels: 0,
            reused_facade: false,
        };
        facade.merge_chain(start);
        debug!(
            "Built scope facade over {} levels with {} bindings",
            facade.levels,
            facade.frame.len()
        );
        facade
    }

    /// Parents are merged before children so inner bindings win. An existing
    /// facade already holds everything above it, so merging stops there.
    fn merge_chain(&mut self, frame: &Rc<Frame>) {
        if frame.is_global() {
            return;
        }
        if frame.is_facade() {
            self.reused_facade = true;
        } else if let Some(parent) = frame.parent() {
            self.merge_chain(parent);
        }
        for (name, slot) in frame.bindings() {
            self.frame.alias(&name, slot);
        }
        self.levels += 1;
    }

    pub fn frame(&self) -> &Rc<Frame> {
        &self.frame
    }

    /// The starting frame's own bindings
    pub fn locals(&self) -> &[(String, Slot)] {
        &self.locals
    }

    /// Number of scope levels merged
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// True if merging stopped at a facade built by an enclosing trace
    pub fn reused_facade(&self) -> bool {
        self.reused_facade
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::Value;

    #[test]
    fn inner_bindings_shadow_outer_ones() {
        let global = Frame::global();
        global.declare("g", Value::Number(0.0));
        let outer = Frame::function(Rc::clone(&global));
        outer.declare("x", Value::from("outer"));
        outer.declare("y", Value::Number(1.0));
        let inner = Frame::function(Rc::clone(&outer));
        inner.declare("x", Value::from("inner"));

        let facade = ScopeFacade::for_frame(&inner);
        assert_eq!(facade.frame().get("x"), Some(Value::from("inner")));
        assert_eq!(facade.frame().get("y"), Some(Value::Number(1.0)));
        // globals are reached through the parent, not copied
        assert!(facade.frame().own_slot("g").is_none());
        assert_eq!(facade.frame().get("g"), Some(Value::Number(0.0)));
        assert_eq!(facade.levels(), 2);
        assert_eq!(facade.locals().len(), 1);
    }

    #[test]
    fn merging_stops_at_existing_facade() {
        let global = Frame::global();
        let outer = Frame::function(Rc::clone(&global));
        outer.declare("a", Value::Number(1.0));
        let first = ScopeFacade::for_frame(&outer);
        let replay = Frame::function(Rc::clone(first.frame()));
        replay.declare("b", Value::Number(2.0));

        let second = ScopeFacade::for_frame(&replay);
        assert!(second.reused_facade());
        assert_eq!(second.levels(), 2);
        assert_eq!(second.frame().get("a"), Some(Value::Number(1.0)));
        assert_eq!(second.frame().get("b"), Some(Value::Number(2.0)));
    }

    #[test]
    fn writes_reach_the_original_frame() {
        let global = Frame::global();
        let outer = Frame::function(Rc::clone(&global));
        outer.declare("count", Value::Number(1.0));
        let facade = ScopeFacade::for_closure_scope(&outer);
        facade.frame().declare("count", Value::Number(9.0));
        assert_eq!(outer.get("count"), Some(Value::Number(9.0)));
        assert!(facade.locals().is_empty());
    }
}
