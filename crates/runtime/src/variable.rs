//! Garbage-collected variable cells.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// Shared handle to a variable cell.
///
/// The strong count of this handle *is* the cell's reference count: one for
/// the collector's tracked set, one per composite-value slot, one per root
/// handle held by the embedder.
pub type VarRef = Rc<Variable>;

/// A heap cell holding a script value plus its bookkeeping.
///
/// Cells are created by [`GarbageCollector::create_variable`] and start
/// uninitialized. `initialize` gives the cell its first value and mutability;
/// `assign` replaces the value in place, which every holder of the cell
/// observes. The `gc_ref` scratch counter is meaningful only while a
/// collection pass is running.
///
/// [`GarbageCollector::create_variable`]: crate::GarbageCollector::create_variable
pub struct Variable {
    value: RefCell<Option<Value>>,
    immutable: Cell<bool>,
    gc_ref: Cell<usize>,
}

impl Variable {
    pub(crate) fn new_cell() -> VarRef {
        Rc::new(Variable {
            value: RefCell::new(None),
            immutable: Cell::new(false),
            gc_ref: Cell::new(0),
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.value.borrow().is_some()
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable.get()
    }

    pub fn set_immutable(&self, immutable: bool) {
        self.immutable.set(immutable);
    }

    /// Gives the cell its value and mutability in one step.
    pub fn initialize(&self, value: Value, immutable: bool) {
        *self.value.borrow_mut() = Some(value);
        self.immutable.set(immutable);
    }

    /// Replaces the contained value in place.
    ///
    /// Writing an immutable initialized cell is an invariant violation and
    /// fails fast.
    pub fn assign(&self, value: Value) {
        let mut slot = self.value.borrow_mut();
        if self.immutable.get() && slot.is_some() {
            panic!("[rye runtime] attempt to modify an immutable variable");
        }
        *slot = Some(value);
    }

    /// The contained value. Reading an uninitialized cell is an invariant
    /// violation and fails fast; use [`Variable::get_value`] to probe.
    pub fn value(&self) -> Ref<'_, Value> {
        Ref::map(self.value.borrow(), |slot| {
            slot.as_ref()
                .expect("[rye runtime] read of an uninitialized variable")
        })
    }

    pub fn get_value(&self) -> Option<Ref<'_, Value>> {
        Ref::filter_map(self.value.borrow(), |slot| slot.as_ref()).ok()
    }

    /// Drops the contained value, breaking every outgoing reference, and
    /// clears the flags so a pooled cell starts fresh.
    pub fn uninitialize(&self) {
        *self.value.borrow_mut() = None;
        self.immutable.set(false);
    }

    /// Enumerates the variables the contained value references, if any.
    pub fn for_each_referenced_variable(&self, callback: &mut dyn FnMut(&VarRef)) {
        if let Some(value) = self.value.borrow().as_ref() {
            value.for_each_referenced_variable(callback);
        }
    }

    pub(crate) fn gc_ref(&self) -> usize {
        self.gc_ref.get()
    }

    pub(crate) fn set_gc_ref(&self, count: usize) {
        self.gc_ref.set(count);
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get_value() {
            Some(value) => write!(
                f,
                "Variable({}{:?})",
                if self.immutable.get() { "const " } else { "" },
                &*value
            ),
            None => f.write_str("Variable(<unset>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uninitialized_and_mutable() {
        let cell = Variable::new_cell();
        assert!(!cell.is_initialized());
        assert!(!cell.is_immutable());
        assert!(cell.get_value().is_none());
    }

    #[test]
    fn initialize_then_assign() {
        let cell = Variable::new_cell();
        cell.initialize(Value::from(1i64), false);
        assert_eq!(cell.value().as_integer(), Some(1));
        cell.assign(Value::from(2i64));
        assert_eq!(cell.value().as_integer(), Some(2));
    }

    #[test]
    fn assignment_is_visible_through_every_handle() {
        let cell = Variable::new_cell();
        cell.initialize(Value::from(1i64), false);
        let alias = cell.clone();
        cell.assign(Value::from("replaced"));
        assert_eq!(alias.value().as_string(), Some(&b"replaced"[..]));
    }

    #[test]
    fn assign_initializes_an_empty_cell() {
        let cell = Variable::new_cell();
        cell.assign(Value::from(7i64));
        assert!(cell.is_initialized());
    }

    #[test]
    #[should_panic(expected = "immutable variable")]
    fn immutable_write_fails_fast() {
        let cell = Variable::new_cell();
        cell.initialize(Value::from(1i64), true);
        cell.assign(Value::from(2i64));
    }

    #[test]
    fn immutable_cell_can_be_initialized_once() {
        let cell = Variable::new_cell();
        cell.set_immutable(true);
        // The first write to an uninitialized cell is allowed.
        cell.assign(Value::from(1i64));
        assert_eq!(cell.value().as_integer(), Some(1));
    }

    #[test]
    fn uninitialize_drops_the_value_and_flags() {
        let cell = Variable::new_cell();
        cell.initialize(Value::from(1i64), true);
        cell.uninitialize();
        assert!(!cell.is_initialized());
        assert!(!cell.is_immutable());
    }

    #[test]
    fn uninitialize_breaks_outgoing_references() {
        let target = Variable::new_cell();
        target.initialize(Value::Null, false);
        let holder = Variable::new_cell();
        holder.initialize(Value::from(vec![target.clone()]), false);
        assert_eq!(Rc::strong_count(&target), 2);
        holder.uninitialize();
        assert_eq!(Rc::strong_count(&target), 1);
    }
}
