//! Tagged script values.
//!
//! A `Value` is exactly one of the eight script types. Strings are immutable
//! byte sequences shared by content; arrays, objects and closures hold
//! [`VarRef`] slots rather than embedded values, so writing through one
//! reference is observed by every other holder of the same cell.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::variable::VarRef;

/// Insertion-ordered mapping from byte-string keys to variable slots.
///
/// Keys are unique; replacing a key keeps its original position. Lookup is a
/// linear scan, which matches the handful of properties a script object
/// typically carries.
#[derive(Clone, Default)]
pub struct ObjectMap {
    entries: Vec<(Rc<[u8]>, VarRef)>,
}

impl ObjectMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &[u8]) -> Option<&VarRef> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_ref() == key)
            .map(|(_, v)| v)
    }

    /// Inserts or replaces a slot, returning the displaced one. A replaced
    /// key keeps its insertion position.
    pub fn insert(&mut self, key: impl Into<Rc<[u8]>>, var: VarRef) -> Option<VarRef> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, var)),
            None => {
                self.entries.push((key, var));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<VarRef> {
        let pos = self.entries.iter().position(|(k, _)| k.as_ref() == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Rc<[u8]>, &VarRef)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

/// The closure record carried by a function value.
///
/// Captured slots may be appended after the function value has been built,
/// which is how a closure comes to capture a cell that reaches back to the
/// closure itself.
pub struct Closure {
    name: String,
    captures: RefCell<Vec<VarRef>>,
}

impl Closure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            captures: RefCell::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capture(&self, var: VarRef) {
        self.captures.borrow_mut().push(var);
    }

    pub fn capture_count(&self) -> usize {
        self.captures.borrow().len()
    }
}

/// A script value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    String(Rc<[u8]>),
    Array(Vec<VarRef>),
    Object(ObjectMap),
    Function(Rc<Closure>),
}

impl Value {
    /// The script-visible type name.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[VarRef]> {
        match self {
            Value::Array(elems) => Some(elems),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<VarRef>> {
        match self {
            Value::Array(elems) => Some(elems),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectMap> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Rc<Closure>> {
        match self {
            Value::Function(c) => Some(c),
            _ => None,
        }
    }

    /// Invokes `callback` once per variable slot this value owns.
    ///
    /// Scalars own nothing; arrays and objects visit their element slots;
    /// functions visit their captures. The enumeration has no side effects on
    /// the visited graph and is stable across repeated calls, which the
    /// collector relies on within a single pass.
    pub fn for_each_referenced_variable(&self, callback: &mut dyn FnMut(&VarRef)) {
        match self {
            Value::Null
            | Value::Boolean(_)
            | Value::Integer(_)
            | Value::Real(_)
            | Value::String(_) => {}
            Value::Array(elems) => {
                for slot in elems {
                    callback(slot);
                }
            }
            Value::Object(map) => {
                for (_, slot) in map.iter() {
                    callback(slot);
                }
            }
            Value::Function(closure) => {
                for slot in closure.captures.borrow().iter() {
                    callback(slot);
                }
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(r: f64) -> Self {
        Value::Real(r)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s.as_bytes()))
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::String(Rc::from(bytes))
    }
}

impl From<Vec<VarRef>> for Value {
    fn from(elems: Vec<VarRef>) -> Self {
        Value::Array(elems)
    }
}

impl From<ObjectMap> for Value {
    fn from(map: ObjectMap) -> Self {
        Value::Object(map)
    }
}

const MAX_PRINT_DEPTH: usize = 32;

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value, depth: usize) -> fmt::Result {
    if depth > MAX_PRINT_DEPTH {
        return f.write_str("...");
    }
    match value {
        Value::Null => f.write_str("null"),
        Value::Boolean(b) => write!(f, "{}", b),
        Value::Integer(i) => write!(f, "{}", i),
        Value::Real(r) => write!(f, "{}", r),
        Value::String(s) => write!(f, "{:?}", String::from_utf8_lossy(s)),
        Value::Array(elems) => {
            f.write_str("[")?;
            for (i, slot) in elems.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_slot(f, slot, depth + 1)?;
            }
            f.write_str("]")
        }
        Value::Object(map) => {
            f.write_str("{")?;
            for (i, (key, slot)) in map.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{:?}: ", String::from_utf8_lossy(key))?;
                write_slot(f, slot, depth + 1)?;
            }
            f.write_str("}")
        }
        Value::Function(closure) => write!(f, "func {}", closure.name()),
    }
}

fn write_slot(f: &mut fmt::Formatter<'_>, slot: &VarRef, depth: usize) -> fmt::Result {
    match slot.get_value() {
        Some(value) => write_value(f, &value, depth),
        None => f.write_str("<unset>"),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, 0)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name(), self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::Variable;

    #[test]
    fn scalars_reference_no_variables() {
        for value in [
            Value::Null,
            Value::from(true),
            Value::from(42i64),
            Value::from(1.5),
            Value::from("text"),
        ] {
            let mut count = 0;
            value.for_each_referenced_variable(&mut |_| count += 1);
            assert_eq!(count, 0, "{:?}", value);
        }
    }

    #[test]
    fn composites_visit_each_slot_once() {
        let a = Variable::new_cell();
        let b = Variable::new_cell();
        a.initialize(Value::from(1i64), false);
        b.initialize(Value::from(2i64), false);

        let array = Value::from(vec![a.clone(), b.clone(), a.clone()]);
        let mut seen = Vec::new();
        array.for_each_referenced_variable(&mut |slot| seen.push(Rc::as_ptr(slot)));
        // One visit per slot: the repeated cell appears twice.
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], seen[2]);

        let mut map = ObjectMap::new();
        map.insert(Rc::<[u8]>::from(&b"x"[..]), a.clone());
        map.insert(Rc::<[u8]>::from(&b"y"[..]), b.clone());
        let object = Value::from(map);
        let mut count = 0;
        object.for_each_referenced_variable(&mut |_| count += 1);
        assert_eq!(count, 2);
    }

    #[test]
    fn closures_visit_their_captures() {
        let cell = Variable::new_cell();
        cell.initialize(Value::Null, false);
        let closure = Rc::new(Closure::new("callback"));
        closure.capture(cell.clone());
        let function = Value::Function(closure);
        let mut count = 0;
        function.for_each_referenced_variable(&mut |slot| {
            assert!(Rc::ptr_eq(slot, &cell));
            count += 1;
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn enumeration_is_idempotent() {
        let cell = Variable::new_cell();
        cell.initialize(Value::from(0i64), false);
        let value = Value::from(vec![cell.clone(), cell.clone()]);
        let collect = |value: &Value| {
            let mut seen = Vec::new();
            value.for_each_referenced_variable(&mut |slot| seen.push(Rc::as_ptr(slot)));
            seen
        };
        assert_eq!(collect(&value), collect(&value));
    }

    #[test]
    fn object_map_preserves_insertion_order() {
        let mut map = ObjectMap::new();
        for key in [&b"one"[..], b"two", b"three"] {
            let cell = Variable::new_cell();
            cell.initialize(Value::Null, false);
            map.insert(Rc::<[u8]>::from(key), cell);
        }
        let keys: Vec<_> = map.iter().map(|(k, _)| k.as_ref().to_vec()).collect();
        assert_eq!(keys, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);

        // Replacing a key keeps its position.
        let replacement = Variable::new_cell();
        replacement.initialize(Value::from(9i64), false);
        assert!(map.insert(Rc::<[u8]>::from(&b"two"[..]), replacement).is_some());
        let keys: Vec<_> = map.iter().map(|(k, _)| k.as_ref().to_vec()).collect();
        assert_eq!(keys, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);

        assert!(map.remove(b"two").is_some());
        assert!(map.get(b"two").is_none());
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn display_guards_against_cycles() {
        let cell = Variable::new_cell();
        cell.initialize(Value::Array(vec![cell.clone()]), false);
        // The cell's array contains the cell itself; printing must terminate.
        let text = cell.value().to_string();
        assert!(text.contains("..."));
        cell.uninitialize();
    }

    #[test]
    fn type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::from(1i64).type_name(), "integer");
        assert_eq!(Value::from(1.0).type_name(), "real");
        assert_eq!(Value::from("s").type_name(), "string");
        assert_eq!(Value::Array(Vec::new()).type_name(), "array");
        assert_eq!(Value::Object(ObjectMap::new()).type_name(), "object");
    }
}
