use super::{Properties, Value, visit, visit_pair};
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// An AMF3 array: a dense, ordered list plus a string keyed associative part
///
/// Arrays are shared through `Rc<Array>` and mutated in place.
#[derive(Default)]
pub struct Array {
    dense: RefCell<Vec<Value>>,
    associative: RefCell<Properties>,
}

impl Array {
    /// An empty array
    pub fn new() -> Self {
        Self::default()
    }

    /// An array whose dense part holds `values`
    pub fn from_dense(values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            dense: RefCell::new(values.into_iter().collect()),
            associative: RefCell::default(),
        }
    }

    /// Append to the dense part
    pub fn push(&self, value: Value) {
        self.dense.borrow_mut().push(value);
    }

    /// The dense element at `index`
    pub fn get(&self, index: usize) -> Option<Value> {
        self.dense.borrow().get(index).cloned()
    }

    /// Replace the dense element at `index`, returning the old value
    pub fn replace(&self, index: usize, value: Value) -> Option<Value> {
        self.dense
            .borrow_mut()
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, value))
    }

    /// The number of dense elements
    pub fn len(&self) -> usize {
        self.dense.borrow().len()
    }

    /// Whether both parts are empty
    pub fn is_empty(&self) -> bool {
        self.dense.borrow().is_empty() && self.associative.borrow().len() == 0
    }

    /// The dense elements, in order
    pub fn dense(&self) -> Ref<'_, [Value]> {
        Ref::map(self.dense.borrow(), |d| d.as_slice())
    }

    /// The first dense element matching `predicate`, elements after it are not visited
    pub fn find(&self, mut predicate: impl FnMut(&Value) -> bool) -> Option<Value> {
        self.dense.borrow().iter().find(|v| predicate(v)).cloned()
    }

    /// Set an associative property, replacing an existing key in place or appending a new one
    pub fn set_property(&self, key: impl Into<Rc<str>>, value: Value) -> Option<Value> {
        self.associative.borrow_mut().set(key.into(), value)
    }

    /// The associative property called `key`
    pub fn property(&self, key: &str) -> Option<Value> {
        self.associative.borrow().get(key).cloned()
    }

    /// The associative properties, in insertion order
    pub fn associative(&self) -> Ref<'_, [(Rc<str>, Value)]> {
        Ref::map(self.associative.borrow(), |a| a.entries())
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        visit_pair(self as *const Self, other as *const Self, || {
            *self.dense.borrow() == *other.dense.borrow()
                && *self.associative.borrow() == *other.associative.borrow()
        })
        .unwrap_or(true)
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        visit(self as *const Self, || {
            f.debug_struct("Array")
                .field("dense", &&*self.dense())
                .field("associative", &&*self.associative())
                .finish()
        })
        .unwrap_or_else(|| f.write_str("Array(<cycle>)"))
    }
}
