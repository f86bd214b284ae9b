//! The AMF3 value model
//!
//! Containers share their contents through `Rc` and are mutated in place through `RefCell`, so a
//! graph decoded from the wire keeps the sharing that back-references described.

mod array;
mod class_definition;
mod external;
mod object;
mod value;

pub use array::Array;
pub use class_definition::{Attribute, ClassDefinition};
pub use external::ExternalObject;
pub use object::Object;
pub use value::{INTEGER_MAX, INTEGER_MIN, Value};
pub(crate) use value::wrap_i29;

use std::cell::RefCell;
use std::rc::Rc;

/// An ordered list of string keyed values, keys are unique
#[derive(Clone, Default)]
pub(crate) struct Properties(Vec<(Rc<str>, Value)>);

impl Properties {
    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| &**k == key).map(|(_, v)| v)
    }

    /// Replace the value of an existing key in place, or append a new key
    pub(crate) fn set(&mut self, key: Rc<str>, value: Value) -> Option<Value> {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.0.push((key, value));
                None
            }
        }
    }

    pub(crate) fn entries(&self) -> &[(Rc<str>, Value)] {
        &self.0
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }
}

impl PartialEq for Properties {
    /// Two lists are equal when they hold the same key/value pairs, in any order
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.0.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

thread_local! {
    static VISITING: RefCell<Vec<(usize, usize)>> = const { RefCell::new(Vec::new()) };
}

struct Visit((usize, usize));

impl Drop for Visit {
    fn drop(&mut self) {
        VISITING.with(|v| {
            let mut v = v.borrow_mut();
            if let Some(pos) = v.iter().rposition(|k| *k == self.0) {
                v.remove(pos);
            }
        });
    }
}

fn enter<R>(key: (usize, usize), f: impl FnOnce() -> R) -> Option<R> {
    let entered = VISITING.with(|v| {
        let mut v = v.borrow_mut();
        if v.contains(&key) {
            false
        } else {
            v.push(key);
            true
        }
    });
    if !entered {
        return None;
    }

    let _visit = Visit(key);
    Some(f())
}

/// Run `f` while the container at `ptr` is marked as being visited
///
/// Returns `None` without calling `f` when the container is already being visited further up the
/// stack, which is the case when a graph refers back to one of its own ancestors.
pub(crate) fn visit<T: ?Sized, R>(ptr: *const T, f: impl FnOnce() -> R) -> Option<R> {
    enter((ptr as *const () as usize, 0), f)
}

/// Run `f` while the pair of containers at `a` and `b` is marked as being compared
///
/// Returns `None` when the same pair is already being compared further up the stack. Both graphs
/// have then walked the same path back to the pair, so no difference can be found along it.
pub(crate) fn visit_pair<T: ?Sized, R>(
    a: *const T,
    b: *const T,
    f: impl FnOnce() -> R,
) -> Option<R> {
    enter((a as *const () as usize, b as *const () as usize), f)
}
