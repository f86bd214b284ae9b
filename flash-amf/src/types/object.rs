use super::{ClassDefinition, ExternalObject, Properties, Value, visit, visit_pair};
use crate::errors::PropertyError;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

enum Body {
    Members {
        sealed: RefCell<Vec<Value>>,
        dynamic: RefCell<Properties>,
    },
    External(RefCell<Option<Box<dyn ExternalObject>>>),
}

/// An instance of an AMF3 class
///
/// The class definition, and with it whether the object is dynamic or externalizable, is fixed
/// when the object is created. Declared members start out as `Undefined`.
pub struct Object {
    class_def: Rc<ClassDefinition>,
    body: Body,
}

impl Object {
    /// A new instance of `class_def` with every declared member `Undefined`
    ///
    /// Instances of an externalizable class start without a payload.
    pub fn new(class_def: Rc<ClassDefinition>) -> Self {
        let body = if class_def.is_external() {
            Body::External(RefCell::new(None))
        } else {
            Body::Members {
                sealed: RefCell::new(vec![Value::Undefined; class_def.static_properties().len()]),
                dynamic: RefCell::default(),
            }
        };

        Self { class_def, body }
    }

    /// A new anonymous object with no properties, the equivalent of `{}`
    pub fn anonymous() -> Self {
        Self::new(Rc::new(ClassDefinition::default()))
    }

    /// A new externalizable object of class `class_name` holding `payload`
    pub fn with_external(class_name: &str, payload: Box<dyn ExternalObject>) -> Self {
        Self {
            class_def: Rc::new(ClassDefinition::external(class_name)),
            body: Body::External(RefCell::new(Some(payload))),
        }
    }

    /// The class of this object
    pub fn class_def(&self) -> &Rc<ClassDefinition> {
        &self.class_def
    }

    /// The name of the class of this object
    pub fn class_name(&self) -> &str {
        self.class_def.name()
    }

    /// Look up a declared member, then a dynamic property
    pub fn get(&self, key: &str) -> Result<Option<Value>, PropertyError> {
        match &self.body {
            Body::External(_) => Err(self.external_error()),
            Body::Members { sealed, dynamic } => {
                if let Some(slot) = self.class_def.position(key) {
                    return Ok(sealed.borrow().get(slot).cloned());
                }
                Ok(dynamic.borrow().get(key).cloned())
            }
        }
    }

    /// Set a declared member, or a dynamic property when the class is dynamic
    ///
    /// Returns the value that was replaced.
    pub fn set(&self, key: &str, value: Value) -> Result<Option<Value>, PropertyError> {
        match &self.body {
            Body::External(_) => Err(self.external_error()),
            Body::Members { sealed, dynamic } => {
                if let Some(slot) = self.class_def.position(key) {
                    return Ok(sealed
                        .borrow_mut()
                        .get_mut(slot)
                        .map(|v| std::mem::replace(v, value)));
                }
                if !self.class_def.is_dynamic() {
                    return Err(PropertyError::Sealed {
                        class_name: self.class_name().to_string(),
                        key: key.to_string(),
                    });
                }
                Ok(dynamic.borrow_mut().set(Rc::from(key), value))
            }
        }
    }

    /// The declared member values, in declaration order
    pub fn sealed_values(&self) -> Option<Ref<'_, [Value]>> {
        match &self.body {
            Body::Members { sealed, .. } => Some(Ref::map(sealed.borrow(), |s| s.as_slice())),
            Body::External(_) => None,
        }
    }

    /// The dynamic properties, in insertion order
    pub fn dynamic_properties(&self) -> Option<Ref<'_, [(Rc<str>, Value)]>> {
        match &self.body {
            Body::Members { dynamic, .. } => Some(Ref::map(dynamic.borrow(), |d| d.entries())),
            Body::External(_) => None,
        }
    }

    /// The payload of an externalizable object
    pub fn external(&self) -> Option<Ref<'_, dyn ExternalObject + 'static>> {
        match &self.body {
            Body::External(payload) => Ref::filter_map(payload.borrow(), |p| p.as_deref()).ok(),
            Body::Members { .. } => None,
        }
    }

    pub(crate) fn set_sealed(&self, slot: usize, value: Value) {
        if let Body::Members { sealed, .. } = &self.body {
            if let Some(v) = sealed.borrow_mut().get_mut(slot) {
                *v = value;
            }
        }
    }

    /// Store a dynamic property without looking at the declared members
    pub(crate) fn set_dynamic(&self, key: Rc<str>, value: Value) {
        if let Body::Members { dynamic, .. } = &self.body {
            dynamic.borrow_mut().set(key, value);
        }
    }

    pub(crate) fn set_external(&self, payload: Box<dyn ExternalObject>) {
        if let Body::External(slot) = &self.body {
            *slot.borrow_mut() = Some(payload);
        }
    }

    fn external_error(&self) -> PropertyError {
        PropertyError::External(self.class_name().to_string())
    }
}

type Payload<'a> = Option<Ref<'a, dyn ExternalObject + 'static>>;

fn same_payload(a: Payload<'_>, b: Payload<'_>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.properties() == b.properties(),
        (None, None) => true,
        _ => false,
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.class_def != other.class_def {
            return false;
        }
        let (a, b) = (self as *const Self, other as *const Self);
        visit_pair(a, b, || match (&self.body, &other.body) {
            (
                Body::Members { sealed, dynamic },
                Body::Members {
                    sealed: other_sealed,
                    dynamic: other_dynamic,
                },
            ) => {
                *sealed.borrow() == *other_sealed.borrow()
                    && *dynamic.borrow() == *other_dynamic.borrow()
            }
            (Body::External(_), Body::External(_)) => {
                same_payload(self.external(), other.external())
            }
            _ => false,
        })
        .unwrap_or(true)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        visit(self as *const Self, || {
            let mut s = f.debug_struct("Object");
            s.field("class_def", &self.class_def);
            match &self.body {
                Body::Members { sealed, dynamic } => {
                    s.field("sealed", &&**sealed.borrow());
                    s.field("dynamic", &dynamic.borrow().entries());
                }
                Body::External(payload) => {
                    s.field("external", &payload.borrow());
                }
            }
            s.finish()
        })
        .unwrap_or_else(|| f.write_str("Object(<cycle>)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    fn point() -> Rc<ClassDefinition> {
        Rc::new(ClassDefinition::sealed(
            "Point",
            vec!["x".to_string(), "y".to_string()],
        ))
    }

    #[test]
    fn sealed_members_start_undefined() {
        let object = Object::new(point());
        assert_eq!(object.get("x"), Ok(Some(Value::Undefined)));
        assert_eq!(object.set("y", Value::Integer(4)), Ok(Some(Value::Undefined)));
        assert_eq!(object.get("y"), Ok(Some(Value::Integer(4))));
        assert_eq!(object.get("z"), Ok(None));
    }

    #[test]
    fn sealed_object_rejects_new_keys() {
        let object = Object::new(point());
        assert_eq!(
            object.set("z", Value::Null),
            Err(PropertyError::Sealed {
                class_name: "Point".to_string(),
                key: "z".to_string(),
            })
        );
    }

    #[test]
    fn dynamic_object_checks_declared_members_first() {
        let def = Rc::new(ClassDefinition::dynamic("Thing", vec!["id".to_string()]));
        let object = Object::new(def);
        object.set("id", Value::Integer(1)).unwrap();
        object.set("extra", Value::Bool(true)).unwrap();

        assert_eq!(object.sealed_values().unwrap().to_vec(), vec![Value::Integer(1)]);
        let dynamic = object.dynamic_properties().unwrap();
        assert_eq!(dynamic.len(), 1);
        assert_eq!(&*dynamic[0].0, "extra");
    }

    #[derive(Debug)]
    struct Opaque(i32);

    impl ExternalObject for Opaque {
        fn properties(&self) -> Vec<(&'static str, Value)> {
            vec![("value", Value::Integer(self.0))]
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn external_object_has_no_properties() {
        let object = Object::with_external("Opaque", Box::new(Opaque(3)));
        assert_eq!(
            object.get("value"),
            Err(PropertyError::External("Opaque".to_string()))
        );
        assert!(object.set("value", Value::Null).is_err());
        assert!(object.sealed_values().is_none());

        let payload = object.external().unwrap();
        assert_eq!(payload.as_any().downcast_ref::<Opaque>().unwrap().0, 3);
    }

    #[test]
    fn external_objects_compare_by_properties() {
        let a = Object::with_external("Opaque", Box::new(Opaque(3)));
        let b = Object::with_external("Opaque", Box::new(Opaque(3)));
        let c = Object::with_external("Opaque", Box::new(Opaque(4)));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn self_reference_differs_from_plain_nesting() {
        let cyclic = Rc::new(Object::anonymous());
        cyclic.set("me", Value::Object(Rc::clone(&cyclic))).unwrap();

        let inner = Object::anonymous();
        inner.set("me", Value::Null).unwrap();
        let nested = Object::anonymous();
        nested.set("me", inner.into()).unwrap();

        assert_ne!(*cyclic, nested);

        let other = Rc::new(Object::anonymous());
        other.set("me", Value::Object(Rc::clone(&other))).unwrap();
        assert_eq!(*cyclic, *other);
    }
}
