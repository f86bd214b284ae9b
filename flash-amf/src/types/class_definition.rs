use enumset::{EnumSet, EnumSetType};

/// Flags carried by a class definition
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(EnumSetType, Debug)]
pub enum Attribute {
    /// Instances may carry properties beyond the members declared by their class
    Dynamic,

    /// Instances are read and written by a registered external handler
    External,
}

/// The traits of an AMF3 object: a class name, its flags and its declared member names
///
/// A class definition is immutable once built and is shared, through `Rc`, by every object of
/// that class. An empty name denotes an anonymous class.
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ClassDefinition {
    name: String,
    attributes: EnumSet<Attribute>,
    static_properties: Vec<String>,
}

impl Default for ClassDefinition {
    /// The anonymous dynamic class, used by plain `{}` object literals
    fn default() -> Self {
        Self::dynamic("", Vec::new())
    }
}

impl ClassDefinition {
    /// Create a class definition from its parts
    ///
    /// Externalizable classes carry neither members nor the dynamic flag on the wire, so both are
    /// dropped when `attributes` contains `Attribute::External`.
    pub fn new(
        name: impl Into<String>,
        attributes: EnumSet<Attribute>,
        static_properties: Vec<String>,
    ) -> Self {
        if attributes.contains(Attribute::External) {
            return Self::external(name);
        }

        Self {
            name: name.into(),
            attributes,
            static_properties,
        }
    }

    /// A class whose instances hold exactly the given members
    pub fn sealed(name: impl Into<String>, static_properties: Vec<String>) -> Self {
        Self::new(name, EnumSet::empty(), static_properties)
    }

    /// A class whose instances hold the given members plus any number of dynamic properties
    pub fn dynamic(name: impl Into<String>, static_properties: Vec<String>) -> Self {
        Self::new(name, Attribute::Dynamic.into(), static_properties)
    }

    /// A class whose instances are handled by the external handler registered for `name`
    pub fn external(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attribute::External.into(),
            static_properties: Vec::new(),
        }
    }

    /// The class name, empty for anonymous classes
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The flags of this class
    pub fn attributes(&self) -> EnumSet<Attribute> {
        self.attributes
    }

    /// The declared member names, in wire order
    pub fn static_properties(&self) -> &[String] {
        &self.static_properties
    }

    /// Whether instances may hold dynamic properties
    pub fn is_dynamic(&self) -> bool {
        self.attributes.contains(Attribute::Dynamic)
    }

    /// Whether instances are handled by an external handler
    pub fn is_external(&self) -> bool {
        self.attributes.contains(Attribute::External)
    }

    /// The slot of the declared member called `name`
    pub fn position(&self, name: &str) -> Option<usize> {
        self.static_properties.iter().position(|p| p == name)
    }
}
