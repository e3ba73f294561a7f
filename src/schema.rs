//! Field descriptor registry.
//!
//! An entity type declares, once, how its logical (Rust) field names map onto
//! storage attribute names. The mapping is an explicit static table produced by
//! `#[derive(Schema)]`, or written by hand:
//!
//! ```
//! use keyval::{Field, Schema};
//!
//! struct Person;
//!
//! impl Schema for Person {
//!     fn fields() -> &'static [Field] {
//!         const FIELDS: &[Field] = &[
//!             Field::new("org", "prefix"),
//!             Field::new("name", "anothername"),
//!             Field::new("note", ""),
//!         ];
//!         FIELDS
//!     }
//! }
//!
//! let descriptors = keyval::resolve::<Person>(&["name", "note", "missing"]);
//! assert_eq!(descriptors[0].attribute(), "anothername");
//! assert_eq!(descriptors[1].attribute(), "");
//! assert_eq!(descriptors[2].attribute(), "");
//! ```
//!
//! Descriptors are resolved at startup and reused: they are immutable and
//! `Send + Sync`, and build [`Constraint`](crate::Constraint)s through
//! [`TypeOf`]. An empty attribute means the field is not meant for server-side
//! conditions; constraints on it are rejected when rendered.

use std::fmt;
use std::marker::PhantomData;

/// One row of the mapping table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Logical (source-level) field name
    pub name: &'static str,
    /// Storage attribute name, empty when undeclared
    pub attribute: &'static str,
}

impl Field {
    pub const fn new(name: &'static str, attribute: &'static str) -> Self {
        Self { name, attribute }
    }
}

/// Declarative logical → physical mapping of an entity type
pub trait Schema {
    fn fields() -> &'static [Field];
}

/// Storage attribute of a logical field, empty when unknown or undeclared
pub fn attribute_of<T: Schema>(name: &str) -> &'static str {
    T::fields()
        .iter()
        .find(|f| f.name == name)
        .map(|f| f.attribute)
        .unwrap_or("")
}

/// Resolve logical field names into descriptors
///
/// Returns exactly one descriptor per requested name, in request order.
/// Duplicates are kept and unknown names resolve to an empty attribute; this
/// step never fails.
pub fn resolve<T: Schema>(names: &[&str]) -> Vec<FieldDescriptor<T>> {
    names.iter().map(|name| FieldDescriptor::new(name)).collect()
}

/// Untyped binding of a logical field to its storage attribute
pub struct FieldDescriptor<T> {
    name: String,
    attribute: &'static str,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Schema> FieldDescriptor<T> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attribute: attribute_of::<T>(name),
            _entity: PhantomData,
        }
    }
}

impl<T> FieldDescriptor<T> {
    /// Logical field name as requested
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Storage attribute, empty when the field has no mapping
    pub fn attribute(&self) -> &'static str {
        self.attribute
    }

    pub fn is_mapped(&self) -> bool {
        !self.attribute.is_empty()
    }

    /// Attach the operand type used by constraint builders
    pub fn typed<A>(self) -> TypeOf<T, A> {
        TypeOf {
            field: self,
            _value: PhantomData,
        }
    }
}

impl<T> Clone for FieldDescriptor<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            attribute: self.attribute,
            _entity: PhantomData,
        }
    }
}

impl<T> fmt::Debug for FieldDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("attribute", &self.attribute)
            .finish()
    }
}

impl<T> PartialEq for FieldDescriptor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.attribute == other.attribute
    }
}

/// Typed field descriptor of entity `T` holding values of type `A`
///
/// Operator methods live in [`crate::constraint`].
pub struct TypeOf<T, A> {
    pub(crate) field: FieldDescriptor<T>,
    _value: PhantomData<fn(A)>,
}

impl<T: Schema, A> TypeOf<T, A> {
    pub fn new(name: &str) -> Self {
        FieldDescriptor::new(name).typed()
    }
}

impl<T, A> TypeOf<T, A> {
    pub fn name(&self) -> &str {
        self.field.name()
    }

    pub fn attribute(&self) -> &'static str {
        self.field.attribute()
    }

    pub fn descriptor(&self) -> &FieldDescriptor<T> {
        &self.field
    }
}

impl<T, A> Clone for TypeOf<T, A> {
    fn clone(&self) -> Self {
        self.field.clone().typed()
    }
}

impl<T, A> fmt::Debug for TypeOf<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeOf").field(&self.field).finish()
    }
}

/// Resolve several typed descriptors of one entity in a single declaration
///
/// ```
/// # use keyval::{Field, Schema};
/// # struct Person;
/// # impl Schema for Person {
/// #     fn fields() -> &'static [Field] {
/// #         const F: &[Field] = &[Field::new("name", "anothername"), Field::new("age", "age")];
/// #         F
/// #     }
/// # }
/// let (name, age) = keyval::schema!(Person => name: String, age: i64);
/// assert_eq!(name.attribute(), "anothername");
/// assert_eq!(age.attribute(), "age");
/// ```
#[macro_export]
macro_rules! schema {
    ($entity:ty => $($field:ident : $value:ty),+ $(,)?) => {
        ( $( $crate::TypeOf::<$entity, $value>::new(stringify!($field)), )+ )
    };
}
