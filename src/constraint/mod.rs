//! Conditional constraints on entity attributes.
//!
//! A [`Constraint`] is an immutable predicate on a single storage attribute of
//! entity `T`. Constraints are built from typed field descriptors and passed to
//! `put`/`remove`/`update`; the backend renders them into a conditional
//! expression (see [`expression`]).
//!
//! # Example
//!
//! ```
//! use keyval::{Field, Schema, TypeOf};
//!
//! struct Person;
//! impl Schema for Person {
//!     fn fields() -> &'static [Field] {
//!         const F: &[Field] = &[Field::new("name", "anothername")];
//!         F
//!     }
//! }
//!
//! let name: TypeOf<Person, String> = TypeOf::new("name");
//!
//! let guard = name.eq("Joe Doe".to_string());   // #__anothername__ = :__anothername__
//! let absent = name.not_exists();               // attribute_not_exists(#__anothername__)
//! assert_eq!(name.is(""), absent);
//! # let _ = guard;
//! ```

pub mod expression;

use crate::schema::TypeOf;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;

pub use expression::{render, ConditionExpression, Violation};

/// Operator of a constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Exists,
    NotExists,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "Eq",
            Op::Ne => "Ne",
            Op::Lt => "Lt",
            Op::Le => "Le",
            Op::Gt => "Gt",
            Op::Ge => "Ge",
            Op::Exists => "Exists",
            Op::NotExists => "NotExists",
        }
    }

    /// Whether the operator carries an operand
    pub fn has_operand(self) -> bool {
        !matches!(self, Op::Exists | Op::NotExists)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicate on one attribute of entity `T`
pub struct Constraint<T> {
    attribute: &'static str,
    op: Op,
    value: Option<Value>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Constraint<T> {
    pub(crate) fn new(attribute: &'static str, op: Op, value: Option<Value>) -> Self {
        Self {
            attribute,
            op,
            value,
            _entity: PhantomData,
        }
    }

    pub fn attribute(&self) -> &'static str {
        self.attribute
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

impl<T> Clone for Constraint<T> {
    fn clone(&self) -> Self {
        Self::new(self.attribute, self.op, self.value.clone())
    }
}

impl<T> PartialEq for Constraint<T> {
    fn eq(&self, other: &Self) -> bool {
        self.attribute == other.attribute && self.op == other.op && self.value == other.value
    }
}

impl<T> fmt::Debug for Constraint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint")
            .field("attribute", &self.attribute)
            .field("op", &self.op)
            .field("value", &self.value)
            .finish()
    }
}

/// `true` when `s` denotes "no value"
fn is_undefined(s: &str) -> bool {
    s.is_empty() || s == "undefined"
}

impl<T, A> TypeOf<T, A>
where
    A: Into<Value>,
{
    fn with(&self, op: Op, value: A) -> Constraint<T> {
        Constraint::new(self.attribute(), op, Some(value.into()))
    }

    /// `name.eq(x)` ⟼ `Field = :value`
    pub fn eq(&self, value: A) -> Constraint<T> {
        self.with(Op::Eq, value)
    }

    /// `name.ne(x)` ⟼ `Field <> :value`
    pub fn ne(&self, value: A) -> Constraint<T> {
        self.with(Op::Ne, value)
    }

    /// `name.lt(x)` ⟼ `Field < :value`
    pub fn lt(&self, value: A) -> Constraint<T> {
        self.with(Op::Lt, value)
    }

    /// `name.le(x)` ⟼ `Field <= :value`
    pub fn le(&self, value: A) -> Constraint<T> {
        self.with(Op::Le, value)
    }

    /// `name.gt(x)` ⟼ `Field > :value`
    pub fn gt(&self, value: A) -> Constraint<T> {
        self.with(Op::Gt, value)
    }

    /// `name.ge(x)` ⟼ `Field >= :value`
    pub fn ge(&self, value: A) -> Constraint<T> {
        self.with(Op::Ge, value)
    }
}

impl<T, A> TypeOf<T, A> {
    /// Matches either `Eq(value)` or `NotExists` when `value` is empty/`"undefined"`
    pub fn is(&self, value: &str) -> Constraint<T> {
        if is_undefined(value) {
            self.not_exists()
        } else {
            Constraint::new(self.attribute(), Op::Eq, Some(Value::String(value.to_string())))
        }
    }

    /// `name.exists()` ⟼ `attribute_exists(Field)`
    pub fn exists(&self) -> Constraint<T> {
        Constraint::new(self.attribute(), Op::Exists, None)
    }

    /// `name.not_exists()` ⟼ `attribute_not_exists(Field)`
    pub fn not_exists(&self) -> Constraint<T> {
        Constraint::new(self.attribute(), Op::NotExists, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, Schema};
    use serde_json::json;

    struct Person;

    impl Schema for Person {
        fn fields() -> &'static [Field] {
            const FIELDS: &[Field] = &[
                Field::new("name", "anothername"),
                Field::new("age", "age"),
            ];
            FIELDS
        }
    }

    #[test]
    fn test_operators_tag_attribute_and_value() {
        let age: TypeOf<Person, i64> = TypeOf::new("age");
        let cases = [
            (age.eq(1), Op::Eq),
            (age.ne(1), Op::Ne),
            (age.lt(1), Op::Lt),
            (age.le(1), Op::Le),
            (age.gt(1), Op::Gt),
            (age.ge(1), Op::Ge),
        ];
        for (c, op) in cases {
            assert_eq!(c.attribute(), "age");
            assert_eq!(c.op(), op);
            assert_eq!(c.value(), Some(&json!(1)));
        }
    }

    #[test]
    fn test_existence_has_no_operand() {
        let name: TypeOf<Person, String> = TypeOf::new("name");
        assert_eq!(name.exists().value(), None);
        assert_eq!(name.not_exists().op(), Op::NotExists);
        assert!(!Op::Exists.has_operand());
        assert!(Op::Le.has_operand());
    }

    #[test]
    fn test_is_lowers_to_eq_or_not_exists() {
        let name: TypeOf<Person, String> = TypeOf::new("name");
        assert_eq!(name.is(""), name.not_exists());
        assert_eq!(name.is("undefined"), name.not_exists());
        assert_eq!(name.is("Joe"), name.eq("Joe".to_string()));
    }

    #[test]
    fn test_unmapped_field_still_builds() {
        let missing: TypeOf<Person, String> = TypeOf::new("missing");
        let c = missing.eq("x".to_string());
        assert_eq!(c.attribute(), "");
    }
}
