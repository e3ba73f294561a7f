//! Rendering constraints into conditional expressions.
//!
//! Every attribute is referenced through a placeholder pair derived from its
//! name: `#__attr__` for the name and `:__attr__` for the value. Derivation is
//! deterministic, so several constraints on one attribute share a pair, and it
//! is injective, so distinct attributes never share one. When constraints bind
//! different operands to one attribute (a range guard such as `age > 18 AND
//! age < 65`), later operands get a numbered value placeholder (`:__age__1`).
//! The rendered fragments are joined with `AND`; disjunction and grouping are
//! not expressible.
//!
//! ```text
//! Eq        #__a__ = :__a__
//! Ne        #__a__ <> :__a__
//! Lt/Le     #__a__ < :__a__   /  #__a__ <= :__a__
//! Gt/Ge     #__a__ > :__a__   /  #__a__ >= :__a__
//! Exists    attribute_exists(#__a__)
//! NotExists attribute_not_exists(#__a__)
//! ```

use super::{Constraint, Op};
use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;

/// Placeholder name → attribute name
pub type AttributeNames = BTreeMap<String, String>;

/// Placeholder value → attribute value
pub type AttributeValues = BTreeMap<String, Value>;

/// Name placeholder of an attribute
pub fn placeholder_name(attribute: &str) -> String {
    format!("#__{attribute}__")
}

/// Value placeholder of an attribute
pub fn placeholder_value(attribute: &str) -> String {
    format!(":__{attribute}__")
}

/// Rendered conditional expression with its placeholder tables
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionExpression {
    pub expression: String,
    pub names: AttributeNames,
    pub values: AttributeValues,
}

/// Bind `operand` to a value placeholder of `attribute` and return the placeholder
///
/// Reuses the placeholder already holding an equal operand; otherwise takes the
/// first free one of `:__a__`, `:__a__1`, `:__a__2`, ...
pub fn bind_value(values: &mut AttributeValues, attribute: &str, operand: &Value) -> String {
    let base = placeholder_value(attribute);
    let mut placeholder = base.clone();
    for n in 1.. {
        match values.get(&placeholder) {
            Some(bound) if bound == operand => return placeholder,
            Some(_) => placeholder = format!("{base}{n}"),
            None => break,
        }
    }
    values.insert(placeholder.clone(), operand.clone());
    placeholder
}

/// Render constraints of one operation
///
/// Returns `None` for an empty list. Fails with [`Error::UnmappedField`] when a
/// constraint references a field without a storage attribute.
pub fn render<T>(constraints: &[Constraint<T>]) -> Result<Option<ConditionExpression>> {
    if constraints.is_empty() {
        return Ok(None);
    }

    let mut names = AttributeNames::new();
    let mut values = AttributeValues::new();
    let mut fragments = Vec::with_capacity(constraints.len());

    for c in constraints {
        if c.attribute().is_empty() {
            return Err(Error::UnmappedField { op: c.op().as_str() });
        }

        let name = placeholder_name(c.attribute());
        names.insert(name.clone(), c.attribute().to_string());
        let value = match c.value() {
            Some(operand) => bind_value(&mut values, c.attribute(), operand),
            None => placeholder_value(c.attribute()),
        };

        fragments.push(fragment(c.op(), &name, &value));
    }

    Ok(Some(ConditionExpression {
        expression: fragments.join(" AND "),
        names,
        values,
    }))
}

fn fragment(op: Op, name: &str, value: &str) -> String {
    match op {
        Op::Eq => format!("{name} = {value}"),
        Op::Ne => format!("{name} <> {value}"),
        Op::Lt => format!("{name} < {value}"),
        Op::Le => format!("{name} <= {value}"),
        Op::Gt => format!("{name} > {value}"),
        Op::Ge => format!("{name} >= {value}"),
        Op::Exists => format!("attribute_exists({name})"),
        Op::NotExists => format!("attribute_not_exists({name})"),
    }
}

impl ConditionExpression {
    /// Move the placeholder tables into a request and return the expression text
    ///
    /// Placeholders the request binds later (e.g. the `SET` clause of an
    /// update) should go through [`bind_value`] after the merge so they cannot
    /// clash. A value placeholder already bound to a different operand fails
    /// with [`Error::ConflictingOperand`].
    pub fn merge_into(self, names: &mut AttributeNames, values: &mut AttributeValues) -> Result<String> {
        for (placeholder, operand) in &self.values {
            if values.get(placeholder).is_some_and(|bound| bound != operand) {
                return Err(Error::ConflictingOperand {
                    placeholder: placeholder.clone(),
                });
            }
        }

        names.extend(self.names);
        values.extend(self.values);
        Ok(self.expression)
    }

    pub fn violation(&self) -> Violation {
        Violation::classify(&self.expression)
    }
}

/// Classification of a rejected conditional request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Violation {
    /// Guard is consistent with "already exists" (equality / non-existence form)
    pub exists: bool,
    /// Guard is consistent with "does not exist / was modified" (existence / inequality form)
    pub not_exists: bool,
}

impl Violation {
    /// Classify from the expression text alone
    ///
    /// This is a literal substring test: `<=` and `>=` contain `=` and therefore
    /// count as existence violations.
    pub fn classify(expression: &str) -> Self {
        Self {
            exists: expression.contains("attribute_not_exists") || expression.contains('='),
            not_exists: expression.contains("attribute_exists") || expression.contains("<>"),
        }
    }
}
