//! Comparison predicates applied to property values.
//!
//! A [`Comparison`] is one of a closed set of predicates. Each predicate is
//! only defined for some value kinds; applying it to any other kind yields
//! `None` ("cannot test"), which condition evaluation treats as a false test.

use std::cmp::Ordering;

use crate::value::{PropertyValue, ValueKind};

/// A predicate over a single property value.
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    /// Boolean is `true`.
    IsTrue,
    /// Boolean is `false`.
    IsFalse,
    /// Value equals the operand.
    ///
    /// Numbers compare across `Int32`/`Float`. Enums compare against an enum
    /// of the same type or an `Int32` by numeric value, or a `String` by
    /// variant name.
    Equal(PropertyValue),
    /// Negation of [`Comparison::Equal`], defined for the same pairs.
    NotEqual(PropertyValue),
    /// Number is less than the operand.
    Less(PropertyValue),
    /// Number is less than or equal to the operand.
    LessOrEqual(PropertyValue),
    /// Number is greater than the operand.
    Greater(PropertyValue),
    /// Number is greater than or equal to the operand.
    GreaterOrEqual(PropertyValue),
    /// Enum value sits at this position among its declared variants.
    EnumIndex(usize),
    /// String is empty.
    IsEmpty,
    /// String is not empty.
    IsNotEmpty,
}

impl Comparison {
    /// Returns true if this predicate can test values of `kind`.
    pub fn applies_to(&self, kind: ValueKind) -> bool {
        match self {
            Comparison::IsTrue | Comparison::IsFalse => kind == ValueKind::Boolean,
            Comparison::Equal(operand) | Comparison::NotEqual(operand) => {
                equality_applies(kind, operand.kind())
            }
            Comparison::Less(operand)
            | Comparison::LessOrEqual(operand)
            | Comparison::Greater(operand)
            | Comparison::GreaterOrEqual(operand) => {
                kind.is_numeric() && operand.kind().is_numeric()
            }
            Comparison::EnumIndex(_) => kind == ValueKind::Enum,
            Comparison::IsEmpty | Comparison::IsNotEmpty => kind == ValueKind::String,
        }
    }

    /// Test `value`. Returns `None` if the predicate does not apply.
    pub fn test(&self, value: &PropertyValue) -> Option<bool> {
        match self {
            Comparison::IsTrue => value.as_bool(),
            Comparison::IsFalse => value.as_bool().map(|v| !v),
            Comparison::Equal(operand) => equals(value, operand),
            Comparison::NotEqual(operand) => equals(value, operand).map(|eq| !eq),
            Comparison::Less(operand) => compare(value, operand).map(Ordering::is_lt),
            Comparison::LessOrEqual(operand) => compare(value, operand).map(Ordering::is_le),
            Comparison::Greater(operand) => compare(value, operand).map(Ordering::is_gt),
            Comparison::GreaterOrEqual(operand) => compare(value, operand).map(Ordering::is_ge),
            Comparison::EnumIndex(index) => value.as_enum().map(|e| e.ordinal() == Some(*index)),
            Comparison::IsEmpty => value.as_str().map(str::is_empty),
            Comparison::IsNotEmpty => value.as_str().map(|s| !s.is_empty()),
        }
    }
}

fn equality_applies(kind: ValueKind, operand: ValueKind) -> bool {
    match kind {
        ValueKind::Int32 | ValueKind::Float => operand.is_numeric(),
        ValueKind::Enum => matches!(
            operand,
            ValueKind::Enum | ValueKind::Int32 | ValueKind::String
        ),
        ValueKind::Boolean | ValueKind::String => operand == kind,
    }
}

fn equals(value: &PropertyValue, operand: &PropertyValue) -> Option<bool> {
    match (value, operand) {
        (PropertyValue::Boolean(a), PropertyValue::Boolean(b)) => Some(a == b),
        (PropertyValue::String(a), PropertyValue::String(b)) => Some(a == b),
        (PropertyValue::Enum(a), PropertyValue::Enum(b)) => a.same_type(b).then(|| a == b),
        (PropertyValue::Enum(a), PropertyValue::Int32(b)) => Some(a.value() == i64::from(*b)),
        (PropertyValue::Enum(a), PropertyValue::String(b)) => Some(a.name() == Some(b.as_str())),
        _ => {
            let (a, b) = (value.as_number()?, operand.as_number()?);
            Some(a == b)
        }
    }
}

fn compare(value: &PropertyValue, operand: &PropertyValue) -> Option<Ordering> {
    value.as_number()?.partial_cmp(&operand.as_number()?)
}
