//! Value kinds and the tagged value type carried by properties.
//!
//! Every member a target exposes holds a [`PropertyValue`], a closed union over
//! the kinds the binding layer understands. Widgets declare which kinds they
//! can consume with a [`ValueKinds`] mask, and typed access goes through the
//! [`PropertyType`] trait so that asking for the wrong kind is a plain `None`
//! rather than a conversion.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

/// The runtime kind of a property value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `bool`.
    Boolean,
    /// `i32`.
    Int32,
    /// `f32`.
    Float,
    /// A value of a declared enum type.
    Enum,
    /// `String`.
    String,
}

impl ValueKind {
    /// Every kind, in declaration order.
    pub const ALL: [ValueKind; 5] = [
        ValueKind::Boolean,
        ValueKind::Int32,
        ValueKind::Float,
        ValueKind::Enum,
        ValueKind::String,
    ];

    /// The single-bit mask for this kind.
    pub fn mask(self) -> ValueKinds {
        match self {
            ValueKind::Boolean => ValueKinds::BOOLEAN,
            ValueKind::Int32 => ValueKinds::INT32,
            ValueKind::Float => ValueKinds::FLOAT,
            ValueKind::Enum => ValueKinds::ENUM,
            ValueKind::String => ValueKinds::STRING,
        }
    }

    /// Returns true for `Int32` and `Float`.
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Int32 | ValueKind::Float)
    }

    /// A short, stable name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Boolean => "Boolean",
            ValueKind::Int32 => "Int32",
            ValueKind::Float => "Float",
            ValueKind::Enum => "Enum",
            ValueKind::String => "String",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

bitflags! {
    /// A set of value kinds a consumer is willing to read.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ValueKinds: u8 {
        /// Accept `Boolean`.
        const BOOLEAN = 1 << 0;
        /// Accept `Int32`.
        const INT32 = 1 << 1;
        /// Accept `Float`.
        const FLOAT = 1 << 2;
        /// Accept `Enum`.
        const ENUM = 1 << 3;
        /// Accept `String`.
        const STRING = 1 << 4;
        /// Accept both numeric kinds.
        const NUMERIC = Self::INT32.bits() | Self::FLOAT.bits();
        /// Accept every kind.
        const EVERYTHING = Self::BOOLEAN.bits()
            | Self::INT32.bits()
            | Self::FLOAT.bits()
            | Self::ENUM.bits()
            | Self::STRING.bits();
    }
}

impl ValueKinds {
    /// Returns true if `kind` is part of this set.
    pub fn accepts(self, kind: ValueKind) -> bool {
        self.contains(kind.mask())
    }
}

impl From<ValueKind> for ValueKinds {
    fn from(kind: ValueKind) -> Self {
        kind.mask()
    }
}

/// One declared variant of an [`EnumType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariant {
    /// Variant name.
    pub name: String,
    /// Underlying numeric value.
    pub value: i64,
}

/// Descriptor of an enum type: its name and declared variants in order.
///
/// Variant order is significant. The ordinal of a value is its position in
/// this list, independent of the numeric values, which may be sparse.
#[derive(Debug, PartialEq, Eq)]
pub struct EnumType {
    name: String,
    variants: Vec<EnumVariant>,
}

impl EnumType {
    /// Declare an enum type with explicit numeric values.
    pub fn new<N, I>(name: impl Into<String>, variants: I) -> Arc<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = (N, i64)>,
    {
        Arc::new(Self {
            name: name.into(),
            variants: variants
                .into_iter()
                .map(|(name, value)| EnumVariant {
                    name: name.into(),
                    value,
                })
                .collect(),
        })
    }

    /// Declare an enum type whose values are `0..n` in order.
    pub fn sequential<N, I>(name: impl Into<String>, names: I) -> Arc<Self>
    where
        N: Into<String>,
        I: IntoIterator<Item = N>,
    {
        Self::new(name, names.into_iter().zip(0i64..))
    }

    /// The enum's type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared variants, in order.
    pub fn variants(&self) -> &[EnumVariant] {
        &self.variants
    }

    /// Position of `value` among the declared variants.
    pub fn ordinal_of(&self, value: i64) -> Option<usize> {
        self.variants.iter().position(|v| v.value == value)
    }

    /// Look up a variant by name.
    pub fn variant_named(&self, name: &str) -> Option<&EnumVariant> {
        self.variants.iter().find(|v| v.name == name)
    }
}

/// A value of some [`EnumType`].
#[derive(Debug, Clone)]
pub struct EnumValue {
    ty: Arc<EnumType>,
    value: i64,
}

impl EnumValue {
    /// Wrap a numeric value. The value does not have to be declared.
    pub fn new(ty: &Arc<EnumType>, value: i64) -> Self {
        Self {
            ty: Arc::clone(ty),
            value,
        }
    }

    /// The value of the variant called `name`, if declared.
    pub fn named(ty: &Arc<EnumType>, name: &str) -> Option<Self> {
        ty.variant_named(name).map(|v| Self::new(ty, v.value))
    }

    /// The value at position `ordinal`, if declared.
    pub fn from_ordinal(ty: &Arc<EnumType>, ordinal: usize) -> Option<Self> {
        ty.variants.get(ordinal).map(|v| Self::new(ty, v.value))
    }

    /// The enum type this value belongs to.
    pub fn enum_type(&self) -> &Arc<EnumType> {
        &self.ty
    }

    /// The underlying numeric value.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Position among the declared variants, or `None` for undeclared values.
    pub fn ordinal(&self) -> Option<usize> {
        self.ty.ordinal_of(self.value)
    }

    /// Name of the matching variant, if declared.
    pub fn name(&self) -> Option<&str> {
        self.ty
            .variants
            .iter()
            .find(|v| v.value == self.value)
            .map(|v| v.name.as_str())
    }

    /// Returns true if both values belong to the same enum type.
    pub fn same_type(&self, other: &EnumValue) -> bool {
        Arc::ptr_eq(&self.ty, &other.ty) || *self.ty == *other.ty
    }
}

impl PartialEq for EnumValue {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.same_type(other)
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.value),
        }
    }
}

/// A property value: one of the kinds in [`ValueKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// A boolean.
    Boolean(bool),
    /// A 32-bit signed integer.
    Int32(i32),
    /// A 32-bit float.
    Float(f32),
    /// An enum value.
    Enum(EnumValue),
    /// A string.
    String(String),
}

impl PropertyValue {
    /// The kind discriminant of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            PropertyValue::Boolean(_) => ValueKind::Boolean,
            PropertyValue::Int32(_) => ValueKind::Int32,
            PropertyValue::Float(_) => ValueKind::Float,
            PropertyValue::Enum(_) => ValueKind::Enum,
            PropertyValue::String(_) => ValueKind::String,
        }
    }

    /// The boolean, if this is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// The integer, if this is one.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            PropertyValue::Int32(v) => Some(*v),
            _ => None,
        }
    }

    /// The float, if this is one.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view of `Int32` and `Float` values.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Int32(v) => Some(f64::from(*v)),
            PropertyValue::Float(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    /// The enum value, if this is one.
    pub fn as_enum(&self) -> Option<&EnumValue> {
        match self {
            PropertyValue::Enum(v) => Some(v),
            _ => None,
        }
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Boolean(v) => write!(f, "{v}"),
            PropertyValue::Int32(v) => write!(f, "{v}"),
            PropertyValue::Float(v) => write!(f, "{v}"),
            PropertyValue::Enum(v) => write!(f, "{v}"),
            PropertyValue::String(v) => f.write_str(v),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Boolean(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int32(v)
    }
}

impl From<f32> for PropertyValue {
    fn from(v: f32) -> Self {
        PropertyValue::Float(v)
    }
}

impl From<EnumValue> for PropertyValue {
    fn from(v: EnumValue) -> Self {
        PropertyValue::Enum(v)
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::String(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::String(v.to_string())
    }
}

/// Rust types that map one-to-one onto a [`ValueKind`].
///
/// Extraction is exact: an `i32` is never read out of a `Float` or `Boolean`.
pub trait PropertyType: Sized {
    /// The kind this type corresponds to.
    const KIND: ValueKind;

    /// Extract from a value of the matching kind.
    fn from_value(value: &PropertyValue) -> Option<Self>;

    /// Wrap into a value.
    fn into_value(self) -> PropertyValue;
}

impl PropertyType for bool {
    const KIND: ValueKind = ValueKind::Boolean;

    fn from_value(value: &PropertyValue) -> Option<Self> {
        value.as_bool()
    }

    fn into_value(self) -> PropertyValue {
        PropertyValue::Boolean(self)
    }
}

impl PropertyType for i32 {
    const KIND: ValueKind = ValueKind::Int32;

    fn from_value(value: &PropertyValue) -> Option<Self> {
        value.as_i32()
    }

    fn into_value(self) -> PropertyValue {
        PropertyValue::Int32(self)
    }
}

impl PropertyType for f32 {
    const KIND: ValueKind = ValueKind::Float;

    fn from_value(value: &PropertyValue) -> Option<Self> {
        value.as_f32()
    }

    fn into_value(self) -> PropertyValue {
        PropertyValue::Float(self)
    }
}

impl PropertyType for EnumValue {
    const KIND: ValueKind = ValueKind::Enum;

    fn from_value(value: &PropertyValue) -> Option<Self> {
        value.as_enum().cloned()
    }

    fn into_value(self) -> PropertyValue {
        PropertyValue::Enum(self)
    }
}

impl PropertyType for String {
    const KIND: ValueKind = ValueKind::String;

    fn from_value(value: &PropertyValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn into_value(self) -> PropertyValue {
        PropertyValue::String(self)
    }
}
