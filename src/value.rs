//! Dynamic values passed to and returned from handles.
//!
//! A [`Value`] is what flows through a handle at invocation time. Primitive
//! carriers (`Int`, `Double`, ...) are unboxed when they sit in a primitive
//! slot and act as their box when they sit in a reference slot, so a
//! `Value::Int` is an instance of both `int` and `Object`.
//!
//! # Examples
//!
//! ```rust
//! use callgraft::Value;
//! use callgraft::signature::{PrimitiveKind, Type};
//!
//! let value = Value::from(7);
//! assert!(value.is_instance_of(&Type::INT));
//! assert!(value.is_instance_of(&Type::Object));
//! assert!(!value.is_instance_of(&Type::LONG));
//!
//! assert_eq!(value.widen_to(PrimitiveKind::Long), Some(Value::Long(7)));
//! assert_eq!(value.as_int(), Ok(7));
//! ```

use std::fmt;
use std::iter::Peekable;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Throwable;
use crate::handle::MethodHandle;
use crate::signature::{PrimitiveKind, Type};

// =============================================================================
// ArrayValue
// =============================================================================

/// An immutable array with a declared element type.
#[derive(Clone, Debug, PartialEq)]
pub struct ArrayValue {
    element: Type,
    items: Arc<[Value]>,
}

impl ArrayValue {
    /// Creates an array of `element` holding `items`.
    ///
    /// The caller is responsible for every item being an instance of `element`.
    #[must_use]
    pub fn new(element: Type, items: impl IntoIterator<Item = Value>) -> Self {
        Self {
            element,
            items: items.into_iter().collect(),
        }
    }

    /// Returns the declared element type.
    #[must_use]
    pub const fn element_type(&self) -> &Type {
        &self.element
    }

    /// Returns the array type of this value.
    #[must_use]
    pub fn array_type(&self) -> Type {
        Type::array_of(self.element.clone())
    }

    /// Returns the items.
    #[must_use]
    pub fn items(&self) -> &[Value] {
        &self.items
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the array holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// =============================================================================
// IteratorValue
// =============================================================================

type Cursor = Peekable<Box<dyn Iterator<Item = Value> + Send>>;

/// A shared, stateful cursor.
///
/// Clones observe the same position: advancing one clone advances all.
#[derive(Clone)]
pub struct IteratorValue {
    cursor: Arc<Mutex<Cursor>>,
}

impl IteratorValue {
    /// Wraps an iterator.
    pub fn new<I>(iterator: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + 'static,
    {
        let boxed: Box<dyn Iterator<Item = Value> + Send> = Box::new(iterator.into_iter());
        Self {
            cursor: Arc::new(Mutex::new(boxed.peekable())),
        }
    }

    /// Returns `true` if another element is available.
    #[must_use]
    pub fn has_next(&self) -> bool {
        self.cursor.lock().peek().is_some()
    }

    /// Advances the cursor.
    ///
    /// # Errors
    ///
    /// Returns a `NoSuchElementException` if the cursor is exhausted.
    pub fn next_value(&self) -> Result<Value, Throwable> {
        self.cursor
            .lock()
            .next()
            .ok_or_else(|| Throwable::no_such_element("iterator exhausted"))
    }

    /// Returns `true` if both values share one cursor.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cursor, &other.cursor)
    }
}

impl fmt::Debug for IteratorValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("IteratorValue")
            .field("has_next", &self.has_next())
            .finish()
    }
}

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed value.
#[derive(Clone, Debug)]
pub enum Value {
    /// The result of a handle whose return type is `void`.
    Void,
    /// The null reference.
    Null,
    /// A `boolean`.
    Boolean(bool),
    /// A `byte`.
    Byte(i8),
    /// A `short`.
    Short(i16),
    /// A `char` code unit.
    Char(u16),
    /// An `int`.
    Int(i32),
    /// A `long`.
    Long(i64),
    /// A `float`.
    Float(f32),
    /// A `double`.
    Double(f64),
    /// A string.
    String(Arc<str>),
    /// An iterable list.
    List(Arc<[Value]>),
    /// An array.
    Array(ArrayValue),
    /// An iterator.
    Iterator(IteratorValue),
    /// An error value.
    Throwable(Throwable),
    /// A method handle.
    Handle(MethodHandle),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Void, Self::Void) | (Self::Null, Self::Null) => true,
            (Self::Boolean(left), Self::Boolean(right)) => left == right,
            (Self::Byte(left), Self::Byte(right)) => left == right,
            (Self::Short(left), Self::Short(right)) => left == right,
            (Self::Char(left), Self::Char(right)) => left == right,
            (Self::Int(left), Self::Int(right)) => left == right,
            (Self::Long(left), Self::Long(right)) => left == right,
            (Self::Float(left), Self::Float(right)) => left.to_bits() == right.to_bits(),
            (Self::Double(left), Self::Double(right)) => left.to_bits() == right.to_bits(),
            (Self::String(left), Self::String(right)) => left == right,
            (Self::List(left), Self::List(right)) => left == right,
            (Self::Array(left), Self::Array(right)) => left == right,
            (Self::Iterator(left), Self::Iterator(right)) => left.ptr_eq(right),
            (Self::Throwable(left), Self::Throwable(right)) => left == right,
            (Self::Handle(left), Self::Handle(right)) => left.ptr_eq(right),
            _ => false,
        }
    }
}

macro_rules! primitive_accessors {
    ($($variant:ident($rust:ty) => $kind:ident),* $(,)?) => {
        paste::paste! {
            impl Value {
                $(
                    #[doc = concat!("Returns the `", stringify!($rust), "` held by a `", stringify!($variant), "` value.")]
                    ///
                    /// # Errors
                    ///
                    /// Returns a `NullPointerException` for null and a
                    /// `ClassCastException` for any other variant.
                    pub fn [<as_ $variant:lower>](&self) -> Result<$rust, Throwable> {
                        match self {
                            Self::$variant(value) => Ok(*value),
                            other => Err(other.cast_failure(&Type::Primitive(PrimitiveKind::$kind))),
                        }
                    }
                )*
            }

            $(
                impl From<$rust> for Value {
                    fn from(value: $rust) -> Self {
                        Self::$variant(value)
                    }
                }
            )*
        }
    };
}

primitive_accessors! {
    Boolean(bool) => Boolean,
    Byte(i8) => Byte,
    Short(i16) => Short,
    Char(u16) => Char,
    Int(i32) => Int,
    Long(i64) => Long,
    Float(f32) => Float,
    Double(f64) => Double,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(Arc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(Arc::from(value))
    }
}

impl From<MethodHandle> for Value {
    fn from(handle: MethodHandle) -> Self {
        Self::Handle(handle)
    }
}

impl From<Throwable> for Value {
    fn from(error: Throwable) -> Self {
        Self::Throwable(error)
    }
}

impl From<ArrayValue> for Value {
    fn from(array: ArrayValue) -> Self {
        Self::Array(array)
    }
}

impl From<IteratorValue> for Value {
    fn from(iterator: IteratorValue) -> Self {
        Self::Iterator(iterator)
    }
}

impl Value {
    /// Creates a list value.
    pub fn list(items: impl IntoIterator<Item = Self>) -> Self {
        Self::List(items.into_iter().collect())
    }

    /// Returns the zero value for a slot of type `ty`: `false`, `0`, `0.0`,
    /// null for references and `Void` for void.
    #[must_use]
    pub fn zero(ty: &Type) -> Self {
        match ty {
            Type::Void => Self::Void,
            Type::Primitive(kind) => match kind {
                PrimitiveKind::Boolean => Self::Boolean(false),
                PrimitiveKind::Byte => Self::Byte(0),
                PrimitiveKind::Short => Self::Short(0),
                PrimitiveKind::Char => Self::Char(0),
                PrimitiveKind::Int => Self::Int(0),
                PrimitiveKind::Long => Self::Long(0),
                PrimitiveKind::Float => Self::Float(0.0),
                PrimitiveKind::Double => Self::Double(0.0),
            },
            _ => Self::Null,
        }
    }

    /// Returns the primitive kind of a primitive carrier.
    #[must_use]
    pub const fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Boolean(_) => Some(PrimitiveKind::Boolean),
            Self::Byte(_) => Some(PrimitiveKind::Byte),
            Self::Short(_) => Some(PrimitiveKind::Short),
            Self::Char(_) => Some(PrimitiveKind::Char),
            Self::Int(_) => Some(PrimitiveKind::Int),
            Self::Long(_) => Some(PrimitiveKind::Long),
            Self::Float(_) => Some(PrimitiveKind::Float),
            Self::Double(_) => Some(PrimitiveKind::Double),
            _ => None,
        }
    }

    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the runtime class of this value seen as a reference.
    ///
    /// Primitive carriers report their box; null reports `Object`.
    #[must_use]
    pub fn reference_type(&self) -> Type {
        match self {
            Self::Void => Type::Void,
            Self::Null => Type::Object,
            Self::String(_) => Type::String,
            Self::List(_) => Type::List,
            Self::Array(array) => array.array_type(),
            Self::Iterator(_) => Type::Iterator,
            Self::Throwable(error) => Type::Throwable(error.class().clone()),
            Self::Handle(_) => Type::Handle,
            primitive => primitive
                .primitive_kind()
                .map_or(Type::Object, Type::Boxed),
        }
    }

    /// Returns the most specific static type of this value: the primitive
    /// type for primitive carriers, otherwise [`Value::reference_type`].
    #[must_use]
    pub fn static_type(&self) -> Type {
        self.primitive_kind()
            .map_or_else(|| self.reference_type(), Type::Primitive)
    }

    /// Returns `true` if this value may occupy a slot of type `ty` as is.
    #[must_use]
    pub fn is_instance_of(&self, ty: &Type) -> bool {
        match ty {
            Type::Void => matches!(self, Self::Void),
            Type::Primitive(kind) => self.primitive_kind() == Some(*kind),
            reference => match self {
                Self::Null => true,
                Self::Void => false,
                other => reference.is_assignable_from(&other.reference_type()),
            },
        }
    }

    /// Widens a primitive carrier to `target` along the widening table.
    ///
    /// Returns `None` if this is not a primitive carrier or the conversion
    /// would narrow.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn widen_to(&self, target: PrimitiveKind) -> Option<Self> {
        let source = self.primitive_kind()?;
        if !source.widens_to(target) {
            return None;
        }
        if source == target {
            return Some(self.clone());
        }
        if let Self::Float(value) = self {
            return Some(Self::Double(f64::from(*value)));
        }
        let integral = self.integral_value()?;
        Some(match target {
            PrimitiveKind::Short => Self::Short(integral as i16),
            PrimitiveKind::Int => Self::Int(integral as i32),
            PrimitiveKind::Long => Self::Long(integral),
            PrimitiveKind::Float => Self::Float(integral as f32),
            PrimitiveKind::Double => Self::Double(integral as f64),
            PrimitiveKind::Boolean | PrimitiveKind::Byte | PrimitiveKind::Char => return None,
        })
    }

    const fn integral_value(&self) -> Option<i64> {
        match self {
            Self::Byte(value) => Some(*value as i64),
            Self::Short(value) => Some(*value as i64),
            Self::Char(value) => Some(*value as i64),
            Self::Int(value) => Some(*value as i64),
            Self::Long(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the string held by a `String` value.
    ///
    /// # Errors
    ///
    /// Returns a `NullPointerException` for null and a `ClassCastException`
    /// for any other variant.
    pub fn as_str(&self) -> Result<&str, Throwable> {
        match self {
            Self::String(value) => Ok(value),
            other => Err(other.cast_failure(&Type::String)),
        }
    }

    /// Returns the items of a `List` value.
    ///
    /// # Errors
    ///
    /// Returns a `NullPointerException` for null and a `ClassCastException`
    /// for any other variant.
    pub fn as_list(&self) -> Result<&Arc<[Self]>, Throwable> {
        match self {
            Self::List(items) => Ok(items),
            other => Err(other.cast_failure(&Type::List)),
        }
    }

    /// Returns the array held by an `Array` value.
    ///
    /// # Errors
    ///
    /// Returns a `NullPointerException` for null and a `ClassCastException`
    /// for any other variant.
    pub fn as_array(&self) -> Result<&ArrayValue, Throwable> {
        match self {
            Self::Array(array) => Ok(array),
            other => Err(other.cast_failure(&Type::array_of(Type::Object))),
        }
    }

    /// Returns the cursor held by an `Iterator` value.
    ///
    /// # Errors
    ///
    /// Returns a `NullPointerException` for null and a `ClassCastException`
    /// for any other variant.
    pub fn as_iterator(&self) -> Result<&IteratorValue, Throwable> {
        match self {
            Self::Iterator(iterator) => Ok(iterator),
            other => Err(other.cast_failure(&Type::Iterator)),
        }
    }

    /// Returns the error held by a `Throwable` value.
    ///
    /// # Errors
    ///
    /// Returns a `NullPointerException` for null and a `ClassCastException`
    /// for any other variant.
    pub fn as_throwable(&self) -> Result<&Throwable, Throwable> {
        match self {
            Self::Throwable(error) => Ok(error),
            other => Err(other.cast_failure(&Type::throwable())),
        }
    }

    /// Returns the handle held by a `Handle` value.
    ///
    /// # Errors
    ///
    /// Returns a `NullPointerException` for null and a `ClassCastException`
    /// for any other variant.
    pub fn as_handle(&self) -> Result<&MethodHandle, Throwable> {
        match self {
            Self::Handle(handle) => Ok(handle),
            other => Err(other.cast_failure(&Type::Handle)),
        }
    }

    pub(crate) fn cast_failure(&self, target: &Type) -> Throwable {
        if self.is_null() {
            Throwable::null_pointer(format!("null where {target} was expected"))
        } else {
            Throwable::class_cast(format!(
                "cannot cast {} to {target}",
                self.reference_type()
            ))
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => formatter.write_str("void"),
            Self::Null => formatter.write_str("null"),
            Self::Boolean(value) => write!(formatter, "{value}"),
            Self::Byte(value) => write!(formatter, "{value}"),
            Self::Short(value) => write!(formatter, "{value}"),
            Self::Char(value) => match char::from_u32(u32::from(*value)) {
                Some(character) => write!(formatter, "{character}"),
                None => write!(formatter, "\\u{value:04x}"),
            },
            Self::Int(value) => write!(formatter, "{value}"),
            Self::Long(value) => write!(formatter, "{value}"),
            Self::Float(value) => write!(formatter, "{value}"),
            Self::Double(value) => write!(formatter, "{value}"),
            Self::String(value) => formatter.write_str(value),
            Self::List(items) | Self::Array(ArrayValue { items, .. }) => {
                formatter.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        formatter.write_str(", ")?;
                    }
                    write!(formatter, "{item}")?;
                }
                formatter.write_str("]")
            }
            Self::Iterator(_) => formatter.write_str("Iterator"),
            Self::Throwable(error) => write!(formatter, "{error}"),
            Self::Handle(handle) => write!(formatter, "MethodHandle{}", handle.signature()),
        }
    }
}

static_assertions::assert_impl_all!(Value: Send, Sync, Clone);
