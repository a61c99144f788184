//! The closed type universe seen by handles.
//!
//! Every parameter and return slot of a [`Signature`](super::Signature) is a
//! [`Type`]. Primitive slots carry a [`PrimitiveKind`], whose conversions are
//! driven by an explicit widening table rather than by dynamic dispatch on
//! wrapper classes. Error values are classified by an [`ErrorClass`]
//! hierarchy so that exception-intercepting combinators can test
//! assignability.
//!
//! # Examples
//!
//! ```rust
//! use callgraft::signature::{ErrorClass, PrimitiveKind, Type};
//!
//! assert!(PrimitiveKind::Int.widens_to(PrimitiveKind::Long));
//! assert!(!PrimitiveKind::Long.widens_to(PrimitiveKind::Int));
//!
//! assert!(Type::Object.is_assignable_from(&Type::String));
//! assert!(Type::throwable().is_assignable_from(&Type::Throwable(ErrorClass::null_pointer())));
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock};

// =============================================================================
// PrimitiveKind
// =============================================================================

/// The eight primitive kinds a value slot may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveKind {
    /// `boolean`
    Boolean,
    /// `byte`, signed 8-bit
    Byte,
    /// `short`, signed 16-bit
    Short,
    /// `char`, unsigned 16-bit code unit
    Char,
    /// `int`, signed 32-bit
    Int,
    /// `long`, signed 64-bit
    Long,
    /// `float`, 32-bit IEEE 754
    Float,
    /// `double`, 64-bit IEEE 754
    Double,
}

/// Widening table indexed by `[from][to]`, in declaration order of
/// [`PrimitiveKind`]. The diagonal is the identity conversion.
const WIDENING: [[bool; 8]; 8] = [
    //       bool   byte   short  char   int    long   float  double
    /* Z */ [true, false, false, false, false, false, false, false],
    /* B */ [false, true, true, false, true, true, true, true],
    /* S */ [false, false, true, false, true, true, true, true],
    /* C */ [false, false, false, true, true, true, true, true],
    /* I */ [false, false, false, false, true, true, true, true],
    /* J */ [false, false, false, false, false, true, true, true],
    /* F */ [false, false, false, false, false, false, true, true],
    /* D */ [false, false, false, false, false, false, false, true],
];

impl PrimitiveKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Boolean,
        Self::Byte,
        Self::Short,
        Self::Char,
        Self::Int,
        Self::Long,
        Self::Float,
        Self::Double,
    ];

    /// Returns the source-level name of this kind (`"int"`, `"boolean"`, ...).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Char => "char",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
        }
    }

    /// Returns the name of the boxed reference type for this kind.
    #[must_use]
    pub const fn wrapper_name(self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Byte => "Byte",
            Self::Short => "Short",
            Self::Char => "Character",
            Self::Int => "Integer",
            Self::Long => "Long",
            Self::Float => "Float",
            Self::Double => "Double",
        }
    }

    /// Returns `true` for the integral kinds, `char` included.
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Short | Self::Char | Self::Int | Self::Long
        )
    }

    /// Returns `true` for every kind except `boolean`.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        !matches!(self, Self::Boolean)
    }

    /// Returns `true` if a value of this kind may be implicitly widened to
    /// `target`. Every kind widens to itself.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use callgraft::signature::PrimitiveKind;
    ///
    /// assert!(PrimitiveKind::Char.widens_to(PrimitiveKind::Int));
    /// assert!(!PrimitiveKind::Byte.widens_to(PrimitiveKind::Char));
    /// assert!(!PrimitiveKind::Boolean.widens_to(PrimitiveKind::Int));
    /// ```
    #[inline]
    #[must_use]
    pub const fn widens_to(self, target: Self) -> bool {
        WIDENING[self as usize][target as usize]
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

// =============================================================================
// ErrorClass
// =============================================================================

#[derive(Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
struct ErrorClassNode {
    name: Arc<str>,
    parent: Option<ErrorClass>,
}

/// A node of the error classification hierarchy.
///
/// Thrown values are tagged with an `ErrorClass`; a class is a subclass of
/// itself and of every ancestor reachable through [`ErrorClass::parent`].
/// Two classes are equal when their names and ancestor chains are equal.
///
/// # Examples
///
/// ```rust
/// use callgraft::signature::ErrorClass;
///
/// let timeout = ErrorClass::new("TimeoutException", &ErrorClass::runtime_exception());
/// assert!(timeout.is_subclass_of(&ErrorClass::exception()));
/// assert!(!ErrorClass::exception().is_subclass_of(&timeout));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ErrorClass(Arc<ErrorClassNode>);

static THROWABLE: LazyLock<ErrorClass> = LazyLock::new(|| ErrorClass::root("Throwable"));
static EXCEPTION: LazyLock<ErrorClass> =
    LazyLock::new(|| ErrorClass::new("Exception", &THROWABLE));
static RUNTIME_EXCEPTION: LazyLock<ErrorClass> =
    LazyLock::new(|| ErrorClass::new("RuntimeException", &EXCEPTION));

macro_rules! runtime_error_classes {
    ($($(#[$meta:meta])* $function:ident => $name:literal),* $(,)?) => {
        impl ErrorClass {
            $(
                $(#[$meta])*
                #[must_use]
                pub fn $function() -> Self {
                    static CLASS: LazyLock<ErrorClass> =
                        LazyLock::new(|| ErrorClass::new($name, &RUNTIME_EXCEPTION));
                    CLASS.clone()
                }
            )*
        }
    };
}

runtime_error_classes! {
    /// Raised for malformed arguments, including composition errors surfaced at invocation.
    illegal_argument => "IllegalArgumentException",
    /// Raised when an operation is not valid for the current state.
    illegal_state => "IllegalStateException",
    /// Raised when a null reference is unboxed or dereferenced.
    null_pointer => "NullPointerException",
    /// Raised when a reference cast fails at invocation time.
    class_cast => "ClassCastException",
    /// Raised by arithmetic faults such as division by zero.
    arithmetic => "ArithmeticException",
    /// Raised for an out-of-range array index.
    index_out_of_bounds => "IndexOutOfBoundsException",
    /// Raised when an exact invocation does not match the handle's signature.
    wrong_method_type => "WrongMethodTypeException",
    /// Raised when an exhausted iterator is advanced.
    no_such_element => "NoSuchElementException",
}

impl ErrorClass {
    fn root(name: &str) -> Self {
        Self(Arc::new(ErrorClassNode {
            name: Arc::from(name),
            parent: None,
        }))
    }

    /// Creates a new class named `name` directly below `parent`.
    #[must_use]
    pub fn new(name: &str, parent: &Self) -> Self {
        Self(Arc::new(ErrorClassNode {
            name: Arc::from(name),
            parent: Some(parent.clone()),
        }))
    }

    /// The root of the hierarchy; every class is a subclass of it.
    #[must_use]
    pub fn throwable() -> Self {
        THROWABLE.clone()
    }

    /// The checked-exception base class.
    #[must_use]
    pub fn exception() -> Self {
        EXCEPTION.clone()
    }

    /// The unchecked-exception base class; parent of all built-in runtime errors.
    #[must_use]
    pub fn runtime_exception() -> Self {
        RUNTIME_EXCEPTION.clone()
    }

    /// Returns the simple name of this class.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Returns the direct superclass, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<&Self> {
        self.0.parent.as_ref()
    }

    /// Returns `true` if `self` is `ancestor` or lies below it.
    #[must_use]
    pub fn is_subclass_of(&self, ancestor: &Self) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if Arc::ptr_eq(&class.0, &ancestor.0) || class == ancestor {
                return true;
            }
            current = class.parent();
        }
        false
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.name())
    }
}

// =============================================================================
// Type
// =============================================================================

/// The type of a parameter or return slot.
///
/// `Void` may only appear as a return type. All variants other than `Void`
/// and `Primitive` are reference types and admit the null value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Type {
    /// No value; return position only.
    Void,
    /// An unboxed primitive.
    Primitive(PrimitiveKind),
    /// The top reference type.
    Object,
    /// The boxed form of a primitive kind.
    Boxed(PrimitiveKind),
    /// An immutable string.
    String,
    /// An immutable, iterable sequence of values.
    List,
    /// A stateful cursor over a sequence of values.
    Iterator,
    /// An array with the given element type.
    Array(Arc<Type>),
    /// An error value of the given class or any of its subclasses.
    Throwable(ErrorClass),
    /// A method handle used as a value.
    Handle,
}

impl Type {
    /// `boolean`
    pub const BOOLEAN: Self = Self::Primitive(PrimitiveKind::Boolean);
    /// `byte`
    pub const BYTE: Self = Self::Primitive(PrimitiveKind::Byte);
    /// `short`
    pub const SHORT: Self = Self::Primitive(PrimitiveKind::Short);
    /// `char`
    pub const CHAR: Self = Self::Primitive(PrimitiveKind::Char);
    /// `int`
    pub const INT: Self = Self::Primitive(PrimitiveKind::Int);
    /// `long`
    pub const LONG: Self = Self::Primitive(PrimitiveKind::Long);
    /// `float`
    pub const FLOAT: Self = Self::Primitive(PrimitiveKind::Float);
    /// `double`
    pub const DOUBLE: Self = Self::Primitive(PrimitiveKind::Double);

    /// Returns the array type whose elements are `element`.
    #[must_use]
    pub fn array_of(element: Self) -> Self {
        Self::Array(Arc::new(element))
    }

    /// Returns the root error type, which accepts every error value.
    #[must_use]
    pub fn throwable() -> Self {
        Self::Throwable(ErrorClass::throwable())
    }

    /// Returns `true` for [`Type::Void`].
    #[must_use]
    pub const fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// Returns `true` for [`Type::Primitive`].
    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    /// Returns `true` for every reference type.
    #[must_use]
    pub const fn is_reference(&self) -> bool {
        !matches!(self, Self::Void | Self::Primitive(_))
    }

    /// Returns the primitive kind of a primitive type.
    #[must_use]
    pub const fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self {
            Self::Primitive(kind) => Some(*kind),
            _ => None,
        }
    }

    /// Returns the element type of an array type.
    #[must_use]
    pub fn element_type(&self) -> Option<&Self> {
        match self {
            Self::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Replaces a primitive type by its box; other types are returned as is.
    #[must_use]
    pub fn wrap(&self) -> Self {
        match self {
            Self::Primitive(kind) => Self::Boxed(*kind),
            other => other.clone(),
        }
    }

    /// Replaces a boxed type by its primitive; other types are returned as is.
    #[must_use]
    pub fn unwrap(&self) -> Self {
        match self {
            Self::Boxed(kind) => Self::Primitive(*kind),
            other => other.clone(),
        }
    }

    /// Returns `true` if a value statically typed as `other` may be stored in
    /// a slot of type `self` without any conversion.
    ///
    /// For primitives and `Void` this is plain equality. For references,
    /// `Object` accepts every reference, arrays are covariant in their
    /// reference element type, and error types follow the class hierarchy.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use callgraft::signature::Type;
    ///
    /// let objects = Type::array_of(Type::Object);
    /// let strings = Type::array_of(Type::String);
    /// assert!(objects.is_assignable_from(&strings));
    /// assert!(!Type::array_of(Type::LONG).is_assignable_from(&Type::array_of(Type::INT)));
    /// assert!(!Type::INT.is_assignable_from(&Type::Boxed(callgraft::signature::PrimitiveKind::Int)));
    /// ```
    #[must_use]
    pub fn is_assignable_from(&self, other: &Self) -> bool {
        if self == other {
            return true;
        }
        match (self, other) {
            (Self::Object, candidate) => candidate.is_reference(),
            (Self::Array(target), Self::Array(source)) => {
                target.is_reference() && target.is_assignable_from(source)
            }
            (Self::Throwable(target), Self::Throwable(source)) => source.is_subclass_of(target),
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => formatter.write_str("void"),
            Self::Primitive(kind) => formatter.write_str(kind.name()),
            Self::Object => formatter.write_str("Object"),
            Self::Boxed(kind) => formatter.write_str(kind.wrapper_name()),
            Self::String => formatter.write_str("String"),
            Self::List => formatter.write_str("List"),
            Self::Iterator => formatter.write_str("Iterator"),
            Self::Array(element) => write!(formatter, "{element}[]"),
            Self::Throwable(class) => write!(formatter, "{class}"),
            Self::Handle => formatter.write_str("MethodHandle"),
        }
    }
}

static_assertions::assert_impl_all!(Type: Send, Sync, Clone);
static_assertions::assert_impl_all!(ErrorClass: Send, Sync, Clone);
