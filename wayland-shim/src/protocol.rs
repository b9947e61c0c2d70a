//! Types and utilities for manipulating the emulated Wayland protocol

use crate::types::NotFound;

/// Describes whether an argument may have a null value.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AllowNull {
    /// Null values are allowed.
    Yes,
    /// Null values are forbidden.
    No,
}

/// Enum of possible argument types as recognized by the signature strings
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ArgumentType {
    /// An integer argument. Represented by a [`i32`].
    Int,
    /// An unsigned integer argument. Represented by a [`u32`].
    Uint,
    /// A signed fixed point number with 1/256 precision, carried as an [`i32`]
    Fixed,
    /// A string.
    Str(AllowNull),
    /// Id of a wayland object
    Object(AllowNull),
    /// Id of a newly created wayland object
    NewId,
    /// `Vec<u8>`
    Array,
    /// A file descriptor argument. Represented by a [`Fd`].
    Fd,
}

impl ArgumentType {
    /// Returns true if the type of the argument is the same.
    pub fn same_type(self, other: Self) -> bool {
        std::mem::discriminant(&self) == std::mem::discriminant(&other)
    }

    /// The signature code of this argument type, without its nullability marker
    pub fn code(self) -> char {
        match self {
            Self::Int => 'i',
            Self::Uint => 'u',
            Self::Fixed => 'f',
            Self::Str(_) => 's',
            Self::Object(_) => 'o',
            Self::NewId => 'n',
            Self::Array => 'a',
            Self::Fd => 'h',
        }
    }
}

/// A file descriptor as seen by the emulated protocol
///
/// No real descriptor is ever transferred: the value is an opaque token that the
/// host knows how to resolve (for example a shared-memory region).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fd(pub i32);

impl std::fmt::Display for Fd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fd {}", self.0)
    }
}

/// Enum of possible argument of the protocol
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::box_collection)]
pub enum Argument<Id> {
    /// An integer argument. Represented by a [`i32`].
    Int(i32),
    /// An unsigned integer argument. Represented by a [`u32`].
    Uint(u32),
    /// A signed fixed point number with 1/256 precision
    Fixed(i32),
    /// A string, `None` being the null string
    ///
    /// The value is boxed to reduce the stack size of Argument.
    Str(Option<Box<str>>),
    /// Id of a wayland object
    Object(Id),
    /// Id of a newly created wayland object
    NewId(Id),
    /// `Vec<u8>`
    ///
    /// The value is boxed to reduce the stack size of Argument. The performance
    /// impact is negligible as `array` arguments are pretty rare in the protocol.
    Array(Box<Vec<u8>>),
    /// A file descriptor argument.
    Fd(Fd),
}

impl<Id> Argument<Id> {
    /// Retrieve the type of a given argument instance
    pub fn get_type(&self) -> ArgumentType {
        match *self {
            Self::Int(_) => ArgumentType::Int,
            Self::Uint(_) => ArgumentType::Uint,
            Self::Fixed(_) => ArgumentType::Fixed,
            Self::Str(_) => ArgumentType::Str(AllowNull::Yes),
            Self::Object(_) => ArgumentType::Object(AllowNull::Yes),
            Self::NewId(_) => ArgumentType::NewId,
            Self::Array(_) => ArgumentType::Array,
            Self::Fd(_) => ArgumentType::Fd,
        }
    }
}

impl<Id: std::fmt::Display> std::fmt::Display for Argument<Id> {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Uint(value) => write!(f, "{value}"),
            Self::Fixed(value) => write!(f, "{:.4}", *value as f64 / 256.0),
            Self::Str(Some(value)) => write!(f, "{value:?}"),
            Self::Str(None) => f.write_str("nil"),
            Self::Object(value) => write!(f, "{value}"),
            Self::NewId(value) => write!(f, "new id {value}"),
            Self::Array(value) => write!(f, "array[{}]", value.len()),
            Self::Fd(value) => write!(f, "{value}"),
        }
    }
}

/// Description of wayland interface.
///
/// An interface describes the possible requests and events that a wayland client and compositor use to
/// communicate.
#[derive(Debug)]
pub struct Interface {
    /// The name of the interface.
    pub name: &'static str,
    /// The maximum supported version of the interface.
    pub version: u32,
    /// A list that describes every request this interface supports.
    pub requests: &'static [MessageDesc],
    /// A list that describes every event this interface supports.
    pub events: &'static [MessageDesc],
}

impl std::fmt::Display for Interface {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Metadata of a given message
#[derive(Copy, Clone, Debug)]
pub struct MessageDesc {
    /// Name of this message
    pub name: &'static str,
    /// Signature of the message, possibly prefixed by its minimum version
    pub signature: &'static str,
    /// Whether this message is a destructor
    pub is_destructor: bool,
    /// The child interface created from this message.
    ///
    /// In the wayland xml format, this corresponds to the `new_id` type.
    pub child_interface: Option<&'static Interface>,
    /// The interfaces passed into this message as object arguments, in order.
    pub arg_interfaces: &'static [&'static Interface],
}

impl MessageDesc {
    /// The signature without its leading version digits
    pub fn signature_body(&self) -> &'static str {
        self.signature.trim_start_matches(|c: char| c.is_ascii_digit())
    }

    /// Minimum required version of the interface
    ///
    /// Messages without a version prefix have been available since version 1.
    pub fn since(&self) -> u32 {
        let prefix_len = self.signature.len() - self.signature_body().len();
        self.signature[..prefix_len].parse().unwrap_or(1)
    }
}

/// Special interface representing an anonymous object
pub static ANONYMOUS_INTERFACE: Interface =
    Interface { name: "<anonymous>", version: 0, requests: &[], events: &[] };

/// Description of the protocol-level information of an object
#[derive(Copy, Clone, Debug)]
pub struct ObjectInfo {
    /// The protocol ID
    pub id: u32,
    /// The interface
    pub interface: &'static Interface,
    /// The version
    pub version: u32,
}

/// Direction of a message
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// A request, sent by the application
    Request,
    /// An event, delivered to the application
    Event,
}

/// Number of arguments that are stocked inline in a payload before allocating
///
/// This is a ad-hoc number trying to reach a good balance between avoiding too many allocations
/// and keeping the stack size of queued events small.
pub const INLINE_ARGS: usize = 4;

/// Inline storage of the arguments of a message
pub type ArgList<Id> = smallvec::SmallVec<[Argument<Id>; INLINE_ARGS]>;

/// Returns true if the two interfaces are the same.
#[inline]
pub fn same_interface(a: &'static Interface, b: &'static Interface) -> bool {
    std::ptr::eq(a, b) || a.name == b.name
}

#[inline]
pub(crate) fn same_interface_or_anonymous(a: &'static Interface, b: &'static Interface) -> bool {
    same_interface(a, b) || same_interface(a, &ANONYMOUS_INTERFACE)
}

/// Find a message by name on an interface
///
/// Returns the opcode of the message along with its description.
pub fn find_message(
    interface: &'static Interface,
    kind: MessageKind,
    name: &str,
) -> Result<(u16, &'static MessageDesc), NotFound> {
    let table = match kind {
        MessageKind::Request => interface.requests,
        MessageKind::Event => interface.events,
    };
    table
        .iter()
        .position(|desc| desc.name == name)
        .map(|idx| (idx as u16, &table[idx]))
        .ok_or_else(|| NotFound { interface: interface.name, kind, name: name.into() })
}

/// Shorthand for [`find_message`] on requests
pub fn find_request(
    interface: &'static Interface,
    name: &str,
) -> Result<(u16, &'static MessageDesc), NotFound> {
    find_message(interface, MessageKind::Request, name)
}

/// Shorthand for [`find_message`] on events
pub fn find_event(
    interface: &'static Interface,
    name: &str,
) -> Result<(u16, &'static MessageDesc), NotFound> {
    find_message(interface, MessageKind::Event, name)
}

/// An enum value in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WEnum<T> {
    /// The interpreted value
    Value(T),
    /// The stored value does not match one defined by the protocol file
    Unknown(u32),
}

/// Error representing an unknown numeric variant for a [`WEnum`]
#[derive(Debug, Copy, Clone)]
pub struct WEnumError {
    typ: &'static str,
    value: u32,
}

impl std::error::Error for WEnumError {}

impl std::fmt::Display for WEnumError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown numeric value {} for enum {}", self.value, self.typ)
    }
}

impl<T> WEnum<T> {
    /// Convert this [`WEnum`] into a result
    ///
    /// This can be used to take advantage of the numerous helper methods on [`Result`] if you
    /// don't plan to handle the unknown case of this enum.
    #[inline]
    pub fn into_result(self) -> Result<T, WEnumError> {
        match self {
            Self::Value(v) => Ok(v),
            Self::Unknown(value) => Err(WEnumError { typ: std::any::type_name::<T>(), value }),
        }
    }
}

impl<T: TryFrom<u32>> From<u32> for WEnum<T> {
    /// Constructs an enum from the integer format used by the wayland protocol.
    fn from(v: u32) -> Self {
        match T::try_from(v) {
            Ok(t) => Self::Value(t),
            Err(_) => Self::Unknown(v),
        }
    }
}

impl<T: Into<u32>> From<WEnum<T>> for u32 {
    /// Converts an enum into a numerical form used by the wayland protocol.
    fn from(enu: WEnum<T>) -> u32 {
        match enu {
            WEnum::Unknown(u) => u,
            WEnum::Value(t) => t.into(),
        }
    }
}
