//! Error types of the emulated protocol

use crate::config::PoolKind;
use crate::protocol::MessageKind;

/// An error generated when trying to act on an invalid `ObjectId`.
///
/// This covers destroyed objects, objects of a previous session and the null id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidId;

impl std::error::Error for InvalidId {}

impl std::fmt::Display for InvalidId {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error> {
        write!(f, "Invalid ObjectId")
    }
}

/// A message name that does not exist on an interface
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotFound {
    /// Name of the interface that was searched
    pub interface: &'static str,
    /// Whether a request or an event was searched
    pub kind: MessageKind,
    /// The unknown message name
    pub name: String,
}

impl std::error::Error for NotFound {}

impl std::fmt::Display for NotFound {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error> {
        let kind = match self.kind {
            MessageKind::Request => "request",
            MessageKind::Event => "event",
        };
        write!(f, "Interface {} has no {} named \"{}\"", self.interface, kind, self.name)
    }
}

/// Failure of the argument codec
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// The signature contains a code with no known layout
    UnsupportedSignature {
        /// The offending signature
        signature: String,
        /// The code that could not be interpreted
        code: char,
    },
    /// The number of arguments does not match the signature
    ArgumentCount {
        /// Arguments required by the signature
        expected: usize,
        /// Arguments provided
        got: usize,
    },
    /// An argument does not have the kind required by the signature
    ArgumentMismatch {
        /// Position of the argument
        index: usize,
        /// Signature code expected at this position
        expected: char,
        /// Signature code of the provided argument
        got: char,
    },
    /// A null value was given for a non-nullable argument
    UnexpectedNull {
        /// Position of the argument
        index: usize,
    },
}

impl std::error::Error for CodecError {}

impl std::fmt::Display for CodecError {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error> {
        match self {
            Self::UnsupportedSignature { signature, code } => {
                write!(f, "Unsupported code '{code}' in signature \"{signature}\"")
            }
            Self::ArgumentCount { expected, got } => {
                write!(f, "Expected {expected} arguments, got {got}")
            }
            Self::ArgumentMismatch { index, expected, got } => {
                write!(f, "Argument {index} should be of kind '{expected}', got '{got}'")
            }
            Self::UnexpectedNull { index } => write!(f, "Argument {index} cannot be null"),
        }
    }
}

/// Failure to push an event on the queue
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QueueError {
    /// The queue is full and refuses new events
    Full {
        /// Capacity of the queue
        capacity: usize,
    },
}

impl std::error::Error for QueueError {}

impl std::fmt::Display for QueueError {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error> {
        match self {
            Self::Full { capacity } => write!(f, "Event queue is full ({capacity} events)"),
        }
    }
}

/// An error that can occur when sending a request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarshalError {
    /// The target or an argument is not a live object
    InvalidId,
    /// An object argument is not of the interface the request expects
    ArgumentInterface {
        /// Position of the argument
        index: usize,
        /// Interface expected by the request
        expected: &'static str,
        /// Interface of the given object
        got: &'static str,
    },
    /// The arguments do not match the request signature
    Codec(CodecError),
    /// The pool of the object the request would create is exhausted
    ResourceExhausted(PoolKind),
    /// A synthesized event could not be queued
    Queue(QueueError),
    /// The connection was closed
    Disconnected,
}

impl std::error::Error for MarshalError {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Codec(e) => Some(e),
            Self::Queue(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for MarshalError {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error> {
        match self {
            Self::InvalidId => write!(f, "Invalid ObjectId"),
            Self::ArgumentInterface { index, expected, got } => {
                write!(f, "Argument {index} should be a {expected}, got a {got}")
            }
            Self::Codec(e) => std::fmt::Display::fmt(e, f),
            Self::ResourceExhausted(kind) => write!(f, "No free {kind} slot left"),
            Self::Queue(e) => std::fmt::Display::fmt(e, f),
            Self::Disconnected => write!(f, "The connection is closed"),
        }
    }
}

impl From<InvalidId> for MarshalError {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn from(_: InvalidId) -> Self {
        Self::InvalidId
    }
}

impl From<CodecError> for MarshalError {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn from(err: CodecError) -> Self {
        Self::Codec(err)
    }
}

impl From<QueueError> for MarshalError {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn from(err: QueueError) -> Self {
        Self::Queue(err)
    }
}

/// An error that can occur when registering a listener
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListenerError {
    /// The object already has a listener
    AlreadySet,
    /// The object is not alive
    InvalidId,
    /// The listener was built for another interface
    WrongInterface {
        /// Interface of the object
        expected: &'static str,
        /// Interface of the listener
        got: &'static str,
    },
    /// The event does not exist on the interface
    Lookup(NotFound),
    /// The callback arguments do not match the event signature
    Codec(CodecError),
    /// The events announcing the object could not be queued
    Queue(QueueError),
}

impl std::error::Error for ListenerError {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Lookup(e) => Some(e),
            Self::Codec(e) => Some(e),
            Self::Queue(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for ListenerError {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error> {
        match self {
            Self::AlreadySet => write!(f, "A listener is already set on this object"),
            Self::InvalidId => write!(f, "Invalid ObjectId"),
            Self::WrongInterface { expected, got } => {
                write!(f, "Listener for {got} cannot be attached to a {expected} object")
            }
            Self::Lookup(e) => std::fmt::Display::fmt(e, f),
            Self::Codec(e) => std::fmt::Display::fmt(e, f),
            Self::Queue(e) => std::fmt::Display::fmt(e, f),
        }
    }
}

impl From<InvalidId> for ListenerError {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn from(_: InvalidId) -> Self {
        Self::InvalidId
    }
}

impl From<NotFound> for ListenerError {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn from(err: NotFound) -> Self {
        Self::Lookup(err)
    }
}

impl From<CodecError> for ListenerError {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn from(err: CodecError) -> Self {
        Self::Codec(err)
    }
}

/// An error that can occur when dispatching events
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchError {
    /// The connection was closed
    Disconnected,
    /// Events are already queued and must be dispatched before reading new ones
    WouldBlock,
}

impl std::error::Error for DispatchError {}

impl std::fmt::Display for DispatchError {
    #[cfg_attr(unstable_coverage, coverage(off))]
    fn fmt(&self, f: &mut ::std::fmt::Formatter) -> Result<(), ::std::fmt::Error> {
        match self {
            Self::Disconnected => write!(f, "The connection is closed"),
            Self::WouldBlock => write!(f, "Pending events must be dispatched first"),
        }
    }
}
