//! Argument codec
//!
//! Signatures are parsed into a list of [`ArgKind`], which drives both the validation of
//! outgoing arguments ([`encode()`]) and the typed decoding of event payloads into callback
//! parameters ([`EventArgs`]).

use smallvec::SmallVec;

use crate::client::{Connection, ObjectId, Proxy};
use crate::protocol::{AllowNull, ArgList, Argument, ArgumentType, Fd, WEnum, INLINE_ARGS};
use crate::types::CodecError;

/// Maximum length in bytes of a string argument, longer strings are truncated
pub const MAX_STRING_LEN: usize = 512;

/// Owned arguments of a message, as stored in the event queue
pub type Payload = ArgList<ObjectId>;

/// One argument of a signature
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ArgKind {
    /// Type of the argument
    pub ty: ArgumentType,
    /// Whether the argument was marked with `?`
    pub nullable: bool,
}

impl ArgKind {
    /// The signature code of this argument
    pub fn code(&self) -> char {
        self.ty.code()
    }
}

/// A parsed message signature
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// Interface version the message appeared in
    pub since: u32,
    /// Arguments, in order
    pub args: SmallVec<[ArgKind; INLINE_ARGS]>,
}

impl Signature {
    /// Number of arguments
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Whether the message has no arguments
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Parse a signature string
///
/// Leading digits are the minimum version of the message. A `?` marks the following string
/// or object argument as nullable.
pub fn parse_signature(signature: &str) -> Result<Signature, CodecError> {
    let body = signature.trim_start_matches(|c: char| c.is_ascii_digit());
    let since = signature[..signature.len() - body.len()].parse().unwrap_or(1);
    let unsupported =
        |code: char| CodecError::UnsupportedSignature { signature: signature.into(), code };

    let mut args = SmallVec::new();
    let mut nullable = false;
    for code in body.chars() {
        let allow_null = if nullable { AllowNull::Yes } else { AllowNull::No };
        let ty = match code {
            '?' if !nullable => {
                nullable = true;
                continue;
            }
            'i' => ArgumentType::Int,
            'u' => ArgumentType::Uint,
            'f' => ArgumentType::Fixed,
            's' => ArgumentType::Str(allow_null),
            'o' => ArgumentType::Object(allow_null),
            'n' => ArgumentType::NewId,
            'a' => ArgumentType::Array,
            'h' => ArgumentType::Fd,
            other => return Err(unsupported(other)),
        };
        if nullable && !matches!(ty, ArgumentType::Str(_) | ArgumentType::Object(_)) {
            return Err(unsupported(code));
        }
        args.push(ArgKind { ty, nullable });
        nullable = false;
    }
    if nullable {
        return Err(unsupported('?'));
    }
    Ok(Signature { since, args })
}

/// Validate a list of arguments against a signature and detach them into a payload
///
/// Strings longer than [`MAX_STRING_LEN`] are truncated on a character boundary.
pub fn encode(
    signature: &Signature,
    args: impl IntoIterator<Item = Argument<ObjectId>>,
) -> Result<Payload, CodecError> {
    let args: Payload = args.into_iter().collect();
    if args.len() != signature.len() {
        return Err(CodecError::ArgumentCount { expected: signature.len(), got: args.len() });
    }
    let mut payload = Payload::with_capacity(args.len());
    for (index, (kind, arg)) in signature.args.iter().zip(args).enumerate() {
        if !kind.ty.same_type(arg.get_type()) {
            return Err(CodecError::ArgumentMismatch {
                index,
                expected: kind.code(),
                got: arg.get_type().code(),
            });
        }
        let arg = match arg {
            Argument::Str(Some(s)) => Argument::Str(Some(bounded(s))),
            Argument::Str(None) if !kind.nullable => {
                return Err(CodecError::UnexpectedNull { index })
            }
            Argument::Object(ref id) if id.is_null() && !kind.nullable => {
                return Err(CodecError::UnexpectedNull { index })
            }
            other => other,
        };
        payload.push(arg);
    }
    Ok(payload)
}

fn bounded(s: Box<str>) -> Box<str> {
    if s.len() <= MAX_STRING_LEN {
        return s;
    }
    let mut end = MAX_STRING_LEN;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].into()
}

/// Convert a floating point value to the 24.8 fixed point representation
pub fn fixed_from_f64(value: f64) -> i32 {
    (value * 256.0).round() as i32
}

/// Convert a 24.8 fixed point value to a floating point value
pub fn fixed_to_f64(value: i32) -> f64 {
    value as f64 / 256.0
}

/// A value that can be extracted from one event argument
pub trait FromArgument: Sized {
    /// Signature code this type is usually decoded from
    const CODE: char;

    /// Whether this type can be decoded from an argument of this kind
    fn accepts(kind: ArgKind) -> bool;

    /// Extract the value, `None` if the argument does not fit
    fn from_argument(arg: Argument<ObjectId>, conn: &Connection) -> Option<Self>;
}

impl FromArgument for u32 {
    const CODE: char = 'u';

    fn accepts(kind: ArgKind) -> bool {
        kind.ty == ArgumentType::Uint
    }

    fn from_argument(arg: Argument<ObjectId>, _: &Connection) -> Option<Self> {
        match arg {
            Argument::Uint(v) => Some(v),
            _ => None,
        }
    }
}

impl FromArgument for i32 {
    const CODE: char = 'i';

    fn accepts(kind: ArgKind) -> bool {
        matches!(kind.ty, ArgumentType::Int | ArgumentType::Fixed)
    }

    fn from_argument(arg: Argument<ObjectId>, _: &Connection) -> Option<Self> {
        match arg {
            Argument::Int(v) | Argument::Fixed(v) => Some(v),
            _ => None,
        }
    }
}

impl FromArgument for f64 {
    const CODE: char = 'f';

    fn accepts(kind: ArgKind) -> bool {
        kind.ty == ArgumentType::Fixed
    }

    fn from_argument(arg: Argument<ObjectId>, _: &Connection) -> Option<Self> {
        match arg {
            Argument::Fixed(v) => Some(fixed_to_f64(v)),
            _ => None,
        }
    }
}

impl FromArgument for String {
    const CODE: char = 's';

    fn accepts(kind: ArgKind) -> bool {
        kind.ty == ArgumentType::Str(AllowNull::No)
    }

    fn from_argument(arg: Argument<ObjectId>, _: &Connection) -> Option<Self> {
        match arg {
            Argument::Str(Some(s)) => Some(s.into()),
            _ => None,
        }
    }
}

impl FromArgument for Option<String> {
    const CODE: char = 's';

    fn accepts(kind: ArgKind) -> bool {
        matches!(kind.ty, ArgumentType::Str(_))
    }

    fn from_argument(arg: Argument<ObjectId>, _: &Connection) -> Option<Self> {
        match arg {
            Argument::Str(s) => Some(s.map(Into::into)),
            _ => None,
        }
    }
}

impl FromArgument for Proxy {
    const CODE: char = 'o';

    fn accepts(kind: ArgKind) -> bool {
        matches!(kind.ty, ArgumentType::Object(AllowNull::No) | ArgumentType::NewId)
    }

    fn from_argument(arg: Argument<ObjectId>, conn: &Connection) -> Option<Self> {
        match arg {
            Argument::Object(id) | Argument::NewId(id) if !id.is_null() => {
                Some(Proxy::from_id(conn, id))
            }
            _ => None,
        }
    }
}

impl FromArgument for Option<Proxy> {
    const CODE: char = 'o';

    fn accepts(kind: ArgKind) -> bool {
        matches!(kind.ty, ArgumentType::Object(_))
    }

    fn from_argument(arg: Argument<ObjectId>, conn: &Connection) -> Option<Self> {
        match arg {
            Argument::Object(id) if id.is_null() => Some(None),
            Argument::Object(id) => Some(Some(Proxy::from_id(conn, id))),
            _ => None,
        }
    }
}

impl FromArgument for Vec<u8> {
    const CODE: char = 'a';

    fn accepts(kind: ArgKind) -> bool {
        kind.ty == ArgumentType::Array
    }

    fn from_argument(arg: Argument<ObjectId>, _: &Connection) -> Option<Self> {
        match arg {
            Argument::Array(v) => Some(*v),
            _ => None,
        }
    }
}

impl FromArgument for Fd {
    const CODE: char = 'h';

    fn accepts(kind: ArgKind) -> bool {
        kind.ty == ArgumentType::Fd
    }

    fn from_argument(arg: Argument<ObjectId>, _: &Connection) -> Option<Self> {
        match arg {
            Argument::Fd(fd) => Some(fd),
            _ => None,
        }
    }
}

impl<T: TryFrom<u32>> FromArgument for WEnum<T> {
    const CODE: char = 'u';

    fn accepts(kind: ArgKind) -> bool {
        kind.ty == ArgumentType::Uint
    }

    fn from_argument(arg: Argument<ObjectId>, _: &Connection) -> Option<Self> {
        match arg {
            Argument::Uint(v) => Some(v.into()),
            _ => None,
        }
    }
}

impl FromArgument for Argument<ObjectId> {
    const CODE: char = '*';

    fn accepts(_: ArgKind) -> bool {
        true
    }

    fn from_argument(arg: Argument<ObjectId>, _: &Connection) -> Option<Self> {
        Some(arg)
    }
}

/// The full list of parameters of an event callback
///
/// Implemented for `()` and for tuples of up to 8 [`FromArgument`] values.
pub trait EventArgs: Sized {
    /// Check that these parameters can be decoded from the given signature
    fn check(signature: &Signature) -> Result<(), CodecError>;

    /// Decode a payload into these parameters
    fn decode(payload: Payload, conn: &Connection) -> Result<Self, CodecError>;
}

fn is_null(arg: &Argument<ObjectId>) -> bool {
    match arg {
        Argument::Str(None) => true,
        Argument::Object(id) => id.is_null(),
        _ => false,
    }
}

macro_rules! impl_event_args {
    ($count: expr; $($name: ident),*) => {
        impl<$($name: FromArgument),*> EventArgs for ($($name,)*) {
            #[allow(unused_mut, unused_variables, unused_assignments)]
            fn check(signature: &Signature) -> Result<(), CodecError> {
                if signature.len() != $count {
                    return Err(CodecError::ArgumentCount { expected: signature.len(), got: $count });
                }
                let mut index = 0;
                $(
                    let kind = signature.args[index];
                    if !$name::accepts(kind) {
                        return Err(CodecError::ArgumentMismatch {
                            index,
                            expected: kind.code(),
                            got: $name::CODE,
                        });
                    }
                    index += 1;
                )*
                Ok(())
            }

            #[allow(unused_mut, unused_variables)]
            fn decode(payload: Payload, conn: &Connection) -> Result<Self, CodecError> {
                if payload.len() != $count {
                    return Err(CodecError::ArgumentCount { expected: $count, got: payload.len() });
                }
                let mut args = payload.into_iter().enumerate();
                Ok(($(
                    {
                        let Some((index, arg)) = args.next() else {
                            return Err(CodecError::ArgumentCount { expected: $count, got: 0 });
                        };
                        let null = is_null(&arg);
                        let got = arg.get_type().code();
                        match $name::from_argument(arg, conn) {
                            Some(value) => value,
                            None if null => return Err(CodecError::UnexpectedNull { index }),
                            None => {
                                return Err(CodecError::ArgumentMismatch {
                                    index,
                                    expected: $name::CODE,
                                    got,
                                })
                            }
                        }
                    },
                )*))
            }
        }
    };
}

impl_event_args!(0;);
impl_event_args!(1; A);
impl_event_args!(2; A, B);
impl_event_args!(3; A, B, C);
impl_event_args!(4; A, B, C, D);
impl_event_args!(5; A, B, C, D, E);
impl_event_args!(6; A, B, C, D, E, F);
impl_event_args!(7; A, B, C, D, E, F, G);
impl_event_args!(8; A, B, C, D, E, F, G, H);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_prefix_and_nullability() {
        let sig = parse_signature("5u?oii").unwrap();
        assert_eq!(sig.since, 5);
        let codes: String = sig.args.iter().map(ArgKind::code).collect();
        assert_eq!(codes, "uoii");
        assert!(sig.args[1].nullable);
        assert_eq!(sig.args[1].ty, ArgumentType::Object(AllowNull::Yes));
        assert!(!sig.args[0].nullable);

        let empty = parse_signature("").unwrap();
        assert_eq!(empty.since, 1);
        assert!(empty.is_empty());
    }

    #[test]
    fn unsupported_codes() {
        assert_eq!(
            parse_signature("uxi"),
            Err(CodecError::UnsupportedSignature { signature: "uxi".into(), code: 'x' })
        );
        // digits are only allowed as a prefix
        assert!(parse_signature("u2").is_err());
        // nullable marker without an argument, or on a non-nullable kind
        assert!(parse_signature("u?").is_err());
        assert!(parse_signature("?u").is_err());
    }

    #[test]
    fn encode_checks_arguments() {
        let sig = parse_signature("us?o").unwrap();
        let ok = encode(
            &sig,
            [Argument::Uint(3), Argument::Str(Some("trains".into())), Argument::Object(ObjectId::null())],
        )
        .unwrap();
        assert_eq!(ok.len(), 3);

        assert_eq!(
            encode(&sig, [Argument::Uint(3)]),
            Err(CodecError::ArgumentCount { expected: 3, got: 1 })
        );
        assert_eq!(
            encode(
                &sig,
                [Argument::Int(3), Argument::Str(None), Argument::Object(ObjectId::null())]
            ),
            Err(CodecError::ArgumentMismatch { index: 0, expected: 'u', got: 'i' })
        );
        assert_eq!(
            encode(
                &sig,
                [Argument::Uint(3), Argument::Str(None), Argument::Object(ObjectId::null())]
            ),
            Err(CodecError::UnexpectedNull { index: 1 })
        );
    }

    #[test]
    fn long_strings_are_bounded() {
        let sig = parse_signature("s").unwrap();
        // 'é' is two bytes long, so the limit falls in the middle of a character
        let long = format!("a{}", "é".repeat(MAX_STRING_LEN));
        let payload = encode(&sig, [Argument::Str(Some(long.into()))]).unwrap();
        match &payload[0] {
            Argument::Str(Some(s)) => {
                assert_eq!(s.len(), MAX_STRING_LEN - 1);
                assert!(s.starts_with("aé"));
            }
            other => panic!("unexpected argument {other:?}"),
        }
    }

    #[test]
    fn fixed_conversions() {
        assert_eq!(fixed_from_f64(1.5), 384);
        assert_eq!(fixed_from_f64(-2.0), -512);
        assert_eq!(fixed_to_f64(384), 1.5);
    }

    #[test]
    fn callback_arguments_match_signature() {
        let sig = parse_signature("uoff").unwrap();
        assert!(<(u32, Proxy, f64, f64)>::check(&sig).is_ok());
        assert!(<(u32, Option<Proxy>, i32, i32)>::check(&sig).is_ok());
        assert_eq!(
            <(u32, String, f64, f64)>::check(&sig),
            Err(CodecError::ArgumentMismatch { index: 1, expected: 'o', got: 's' })
        );
        assert_eq!(
            <(u32,)>::check(&sig),
            Err(CodecError::ArgumentCount { expected: 4, got: 1 })
        );
        assert!(<()>::check(&parse_signature("").unwrap()).is_ok());
    }
}
