//! Handles to external collaborators.
//!
//! The expression core does not define the decompiler's type system or the
//! RTL container; it consumes them through the narrow contracts below. A
//! type handle must clone, compare, order, print, report its bit size and
//! serialize itself; an RTL handle must clone, report its length and
//! serialize itself. Minimal concrete implementations ([`WordTy`],
//! [`BasicRtl`]) ship for tests, fuzzing and width-only lifters.

use std::any::Any;
use std::cmp::Ordering;
use std::fmt;

use crate::error::DecodeError;
use crate::exp::Exp;
use crate::serialize::{self, ByteReader};

/// An opaque type handle owned by a `Typed` expression.
pub trait Ty: fmt::Debug {
    /// Size of the type in bits.
    fn size_bits(&self) -> u32;

    /// Independent deep copy.
    fn clone_box(&self) -> Box<dyn Ty>;

    /// Equality across arbitrary implementations; unrelated implementations
    /// compare unequal.
    fn eq_ty(&self, other: &dyn Ty) -> bool;

    /// Total order used by the expression total order.
    fn cmp_ty(&self, other: &dyn Ty) -> Ordering;

    /// Prints the type for the `*bits*` annotations and diagnostics.
    fn write_to(&self, f: &mut dyn fmt::Write) -> fmt::Result;

    /// Appends the wire encoding of this handle.
    fn serialize(&self, out: &mut Vec<u8>);

    /// Downcasting support for cross-implementation comparison.
    fn as_any(&self) -> &dyn Any;
}

/// An opaque RTL handle owned by a `FlagDef` expression.
///
/// Expression equality and ordering do not consult the RTL.
pub trait Rtl: fmt::Debug {
    /// Independent deep copy.
    fn clone_box(&self) -> Box<dyn Rtl>;

    /// Number of expressions in the sequence, for DOT rendering.
    fn len(&self) -> usize;

    /// True if the sequence is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends the wire encoding of this handle.
    fn serialize(&self, out: &mut Vec<u8>);
}

/// Factory used by the deserializer to read handle payloads back.
pub trait HandleCodec {
    /// Reads a type handle from the stream.
    fn read_ty(&self, r: &mut ByteReader<'_>) -> Result<Box<dyn Ty>, DecodeError>;

    /// Reads an RTL handle from the stream.
    fn read_rtl(&self, r: &mut ByteReader<'_>) -> Result<Box<dyn Rtl>, DecodeError>;
}

/// A bare bit-width type: the smallest useful [`Ty`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordTy {
    bits: u32,
}

impl WordTy {
    /// A word type of the given width in bits.
    pub fn new(bits: u32) -> WordTy {
        WordTy { bits }
    }
}

impl Ty for WordTy {
    fn size_bits(&self) -> u32 {
        self.bits
    }

    fn clone_box(&self) -> Box<dyn Ty> {
        Box::new(*self)
    }

    fn eq_ty(&self, other: &dyn Ty) -> bool {
        other
            .as_any()
            .downcast_ref::<WordTy>()
            .is_some_and(|o| o.bits == self.bits)
    }

    fn cmp_ty(&self, other: &dyn Ty) -> Ordering {
        match other.as_any().downcast_ref::<WordTy>() {
            Some(o) => self.bits.cmp(&o.bits),
            // Foreign implementations order after word types.
            None => Ordering::Less,
        }
    }

    fn write_to(&self, f: &mut dyn fmt::Write) -> fmt::Result {
        write!(f, "u{}", self.bits)
    }

    fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.bits.to_ne_bytes());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An owned expression sequence: the smallest useful [`Rtl`] implementation.
#[derive(Debug, Clone, Default)]
pub struct BasicRtl {
    /// The expressions lifted for one instruction, in order.
    pub exps: Vec<Exp>,
}

impl BasicRtl {
    /// An RTL over the given expressions.
    pub fn new(exps: Vec<Exp>) -> BasicRtl {
        BasicRtl { exps }
    }
}

impl Rtl for BasicRtl {
    fn clone_box(&self) -> Box<dyn Rtl> {
        Box::new(self.clone())
    }

    fn len(&self) -> usize {
        self.exps.len()
    }

    fn serialize(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.exps.len() as u32).to_ne_bytes());
        for e in &self.exps {
            serialize::serialize(e, out);
        }
    }
}

/// Codec reading back [`WordTy`] and [`BasicRtl`] payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordCodec;

impl HandleCodec for WordCodec {
    fn read_ty(&self, r: &mut ByteReader<'_>) -> Result<Box<dyn Ty>, DecodeError> {
        let bits = r.read_u32("word type width")?;
        Ok(Box::new(WordTy::new(bits)))
    }

    fn read_rtl(&self, r: &mut ByteReader<'_>) -> Result<Box<dyn Rtl>, DecodeError> {
        let n = r.read_u32("rtl length")? as usize;
        let mut exps = Vec::with_capacity(n.min(1024));
        for _ in 0..n {
            match serialize::deserialize(r, self)? {
                Some(e) => exps.push(e),
                None => {
                    return Err(DecodeError::InvalidHandle {
                        kind: "rtl",
                        reason: "embedded expression record was malformed".into(),
                    })
                }
            }
        }
        Ok(Box::new(BasicRtl::new(exps)))
    }
}
