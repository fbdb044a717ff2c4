//! The tag-byte wire format for expressions.
//!
//! One ASCII tag per node (`C` Const, `t` Terminal, `U` Unary, `B` Binary,
//! `T` Ternary, `y` Typed, `A` Assign, `F` FlagDef), then the op code, then
//! payload and children in constructor order, then an end-of-node marker
//! with zero length. Type and RTL payloads are delegated to the external
//! handle traits; reading them back goes through a [`HandleCodec`].
//!
//! Multi-byte scalars are host-native byte order. This is a documented
//! limitation of the format, reproduced for compatibility with existing
//! dumps; streams do not port across differently-ordered hosts.
//!
//! Malformed records (unknown tag, unknown const op, arity-breaking op,
//! missing end marker) are logged as warnings and skipped: the decoder
//! returns `Ok(None)` and the partial data is dropped. Truncation is a hard
//! [`DecodeError`].

use log::warn;

use crate::error::DecodeError;
use crate::exp::{Const, Exp};
use crate::handles::HandleCodec;
use crate::op::Op;

/// End-of-node field marker.
pub const FID_EXP_END: u16 = 0x00FE;

/// Cursor over a byte stream being decoded.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// A reader over the whole of `data`.
    pub fn new(data: &'a [u8]) -> ByteReader<'a> {
        ByteReader { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize, context: &'static str) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < n {
            return Err(DecodeError::Truncated {
                needed: n - self.remaining(),
                context,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Reads one byte.
    pub fn read_u8(&mut self, context: &'static str) -> Result<u8, DecodeError> {
        Ok(self.take(1, context)?[0])
    }

    /// Reads a host-native `u16`.
    pub fn read_u16(&mut self, context: &'static str) -> Result<u16, DecodeError> {
        Ok(u16::from_ne_bytes(self.take(2, context)?.try_into().unwrap()))
    }

    /// Reads a host-native `i32`.
    pub fn read_i32(&mut self, context: &'static str) -> Result<i32, DecodeError> {
        Ok(i32::from_ne_bytes(self.take(4, context)?.try_into().unwrap()))
    }

    /// Reads a host-native `u32`.
    pub fn read_u32(&mut self, context: &'static str) -> Result<u32, DecodeError> {
        Ok(u32::from_ne_bytes(self.take(4, context)?.try_into().unwrap()))
    }

    /// Reads a host-native `i64`.
    pub fn read_i64(&mut self, context: &'static str) -> Result<i64, DecodeError> {
        Ok(i64::from_ne_bytes(self.take(8, context)?.try_into().unwrap()))
    }

    /// Reads a host-native `u64`.
    pub fn read_u64(&mut self, context: &'static str) -> Result<u64, DecodeError> {
        Ok(u64::from_ne_bytes(self.take(8, context)?.try_into().unwrap()))
    }

    /// Reads a host-native `f64`.
    pub fn read_f64(&mut self, context: &'static str) -> Result<f64, DecodeError> {
        Ok(f64::from_ne_bytes(self.take(8, context)?.try_into().unwrap()))
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self, context: &'static str) -> Result<String, DecodeError> {
        let len = self.read_u32(context)? as usize;
        if len > self.remaining() {
            return Err(DecodeError::InvalidLength { len, context });
        }
        let bytes = self.take(len, context)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidString)
    }
}

/// Appends the wire encoding of `e` to `out`.
pub fn serialize(e: &Exp, out: &mut Vec<u8>) {
    match e {
        Exp::Const(c) => {
            out.push(b'C');
            push_op(out, c.op());
            match c {
                Const::Int(k) => out.extend_from_slice(&k.to_ne_bytes()),
                Const::Flt(d) => out.extend_from_slice(&d.to_ne_bytes()),
                Const::Str(s) => {
                    out.extend_from_slice(&(s.len() as u32).to_ne_bytes());
                    out.extend_from_slice(s.as_bytes());
                }
                Const::CodeAddr(a) => out.extend_from_slice(&a.to_ne_bytes()),
            }
        }
        Exp::Terminal(op) => {
            out.push(b't');
            push_op(out, *op);
        }
        Exp::Unary { op, e1 } => {
            out.push(b'U');
            push_op(out, *op);
            serialize(e1, out);
        }
        Exp::Binary { op, e1, e2 } => {
            out.push(b'B');
            push_op(out, *op);
            serialize(e1, out);
            serialize(e2, out);
        }
        Exp::Ternary { op, e1, e2, e3 } => {
            out.push(b'T');
            push_op(out, *op);
            serialize(e1, out);
            serialize(e2, out);
            serialize(e3, out);
        }
        Exp::Typed { ty, e1 } => {
            out.push(b'y');
            push_op(out, Op::TypedExp);
            ty.serialize(out);
            serialize(e1, out);
        }
        Exp::Assign { size, lhs, rhs } => {
            out.push(b'A');
            push_op(out, Op::AssignExp);
            out.extend_from_slice(&size.to_ne_bytes());
            serialize(lhs, out);
            serialize(rhs, out);
        }
        Exp::FlagDef { params, rtl } => {
            out.push(b'F');
            push_op(out, Op::FlagDef);
            serialize(params, out);
            rtl.serialize(out);
        }
    }
    out.extend_from_slice(&FID_EXP_END.to_ne_bytes());
    out.extend_from_slice(&0u16.to_ne_bytes());
}

fn push_op(out: &mut Vec<u8>, op: Op) {
    out.extend_from_slice(&op.code().to_ne_bytes());
}

/// Reads one expression record.
///
/// Returns `Ok(None)` for a recognizably malformed record, after logging a
/// warning; the record and anything nested in it are dropped.
pub fn deserialize(
    r: &mut ByteReader<'_>,
    codec: &dyn HandleCodec,
) -> Result<Option<Exp>, DecodeError> {
    let tag = r.read_u8("node tag")?;
    let code = r.read_i32("op code")?;
    let op = match Op::from_code(code) {
        Some(op) => op,
        None => {
            warn!("unknown op code {} in expression record, data will be lost", code);
            return Ok(None);
        }
    };

    let e = match tag {
        b'C' => match op {
            Op::IntConst => Some(Exp::int(r.read_i64("integer constant")?)),
            Op::FltConst => Some(Exp::flt(r.read_f64("float constant")?)),
            Op::StrConst => Some(Exp::str(r.read_string("string constant")?)),
            Op::CodeAddr => Some(Exp::code_addr(r.read_u64("code address")?)),
            other => {
                warn!("unknown const op {}, data will be lost", other);
                None
            }
        },
        b't' => {
            if op.is_terminal() {
                Some(Exp::Terminal(op))
            } else {
                warn!("op {} is not a terminal, data will be lost", op);
                None
            }
        }
        b'U' => {
            let e1 = deserialize(r, codec)?;
            match e1 {
                Some(e1) if op.arity() == 1 && op != Op::TypedExp && op != Op::FlagDef => {
                    Some(Exp::unary(op, e1))
                }
                Some(_) => {
                    warn!("op {} is not unary, data will be lost", op);
                    None
                }
                None => None,
            }
        }
        b'B' => {
            let e1 = deserialize(r, codec)?;
            let e2 = deserialize(r, codec)?;
            match (e1, e2) {
                (Some(e1), Some(e2)) if op.arity() == 2 && op != Op::AssignExp => {
                    Some(Exp::binary(op, e1, e2))
                }
                (Some(_), Some(_)) => {
                    warn!("op {} is not binary, data will be lost", op);
                    None
                }
                _ => None,
            }
        }
        b'T' => {
            let e1 = deserialize(r, codec)?;
            let e2 = deserialize(r, codec)?;
            let e3 = deserialize(r, codec)?;
            match (e1, e2, e3) {
                (Some(e1), Some(e2), Some(e3)) if op.arity() == 3 => {
                    Some(Exp::ternary(op, e1, e2, e3))
                }
                (Some(_), Some(_), Some(_)) => {
                    warn!("op {} is not ternary, data will be lost", op);
                    None
                }
                _ => None,
            }
        }
        b'y' => {
            let ty = codec.read_ty(r)?;
            deserialize(r, codec)?.map(|e1| Exp::typed(ty, e1))
        }
        b'A' => {
            let size = r.read_u32("assignment size")?;
            let lhs = deserialize(r, codec)?;
            let rhs = deserialize(r, codec)?;
            match (lhs, rhs) {
                (Some(lhs), Some(rhs)) => Some(Exp::assign_sized(size, lhs, rhs)),
                _ => None,
            }
        }
        b'F' => {
            let params = deserialize(r, codec)?;
            let rtl = codec.read_rtl(r)?;
            params.map(|p| Exp::flag_def(p, rtl))
        }
        other => {
            warn!("unknown expression tag {:#04x}, data will be lost", other);
            return Ok(None);
        }
    };

    match e {
        None => Ok(None),
        Some(e) => {
            let fid = r.read_u16("end-of-node marker")?;
            let len = r.read_u16("end-of-node length")?;
            if fid != FID_EXP_END || len != 0 {
                warn!(
                    "missing end-of-node marker (fid {:#06x}, len {}), record skipped",
                    fid, len
                );
                return Ok(None);
            }
            Ok(Some(e))
        }
    }
}

impl Exp {
    /// Appends this expression's wire encoding to `out`.
    pub fn serialize(&self, out: &mut Vec<u8>) {
        serialize(self, out);
    }

    /// Wire encoding as a fresh byte vector.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        serialize(self, &mut out);
        out
    }

    /// Reads one expression record; see [`deserialize`].
    pub fn deserialize(
        r: &mut ByteReader<'_>,
        codec: &dyn HandleCodec,
    ) -> Result<Option<Exp>, DecodeError> {
        deserialize(r, codec)
    }
}
