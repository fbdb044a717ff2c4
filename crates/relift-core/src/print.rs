//! Infix pretty-printing.
//!
//! `Display` renders the outer level of an expression with no parentheses;
//! nested binaries and the `?:`/`@` ternaries are parenthesized, while
//! bracketed selectors, function-form operators, `Size` and `List` group
//! themselves. The grammar matches the decompiler's textual IR dumps and is
//! exercised directly by tests.

use std::fmt;

use crate::exp::{Const, Exp};
use crate::op::Op;

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_outer(self, f)
    }
}

impl Exp {
    /// Prints at the outer level: no parentheses around this node.
    pub fn print(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write_outer(self, out)
    }

    /// Prints as a subexpression: infix binaries and the `?:`/`@` ternaries
    /// are parenthesized.
    pub fn print_recursive(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write_rec(self, out)
    }

    /// Renders to a `String` capped at 200 bytes, for debugger use.
    pub fn prints(&self) -> String {
        let mut s = self.to_string();
        if s.len() > 200 {
            let mut cut = 200;
            while !s.is_char_boundary(cut) {
                cut -= 1;
            }
            s.truncate(cut);
        }
        s
    }
}

/// Outer-level print: no parentheses at this level.
fn write_outer(e: &Exp, f: &mut dyn fmt::Write) -> fmt::Result {
    match e {
        Exp::Const(c) => write_const(c, f, true),
        Exp::Terminal(op) => write_terminal(*op, f),
        Exp::Unary { op, e1 } => write_unary(*op, e1, f),
        Exp::Binary { op, e1, e2 } => write_binary(*op, e1, e2, f),
        Exp::Ternary { op, e1, e2, e3 } => write_ternary(*op, e1, e2, e3, f),
        Exp::Typed { ty, e1 } => {
            write!(f, "*{}* ", ty.size_bits())?;
            write_outer(e1, f)
        }
        Exp::Assign { size, lhs, rhs } => {
            write!(f, "*{}* ", size)?;
            write_outer(lhs, f)?;
            f.write_str(" := ")?;
            write_outer(rhs, f)
        }
        Exp::FlagDef { .. } => panic!("print: {} has no print form", Op::FlagDef),
    }
}

/// Recursive print: parenthesizes infix binaries and the `?:`/`@` ternaries.
fn write_rec(e: &Exp, f: &mut dyn fmt::Write) -> fmt::Result {
    match e {
        Exp::Binary { op, .. } => match op {
            // Self-grouping forms.
            Op::Size | Op::List | Op::FlagCall | Op::ExpTable | Op::NameTable => {
                write_outer(e, f)
            }
            _ => {
                f.write_char('(')?;
                write_outer(e, f)?;
                f.write_char(')')
            }
        },
        Exp::Ternary { op, .. } => match op {
            Op::Tern | Op::At => {
                f.write_char('(')?;
                write_outer(e, f)?;
                f.write_char(')')
            }
            _ => write_outer(e, f),
        },
        _ => write_outer(e, f),
    }
}

fn write_const(c: &Const, f: &mut dyn fmt::Write, quotes: bool) -> fmt::Result {
    match c {
        Const::Int(k) => write!(f, "{}", k),
        Const::Flt(d) => write!(f, "{}", d),
        Const::Str(s) if quotes => write!(f, "\"{}\"", s),
        Const::Str(s) => f.write_str(s),
        Const::CodeAddr(a) => write!(f, "0x{:x}", a),
    }
}

/// Prints a string constant without quotes; other nodes print normally.
fn write_no_quotes(e: &Exp, f: &mut dyn fmt::Write) -> fmt::Result {
    match e {
        Exp::Const(c) => write_const(c, f, false),
        other => write_outer(other, f),
    }
}

fn write_terminal(op: Op, f: &mut dyn fmt::Write) -> fmt::Result {
    let s = match op {
        Op::Pc => "%pc",
        Op::Flags => "%flags",
        Op::Cf => "%CF",
        Op::Zf => "%ZF",
        Op::Of => "%OF",
        Op::Nf => "%NF",
        Op::Afp => "%afp",
        Op::Agp => "%agp",
        Op::Anull => "%anul",
        Op::Fpush => "FPUSH",
        Op::Fpop => "FPOP",
        Op::Wild => "WILD",
        Op::Nil => "",
        other => panic!("print: {} is not a terminal", other),
    };
    f.write_str(s)
}

fn write_unary(op: Op, e1: &Exp, f: &mut dyn fmt::Write) -> fmt::Result {
    match op {
        Op::RegOf | Op::MemOf | Op::AddrOf | Op::Var => {
            f.write_str(match op {
                Op::RegOf => "r[",
                Op::MemOf => "m[",
                Op::AddrOf => "a[",
                _ => "v[",
            })?;
            // The brackets act as parentheses, so the child is top level
            // again; v[...] names print bare.
            if op == Op::Var {
                write_no_quotes(e1, f)?;
            } else {
                write_outer(e1, f)?;
            }
            f.write_char(']')
        }
        Op::Not | Op::LNot | Op::Neg => {
            f.write_str(match op {
                Op::Not => "~",
                Op::LNot => "L~",
                _ => "-",
            })?;
            write_rec(e1, f)
        }
        Op::SignExt => {
            write_rec(e1, f)?;
            f.write_char('!')
        }
        Op::Sqrt
        | Op::Sin
        | Op::Cos
        | Op::Tan
        | Op::ArcTan
        | Op::Log2
        | Op::Log10
        | Op::Loge
        | Op::MachFtr
        | Op::Successor
        | Op::Execute
        | Op::SqrtS
        | Op::SqrtD
        | Op::SqrtQ => {
            f.write_str(match op {
                Op::Sqrt => "sqrt(",
                Op::Sin => "sin(",
                Op::Cos => "cos(",
                Op::Tan => "tan(",
                Op::ArcTan => "arctan(",
                Op::Log2 => "log2(",
                Op::Log10 => "log10(",
                Op::Loge => "loge(",
                Op::MachFtr => "machine(",
                Op::Successor => "succ(",
                Op::Execute => "execute(",
                Op::SqrtS => "SQRTs(",
                Op::SqrtD => "SQRTd(",
                _ => "SQRTq(",
            })?;
            write_rec(e1, f)?;
            f.write_char(')')
        }
        // A more concise form than temp["foo"]: just foo.
        Op::Temp | Op::Local | Op::Param => write_no_quotes(e1, f),
        Op::Phi => {
            f.write_str("phi(")?;
            write_outer(e1, f)?;
            f.write_char(')')
        }
        other => panic!("print: invalid unary operator {}", other),
    }
}

fn write_binary(op: Op, e1: &Exp, e2: &Exp, f: &mut dyn fmt::Write) -> fmt::Result {
    match op {
        Op::Size => {
            // The size annotation prints after the expression: expr{size}.
            write_rec(e2, f)?;
            f.write_char('{')?;
            write_rec(e1, f)?;
            f.write_char('}')
        }
        Op::FlagCall => {
            // The flag function's name is enough.
            write_no_quotes(e1, f)?;
            f.write_str("( ")?;
            write_rec(e2, f)?;
            f.write_str(" )")
        }
        Op::ExpTable | Op::NameTable => {
            f.write_str(if op == Op::ExpTable {
                "exptable("
            } else {
                "nametable("
            })?;
            write_outer(e1, f)?;
            f.write_str(", ")?;
            write_outer(e2, f)?;
            f.write_char(')')
        }
        Op::List => {
            // "," has the lowest precedence, so no parens; a Nil tail is
            // suppressed.
            write_outer(e1, f)?;
            if !e2.is_nil() {
                f.write_str(", ")?;
            }
            write_outer(e2, f)
        }
        Op::Subscript => {
            write_rec(e1, f)?;
            f.write_char('.')?;
            write_outer(e2, f)
        }
        other => {
            let spelled = other
                .infix_str()
                .unwrap_or_else(|| panic!("print: invalid binary operator {}", other));
            write_rec(e1, f)?;
            f.write_str(spelled)?;
            write_rec(e2, f)
        }
    }
}

fn write_ternary(op: Op, e1: &Exp, e2: &Exp, e3: &Exp, f: &mut dyn fmt::Write) -> fmt::Result {
    match op {
        Op::Truncu
        | Op::Truncs
        | Op::Zfill
        | Op::SgnEx
        | Op::Fsize
        | Op::Itof
        | Op::Ftoi
        | Op::Fround
        | Op::OpTable => {
            f.write_str(match op {
                Op::Truncu => "truncu(",
                Op::Truncs => "truncs(",
                Op::Zfill => "zfill(",
                Op::SgnEx => "sgnex(",
                Op::Fsize => "fsize(",
                Op::Itof => "itof(",
                Op::Ftoi => "ftoi(",
                Op::Fround => "fround(",
                _ => "optable(",
            })?;
            write_outer(e1, f)?;
            f.write_char(',')?;
            write_outer(e2, f)?;
            f.write_char(',')?;
            write_outer(e3, f)?;
            f.write_char(')')
        }
        Op::Tern => {
            write_rec(e1, f)?;
            f.write_str(" ? ")?;
            write_rec(e2, f)?;
            f.write_str(" : ")?;
            write_outer(e3, f)
        }
        Op::At => {
            write_rec(e1, f)?;
            f.write_char('@')?;
            write_rec(e2, f)?;
            f.write_char(':')?;
            write_rec(e3, f)
        }
        other => panic!("print: invalid ternary operator {}", other),
    }
}
