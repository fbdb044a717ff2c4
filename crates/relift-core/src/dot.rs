//! DOT (Graphviz) rendering of expression trees.
//!
//! Nodes are keyed by their address, so two structurally equal subtrees
//! render as distinct records. Feed the output to `dot -Tpng` when a tree
//! needs eyeballing.

use std::fmt;

use crate::exp::{Const, Exp};

/// Escape special characters for DOT record labels.
pub fn escape_dot_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('<', "\\<")
        .replace('>', "\\>")
        .replace('{', "\\{")
        .replace('}', "\\}")
}

impl Exp {
    /// Writes a complete `digraph` for this tree.
    pub fn write_dot(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        out.write_str("digraph Exp {\n")?;
        self.append_dot(out)?;
        out.write_str("}\n")
    }

    /// Renders the tree to a DOT string.
    pub fn dot_string(&self) -> String {
        let mut s = String::new();
        self.write_dot(&mut s).expect("formatting a String cannot fail");
        s
    }

    fn node_id(&self) -> String {
        format!("e{:x}", self as *const Exp as usize)
    }

    fn append_dot(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        let id = self.node_id();
        match self {
            Exp::Const(c) => {
                let payload = match c {
                    Const::Int(k) => k.to_string(),
                    Const::Flt(d) => d.to_string(),
                    Const::Str(s) => format!("\\\"{}\\\"", escape_dot_string(s)),
                    Const::CodeAddr(a) => format!("0x{:x}", a),
                };
                writeln!(
                    out,
                    "  {} [shape=record,label=\"{{ {} | {} }}\"];",
                    id,
                    self.op().name(),
                    payload
                )
            }
            Exp::Terminal(op) => {
                writeln!(out, "  {} [shape=parallelogram,label=\"{}\"];", id, op.name())
            }
            Exp::Unary { op, e1 } => {
                writeln!(
                    out,
                    "  {} [shape=record,label=\"{{ {} | <p1> }}\"];",
                    id,
                    op.name()
                )?;
                e1.append_dot(out)?;
                writeln!(out, "  {}:p1 -> {};", id, e1.node_id())
            }
            Exp::Binary { op, e1, e2 } => {
                writeln!(
                    out,
                    "  {} [shape=record,label=\"{{ {} | {{ <p1> | <p2> }} }}\"];",
                    id,
                    op.name()
                )?;
                e1.append_dot(out)?;
                e2.append_dot(out)?;
                writeln!(out, "  {}:p1 -> {};", id, e1.node_id())?;
                writeln!(out, "  {}:p2 -> {};", id, e2.node_id())
            }
            Exp::Ternary { op, e1, e2, e3 } => {
                writeln!(
                    out,
                    "  {} [shape=record,label=\"{{ {} | {{ <p1> | <p2> | <p3> }} }}\"];",
                    id,
                    op.name()
                )?;
                e1.append_dot(out)?;
                e2.append_dot(out)?;
                e3.append_dot(out)?;
                writeln!(out, "  {}:p1 -> {};", id, e1.node_id())?;
                writeln!(out, "  {}:p2 -> {};", id, e2.node_id())?;
                writeln!(out, "  {}:p3 -> {};", id, e3.node_id())
            }
            Exp::Typed { ty, e1 } => {
                let mut tname = String::new();
                ty.write_to(&mut tname)?;
                writeln!(
                    out,
                    "  {} [shape=record,label=\"{{ TypedExp | {} | <p1> }}\"];",
                    id,
                    escape_dot_string(&tname)
                )?;
                e1.append_dot(out)?;
                writeln!(out, "  {}:p1 -> {};", id, e1.node_id())
            }
            Exp::Assign { size, lhs, rhs } => {
                writeln!(
                    out,
                    "  {} [shape=record,label=\"{{ AssignExp | {} | {{ <p1> | <p2> }} }}\"];",
                    id, size
                )?;
                lhs.append_dot(out)?;
                rhs.append_dot(out)?;
                writeln!(out, "  {}:p1 -> {};", id, lhs.node_id())?;
                writeln!(out, "  {}:p2 -> {};", id, rhs.node_id())
            }
            Exp::FlagDef { params, rtl } => {
                // The RTL renders as a row of slots, one per expression.
                let mut slots = String::from("RTL ");
                for i in 0..rtl.len() {
                    slots.push_str(&format!("| <r{}> ", i));
                }
                writeln!(
                    out,
                    "  {} [shape=record,label=\"{{ FlagDef | {{ {} }} | <p1> }}\"];",
                    id, slots
                )?;
                params.append_dot(out)?;
                writeln!(out, "  {}:p1 -> {};", id, params.node_id())
            }
        }
    }
}
