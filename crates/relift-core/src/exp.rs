//! The symbolic-expression tree.
//!
//! An [`Exp`] models a single-assignment computation over architectural
//! state: registers, memory cells, condition flags, temporaries and
//! constants. Nodes exclusively own their children; there is no sharing of
//! subtrees between independent roots and no cycles. `clone` is the only way
//! to obtain an independent copy, and the destructive `into_sub*` extractors
//! are the only way to move a child out of its parent.

use std::cmp::Ordering;

use crate::handles::{Rtl, Ty};
use crate::op::Op;

/// Payload of a constant leaf.
#[derive(Debug, Clone)]
pub enum Const {
    /// Integer constant. Stored wide; arithmetic folds in 32 bits.
    Int(i64),
    /// Floating-point constant.
    Flt(f64),
    /// String constant; equality compares bytes.
    Str(String),
    /// Address of a code location.
    CodeAddr(u64),
}

impl Const {
    /// The op tag corresponding to this payload kind.
    pub fn op(&self) -> Op {
        match self {
            Const::Int(_) => Op::IntConst,
            Const::Flt(_) => Op::FltConst,
            Const::Str(_) => Op::StrConst,
            Const::CodeAddr(_) => Op::CodeAddr,
        }
    }

    fn eq_payload(&self, other: &Const) -> bool {
        match (self, other) {
            (Const::Int(a), Const::Int(b)) => a == b,
            (Const::Flt(a), Const::Flt(b)) => a == b,
            (Const::Str(a), Const::Str(b)) => a.as_bytes() == b.as_bytes(),
            (Const::CodeAddr(a), Const::CodeAddr(b)) => a == b,
            _ => false,
        }
    }

    fn cmp_payload(&self, other: &Const) -> Ordering {
        match (self, other) {
            (Const::Int(a), Const::Int(b)) => a.cmp(b),
            (Const::Flt(a), Const::Flt(b)) => a.total_cmp(b),
            (Const::Str(a), Const::Str(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Const::CodeAddr(a), Const::CodeAddr(b)) => a.cmp(b),
            // Same op tag implies same payload kind.
            _ => unreachable!("Const payload kind mismatch under equal op"),
        }
    }
}

/// A node in the symbolic-expression tree.
#[derive(Debug)]
pub enum Exp {
    /// Constant leaf.
    Const(Const),
    /// 0-ary terminal: `%pc`, `%CF`, `WILD`, ...
    Terminal(Op),
    /// Unary operator over one child.
    Unary { op: Op, e1: Box<Exp> },
    /// Binary operator over two children.
    Binary { op: Op, e1: Box<Exp>, e2: Box<Exp> },
    /// Ternary operator over three children.
    Ternary {
        op: Op,
        e1: Box<Exp>,
        e2: Box<Exp>,
        e3: Box<Exp>,
    },
    /// Type-annotated wrapper; owns its type handle.
    Typed { ty: Box<dyn Ty>, e1: Box<Exp> },
    /// Assignment of `rhs` to `lhs` at a bit width.
    Assign {
        size: u32,
        lhs: Box<Exp>,
        rhs: Box<Exp>,
    },
    /// Binds a parameter list to a flag-computing RTL fragment.
    FlagDef { params: Box<Exp>, rtl: Box<dyn Rtl> },
}

impl Clone for Exp {
    fn clone(&self) -> Exp {
        match self {
            Exp::Const(c) => Exp::Const(c.clone()),
            Exp::Terminal(op) => Exp::Terminal(*op),
            Exp::Unary { op, e1 } => Exp::Unary {
                op: *op,
                e1: e1.clone(),
            },
            Exp::Binary { op, e1, e2 } => Exp::Binary {
                op: *op,
                e1: e1.clone(),
                e2: e2.clone(),
            },
            Exp::Ternary { op, e1, e2, e3 } => Exp::Ternary {
                op: *op,
                e1: e1.clone(),
                e2: e2.clone(),
                e3: e3.clone(),
            },
            Exp::Typed { ty, e1 } => Exp::Typed {
                ty: ty.clone_box(),
                e1: e1.clone(),
            },
            Exp::Assign { size, lhs, rhs } => Exp::Assign {
                size: *size,
                lhs: lhs.clone(),
                rhs: rhs.clone(),
            },
            Exp::FlagDef { params, rtl } => Exp::FlagDef {
                params: params.clone(),
                rtl: rtl.clone_box(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl Exp {
    /// Integer constant.
    pub fn int(value: i64) -> Exp {
        Exp::Const(Const::Int(value))
    }

    /// Floating-point constant.
    pub fn flt(value: f64) -> Exp {
        Exp::Const(Const::Flt(value))
    }

    /// String constant.
    pub fn str(value: impl Into<String>) -> Exp {
        Exp::Const(Const::Str(value.into()))
    }

    /// Code-address constant.
    pub fn code_addr(addr: u64) -> Exp {
        Exp::Const(Const::CodeAddr(addr))
    }

    /// A 0-ary terminal such as `%pc` or `WILD`.
    ///
    /// Panics if `op` is not a terminal kind.
    pub fn terminal(op: Op) -> Exp {
        assert!(op.is_terminal(), "terminal: {} is not a terminal op", op);
        Exp::Terminal(op)
    }

    /// A unary node. Panics if `op` is not unary.
    pub fn unary(op: Op, e1: Exp) -> Exp {
        assert!(
            op.arity() == 1 && op != Op::TypedExp && op != Op::FlagDef,
            "unary: {} is not a plain unary op",
            op
        );
        Exp::Unary {
            op,
            e1: Box::new(e1),
        }
    }

    /// A binary node. Panics if `op` is not binary.
    pub fn binary(op: Op, e1: Exp, e2: Exp) -> Exp {
        assert!(
            op.arity() == 2 && op != Op::AssignExp,
            "binary: {} is not a plain binary op",
            op
        );
        Exp::Binary {
            op,
            e1: Box::new(e1),
            e2: Box::new(e2),
        }
    }

    /// A ternary node. Panics if `op` is not ternary.
    pub fn ternary(op: Op, e1: Exp, e2: Exp, e3: Exp) -> Exp {
        assert!(op.arity() == 3, "ternary: {} is not a ternary op", op);
        Exp::Ternary {
            op,
            e1: Box::new(e1),
            e2: Box::new(e2),
            e3: Box::new(e3),
        }
    }

    /// A type-annotated wrapper owning `ty`.
    pub fn typed(ty: Box<dyn Ty>, e1: Exp) -> Exp {
        Exp::Typed {
            ty,
            e1: Box::new(e1),
        }
    }

    /// An assignment with an explicit bit width.
    pub fn assign_sized(size: u32, lhs: Exp, rhs: Exp) -> Exp {
        Exp::Assign {
            size,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// An assignment with the default width of 32 bits; a `Typed` LHS
    /// overrides the default with its type's bit size.
    pub fn assign(lhs: Exp, rhs: Exp) -> Exp {
        let size = match &lhs {
            Exp::Typed { ty, .. } => ty.size_bits(),
            _ => 32,
        };
        Exp::assign_sized(size, lhs, rhs)
    }

    /// A flag-definition binding `params` to `rtl`.
    pub fn flag_def(params: Exp, rtl: Box<dyn Rtl>) -> Exp {
        Exp::FlagDef {
            params: Box::new(params),
            rtl,
        }
    }

    /// Shorthand for `r[k]`.
    pub fn reg(k: i64) -> Exp {
        Exp::unary(Op::RegOf, Exp::int(k))
    }
}

// ---------------------------------------------------------------------------
// Accessors
// ---------------------------------------------------------------------------

impl Exp {
    /// The op tag of this node.
    pub fn op(&self) -> Op {
        match self {
            Exp::Const(c) => c.op(),
            Exp::Terminal(op) => *op,
            Exp::Unary { op, .. } => *op,
            Exp::Binary { op, .. } => *op,
            Exp::Ternary { op, .. } => *op,
            Exp::Typed { .. } => Op::TypedExp,
            Exp::Assign { .. } => Op::AssignExp,
            Exp::FlagDef { .. } => Op::FlagDef,
        }
    }

    /// First sub-expression. Panics on leaves.
    pub fn sub1(&self) -> &Exp {
        match self {
            Exp::Unary { e1, .. }
            | Exp::Binary { e1, .. }
            | Exp::Ternary { e1, .. }
            | Exp::Typed { e1, .. } => e1,
            Exp::Assign { lhs, .. } => lhs,
            Exp::FlagDef { params, .. } => params,
            other => panic!("sub1: {} has no sub-expressions", other.op()),
        }
    }

    /// Second sub-expression. Panics unless binary, ternary or assignment.
    pub fn sub2(&self) -> &Exp {
        match self {
            Exp::Binary { e2, .. } | Exp::Ternary { e2, .. } => e2,
            Exp::Assign { rhs, .. } => rhs,
            other => panic!("sub2: {} has fewer than two sub-expressions", other.op()),
        }
    }

    /// Third sub-expression. Panics unless ternary.
    pub fn sub3(&self) -> &Exp {
        match self {
            Exp::Ternary { e3, .. } => e3,
            other => panic!("sub3: {} has fewer than three sub-expressions", other.op()),
        }
    }

    /// Integer payload. Panics unless this is an integer constant.
    pub fn int_value(&self) -> i64 {
        match self {
            Exp::Const(Const::Int(k)) => *k,
            other => panic!("int_value: {} is not an integer constant", other.op()),
        }
    }

    /// Becomes the first sub-expression: consumes the node, moves the child
    /// out, and drops the rest. Lets `0 + B` collapse to `B` without copying.
    pub fn into_sub1(self) -> Exp {
        match self {
            Exp::Unary { e1, .. } | Exp::Typed { e1, .. } => *e1,
            Exp::Binary { e1, .. } | Exp::Ternary { e1, .. } => *e1,
            Exp::Assign { lhs, .. } => *lhs,
            Exp::FlagDef { params, .. } => *params,
            other => panic!("into_sub1: {} has no sub-expressions", other.op()),
        }
    }

    /// Becomes the second sub-expression. Panics unless binary, ternary or
    /// assignment.
    pub fn into_sub2(self) -> Exp {
        match self {
            Exp::Binary { e2, .. } | Exp::Ternary { e2, .. } => *e2,
            Exp::Assign { rhs, .. } => *rhs,
            other => panic!("into_sub2: {} has fewer than two sub-expressions", other.op()),
        }
    }

    /// Becomes the third sub-expression. Panics unless ternary.
    pub fn into_sub3(self) -> Exp {
        match self {
            Exp::Ternary { e3, .. } => *e3,
            other => panic!("into_sub3: {} has fewer than three sub-expressions", other.op()),
        }
    }

    /// Swaps the two children of a binary node. Panics otherwise.
    pub fn commute(&mut self) {
        match self {
            Exp::Binary { e1, e2, .. } => std::mem::swap(e1, e2),
            other => panic!("commute: {} is not binary", other.op()),
        }
    }

    /// Bit width of an assignment. Panics unless this is an assignment.
    pub fn size(&self) -> u32 {
        match self {
            Exp::Assign { size, .. } => *size,
            other => panic!("size: {} is not an assignment", other.op()),
        }
    }

    /// Sets the bit width of an assignment. Panics unless an assignment.
    pub fn set_size(&mut self, bits: u32) {
        match self {
            Exp::Assign { size, .. } => *size = bits,
            other => panic!("set_size: {} is not an assignment", other.op()),
        }
    }
}

// ---------------------------------------------------------------------------
// Pattern predicates
// ---------------------------------------------------------------------------

impl Exp {
    /// True if this is an assignment.
    pub fn is_assign(&self) -> bool {
        matches!(self, Exp::Assign { .. })
    }

    /// True if this is `m[x]`.
    pub fn is_mem_of(&self) -> bool {
        self.op() == Op::MemOf
    }

    /// True if this is `r[x]`.
    pub fn is_reg_of(&self) -> bool {
        self.op() == Op::RegOf
    }

    /// True if this is `a[x]`.
    pub fn is_addr_of(&self) -> bool {
        self.op() == Op::AddrOf
    }

    /// True if this is `r[k]` for some integer constant `k`.
    pub fn is_reg_of_k(&self) -> bool {
        match self {
            Exp::Unary { op: Op::RegOf, e1 } => e1.op() == Op::IntConst,
            _ => false,
        }
    }

    /// True if this is `r[n]` for the given `n`.
    pub fn is_reg_n(&self, n: i64) -> bool {
        match self {
            Exp::Unary { op: Op::RegOf, e1 } => {
                matches!(&**e1, Exp::Const(Const::Int(k)) if *k == n)
            }
            _ => false,
        }
    }

    /// True if this is the `Nil` terminal.
    pub fn is_nil(&self) -> bool {
        self.op() == Op::Nil
    }

    /// True if this is the wildcard terminal.
    pub fn is_wild(&self) -> bool {
        self.op() == Op::Wild
    }

    /// True if this is an integer constant.
    pub fn is_int_const(&self) -> bool {
        self.op() == Op::IntConst
    }

    /// Recognizes frame-pointer terms: `%afp`, `%afp ± k`, and `a[m[...]]`
    /// of either, looking through a `Typed` wrapper.
    pub fn is_afp_term(&self) -> bool {
        let mut cur = self;
        if let Exp::Typed { e1, .. } = cur {
            cur = e1.as_ref();
        }
        if let Exp::Unary {
            op: Op::AddrOf,
            e1,
        } = cur
        {
            if let Exp::Unary { op: Op::MemOf, e1 } = e1.as_ref() {
                cur = e1.as_ref();
            }
        }
        match cur {
            Exp::Terminal(Op::Afp) => true,
            Exp::Binary { op, e1, e2 } if *op == Op::Plus || *op == Op::Minus => {
                e1.op() == Op::Afp && e2.op() == Op::IntConst
            }
            _ => false,
        }
    }

    /// Index of a `v[k]` variable. Panics unless this is `v[k]`.
    pub fn var_index(&self) -> i64 {
        match self {
            Exp::Unary { op: Op::Var, e1 } => e1.int_value(),
            other => panic!("var_index: {} is not a var selector", other.op()),
        }
    }
}

// ---------------------------------------------------------------------------
// Equality and order
// ---------------------------------------------------------------------------

impl Exp {
    /// Structural equality with wildcard semantics: a `Wild` at the root of
    /// either side matches anything at that position. Type-sensitive for
    /// `Typed`, size-sensitive for `Assign`; the RTL of a `FlagDef` is not
    /// compared.
    pub fn equals(&self, other: &Exp) -> bool {
        if self.op() == Op::Wild || other.op() == Op::Wild {
            return true;
        }
        if self.op() != other.op() {
            return false;
        }
        match (self, other) {
            (Exp::Const(a), Exp::Const(b)) => a.eq_payload(b),
            (Exp::Terminal(_), Exp::Terminal(_)) => true,
            (Exp::Unary { e1: a, .. }, Exp::Unary { e1: b, .. }) => a.equals(b),
            (Exp::Binary { e1: a1, e2: a2, .. }, Exp::Binary { e1: b1, e2: b2, .. }) => {
                a1.equals(b1) && a2.equals(b2)
            }
            (
                Exp::Ternary {
                    e1: a1,
                    e2: a2,
                    e3: a3,
                    ..
                },
                Exp::Ternary {
                    e1: b1,
                    e2: b2,
                    e3: b3,
                    ..
                },
            ) => a1.equals(b1) && a2.equals(b2) && a3.equals(b3),
            (Exp::Typed { ty: ta, e1: a }, Exp::Typed { ty: tb, e1: b }) => {
                ta.eq_ty(tb.as_ref()) && a.equals(b)
            }
            (
                Exp::Assign {
                    size: sa,
                    lhs: la,
                    rhs: ra,
                },
                Exp::Assign {
                    size: sb,
                    lhs: lb,
                    rhs: rb,
                },
            ) => sa == sb && la.equals(lb) && ra.equals(rb),
            (Exp::FlagDef { params: a, .. }, Exp::FlagDef { params: b, .. }) => a.equals(b),
            _ => unreachable!("equal op tags with mismatched variants"),
        }
    }

    /// Like [`Exp::equals`], but a `Typed` wrapper on either side is
    /// unwrapped once before comparing.
    pub fn equals_ignoring_type(&self, other: &Exp) -> bool {
        let a = match self {
            Exp::Typed { e1, .. } => e1,
            other => other,
        };
        let b = match other {
            Exp::Typed { e1, .. } => e1,
            other => other,
        };
        a.equals(b)
    }

    /// Total order: by op tag, then payload, then lexicographically on
    /// children. `Typed` orders by its type handle before its child;
    /// `Assign` orders by size before its children. `Wild` participates
    /// only as its op tag, not as a match-anything value.
    pub fn total_cmp(&self, other: &Exp) -> Ordering {
        self.cmp_impl(other, true)
    }

    /// Type-insensitive variant of [`Exp::total_cmp`]: `Typed` nodes
    /// compare op tag and child but skip the type handles.
    pub fn cmp_ignoring_type(&self, other: &Exp) -> Ordering {
        self.cmp_impl(other, false)
    }

    /// `self < other` under [`Exp::total_cmp`].
    pub fn less(&self, other: &Exp) -> bool {
        self.total_cmp(other) == Ordering::Less
    }

    /// `self < other` under [`Exp::cmp_ignoring_type`].
    pub fn less_ignoring_type(&self, other: &Exp) -> bool {
        self.cmp_ignoring_type(other) == Ordering::Less
    }

    fn cmp_impl(&self, other: &Exp, with_types: bool) -> Ordering {
        match self.op().cmp(&other.op()) {
            Ordering::Equal => {}
            ord => return ord,
        }
        match (self, other) {
            (Exp::Const(a), Exp::Const(b)) => a.cmp_payload(b),
            (Exp::Terminal(_), Exp::Terminal(_)) => Ordering::Equal,
            (Exp::Unary { e1: a, .. }, Exp::Unary { e1: b, .. }) => a.cmp_impl(b, with_types),
            (Exp::Binary { e1: a1, e2: a2, .. }, Exp::Binary { e1: b1, e2: b2, .. }) => a1
                .cmp_impl(b1, with_types)
                .then_with(|| a2.cmp_impl(b2, with_types)),
            (
                Exp::Ternary {
                    e1: a1,
                    e2: a2,
                    e3: a3,
                    ..
                },
                Exp::Ternary {
                    e1: b1,
                    e2: b2,
                    e3: b3,
                    ..
                },
            ) => a1
                .cmp_impl(b1, with_types)
                .then_with(|| a2.cmp_impl(b2, with_types))
                .then_with(|| a3.cmp_impl(b3, with_types)),
            (Exp::Typed { ty: ta, e1: a }, Exp::Typed { ty: tb, e1: b }) => {
                let by_ty = if with_types {
                    ta.cmp_ty(tb.as_ref())
                } else {
                    Ordering::Equal
                };
                by_ty.then_with(|| a.cmp_impl(b, with_types))
            }
            (
                Exp::Assign {
                    size: sa,
                    lhs: la,
                    rhs: ra,
                },
                Exp::Assign {
                    size: sb,
                    lhs: lb,
                    rhs: rb,
                },
            ) => sa
                .cmp(sb)
                .then_with(|| la.cmp_impl(lb, with_types))
                .then_with(|| ra.cmp_impl(rb, with_types)),
            (Exp::FlagDef { params: a, .. }, Exp::FlagDef { params: b, .. }) => {
                a.cmp_impl(b, with_types)
            }
            _ => unreachable!("equal op tags with mismatched variants"),
        }
    }
}

/// Wildcard-aware structural equality; see [`Exp::equals`].
///
/// Note that a `Wild` on either side compares equal to anything, so the
/// usual equivalence laws hold only for wildcard-free trees.
impl PartialEq for Exp {
    fn eq(&self, other: &Exp) -> bool {
        self.equals(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::WordTy;

    fn plus(a: Exp, b: Exp) -> Exp {
        Exp::binary(Op::Plus, a, b)
    }

    #[test]
    fn test_clone_is_deep_and_equal() {
        let e = plus(Exp::reg(8), Exp::int(100));
        let c = e.clone();
        assert!(c.equals(&e));
        drop(c);
        assert_eq!(e.op(), Op::Plus);
    }

    #[test]
    fn test_wildcard_matches_either_side() {
        let w = Exp::terminal(Op::Wild);
        let e = plus(Exp::reg(1), Exp::int(2));
        assert!(w.equals(&e));
        assert!(e.equals(&w));
        // Position-local: a wildcard child matches any child.
        let pat = Exp::unary(Op::RegOf, Exp::terminal(Op::Wild));
        assert!(pat.equals(&Exp::reg(7)));
        assert!(!pat.equals(&Exp::unary(Op::MemOf, Exp::int(7))));
    }

    #[test]
    fn test_assign_equality_is_size_sensitive() {
        let a = Exp::assign_sized(32, Exp::reg(1), Exp::int(0));
        let b = Exp::assign_sized(16, Exp::reg(1), Exp::int(0));
        assert!(!a.equals(&b));
        assert!(a.equals(&a.clone()));
    }

    #[test]
    fn test_typed_equality_and_ignoring_type() {
        let t32 = Exp::typed(Box::new(WordTy::new(32)), Exp::reg(3));
        let t16 = Exp::typed(Box::new(WordTy::new(16)), Exp::reg(3));
        assert!(!t32.equals(&t16));
        assert!(t32.equals_ignoring_type(&t16));
        assert!(Exp::reg(3).equals_ignoring_type(&t16));
    }

    #[test]
    fn test_assign_size_from_typed_lhs() {
        let lhs = Exp::typed(Box::new(WordTy::new(16)), Exp::reg(2));
        let a = Exp::assign(lhs, Exp::int(1));
        assert_eq!(a.size(), 16);
        let b = Exp::assign(Exp::reg(2), Exp::int(1));
        assert_eq!(b.size(), 32);
    }

    #[test]
    fn test_order_is_consistent() {
        let a = Exp::int(1);
        let b = Exp::int(2);
        assert!(a.less(&b));
        assert!(!b.less(&a));
        assert_eq!(a.total_cmp(&a.clone()), Ordering::Equal);
        // Ternary order consults the middle child.
        let t1 = Exp::ternary(Op::Tern, Exp::int(0), Exp::int(1), Exp::int(5));
        let t2 = Exp::ternary(Op::Tern, Exp::int(0), Exp::int(2), Exp::int(4));
        assert!(t1.less(&t2));
    }

    #[test]
    fn test_into_sub_moves_child_out() {
        let e = plus(Exp::reg(9), Exp::int(0));
        let child = e.into_sub1();
        assert!(child.equals(&Exp::reg(9)));
    }

    #[test]
    #[should_panic(expected = "sub3")]
    fn test_wrong_arity_access_panics() {
        let e = Exp::unary(Op::Neg, Exp::int(1));
        let _ = e.sub3();
    }

    #[test]
    fn test_afp_term_recognizer() {
        assert!(Exp::terminal(Op::Afp).is_afp_term());
        assert!(plus(Exp::terminal(Op::Afp), Exp::int(8)).is_afp_term());
        let wrapped = Exp::unary(
            Op::AddrOf,
            Exp::unary(Op::MemOf, plus(Exp::terminal(Op::Afp), Exp::int(4))),
        );
        assert!(wrapped.is_afp_term());
        assert!(!Exp::reg(1).is_afp_term());
    }

    #[test]
    fn test_reg_predicates() {
        assert!(Exp::reg(7).is_reg_of_k());
        assert!(Exp::reg(7).is_reg_n(7));
        assert!(!Exp::reg(7).is_reg_n(8));
        assert!(!Exp::unary(Op::RegOf, Exp::terminal(Op::Wild)).is_reg_of_k());
    }

    #[test]
    fn test_var_index() {
        let v = Exp::unary(Op::Var, Exp::int(2));
        assert_eq!(v.var_index(), 2);
    }
}
