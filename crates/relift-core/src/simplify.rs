//! The algebraic simplifier.
//!
//! Two composed layers: an arithmetic normalizer that partitions `+`/`-`
//! chains into positive terms, negative terms and a folded integer sum, and
//! a polymorphic peephole pass applied to fixpoint by [`Exp::simplify`].
//! Rewrites consume their input: a node that collapses to one of its
//! children moves the child out instead of copying it.
//!
//! Integer folding is two's-complement 32-bit with wrap-around; signed
//! comparisons see sign-extended 32-bit values.

use std::mem;

use crate::exp::{Const, Exp};
use crate::op::Op;

fn is_int(e: &Exp, k: i64) -> bool {
    matches!(e, Exp::Const(Const::Int(v)) if *v == k)
}

/// Rebuilds a binary node under a different op, keeping its children.
fn retag_binary(op: Op, e: Exp) -> Exp {
    match e {
        Exp::Binary { e1, e2, .. } => Exp::Binary { op, e1, e2 },
        other => panic!("retag_binary: {} is not binary", other.op()),
    }
}

// ---------------------------------------------------------------------------
// Arithmetic normalization
// ---------------------------------------------------------------------------

impl Exp {
    /// Partitions a `+`/`-` expression into positive non-integer terms,
    /// negative non-integer terms, and the integer terms. Given
    /// `%sp + 108 + n - %sp - 92` the partition is positives `{%sp, n}`,
    /// negatives `{%sp}`, integers `{108, -92}`. Descends transparently
    /// through `Typed` wrappers and through both sides of an assignment.
    pub fn partition_terms(self) -> (Vec<Exp>, Vec<Exp>, Vec<i64>) {
        let mut positives = Vec::new();
        let mut negatives = Vec::new();
        let mut integers = Vec::new();
        partition_into(self, &mut positives, &mut negatives, &mut integers, false);
        (positives, negatives, integers)
    }

    /// Normalizes `+`/`-` at the top level: cancels structurally equal
    /// terms of opposite sign, folds the integer terms to one scalar, and
    /// rebuilds. `(%sp + 100) - (%sp + 92)` becomes `8`. Descends into
    /// `r[·]`/`m[·]` operands and both sides of an assignment; other
    /// shapes are left unchanged.
    pub fn simplify_arith(self) -> Exp {
        match self {
            Exp::Unary { op, e1 } if op == Op::MemOf || op == Op::RegOf => Exp::Unary {
                op,
                e1: Box::new(e1.simplify_arith()),
            },
            Exp::Assign { size, lhs, rhs } => Exp::Assign {
                size,
                lhs: Box::new(lhs.simplify_arith()),
                rhs: Box::new(rhs.simplify_arith()),
            },
            Exp::Binary { op, e1, e2 } if op == Op::Plus || op == Op::Minus => {
                rebuild_partition(Exp::Binary { op, e1, e2 })
            }
            other => other,
        }
    }
}

fn partition_into(
    e: Exp,
    positives: &mut Vec<Exp>,
    negatives: &mut Vec<Exp>,
    integers: &mut Vec<i64>,
    negate: bool,
) {
    match e {
        Exp::Binary { op: Op::Plus, e1, e2 } => {
            partition_into(*e1, positives, negatives, integers, negate);
            partition_into(*e2, positives, negatives, integers, negate);
        }
        Exp::Binary {
            op: Op::Minus,
            e1,
            e2,
        } => {
            partition_into(*e1, positives, negatives, integers, negate);
            partition_into(*e2, positives, negatives, integers, !negate);
        }
        Exp::Typed { e1, .. } => {
            partition_into(*e1, positives, negatives, integers, negate);
        }
        Exp::Assign { lhs, rhs, .. } => {
            partition_into(*lhs, positives, negatives, integers, negate);
            partition_into(*rhs, positives, negatives, integers, negate);
        }
        Exp::Const(Const::Int(k)) => {
            integers.push(if negate { -k } else { k });
        }
        other => {
            if negate {
                negatives.push(other);
            } else {
                positives.push(other);
            }
        }
    }
}

fn rebuild_partition(e: Exp) -> Exp {
    let (mut positives, mut negatives, integers) = e.partition_terms();

    // Cancel pairs of structurally equal terms with opposite sign.
    // First match wins; surviving terms keep their input order.
    let mut i = 0;
    while i < positives.len() {
        match negatives.iter().position(|n| n.equals(&positives[i])) {
            Some(j) => {
                positives.remove(i);
                negatives.remove(j);
            }
            None => i += 1,
        }
    }

    let sum: i64 = integers.iter().sum();

    match (positives.is_empty(), negatives.is_empty()) {
        (true, true) => Exp::int(sum),
        (true, false) => Exp::binary(Op::Minus, Exp::int(sum), accumulate(negatives)),
        (false, true) => {
            if sum == 0 {
                accumulate(positives)
            } else {
                Exp::binary(Op::Plus, accumulate(positives), Exp::int(sum))
            }
        }
        (false, false) => {
            let diff = Exp::binary(Op::Minus, accumulate(positives), accumulate(negatives));
            if sum == 0 {
                diff
            } else {
                Exp::binary(Op::Plus, diff, Exp::int(sum))
            }
        }
    }
}

/// Sums a list of terms into one right-associated `+` chain.
fn accumulate(terms: Vec<Exp>) -> Exp {
    let mut it = terms.into_iter().rev();
    let mut acc = match it.next() {
        Some(last) => last,
        None => return Exp::int(0),
    };
    for term in it {
        acc = Exp::binary(Op::Plus, term, acc);
    }
    acc
}

// ---------------------------------------------------------------------------
// Polymorphic peephole
// ---------------------------------------------------------------------------

impl Exp {
    /// Runs the peephole pass to fixpoint.
    pub fn simplify(self) -> Exp {
        let mut res = self;
        loop {
            let (next, changed) = res.poly_simplify();
            res = next;
            if !changed {
                return res;
            }
        }
    }

    /// One bottom-up peephole pass. Returns the rewritten expression and
    /// whether anything changed; [`Exp::simplify`] drives this to fixpoint.
    pub fn poly_simplify(self) -> (Exp, bool) {
        let mut changed = false;
        let out = poly(self, &mut changed);
        (out, changed)
    }
}

fn poly(e: Exp, ch: &mut bool) -> Exp {
    match e {
        Exp::Const(_) | Exp::Terminal(_) => e,
        Exp::Unary { op, e1 } => {
            let e1 = poly(*e1, ch);
            poly_unary(op, e1, ch)
        }
        Exp::Binary { op, e1, e2 } => {
            let e1 = poly(*e1, ch);
            let e2 = poly(*e2, ch);
            poly_binary(op, e1, e2, ch)
        }
        Exp::Ternary { op, e1, e2, e3 } => {
            let e1 = poly(*e1, ch);
            let e2 = poly(*e2, ch);
            let e3 = poly(*e3, ch);
            poly_ternary(op, e1, e2, e3, ch)
        }
        Exp::Typed { ty, e1 } => {
            assert!(
                !e1.is_assign(),
                "poly_simplify: {} must not wrap {}",
                Op::TypedExp,
                Op::AssignExp
            );
            Exp::Typed {
                ty,
                e1: Box::new(poly(*e1, ch)),
            }
        }
        Exp::Assign { size, lhs, rhs } => Exp::Assign {
            size,
            lhs: Box::new(poly(*lhs, ch)),
            rhs: Box::new(poly(*rhs, ch)),
        },
        Exp::FlagDef { params, rtl } => Exp::FlagDef {
            params: Box::new(poly(*params, ch)),
            rtl,
        },
    }
}

fn poly_unary(op: Op, e1: Exp, ch: &mut bool) -> Exp {
    match op {
        Op::Neg | Op::Not | Op::LNot => {
            if let Exp::Const(Const::Int(k)) = &e1 {
                let k = *k as i32;
                *ch = true;
                let folded = match op {
                    Op::Neg => k.wrapping_neg(),
                    Op::Not => !k,
                    _ => (k == 0) as i32,
                };
                return Exp::int(folded as i64);
            }
            if (op == Op::Not || op == Op::LNot) && e1.op() == Op::Equals {
                *ch = true;
                return retag_binary(Op::NotEqual, e1);
            }
            if e1.op() == op {
                // op(op(x)) cancels for an involution.
                *ch = true;
                return e1.into_sub1();
            }
            Exp::Unary {
                op,
                e1: Box::new(e1),
            }
        }
        Op::AddrOf => {
            if e1.op() == Op::MemOf {
                *ch = true;
                return e1.into_sub1();
            }
            Exp::Unary {
                op,
                e1: Box::new(e1),
            }
        }
        Op::MemOf | Op::RegOf => {
            // Selector operands get arithmetic normalization too. Any
            // change must be reported, or the fixpoint driver could stop
            // before rules enabled by the normalized shape have run.
            let normalized = e1.clone().simplify_arith();
            if !normalized.equals(&e1) {
                *ch = true;
            }
            Exp::Unary {
                op,
                e1: Box::new(normalized),
            }
        }
        _ => Exp::Unary {
            op,
            e1: Box::new(e1),
        },
    }
}

fn poly_binary(mut op: Op, mut e1: Exp, mut e2: Exp, ch: &mut bool) -> Exp {
    // Both children integer constants: fold under 32-bit wrap-around.
    if let (Exp::Const(Const::Int(k1)), Exp::Const(Const::Int(k2))) = (&e1, &e2) {
        if let Some(folded) = fold_const(op, *k1 as i32, *k2 as i32) {
            *ch = true;
            return Exp::int(folded as i64);
        }
    }

    // x ^ x and x - x are zero.
    if (op == Op::BitXor || op == Op::Minus) && e1.equals(&e2) {
        *ch = true;
        return Exp::int(0);
    }

    // x - k becomes x + (-k).
    if op == Op::Minus {
        if let Exp::Const(Const::Int(k)) = &e2 {
            let k = *k as i32;
            *ch = true;
            op = Op::Plus;
            e2 = Exp::int(k.wrapping_neg() as i64);
        }
    }

    // a - b becomes a + (-b) so later rules only see sums. Not a change by
    // itself; the fresh negation is normalized in place.
    if op == Op::Minus {
        op = Op::Plus;
        e2 = poly_unary(Op::Neg, e2, ch);
    }

    // Commute an integer constant to the right of + and *. Not a change.
    if e1.is_int_const() && (op == Op::Plus || op == Op::Mult) {
        mem::swap(&mut e1, &mut e2);
    }

    // Identity elements: x + 0, x - 0, x | 0, x or 0.
    if matches!(op, Op::Plus | Op::Minus | Op::BitOr | Op::Or) && is_int(&e2, 0) {
        *ch = true;
        return e1;
    }

    // Absorbing elements: x * 0, x *! 0, x & 0, x and 0.
    if matches!(op, Op::Mult | Op::Mults | Op::BitAnd | Op::And) && is_int(&e2, 0) {
        *ch = true;
        return Exp::int(0);
    }

    // x * 1 and x *! 1.
    if matches!(op, Op::Mult | Op::Mults) && is_int(&e2, 1) {
        *ch = true;
        return e1;
    }

    // x & -1.
    if op == Op::BitAnd && is_int(&e2, -1) {
        *ch = true;
        return e1;
    }

    // x and k for non-zero k.
    if op == Op::And && matches!(&e2, Exp::Const(Const::Int(k)) if *k != 0) {
        *ch = true;
        return e1;
    }

    // x << k becomes x * 2^k for in-range k.
    if op == Op::ShiftL {
        if let Exp::Const(Const::Int(k)) = &e2 {
            if (0..32).contains(k) {
                *ch = true;
                return Exp::binary(Op::Mult, e1, Exp::int(1i64 << k));
            }
        }
    }

    // -x cmp y becomes x cmp -y. Not a change by itself.
    if op.is_comparison() && e1.op() == Op::Neg {
        e1 = e1.into_sub1();
        e2 = poly_unary(Op::Neg, e2, ch);
    }

    // (a + b) cmp 0 becomes a cmp -b.
    if op.is_comparison() && is_int(&e2, 0) && e1.op() == Op::Plus {
        *ch = true;
        let (a, b) = match e1 {
            Exp::Binary { e1, e2, .. } => (*e1, *e2),
            _ => unreachable!(),
        };
        return Exp::binary(op, a, Exp::unary(Op::Neg, b));
    }

    // Collapse an equality tested against 1 or 0.
    if op == Op::Equals && is_int(&e2, 1) && e1.op() == Op::Equals {
        *ch = true;
        return e1;
    }
    if op == Op::Equals && is_int(&e2, 0) && e1.op() == Op::Equals {
        *ch = true;
        return retag_binary(Op::NotEqual, e1);
    }
    if op == Op::NotEqual && is_int(&e2, 1) && e1.op() == Op::Equals {
        *ch = true;
        return retag_binary(Op::NotEqual, e1);
    }
    if op == Op::NotEqual && is_int(&e2, 0) && e1.op() == Op::Equals {
        *ch = true;
        return e1;
    }

    // x + (-n) == 0 becomes x == n for negative n.
    if op == Op::Equals && is_int(&e2, 0) && e1.op() == Op::Plus {
        if let Exp::Binary { e1: a, e2: b, .. } = &e1 {
            if let Exp::Const(Const::Int(n)) = b.as_ref() {
                if *n < 0 {
                    *ch = true;
                    let flipped = Exp::int(n.wrapping_neg());
                    return Exp::binary(Op::Equals, a.as_ref().clone(), flipped);
                }
            }
        }
    }

    // (x > y) == 0 and (x >u y) == 0 flip to <= forms.
    if op == Op::Equals && is_int(&e2, 0) && e1.op() == Op::Gtr {
        *ch = true;
        return retag_binary(Op::LessEq, e1);
    }
    if op == Op::Equals && is_int(&e2, 0) && e1.op() == Op::GtrUns {
        *ch = true;
        return retag_binary(Op::LessEqUns, e1);
    }

    // (x <= y) or (x == y) collapses to x <= y, for any of the four
    // ordered-or-equal forms, matching the operand pair in either order.
    if op == Op::Or
        && e2.op() == Op::Equals
        && matches!(e1.op(), Op::GtrEq | Op::LessEq | Op::GtrEqUns | Op::LessEqUns)
    {
        let (a1, a2) = (e1.sub1(), e1.sub2());
        let (b1, b2) = (e2.sub1(), e2.sub2());
        if (a1.equals(b1) && a2.equals(b2)) || (a1.equals(b2) && a2.equals(b1)) {
            *ch = true;
            return e1;
        }
    }

    // Logical connectives only recurse; children are already normalized.
    if op == Op::Or || op == Op::And {
        return Exp::Binary {
            op,
            e1: Box::new(e1),
            e2: Box::new(e2),
        };
    }

    // x & x.
    if op == Op::BitAnd && e1.equals(&e2) {
        *ch = true;
        return e1;
    }

    // a + a*n becomes a*(n+1).
    if op == Op::Plus
        && e2.op() == Op::Mult
        && e2.sub2().op() == Op::IntConst
        && e1.equals(e2.sub1())
    {
        *ch = true;
        let n = e2.sub2().int_value() as i32;
        let a = e2.into_sub1();
        return Exp::binary(Op::Mult, a, Exp::int(n.wrapping_add(1) as i64));
    }

    // (a*n)*m becomes a*(n*m).
    if op == Op::Mult && e1.op() == Op::Mult && e2.op() == Op::IntConst {
        if e1.sub2().op() == Op::IntConst {
            *ch = true;
            let m = e2.int_value() as i32;
            let n = e1.sub2().int_value() as i32;
            let a = e1.into_sub1();
            return Exp::binary(Op::Mult, a, Exp::int(n.wrapping_mul(m) as i64));
        }
    }

    Exp::Binary {
        op,
        e1: Box::new(e1),
        e2: Box::new(e2),
    }
}

/// Constant folding table. 32-bit two's-complement with wrap-around;
/// division and remainder by zero do not fold.
fn fold_const(op: Op, a: i32, b: i32) -> Option<i32> {
    Some(match op {
        Op::Plus => a.wrapping_add(b),
        Op::Minus => a.wrapping_sub(b),
        Op::Mult => (a as u32).wrapping_mul(b as u32) as i32,
        Op::Mults => a.wrapping_mul(b),
        Op::Div if b != 0 => ((a as u32) / (b as u32)) as i32,
        Op::Divs if b != 0 => a.wrapping_div(b),
        Op::Mod if b != 0 => ((a as u32) % (b as u32)) as i32,
        Op::Mods if b != 0 => a.wrapping_rem(b),
        Op::ShiftL => a.wrapping_shl(b as u32),
        Op::ShiftR => (a as u32).wrapping_shr(b as u32) as i32,
        // Arithmetic right shift: sign extends, identity at zero.
        Op::ShiftRA => a.wrapping_shr(b as u32),
        Op::BitOr => a | b,
        Op::BitAnd => a & b,
        Op::BitXor => a ^ b,
        Op::And => ((a != 0) && (b != 0)) as i32,
        Op::Or => ((a != 0) || (b != 0)) as i32,
        Op::Equals => (a == b) as i32,
        Op::NotEqual => (a != b) as i32,
        Op::Less => (a < b) as i32,
        Op::Gtr => (a > b) as i32,
        Op::LessEq => (a <= b) as i32,
        Op::GtrEq => (a >= b) as i32,
        Op::LessUns => ((a as u32) < (b as u32)) as i32,
        Op::GtrUns => ((a as u32) > (b as u32)) as i32,
        Op::LessEqUns => ((a as u32) <= (b as u32)) as i32,
        Op::GtrEqUns => ((a as u32) >= (b as u32)) as i32,
        _ => return None,
    })
}

fn poly_ternary(op: Op, e1: Exp, e2: Exp, e3: Exp, ch: &mut bool) -> Exp {
    // cond ? 1 : 0 is just cond.
    if op == Op::Tern && is_int(&e2, 1) && is_int(&e3, 0) {
        *ch = true;
        return e1;
    }
    Exp::Ternary {
        op,
        e1: Box::new(e1),
        e2: Box::new(e2),
        e3: Box::new(e3),
    }
}

// ---------------------------------------------------------------------------
// Separate passes
// ---------------------------------------------------------------------------

impl Exp {
    /// Removes `a[m[x]]` and `a[size{m[x]}]` at every position. Kept out of
    /// the peephole set; callers invoke it where address simplification is
    /// actually wanted.
    pub fn simplify_addr(self) -> Exp {
        match self {
            Exp::Unary { op: Op::AddrOf, e1 } => match *e1 {
                Exp::Unary {
                    op: Op::MemOf,
                    e1: inner,
                } => inner.simplify_addr(),
                Exp::Binary {
                    op: Op::Size,
                    e1: _size,
                    e2,
                } if e2.op() == Op::MemOf => e2.into_sub1().simplify_addr(),
                other => Exp::Unary {
                    op: Op::AddrOf,
                    e1: Box::new(other.simplify_addr()),
                },
            },
            Exp::Unary { op, e1 } => Exp::Unary {
                op,
                e1: Box::new(e1.simplify_addr()),
            },
            Exp::Binary { op, e1, e2 } => Exp::Binary {
                op,
                e1: Box::new(e1.simplify_addr()),
                e2: Box::new(e2.simplify_addr()),
            },
            Exp::Ternary { op, e1, e2, e3 } => Exp::Ternary {
                op,
                e1: Box::new(e1.simplify_addr()),
                e2: Box::new(e2.simplify_addr()),
                e3: Box::new(e3.simplify_addr()),
            },
            Exp::Typed { ty, e1 } => Exp::Typed {
                ty,
                e1: Box::new(e1.simplify_addr()),
            },
            Exp::Assign { size, lhs, rhs } => Exp::Assign {
                size,
                lhs: Box::new(lhs.simplify_addr()),
                rhs: Box::new(rhs.simplify_addr()),
            },
            Exp::FlagDef { params, rtl } => Exp::FlagDef {
                params: Box::new(params.simplify_addr()),
                rtl,
            },
            leaf => leaf,
        }
    }

    /// Rewrites every `succ(r[k])` as `r[k+1]`, preserving structure
    /// elsewhere. Applying `succ` to anything but a constant register is a
    /// programmer error.
    pub fn fix_successor(self) -> Exp {
        let pattern = Exp::unary(Op::Successor, Exp::unary(Op::RegOf, Exp::terminal(Op::Wild)));
        let mut res = self;
        loop {
            let (target, replacement) = match res.search(&pattern) {
                None => return res,
                Some(found) => {
                    let reg_index = found.sub1().sub1();
                    assert!(
                        reg_index.is_int_const(),
                        "fix_successor: succ applied to r[{}]",
                        reg_index.op()
                    );
                    (found.clone(), Exp::reg(reg_index.int_value() + 1))
                }
            };
            let (next, _) = res.search_replace(&target, &replacement);
            res = next;
        }
    }

    /// Strips every `zfill` and `sgnex` wrapper, replacing each with its
    /// payload (third) operand.
    pub fn kill_fill(self) -> Exp {
        match self {
            Exp::Ternary {
                op: Op::Zfill | Op::SgnEx,
                e3,
                ..
            } => e3.kill_fill(),
            Exp::Unary { op, e1 } => Exp::Unary {
                op,
                e1: Box::new(e1.kill_fill()),
            },
            Exp::Binary { op, e1, e2 } => Exp::Binary {
                op,
                e1: Box::new(e1.kill_fill()),
                e2: Box::new(e2.kill_fill()),
            },
            Exp::Ternary { op, e1, e2, e3 } => Exp::Ternary {
                op,
                e1: Box::new(e1.kill_fill()),
                e2: Box::new(e2.kill_fill()),
                e3: Box::new(e3.kill_fill()),
            },
            Exp::Typed { ty, e1 } => Exp::Typed {
                ty,
                e1: Box::new(e1.kill_fill()),
            },
            Exp::Assign { size, lhs, rhs } => Exp::Assign {
                size,
                lhs: Box::new(lhs.kill_fill()),
                rhs: Box::new(rhs.kill_fill()),
            },
            Exp::FlagDef { params, rtl } => Exp::FlagDef {
                params: Box::new(params.kill_fill()),
                rtl,
            },
            leaf => leaf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plus(a: Exp, b: Exp) -> Exp {
        Exp::binary(Op::Plus, a, b)
    }

    fn minus(a: Exp, b: Exp) -> Exp {
        Exp::binary(Op::Minus, a, b)
    }

    #[test]
    fn test_constant_folding() {
        assert!(plus(Exp::int(3), Exp::int(4)).simplify().equals(&Exp::int(7)));
        assert!(minus(Exp::int(3), Exp::int(4))
            .simplify()
            .equals(&Exp::int(-1)));
        assert!(Exp::binary(Op::Mults, Exp::int(-3), Exp::int(4))
            .simplify()
            .equals(&Exp::int(-12)));
    }

    #[test]
    fn test_signed_and_unsigned_division_fold_separately() {
        let unsigned = Exp::binary(Op::Div, Exp::int(-4), Exp::int(2)).simplify();
        assert!(unsigned.equals(&Exp::int(((-4i32 as u32) / 2) as i64)));
        let signed = Exp::binary(Op::Divs, Exp::int(-4), Exp::int(2)).simplify();
        assert!(signed.equals(&Exp::int(-2)));
        let unsigned_mod = Exp::binary(Op::Mod, Exp::int(-7), Exp::int(4)).simplify();
        assert!(unsigned_mod.equals(&Exp::int(((-7i32 as u32) % 4) as i64)));
        let signed_mod = Exp::binary(Op::Mods, Exp::int(-7), Exp::int(4)).simplify();
        assert!(signed_mod.equals(&Exp::int(-3)));
    }

    #[test]
    fn test_division_by_zero_does_not_fold() {
        let e = Exp::binary(Op::Divs, Exp::int(1), Exp::int(0)).simplify();
        assert_eq!(e.op(), Op::Divs);
    }

    #[test]
    fn test_arithmetic_shift_right_fold() {
        let sh = |k1: i64, k2: i64| {
            Exp::binary(Op::ShiftRA, Exp::int(k1), Exp::int(k2))
                .simplify()
                .int_value()
        };
        assert_eq!(sh(-8, 1), -4);
        assert_eq!(sh(8, 2), 2);
    }

    #[test]
    fn test_identities_and_absorption() {
        let r = Exp::reg(3);
        assert!(plus(r.clone(), Exp::int(0)).simplify().equals(&r));
        assert!(Exp::binary(Op::BitOr, r.clone(), Exp::int(0))
            .simplify()
            .equals(&r));
        assert!(Exp::binary(Op::Mult, r.clone(), Exp::int(0))
            .simplify()
            .equals(&Exp::int(0)));
        assert!(Exp::binary(Op::Mult, r.clone(), Exp::int(1))
            .simplify()
            .equals(&r));
        assert!(Exp::binary(Op::BitAnd, r.clone(), Exp::int(-1))
            .simplify()
            .equals(&r));
        assert!(Exp::binary(Op::And, r.clone(), Exp::int(7))
            .simplify()
            .equals(&r));
        assert!(Exp::binary(Op::BitAnd, r.clone(), r.clone())
            .simplify()
            .equals(&r));
    }

    #[test]
    fn test_self_cancellation() {
        let r = Exp::reg(3);
        assert!(minus(r.clone(), r.clone()).simplify().equals(&Exp::int(0)));
        assert!(Exp::binary(Op::BitXor, r.clone(), r)
            .simplify()
            .equals(&Exp::int(0)));
    }

    #[test]
    fn test_constant_commutes_right() {
        let e = plus(Exp::int(4), Exp::reg(1)).simplify();
        assert_eq!(e.to_string(), "r[1] + 4");
    }

    #[test]
    fn test_shift_becomes_multiply() {
        let e = Exp::binary(Op::ShiftL, Exp::reg(8), Exp::int(3)).simplify();
        assert!(e.equals(&Exp::binary(Op::Mult, Exp::reg(8), Exp::int(8))));
    }

    #[test]
    fn test_equality_wrapper_collapse() {
        let eq = || Exp::binary(Op::Equals, Exp::reg(1), Exp::reg(2));
        let ne = Exp::binary(Op::NotEqual, Exp::reg(1), Exp::reg(2));
        assert!(Exp::binary(Op::Equals, eq(), Exp::int(1)).simplify().equals(&eq()));
        assert!(Exp::binary(Op::Equals, eq(), Exp::int(0)).simplify().equals(&ne));
        assert!(Exp::binary(Op::NotEqual, eq(), Exp::int(1)).simplify().equals(&ne));
        assert!(Exp::binary(Op::NotEqual, eq(), Exp::int(0)).simplify().equals(&eq()));
    }

    #[test]
    fn test_negated_constant_comparison() {
        // r[1] + -5 = 0 becomes r[1] = 5.
        let e = Exp::binary(
            Op::Equals,
            plus(Exp::reg(1), Exp::int(-5)),
            Exp::int(0),
        )
        .simplify();
        assert!(e.equals(&Exp::binary(Op::Equals, Exp::reg(1), Exp::int(5))));
    }

    #[test]
    fn test_comparison_zero_flip() {
        let gt = Exp::binary(Op::Gtr, Exp::reg(1), Exp::reg(2));
        let e = Exp::binary(Op::Equals, gt, Exp::int(0)).simplify();
        assert!(e.equals(&Exp::binary(Op::LessEq, Exp::reg(1), Exp::reg(2))));

        let gtu = Exp::binary(Op::GtrUns, Exp::reg(1), Exp::reg(2));
        let e = Exp::binary(Op::Equals, gtu, Exp::int(0)).simplify();
        assert!(e.equals(&Exp::binary(Op::LessEqUns, Exp::reg(1), Exp::reg(2))));
    }

    #[test]
    fn test_ordered_or_equal_collapse() {
        let le = Exp::binary(Op::LessEq, Exp::reg(1), Exp::reg(2));
        let eq = Exp::binary(Op::Equals, Exp::reg(1), Exp::reg(2));
        let e = Exp::binary(Op::Or, le.clone(), eq).simplify();
        assert!(e.equals(&le));

        // Operand pair may match in swapped order.
        let ge = Exp::binary(Op::GtrEq, Exp::reg(1), Exp::reg(2));
        let eq_swapped = Exp::binary(Op::Equals, Exp::reg(2), Exp::reg(1));
        let e = Exp::binary(Op::Or, ge.clone(), eq_swapped).simplify();
        assert!(e.equals(&ge));
    }

    #[test]
    fn test_mul_reassociation() {
        // a + a*3 becomes a*4.
        let a = Exp::reg(5);
        let e = plus(
            a.clone(),
            Exp::binary(Op::Mult, a.clone(), Exp::int(3)),
        )
        .simplify();
        assert!(e.equals(&Exp::binary(Op::Mult, a.clone(), Exp::int(4))));

        // (a*3)*5 becomes a*15.
        let e = Exp::binary(
            Op::Mult,
            Exp::binary(Op::Mult, a.clone(), Exp::int(3)),
            Exp::int(5),
        )
        .simplify();
        assert!(e.equals(&Exp::binary(Op::Mult, a, Exp::int(15))));
    }

    #[test]
    fn test_unary_folds() {
        assert!(Exp::unary(Op::Neg, Exp::int(7)).simplify().equals(&Exp::int(-7)));
        assert!(Exp::unary(Op::Not, Exp::int(0)).simplify().equals(&Exp::int(-1)));
        assert!(Exp::unary(Op::LNot, Exp::int(0)).simplify().equals(&Exp::int(1)));
        assert!(Exp::unary(Op::LNot, Exp::int(5)).simplify().equals(&Exp::int(0)));

        let r = Exp::reg(2);
        assert!(Exp::unary(Op::Neg, Exp::unary(Op::Neg, r.clone()))
            .simplify()
            .equals(&r));

        let eq = Exp::binary(Op::Equals, Exp::reg(1), Exp::reg(2));
        let ne = Exp::binary(Op::NotEqual, Exp::reg(1), Exp::reg(2));
        assert!(Exp::unary(Op::LNot, eq).simplify().equals(&ne));
    }

    #[test]
    fn test_addr_of_mem_of_in_peephole() {
        let r = Exp::reg(24);
        let e = Exp::unary(Op::AddrOf, Exp::unary(Op::MemOf, r.clone())).simplify();
        assert!(e.equals(&r));
    }

    #[test]
    fn test_ternary_bool_canonicalization() {
        let cond = Exp::binary(Op::Less, Exp::reg(1), Exp::reg(2));
        let e = Exp::ternary(Op::Tern, cond.clone(), Exp::int(1), Exp::int(0)).simplify();
        assert!(e.equals(&cond));
    }

    #[test]
    fn test_simplify_is_idempotent_on_minus() {
        let e = minus(Exp::reg(1), Exp::unary(Op::Neg, Exp::reg(2)));
        let once = e.simplify();
        let twice = once.clone().simplify();
        assert!(once.equals(&twice));
    }

    #[test]
    fn test_simplify_arith_cancellation() {
        // (r[28] + 100) - (r[28] + 92) is 8.
        let e = minus(
            plus(Exp::reg(28), Exp::int(100)),
            plus(Exp::reg(28), Exp::int(92)),
        );
        assert!(e.simplify_arith().equals(&Exp::int(8)));
    }

    #[test]
    fn test_simplify_arith_shapes() {
        // Positives with a scalar.
        let e = plus(plus(Exp::reg(1), Exp::int(4)), Exp::int(6));
        assert_eq!(e.simplify_arith().to_string(), "r[1] + 10");

        // Negatives only.
        let e = minus(Exp::int(10), Exp::reg(1));
        assert_eq!(e.simplify_arith().to_string(), "10 - r[1]");

        // Both, no scalar.
        let e = minus(Exp::reg(1), Exp::reg(2));
        assert_eq!(e.simplify_arith().to_string(), "r[1] - r[2]");

        // Both with a scalar.
        let e = plus(minus(Exp::reg(1), Exp::reg(2)), Exp::int(3));
        assert_eq!(e.simplify_arith().to_string(), "(r[1] - r[2]) + 3");
    }

    #[test]
    fn test_simplify_arith_descends_into_selectors() {
        let e = Exp::unary(Op::MemOf, plus(plus(Exp::reg(28), Exp::int(4)), Exp::int(4)));
        assert_eq!(e.simplify_arith().to_string(), "m[r[28] + 8]");
    }

    #[test]
    fn test_partition_terms() {
        // %afp + 108 + r[1] - %afp - 92
        let e = minus(
            minus(
                plus(plus(Exp::terminal(Op::Afp), Exp::int(108)), Exp::reg(1)),
                Exp::terminal(Op::Afp),
            ),
            Exp::int(92),
        );
        let (pos, neg, ints) = e.partition_terms();
        assert_eq!(pos.len(), 2);
        assert_eq!(neg.len(), 1);
        assert_eq!(ints, vec![108, -92]);
    }

    #[test]
    fn test_partition_descends_assign_lhs_then_rhs() {
        let a = Exp::assign_sized(32, Exp::reg(1), Exp::int(5));
        let (pos, _neg, ints) = plus(a, Exp::int(2)).partition_terms();
        assert_eq!(pos.len(), 1);
        assert!(pos[0].equals(&Exp::reg(1)));
        assert_eq!(ints, vec![5, 2]);
    }

    #[test]
    fn test_simplify_addr() {
        let r = Exp::reg(24);
        let e = Exp::unary(Op::AddrOf, Exp::unary(Op::MemOf, r.clone()));
        assert!(e.simplify_addr().equals(&r));

        // a[ size{m[x]} ] also strips.
        let sized = Exp::binary(Op::Size, Exp::int(16), Exp::unary(Op::MemOf, r.clone()));
        let e = Exp::unary(Op::AddrOf, sized);
        assert!(e.simplify_addr().equals(&r));

        // Nested occurrences are removed everywhere.
        let inner = Exp::unary(Op::AddrOf, Exp::unary(Op::MemOf, Exp::reg(1)));
        let e = plus(inner, Exp::unary(Op::AddrOf, Exp::unary(Op::MemOf, Exp::reg(2))));
        assert_eq!(e.simplify_addr().to_string(), "r[1] + r[2]");
    }

    #[test]
    fn test_fix_successor() {
        let e = Exp::unary(Op::Successor, Exp::reg(7));
        assert!(e.fix_successor().equals(&Exp::reg(8)));

        // Every occurrence is rewritten.
        let e = plus(
            Exp::unary(Op::Successor, Exp::reg(1)),
            Exp::unary(Op::Successor, Exp::reg(3)),
        );
        assert_eq!(e.fix_successor().to_string(), "r[2] + r[4]");

        // Structure elsewhere is preserved.
        let e = plus(Exp::unary(Op::Successor, Exp::reg(7)), Exp::int(4));
        assert_eq!(e.fix_successor().to_string(), "r[8] + 4");
    }

    #[test]
    fn test_kill_fill() {
        let z = Exp::ternary(Op::Zfill, Exp::int(8), Exp::int(32), Exp::reg(1));
        assert!(z.kill_fill().equals(&Exp::reg(1)));

        let s = Exp::ternary(Op::SgnEx, Exp::int(8), Exp::int(32), Exp::reg(2));
        let e = plus(s, Exp::ternary(Op::Zfill, Exp::int(16), Exp::int(32), Exp::reg(3)));
        assert_eq!(e.kill_fill().to_string(), "r[2] + r[3]");

        // Nested fills inside the payload are stripped too.
        let nested = Exp::ternary(
            Op::Zfill,
            Exp::int(8),
            Exp::int(32),
            Exp::ternary(Op::SgnEx, Exp::int(8), Exp::int(16), Exp::reg(4)),
        );
        assert!(nested.kill_fill().equals(&Exp::reg(4)));
    }

    #[test]
    #[should_panic(expected = "must not wrap")]
    fn test_typed_assign_nesting_is_rejected() {
        use crate::handles::WordTy;
        let bad = Exp::Typed {
            ty: Box::new(WordTy::new(32)),
            e1: Box::new(Exp::assign_sized(32, Exp::reg(1), Exp::int(0))),
        };
        let _ = bad.simplify();
    }
}
