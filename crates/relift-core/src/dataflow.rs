//! Dataflow adapter for assignment expressions.
//!
//! The core does not implement liveness or use/def analysis; it connects
//! assignments to that world through the [`Statement`] contract. Use and
//! used-by views live with the external statements; the operations here
//! only query them, forward refreshes, or substitute definitions into this
//! assignment.

use std::fmt;

use crate::exp::Exp;
use crate::op::Op;

/// External statement handle.
pub trait Statement: fmt::Debug {
    /// The defined location, if this statement defines one.
    fn left(&self) -> Option<&Exp>;

    /// The defining expression, if any.
    fn right(&self) -> Option<&Exp>;

    /// Number of statements currently recorded as using this definition.
    fn num_used_by(&self) -> usize;

    /// Recomputes this statement's use view.
    fn update_uses(&mut self);

    /// Recomputes this statement's used-by view.
    fn update_used_by(&mut self);

    /// Prints this statement in its role as a use.
    fn print_as_use(&self, out: &mut dyn fmt::Write) -> fmt::Result;

    /// Prints this statement in its role as a user of another definition.
    fn print_as_use_by(&self, out: &mut dyn fmt::Write) -> fmt::Result;
}

/// External oracle holding the dataflow views for assignments.
///
/// The core never stores use or used-by sets; these calls forward.
pub trait UseOracle {
    /// Refreshes the use view of `assign`.
    fn update_uses(&mut self, assign: &Exp);

    /// Refreshes the used-by view of `assign`.
    fn update_used_by(&mut self, assign: &Exp);
}

/// Extremely conservative alias test: any two memory dereferences may
/// alias. Callers rely on the over-approximation.
fn may_alias(a: &Exp, b: &Exp) -> bool {
    a.is_mem_of() && b.is_mem_of()
}

fn assign_parts(e: &Exp) -> (&Exp, &Exp) {
    match e {
        Exp::Assign { lhs, rhs, .. } => (lhs, rhs),
        other => panic!("dataflow: {} is not an assignment", other.op()),
    }
}

impl Exp {
    /// Removes from `live` every statement whose LHS this assignment
    /// overwrites: LHS structurally equal to ours, or possibly aliasing it.
    pub fn kill_live(&self, live: &mut Vec<&dyn Statement>) {
        let (lhs, _) = assign_parts(self);
        live.retain(|stmt| match stmt.left() {
            None => true,
            Some(left) => !(left.equals(lhs) || may_alias(left, lhs)),
        });
    }

    /// Collects into `dead` the statements from `live_in` that this
    /// assignment kills and that have no recorded uses.
    pub fn get_dead_statements<'a>(
        &self,
        dead: &mut Vec<&'a dyn Statement>,
        live_in: &[&'a dyn Statement],
    ) {
        let (lhs, _) = assign_parts(self);
        for stmt in live_in {
            let killed = match stmt.left() {
                None => false,
                Some(left) => left.equals(lhs) || may_alias(left, lhs),
            };
            if killed && stmt.num_used_by() == 0 {
                dead.push(*stmt);
            }
        }
    }

    /// True iff `e` appears in the RHS, or under the address of a memory
    /// LHS. The assigned register or temporary itself is not a use.
    pub fn uses_exp(&self, e: &Exp) -> bool {
        let (lhs, rhs) = assign_parts(self);
        if rhs.search(e).is_some() {
            return true;
        }
        lhs.is_mem_of() && lhs.sub1().search(e).is_some()
    }

    /// Substitutes every occurrence of `def`'s LHS with its RHS inside this
    /// assignment's RHS (and inside the address of a memory LHS), then
    /// re-normalizes arithmetic and re-runs the peephole fixpoint.
    pub fn do_replace_use(self, def: &dyn Statement) -> Exp {
        let left = def.left().expect("do_replace_use: definition has no LHS");
        let right = def.right().expect("do_replace_use: definition has no RHS");
        let (size, lhs, rhs) = match self {
            Exp::Assign { size, lhs, rhs } => (size, *lhs, *rhs),
            other => panic!("do_replace_use: {} is not an assignment", other.op()),
        };
        let (rhs, _) = rhs.search_replace_all(left, right);
        let lhs = if lhs.is_mem_of() {
            let addr = lhs.into_sub1();
            let (addr, _) = addr.search_replace_all(left, right);
            Exp::unary(Op::MemOf, addr)
        } else {
            lhs
        };
        let lhs = lhs.simplify_arith();
        let rhs = rhs.simplify_arith();
        Exp::assign_sized(size, lhs, rhs).simplify()
    }

    /// Forwards a use-view refresh for this assignment to the oracle.
    pub fn update_uses(&self, oracle: &mut dyn UseOracle) {
        let _ = assign_parts(self);
        oracle.update_uses(self);
    }

    /// Forwards a used-by-view refresh for this assignment to the oracle.
    pub fn update_used_by(&self, oracle: &mut dyn UseOracle) {
        let _ = assign_parts(self);
        oracle.update_used_by(self);
    }

    /// Prints this assignment followed by its use and used-by views.
    pub fn print_with_uses(
        &self,
        out: &mut dyn fmt::Write,
        uses: &[&dyn Statement],
        used_by: &[&dyn Statement],
    ) -> fmt::Result {
        let _ = assign_parts(self);
        write!(out, "{}", self)?;
        out.write_str("   uses: ")?;
        for stmt in uses {
            stmt.print_as_use(out)?;
            out.write_str(", ")?;
        }
        out.write_str("   used by: ")?;
        for stmt in used_by {
            stmt.print_as_use_by(out)?;
            out.write_str(", ")?;
        }
        Ok(())
    }
}

/// An assignment expression in its role as a statement.
///
/// The simplest useful [`Statement`]: the defined location is the
/// assignment's LHS, the defining expression its RHS. The used-by count is
/// maintained by whatever analysis owns the statement.
#[derive(Debug, Clone)]
pub struct ExpStmt {
    /// The underlying assignment.
    pub assign: Exp,
    /// Number of users recorded by the owning analysis.
    pub used_by_count: usize,
}

impl ExpStmt {
    /// Wraps an assignment. Panics if `assign` is not an assignment.
    pub fn new(assign: Exp) -> ExpStmt {
        assert!(
            assign.is_assign(),
            "ExpStmt: {} is not an assignment",
            assign.op()
        );
        ExpStmt {
            assign,
            used_by_count: 0,
        }
    }
}

impl Statement for ExpStmt {
    fn left(&self) -> Option<&Exp> {
        Some(self.assign.sub1())
    }

    fn right(&self) -> Option<&Exp> {
        Some(self.assign.sub2())
    }

    fn num_used_by(&self) -> usize {
        self.used_by_count
    }

    fn update_uses(&mut self) {}

    fn update_used_by(&mut self) {}

    fn print_as_use(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self.assign)
    }

    fn print_as_use_by(&self, out: &mut dyn fmt::Write) -> fmt::Result {
        write!(out, "{}", self.assign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assign(lhs: Exp, rhs: Exp) -> Exp {
        Exp::assign_sized(32, lhs, rhs)
    }

    fn mem(addr: Exp) -> Exp {
        Exp::unary(Op::MemOf, addr)
    }

    #[test]
    fn test_kill_live_removes_same_lhs() {
        let killer = assign(Exp::reg(1), Exp::int(0));
        let a = ExpStmt::new(assign(Exp::reg(1), Exp::int(5)));
        let b = ExpStmt::new(assign(Exp::reg(2), Exp::int(6)));
        let mut live: Vec<&dyn Statement> = vec![&a, &b];
        killer.kill_live(&mut live);
        assert_eq!(live.len(), 1);
        assert!(live[0].left().unwrap().equals(&Exp::reg(2)));
    }

    #[test]
    fn test_kill_live_conservative_memory_alias() {
        let killer = assign(mem(Exp::reg(1)), Exp::int(0));
        let other = ExpStmt::new(assign(mem(Exp::reg(9)), Exp::int(5)));
        let reg = ExpStmt::new(assign(Exp::reg(9), Exp::int(5)));
        let mut live: Vec<&dyn Statement> = vec![&other, &reg];
        killer.kill_live(&mut live);
        // Any m[..] may alias any other m[..]; the register survives.
        assert_eq!(live.len(), 1);
        assert!(live[0].left().unwrap().equals(&Exp::reg(9)));
    }

    #[test]
    fn test_get_dead_statements_requires_zero_uses() {
        let killer = assign(Exp::reg(1), Exp::int(0));
        let unused = ExpStmt::new(assign(Exp::reg(1), Exp::int(5)));
        let mut used = ExpStmt::new(assign(Exp::reg(1), Exp::int(6)));
        used.used_by_count = 2;
        let live_in: Vec<&dyn Statement> = vec![&unused, &used];
        let mut dead: Vec<&dyn Statement> = Vec::new();
        killer.get_dead_statements(&mut dead, &live_in);
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].num_used_by(), 0);
    }

    #[test]
    fn test_uses_exp() {
        let a = assign(
            Exp::reg(1),
            Exp::binary(Op::Plus, Exp::reg(2), Exp::int(1)),
        );
        assert!(a.uses_exp(&Exp::reg(2)));
        // The defined register itself is not a use.
        assert!(!a.uses_exp(&Exp::reg(1)));

        let store = assign(mem(Exp::reg(3)), Exp::int(0));
        assert!(store.uses_exp(&Exp::reg(3)));
    }

    #[test]
    fn test_do_replace_use_substitutes_and_simplifies() {
        // def: r[2] := r[3] + 4
        let def = ExpStmt::new(assign(
            Exp::reg(2),
            Exp::binary(Op::Plus, Exp::reg(3), Exp::int(4)),
        ));
        // use: r[1] := r[2] + 4
        let user = assign(Exp::reg(1), Exp::binary(Op::Plus, Exp::reg(2), Exp::int(4)));
        let out = user.do_replace_use(&def);
        assert_eq!(out.to_string(), "*32* r[1] := r[3] + 8");
    }

    #[test]
    fn test_do_replace_use_reaches_memory_lhs_address() {
        let def = ExpStmt::new(assign(Exp::reg(2), Exp::reg(7)));
        let user = assign(
            mem(Exp::binary(Op::Plus, Exp::reg(2), Exp::int(0))),
            Exp::int(1),
        );
        let out = user.do_replace_use(&def);
        assert_eq!(out.to_string(), "*32* m[r[7]] := 1");
    }

    #[test]
    fn test_print_with_uses() {
        let a = assign(Exp::reg(1), Exp::reg(2));
        let u = ExpStmt::new(assign(Exp::reg(2), Exp::int(3)));
        let uses: Vec<&dyn Statement> = vec![&u];
        let mut s = String::new();
        a.print_with_uses(&mut s, &uses, &[]).unwrap();
        assert!(s.starts_with("*32* r[1] := r[2]   uses: *32* r[2] := 3, "));
    }

    #[test]
    fn test_oracle_forwarding() {
        #[derive(Default)]
        struct CountingOracle {
            uses: usize,
            used_by: usize,
        }
        impl UseOracle for CountingOracle {
            fn update_uses(&mut self, _assign: &Exp) {
                self.uses += 1;
            }
            fn update_used_by(&mut self, _assign: &Exp) {
                self.used_by += 1;
            }
        }

        let a = assign(Exp::reg(1), Exp::int(0));
        let mut oracle = CountingOracle::default();
        a.update_uses(&mut oracle);
        a.update_used_by(&mut oracle);
        assert_eq!((oracle.uses, oracle.used_by), (1, 1));
    }
}
