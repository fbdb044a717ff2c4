//! Subtree search and replacement.
//!
//! Matching uses the wildcard-aware [`Exp::equals`], so a `WILD` terminal in
//! the pattern matches any subtree at its position. Matches are produced in
//! pre-order: root before children, left before right. Replacement consumes
//! the tree and rebuilds only the spine above each replaced site; each
//! replacement is a fresh clone, and a replaced subtree is never re-matched,
//! so the match set is fixed before any mutation takes effect.

use crate::exp::Exp;

impl Exp {
    /// Finds the first subtree matching `pattern`, depth-first pre-order.
    pub fn search<'a>(&'a self, pattern: &Exp) -> Option<&'a Exp> {
        if pattern.equals(self) {
            return Some(self);
        }
        match self {
            Exp::Const(_) | Exp::Terminal(_) => None,
            Exp::Unary { e1, .. } | Exp::Typed { e1, .. } => e1.search(pattern),
            Exp::Binary { e1, e2, .. } => {
                e1.search(pattern).or_else(|| e2.search(pattern))
            }
            Exp::Ternary { e1, e2, e3, .. } => e1
                .search(pattern)
                .or_else(|| e2.search(pattern))
                .or_else(|| e3.search(pattern)),
            Exp::Assign { lhs, rhs, .. } => {
                lhs.search(pattern).or_else(|| rhs.search(pattern))
            }
            Exp::FlagDef { params, .. } => params.search(pattern),
        }
    }

    /// Collects every subtree matching `pattern`, in pre-order. A matched
    /// node's children are still scanned, so nested matches all appear.
    pub fn search_all<'a>(&'a self, pattern: &Exp) -> Vec<&'a Exp> {
        let mut found = Vec::new();
        self.search_all_into(pattern, &mut found);
        found
    }

    fn search_all_into<'a>(&'a self, pattern: &Exp, found: &mut Vec<&'a Exp>) {
        if pattern.equals(self) {
            found.push(self);
        }
        match self {
            Exp::Const(_) | Exp::Terminal(_) => {}
            Exp::Unary { e1, .. } | Exp::Typed { e1, .. } => {
                e1.search_all_into(pattern, found)
            }
            Exp::Binary { e1, e2, .. } => {
                e1.search_all_into(pattern, found);
                e2.search_all_into(pattern, found);
            }
            Exp::Ternary { e1, e2, e3, .. } => {
                e1.search_all_into(pattern, found);
                e2.search_all_into(pattern, found);
                e3.search_all_into(pattern, found);
            }
            Exp::Assign { lhs, rhs, .. } => {
                lhs.search_all_into(pattern, found);
                rhs.search_all_into(pattern, found);
            }
            Exp::FlagDef { params, .. } => params.search_all_into(pattern, found),
        }
    }

    /// Replaces the first match of `pattern` with a clone of `replacement`.
    /// Returns the (possibly new) root and whether a change was made.
    pub fn search_replace(self, pattern: &Exp, replacement: &Exp) -> (Exp, bool) {
        let mut changed = false;
        let out = replace_walk(self, pattern, replacement, true, &mut changed);
        (out, changed)
    }

    /// Replaces every match of `pattern` with a fresh clone of
    /// `replacement`. Returns the (possibly new) root and whether any
    /// change was made.
    pub fn search_replace_all(self, pattern: &Exp, replacement: &Exp) -> (Exp, bool) {
        let mut changed = false;
        let out = replace_walk(self, pattern, replacement, false, &mut changed);
        (out, changed)
    }
}

fn replace_walk(e: Exp, pattern: &Exp, replacement: &Exp, once: bool, changed: &mut bool) -> Exp {
    if once && *changed {
        return e;
    }
    if pattern.equals(&e) {
        *changed = true;
        return replacement.clone();
    }
    match e {
        Exp::Const(_) | Exp::Terminal(_) => e,
        Exp::Unary { op, e1 } => Exp::Unary {
            op,
            e1: Box::new(replace_walk(*e1, pattern, replacement, once, changed)),
        },
        Exp::Binary { op, e1, e2 } => {
            let e1 = Box::new(replace_walk(*e1, pattern, replacement, once, changed));
            let e2 = Box::new(replace_walk(*e2, pattern, replacement, once, changed));
            Exp::Binary { op, e1, e2 }
        }
        Exp::Ternary { op, e1, e2, e3 } => {
            let e1 = Box::new(replace_walk(*e1, pattern, replacement, once, changed));
            let e2 = Box::new(replace_walk(*e2, pattern, replacement, once, changed));
            let e3 = Box::new(replace_walk(*e3, pattern, replacement, once, changed));
            Exp::Ternary { op, e1, e2, e3 }
        }
        Exp::Typed { ty, e1 } => Exp::Typed {
            ty,
            e1: Box::new(replace_walk(*e1, pattern, replacement, once, changed)),
        },
        Exp::Assign { size, lhs, rhs } => {
            let lhs = Box::new(replace_walk(*lhs, pattern, replacement, once, changed));
            let rhs = Box::new(replace_walk(*rhs, pattern, replacement, once, changed));
            Exp::Assign { size, lhs, rhs }
        }
        Exp::FlagDef { params, rtl } => Exp::FlagDef {
            params: Box::new(replace_walk(*params, pattern, replacement, once, changed)),
            rtl,
        },
    }
}
