//! # relift-core
//!
//! The symbolic-expression IR at the heart of the relift decompiler, with
//! its algebraic simplifier. This crate defines:
//!
//! - the closed operator catalogue ([`Op`])
//! - the expression tree ([`Exp`]) and its value protocol: deep clone,
//!   wildcard-aware structural equality, a total order, search and replace,
//!   and an infix pretty-printer with DOT output
//! - the simplifier: `+`/`-` normalization by term partitioning, a
//!   polymorphic peephole pass run to fixpoint, address simplification, and
//!   the `succ`/fill-stripping helpers
//! - a compact self-describing binary serialization of the IR
//! - the adapter connecting assignments to external dataflow analyses
//!
//! Lifters build [`Exp::Assign`] trees from decoded instructions; analysis
//! passes simplify, query and rewrite them; stabilized trees serialize for
//! later sessions. The type system, RTL container and statement analyses
//! stay outside this crate, behind the narrow handle traits in [`handles`]
//! and [`dataflow`].

pub mod dataflow;
pub mod dot;
pub mod error;
pub mod exp;
pub mod handles;
pub mod op;
pub mod print;
pub mod search;
pub mod serialize;
pub mod simplify;

pub use dataflow::{ExpStmt, Statement, UseOracle};
pub use error::DecodeError;
pub use exp::{Const, Exp};
pub use handles::{BasicRtl, HandleCodec, Rtl, Ty, WordCodec, WordTy};
pub use op::{Op, PrintStyle};
pub use serialize::{ByteReader, FID_EXP_END};
