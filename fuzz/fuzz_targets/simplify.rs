#![no_main]

use libfuzzer_sys::fuzz_target;
use relift_core::{Exp, Op};

/// Decodes fuzz bytes into a small wildcard-free expression tree.
fn build_exp(data: &[u8], pos: &mut usize, depth: usize) -> Exp {
    let byte = |pos: &mut usize| -> u8 {
        let b = data.get(*pos).copied().unwrap_or(0);
        *pos += 1;
        b
    };

    let b = byte(pos);
    if depth == 0 || *pos >= data.len() {
        return match b % 3 {
            0 => Exp::int((byte(pos) as i64) - 128),
            1 => Exp::reg((byte(pos) % 16) as i64),
            _ => Exp::terminal(Op::Afp),
        };
    }

    const UNARY: &[Op] = &[Op::Neg, Op::Not, Op::LNot, Op::MemOf, Op::AddrOf, Op::Successor];
    const BINARY: &[Op] = &[
        Op::Plus,
        Op::Minus,
        Op::Mult,
        Op::Mults,
        Op::Div,
        Op::Divs,
        Op::Mod,
        Op::Mods,
        Op::BitAnd,
        Op::BitOr,
        Op::BitXor,
        Op::ShiftL,
        Op::ShiftR,
        Op::ShiftRA,
        Op::And,
        Op::Or,
        Op::Equals,
        Op::NotEqual,
        Op::Less,
        Op::Gtr,
        Op::LessEq,
        Op::GtrEq,
        Op::LessUns,
        Op::GtrUns,
        Op::LessEqUns,
        Op::GtrEqUns,
    ];
    const TERNARY: &[Op] = &[Op::Tern, Op::Zfill, Op::SgnEx, Op::At];

    match b % 4 {
        0 => Exp::unary(
            UNARY[(b / 4) as usize % UNARY.len()],
            build_exp(data, pos, depth - 1),
        ),
        1 => Exp::binary(
            BINARY[(b / 4) as usize % BINARY.len()],
            build_exp(data, pos, depth - 1),
            build_exp(data, pos, depth - 1),
        ),
        2 => Exp::ternary(
            TERNARY[(b / 4) as usize % TERNARY.len()],
            build_exp(data, pos, depth - 1),
            build_exp(data, pos, depth - 1),
            build_exp(data, pos, depth - 1),
        ),
        _ => match b % 3 {
            0 => Exp::int((byte(pos) as i64) - 128),
            1 => Exp::reg((byte(pos) % 16) as i64),
            _ => Exp::terminal(Op::Agp),
        },
    }
}

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    let mut pos = 0;
    let e = build_exp(data, &mut pos, 5);

    // The fixpoint must terminate and be stable.
    let once = e.clone().simplify();
    let twice = once.clone().simplify();
    assert!(once.equals(&twice));

    // The companion passes must not panic either.
    let _ = e.clone().simplify_arith();
    let _ = e.clone().simplify_addr();
    let _ = e.kill_fill();
});
