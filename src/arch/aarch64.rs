//! AArch64 no tiene `push`/`pop`. Cada valor ocupa una ranura de 16 bytes
//! en la pila para mantener `sp` alineado como exige la ABI.

use crate::{codegen::Context, parse::BinOp};

use std::{fmt, io};

/// Tamaño de una ranura de la pila de evaluación, en bytes.
const SLOT_SIZE: u32 = 16;

pub struct Emitter;

#[derive(Copy, Clone)]
pub struct Reg(u8);

impl Reg {
    const X0: Reg = Reg(0);
    const X1: Reg = Reg(1);
}

impl super::Register for Reg {}

impl fmt::Display for Reg {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Reg(number) = self;
        write!(formatter, "x{}", number)
    }
}

impl super::Emitter for Emitter {
    type Register = Reg;

    const ACCUMULATOR: Reg = Reg::X0;
    const OPERAND: Reg = Reg::X1;

    fn prologue(cx: &mut Context<'_>, entry: &str) -> io::Result<()> {
        writeln!(cx.output(), ".arch armv8-a")?;
        writeln!(cx.output(), ".global {0}\n{0}:", entry)
    }

    fn push_const(cx: &mut Context<'_>, value: i32) -> io::Result<()> {
        // Las constantes nunca son negativas; a lo sumo se requieren
        // dos mitades de 16 bits
        let value = value as u32;
        emit!(cx, "mov", "{}, #{}", Reg::X0, value & 0xffff)?;
        if value > 0xffff {
            emit!(cx, "movk", "{}, #{}, lsl #16", Reg::X0, value >> 16)?;
        }

        Self::push(cx, Reg::X0)
    }

    fn push(cx: &mut Context<'_>, reg: Reg) -> io::Result<()> {
        emit!(cx, "str", "{}, [sp, #-{}]!", reg, SLOT_SIZE)
    }

    fn pop(cx: &mut Context<'_>, reg: Reg) -> io::Result<()> {
        emit!(cx, "ldr", "{}, [sp], #{}", reg, SLOT_SIZE)
    }

    fn apply(cx: &mut Context<'_>, op: BinOp) -> io::Result<()> {
        use BinOp::*;

        let (a, b) = (Reg::X0, Reg::X1);
        let condition = match op {
            Add => return emit!(cx, "add", "{0}, {0}, {1}", a, b),
            Sub => return emit!(cx, "sub", "{0}, {0}, {1}", a, b),
            Mul => return emit!(cx, "mul", "{0}, {0}, {1}", a, b),
            Div => return emit!(cx, "sdiv", "{0}, {0}, {1}", a, b),

            Eq => "eq",
            Ne => "ne",
            Lt => "lt",
            Le => "le",
        };

        emit!(cx, "cmp", "{}, {}", a, b)?;
        emit!(cx, "cset", "{}, {}", a, condition)
    }

    fn epilogue(cx: &mut Context<'_>) -> io::Result<()> {
        Self::pop(cx, Reg::X0)?;
        emit!(cx, "ret")
    }
}
