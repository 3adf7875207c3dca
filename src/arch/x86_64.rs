use crate::{codegen::Context, parse::BinOp};

use std::{fmt, io};

pub struct Emitter;

#[derive(Copy, Clone)]
pub enum Reg {
    Rax,
    Rdi,
}

impl super::Register for Reg {}

impl fmt::Display for Reg {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reg::Rax => "rax",
            Reg::Rdi => "rdi",
        };

        formatter.write_str(name)
    }
}

impl super::Emitter for Emitter {
    type Register = Reg;

    const ACCUMULATOR: Reg = Reg::Rax;
    const OPERAND: Reg = Reg::Rdi;

    fn prologue(cx: &mut Context<'_>, entry: &str) -> io::Result<()> {
        writeln!(cx.output(), ".intel_syntax noprefix")?;
        writeln!(cx.output(), ".global {0}\n{0}:", entry)
    }

    fn push_const(cx: &mut Context<'_>, value: i32) -> io::Result<()> {
        // `push imm32` extiende el signo a 64 bits
        emit!(cx, "push", "{}", value)
    }

    fn push(cx: &mut Context<'_>, reg: Reg) -> io::Result<()> {
        emit!(cx, "push", "{}", reg)
    }

    fn pop(cx: &mut Context<'_>, reg: Reg) -> io::Result<()> {
        emit!(cx, "pop", "{}", reg)
    }

    fn apply(cx: &mut Context<'_>, op: BinOp) -> io::Result<()> {
        use {BinOp::*, Reg::*};

        let set = match op {
            Add => return emit!(cx, "add", "{}, {}", Rax, Rdi),
            Sub => return emit!(cx, "sub", "{}, {}", Rax, Rdi),
            Mul => return emit!(cx, "imul", "{}, {}", Rax, Rdi),

            // rdx:rax / rdi, el cociente queda en rax
            Div => {
                emit!(cx, "cqo")?;
                return emit!(cx, "idiv", "{}", Rdi);
            }

            Eq => "sete",
            Ne => "setne",
            Lt => "setl",
            Le => "setle",
        };

        emit!(cx, "cmp", "{}, {}", Rax, Rdi)?;
        emit!(cx, set, "al")?;
        emit!(cx, "movzb", "{}, al", Rax)
    }

    fn epilogue(cx: &mut Context<'_>) -> io::Result<()> {
        Self::pop(cx, Reg::Rax)?;
        emit!(cx, "ret")
    }
}
