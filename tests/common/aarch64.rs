//! Subconjunto de AArch64: `mov`/`movk`, ranuras de pila de 16 bytes con
//! `str`/`ldr` pre y post-indexados, aritmética de tres operandos y `cset`.

use anyhow::{anyhow, bail, ensure, Context, Result};

const SLOT_SIZE: i64 = 16;

#[derive(Default)]
struct Machine {
    x: [i64; 2],
    sp: i64,
    slots: Vec<i64>,
    compared: Option<(i64, i64)>,
}

impl Machine {
    fn reg(&mut self, name: &str) -> Result<&mut i64> {
        match name {
            "x0" => Ok(&mut self.x[0]),
            "x1" => Ok(&mut self.x[1]),
            _ => bail!("unknown register {}", name),
        }
    }

    fn read(&mut self, name: &str) -> Result<i64> {
        self.reg(name).map(|value| *value)
    }

    /// Aplica una operación de la forma `op xd, xn, xm`.
    fn three(&mut self, operands: &[&str], op: fn(i64, i64) -> i64) -> Result<()> {
        match operands {
            [d, n, m] => {
                let result = op(self.read(n)?, self.read(m)?);
                *self.reg(d)? = result;
                Ok(())
            }

            _ => bail!("expected three operands: {:?}", operands),
        }
    }

    fn move_sp(&mut self, delta: i64) -> Result<()> {
        self.sp += delta;
        ensure!(self.sp <= 0, "sp moved above its initial value");
        ensure!(self.sp % SLOT_SIZE == 0, "sp is misaligned: {}", self.sp);
        Ok(())
    }
}

fn immediate(operand: &str) -> Result<i64> {
    let digits = operand.strip_prefix('#').context("expected an immediate")?;
    Ok(digits.parse()?)
}

pub fn execute(asm: &str) -> Result<i64> {
    let mut machine = Machine::default();

    for line in asm.lines() {
        let (opcode, operands) = match super::instruction(line) {
            Some(instruction) => instruction,
            None => continue,
        };

        match (opcode, operands.as_slice()) {
            // `mov` con inmediato pone en cero el resto del registro
            ("mov", [reg, value]) => {
                let value = immediate(value)?;
                ensure!((0..=0xffff).contains(&value), "mov immediate out of range");
                *machine.reg(reg)? = value;
            }

            ("movk", [reg, value, "lsl #16"]) => {
                let value = immediate(value)?;
                ensure!((0..=0xffff).contains(&value), "movk immediate out of range");

                let reg = machine.reg(reg)?;
                *reg = (*reg & !0xffff_0000) | (value << 16);
            }

            ("str", [reg, "[sp", "#-16]!"]) => {
                let value = machine.read(reg)?;
                machine.move_sp(-SLOT_SIZE)?;
                machine.slots.push(value);
            }

            ("ldr", [reg, "[sp]", "#16"]) => {
                let value = machine.slots.pop().context("load from empty stack")?;
                machine.move_sp(SLOT_SIZE)?;
                *machine.reg(reg)? = value;
            }

            ("add", operands) => machine.three(operands, i64::wrapping_add)?,
            ("sub", operands) => machine.three(operands, i64::wrapping_sub)?,
            ("mul", operands) => machine.three(operands, i64::wrapping_mul)?,

            // `sdiv` no genera excepciones: dividir entre cero produce cero
            ("sdiv", operands) => machine.three(operands, |a, b| {
                if b == 0 {
                    0
                } else {
                    a.wrapping_div(b)
                }
            })?,

            ("cmp", [a, b]) => {
                let compared = (machine.read(a)?, machine.read(b)?);
                machine.compared = Some(compared);
            }

            ("cset", [reg, condition]) => {
                let (a, b) = machine.compared.context("cset without a previous cmp")?;
                let flag = match *condition {
                    "eq" => a == b,
                    "ne" => a != b,
                    "lt" => a < b,
                    "le" => a <= b,
                    _ => bail!("unknown condition {}", condition),
                };

                *machine.reg(reg)? = flag as i64;
            }

            ("ret", []) => {
                ensure!(machine.slots.is_empty(), "stack not balanced at ret");
                ensure!(machine.sp == 0, "sp not restored at ret");
                return Ok(machine.x[0]);
            }

            _ => bail!("unsupported instruction: {}", line.trim()),
        }
    }

    Err(anyhow!("routine ended without ret"))
}
