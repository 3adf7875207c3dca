//! Subconjunto de x86-64: `push`, `pop`, aritmética sobre `rax`/`rdi`,
//! `cqo`/`idiv` y comparaciones materializadas con `setcc`.

use anyhow::{anyhow, bail, ensure, Context, Result};

#[derive(Default)]
struct Machine {
    rax: i64,
    rdi: i64,
    rdx: i64,
    stack: Vec<i64>,
    compared: Option<(i64, i64)>,
}

impl Machine {
    fn reg(&mut self, name: &str) -> Result<&mut i64> {
        match name {
            "rax" => Ok(&mut self.rax),
            "rdi" => Ok(&mut self.rdi),
            "rdx" => Ok(&mut self.rdx),
            _ => bail!("unknown register {}", name),
        }
    }

    fn compared(&self) -> Result<(i64, i64)> {
        self.compared.context("setcc without a previous cmp")
    }
}

pub fn execute(asm: &str) -> Result<i64> {
    let mut machine = Machine::default();

    for line in asm.lines() {
        let (opcode, operands) = match super::instruction(line) {
            Some(instruction) => instruction,
            None => continue,
        };

        match (opcode, operands.as_slice()) {
            ("push", [value]) => {
                let value = match value.parse::<i64>() {
                    Ok(value) => value,
                    Err(_) => *machine.reg(value)?,
                };

                machine.stack.push(value);
            }

            ("pop", [reg]) => {
                let value = machine.stack.pop().context("pop from empty stack")?;
                *machine.reg(reg)? = value;
            }

            ("add", ["rax", "rdi"]) => machine.rax = machine.rax.wrapping_add(machine.rdi),
            ("sub", ["rax", "rdi"]) => machine.rax = machine.rax.wrapping_sub(machine.rdi),
            ("imul", ["rax", "rdi"]) => machine.rax = machine.rax.wrapping_mul(machine.rdi),

            ("cqo", []) => machine.rdx = if machine.rax < 0 { -1 } else { 0 },
            ("idiv", ["rdi"]) => {
                ensure!(
                    machine.rdx == if machine.rax < 0 { -1 } else { 0 },
                    "idiv without sign extension"
                );

                machine.rax = machine.rax.checked_div(machine.rdi).context("#DE")?;
            }

            ("cmp", ["rax", "rdi"]) => machine.compared = Some((machine.rax, machine.rdi)),
            ("sete", ["al"]) | ("setne", ["al"]) | ("setl", ["al"]) | ("setle", ["al"]) => {
                let (a, b) = machine.compared()?;
                let flag = match opcode {
                    "sete" => a == b,
                    "setne" => a != b,
                    "setl" => a < b,
                    _ => a <= b,
                };

                machine.rax = (machine.rax & !0xff) | flag as i64;
            }

            ("movzb", ["rax", "al"]) => machine.rax &= 0xff,

            ("ret", []) => {
                ensure!(machine.stack.is_empty(), "stack not balanced at ret");
                return Ok(machine.rax);
            }

            _ => bail!("unsupported instruction: {}", line.trim()),
        }
    }

    Err(anyhow!("routine ended without ret"))
}
