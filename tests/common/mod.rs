//! Simuladores mínimos de los subconjuntos de cada arquitectura que emite
//! el compilador.

#![allow(dead_code)]

mod aarch64;
mod x86_64;

use anyhow::{anyhow, Result};
use arithc::{
    parse::{Ast, Config},
    source::Source,
    target::{self, Arch},
};

/// Compila una expresión con la configuración por defecto.
pub fn compile(input: &str, arch: Arch) -> Result<(Ast, String)> {
    let source = Source::new(input);
    let ast = arithc::compile(&source, Config::default()).map_err(|error| anyhow!("{}", error))?;
    let asm = target::generate(&ast, arch)?;

    Ok((ast, asm))
}

/// Compila una expresión a ensamblador x86-64.
pub fn compile_x86_64(input: &str) -> Result<(Ast, String)> {
    compile(input, Arch::X86_64)
}

/// Compila y ejecuta una expresión en x86-64, retornando el valor que queda en `rax`.
pub fn run(input: &str) -> Result<i64> {
    let (_, asm) = compile_x86_64(input)?;
    execute(&asm)
}

/// Ejecuta una rutina emitida para x86-64 hasta su `ret`.
pub fn execute(asm: &str) -> Result<i64> {
    x86_64::execute(asm)
}

/// Ejecuta una rutina emitida para la arquitectura indicada.
pub fn execute_on(arch: Arch, asm: &str) -> Result<i64> {
    match arch {
        Arch::X86_64 => x86_64::execute(asm),
        Arch::Aarch64 => aarch64::execute(asm),
    }
}

/// Separa una línea en opcode y operandos. Retorna `None` para
/// directivas, etiquetas y líneas vacías.
fn instruction(line: &str) -> Option<(&str, Vec<&str>)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('.') || line.ends_with(':') {
        return None;
    }

    let (opcode, operands) = match line.split_once(char::is_whitespace) {
        Some((opcode, operands)) => (opcode, operands.trim()),
        None => (line, ""),
    };

    let operands = operands
        .split(',')
        .map(str::trim)
        .filter(|operand| !operand.is_empty())
        .collect();

    Some((opcode, operands))
}
