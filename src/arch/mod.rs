//! Detalles específicos para cada arquitectura objetivo.
//!
//! Este módulo expone interfaces de generación de código
//! y de parámetros de arquitectura que son implementadas
//! por sus propios submódulos. En general, debe utilizarse
//! la macro `dispatch_arch!()` para acceder a estas
//! implementaciones.

use crate::{codegen::Context, parse::BinOp};

use std::{
    fmt::{self, Display},
    io,
    str::FromStr,
};

/// Arquitectura de procesador (ISA).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
}

impl Arch {
    /// Nombre canónico de la arquitectura.
    pub fn name(self) -> &'static str {
        match self {
            Arch::X86_64 => "x86_64",
            Arch::Aarch64 => "aarch64",
        }
    }

    /// Arquitectura sobre la que corre el compilador.
    pub fn host() -> Self {
        if cfg!(target_arch = "aarch64") {
            Arch::Aarch64
        } else {
            Arch::X86_64
        }
    }
}

impl FromStr for Arch {
    type Err = ();

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        match string {
            "x86_64" | "x86-64" => Ok(Arch::X86_64),
            "aarch64" | "arm64" => Ok(Arch::Aarch64),
            _ => Err(()),
        }
    }
}

impl Display for Arch {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str(self.name())
    }
}

mod aarch64;
mod x86_64;

pub use aarch64::Emitter as Aarch64;
pub use x86_64::Emitter as X86_64;

/// Emisión de código ensamblador para una máquina de pila.
///
/// La pila de evaluación es la pila nativa de la máquina. Los tipos
/// que implementan este trait traducen las operaciones primitivas de
/// esa pila a instrucciones de la arquitectura objetivo.
pub trait Emitter {
    /// Tipo de registro.
    type Register: Register;

    /// Registro A: operando izquierdo y resultado.
    const ACCUMULATOR: Self::Register;

    /// Registro B: operando derecho.
    const OPERAND: Self::Register;

    /// Directivas de ensamblador y etiqueta de entrada.
    fn prologue(cx: &mut Context<'_>, entry: &str) -> io::Result<()>;

    /// Apila una constante.
    fn push_const(cx: &mut Context<'_>, value: i32) -> io::Result<()>;

    /// Apila el contenido de un registro.
    fn push(cx: &mut Context<'_>, reg: Self::Register) -> io::Result<()>;

    /// Desapila hacia un registro.
    fn pop(cx: &mut Context<'_>, reg: Self::Register) -> io::Result<()>;

    /// Calcula `A op B`, dejando el resultado en A.
    ///
    /// Las comparaciones producen 0 o 1.
    fn apply(cx: &mut Context<'_>, op: BinOp) -> io::Result<()>;

    /// Desapila el resultado final hacia el registro de retorno y retorna.
    fn epilogue(cx: &mut Context<'_>) -> io::Result<()>;
}

/// Registro de procesador.
pub trait Register: Copy + Display {}
