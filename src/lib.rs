//! Compilador de expresiones aritméticas a ensamblador de máquina de pila.
//!
//! # Front end
//! Cada compilación deriva de una única expresión. Esta se somete
//! primero a análisis léxico en [`lex`], de lo cual se obtiene una
//! secuencia de tokens. La secuencia de tokens se dispone en un AST
//! por medio de análisis sintáctico descendente recursivo en [`parse`].
//! Ninguna fase vuelve sobre la salida de una fase anterior.
//!
//! # Back end
//! El AST se recorre en post-orden en [`target`], emitiendo instrucciones
//! de una máquina de pila que usa la pila nativa del procesador y dos
//! registros de trabajo. Opcionalmente, el ensamblador resultante se
//! ensambla y enlaza en [`link`] por medio de la toolchain del sistema.
//!
//! # Errores
//! Todo error es fatal. Cada error conserva la ubicación exacta en bytes
//! del carácter o token que lo causó, lo cual [`error::Diagnostics`]
//! utiliza para señalarlo.

#[macro_use]
mod macros;

pub mod error;
pub mod lex;
pub mod link;
pub mod parse;
pub mod source;

mod arch;
mod codegen;

use std::rc::Rc;

/// Emisión de código.
///
/// Este módulo reexporta suficientes ítems internos relacionados a generación de código para
/// traducir un AST a alguna arquitectura en específico.
pub mod target {
    pub use crate::arch::Arch;
    pub use crate::codegen::{emit, generate};
}

/// Ejecuta las fases delanteras sobre una expresión completa.
pub fn compile(
    source: &Rc<source::Source>,
    config: parse::Config,
) -> Result<parse::Ast, error::CompileError> {
    let tokens = lex::tokenize(source)?;
    let ast = parse::parse(&tokens, config)?;

    Ok(ast)
}
