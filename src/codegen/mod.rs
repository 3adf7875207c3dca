//! Generación de código para una máquina de pila.
//!
//! El AST se recorre en post-orden: para cada operación se genera
//! primero el operando izquierdo, luego el derecho, y finalmente se
//! desapilan ambos, se combinan y se apila el resultado. Al terminar
//! queda exactamente un valor en la pila, el cual se convierte en el
//! valor de retorno de la rutina generada.

use crate::{
    arch::{Arch, Emitter},
    parse::{Ast, Expr},
};

use std::io::{self, Write};
use tracing::{debug, trace};

/// Contexto de emisión.
pub struct Context<'a> {
    output: &'a mut dyn Write,
}

impl<'a> Context<'a> {
    /// Flujo de salida del código ensamblador.
    pub fn output(&mut self) -> &mut dyn Write {
        &mut *self.output
    }
}

/// Emite una rutina completa, incluyendo directivas de ensamblador.
///
/// `entry` es el símbolo global de la rutina. La salida es idéntica
/// para un mismo AST, arquitectura y símbolo de entrada.
pub fn emit<W: Write>(ast: &Ast, arch: Arch, entry: &str, output: &mut W) -> io::Result<()> {
    debug!(%arch, entry, "emitting assembly");

    let mut cx = Context { output };
    dispatch_arch!(E: arch => {
        E::prologue(&mut cx, entry)?;
        body::<E>(&mut cx, ast.root())?;
        E::epilogue(&mut cx)
    })
}

/// Genera el código ensamblador de una rutina `main` en memoria.
pub fn generate(ast: &Ast, arch: Arch) -> io::Result<String> {
    let mut output = Vec::new();
    emit(ast, arch, "main", &mut output)?;

    Ok(String::from_utf8_lossy(&output).into_owned())
}

fn body<E: Emitter>(cx: &mut Context<'_>, root: &Expr) -> io::Result<()> {
    for node in root.post_order() {
        match node {
            Expr::Num(value) => {
                trace!(value, "constant");
                E::push_const(cx, *value)?;
            }

            Expr::Binary { op, .. } => {
                // El operando derecho fue el último en apilarse
                trace!(%op, "operation");
                E::pop(cx, E::OPERAND)?;
                E::pop(cx, E::ACCUMULATOR)?;
                E::apply(cx, *op)?;
                E::push(cx, E::ACCUMULATOR)?;
            }
        }
    }

    Ok(())
}
