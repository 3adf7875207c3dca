//! Construcción de ejecutables.
//!
//! Una vez que se ha emitido código ensamblador, este puede ser
//! ensamblado y enlazado por el driver de C del sistema para producir
//! un binario ejecutable. El valor de la expresión se convierte en el
//! código de salida del proceso (módulo 256).

use std::{
    io::BufWriter,
    path::Path,
    process::{Child, ChildStdin, Command, ExitStatus, Stdio},
};

use crate::arch::Arch;
use bitflags::bitflags;
use thiserror::Error;
use tracing::{debug, info};

bitflags! {
    /// Opciones a aplicar durante el enlazado.
    pub struct LinkOptions: u32 {
        /// Remover símbolos de depuración del ejecutable final.
        const STRIP = 0x01;
    }
}

/// Un error de ensamblado o enlazado.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LinkerError {
    /// Ocurrió un evento de error de E/S durante la invocación
    /// de comandos externos.
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    /// El enlazador inició su ejecución, pero falló en enlazar.
    #[error("Linker exited with status code {0:?}")]
    Failed(ExitStatus),
}

/// Instancia del enlazador para un ejecutable definido.
pub struct Linker {
    child: Child,
    stdin: BufWriter<ChildStdin>,
}

impl Linker {
    /// Inicia una instancia del enlazador.
    ///
    /// El enlazador tratará de emitir un ejecutable y escribirlo a
    /// la ruta indicada por `output`.
    pub fn spawn<O>(arch: Arch, output: &O, opts: LinkOptions) -> Result<Self, LinkerError>
    where
        O: AsRef<Path>,
    {
        let driver = driver_for(arch);

        // Para ensamblar el código generado por codegen, se hace
        // pipe del mismo al stdin del driver
        let mut command = Command::new(&driver);
        command
            .arg("-o")
            .arg(output.as_ref())
            .args(&["-x", "assembler", "-"])
            .stdin(Stdio::piped());

        if opts.contains(LinkOptions::STRIP) {
            command.arg("-s");
        }

        info!(%driver, output = %output.as_ref().display(), "spawning linker");
        let mut child = command.spawn()?;

        let stdin = match child.stdin.take() {
            Some(stdin) => BufWriter::new(stdin),
            None => {
                let _ = child.kill();
                return Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "linker stdin is not available",
                )
                .into());
            }
        };

        Ok(Linker { child, stdin })
    }

    /// Obtiene la entrada estándar del proceso que espera recibir ensamblador.
    ///
    /// Luego de crear una instancia con [`Linker::spawn()`], se debe escribir
    /// código ensamblador en la forma exacta en que fue emitido por las fases
    /// de generación de código.
    pub fn stdin(&mut self) -> &mut BufWriter<ChildStdin> {
        &mut self.stdin
    }

    /// Indica el fin del flujo de código y finaliza el enlazado.
    pub fn finish(mut self) -> Result<(), LinkerError> {
        // Cerrar stdin es lo que le indica EOF al ensamblador
        self.stdin.into_inner().map_err(|error| error.into_error())?;

        let status = self.child.wait()?;
        debug!(?status, "linker finished");

        if status.success() {
            Ok(())
        } else {
            Err(LinkerError::Failed(status))
        }
    }
}

/// Driver de C capaz de ensamblar y enlazar para una arquitectura.
///
/// Si la arquitectura es la del compilador se usa `cc`; de lo contrario
/// se asume una toolchain cruzada de GNU.
fn driver_for(arch: Arch) -> String {
    if arch == Arch::host() {
        String::from("cc")
    } else {
        format!("{}-linux-gnu-gcc", arch)
    }
}
