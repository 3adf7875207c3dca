//! Reporte de errores de compilación.
//!
//! Todo error de compilación es fatal y se reporta uno solo por
//! ejecución. El formato apunta al byte exacto del problema:
//!
//! ```text
//! 1&2
//!  ^ lexical error: Bad character '&' in input
//! ```

use crate::{
    lex::LexerError,
    parse::ParserError,
    source::{Located, Location},
};

use std::{
    error::Error,
    fmt::{self, Display},
};

use thiserror::Error;

mod sealed {
    pub trait Sealed {}
}

pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
}

/// Error de cualquiera de las fases delanteras.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("{}", .0.val())]
    Lexer(Located<LexerError>),

    #[error("{}", .0.val())]
    Parser(Located<ParserError>),
}

impl From<Located<LexerError>> for CompileError {
    fn from(error: Located<LexerError>) -> Self {
        CompileError::Lexer(error)
    }
}

impl From<Located<ParserError>> for CompileError {
    fn from(error: Located<ParserError>) -> Self {
        CompileError::Parser(error)
    }
}

impl CompileError {
    /// Ubicación del error en la entrada.
    pub fn location(&self) -> &Location {
        match self {
            CompileError::Lexer(error) => error.location(),
            CompileError::Parser(error) => error.location(),
        }
    }
}

/// Reporte listo para mostrarse al usuario.
pub struct Diagnostics {
    kind: &'static str,
    error: Box<dyn 'static + LocatedError>,
}

impl Diagnostics {
    pub fn kind(self, kind: &'static str) -> Self {
        Diagnostics { kind, ..self }
    }

    /// Desplazamiento en bytes señalado por el reporte.
    pub fn offset(&self) -> usize {
        self.error.location().offset()
    }
}

impl<E: 'static + LocatedError> From<E> for Diagnostics {
    fn from(error: E) -> Self {
        Diagnostics {
            kind: "error",
            error: Box::new(error),
        }
    }
}

impl From<CompileError> for Diagnostics {
    fn from(error: CompileError) -> Self {
        match error {
            CompileError::Lexer(error) => Diagnostics::from(error).kind("lexical error"),
            CompileError::Parser(error) => Diagnostics::from(error).kind("syntax error"),
        }
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Diagnostics { kind, error } = self;
        let location = error.location();

        writeln!(fmt, "{}", location.source().text())?;
        writeln!(
            fmt,
            "{:skip$}^ {}: {}",
            "",
            kind,
            error.source(),
            skip = location.offset()
        )
    }
}

impl<E: Error> sealed::Sealed for Located<E> {}

impl<E: Error> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lex::tokenize,
        parse::{parse, Config},
        source::Source,
    };

    fn report(input: &str) -> String {
        let source = Source::new(input);
        let result = tokenize(&source)
            .map_err(CompileError::from)
            .and_then(|tokens| parse(&tokens, Config::default()).map_err(CompileError::from));

        let error = result.expect_err("compilation succeeded");
        Diagnostics::from(error).to_string()
    }

    #[test]
    fn lexical_error_caret() {
        assert_eq!(
            report("1&2"),
            "1&2\n ^ lexical error: Bad character '&' in input\n"
        );
    }

    #[test]
    fn syntax_error_caret_past_end() {
        assert_eq!(
            report("1+"),
            "1+\n  ^ syntax error: Expected a number, found end of input instead\n"
        );
    }

    #[test]
    fn caret_counts_bytes() {
        // El espacio no separable ocupa dos bytes
        let text = report("\u{a0}&");
        assert_eq!(text.lines().nth(1), Some("  ^ lexical error: Bad character '&' in input"));

        let text = report("  (1 + 2");
        assert_eq!(
            text.lines().nth(1),
            Some("        ^ syntax error: Missing closing parenthesis, found end of input instead")
        );
    }

    #[test]
    fn location_of_compile_error() {
        let source = Source::new("3 * )");
        let tokens = tokenize(&source).expect("lexing failed");
        let error = CompileError::from(parse(&tokens, Config::default()).unwrap_err());

        assert_eq!(error.location().offset(), 4);
        assert_eq!(error.to_string(), "Expected a number, found `)` instead");
    }
}
