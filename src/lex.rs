//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone la expresión de
//! entrada en unidades léxicas denominadas tokens. Los espacios en blanco
//! se descartan durante esta operación. Cada token emitido está asociado
//! a una ubicación en el texto original, lo cual permite señalar errores
//! tanto en los mismos como en fases posteriores.
//!
//! # Contenido de un token
//! Este lexer no produce lexemas. Operadores y puntuación se identifican
//! por el hecho de lo que son, mientras que las constantes literales se
//! resuelven a sus valores en vez de preservar sus lexemas. La secuencia
//! siempre termina en exactamente un [`Token::Eof`].
//!
//! # Reglas importantes del lenguaje
//! - Los operadores de dos caracteres (`==`, `!=`, `<=`, `>=`) tienen
//!   prioridad sobre los de un carácter: `<=` nunca es `<` seguido de `=`.
//! - `=` y `!` no son operadores por sí solos.
//! - Las constantes enteras no tienen signo y deben caber en 32 bits.
//!
//! # Errores
//! A diferencia de fases posteriores, el lexer no intenta recuperarse.
//! El primer error termina el flujo de tokens.

use crate::source::{Located, Location, Source};
use std::{
    fmt::{self, Display},
    iter::Peekable,
    ops::Deref,
    rc::Rc,
    str::CharIndices,
};

use thiserror::Error;
use tracing::{debug, trace};

/// Literal entero máximo.
const INT_MAX: i32 = i32::MAX;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LexerError {
    /// Carácter desconocido o inesperado en el flujo de entrada.
    #[error("Bad character {0:?} in input")]
    BadChar(char),

    /// Una constante entera se encuentra fuera de rango.
    #[error("Integer literal overflow, valid range is [0, {}]", INT_MAX)]
    IntOverflow,
}

/// Objeto resultante del análisis léxico.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Literal de entero.
    Number(i32),

    /// `+`
    Plus,

    /// `-`
    Minus,

    /// `*`
    Times,

    /// `/`
    Slash,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `<`
    Less,

    /// `<=`
    LessEqual,

    /// `>`
    Greater,

    /// `>=`
    GreaterEqual,

    /// `==`
    Equal,

    /// `!=`
    NotEqual,

    /// Fin de la entrada.
    Eof,
}

/// Clasificación gruesa de un token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Reserved,
    Number,
    EndOfInput,
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Number(_) => TokenKind::Number,
            Token::Eof => TokenKind::EndOfInput,
            _ => TokenKind::Reserved,
        }
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Number(integer) => write!(fmt, "literal `{}`", integer),
            Plus => fmt.write_str("`+`"),
            Minus => fmt.write_str("`-`"),
            Times => fmt.write_str("`*`"),
            Slash => fmt.write_str("`/`"),
            OpenParen => fmt.write_str("`(`"),
            CloseParen => fmt.write_str("`)`"),
            Less => fmt.write_str("`<`"),
            LessEqual => fmt.write_str("`<=`"),
            Greater => fmt.write_str("`>`"),
            GreaterEqual => fmt.write_str("`>=`"),
            Equal => fmt.write_str("`==`"),
            NotEqual => fmt.write_str("`!=`"),
            Eof => fmt.write_str("end of input"),
        }
    }
}

/// Secuencia completa de tokens de una entrada.
///
/// Solo puede construirse por medio de [`tokenize()`], por lo cual
/// nunca está vacía y siempre termina en exactamente un [`Token::Eof`].
#[derive(Debug, Clone)]
pub struct Tokens(Vec<Located<Token>>);

impl Tokens {
    /// Toma ownership de la secuencia subyacente.
    pub fn into_inner(self) -> Vec<Located<Token>> {
        self.0
    }
}

impl Deref for Tokens {
    type Target = [Located<Token>];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Reduce una entrada completa a su secuencia de tokens.
///
/// La secuencia resultante termina con [`Token::Eof`], ubicado al final
/// de la entrada.
pub fn tokenize(source: &Rc<Source>) -> Result<Tokens, Located<LexerError>> {
    let tokens: Vec<_> = Lexer::new(source).collect::<Result<_, _>>()?;
    debug!(count = tokens.len(), "tokenized input");

    Ok(Tokens(tokens))
}

/// Máquina de estados para análisis léxico.
///
/// Un lexer puede encontrarse en uno de diversos estados. La
/// salida del lexer, así como su siguiente estado, se define
/// a partir de tanto su estado actual como el siguiente carácter
/// encontrado en la entrada.
pub struct Lexer<'a> {
    source: &'a Rc<Source>,
    chars: Peekable<CharIndices<'a>>,
    state: State,
    start: usize,
    next: usize,
}

/// Posibles estados del lexer.
enum State {
    /// Estado que ocurre antes de encontrar el inicio de un token.
    Start,

    /// Estado de error. El lexer ya no emite nada más.
    Error,

    /// Ya se emitió [`Token::Eof`].
    Done,

    /// Estado de completitud; siempre emite el token incluido
    /// y pasa a [`State::Start`].
    Complete(Token),

    /// Se encontró `<`, puede seguir `=`.
    OpenAngle,

    /// Se encontró `>`, puede seguir `=`.
    CloseAngle,

    /// Se encontró `=`, debe seguir otro `=`.
    Equals,

    /// Se encontró `!`, debe seguir `=`.
    Bang,

    /// Constante entera.
    ///
    /// Este estado incluirá dígitos en el token mientras que
    /// el siguiente carácter sea un dígito.
    Integer(i32),
}

impl<'a> Lexer<'a> {
    /// Crea un lexer en estado inicial a partir de una entrada.
    pub fn new(source: &'a Rc<Source>) -> Self {
        Lexer {
            source,
            chars: source.text().char_indices().peekable(),
            state: State::Start,
            start: 0,
            next: 0,
        }
    }

    /// Intenta construir un siguiente token.
    fn lex(&mut self) -> Result<Option<Token>, LexerError> {
        use {State::*, Token::*};

        let token = loop {
            let next_char = self.chars.peek().map(|&(_, c)| c);

            // La posición de origen se mueve junto al siguiente carácter
            // siempre que no se haya encontrado una frontera de token
            if let Start = self.state {
                self.start = self
                    .chars
                    .peek()
                    .map_or(self.source.len(), |&(offset, _)| offset);
            }

            match (&mut self.state, next_char) {
                (Error, _) | (Done, _) => return Ok(None),

                // Tokens triviales
                (Start, None) => break Ok(Eof),
                (Start, Some('+')) => self.state = Complete(Plus),
                (Start, Some('-')) => self.state = Complete(Minus),
                (Start, Some('*')) => self.state = Complete(Times),
                (Start, Some('/')) => self.state = Complete(Slash),
                (Start, Some('(')) => self.state = Complete(OpenParen),
                (Start, Some(')')) => self.state = Complete(CloseParen),

                // Posibles operadores de dos caracteres
                (Start, Some('<')) => self.state = OpenAngle,
                (Start, Some('>')) => self.state = CloseAngle,
                (Start, Some('=')) => self.state = Equals,
                (Start, Some('!')) => self.state = Bang,

                // Inicio de una constante numérica. No se consume el
                // dígito, de eso se encarga el estado de constante entera.
                // Por tanto, la constante es inicialmente cero.
                (Start, Some(c)) if c.is_ascii_digit() => {
                    self.state = Integer(0);
                    continue;
                }

                // Espacios en blanco y caracteres inesperados
                (Start, Some(c)) if c.is_whitespace() => (),
                (Start, Some(c)) => break Err(LexerError::BadChar(c)),

                // Emisión retardada de tokens cualesquiera
                (Complete(token), _) => break Ok(std::mem::replace(token, Eof)),

                (OpenAngle, Some('=')) => self.state = Complete(LessEqual),
                (OpenAngle, _) => break Ok(Less),
                (CloseAngle, Some('=')) => self.state = Complete(GreaterEqual),
                (CloseAngle, _) => break Ok(Greater),
                (Equals, Some('=')) => self.state = Complete(Equal),
                (Equals, _) => break Err(LexerError::BadChar('=')),
                (Bang, Some('=')) => self.state = Complete(NotEqual),
                (Bang, _) => break Err(LexerError::BadChar('!')),

                // Acumulación dígito por dígito de constantes enteras
                (Integer(accumulated), Some(digit)) if digit.is_ascii_digit() => {
                    let digit = (digit as u8 - b'0') as i32;

                    match accumulated
                        .checked_mul(10)
                        .and_then(|n| n.checked_add(digit))
                    {
                        Some(result) => *accumulated = result,
                        None => break Err(LexerError::IntOverflow),
                    }
                }

                // Si sigue algo que no es un dígito, la constante ha terminado
                (Integer(integer), _) => break Ok(Number(*integer)),
            }

            // Si no hubo `continue`, aquí se consume el carácter que
            // se observó con lookahead anteriormente
            if let Some((offset, c)) = self.chars.next() {
                self.next = offset + c.len_utf8();
            }
        };

        token.map(Some)
    }

    /// Ubicación del error que acaba de ocurrir.
    fn error_location(&self, error: &LexerError) -> Location {
        let len = match error {
            LexerError::BadChar(c) => c.len_utf8(),

            // Se incluye el dígito que causó el desborde
            LexerError::IntOverflow => self.next - self.start + 1,
        };

        Location::at(self.source, self.start, len)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Located<Token>, Located<LexerError>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lex() {
            Ok(None) => None,
            Ok(Some(token)) => {
                self.state = match token {
                    Token::Eof => State::Done,
                    _ => State::Start,
                };

                let len = self.next.saturating_sub(self.start);
                let location = Location::at(self.source, self.start, len);
                trace!(%token, %location, "token");

                Some(Ok(Located::at(token, location)))
            }

            Err(error) => {
                let location = self.error_location(&error);
                self.state = State::Error;

                Some(Err(Located::at(error, location)))
            }
        }
    }
}
