//! Análisis sintáctico.
//!
//! # Gramática
//! De menor a mayor precedencia:
//!
//! ```text
//! expr       = equality
//! equality   = relational (("==" | "!=") relational)*
//! relational = additive (("<" | "<=" | ">" | ">=") additive)*
//! additive   = term (("+" | "-") term)*
//! term       = unary (("*" | "/") unary)*
//! unary      = ("+" | "-")? primary
//! primary    = NUMBER | "(" expr ")"
//! ```
//!
//! La gramática es LL(1), por lo cual el parser nunca retrocede. Cada
//! nivel con repetición se implementa como un pliegue iterativo hacia la
//! izquierda, de forma que operadores de igual precedencia asocian a la
//! izquierda y la profundidad de recursión depende únicamente del
//! anidamiento de paréntesis.
//!
//! # Recorridos
//! Generación de código, evaluación y destrucción del AST recorren el
//! árbol con una pila explícita (ver [`Expr::post_order()`]), por lo que
//! una cadena plana como `1+1+...+1` no consume pila nativa en ninguna
//! fase.
//!
//! # Normalización
//! El AST no tiene nodos "mayor que". `a > b` se construye como `b < a`
//! y `a >= b` como `b <= a`. Asimismo, `-a` se construye como `0 - a` y
//! `+a` es simplemente `a`.

use std::{
    fmt::{self, Display},
    mem,
};

use bitflags::bitflags;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    lex::{Token, Tokens},
    source::{Located, Location},
};

/// Anidamiento máximo de paréntesis por defecto.
///
/// Cada nivel de paréntesis cuesta siete marcos de recursión en el parser.
pub const DEFAULT_MAX_NESTING: usize = 256;

/// Altura máxima del AST por defecto.
///
/// Una cadena de `n` operadores binarios produce un árbol de altura
/// `n + 1`, aun sin paréntesis.
pub const DEFAULT_MAX_HEIGHT: usize = 1 << 16;

bitflags! {
    /// Opciones que alteran la aceptación de programas.
    pub struct Options: u32 {
        /// Ignorar tokens sobrantes luego de una expresión completa.
        ///
        /// Sin esta opción, `1 2` es un error de sintaxis. Con ella,
        /// el resultado es la expresión `1`.
        const ALLOW_TRAILING = 0x01;
    }
}

/// Configuración del parser.
#[derive(Copy, Clone, Debug)]
pub struct Config {
    pub options: Options,

    /// Máximo anidamiento de paréntesis.
    pub max_nesting: usize,

    /// Máxima altura del AST. Acota tanto el anidamiento de paréntesis
    /// como la longitud de cadenas de operadores.
    pub max_height: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            options: Options::empty(),
            max_nesting: DEFAULT_MAX_NESTING,
            max_height: DEFAULT_MAX_HEIGHT,
        }
    }
}

/// Árbol sintáctico de una expresión completa.
#[derive(Debug, PartialEq, Eq)]
pub struct Ast(Expr);

impl Ast {
    /// Obtiene la raíz del árbol.
    pub fn root(&self) -> &Expr {
        &self.0
    }

    /// Evalúa la expresión directamente, ver [`Expr::evaluate()`].
    pub fn evaluate(&self) -> Option<i64> {
        self.0.evaluate()
    }
}

impl From<Expr> for Ast {
    fn from(root: Expr) -> Self {
        Ast(root)
    }
}

/// Nodo del AST.
///
/// Cada nodo tiene un único dueño: su padre o, para la raíz, el [`Ast`].
#[derive(Debug, PartialEq, Eq)]
pub enum Expr {
    /// Constante entera.
    Num(i32),

    /// Operación binaria. `left` se evalúa primero.
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
        height: usize,
    },
}

impl Expr {
    /// Construye una operación binaria.
    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        let height = 1 + left.height().max(right.height());
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
            height,
        }
    }

    /// Altura del subárbol, donde una hoja tiene altura 1.
    pub fn height(&self) -> usize {
        match self {
            Expr::Num(_) => 1,
            Expr::Binary { height, .. } => *height,
        }
    }

    /// Recorre el subárbol en post-orden: operandos izquierdo y derecho
    /// antes que su operación.
    pub fn post_order(&self) -> PostOrder<'_> {
        PostOrder {
            pending: vec![(self, false)],
        }
    }

    /// Evalúa el subárbol con la misma semántica que el código generado.
    ///
    /// Suma, resta y multiplicación truncan a 64 bits. La división trunca
    /// hacia cero. Retorna `None` si ocurre una división por cero o una
    /// división que el hardware no puede representar (`i64::MIN / -1`).
    pub fn evaluate(&self) -> Option<i64> {
        let mut stack = Vec::new();
        for node in self.post_order() {
            let value = match node {
                Expr::Num(value) => *value as i64,
                Expr::Binary { op, .. } => {
                    let b = stack.pop()?;
                    let a = stack.pop()?;
                    op.apply(a, b)?
                }
            };

            stack.push(value);
        }

        stack.pop()
    }

    /// Mueve a `pending` los hijos que a su vez son operaciones,
    /// dejando hojas en su lugar.
    fn detach_children(&mut self, pending: &mut Vec<Expr>) {
        if let Expr::Binary { left, right, .. } = self {
            for child in [left, right] {
                if matches!(**child, Expr::Binary { .. }) {
                    pending.push(mem::replace(&mut **child, Expr::Num(0)));
                }
            }
        }
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.detach_children(&mut pending);

        // Cada nodo se destruye ya sin subárboles
        while let Some(mut node) = pending.pop() {
            node.detach_children(&mut pending);
        }
    }
}

/// Iterador de [`Expr::post_order()`].
pub struct PostOrder<'a> {
    /// Nodos por visitar; `true` si sus hijos ya fueron apilados.
    pending: Vec<(&'a Expr, bool)>,
}

impl<'a> Iterator for PostOrder<'a> {
    type Item = &'a Expr;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((node, expanded)) = self.pending.pop() {
            match node {
                Expr::Binary { left, right, .. } if !expanded => {
                    self.pending.push((node, true));
                    self.pending.push((&**right, false));
                    self.pending.push((&**left, false));
                }

                _ => return Some(node),
            }
        }

        None
    }
}

/// Operador binario.
///
/// Solo existen cuatro comparaciones; `>` y `>=` se normalizan durante
/// el análisis sintáctico.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Le,
}

impl BinOp {
    /// Aplica el operador a dos valores ya evaluados.
    pub fn apply(self, a: i64, b: i64) -> Option<i64> {
        use BinOp::*;

        let result = match self {
            Add => a.wrapping_add(b),
            Sub => a.wrapping_sub(b),
            Mul => a.wrapping_mul(b),
            Div => a.checked_div(b)?,
            Eq => (a == b) as i64,
            Ne => (a != b) as i64,
            Lt => (a < b) as i64,
            Le => (a <= b) as i64,
        };

        Some(result)
    }
}

impl Display for BinOp {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use BinOp::*;

        let string = match self {
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Eq => "==",
            Ne => "!=",
            Lt => "<",
            Le => "<=",
        };

        fmt.write_str(string)
    }
}

#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParserError {
    #[error("Expected a number, found {0} instead")]
    ExpectedNumber(Token),

    #[error("Missing closing parenthesis, found {0} instead")]
    MissingCloseParen(Token),

    #[error("Unexpected {0} after end of expression")]
    TrailingInput(Token),

    #[error("Parentheses nested deeper than the limit of {0}")]
    TooDeep(usize),

    #[error("Expression tree taller than the limit of {0}")]
    TooTall(usize),
}

type Parse<T> = Result<T, Located<ParserError>>;

/// Construye el AST a partir de una secuencia de tokens.
pub fn parse(tokens: &Tokens, config: Config) -> Parse<Ast> {
    let mut parser = Parser {
        tokens: &tokens[..],
        cursor: 0,
        nesting: 0,
        config,
    };

    let root = parser.expr()?;

    if *parser.peek() != Token::Eof {
        if config.options.contains(Options::ALLOW_TRAILING) {
            let trailing = parser.located();
            warn!(token = %trailing.val(), location = %trailing.location(), "ignoring trailing input");
        } else {
            let found = parser.peek().clone();
            return parser.fail(ParserError::TrailingInput(found));
        }
    }

    debug!(height = root.height(), "parsed expression");
    Ok(Ast(root))
}

/// Estado explícito del parser: secuencia de tokens y cursor.
///
/// El cursor solo avanza y nunca pasa del [`Token::Eof`] final.
struct Parser<'a> {
    tokens: &'a [Located<Token>],
    cursor: usize,
    nesting: usize,
    config: Config,
}

impl<'a> Parser<'a> {
    fn expr(&mut self) -> Parse<Expr> {
        self.equality()
    }

    fn equality(&mut self) -> Parse<Expr> {
        let mut node = self.relational()?;

        loop {
            let op = match self.peek() {
                Token::Equal => BinOp::Eq,
                Token::NotEqual => BinOp::Ne,
                _ => break Ok(node),
            };

            let location = self.advance();
            let right = self.relational()?;
            node = self.fold(op, node, right, location)?;
        }
    }

    fn relational(&mut self) -> Parse<Expr> {
        let mut node = self.additive()?;

        loop {
            // `swap` indica un operador "mayor que" normalizado
            let (op, swap) = match self.peek() {
                Token::Less => (BinOp::Lt, false),
                Token::LessEqual => (BinOp::Le, false),
                Token::Greater => (BinOp::Lt, true),
                Token::GreaterEqual => (BinOp::Le, true),
                _ => break Ok(node),
            };

            let location = self.advance();
            let right = self.additive()?;

            node = if swap {
                self.fold(op, right, node, location)?
            } else {
                self.fold(op, node, right, location)?
            };
        }
    }

    fn additive(&mut self) -> Parse<Expr> {
        let mut node = self.term()?;

        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break Ok(node),
            };

            let location = self.advance();
            let right = self.term()?;
            node = self.fold(op, node, right, location)?;
        }
    }

    fn term(&mut self) -> Parse<Expr> {
        let mut node = self.unary()?;

        loop {
            let op = match self.peek() {
                Token::Times => BinOp::Mul,
                Token::Slash => BinOp::Div,
                _ => break Ok(node),
            };

            let location = self.advance();
            let right = self.unary()?;
            node = self.fold(op, node, right, location)?;
        }
    }

    fn unary(&mut self) -> Parse<Expr> {
        match self.peek() {
            Token::Plus => {
                self.advance();
                self.primary()
            }

            Token::Minus => {
                let location = self.advance();
                let operand = self.primary()?;
                self.fold(BinOp::Sub, Expr::Num(0), operand, location)
            }

            _ => self.primary(),
        }
    }

    fn primary(&mut self) -> Parse<Expr> {
        match *self.peek() {
            Token::Number(value) => {
                self.advance();
                Ok(Expr::Num(value))
            }

            Token::OpenParen => {
                let location = self.advance();

                self.nesting += 1;
                if self.nesting > self.config.max_nesting {
                    let error = ParserError::TooDeep(self.config.max_nesting);
                    return Err(Located::at(error, location));
                }

                let node = self.expr()?;
                self.expect(Token::CloseParen, ParserError::MissingCloseParen)?;

                self.nesting -= 1;
                Ok(node)
            }

            ref found => {
                let found = found.clone();
                self.fail(ParserError::ExpectedNumber(found))
            }
        }
    }

    /// Construye un nodo binario, verificando la altura máxima.
    fn fold(&self, op: BinOp, left: Expr, right: Expr, location: Location) -> Parse<Expr> {
        let node = Expr::binary(op, left, right);
        if node.height() > self.config.max_height {
            let error = ParserError::TooTall(self.config.max_height);
            Err(Located::at(error, location))
        } else {
            Ok(node)
        }
    }

    fn expect(&mut self, token: Token, error: fn(Token) -> ParserError) -> Parse<()> {
        if *self.peek() == token {
            self.advance();
            Ok(())
        } else {
            let found = self.peek().clone();
            self.fail(error(found))
        }
    }

    fn peek(&self) -> &'a Token {
        self.located().val()
    }

    fn located(&self) -> &'a Located<Token> {
        // `Tokens` nunca está vacío y termina en `Eof`
        let last = self.tokens.len() - 1;
        &self.tokens[self.cursor.min(last)]
    }

    /// Consume el token actual y retorna su ubicación.
    fn advance(&mut self) -> Location {
        let location = self.located().location().clone();
        if *self.peek() != Token::Eof {
            self.cursor += 1;
        }

        location
    }

    fn fail<T>(&self, error: ParserError) -> Parse<T> {
        Err(Located::at(error, self.located().location().clone()))
    }
}
