//! Rastreo de ubicaciones originales en código fuente.
//!
//! Los distintos objetos internos que el compilador construye
//! deben llevar cuenta de rangos de bytes en la expresión original,
//! lo cual permite señalar el punto exacto en donde ocurre un error.
//! Como la entrada es una sola línea, una ubicación es simplemente
//! un desplazamiento en bytes y una longitud.

use std::{
    fmt::{self, Debug, Display, Formatter},
    rc::Rc,
};

/// Texto fuente completo de una compilación.
#[derive(Debug)]
pub struct Source {
    text: String,
}

impl Source {
    /// Construye un origen compartido a partir del texto de entrada.
    pub fn new<S: Into<String>>(text: S) -> Rc<Self> {
        Rc::new(Source { text: text.into() })
    }

    /// Obtiene el texto original.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Longitud en bytes de la entrada.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Indica si la entrada no contiene ningún byte.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Un objeto cualquiera con una posición original asociada.
#[derive(Debug, Clone)]
pub struct Located<T> {
    location: Location,
    value: T,
}

impl<T> Located<T> {
    /// Obtiene el valor.
    pub fn val(&self) -> &T {
        &self.value
    }

    /// Obtiene la ubicación.
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Descarta la ubicación y toma ownership del valor.
    pub fn into_inner(self) -> T {
        self.value
    }

    /// Construye a partir de un valor y una ubicación.
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}

/// Una ubicación está conformada por un origen y un rango de bytes.
#[derive(Clone)]
pub struct Location {
    from: Rc<Source>,
    offset: usize,
    len: usize,
}

impl Location {
    /// Construye una ubicación de `len` bytes a partir de `offset`.
    pub fn at(from: &Rc<Source>, offset: usize, len: usize) -> Self {
        Location {
            from: Rc::clone(from),
            offset,
            len,
        }
    }

    /// Desplazamiento en bytes desde el inicio de la entrada.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Cantidad de bytes que abarca la ubicación.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Indica si la ubicación no abarca bytes, como la de [`Token::Eof`].
    ///
    /// [`Token::Eof`]: crate::lex::Token::Eof
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Origen al que pertenece esta ubicación.
    pub fn source(&self) -> &Rc<Source> {
        &self.from
    }
}

impl Display for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        if self.len <= 1 {
            // Solo se señala un byte en específico
            write!(formatter, "{}", self.offset)
        } else {
            write!(formatter, "[{}-{}]", self.offset, self.offset + self.len - 1)
        }
    }
}

impl Debug for Location {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, formatter)
    }
}
