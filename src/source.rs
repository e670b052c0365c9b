//! Texto fuente y posiciones dentro de él.
//!
//! Tokens, nodos de árbol y diagnósticos cargan consigo el tramo del
//! texto del que provienen. Todas las ubicaciones comparten por medio
//! de `Rc` un mismo [`Source`], de donde los diagnósticos recuperan la
//! línea original para subrayarla.

use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::Range,
    rc::Rc,
};

/// Columnas entre paradas de tabulador.
const TAB_STOP: u32 = 4;

/// Texto de entrada bajo un nombre, típicamente una ruta.
pub struct Source {
    name: String,
    text: String,
    lines: Vec<String>,
}

impl Source {
    /// Descarta blancos al inicio y al final, de modo que 1:1 es el
    /// primer carácter significativo.
    pub fn new<S: Into<String>>(name: S, text: &str) -> Rc<Self> {
        let text = String::from(text.trim());
        let lines = text.lines().map(String::from).collect();

        Rc::new(Source {
            name: name.into(),
            text,
            lines,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Aplica `callback` al contenido de la línea `line`, o a `""` si no existe.
    pub fn with_line<F, R>(&self, line: u32, callback: F) -> R
    where
        F: FnOnce(&str) -> R,
    {
        let line = line
            .checked_sub(1)
            .and_then(|index| self.lines.get(index as usize));

        callback(line.map_or("", String::as_str))
    }
}

/// Línea y columna, ambas a partir de 1.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Position {
    line: u32,
    column: u32,
}

impl Default for Position {
    fn default() -> Self {
        Position::new(1, 1)
    }
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Position { line, column }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn advance(self) -> Self {
        Position::new(self.line, self.column + 1)
    }

    pub fn back(self) -> Self {
        self.rewind(1)
    }

    /// Retrocede en la misma línea, sin pasar de la columna 1.
    pub fn rewind(self, columns: u32) -> Self {
        Position::new(self.line, self.column.saturating_sub(columns).max(1))
    }

    pub fn newline(self) -> Self {
        Position::new(self.line + 1, 1)
    }

    /// Siguiente parada de tabulador.
    pub fn tab(self) -> Self {
        let stops = (self.column - 1) / TAB_STOP + 1;
        Position::new(self.line, 1 + stops * TAB_STOP)
    }

    /// Posición del carácter que sigue a `c`.
    pub fn after(self, c: char) -> Self {
        match c {
            '\n' => self.newline(),
            '\t' => self.tab(),
            _ => self.advance(),
        }
    }
}

impl Display for Position {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}:{}", self.line, self.column)
    }
}

/// Tramo semiabierto `[start, end)` de un texto fuente.
#[derive(Clone)]
pub struct Location {
    source: Rc<Source>,
    span: Range<Position>,
}

impl Location {
    /// Tramo de una sola columna.
    pub fn at(source: &Rc<Source>, start: Position) -> Self {
        Location::columns(source, start, 1)
    }

    /// Tramo de `width` columnas en una misma línea.
    pub fn columns(source: &Rc<Source>, start: Position, width: u32) -> Self {
        let end = Position::new(start.line, start.column + width.max(1));
        Location {
            source: Rc::clone(source),
            span: start..end,
        }
    }

    /// Desde el inicio de `from` hasta el final de `to`, que deben
    /// pertenecer al mismo texto.
    pub fn span(from: Location, to: &Location) -> Self {
        Location {
            span: from.span.start..to.span.end,
            source: from.source,
        }
    }

    pub fn start(&self) -> Position {
        self.span.start
    }

    pub fn end(&self) -> Position {
        self.span.end
    }

    pub fn source(&self) -> &Source {
        &self.source
    }
}

impl Display for Location {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        let Range { start, end } = self.span;
        let name = self.source.name();

        let single = end == start.advance() || end.line != start.line;
        if single {
            write!(fmt, "{}:{}", name, start)
        } else {
            write!(fmt, "{}:[{}-{}]", name, start, end.back())
        }
    }
}

impl Debug for Location {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, fmt)
    }
}

/// Valor acompañado del tramo de texto que lo originó.
#[derive(Debug, Clone)]
pub struct Located<T> {
    value: T,
    location: Location,
}

impl<T> Located<T> {
    pub fn at(value: T, location: Location) -> Self {
        Located { value, location }
    }

    pub fn val(&self) -> &T {
        &self.value
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// Reemplaza el valor conservando la ubicación.
    pub fn map<U, F: FnOnce(T) -> U>(self, map: F) -> Located<U> {
        Located::at(map(self.value), self.location)
    }
}

impl<T> AsRef<T> for Located<T> {
    fn as_ref(&self) -> &T {
        &self.value
    }
}
