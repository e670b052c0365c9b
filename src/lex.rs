//! Análisis léxico.
//!
//! # Tokenization
//! Esta es la primera fase del compilador. Descompone el texto fuente
//! en unidades léxicas denominadas tokens. Los espacios en blanco y
//! los comentarios se descartan durante esta operación, excepto dentro
//! de literales de string, donde cada espacio es un carácter más. Cada
//! token emitido está asociado a una ubicación en el código fuente
//! original.
//!
//! # Palabras reservadas
//! El lexer avanza carácter por carácter sin lookahead para letras:
//! cada letra se emite de inmediato como un identificador de un solo
//! carácter. Cuando las últimas letras consecutivas forman una palabra
//! reservada, los identificadores que la componen se retiran y se
//! reemplazan por un único token cuya columna es la de la primera
//! letra. Por tanto, `whilex` resulta en `while` seguido de `x`.
//!
//! # Programas
//! Un mismo texto puede contener varios programas terminados por `$`.
//! Cada `$` reinicia el estado del lexer y cierra la lista de tokens
//! del programa en curso.
//!
//! # Errores
//! El lexer no se recupera de errores: el primer error detiene el
//! escaneo, y el programa que lo contiene se reporta junto con los
//! tokens encontrados hasta ese punto.

use crate::{
    error::{Report, Severity},
    source::{Located, Location, Position, Source},
};

use std::{
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
    str::Chars,
};

use thiserror::Error;

/// Error de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerError {
    /// Carácter o secuencia desconocida en el flujo de entrada.
    #[error("Unrecognized token {0:?}")]
    InvalidToken(String),

    /// Se alcanzó el final del texto dentro de un comentario.
    #[error("Unterminated comment, expected `*/`")]
    MissingCommentEnd,

    /// Solo se admiten letras minúsculas y espacios en un string.
    #[error(
        "Invalid character `{}` in string, only lowercase letters and spaces are allowed",
        escape(.0)
    )]
    InvalidCharacterInString(char),

    /// Se alcanzó el final del texto dentro de un string.
    #[error("Unterminated string literal, expected `\"`")]
    MissingStringEndQuote,
}

impl Report for LexerError {
    fn kind(&self) -> &'static str {
        match self {
            LexerError::InvalidToken(_) => "InvalidToken",
            LexerError::MissingCommentEnd => "MissingCommentEnd",
            LexerError::InvalidCharacterInString(_) => "InvalidCharacterInString",
            LexerError::MissingStringEndQuote => "MissingStringEndQuote",
        }
    }

    fn value(&self) -> String {
        match self {
            LexerError::InvalidToken(token) => token.clone(),
            LexerError::MissingCommentEnd => String::from("/*"),
            LexerError::InvalidCharacterInString(c) => escape(c),
            LexerError::MissingStringEndQuote => String::from("\""),
        }
    }
}

/// Advertencia de escaneo.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LexerWarning {
    /// El último programa no termina en `$`.
    #[error("Missing end of program marker `$`, one was assumed")]
    MissingEop,
}

impl Report for LexerWarning {
    fn kind(&self) -> &'static str {
        match self {
            LexerWarning::MissingEop => "MissingEOP",
        }
    }

    fn value(&self) -> String {
        String::from("$")
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }
}

/// Objeto resultante del análisis léxico.
///
/// Un token contiene suficiente información para describir completamente
/// a una entidad léxica en el programa fuente. Todo token ocupa
/// una cantidad fija de caracteres, por lo cual su lexema se reconstruye
/// a partir de su variante.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// `{`
    OpenCurly,

    /// `}`
    CloseCurly,

    /// `(`
    OpenParen,

    /// `)`
    CloseParen,

    /// `"`, tanto de apertura como de cierre.
    Quote,

    /// `$`
    Eop,

    /// `=`
    Assign,

    /// `+`
    IntOp,

    /// `==` o `!=`
    Boolop(Boolop),

    /// Dígito decimal.
    Digit(u8),

    /// Identificador de una sola letra minúscula.
    Id(char),

    /// Carácter dentro de un string.
    Char(char),

    /// Palabra clave de sentencia.
    Keyword(Keyword),

    /// Nombre de tipo.
    Type(Type),

    /// `true` o `false`
    BoolVal(bool),
}

impl Token {
    /// Lexema original.
    pub fn lexeme(&self) -> String {
        use Token::*;

        match self {
            OpenCurly => String::from("{"),
            CloseCurly => String::from("}"),
            OpenParen => String::from("("),
            CloseParen => String::from(")"),
            Quote => String::from("\""),
            Eop => String::from("$"),
            Assign => String::from("="),
            IntOp => String::from("+"),
            Boolop(boolop) => boolop.to_string(),
            Digit(digit) => digit.to_string(),
            Id(c) | Char(c) => c.to_string(),
            Keyword(keyword) => keyword.to_string(),
            Type(typ) => typ.to_string(),
            BoolVal(value) => value.to_string(),
        }
    }

    /// Nombre de la clase léxica.
    pub fn name(&self) -> &'static str {
        use Token::*;

        match self {
            OpenCurly => "OpenCurly",
            CloseCurly => "CloseCurly",
            OpenParen => "OpenParen",
            CloseParen => "CloseParen",
            Quote => "Quote",
            Eop => "Eop",
            Assign => "Assign",
            IntOp => "IntOp",
            Boolop(_) => "Boolop",
            Digit(_) => "Digit",
            Id(_) => "Id",
            Char(_) => "Char",
            Keyword(_) => "Keyword",
            Type(_) => "Type",
            BoolVal(_) => "BoolVal",
        }
    }
}

impl Display for Token {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Token::*;

        match self {
            Digit(digit) => write!(fmt, "digit `{}`", digit),
            Id(id) => write!(fmt, "identifier `{}`", id),
            Char(c) => write!(fmt, "character `{}`", c),
            Keyword(keyword) => write!(fmt, "keyword `{}`", keyword),
            Type(typ) => write!(fmt, "type `{}`", typ),
            BoolVal(value) => write!(fmt, "literal `{}`", value),
            Eop => fmt.write_str("end of program `$`"),
            _ => write!(fmt, "`{}`", self.lexeme()),
        }
    }
}

/// Una palabra clave de sentencia.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Keyword {
    Print,
    While,
    If,
}

impl Display for Keyword {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        let string = match self {
            Keyword::Print => "print",
            Keyword::While => "while",
            Keyword::If => "if",
        };

        fmt.write_str(string)
    }
}

/// Tipo de dato, tanto declarado como inferido.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int,
    String,
    Boolean,
}

impl Display for Type {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => fmt.write_str("int"),
            Type::String => fmt.write_str("string"),
            Type::Boolean => fmt.write_str("boolean"),
        }
    }
}

/// Operador de comparación.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Boolop {
    Equal,
    NotEqual,
}

impl Display for Boolop {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boolop::Equal => fmt.write_str("=="),
            Boolop::NotEqual => fmt.write_str("!="),
        }
    }
}

/// Palabras reservadas, de la más larga a la más corta.
///
/// El orden importa: `print` debe tener prioridad sobre `int`.
const RESERVED: &[(&str, Token)] = &[
    ("boolean", Token::Type(Type::Boolean)),
    ("string", Token::Type(Type::String)),
    ("print", Token::Keyword(Keyword::Print)),
    ("while", Token::Keyword(Keyword::While)),
    ("false", Token::BoolVal(false)),
    ("true", Token::BoolVal(true)),
    ("int", Token::Type(Type::Int)),
    ("if", Token::Keyword(Keyword::If)),
];

/// Resultado del análisis léxico de un único programa.
#[derive(Debug, Default)]
pub struct Lexed {
    pub tokens: Vec<Located<Token>>,
    pub error: Option<Located<LexerError>>,
    pub warnings: Vec<Located<LexerWarning>>,
}

/// Descompone un texto fuente en programas.
pub fn lex(source: &Rc<Source>) -> Vec<Lexed> {
    Lexer::new(source).run()
}

/// Posibles estados del lexer.
#[derive(Copy, Clone)]
enum State {
    /// Fuera de comentarios y strings.
    Start,

    /// Dentro de `/* ... */`. Guarda la posición de apertura.
    Comment(Position),

    /// Dentro de `"..."`. Guarda la posición de la comilla de apertura.
    Str(Position),
}

/// Máquina de estados para análisis léxico.
///
/// La salida del lexer, así como su siguiente estado, se define a
/// partir de tanto su estado actual como el siguiente carácter
/// encontrado en el texto fuente.
pub struct Lexer<'a> {
    source: &'a Rc<Source>,
    chars: Peekable<Chars<'a>>,
    next: Position,
    state: State,
    program: Lexed,
    programs: Vec<Lexed>,

    /// Cantidad de letras consecutivas emitidas como identificadores.
    word: usize,

    /// Posición del `=` inmediatamente anterior, si lo hubo.
    pending_assign: Option<Position>,
}

impl<'a> Lexer<'a> {
    /// Crea un lexer en estado inicial.
    pub fn new(source: &'a Rc<Source>) -> Self {
        Lexer {
            source,
            chars: source.text().chars().peekable(),
            next: Position::default(),
            state: State::Start,
            program: Lexed::default(),
            programs: Vec::new(),
            word: 0,
            pending_assign: None,
        }
    }

    /// Escanea todo el texto fuente, programa por programa.
    pub fn run(mut self) -> Vec<Lexed> {
        while let Some((c, here)) = self.bump() {
            let result = match self.state {
                State::Comment(_) => {
                    self.comment(c);
                    Ok(())
                }

                State::Str(_) => self.string(c, here),
                State::Start => self.start(c, here),
            };

            if let Err(error) = result {
                self.program.error = Some(error);
                self.end_program();
                return self.programs;
            }
        }

        self.finish()
    }

    /// Consume un carácter. Retorna también la posición en que se encontraba.
    fn bump(&mut self) -> Option<(char, Position)> {
        let c = self.chars.next()?;
        let here = self.next;
        self.next = here.after(c);

        Some((c, here))
    }

    fn start(&mut self, c: char, here: Position) -> Result<(), Located<LexerError>> {
        if !c.is_ascii_lowercase() {
            self.word = 0;
        }

        let assign = self.pending_assign.take();
        match c {
            '{' => self.emit(Token::OpenCurly, here, 1),
            '}' => self.emit(Token::CloseCurly, here, 1),
            '(' => self.emit(Token::OpenParen, here, 1),
            ')' => self.emit(Token::CloseParen, here, 1),
            '+' => self.emit(Token::IntOp, here, 1),

            '"' => {
                self.emit(Token::Quote, here, 1);
                self.state = State::Str(here);
            }

            '$' => {
                self.emit(Token::Eop, here, 1);
                self.end_program();
            }

            '0'..='9' => self.emit(Token::Digit(c as u8 - b'0'), here, 1),

            'a'..='z' => {
                self.emit(Token::Id(c), here, 1);
                self.word += 1;
                self.coalesce(here);
            }

            // La asignación tentativa se convierte en `==` en su misma posición
            '=' => match assign {
                Some(start) => {
                    self.program.tokens.pop();
                    self.emit(Token::Boolop(Boolop::Equal), start, 2);
                }

                None => {
                    self.emit(Token::Assign, here, 1);
                    self.pending_assign = Some(here);
                }
            },

            // `!` y `/` no son tokens por sí solos
            '!' if self.chars.peek() == Some(&'=') => {
                self.bump();
                self.emit(Token::Boolop(Boolop::NotEqual), here, 2);
            }

            '/' if self.chars.peek() == Some(&'*') => {
                self.bump();
                self.state = State::Comment(here);
            }

            c if c.is_whitespace() => (),

            _ => {
                let location = Location::at(self.source, here);
                return Err(Located::at(
                    LexerError::InvalidToken(c.to_string()),
                    location,
                ));
            }
        }

        Ok(())
    }

    fn comment(&mut self, c: char) {
        if c == '*' && self.chars.peek() == Some(&'/') {
            self.bump();
            self.state = State::Start;
        }
    }

    fn string(&mut self, c: char, here: Position) -> Result<(), Located<LexerError>> {
        match c {
            '"' => {
                self.emit(Token::Quote, here, 1);
                self.state = State::Start;
            }

            'a'..='z' | ' ' => self.emit(Token::Char(c), here, 1),

            _ => {
                let location = Location::at(self.source, here);
                return Err(Located::at(
                    LexerError::InvalidCharacterInString(c),
                    location,
                ));
            }
        }

        Ok(())
    }

    /// Reemplaza los identificadores de una palabra reservada recién completada.
    fn coalesce(&mut self, here: Position) {
        let tokens = &self.program.tokens;
        let run: String = tokens[tokens.len() - self.word..]
            .iter()
            .filter_map(|token| match token.as_ref() {
                Token::Id(c) => Some(*c),
                _ => None,
            })
            .collect();

        let found = RESERVED.iter().find(|(word, _)| run.ends_with(word));
        if let Some(&(word, token)) = found {
            let length = word.len();
            let keep = self.program.tokens.len() - length;

            self.program.tokens.truncate(keep);
            self.emit(token, here.rewind(length as u32 - 1), length as u32);
            self.word = 0;
        }
    }

    fn emit(&mut self, token: Token, start: Position, width: u32) {
        let location = Location::columns(self.source, start, width);
        self.program.tokens.push(Located::at(token, location));
    }

    /// Cierra el programa en curso y reinicia el estado.
    fn end_program(&mut self) {
        let program = std::mem::take(&mut self.program);
        self.programs.push(program);

        self.state = State::Start;
        self.word = 0;
        self.pending_assign = None;
    }

    fn finish(mut self) -> Vec<Lexed> {
        match self.state {
            State::Comment(opened) => {
                let location = Location::columns(self.source, opened, 2);
                self.program.error = Some(Located::at(LexerError::MissingCommentEnd, location));
                self.end_program();
            }

            State::Str(opened) => {
                let location = Location::at(self.source, opened);
                self.program.error =
                    Some(Located::at(LexerError::MissingStringEndQuote, location));
                self.end_program();
            }

            // Se asume un `$` al final para que la compilación pueda continuar
            State::Start if !self.program.tokens.is_empty() || self.programs.is_empty() => {
                let location = Location::at(self.source, self.next);
                self.program
                    .warnings
                    .push(Located::at(LexerWarning::MissingEop, location.clone()));

                self.program.tokens.push(Located::at(Token::Eop, location));
                self.end_program();
            }

            State::Start => (),
        }

        self.programs
    }
}

/// Representación legible de caracteres de control.
fn escape(c: &char) -> String {
    match c {
        '\n' => String::from("\\n"),
        '\r' => String::from("\\r"),
        '\t' => String::from("\\t"),
        c => c.to_string(),
    }
}
