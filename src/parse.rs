//! Análisis sintáctico.
//!
//! Descenso recursivo LL(1) sobre la gramática del lenguaje. El
//! resultado es un árbol sintáctico concreto ([`Cst`]) que conserva
//! cada símbolo de la gramática: cada producción es un nodo interno y
//! cada token consumido es una hoja. El árbol se construye de forma
//! incremental conforme avanza la derivación.
//!
//! # Fallos
//! Una producción que se *intenta* y no aplica en su primer token
//! produce un fallo débil: no deja nodos en el árbol y permite probar
//! otra alternativa. Un token *requerido* que no aparece produce un
//! fallo estricto, que detiene todo el análisis. En ese caso se
//! retorna el árbol parcial junto con el error.

use std::{
    fmt::{self, Display},
    iter::Peekable,
    rc::Rc,
    slice,
};

use thiserror::Error;

use crate::{
    error::Report,
    lex::{Keyword, Token},
    source::{Located, Location, Position, Source},
    tree::Tree,
};

/// Árbol sintáctico concreto.
pub type Cst = Tree<CstNode>;

/// Nodo del árbol concreto: producción o token.
#[derive(Debug)]
pub enum CstNode {
    Production(Production),
    Terminal(Located<Token>),
}

impl Display for CstNode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CstNode::Production(production) => write!(fmt, "<{:?}>", production),
            CstNode::Terminal(token) => write!(fmt, "[{}]", token.as_ref().lexeme()),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Production {
    Program,
    Block,
    StatementList,
    Statement,
    PrintStatement,
    AssignmentStatement,
    VarDecl,
    WhileStatement,
    IfStatement,
    Expr,
    IntExpr,
    StringExpr,
    BooleanExpr,
    CharList,
}

/// Lo que se esperaba encontrar en un punto de la derivación.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Expected {
    Exactly(Token),
    Id,
    Digit,
    Type,
    Char,
    Boolop,
    BoolVal,
    Statement,
    Expr,
    BooleanExpr,
}

impl Expected {
    fn matches(self, token: &Token) -> bool {
        match (self, token) {
            (Expected::Exactly(expected), found) => expected == *found,
            (Expected::Id, Token::Id(_)) => true,
            (Expected::Digit, Token::Digit(_)) => true,
            (Expected::Type, Token::Type(_)) => true,
            (Expected::Char, Token::Char(_)) => true,
            (Expected::Boolop, Token::Boolop(_)) => true,
            (Expected::BoolVal, Token::BoolVal(_)) => true,
            _ => false,
        }
    }
}

impl Display for Expected {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Exactly(token) => token.fmt(fmt),
            Expected::Id => fmt.write_str("identifier"),
            Expected::Digit => fmt.write_str("digit"),
            Expected::Type => fmt.write_str("any of `int`, `string`, `boolean`"),
            Expected::Char => fmt.write_str("character"),
            Expected::Boolop => fmt.write_str("`==` or `!=`"),
            Expected::BoolVal => fmt.write_str("`true` or `false`"),
            Expected::Statement => {
                fmt.write_str("any of `print`, `while`, `if`, `{`, a type or an assignment")
            }
            Expected::Expr => fmt.write_str("an expression"),
            Expected::BooleanExpr => fmt.write_str("a boolean expression"),
        }
    }
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Expected {0}, found {1} instead")]
    UnexpectedToken(Expected, Token),

    #[error("Expected {0}, none was found instead")]
    MissingToken(Expected),
}

impl Report for ParserError {
    fn kind(&self) -> &'static str {
        match self {
            ParserError::UnexpectedToken(..) => "UnexpectedToken",
            ParserError::MissingToken(_) => "MissingToken",
        }
    }

    fn value(&self) -> String {
        match self {
            ParserError::UnexpectedToken(_, found) => found.lexeme(),
            ParserError::MissingToken(expected) => expected.to_string(),
        }
    }
}

/// Resultado del análisis sintáctico de un programa.
#[derive(Debug)]
pub struct Parsed {
    pub cst: Cst,
    pub error: Option<Located<ParserError>>,
}

/// Construye el árbol concreto de un programa.
pub fn parse(source: &Rc<Source>, tokens: &[Located<Token>]) -> Parsed {
    let mut parser = Parser {
        tokens: tokens.iter().peekable(),
        cst: Cst::new(),
        last_known: Location::at(source, Position::default()),
    };

    let error = parser.program().err().map(Failure::coerce);
    Parsed {
        cst: parser.cst,
        error,
    }
}

struct Parser<'a> {
    tokens: Peekable<slice::Iter<'a, Located<Token>>>,
    cst: Cst,
    last_known: Location,
}

enum Failure {
    Weak(Located<ParserError>),
    Strict(Located<ParserError>),
}

impl Failure {
    fn strict(self) -> Self {
        Failure::Strict(self.coerce())
    }

    fn coerce(self) -> Located<ParserError> {
        match self {
            Failure::Weak(error) => error,
            Failure::Strict(error) => error,
        }
    }
}

type Parse = Result<(), Failure>;

impl Parser<'_> {
    fn program(&mut self) -> Parse {
        self.production(Production::Program, |s| {
            s.block()?;
            s.expect(Token::Eop)
        })
    }

    fn block(&mut self) -> Parse {
        self.production(Production::Block, |s| {
            s.expect(Token::OpenCurly)?;
            s.statement_list()?;
            s.expect(Token::CloseCurly)
        })
    }

    fn statement_list(&mut self) -> Parse {
        self.production(Production::StatementList, |s| match s.statement() {
            Ok(()) => s.statement_list(),
            Err(Failure::Weak(_)) => Ok(()),
            Err(error) => Err(error),
        })
    }

    fn statement(&mut self) -> Parse {
        let rule: fn(&mut Self) -> Parse = match self.peek() {
            Some(Token::Keyword(Keyword::Print)) => Parser::print_statement,
            Some(Token::Keyword(Keyword::While)) => Parser::while_statement,
            Some(Token::Keyword(Keyword::If)) => Parser::if_statement,
            Some(Token::Id(_)) => Parser::assignment_statement,
            Some(Token::Type(_)) => Parser::var_decl,
            Some(Token::OpenCurly) => Parser::block,
            _ => return Err(self.weak(Expected::Statement)),
        };

        self.production(Production::Statement, rule)
    }

    fn print_statement(&mut self) -> Parse {
        self.production(Production::PrintStatement, |s| {
            s.expect(Token::Keyword(Keyword::Print))?;
            s.expect(Token::OpenParen)?;
            s.expr().map_err(Failure::strict)?;
            s.expect(Token::CloseParen)
        })
    }

    fn assignment_statement(&mut self) -> Parse {
        self.production(Production::AssignmentStatement, |s| {
            s.id()?;
            s.expect(Token::Assign)?;
            s.expr().map_err(Failure::strict)
        })
    }

    fn var_decl(&mut self) -> Parse {
        self.production(Production::VarDecl, |s| {
            s.terminal(Expected::Type)?;
            s.id()
        })
    }

    fn while_statement(&mut self) -> Parse {
        self.production(Production::WhileStatement, |s| {
            s.expect(Token::Keyword(Keyword::While))?;
            s.boolean_expr().map_err(Failure::strict)?;
            s.block()
        })
    }

    fn if_statement(&mut self) -> Parse {
        self.production(Production::IfStatement, |s| {
            s.expect(Token::Keyword(Keyword::If))?;
            s.boolean_expr().map_err(Failure::strict)?;
            s.block()
        })
    }

    fn expr(&mut self) -> Parse {
        // Un identificador suelto cuelga directamente de `Expr`
        let rule: fn(&mut Self) -> Parse = match self.peek() {
            Some(Token::Digit(_)) => Parser::int_expr,
            Some(Token::Quote) => Parser::string_expr,
            Some(Token::OpenParen) | Some(Token::BoolVal(_)) => Parser::boolean_expr,
            Some(Token::Id(_)) => Parser::id,
            _ => return Err(self.weak(Expected::Expr)),
        };

        self.production(Production::Expr, rule)
    }

    fn int_expr(&mut self) -> Parse {
        self.production(Production::IntExpr, |s| {
            s.terminal(Expected::Digit)?;
            if s.peek() == Some(Token::IntOp) {
                s.expect(Token::IntOp)?;
                s.expr().map_err(Failure::strict)?;
            }

            Ok(())
        })
    }

    fn string_expr(&mut self) -> Parse {
        self.production(Production::StringExpr, |s| {
            s.expect(Token::Quote)?;
            s.char_list()?;
            s.expect(Token::Quote)
        })
    }

    fn char_list(&mut self) -> Parse {
        self.production(Production::CharList, |s| {
            if let Some(Token::Char(_)) = s.peek() {
                s.terminal(Expected::Char)?;
                s.char_list()?;
            }

            Ok(())
        })
    }

    fn boolean_expr(&mut self) -> Parse {
        match self.peek() {
            Some(Token::BoolVal(_)) => {
                self.production(Production::BooleanExpr, |s| s.terminal(Expected::BoolVal))
            }

            Some(Token::OpenParen) => self.production(Production::BooleanExpr, |s| {
                s.expect(Token::OpenParen)?;
                s.expr().map_err(Failure::strict)?;
                s.terminal(Expected::Boolop)?;
                s.expr().map_err(Failure::strict)?;
                s.expect(Token::CloseParen)
            }),

            _ => Err(self.weak(Expected::BooleanExpr)),
        }
    }

    fn id(&mut self) -> Parse {
        self.terminal(Expected::Id)
    }

    /// Envuelve una regla en un nodo de producción.
    ///
    /// El cursor del árbol solo asciende si la regla tiene éxito. Tras un
    /// fallo estricto el análisis termina, por lo cual no hace falta
    /// restaurarlo.
    fn production<F>(&mut self, production: Production, rule: F) -> Parse
    where
        F: FnOnce(&mut Self) -> Parse,
    {
        self.cst.descend(CstNode::Production(production));
        rule(self).map_err(Failure::strict)?;
        self.cst.ascend();

        Ok(())
    }

    fn expect(&mut self, token: Token) -> Parse {
        self.terminal(Expected::Exactly(token))
    }

    /// Consume un token requerido y lo agrega como hoja.
    fn terminal(&mut self, expected: Expected) -> Parse {
        match self.tokens.peek() {
            Some(token) if expected.matches(token.val()) => {
                let token = (*token).clone();
                self.tokens.next();

                self.last_known = token.location().clone();
                self.cst.leaf(CstNode::Terminal(token));
                Ok(())
            }

            _ => Err(self.weak(expected).strict()),
        }
    }

    fn peek(&mut self) -> Option<Token> {
        self.tokens.peek().map(|token| *token.val())
    }

    /// Construye un fallo a partir del siguiente token, sin consumirlo.
    fn weak(&mut self, expected: Expected) -> Failure {
        let error = match self.tokens.peek() {
            Some(token) => Located::at(
                ParserError::UnexpectedToken(expected, *token.val()),
                token.location().clone(),
            ),

            None => Located::at(ParserError::MissingToken(expected), self.last_known.clone()),
        };

        Failure::Weak(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lex::{self, Type};

    fn parse_str(text: &str) -> Parsed {
        let source = Source::new("<test>", text);
        let programs = lex::lex(&source);
        assert!(programs[0].error.is_none());

        parse(&source, &programs[0].tokens)
    }

    fn production(cst: &Cst, id: crate::tree::NodeId) -> Option<Production> {
        match cst.get(id) {
            CstNode::Production(production) => Some(*production),
            CstNode::Terminal(_) => None,
        }
    }

    fn shape(cst: &Cst, id: crate::tree::NodeId) -> Vec<String> {
        cst.children(id)
            .iter()
            .map(|&child| cst.get(child).to_string())
            .collect()
    }

    fn find(cst: &Cst, wanted: Production) -> crate::tree::NodeId {
        cst.preorder()
            .into_iter()
            .map(|(id, _)| id)
            .find(|&id| production(cst, id) == Some(wanted))
            .unwrap()
    }

    #[test]
    fn empty_program() {
        let parsed = parse_str("{}$");
        assert!(parsed.error.is_none());

        let cst = &parsed.cst;
        let root = cst.root().unwrap();
        assert_eq!(shape(cst, root), vec!["<Block>", "[$]"]);

        let block = cst.child(root, 0).unwrap();
        assert_eq!(shape(cst, block), vec!["[{]", "<StatementList>", "[}]"]);
        assert!(cst.children(cst.child(block, 1).unwrap()).is_empty());
    }

    #[test]
    fn print_wraps_boolean_in_expr() {
        let parsed = parse_str("{ print(true) }$");
        assert!(parsed.error.is_none());

        let cst = &parsed.cst;
        let print = find(cst, Production::PrintStatement);
        assert_eq!(shape(cst, print), vec!["[print]", "[(]", "<Expr>", "[)]"]);

        let expr = cst.child(print, 2).unwrap();
        assert_eq!(shape(cst, expr), vec!["<BooleanExpr>"]);
    }

    #[test]
    fn while_attaches_boolean_directly() {
        let parsed = parse_str("{ while (a != 1) { } }$");
        assert!(parsed.error.is_none());

        let cst = &parsed.cst;
        let body = find(cst, Production::WhileStatement);
        assert_eq!(shape(cst, body), vec!["[while]", "<BooleanExpr>", "<Block>"]);

        let condition = cst.child(body, 1).unwrap();
        assert_eq!(
            shape(cst, condition),
            vec!["[(]", "<Expr>", "[!=]", "<Expr>", "[)]"]
        );
    }

    #[test]
    fn statement_lists_nest() {
        let parsed = parse_str("{ int a a = 1 }$");
        assert!(parsed.error.is_none());

        let cst = &parsed.cst;
        let list = find(cst, Production::StatementList);
        assert_eq!(shape(cst, list), vec!["<Statement>", "<StatementList>"]);

        let decl = find(cst, Production::VarDecl);
        match cst.get(cst.child(decl, 0).unwrap()) {
            CstNode::Terminal(token) => assert_eq!(*token.as_ref(), Token::Type(Type::Int)),
            _ => panic!("expected a terminal"),
        }
    }

    #[test]
    fn addition_chain() {
        let parsed = parse_str("{ a = 1 + 2 + b }$");
        assert!(parsed.error.is_none());

        let cst = &parsed.cst;
        let int = find(cst, Production::IntExpr);
        assert_eq!(shape(cst, int), vec!["[1]", "[+]", "<Expr>"]);
    }

    #[test]
    fn string_char_list() {
        let parsed = parse_str("{ print(\"hi\") }$");
        assert!(parsed.error.is_none());

        let cst = &parsed.cst;
        let string = find(cst, Production::StringExpr);
        assert_eq!(shape(cst, string), vec!["[\"]", "<CharList>", "[\"]"]);
    }

    #[test]
    fn required_token_is_fatal() {
        let parsed = parse_str("{ int }$");
        let error = parsed.error.unwrap();

        assert_eq!(error.as_ref().kind(), "UnexpectedToken");
        assert_eq!(error.as_ref().value(), "}");
        assert_eq!(error.location().start().column(), 7);

        // El árbol parcial se conserva
        assert!(parsed.cst.root().is_some());
        assert!(parsed.cst.cursor().is_some());
    }

    #[test]
    fn missing_expression() {
        let parsed = parse_str("{ a = }$");
        let error = parsed.error.unwrap();

        assert!(matches!(
            error.as_ref(),
            ParserError::UnexpectedToken(Expected::Expr, Token::CloseCurly)
        ));
    }

    #[test]
    fn while_requires_boolean() {
        let parsed = parse_str("{ while 1 {} }$");
        assert!(matches!(
            parsed.error.unwrap().as_ref(),
            ParserError::UnexpectedToken(Expected::BooleanExpr, Token::Digit(1))
        ));
    }

    #[test]
    fn unknown_statement_closes_block() {
        let parsed = parse_str("{ ) }$");
        assert!(matches!(
            parsed.error.unwrap().as_ref(),
            ParserError::UnexpectedToken(Expected::Exactly(Token::CloseCurly), Token::CloseParen)
        ));
    }
}
