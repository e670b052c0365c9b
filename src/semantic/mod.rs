//! Análisis semántico.
//!
//! Un único recorrido en preorden sobre el árbol concreto produce a la
//! vez el árbol sintáctico abstracto, el árbol de alcances y el listado
//! de símbolos, al tiempo que infiere y verifica tipos. A diferencia de
//! las fases anteriores, los errores no detienen el recorrido: se
//! acumulan todos los diagnósticos del programa.
//!
//! Un segundo recorrido, esta vez sobre el árbol de alcances, señala
//! variables nunca inicializadas o inicializadas pero nunca leídas.

use std::fmt::{self, Display};

use thiserror::Error;

use crate::{
    error::{Report, Severity},
    lex::{Boolop, Token, Type},
    parse::{Cst, CstNode, Production},
    source::{Located, Location},
    tree::{NodeId, Tree},
};

mod scope;

pub use scope::{Scope, ScopeId, ScopeTree, Symbol, SymbolList, Variable};

/// Árbol sintáctico abstracto.
pub type Ast = Tree<AstNode>;

/// Nodo del árbol abstracto.
#[derive(Debug)]
pub enum AstNode {
    Branch(Branch),
    Leaf(Located<Leaf>),
}

/// Nodos internos del árbol abstracto.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Branch {
    /// Bloque, con el alcance que le corresponde.
    Block(ScopeId),
    VarDecl,
    Assignment,
    Print,
    While,
    If,
    /// `Digit + Expr`
    Addition,
    EqualTo,
    NotEqualTo,
}

/// Hojas del árbol abstracto.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Leaf {
    Digit(u8),
    /// Contenido de un literal, sin comillas.
    Str(String),
    Bool(bool),
    Id(char),
    Type(Type),
}

impl Display for AstNode {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::Branch(Branch::Block(scope)) => write!(fmt, "<Block {}>", scope),
            AstNode::Branch(branch) => write!(fmt, "<{:?}>", branch),
            AstNode::Leaf(leaf) => match leaf.as_ref() {
                Leaf::Digit(digit) => write!(fmt, "[{}]", digit),
                Leaf::Str(string) => write!(fmt, "[\"{}\"]", string),
                Leaf::Bool(value) => write!(fmt, "[{}]", value),
                Leaf::Id(name) => write!(fmt, "[{}]", name),
                Leaf::Type(typ) => write!(fmt, "[{}]", typ),
            },
        }
    }
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("Variable `{0}` is already declared in this scope")]
    DuplicateVariable(char),

    #[error("Variable `{0}` is not declared in this or any enclosing scope")]
    UndeclaredVariable(char),

    #[error("Type mismatch: `{name}` is declared as `{expected}`, found `{found}`")]
    TypeMismatch {
        name: char,
        expected: Type,
        found: Type,
    },

    #[error("Incorrect type comparison between `{0}` and `{1}`")]
    IncorrectTypeComparison(Type, Type),

    #[error("Integer addition expects `int` on the right-hand side, found `{0}`")]
    IncorrectIntegerExpression(Type),
}

impl Report for SemanticError {
    fn kind(&self) -> &'static str {
        use SemanticError::*;

        match self {
            DuplicateVariable(_) => "DuplicateVariable",
            UndeclaredVariable(_) => "UndeclaredVariable",
            TypeMismatch { .. } => "TypeMismatch",
            IncorrectTypeComparison(..) => "IncorrectTypeComparison",
            IncorrectIntegerExpression(_) => "IncorrectIntegerExpression",
        }
    }

    fn value(&self) -> String {
        use SemanticError::*;

        match self {
            DuplicateVariable(name) | UndeclaredVariable(name) => name.to_string(),
            TypeMismatch { name, .. } => name.to_string(),
            IncorrectTypeComparison(left, right) => format!("{} {}", left, right),
            IncorrectIntegerExpression(found) => found.to_string(),
        }
    }
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SemanticWarning {
    #[error("Variable `{0}` is declared but never initialized")]
    UninitializedVariable(char),

    #[error("Variable `{0}` is initialized but never used")]
    UnusedVariable(char),
}

impl Report for SemanticWarning {
    fn kind(&self) -> &'static str {
        match self {
            SemanticWarning::UninitializedVariable(_) => "UninitializedVariable",
            SemanticWarning::UnusedVariable(_) => "UnusedVariable",
        }
    }

    fn value(&self) -> String {
        match self {
            SemanticWarning::UninitializedVariable(name) => name.to_string(),
            SemanticWarning::UnusedVariable(name) => name.to_string(),
        }
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }
}

/// Resultado del análisis semántico.
#[derive(Debug)]
pub struct Analysis {
    pub ast: Ast,
    pub scopes: ScopeTree,
    pub symbols: SymbolList,
    pub errors: Vec<Located<SemanticError>>,
    pub warnings: Vec<Located<SemanticWarning>>,
}

impl Tree<CstNode> {
    /// Analiza un árbol concreto completo.
    pub fn analyze(&self) -> Analysis {
        analyze(self)
    }
}

pub fn analyze(cst: &Cst) -> Analysis {
    let mut analyzer = Analyzer {
        cst,
        ast: Ast::new(),
        scopes: ScopeTree::new(),
        symbols: Vec::new(),
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    if let Some(root) = cst.root() {
        analyzer.program(root);
    }

    analyzer.check_usage();

    Analysis {
        ast: analyzer.ast,
        scopes: analyzer.scopes,
        symbols: SymbolList(analyzer.symbols),
        errors: analyzer.errors,
        warnings: analyzer.warnings,
    }
}

struct Analyzer<'c> {
    cst: &'c Cst,
    ast: Ast,
    scopes: ScopeTree,
    symbols: Vec<Symbol>,
    errors: Vec<Located<SemanticError>>,
    warnings: Vec<Located<SemanticWarning>>,
}

impl<'c> Analyzer<'c> {
    fn program(&mut self, id: NodeId) {
        for &child in self.children(id) {
            if self.production(child) == Some(Production::Block) {
                self.block(child);
            }
        }
    }

    fn block(&mut self, id: NodeId) {
        let scope = self.scopes.open();
        self.ast.descend(AstNode::Branch(Branch::Block(scope)));

        for &child in self.children(id) {
            if self.production(child) == Some(Production::StatementList) {
                self.statement_list(child);
            }
        }

        self.ast.ascend();
        self.scopes.close();
    }

    fn statement_list(&mut self, id: NodeId) {
        for &child in self.children(id) {
            match self.production(child) {
                Some(Production::Statement) => self.statement(child),
                Some(Production::StatementList) => self.statement_list(child),
                _ => (),
            }
        }
    }

    fn statement(&mut self, id: NodeId) {
        for &child in self.children(id) {
            match self.production(child) {
                Some(Production::PrintStatement) => self.print(child),
                Some(Production::AssignmentStatement) => self.assignment(child),
                Some(Production::VarDecl) => self.var_decl(child),
                Some(Production::WhileStatement) => self.conditional(child, Branch::While),
                Some(Production::IfStatement) => self.conditional(child, Branch::If),
                Some(Production::Block) => self.block(child),
                _ => (),
            }
        }
    }

    fn var_decl(&mut self, id: NodeId) {
        let mut typ = None;
        let mut name = None;

        for token in self.terminals(id) {
            match token.as_ref() {
                Token::Type(found) => typ = Some((*found, token.location().clone())),
                Token::Id(found) => name = Some((*found, token.location().clone())),
                _ => (),
            }
        }

        let ((typ, type_location), (name, location)) = match (typ, name) {
            (Some(typ), Some(name)) => (typ, name),
            _ => return,
        };

        self.ast.descend(AstNode::Branch(Branch::VarDecl));
        self.ast.leaf(AstNode::Leaf(Located::at(Leaf::Type(typ), type_location)));
        self.ast.leaf(AstNode::Leaf(Located::at(Leaf::Id(name), location.clone())));
        self.ast.ascend();

        match self.scopes.declare(name, typ, location.clone()) {
            Ok(scope) => self.symbols.push(Symbol {
                name,
                typ,
                scope,
                level: self.scopes.get(scope).level(),
                location,
            }),

            Err(()) => self.error(SemanticError::DuplicateVariable(name), location),
        }
    }

    fn assignment(&mut self, id: NodeId) {
        self.ast.descend(AstNode::Branch(Branch::Assignment));

        let mut target = None;
        let mut value = None;
        for &child in self.children(id) {
            match self.node(child) {
                CstNode::Terminal(token) => {
                    if let Token::Id(name) = token.as_ref() {
                        target = Some((*name, token.location().clone()));
                        self.ast.leaf(AstNode::Leaf(token.clone().map(|_| Leaf::Id(*name))));
                    }
                }

                CstNode::Production(Production::Expr) => value = self.expr(child),
                _ => (),
            }
        }

        self.ast.ascend();

        let (name, location) = match target {
            Some(target) => target,
            None => return,
        };

        if let (Some(expected), Some(found)) = (self.resolve(name, &location), value) {
            if expected != found {
                let error = SemanticError::TypeMismatch {
                    name,
                    expected,
                    found,
                };

                self.error(error, location);
            }
        }

        if let Some(scope) = self.scopes.current() {
            self.scopes.mark_initialized(scope, name);
        }
    }

    fn print(&mut self, id: NodeId) {
        self.ast.descend(AstNode::Branch(Branch::Print));
        for &child in self.children(id) {
            if self.production(child) == Some(Production::Expr) {
                self.expr(child);
            }
        }

        self.ast.ascend();
    }

    /// `while` e `if` comparten forma: condición y cuerpo.
    fn conditional(&mut self, id: NodeId, branch: Branch) {
        self.ast.descend(AstNode::Branch(branch));
        for &child in self.children(id) {
            match self.production(child) {
                Some(Production::BooleanExpr) => {
                    self.boolean_expr(child);
                }

                Some(Production::Block) => self.block(child),
                _ => (),
            }
        }

        self.ast.ascend();
    }

    /// Construye el subárbol de una expresión e infiere su tipo.
    ///
    /// Retorna `None` si el tipo no puede determinarse, lo cual ocurre
    /// solamente tras haber reportado otro error.
    fn expr(&mut self, id: NodeId) -> Option<Type> {
        let child = *self.children(id).first()?;
        match self.node(child) {
            CstNode::Production(Production::IntExpr) => self.int_expr(child),
            CstNode::Production(Production::StringExpr) => self.string_expr(child),
            CstNode::Production(Production::BooleanExpr) => self.boolean_expr(child),
            CstNode::Terminal(token) => match token.as_ref() {
                Token::Id(name) => self.read(*name, token.location()),
                _ => None,
            },

            _ => None,
        }
    }

    fn int_expr(&mut self, id: NodeId) -> Option<Type> {
        let children = self.children(id);
        let digit = match self.node(*children.first()?) {
            CstNode::Terminal(token) => match token.as_ref() {
                Token::Digit(digit) => token.clone().map(|_| Leaf::Digit(*digit)),
                _ => return None,
            },

            _ => return None,
        };

        let operand = match children.get(2) {
            None => {
                self.ast.leaf(AstNode::Leaf(digit));
                return Some(Type::Int);
            }

            Some(&operand) => operand,
        };

        let digit_location = digit.location().clone();
        self.ast.descend(AstNode::Branch(Branch::Addition));
        self.ast.leaf(AstNode::Leaf(digit));
        let found = self.expr(operand);
        self.ast.ascend();

        match found {
            Some(Type::Int) | None => (),
            Some(found) => {
                let location = self.first_location(operand).unwrap_or(digit_location);
                self.error(SemanticError::IncorrectIntegerExpression(found), location);
            }
        }

        Some(Type::Int)
    }

    fn string_expr(&mut self, id: NodeId) -> Option<Type> {
        let tokens = self.terminals(id);
        let string: String = tokens
            .iter()
            .filter_map(|token| match token.as_ref() {
                Token::Char(c) => Some(*c),
                _ => None,
            })
            .collect();

        let location = match (tokens.first(), tokens.last()) {
            (Some(first), Some(last)) => {
                Location::span(first.location().clone(), last.location())
            }

            _ => return None,
        };

        self.ast.leaf(AstNode::Leaf(Located::at(Leaf::Str(string), location)));
        Some(Type::String)
    }

    fn boolean_expr(&mut self, id: NodeId) -> Option<Type> {
        let children = self.children(id);

        // Literal booleano
        if let [only] = children {
            if let CstNode::Terminal(token) = self.node(*only) {
                if let Token::BoolVal(value) = token.as_ref() {
                    let leaf = token.clone().map(|_| Leaf::Bool(*value));
                    self.ast.leaf(AstNode::Leaf(leaf));
                }
            }

            return Some(Type::Boolean);
        }

        // `( Expr Boolop Expr )`
        let (left, boolop, right) = match children {
            [_, left, boolop, right, _] => (*left, *boolop, *right),
            _ => return None,
        };

        let (branch, location) = match self.node(boolop) {
            CstNode::Terminal(token) => match token.as_ref() {
                Token::Boolop(Boolop::Equal) => (Branch::EqualTo, token.location().clone()),
                Token::Boolop(Boolop::NotEqual) => (Branch::NotEqualTo, token.location().clone()),
                _ => return None,
            },

            _ => return None,
        };

        self.ast.descend(AstNode::Branch(branch));
        let left = self.expr(left);
        let right = self.expr(right);
        self.ast.ascend();

        if let (Some(left), Some(right)) = (left, right) {
            if left != right {
                self.error(SemanticError::IncorrectTypeComparison(left, right), location);
            }
        }

        Some(Type::Boolean)
    }

    /// Lectura de una variable en una expresión.
    fn read(&mut self, name: char, location: &Location) -> Option<Type> {
        let leaf = Located::at(Leaf::Id(name), location.clone());
        self.ast.leaf(AstNode::Leaf(leaf));

        let typ = self.resolve(name, location)?;
        if let Some(scope) = self.scopes.current() {
            self.scopes.mark_used(scope, name);
        }

        Some(typ)
    }

    /// Tipo declarado de la declaración más cercana.
    fn resolve(&mut self, name: char, location: &Location) -> Option<Type> {
        let found = self
            .scopes
            .current()
            .and_then(|scope| self.scopes.lookup(scope, name))
            .map(|(_, variable)| variable.typ);

        if found.is_none() {
            self.error(SemanticError::UndeclaredVariable(name), location.clone());
        }

        found
    }

    /// Advertencias sobre inicialización y uso, en preorden de alcances.
    fn check_usage(&mut self) {
        for id in self.scopes.preorder() {
            for (name, variable) in self.scopes.get(id).variables() {
                let warning = if !variable.initialized {
                    SemanticWarning::UninitializedVariable(name)
                } else if !variable.used {
                    SemanticWarning::UnusedVariable(name)
                } else {
                    continue;
                };

                self.warnings
                    .push(Located::at(warning, variable.location.clone()));
            }
        }
    }

    fn error(&mut self, error: SemanticError, location: Location) {
        self.errors.push(Located::at(error, location));
    }

    fn children(&self, id: NodeId) -> &'c [NodeId] {
        self.cst.children(id)
    }

    fn node(&self, id: NodeId) -> &'c CstNode {
        self.cst.get(id)
    }

    fn production(&self, id: NodeId) -> Option<Production> {
        match self.node(id) {
            CstNode::Production(production) => Some(*production),
            CstNode::Terminal(_) => None,
        }
    }

    /// Todos los tokens bajo un nodo, en orden.
    fn terminals(&self, id: NodeId) -> Vec<&'c Located<Token>> {
        let cst: &'c Cst = self.cst;
        let mut tokens = Vec::new();
        let mut pending = vec![id];

        while let Some(id) = pending.pop() {
            match cst.get(id) {
                CstNode::Terminal(token) => tokens.push(token),
                CstNode::Production(_) => pending.extend(cst.children(id).iter().rev()),
            }
        }

        tokens
    }

    fn first_location(&self, id: NodeId) -> Option<Location> {
        self.terminals(id)
            .first()
            .map(|token| token.location().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex, parse, source::Source};

    fn analyze_str(text: &str) -> Analysis {
        let source = Source::new("<test>", text);
        let programs = lex::lex(&source);
        assert!(programs[0].error.is_none());

        let parsed = parse::parse(&source, &programs[0].tokens);
        assert!(parsed.error.is_none());

        parsed.cst.analyze()
    }

    fn error_kinds(analysis: &Analysis) -> Vec<&'static str> {
        analysis.errors.iter().map(|e| e.as_ref().kind()).collect()
    }

    fn warning_kinds(analysis: &Analysis) -> Vec<(&'static str, String)> {
        analysis
            .warnings
            .iter()
            .map(|w| (w.as_ref().kind(), w.as_ref().value()))
            .collect()
    }

    fn shape(ast: &Ast, id: NodeId) -> Vec<String> {
        ast.children(id)
            .iter()
            .map(|&child| ast.get(child).to_string())
            .collect()
    }

    #[test]
    fn duplicate_in_same_scope() {
        let analysis = analyze_str("{ int a int a }$");
        assert_eq!(error_kinds(&analysis), vec!["DuplicateVariable"]);
        assert_eq!(analysis.errors[0].location().start().column(), 13);
    }

    #[test]
    fn shadowing_is_legal() {
        let analysis = analyze_str("{ int a { int a } }$");
        assert!(analysis.errors.is_empty());
        assert_eq!(analysis.symbols.len(), 2);
    }

    #[test]
    fn shadowed_types_resolve_to_nearest() {
        let analysis = analyze_str("{ int a { string a a = \"x\" print(a) } a = 1 print(a) }$");
        assert!(analysis.errors.is_empty());
        assert!(analysis.warnings.is_empty());
    }

    #[test]
    fn scope_ids_follow_visitation() {
        let analysis = analyze_str("{ { { int a } } { int b } }$");
        let scopes = &analysis.scopes;

        assert_eq!(scopes.len(), 4);
        assert_eq!(scopes.get(ScopeId(2)).level(), 2);
        assert_eq!(scopes.get(ScopeId(3)).level(), 1);
        assert_eq!(scopes.get(ScopeId(3)).parent(), Some(ScopeId(0)));

        let symbols: Vec<_> = analysis
            .symbols
            .iter()
            .map(|symbol| (symbol.name, symbol.scope, symbol.level))
            .collect();

        assert_eq!(symbols, vec![('a', ScopeId(2), 2), ('b', ScopeId(3), 1)]);
    }

    #[test]
    fn undeclared_variable() {
        let analysis = analyze_str("{ a = 1 { int b } print(b) }$");
        assert_eq!(
            error_kinds(&analysis),
            vec!["UndeclaredVariable", "UndeclaredVariable"]
        );
    }

    #[test]
    fn assignment_type_mismatch() {
        let analysis = analyze_str("{ int a a = \"x\" }$");
        assert_eq!(error_kinds(&analysis), vec!["TypeMismatch"]);
    }

    #[test]
    fn comparison_types_must_match() {
        let analysis = analyze_str("{ print((1 == \"a\")) }$");
        assert_eq!(error_kinds(&analysis), vec!["IncorrectTypeComparison"]);

        let analysis = analyze_str("{ boolean b b = ((1 == 2) != true) print(b) }$");
        assert!(analysis.errors.is_empty());
    }

    #[test]
    fn addition_requires_int() {
        let analysis = analyze_str("{ int a a = 1 + true }$");
        assert_eq!(error_kinds(&analysis), vec!["IncorrectIntegerExpression"]);
    }

    #[test]
    fn traversal_collects_every_error() {
        let analysis = analyze_str("{ int a int a b = 1 a = false }$");
        assert_eq!(
            error_kinds(&analysis),
            vec!["DuplicateVariable", "UndeclaredVariable", "TypeMismatch"]
        );
    }

    #[test]
    fn usage_warnings() {
        let analysis = analyze_str("{ int a int b b = 2 { int c c = 1 print(c) } }$");
        assert!(analysis.errors.is_empty());
        assert_eq!(
            warning_kinds(&analysis),
            vec![
                ("UninitializedVariable", String::from("a")),
                ("UnusedVariable", String::from("b")),
            ]
        );
    }

    #[test]
    fn ast_is_simplified() {
        let analysis = analyze_str("{ int a a = 1 + 2 print((a == 3)) }$");
        let ast = &analysis.ast;
        let root = ast.root().unwrap();

        assert_eq!(shape(ast, root), vec!["<VarDecl>", "<Assignment>", "<Print>"]);

        let assignment = ast.child(root, 1).unwrap();
        assert_eq!(shape(ast, assignment), vec!["[a]", "<Addition>"]);

        let addition = ast.child(assignment, 1).unwrap();
        assert_eq!(shape(ast, addition), vec!["[1]", "[2]"]);

        let print = ast.child(root, 2).unwrap();
        assert_eq!(shape(ast, print), vec!["<EqualTo>"]);
    }

    #[test]
    fn strings_collapse_to_one_leaf() {
        let analysis = analyze_str("{ string s s = \"hi there\" print(s) }$");
        let ast = &analysis.ast;
        let assignment = ast.child(ast.root().unwrap(), 1).unwrap();

        assert_eq!(shape(ast, assignment), vec!["[s]", "[\"hi there\"]"]);
    }

    #[test]
    fn nested_blocks_carry_scopes() {
        let analysis = analyze_str("{ while true { if (1 != 2) { } } }$");
        let text = analysis.ast.to_string();

        assert_eq!(
            text,
            "<Block 0>\n-<While>\n--[true]\n--<Block 1>\n---<If>\n----<NotEqualTo>\n-----[1]\n-----[2]\n----<Block 2>\n"
        );
    }
}
