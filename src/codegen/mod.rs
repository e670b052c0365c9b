//! Generación de código para la máquina de 8 bits.
//!
//! El árbol abstracto se recorre una sola vez, emitiendo celdas a partir
//! de la dirección 0. Las direcciones de variables y temporales y las
//! distancias de saltos hacia adelante se desconocen durante el
//! recorrido, por lo que se emiten como marcadores `T#` y `J#`. Al
//! terminar se ubican los estáticos justo después del `BRK` final y se
//! reemplazan todos los marcadores.
//!
//! Disposición final de la memoria:
//!
//! ```text
//! 00 ........ código, BRK | estáticos | ... libre ... | heap | "true" "false"
//! ```

use std::rc::Rc;

use thiserror::Error;

use crate::{
    error::Report,
    lex::Type,
    semantic::{Analysis, Ast, AstNode, Branch, Leaf, ScopeId, ScopeTree},
    source::{Located, Location, Position, Source},
    tree::NodeId,
};

mod image;
mod layout;

pub use image::{bool_address, Cell, Image, Opcode, FALSE_ADDRESS, IMAGE_SIZE, TRUE_ADDRESS};
pub use layout::{HeapTable, JumpId, JumpTable, StaticEntry, StaticTable, TempId};

macro_rules! emit {
    ($self:expr, $opcode:ident) => {
        $self.emit(Opcode::$opcode, Operand::None)
    };

    ($self:expr, $opcode:ident, $kind:ident($value:expr)) => {
        $self.emit(Opcode::$opcode, Operand::$kind($value))
    };
}

/// Región de memoria agotada.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Region {
    Code,
    Static,
    Heap,
}

impl std::fmt::Display for Region {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.write_str(match self {
            Region::Code => "code",
            Region::Static => "static data",
            Region::Heap => "heap",
        })
    }
}

#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodegenError {
    #[error("Program does not fit in {} bytes: {0} collides with another region", IMAGE_SIZE)]
    OutOfMemory(Region),

    #[error("Comparisons with boolean comparisons on both sides are not supported")]
    NestedBooleanComparison,

    #[error("Variable `{0}` has no storage assigned")]
    UnresolvedVariable(char),

    #[error("Malformed abstract syntax tree")]
    MalformedTree,
}

impl Report for CodegenError {
    fn kind(&self) -> &'static str {
        match self {
            CodegenError::OutOfMemory(_) => "OutOfMemory",
            CodegenError::NestedBooleanComparison => "NestedBooleanComparison",
            CodegenError::UnresolvedVariable(_) => "UnresolvedVariable",
            CodegenError::MalformedTree => "MalformedTree",
        }
    }

    fn value(&self) -> String {
        match self {
            CodegenError::OutOfMemory(region) => region.to_string(),
            CodegenError::NestedBooleanComparison | CodegenError::MalformedTree => String::new(),
            CodegenError::UnresolvedVariable(name) => name.to_string(),
        }
    }
}

/// Resultado de la generación.
#[derive(Debug)]
pub struct Output {
    /// Imagen final, sin marcadores.
    pub image: Image,

    /// Celdas antes de backpatching, útil para depuración.
    pub listing: Vec<Cell>,

    pub statics: StaticTable,
    pub heap: HeapTable,
    pub jumps: JumpTable,

    /// Dirección del `BRK` que termina el código.
    pub code_end: u8,
}

impl Analysis {
    pub fn generate(&self, source: &Rc<Source>) -> Result<Output, Located<CodegenError>> {
        generate(source, self)
    }
}

/// Genera la imagen de un programa ya analizado sin errores.
pub fn generate(source: &Rc<Source>, analysis: &Analysis) -> Result<Output, Located<CodegenError>> {
    let mut generator = Generator {
        ast: &analysis.ast,
        scopes: &analysis.scopes,
        cells: vec![Cell::default(); IMAGE_SIZE],
        code: 0,
        heap: HeapTable::new(),
        statics: StaticTable::default(),
        jumps: JumpTable::default(),
        scope: None,
        scratch: None,
        location: Location::at(source, Position::default()),
    };

    generator.seed();
    if let Some(root) = analysis.ast.root() {
        generator.statement(root)?;
    }

    generator.finish()
}

type Generate<T = ()> = Result<T, Located<CodegenError>>;

/// Operando de una instrucción.
#[derive(Copy, Clone)]
enum Operand {
    None,
    /// Inmediato o desplazamiento, un byte.
    Const(u8),
    /// Dirección absoluta de un estático, dos bytes con el alto en 0.
    Mem(TempId),
    /// Desplazamiento pendiente.
    Jump(JumpId),
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum Register {
    A,
    X,
    Y,
}

impl Register {
    fn load_const(self) -> Opcode {
        match self {
            Register::A => Opcode::LdaConst,
            Register::X => Opcode::LdxConst,
            Register::Y => Opcode::LdyConst,
        }
    }

    fn load_mem(self) -> Opcode {
        match self {
            Register::A => Opcode::LdaMem,
            Register::X => Opcode::LdxMem,
            Register::Y => Opcode::LdyMem,
        }
    }
}

/// Clasificación de un nodo de expresión.
enum Value<'a> {
    Digit(u8),
    Str(&'a str),
    Bool(bool),
    Id(char),
    Addition,
    Comparison,
}

struct Generator<'a> {
    ast: &'a Ast,
    scopes: &'a ScopeTree,
    cells: Vec<Cell>,
    code: usize,
    heap: HeapTable,
    statics: StaticTable,
    jumps: JumpTable,
    scope: Option<ScopeId>,
    scratch: Option<TempId>,
    location: Location,
}

impl<'a> Generator<'a> {
    /// Cadenas fijas de los valores booleanos.
    fn seed(&mut self) {
        for &(text, address) in &[("true", TRUE_ADDRESS), ("false", FALSE_ADDRESS)] {
            self.store_string(text, address);
        }
    }

    fn statement(&mut self, id: NodeId) -> Generate {
        match self.node(id) {
            AstNode::Branch(Branch::Block(scope)) => self.block(id, *scope),
            AstNode::Branch(Branch::VarDecl) => self.var_decl(id),
            AstNode::Branch(Branch::Assignment) => self.assignment(id),
            AstNode::Branch(Branch::Print) => self.print(id),
            AstNode::Branch(Branch::While) => self.while_loop(id),
            AstNode::Branch(Branch::If) => self.if_branch(id),
            _ => Ok(()),
        }
    }

    fn block(&mut self, id: NodeId, scope: ScopeId) -> Generate {
        let outer = self.scope.replace(scope);
        for &child in self.children(id) {
            self.statement(child)?;
        }

        self.scope = outer;
        Ok(())
    }

    /// Reserva el espacio de la variable y lo inicializa con el valor
    /// nulo de su tipo.
    fn var_decl(&mut self, id: NodeId) -> Generate {
        let (typ, name) = match self.children(id) {
            [typ, name] => match (self.leaf(*typ), self.leaf(*name)) {
                (Some(Leaf::Type(typ)), Some(Leaf::Id(name))) => (*typ, *name),
                _ => return Ok(()),
            },

            _ => return Ok(()),
        };

        let scope = match self.scope {
            Some(scope) => scope,
            None => return Err(self.fail(CodegenError::UnresolvedVariable(name))),
        };

        let initial = match typ {
            Type::Int => 0,
            Type::Boolean => FALSE_ADDRESS,
            Type::String => self.intern("")?,
        };

        let slot = self.statics.declare(name, typ, scope);
        emit!(self, LdaConst, Const(initial))?;
        emit!(self, Sta, Mem(slot))
    }

    fn assignment(&mut self, id: NodeId) -> Generate {
        let (target, value) = match self.children(id) {
            [target, value] => (*target, *value),
            _ => return Ok(()),
        };

        let name = match self.leaf(target) {
            Some(Leaf::Id(name)) => *name,
            _ => return Ok(()),
        };

        self.load(Register::A, value)?;
        let slot = self.slot(name)?;
        emit!(self, Sta, Mem(slot))
    }

    fn print(&mut self, id: NodeId) -> Generate {
        let value = match self.children(id).first() {
            Some(&value) => value,
            None => return Ok(()),
        };

        let typ = self.load(Register::Y, value)?;
        let service = match typ {
            Type::Int => 1,
            Type::String | Type::Boolean => 2,
        };

        emit!(self, LdxConst, Const(service))?;
        emit!(self, Sys)
    }

    fn if_branch(&mut self, id: NodeId) -> Generate {
        let (condition, body) = match self.children(id) {
            [condition, body] => (*condition, *body),
            _ => return Ok(()),
        };

        let jump = self.condition(condition)?;
        let skip_from = self.code;

        self.statement(body)?;
        self.resolve(jump, skip_from)
    }

    /// El salto de salida también pasa por encima del salto de regreso.
    fn while_loop(&mut self, id: NodeId) -> Generate {
        let (condition, body) = match self.children(id) {
            [condition, body] => (*condition, *body),
            _ => return Ok(()),
        };

        let start = self.code;
        let jump = self.condition(condition)?;
        let skip_from = self.code;

        self.statement(body)?;

        // Salto incondicional: X = 1 nunca es igual a la celda en 0
        let scratch = self.scratch();
        emit!(self, LdaConst, Const(0))?;
        emit!(self, Sta, Mem(scratch))?;
        emit!(self, LdxConst, Const(1))?;
        emit!(self, Cpx, Mem(scratch))?;

        let back = (start + IMAGE_SIZE - (self.code + 2)) % IMAGE_SIZE;
        emit!(self, Bne, Const(back as u8))?;

        self.resolve(jump, skip_from)
    }

    /// Evalúa una condición y emite un salto hacia adelante que se toma
    /// cuando la condición es falsa.
    fn condition(&mut self, id: NodeId) -> Generate<JumpId> {
        self.load(Register::A, id)?;

        let scratch = self.scratch();
        emit!(self, Sta, Mem(scratch))?;
        emit!(self, LdxConst, Const(TRUE_ADDRESS))?;
        emit!(self, Cpx, Mem(scratch))?;

        let jump = self.jumps.allocate();
        emit!(self, Bne, Jump(jump))?;

        Ok(jump)
    }

    /// Materializa una expresión en un registro y retorna su tipo.
    fn load(&mut self, register: Register, id: NodeId) -> Generate<Type> {
        let typ = match self.value(id) {
            Some(Value::Digit(digit)) => {
                self.emit(register.load_const(), Operand::Const(digit))?;
                Type::Int
            }

            Some(Value::Str(text)) => {
                let address = self.intern(text)?;
                self.emit(register.load_const(), Operand::Const(address))?;
                Type::String
            }

            Some(Value::Bool(value)) => {
                self.emit(register.load_const(), Operand::Const(bool_address(value)))?;
                Type::Boolean
            }

            Some(Value::Id(name)) => {
                let slot = self.slot(name)?;
                self.emit(register.load_mem(), Operand::Mem(slot))?;
                self.type_of(slot)
            }

            // La suma queda en A además de en su temporal
            Some(Value::Addition) => {
                let sum = self.addition(id)?;
                if register != Register::A {
                    self.emit(register.load_mem(), Operand::Mem(sum))?;
                }

                Type::Int
            }

            Some(Value::Comparison) => {
                self.comparison_value(id)?;
                if register != Register::A {
                    let scratch = self.scratch();
                    emit!(self, Sta, Mem(scratch))?;
                    self.emit(register.load_mem(), Operand::Mem(scratch))?;
                }

                Type::Boolean
            }

            None => Type::Int,
        };

        Ok(typ)
    }

    /// `digit + expr`, de derecha a izquierda. Retorna el temporal con
    /// la suma, que además queda en el acumulador.
    fn addition(&mut self, id: NodeId) -> Generate<TempId> {
        let (digit, right) = match self.children(id) {
            [digit, right] => (*digit, *right),
            _ => return Err(self.fail(CodegenError::MalformedTree)),
        };

        let operand = match self.value(right) {
            Some(Value::Addition) => self.addition(right)?,
            _ => {
                self.load(Register::A, right)?;
                let temp = self.statics.temporary(Some(Type::Int));
                emit!(self, Sta, Mem(temp))?;
                temp
            }
        };

        let digit = match self.leaf(digit) {
            Some(Leaf::Digit(digit)) => *digit,
            _ => 0,
        };

        let sum = self.statics.temporary(Some(Type::Int));
        emit!(self, LdaConst, Const(digit))?;
        emit!(self, Adc, Mem(operand))?;
        emit!(self, Sta, Mem(sum))?;

        Ok(sum)
    }

    /// Deja el operando izquierdo en X y retorna el temporal que guarda
    /// el derecho, listos para `CPX`.
    fn comparison(&mut self, id: NodeId) -> Generate<TempId> {
        let (left, right) = match self.children(id) {
            [left, right] => (*left, *right),
            _ => return Err(self.fail(CodegenError::MalformedTree)),
        };

        if self.is_comparison(left) && self.is_comparison(right) {
            return Err(self.fail(CodegenError::NestedBooleanComparison));
        }

        let typ = self.load(Register::A, right)?;
        let operand = self.statics.temporary(Some(typ));
        emit!(self, Sta, Mem(operand))?;

        self.load(Register::X, left)?;
        Ok(operand)
    }

    /// Deja en el acumulador la dirección de `"true"` o `"false"`.
    fn comparison_value(&mut self, id: NodeId) -> Generate {
        let (on_equal, on_differ) = match self.node(id) {
            AstNode::Branch(Branch::NotEqualTo) => (FALSE_ADDRESS, TRUE_ADDRESS),
            _ => (TRUE_ADDRESS, FALSE_ADDRESS),
        };

        let operand = self.comparison(id)?;
        emit!(self, Cpx, Mem(operand))?;
        emit!(self, LdaConst, Const(on_differ))?;
        emit!(self, Bne, Const(2))?;
        emit!(self, LdaConst, Const(on_equal))
    }

    /// Espacio de la declaración visible más cercana.
    ///
    /// Solo se consideran declaraciones ya emitidas, de modo que una
    /// declaración posterior en un bloque interno no oculta a la externa.
    fn slot(&mut self, name: char) -> Generate<TempId> {
        let mut next = self.scope;
        while let Some(scope) = next {
            if let Some(slot) = self.statics.find(name, scope) {
                return Ok(slot);
            }

            next = self.scopes.get(scope).parent();
        }

        Err(self.fail(CodegenError::UnresolvedVariable(name)))
    }

    fn type_of(&self, slot: TempId) -> Type {
        self.statics.get(slot).typ.unwrap_or(Type::Int)
    }

    /// Celda compartida por condiciones y saltos incondicionales.
    fn scratch(&mut self) -> TempId {
        match self.scratch {
            Some(scratch) => scratch,
            None => {
                let scratch = self.statics.temporary(None);
                self.scratch = Some(scratch);
                scratch
            }
        }
    }

    fn intern(&mut self, text: &str) -> Generate<u8> {
        let (address, new) = match self.heap.intern(text, self.code) {
            Ok(interned) => interned,
            Err(error) => return Err(self.fail(error)),
        };

        if new {
            self.store_string(text, address);
        }

        Ok(address)
    }

    fn store_string(&mut self, text: &str, address: u8) {
        let start = address as usize;
        for (offset, byte) in text.bytes().chain(Some(0)).enumerate() {
            if let Some(cell) = self.cells.get_mut(start + offset) {
                *cell = Cell::Byte(byte);
            }
        }
    }

    fn resolve(&mut self, jump: JumpId, from: usize) -> Generate {
        match self.jumps.resolve(jump, self.code - from) {
            Ok(()) => Ok(()),
            Err(error) => Err(self.fail(error)),
        }
    }

    fn emit(&mut self, opcode: Opcode, operand: Operand) -> Generate {
        self.push(opcode.into())?;
        match operand {
            Operand::None => Ok(()),
            Operand::Const(byte) => self.push(Cell::Byte(byte)),
            Operand::Mem(temp) => {
                self.push(Cell::Static(temp))?;
                self.push(Cell::Byte(0))
            }

            Operand::Jump(jump) => self.push(Cell::Jump(jump)),
        }
    }

    fn push(&mut self, cell: Cell) -> Generate {
        if self.code >= self.heap.bottom() {
            return Err(self.fail(CodegenError::OutOfMemory(Region::Code)));
        }

        self.cells[self.code] = cell;
        self.code += 1;

        Ok(())
    }

    /// Cierra el código con `BRK`, ubica los estáticos y reemplaza marcadores.
    fn finish(mut self) -> Result<Output, Located<CodegenError>> {
        emit!(self, Brk)?;

        let code_end = self.code - 1;
        if let Err(error) = self.statics.place(self.code, self.heap.bottom()) {
            return Err(self.fail(error));
        }

        let mut bytes = [0; IMAGE_SIZE];
        for (byte, cell) in bytes.iter_mut().zip(&self.cells) {
            *byte = match *cell {
                Cell::Byte(byte) => byte,
                Cell::Static(temp) => self.statics.address(temp).unwrap_or(0),
                Cell::Jump(jump) => self.jumps.get(jump).unwrap_or(0),
            };
        }

        Ok(Output {
            image: Image::new(bytes),
            listing: self.cells,
            statics: self.statics,
            heap: self.heap,
            jumps: self.jumps,
            code_end: code_end as u8,
        })
    }

    fn value(&mut self, id: NodeId) -> Option<Value<'a>> {
        let ast: &'a Ast = self.ast;
        let value = match ast.get(id) {
            AstNode::Branch(Branch::Addition) => Value::Addition,
            AstNode::Branch(Branch::EqualTo) | AstNode::Branch(Branch::NotEqualTo) => {
                Value::Comparison
            }

            AstNode::Branch(_) => return None,
            AstNode::Leaf(leaf) => {
                self.location = leaf.location().clone();
                match leaf.val() {
                    Leaf::Digit(digit) => Value::Digit(*digit),
                    Leaf::Str(text) => Value::Str(text),
                    Leaf::Bool(value) => Value::Bool(*value),
                    Leaf::Id(name) => Value::Id(*name),
                    Leaf::Type(_) => return None,
                }
            }
        };

        Some(value)
    }

    fn is_comparison(&self, id: NodeId) -> bool {
        matches!(
            self.node(id),
            AstNode::Branch(Branch::EqualTo) | AstNode::Branch(Branch::NotEqualTo)
        )
    }

    fn leaf(&mut self, id: NodeId) -> Option<&'a Leaf> {
        let ast: &'a Ast = self.ast;
        match ast.get(id) {
            AstNode::Leaf(leaf) => {
                self.location = leaf.location().clone();
                Some(leaf.val())
            }

            AstNode::Branch(_) => None,
        }
    }

    fn children(&self, id: NodeId) -> &'a [NodeId] {
        self.ast.children(id)
    }

    fn node(&self, id: NodeId) -> &'a AstNode {
        self.ast.get(id)
    }

    fn fail(&self, error: CodegenError) -> Located<CodegenError> {
        Located::at(error, self.location.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lex::lex, parse::parse};

    fn compile(text: &str) -> Result<Output, Located<CodegenError>> {
        let source = Source::new("<test>", text);
        let lexed = lex(&source).remove(0);
        assert!(lexed.error.is_none());

        let parsed = parse(&source, &lexed.tokens);
        assert!(parsed.error.is_none());

        let analysis = parsed.cst.analyze();
        assert!(analysis.errors.is_empty());

        analysis.generate(&source)
    }

    fn output(text: &str) -> Output {
        compile(text).unwrap()
    }

    #[test]
    fn declaration_assignment_and_print() {
        let output = output("{ int a a = 1 print(a) }$");
        let bytes = output.image.bytes();

        assert_eq!(
            &bytes[..17],
            &[
                0xA9, 0x00, 0x8D, 0x11, 0x00, 0xA9, 0x01, 0x8D, 0x11, 0x00, 0xAC, 0x11, 0x00,
                0xA2, 0x01, 0xFF, 0x00
            ]
        );

        assert_eq!(output.code_end, 0x10);
        assert_eq!(output.statics.len(), 1);
        assert_eq!(output.statics.address(TempId(0)), Some(0x11));
    }

    #[test]
    fn boolean_strings_are_fixed() {
        let output = output("{}$");
        let bytes = output.image.bytes();

        assert_eq!(&bytes[0xF5..0xFA], b"true\0");
        assert_eq!(&bytes[0xFA..], b"false\0");
        assert_eq!(bytes[0], 0x00);
    }

    #[test]
    fn strings_are_interned_once() {
        let output = output("{ string s s = \"hi\" s = \"hi\" print(s) }$");
        let address = output.heap.get("hi").unwrap();

        assert_eq!(output.heap.iter().filter(|&(text, _)| text == "hi").count(), 1);
        assert_eq!(&output.image.bytes()[address as usize..address as usize + 3], b"hi\0");

        let loads = output
            .image
            .bytes()
            .windows(2)
            .filter(|pair| pair == &[0xA9, address])
            .count();

        assert_eq!(loads, 2);
    }

    #[test]
    fn no_placeholders_survive() {
        let output = output("{ int a a = 1 + a while (a != 5) { a = 1 + a } print(a) }$");

        assert!(output
            .listing
            .iter()
            .any(|cell| matches!(cell, Cell::Static(_))));

        assert!(output.listing.iter().any(|cell| matches!(cell, Cell::Jump(_))));
        assert!(output
            .image
            .to_hex()
            .iter()
            .all(|byte| byte.len() == 2 && u8::from_str_radix(byte, 16).is_ok()));
    }

    #[test]
    fn if_branch_skips_body() {
        let output = output("{ if true { print(1) } }$");
        let bytes = output.image.bytes();

        assert_eq!(
            &bytes[..18],
            &[
                0xA9, 0xF5, 0x8D, 0x12, 0x00, 0xA2, 0xF5, 0xEC, 0x12, 0x00, 0xD0, 0x05, 0xA0,
                0x01, 0xA2, 0x01, 0xFF, 0x00
            ]
        );

        assert_eq!(output.jumps.get(JumpId(0)), Some(5));
    }

    #[test]
    fn while_loop_offsets() {
        let output = output("{ int a a = 0 while (a != 3) { a = 1 + a } }$");
        let bytes = output.image.bytes();

        // Salto de salida, sobre el cuerpo y el salto de regreso
        assert_eq!(&bytes[35..37], &[0xD0, 0x1D]);
        assert_eq!(output.jumps.get(JumpId(0)), Some(0x1D));

        // Salto de regreso al inicio de la condición, en la dirección 10
        assert_eq!(&bytes[64..67], &[0xD0, 0xC8, 0x00]);
        assert_eq!((66 + bytes[65] as usize) % IMAGE_SIZE, 10);
        assert_eq!(output.code_end, 66);
    }

    #[test]
    fn addition_reuses_inner_results() {
        let output = output("{ int a a = 1 + 2 + 3 print(a) }$");

        // a, el operando 3, la suma interna y la suma externa
        assert_eq!(output.statics.len(), 4);
        assert_eq!(&output.image.bytes()[5..12], &[0xA9, 0x03, 0x8D, 0x25, 0x00, 0xA9, 0x02]);
    }

    #[test]
    fn comparison_printing() {
        let output = output("{ print((1 == 2)) }$");
        let bytes = output.image.bytes();

        // Derecho en un temporal, izquierdo en X
        assert_eq!(&bytes[..7], &[0xA9, 0x02, 0x8D, 0x1A, 0x00, 0xA2, 0x01]);

        // CPX, idioma de valor booleano
        assert_eq!(&bytes[7..10], &[0xEC, 0x1A, 0x00]);
        assert_eq!(&bytes[10..16], &[0xA9, 0xFA, 0xD0, 0x02, 0xA9, 0xF5]);

        // Resultado a Y, impresión de cadena
        assert_eq!(&bytes[19..25], &[0xAC, 0x1B, 0x00, 0xA2, 0x02, 0xFF]);
    }

    #[test]
    fn shadowed_variables_get_separate_slots() {
        let output = output("{ int a a = 1 { string a a = \"x\" print(a) } print(a) }$");

        let slots: Vec<_> = output
            .statics
            .iter()
            .filter(|(_, entry)| entry.name == Some('a'))
            .map(|(_, entry)| (entry.typ, entry.scope))
            .collect();

        assert_eq!(
            slots,
            vec![
                (Some(Type::Int), Some(ScopeId(0))),
                (Some(Type::String), Some(ScopeId(1)))
            ]
        );
    }

    #[test]
    fn nested_comparisons_on_both_sides() {
        let error = compile("{ print(((1 == 1) == (2 == 2))) }$").unwrap_err();
        assert_eq!(error.val(), &CodegenError::NestedBooleanComparison);

        assert!(compile("{ print(((1 == 1) == true)) }$").is_ok());
    }

    #[test]
    fn out_of_memory() {
        let mut text = String::from("{");
        for _ in 0..60 {
            text.push_str(" print(1)");
        }

        text.push_str(" }$");

        let error = compile(&text).unwrap_err();
        assert_eq!(error.val(), &CodegenError::OutOfMemory(Region::Code));
        assert_eq!(error.val().kind(), "OutOfMemory");
    }

    #[test]
    fn statics_collide_with_heap() {
        let mut text = String::from("{");
        for _ in 0..12 {
            text.push_str(" print(1 + 1)");
        }

        text.push_str(" }$");

        // 229 bytes de código caben, pero no sus 24 estáticos
        let error = compile(&text).unwrap_err();
        assert_eq!(error.val(), &CodegenError::OutOfMemory(Region::Static));
    }
}
