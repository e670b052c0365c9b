//! Árbol de alcances y listado de símbolos.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use crate::{lex::Type, source::Location};

/// Identificador de alcance.
///
/// Los identificadores se asignan en orden de visita sobre todo el
/// programa, no por profundidad: el segundo bloque hermano de la raíz
/// recibe un identificador mayor que cualquier bloque anidado dentro
/// del primero.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl Display for ScopeId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(fmt)
    }
}

/// Entrada de la tabla de un alcance.
#[derive(Clone, Debug)]
pub struct Variable {
    pub typ: Type,
    pub location: Location,
    pub initialized: bool,
    pub used: bool,
}

#[derive(Debug)]
pub struct Scope {
    id: ScopeId,
    level: u32,
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    table: BTreeMap<char, Variable>,
}

impl Scope {
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// Profundidad de anidamiento, la raíz tiene nivel 0.
    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    pub fn children(&self) -> &[ScopeId] {
        &self.children
    }

    pub fn get(&self, name: char) -> Option<&Variable> {
        self.table.get(&name)
    }

    pub fn variables(&self) -> impl Iterator<Item = (char, &Variable)> {
        self.table.iter().map(|(&name, variable)| (name, variable))
    }
}

/// Árbol de tablas de declaraciones, con la forma del anidamiento de bloques.
#[derive(Debug, Default)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    current: Option<ScopeId>,
}

impl ScopeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn current(&self) -> Option<ScopeId> {
        self.current
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Abre un alcance hijo del actual y lo convierte en el actual.
    pub fn open(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        let (parent, level) = match self.current {
            Some(parent) => (Some(parent), self.get(parent).level + 1),
            None => (None, 0),
        };

        self.scopes.push(Scope {
            id,
            level,
            parent,
            children: Vec::new(),
            table: BTreeMap::new(),
        });

        if let Some(parent) = parent {
            self.scopes[parent.0 as usize].children.push(id);
        }

        self.current = Some(id);
        id
    }

    /// Cierra el alcance actual, regresando a su padre.
    pub fn close(&mut self) {
        self.current = self.current.and_then(|current| self.get(current).parent);
    }

    /// Declara una variable en el alcance actual.
    ///
    /// Solo el alcance actual se examina en busca de duplicados, por lo
    /// cual es válido ocultar declaraciones de alcances ancestros.
    pub fn declare(&mut self, name: char, typ: Type, location: Location) -> Result<ScopeId, ()> {
        let current = self.current.ok_or(())?;
        let table = &mut self.scopes[current.0 as usize].table;

        if table.contains_key(&name) {
            return Err(());
        }

        table.insert(
            name,
            Variable {
                typ,
                location,
                initialized: false,
                used: false,
            },
        );

        Ok(current)
    }

    /// Busca una variable desde `from` hacia sus ancestros, nunca en hermanos.
    pub fn lookup(&self, from: ScopeId, name: char) -> Option<(ScopeId, &Variable)> {
        let mut next = Some(from);
        while let Some(id) = next {
            let scope = self.get(id);
            if let Some(variable) = scope.get(name) {
                return Some((id, variable));
            }

            next = scope.parent;
        }

        None
    }

    pub fn mark_initialized(&mut self, from: ScopeId, name: char) -> bool {
        self.update(from, name, |variable| variable.initialized = true)
    }

    pub fn mark_used(&mut self, from: ScopeId, name: char) -> bool {
        self.update(from, name, |variable| variable.used = true)
    }

    /// Alcances en preorden a partir de la raíz.
    pub fn preorder(&self) -> Vec<ScopeId> {
        let mut order = Vec::with_capacity(self.scopes.len());
        let mut pending: Vec<_> = self
            .scopes
            .iter()
            .filter(|scope| scope.parent.is_none())
            .map(Scope::id)
            .rev()
            .collect();

        while let Some(id) = pending.pop() {
            order.push(id);
            pending.extend(self.get(id).children.iter().rev());
        }

        order
    }

    fn update<F>(&mut self, from: ScopeId, name: char, update: F) -> bool
    where
        F: FnOnce(&mut Variable),
    {
        let owner = self.lookup(from, name).map(|(owner, _)| owner);
        match owner {
            Some(owner) => {
                let table = &mut self.scopes[owner.0 as usize].table;
                table.get_mut(&name).map(update).is_some()
            }

            None => false,
        }
    }
}

impl Display for ScopeTree {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for id in self.preorder() {
            let scope = self.get(id);
            let indent = 2 * scope.level as usize;

            writeln!(fmt, "{:indent$}scope {}", "", id, indent = indent)?;
            for (name, variable) in scope.variables() {
                writeln!(
                    fmt,
                    "{:indent$}  {}: {}{}{}",
                    "",
                    name,
                    variable.typ,
                    if variable.initialized { " initialized" } else { "" },
                    if variable.used { " used" } else { "" },
                    indent = indent
                )?;
            }
        }

        Ok(())
    }
}

/// Entrada del listado plano de símbolos.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: char,
    pub typ: Type,
    pub scope: ScopeId,
    pub level: u32,
    pub location: Location,
}

/// Listado de símbolos en orden de declaración, para consumo externo.
#[derive(Debug, Default)]
pub struct SymbolList(pub Vec<Symbol>);

impl SymbolList {
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for SymbolList {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(fmt, "{:<6}{:<9}{:<7}{:<7}{}", "name", "type", "scope", "level", "position")?;
        for symbol in &self.0 {
            writeln!(
                fmt,
                "{:<6}{:<9}{:<7}{:<7}{}",
                symbol.name,
                symbol.typ.to_string(),
                symbol.scope.to_string(),
                symbol.level,
                symbol.location.start()
            )?;
        }

        Ok(())
    }
}
