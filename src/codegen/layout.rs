//! Tablas de disposición de memoria: estáticos, heap y saltos.

use std::{
    collections::BTreeMap,
    fmt::{self, Display},
};

use super::{
    image::{IMAGE_SIZE, TRUE_ADDRESS},
    CodegenError, Region,
};

use crate::{lex::Type, semantic::ScopeId};

/// Nombre temporal de un espacio estático, `T#` en el listado.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(pub u32);

impl Display for TempId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "T{}", self.0)
    }
}

/// Nombre temporal de un salto hacia adelante, `J#` en el listado.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JumpId(pub u32);

impl Display for JumpId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "J{}", self.0)
    }
}

/// Espacio estático de un byte.
///
/// Los espacios de variables llevan nombre y alcance; los temporales
/// de expresiones y la celda de condiciones no tienen nombre.
#[derive(Clone, Debug)]
pub struct StaticEntry {
    pub name: Option<char>,
    pub typ: Option<Type>,
    pub scope: Option<ScopeId>,
    pub address: Option<u8>,
}

#[derive(Debug, Default)]
pub struct StaticTable {
    entries: Vec<StaticEntry>,
}

impl StaticTable {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, temp: TempId) -> &StaticEntry {
        &self.entries[temp.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (TempId, &StaticEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (TempId(index as u32), entry))
    }

    /// Reserva el espacio de una variable declarada.
    pub fn declare(&mut self, name: char, typ: Type, scope: ScopeId) -> TempId {
        self.push(StaticEntry {
            name: Some(name),
            typ: Some(typ),
            scope: Some(scope),
            address: None,
        })
    }

    /// Reserva un temporal anónimo.
    pub fn temporary(&mut self, typ: Option<Type>) -> TempId {
        self.push(StaticEntry {
            name: None,
            typ,
            scope: None,
            address: None,
        })
    }

    /// Espacio de la variable `name` declarada exactamente en `scope`.
    pub fn find(&self, name: char, scope: ScopeId) -> Option<TempId> {
        self.iter()
            .find(|(_, entry)| entry.name == Some(name) && entry.scope == Some(scope))
            .map(|(temp, _)| temp)
    }

    /// Asigna direcciones consecutivas a partir de `start`. Falla si el
    /// último espacio alcanza `limit`.
    pub fn place(&mut self, start: usize, limit: usize) -> Result<(), CodegenError> {
        if start + self.entries.len() > limit {
            return Err(CodegenError::OutOfMemory(Region::Static));
        }

        for (offset, entry) in self.entries.iter_mut().enumerate() {
            entry.address = Some((start + offset) as u8);
        }

        Ok(())
    }

    pub fn address(&self, temp: TempId) -> Option<u8> {
        self.entries.get(temp.0 as usize).and_then(|entry| entry.address)
    }

    fn push(&mut self, entry: StaticEntry) -> TempId {
        let temp = TempId(self.entries.len() as u32);
        self.entries.push(entry);
        temp
    }
}

impl Display for StaticTable {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(fmt, "{:<6}{:<6}{:<9}{:<7}{}", "temp", "var", "type", "scope", "address")?;
        for (temp, entry) in self.iter() {
            let show = |value: Option<String>| value.unwrap_or_else(|| String::from("-"));
            writeln!(
                fmt,
                "{:<6}{:<6}{:<9}{:<7}{}",
                temp.to_string(),
                show(entry.name.map(String::from)),
                show(entry.typ.map(|typ| typ.to_string())),
                show(entry.scope.map(|scope| scope.to_string())),
                show(entry.address.map(|address| format!("{:02X}", address)))
            )?;
        }

        Ok(())
    }
}

/// Cadenas constantes, asignadas desde el final de la memoria hacia abajo.
///
/// Cada contenido distinto ocupa un único bloque terminado en 0.
#[derive(Debug)]
pub struct HeapTable {
    bottom: usize,
    strings: BTreeMap<String, u8>,
}

impl Default for HeapTable {
    fn default() -> Self {
        HeapTable {
            bottom: TRUE_ADDRESS as usize,
            strings: BTreeMap::new(),
        }
    }
}

impl HeapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dirección más baja ocupada por el heap.
    pub fn bottom(&self) -> usize {
        self.bottom
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn get(&self, text: &str) -> Option<u8> {
        self.strings.get(text).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u8)> {
        self.strings.iter().map(|(text, &address)| (text.as_str(), address))
    }

    /// Reserva espacio para `text`, o retorna la dirección previa si el
    /// contenido ya existe. El segundo valor indica si la reserva es nueva.
    /// `floor` es la primera dirección que el heap no puede ocupar.
    pub fn intern(&mut self, text: &str, floor: usize) -> Result<(u8, bool), CodegenError> {
        if let Some(address) = self.get(text) {
            return Ok((address, false));
        }

        let size = text.len() + 1;
        if self.bottom < floor + size {
            return Err(CodegenError::OutOfMemory(Region::Heap));
        }

        self.bottom -= size;

        let address = self.bottom as u8;
        self.strings.insert(String::from(text), address);

        Ok((address, true))
    }
}

impl Display for HeapTable {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(fmt, "{:<9}{}", "address", "string")?;

        let mut strings: Vec<_> = self.iter().collect();
        strings.sort_by_key(|&(_, address)| address);

        for (text, address) in strings {
            writeln!(fmt, "{:<9}{:?}", format!("{:02X}", address), text)?;
        }

        Ok(())
    }
}

/// Desplazamientos de saltos hacia adelante.
#[derive(Debug, Default)]
pub struct JumpTable {
    offsets: Vec<Option<u8>>,
}

impl JumpTable {
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn allocate(&mut self) -> JumpId {
        let jump = JumpId(self.offsets.len() as u32);
        self.offsets.push(None);
        jump
    }

    /// Fija la distancia de un salto, medida desde la instrucción siguiente.
    pub fn resolve(&mut self, jump: JumpId, distance: usize) -> Result<(), CodegenError> {
        if distance >= IMAGE_SIZE {
            return Err(CodegenError::OutOfMemory(Region::Code));
        }

        if let Some(offset) = self.offsets.get_mut(jump.0 as usize) {
            *offset = Some(distance as u8);
        }

        Ok(())
    }

    pub fn get(&self, jump: JumpId) -> Option<u8> {
        self.offsets.get(jump.0 as usize).copied().flatten()
    }
}

impl Display for JumpTable {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(fmt, "{:<6}{}", "jump", "distance")?;
        for (index, offset) in self.offsets.iter().enumerate() {
            match offset {
                Some(offset) => writeln!(fmt, "{:<6}{}", JumpId(index as u32).to_string(), offset)?,
                None => writeln!(fmt, "{:<6}?", JumpId(index as u32).to_string())?,
            }
        }

        Ok(())
    }
}
