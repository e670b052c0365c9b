//! Imagen de memoria de 256 bytes.

use std::fmt::{self, Display};

use super::layout::{JumpId, TempId};

/// Tamaño total de la memoria de la máquina objetivo.
pub const IMAGE_SIZE: usize = 256;

/// Dirección de la cadena `"true"`, referencia canónica del valor verdadero.
pub const TRUE_ADDRESS: u8 = 0xF5;

/// Dirección de la cadena `"false"`, referencia canónica del valor falso.
pub const FALSE_ADDRESS: u8 = 0xFA;

/// Dirección que representa a un valor booleano.
pub fn bool_address(value: bool) -> u8 {
    if value {
        TRUE_ADDRESS
    } else {
        FALSE_ADDRESS
    }
}

/// Instrucciones de la máquina objetivo.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Opcode {
    /// Carga una constante en el acumulador.
    LdaConst = 0xA9,
    /// Carga el acumulador desde memoria.
    LdaMem = 0xAD,
    /// Guarda el acumulador en memoria.
    Sta = 0x8D,
    /// Suma un valor en memoria al acumulador.
    Adc = 0x6D,
    LdxConst = 0xA2,
    LdxMem = 0xAE,
    LdyConst = 0xA0,
    LdyMem = 0xAC,
    /// Compara memoria contra X, fijando la bandera Z si son iguales.
    Cpx = 0xEC,
    /// Salto relativo si Z no está activa.
    Bne = 0xD0,
    /// Llamada al sistema: X = 1 imprime el entero en Y, X = 2 imprime
    /// la cadena terminada en 0 que inicia en la dirección Y.
    Sys = 0xFF,
    Brk = 0x00,
}

/// Una celda de la imagen antes de backpatching.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    /// Byte conocido.
    Byte(u8),

    /// Byte bajo de la dirección de un espacio estático aún sin ubicar.
    Static(TempId),

    /// Desplazamiento de un salto cuyo destino aún se desconoce.
    Jump(JumpId),
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Byte(0)
    }
}

impl From<Opcode> for Cell {
    fn from(opcode: Opcode) -> Self {
        Cell::Byte(opcode as u8)
    }
}

impl Display for Cell {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Byte(byte) => write!(fmt, "{:02X}", byte),
            Cell::Static(temp) => temp.fmt(fmt),
            Cell::Jump(jump) => jump.fmt(fmt),
        }
    }
}

/// Imagen final, completamente resuelta.
#[derive(Clone, PartialEq, Eq)]
pub struct Image([u8; IMAGE_SIZE]);

impl Image {
    pub fn new(bytes: [u8; IMAGE_SIZE]) -> Self {
        Image(bytes)
    }

    pub fn bytes(&self) -> &[u8; IMAGE_SIZE] {
        &self.0
    }

    pub fn get(&self, address: u8) -> u8 {
        self.0[address as usize]
    }

    /// Cada byte como dos dígitos hexadecimales en mayúscula.
    pub fn to_hex(&self) -> Vec<String> {
        self.0.iter().map(|byte| format!("{:02X}", byte)).collect()
    }
}

impl fmt::Debug for Image {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        <Self as Display>::fmt(self, fmt)
    }
}

impl Display for Image {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.0.chunks(32) {
            let row: Vec<_> = row.iter().map(|byte| format!("{:02X}", byte)).collect();
            writeln!(fmt, "{}", row.join(" "))?;
        }

        Ok(())
    }
}
