//! Compilador de un lenguaje de bloques para una máquina de 8 bits.
//!
//! # Front end
//! Un texto fuente puede contener varios programas, cada uno terminado
//! en `$`. El texto se somete primero a análisis léxico en [`lex`], de
//! lo cual se obtiene un flujo de tokens por programa. Cada flujo se
//! dispone en un árbol concreto por medio de análisis sintáctico
//! descendente en [`parse`]. El árbol concreto es procesado por
//! análisis semántico en [`semantic`], que produce el árbol abstracto,
//! el árbol de alcances y el listado de símbolos, y verifica tipos.
//!
//! # Back end
//! [`codegen`] traduce el árbol abstracto a una imagen de 256 bytes con
//! código, datos estáticos y cadenas constantes, resolviendo direcciones
//! y saltos por backpatching.
//!
//! [`pipeline`] encadena todas las fases, y es el punto de entrada
//! recomendado para consumidores de esta biblioteca.

pub mod codegen;
pub mod error;
pub mod lex;
pub mod parse;
pub mod pipeline;
pub mod semantic;
pub mod source;
pub mod tree;
