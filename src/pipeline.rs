//! Compilación completa de un texto fuente.
//!
//! Un texto puede contener varios programas separados por `$`. Cada uno
//! recorre las cuatro fases con instancias propias, sin compartir tablas
//! ni contadores con los demás. Una fase solo se ejecuta si ninguna de
//! las anteriores reportó un error; las advertencias no detienen nada.

use crate::{
    codegen::{Image, Output},
    error::Diagnostics,
    lex::{lex, Lexed, Token},
    parse::{parse, Cst},
    semantic::Analysis,
    source::{Located, Source},
};

use std::{mem, rc::Rc};

/// Resultado de compilar un único programa.
///
/// Los campos de fases que no llegaron a ejecutarse quedan en `None`.
/// Los errores y advertencias de todas las fases se trasladan a
/// `diagnostics`, en el orden en que fueron producidos.
#[derive(Debug)]
pub struct Compilation {
    /// Posición del programa dentro del texto, a partir de 1.
    pub index: usize,
    pub tokens: Vec<Located<Token>>,
    pub cst: Option<Cst>,
    pub analysis: Option<Analysis>,
    pub output: Option<Output>,
    pub diagnostics: Diagnostics,
}

impl Compilation {
    pub fn succeeded(&self) -> bool {
        self.output.is_some() && !self.diagnostics.has_errors()
    }

    pub fn image(&self) -> Option<&Image> {
        self.output.as_ref().map(|output| &output.image)
    }

    /// Imagen final como 256 cadenas hexadecimales.
    pub fn hex(&self) -> Option<Vec<String>> {
        self.image().map(Image::to_hex)
    }
}

/// Compila todos los programas de un texto fuente.
pub fn compile(name: &str, text: &str) -> Vec<Compilation> {
    let source = Source::new(name, text);
    lex(&source)
        .into_iter()
        .enumerate()
        .map(|(index, lexed)| program(&source, index + 1, lexed))
        .collect()
}

fn program(source: &Rc<Source>, index: usize, lexed: Lexed) -> Compilation {
    let Lexed {
        tokens,
        error,
        warnings,
    } = lexed;

    let mut compilation = Compilation {
        index,
        tokens,
        cst: None,
        analysis: None,
        output: None,
        diagnostics: Diagnostics::default(),
    };

    compilation.diagnostics.extend(warnings);
    if let Some(error) = error {
        compilation.diagnostics.push(error);
        return compilation;
    }

    let parsed = parse(source, &compilation.tokens);
    let failed = parsed.error.is_some();

    if let Some(error) = parsed.error {
        compilation.diagnostics.push(error);
    }

    compilation.cst = Some(parsed.cst);
    if failed {
        return compilation;
    }

    let mut analysis = match &compilation.cst {
        Some(cst) => cst.analyze(),
        None => return compilation,
    };

    compilation.diagnostics.extend(mem::take(&mut analysis.errors));
    compilation.diagnostics.extend(mem::take(&mut analysis.warnings));

    if !compilation.diagnostics.has_errors() {
        match analysis.generate(source) {
            Ok(output) => compilation.output = Some(output),
            Err(error) => compilation.diagnostics.push(error),
        }
    }

    compilation.analysis = Some(analysis);
    compilation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn programs_are_independent() {
        let compilations = compile("<test>", "{ print(\"a\") }$ { print(\"a\") }$");
        assert_eq!(compilations.len(), 2);

        let first = compilations[0].output.as_ref().unwrap();
        let second = compilations[1].output.as_ref().unwrap();

        assert_eq!(first.heap.len(), 1);
        assert_eq!(second.heap.len(), 1);
        assert_eq!(first.image, second.image);
        assert_eq!(compilations[1].index, 2);
    }

    #[test]
    fn semantic_errors_stop_generation() {
        let compilations = compile("<test>", "{ int a int a }$");
        let compilation = &compilations[0];

        assert!(!compilation.succeeded());
        assert!(compilation.analysis.is_some());
        assert!(compilation.output.is_none());
        assert!(compilation.diagnostics.contains("DuplicateVariable"));
    }

    #[test]
    fn parse_errors_keep_partial_tree() {
        let compilations = compile("<test>", "{ print( }$");
        let compilation = &compilations[0];

        assert!(compilation.cst.is_some());
        assert!(compilation.analysis.is_none());
        assert!(compilation.diagnostics.has_errors());
    }

    #[test]
    fn warnings_do_not_stop_generation() {
        let compilations = compile("<test>", "{ int a }");
        let compilation = &compilations[0];

        assert!(compilation.succeeded());
        assert!(compilation.diagnostics.contains("MissingEOP"));
        assert!(compilation.diagnostics.contains("UninitializedVariable"));
        assert_eq!(compilation.hex().map(|hex| hex.len()), Some(256));
    }
}
