//! Diagnósticos de todas las fases.
//!
//! Cada fase define su propio tipo de error con `thiserror`. Los
//! diagnósticos de fases distintas se acumulan en [`Diagnostics`],
//! que los expone tanto de forma estructurada ([`Record`]) como en
//! forma de texto legible.

use crate::source::{Located, Location};
use std::{
    error::Error,
    fmt::{self, Display},
};

mod sealed {
    pub trait Sealed {}
}

/// Gravedad de un diagnóstico.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Detiene el avance de la fase actual, o impide pasar a la siguiente.
    Error,

    /// No impide la compilación.
    Warning,
}

impl Display for Severity {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => fmt.write_str("error"),
            Severity::Warning => fmt.write_str("warning"),
        }
    }
}

/// Clasificación de una variante de error o advertencia.
pub trait Report: Error {
    /// Nombre del tipo de diagnóstico, por ejemplo `"InvalidToken"`.
    fn kind(&self) -> &'static str;

    /// Valor ofensor: un lexema, un nombre de variable, etc.
    fn value(&self) -> String;

    fn severity(&self) -> Severity {
        Severity::Error
    }
}

pub trait LocatedError: sealed::Sealed {
    fn source(&self) -> &dyn Error;
    fn location(&self) -> &Location;
    fn kind(&self) -> &'static str;
    fn value(&self) -> String;
    fn severity(&self) -> Severity;
}

/// Vista plana de un diagnóstico, para consumidores externos.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub severity: Severity,
    pub kind: &'static str,
    pub value: String,
    pub line: u32,
    pub column: u32,
}

#[derive(Default)]
pub struct Diagnostics {
    entries: Vec<Box<dyn 'static + LocatedError>>,
}

impl Diagnostics {
    pub fn push<E: 'static + Report>(&mut self, diagnostic: Located<E>) {
        self.entries.push(Box::new(diagnostic));
    }

    pub fn extend<E, I>(&mut self, diagnostics: I)
    where
        E: 'static + Report,
        I: IntoIterator<Item = Located<E>>,
    {
        for diagnostic in diagnostics {
            self.push(diagnostic);
        }
    }

    /// Mueve todos los diagnósticos de `other` al final de este.
    pub fn append(&mut self, mut other: Diagnostics) {
        self.entries.append(&mut other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// Determina si al menos un diagnóstico es de gravedad [`Severity::Error`].
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Determina si existe algún diagnóstico con el nombre indicado.
    pub fn contains(&self, kind: &str) -> bool {
        self.entries.iter().any(|entry| entry.kind() == kind)
    }

    pub fn records(&self) -> Vec<Record> {
        self.entries
            .iter()
            .map(|entry| {
                let start = entry.location().start();
                Record {
                    severity: entry.severity(),
                    kind: entry.kind(),
                    value: entry.value(),
                    line: start.line(),
                    column: start.column(),
                }
            })
            .collect()
    }

    fn count(&self, severity: Severity) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.severity() == severity)
            .count()
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.debug_list().entries(self.records()).finish()
    }
}

impl<E: 'static + Report> From<Located<E>> for Diagnostics {
    fn from(error: Located<E>) -> Self {
        let mut diagnostics = Diagnostics::default();
        diagnostics.push(error);
        diagnostics
    }
}

impl<E: 'static + Report> From<Vec<Located<E>>> for Diagnostics {
    fn from(errors: Vec<Located<E>>) -> Self {
        let mut diagnostics = Diagnostics::default();
        diagnostics.extend(errors);
        diagnostics
    }
}

impl Display for Diagnostics {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return writeln!(fmt, "No problems were reported");
        }

        for entry in &self.entries {
            writeln!(
                fmt,
                "{}[{}]: {}",
                entry.severity(),
                entry.kind(),
                entry.source()
            )?;

            let location = entry.location();
            writeln!(fmt, " --> {}", location)?;

            let line_number = location.start().line();
            let digits = line_number.to_string().chars().count();
            writeln!(fmt, "{:digits$} |", "", digits = digits)?;

            location.source().with_line(line_number, |line| {
                writeln!(fmt, "{:>digits$} | {}", line_number, line, digits = digits)
            })?;

            // Rangos multilínea se subrayan solo en su primera columna
            let from = location.start().column();
            let to = if location.end().line() == line_number {
                location.end().column().saturating_sub(1).max(from)
            } else {
                from
            };

            let skip = (from - 1) as usize;
            let highlight = (to - from + 1) as usize;

            writeln!(
                fmt,
                "{:digits$} | {:skip$}{:^<highlight$}",
                "",
                "",
                "",
                digits = digits,
                skip = skip,
                highlight = highlight
            )?;

            writeln!(fmt)?;
        }

        let (errors, warnings) = (self.error_count(), self.warning_count());
        let plural = |count: usize, word: &str| {
            if count == 1 {
                format!("{} {}", count, word)
            } else {
                format!("{} {}s", count, word)
            }
        };

        if errors > 0 {
            writeln!(
                fmt,
                "Build failed with {} and {}",
                plural(errors, "error"),
                plural(warnings, "warning")
            )
        } else {
            writeln!(fmt, "Build succeeded with {}", plural(warnings, "warning"))
        }
    }
}

impl<E: Report> sealed::Sealed for Located<E> {}

impl<E: Report> LocatedError for Located<E> {
    fn source(&self) -> &dyn Error {
        self.as_ref()
    }

    fn location(&self) -> &Location {
        Located::location(self)
    }

    fn kind(&self) -> &'static str {
        self.as_ref().kind()
    }

    fn value(&self) -> String {
        self.as_ref().value()
    }

    fn severity(&self) -> Severity {
        self.as_ref().severity()
    }
}
