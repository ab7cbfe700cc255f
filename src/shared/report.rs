//! Diagnostic sink. Compile stages report numbered diagnostics here and keep
//! going; callers check the error count before trusting the produced output.

use crate::prelude::*;

/// Severity of a reported diagnostic.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// A single numbered diagnostic produced during compilation.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: u32,
    pub message: String,
}

impl Display for Diagnostic {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Severity::Warning => write!(f, "warning {}: {}", self.code, self.message),
            Severity::Error => write!(f, "error {}: {}", self.code, self.message),
        }
    }
}

/// Receives diagnostics as they are reported, e.g. to print them to a console.
pub trait Printer {
    fn print(self: &mut Self, diagnostic: &Diagnostic);
}

/// A printer that writes diagnostics to stdout.
pub struct StdoutPrinter;

impl Printer for StdoutPrinter {
    fn print(self: &mut Self, diagnostic: &Diagnostic) {
        println!("{}", diagnostic);
    }
}

/// Write-only diagnostic channel handed to the parser and the bytecode
/// emitter. Collects all diagnostics and optionally forwards them to a
/// [Printer]. Reporting is fire-and-forget, the reporting stage never
/// inspects the outcome.
pub struct Report {
    printer: Option<Box<dyn Printer>>,
    diagnostics: Vec<Diagnostic>,
}

impl Report {
    /// Creates a report that only collects diagnostics.
    pub fn new() -> Self {
        Report {
            printer: None,
            diagnostics: Vec::new(),
        }
    }
    /// Creates a report that additionally forwards each diagnostic to the given printer.
    pub fn with_printer(printer: Box<dyn Printer>) -> Self {
        Report {
            printer: Some(printer),
            diagnostics: Vec::new(),
        }
    }
    /// Reports an error.
    pub fn error(self: &mut Self, code: u32, message: impl Into<String>) {
        self.report(Severity::Error, code, message.into());
    }
    /// Reports a warning.
    pub fn warning(self: &mut Self, code: u32, message: impl Into<String>) {
        self.report(Severity::Warning, code, message.into());
    }
    /// Number of errors reported so far.
    pub fn error_count(self: &Self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error).count()
    }
    /// All diagnostics reported so far.
    pub fn diagnostics(self: &Self) -> &[Diagnostic] {
        &self.diagnostics
    }
    /// Returns whether an error with the given code was reported.
    pub fn contains(self: &Self, code: u32) -> bool {
        self.diagnostics.iter().any(|d| d.code == code)
    }
    /// Consumes the report, returning its diagnostics.
    pub fn into_diagnostics(self: Self) -> Vec<Diagnostic> {
        self.diagnostics
    }
    fn report(self: &mut Self, severity: Severity, code: u32, message: String) {
        let diagnostic = Diagnostic { severity, code, message };
        if let Some(printer) = &mut self.printer {
            printer.print(&diagnostic);
        }
        self.diagnostics.push(diagnostic);
    }
}

impl Debug for Report {
    fn fmt(self: &Self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Report").field("diagnostics", &self.diagnostics).finish()
    }
}
