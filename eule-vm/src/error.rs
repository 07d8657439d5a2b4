// eule-vm - Bytecode compiler and virtual machine for the eule programming language
// Copyright (c) 2026 The eule authors. MIT licensed.

//! Error types for compilation and execution.

use std::fmt;
use std::rc::Rc;

/// Any failure `Vm::interpret` can report.
#[derive(Debug, Clone)]
pub enum Error {
    Compile(CompileError),
    Runtime(RuntimeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Compile(error) => error.fmt(f),
            Error::Runtime(error) => error.fmt(f),
        }
    }
}

impl std::error::Error for Error {}

impl From<CompileError> for Error {
    fn from(error: CompileError) -> Self {
        Error::Compile(error)
    }
}

impl From<RuntimeError> for Error {
    fn from(error: RuntimeError) -> Self {
        Error::Runtime(error)
    }
}

/// What a diagnostic points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum At {
    /// End of input.
    End,
    /// A concrete token literal.
    Literal(String),
    /// Nothing; the message already names the problem (scanner errors).
    Nowhere,
}

/// One compile diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: u32,
    pub message: String,
    pub at: At,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ln {}: {}", self.line, self.message)?;
        match &self.at {
            At::End => write!(f, " at end"),
            At::Literal(literal) => write!(f, " at '{}'", literal),
            At::Nowhere => Ok(()),
        }
    }
}

/// All diagnostics of one failed compilation.
///
/// The compiler synchronizes at statement boundaries and keeps going, so a
/// single run can report several errors; the first is rendered with the
/// `compile error:` prefix and the rest as `also` lines.
#[derive(Debug, Clone)]
pub struct CompileError {
    pub diagnostics: Vec<Diagnostic>,
}

impl CompileError {
    pub fn new(diagnostics: Vec<Diagnostic>) -> Self {
        CompileError { diagnostics }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, diagnostic) in self.diagnostics.iter().enumerate() {
            if index == 0 {
                write!(f, "compile error: {}", diagnostic)?;
            } else {
                write!(f, "\n  also {}", diagnostic)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// One stack-trace entry of a runtime error, innermost first.
#[derive(Debug, Clone)]
pub struct TraceFrame {
    pub line: u32,
    pub name: Rc<str>,
}

/// An uncaught throw, with the call stack at the point of the throw.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub message: String,
    pub trace: Vec<TraceFrame>,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runtime error: {}", self.message)?;
        for frame in &self.trace {
            write!(f, "\n  ln {}: fn {}", frame.line, frame.name)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for whole-program interpretation.
pub type Result<T> = std::result::Result<T, Error>;
