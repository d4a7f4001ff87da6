//! # bfgen
//!
//! This crate implements a compiler from a small imperative language to
//! programs for an eight-instruction turing tape machine (`< > + - , . [ ]`).
//!
//! ```text
//! let i = 3;
//! while (i != 0) { << ('0 + i) i = (i - 1) }
//! ```
//!
//! ## Index
//!
//! 1. [The Frontend](./frontend/index.html): comments, tokens, and the program tree.
//! 2. [The Code Generator](./codegen/index.html): the memory model and the evaluator.
//! 3. [The Optimizer](./optimize/index.html): a peephole pass over finished programs.
//! 4. [The Virtual Machine](./vm/index.html): the target machine, and an interpreter for it.
//!
//! ## Stages
//!
//! Source text is stripped of comments, split into tokens, and grouped into
//! a tree at its brackets. The code generator walks the tree once, tracking
//! at compile time where the machine's data pointer will be, and assembles
//! the finished program. The optimizer runs last, if it is enabled.
use core::fmt;

pub mod codegen;
pub mod frontend;
pub mod optimize;
pub mod vm;

pub use codegen::Options;

/// Compile source code into a tape machine program.
pub fn compile(source: &str, options: &Options) -> Result<String, Error> {
    let code = frontend::strip_comments(source);
    let tree = frontend::parse(&code)?;
    let program = codegen::Compiler::new(options.clone()).compile(&tree)?;
    Ok(program)
}

/// An error from any stage of the compiler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Frontend(frontend::Error),
    Codegen(codegen::Error),
}

impl Error {
    /// The part of the comment-stripped source this error is about.
    pub fn span(&self) -> Option<frontend::Span> {
        match self {
            Self::Frontend(e) => Some(e.span()),
            Self::Codegen(e) => e.span(),
        }
    }
}

impl From<frontend::Error> for Error {
    fn from(e: frontend::Error) -> Self {
        Self::Frontend(e)
    }
}

impl From<codegen::Error> for Error {
    fn from(e: codegen::Error) -> Self {
        Self::Codegen(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Frontend(e) => write!(f, "syntax error: {e}"),
            Self::Codegen(e) => write!(f, "compile error: {e}"),
        }
    }
}

impl std::error::Error for Error {}
