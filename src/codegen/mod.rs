//! # Code Generation
//!
//! This module walks the program tree and writes tape machine instructions.
//!
//! ## What does the compiler have to keep track of?
//!
//! The target has no registers and no addressing: the only way to reach a
//! cell is to walk the data pointer to it. So the [`Compiler`] simulates, at
//! compile time, where the pointer *will be* after every instruction it
//! emits. This is the `addr` field, and every emitter keeps it exact.
//!
//! ## Memory layout
//!
//! The tape holds two regions which share one address space:
//!
//! * The variable region, at addresses `0, 1, 2, ...`, with one cell per
//!   declared variable, allocated in declaration order and never freed.
//! * The scratch stack, at addresses `-1, -2, ...`, used for temporaries
//!   in strict LIFO order.
//!
//! Negative addresses don't exist on the machine. Once the whole program
//! has been generated, the deepest the scratch stack ever got is known, and
//! the program is prefixed with that many `>` so the scratch stack lives
//! ahead of the variable region.
//!
//! ## Submodules
//!
//! * `value`: [`ValueRef`] and the variable and scratch allocators.
//! * `emit`: the primitive emitters every construct is built from.
//! * `eval`: the tree walking evaluator.
use crate::{
    frontend::{Node, Span},
    optimize::optimize,
    vm::{annotate_line, TapeProgram},
};
use core::fmt;
use std::collections::HashMap;

use log::{debug, warn};

mod emit;
pub use emit::Sign;
mod eval;
mod value;
pub use value::ValueRef;

/// The switches the code generator reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    /// Annotate the output with what each line of instructions does.
    pub comments: bool,
    /// Bracket every primitive with trace markers.
    pub debug: bool,
    /// Run the peephole optimizer over the finished program.
    pub optimize: bool,
}

/// The state of one compilation.
#[derive(Clone, Debug, Default)]
pub struct Compiler {
    options: Options,
    /// Where the data pointer will be after the instructions emitted so far.
    addr: isize,
    /// The current depth of the scratch stack.
    stack: usize,
    /// The deepest the scratch stack has been.
    max_stack: usize,
    /// The address of every declared variable.
    variables: HashMap<String, isize>,
    /// Variable names, indexed by address.
    names: Vec<String>,
    /// Constants waiting to be used as the left operand of an operator.
    literals: Vec<u8>,
    /// The instructions (and annotations) emitted so far.
    code: String,
}

impl Compiler {
    pub fn new(options: Options) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Where the data pointer is, relative to the variable region.
    pub fn addr(&self) -> isize {
        self.addr
    }

    /// The current depth of the scratch stack.
    pub fn stack(&self) -> usize {
        self.stack
    }

    /// The deepest the scratch stack has been.
    pub fn max_stack(&self) -> usize {
        self.max_stack
    }

    /// The number of declared variables.
    pub fn variable_count(&self) -> usize {
        self.names.len()
    }

    /// The address of a declared variable.
    pub fn variable(&self, name: &str) -> Option<isize> {
        self.variables.get(name).copied()
    }

    /// The instructions emitted so far, without the scratch reservation.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Compile a whole program.
    ///
    /// The compiler's state is reset first, and left as it was at the end
    /// of the program afterwards so it can be inspected.
    pub fn compile(&mut self, program: &[Node]) -> Result<String, Error> {
        *self = Self::new(self.options.clone());
        if self.options.optimize && (self.options.comments || self.options.debug) {
            warn!("the optimizer discards annotations and debug markers");
        }
        self.eval_block(program)?;
        let result = self.assemble();
        Ok(if self.options.optimize {
            optimize(&result)
        } else {
            result
        })
    }

    /// Prefix the emitted code with the scratch stack reservation.
    pub fn assemble(&self) -> String {
        debug!(
            "assembling {} instructions with {} scratch cells and {} variables",
            self.code.len(),
            self.max_stack,
            self.names.len()
        );
        let annotated = self.options.comments || self.options.debug;

        let mut result = String::new();
        result.move_pointer(self.max_stack as isize);
        if self.options.comments {
            result.comment(&format!("reserve {} scratch cells", self.max_stack));
        }
        result.push_str(&self.code);
        if annotated {
            if !result.is_empty() && !result.ends_with('\n') {
                result.push('\n');
            }
            annotate_line(&mut result, "end of program");
        }
        result
    }

    /// Annotate the current line of output, in comment mode.
    fn comment(&mut self, comment: impl AsRef<str>) {
        if self.options.comments {
            self.code.comment(comment.as_ref())
        }
    }

    /// Mark the start of a primitive, in debug mode.
    fn trace_begin(&mut self) {
        if self.options.debug {
            self.code.marker(crate::vm::TRACE_BEGIN)
        }
    }

    /// Mark the end of a primitive, in debug mode.
    fn trace_end(&mut self) {
        if self.options.debug {
            self.code.marker(crate::vm::TRACE_END)
        }
    }
}

/// An error which aborts compilation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A name that was never declared.
    UndeclaredVariable(String),
    /// A `let` for a name that is already declared.
    Redeclaration(String),
    /// A cell was required, but the value is a constant, or the pointer
    /// is not on a variable or live scratch cell.
    InvalidTarget(String),
    /// The scratch stack is not in the shape an operation requires.
    InvalidStackState(String),
    /// A character literal which is not exactly one byte-sized character.
    MalformedLiteral(String),
    /// A token where it cannot be used.
    UnexpectedToken(String),
    /// An operation at the end of its block, without its operands.
    MissingOperand(String),
    /// An error, and the part of the source it happened in.
    Annotated(Box<Self>, Span),
}

impl Error {
    /// Attach a source location, unless the error already has one.
    pub fn with_span(self, span: &Span) -> Self {
        match self {
            Self::Annotated(..) => self,
            _ => Self::Annotated(Box::new(self), span.clone()),
        }
    }

    /// The source location of the error, if it has one.
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::Annotated(_, span) => Some(span.clone()),
            _ => None,
        }
    }

    /// The error without its source location.
    pub fn kind(&self) -> &Self {
        match self {
            Self::Annotated(err, _) => err.kind(),
            _ => self,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::UndeclaredVariable(name) => write!(f, "undeclared variable `{name}`"),
            Self::Redeclaration(name) => write!(f, "variable `{name}` is already declared"),
            Self::InvalidTarget(e) => write!(f, "invalid target: {e}"),
            Self::InvalidStackState(e) => write!(f, "invalid stack state: {e}"),
            Self::MalformedLiteral(text) => write!(
                f,
                "character literal `'{}` must be exactly one byte-sized character",
                text.escape_default()
            ),
            Self::UnexpectedToken(token) => write!(f, "unexpected `{token}`"),
            Self::MissingOperand(op) => write!(f, "`{op}` is missing an operand"),
            Self::Annotated(err, _) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {}
