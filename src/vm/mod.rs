//! # Virtual Machine Module
//!
//! This module contains all things related to the target machine.
//!
//! ### What is this machine?
//!
//! The target is a simple turing tape machine. There is a single data
//! pointer, and a tape of byte cells. There are no registers, no addressing
//! modes, and no call stack. Every program is a string over an alphabet of
//! eight instructions:
//!
//! | Instruction | Meaning                                               |
//! |-------------|-------------------------------------------------------|
//! | `>`         | Move the pointer one cell to the right.               |
//! | `<`         | Move the pointer one cell to the left.                |
//! | `+`         | Increment the current cell (wrapping).                |
//! | `-`         | Decrement the current cell (wrapping).                |
//! | `,`         | Read one byte of input into the current cell.         |
//! | `.`         | Write the current cell as one byte of output.         |
//! | `[`         | Begin a "repeat while the current cell is nonzero".   |
//! | `]`         | End of the matching repeat.                           |
//!
//! ### What data can it use?
//!
//! Each cell holds an unsigned 8 bit integer. All arithmetic wraps around
//! at 256. Every other character in a program is ignored by the machine,
//! which is what lets the compiler interleave annotations with code.
use std::fmt;

mod core;
pub use self::core::*;

mod interpreter;
pub use interpreter::*;

/// The column annotations are padded to in the compiler's commented output.
pub const ANNOTATION_COLUMN: usize = 80;

/// The marker written before a traced primitive in debug mode.
pub const TRACE_BEGIN: char = '(';
/// The marker written after a traced primitive in debug mode.
pub const TRACE_END: char = ')';

/// Anything that instructions for the tape machine can be written to.
///
/// The compiler writes through this trait, so the same emitter code can
/// build either plain program text or a structured [`Program`].
pub trait TapeProgram {
    fn op(&mut self, op: Instruction);

    /// Attach a human readable annotation. Structured programs drop these.
    fn comment(&mut self, _comment: &str) {}

    /// Write a debug marker. Structured programs drop these.
    fn marker(&mut self, _marker: char) {}

    /// Move the pointer by a number of cells (negative is left).
    fn move_pointer(&mut self, cells: isize) {
        let op = if cells < 0 {
            Instruction::Left
        } else {
            Instruction::Right
        };
        for _ in 0..cells.unsigned_abs() {
            self.op(op)
        }
    }

    fn inc(&mut self) {
        self.op(Instruction::Inc)
    }

    fn dec(&mut self) {
        self.op(Instruction::Dec)
    }

    /// Add a constant to the current cell, choosing the direction
    /// which takes the fewest instructions under 8 bit wraparound.
    fn add_constant(&mut self, n: u8) {
        if n <= 128 {
            for _ in 0..n {
                self.inc()
            }
        } else {
            for _ in 0..(256 - n as usize) {
                self.dec()
            }
        }
    }

    fn begin_loop(&mut self) {
        self.op(Instruction::Begin)
    }

    fn end_loop(&mut self) {
        self.op(Instruction::End)
    }

    /// Zero the current cell with the `[-]` idiom.
    fn zero(&mut self) {
        self.begin_loop();
        self.dec();
        self.end_loop();
    }

    fn getchar(&mut self) {
        self.op(Instruction::Get)
    }

    fn putchar(&mut self) {
        self.op(Instruction::Put)
    }
}

/// The compiler's textual output. Annotations are written after the
/// instructions of the line they describe, padded to a fixed column.
impl TapeProgram for String {
    fn op(&mut self, op: Instruction) {
        self.push(op.symbol())
    }

    fn comment(&mut self, comment: &str) {
        annotate_line(self, comment)
    }

    fn marker(&mut self, marker: char) {
        self.push(marker)
    }
}

/// Terminate the current line of `text` with an annotation.
///
/// The line is padded with spaces to [`ANNOTATION_COLUMN`] (or by a single
/// space if it is already longer), and the annotation is sanitized so that
/// it can never be executed by the machine.
pub fn annotate_line(text: &mut String, comment: &str) {
    let line_start = text.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let width = text[line_start..].chars().count();
    if width < ANNOTATION_COLUMN {
        text.push_str(&" ".repeat(ANNOTATION_COLUMN - width));
    } else {
        text.push(' ');
    }
    text.push_str(&sanitize(comment));
    text.push('\n');
}

/// Replace every instruction character in an annotation with its name.
pub fn sanitize(comment: &str) -> String {
    let mut result = String::with_capacity(comment.len());
    for ch in comment.chars() {
        match Instruction::from_char(ch) {
            Some(op) => result.push_str(op.name()),
            None if ch == '\n' => result.push(' '),
            None => result.push(ch),
        }
    }
    result
}

/// An error raised while loading or running a machine program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A `[` or `]` at this byte offset has no partner.
    Unbalanced(usize),
    /// The instruction at this index moved the pointer left of cell 0.
    NegativePointer(usize),
    /// The program ran for more steps than the interpreter allows.
    StepLimit(usize),
    /// The I/O device failed.
    Device(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unbalanced(offset) => write!(f, "unbalanced loop bracket at offset {offset}"),
            Self::NegativePointer(i) => write!(
                f,
                "instruction #{i} tried to move the pointer to a negative index"
            ),
            Self::StepLimit(limit) => write!(f, "program did not halt within {limit} steps"),
            Self::Device(e) => write!(f, "device error: {e}"),
        }
    }
}

impl std::error::Error for Error {}
