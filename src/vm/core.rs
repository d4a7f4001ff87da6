//! The instructions of the tape machine are defined here.
//!
//! A [`Program`] is the structured form of a program's text: every
//! character that is not one of the eight instructions is dropped, and
//! loop brackets are checked to be balanced before the program is run.
use super::{Error, TapeProgram};
use core::{fmt, str::FromStr};

impl TapeProgram for Program {
    fn op(&mut self, op: Instruction) {
        self.0.push(op);
    }
}

/// A program of tape machine instructions.
#[derive(Default, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Program(pub Vec<Instruction>);

impl Program {
    /// Collect the instructions in `text` without checking that its
    /// loops are balanced.
    pub fn instructions_in(text: &str) -> Vec<Instruction> {
        text.chars().filter_map(Instruction::from_char).collect()
    }

    /// For every instruction index, the index of the matching bracket
    /// (or the index itself for non-bracket instructions).
    pub fn jump_table(&self) -> Result<Vec<usize>, Error> {
        let mut table: Vec<usize> = (0..self.0.len()).collect();
        let mut open = vec![];
        for (i, op) in self.0.iter().enumerate() {
            match op {
                Instruction::Begin => open.push(i),
                Instruction::End => {
                    let start = open.pop().ok_or(Error::Unbalanced(i))?;
                    table[start] = i;
                    table[i] = start;
                }
                _ => {}
            }
        }
        match open.pop() {
            Some(start) => Err(Error::Unbalanced(start)),
            None => Ok(table),
        }
    }

    /// The net pointer displacement of the whole program, ignoring loops'
    /// repetition. For compiler output this is where the pointer ends up.
    pub fn net_displacement(&self) -> isize {
        self.0
            .iter()
            .map(|op| match op {
                Instruction::Right => 1,
                Instruction::Left => -1,
                _ => 0,
            })
            .sum()
    }
}

impl FromStr for Program {
    type Err = Error;

    /// Parse program text, failing on an unmatched bracket. The error
    /// carries the byte offset of the offending bracket in `text`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut open = vec![];
        let mut ops = vec![];
        for (offset, ch) in text.char_indices() {
            if let Some(op) = Instruction::from_char(ch) {
                match op {
                    Instruction::Begin => open.push(offset),
                    Instruction::End if open.pop().is_none() => {
                        return Err(Error::Unbalanced(offset))
                    }
                    _ => {}
                }
                ops.push(op);
            }
        }
        match open.pop() {
            Some(offset) => Err(Error::Unbalanced(offset)),
            None => Ok(Self(ops)),
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for op in &self.0 {
            write!(f, "{op}")?
        }
        Ok(())
    }
}

/// An individual tape machine instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Instruction {
    /// Move the pointer one cell to the left.
    Left,
    /// Move the pointer one cell to the right.
    Right,
    /// Increment the current cell.
    Inc,
    /// Decrement the current cell.
    Dec,
    /// Read a byte of input into the current cell.
    Get,
    /// Write the current cell to the output.
    Put,
    /// Begin a "repeat while the current cell is not zero" loop.
    Begin,
    /// End a loop.
    End,
}

impl Instruction {
    pub fn from_char(ch: char) -> Option<Self> {
        Some(match ch {
            '<' => Self::Left,
            '>' => Self::Right,
            '+' => Self::Inc,
            '-' => Self::Dec,
            ',' => Self::Get,
            '.' => Self::Put,
            '[' => Self::Begin,
            ']' => Self::End,
            _ => return None,
        })
    }

    pub fn symbol(self) -> char {
        match self {
            Self::Left => '<',
            Self::Right => '>',
            Self::Inc => '+',
            Self::Dec => '-',
            Self::Get => ',',
            Self::Put => '.',
            Self::Begin => '[',
            Self::End => ']',
        }
    }

    /// A name for the instruction that contains no instruction characters.
    pub fn name(self) -> &'static str {
        match self {
            Self::Left => "lt",
            Self::Right => "gt",
            Self::Inc => "plus",
            Self::Dec => "minus",
            Self::Get => "comma",
            Self::Put => "dot",
            Self::Begin => "lbracket",
            Self::End => "rbracket",
        }
    }

    /// The instruction which undoes this one, if there is one.
    pub fn inverse(self) -> Option<Self> {
        match self {
            Self::Left => Some(Self::Right),
            Self::Right => Some(Self::Left),
            Self::Inc => Some(Self::Dec),
            Self::Dec => Some(Self::Inc),
            _ => None,
        }
    }

    pub fn is_move(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
