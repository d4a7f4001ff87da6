//! # Values
//!
//! A [`ValueRef`] is the unit every emitter and operator works with: either
//! an immediate constant, or a cell on the tape. This module also holds the
//! two allocators which hand out cells: declared variables grow upwards
//! from address 0, and the scratch stack grows downwards from address -1.
use super::{Compiler, Error};
use crate::frontend::{Node, NodeKind};
use core::fmt;

use log::trace;

/// A value an operation can consume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueRef {
    /// An immediate value, not stored anywhere on the tape.
    Constant(u8),
    /// A cell on the tape. Non-negative addresses are variables, and
    /// negative addresses are scratch stack slots.
    Cell(isize),
}

impl ValueRef {
    /// The address of the cell, or an error for a constant.
    pub fn address(&self) -> Result<isize, Error> {
        match self {
            Self::Cell(address) => Ok(*address),
            Self::Constant(_) => Err(Error::InvalidTarget(format!(
                "expected a cell, but found {self}"
            ))),
        }
    }

    /// Is this a cell in the variable region?
    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Cell(address) if *address >= 0)
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Constant(n) => write!(f, "const {n}"),
            Self::Cell(address) if *address >= 0 => write!(f, "var {address}"),
            Self::Cell(address) => write!(f, "tmp {}", address.unsigned_abs()),
        }
    }
}

/// The byte a character literal stands for.
fn char_code(text: &str) -> Result<u8, Error> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if (ch as u32) <= 0xff => Ok(ch as u8),
        _ => Err(Error::MalformedLiteral(text.to_string())),
    }
}

impl Compiler {
    /// Get the address of a declared variable.
    pub(super) fn lookup(&self, name: &str) -> Result<isize, Error> {
        self.variables
            .get(name)
            .copied()
            .ok_or_else(|| Error::UndeclaredVariable(name.to_string()))
    }

    /// Resolve a leaf of the tree into the value it stands for.
    pub fn resolve(&self, node: &Node) -> Result<ValueRef, Error> {
        match &node.kind {
            NodeKind::Number(n) => Ok(ValueRef::Constant(*n)),
            NodeKind::Char(text) => char_code(text).map(ValueRef::Constant),
            NodeKind::Name(name) => self.lookup(name).map(ValueRef::Cell),
            _ => Err(Error::UnexpectedToken(node.to_string())),
        }
    }

    /// Resolve a literal leaf into its byte.
    pub(super) fn literal(&self, node: &Node) -> Result<u8, Error> {
        match self.resolve(node)? {
            ValueRef::Constant(n) => Ok(n),
            _ => Err(Error::UnexpectedToken(node.to_string())),
        }
    }

    /// Bind a new variable to the next free cell of the variable region.
    pub fn declare(&mut self, name: &str) -> Result<ValueRef, Error> {
        if self.variables.contains_key(name) {
            return Err(Error::Redeclaration(name.to_string()));
        }
        let address = self.names.len() as isize;
        trace!("declaring `{name}` at {address}");
        self.variables.insert(name.to_string(), address);
        self.names.push(name.to_string());
        Ok(ValueRef::Cell(address))
    }

    /// Reserve a scratch cell. The cell is zero when it is handed out.
    pub fn push_scratch(&mut self) -> ValueRef {
        self.stack += 1;
        self.max_stack = self.max_stack.max(self.stack);
        ValueRef::Cell(-(self.stack as isize))
    }

    /// Release the top scratch cell, and return the new top.
    ///
    /// The cell must already be zero: popping does not touch the tape.
    pub fn pop_scratch(&mut self) -> Result<ValueRef, Error> {
        if self.stack == 0 {
            return Err(Error::InvalidStackState(
                "popped an empty scratch stack".to_string(),
            ));
        }
        self.stack -= 1;
        Ok(ValueRef::Cell(-(self.stack as isize)))
    }

    /// The top of the scratch stack, if it is not empty.
    pub fn top_scratch(&self) -> Option<ValueRef> {
        (self.stack > 0).then(|| ValueRef::Cell(-(self.stack as isize)))
    }

    pub(super) fn is_top_scratch(&self, value: ValueRef) -> bool {
        self.top_scratch() == Some(value)
    }

    /// Confirm that an address holds a declared variable or a live
    /// scratch cell.
    pub(super) fn check_cell(&self, address: isize) -> Result<ValueRef, Error> {
        let variables = 0..self.names.len() as isize;
        let scratch = -(self.stack as isize)..0;
        if variables.contains(&address) || scratch.contains(&address) {
            Ok(ValueRef::Cell(address))
        } else {
            Err(Error::InvalidTarget(format!(
                "the pointer is on {}, which is neither a variable nor a live scratch cell",
                ValueRef::Cell(address)
            )))
        }
    }

    /// A readable label for a value, for annotations.
    pub(super) fn label(&self, value: ValueRef) -> String {
        match value {
            ValueRef::Cell(address) if address >= 0 => self
                .names
                .get(address as usize)
                .cloned()
                .unwrap_or_else(|| value.to_string()),
            _ => value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::Options;

    fn leaf(kind: NodeKind) -> Node {
        Node { kind, span: 0..1 }
    }

    #[test]
    fn test_display() {
        assert_eq!(ValueRef::Constant(72).to_string(), "const 72");
        assert_eq!(ValueRef::Cell(0).to_string(), "var 0");
        assert_eq!(ValueRef::Cell(-2).to_string(), "tmp 2");
    }

    #[test]
    fn test_scratch_stack() {
        let mut compiler = Compiler::new(Options::default());
        assert_eq!(compiler.top_scratch(), None);
        assert_eq!(compiler.push_scratch(), ValueRef::Cell(-1));
        assert_eq!(compiler.push_scratch(), ValueRef::Cell(-2));
        assert_eq!(compiler.top_scratch(), Some(ValueRef::Cell(-2)));
        assert_eq!(compiler.pop_scratch(), Ok(ValueRef::Cell(-1)));
        assert_eq!(compiler.pop_scratch(), Ok(ValueRef::Cell(0)));
        assert_eq!(compiler.stack(), 0);
        assert_eq!(compiler.max_stack(), 2);
        assert!(matches!(
            compiler.pop_scratch(),
            Err(Error::InvalidStackState(_))
        ));
    }

    #[test]
    fn test_declare_and_resolve() {
        let mut compiler = Compiler::new(Options::default());
        assert_eq!(compiler.declare("x"), Ok(ValueRef::Cell(0)));
        assert_eq!(compiler.declare("y"), Ok(ValueRef::Cell(1)));
        assert_eq!(
            compiler.declare("x"),
            Err(Error::Redeclaration("x".to_string()))
        );

        let name = leaf(NodeKind::Name("y".to_string()));
        assert_eq!(compiler.resolve(&name), Ok(ValueRef::Cell(1)));
        let name = leaf(NodeKind::Name("z".to_string()));
        assert_eq!(
            compiler.resolve(&name),
            Err(Error::UndeclaredVariable("z".to_string()))
        );
        let number = leaf(NodeKind::Number(7));
        assert_eq!(compiler.resolve(&number), Ok(ValueRef::Constant(7)));
    }

    #[test]
    fn test_char_literals() {
        let compiler = Compiler::new(Options::default());
        let ch = leaf(NodeKind::Char("H".to_string()));
        assert_eq!(compiler.literal(&ch), Ok(72));
        let ch = leaf(NodeKind::Char("ÿ".to_string()));
        assert_eq!(compiler.literal(&ch), Ok(255));

        for bad in ["ab", "", "λ"] {
            let ch = leaf(NodeKind::Char(bad.to_string()));
            assert_eq!(
                compiler.literal(&ch),
                Err(Error::MalformedLiteral(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_check_cell() {
        let mut compiler = Compiler::new(Options::default());
        assert!(compiler.check_cell(0).is_err());
        compiler.declare("x").unwrap();
        compiler.push_scratch();
        assert_eq!(compiler.check_cell(0), Ok(ValueRef::Cell(0)));
        assert_eq!(compiler.check_cell(-1), Ok(ValueRef::Cell(-1)));
        assert!(matches!(compiler.check_cell(1), Err(Error::InvalidTarget(_))));
        assert!(matches!(compiler.check_cell(-2), Err(Error::InvalidTarget(_))));
    }
}
