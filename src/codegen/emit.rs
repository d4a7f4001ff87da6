//! # Primitive Emitters
//!
//! Every construct of the language is built out of the handful of
//! primitives in this module. They all take [`ValueRef`]s, write their
//! instructions to the compiler's output, and keep the compiler's idea of
//! the pointer position exact.
//!
//! The fundamental idiom is the destructive transfer `from[- to+ from]`:
//! the only conditional the machine has is "repeat while nonzero", so the
//! only way to read a cell is to count it down to zero.
use super::{Compiler, Error, ValueRef};
use crate::vm::TapeProgram;

use log::trace;

/// The direction a transfer adjusts its destination in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Plus,
    Minus,
}

impl Sign {
    /// Write one step in this direction to the current cell.
    fn step(self, code: &mut impl TapeProgram) {
        match self {
            Self::Plus => code.inc(),
            Self::Minus => code.dec(),
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Plus => "add",
            Self::Minus => "subtract",
        }
    }
}

impl Compiler {
    /// Move the pointer to a cell.
    ///
    /// No other method writes pointer moves.
    pub fn relocate(&mut self, target: ValueRef) -> Result<(), Error> {
        let address = target.address()?;
        self.code.move_pointer(address - self.addr);
        self.addr = address;
        Ok(())
    }

    /// Zero a cell.
    pub fn clear(&mut self, cell: ValueRef) -> Result<(), Error> {
        self.relocate(cell)?;
        self.code.zero();
        Ok(())
    }

    /// `to += sign * from; from = 0`
    pub fn transfer_into(&mut self, from: ValueRef, to: ValueRef, sign: Sign) -> Result<(), Error> {
        if from.address()? == to.address()? {
            return Err(Error::InvalidStackState(format!(
                "cannot transfer {from} into itself"
            )));
        }
        trace!("transfer {from} into {to} ({sign:?})");
        self.trace_begin();

        self.relocate(from)?;
        self.code.begin_loop();
        self.code.dec();
        self.relocate(to)?;
        sign.step(&mut self.code);
        self.relocate(from)?;
        self.code.end_loop();

        self.trace_end();
        let comment = format!(
            "{} {} into {}",
            sign.verb(),
            self.label(from),
            self.label(to)
        );
        self.comment(comment);
        Ok(())
    }

    /// `first += sign * from; second += from; from = 0`
    pub fn fan_out(
        &mut self,
        from: ValueRef,
        (first, sign): (ValueRef, Sign),
        second: ValueRef,
    ) -> Result<(), Error> {
        let address = from.address()?;
        if address == first.address()? || address == second.address()? {
            return Err(Error::InvalidStackState(format!(
                "cannot fan {from} out into itself"
            )));
        }
        trace!("fan {from} out into {first} ({sign:?}) and {second}");
        self.trace_begin();

        self.relocate(from)?;
        self.code.begin_loop();
        self.code.dec();
        self.relocate(first)?;
        sign.step(&mut self.code);
        self.relocate(second)?;
        self.code.inc();
        self.relocate(from)?;
        self.code.end_loop();

        self.trace_end();
        let comment = format!(
            "fan {} out into {} and {}",
            self.label(from),
            self.label(first),
            self.label(second)
        );
        self.comment(comment);
        Ok(())
    }

    /// Write a value into a cell, without consuming the source.
    ///
    /// With `clear_first`, the cell is overwritten. Otherwise the value is
    /// accumulated into it with the given sign.
    pub fn assign(
        &mut self,
        to: ValueRef,
        from: ValueRef,
        clear_first: bool,
        sign: Sign,
    ) -> Result<(), Error> {
        if from.address().ok() == Some(to.address()?) {
            return Err(Error::InvalidStackState(format!(
                "cannot assign {from} to itself"
            )));
        }
        trace!("assign {from} to {to} (clear: {clear_first}, {sign:?})");
        self.trace_begin();

        if clear_first {
            self.clear(to)?;
        }
        match from {
            ValueRef::Constant(n) => {
                self.relocate(to)?;
                self.code.add_constant(match sign {
                    Sign::Plus => n,
                    Sign::Minus => n.wrapping_neg(),
                });
            }
            ValueRef::Cell(_) => {
                // Copy through a scratch cell, then restore the source from it.
                let scratch = self.push_scratch();
                self.fan_out(from, (to, sign), scratch)?;
                self.transfer_into(scratch, from, Sign::Plus)?;
                self.pop_scratch()?;
            }
        }

        self.trace_end();
        let comment = match (clear_first, sign) {
            (true, Sign::Plus) => format!("set {} to {}", self.label(to), self.label(from)),
            (true, Sign::Minus) => format!("set {} to minus {}", self.label(to), self.label(from)),
            (false, _) => format!("{} {} to {}", sign.verb(), self.label(from), self.label(to)),
        };
        self.comment(comment);
        Ok(())
    }

    /// `to += from`, without consuming the source.
    pub fn add(&mut self, to: ValueRef, from: ValueRef) -> Result<(), Error> {
        self.assign(to, from, false, Sign::Plus)
    }

    /// `to -= from`, without consuming the source.
    pub fn subtract(&mut self, to: ValueRef, from: ValueRef) -> Result<(), Error> {
        self.assign(to, from, false, Sign::Minus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        codegen::Options,
        vm::{Interpreter, Program, TestingDevice},
    };

    /// Run the compiler's output so far, with the scratch stack reserved,
    /// and return the final tape.
    fn execute(compiler: &Compiler) -> Interpreter<TestingDevice> {
        let program: Program = compiler.assemble().parse().unwrap();
        let mut interpreter = Interpreter::new(TestingDevice::default()).with_step_limit(100_000);
        interpreter.run(&program).unwrap();
        interpreter
    }

    /// The real tape address of a cell.
    fn physical(compiler: &Compiler, value: ValueRef) -> usize {
        (compiler.max_stack() as isize + value.address().unwrap()) as usize
    }

    #[test]
    fn test_relocate() {
        let mut compiler = Compiler::new(Options::default());
        compiler.relocate(ValueRef::Cell(3)).unwrap();
        compiler.relocate(ValueRef::Cell(-1)).unwrap();
        assert_eq!(compiler.code(), ">>><<<<");
        assert_eq!(compiler.addr(), -1);
        assert!(matches!(
            compiler.relocate(ValueRef::Constant(1)),
            Err(Error::InvalidTarget(_))
        ));
    }

    #[test]
    fn test_transfer() {
        let mut compiler = Compiler::new(Options::default());
        let x = compiler.declare("x").unwrap();
        let y = compiler.declare("y").unwrap();
        compiler.assign(x, ValueRef::Constant(5), true, Sign::Plus).unwrap();
        compiler.assign(y, ValueRef::Constant(7), true, Sign::Plus).unwrap();
        compiler.transfer_into(x, y, Sign::Minus).unwrap();

        let i = execute(&compiler);
        assert_eq!(i.cell(physical(&compiler, x)), 0);
        assert_eq!(i.cell(physical(&compiler, y)), 2);
        assert!(matches!(
            compiler.transfer_into(x, x, Sign::Plus),
            Err(Error::InvalidStackState(_))
        ));
    }

    #[test]
    fn test_copy_keeps_source() {
        let mut compiler = Compiler::new(Options::default());
        let x = compiler.declare("x").unwrap();
        let y = compiler.declare("y").unwrap();
        compiler.assign(x, ValueRef::Constant(42), true, Sign::Plus).unwrap();
        compiler.assign(y, ValueRef::Constant(1), true, Sign::Plus).unwrap();
        compiler.add(y, x).unwrap();
        compiler.subtract(y, x).unwrap();
        compiler.subtract(y, x).unwrap();
        assert_eq!(compiler.stack(), 0);

        let i = execute(&compiler);
        assert_eq!(i.cell(physical(&compiler, x)), 42);
        assert_eq!(i.cell(physical(&compiler, y)), 1u8.wrapping_sub(42));
        // The scratch cell used for the copy is left zeroed.
        assert_eq!(i.cell(0), 0);
        assert_eq!(i.pointer(), physical(&compiler, ValueRef::Cell(compiler.addr())));
    }

    #[test]
    fn test_fan_out() {
        let mut compiler = Compiler::new(Options::default());
        let x = compiler.declare("x").unwrap();
        let y = compiler.declare("y").unwrap();
        let z = compiler.declare("z").unwrap();
        compiler.assign(x, ValueRef::Constant(3), true, Sign::Plus).unwrap();
        compiler.fan_out(x, (y, Sign::Minus), z).unwrap();

        let i = execute(&compiler);
        assert_eq!(i.cell(physical(&compiler, x)), 0);
        assert_eq!(i.cell(physical(&compiler, y)), 253);
        assert_eq!(i.cell(physical(&compiler, z)), 3);
    }

    #[test]
    fn test_constants() {
        let mut compiler = Compiler::new(Options::default());
        let x = compiler.declare("x").unwrap();
        compiler.assign(x, ValueRef::Constant(2), false, Sign::Minus).unwrap();
        assert_eq!(compiler.code(), "--");
        assert!(matches!(
            compiler.assign(ValueRef::Constant(1), x, true, Sign::Plus),
            Err(Error::InvalidTarget(_))
        ));
        assert!(matches!(
            compiler.assign(x, x, true, Sign::Plus),
            Err(Error::InvalidStackState(_))
        ));
    }

    #[test]
    fn test_debug_markers() {
        let mut compiler = Compiler::new(Options {
            debug: true,
            ..Options::default()
        });
        let x = compiler.declare("x").unwrap();
        compiler.assign(x, ValueRef::Constant(1), true, Sign::Plus).unwrap();
        assert_eq!(compiler.code(), "([-]+)");
    }
}
