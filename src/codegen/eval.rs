//! # Evaluator
//!
//! Walks the program tree, one block at a time. Within a block, each node
//! is evaluated in order, and an opcode pulls the nodes it needs as its
//! operands from the rest of the block.
//!
//! Bare leaves are statements too: a variable name moves the pointer onto
//! its cell, and a literal is pushed onto the literal stack. A binary
//! operator's left operand is whatever those leave behind, so `x + 1` and
//! `'a + 1` both read naturally.
//!
//! ## Stack discipline
//!
//! Every operator leaves its result on the top of the scratch stack with
//! the pointer on it. Operators that find one of their operands already on
//! top of the stack consume it in place rather than copying it, so nested
//! and chained expressions stay balanced.
use super::{Compiler, Error, Sign, ValueRef};
use crate::{
    frontend::{Node, NodeKind, Opcode},
    vm::TapeProgram,
};
use std::slice::Iter;

use log::{debug, warn};

impl Compiler {
    /// Evaluate every node of a block in order.
    pub(super) fn eval_block(&mut self, block: &[Node]) -> Result<(), Error> {
        let mut nodes = block.iter();
        while let Some(node) = nodes.next() {
            if let NodeKind::Op(_) = node.kind {
                debug!("evaluating `{node}` at {:?}", node.span);
            }
            self.eval_node(node, &mut nodes)
                .map_err(|e| e.with_span(&node.span))?;
        }
        Ok(())
    }

    fn eval_node(&mut self, node: &Node, rest: &mut Iter<Node>) -> Result<(), Error> {
        match &node.kind {
            NodeKind::Name(name) => {
                let address = self.lookup(name)?;
                self.relocate(ValueRef::Cell(address))
            }
            NodeKind::Number(_) | NodeKind::Char(_) => {
                let n = self.literal(node)?;
                self.literals.push(n);
                Ok(())
            }
            NodeKind::Block(nodes) => self.eval_block(nodes),
            NodeKind::Op(op) => self.eval_op(op, rest),
        }
    }

    fn eval_op(&mut self, op: &Opcode, rest: &mut Iter<Node>) -> Result<(), Error> {
        match op {
            Opcode::Declare => self.eval_declare(rest),
            Opcode::Assign => self.eval_assign(op, rest),
            Opcode::Add => self.eval_arithmetic(op, Sign::Plus, rest),
            Opcode::Subtract => self.eval_arithmetic(op, Sign::Minus, rest),
            Opcode::Eq => self.eval_comparison(op, true, rest),
            Opcode::Ne => self.eval_comparison(op, false, rest),
            Opcode::If => self.eval_if(op, rest),
            Opcode::While => self.eval_while(op, rest),
            Opcode::Write => self.eval_write(op, rest),
            Opcode::Read => self.eval_read(op, rest),
            Opcode::Unimplemented(token) => {
                warn!("`{token}` is not implemented, skipping it");
                Ok(())
            }
        }
    }

    /// Take the next node of the block as an operand of `op`.
    fn operand(&mut self, op: &Opcode, rest: &mut Iter<Node>) -> Result<ValueRef, Error> {
        let node = rest
            .next()
            .ok_or_else(|| Error::MissingOperand(op.to_string()))?;
        self.eval_operand(node)
            .map_err(|e| e.with_span(&node.span))
    }

    fn eval_operand(&mut self, node: &Node) -> Result<ValueRef, Error> {
        match &node.kind {
            NodeKind::Name(_) | NodeKind::Number(_) | NodeKind::Char(_) => self.resolve(node),
            NodeKind::Block(nodes) => {
                let pending = self.literals.len();
                self.eval_block(nodes)?;
                if self.literals.len() > pending {
                    // The block's value is the last literal it left unused.
                    let value = self.literals.pop();
                    self.literals.truncate(pending);
                    if let Some(n) = value {
                        return Ok(ValueRef::Constant(n));
                    }
                }
                self.check_cell(self.addr)
            }
            NodeKind::Op(op) => Err(Error::UnexpectedToken(op.to_string())),
        }
    }

    /// Take the next node of the block as a block body for `op`.
    fn body<'a>(&self, op: &Opcode, rest: &mut Iter<'a, Node>) -> Result<&'a [Node], Error> {
        let node = rest
            .next()
            .ok_or_else(|| Error::MissingOperand(op.to_string()))?;
        match &node.kind {
            NodeKind::Block(nodes) => Ok(nodes.as_slice()),
            _ => Err(Error::UnexpectedToken(node.to_string()).with_span(&node.span)),
        }
    }

    /// Confirm that a head expression left exactly one value on the
    /// scratch stack since it had `depth` entries.
    fn check_head(&self, op: &Opcode, head: ValueRef, depth: usize) -> Result<(), Error> {
        if self.stack == depth + 1 && self.is_top_scratch(head) {
            Ok(())
        } else {
            Err(Error::InvalidStackState(format!(
                "the condition of `{op}` must leave its result on the scratch stack, found {head}"
            )))
        }
    }

    /// Confirm that a block body left the scratch stack as it found it.
    fn check_body(&self, op: &Opcode, depth: usize) -> Result<(), Error> {
        if self.stack == depth {
            Ok(())
        } else {
            Err(Error::InvalidStackState(format!(
                "the body of `{op}` left {} values on the scratch stack",
                self.stack as isize - depth as isize
            )))
        }
    }

    /// The left operand of a binary operator, as a scratch cell the result
    /// can be accumulated into.
    fn accumulator(&mut self) -> Result<ValueRef, Error> {
        let left = match self.literals.pop() {
            Some(n) => ValueRef::Constant(n),
            None => self.check_cell(self.addr)?,
        };
        if self.is_top_scratch(left) {
            return Ok(left);
        }
        let result = self.push_scratch();
        self.add(result, left)?;
        Ok(result)
    }

    fn eval_declare(&mut self, rest: &mut Iter<Node>) -> Result<(), Error> {
        let node = rest
            .next()
            .ok_or_else(|| Error::MissingOperand(Opcode::Declare.to_string()))?;
        let NodeKind::Name(name) = &node.kind else {
            return Err(Error::UnexpectedToken(node.to_string()).with_span(&node.span));
        };
        let variable = self.declare(name).map_err(|e| e.with_span(&node.span))?;
        self.relocate(variable)?;
        self.comment(format!("let {name}"));
        Ok(())
    }

    fn eval_assign(&mut self, op: &Opcode, rest: &mut Iter<Node>) -> Result<(), Error> {
        let target = self.check_cell(self.addr)?;
        let source = self.operand(op, rest)?;
        if source == target {
            return Err(Error::InvalidStackState(format!(
                "cannot assign {target} to itself"
            )));
        }

        if self.is_top_scratch(source) {
            self.clear(target)?;
            self.transfer_into(source, target, Sign::Plus)?;
            self.pop_scratch()?;
        } else {
            self.assign(target, source, true, Sign::Plus)?;
        }
        self.relocate(target)?;
        let comment = format!("{} = {}", self.label(target), self.label(source));
        self.comment(comment);
        Ok(())
    }

    fn eval_arithmetic(&mut self, op: &Opcode, sign: Sign, rest: &mut Iter<Node>) -> Result<(), Error> {
        let result = self.accumulator()?;
        let right = self.operand(op, rest)?;
        if self.is_top_scratch(right) && right != result {
            self.transfer_into(right, result, sign)?;
            self.pop_scratch()?;
        } else {
            self.assign(result, right, false, sign)?;
        }
        self.relocate(result)
    }

    /// `==` and `!=`, which leave 1 or 0 on the scratch stack.
    ///
    /// Both operands are bytes, so once one is subtracted from the other
    /// the difference is zero exactly when they were equal.
    fn eval_comparison(&mut self, op: &Opcode, equal: bool, rest: &mut Iter<Node>) -> Result<(), Error> {
        let result = self.accumulator()?;
        let right = self.operand(op, rest)?;
        let flag = if self.is_top_scratch(right) && right != result {
            right
        } else {
            let flag = self.push_scratch();
            self.add(flag, right)?;
            flag
        };
        self.transfer_into(flag, result, Sign::Minus)?;

        // Now the flag is zero, and the result holds the difference.
        if equal {
            self.relocate(flag)?;
            self.code.inc();
        }
        self.relocate(result)?;
        self.code.begin_loop();
        self.code.zero();
        self.relocate(flag)?;
        if equal {
            self.code.dec();
        } else {
            self.code.inc();
        }
        self.relocate(result)?;
        self.code.end_loop();
        self.comment(format!("{} {op} 0", self.label(result)));

        self.transfer_into(flag, result, Sign::Plus)?;
        self.pop_scratch()?;
        self.relocate(result)
    }

    fn eval_if(&mut self, op: &Opcode, rest: &mut Iter<Node>) -> Result<(), Error> {
        let depth = self.stack;
        let condition = self.operand(op, rest)?;
        self.check_head(op, condition, depth)?;
        let body = self.body(op, rest)?;

        self.relocate(condition)?;
        self.code.begin_loop();
        self.comment(format!("if {}", self.label(condition)));
        self.eval_block(body)?;
        self.check_body(op, depth + 1)?;
        self.clear(condition)?;
        self.code.end_loop();
        self.comment("end if");

        self.pop_scratch()?;
        Ok(())
    }

    fn eval_while(&mut self, op: &Opcode, rest: &mut Iter<Node>) -> Result<(), Error> {
        let guard = self.push_scratch();
        self.add(guard, ValueRef::Constant(1))?;
        self.relocate(guard)?;
        self.code.begin_loop();
        self.clear(guard)?;
        self.comment("while");

        let depth = self.stack;
        let head = self.operand(op, rest)?;
        self.check_head(op, head, depth)?;
        let body = self.body(op, rest)?;

        self.relocate(head)?;
        self.code.begin_loop();
        self.clear(head)?;
        self.comment(format!("while {}", self.label(head)));
        self.eval_block(body)?;
        self.check_body(op, depth + 1)?;
        self.add(guard, ValueRef::Constant(1))?;
        self.clear(head)?;
        self.code.end_loop();

        self.relocate(guard)?;
        self.code.end_loop();
        self.comment("end while");

        self.pop_scratch()?;
        self.pop_scratch()?;
        Ok(())
    }

    fn eval_write(&mut self, op: &Opcode, rest: &mut Iter<Node>) -> Result<(), Error> {
        let value = self.operand(op, rest)?;
        let cell = if self.is_top_scratch(value) {
            value
        } else {
            let cell = self.push_scratch();
            self.add(cell, value)?;
            cell
        };
        self.relocate(cell)?;
        self.code.putchar();
        self.code.zero();
        self.comment(format!("write {}", self.label(value)));
        self.pop_scratch()?;
        Ok(())
    }

    fn eval_read(&mut self, op: &Opcode, rest: &mut Iter<Node>) -> Result<(), Error> {
        let target = self.operand(op, rest)?;
        if !target.is_variable() {
            return Err(Error::InvalidStackState(format!(
                "`{op}` can only read into a variable, found {target}"
            )));
        }
        self.relocate(target)?;
        self.code.getchar();
        self.comment(format!("read {}", self.label(target)));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        codegen::{Compiler, Error, Options},
        frontend::parse,
        vm::{Interpreter, Program, TestingDevice},
    };

    fn compile(code: &str) -> Result<(Compiler, String), Error> {
        let tree = parse(code).unwrap();
        let mut compiler = Compiler::new(Options::default());
        let output = compiler.compile(&tree)?;
        Ok((compiler, output))
    }

    fn run(code: &str, input: &str) -> (Compiler, Interpreter<TestingDevice>) {
        let (compiler, output) = compile(code).unwrap();
        let program: Program = output.parse().unwrap();
        let mut interpreter = Interpreter::new(TestingDevice::new(input)).with_step_limit(1_000_000);
        interpreter.run(&program).unwrap();
        (compiler, interpreter)
    }

    fn variable(compiler: &Compiler, interpreter: &Interpreter<TestingDevice>, name: &str) -> u8 {
        let address = compiler.variable(name).unwrap();
        interpreter.cell((compiler.max_stack() as isize + address) as usize)
    }

    #[test]
    fn test_hello() {
        let (compiler, i) = run("<<('H)<<('i)", "");
        assert_eq!(i.device().output, vec![72, 105]);
        assert_eq!(compiler.stack(), 0);
    }

    #[test]
    fn test_countdown() {
        let (compiler, i) = run("let i = 3; while (i != 0) { << ('0 + i) i = (i - 1) }", "");
        assert_eq!(i.device().output_str(), "321");
        assert_eq!(variable(&compiler, &i, "i"), 0);
        assert_eq!(compiler.stack(), 0);
    }

    #[test]
    fn test_if() {
        let code = "let x = 5; let y = 0; if (x == 5) { y = 1 } if (x == 4) { y = (y + 10) }";
        let (compiler, i) = run(code, "");
        assert_eq!(variable(&compiler, &i, "y"), 1);
        assert_eq!(variable(&compiler, &i, "x"), 5);
    }

    #[test]
    fn test_chained_arithmetic() {
        let (compiler, i) = run("let a = 10; let b = 20; let c = (a + b + 3 - 1)", "");
        assert_eq!(variable(&compiler, &i, "c"), 32);
        assert_eq!(variable(&compiler, &i, "a"), 10);
        assert_eq!(variable(&compiler, &i, "b"), 20);
        assert_eq!(compiler.stack(), 0);
    }

    #[test]
    fn test_nested_right_operand() {
        let (compiler, i) = run("let a = 10; let b = 4; let c = (a - (b + 1))", "");
        assert_eq!(variable(&compiler, &i, "c"), 5);
        assert_eq!(compiler.stack(), 0);
    }

    #[test]
    fn test_read() {
        let (compiler, i) = run("let c; >> c; << (c + 1)", "a");
        assert_eq!(i.device().output_str(), "b");
        assert_eq!(variable(&compiler, &i, "c"), b'a');
    }

    #[test]
    fn test_literal_left_operand() {
        let (_, i) = run("let x = 2; << ('a + x) << (('a) + 1)", "");
        assert_eq!(i.device().output_str(), "cb");
    }

    #[test]
    fn test_errors() {
        let kind = |code: &str| compile(code).unwrap_err().kind().clone();
        assert_eq!(kind("x = 1"), Error::UndeclaredVariable("x".to_string()));
        assert_eq!(kind("let x; let x"), Error::Redeclaration("x".to_string()));
        assert_eq!(kind("<< 'ab"), Error::MalformedLiteral("ab".to_string()));
        assert_eq!(kind("let x; << let"), Error::UnexpectedToken("let".to_string()));
        assert_eq!(kind("let x; x ="), Error::MissingOperand("=".to_string()));
        assert!(matches!(kind("= 1"), Error::InvalidTarget(_)));
        assert!(matches!(kind(">> 1"), Error::InvalidStackState(_)));
        assert!(matches!(kind("let x; if x { }"), Error::InvalidStackState(_)));
        assert!(matches!(kind("let x; x = x"), Error::InvalidStackState(_)));
    }

    #[test]
    fn test_error_spans() {
        let code = "let x = 1; << (x + y)";
        let err = compile(code).unwrap_err();
        assert_eq!(err.span(), Some(19..20));
        assert_eq!(&code[err.span().unwrap()], "y");
    }

    #[test]
    fn test_unimplemented_is_skipped() {
        let (_, i) = run("<< 'a * << 'b", "");
        assert_eq!(i.device().output_str(), "ab");
    }
}
