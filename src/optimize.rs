//! # Peephole Optimizer
//!
//! A post-pass over finished program text. It knows nothing about the
//! code generator: it only rewrites local instruction patterns which cannot
//! change what a program reads, writes, or leaves on the tape.
//!
//! Each pass is a single left-to-right scan which uses its output as a
//! stack, so a rewrite can expose another one right behind it
//! (`>+-<` collapses completely). Passes repeat until the program stops
//! shrinking.
use crate::vm::{Instruction, Program};

use log::{debug, info};

/// Optimize program text. Everything but the instructions is dropped.
pub fn optimize(code: &str) -> String {
    let mut ops = Program::instructions_in(code);
    let before = ops.len();

    let mut passes = 0;
    loop {
        let len = ops.len();
        ops = pass(&ops);
        passes += 1;
        debug!("optimizer pass {passes}: {len} -> {} instructions", ops.len());
        if ops.len() == len {
            break;
        }
    }

    info!(
        "optimized {before} instructions down to {} in {passes} passes",
        ops.len()
    );
    ops.into_iter().map(Instruction::symbol).collect()
}

/// The index of the bracket closing the loop opened at `start`.
fn loop_end(ops: &[Instruction], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, op) in ops.iter().enumerate().skip(start) {
        match op {
            Instruction::Begin => depth += 1,
            Instruction::End => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn ends_with_clear(ops: &[Instruction]) -> bool {
    ops.ends_with(&[Instruction::Begin, Instruction::Dec, Instruction::End])
}

/// One scan of the peephole rules.
fn pass(ops: &[Instruction]) -> Vec<Instruction> {
    let mut result: Vec<Instruction> = Vec::with_capacity(ops.len());
    // Until something other than a pointer move runs, every cell is zero.
    let mut pristine = true;

    let mut i = 0;
    while i < ops.len() {
        let op = ops[i];
        i += 1;

        if op == Instruction::Begin && pristine {
            // A loop over a zero cell never runs.
            if let Some(end) = loop_end(ops, i - 1) {
                i = end + 1;
                continue;
            }
        }
        if !op.is_move() {
            pristine = false;
        }

        match op {
            Instruction::End if result.last() == Some(&Instruction::Begin) => {
                result.pop();
            }
            // `[-][-]` clears a cell which is already clear.
            Instruction::End
                if result.ends_with(&[Instruction::Begin, Instruction::Dec])
                    && ends_with_clear(&result[..result.len() - 2]) =>
            {
                result.truncate(result.len() - 2);
            }
            _ if op.inverse().is_some() && result.last().copied() == op.inverse() => {
                result.pop();
            }
            _ => result.push(op),
        }
    }

    // Moves at the very end have no effect.
    while result.last().map_or(false, |op| op.is_move()) {
        result.pop();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{Interpreter, TestingDevice};
    use maplit::hashmap;

    #[test]
    fn test_rules() {
        let cases = hashmap! {
            "+-" => "",
            ">+<-<>" => ">+<-",
            "+>><<-" => "",
            "+[-][-]." => "+[-].",
            "+[]." => "+.",
            "+[><]." => "+.",
            "+.>>>" => "+.",
            "+.--" => "+.--",
        };
        for (code, expected) in cases {
            assert_eq!(optimize(code), expected, "optimizing {code:?}");
        }
    }

    #[test]
    fn test_pristine_loops() {
        // The clear after a reservation prefix is dead.
        assert_eq!(optimize(">>>[-]<+."), ">>+.");
        assert_eq!(optimize(">[->+<]+."), ">+.");
        // Input makes the tape unknown.
        assert_eq!(optimize(",[-]."), ",[-].");
    }

    #[test]
    fn test_drops_annotations() {
        assert_eq!(optimize("++ set x\n(--) minus 2\n"), "");
        assert_eq!(optimize("+ one\n. write\n"), "+.");
    }

    #[test]
    fn test_preserves_behavior() {
        let code = ">>[-]<<+++++[->+>+<<]>>[-<<+>>]<<.>[-][-]<>+-.";
        let optimized = optimize(code);
        assert!(optimized.len() < code.len());

        let run = |code: &str| {
            let program: Program = code.parse().unwrap();
            let mut i = Interpreter::new(TestingDevice::default()).with_step_limit(10_000);
            i.run(&program).unwrap();
            (i.device().output.clone(), i.tape()[..4].to_vec())
        };
        assert_eq!(run(code), run(&optimized));
    }
}
