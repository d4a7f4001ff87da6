//! # Core Interpreter Module
//!
//! This module implements an interpreter for the tape machine.
use crate::vm::{Device, Error, Instruction, Program, StandardDevice};

use log::trace;

impl Default for Interpreter<StandardDevice> {
    fn default() -> Self {
        Self::new(StandardDevice)
    }
}

/// The interpreter which runs a tape machine program.
pub struct Interpreter<T>
where
    T: Device,
{
    /// The interpreter's I/O device.
    device: T,
    /// The current pointer on the turing tape.
    pointer: usize,
    /// The turing tape (composed of byte cells).
    cells: Vec<u8>,
    /// The number of instructions executed so far.
    steps: usize,
    /// Give up after this many instructions.
    step_limit: Option<usize>,
}

impl<T> Interpreter<T>
where
    T: Device,
{
    pub fn new(device: T) -> Self {
        Self {
            device,
            pointer: 0,
            cells: vec![0; 1000],
            steps: 0,
            step_limit: None,
        }
    }

    /// Fail with [`Error::StepLimit`] instead of running forever.
    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = Some(limit);
        self
    }

    pub fn device(&self) -> &T {
        &self.device
    }

    pub fn into_device(self) -> T {
        self.device
    }

    /// The tape as far as it has been touched.
    pub fn tape(&self) -> &[u8] {
        &self.cells
    }

    /// The value of a cell (cells never touched are zero).
    pub fn cell(&self, address: usize) -> u8 {
        self.cells.get(address).copied().unwrap_or(0)
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Get the current cell pointed to on the turing tape.
    fn get_cell(&mut self) -> &mut u8 {
        while self.pointer >= self.cells.len() {
            self.cells.extend(vec![0; 1000]);
        }

        &mut self.cells[self.pointer]
    }

    /// Run a program using this interpreter and its device.
    pub fn run(&mut self, code: &Program) -> Result<(), Error> {
        let jumps = code.jump_table()?;
        let mut i = 0;
        while i < code.0.len() {
            if let Some(limit) = self.step_limit {
                if self.steps >= limit {
                    return Err(Error::StepLimit(limit));
                }
            }
            self.steps += 1;

            match code.0[i] {
                Instruction::Right => self.pointer += 1,
                Instruction::Left => {
                    if self.pointer == 0 {
                        return Err(Error::NegativePointer(i));
                    }
                    self.pointer -= 1
                }
                Instruction::Inc => {
                    let cell = self.get_cell();
                    *cell = cell.wrapping_add(1)
                }
                Instruction::Dec => {
                    let cell = self.get_cell();
                    *cell = cell.wrapping_sub(1)
                }
                Instruction::Get => {
                    let val = self.device.get().map_err(Error::Device)?;
                    *self.get_cell() = val
                }
                Instruction::Put => {
                    let val = *self.get_cell();
                    self.device.put(val).map_err(Error::Device)?
                }
                Instruction::Begin => {
                    if *self.get_cell() == 0 {
                        i = jumps[i]
                    }
                }
                Instruction::End => {
                    if *self.get_cell() != 0 {
                        i = jumps[i]
                    }
                }
            }
            i += 1
        }
        trace!(
            "halted after {} steps with the pointer at {}",
            self.steps,
            self.pointer
        );
        Ok(())
    }
}
