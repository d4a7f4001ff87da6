//! # The Interpreter Module
//!
//! This module implements an interpreter for the tape machine. The
//! interpreter is supplied with a `Device` object, which acts as a generic
//! frontend of the machine to interact with the world. The `Device` object
//! is responsible for supplying the input and handling the output of the
//! program. For testing the compiler, we use a `TestingDevice` object to
//! supply sample input and capture the output to test against the predicted
//! output.
mod core;
pub use self::core::*;

use std::{
    collections::VecDeque,
    io::{stdin, stdout, Read, Write},
};

/// Create an input / output device for the interpreter to operate on.
/// The method `get` retrieves the device's input, and the function `put`
/// writes to the device's output.
pub trait Device {
    /// Get the next byte of input.
    fn get(&mut self) -> Result<u8, String>;
    /// Put the given byte to the output.
    fn put(&mut self, val: u8) -> Result<(), String>;
}

/// A device used for testing the compiler. This simply keeps a buffer
/// of sample input to supply to the machine, and keeps an output
/// buffer to keep track of the output of the machine.
#[derive(Debug, Default)]
pub struct TestingDevice {
    pub input: VecDeque<u8>,
    pub output: Vec<u8>,
}

impl TestingDevice {
    /// Create a new testing device with some given sample input.
    pub fn new(sample_input: impl ToString) -> Self {
        Self::new_raw(sample_input.to_string().into_bytes())
    }

    pub fn new_raw(input: Vec<u8>) -> Self {
        Self {
            input: input.into(),
            output: vec![],
        }
    }

    /// Get the output of the testing device as a string (ascii).
    pub fn output_str(&self) -> String {
        self.output.iter().map(|&b| b as char).collect()
    }
}

/// Make the testing device work with the interpreter.
impl Device for TestingDevice {
    fn get(&mut self) -> Result<u8, String> {
        self.input
            .pop_front()
            .ok_or_else(|| "input is empty".to_string())
    }

    fn put(&mut self, val: u8) -> Result<(), String> {
        self.output.push(val);
        Ok(())
    }
}

/// A device used for standard input and output.
/// This simply retrieves a byte from standard-in with `get`,
/// and writes a byte to standard-out with `put`.
/// Reading past the end of standard-in yields zero.
#[derive(Debug, Default)]
pub struct StandardDevice;

impl Device for StandardDevice {
    fn get(&mut self) -> Result<u8, String> {
        let mut buf = [0];
        if stdout().flush().is_err() {
            return Err("could not flush output".to_string());
        }
        match stdin().read(&mut buf) {
            Ok(0) => Ok(0),
            Ok(_) => Ok(buf[0]),
            Err(_) => Err("could not get user input".to_string()),
        }
    }

    fn put(&mut self, val: u8) -> Result<(), String> {
        let mut out = stdout();
        if out.write_all(&[val]).is_err() || out.flush().is_err() {
            Err(String::from("could not flush output"))
        } else {
            Ok(())
        }
    }
}
