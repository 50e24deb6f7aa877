//! Shared helpers for lark-engine integration tests.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::*;
//! ```
//!
//! # Available Helpers
//!
//! - [`run`] - Compile and run a whole program, returning what it printed
//! - [`run_main`] - Run statements as the body of `main`
//! - [`new_engine`] - An engine whose output can be read back

#![allow(dead_code, unused_imports)]

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

pub use lark_engine::{Engine, Error, Value};

/// An output sink that can be read after the engine has written to it.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Everything written so far.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    /// Returns and forgets everything written so far.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.lock().unwrap());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Create an engine printing into a buffer the test can inspect.
pub fn new_engine() -> (Engine, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let engine = Engine::with_output(Box::new(buffer.clone()));
    (engine, buffer)
}

/// Run a program in a fresh engine and return its output.
pub fn run(source: &str) -> String {
    let (mut engine, buffer) = new_engine();
    engine.run(source).expect("program should run");
    buffer.contents()
}

/// Run `body` as the body of `main`.
pub fn run_main(body: &str) -> String {
    run(&format!("function main() {{ {} }}", body))
}

/// Assert that the statements in the first argument print the second.
#[macro_export]
macro_rules! assert_prints {
    ($body:expr, $expected:expr) => {
        assert_eq!(
            $crate::common::run_main($body),
            $expected,
            "body: {}",
            $body
        );
    };
}
