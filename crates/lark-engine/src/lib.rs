// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # lark-engine
//!
//! The Lark scripting language: a bytecode compiler, a stack virtual machine
//! and a mark-sweep garbage collector.
//!
//! ## Overview
//!
//! Source text flows through a fixed pipeline:
//! - Lexer and parser produce an AST of function declarations
//! - The code generator lowers it to a flat instruction stream
//! - The VM runs the stream, collecting garbage on every function return
//!
//! ## Quick Start
//!
//! ```rust
//! use lark_engine::Engine;
//!
//! let mut engine = Engine::with_output(Box::new(std::io::sink()));
//! engine.run("function main() { printLine 'Hello, World!'; }").unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod gc;
pub mod lexer;
pub mod parser;
pub mod runtime;
pub mod vm;

#[cfg(feature = "async")]
pub mod async_engine;

use std::io::Write;
use std::path::Path;

use thiserror::Error;

pub use compiler::{Bytecode, disassemble};
pub use gc::HeapStats;
pub use runtime::value::Value;
pub use vm::VM;

#[cfg(feature = "async")]
pub use async_engine::AsyncEngine;

/// Compiles Lark source code to bytecode.
pub fn compile(source: &str) -> Result<Bytecode, Error> {
    let mut parser = parser::Parser::new(source);
    let program = parser.parse_program()?;
    compiler::Compiler::new().compile(&program)
}

/// A Lark engine instance.
///
/// Owns one VM, so globals and heap objects survive from one
/// [`run`](Engine::run) to the next.
#[derive(Debug, Default)]
pub struct Engine {
    vm: VM,
}

impl Engine {
    /// Creates an engine that prints to stdout.
    pub fn new() -> Self {
        Self { vm: VM::new() }
    }

    /// Creates an engine that prints to `output`.
    pub fn with_output(output: Box<dyn Write + Send>) -> Self {
        Self {
            vm: VM::with_output(output),
        }
    }

    /// Compiles source code without running it.
    pub fn compile(&self, source: &str) -> Result<Bytecode, Error> {
        compile(source)
    }

    /// Compiles and runs source code.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use lark_engine::{Engine, Value};
    /// let mut engine = Engine::with_output(Box::new(std::io::sink()));
    /// engine.run("function main() { answer = 42; }").unwrap();
    /// assert_eq!(engine.vm().global("answer"), Some(&Value::Number(42.0)));
    /// ```
    pub fn run(&mut self, source: &str) -> Result<(), Error> {
        let bytecode = compile(source)?;
        self.execute(&bytecode)
    }

    /// Reads, compiles and runs a source file.
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<(), Error> {
        let source = std::fs::read_to_string(path)?;
        self.run(&source)
    }

    /// Runs already compiled bytecode.
    pub fn execute(&mut self, bytecode: &Bytecode) -> Result<(), Error> {
        self.vm.execute(bytecode)
    }

    /// Returns heap statistics.
    pub fn heap_stats(&self) -> HeapStats {
        self.vm.heap_stats()
    }

    /// Returns the underlying VM.
    pub fn vm(&self) -> &VM {
        &self.vm
    }
}

/// Errors that can occur while compiling or running Lark code.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed source text
    #[error("SyntaxError: {message} at {line}:{column}")]
    Syntax {
        /// What went wrong
        message: String,
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
    },

    /// A structurally impossible AST reached the code generator
    #[error("CompileError: {0}")]
    Compile(String),

    /// Malformed bytecode reached the VM
    #[error("InternalError: {0}")]
    Internal(String),

    /// Reading source failed
    #[error("IOError: {0}")]
    Io(#[from] std::io::Error),
}
