//! Asynchronous engine APIs.
//!
//! Source files are read with tokio's non-blocking file I/O. Execution
//! itself stays synchronous and runs under an async mutex, so concurrent
//! callers take turns on the shared engine.
//!
//! # Example
//!
//! ```ignore
//! use lark_engine::AsyncEngine;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = AsyncEngine::new();
//!     engine.eval_file("script.lark").await.unwrap();
//! }
//! ```

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use tokio::fs;
use tokio::sync::Mutex;

use crate::gc::HeapStats;
use crate::{Bytecode, Engine, Error, compile};

/// An engine that can be shared between tasks.
///
/// Clones share the same underlying engine.
#[derive(Debug, Clone, Default)]
pub struct AsyncEngine {
    engine: Arc<Mutex<Engine>>,
}

impl AsyncEngine {
    /// Creates an async engine that prints to stdout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an async engine that prints to `output`.
    pub fn with_output(output: Box<dyn Write + Send>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(Engine::with_output(output))),
        }
    }

    /// Compiles and runs source code.
    ///
    /// Compilation happens before the engine lock is taken.
    pub async fn eval(&self, source: &str) -> Result<(), Error> {
        let bytecode = compile(source)?;
        self.execute(&bytecode).await
    }

    /// Reads a file asynchronously, then compiles and runs it.
    pub async fn eval_file(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let source = fs::read_to_string(path).await?;
        self.eval(&source).await
    }

    /// Runs already compiled bytecode.
    pub async fn execute(&self, bytecode: &Bytecode) -> Result<(), Error> {
        self.engine.lock().await.execute(bytecode)
    }

    /// Returns heap statistics.
    pub async fn heap_stats(&self) -> HeapStats {
        self.engine.lock().await.heap_stats()
    }
}
