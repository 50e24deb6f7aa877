//! The bytecode virtual machine.
//!
//! ## Structure
//!
//! - `interpreter` - Fetch-decode-execute loop over a stack of call frames
//! - `operators` - Total semantics for the arithmetic and comparison opcodes
//!
//! Each frame owns its locals and its operand stack. The collector runs once
//! per `Return`, with every frame and every global as roots.

mod interpreter;
pub mod operators;

pub use interpreter::VM;
