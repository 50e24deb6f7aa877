//! Bytecode compiler for Lark.
//!
//! Transforms the AST into a flat instruction stream the VM can execute.
//!
//! # Module Structure
//!
//! - `bytecode`: Instructions, operands and the compiled program
//! - `codegen`: Code generation from AST
//!   - `codegen::scope`: Frame slot allocation and name resolution
//! - `disasm`: Readable listings of compiled programs

pub mod bytecode;
pub mod codegen;
pub mod disasm;

pub use bytecode::{Bytecode, Instruction, OpCode, Operand};
pub use codegen::Compiler;
pub use disasm::disassemble;
