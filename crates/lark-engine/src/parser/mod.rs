//! Parser for Lark source code.
//!
//! Transforms a stream of tokens into an Abstract Syntax Tree (AST).
//! Parsing stops at the first error, which carries the line and column of
//! the offending token.
//!
//! ## Usage
//!
//! ```rust
//! use lark_engine::parser::Parser;
//!
//! let mut parser = Parser::new("function main() { printLine 1 + 2; }");
//! let program = parser.parse_program().expect("Should parse");
//! assert_eq!(program.functions.len(), 1);
//! ```

mod parser;

pub use parser::Parser;
