//! Lexical analysis (tokenization) for Lark source code.
//!
//! The lexer transforms source text into a stream of tokens that can be
//! consumed by the parser.
//!
//! ## Structure
//!
//! - `scanner.rs` - Main `Scanner` struct that produces tokens
//! - `token.rs` - `Token`, `TokenKind` and `Span` definitions
//!
//! ## Usage
//!
//! ```rust
//! use lark_engine::lexer::{Scanner, TokenKind};
//!
//! let mut scanner = Scanner::new("var x = 42;");
//!
//! loop {
//!     let token = scanner.next_token();
//!     if matches!(token.kind, TokenKind::Eof) {
//!         break;
//!     }
//!     println!("{:?}", token.kind);
//! }
//! ```

mod scanner;
mod token;

pub use scanner::Scanner;
pub use token::{Span, Token, TokenKind};
