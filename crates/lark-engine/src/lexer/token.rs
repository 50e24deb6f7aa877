//! Token definitions for the Lark lexer.

/// A span in the source code, representing a range of bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start byte offset (inclusive)
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Returns the length of this span in bytes.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if this span is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Returns the 1-based line and column of the span start.
    pub fn position(&self, source: &str) -> (usize, usize) {
        let prefix = &source[..self.start.min(source.len())];
        let line = prefix.matches('\n').count() + 1;
        let line_start = prefix.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = prefix[line_start..].chars().count() + 1;
        (line, column)
    }
}

/// A token produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The span in the source code
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The different kinds of tokens in Lark.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Numeric literal
    Number(f64),
    /// String literal
    String(String),
    /// true
    True,
    /// false
    False,
    /// null
    Null,

    /// Identifier
    Identifier(String),

    // Keywords
    Function,
    Return,
    Var,
    For,
    Break,
    Continue,
    If,
    Elif,
    Else,
    Print,
    PrintLine,
    And,
    Or,

    // Punctuation
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Colon,
    Semicolon,

    // Operators
    Equal,
    EqualEqual,
    BangEqual,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,

    /// Lexical error, with a description
    Invalid(String),
    /// End of input
    Eof,
}

impl TokenKind {
    /// Returns true if this token is a keyword.
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Function
                | TokenKind::Return
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::Break
                | TokenKind::Continue
                | TokenKind::If
                | TokenKind::Elif
                | TokenKind::Else
                | TokenKind::Print
                | TokenKind::PrintLine
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
        )
    }

    /// Returns true if this token is a literal.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::String(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
        )
    }

    /// Maps a word to its keyword token, if it is one.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "null" => TokenKind::Null,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "function" => TokenKind::Function,
            "return" => TokenKind::Return,
            "var" => TokenKind::Var,
            "for" => TokenKind::For,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            "if" => TokenKind::If,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "print" => TokenKind::Print,
            "printLine" => TokenKind::PrintLine,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            _ => return None,
        };
        Some(kind)
    }
}
