//! The scanner that produces tokens from source text.

use super::{Span, Token, TokenKind};

/// A scanner that tokenizes Lark source code.
pub struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Scanner<'a> {
    /// Creates a new scanner for the given source code.
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        if let Some(unterminated) = self.skip_whitespace_and_comments() {
            return unterminated;
        }

        let start = self.current_pos;

        let Some((_pos, ch)) = self.advance() else {
            return Token::new(TokenKind::Eof, Span::new(start, start));
        };

        let kind = match ch {
            '{' => TokenKind::LeftBrace,
            '}' => TokenKind::RightBrace,
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            '[' => TokenKind::LeftBracket,
            ']' => TokenKind::RightBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,

            '=' => self.either('=', TokenKind::EqualEqual, TokenKind::Equal),
            '<' => self.either('=', TokenKind::LessEqual, TokenKind::Less),
            '>' => self.either('=', TokenKind::GreaterEqual, TokenKind::Greater),
            '!' => self.either(
                '=',
                TokenKind::BangEqual,
                TokenKind::Invalid("expected '=' after '!'".into()),
            ),

            '"' | '\'' => self.scan_string(ch),

            '0'..='9' => self.scan_number(ch),

            _ if is_id_start(ch) => self.scan_identifier(ch),

            _ => TokenKind::Invalid(format!("unexpected character {:?}", ch)),
        };

        Token::new(kind, Span::new(start, self.current_pos))
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    /// Consumes `next` if it follows, choosing between a two- and a
    /// one-character token.
    fn either(&mut self, next: char, matched: TokenKind, otherwise: TokenKind) -> TokenKind {
        if self.peek() == Some(next) {
            self.advance();
            matched
        } else {
            otherwise
        }
    }

    /// Returns an invalid token if a block comment runs to end of input.
    fn skip_whitespace_and_comments(&mut self) -> Option<Token> {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\n' | '\r') => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        while let Some(ch) = self.peek() {
                            if ch == '\n' {
                                break;
                            }
                            self.advance();
                        }
                    }
                    Some('*') => {
                        let start = self.current_pos;
                        self.advance();
                        self.advance();
                        let mut prev = ' ';
                        let mut closed = false;
                        while let Some((_, ch)) = self.advance() {
                            if prev == '*' && ch == '/' {
                                closed = true;
                                break;
                            }
                            prev = ch;
                        }
                        if !closed {
                            return Some(Token::new(
                                TokenKind::Invalid("unterminated comment".into()),
                                Span::new(start, self.current_pos),
                            ));
                        }
                    }
                    _ => break,
                },
                _ => break,
            }
        }
        None
    }

    fn scan_string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();

        loop {
            match self.advance() {
                None => return TokenKind::Invalid("unterminated string".into()),
                Some((_, ch)) if ch == quote => break,
                Some((_, '\\')) => match self.advance() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, '0')) => value.push('\0'),
                    Some((_, escaped)) => value.push(escaped),
                    None => return TokenKind::Invalid("unterminated string".into()),
                },
                Some((_, ch)) => value.push(ch),
            }
        }

        TokenKind::String(value)
    }

    fn scan_number(&mut self, first: char) -> TokenKind {
        let mut value = String::from(first);

        while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
            value.push(ch);
            self.advance();
        }

        // A fraction needs a digit after the dot.
        if self.peek() == Some('.') && self.peek_next().is_some_and(|ch| ch.is_ascii_digit()) {
            value.push('.');
            self.advance();
            while let Some(ch) = self.peek().filter(char::is_ascii_digit) {
                value.push(ch);
                self.advance();
            }
        }

        match value.parse::<f64>() {
            Ok(n) => TokenKind::Number(n),
            Err(_) => TokenKind::Invalid(format!("malformed number {}", value)),
        }
    }

    fn scan_identifier(&mut self, first: char) -> TokenKind {
        let mut name = String::from(first);

        while let Some(ch) = self.peek().filter(|ch| is_id_continue(*ch)) {
            name.push(ch);
            self.advance();
        }

        TokenKind::keyword(&name).unwrap_or(TokenKind::Identifier(name))
    }
}

/// Checks if a character can start an identifier.
fn is_id_start(ch: char) -> bool {
    ch == '_' || unicode_xid::UnicodeXID::is_xid_start(ch)
}

/// Checks if a character can continue an identifier.
fn is_id_continue(ch: char) -> bool {
    ch == '_' || unicode_xid::UnicodeXID::is_xid_continue(ch)
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source).map(|token| token.kind).collect()
    }

    #[test]
    fn test_simple_tokens() {
        assert_eq!(
            kinds("{ } ( ) [ ] , : ;"),
            vec![
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBracket,
                TokenKind::RightBracket,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("= == != < <= > >= + - * / %"),
            vec![
                TokenKind::Equal,
                TokenKind::EqualEqual,
                TokenKind::BangEqual,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Star,
                TokenKind::Slash,
                TokenKind::Percent,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let mut scanner = Scanner::new("42 3.14 7.");
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 42.0));
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 3.14));
        assert!(matches!(scanner.next_token().kind, TokenKind::Number(n) if n == 7.0));
        assert!(matches!(scanner.next_token().kind, TokenKind::Invalid(_)));
    }

    #[test]
    fn test_strings() {
        let mut scanner = Scanner::new(r#"'hello' "world" 'it\'s\n'"#);
        assert!(matches!(scanner.next_token().kind, TokenKind::String(s) if s == "hello"));
        assert!(matches!(scanner.next_token().kind, TokenKind::String(s) if s == "world"));
        assert!(matches!(scanner.next_token().kind, TokenKind::String(s) if s == "it's\n"));
    }

    #[test]
    fn test_unterminated_string() {
        let mut scanner = Scanner::new("'open");
        assert!(matches!(scanner.next_token().kind, TokenKind::Invalid(msg) if msg.contains("unterminated")));
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            kinds("function var for if elif else printLine print and or"),
            vec![
                TokenKind::Function,
                TokenKind::Var,
                TokenKind::For,
                TokenKind::If,
                TokenKind::Elif,
                TokenKind::Else,
                TokenKind::PrintLine,
                TokenKind::Print,
                TokenKind::And,
                TokenKind::Or,
            ]
        );
    }

    #[test]
    fn test_identifiers() {
        let mut scanner = Scanner::new("foo _bar größe printer");
        assert!(matches!(scanner.next_token().kind, TokenKind::Identifier(s) if s == "foo"));
        assert!(matches!(scanner.next_token().kind, TokenKind::Identifier(s) if s == "_bar"));
        assert!(matches!(scanner.next_token().kind, TokenKind::Identifier(s) if s == "größe"));
        assert!(matches!(scanner.next_token().kind, TokenKind::Identifier(s) if s == "printer"));
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            kinds("1 // line\n2 /* block\n comment */ 3"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Number(2.0),
                TokenKind::Number(3.0),
            ]
        );
    }

    #[test]
    fn test_unterminated_comment() {
        let mut scanner = Scanner::new("1 /* never closed");
        assert_eq!(scanner.next_token().kind, TokenKind::Number(1.0));
        let token = scanner.next_token();
        assert!(matches!(token.kind, TokenKind::Invalid(ref msg) if msg.contains("unterminated comment")));
        assert_eq!(token.span, Span::new(2, 17));
    }

    #[test]
    fn test_division_vs_comment() {
        assert_eq!(
            kinds("6 / 2"),
            vec![TokenKind::Number(6.0), TokenKind::Slash, TokenKind::Number(2.0)]
        );
    }

    #[test]
    fn test_invalid_character() {
        let mut scanner = Scanner::new("@");
        let token = scanner.next_token();
        assert!(matches!(token.kind, TokenKind::Invalid(_)));
        assert_eq!(token.span, Span::new(0, 1));
    }

    #[test]
    fn test_spans() {
        let mut scanner = Scanner::new("var  x");
        assert_eq!(scanner.next_token().span, Span::new(0, 3));
        assert_eq!(scanner.next_token().span, Span::new(5, 6));
        assert_eq!(scanner.next_token().kind, TokenKind::Eof);
    }
}
