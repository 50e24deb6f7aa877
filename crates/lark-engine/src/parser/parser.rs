//! The main parser implementation.

use crate::Error;
use crate::ast::*;
use crate::lexer::{Scanner, Token, TokenKind};

/// A recursive descent parser for Lark.
pub struct Parser<'a> {
    source: &'a str,
    scanner: Scanner<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given source code.
    pub fn new(source: &'a str) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.next_token();
        Self {
            source,
            scanner,
            current,
        }
    }

    /// Parses the source code into a Program AST node.
    ///
    /// Only function declarations may appear at the top level.
    pub fn parse_program(&mut self) -> Result<Program, Error> {
        let mut functions = Vec::new();

        while !self.is_at_end() {
            functions.push(self.parse_function_declaration()?);
        }

        Ok(Program { functions })
    }

    /// Parses a bare statement list up to the end of input.
    pub fn parse_statements(&mut self) -> Result<Vec<Statement>, Error> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    fn parse_function_declaration(&mut self) -> Result<FunctionDeclaration, Error> {
        self.expect(&TokenKind::Function)?;
        let name = self.expect_identifier()?;

        self.expect(&TokenKind::LeftParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                params.push(self.expect_identifier()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(&TokenKind::RightParen)?;

        let body = self.parse_block()?;

        Ok(FunctionDeclaration { name, params, body })
    }

    fn parse_block(&mut self) -> Result<Vec<Statement>, Error> {
        self.expect(&TokenKind::LeftBrace)?;

        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        self.expect(&TokenKind::RightBrace)?;
        Ok(statements)
    }

    /// A braced block, or a single statement standing in for one.
    fn parse_body(&mut self) -> Result<Vec<Statement>, Error> {
        if self.check(&TokenKind::LeftBrace) {
            self.parse_block()
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement, Error> {
        match &self.current.kind {
            TokenKind::Var => self.parse_variable_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::Print | TokenKind::PrintLine => self.parse_print_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::Break => {
                self.advance();
                self.expect(&TokenKind::Semicolon)?;
                Ok(Statement::Break)
            }
            TokenKind::Continue => {
                self.advance();
                self.expect(&TokenKind::Semicolon)?;
                Ok(Statement::Continue)
            }
            _ => {
                let expression = self.parse_expression()?;
                self.expect(&TokenKind::Semicolon)?;
                Ok(Statement::Expression(expression))
            }
        }
    }

    fn parse_variable_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'var'
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Equal)?;
        let initializer = self.parse_expression()?;
        self.expect(&TokenKind::Semicolon)?;

        Ok(Statement::Variable(VariableStatement { name, initializer }))
    }

    /// `for i = init, condition, update body`
    fn parse_for_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'for'
        let variable = self.expect_identifier()?;
        self.expect(&TokenKind::Equal)?;
        let initializer = self.parse_expression()?;
        self.expect(&TokenKind::Comma)?;
        let condition = self.parse_expression()?;
        self.expect(&TokenKind::Comma)?;
        let update = self.parse_expression()?;
        let body = self.parse_body()?;

        Ok(Statement::For(ForStatement {
            variable,
            initializer,
            condition,
            update,
            body,
        }))
    }

    fn parse_if_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'if'

        let mut branches = vec![self.parse_conditional_branch()?];
        while self.check(&TokenKind::Elif) {
            self.advance();
            branches.push(self.parse_conditional_branch()?);
        }

        let alternate = if self.check(&TokenKind::Else) {
            self.advance();
            Some(self.parse_body()?)
        } else {
            None
        };

        Ok(Statement::If(IfStatement {
            branches,
            alternate,
        }))
    }

    fn parse_conditional_branch(&mut self) -> Result<ConditionalBranch, Error> {
        let condition = self.parse_expression()?;
        let body = self.parse_body()?;
        Ok(ConditionalBranch { condition, body })
    }

    fn parse_print_statement(&mut self) -> Result<Statement, Error> {
        let line_feed = self.check(&TokenKind::PrintLine);
        self.advance(); // consume 'print' / 'printLine'

        let mut arguments = Vec::new();
        if !self.check(&TokenKind::Semicolon) {
            loop {
                arguments.push(self.parse_expression()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(&TokenKind::Semicolon)?;

        Ok(Statement::Print(PrintStatement {
            arguments,
            line_feed,
        }))
    }

    fn parse_return_statement(&mut self) -> Result<Statement, Error> {
        self.advance(); // consume 'return'

        let argument = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&TokenKind::Semicolon)?;

        Ok(Statement::Return(argument))
    }

    // ========================================================================
    // Expressions, lowest precedence first
    // ========================================================================

    /// Parses an expression.
    pub fn parse_expression(&mut self) -> Result<Expression, Error> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expression, Error> {
        let target_token = self.current.clone();
        let expr = self.parse_or()?;

        if !self.check(&TokenKind::Equal) {
            return Ok(expr);
        }
        self.advance();
        let value = Box::new(self.parse_assignment()?);

        match expr {
            Expression::Identifier(name) => {
                Ok(Expression::Assignment(AssignmentExpression { name, value }))
            }
            Expression::Element(ElementExpression { container, index }) => Ok(
                Expression::ElementAssignment(ElementAssignmentExpression {
                    container,
                    index,
                    value,
                }),
            ),
            _ => Err(self.error_at(&target_token, "Invalid assignment target")),
        }
    }

    fn parse_or(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_and()?;

        while self.check(&TokenKind::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_relational()?;

        while self.check(&TokenKind::And) {
            self.advance();
            let right = self.parse_relational()?;
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::And,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_additive()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::EqualEqual => BinaryOperator::Equal,
                TokenKind::BangEqual => BinaryOperator::NotEqual,
                TokenKind::Less => BinaryOperator::LessThan,
                TokenKind::Greater => BinaryOperator::GreaterThan,
                TokenKind::LessEqual => BinaryOperator::LessOrEqual,
                TokenKind::GreaterEqual => BinaryOperator::GreaterOrEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = Expression::Binary(BinaryExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Plus => BinaryOperator::Add,
                TokenKind::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::Binary(BinaryExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, Error> {
        let mut left = self.parse_unary()?;

        loop {
            let operator = match &self.current.kind {
                TokenKind::Star => BinaryOperator::Multiply,
                TokenKind::Slash => BinaryOperator::Divide,
                TokenKind::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Binary(BinaryExpression {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, Error> {
        let operator = match &self.current.kind {
            TokenKind::Plus => UnaryOperator::Plus,
            TokenKind::Minus => UnaryOperator::Minus,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let argument = self.parse_unary()?;

        Ok(Expression::Unary(UnaryExpression {
            operator,
            argument: Box::new(argument),
        }))
    }

    fn parse_postfix(&mut self) -> Result<Expression, Error> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.check(&TokenKind::LeftParen) {
                self.advance();
                let arguments = self.parse_arguments(&TokenKind::RightParen)?;
                expr = Expression::Call(CallExpression {
                    callee: Box::new(expr),
                    arguments,
                });
            } else if self.check(&TokenKind::LeftBracket) {
                self.advance();
                let index = self.parse_expression()?;
                self.expect(&TokenKind::RightBracket)?;
                expr = Expression::Element(ElementExpression {
                    container: Box::new(expr),
                    index: Box::new(index),
                });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Comma-separated expressions up to and including `close`.
    fn parse_arguments(&mut self, close: &TokenKind) -> Result<Vec<Expression>, Error> {
        let mut args = Vec::new();

        if !self.check(close) {
            loop {
                args.push(self.parse_expression()?);
                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(close)?;

        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression, Error> {
        let literal = match &self.current.kind {
            TokenKind::Null => Literal::Null,
            TokenKind::True => Literal::Boolean(true),
            TokenKind::False => Literal::Boolean(false),
            TokenKind::Number(n) => Literal::Number(*n),
            TokenKind::String(s) => Literal::String(s.clone()),
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance();
                return Ok(Expression::Identifier(name));
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&TokenKind::RightParen)?;
                return Ok(expr);
            }
            TokenKind::LeftBracket => {
                self.advance();
                let elements = self.parse_arguments(&TokenKind::RightBracket)?;
                return Ok(Expression::Array(elements));
            }
            TokenKind::LeftBrace => return self.parse_map_literal(),
            _ => return Err(self.unexpected("an expression")),
        };
        self.advance();

        Ok(Expression::Literal(literal))
    }

    fn parse_map_literal(&mut self) -> Result<Expression, Error> {
        self.advance(); // consume '{'
        let mut entries = Vec::new();

        if !self.check(&TokenKind::RightBrace) {
            loop {
                let TokenKind::String(key) = &self.current.kind else {
                    return Err(self.unexpected("a string key"));
                };
                let key = key.clone();
                self.advance();
                self.expect(&TokenKind::Colon)?;
                entries.push((key, self.parse_expression()?));

                if !self.check(&TokenKind::Comma) {
                    break;
                }
                self.advance();
            }
        }
        self.expect(&TokenKind::RightBrace)?;

        Ok(Expression::Map(entries))
    }

    // Helper methods

    fn advance(&mut self) {
        self.current = self.scanner.next_token();
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.current.kind) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), Error> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(&format!("{:?}", kind)))
        }
    }

    fn expect_identifier(&mut self) -> Result<String, Error> {
        if let TokenKind::Identifier(name) = &self.current.kind {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("identifier"))
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current.kind, TokenKind::Eof)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let message = match &self.current.kind {
            TokenKind::Invalid(reason) => reason.clone(),
            TokenKind::Eof => format!("Expected {}, found end of input", expected),
            found => format!("Expected {}, found {:?}", expected, found),
        };
        self.error_at(&self.current, message)
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> Error {
        let (line, column) = token.span.position(self.source);
        Error::Syntax {
            message: message.into(),
            line,
            column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to parse the body of a single `main` function
    fn parse_body(src: &str) -> Vec<Statement> {
        let source = format!("function main() {{ {} }}", src);
        let mut parser = Parser::new(&source);
        let mut program = parser.parse_program().unwrap();
        program.functions.remove(0).body
    }

    // Helper to parse an expression statement
    fn parse_expr(src: &str) -> Expression {
        match parse_body(&format!("{};", src)).remove(0) {
            Statement::Expression(expr) => expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    // Helper to parse and check it fails
    fn parse_err(src: &str) -> Error {
        let mut parser = Parser::new(src);
        parser.parse_program().unwrap_err()
    }

    fn number(n: f64) -> Expression {
        Expression::Literal(Literal::Number(n))
    }

    #[test]
    fn test_parse_function_declarations() {
        let mut parser = Parser::new("function add(a, b) { return a + b; } function main() { }");
        let program = parser.parse_program().unwrap();

        assert_eq!(program.functions.len(), 2);
        assert_eq!(program.functions[0].name, "add");
        assert_eq!(program.functions[0].params, vec!["a", "b"]);
        assert_eq!(program.functions[1].name, "main");
        assert!(program.functions[1].body.is_empty());
    }

    #[test]
    fn test_parse_bare_statements() {
        let statements = Parser::new("var x = 1;\nprint x;").parse_statements().unwrap();
        assert_eq!(statements.len(), 2);
        assert!(matches!(statements[1], Statement::Print(_)));

        let err = Parser::new("print 1;\nprint ;").parse_statements().unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_parse_empty_program() {
        let program = Parser::new("").parse_program().unwrap();
        assert!(program.functions.is_empty());
    }

    #[test]
    fn test_parse_variable_statement() {
        let body = parse_body("var x = 42;");
        assert_eq!(
            body,
            vec![Statement::Variable(VariableStatement {
                name: "x".into(),
                initializer: number(42.0),
            })]
        );
    }

    #[test]
    fn test_parse_for_statement() {
        let body = parse_body("for i = 0, i < 3, i = i + 1 { print i; }");
        let Statement::For(for_stmt) = &body[0] else {
            panic!("expected for statement");
        };
        assert_eq!(for_stmt.variable, "i");
        assert_eq!(for_stmt.initializer, number(0.0));
        assert!(matches!(for_stmt.update, Expression::Assignment(_)));
        assert_eq!(for_stmt.body.len(), 1);
    }

    #[test]
    fn test_parse_if_elif_else() {
        let body = parse_body("if x == 1 { print 'a'; } elif x == 2 { print 'b'; } else { print 'c'; }");
        let Statement::If(if_stmt) = &body[0] else {
            panic!("expected if statement");
        };
        assert_eq!(if_stmt.branches.len(), 2);
        assert_eq!(if_stmt.alternate.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_parse_single_statement_bodies() {
        let body = parse_body("for i = 0, i < 4, i = i + 1 if (i == 2) continue; else print i;");
        let Statement::For(for_stmt) = &body[0] else {
            panic!("expected for statement");
        };
        let Statement::If(if_stmt) = &for_stmt.body[0] else {
            panic!("expected if statement");
        };
        assert_eq!(if_stmt.branches[0].body, vec![Statement::Continue]);
    }

    #[test]
    fn test_parse_print_statements() {
        let body = parse_body("print 'a', 1; printLine; printLine 'x';");
        assert_eq!(
            body[0],
            Statement::Print(PrintStatement {
                arguments: vec![Expression::Literal(Literal::String("a".into())), number(1.0)],
                line_feed: false,
            })
        );
        assert_eq!(
            body[1],
            Statement::Print(PrintStatement {
                arguments: Vec::new(),
                line_feed: true,
            })
        );
    }

    #[test]
    fn test_parse_return_forms() {
        let body = parse_body("return 1; return;");
        assert_eq!(body[0], Statement::Return(Some(number(1.0))));
        assert_eq!(body[1], Statement::Return(None));
    }

    #[test]
    fn test_parse_break_continue() {
        let body = parse_body("break; continue;");
        assert_eq!(body, vec![Statement::Break, Statement::Continue]);
    }

    #[test]
    fn test_multiplicative_binds_tighter() {
        let expr = parse_expr("1 + 2 * 3");
        let Expression::Binary(add) = expr else {
            panic!("expected binary");
        };
        assert_eq!(add.operator, BinaryOperator::Add);
        assert!(matches!(*add.right, Expression::Binary(BinaryExpression { operator: BinaryOperator::Multiply, .. })));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let expr = parse_expr("a or b and c");
        let Expression::Logical(or) = expr else {
            panic!("expected logical");
        };
        assert_eq!(or.operator, LogicalOperator::Or);
        assert!(matches!(*or.right, Expression::Logical(LogicalExpression { operator: LogicalOperator::And, .. })));
    }

    #[test]
    fn test_relational_is_left_associative() {
        let expr = parse_expr("1 < 2 == true");
        let Expression::Binary(eq) = expr else {
            panic!("expected binary");
        };
        assert_eq!(eq.operator, BinaryOperator::Equal);
        assert!(matches!(*eq.left, Expression::Binary(BinaryExpression { operator: BinaryOperator::LessThan, .. })));
    }

    #[test]
    fn test_unary_operators() {
        assert!(matches!(
            parse_expr("-x"),
            Expression::Unary(UnaryExpression { operator: UnaryOperator::Minus, .. })
        ));
        assert!(matches!(
            parse_expr("+x"),
            Expression::Unary(UnaryExpression { operator: UnaryOperator::Plus, .. })
        ));
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let expr = parse_expr("a = b = 1");
        let Expression::Assignment(outer) = expr else {
            panic!("expected assignment");
        };
        assert_eq!(outer.name, "a");
        assert!(matches!(*outer.value, Expression::Assignment(_)));
    }

    #[test]
    fn test_element_assignment() {
        let expr = parse_expr("a[0] = 5");
        assert!(matches!(expr, Expression::ElementAssignment(_)));
    }

    #[test]
    fn test_call_and_index_chain() {
        let expr = parse_expr("f(1, 2)[0]");
        let Expression::Element(element) = expr else {
            panic!("expected element");
        };
        let Expression::Call(call) = *element.container else {
            panic!("expected call");
        };
        assert_eq!(call.arguments.len(), 2);
    }

    #[test]
    fn test_array_and_map_literals() {
        assert_eq!(
            parse_expr("[1, 2]"),
            Expression::Array(vec![number(1.0), number(2.0)])
        );
        assert_eq!(
            parse_expr("{'b': 1, 'a': 2}"),
            Expression::Map(vec![("b".into(), number(1.0)), ("a".into(), number(2.0))])
        );
        assert_eq!(parse_expr("{}"), Expression::Map(Vec::new()));
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = parse_err("function main() { 1 = 2; }");
        assert!(matches!(err, Error::Syntax { ref message, .. } if message.contains("assignment")));
    }

    #[test]
    fn test_top_level_statement_rejected() {
        let err = parse_err("var x = 1;");
        assert!(matches!(err, Error::Syntax { line: 1, column: 1, .. }));
    }

    #[test]
    fn test_error_position() {
        let err = parse_err("function main() {\n  var = 3;\n}");
        assert!(matches!(err, Error::Syntax { line: 2, column: 7, .. }));
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse_err("function main() { print 1 }");
        assert!(matches!(err, Error::Syntax { ref message, .. } if message.contains("Semicolon")));
    }

    #[test]
    fn test_unterminated_comment_is_reported() {
        let err = parse_err("function main() { }\n/* trailing");
        assert!(matches!(err, Error::Syntax { ref message, line: 2, .. } if message.contains("unterminated comment")));
    }

    #[test]
    fn test_lexer_error_is_reported() {
        let err = parse_err("function main() { print 'oops; }");
        assert!(matches!(err, Error::Syntax { ref message, .. } if message.contains("unterminated")));
    }
}
