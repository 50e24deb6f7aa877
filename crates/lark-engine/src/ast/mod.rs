//! Abstract Syntax Tree (AST) definitions for Lark.
//!
//! The node set is closed: every statement and expression kind is an enum
//! variant, so the code generator matches exhaustively.

/// A complete Lark program: a list of top-level functions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// The function declarations, in source order
    pub functions: Vec<FunctionDeclaration>,
}

/// `function name(params) { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    /// The function name
    pub name: String,
    /// The parameter names
    pub params: Vec<String>,
    /// The function body
    pub body: Vec<Statement>,
}

/// A Lark statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `var name = initializer;`
    Variable(VariableStatement),
    /// `for variable = init, condition, update { ... }`
    For(ForStatement),
    /// `break;`
    Break,
    /// `continue;`
    Continue,
    /// `if c { } elif c { } else { }`
    If(IfStatement),
    /// `print a, b;` or `printLine a, b;`
    Print(PrintStatement),
    /// `return expr;` or `return;`
    Return(Option<Expression>),
    /// Expression statement
    Expression(Expression),
}

/// Local variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableStatement {
    /// The variable name
    pub name: String,
    /// The initial value
    pub initializer: Expression,
}

/// Counting loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// The loop variable, local to the loop
    pub variable: String,
    /// Initial value of the loop variable
    pub initializer: Expression,
    /// Loop condition, checked before each iteration
    pub condition: Expression,
    /// Evaluated after each iteration and after `continue`
    pub update: Expression,
    /// The loop body
    pub body: Vec<Statement>,
}

/// Conditional chain.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    /// `if` and `elif` branches, tested in order
    pub branches: Vec<ConditionalBranch>,
    /// The `else` body
    pub alternate: Option<Vec<Statement>>,
}

/// One `if` or `elif` arm.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBranch {
    /// The condition
    pub condition: Expression,
    /// Statements run when the condition is `true`
    pub body: Vec<Statement>,
}

/// Output statement.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintStatement {
    /// Values printed in order, with no separator
    pub arguments: Vec<Expression>,
    /// `printLine` appends a line feed
    pub line_feed: bool,
}

/// A Lark expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal value
    Literal(Literal),
    /// Variable reference
    Identifier(String),
    /// `[a, b, c]`
    Array(Vec<Expression>),
    /// `{'k': v, ...}`, entries in source order
    Map(Vec<(String, Expression)>),
    /// `name = value`
    Assignment(AssignmentExpression),
    /// `container[index]`
    Element(ElementExpression),
    /// `container[index] = value`
    ElementAssignment(ElementAssignmentExpression),
    /// `callee(arguments)`
    Call(CallExpression),
    /// `a or b`, `a and b`
    Logical(LogicalExpression),
    /// Comparison and arithmetic
    Binary(BinaryExpression),
    /// `+x`, `-x`
    Unary(UnaryExpression),
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// null
    Null,
    /// true / false
    Boolean(bool),
    /// Number literal
    Number(f64),
    /// String literal
    String(String),
}

/// Assignment to a variable.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentExpression {
    /// The target variable
    pub name: String,
    /// The assigned value
    pub value: Box<Expression>,
}

/// Element read.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementExpression {
    /// The array or map
    pub container: Box<Expression>,
    /// The index or key
    pub index: Box<Expression>,
}

/// Element write.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementAssignmentExpression {
    /// The array or map
    pub container: Box<Expression>,
    /// The index or key
    pub index: Box<Expression>,
    /// The stored value
    pub value: Box<Expression>,
}

/// Function call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallExpression {
    /// The called expression
    pub callee: Box<Expression>,
    /// The arguments
    pub arguments: Vec<Expression>,
}

/// Short-circuit operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// or
    Or,
    /// and
    And,
}

/// Short-circuit expression.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression {
    /// The operator
    pub operator: LogicalOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand, evaluated only when needed
    pub right: Box<Expression>,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    /// ==
    Equal,
    /// !=
    NotEqual,
    /// <
    LessThan,
    /// >
    GreaterThan,
    /// <=
    LessOrEqual,
    /// >=
    GreaterOrEqual,
    /// +
    Add,
    /// -
    Subtract,
    /// *
    Multiply,
    /// /
    Divide,
    /// %
    Modulo,
}

/// Binary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    /// The operator
    pub operator: BinaryOperator,
    /// Left operand
    pub left: Box<Expression>,
    /// Right operand
    pub right: Box<Expression>,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `+x`: absolute value
    Plus,
    /// `-x`: negation
    Minus,
}

/// Unary expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    /// The operator
    pub operator: UnaryOperator,
    /// The operand
    pub argument: Box<Expression>,
}
