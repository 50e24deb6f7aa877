//! Code generation from AST to bytecode.
//!
//! The `Compiler` lowers a [`Program`] into one flat instruction stream.
//! Every program starts with a three-instruction bootstrap that calls
//! `main` and halts; function bodies follow in declaration order.
//!
//! ## Lowering
//!
//! | Construct | Instructions |
//! |-----------|--------------|
//! | `var x = e;` | `e`, `SetLocal x`, `PopOperand` |
//! | `e;` | `e`, `PopOperand` |
//! | `print a, b;` | `b`, `a`, `Print 2` (`PrintLine` for `printLine`) |
//! | `return e;` | `e`, `Return` |
//! | `f(a, b)` | `b`, `a`, `f`, `Call 2` |
//! | `[a, b]` | `b`, `a`, `PushArray 2` |
//! | `{'k': v}` | `PushString k`, `v`, `PushMap 1` |
//! | `c[i] = v` | `v`, `c`, `i`, `SetElement` |
//! | `a or b` | `a`, `LogicalOr end`, `b`, end: |
//!
//! Statements leave the operand stack exactly as they found it.

mod scope;


pub use scope::Scope;

use std::sync::Arc;

use tracing::debug;

use crate::Error;
use crate::ast::*;
use crate::compiler::bytecode::{Bytecode, Instruction, OpCode, Operand};
use crate::runtime::function::FunctionRef;

/// Pending jumps of the innermost enclosing loop.
#[derive(Debug, Default)]
struct LoopContext {
    breaks: Vec<usize>,
    continues: Vec<usize>,
}

/// Compiles AST to bytecode.
#[derive(Debug, Default)]
pub struct Compiler {
    /// The bytecode being generated
    pub bytecode: Bytecode,
    /// Slot allocation for the function being compiled
    pub scope: Scope,
    loops: Vec<LoopContext>,
}

impl Compiler {
    /// Creates a new compiler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles a program to bytecode.
    pub fn compile(&mut self, program: &Program) -> Result<Bytecode, Error> {
        self.emit_with(OpCode::GetGlobal, Operand::String("main".into()));
        self.emit_with(OpCode::Call, Operand::Count(0));
        self.emit(OpCode::Exit);

        for function in &program.functions {
            self.compile_function(function)?;
        }

        debug!(
            instructions = self.bytecode.len(),
            functions = self.bytecode.functions.len(),
            "compiled program"
        );

        Ok(std::mem::take(&mut self.bytecode))
    }

    // ========================================================================
    // Emission helpers
    // ========================================================================

    fn emit(&mut self, opcode: OpCode) -> usize {
        self.bytecode.emit(Instruction::simple(opcode))
    }

    fn emit_with(&mut self, opcode: OpCode, operand: Operand) -> usize {
        self.bytecode.emit(Instruction::with_operand(opcode, operand))
    }

    /// Emits a jump whose target is patched later.
    fn emit_jump(&mut self, opcode: OpCode) -> usize {
        self.emit_with(opcode, Operand::Address(0))
    }

    /// Points a previously emitted jump at `target`.
    fn patch(&mut self, index: usize, operand: Operand) -> Result<(), Error> {
        let instruction = self
            .bytecode
            .instructions
            .get_mut(index)
            .ok_or_else(|| Error::Compile(format!("patch target {} out of range", index)))?;
        instruction.operand = Some(operand);
        Ok(())
    }

    /// Points a previously emitted jump at the next instruction.
    fn patch_to_here(&mut self, index: usize) -> Result<(), Error> {
        let here = self.bytecode.len();
        self.patch(index, Operand::Address(here))
    }

    // ========================================================================
    // Functions
    // ========================================================================

    fn compile_function(&mut self, function: &FunctionDeclaration) -> Result<(), Error> {
        let address = self.bytecode.len();
        self.bytecode.functions.insert(
            function.name.clone(),
            Arc::new(FunctionRef::new(
                function.name.clone(),
                address,
                function.params.clone(),
            )),
        );

        self.scope.begin_function();
        self.loops.clear();

        let alloca = self.emit_with(OpCode::Alloca, Operand::Count(0));
        for param in &function.params {
            self.scope.declare(param);
        }

        self.compile_statements(&function.body)?;

        self.patch(alloca, Operand::Count(self.scope.local_size()))?;
        self.emit(OpCode::Return);

        debug!(
            function = %function.name,
            address,
            locals = self.scope.local_size(),
            "compiled function"
        );
        Ok(())
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn compile_statements(&mut self, statements: &[Statement]) -> Result<(), Error> {
        for statement in statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    /// Compiles statements inside their own block.
    fn compile_block(&mut self, statements: &[Statement]) -> Result<(), Error> {
        self.scope.begin_scope();
        let result = self.compile_statements(statements);
        self.scope.end_scope();
        result
    }

    fn compile_statement(&mut self, stmt: &Statement) -> Result<(), Error> {
        match stmt {
            Statement::Variable(decl) => {
                let slot = self.scope.declare(&decl.name);
                self.compile_expression(&decl.initializer)?;
                self.emit_with(OpCode::SetLocal, Operand::Local(slot));
                self.emit(OpCode::PopOperand);
            }
            Statement::Expression(expr) => {
                self.compile_expression(expr)?;
                self.emit(OpCode::PopOperand);
            }
            Statement::Print(print) => {
                for argument in print.arguments.iter().rev() {
                    self.compile_expression(argument)?;
                }
                self.emit_with(OpCode::Print, Operand::Count(print.arguments.len()));
                if print.line_feed {
                    self.emit(OpCode::PrintLine);
                }
            }
            Statement::Return(argument) => {
                if let Some(argument) = argument {
                    self.compile_expression(argument)?;
                }
                self.emit(OpCode::Return);
            }
            Statement::If(if_stmt) => self.compile_if(if_stmt)?,
            Statement::For(for_stmt) => self.compile_for(for_stmt)?,
            Statement::Break => self.emit_loop_exit(|context| &mut context.breaks),
            Statement::Continue => self.emit_loop_exit(|context| &mut context.continues),
        }
        Ok(())
    }

    /// Emits a pending jump for `break`/`continue`; nothing outside a loop.
    fn emit_loop_exit(&mut self, pending: fn(&mut LoopContext) -> &mut Vec<usize>) {
        let jump = self.bytecode.len();
        if let Some(context) = self.loops.last_mut() {
            pending(context).push(jump);
            self.emit_jump(OpCode::Jump);
        }
    }

    fn compile_if(&mut self, if_stmt: &IfStatement) -> Result<(), Error> {
        let mut end_jumps = Vec::with_capacity(if_stmt.branches.len());

        for branch in &if_stmt.branches {
            self.compile_expression(&branch.condition)?;
            let next_branch = self.emit_jump(OpCode::ConditionJump);
            self.compile_block(&branch.body)?;
            end_jumps.push(self.emit_jump(OpCode::Jump));
            self.patch_to_here(next_branch)?;
        }

        if let Some(alternate) = &if_stmt.alternate {
            self.compile_block(alternate)?;
        }

        for jump in end_jumps {
            self.patch_to_here(jump)?;
        }
        Ok(())
    }

    /// ```text
    ///         init, SetLocal i, PopOperand
    /// start:  condition
    ///         ConditionJump exit
    ///         body                  (continue -> update, break -> exit)
    /// update: update, PopOperand
    ///         Jump start
    /// exit:
    /// ```
    fn compile_for(&mut self, for_stmt: &ForStatement) -> Result<(), Error> {
        self.scope.begin_scope();

        let slot = self.scope.declare(&for_stmt.variable);
        self.compile_expression(&for_stmt.initializer)?;
        self.emit_with(OpCode::SetLocal, Operand::Local(slot));
        self.emit(OpCode::PopOperand);

        let loop_start = self.bytecode.len();
        self.compile_expression(&for_stmt.condition)?;
        let exit_jump = self.emit_jump(OpCode::ConditionJump);

        self.loops.push(LoopContext::default());
        let body = self.compile_block(&for_stmt.body);
        let context = self.loops.pop().unwrap_or_default();
        body?;

        for jump in context.continues {
            self.patch_to_here(jump)?;
        }
        self.compile_expression(&for_stmt.update)?;
        self.emit(OpCode::PopOperand);
        self.emit_with(OpCode::Jump, Operand::Address(loop_start));

        self.patch_to_here(exit_jump)?;
        for jump in context.breaks {
            self.patch_to_here(jump)?;
        }

        self.scope.end_scope();
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn compile_expression(&mut self, expr: &Expression) -> Result<(), Error> {
        match expr {
            Expression::Literal(literal) => {
                match literal {
                    Literal::Null => self.emit(OpCode::PushNull),
                    Literal::Boolean(b) => self.emit_with(OpCode::PushBoolean, Operand::Boolean(*b)),
                    Literal::Number(n) => self.emit_with(OpCode::PushNumber, Operand::Number(*n)),
                    Literal::String(s) => {
                        self.emit_with(OpCode::PushString, Operand::String(s.clone()))
                    }
                };
            }
            Expression::Identifier(name) => match self.scope.resolve(name) {
                Some(slot) => {
                    self.emit_with(OpCode::GetLocal, Operand::Local(slot));
                }
                None => {
                    self.emit_with(OpCode::GetGlobal, Operand::String(name.clone()));
                }
            },
            Expression::Assignment(assign) => {
                self.compile_expression(&assign.value)?;
                match self.scope.resolve(&assign.name) {
                    Some(slot) => {
                        self.emit_with(OpCode::SetLocal, Operand::Local(slot));
                    }
                    None => {
                        self.emit_with(OpCode::SetGlobal, Operand::String(assign.name.clone()));
                    }
                }
            }
            Expression::Array(elements) => {
                for element in elements.iter().rev() {
                    self.compile_expression(element)?;
                }
                self.emit_with(OpCode::PushArray, Operand::Count(elements.len()));
            }
            Expression::Map(entries) => {
                for (key, value) in entries {
                    self.emit_with(OpCode::PushString, Operand::String(key.clone()));
                    self.compile_expression(value)?;
                }
                self.emit_with(OpCode::PushMap, Operand::Count(entries.len()));
            }
            Expression::Element(element) => {
                self.compile_expression(&element.container)?;
                self.compile_expression(&element.index)?;
                self.emit(OpCode::GetElement);
            }
            Expression::ElementAssignment(assign) => {
                self.compile_expression(&assign.value)?;
                self.compile_expression(&assign.container)?;
                self.compile_expression(&assign.index)?;
                self.emit(OpCode::SetElement);
            }
            Expression::Call(call) => {
                for argument in call.arguments.iter().rev() {
                    self.compile_expression(argument)?;
                }
                self.compile_expression(&call.callee)?;
                self.emit_with(OpCode::Call, Operand::Count(call.arguments.len()));
            }
            Expression::Logical(logical) => {
                self.compile_expression(&logical.left)?;
                let opcode = match logical.operator {
                    LogicalOperator::Or => OpCode::LogicalOr,
                    LogicalOperator::And => OpCode::LogicalAnd,
                };
                let end = self.emit_jump(opcode);
                self.compile_expression(&logical.right)?;
                self.patch_to_here(end)?;
            }
            Expression::Binary(binary) => {
                self.compile_expression(&binary.left)?;
                self.compile_expression(&binary.right)?;
                self.emit(binary_opcode(binary.operator));
            }
            Expression::Unary(unary) => {
                self.compile_expression(&unary.argument)?;
                self.emit(match unary.operator {
                    UnaryOperator::Plus => OpCode::Absolute,
                    UnaryOperator::Minus => OpCode::ReverseSign,
                });
            }
        }
        Ok(())
    }
}

fn binary_opcode(operator: BinaryOperator) -> OpCode {
    match operator {
        BinaryOperator::Equal => OpCode::Equal,
        BinaryOperator::NotEqual => OpCode::NotEqual,
        BinaryOperator::LessThan => OpCode::LessThan,
        BinaryOperator::GreaterThan => OpCode::GreaterThan,
        BinaryOperator::LessOrEqual => OpCode::LessOrEqual,
        BinaryOperator::GreaterOrEqual => OpCode::GreaterOrEqual,
        BinaryOperator::Add => OpCode::Add,
        BinaryOperator::Subtract => OpCode::Subtract,
        BinaryOperator::Multiply => OpCode::Multiply,
        BinaryOperator::Divide => OpCode::Divide,
        BinaryOperator::Modulo => OpCode::Modulo,
    }
}
