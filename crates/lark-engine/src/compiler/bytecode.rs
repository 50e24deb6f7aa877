//! Bytecode definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::Error;
use crate::runtime::function::FunctionRef;

/// A compiled program: one flat instruction stream plus the function table.
///
/// Built once by the compiler and read-only while the VM runs it.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    /// The instructions
    pub instructions: Vec<Instruction>,
    /// Function name to entry point
    pub functions: BTreeMap<String, Arc<FunctionRef>>,
}

impl Bytecode {
    /// Creates a new empty bytecode chunk.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an instruction and returns its index.
    pub fn emit(&mut self, instruction: Instruction) -> usize {
        let index = self.instructions.len();
        self.instructions.push(instruction);
        index
    }

    /// Returns the index the next instruction will get.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if no instructions have been emitted.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Looks up a compiled function by name.
    pub fn function(&self, name: &str) -> Option<&Arc<FunctionRef>> {
        self.functions.get(name)
    }
}

/// A single bytecode instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The operation code
    pub opcode: OpCode,
    /// Optional operand
    pub operand: Option<Operand>,
}

impl Instruction {
    /// Creates a new instruction with no operand.
    pub fn simple(opcode: OpCode) -> Self {
        Self {
            opcode,
            operand: None,
        }
    }

    /// Creates a new instruction with an operand.
    pub fn with_operand(opcode: OpCode, operand: Operand) -> Self {
        Self {
            opcode,
            operand: Some(operand),
        }
    }

    fn malformed(&self, expected: &str) -> Error {
        Error::Internal(format!(
            "{} expects {} operand, found {:?}",
            self.opcode, expected, self.operand
        ))
    }

    /// Returns the jump target.
    pub fn address(&self) -> Result<usize, Error> {
        match self.operand {
            Some(Operand::Address(address)) => Ok(address),
            _ => Err(self.malformed("an address")),
        }
    }

    /// Returns the frame slot index.
    pub fn local(&self) -> Result<usize, Error> {
        match self.operand {
            Some(Operand::Local(slot)) => Ok(slot),
            _ => Err(self.malformed("a slot")),
        }
    }

    /// Returns the count operand.
    pub fn count(&self) -> Result<usize, Error> {
        match self.operand {
            Some(Operand::Count(count)) => Ok(count),
            _ => Err(self.malformed("a count")),
        }
    }

    /// Returns the boolean operand.
    pub fn boolean(&self) -> Result<bool, Error> {
        match self.operand {
            Some(Operand::Boolean(b)) => Ok(b),
            _ => Err(self.malformed("a boolean")),
        }
    }

    /// Returns the number operand.
    pub fn number(&self) -> Result<f64, Error> {
        match self.operand {
            Some(Operand::Number(n)) => Ok(n),
            _ => Err(self.malformed("a number")),
        }
    }

    /// Returns the string operand.
    pub fn string(&self) -> Result<&str, Error> {
        match &self.operand {
            Some(Operand::String(s)) => Ok(s),
            _ => Err(self.malformed("a string")),
        }
    }
}

/// Instruction operands.
///
/// Each opcode takes exactly one operand shape (or none):
///
/// | Operand | Opcodes |
/// |---------|---------|
/// | `Address` | `Jump`, `ConditionJump`, `LogicalOr`, `LogicalAnd` |
/// | `Local` | `GetLocal`, `SetLocal` |
/// | `Count` | `Call`, `Alloca`, `Print`, `PushArray`, `PushMap` |
/// | `Boolean` | `PushBoolean` |
/// | `Number` | `PushNumber` |
/// | `String` | `PushString`, `GetGlobal`, `SetGlobal` |
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Absolute instruction index
    Address(usize),
    /// Frame slot index
    Local(usize),
    /// Argument, element, entry or slot count
    Count(usize),
    /// Boolean literal
    Boolean(bool),
    /// Number literal
    Number(f64),
    /// String literal or global name
    String(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Address(address) => write!(f, "{}", address),
            Operand::Local(slot) => write!(f, "[{}]", slot),
            Operand::Count(count) => write!(f, "[{}]", count),
            Operand::Boolean(b) => write!(f, "{}", b),
            Operand::Number(n) => write!(f, "{}", n),
            Operand::String(s) => write!(f, "\"{}\"", s.escape_default()),
        }
    }
}

/// Operation codes for the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    // Control
    /// Halt the machine
    Exit,
    /// Call the callee on top of the stack with `Count` arguments below it
    Call,
    /// Grow the frame's slot array to `Count` slots
    Alloca,
    /// Return the top of the operand stack (or null) to the caller
    Return,
    /// Unconditional jump
    Jump,
    /// Pop; jump unless the value is `true`
    ConditionJump,

    // I/O
    /// Pop `Count` values and write them in popped order
    Print,
    /// Write a line feed
    PrintLine,

    // Logic
    /// Short-circuit `or`: keep a `true` left operand and jump
    LogicalOr,
    /// Short-circuit `and`: keep a `false` left operand and jump
    LogicalAnd,

    // Comparison
    /// Equal (==)
    Equal,
    /// Not equal (!=)
    NotEqual,
    /// Less than
    LessThan,
    /// Greater than
    GreaterThan,
    /// Less than or equal
    LessOrEqual,
    /// Greater than or equal
    GreaterOrEqual,

    // Arithmetic
    /// Add numbers or concatenate strings
    Add,
    /// Subtract
    Subtract,
    /// Multiply
    Multiply,
    /// Divide
    Divide,
    /// Modulo
    Modulo,
    /// Absolute value (unary plus)
    Absolute,
    /// Negate (unary minus)
    ReverseSign,

    // Data access
    /// Pop index and container; push the element
    GetElement,
    /// Pop index and container; store the value left on top
    SetElement,
    /// Push a global, function or builtin by name
    GetGlobal,
    /// Store the top of the stack into a global
    SetGlobal,
    /// Push a frame slot
    GetLocal,
    /// Store the top of the stack into a frame slot
    SetLocal,

    // Literals
    /// Push null
    PushNull,
    /// Push a boolean
    PushBoolean,
    /// Push a number
    PushNumber,
    /// Push a string
    PushString,
    /// Pop `Count` elements into a new array
    PushArray,
    /// Pop `Count` key/value pairs into a new map
    PushMap,

    // Stack
    /// Pop the top value
    PopOperand,
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("{:?}", self))
    }
}
