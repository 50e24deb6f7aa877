//! The bytecode interpreter.

use std::fmt;
use std::io::{self, Write};

use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use super::operators;
use crate::Error;
use crate::compiler::{Bytecode, Instruction, OpCode};
use crate::gc::{Heap, HeapStats};
use crate::runtime::function::StackFrame;
use crate::runtime::value::Value;

/// The virtual machine that executes bytecode.
///
/// Globals and the heap outlive a single [`VM::execute`] call, so one VM can
/// run a sequence of programs that share state.
pub struct VM {
    /// Call stack; the bottom frame runs the bootstrap code
    frames: Vec<StackFrame>,
    /// Global variables
    globals: FxHashMap<String, Value>,
    /// Native functions by name
    builtins: FxHashMap<String, Value>,
    /// Arrays and maps
    heap: Heap,
    /// Where `print` writes
    output: Box<dyn Write + Send>,
}

impl Default for VM {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VM")
            .field("frames", &self.frames.len())
            .field("globals", &self.globals.len())
            .field("builtins", &self.builtins.len())
            .field("heap", &self.heap.stats())
            .finish()
    }
}

impl VM {
    /// Creates a new VM that prints to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates a new VM that prints to `output`.
    pub fn with_output(output: Box<dyn Write + Send>) -> Self {
        Self {
            frames: Vec::with_capacity(64),
            globals: FxHashMap::default(),
            builtins: crate::builtins::register_builtins(),
            heap: Heap::new(),
            output,
        }
    }

    /// Replaces the output sink.
    pub fn set_output(&mut self, output: Box<dyn Write + Send>) {
        self.output = output;
    }

    /// Returns the heap.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Returns heap statistics.
    pub fn heap_stats(&self) -> HeapStats {
        self.heap.stats()
    }

    /// Looks up a global variable.
    pub fn global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Returns all global variables.
    pub fn globals(&self) -> &FxHashMap<String, Value> {
        &self.globals
    }

    /// Executes bytecode until it reaches `Exit`.
    pub fn execute(&mut self, bytecode: &Bytecode) -> Result<(), Error> {
        self.frames.clear();
        self.frames.push(StackFrame::new(0, Vec::new()));

        let result = self.run(bytecode);

        self.frames.clear();
        if let Err(err) = self.output.flush() {
            warn!(error = %err, "failed to flush output");
        }
        result
    }

    fn run(&mut self, bytecode: &Bytecode) -> Result<(), Error> {
        loop {
            let ip = self.frame()?.ip;
            let instruction = bytecode.instructions.get(ip).ok_or_else(|| {
                Error::Internal(format!(
                    "instruction pointer {} outside program of {} instructions",
                    ip,
                    bytecode.len()
                ))
            })?;

            match instruction.opcode {
                OpCode::Exit => return Ok(()),

                OpCode::Call => {
                    if self.call(bytecode, instruction.count()?)? {
                        continue;
                    }
                }

                OpCode::Alloca => {
                    let size = instruction.count()?;
                    let frame = self.frame()?;
                    if frame.locals.len() < size {
                        frame.locals.resize(size, Value::Null);
                    }
                }

                OpCode::Return => {
                    self.return_from_frame()?;
                    continue;
                }

                OpCode::Jump => {
                    self.jump(instruction)?;
                    continue;
                }

                OpCode::ConditionJump => {
                    if !self.pop()?.is_true() {
                        self.jump(instruction)?;
                        continue;
                    }
                }

                OpCode::Print => {
                    for _ in 0..instruction.count()? {
                        let value = self.pop()?;
                        if let Err(err) = write!(self.output, "{}", value.display(&self.heap)) {
                            warn!(error = %err, "failed to write output");
                        }
                    }
                }

                OpCode::PrintLine => {
                    if let Err(err) = writeln!(self.output) {
                        warn!(error = %err, "failed to write output");
                    }
                }

                OpCode::LogicalOr | OpCode::LogicalAnd => {
                    let value = self.pop()?;
                    let short_circuit = match instruction.opcode {
                        OpCode::LogicalOr => value.is_true(),
                        _ => value.is_false(),
                    };
                    if short_circuit {
                        self.push(value)?;
                        self.jump(instruction)?;
                        continue;
                    }
                }

                OpCode::Equal => self.binary(|a, b| Value::Boolean(operators::equals(a, b)))?,
                OpCode::NotEqual => {
                    self.binary(|a, b| Value::Boolean(operators::not_equals(a, b)))?
                }
                OpCode::LessThan => self.comparison(|a, b| a < b)?,
                OpCode::GreaterThan => self.comparison(|a, b| a > b)?,
                OpCode::LessOrEqual => self.comparison(|a, b| a <= b)?,
                OpCode::GreaterOrEqual => self.comparison(|a, b| a >= b)?,

                OpCode::Add => self.binary(operators::add)?,
                OpCode::Subtract => self.arithmetic(|a, b| a - b)?,
                OpCode::Multiply => self.arithmetic(|a, b| a * b)?,
                OpCode::Divide => self.arithmetic(operators::divide)?,
                OpCode::Modulo => self.arithmetic(operators::modulo)?,
                OpCode::Absolute => {
                    let value = self.pop()?;
                    self.push(operators::absolute(&value))?;
                }
                OpCode::ReverseSign => {
                    let value = self.pop()?;
                    self.push(operators::reverse_sign(&value))?;
                }

                OpCode::GetElement => {
                    let index = self.pop()?;
                    let container = self.pop()?;
                    let element = self.get_element(&container, &index);
                    self.push(element)?;
                }

                OpCode::SetElement => {
                    let index = self.pop()?;
                    let container = self.pop()?;
                    let value = self.peek()?.clone();
                    self.set_element(&container, index, value);
                }

                OpCode::GetGlobal => {
                    let value = self.lookup_global(bytecode, instruction.string()?);
                    self.push(value)?;
                }

                OpCode::SetGlobal => {
                    let value = self.peek()?.clone();
                    self.globals.insert(instruction.string()?.to_string(), value);
                }

                OpCode::GetLocal => {
                    let slot = instruction.local()?;
                    let frame = self.frame()?;
                    let value = frame.locals.get(slot).cloned().unwrap_or_default();
                    frame.stack.push(value);
                }

                OpCode::SetLocal => {
                    let slot = instruction.local()?;
                    let value = self.peek()?.clone();
                    let frame = self.frame()?;
                    if slot >= frame.locals.len() {
                        frame.locals.resize(slot + 1, Value::Null);
                    }
                    frame.locals[slot] = value;
                }

                OpCode::PushNull => self.push(Value::Null)?,
                OpCode::PushBoolean => self.push(Value::Boolean(instruction.boolean()?))?,
                OpCode::PushNumber => self.push(Value::Number(instruction.number()?))?,
                OpCode::PushString => {
                    self.push(Value::String(instruction.string()?.to_string()))?
                }

                OpCode::PushArray => {
                    let elements = self.pop_n(instruction.count()?)?;
                    let array = self.heap.alloc_array(elements);
                    self.push(array)?;
                }

                OpCode::PushMap => {
                    let mut entries = std::collections::BTreeMap::new();
                    for _ in 0..instruction.count()? {
                        let value = self.pop()?;
                        if let Value::String(key) = self.pop()? {
                            entries.insert(key, value);
                        }
                    }
                    let map = self.heap.alloc_map(entries);
                    self.push(map)?;
                }

                OpCode::PopOperand => {
                    self.pop()?;
                }
            }

            self.frame()?.ip += 1;
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Calls the value on top of the stack. Returns true if a new frame was
    /// entered, in which case the caller's `ip` stays on the `Call`.
    ///
    /// Function values may outlive the program that created them (globals
    /// persist across `execute`), so they are re-resolved by name against the
    /// running program; a name it does not define is not callable.
    fn call(&mut self, bytecode: &Bytecode, argc: usize) -> Result<bool, Error> {
        let callee = match self.pop()? {
            Value::Function(function) => match bytecode.function(&function.name) {
                Some(entry) => Value::Function(entry.clone()),
                None => Value::Null,
            },
            other => other,
        };

        match callee {
            Value::Function(function) => {
                let locals = self.pop_n(argc)?;
                trace!(function = %function.name, argc, "calling function");
                self.frames.push(StackFrame::new(function.address, locals));
                Ok(true)
            }
            Value::Builtin(builtin) => {
                let args = self.pop_n(argc)?;
                trace!(builtin = builtin.name, argc, "calling builtin");
                let result = builtin.call(&mut self.heap, &args);
                self.push(result)?;
                Ok(false)
            }
            other => {
                trace!(callee = other.type_of(), "call to a non-function");
                self.pop_n(argc)?;
                self.push(Value::Null)?;
                Ok(false)
            }
        }
    }

    fn return_from_frame(&mut self) -> Result<(), Error> {
        let mut frame = self
            .frames
            .pop()
            .ok_or_else(|| Error::Internal("return with no active frame".into()))?;
        let result = frame.stack.pop().unwrap_or_default();

        let caller = self
            .frames
            .last_mut()
            .ok_or_else(|| Error::Internal("return with no caller".into()))?;
        caller.stack.push(result);
        caller.ip += 1;

        self.collect_garbage();
        Ok(())
    }

    fn collect_garbage(&mut self) {
        let roots = self
            .frames
            .iter()
            .flat_map(StackFrame::roots)
            .chain(self.globals.values());
        self.heap.collect(roots);
    }

    // ========================================================================
    // Data access
    // ========================================================================

    fn lookup_global(&self, bytecode: &Bytecode, name: &str) -> Value {
        if let Some(function) = bytecode.function(name) {
            return Value::Function(function.clone());
        }
        self.builtins
            .get(name)
            .or_else(|| self.globals.get(name))
            .cloned()
            .unwrap_or_default()
    }

    fn get_element(&self, container: &Value, index: &Value) -> Value {
        let element = match (container, index) {
            (Value::Array(handle), Value::Number(n)) => array_index(*n)
                .and_then(|i| self.heap.array(*handle)?.get(i).cloned()),
            (Value::Map(handle), Value::String(key)) => {
                self.heap.map(*handle).and_then(|map| map.get(key).cloned())
            }
            _ => None,
        };
        element.unwrap_or_default()
    }

    fn set_element(&mut self, container: &Value, index: Value, value: Value) {
        match (container, index) {
            (Value::Array(handle), Value::Number(n)) => {
                let Some(i) = array_index(n) else { return };
                if let Some(slot) = self.heap.array_mut(*handle).and_then(|array| array.get_mut(i)) {
                    *slot = value;
                }
            }
            (Value::Map(handle), Value::String(key)) => {
                if let Some(map) = self.heap.map_mut(*handle) {
                    map.insert(key, value);
                }
            }
            _ => {}
        }
    }

    // ========================================================================
    // Operand stack
    // ========================================================================

    fn frame(&mut self) -> Result<&mut StackFrame, Error> {
        self.frames
            .last_mut()
            .ok_or_else(|| Error::Internal("no active frame".into()))
    }

    fn jump(&mut self, instruction: &Instruction) -> Result<(), Error> {
        let target = instruction.address()?;
        self.frame()?.ip = target;
        Ok(())
    }

    fn push(&mut self, value: Value) -> Result<(), Error> {
        self.frame()?.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, Error> {
        self.frame()?
            .stack
            .pop()
            .ok_or_else(|| Error::Internal("Stack underflow".into()))
    }

    fn peek(&mut self) -> Result<&Value, Error> {
        self.frame()?
            .stack
            .last()
            .ok_or_else(|| Error::Internal("Stack underflow".into()))
    }

    /// Pops `n` values; the first popped comes first.
    fn pop_n(&mut self, n: usize) -> Result<Vec<Value>, Error> {
        let stack = &mut self.frame()?.stack;
        if stack.len() < n {
            return Err(Error::Internal(format!(
                "Stack underflow: need {} operands, have {}",
                n,
                stack.len()
            )));
        }
        let mut values = stack.split_off(stack.len() - n);
        values.reverse();
        Ok(values)
    }

    fn binary<F>(&mut self, op: F) -> Result<(), Error>
    where
        F: Fn(&Value, &Value) -> Value,
    {
        let b = self.pop()?;
        let a = self.pop()?;
        self.push(op(&a, &b))
    }

    fn arithmetic<F>(&mut self, op: F) -> Result<(), Error>
    where
        F: Fn(f64, f64) -> f64,
    {
        self.binary(|a, b| operators::arithmetic(a, b, &op))
    }

    fn comparison<F>(&mut self, op: F) -> Result<(), Error>
    where
        F: Fn(f64, f64) -> bool,
    {
        self.binary(|a, b| Value::Boolean(operators::compare(a, b, &op)))
    }
}

/// Truncates a number to an array index; negative and NaN have none.
fn array_index(n: f64) -> Option<usize> {
    let index = n.trunc();
    if index >= 0.0 { Some(index as usize) } else { None }
}
