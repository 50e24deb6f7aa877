//! Human-readable bytecode listings.

use std::collections::BTreeSet;
use std::fmt::Write;

use super::bytecode::{Bytecode, Instruction, OpCode};

/// Renders the function table followed by every instruction.
///
/// Instructions that are the target of a jump are marked with `►`, and each
/// function's entry point is preceded by its name.
pub fn disassemble(bytecode: &Bytecode) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = write_functions(&mut out, bytecode);
    let _ = write_instructions(&mut out, bytecode);
    out
}

fn write_functions(out: &mut String, bytecode: &Bytecode) -> std::fmt::Result {
    writeln!(out, "{:<24} {:>8}", "FUNCTION", "ADDRESS")?;
    writeln!(out, "{}", "─".repeat(33))?;

    let mut entries: Vec<_> = bytecode.functions.values().collect();
    entries.sort_by_key(|function| function.address);
    for function in entries {
        writeln!(out, "{:<24} {:>8}", function.name, function.address)?;
    }
    writeln!(out)
}

fn write_instructions(out: &mut String, bytecode: &Bytecode) -> std::fmt::Result {
    let targets = jump_targets(&bytecode.instructions);
    let entries: Vec<(usize, &str)> = bytecode
        .functions
        .values()
        .map(|function| (function.address, function.name.as_str()))
        .collect();

    writeln!(out, "{:>6}   {:<16} {}", "ADDR", "INSTRUCTION", "OPERAND")?;
    writeln!(out, "{}", "─".repeat(40))?;

    for (address, instruction) in bytecode.instructions.iter().enumerate() {
        for (_, name) in entries.iter().filter(|(entry, _)| *entry == address) {
            writeln!(out, "{}:", name)?;
        }

        let marker = if targets.contains(&address) { "►" } else { " " };
        write!(out, "{:>6} {} {:<16}", address, marker, instruction.opcode)?;
        if let Some(operand) = &instruction.operand {
            write!(out, " {}", operand)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

fn jump_targets(instructions: &[Instruction]) -> BTreeSet<usize> {
    instructions
        .iter()
        .filter(|instruction| {
            matches!(
                instruction.opcode,
                OpCode::Jump | OpCode::ConditionJump | OpCode::LogicalOr | OpCode::LogicalAnd
            )
        })
        .filter_map(|instruction| instruction.address().ok())
        .collect()
}
