// eule-vm - Bytecode compiler and virtual machine for the eule programming language
// Copyright (c) 2026 The eule authors. MIT licensed.

//! Bytecode disassembler.
//!
//! Renders compiled functions for the `log`-gated bytecode dump and the
//! instruction trace of the dispatch loop.

use std::fmt::Write;

use crate::chunk::Function;
use crate::opcode::{Op, Operand};
use crate::value::Value;

/// Disassemble a function and every nested function in its constant pool.
pub fn disassemble(function: &Function) -> String {
    let mut out = String::new();
    function_code(&mut out, function);
    for constant in &function.constants {
        if let Value::Function(nested) = constant {
            function_code(&mut out, nested);
        }
    }
    out
}

fn function_code(out: &mut String, function: &Function) {
    let name: &str = if function.name.is_empty() {
        "fn"
    } else {
        &function.name
    };
    let _ = writeln!(out, "======== {} ========", name);
    let mut offset = 0;
    while offset < function.code.len() {
        let (line, next) = instruction(function, offset);
        let _ = writeln!(out, "{}", line);
        offset = next;
    }
}

/// Render the instruction at `offset`; returns the text and the offset of
/// the following instruction.
pub fn instruction(function: &Function, offset: usize) -> (String, usize) {
    let mut out = String::new();
    let _ = write!(out, "{:04}", offset);
    if offset > 0 && function.lines[offset] == function.lines[offset - 1] {
        let _ = write!(out, "    | ");
    } else {
        let _ = write!(out, " {:4} ", function.lines[offset]);
    }

    let Some(op) = Op::from_byte(function.code[offset]) else {
        let _ = write!(out, "unknown opcode {}", function.code[offset]);
        return (out, offset + 1);
    };

    match op.operand() {
        Operand::None => {
            let _ = write!(out, "{:<16}", op.name());
            (out, offset + 1)
        }
        Operand::Byte => {
            let operand = function.code[offset + 1];
            let _ = write!(out, "{:<16} {:4}", op.name(), operand);
            if matches!(
                op,
                Op::Constant | Op::DefineGlobal | Op::LoadGlobal | Op::StoreGlobal
            ) {
                let constant = &function.constants[operand as usize];
                let short: String = constant.to_string().chars().take(16).collect();
                let _ = write!(out, " '{}'", short);
            }
            (out, offset + 2)
        }
        Operand::Short => {
            let jump =
                u16::from_be_bytes([function.code[offset + 1], function.code[offset + 2]]) as usize;
            let target = if op == Op::JumpBack {
                offset + 3 - jump
            } else {
                offset + 3 + jump
            };
            let _ = write!(out, "{:<16} {:4} >>> {:04}", op.name(), offset, target);
            (out, offset + 3)
        }
    }
}
