//! Disassembler: bytecode to human-readable listing.
//!
//! One line per instruction:
//!
//! ```text
//! 0012  L3   JMPZ    @0030            ; 79 1e 00 00 00
//! ```
//!
//! The `L` column is printed only when the source line changes. The listing
//! is for debugging; nothing parses it back.

use std::fmt::Write;

use phpi_common::{Function, FunctionKind, Instruction, Operand, Program};

/// Disassemble a single function body.
pub fn disassemble(function: &Function) -> String {
    let mut out = String::new();
    let mut last_line = None;

    for item in function.instructions() {
        let (at, instr) = match item {
            Ok(pair) => pair,
            Err(e) => {
                let _ = writeln!(out, "  <decode error: {e}>");
                break;
            }
        };

        let line = function.line_at(at);
        let line_col = if last_line == Some(line) {
            String::new()
        } else {
            last_line = Some(line);
            format!("L{line}")
        };

        let bytes = &function.code[at..at + instr.width()];
        let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();

        let _ = writeln!(
            out,
            "{at:04}  {line_col:<4} {:<7} {:<16} ; {}",
            instr.opcode.mnemonic(),
            operand_text(function, &instr),
            hex.join(" ")
        );
    }

    // Trailing padding from empty operands is noise.
    out.lines()
        .map(str::trim_end)
        .fold(String::new(), |mut acc, l| {
            acc.push_str(l);
            acc.push('\n');
            acc
        })
}

/// Disassemble the pseudo-main and every compiled function.
pub fn disassemble_program(program: &Program) -> String {
    let mut out = String::new();
    out.push_str(&header(&program.main));
    out.push_str(&disassemble(&program.main));

    for (_, entry) in program.functions.iter() {
        if let FunctionKind::Compiled(function) = &entry.kind {
            out.push('\n');
            out.push_str(&header(function));
            out.push_str(&disassemble(function));
        }
    }
    out
}

fn header(function: &Function) -> String {
    let params: Vec<String> = function.params.iter().map(|p| format!("${p}")).collect();
    format!(
        "function {}({}) ; {} bytes, {} strings\n",
        function.name,
        params.join(", "),
        function.len(),
        function.strings.len()
    )
}

fn operand_text(function: &Function, instr: &Instruction) -> String {
    match instr.operand {
        Operand::None => String::new(),
        Operand::Str(idx) => match function.string(idx) {
            Some(s) => format!("{s:?}"),
            None => format!("#{idx}?"),
        },
        Operand::Long(n) => n.to_string(),
        Operand::Addr(addr) => format!("@{addr:04}"),
        Operand::Argc(argc) => argc.to_string(),
        Operand::Type(ty) => format!("({})", ty.name()),
        Operand::Line(line) => line.to_string(),
    }
}
