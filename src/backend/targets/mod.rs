//! The pluggable output strategies. Each one renders the shared lowered form
//! into its textual artifact and knows how to drive the external toolchain
//! that turns the artifact into an executable.

use std::{path::Path, process::Command};

use crate::backend::{
    Backend,
    assemblers::aarch64::{Assembler, XRegister},
    lir::{Instruction, Program, ValueId},
    runtime,
    storage::{Location, StorageMode},
};

pub mod direct;
pub mod explicit;
pub mod portable;

pub trait CodeGenerator {
    /// Where this strategy keeps named variables
    fn storage_mode(&self) -> StorageMode;

    /// File extension of the textual artifact
    fn artifact_extension(&self) -> &'static str;

    /// Renders the lowered program. Must be a pure function of its input.
    fn translate(&self, program: &Program) -> String;

    fn create_assembler_command(&self, input_file: &Path, output_file: &Path) -> Command;

    fn create_linker_command(&self, input_file: &Path, output_file: &Path) -> Command;
}

pub fn select(backend: Backend) -> &'static dyn CodeGenerator {
    match backend {
        Backend::Direct => &direct::CodeGeneratorAArch64Direct,
        Backend::Explicit => &explicit::CodeGeneratorAArch64Explicit,
        Backend::Portable => &portable::CodeGeneratorLlvmIr,
    }
}

pub(crate) fn string_label(index: usize) -> String {
    format!(".Lstr_{index}")
}

pub(crate) fn global_label(index: u32) -> String {
    format!("var_{index}")
}

/* Shared AArch64 rendering. The two assembly strategies differ only in
 * section layout and variable storage, which is already decided by the
 * `Location`s baked into the lowered program; the per-instruction rendering
 * is identical and lives here so the strategies cannot drift apart. */

pub(crate) fn emit_entry_prologue(asm: &mut Assembler, program: &Program) {
    asm.emit("stp x29, x30, [sp, #-16]!");
    asm.emit("mov x29, sp");
    asm.emit(format!("sub sp, sp, #{}", program.frame.size_bytes()));
}

pub(crate) fn emit_entry_epilogue(asm: &mut Assembler, program: &Program) {
    asm.emit(format!("add sp, sp, #{}", program.frame.size_bytes()));
    asm.emit("ldp x29, x30, [sp], #16");
    asm.comment("exit cleanly");
    asm.emit("mov x0, #0");
    asm.emit(format!("mov x8, #{}", runtime::SYS_EXIT));
    asm.emit("svc #0");
}

/// Emits the string literal pool plus the runtime's data. Every literal is
/// emitted exactly once, in encounter order.
pub(crate) fn emit_data(asm: &mut Assembler, program: &Program) {
    use crate::backend::assemblers::aarch64::format_gas_string;

    for constant in &program.strings {
        asm.label(string_label(constant.id.index()));
        asm.emit(format!(".string {}", format_gas_string(&constant.text)));
    }

    runtime::emit_aarch64_data(asm);
}

pub(crate) fn emit_statements(asm: &mut Assembler, program: &Program) {
    for instruction in &program.instructions {
        asm.comment(strip_ansi_escapes::strip_str(instruction.to_string()));
        emit_instruction(asm, program, instruction);
    }
}

/// Every value lives in its own word-sized frame slot between instructions;
/// x0 and x1 are the scratch registers values pass through. Slots are
/// addressed relative to sp with unsigned scaled offsets, which stay
/// encodable for frames far deeper than the signed 9-bit `ldur` window that
/// negative frame-pointer offsets would use.
fn load_temp(asm: &mut Assembler, program: &Program, register: XRegister, value: ValueId) {
    asm.emit(format!(
        "ldr {register}, [sp, #{}]",
        program.frame.temp_offset(value)
    ));
}

fn store_temp(asm: &mut Assembler, program: &Program, value: ValueId) {
    asm.emit(format!(
        "str x0, [sp, #{}]",
        program.frame.temp_offset(value)
    ));
}

fn emit_instruction(asm: &mut Assembler, program: &Program, instruction: &Instruction) {
    match *instruction {
        Instruction::LoadInt { destination, value } => {
            asm.load_immediate(XRegister::X0, value);
            store_temp(asm, program, destination);
        }
        Instruction::LoadString {
            destination,
            string,
        } => {
            asm.load_label_address(XRegister::X0, string_label(string.index()));
            store_temp(asm, program, destination);
        }
        Instruction::LoadVar {
            destination,
            location,
        } => {
            match location {
                Location::Slot(slot) => {
                    asm.emit(format!(
                        "ldr x0, [sp, #{}]",
                        program.frame.variable_offset(slot)
                    ));
                }
                Location::Global(index) => {
                    asm.load_label_address(XRegister::X0, global_label(index));
                    asm.emit("ldr x0, [x0]");
                }
            }
            store_temp(asm, program, destination);
        }
        Instruction::StoreVar { location, source } => {
            load_temp(asm, program, XRegister::X0, source);
            match location {
                Location::Slot(slot) => {
                    asm.emit(format!(
                        "str x0, [sp, #{}]",
                        program.frame.variable_offset(slot)
                    ));
                }
                Location::Global(index) => {
                    asm.load_label_address(XRegister::X1, global_label(index));
                    asm.emit("str x0, [x1]");
                }
            }
        }
        Instruction::AddInt {
            destination,
            lhs,
            rhs,
        } => {
            load_temp(asm, program, XRegister::X0, lhs);
            load_temp(asm, program, XRegister::X1, rhs);
            asm.emit("add x0, x0, x1");
            store_temp(asm, program, destination);
        }
        Instruction::IntToText {
            destination,
            operand,
        } => {
            load_temp(asm, program, XRegister::X0, operand);
            asm.emit(format!("bl {}", runtime::INT_TO_TEXT));
            store_temp(asm, program, destination);
        }
        Instruction::Concat {
            destination,
            lhs,
            rhs,
        } => {
            load_temp(asm, program, XRegister::X0, lhs);
            load_temp(asm, program, XRegister::X1, rhs);
            asm.emit(format!("bl {}", runtime::CONCAT));
            store_temp(asm, program, destination);
        }
        Instruction::Print { operand } => {
            load_temp(asm, program, XRegister::X0, operand);
            asm.emit(format!("bl {}", runtime::PRINT));
        }
    }
}
