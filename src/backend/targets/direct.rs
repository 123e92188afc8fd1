//! The direct strategy: AArch64 assembly with variables in the entry stack
//! frame and minimal section separation (all code first, one trailing data
//! section).

use std::{path::Path, process::Command};

use crate::backend::{
    assemblers::aarch64::Assembler,
    lir::Program,
    runtime,
    storage::StorageMode,
    targets::{self, CodeGenerator},
};

pub struct CodeGeneratorAArch64Direct;

impl CodeGenerator for CodeGeneratorAArch64Direct {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::StackSlots
    }

    fn artifact_extension(&self) -> &'static str {
        "s"
    }

    fn translate(&self, program: &Program) -> String {
        let mut asm = Assembler::new();

        asm.directive(".arch armv8-a");
        asm.directive(".global _start");
        asm.blank_line();

        asm.directive(".text");
        asm.label("_start");
        targets::emit_entry_prologue(&mut asm, program);
        targets::emit_statements(&mut asm, program);
        targets::emit_entry_epilogue(&mut asm, program);
        asm.blank_line();

        runtime::emit_aarch64_helpers(&mut asm);
        asm.blank_line();

        asm.directive(".data");
        targets::emit_data(&mut asm, program);

        asm.into_output()
    }

    fn create_assembler_command(&self, input_file: &Path, output_file: &Path) -> Command {
        let mut cmd = Command::new("as");
        cmd.arg("-o").arg(output_file).arg(input_file);
        cmd
    }

    fn create_linker_command(&self, input_file: &Path, output_file: &Path) -> Command {
        let mut cmd = Command::new("gcc");
        cmd.args(["-nostdlib", "-static"])
            .arg("-o")
            .arg(output_file)
            .arg(input_file);
        cmd
    }
}
