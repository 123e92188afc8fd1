//! The explicit strategy: AArch64 assembly with full section separation.
//! Variables are zero-initialized global labels in the data section, which
//! comes first, followed by the runtime routines and the entry code.

use std::{path::Path, process::Command};

use itertools::Itertools;

use crate::backend::{
    assemblers::aarch64::Assembler,
    lir::Program,
    runtime,
    storage::{Location, StorageMode},
    targets::{self, CodeGenerator},
};

pub struct CodeGeneratorAArch64Explicit;

impl CodeGenerator for CodeGeneratorAArch64Explicit {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::GlobalLabels
    }

    fn artifact_extension(&self) -> &'static str {
        "s"
    }

    fn translate(&self, program: &Program) -> String {
        let mut asm = Assembler::new();

        asm.directive(".arch armv8-a");
        asm.directive(".global _start");
        asm.blank_line();

        asm.directive(".data");
        if !program.variables.is_empty() {
            asm.comment(format!(
                "variable storage: {}",
                program
                    .variables
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .join(", ")
            ));
        }
        for (name, location) in &program.variables {
            let Location::Global(index) = location else {
                unreachable!("explicit strategy allocates global labels only");
            };

            asm.comment(name);
            asm.label(targets::global_label(*index));
            asm.emit(".quad 0");
        }
        targets::emit_data(&mut asm, program);
        asm.blank_line();

        asm.directive(".text");
        runtime::emit_aarch64_helpers(&mut asm);
        asm.blank_line();

        asm.label("_start");
        targets::emit_entry_prologue(&mut asm, program);
        targets::emit_statements(&mut asm, program);
        targets::emit_entry_epilogue(&mut asm, program);

        asm.into_output()
    }

    fn create_assembler_command(&self, input_file: &Path, output_file: &Path) -> Command {
        let mut cmd = Command::new("as");
        cmd.arg("-o").arg(output_file).arg(input_file);
        cmd
    }

    fn create_linker_command(&self, input_file: &Path, output_file: &Path) -> Command {
        let mut cmd = Command::new("ld");
        cmd.arg("-o").arg(output_file).arg(input_file);
        cmd
    }
}
