//! The portable strategy: architecture-neutral LLVM IR. Every literal
//! becomes a named private constant, variables become `alloca`s, and all
//! runtime calls are symbolic. The operator policy is the shared lowering's;
//! this strategy does not get its own dispatch rule.

use std::{path::Path, process::Command};

use indoc::indoc;

use crate::backend::{
    lir::{Instruction, Program, Type, ValueId},
    runtime,
    storage::{Location, StorageMode},
    targets::CodeGenerator,
};

pub struct CodeGeneratorLlvmIr;

impl CodeGenerator for CodeGeneratorLlvmIr {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::StackSlots
    }

    fn artifact_extension(&self) -> &'static str {
        "ll"
    }

    fn translate(&self, program: &Program) -> String {
        let mut builder = IrBuilder::default();

        builder.raw(indoc! {r#"
            ; ModuleID = 'vibe_program'
            target datalayout = "e-m:e-i8:8:32-i16:16:32-i64:64-i128:128-n32:64-S128"
            target triple = "aarch64-unknown-linux-gnu"
        "#});

        for constant in &program.strings {
            let size = constant.text.len() + 1;
            builder.raw(format!(
                "@.str.{} = private unnamed_addr constant [{size} x i8] c\"{}\", align 1",
                constant.id.index(),
                format_llvm_string(&constant.text)
            ));
        }

        builder.blank();
        builder.raw("define i32 @main() {");
        builder.raw("entry:");

        for (name, location) in &program.variables {
            let Location::Slot(index) = location else {
                unreachable!("portable strategy allocates stack slots only");
            };

            builder.line(format!("%var_{index} = alloca i8* ; {name}"));
        }

        for value in &program.values {
            builder.line(format!(
                "%t{} = alloca {}",
                value.id.index(),
                ir_type(value.ty)
            ));
        }

        for instruction in &program.instructions {
            builder.comment(strip_ansi_escapes::strip_str(instruction.to_string()));
            builder.emit_instruction(program, instruction);
        }

        builder.line("ret i32 0");
        builder.raw("}");
        builder.blank();
        builder.raw(runtime::llvm_helpers());

        builder.into_output()
    }

    fn create_assembler_command(&self, input_file: &Path, output_file: &Path) -> Command {
        let mut cmd = Command::new("llc");
        cmd.args(["-march=aarch64", "-filetype=obj"])
            .arg("-o")
            .arg(output_file)
            .arg(input_file);
        cmd
    }

    fn create_linker_command(&self, input_file: &Path, output_file: &Path) -> Command {
        let mut cmd = Command::new("gcc");
        cmd.arg("-o").arg(output_file).arg(input_file);
        cmd
    }
}

fn ir_type(ty: Type) -> &'static str {
    match ty {
        Type::Int => "i64",
        Type::Text => "i8*",
    }
}

#[derive(Debug, Default)]
struct IrBuilder {
    output: String,
    register_counter: u32,
}

impl IrBuilder {
    fn into_output(self) -> String {
        self.output
    }

    fn raw(&mut self, string: impl AsRef<str>) {
        self.output.push_str(string.as_ref());
        self.output.push('\n');
    }

    fn line(&mut self, string: impl AsRef<str>) {
        self.output.push_str("  ");
        self.raw(string);
    }

    fn comment(&mut self, comment: impl AsRef<str>) {
        self.line(format!("; {}", comment.as_ref()));
    }

    fn blank(&mut self) {
        self.output.push('\n');
    }

    fn fresh_register(&mut self) -> String {
        let register = format!("%r{}", self.register_counter);
        self.register_counter += 1;
        register
    }

    /// Loads a value out of its temporary into a fresh SSA register
    fn load_temp(&mut self, program: &Program, value: ValueId) -> String {
        let ty = ir_type(program.type_of(value));
        let register = self.fresh_register();

        self.line(format!(
            "{register} = load {ty}, {ty}* %t{}",
            value.index()
        ));

        register
    }

    /// Stores an SSA register into a value's temporary
    fn store_temp(&mut self, program: &Program, value: ValueId, register: &str) {
        let ty = ir_type(program.type_of(value));

        self.line(format!("store {ty} {register}, {ty}* %t{}", value.index()));
    }

    fn emit_instruction(&mut self, program: &Program, instruction: &Instruction) {
        match *instruction {
            Instruction::LoadInt { destination, value } => {
                self.line(format!("store i64 {value}, i64* %t{}", destination.index()));
            }
            Instruction::LoadString {
                destination,
                string,
            } => {
                let size = program.strings[string.index()].text.len() + 1;
                let register = self.fresh_register();

                self.line(format!(
                    "{register} = getelementptr [{size} x i8], [{size} x i8]* @.str.{}, i64 0, i64 0",
                    string.index()
                ));
                self.store_temp(program, destination, &register);
            }
            Instruction::LoadVar {
                destination,
                location,
            } => {
                let Location::Slot(index) = location else {
                    unreachable!("portable strategy allocates stack slots only");
                };
                let register = self.fresh_register();

                self.line(format!("{register} = load i8*, i8** %var_{index}"));
                self.store_temp(program, destination, &register);
            }
            Instruction::StoreVar { location, source } => {
                let Location::Slot(index) = location else {
                    unreachable!("portable strategy allocates stack slots only");
                };
                let register = self.load_temp(program, source);

                self.line(format!("store i8* {register}, i8** %var_{index}"));
            }
            Instruction::AddInt {
                destination,
                lhs,
                rhs,
            } => {
                let lhs = self.load_temp(program, lhs);
                let rhs = self.load_temp(program, rhs);
                let result = self.fresh_register();

                self.line(format!("{result} = add i64 {lhs}, {rhs}"));
                self.store_temp(program, destination, &result);
            }
            Instruction::IntToText {
                destination,
                operand,
            } => {
                let operand = self.load_temp(program, operand);
                let result = self.fresh_register();

                self.line(format!(
                    "{result} = call i8* @{}(i64 {operand})",
                    runtime::INT_TO_TEXT
                ));
                self.store_temp(program, destination, &result);
            }
            Instruction::Concat {
                destination,
                lhs,
                rhs,
            } => {
                let lhs = self.load_temp(program, lhs);
                let rhs = self.load_temp(program, rhs);
                let result = self.fresh_register();

                self.line(format!(
                    "{result} = call i8* @{}(i8* {lhs}, i8* {rhs})",
                    runtime::CONCAT
                ));
                self.store_temp(program, destination, &result);
            }
            Instruction::Print { operand } => {
                let operand = self.load_temp(program, operand);

                self.line(format!(
                    "call void @{}(i8* {operand})",
                    runtime::PRINT
                ));
            }
        }
    }
}

/// Renders text as the body of an LLVM `c"..."` constant, including the
/// trailing terminator byte.
fn format_llvm_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 3);

    for b in text.bytes() {
        match b {
            b'"' | b'\\' => out.push_str(&format!("\\{b:02X}")),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!("\\{b:02X}")),
        }
    }

    out.push_str("\\00");
    out
}
