//! The backend turns a parsed statement tree into one of three textual
//! artifacts. All three strategies share a single lowering pass into a small
//! structured instruction form; only the final rendering step differs, so the
//! operator policy and the runtime helper contracts cannot drift between
//! output formats.

use thiserror::Error;

use crate::frontend::ast::Program;

pub mod assemblers;
pub mod lir;
pub mod lowering;
pub mod runtime;
pub mod storage;
pub mod targets;

/// The emitter strategy, selected once per compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Backend {
    /// AArch64 assembly with stack-based variable storage
    Direct,
    /// AArch64 assembly with full section separation and global-label
    /// variable storage
    Explicit,
    /// Architecture-neutral LLVM IR
    Portable,
}

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("unsupported operator '{operator}'")]
    UnsupportedOperator { operator: String },
}

/// Lowers the program and renders it with the selected strategy. Same input
/// and same strategy produce byte-identical output.
pub fn compile_to_artifact(backend: Backend, program: &Program) -> Result<String, CodegenError> {
    let target = targets::select(backend);
    let lowered = lowering::lower_program(program, target.storage_mode())?;

    Ok(target.translate(&lowered))
}
