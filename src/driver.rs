//! Turns a textual artifact into an executable by invoking the strategy's
//! external assembler and linker. Tool failures are reported with the tool
//! name and exit status rather than aborting the process.

use std::{
    io,
    path::{Path, PathBuf},
    process::Command,
};

use thiserror::Error;

use crate::backend::{Backend, targets};

#[derive(Debug, Default)]
pub struct BuildOptions {
    /// Place intermediates next to the output instead of a temporary
    /// directory that is removed afterwards
    pub keep_temp: bool,
}

#[derive(Debug, Error)]
pub enum ExternalToolFailure {
    #[error("failed to launch '{tool}': {source}")]
    Launch {
        tool: String,
        #[source]
        source: io::Error,
    },
    #[error("'{tool}' exited with status code {code}")]
    Exited { tool: String, code: i32 },
    #[error("'{tool}' was terminated by a signal")]
    Terminated { tool: String },
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Assembles and links an already-rendered artifact into `output_file`.
pub fn assemble_and_link(
    backend: Backend,
    artifact: &str,
    output_file: &Path,
    options: &BuildOptions,
) -> Result<(), ExternalToolFailure> {
    let target = targets::select(backend);

    // Intermediates either live beside the output or in a directory that
    // cleans itself up when dropped.
    let temp_dir;
    let intermediate_dir: &Path = if options.keep_temp {
        output_file.parent().unwrap_or(Path::new("."))
    } else {
        temp_dir = mktemp::Temp::new_dir().map_err(|source| ExternalToolFailure::Io {
            path: PathBuf::from("<temporary directory>"),
            source,
        })?;
        temp_dir.as_ref()
    };

    let stem = output_file
        .file_stem()
        .map(|stem| stem.to_os_string())
        .unwrap_or_else(|| "out".into());

    let artifact_file = intermediate_dir
        .join(&stem)
        .with_extension(target.artifact_extension());
    let object_file = intermediate_dir.join(&stem).with_extension("o");

    std::fs::write(&artifact_file, artifact).map_err(|source| ExternalToolFailure::Io {
        path: artifact_file.clone(),
        source,
    })?;

    run_tool(target.create_assembler_command(&artifact_file, &object_file))?;
    run_tool(target.create_linker_command(&object_file, output_file))?;

    Ok(())
}

fn run_tool(mut command: Command) -> Result<(), ExternalToolFailure> {
    let tool = command.get_program().to_string_lossy().into_owned();

    let status = command
        .status()
        .map_err(|source| ExternalToolFailure::Launch {
            tool: tool.clone(),
            source,
        })?;

    if status.success() {
        return Ok(());
    }

    match status.code() {
        Some(code) => Err(ExternalToolFailure::Exited { tool, code }),
        None => Err(ExternalToolFailure::Terminated { tool }),
    }
}
