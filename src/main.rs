use std::{
    io::Write,
    path::{Path, PathBuf},
    process::ExitCode,
};

use clap::{CommandFactory, Parser as ClapParser, error::ErrorKind};
use colored::Colorize;
use thiserror::Error;

use crate::{
    backend::{Backend, CodegenError, lir, lowering, targets},
    driver::{BuildOptions, ExternalToolFailure},
    frontend::{
        SourceFile, SourceFileOrigin,
        parser::{ParseError, Parser},
    },
    interpreter::{EvalError, Interpreter},
};

mod backend;
mod driver;
mod frontend;
mod interpreter;
#[cfg(test)]
mod tests;

#[derive(Debug, ClapParser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Program to compile (omit to start the interactive REPL)
    source_file: Option<PathBuf>,

    /// Path of the executable to produce (defaults to the source file name
    /// without its extension)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output strategy to compile with
    #[arg(short, long, value_enum, default_value_t = Backend::Direct)]
    backend: Backend,

    /// Execute the program directly instead of compiling it
    #[arg(short, long)]
    interpret: bool,

    /// Write the textual artifact next to the output instead of linking it
    #[arg(long)]
    emit: bool,

    /// Keep intermediate files next to the output
    #[arg(long)]
    keep_temp: bool,

    /// Print the lowered program before rendering
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Error)]
enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Codegen(#[from] CodegenError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Tool(#[from] ExternalToolFailure),
    #[error("failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    let Some(source_file) = args.source_file.clone() else {
        return repl();
    };

    if !source_file.exists() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!("Source file '{}' does not exist!", source_file.display()),
            )
            .exit()
    }

    if !source_file.is_file() {
        Args::command()
            .error(
                ErrorKind::InvalidValue,
                format!("Input path '{}' is not a file!", source_file.display()),
            )
            .exit()
    }

    match run(&args, &source_file) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{} {error}", "error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, source_file: &Path) -> Result<(), CompileError> {
    let contents = std::fs::read_to_string(source_file).map_err(|source| CompileError::Io {
        path: source_file.to_path_buf(),
        source,
    })?;

    let source = SourceFile {
        contents,
        origin: SourceFileOrigin::File(source_file.to_path_buf()),
    };

    let program = Parser::parse_program(&source)?;

    if args.interpret {
        for line in Interpreter::new().execute(&program)? {
            println!("{line}");
        }

        return Ok(());
    }

    let target = targets::select(args.backend);
    let lowered = lowering::lower_program(&program, target.storage_mode())?;

    if args.verbose {
        lir::pretty_print(&lowered);
    }

    let artifact = target.translate(&lowered);

    let output_file = args
        .output
        .clone()
        .unwrap_or_else(|| source_file.with_extension(""));

    if args.emit {
        let artifact_file = output_file.with_extension(target.artifact_extension());

        return std::fs::write(&artifact_file, artifact).map_err(|source| CompileError::Io {
            path: artifact_file,
            source,
        });
    }

    let options = BuildOptions {
        keep_temp: args.keep_temp,
    };

    driver::assemble_and_link(args.backend, &artifact, &output_file, &options)?;

    Ok(())
}

/// Line-at-a-time interactive interpretation. Variables persist until the
/// session ends; errors report and keep the session alive.
fn repl() -> ExitCode {
    println!("Vibe Language Interpreter (REPL)");
    println!("Type 'exit()' to exit");

    let mut interpreter = Interpreter::new();
    let stdin = std::io::stdin();

    loop {
        print!(">>> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }

        let line = line.trim();
        if line == "exit()" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        let source = SourceFile {
            contents: line.to_owned(),
            origin: SourceFileOrigin::Memory,
        };

        let result = Parser::parse_program(&source)
            .map_err(CompileError::from)
            .and_then(|program| Ok(interpreter.execute(&program)?));

        match result {
            Ok(lines) => {
                for printed in lines {
                    println!("{printed}");
                }
            }
            Err(error) => eprintln!("{} {error}", "error:".red().bold()),
        }
    }

    ExitCode::SUCCESS
}
