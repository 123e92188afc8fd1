//! End-to-end artifact checks that exercise every output strategy through
//! the same entry point the CLI uses.

use crate::{
    backend::{self, Backend, CodegenError},
    frontend::{SourceFile, SourceFileOrigin, ast::Program, parser::Parser},
};

const ALL_BACKENDS: [Backend; 3] = [Backend::Direct, Backend::Explicit, Backend::Portable];

fn parse(contents: &str) -> Program {
    let source = SourceFile {
        contents: contents.to_owned(),
        origin: SourceFileOrigin::Memory,
    };

    Parser::parse_program(&source).unwrap()
}

fn compile(backend: Backend, contents: &str) -> String {
    backend::compile_to_artifact(backend, &parse(contents)).unwrap()
}

#[test]
fn compilation_is_deterministic() {
    let contents = "greeting ➡️ \"hi \"\nholla greeting + 1 + 2";

    for backend in ALL_BACKENDS {
        assert_eq!(
            compile(backend, contents),
            compile(backend, contents),
            "{backend} output differs between runs"
        );
    }
}

#[test]
fn numeric_addition_compiles_to_integer_adds_everywhere() {
    let direct = compile(Backend::Direct, "holla 1 + 2 + 3");
    let explicit = compile(Backend::Explicit, "holla 1 + 2 + 3");
    let portable = compile(Backend::Portable, "holla 1 + 2 + 3");

    assert!(direct.contains("add x0, x0, x1"));
    assert!(explicit.contains("add x0, x0, x1"));
    assert!(portable[..portable.find("define void @print_text").unwrap()].contains("add i64"));

    // numbers only reach text form at the print boundary
    for artifact in [&direct, &explicit] {
        assert_eq!(artifact.matches("bl int_to_text").count(), 1);
        assert!(!artifact.contains("bl concat_text"));
    }
    assert!(!portable.contains("call i8* @concat_text"));
}

#[test]
fn variable_operands_compile_to_concatenation_everywhere() {
    let contents = "x ➡️ 1\nholla x + 2";

    for backend in [Backend::Direct, Backend::Explicit] {
        let artifact = compile(backend, contents);

        assert!(artifact.contains("bl concat_text"), "{backend}");
        assert!(!artifact.contains("add x0, x0, x1"), "{backend}");
    }

    let portable = compile(Backend::Portable, contents);
    let main_body = &portable[..portable.find("define void @print_text").unwrap()];

    assert!(main_body.contains("call i8* @concat_text"));
    assert!(!main_body.contains("add i64"));
}

#[test]
fn undefined_variables_are_reported_by_every_backend() {
    let program = parse("holla ghost");

    for backend in ALL_BACKENDS {
        assert!(matches!(
            backend::compile_to_artifact(backend, &program),
            Err(CodegenError::UndefinedVariable { ref name }) if name == "ghost"
        ));
    }
}

#[test]
fn non_addition_operators_are_reported_by_every_backend() {
    let program = parse("holla 1 - 2");

    for backend in ALL_BACKENDS {
        assert!(matches!(
            backend::compile_to_artifact(backend, &program),
            Err(CodegenError::UnsupportedOperator { ref operator }) if operator == "-"
        ));
    }
}

#[test]
fn direct_artifact_keeps_variables_in_the_stack_frame() {
    let artifact = compile(Backend::Direct, "x ➡️ 5\nholla x");

    assert!(artifact.contains("_start:"));
    assert!(!artifact.contains("var_0"));

    // the frame reservation stays 16-byte aligned
    let reservation = artifact
        .lines()
        .find_map(|line| line.trim().strip_prefix("sub sp, sp, #"))
        .unwrap();
    assert_eq!(reservation.parse::<u64>().unwrap() % 16, 0);
}

#[test]
fn deep_frames_keep_offsets_in_the_immediate_encoding_range() {
    // enough temporaries to blow past the signed 9-bit window that negative
    // frame-pointer offsets would assemble to (ldur/stur stop at 255)
    let contents = "holla \"a\" + \"b\"\n".repeat(12);

    for backend in [Backend::Direct, Backend::Explicit] {
        let artifact = compile(backend, &contents);

        assert!(!artifact.contains("[x29, #-"), "{backend}");

        for line in artifact.lines() {
            let Some(rest) = line.split("[sp, #").nth(1) else {
                continue;
            };
            if line.trim_end().ends_with("]!") {
                // pre-indexed push, signed immediate by design
                continue;
            }

            let offset: i64 = rest.split(']').next().unwrap().parse().unwrap();
            assert!(
                (0..=32760).contains(&offset) && offset % 8 == 0,
                "{backend}: unencodable slot offset in '{line}'"
            );
        }
    }
}

#[test]
fn entry_and_runtime_abort_share_the_exit_syscall() {
    use crate::backend::runtime;

    let artifact = compile(Backend::Direct, "holla \"bye\"");

    // once in the entry epilogue, once in the runtime abort path
    assert_eq!(
        artifact
            .matches(&format!("mov x8, #{}", runtime::SYS_EXIT))
            .count(),
        2
    );
}

#[test]
fn explicit_artifact_declares_variables_as_globals_in_data_first() {
    let artifact = compile(Backend::Explicit, "x ➡️ 5\nholla x");

    assert!(artifact.contains("var_0:"));
    assert!(artifact.contains(".quad 0"));

    let data = artifact.find(".data").unwrap();
    let text = artifact.find(".text").unwrap();
    assert!(data < text);
}

#[test]
fn portable_artifact_is_self_contained_llvm_ir() {
    let artifact = compile(Backend::Portable, "holla \"hello\"");

    assert!(artifact.contains("@.str.0 = private unnamed_addr constant"));
    assert!(artifact.contains("define i32 @main()"));
    assert!(artifact.contains("define void @print_text"));
    assert!(!artifact.contains("bl "));
}

#[test]
fn each_string_literal_occurrence_gets_its_own_pool_entry() {
    let artifact = compile(Backend::Direct, "holla \"a\" + \"a\"\nholla \"a\"");

    for label in [".Lstr_0:", ".Lstr_1:", ".Lstr_2:"] {
        assert_eq!(artifact.matches(label).count(), 1);
    }
}
