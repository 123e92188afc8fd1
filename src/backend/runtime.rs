//! Generation of the runtime support routines that emitted programs call:
//! printing, concatenation, and numeric-to-string conversion. The routines
//! are emitted once per compiled program and referenced by call sites.
//!
//! Two renderings of the same contract exist. The assembly rendering is
//! shared verbatim by both assembly strategies; it sequences raw syscalls
//! (`write` for output, anonymous `mmap` for allocation, `exit` on failure)
//! and assumes no hosted runtime at all. The portable rendering expresses the
//! same routines as LLVM IR over symbolic libc calls, since an
//! architecture-neutral artifact cannot sequence syscalls itself.
//!
//! Allocations are leaked by design: emitted programs are one-shot batch
//! processes and carry no allocator beyond the mapping primitive.

use indoc::indoc;

use crate::backend::assemblers::aarch64::{Assembler, XRegister};

/// Label of the print routine: takes a text pointer, writes the bytes up to
/// the terminating zero plus one newline to stdout.
pub const PRINT: &str = "print_text";

/// Label of the concatenation routine: takes two text pointers, returns a
/// freshly allocated zero-terminated copy of both, in order.
pub const CONCAT: &str = "concat_text";

/// Label of the numeric-to-string routine: takes a non-negative integer,
/// returns a pointer to its decimal text form in a fresh buffer.
pub const INT_TO_TEXT: &str = "int_to_text";

/// Data label holding the single newline byte the print routine writes.
pub const NEWLINE: &str = "newline_text";

/* AArch64 Linux syscall numbers. `exit` is public because the entry
 * epilogue sequences it too. */
const SYS_WRITE: u32 = 64;
pub const SYS_EXIT: u32 = 93;
const SYS_MMAP: u32 = 222;

/// PROT_READ | PROT_WRITE
const PROT_READ_WRITE: u32 = 3;
/// MAP_PRIVATE | MAP_ANONYMOUS
const MAP_PRIVATE_ANONYMOUS: u32 = 0x22;

/// Size of the conversion buffer: 20 digits cover the widest 64-bit value,
/// plus the terminator, rounded up to a full word multiple.
const CONVERSION_BUFFER_SIZE: u32 = 32;

/// Emits the data the assembly helpers reference. Must land in the emitting
/// strategy's read-only data section.
pub fn emit_aarch64_data(asm: &mut Assembler) {
    asm.label(NEWLINE);
    asm.emit(".string \"\\n\"");
}

/// Emits all three helper routines plus the shared abort path.
pub fn emit_aarch64_helpers(asm: &mut Assembler) {
    emit_print(asm);
    asm.blank_line();
    emit_concat(asm);
    asm.blank_line();
    emit_int_to_text(asm);
    asm.blank_line();
    emit_runtime_fail(asm);
}

/// A raw mmap of `length` bytes held in x1. Leaves the buffer address in x0
/// and aborts on failure. Anonymous mappings are zero-initialized by the
/// kernel.
fn emit_anonymous_mmap(asm: &mut Assembler) {
    asm.emit(format!("mov {}, #0", XRegister::X0));
    asm.emit(format!("mov {}, #{PROT_READ_WRITE}", XRegister::X2));
    asm.emit(format!("mov {}, #{MAP_PRIVATE_ANONYMOUS:#x}", XRegister::X3));
    asm.emit(format!("mov {}, #-1", XRegister::X4));
    asm.emit(format!("mov {}, #0", XRegister::X5));
    asm.emit(format!("mov {}, #{SYS_MMAP}", XRegister::X8));
    asm.emit("svc #0");
    // a failed mapping comes back as a negative errno
    asm.emit("tbnz x0, #63, .Lruntime_fail");
}

fn emit_print(asm: &mut Assembler) {
    asm.label(PRINT);
    asm.emit("stp x29, x30, [sp, #-16]!");
    asm.emit("mov x29, sp");

    // scan for the terminating zero to find the byte length
    let scratch = XRegister::X3.as_32_bit();
    asm.emit("mov x1, x0");
    asm.emit("mov x2, #0");
    asm.label(".Lprint_scan");
    asm.emit(format!("ldrb {scratch}, [x1, x2]"));
    asm.emit(format!("cbz {scratch}, .Lprint_write"));
    asm.emit("add x2, x2, #1");
    asm.emit("b .Lprint_scan");

    asm.label(".Lprint_write");
    asm.emit("mov x0, #1");
    asm.emit(format!("mov x8, #{SYS_WRITE}"));
    asm.emit("svc #0");
    asm.emit("tbnz x0, #63, .Lruntime_fail");

    // exactly one trailing newline byte
    asm.load_label_address(XRegister::X1, NEWLINE);
    asm.emit("mov x0, #1");
    asm.emit("mov x2, #1");
    asm.emit(format!("mov x8, #{SYS_WRITE}"));
    asm.emit("svc #0");
    asm.emit("tbnz x0, #63, .Lruntime_fail");

    asm.emit("ldp x29, x30, [sp], #16");
    asm.emit("ret");
}

fn emit_concat(asm: &mut Assembler) {
    asm.label(CONCAT);
    asm.emit("stp x29, x30, [sp, #-48]!");
    asm.emit("mov x29, sp");
    asm.emit("stp x19, x20, [sp, #16]");
    asm.emit("stp x21, x22, [sp, #32]");

    asm.emit("mov x19, x0");
    asm.emit("mov x20, x1");

    // independent length scans of both operands
    asm.emit("mov x21, #0");
    asm.label(".Lconcat_len_a");
    asm.emit("ldrb w3, [x19, x21]");
    asm.emit("cbz w3, .Lconcat_len_b_start");
    asm.emit("add x21, x21, #1");
    asm.emit("b .Lconcat_len_a");

    asm.label(".Lconcat_len_b_start");
    asm.emit("mov x22, #0");
    asm.label(".Lconcat_len_b");
    asm.emit("ldrb w3, [x20, x22]");
    asm.emit("cbz w3, .Lconcat_alloc");
    asm.emit("add x22, x22, #1");
    asm.emit("b .Lconcat_len_b");

    // len(a) + len(b) + 1 bytes, zero-initialized
    asm.label(".Lconcat_alloc");
    asm.emit("add x1, x21, x22");
    asm.emit("add x1, x1, #1");
    emit_anonymous_mmap(asm);
    asm.emit("mov x9, x0");
    asm.emit("mov x4, x0");

    // copy a, then b, byte by byte
    asm.emit("mov x1, x19");
    asm.emit("mov x2, x21");
    asm.label(".Lconcat_copy_a");
    asm.emit("cbz x2, .Lconcat_copy_b_start");
    asm.emit("ldrb w3, [x1], #1");
    asm.emit("strb w3, [x4], #1");
    asm.emit("sub x2, x2, #1");
    asm.emit("b .Lconcat_copy_a");

    asm.label(".Lconcat_copy_b_start");
    asm.emit("mov x1, x20");
    asm.emit("mov x2, x22");
    asm.label(".Lconcat_copy_b");
    asm.emit("cbz x2, .Lconcat_terminate");
    asm.emit("ldrb w3, [x1], #1");
    asm.emit("strb w3, [x4], #1");
    asm.emit("sub x2, x2, #1");
    asm.emit("b .Lconcat_copy_b");

    asm.label(".Lconcat_terminate");
    asm.emit("strb wzr, [x4]");
    asm.emit("mov x0, x9");

    asm.emit("ldp x21, x22, [sp, #32]");
    asm.emit("ldp x19, x20, [sp, #16]");
    asm.emit("ldp x29, x30, [sp], #48");
    asm.emit("ret");
}

fn emit_int_to_text(asm: &mut Assembler) {
    asm.label(INT_TO_TEXT);
    asm.emit("stp x29, x30, [sp, #-32]!");
    asm.emit("mov x29, sp");
    asm.emit("stp x19, x20, [sp, #16]");

    // negative input has no defined text form
    asm.emit("tbnz x0, #63, .Lruntime_fail");
    asm.emit("mov x19, x0");

    asm.emit(format!("mov x1, #{CONVERSION_BUFFER_SIZE}"));
    emit_anonymous_mmap(asm);

    // the mapping is zeroed, so the last byte already terminates; digits are
    // produced least-significant-first walking down from just above it
    asm.emit(format!("add x20, x0, #{}", CONVERSION_BUFFER_SIZE - 1));
    asm.emit("cbnz x19, .Lntoa_digits");

    asm.emit("sub x20, x20, #1");
    asm.emit("mov w3, #48");
    asm.emit("strb w3, [x20]");
    asm.emit("b .Lntoa_done");

    asm.label(".Lntoa_digits");
    asm.emit("mov x1, #10");
    asm.label(".Lntoa_loop");
    asm.emit("udiv x2, x19, x1");
    asm.emit("msub x3, x2, x1, x19");
    asm.emit("add w3, w3, #48");
    asm.emit("sub x20, x20, #1");
    asm.emit("strb w3, [x20]");
    asm.emit("mov x19, x2");
    asm.emit("cbnz x19, .Lntoa_loop");

    // x20 now points at the first produced digit
    asm.label(".Lntoa_done");
    asm.emit("mov x0, x20");
    asm.emit("ldp x19, x20, [sp, #16]");
    asm.emit("ldp x29, x30, [sp], #32");
    asm.emit("ret");
}

/// Shared abort path: any failed syscall or unsupported input lands here and
/// exits the generated program with status 1.
fn emit_runtime_fail(asm: &mut Assembler) {
    asm.label(".Lruntime_fail");
    asm.emit("mov x0, #1");
    asm.emit(format!("mov x8, #{SYS_EXIT}"));
    asm.emit("svc #0");
}

/// The portable rendering of the same three routines, plus the external
/// declarations they rely on. Appended after `main` in the emitted module.
pub fn llvm_helpers() -> String {
    indoc! {r#"
        define void @print_text(i8* %text) {
        entry:
          %length = call i64 @strlen(i8* %text)
          %written = call i64 @write(i32 1, i8* %text, i64 %length)
          %write_failed = icmp slt i64 %written, 0
          br i1 %write_failed, label %fail, label %newline

        newline:
          %newline_ptr = getelementptr [2 x i8], [2 x i8]* @.str.newline, i64 0, i64 0
          %newline_written = call i64 @write(i32 1, i8* %newline_ptr, i64 1)
          %newline_failed = icmp slt i64 %newline_written, 0
          br i1 %newline_failed, label %fail, label %done

        done:
          ret void

        fail:
          call void @exit(i32 1)
          unreachable
        }

        define i8* @concat_text(i8* %a, i8* %b) {
        entry:
          %length_a = call i64 @strlen(i8* %a)
          %length_b = call i64 @strlen(i8* %b)
          %total = add i64 %length_a, %length_b
          %size = add i64 %total, 1
          %buffer = call i8* @malloc(i64 %size)
          %alloc_failed = icmp eq i8* %buffer, null
          br i1 %alloc_failed, label %fail, label %copy

        copy:
          call void @llvm.memcpy.p0i8.p0i8.i64(i8* %buffer, i8* %a, i64 %length_a, i1 false)
          %tail = getelementptr i8, i8* %buffer, i64 %length_a
          call void @llvm.memcpy.p0i8.p0i8.i64(i8* %tail, i8* %b, i64 %length_b, i1 false)
          %terminator = getelementptr i8, i8* %buffer, i64 %total
          store i8 0, i8* %terminator
          ret i8* %buffer

        fail:
          call void @exit(i32 1)
          unreachable
        }

        define i8* @int_to_text(i64 %n) {
        entry:
          %negative = icmp slt i64 %n, 0
          br i1 %negative, label %fail, label %alloc

        alloc:
          %buffer = call i8* @malloc(i64 32)
          %alloc_failed = icmp eq i8* %buffer, null
          br i1 %alloc_failed, label %fail, label %terminate

        terminate:
          %terminator = getelementptr i8, i8* %buffer, i64 31
          store i8 0, i8* %terminator
          %is_zero = icmp eq i64 %n, 0
          br i1 %is_zero, label %zero, label %digits

        zero:
          %zero_position = getelementptr i8, i8* %buffer, i64 30
          store i8 48, i8* %zero_position
          ret i8* %zero_position

        digits:
          br label %loop

        loop:
          %value = phi i64 [ %n, %digits ], [ %rest, %loop ]
          %index = phi i64 [ 31, %digits ], [ %cursor_index, %loop ]
          %rest = udiv i64 %value, 10
          %digit = urem i64 %value, 10
          %ascii_wide = add i64 %digit, 48
          %ascii = trunc i64 %ascii_wide to i8
          %cursor_index = sub i64 %index, 1
          %cursor = getelementptr i8, i8* %buffer, i64 %cursor_index
          store i8 %ascii, i8* %cursor
          %finished = icmp eq i64 %rest, 0
          br i1 %finished, label %first_digit, label %loop

        first_digit:
          ret i8* %cursor

        fail:
          call void @exit(i32 1)
          unreachable
        }

        @.str.newline = private unnamed_addr constant [2 x i8] c"\0A\00", align 1

        declare i64 @strlen(i8* nocapture) nounwind
        declare i8* @malloc(i64) nounwind
        declare i64 @write(i32, i8*, i64) nounwind
        declare void @exit(i32) noreturn nounwind
        declare void @llvm.memcpy.p0i8.p0i8.i64(i8*, i8*, i64, i1)
    "#}
    .to_owned()
}
