//! The structured low-level form shared by all backend emitters. Expression
//! trees are flattened into ordered single-assignment instructions over typed
//! values; string literals live in an ordered pool. Backends choose their own
//! mapping from values to machine storage.

use colored::Colorize;

use crate::backend::storage::{Location, STACK_ALIGNMENT, WORD_SIZE, align_to};

#[derive(Debug)]
pub struct Program {
    /// One entry per string literal node, in encounter order
    pub strings: Vec<StringConstant>,
    /// One entry per computed value, indexed by `ValueId`
    pub values: Vec<Value>,
    /// Lowered statements in program order
    pub instructions: Vec<Instruction>,
    pub frame: FrameLayout,
    /// Variable names with their locations, in order of first assignment
    pub variables: Vec<(String, Location)>,
}

impl Program {
    pub fn type_of(&self, value: ValueId) -> Type {
        self.values[value.index()].ty
    }
}

#[derive(Debug)]
pub struct StringConstant {
    pub id: StringId,
    pub text: String,
}

/// Identifies an entry in the string literal pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StringId(pub u32);

impl StringId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An abstract handle to where a computed value lives: one machine word,
/// spilled to a backend-chosen temporary between instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ValueId(pub u32);

impl ValueId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Value {
    pub id: ValueId,
    pub ty: Type,
}

/// The two runtime value shapes: a word-sized integer, or a pointer to
/// zero-terminated text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Type {
    Int,
    Text,
}

#[derive(Debug, Clone, Copy)]
pub enum Instruction {
    LoadInt {
        destination: ValueId,
        value: u64,
    },
    LoadString {
        destination: ValueId,
        string: StringId,
    },
    LoadVar {
        destination: ValueId,
        location: Location,
    },
    StoreVar {
        location: Location,
        source: ValueId,
    },
    AddInt {
        destination: ValueId,
        lhs: ValueId,
        rhs: ValueId,
    },
    /// Calls the numeric-to-string runtime helper
    IntToText {
        destination: ValueId,
        operand: ValueId,
    },
    /// Calls the concatenation runtime helper
    Concat {
        destination: ValueId,
        lhs: ValueId,
        rhs: ValueId,
    },
    /// Calls the print runtime helper
    Print {
        operand: ValueId,
    },
}

/// Sizing of the generated entry frame. Variables (when stack-stored) occupy
/// the slots just above the stack pointer, one word-sized temporary slot per
/// value follows. Offsets are positive and word-scaled so every load and
/// store fits the unsigned scaled immediate form (up to #32760); negative
/// frame-pointer offsets would fall back to `ldur`/`stur` and overflow their
/// 9-bit range past 31 slots.
#[derive(Debug, Clone, Copy)]
pub struct FrameLayout {
    pub variable_slots: u32,
    pub temp_slots: u32,
}

impl FrameLayout {
    /// Total frame size, rounded up to the stack alignment, never below one
    /// alignment unit even for an empty program.
    pub fn size_bytes(&self) -> usize {
        let slots = (self.variable_slots + self.temp_slots) as usize;

        align_to(slots * WORD_SIZE, STACK_ALIGNMENT).max(STACK_ALIGNMENT)
    }

    /// Byte offset above the stack pointer of a variable slot
    pub fn variable_offset(&self, slot: u32) -> usize {
        slot as usize * WORD_SIZE
    }

    /// Byte offset above the stack pointer of a value's temporary slot
    pub fn temp_offset(&self, value: ValueId) -> usize {
        (self.variable_slots as usize + value.index()) * WORD_SIZE
    }
}

/* Pretty printing (verbose output; backends embed the same rendering as
 * comments after stripping the color codes) */

pub fn pretty_print(program: &Program) {
    for constant in &program.strings {
        println!(
            "{} {} {:?}",
            constant.id.to_string().cyan(),
            "=".white(),
            constant.text
        );
    }

    for instruction in &program.instructions {
        println!("{instruction}");
    }
}

impl core::fmt::Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format!("%{}", self.0).yellow())
    }
}

impl core::fmt::Display for StringId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "str_{}", self.0)
    }
}

impl core::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Slot(index) => write!(f, "slot[{index}]"),
            Location::Global(index) => write!(f, "var_{index}"),
        }
    }
}

impl core::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::LoadInt { destination, value } => {
                write!(
                    f,
                    "{destination} {} {}",
                    "=".white(),
                    value.to_string().purple()
                )
            }
            Instruction::LoadString {
                destination,
                string,
            } => {
                write!(
                    f,
                    "{destination} {} {}",
                    "=".white(),
                    string.to_string().cyan()
                )
            }
            Instruction::LoadVar {
                destination,
                location,
            } => {
                write!(f, "{destination} {} {location}", "=".white())
            }
            Instruction::StoreVar { location, source } => {
                write!(f, "{location} {} {source}", "=".white())
            }
            Instruction::AddInt {
                destination,
                lhs,
                rhs,
            } => {
                write!(f, "{destination} {} {lhs} {} {rhs}", "=".white(), "+".white())
            }
            Instruction::IntToText {
                destination,
                operand,
            } => {
                write!(
                    f,
                    "{destination} {} {} {operand}",
                    "=".white(),
                    "int_to_text".bright_green()
                )
            }
            Instruction::Concat {
                destination,
                lhs,
                rhs,
            } => {
                write!(
                    f,
                    "{destination} {} {} {lhs}, {rhs}",
                    "=".white(),
                    "concat".bright_green()
                )
            }
            Instruction::Print { operand } => {
                write!(f, "{} {operand}", "print".bright_green())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_has_a_sane_minimum_even_when_empty() {
        let frame = FrameLayout {
            variable_slots: 0,
            temp_slots: 0,
        };

        assert_eq!(frame.size_bytes(), 16);
    }

    #[test]
    fn frame_size_is_stack_aligned() {
        let frame = FrameLayout {
            variable_slots: 2,
            temp_slots: 3,
        };

        // 5 slots of 8 bytes round up to 48
        assert_eq!(frame.size_bytes(), 48);
        assert_eq!(frame.size_bytes() % 16, 0);
    }

    #[test]
    fn temp_slots_follow_variable_slots() {
        let frame = FrameLayout {
            variable_slots: 2,
            temp_slots: 2,
        };

        assert_eq!(frame.variable_offset(0), 0);
        assert_eq!(frame.variable_offset(1), 8);
        assert_eq!(frame.temp_offset(ValueId(0)), 16);
        assert_eq!(frame.temp_offset(ValueId(1)), 24);
    }

    #[test]
    fn offsets_stay_word_scaled_and_encodable_for_deep_frames() {
        let frame = FrameLayout {
            variable_slots: 8,
            temp_slots: 120,
        };

        let last = frame.temp_offset(ValueId(119));
        assert_eq!(last, 127 * 8);
        assert_eq!(last % 8, 0);
        // unsigned scaled ldr/str immediates reach #32760
        assert!(last <= 32760);
        assert!(frame.size_bytes() > last);
    }
}
