//! Single-pass lowering from the statement tree into the structured form.
//!
//! This is where the `+` policy lives, shared by every backend: an addition
//! of two numeric values is integer addition; every other combination is
//! string concatenation, with numeric operands first promoted to their
//! decimal text form. A variable reference is an unknown and is assumed to
//! hold a text pointer — which lowering itself guarantees for well-typed
//! programs by promoting numeric values at assignment and print boundaries,
//! so variable storage only ever holds text.

use crate::{
    backend::{
        CodegenError,
        lir::{FrameLayout, Instruction, Program, StringConstant, StringId, Type, Value, ValueId},
        storage::{StorageAllocator, StorageMode},
    },
    frontend::ast::{self, BinaryOperator, ExpressionKind, StatementKind},
};

struct LoweringContext {
    allocator: StorageAllocator,
    mode: StorageMode,
    strings: Vec<StringConstant>,
    values: Vec<Value>,
    instructions: Vec<Instruction>,
}

pub fn lower_program(program: &ast::Program, mode: StorageMode) -> Result<Program, CodegenError> {
    let mut ctx = LoweringContext {
        allocator: StorageAllocator::new(mode),
        mode,
        strings: Vec::new(),
        values: Vec::new(),
        instructions: Vec::new(),
    };

    for statement in &program.statements {
        ctx.lower_statement(statement)?;
    }

    Ok(ctx.into_output())
}

impl LoweringContext {
    fn create_value(&mut self, ty: Type) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(Value { id, ty });
        id
    }

    fn add_string_constant(&mut self, text: &str) -> StringId {
        let id = StringId(self.strings.len() as u32);
        self.strings.push(StringConstant {
            id,
            text: text.to_owned(),
        });
        id
    }

    fn type_of(&self, value: ValueId) -> Type {
        self.values[value.index()].ty
    }

    /// Promotes a numeric value to its decimal text form. Text values pass
    /// through untouched.
    fn coerce_to_text(&mut self, value: ValueId) -> ValueId {
        match self.type_of(value) {
            Type::Text => value,
            Type::Int => {
                let destination = self.create_value(Type::Text);
                self.instructions.push(Instruction::IntToText {
                    destination,
                    operand: value,
                });
                destination
            }
        }
    }

    fn lower_statement(&mut self, statement: &ast::Statement) -> Result<(), CodegenError> {
        match &statement.kind {
            StatementKind::Assign { name, value } => {
                let value = self.lower_expression(value)?;
                let source = self.coerce_to_text(value);
                let location = self.allocator.allocate(&name.name);

                self.instructions
                    .push(Instruction::StoreVar { location, source });
            }
            StatementKind::Print { value } => {
                let value = self.lower_expression(value)?;
                let operand = self.coerce_to_text(value);

                self.instructions.push(Instruction::Print { operand });
            }
        }

        Ok(())
    }

    fn lower_expression(&mut self, expression: &ast::Expression) -> Result<ValueId, CodegenError> {
        match &expression.kind {
            ExpressionKind::NumberLiteral(value) => {
                let destination = self.create_value(Type::Int);
                self.instructions.push(Instruction::LoadInt {
                    destination,
                    value: *value,
                });
                Ok(destination)
            }
            ExpressionKind::StringLiteral(text) => {
                let string = self.add_string_constant(text);
                let destination = self.create_value(Type::Text);
                self.instructions.push(Instruction::LoadString {
                    destination,
                    string,
                });
                Ok(destination)
            }
            ExpressionKind::Variable(identifier) => {
                let location = self.allocator.lookup(&identifier.name)?;
                let destination = self.create_value(Type::Text);
                self.instructions.push(Instruction::LoadVar {
                    destination,
                    location,
                });
                Ok(destination)
            }
            ExpressionKind::Binary { operator, lhs, rhs } => {
                if *operator != BinaryOperator::Add {
                    return Err(CodegenError::UnsupportedOperator {
                        operator: operator.to_string(),
                    });
                }

                let lhs = self.lower_expression(lhs)?;
                let rhs = self.lower_expression(rhs)?;

                if self.type_of(lhs) == Type::Int && self.type_of(rhs) == Type::Int {
                    let destination = self.create_value(Type::Int);
                    self.instructions.push(Instruction::AddInt {
                        destination,
                        lhs,
                        rhs,
                    });
                    Ok(destination)
                } else {
                    let lhs = self.coerce_to_text(lhs);
                    let rhs = self.coerce_to_text(rhs);
                    let destination = self.create_value(Type::Text);
                    self.instructions.push(Instruction::Concat {
                        destination,
                        lhs,
                        rhs,
                    });
                    Ok(destination)
                }
            }
        }
    }

    fn into_output(self) -> Program {
        let variable_slots = match self.mode {
            StorageMode::StackSlots => self.allocator.variable_count(),
            StorageMode::GlobalLabels => 0,
        };

        let variables = self
            .allocator
            .variables()
            .map(|(name, location)| (name.to_owned(), location))
            .collect();

        Program {
            strings: self.strings,
            frame: FrameLayout {
                variable_slots,
                temp_slots: self.values.len() as u32,
            },
            values: self.values,
            instructions: self.instructions,
            variables,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{SourceFile, SourceFileOrigin, parser::Parser};

    fn lower(contents: &str, mode: StorageMode) -> Result<Program, CodegenError> {
        let source = SourceFile {
            contents: contents.to_owned(),
            origin: SourceFileOrigin::Memory,
        };
        let program = Parser::parse_program(&source).expect("test program must parse");

        lower_program(&program, mode)
    }

    fn opcode(instruction: &Instruction) -> &'static str {
        match instruction {
            Instruction::LoadInt { .. } => "load_int",
            Instruction::LoadString { .. } => "load_string",
            Instruction::LoadVar { .. } => "load_var",
            Instruction::StoreVar { .. } => "store_var",
            Instruction::AddInt { .. } => "add_int",
            Instruction::IntToText { .. } => "int_to_text",
            Instruction::Concat { .. } => "concat",
            Instruction::Print { .. } => "print",
        }
    }

    fn opcodes(program: &Program) -> Vec<&'static str> {
        program.instructions.iter().map(opcode).collect()
    }

    #[test]
    fn numeric_addition_stays_numeric_until_printed() {
        let program = lower("holla 1 + 2", StorageMode::StackSlots).unwrap();

        assert_eq!(
            opcodes(&program),
            vec!["load_int", "load_int", "add_int", "int_to_text", "print"]
        );
    }

    #[test]
    fn nested_numeric_additions_compute_the_sum() {
        let program = lower("holla 1 + 2 + 3", StorageMode::StackSlots).unwrap();

        // both + nodes lower to integer addition, not concatenation
        assert_eq!(
            opcodes(&program),
            vec![
                "load_int",
                "load_int",
                "add_int",
                "load_int",
                "add_int",
                "int_to_text",
                "print"
            ]
        );
    }

    #[test]
    fn string_operands_concatenate() {
        let program = lower("holla \"hi\" + \"there\"", StorageMode::StackSlots).unwrap();

        assert_eq!(
            opcodes(&program),
            vec!["load_string", "load_string", "concat", "print"]
        );
    }

    #[test]
    fn mixed_operands_promote_the_numeric_side() {
        let program = lower("holla \"n = \" + 7", StorageMode::StackSlots).unwrap();

        assert_eq!(
            opcodes(&program),
            vec!["load_string", "load_int", "int_to_text", "concat", "print"]
        );
    }

    #[test]
    fn unknown_operands_concatenate_rather_than_add() {
        // the pinned ambiguous case: x + y over number-valued variables is
        // concatenation, printing "12" and not "3"
        let program =
            lower("x ➡️ 1\ny ➡️ 2\nholla x + y", StorageMode::StackSlots).unwrap();

        assert!(opcodes(&program).contains(&"concat"));
        assert_eq!(
            opcodes(&program)
                .iter()
                .filter(|&&op| op == "add_int")
                .count(),
            0
        );
    }

    #[test]
    fn numeric_assignment_promotes_before_storing() {
        let program = lower("x ➡️ 5", StorageMode::StackSlots).unwrap();

        assert_eq!(opcodes(&program), vec!["load_int", "int_to_text", "store_var"]);
    }

    #[test]
    fn reassignment_reuses_the_variable_slot() {
        let program = lower("x ➡️ \"a\"\nx ➡️ \"b\"", StorageMode::StackSlots).unwrap();

        let stores: Vec<_> = program
            .instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::StoreVar { location, .. } => Some(*location),
                _ => None,
            })
            .collect();

        assert_eq!(stores.len(), 2);
        assert_eq!(stores[0], stores[1]);
        assert_eq!(program.frame.variable_slots, 1);
    }

    #[test]
    fn string_pool_keeps_encounter_order_and_duplicates() {
        let program =
            lower("holla \"a\" + \"b\"\nholla \"a\"", StorageMode::StackSlots).unwrap();

        let texts: Vec<_> = program.strings.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b", "a"]);
    }

    #[test]
    fn undefined_variable_is_fatal() {
        assert!(matches!(
            lower("holla ghost", StorageMode::StackSlots),
            Err(CodegenError::UndefinedVariable { name }) if name == "ghost"
        ));
    }

    #[test]
    fn operators_without_semantics_are_rejected() {
        assert!(matches!(
            lower("holla 1 - 2", StorageMode::StackSlots),
            Err(CodegenError::UnsupportedOperator { operator }) if operator == "-"
        ));
    }

    #[test]
    fn global_mode_assigns_global_locations() {
        let program = lower("x ➡️ \"a\"", StorageMode::GlobalLabels).unwrap();

        assert_eq!(program.variables.len(), 1);
        assert!(matches!(
            program.variables[0],
            (ref name, crate::backend::storage::Location::Global(0)) if name == "x"
        ));
        assert_eq!(program.frame.variable_slots, 0);
    }
}
