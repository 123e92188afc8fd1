//! Direct tree-walking execution of a parsed program, used by the interpret
//! mode and the REPL. Semantics match the compiled artifacts exactly:
//! variables hold text, numeric values take their decimal form at assignment
//! and print boundaries, and `+` adds only when both operands are numeric.

use hashbrown::HashMap;
use thiserror::Error;

use crate::frontend::ast::{
    BinaryOperator, Expression, ExpressionKind, Program, Statement, StatementKind,
};

/// A computed value: a machine integer or its text form.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Value {
    Int(u64),
    Text(String),
}

impl Value {
    fn into_text(self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Text(text) => text,
        }
    }
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("unsupported operator '{operator}'")]
    UnsupportedOperator { operator: String },
}

/// The variable environment persists across `execute` calls so a REPL can
/// accumulate state line by line.
#[derive(Debug, Default)]
pub struct Interpreter {
    variables: HashMap<String, String>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes every statement in order, returning the printed lines.
    pub fn execute(&mut self, program: &Program) -> Result<Vec<String>, EvalError> {
        let mut output = Vec::new();

        for statement in &program.statements {
            self.execute_statement(statement, &mut output)?;
        }

        Ok(output)
    }

    fn execute_statement(
        &mut self,
        statement: &Statement,
        output: &mut Vec<String>,
    ) -> Result<(), EvalError> {
        match &statement.kind {
            StatementKind::Assign { name, value } => {
                let value = self.evaluate(value)?.into_text();
                self.variables.insert(name.name.clone(), value);
            }
            StatementKind::Print { value } => {
                output.push(self.evaluate(value)?.into_text());
            }
        }

        Ok(())
    }

    fn evaluate(&self, expression: &Expression) -> Result<Value, EvalError> {
        match &expression.kind {
            ExpressionKind::NumberLiteral(value) => Ok(Value::Int(*value)),
            ExpressionKind::StringLiteral(text) => Ok(Value::Text(text.clone())),
            ExpressionKind::Variable(identifier) => self
                .variables
                .get(&identifier.name)
                .cloned()
                .map(Value::Text)
                .ok_or_else(|| EvalError::UndefinedVariable {
                    name: identifier.name.clone(),
                }),
            ExpressionKind::Binary { operator, lhs, rhs } => {
                if *operator != BinaryOperator::Add {
                    return Err(EvalError::UnsupportedOperator {
                        operator: operator.to_string(),
                    });
                }

                let lhs = self.evaluate(lhs)?;
                let rhs = self.evaluate(rhs)?;

                match (lhs, rhs) {
                    // same wrap-on-overflow behavior as the emitted add
                    (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(b))),
                    (lhs, rhs) => Ok(Value::Text(lhs.into_text() + &rhs.into_text())),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{SourceFile, SourceFileOrigin, parser::Parser};

    fn run(interpreter: &mut Interpreter, contents: &str) -> Result<Vec<String>, EvalError> {
        let source = SourceFile {
            contents: contents.to_owned(),
            origin: SourceFileOrigin::Memory,
        };
        let program = Parser::parse_program(&source).expect("test program must parse");

        interpreter.execute(&program)
    }

    fn output(contents: &str) -> Vec<String> {
        run(&mut Interpreter::new(), contents).unwrap()
    }

    #[test]
    fn numeric_literals_add() {
        assert_eq!(output("holla 1 + 2 + 3"), vec!["6"]);
    }

    #[test]
    fn string_literals_concatenate() {
        assert_eq!(output("holla \"hi\" + \"there\""), vec!["hithere"]);
    }

    #[test]
    fn mixed_operands_promote_the_numeric_side() {
        assert_eq!(output("holla \"n = \" + 7"), vec!["n = 7"]);
    }

    #[test]
    fn variables_round_trip_through_text() {
        assert_eq!(output("x ➡️ 5\nholla x"), vec!["5"]);
    }

    #[test]
    fn variable_operands_concatenate_rather_than_add() {
        // variables hold text, so this prints "12" like the compiled program
        assert_eq!(output("x ➡️ 1\ny ➡️ 2\nholla x + y"), vec!["12"]);
    }

    #[test]
    fn environment_persists_across_executions() {
        let mut interpreter = Interpreter::new();

        assert!(run(&mut interpreter, "x ➡️ \"a\"").unwrap().is_empty());
        assert_eq!(run(&mut interpreter, "holla x + \"b\"").unwrap(), vec!["ab"]);
    }

    #[test]
    fn undefined_variable_is_fatal() {
        assert!(matches!(
            run(&mut Interpreter::new(), "holla ghost"),
            Err(EvalError::UndefinedVariable { name }) if name == "ghost"
        ));
    }

    #[test]
    fn operators_without_semantics_are_rejected() {
        assert!(matches!(
            run(&mut Interpreter::new(), "holla 1 - 2"),
            Err(EvalError::UnsupportedOperator { operator }) if operator == "-"
        ));
    }
}
