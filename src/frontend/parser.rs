use thiserror::Error;

use crate::frontend::{
    SourceFile,
    ast::{BinaryOperator, Expression, ExpressionKind, Identifier, Program, Statement, StatementKind},
    lexer::{Keyword, LexError, Lexer, Span, Token, TokenKind},
};

pub struct Parser<'source> {
    source: &'source SourceFile,
    tokens: Vec<Token>,
    position: usize,
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("unexpected token '{found}' on line {line} (expected {expected})")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        line: usize,
    },
    #[error("unexpected end of input (expected {expected})")]
    UnexpectedEndOfInput { expected: &'static str },
    #[error("number literal '{literal}' on line {line} does not fit in 64 bits")]
    NumberOutOfRange { literal: String, line: usize },
}

impl<'source> Parser<'source> {
    pub fn parse_program(source: &'source SourceFile) -> Result<Program, ParseError> {
        let tokens = Lexer::new(source).tokenize()?;

        let mut parser = Self {
            source,
            tokens,
            position: 0,
        };

        let mut statements = Vec::new();

        while parser.peek().is_some() {
            statements.push(parser.parse_statement()?);
        }

        Ok(Program { statements })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).copied();
        self.position += 1;
        token
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<Token, ParseError> {
        match self.advance() {
            Some(token) if token.kind == kind => Ok(token),
            Some(token) => Err(self.unexpected(token, expected)),
            None => Err(ParseError::UnexpectedEndOfInput { expected }),
        }
    }

    fn unexpected(&self, token: Token, expected: &'static str) -> ParseError {
        ParseError::UnexpectedToken {
            found: self.source.value_of_span(token.span).to_owned(),
            expected,
            line: token.line,
        }
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        let Some(&token) = self.peek() else {
            return Err(ParseError::UnexpectedEndOfInput {
                expected: "a statement",
            });
        };

        match token.kind {
            TokenKind::Keyword(Keyword::Holla) => {
                self.advance();

                let value = self.parse_expression()?;

                Ok(Statement {
                    span: Span {
                        start: token.span.start,
                        end: value.span.end,
                    },
                    kind: StatementKind::Print { value },
                })
            }
            TokenKind::Identifier => {
                self.advance();
                self.expect(TokenKind::Arrow, "'➡️'")?;

                let name = Identifier {
                    span: token.span,
                    name: self.source.value_of_span(token.span).to_owned(),
                };
                let value = self.parse_expression()?;

                Ok(Statement {
                    span: Span {
                        start: token.span.start,
                        end: value.span.end,
                    },
                    kind: StatementKind::Assign { name, value },
                })
            }
            _ => Err(self.unexpected(token, "a statement")),
        }
    }

    /// Expressions are a flat chain of left-associative binary operators over
    /// factors. There is only one precedence level in the language.
    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let mut node = self.parse_factor()?;

        while let Some(operator) = self.peek().and_then(|t| binary_operator(t.kind)) {
            self.advance();

            let rhs = self.parse_factor()?;

            node = Expression {
                span: Span {
                    start: node.span.start,
                    end: rhs.span.end,
                },
                kind: ExpressionKind::Binary {
                    operator,
                    lhs: Box::new(node),
                    rhs: Box::new(rhs),
                },
            };
        }

        Ok(node)
    }

    fn parse_factor(&mut self) -> Result<Expression, ParseError> {
        let Some(token) = self.advance() else {
            return Err(ParseError::UnexpectedEndOfInput {
                expected: "an expression",
            });
        };

        let kind = match token.kind {
            TokenKind::NumberLiteral => {
                let literal = self.source.value_of_span(token.span);

                let value =
                    literal
                        .parse::<u64>()
                        .map_err(|_| ParseError::NumberOutOfRange {
                            literal: literal.to_owned(),
                            line: token.line,
                        })?;

                ExpressionKind::NumberLiteral(value)
            }
            TokenKind::StringLiteral => {
                // the span includes the surrounding quotes
                let literal = self.source.value_of_span(token.span);

                ExpressionKind::StringLiteral(literal[1..literal.len() - 1].to_owned())
            }
            TokenKind::Identifier => ExpressionKind::Variable(Identifier {
                span: token.span,
                name: self.source.value_of_span(token.span).to_owned(),
            }),
            _ => return Err(self.unexpected(token, "an expression")),
        };

        Ok(Expression {
            span: token.span,
            kind,
        })
    }
}

fn binary_operator(kind: TokenKind) -> Option<BinaryOperator> {
    match kind {
        TokenKind::Plus => Some(BinaryOperator::Add),
        TokenKind::Minus => Some(BinaryOperator::Subtract),
        TokenKind::Asterisk => Some(BinaryOperator::Multiply),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::SourceFileOrigin;

    fn parse(contents: &str) -> Result<Program, ParseError> {
        let source = SourceFile {
            contents: contents.to_owned(),
            origin: SourceFileOrigin::Memory,
        };

        Parser::parse_program(&source)
    }

    #[test]
    fn parses_assignment_and_print() {
        let program = parse("x ➡️ \"a\"\nholla x").unwrap();

        assert_eq!(program.statements.len(), 2);

        let StatementKind::Assign { name, value } = &program.statements[0].kind else {
            panic!("expected assignment");
        };
        assert_eq!(name.name, "x");
        assert!(matches!(&value.kind, ExpressionKind::StringLiteral(s) if s == "a"));

        let StatementKind::Print { value } = &program.statements[1].kind else {
            panic!("expected print");
        };
        assert!(matches!(&value.kind, ExpressionKind::Variable(id) if id.name == "x"));
    }

    #[test]
    fn addition_is_left_associative() {
        let program = parse("holla 1 + 2 + 3").unwrap();

        let StatementKind::Print { value } = &program.statements[0].kind else {
            panic!("expected print");
        };
        let ExpressionKind::Binary { operator, lhs, rhs } = &value.kind else {
            panic!("expected binary expression");
        };

        assert_eq!(*operator, BinaryOperator::Add);
        assert!(matches!(lhs.kind, ExpressionKind::Binary { .. }));
        assert!(matches!(rhs.kind, ExpressionKind::NumberLiteral(3)));
    }

    #[test]
    fn missing_arrow_is_a_syntax_error() {
        let error = parse("x 5").unwrap_err();

        assert!(matches!(
            error,
            ParseError::UnexpectedToken {
                expected: "'➡️'",
                ..
            }
        ));
    }

    #[test]
    fn oversized_number_literal_is_rejected() {
        assert!(matches!(
            parse("holla 99999999999999999999999"),
            Err(ParseError::NumberOutOfRange { .. })
        ));
    }

    #[test]
    fn dangling_operator_is_a_syntax_error() {
        assert!(matches!(
            parse("holla 1 +"),
            Err(ParseError::UnexpectedEndOfInput {
                expected: "an expression"
            })
        ));
    }
}
