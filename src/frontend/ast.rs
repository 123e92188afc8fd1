use crate::frontend::lexer::Span;

/// A parsed Vibe program: an ordered sequence of statements. Nodes are
/// immutable once the parser hands them over.
#[derive(Debug)]
pub struct Program {
    pub statements: Vec<Statement>,
}

#[derive(Debug)]
pub struct Statement {
    pub span: Span,
    pub kind: StatementKind,
}

#[derive(Debug)]
pub enum StatementKind {
    /// `name ➡️ expr`
    Assign {
        name: Identifier,
        value: Expression,
    },
    /// `holla expr`
    Print { value: Expression },
}

#[derive(Debug)]
pub struct Identifier {
    pub span: Span,
    pub name: String,
}

#[derive(Debug)]
pub struct Expression {
    pub span: Span,
    pub kind: ExpressionKind,
}

#[derive(Debug)]
pub enum ExpressionKind {
    /// Decimal integer literal. The lexer produces no sign, so the value is
    /// always non-negative.
    NumberLiteral(u64),
    StringLiteral(String),
    Variable(Identifier),
    Binary {
        operator: BinaryOperator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
}
