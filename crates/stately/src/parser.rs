use crate::ir::{Expression, Scope, Statement};
use crate::lexer::ParseError;
use thiserror::Error;

pub mod expression;
pub mod statement;

/// Errors local to one unit of source code. They are stored on the unit and
/// surface through the analyzer's issue list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("The empty list isn't a valid boolean expression.")]
    EmptyList,
    #[error("Bad function application.")]
    BadApplication,
    #[error("Not an operator: {0}")]
    UnknownOperator(String),
    #[error("The negation operator is unary-only.")]
    NegationArity,
    #[error("Cannot find signal {0}")]
    UnknownSignal(String),
    #[error("Cannot find state {0}")]
    UnknownState(String),
    #[error("Not a state name: {0}")]
    BadStateName(String),
    #[error("Only values 0 and 1 are allowed.")]
    BadConstant(i64),
    #[error("Missing expression")]
    MissingExpression,
    #[error("Dangling tokens")]
    DanglingTokens,
}

/// Compiles a source in the expression dialect.
pub fn compile_expression(source: &str, scope: &impl Scope) -> Result<Expression, CompileError> {
    expression::compile(source, scope)
}

/// Compiles a source in the indentation-block statement dialect.
pub fn compile_statement(source: &str, scope: &impl Scope) -> Result<Statement, CompileError> {
    statement::compile(source, scope)
}
