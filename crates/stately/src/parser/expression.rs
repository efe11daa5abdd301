use super::CompileError;
use crate::ir::{Expression, Operator, STATE_IS, Scope};
use crate::lexer::TokenStream;
use crate::sexp::SExp;
use std::collections::BTreeSet;

pub fn compile(source: &str, scope: &impl Scope) -> Result<Expression, CompileError> {
    let mut stream = TokenStream::new(source)?;
    let sexp = SExp::read(&mut stream)?.ok_or(CompileError::MissingExpression)?;
    if !stream.at_end() {
        return Err(CompileError::DanglingTokens);
    }
    convert(&sexp, scope)
}

/// Converts an S-expression tree into an [`Expression`], resolving names
/// through `scope`.
pub fn convert(sexp: &SExp, scope: &impl Scope) -> Result<Expression, CompileError> {
    match sexp {
        SExp::List(items) => {
            let Some((head, args)) = items.split_first() else {
                return Err(CompileError::EmptyList);
            };
            let Some(head) = head.as_atom() else {
                return Err(CompileError::BadApplication);
            };
            if head == STATE_IS {
                return convert_state_is(args, scope);
            }
            let op = Operator::from_name(head)
                .ok_or_else(|| CompileError::UnknownOperator(head.to_string()))?;
            if op == Operator::Not && args.len() != 1 {
                return Err(CompileError::NegationArity);
            }
            let operands = args
                .iter()
                .map(|arg| convert(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Expression::Operation(op, operands))
        }
        SExp::Atom(name) | SExp::Str(name) => scope
            .signal_named(name)
            .map(Expression::Signal)
            .ok_or_else(|| CompileError::UnknownSignal(name.clone())),
        SExp::Int(0) => Ok(Expression::FALSE),
        SExp::Int(1) => Ok(Expression::TRUE),
        SExp::Int(other) => Err(CompileError::BadConstant(*other)),
    }
}

fn convert_state_is(args: &[SExp], scope: &impl Scope) -> Result<Expression, CompileError> {
    let mut states = BTreeSet::new();
    for arg in args {
        let name = arg
            .as_name()
            .ok_or_else(|| CompileError::BadStateName(arg.to_string()))?;
        let state = scope
            .state_named(name)
            .ok_or_else(|| CompileError::UnknownState(name.to_string()))?;
        states.insert(state);
    }
    Ok(Expression::StateIs(states))
}
