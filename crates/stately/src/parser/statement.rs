use super::{CompileError, expression};
use crate::ir::{Expression, Scope, SignalId, StateId, Statement};
use crate::lexer::{Token, TokenKind, TokenStream, bracketify};
use crate::sexp::SExp;

pub fn compile(source: &str, scope: &impl Scope) -> Result<Statement, CompileError> {
    let text = bracketify(source);
    let mut parser = StatementParser {
        stream: TokenStream::new(&text)?,
        scope,
    };
    let mut statements = Vec::new();
    while let Some(token) = parser.stream.next_token() {
        if token.kind == TokenKind::End {
            return Err(parser.stream.error_at(&token, "Unexpected end of group").into());
        }
        statements.push(parser.statement(token)?);
    }
    Ok(Statement::group(statements).simplify())
}

struct StatementParser<'a, S> {
    stream: TokenStream,
    scope: &'a S,
}

impl<S: Scope> StatementParser<'_, S> {
    fn statement(&mut self, token: Token) -> Result<Statement, CompileError> {
        let keyword = match &token.kind {
            TokenKind::Comment(text) => {
                return Ok(Statement::Group {
                    statements: Vec::new(),
                    comment: Some(text.clone()),
                });
            }
            TokenKind::Atom(keyword) => keyword.as_str(),
            other => {
                return Err(self
                    .stream
                    .error_at(&token, format!("Expected a statement, found {other}"))
                    .into());
            }
        };
        match keyword {
            "emit" => Ok(Statement::Emit {
                signal: self.signal()?,
                value: Expression::TRUE,
            }),
            "let" => {
                let signal = self.signal()?;
                let value = self.expression()?;
                Ok(Statement::Emit { signal, value })
            }
            "goto" => Ok(Statement::Goto(self.state()?)),
            "if" => self.conditional(),
            other => Err(self
                .stream
                .error_at(&token, format!("Unknown keyword {other}"))
                .into()),
        }
    }

    /// Parses the remainder of an `if` or `elif`.
    fn conditional(&mut self) -> Result<Statement, CompileError> {
        let condition = self.expression()?;
        let then_branch = self.group()?;
        let else_branch = match self.stream.peek().map(|t| &t.kind) {
            Some(TokenKind::Atom(keyword)) if keyword == "elif" => {
                self.stream.next_token();
                self.conditional()?
            }
            Some(TokenKind::Atom(keyword)) if keyword == "else" => {
                self.stream.next_token();
                self.group()?
            }
            _ => Statement::empty(),
        };
        Ok(Statement::Cond {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn group(&mut self) -> Result<Statement, CompileError> {
        self.stream.skip_comments();
        match self.stream.next_token() {
            Some(Token {
                kind: TokenKind::Begin,
                ..
            }) => {}
            Some(token) => {
                return Err(self
                    .stream
                    .error_at(&token, "Expected indented group")
                    .into());
            }
            None => return Err(self.stream.error_at_end("Expected indented group").into()),
        }
        let mut statements = Vec::new();
        loop {
            let Some(token) = self.stream.next_token() else {
                return Err(self.stream.error_at_end("Unexpected end of code").into());
            };
            if token.kind == TokenKind::End {
                return Ok(Statement::group(statements));
            }
            statements.push(self.statement(token)?);
        }
    }

    fn expression(&mut self) -> Result<Expression, CompileError> {
        let sexp = SExp::read(&mut self.stream)?.ok_or(CompileError::MissingExpression)?;
        expression::convert(&sexp, self.scope)
    }

    fn name(&mut self) -> Result<String, CompileError> {
        match self.stream.next_token() {
            Some(Token {
                kind: TokenKind::Atom(name) | TokenKind::Str(name),
                ..
            }) => Ok(name),
            Some(token) => Err(self
                .stream
                .error_at(&token, format!("Expected a name, found {}", token.kind))
                .into()),
            None => Err(self.stream.error_at_end("Expected a name").into()),
        }
    }

    fn signal(&mut self) -> Result<SignalId, CompileError> {
        let name = self.name()?;
        self.scope
            .signal_named(&name)
            .ok_or(CompileError::UnknownSignal(name))
    }

    fn state(&mut self) -> Result<StateId, CompileError> {
        let name = self.name()?;
        self.scope
            .state_named(&name)
            .ok_or(CompileError::UnknownState(name))
    }
}
