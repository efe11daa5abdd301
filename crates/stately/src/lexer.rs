use std::fmt;
use thiserror::Error;

mod bracket;

pub use bracket::{TAB_STOP, bracketify};

/// Characters of source shown on each side of an error location.
const CONTEXT_RADIUS: usize = 10;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Parse error: {message} around here: {context}")]
    Located { message: String, context: String },
    #[error("Parser error: {message}")]
    General { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Open,
    Close,
    Begin,
    End,
    Atom(String),
    Int(i64),
    Str(String),
    Comment(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Open => write!(f, "("),
            TokenKind::Close => write!(f, ")"),
            TokenKind::Begin => write!(f, "{{"),
            TokenKind::End => write!(f, "}}"),
            TokenKind::Atom(name) => write!(f, "{name}"),
            TokenKind::Int(value) => write!(f, "{value}"),
            TokenKind::Str(text) => write!(f, "{text:?}"),
            TokenKind::Comment(text) => write!(f, "-- {text}"),
        }
    }
}

/// A token together with its character offset in the scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

fn context(chars: &[char], offset: usize) -> String {
    let start = offset.saturating_sub(CONTEXT_RADIUS);
    let end = chars.len().min(offset + 1 + CONTEXT_RADIUS);
    if start >= end {
        return String::new();
    }
    chars[start..end].iter().collect()
}

fn located(chars: &[char], offset: usize, message: impl Into<String>) -> ParseError {
    ParseError::Located {
        message: message.into(),
        context: context(chars, offset),
    }
}

struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
}

impl Tokenizer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> ParseError {
        located(&self.chars, offset, message)
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek() {
            let offset = self.pos;
            let kind = match c {
                c if c.is_whitespace() => {
                    self.pos += 1;
                    continue;
                }
                '(' => {
                    self.pos += 1;
                    TokenKind::Open
                }
                ')' => {
                    self.pos += 1;
                    TokenKind::Close
                }
                '{' => {
                    self.pos += 1;
                    TokenKind::Begin
                }
                '}' => {
                    self.pos += 1;
                    TokenKind::End
                }
                '"' => self.string()?,
                '-' if self.peek_at(1) == Some('-') => self.comment(),
                '-' => self.int()?,
                c if c.is_ascii_digit() => self.int()?,
                c if c.is_alphabetic() || c == '_' => self.atom(),
                c => return Err(self.error(offset, format!("Unexpected character: {c}"))),
            };
            tokens.push(Token { kind, offset });
        }
        Ok(tokens)
    }

    fn atom(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !(c.is_alphanumeric() || c == '_') {
                break;
            }
            self.pos += 1;
        }
        TokenKind::Atom(self.chars[start..self.pos].iter().collect())
    }

    fn int(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.pos += 1;
        }
        let digits = self.pos;
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            self.pos += 1;
        }
        if self.pos == digits {
            return Err(self.error(start, "Unexpected character in integer: -"));
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map(TokenKind::Int)
            .map_err(|_| self.error(start, format!("Integer out of range: {text}")))
    }

    fn string(&mut self) -> Result<TokenKind, ParseError> {
        let start = self.pos;
        self.pos += 1;
        let mut text = String::new();
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error(start, "Unexpected end of string"));
            };
            self.pos += 1;
            match c {
                '"' => return Ok(TokenKind::Str(text)),
                '\\' => {
                    let Some(escaped) = self.peek() else {
                        return Err(self.error(start, "Unexpected end of string"));
                    };
                    match escaped {
                        '\\' => text.push('\\'),
                        '"' => text.push('"'),
                        'n' => text.push('\n'),
                        other => {
                            return Err(self.error(
                                self.pos,
                                format!("Unexpected character in string escape: {other}"),
                            ));
                        }
                    }
                    self.pos += 1;
                }
                c => text.push(c),
            }
        }
    }

    fn comment(&mut self) -> TokenKind {
        self.pos += 2;
        while matches!(self.peek(), Some(' ') | Some('\t')) {
            self.pos += 1;
        }
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        TokenKind::Comment(text.trim_end().to_string())
    }
}

/// Splits `source` into tokens. Block markers are only produced for literal
/// `{`/`}` characters; run [`bracketify`] first for indentation-structured
/// text.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Tokenizer {
        chars: source.chars().collect(),
        pos: 0,
    }
    .run()
}

/// Cursor over the tokens of one source text, shared between the
/// S-expression reader and the statement parser.
#[derive(Debug, Clone)]
pub struct TokenStream {
    chars: Vec<char>,
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    pub fn new(source: &str) -> Result<Self, ParseError> {
        Ok(Self {
            chars: source.chars().collect(),
            tokens: tokenize(source)?,
            pos: 0,
        })
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub fn skip_comments(&mut self) {
        while let Some(Token {
            kind: TokenKind::Comment(_),
            ..
        }) = self.peek()
        {
            self.pos += 1;
        }
    }

    /// True when only comments remain.
    pub fn at_end(&mut self) -> bool {
        self.skip_comments();
        self.peek().is_none()
    }

    pub fn error_at(&self, token: &Token, message: impl Into<String>) -> ParseError {
        located(&self.chars, token.offset, message)
    }

    pub fn error_at_end(&self, message: impl Into<String>) -> ParseError {
        located(&self.chars, self.chars.len(), message)
    }
}
