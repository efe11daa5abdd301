use crate::lexer::{ParseError, Token, TokenKind, TokenStream};
use itertools::Itertools;
use std::collections::BTreeMap;
use std::fmt;

/// Generic S-expression tree used by the expression dialect and both file
/// formats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SExp {
    List(Vec<SExp>),
    Atom(String),
    Int(i64),
    Str(String),
}

impl SExp {
    pub fn atom(name: impl Into<String>) -> Self {
        SExp::Atom(name.into())
    }

    pub fn string(text: impl Into<String>) -> Self {
        SExp::Str(text.into())
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(name) => Some(name),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SExp::Str(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SExp::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Atom or string content, the two ways a name may be written.
    pub fn as_name(&self) -> Option<&str> {
        self.as_atom().or_else(|| self.as_str())
    }

    /// Reads one expression. Returns `None` when the stream holds nothing
    /// but comments.
    pub fn read(stream: &mut TokenStream) -> Result<Option<SExp>, ParseError> {
        stream.skip_comments();
        match stream.next_token() {
            None => Ok(None),
            Some(token) => Self::read_from(stream, token).map(Some),
        }
    }

    fn read_from(stream: &mut TokenStream, token: Token) -> Result<SExp, ParseError> {
        match token.kind {
            TokenKind::Open => Self::read_list(stream),
            TokenKind::Close => Err(stream.error_at(&token, "Unexpected )")),
            TokenKind::Begin | TokenKind::End | TokenKind::Comment(_) => {
                Err(stream.error_at(&token, format!("Unexpected token: {}", token.kind)))
            }
            TokenKind::Atom(name) => Ok(SExp::Atom(name)),
            TokenKind::Int(value) => Ok(SExp::Int(value)),
            TokenKind::Str(text) => Ok(SExp::Str(text)),
        }
    }

    fn read_list(stream: &mut TokenStream) -> Result<SExp, ParseError> {
        let mut items = Vec::new();
        loop {
            stream.skip_comments();
            let Some(token) = stream.next_token() else {
                return Err(stream.error_at_end("Unexpected end of code"));
            };
            if token.kind == TokenKind::Close {
                return Ok(SExp::List(items));
            }
            items.push(Self::read_from(stream, token)?);
        }
    }

    /// Reads every top-level expression of `source`.
    pub fn parse_all(source: &str) -> Result<Vec<SExp>, ParseError> {
        let mut stream = TokenStream::new(source)?;
        let mut out = Vec::new();
        while let Some(sexp) = Self::read(&mut stream)? {
            out.push(sexp);
        }
        Ok(out)
    }

    /// Builds a record: a list of `("key" value)` pairs in key order.
    pub fn record(fields: BTreeMap<&str, SExp>) -> SExp {
        SExp::List(
            fields
                .into_iter()
                .map(|(key, value)| SExp::List(vec![SExp::string(key), value]))
                .collect(),
        )
    }

    /// Reads a record written by [`SExp::record`]. Returns `None` when the
    /// shape is wrong.
    pub fn to_record(&self) -> Option<BTreeMap<String, SExp>> {
        let mut fields = BTreeMap::new();
        for entry in self.as_list()? {
            match entry.as_list()? {
                [key, value] => {
                    fields.insert(key.as_str()?.to_string(), value.clone());
                }
                _ => return None,
            }
        }
        Some(fields)
    }
}

/// Quotes `text` as a string literal the tokenizer reads back verbatim.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

impl fmt::Display for SExp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExp::List(items) => write!(f, "({})", items.iter().join(" ")),
            SExp::Atom(name) => write!(f, "{name}"),
            SExp::Int(value) => write!(f, "{value}"),
            SExp::Str(text) => write!(f, "{}", quote(text)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_one(source: &str) -> Result<Option<SExp>, ParseError> {
        let mut stream = TokenStream::new(source)?;
        SExp::read(&mut stream)
    }

    #[test]
    fn test_read_nested_list() {
        let sexp = read_one("(or (and a b) \"c d\" 1)").unwrap().unwrap();
        assert_eq!(
            sexp,
            SExp::List(vec![
                SExp::atom("or"),
                SExp::List(vec![SExp::atom("and"), SExp::atom("a"), SExp::atom("b")]),
                SExp::string("c d"),
                SExp::Int(1),
            ])
        );
        assert_eq!(sexp.to_string(), "(or (and a b) \"c d\" 1)");
    }

    #[test]
    fn test_empty_input_reads_nothing() {
        assert_eq!(read_one("").unwrap(), None);
        assert_eq!(read_one("  -- only a comment").unwrap(), None);
    }

    #[test]
    fn test_top_level_close_is_error() {
        let err = read_one(") a").unwrap_err();
        assert!(err.to_string().contains("Unexpected )"), "{err}");
    }

    #[test]
    fn test_unterminated_list_is_error() {
        let err = read_one("(and a (or b").unwrap_err();
        assert!(err.to_string().contains("Unexpected end of code"), "{err}");
    }

    #[test]
    fn test_printer_escapes_strings() {
        let sexp = SExp::string("say \"hi\"\\\n");
        assert_eq!(sexp.to_string(), r#""say \"hi\"\\\n""#);
        assert_eq!(read_one(&sexp.to_string()).unwrap(), Some(sexp));
    }

    #[test]
    fn test_record_is_sorted_by_key() {
        let mut fields = BTreeMap::new();
        fields.insert("name", SExp::string("m"));
        fields.insert("code", SExp::string(""));
        let record = SExp::record(fields);
        assert_eq!(record.to_string(), r#"(("code" "") ("name" "m"))"#);
        let back = record.to_record().unwrap();
        assert_eq!(back.get("name"), Some(&SExp::string("m")));
    }

    #[test]
    fn test_bad_record_shapes() {
        assert!(SExp::atom("x").to_record().is_none());
        assert!(SExp::parse_all("((a 1))").unwrap()[0].to_record().is_none());
        assert!(SExp::parse_all("((\"a\" 1 2))").unwrap()[0].to_record().is_none());
    }
}
