//! Lexer: byte stream → token stream with spans.
//!
//! External collaborator per the pipeline design: the lexer has no opinion
//! on language semantics, it only recognizes the fixed token vocabulary and
//! tracks line/column for span construction.

use std::rc::Rc;

use crate::span::Span;
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct LexError {
    pub message: String,
    pub span: Span,
}

pub struct Lexer<'a> {
    src: &'a [u8],
    file: Option<Rc<str>>,
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, file: Option<Rc<str>>) -> Self {
        Self { src: src.as_bytes(), file, pos: 0, line: 1, col: 1 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut out = Vec::new();
        loop {
            self.skip_trivia();
            let start_line = self.line;
            let start_col = self.col;
            let Some(c) = self.peek() else {
                out.push(Token::new(TokenKind::Eof, self.span(start_line, start_col)));
                break;
            };
            let kind = if c.is_ascii_alphabetic() || c == b'_' {
                self.lex_ident_or_keyword()
            } else if c.is_ascii_digit() {
                self.lex_number()?
            } else if c == b'"' || c == b'\'' {
                self.lex_string(c)?
            } else {
                self.lex_operator()?
            };
            out.push(Token::new(kind, self.span(start_line, start_col)));
        }
        Ok(out)
    }

    fn span(&self, start_line: u32, start_col: u32) -> Span {
        Span::new(self.file.clone(), start_line, start_col, self.line, self.col.saturating_sub(1).max(start_col))
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c == b' ' || c == b'\t' || c == b'\r' || c == b'\n' => {
                    self.bump();
                }
                Some(b'-') if self.peek_at(1) == Some(b'-') => {
                    while !matches!(self.peek(), Some(b'\n') | None) {
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn lex_ident_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.bump();
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        match text {
            "let" => TokenKind::Let,
            "global" => TokenKind::Global,
            "fn" => TokenKind::Fn,
            "struct" => TokenKind::Struct,
            "enum" => TokenKind::Enum,
            "if" => TokenKind::If,
            "elseif" => TokenKind::Elseif,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "return" => TokenKind::Return,
            "match" => TokenKind::Match,
            "case" => TokenKind::Case,
            "import" => TokenKind::Import,
            "export" => TokenKind::Export,
            "module" => TokenKind::Module,
            "as" => TokenKind::As,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "nil" => TokenKind::Nil,
            _ => TokenKind::Ident(text.to_string()),
        }
    }

    fn lex_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some(b'.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        text.parse::<f64>().map(TokenKind::Number).map_err(|_| LexError {
            message: format!("Invalid number literal '{text}'"),
            span: self.span(self.line, self.col),
        })
    }

    fn lex_string(&mut self, quote: u8) -> Result<TokenKind, LexError> {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(LexError {
                        message: "Unterminated string literal".to_string(),
                        span: self.span(self.line, self.col),
                    })
                }
                Some(c) if c == quote => break,
                Some(b'\\') => {
                    let escaped = self.bump().ok_or_else(|| LexError {
                        message: "Unterminated escape in string literal".to_string(),
                        span: self.span(self.line, self.col),
                    })?;
                    value.push(match escaped {
                        b'n' => '\n',
                        b't' => '\t',
                        b'"' => '"',
                        b'\'' => '\'',
                        b'\\' => '\\',
                        other => other as char,
                    });
                }
                Some(c) => value.push(c as char),
            }
        }
        Ok(TokenKind::String(value))
    }

    fn lex_operator(&mut self) -> Result<TokenKind, LexError> {
        let c = self.bump().unwrap();
        let kind = match c {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b':' => TokenKind::Colon,
            b';' => TokenKind::Semi,
            b'|' => TokenKind::Pipe,
            b'+' => TokenKind::Plus,
            b'-' if self.peek() == Some(b'>') => {
                self.bump();
                TokenKind::Arrow
            }
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'^' => TokenKind::Caret,
            b'#' => TokenKind::Hash,
            b'=' if self.peek() == Some(b'=') => {
                self.bump();
                TokenKind::Eq
            }
            b'=' if self.peek() == Some(b'>') => {
                self.bump();
                TokenKind::FatArrow
            }
            b'=' => TokenKind::Assign,
            b'~' if self.peek() == Some(b'=') => {
                self.bump();
                TokenKind::NotEq
            }
            b'<' if self.peek() == Some(b'=') => {
                self.bump();
                TokenKind::LtEq
            }
            b'<' => TokenKind::Lt,
            b'>' if self.peek() == Some(b'=') => {
                self.bump();
                TokenKind::GtEq
            }
            b'>' => TokenKind::Gt,
            other => {
                return Err(LexError {
                    message: format!("Unexpected character '{}'", other as char),
                    span: self.span(self.line, self.col),
                })
            }
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src, None).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_keywords_and_operators() {
        let ks = kinds("let x = 1 ~= nil");
        assert_eq!(
            ks,
            vec![
                TokenKind::Let,
                TokenKind::Ident("x".into()),
                TokenKind::Assign,
                TokenKind::Number(1.0),
                TokenKind::NotEq,
                TokenKind::Nil,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn skips_comments() {
        let ks = kinds("-- comment\nlet x = 1");
        assert_eq!(ks[0], TokenKind::Let);
    }

    #[test]
    fn lexes_strings_with_escapes() {
        let ks = kinds(r#""a\nb""#);
        assert_eq!(ks[0], TokenKind::String("a\nb".to_string()));
    }
}
