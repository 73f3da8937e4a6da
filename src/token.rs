use std::fmt;
use std::fmt::Formatter;

use logos::{Lexer, Logos, Skip};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(source = [u8])]
#[logos(skip r"[ \t\r\n]+")]
pub enum TokenKind {
  Illegal,
  Eof,

  #[token("//", skip_comment)]
  Comment,

  #[regex(r"[A-Za-z_]+")]
  Identifier,
  #[token("\"", close_string)]
  String,
  #[regex(r"[0-9]+\.[0-9]+")]
  Float,
  #[regex(r"[0-9]+")]
  Integer,

  #[token("=")]
  Assign,
  #[token("+")]
  Plus,
  #[token("-")]
  Minus,
  #[token("*")]
  Star,
  #[token("/")]
  Slash,
  #[token("!")]
  Bang,

  #[token("<")]
  Less,
  #[token(">")]
  Greater,
  #[token("<=")]
  LessEqual,
  #[token(">=")]
  GreaterEqual,
  #[token("==")]
  EqualEqual,
  #[token("!=")]
  BangEqual,

  #[token(",")]
  Comma,
  #[token(";")]
  Semicolon,

  #[token("(")]
  LeftParen,
  #[token(")")]
  RightParen,
  #[token("{")]
  LeftBrace,
  #[token("}")]
  RightBrace,
  #[token("[")]
  LeftBracket,
  #[token("]")]
  RightBracket,

  #[token("func")]
  Func,
  #[token("var")]
  Var,
  #[token("true")]
  True,
  #[token("false")]
  False,
  #[token("if")]
  If,
  #[token("else")]
  Else,
  #[token("return")]
  Return,
}

/// Runs to the end of the line, whatever bytes it contains.
fn skip_comment(lex: &mut Lexer<TokenKind>) -> Skip {
  let rest = lex.remainder();
  lex.bump(rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len()));
  Skip
}

/// Takes everything up to the closing quote, or to the end of input when it is missing.
fn close_string(lex: &mut Lexer<TokenKind>) {
  let rest = lex.remainder();
  lex.bump(rest.iter().position(|&b| b == b'"').map_or(rest.len(), |end| end + 1));
}

impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    let name = match self {
      TokenKind::Illegal => "ILLEGAL",
      TokenKind::Eof => "EOF",
      TokenKind::Comment => "COMMENT",
      TokenKind::Identifier => "IDENTIFIER",
      TokenKind::String => "STRING",
      TokenKind::Float => "FLOAT",
      TokenKind::Integer => "INTEGER",
      TokenKind::Assign => "=",
      TokenKind::Plus => "+",
      TokenKind::Minus => "-",
      TokenKind::Star => "*",
      TokenKind::Slash => "/",
      TokenKind::Bang => "!",
      TokenKind::Less => "<",
      TokenKind::Greater => ">",
      TokenKind::LessEqual => "<=",
      TokenKind::GreaterEqual => ">=",
      TokenKind::EqualEqual => "==",
      TokenKind::BangEqual => "!=",
      TokenKind::Comma => ",",
      TokenKind::Semicolon => ";",
      TokenKind::LeftParen => "(",
      TokenKind::RightParen => ")",
      TokenKind::LeftBrace => "{",
      TokenKind::RightBrace => "}",
      TokenKind::LeftBracket => "[",
      TokenKind::RightBracket => "]",
      TokenKind::Func => "FUNCTION",
      TokenKind::Var => "VARIABLE",
      TokenKind::True => "TRUE",
      TokenKind::False => "FALSE",
      TokenKind::If => "IF",
      TokenKind::Else => "ELSE",
      TokenKind::Return => "RETURN",
    };

    f.pad(name)
  }
}

/// A lexical unit together with the 1-based line and byte column of its first byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub literal: String,
  pub line: usize,
  pub column: usize,
}

impl Token {
  pub fn new(kind: TokenKind, literal: impl Into<String>, line: usize, column: usize) -> Token {
    Token {
      kind,
      literal: literal.into(),
      line,
      column,
    }
  }
}
