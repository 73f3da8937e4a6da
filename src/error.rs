use thiserror::Error;

use crate::ast::{BinaryOperator, UnaryOperator};
use crate::token::{Token, TokenKind};

/// Structural problem found while parsing. Parsing keeps going after one of
/// these, so a program may collect several.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("line {line} column {column}: expected next token to be {expected}, got {found} instead")]
  UnexpectedToken {
    expected: TokenKind,
    found: TokenKind,
    line: usize,
    column: usize,
  },
  #[error("line {line} column {column}: could not parse {literal} as {target}")]
  InvalidNumber {
    literal: String,
    target: &'static str,
    line: usize,
    column: usize,
  },
  #[error("missing prefix parse function for {kind}")]
  MissingPrefix {
    kind: TokenKind,
    line: usize,
    column: usize,
  },
}

/// Failure raised while evaluating; it always ends the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line} col {column}: {kind}")]
pub struct RuntimeError {
  pub kind: ErrorKind,
  pub line: usize,
  pub column: usize,
}

impl RuntimeError {
  pub fn new(kind: ErrorKind, token: &Token) -> Self {
    RuntimeError {
      kind,
      line: token.line,
      column: token.column,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
  #[error("identifier '{0}' not found")]
  IdentifierNotFound(String),
  #[error("unknown operator: {operator}{operand}")]
  UnknownPrefixOperator {
    operator: UnaryOperator,
    operand: &'static str,
  },
  #[error("unknown operator: {left} {operator} {right}")]
  UnknownInfixOperator {
    left: &'static str,
    operator: BinaryOperator,
    right: &'static str,
  },
  #[error("invalid division by zero")]
  DivisionByZero,
  #[error("wrong number of arguments")]
  WrongArgumentCount,
  #[error("'{0}' is not a function")]
  NotAFunction(&'static str),
  #[error("unsupported index operation: {0}")]
  UnsupportedIndex(&'static str),
  #[error("index '{0}' is out of bounds")]
  IndexOutOfBounds(i64),
  #[error("invalid argument type: {0}")]
  InvalidArgument(&'static str),
  #[error("could not write output: {0}")]
  Output(String),
}
