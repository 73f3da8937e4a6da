use std::cell::RefCell;
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::io::Write;
use std::rc::Rc;

use crate::ast::{BlockStatement, Identifier};
use crate::env::Env;
use crate::error::RuntimeError;
use crate::token::Token;

pub type BuiltinFn = fn(&Token, Vec<Object>, &mut dyn Write) -> Result<Object, RuntimeError>;

/// A runtime value.
///
/// Arrays, functions and built-ins are reference values: cloning an `Object`
/// shares them, and `==` on them compares identity.
#[derive(Debug, Clone)]
pub enum Object {
  Null,
  Integer(i64),
  Float(f64),
  Boolean(bool),
  String(String),
  Array(Rc<Vec<Object>>),
  Function(Rc<Function>),
  Builtin(Builtin),
}

/// A closure over the environment that was active when its literal was evaluated.
pub struct Function {
  pub parameters: Rc<[Identifier]>,
  pub body: Rc<BlockStatement>,
  pub env: Rc<RefCell<Env>>,
}

#[derive(Clone, Copy)]
pub struct Builtin {
  pub name: &'static str,
  pub function: BuiltinFn,
}

impl Object {
  pub fn type_name(&self) -> &'static str {
    match self {
      Object::Null => "NULL",
      Object::Integer(_) => "INTEGER",
      Object::Float(_) => "FLOAT",
      Object::Boolean(_) => "BOOLEAN",
      Object::String(_) => "STRING",
      Object::Array(_) => "ARRAY",
      Object::Function(_) => "FUNCTION",
      Object::Builtin(_) => "BUILTIN",
    }
  }

  /// Everything except `false` and `null` is truthy.
  pub fn is_truthy(&self) -> bool {
    !matches!(self, Object::Null | Object::Boolean(false))
  }

  /// Identity comparison used by `==` and `!=` when no typed comparison applies.
  pub fn is_same(&self, other: &Object) -> bool {
    match (self, other) {
      (Object::Null, Object::Null) => true,
      (Object::Boolean(left), Object::Boolean(right)) => left == right,
      (Object::Array(left), Object::Array(right)) => Rc::ptr_eq(left, right),
      (Object::Function(left), Object::Function(right)) => Rc::ptr_eq(left, right),
      (Object::Builtin(left), Object::Builtin(right)) => left.name == right.name,
      _ => false,
    }
  }
}

impl fmt::Display for Object {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Object::Null => f.write_str("null"),
      Object::Integer(n) => write!(f, "{}", n),
      Object::Float(n) => write_float(f, *n),
      Object::Boolean(b) => write!(f, "{}", b),
      Object::String(s) => f.write_str(s),
      Object::Array(elements) => {
        f.write_str("[")?;
        for (i, element) in elements.iter().enumerate() {
          if i > 0 {
            f.write_str(", ")?;
          }
          write!(f, "{}", element)?;
        }
        f.write_str("]")
      }
      Object::Function(function) => {
        let parameters = function
          .parameters
          .iter()
          .map(|parameter| parameter.name())
          .collect::<Vec<_>>()
          .join(", ");
        write!(f, "func({}){}", parameters, function.body)
      }
      Object::Builtin(_) => f.write_str("built-in function"),
    }
  }
}

// Shortest round-trip digits, switching to exponent form like `%g` does.
fn write_float(f: &mut Formatter<'_>, n: f64) -> fmt::Result {
  if n.is_nan() {
    return f.write_str("NaN");
  }
  if n.is_infinite() {
    return f.write_str(if n > 0.0 { "+Inf" } else { "-Inf" });
  }

  let scientific = format!("{:e}", n);
  let (mantissa, exponent) = match scientific.split_once('e') {
    Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
    None => (scientific.as_str(), 0),
  };

  if (-4..FLOAT_EXPONENT_LIMIT).contains(&exponent) {
    write!(f, "{}", n)
  } else {
    let sign = if exponent < 0 { '-' } else { '+' };
    write!(f, "{}e{}{:02}", mantissa, sign, exponent.unsigned_abs())
  }
}

const FLOAT_EXPONENT_LIMIT: i32 = 6;

// The captured environment may hold this very function, so it is left out.
impl Debug for Function {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    f.debug_struct("Function")
      .field("parameters", &self.parameters)
      .field("body", &self.body)
      .finish_non_exhaustive()
  }
}

impl Debug for Builtin {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "Builtin({})", self.name)
  }
}
