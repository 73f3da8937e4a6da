use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use crate::error::{ErrorKind, RuntimeError};
use crate::object::{Builtin, Object};
use crate::token::Token;

/// The native functions, keyed by name. User bindings take precedence over these.
pub fn builtins() -> HashMap<&'static str, Builtin> {
  let mut builtins = HashMap::new();
  builtins.insert("len", Builtin { name: "len", function: builtin_len });
  builtins.insert("push", Builtin { name: "push", function: builtin_push });
  builtins.insert("print", Builtin { name: "print", function: builtin_print });
  builtins
}

fn builtin_len(token: &Token, args: Vec<Object>, _: &mut dyn Write) -> Result<Object, RuntimeError> {
  if args.len() != 1 {
    return Err(RuntimeError::new(ErrorKind::WrongArgumentCount, token));
  }

  match &args[0] {
    Object::Array(elements) => Ok(Object::Integer(elements.len() as i64)),
    Object::String(s) => Ok(Object::Integer(s.len() as i64)),
    other => Err(RuntimeError::new(ErrorKind::InvalidArgument(other.type_name()), token)),
  }
}

// Builds a new array; the one passed in is left as it was.
fn builtin_push(token: &Token, args: Vec<Object>, _: &mut dyn Write) -> Result<Object, RuntimeError> {
  if args.len() < 2 {
    return Err(RuntimeError::new(ErrorKind::WrongArgumentCount, token));
  }

  let mut args = args.into_iter();
  match args.next() {
    Some(Object::Array(elements)) => {
      let mut pushed = Vec::with_capacity(elements.len() + args.len());
      pushed.extend(elements.iter().cloned());
      pushed.extend(args);
      Ok(Object::Array(Rc::new(pushed)))
    }
    Some(other) => Err(RuntimeError::new(ErrorKind::InvalidArgument(other.type_name()), token)),
    None => Err(RuntimeError::new(ErrorKind::WrongArgumentCount, token)),
  }
}

fn builtin_print(token: &Token, args: Vec<Object>, out: &mut dyn Write) -> Result<Object, RuntimeError> {
  for arg in &args {
    writeln!(out, "{}", arg).map_err(|e| RuntimeError::new(ErrorKind::Output(e.to_string()), token))?;
  }

  Ok(Object::Null)
}
