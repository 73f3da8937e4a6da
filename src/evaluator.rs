use std::cell::RefCell;
use std::collections::HashMap;
use std::io;
use std::io::{Stdout, Write};
use std::mem;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{BinaryOperator, BlockStatement, Expression, Program, Statement, UnaryOperator};
use crate::builtin::builtins;
use crate::env::Env;
use crate::error::{ErrorKind, RuntimeError};
use crate::object::{Builtin, Function, Object};
use crate::token::Token;

/// Why evaluation of a statement stopped early.
///
/// `Return` travels outward through blocks and expressions until a function
/// call or the program loop takes its value; `Error` is never caught.
#[derive(Debug)]
enum Unwind {
  Return(Object),
  Error(RuntimeError),
}

impl From<RuntimeError> for Unwind {
  fn from(error: RuntimeError) -> Self {
    Unwind::Error(error)
  }
}

type Eval<T> = Result<T, Unwind>;

fn error(kind: ErrorKind, token: &Token) -> RuntimeError {
  RuntimeError::new(kind, token)
}

pub struct Evaluator<W: Write = Stdout> {
  env: Rc<RefCell<Env>>,
  builtins: HashMap<&'static str, Builtin>,
  out: W,
}

impl Evaluator<Stdout> {
  pub fn new(env: Rc<RefCell<Env>>) -> Self {
    Self::with_output(env, io::stdout())
  }
}

impl<W: Write> Evaluator<W> {
  /// Evaluator whose `print` output goes to `out` instead of stdout.
  pub fn with_output(env: Rc<RefCell<Env>>, out: W) -> Self {
    Evaluator {
      env,
      builtins: builtins(),
      out,
    }
  }

  pub fn output(&self) -> &W {
    &self.out
  }

  /// Runs `program` and yields the value of its last statement, or of the
  /// first top-level `return`. `None` when that statement produced nothing.
  pub fn eval(&mut self, program: &Program) -> Result<Option<Object>, RuntimeError> {
    debug!(statements = program.statements.len(), "evaluating program");

    let mut result = None;

    for statement in &program.statements {
      match self.eval_statement(statement) {
        Ok(value) => result = value,
        Err(Unwind::Return(value)) => return Ok(Some(value)),
        Err(Unwind::Error(error)) => return Err(error),
      }
    }

    Ok(result)
  }

  fn eval_statement(&mut self, statement: &Statement) -> Eval<Option<Object>> {
    match statement {
      Statement::Var { name, value, .. } => {
        let value = self.eval_expression(value)?;
        self.env.borrow_mut().set(name.name(), value);
        Ok(None)
      }
      Statement::Return { value, .. } => Err(Unwind::Return(self.eval_expression(value)?)),
      Statement::Expression { value, .. } => Ok(Some(self.eval_expression(value)?)),
    }
  }

  fn eval_block(&mut self, block: &BlockStatement) -> Eval<Option<Object>> {
    let mut result = None;

    for statement in &block.statements {
      result = self.eval_statement(statement)?;
    }

    Ok(result)
  }

  fn eval_expression(&mut self, expression: &Expression) -> Eval<Object> {
    match expression {
      Expression::Identifier(identifier) => Ok(self.eval_identifier(&identifier.token)?),
      Expression::Integer { value, .. } => Ok(Object::Integer(*value)),
      Expression::Float { value, .. } => Ok(Object::Float(*value)),
      Expression::Boolean { value, .. } => Ok(Object::Boolean(*value)),
      Expression::String { token } => Ok(Object::String(token.literal.clone())),
      Expression::Array { elements, .. } => {
        let elements = self.eval_expressions(elements)?;
        Ok(Object::Array(Rc::new(elements)))
      }
      Expression::Prefix { token, operator, right } => {
        let right = self.eval_expression(right)?;
        Ok(eval_prefix_expression(token, *operator, right)?)
      }
      Expression::Infix {
        token,
        operator,
        left,
        right,
      } => {
        let left = self.eval_expression(left)?;
        let right = self.eval_expression(right)?;
        Ok(eval_infix_expression(token, *operator, left, right)?)
      }
      Expression::If {
        condition,
        consequence,
        alternative,
        ..
      } => {
        let condition = self.eval_expression(condition)?;

        let branch = if condition.is_truthy() {
          Some(consequence)
        } else {
          alternative.as_ref()
        };

        match branch {
          Some(block) => Ok(self.eval_block(block)?.unwrap_or(Object::Null)),
          None => Ok(Object::Null),
        }
      }
      Expression::Function { parameters, body, .. } => Ok(Object::Function(Rc::new(Function {
        parameters: Rc::clone(parameters),
        body: Rc::clone(body),
        env: Rc::clone(&self.env),
      }))),
      Expression::Call {
        token,
        function,
        arguments,
      } => {
        let function = self.eval_expression(function)?;
        let arguments = self.eval_expressions(arguments)?;
        self.apply_function(token, function, arguments)
      }
      Expression::Index { token, left, index } => {
        let left = self.eval_expression(left)?;
        let index = self.eval_expression(index)?;
        Ok(eval_index_expression(token, left, index)?)
      }
    }
  }

  // Left to right, stopping at the first failure.
  fn eval_expressions(&mut self, expressions: &[Expression]) -> Eval<Vec<Object>> {
    expressions
      .iter()
      .map(|expression| self.eval_expression(expression))
      .collect()
  }

  fn eval_identifier(&self, token: &Token) -> Result<Object, RuntimeError> {
    if let Some(object) = self.env.borrow().get(&token.literal) {
      return Ok(object);
    }

    match self.builtins.get(token.literal.as_str()) {
      Some(builtin) => Ok(Object::Builtin(*builtin)),
      None => Err(error(ErrorKind::IdentifierNotFound(token.literal.clone()), token)),
    }
  }

  fn apply_function(&mut self, token: &Token, function: Object, arguments: Vec<Object>) -> Eval<Object> {
    match function {
      Object::Function(function) => {
        if arguments.len() != function.parameters.len() {
          return Err(error(ErrorKind::WrongArgumentCount, token).into());
        }

        trace!(line = token.line, column = token.column, arguments = arguments.len(), "calling function");

        let mut env = Env::new_with_parent(Rc::clone(&function.env));
        for (parameter, argument) in function.parameters.iter().zip(arguments) {
          env.set(parameter.name(), argument);
        }

        let caller = mem::replace(&mut self.env, Rc::new(RefCell::new(env)));
        let result = self.eval_block(&function.body);
        self.env = caller;

        match result {
          Ok(value) => Ok(value.unwrap_or(Object::Null)),
          Err(Unwind::Return(value)) => Ok(value),
          Err(unwind) => Err(unwind),
        }
      }
      Object::Builtin(builtin) => {
        trace!(name = builtin.name, arguments = arguments.len(), "calling builtin");
        Ok((builtin.function)(token, arguments, &mut self.out)?)
      }
      other => Err(error(ErrorKind::NotAFunction(other.type_name()), token).into()),
    }
  }
}

fn eval_prefix_expression(token: &Token, operator: UnaryOperator, right: Object) -> Result<Object, RuntimeError> {
  match (operator, right) {
    (UnaryOperator::Not, right) => Ok(Object::Boolean(!right.is_truthy())),
    (UnaryOperator::Negate, Object::Integer(value)) => Ok(Object::Integer(value.wrapping_neg())),
    (UnaryOperator::Negate, Object::Float(value)) => Ok(Object::Float(-value)),
    (UnaryOperator::Negate, right) => Err(error(
      ErrorKind::UnknownPrefixOperator {
        operator,
        operand: right.type_name(),
      },
      token,
    )),
  }
}

fn eval_infix_expression(
  token: &Token,
  operator: BinaryOperator,
  left: Object,
  right: Object,
) -> Result<Object, RuntimeError> {
  match (&left, &right) {
    (Object::Integer(l), Object::Integer(r)) => eval_integer_infix_expression(token, operator, *l, *r),
    (Object::Integer(l), Object::Float(r)) => eval_float_infix_expression(token, operator, *l as f64, *r),
    (Object::Float(l), Object::Integer(r)) => eval_float_infix_expression(token, operator, *l, *r as f64),
    (Object::Float(l), Object::Float(r)) => eval_float_infix_expression(token, operator, *l, *r),
    (Object::String(l), Object::String(r)) => match operator {
      BinaryOperator::Add => Ok(Object::String(format!("{}{}", l, r))),
      BinaryOperator::Equal => Ok(Object::Boolean(l == r)),
      BinaryOperator::NotEqual => Ok(Object::Boolean(l != r)),
      _ => Err(unknown_infix_operator(token, operator, &left, &right)),
    },
    _ => match operator {
      BinaryOperator::Equal => Ok(Object::Boolean(left.is_same(&right))),
      BinaryOperator::NotEqual => Ok(Object::Boolean(!left.is_same(&right))),
      _ => Err(unknown_infix_operator(token, operator, &left, &right)),
    },
  }
}

fn unknown_infix_operator(token: &Token, operator: BinaryOperator, left: &Object, right: &Object) -> RuntimeError {
  error(
    ErrorKind::UnknownInfixOperator {
      left: left.type_name(),
      operator,
      right: right.type_name(),
    },
    token,
  )
}

// Overflow wraps around rather than aborting the run.
fn eval_integer_infix_expression(
  token: &Token,
  operator: BinaryOperator,
  left: i64,
  right: i64,
) -> Result<Object, RuntimeError> {
  let result = match operator {
    BinaryOperator::Add => Object::Integer(left.wrapping_add(right)),
    BinaryOperator::Subtract => Object::Integer(left.wrapping_sub(right)),
    BinaryOperator::Multiply => Object::Integer(left.wrapping_mul(right)),
    BinaryOperator::Divide => {
      if right == 0 {
        return Err(error(ErrorKind::DivisionByZero, token));
      }
      Object::Integer(left.wrapping_div(right))
    }
    BinaryOperator::Equal => Object::Boolean(left == right),
    BinaryOperator::NotEqual => Object::Boolean(left != right),
    BinaryOperator::Less => Object::Boolean(left < right),
    BinaryOperator::LessEqual => Object::Boolean(left <= right),
    BinaryOperator::Greater => Object::Boolean(left > right),
    BinaryOperator::GreaterEqual => Object::Boolean(left >= right),
  };

  Ok(result)
}

fn eval_float_infix_expression(
  token: &Token,
  operator: BinaryOperator,
  left: f64,
  right: f64,
) -> Result<Object, RuntimeError> {
  let result = match operator {
    BinaryOperator::Add => Object::Float(left + right),
    BinaryOperator::Subtract => Object::Float(left - right),
    BinaryOperator::Multiply => Object::Float(left * right),
    BinaryOperator::Divide => {
      if right == 0.0 {
        return Err(error(ErrorKind::DivisionByZero, token));
      }
      Object::Float(left / right)
    }
    BinaryOperator::Equal => Object::Boolean(left == right),
    BinaryOperator::NotEqual => Object::Boolean(left != right),
    BinaryOperator::Less => Object::Boolean(left < right),
    BinaryOperator::LessEqual => Object::Boolean(left <= right),
    BinaryOperator::Greater => Object::Boolean(left > right),
    BinaryOperator::GreaterEqual => Object::Boolean(left >= right),
  };

  Ok(result)
}

/// Arrays indexed by integers only; negative indices count from the end.
fn eval_index_expression(token: &Token, left: Object, index: Object) -> Result<Object, RuntimeError> {
  match (&left, index) {
    (Object::Array(elements), Object::Integer(index)) => {
      let count = elements.len() as i64;
      let position = if index < 0 { count + index } else { index };

      if position < 0 || position >= count {
        return Err(error(ErrorKind::IndexOutOfBounds(position), token));
      }

      Ok(elements[position as usize].clone())
    }
    _ => Err(error(ErrorKind::UnsupportedIndex(left.type_name()), token)),
  }
}
