use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::object::Object;

type Objects = HashMap<String, Object>;

/// One lexical scope. Lookups fall through to `parent`; definitions always
/// land in this scope and shadow any outer binding.
#[derive(Debug, Default)]
pub struct Env {
  pub objects: Objects,
  pub parent: Option<Rc<RefCell<Env>>>,
}

impl Env {
  pub fn new() -> Self {
    Self {
      objects: HashMap::new(),
      parent: None,
    }
  }

  pub fn new_with_parent(parent: Rc<RefCell<Env>>) -> Self {
    Self {
      objects: HashMap::new(),
      parent: Some(parent),
    }
  }

  pub fn get(&self, name: &str) -> Option<Object> {
    if let Some(object) = self.objects.get(name) {
      return Some(object.clone());
    }

    if let Some(ref parent) = self.parent {
      return parent.borrow().get(name);
    }

    None
  }

  pub fn set(&mut self, name: impl Into<String>, value: Object) {
    self.objects.insert(name.into(), value);
  }
}
