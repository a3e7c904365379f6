use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// One lexical scope frame: a mutable name→value mapping plus an optional
/// parent. Lookup walks outward; assignment always writes to the local
/// frame, which is what makes a name belong to the frame that first
/// assigned it. Function values hold an `Rc<Env>` to their defining frame,
/// so a frame lives exactly as long as something can still observe it.
#[derive(Debug, Default)]
pub struct Env {
    vars: RefCell<HashMap<String, Value>>,
    parent: Option<Rc<Env>>,
}

impl Env {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn with_parent(parent: &Rc<Env>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(HashMap::new()),
            parent: Some(parent.clone()),
        })
    }

    /// First hit wins, innermost frame outward.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Binds in this frame only; never writes through to a parent.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.vars.borrow_mut().insert(name.into(), value);
    }
}
