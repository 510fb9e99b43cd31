use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::object::PrivateName;
use crate::types::{JsObject, JsValue};

/// Outcome of evaluating a statement, expression or abstract operation.
/// Break and Continue carry their target label, if any, and the value of
/// the statements completed before them, which is empty until a statement
/// list or an enclosing statement fills it in.
#[derive(Clone, Debug)]
pub enum Completion {
    Normal(JsValue),
    Return(JsValue),
    Throw(JsValue),
    Break(Option<String>, Option<JsValue>),
    Continue(Option<String>, Option<JsValue>),
}

impl Completion {
    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }

    pub fn is_throw(&self) -> bool {
        matches!(self, Completion::Throw(_))
    }

    /// UpdateEmpty: fills the value of a Break or Continue that has none.
    pub(crate) fn update_empty(self, value: &JsValue) -> Completion {
        match self {
            Completion::Break(target, None) => Completion::Break(target, Some(value.clone())),
            Completion::Continue(target, None) => Completion::Continue(target, Some(value.clone())),
            other => other,
        }
    }
}

impl From<JsResult<JsValue>> for Completion {
    fn from(result: JsResult<JsValue>) -> Self {
        match result {
            Ok(value) => Completion::Normal(value),
            Err(thrown) => Completion::Throw(thrown),
        }
    }
}

/// Result of an abstract operation; `Err` holds the thrown value.
pub type JsResult<T> = Result<T, JsValue>;

/// Yields the value of a normal completion; returns any abrupt one from the
/// enclosing function unchanged.
macro_rules! normal {
    ($completion:expr) => {
        match $completion {
            Completion::Normal(value) => value,
            other => return other,
        }
    };
}

/// Yields the value of an abstract operation; a thrown value is returned
/// from the enclosing function as a Throw completion.
macro_rules! throw_on_err {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(thrown) => return Completion::Throw(thrown),
        }
    };
}

pub(crate) use normal;
pub(crate) use throw_on_err;

pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BindingKind {
    Var,
    Let,
    Const,
    /// The name of a named function expression; assignments are ignored
    /// in sloppy code.
    FunctionName,
}

#[derive(Clone, Debug)]
pub(crate) struct Binding {
    pub(crate) value: JsValue,
    pub(crate) kind: BindingKind,
    pub(crate) initialized: bool,
}

/// Why a binding operation failed; the evaluator turns these into
/// ReferenceError or TypeError objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BindingError {
    Uninitialized,
    ConstAssignment,
    Missing,
}

#[derive(Clone, Debug)]
pub(crate) enum ThisState {
    Uninitialized,
    Initialized(JsValue),
}

/// The parts of a function environment record that are not bindings.
#[derive(Debug)]
pub(crate) struct FunctionScope {
    pub(crate) this: ThisState,
    pub(crate) function: JsObject,
    pub(crate) new_target: Option<JsObject>,
}

#[derive(Debug, Default)]
pub struct Environment {
    pub(crate) bindings: FxHashMap<String, Binding>,
    pub(crate) parent: Option<EnvRef>,
    /// Backing object of the global environment.
    pub(crate) object: Option<JsObject>,
    pub(crate) function: Option<FunctionScope>,
    /// Private names declared by the class body this scope belongs to.
    pub(crate) private_names: FxHashMap<String, PrivateName>,
}

impl Environment {
    pub fn new(parent: Option<EnvRef>) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            parent,
            ..Default::default()
        }))
    }

    pub(crate) fn new_global(object: JsObject) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            object: Some(object),
            ..Default::default()
        }))
    }

    pub(crate) fn new_function(parent: EnvRef, scope: FunctionScope) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            parent: Some(parent),
            function: Some(scope),
            ..Default::default()
        }))
    }

    /// Creates a binding; only `var` bindings start out initialized.
    pub(crate) fn declare(&mut self, name: &str, kind: BindingKind) {
        self.bindings.insert(
            name.to_string(),
            Binding {
                value: JsValue::Undefined,
                kind,
                initialized: kind == BindingKind::Var,
            },
        );
    }

    pub(crate) fn has_binding(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub(crate) fn initialize(&mut self, name: &str, value: JsValue) {
        if let Some(binding) = self.bindings.get_mut(name) {
            binding.value = value;
            binding.initialized = true;
        }
    }

    pub(crate) fn get(&self, name: &str) -> Result<JsValue, BindingError> {
        match self.bindings.get(name) {
            Some(binding) if binding.initialized => Ok(binding.value.clone()),
            Some(_) => Err(BindingError::Uninitialized),
            None => Err(BindingError::Missing),
        }
    }

    /// SetMutableBinding. A function-name binding silently ignores
    /// writes unless `strict`.
    pub(crate) fn set(&mut self, name: &str, value: JsValue, strict: bool) -> Result<(), BindingError> {
        let Some(binding) = self.bindings.get_mut(name) else {
            return Err(BindingError::Missing);
        };
        if !binding.initialized {
            return Err(BindingError::Uninitialized);
        }
        match binding.kind {
            BindingKind::Const => Err(BindingError::ConstAssignment),
            BindingKind::FunctionName if strict => Err(BindingError::ConstAssignment),
            BindingKind::FunctionName => Ok(()),
            BindingKind::Var | BindingKind::Let => {
                binding.value = value;
                Ok(())
            }
        }
    }

    /// A sibling environment holding copies of this one's bindings, used to
    /// give each `for` iteration fresh `let` bindings.
    pub(crate) fn copy(&self) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            bindings: self.bindings.clone(),
            parent: self.parent.clone(),
            ..Default::default()
        }))
    }
}

/// The nearest environment on the chain that belongs to a function call.
pub(crate) fn function_environment(env: &EnvRef) -> Option<EnvRef> {
    let mut current = env.clone();
    loop {
        if current.borrow().function.is_some() {
            return Some(current);
        }
        let parent = current.borrow().parent.clone()?;
        current = parent;
    }
}

/// Resolves a private identifier against the enclosing class scopes.
pub(crate) fn resolve_private_name(env: &EnvRef, name: &str) -> Option<PrivateName> {
    let mut current = env.clone();
    loop {
        if let Some(found) = current.borrow().private_names.get(name) {
            return Some(found.clone());
        }
        let parent = current.borrow().parent.clone()?;
        current = parent;
    }
}
