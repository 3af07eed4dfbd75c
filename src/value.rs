//! The dynamic values carried by deferred values.
//!
//! A deferred value can be fulfilled with anything, so results, reasons and
//! callback arguments are all [`Value`]s. Foreign objects take part through
//! the [`Object`] trait, which is also how thenables are recognised.
use std::fmt::{self, Debug};
use std::rc::Rc;

use crate::{Deferred, Error, State};

/// A shared callable. Returning `Err` is a throw.
///
/// A function may also carry members, read through the same fallible
/// [`Object::get`] as any foreign object, so a callable can be a thenable.
#[derive(Clone)]
pub struct Function {
    call: Rc<dyn Fn(&[Value]) -> Result<Value, Value>>,
    members: Option<Rc<dyn Object>>,
}

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Value> + 'static,
    {
        Self {
            call: Rc::new(f),
            members: None,
        }
    }

    /// Wraps a single-argument callable. A missing argument is `Undefined`.
    ///
    /// # Examples
    ///
    /// ```
    /// use thenable::{Function, Value};
    /// let negate = Function::unary(|v| Ok(Value::Bool(!v.is_truthy())));
    /// assert_eq!(negate.call(&[Value::Null]), Ok(Value::Bool(true)));
    /// assert_eq!(negate.call(&[]), Ok(Value::Bool(true)));
    /// ```
    pub fn unary<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, Value> + 'static,
    {
        Self::new(move |args| f(args.first().cloned().unwrap_or_default()))
    }

    /// A callable whose named members come from `members`.
    pub fn with_members<F, O>(f: F, members: O) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, Value> + 'static,
        O: Object + 'static,
    {
        Self {
            call: Rc::new(f),
            members: Some(Rc::new(members)),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, Value> {
        (self.call)(args)
    }

    /// Reads member `key`. A function without members has none of them.
    pub fn get(&self, key: &str) -> Result<Value, Value> {
        match &self.members {
            Some(members) => members.get(key),
            None => Ok(Value::Undefined),
        }
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        std::ptr::eq(
            Rc::as_ptr(&self.call) as *const (),
            Rc::as_ptr(&other.call) as *const (),
        )
    }
}

impl Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Function")
    }
}

/// A foreign object with named members.
///
/// Any object whose `then` member is a [`Function`] is a thenable and gets
/// assimilated when a deferred value is resolved with it. Reading a member
/// may fail, in which case the `Err` is the thrown value.
pub trait Object: Debug {
    fn get(&self, key: &str) -> Result<Value, Value>;
}

/// The record `all_settled` produces for each input.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Fulfilled(Value),
    Rejected(Value),
}

impl Outcome {
    pub fn status(&self) -> State {
        match self {
            Outcome::Fulfilled(_) => State::Fulfilled,
            Outcome::Rejected(_) => State::Rejected,
        }
    }

    pub fn value(&self) -> Option<&Value> {
        match self {
            Outcome::Fulfilled(value) => Some(value),
            Outcome::Rejected(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&Value> {
        match self {
            Outcome::Rejected(reason) => Some(reason),
            Outcome::Fulfilled(_) => None,
        }
    }
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    List(Rc<[Value]>),
    Outcome(Rc<Outcome>),
    Error(Rc<Error>),
    Function(Function),
    Object(Rc<dyn Object>),
    Deferred(Deferred),
}

/// What reading `then` off a candidate resolution value found.
pub(crate) enum Probe {
    Plain,
    Deferred(Deferred),
    Thenable(Function),
}

impl Value {
    pub fn list<I: IntoIterator<Item = Value>>(items: I) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn object<O: Object + 'static>(object: O) -> Self {
        Value::Object(Rc::new(object))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(&**s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(&**items),
            _ => None,
        }
    }

    pub fn as_outcome(&self) -> Option<&Outcome> {
        match self {
            Value::Outcome(outcome) => Some(&**outcome),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&Error> {
        match self {
            Value::Error(err) => Some(&**err),
            _ => None,
        }
    }

    /// `None` for anything that is not invocable.
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_deferred(&self) -> Option<&Deferred> {
        match self {
            Value::Deferred(d) => Some(d),
            _ => None,
        }
    }

    /// Reads `then` at most once, off objects and functions alike.
    pub(crate) fn probe(&self) -> Result<Probe, Value> {
        let then = match self {
            Value::Deferred(d) => return Ok(Probe::Deferred(d.clone())),
            Value::Object(object) => object.get("then")?,
            Value::Function(f) => f.get("then")?,
            _ => return Ok(Probe::Plain),
        };
        match then {
            Value::Function(then) => Ok(Probe::Thenable(then)),
            _ => Ok(Probe::Plain),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Outcome(a), Value::Outcome(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
            }
            (Value::Deferred(a), Value::Deferred(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Outcome(outcome) => outcome.fmt(f),
            Value::Error(err) => write!(f, "Error({err})"),
            Value::Function(func) => func.fmt(f),
            Value::Object(object) => object.fmt(f),
            Value::Deferred(d) => d.fmt(f),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items.into())
    }
}

impl From<Outcome> for Value {
    fn from(outcome: Outcome) -> Self {
        Value::Outcome(Rc::new(outcome))
    }
}

impl From<Error> for Value {
    fn from(err: Error) -> Self {
        Value::Error(Rc::new(err))
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Deferred> for Value {
    fn from(d: Deferred) -> Self {
        Value::Deferred(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Throwing;

    impl Object for Throwing {
        fn get(&self, _key: &str) -> Result<Value, Value> {
            Err("no members".into())
        }
    }

    #[derive(Debug)]
    struct NotCallable;

    impl Object for NotCallable {
        fn get(&self, key: &str) -> Result<Value, Value> {
            match key {
                "then" => Ok(Value::from(5)),
                _ => Ok(Value::Undefined),
            }
        }
    }

    #[test]
    fn test_scalars_compare_by_value() {
        assert_eq!(Value::from("a"), Value::from(String::from("a")));
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_ne!(Value::Null, Value::Undefined);
        assert_eq!(
            Value::list(vec![Value::from(1), Value::Null]),
            Value::from(vec![Value::from(1), Value::Null])
        );
    }

    #[test]
    fn test_shared_values_compare_by_identity() {
        let f = Function::unary(Ok);
        let g = Function::unary(Ok);
        assert_eq!(Value::from(f.clone()), Value::from(f.clone()));
        assert_ne!(Value::from(f), Value::from(g));

        let object = Value::object(NotCallable);
        assert_eq!(object.clone(), object);
        assert_ne!(object, Value::object(NotCallable));
    }

    #[test]
    fn test_probe_plain_values() {
        for value in [Value::Null, Value::from(3), Value::from(Function::unary(Ok))] {
            assert!(matches!(value.probe(), Ok(Probe::Plain)));
        }
        assert!(matches!(Value::object(NotCallable).probe(), Ok(Probe::Plain)));
    }

    #[test]
    fn test_probe_surfaces_throwing_accessor() {
        match Value::object(Throwing).probe() {
            Err(thrown) => assert_eq!(thrown, Value::from("no members")),
            Ok(_) => panic!("accessor error was swallowed"),
        }
    }

    #[test]
    fn test_probe_reads_then_off_functions() {
        let callable = Function::with_members(|_| Ok(Value::Undefined), NotCallable);
        assert!(matches!(Value::from(callable).probe(), Ok(Probe::Plain)));

        let throwing = Function::with_members(|_| Ok(Value::Undefined), Throwing);
        match Value::from(throwing).probe() {
            Err(thrown) => assert_eq!(thrown, Value::from("no members")),
            Ok(_) => panic!("accessor error was swallowed"),
        }
    }

    #[test]
    fn test_function_members_do_not_change_identity() {
        let f = Function::with_members(|_| Ok(Value::from(1)), NotCallable);
        assert_eq!(f.call(&[]), Ok(Value::from(1)));
        assert_eq!(f.get("then"), Ok(Value::from(5)));
        assert_eq!(Function::unary(Ok).get("then"), Ok(Value::Undefined));
        assert!(f.ptr_eq(&f.clone()));
    }

    #[test]
    fn test_accessors_match_their_variant() {
        assert!(Value::default().is_undefined());
        assert!(!Value::Null.is_undefined());

        let list = Value::list([Value::from(1), Value::from("two")]);
        assert_eq!(list.as_list(), Some(&[Value::from(1), Value::from("two")][..]));
        assert_eq!(list.as_outcome(), None);

        let outcome = Value::from(Outcome::Rejected(Value::Null));
        assert_eq!(outcome.as_outcome().map(Outcome::status), Some(State::Rejected));
        assert_eq!(outcome.as_list(), None);

        let d = Deferred::resolve(Value::Null);
        assert!(Value::from(d.clone()).as_deferred().is_some_and(|held| held.ptr_eq(&d)));
        assert!(Value::Null.as_deferred().is_none());
    }

    #[test]
    fn test_outcome_accessors() {
        let ok = Outcome::Fulfilled(Value::from(1));
        let err = Outcome::Rejected(Value::from("x"));
        assert_eq!(ok.status(), State::Fulfilled);
        assert_eq!(ok.value(), Some(&Value::from(1)));
        assert_eq!(ok.reason(), None);
        assert_eq!(err.status().to_string(), "rejected");
        assert_eq!(err.reason(), Some(&Value::from("x")));
    }
}
