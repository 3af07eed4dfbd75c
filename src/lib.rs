//! Deferred values: a value or error that is not known yet, settled exactly
//! once, with `then` chaining, thenable assimilation and the `all`,
//! `all_settled`, `race` and `any` combinators.
//!
//! Everything runs on the current thread. Subscribers are never called from
//! inside the code that settles a value; they run later, in order, when the
//! [`scheduler`] queue is drained, either by the host loop or by awaiting a
//! [`Deferred`].
//!
//! # Examples
//!
//! ```
//! use thenable::{Deferred, Function, Value};
//! use futures::executor::block_on;
//!
//! let greeting = Deferred::resolve(Value::from("hello"))
//!     .then(Some(Function::unary(|v| Ok(format!("{} world", v.as_str().unwrap_or("")).into()))), None)
//!     .finally(Function::new(|_| Ok(Value::Undefined)));
//! assert_eq!(block_on(greeting), Ok(Value::from("hello world")));
//! ```
use thiserror::Error;

pub mod adapter;
mod combinators;
mod deferred;
pub mod guard;
pub mod scheduler;
mod value;

#[cfg(test)]
pub(crate) mod test_utils;

pub use deferred::{Deferred, Settler, State};
pub use value::{Function, Object, Outcome, Value};

/// Errors a deferred value can be rejected with by the crate itself.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A deferred value was resolved with itself.
    #[error("value is its own resolution target")]
    SelfResolution,
    /// Every input of `any` rejected.
    #[error("all {} inputs were rejected", .0.len())]
    Aggregate(Vec<Value>),
}

impl Error {
    /// The rejection reasons an aggregate error carries, in input order.
    pub fn reasons(&self) -> &[Value] {
        match self {
            Error::Aggregate(reasons) => reasons,
            Error::SelfResolution => &[],
        }
    }

    /// Whether this is the type-mismatch error of self-resolution.
    pub fn is_type_error(&self) -> bool {
        matches!(self, Error::SelfResolution)
    }
}
