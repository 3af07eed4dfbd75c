//! Factory entry points for external compliance suites.
//!
//! A suite builds values through [`resolved`], [`rejected`] and
//! [`deferred`] and then only talks to them through `then`.
use crate::{Deferred, Settler, Value};

/// A pending deferred value together with the guarded pair that settles it.
///
/// `resolve` and `reject` are the same latch-sharing pair an executor would
/// get, so only the first call through either of them counts.
#[derive(Debug, Clone)]
pub struct DeferredParts {
    pub promise: Deferred,
    pub resolve: Settler,
    pub reject: Settler,
}

pub fn resolved(value: Value) -> Deferred {
    Deferred::resolve(value)
}

pub fn rejected(reason: Value) -> Deferred {
    Deferred::reject(reason)
}

/// # Examples
///
/// ```
/// use thenable::{adapter, State, Value};
///
/// let parts = adapter::deferred();
/// assert_eq!(parts.promise.state(), State::Pending);
/// parts.reject.call(Value::from("nope"));
/// parts.resolve.call(Value::from(1));
/// assert_eq!(parts.promise.outcome(), Some(Err(Value::from("nope"))));
/// ```
pub fn deferred() -> DeferredParts {
    let promise = Deferred::pending();
    let (resolve, reject) = promise.settlers();
    DeferredParts {
        promise,
        resolve,
        reject,
    }
}
