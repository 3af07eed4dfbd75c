use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use tracing::{debug, trace};

use crate::guard::{self, Guarded};
use crate::scheduler;
use crate::value::Probe;
use crate::{Error, Function, Value};

/// Where a deferred value is in its lifecycle. Leaves `Pending` at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Pending,
    Fulfilled,
    Rejected,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            State::Pending => "pending",
            State::Fulfilled => "fulfilled",
            State::Rejected => "rejected",
        })
    }
}

/// The side a deferred value settles on.
#[derive(Debug, Clone, Copy)]
enum Side {
    Fulfilled,
    Rejected,
}

impl From<Side> for State {
    fn from(side: Side) -> Self {
        match side {
            Side::Fulfilled => State::Fulfilled,
            Side::Rejected => State::Rejected,
        }
    }
}

type Reaction = Box<dyn FnOnce(Value)>;

struct Inner {
    state: State,
    result: Value,
    on_fulfilled: Vec<Reaction>,
    on_rejected: Vec<Reaction>,
    // Same as the multi-consumer promise: every poller gets woken.
    wakers: Vec<Waker>,
}

/// A value or error that is not known yet.
///
/// Cloning a `Deferred` clones the handle, not the value: all clones observe
/// the same settlement.
///
/// # Examples
///
/// ```
/// use thenable::{scheduler, Deferred, Function, Value};
///
/// let doubled = Deferred::resolve(Value::from(21)).then(
///     Some(Function::unary(|v| Ok(Value::from(v.as_number().unwrap_or(0.0) * 2.0)))),
///     None,
/// );
/// assert_eq!(doubled.outcome(), None);
/// scheduler::run_until_idle();
/// assert_eq!(doubled.outcome(), Some(Ok(Value::from(42))));
/// ```
#[derive(Clone)]
pub struct Deferred {
    inner: Rc<RefCell<Inner>>,
}

/// One half of the guarded pair handed to an executor or a thenable.
///
/// Only the first call through either half of a pair has any effect.
#[derive(Clone)]
pub struct Settler(Rc<dyn Fn(Value)>);

impl Settler {
    fn new<F>(guarded: Guarded<F>) -> Self
    where
        F: Fn(Value) + 'static,
    {
        Self(Rc::new(move |value: Value| {
            guarded.call(value);
        }))
    }

    pub fn call(&self, value: Value) {
        (self.0)(value)
    }
}

impl Debug for Settler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Settler")
    }
}

impl From<Settler> for Function {
    fn from(settler: Settler) -> Self {
        Function::unary(move |value| {
            settler.call(value);
            Ok(Value::Undefined)
        })
    }
}

impl From<Settler> for Value {
    fn from(settler: Settler) -> Self {
        Value::Function(settler.into())
    }
}

impl Deferred {
    /// Runs `executor` right away with a guarded fulfill/reject pair. An
    /// `Err` from the executor rejects, unless the pair was already used.
    ///
    /// # Examples
    ///
    /// ```
    /// use thenable::{Deferred, State, Value};
    ///
    /// let d = Deferred::new(|fulfill, reject| {
    ///     fulfill.call(Value::from("first"));
    ///     reject.call(Value::from("ignored"));
    ///     Err(Value::from("also ignored"))
    /// });
    /// assert_eq!(d.state(), State::Fulfilled);
    /// assert_eq!(d.outcome(), Some(Ok(Value::from("first"))));
    /// ```
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Settler, Settler) -> Result<(), Value>,
    {
        let deferred = Self::pending();
        let (fulfill, reject) = deferred.settlers();
        if let Err(thrown) = executor(fulfill, reject.clone()) {
            reject.call(thrown);
        }
        deferred
    }

    /// A deferred value fulfilled with `value`, after assimilating it if it
    /// is a thenable.
    pub fn resolve(value: Value) -> Self {
        Self::new(|fulfill, _| {
            fulfill.call(value);
            Ok(())
        })
    }

    pub fn reject(reason: Value) -> Self {
        Self::new(|_, reject| {
            reject.call(reason);
            Ok(())
        })
    }

    pub(crate) fn pending() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: State::Pending,
                result: Value::Undefined,
                on_fulfilled: Vec::new(),
                on_rejected: Vec::new(),
                wakers: Vec::new(),
            })),
        }
    }

    /// A fresh guarded pair bound to this value's own fulfill and reject.
    pub(crate) fn settlers(&self) -> (Settler, Settler) {
        let (fulfill_target, reject_target) = (self.clone(), self.clone());
        let (fulfill, reject) = guard::once(
            move |value: Value| fulfill_target.resolve_with(value),
            move |reason: Value| reject_target.reject_with(reason),
        );
        (Settler::new(fulfill), Settler::new(reject))
    }

    pub fn state(&self) -> State {
        self.inner.borrow().state
    }

    /// The settled result, without subscribing.
    pub fn outcome(&self) -> Option<Result<Value, Value>> {
        let inner = self.inner.borrow();
        match inner.state {
            State::Pending => None,
            State::Fulfilled => Some(Ok(inner.result.clone())),
            State::Rejected => Some(Err(inner.result.clone())),
        }
    }

    pub fn ptr_eq(&self, other: &Deferred) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The resolution procedure.
    fn resolve_with(&self, value: Value) {
        // Anything `value` drives gets its own latch.
        let (fulfill, reject) = self.settlers();
        if let Value::Deferred(other) = &value {
            if other.ptr_eq(self) {
                debug!("deferred value resolved with itself");
                return reject.call(Error::SelfResolution.into());
            }
        }
        match value.probe() {
            Err(thrown) => reject.call(thrown),
            Ok(Probe::Deferred(other)) => {
                trace!(state = %other.state(), "adopting deferred value");
                other.subscribe(
                    Box::new(move |value| fulfill.call(value)),
                    Box::new(move |reason| reject.call(reason)),
                );
            }
            Ok(Probe::Thenable(then)) => {
                trace!("assimilating thenable");
                if let Err(thrown) = then.call(&[Value::from(fulfill), Value::from(reject.clone())]) {
                    reject.call(thrown);
                }
            }
            Ok(Probe::Plain) => self.settle(Side::Fulfilled, value),
        }
    }

    fn reject_with(&self, reason: Value) {
        self.settle(Side::Rejected, reason)
    }

    fn settle(&self, side: Side, result: Value) {
        let (dropped, wakers) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state != State::Pending {
                return;
            }
            inner.state = side.into();
            inner.result = result.clone();
            let dropped = match side {
                Side::Fulfilled => mem::take(&mut inner.on_rejected),
                Side::Rejected => mem::take(&mut inner.on_fulfilled),
            };
            (dropped, mem::take(&mut inner.wakers))
        };
        drop(dropped);
        trace!(state = %State::from(side), ?result, "settled");

        let this = self.clone();
        scheduler::queue_microtask(move || this.flush(side, result));
        wakers.into_iter().for_each(Waker::wake);
    }

    fn flush(&self, side: Side, result: Value) {
        let reactions = {
            let mut inner = self.inner.borrow_mut();
            match side {
                Side::Fulfilled => mem::take(&mut inner.on_fulfilled),
                Side::Rejected => mem::take(&mut inner.on_rejected),
            }
        };
        for reaction in reactions {
            reaction(result.clone());
        }
    }

    /// Registers one reaction per side. Only the one matching the eventual
    /// state ever runs; on a settled value it runs in its own turn.
    fn subscribe(&self, on_fulfilled: Reaction, on_rejected: Reaction) {
        let mut inner = self.inner.borrow_mut();
        let state = inner.state;
        let (reaction, result) = match state {
            State::Pending => {
                inner.on_fulfilled.push(on_fulfilled);
                inner.on_rejected.push(on_rejected);
                return;
            }
            State::Fulfilled => (on_fulfilled, inner.result.clone()),
            State::Rejected => (on_rejected, inner.result.clone()),
        };
        drop(inner);
        scheduler::queue_microtask(move || reaction(result));
    }

    /// Chains a new deferred value onto this one.
    ///
    /// A missing `on_fulfilled` passes the value through and a missing
    /// `on_rejected` passes the rejection through. A handler's return value
    /// goes through the resolution procedure; an `Err` rejects.
    pub fn then(&self, on_fulfilled: Option<Function>, on_rejected: Option<Function>) -> Deferred {
        let source = self.clone();
        Deferred::new(move |fulfill, reject| {
            let on_value: Reaction = {
                let (fulfill, reject) = (fulfill.clone(), reject.clone());
                Box::new(move |value| match on_fulfilled {
                    None => fulfill.call(value),
                    Some(handler) => match handler.call(&[value]) {
                        Ok(next) => fulfill.call(next),
                        Err(thrown) => reject.call(thrown),
                    },
                })
            };
            let on_reason: Reaction = Box::new(move |reason| match on_rejected {
                None => reject.call(reason),
                Some(handler) => match handler.call(&[reason]) {
                    Ok(next) => fulfill.call(next),
                    Err(thrown) => reject.call(thrown),
                },
            });
            source.subscribe(on_value, on_reason);
            Ok(())
        })
    }

    pub fn catch(&self, on_rejected: Option<Function>) -> Deferred {
        self.then(None, on_rejected)
    }

    /// Runs `on_settled` with no arguments either way, then passes the
    /// original outcome through. An `Err` from `on_settled` wins.
    pub fn finally(&self, on_settled: Function) -> Deferred {
        let after_value = on_settled.clone();
        self.then(
            Some(Function::unary(move |value| {
                after_value.call(&[])?;
                Ok(value)
            })),
            Some(Function::unary(move |reason| {
                on_settled.call(&[])?;
                Err(reason)
            })),
        )
    }
}

impl Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Deferred");
        match self.inner.try_borrow() {
            Ok(inner) => debug.field("state", &inner.state),
            Err(_) => debug.field("state", &format_args!("<borrowed>")),
        };
        debug.finish()
    }
}

/// Polling drains this thread's microtask queue before looking at the
/// outcome.
///
/// # Panics
///
/// Panics if the value is still pending when polled from inside a queued
/// callback. The queue is already being drained further up the stack, so
/// nothing the value waits on could run and a blocking executor would never
/// return.
impl Future for Deferred {
    type Output = Result<Value, Value>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        scheduler::run_until_idle();
        if let Some(outcome) = self.outcome() {
            return Poll::Ready(outcome);
        }
        if scheduler::is_draining() {
            panic!("cannot await a pending deferred value from inside a microtask");
        }
        let mut inner = self.inner.borrow_mut();
        if !inner.wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
            inner.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}
