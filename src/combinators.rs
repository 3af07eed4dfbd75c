//! `all`, `all_settled`, `race` and `any`.
//!
//! Each one only uses the public surface of [`Deferred`]: inputs that are
//! not deferred values are wrapped with [`Deferred::resolve`] first, so a
//! foreign thenable passed in directly is assimilated like any other.
//!
//! | combinator    | fulfills with                 | rejects with            | empty input     |
//! |---------------|-------------------------------|-------------------------|-----------------|
//! | `all`         | every value, in input order   | the first rejection     | `[]`            |
//! | `all_settled` | every [`Outcome`], in order   | never                   | `[]`            |
//! | `race`        | the first settlement          | the first settlement    | stays pending   |
//! | `any`         | the first fulfillment         | [`Error::Aggregate`]    | empty aggregate |
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::trace;

use crate::{Deferred, Error, Function, Outcome, Settler, Value};

fn settle_from(item: Value) -> Deferred {
    match item {
        Value::Deferred(d) => d,
        other => Deferred::resolve(other),
    }
}

/// Per-index result slots plus a countdown to the last one.
struct Slots {
    values: RefCell<Vec<Value>>,
    remaining: Cell<usize>,
}

impl Slots {
    fn new(len: usize) -> Rc<Self> {
        Rc::new(Self {
            values: RefCell::new(vec![Value::Undefined; len]),
            remaining: Cell::new(len),
        })
    }

    /// Fills slot `index`; returns every slot once the last one is filled.
    fn fill(&self, index: usize, value: Value) -> Option<Vec<Value>> {
        self.values.borrow_mut()[index] = value;
        self.remaining.set(self.remaining.get() - 1);
        (self.remaining.get() == 0).then(|| self.values.take())
    }
}

impl Deferred {
    /// Fulfills with every input's value in input order, or rejects with the
    /// first rejection. Inputs that settle after that are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use thenable::{Deferred, Value};
    /// use futures::executor::block_on;
    ///
    /// let both = Deferred::all([Value::from(1), Deferred::resolve(Value::from(2)).into()]);
    /// assert_eq!(block_on(both), Ok(Value::list([Value::from(1), Value::from(2)])));
    /// ```
    pub fn all<I>(items: I) -> Deferred
    where
        I: IntoIterator<Item = Value>,
    {
        let items: Vec<Value> = items.into_iter().collect();
        Deferred::new(move |fulfill, reject| {
            if items.is_empty() {
                fulfill.call(Value::list([]));
                return Ok(());
            }
            let slots = Slots::new(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let (slots, fulfill) = (slots.clone(), fulfill.clone());
                let on_fulfilled = Function::unary(move |value| {
                    if let Some(values) = slots.fill(index, value) {
                        trace!(count = values.len(), "all inputs fulfilled");
                        fulfill.call(values.into());
                    }
                    Ok(Value::Undefined)
                });
                settle_from(item).then(Some(on_fulfilled), Some(reject.clone().into()));
            }
            Ok(())
        })
    }

    /// Fulfills with one [`Outcome`] per input, in input order, once every
    /// input has settled. Never rejects.
    pub fn all_settled<I>(items: I) -> Deferred
    where
        I: IntoIterator<Item = Value>,
    {
        let items: Vec<Value> = items.into_iter().collect();
        Deferred::new(move |fulfill, _| {
            if items.is_empty() {
                fulfill.call(Value::list([]));
                return Ok(());
            }
            let slots = Slots::new(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let record = {
                    let (slots, fulfill) = (slots.clone(), fulfill.clone());
                    Rc::new(move |outcome: Outcome| {
                        if let Some(values) = slots.fill(index, outcome.into()) {
                            trace!(count = values.len(), "all inputs settled");
                            fulfill.call(values.into());
                        }
                    })
                };
                let on_rejected = {
                    let record = record.clone();
                    Function::unary(move |reason| {
                        record(Outcome::Rejected(reason));
                        Ok(Value::Undefined)
                    })
                };
                let on_fulfilled = Function::unary(move |value| {
                    record(Outcome::Fulfilled(value));
                    Ok(Value::Undefined)
                });
                settle_from(item).then(Some(on_fulfilled), Some(on_rejected));
            }
            Ok(())
        })
    }

    /// Settles the same way as whichever input settles first.
    ///
    /// With no inputs nothing ever settles it, so the result stays pending.
    pub fn race<I>(items: I) -> Deferred
    where
        I: IntoIterator<Item = Value>,
    {
        let items: Vec<Value> = items.into_iter().collect();
        Deferred::new(move |fulfill, reject| {
            for item in items {
                settle_from(item).then(Some(fulfill.clone().into()), Some(reject.clone().into()));
            }
            Ok(())
        })
    }

    /// Fulfills with the first fulfillment. If every input rejects, rejects
    /// with [`Error::Aggregate`] holding the reasons in input order.
    ///
    /// # Examples
    ///
    /// ```
    /// use thenable::{Deferred, Error, Value};
    /// use futures::executor::block_on;
    ///
    /// let none = Deferred::any(Vec::new());
    /// assert_eq!(block_on(none), Err(Value::from(Error::Aggregate(Vec::new()))));
    /// ```
    pub fn any<I>(items: I) -> Deferred
    where
        I: IntoIterator<Item = Value>,
    {
        let items: Vec<Value> = items.into_iter().collect();
        Deferred::new(move |fulfill, reject| {
            if items.is_empty() {
                reject.call(Error::Aggregate(Vec::new()).into());
                return Ok(());
            }
            let slots = Slots::new(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let on_rejected = rejection_collector(&slots, index, reject.clone());
                settle_from(item).then(Some(fulfill.clone().into()), Some(on_rejected));
            }
            Ok(())
        })
    }
}

fn rejection_collector(slots: &Rc<Slots>, index: usize, reject: Settler) -> Function {
    let slots = slots.clone();
    Function::unary(move |reason| {
        if let Some(reasons) = slots.fill(index, reason) {
            trace!(count = reasons.len(), "all inputs rejected");
            reject.call(Error::Aggregate(reasons).into());
        }
        Ok(Value::Undefined)
    })
}
