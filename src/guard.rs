//! A one-shot latch shared by a pair of procedures.
//!
//! [`once`] wraps two procedures so that the first call through either
//! wrapper goes through and every later call, through either one, does
//! nothing. Deferred values hand such a pair to every executor and thenable
//! so a value is never settled twice.
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct Latch(Rc<Cell<bool>>);

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes the latch. Only the call that actually closed it gets `true`.
    pub fn close(&self) -> bool {
        !self.0.replace(true)
    }

    pub fn is_closed(&self) -> bool {
        self.0.get()
    }
}

/// A procedure that only runs if it is the first to close its latch.
#[derive(Debug, Clone)]
pub struct Guarded<F> {
    latch: Latch,
    procedure: F,
}

impl<F> Guarded<F> {
    /// Returns whether the call had any effect.
    pub fn call<A>(&self, arg: A) -> bool
    where
        F: Fn(A),
    {
        if !self.latch.close() {
            return false;
        }
        (self.procedure)(arg);
        true
    }

    pub fn latch(&self) -> &Latch {
        &self.latch
    }
}

/// Links two procedures through one fresh latch.
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use thenable::guard::once;
///
/// let hits = Cell::new(0);
/// let (fulfill, reject) = once(|n: i32| hits.set(hits.get() + n), |_: &str| hits.set(-1));
/// assert!(fulfill.call(2));
/// assert!(!reject.call("late"));
/// assert!(!fulfill.call(5));
/// assert_eq!(hits.get(), 2);
/// ```
pub fn once<F, G>(first: F, second: G) -> (Guarded<F>, Guarded<G>) {
    let latch = Latch::new();
    (
        Guarded {
            latch: latch.clone(),
            procedure: first,
        },
        Guarded {
            latch,
            procedure: second,
        },
    )
}
