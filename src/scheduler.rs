//! The microtask queue that settlement notifications run on.
//!
//! Every thread gets its own FIFO queue, created on first use. Queued thunks
//! never run inside the call that queued them; they run when the host drains
//! the queue with [`run_until_idle`] or [`run_turns`], or when a
//! [`Deferred`](crate::Deferred) is polled as a future.
//!
//! # Examples
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use thenable::scheduler;
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! for n in 0..3 {
//!     let log = log.clone();
//!     scheduler::queue_microtask(move || log.borrow_mut().push(n));
//! }
//! assert!(log.borrow().is_empty());
//! assert_eq!(scheduler::run_until_idle(), 3);
//! assert_eq!(*log.borrow(), vec![0, 1, 2]);
//! ```
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use tracing::trace;

type Thunk = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<VecDeque<Thunk>> = RefCell::new(VecDeque::new());
    static DRAINING: Cell<bool> = Cell::new(false);
}

/// Queues `thunk` behind everything already queued on this thread.
pub fn queue_microtask<F>(thunk: F)
where
    F: FnOnce() + 'static,
{
    QUEUE.with(|queue| queue.borrow_mut().push_back(Box::new(thunk)));
}

/// Number of thunks waiting on this thread.
pub fn pending() -> usize {
    QUEUE.with(|queue| queue.borrow().len())
}

/// Whether a drain is running on this thread, i.e. the caller is inside a
/// queued thunk.
pub fn is_draining() -> bool {
    DRAINING.with(Cell::get)
}

/// Runs queued thunks, including the ones they queue, until none are left.
/// Returns how many ran.
pub fn run_until_idle() -> usize {
    drain(None)
}

/// Like [`run_until_idle`] but stops after `limit` thunks.
pub fn run_turns(limit: usize) -> usize {
    drain(Some(limit))
}

/// Clears the draining flag even if a thunk panics.
struct Draining;

impl Drop for Draining {
    fn drop(&mut self) {
        DRAINING.with(|flag| flag.set(false));
    }
}

fn drain(limit: Option<usize>) -> usize {
    // A nested drain would run thunks ahead of the one currently running.
    if DRAINING.with(|flag| flag.replace(true)) {
        return 0;
    }
    let _draining = Draining;
    let mut turns = 0;
    while limit.map_or(true, |limit| turns < limit) {
        let Some(thunk) = QUEUE.with(|queue| queue.borrow_mut().pop_front()) else {
            break;
        };
        thunk();
        turns += 1;
    }
    if turns > 0 {
        trace!(turns, remaining = pending(), "drained microtasks");
    }
    turns
}
