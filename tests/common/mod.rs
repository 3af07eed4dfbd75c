#![allow(dead_code)]
//! Shared integration test utilities.

use std::fmt;
use std::rc::Rc;
use std::sync::Once;

use proptest::prelude::ProptestConfig;
use thenable::{Function, Object, Value};
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_ansi(false)
            .try_init();
    });
}

pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    ProptestConfig {
        cases,
        ..ProptestConfig::default()
    }
}

/// A foreign object whose members come from a closure.
pub struct Foreign<F>(pub F);

impl<F> fmt::Debug for Foreign<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Foreign")
    }
}

impl<F> Object for Foreign<F>
where
    F: Fn(&str) -> Result<Value, Value>,
{
    fn get(&self, key: &str) -> Result<Value, Value> {
        (self.0)(key)
    }
}

/// A foreign thenable. `then` receives the resolve and reject callbacks it
/// was invoked with.
pub fn foreign_thenable<F>(then: F) -> Value
where
    F: Fn(Function, Function) -> Result<Value, Value> + 'static,
{
    let then = Rc::new(then);
    Value::object(Foreign(move |key: &str| {
        if key != "then" {
            return Ok(Value::Undefined);
        }
        let then = then.clone();
        Ok(Function::new(move |args| {
            let callback = |index: usize| {
                args.get(index)
                    .and_then(Value::as_function)
                    .cloned()
                    .expect("then is invoked with two callbacks")
            };
            then(callback(0), callback(1))
        })
        .into())
    }))
}
