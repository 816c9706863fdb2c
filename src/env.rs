// ABOUTME: The global environment and user-type registry, and the keyed call-frame protocol

use crate::ast::{FuncDecl, TypedName};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// A registered `newtype`: its declared fields (in declaration order) and
/// its inline methods.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    pub fields: Vec<TypedName>,
    pub methods: Vec<Arc<FuncDecl>>,
}

/// The process-wide interpreter state: one mutable name→value mapping and
/// one user-type registry, each behind its own mutex.
///
/// The evaluator locks `bindings` once per top-level statement and threads
/// the guard through nested evaluation by reference; it never re-locks
/// mid-statement, since `std::sync::Mutex` is not reentrant.
#[derive(Debug)]
pub struct Environment {
    bindings: Mutex<HashMap<String, Value>>,
    pub types: Mutex<HashMap<String, Arc<TypeDef>>>,
}

impl Environment {
    pub fn new() -> Arc<Self> {
        Arc::new(Environment {
            bindings: Mutex::new(HashMap::new()),
            types: Mutex::new(HashMap::new()),
        })
    }

    /// Acquire the bindings map for the duration of one top-level statement.
    pub fn lock_bindings(&self) -> MutexGuard<'_, HashMap<String, Value>> {
        self.bindings.lock().expect("environment mutex poisoned")
    }

    /// A snapshot clone, used as a function's `captured_env` at declaration
    /// time and as the fresh isolated env a `use`-loaded module evaluates
    /// under.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.lock_bindings().clone()
    }
}

/// Saves the prior value (or absence) of a set of names before a call
/// overlays them, so they can be restored afterward without disturbing any
/// other name the callee wrote to. This is the "keyed restore" that makes
/// outer-scope writes through a live, shared environment persist across a
/// call while the call's own locals vanish on return.
pub struct CallFrame {
    saved: HashMap<String, Option<Value>>,
}

impl CallFrame {
    /// Overlays `bindings` with `overlay`, remembering what each overlaid
    /// name held before (or that it was absent).
    pub fn enter(env: &mut HashMap<String, Value>, overlay: HashMap<String, Value>) -> Self {
        let mut saved = HashMap::with_capacity(overlay.len());
        for (name, value) in overlay {
            saved.insert(name.clone(), env.insert(name, value));
        }
        CallFrame { saved }
    }

    /// Restores every overlaid name to its pre-call value, or removes it if
    /// it did not exist before the call. Every other name the callee wrote
    /// to is left as-is.
    pub fn exit(self, env: &mut HashMap<String, Value>) {
        for (name, prior) in self.saved {
            match prior {
                Some(value) => {
                    env.insert(name, value);
                }
                None => {
                    env.remove(&name);
                }
            }
        }
    }

    /// Reads a name's *current* value out of the still-overlaid env, for
    /// write-back into a record after a method call.
    pub fn overlaid_names(&self) -> impl Iterator<Item = &String> {
        self.saved.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_frame_restores_shadowed_name_and_keeps_unrelated_write() {
        let mut env = HashMap::new();
        env.insert("x".to_string(), Value::Int(1));
        env.insert("counter".to_string(), Value::Int(0));

        let mut overlay = HashMap::new();
        overlay.insert("x".to_string(), Value::Int(99));
        let frame = CallFrame::enter(&mut env, overlay);

        // callee body: write a new value to x (its local) and to counter
        // (a pre-existing caller name reached through the live map).
        env.insert("x".to_string(), Value::Int(100));
        env.insert("counter".to_string(), Value::Int(1));

        frame.exit(&mut env);

        assert!(matches!(env.get("x"), Some(Value::Int(1))));
        assert!(matches!(env.get("counter"), Some(Value::Int(1))));
    }

    #[test]
    fn call_frame_removes_name_absent_before_call() {
        let mut env = HashMap::new();
        let mut overlay = HashMap::new();
        overlay.insert("n".to_string(), Value::Int(5));
        let frame = CallFrame::enter(&mut env, overlay);
        assert!(matches!(env.get("n"), Some(Value::Int(5))));
        frame.exit(&mut env);
        assert!(env.get("n").is_none());
    }
}
