//! Call coalescing: run a function for a key at most once concurrently,
//! fanning the single result out to every caller that asked for that key
//! while it was in flight.
//!
//! This is the piece that keeps a cache stampede from turning into N
//! identical loader calls (or N identical peer fetches) when N goroutines
//! — threads, here — miss on the same key at the same time.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Condvar, Mutex};

enum CallState<V, E> {
    Pending,
    Done(Result<V, E>),
}

impl<V: Clone, E: Clone> Clone for CallState<V, E> {
    fn clone(&self) -> Self {
        match self {
            CallState::Pending => CallState::Pending,
            CallState::Done(r) => CallState::Done(r.clone()),
        }
    }
}

struct Call<V, E> {
    state: Mutex<CallState<V, E>>,
    cond: Condvar,
}

/// Coalesces concurrent calls for the same key into a single execution of
/// the supplied function.
pub struct SingleFlight<K, V, E> {
    calls: Mutex<HashMap<K, Arc<Call<V, E>>>>,
}

impl<K, V, E> SingleFlight<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
    E: Clone,
{
    /// Creates an empty coalescer.
    pub fn new() -> Self {
        SingleFlight {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Runs `f` for `key`, or — if another caller is already running `f`
    /// for the same key — waits for that call to finish and returns its
    /// result instead of running `f` again. The error `f` returns, if
    /// any, reaches every waiter unchanged — coalescing never changes the
    /// kind of error a caller sees.
    pub fn do_call<F>(&self, key: K, f: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let mut calls = self.calls.lock().unwrap();
        if let Some(existing) = calls.get(&key).cloned() {
            drop(calls);
            return Self::wait(&existing);
        }

        let call = Arc::new(Call {
            state: Mutex::new(CallState::Pending),
            cond: Condvar::new(),
        });
        calls.insert(key.clone(), Arc::clone(&call));
        drop(calls);

        let result = f();

        {
            let mut state = call.state.lock().unwrap();
            *state = CallState::Done(result.clone());
            call.cond.notify_all();
        }

        self.calls.lock().unwrap().remove(&key);
        result
    }

    fn wait(call: &Arc<Call<V, E>>) -> Result<V, E> {
        let mut state = call.state.lock().unwrap();
        loop {
            match &*state {
                CallState::Done(result) => return result.clone(),
                CallState::Pending => {
                    state = call.cond.wait(state).unwrap();
                }
            }
        }
    }
}

impl<K, V, E> Default for SingleFlight<K, V, E>
where
    K: Hash + Eq + Clone,
    V: Clone,
    E: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, E> std::fmt::Debug for SingleFlight<K, V, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.calls.lock().unwrap().len())
            .finish()
    }
}
