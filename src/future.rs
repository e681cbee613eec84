use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::error::{Error, ErrorKind, Result};
use crate::logging::Logger;

enum Slot<T> {
    Pending,
    Ready(Result<T>),
    Taken,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    signal: Condvar,
}

/// A single-producer, single-consumer handle to a result that is not yet available.
///
/// For an in-process operation the provider's handler runs synchronously inside the caller's
/// stack frame, so the matching [`Promise`] is always fulfilled before the `Future` is returned;
/// `is_ready` is true immediately. The same type is used for wire-backed operations, where
/// fulfillment happens later on a callback thread — the blocking methods below are what makes the
/// two backends interchangeable from a consumer's point of view.
pub struct Future<T> {
    shared: Arc<Shared<T>>,
}

/// The write half of a [`Future`]/`Promise` pair. Dropping a `Promise` that was never fulfilled
/// resolves the `Future` with a `DefaultError`, the same way a provider crash would.
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
    fulfilled: bool,
}

pub fn channel<T>() -> (Promise<T>, Future<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot::Pending),
        signal: Condvar::new(),
    });
    (
        Promise {
            shared: shared.clone(),
            fulfilled: false,
        },
        Future { shared },
    )
}

impl<T> Promise<T> {
    pub fn set_value(mut self, value: T) {
        self.fulfill(Ok(value));
    }

    pub fn set_error(mut self, err: Error) {
        self.fulfill(Err(err));
    }

    fn fulfill(&mut self, result: Result<T>) {
        let mut slot = self.shared.slot.lock().unwrap();
        *slot = Slot::Ready(result);
        self.fulfilled = true;
        self.shared.signal.notify_all();
    }
}

impl<T> Drop for Promise<T> {
    fn drop(&mut self) {
        if !self.fulfilled {
            self.fulfill(Err(Error::new(
                ErrorKind::DefaultError,
                "promise dropped without a value",
            )));
        }
    }
}

impl<T> Future<T> {
    /// True until `get_result`/`get` consumes the value.
    pub fn valid(&self) -> bool {
        !matches!(*self.shared.slot.lock().unwrap(), Slot::Taken)
    }

    /// Non-blocking peek; `Duration::ZERO` never sleeps.
    pub fn is_ready(&self) -> bool {
        matches!(*self.shared.slot.lock().unwrap(), Slot::Ready(_))
    }

    /// Blocks up to `timeout`, returning whether a result became available in time.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let slot = self.shared.slot.lock().unwrap();
        if matches!(*slot, Slot::Ready(_)) {
            return true;
        }
        let (slot, result) = self
            .shared
            .signal
            .wait_timeout_while(slot, timeout, |s| matches!(s, Slot::Pending))
            .unwrap();
        let _ = slot;
        !result.timed_out()
    }

    /// Blocks until ready, then consumes the result.
    pub fn get_result(self) -> Result<T> {
        let mut slot = self.shared.slot.lock().unwrap();
        loop {
            match &*slot {
                Slot::Ready(_) => break,
                Slot::Taken => {
                    return Err(Error::new(
                        ErrorKind::DefaultError,
                        "future result already taken",
                    ));
                }
                Slot::Pending => {
                    slot = self.shared.signal.wait(slot).unwrap();
                }
            }
        }
        match std::mem::replace(&mut *slot, Slot::Taken) {
            Slot::Ready(result) => result,
            _ => unreachable!(),
        }
    }

    /// Blocks and unwraps `Ok`. This is the process-fatal convenience path: an `Err` is logged and
    /// the process aborts, matching a provider that never resolves correctly being treated as a
    /// programming error rather than a recoverable one.
    pub fn get(self, log: &dyn Logger) -> T {
        match self.get_result() {
            Ok(value) => value,
            Err(err) => {
                log.fatal(&format!("Future::get() on a failed result: {err}"));
                std::process::abort();
            }
        }
    }
}

/// Returns true if `future` already holds a result, without consuming it.
pub fn is_future_ready<T>(future: &Future<T>) -> bool {
    future.is_ready()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn resolves_synchronously_when_fulfilled_before_read() {
        let (tx, rx) = channel::<u32>();
        tx.set_value(7);
        assert!(rx.is_ready());
        assert_eq!(rx.get_result().unwrap(), 7);
    }

    #[test]
    fn wait_for_times_out_on_pending() {
        let (_tx, rx) = channel::<u32>();
        assert!(!rx.wait_for(Duration::from_millis(10)));
    }

    #[test]
    fn dropped_promise_resolves_to_error() {
        let (tx, rx) = channel::<u32>();
        drop(tx);
        assert!(rx.get_result().is_err());
    }

    #[test]
    fn resolves_from_another_thread() {
        let (tx, rx) = channel::<u32>();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            tx.set_value(42);
        });
        assert_eq!(rx.get_result().unwrap(), 42);
        handle.join().unwrap();
    }
}
