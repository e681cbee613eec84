use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A periodic function bound to a module and scheduled by the [`crate::executor::Executor`].
///
/// `period_ticks` and `offset_ticks` are expressed in executor ticks, not wall-clock time: a
/// runnable with `period_ticks = 5` fires on ticks whose `(counter - offset_ticks) % 5 == 0`.
/// `run_after_modules` and `run_after_runnables_in_same_module` constrain the fixed order the
/// executor computes at registration time; they have no effect on *which* ticks a runnable fires
/// on, only on its position relative to others that fire on the same tick.
pub struct RunnableSpec {
    pub name: String,
    pub owner: String,
    pub period_ticks: u64,
    pub offset_ticks: u64,
    pub budget: Option<Duration>,
    pub run_after_modules: Vec<String>,
    pub run_after_runnables_in_same_module: Vec<String>,
    pub func: Box<dyn FnMut() + Send>,
}

/// A cheap, cloneable toggle for one registered runnable. Owning modules use this to start and
/// stop their own periodic work without reaching back into the executor's ordered list.
#[derive(Clone)]
pub struct RunnableHandle {
    active: Arc<AtomicBool>,
}

impl RunnableHandle {
    pub(crate) fn new(active: Arc<AtomicBool>) -> Self {
        Self { active }
    }

    pub fn start(&self) {
        self.active.store(true, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
