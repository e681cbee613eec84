use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::logging::Logger;
use crate::runnable::{RunnableHandle, RunnableSpec};

struct Entry {
    name: String,
    owner: String,
    period_ticks: u64,
    offset_ticks: u64,
    budget: Option<Duration>,
    run_after_modules: Vec<String>,
    run_after_runnables_in_same_module: Vec<String>,
    active: Arc<AtomicBool>,
    func: Mutex<Box<dyn FnMut() + Send>>,
}

/// The single-threaded cooperative tick scheduler.
///
/// `Executor` owns one worker thread and a fixed, topologically-ordered list of runnables.
/// Registration computes each runnable's position once; after that the order never changes, so a
/// tick is just a linear scan. Runnables themselves must never block or suspend — anything that
/// does delays every runnable scheduled after it in the same tick.
pub struct Executor {
    period: Duration,
    entries: Mutex<Vec<Entry>>,
    counter: AtomicU64,
    running: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<()>>>,
    logger: Arc<dyn Logger>,
}

impl Executor {
    pub fn new(period: Duration, logger: Arc<dyn Logger>) -> Self {
        Self {
            period,
            entries: Mutex::new(Vec::new()),
            counter: AtomicU64::new(0),
            running: Arc::new(AtomicBool::new(false)),
            thread: Mutex::new(None),
            logger,
        }
    }

    /// Registers `spec`, inserting it at the earliest position that keeps every later entry's
    /// `run_after_*` constraints satisfied, and returns a handle to start/stop it independently.
    ///
    /// The runnable starts inactive; a module activates its own runnables via
    /// [`RunnableHandle::start`] when it transitions into `Starting`.
    pub fn register(&self, spec: RunnableSpec) -> RunnableHandle {
        let active = Arc::new(AtomicBool::new(false));
        let entry = Entry {
            name: spec.name,
            owner: spec.owner,
            period_ticks: spec.period_ticks.max(1),
            offset_ticks: spec.offset_ticks,
            budget: spec.budget,
            run_after_modules: spec.run_after_modules,
            run_after_runnables_in_same_module: spec.run_after_runnables_in_same_module,
            active: active.clone(),
            func: Mutex::new(spec.func),
        };

        let mut entries = self.entries.lock().unwrap();
        let mut insert_at = 0;
        for (i, existing) in entries.iter().enumerate() {
            let must_follow = entry.run_after_modules.contains(&existing.owner)
                || (existing.owner == entry.owner
                    && entry
                        .run_after_runnables_in_same_module
                        .contains(&existing.name));
            if must_follow {
                insert_at = i + 1;
            }
        }
        entries.insert(insert_at, entry);
        RunnableHandle::new(active)
    }

    /// Spawns the tick thread. Calling `start` twice is a no-op.
    pub fn start(self: &Arc<Self>) {
        let mut thread_slot = self.thread.lock().unwrap();
        if thread_slot.is_some() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);
        let this = self.clone();
        *thread_slot = Some(thread::spawn(move || this.run_loop()));
    }

    /// Signals the tick thread to exit after its current tick and joins it.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.lock().unwrap().take() {
            let _ = handle.join();
        }
    }

    fn run_loop(self: Arc<Self>) {
        let mut next_run = Instant::now() + self.period;
        while self.running.load(Ordering::SeqCst) {
            let counter = self.counter.fetch_add(1, Ordering::SeqCst);
            {
                let entries = self.entries.lock().unwrap();
                for entry in entries.iter() {
                    if !entry.active.load(Ordering::SeqCst) {
                        continue;
                    }
                    if counter < entry.offset_ticks {
                        continue;
                    }
                    if (counter - entry.offset_ticks) % entry.period_ticks != 0 {
                        continue;
                    }
                    self.execute(entry);
                }
            }
            if Instant::now() > next_run {
                self.logger
                    .warn(&format!("executor tick {counter} overran its period"));
            }
            let now = Instant::now();
            if next_run > now {
                thread::sleep(next_run - now);
            }
            next_run += self.period;
        }
    }

    fn execute(&self, entry: &Entry) {
        let start = Instant::now();
        (entry.func.lock().unwrap())();
        if let Some(budget) = entry.budget {
            let elapsed = start.elapsed();
            if elapsed > budget {
                self.logger.warn(&format!(
                    "runnable '{}' (owner '{}') took {:?}, exceeding its {:?} budget",
                    entry.name, entry.owner, elapsed, budget
                ));
            }
        }
    }

    #[cfg(test)]
    fn ordered_names(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.stop();
    }
}
