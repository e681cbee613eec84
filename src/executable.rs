use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::Error;
use crate::executor::Executor;
use crate::logging::Logger;
use crate::module::{ControllerReporting, ModuleController, ModuleState};
use crate::user_controller::UserController;

/// The maximum number of control-loop polls (100 ms each, ~2 s total) a module may spend in
/// `Starting` before the controller demotes it back to `NotOperational`.
pub const STARTING_DEADLINE_TICKS: u32 = 20;
const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct ModuleContainer {
    name: String,
    module: Arc<dyn ModuleController>,
    dependencies: Vec<String>,
    state: Mutex<ModuleState>,
    starting_counter: AtomicU32,
}

/// Owns the executor, the registration-ordered list of modules, and the signal-driven shutdown
/// flag; drives every module through its lifecycle and fans error reports out to dependents.
///
/// Modules never hold a reference to `ExecutableController` directly. Instead they are handed a
/// `Arc<dyn ControllerReporting>` (obtained from [`ExecutableController::reporting_handle`]) at
/// construction time, which keeps the module/controller relationship from becoming a cycle.
pub struct ExecutableController {
    executor: Arc<Executor>,
    logger: Arc<dyn Logger>,
    user_controller: Arc<dyn UserController>,
    modules: Mutex<Vec<Arc<ModuleContainer>>>,
    shutdown_requested: Arc<AtomicBool>,
}

impl ExecutableController {
    pub fn new(
        executor: Arc<Executor>,
        logger: Arc<dyn Logger>,
        user_controller: Arc<dyn UserController>,
    ) -> Arc<Self> {
        Arc::new(Self {
            executor,
            logger,
            user_controller,
            modules: Mutex::new(Vec::new()),
            shutdown_requested: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Returns the narrow reporting surface modules use to call back into this controller.
    pub fn reporting_handle(self: &Arc<Self>) -> Arc<dyn ControllerReporting> {
        self.clone() as Arc<dyn ControllerReporting>
    }

    /// Appends `module` to the registration-ordered list. Registration order determines `Init`
    /// order on startup and is reversed for `DeInit` order on shutdown.
    pub fn register_module(&self, module: Arc<dyn ModuleController>, dependencies: Vec<String>) {
        let container = Arc::new(ModuleContainer {
            name: module.name().to_string(),
            module,
            dependencies,
            state: Mutex::new(ModuleState::NotInitialized),
            starting_counter: AtomicU32::new(0),
        });
        self.modules.lock().unwrap().push(container);
    }

    /// Requests a graceful shutdown; equivalent to receiving `SIGTERM`/`SIGINT`.
    pub fn initiate_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Installs handlers so `SIGTERM`/`SIGINT` request a graceful shutdown; every other signal
    /// that can reasonably terminate the process (`SIGABRT`/`SIGBUS`/`SIGFPE`/`SIGILL`/`SIGSEGV`)
    /// is left at its default disposition so crash diagnostics still work.
    fn install_signal_handlers(&self) {
        for sig in [signal_hook::consts::SIGTERM, signal_hook::consts::SIGINT] {
            if let Err(err) = signal_hook::flag::register(sig, self.shutdown_requested.clone()) {
                self.logger
                    .error(&format!("failed to register signal handler for {sig}: {err}"));
            }
        }
    }

    /// Runs the full lifecycle, blocking until a shutdown is requested and the teardown sequence
    /// completes.
    pub fn run(&self) {
        self.user_controller.pre_initialize();
        self.do_initialize();
        self.user_controller.post_initialize();

        self.user_controller.pre_start();
        self.do_start();
        self.user_controller.post_start();

        while !self.is_shutdown_requested() {
            self.start_modules();
            self.check_starting_modules();
            std::thread::sleep(POLL_INTERVAL);
        }

        self.user_controller.pre_shutdown();
        self.do_shutdown();
        self.user_controller.post_shutdown();
    }

    fn do_initialize(&self) {
        self.install_signal_handlers();
        self.executor.start();
        let names: Vec<String> = self
            .modules
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.name.clone())
            .collect();
        for name in names {
            self.change_state_of_module(&name, ModuleState::NotOperational);
        }
    }

    fn do_start(&self) {
        let roots: Vec<String> = self
            .modules
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.dependencies.is_empty())
            .map(|c| c.name.clone())
            .collect();
        for name in roots {
            self.change_state_of_module(&name, ModuleState::Starting);
        }
    }

    fn do_shutdown(&self) {
        let names: Vec<String> = self
            .modules
            .lock()
            .unwrap()
            .iter()
            .rev()
            .map(|c| c.name.clone())
            .collect();
        for name in &names {
            let already_down = matches!(
                self.state_of(name),
                Some(ModuleState::NotOperational) | Some(ModuleState::Shutdown) | None
            );
            if !already_down {
                self.change_state_of_module(name, ModuleState::NotOperational);
            }
        }
        for name in &names {
            self.change_state_of_module(name, ModuleState::Shutdown);
        }
        self.executor.stop();
    }

    fn start_modules(&self) {
        let candidates: Vec<String> = {
            let modules = self.modules.lock().unwrap();
            modules
                .iter()
                .filter(|c| *c.state.lock().unwrap() == ModuleState::NotOperational)
                .filter(|c| {
                    c.dependencies.iter().all(|dep| {
                        self.find(&modules, dep)
                            .map(|d| *d.state.lock().unwrap() == ModuleState::Operational)
                            .unwrap_or(false)
                    })
                })
                .map(|c| c.name.clone())
                .collect()
        };
        for name in candidates {
            self.change_state_of_module(&name, ModuleState::Starting);
        }
    }

    fn check_starting_modules(&self) {
        let timed_out: Vec<String> = {
            let modules = self.modules.lock().unwrap();
            modules
                .iter()
                .filter(|c| *c.state.lock().unwrap() == ModuleState::Starting)
                .filter_map(|c| {
                    let count = c.starting_counter.fetch_add(1, Ordering::SeqCst) + 1;
                    (count > STARTING_DEADLINE_TICKS).then(|| c.name.clone())
                })
                .collect()
        };
        for name in timed_out {
            self.logger.warn(&format!(
                "module '{name}' exceeded its starting deadline of {STARTING_DEADLINE_TICKS} ticks"
            ));
            self.change_state_of_module(&name, ModuleState::NotOperational);
        }
    }

    fn find<'a>(&self, modules: &'a [Arc<ModuleContainer>], name: &str) -> Option<&'a Arc<ModuleContainer>> {
        modules.iter().find(|c| c.name == name)
    }

    fn state_of(&self, name: &str) -> Option<ModuleState> {
        let modules = self.modules.lock().unwrap();
        self.find(&modules, name).map(|c| *c.state.lock().unwrap())
    }

    fn change_state_of_module(&self, name: &str, to: ModuleState) {
        let modules = self.modules.lock().unwrap();
        let container = self
            .find(&modules, name)
            .unwrap_or_else(|| panic!("change_state_of_module: unknown module '{name}'"))
            .clone();
        let dependencies = container.dependencies.clone();
        let module = container.module.clone();
        drop(modules);

        if to == ModuleState::NotInitialized {
            panic!("illegal transition: no module may re-enter NotInitialized");
        }

        // Record the new state before running the transition's side effects: a module's `start()`
        // may synchronously report itself operational, re-entering this function for the same
        // module. Writing `to` up front (and dropping the lock immediately) means that re-entrant
        // write lands and sticks instead of being clobbered when the outer call unwinds.
        let from = {
            let mut state = container.state.lock().unwrap();
            let from = *state;
            *state = to;
            from
        };

        match to {
            ModuleState::NotInitialized => unreachable!(),
            ModuleState::NotOperational => {
                if from == ModuleState::NotInitialized {
                    if let Err(err) = module.init() {
                        self.logger
                            .error(&format!("module '{name}' failed to initialize: {err}"));
                    }
                } else {
                    let modules = self.modules.lock().unwrap();
                    for dep_name in &dependencies {
                        if let Some(dep) = self.find(&modules, dep_name) {
                            dep.module.stop_event_handlers_for_module(name);
                        }
                    }
                    drop(modules);
                    module.stop_executor();
                    module.stop();
                }
            }
            ModuleState::Starting => {
                container.starting_counter.store(0, Ordering::SeqCst);
                module.start();
                module.start_executor();
            }
            ModuleState::Operational => {
                let modules = self.modules.lock().unwrap();
                for dep_name in &dependencies {
                    if let Some(dep) = self.find(&modules, dep_name) {
                        dep.module.start_event_handlers_for_module(name);
                    }
                }
            }
            ModuleState::Shutdown => {
                if let Err(err) = module.deinit() {
                    self.logger
                        .error(&format!("module '{name}' failed to deinitialize: {err}"));
                }
            }
        }

        self.logger
            .debug(&format!("module '{name}' -> {}", to.as_str()));
    }

    fn report_error_of_module(&self, name: &str, err: Error, critical: bool) {
        self.user_controller.on_error(name, &err, critical);
        if critical {
            self.change_state_of_module(name, ModuleState::NotOperational);
        }
        let dependents: Vec<Arc<dyn ModuleController>> = {
            let modules = self.modules.lock().unwrap();
            modules
                .iter()
                .filter(|c| c.dependencies.iter().any(|d| d == name))
                .map(|c| c.module.clone())
                .collect()
        };
        for dependent in dependents {
            dependent.on_error(&err);
        }
    }
}

impl ControllerReporting for ExecutableController {
    fn report_operational(&self, module_name: &str) {
        self.change_state_of_module(module_name, ModuleState::Operational);
    }

    fn report_error(&self, module_name: &str, err: Error, critical: bool) {
        self.report_error_of_module(module_name, err, critical);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::logging::LoggerSingleton;
    use crate::user_controller::UserController;
    use std::sync::atomic::AtomicUsize;

    /// Unlike [`crate::user_controller::NoopUserController`], this does not abort on a critical
    /// error, so tests can assert on the demoted state afterwards.
    struct SilentUserController;
    impl UserController for SilentUserController {
        fn on_error(&self, _module_name: &str, _err: &Error, _critical: bool) {}
    }

    struct RootModule {
        name: String,
        reporting: Arc<dyn ControllerReporting>,
        started: AtomicUsize,
    }

    impl ModuleController for RootModule {
        fn name(&self) -> &str {
            &self.name
        }
        fn start(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
            self.reporting.report_operational(&self.name);
        }
    }

    struct DependentModule {
        name: String,
        deps: Vec<String>,
        reporting: Arc<dyn ControllerReporting>,
        error_seen: AtomicUsize,
    }

    impl ModuleController for DependentModule {
        fn name(&self) -> &str {
            &self.name
        }
        fn dependencies(&self) -> &[String] {
            &self.deps
        }
        fn start(&self) {
            self.reporting.report_operational(&self.name);
        }
        fn on_error(&self, _err: &Error) {
            self.error_seen.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn new_controller() -> Arc<ExecutableController> {
        let logger = LoggerSingleton::create_logger("test.executable", "controller");
        let executor = Arc::new(Executor::new(Duration::from_millis(5), logger.clone()));
        ExecutableController::new(executor, logger, Arc::new(SilentUserController))
    }

    #[test]
    fn dependency_gate_starts_root_before_dependent() {
        let controller = new_controller();
        let reporting = controller.reporting_handle();
        let root = Arc::new(RootModule {
            name: "root".into(),
            reporting: reporting.clone(),
            started: AtomicUsize::new(0),
        });
        let dependent = Arc::new(DependentModule {
            name: "dependent".into(),
            deps: vec!["root".into()],
            reporting: reporting.clone(),
            error_seen: AtomicUsize::new(0),
        });
        controller.register_module(root.clone(), vec![]);
        controller.register_module(dependent.clone(), vec!["root".into()]);

        controller.do_initialize();
        controller.do_start();
        assert_eq!(controller.state_of("root"), Some(ModuleState::Operational));
        assert_eq!(controller.state_of("dependent"), Some(ModuleState::NotOperational));

        controller.start_modules();
        assert_eq!(controller.state_of("dependent"), Some(ModuleState::Operational));
        controller.executor.stop();
    }

    #[test]
    fn critical_error_demotes_module_and_notifies_dependents() {
        let controller = new_controller();
        let reporting = controller.reporting_handle();
        let root = Arc::new(RootModule {
            name: "root".into(),
            reporting: reporting.clone(),
            started: AtomicUsize::new(0),
        });
        let dependent = Arc::new(DependentModule {
            name: "dependent".into(),
            deps: vec!["root".into()],
            reporting: reporting.clone(),
            error_seen: AtomicUsize::new(0),
        });
        controller.register_module(root, vec![]);
        controller.register_module(dependent.clone(), vec!["root".into()]);
        controller.do_initialize();
        controller.do_start();

        reporting.report_error("root", Error::new(ErrorKind::DefaultError, "boom"), true);
        assert_eq!(controller.state_of("root"), Some(ModuleState::NotOperational));
        assert_eq!(dependent.error_seen.load(Ordering::SeqCst), 1);
        controller.executor.stop();
    }

    #[test]
    fn starting_deadline_demotes_stalled_module() {
        struct NeverReady {
            name: String,
        }
        impl ModuleController for NeverReady {
            fn name(&self) -> &str {
                &self.name
            }
            fn start(&self) {}
        }

        let controller = new_controller();
        controller.register_module(
            Arc::new(NeverReady { name: "stuck".into() }),
            vec![],
        );
        controller.do_initialize();
        controller.do_start();
        for _ in 0..=STARTING_DEADLINE_TICKS {
            controller.check_starting_modules();
        }
        assert_eq!(controller.state_of("stuck"), Some(ModuleState::NotOperational));
        controller.executor.stop();
    }
}
