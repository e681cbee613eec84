//! End-to-end tests exercising the public API: a real `Executor` thread, a real
//! `ExecutableController::run()` loop, and the Service Module building blocks wired the way a
//! generated module would wire them.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use vaf_runtime::{
    ControllerReporting, DataElement, Error, ExecutableController, Executor, LoggerSingleton,
    ModuleController, RunnableSpec, ServiceModuleCore, UserController,
};

struct RecordingUserController {
    errors: Mutex<Vec<(String, bool)>>,
}

impl RecordingUserController {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            errors: Mutex::new(Vec::new()),
        })
    }
}

impl UserController for RecordingUserController {
    fn on_error(&self, module_name: &str, _err: &Error, critical: bool) {
        self.errors.lock().unwrap().push((module_name.to_string(), critical));
    }
}

struct CountingModule {
    name: String,
    dependencies: Vec<String>,
    reporting: Arc<dyn ControllerReporting>,
    deinit_calls: Arc<AtomicUsize>,
}

impl ModuleController for CountingModule {
    fn name(&self) -> &str {
        &self.name
    }
    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
    fn start(&self) {
        self.reporting.report_operational(&self.name);
    }
    fn deinit(&self) -> Result<(), Error> {
        self.deinit_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn full_run_shuts_down_gracefully_and_deinits_each_module_once() {
    let logger = LoggerSingleton::create_logger("test.lifecycle", "full_run");
    let executor = Arc::new(Executor::new(Duration::from_millis(5), logger.clone()));
    let controller = ExecutableController::new(executor, logger, RecordingUserController::new());
    let reporting = controller.reporting_handle();

    let deinit_a = Arc::new(AtomicUsize::new(0));
    let deinit_b = Arc::new(AtomicUsize::new(0));

    controller.register_module(
        Arc::new(CountingModule {
            name: "a".into(),
            dependencies: vec![],
            reporting: reporting.clone(),
            deinit_calls: deinit_a.clone(),
        }),
        vec![],
    );
    controller.register_module(
        Arc::new(CountingModule {
            name: "b".into(),
            dependencies: vec!["a".into()],
            reporting: reporting.clone(),
            deinit_calls: deinit_b.clone(),
        }),
        vec!["a".into()],
    );

    let shutdown = controller.clone();
    let runner = std::thread::spawn(move || shutdown.run());

    std::thread::sleep(Duration::from_millis(500));
    controller.initiate_shutdown();
    runner.join().expect("run() should return after shutdown");

    assert_eq!(deinit_a.load(Ordering::SeqCst), 1);
    assert_eq!(deinit_b.load(Ordering::SeqCst), 1);
}

struct ServiceModule {
    core: ServiceModuleCore,
    element: DataElement<u32>,
    reporting: Arc<dyn ControllerReporting>,
}

impl ModuleController for ServiceModule {
    fn name(&self) -> &str {
        "svc"
    }
    fn start(&self) {
        self.reporting.report_operational(self.name());
    }
    fn start_event_handlers_for_module(&self, owner: &str) {
        self.core.start_for_module(owner);
        self.element.start_for_owner(owner);
    }
    fn stop_event_handlers_for_module(&self, owner: &str) {
        self.core.stop_for_module(owner);
        self.element.stop_for_owner(owner);
    }
}

struct ConsumerModule {
    name: String,
    dependencies: Vec<String>,
    reporting: Arc<dyn ControllerReporting>,
}

impl ModuleController for ConsumerModule {
    fn name(&self) -> &str {
        &self.name
    }
    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }
    fn start(&self) {
        self.reporting.report_operational(&self.name);
    }
}

#[test]
fn consumer_only_receives_samples_while_operational() {
    let logger = LoggerSingleton::create_logger("test.lifecycle", "gating");
    let executor = Arc::new(Executor::new(Duration::from_millis(5), logger.clone()));
    let controller = ExecutableController::new(executor.clone(), logger, RecordingUserController::new());
    let reporting = controller.reporting_handle();

    let svc = Arc::new(ServiceModule {
        core: ServiceModuleCore::new(),
        element: DataElement::new(),
        reporting: reporting.clone(),
    });
    controller.register_module(svc.clone(), vec![]);

    let received = Arc::new(AtomicU32::new(0));
    let r = received.clone();
    svc.element.register_handler(
        &svc.core,
        "consumer",
        Arc::new(move |sample| r.store(*sample, Ordering::SeqCst)),
    );

    let consumer = Arc::new(ConsumerModule {
        name: "consumer".into(),
        dependencies: vec!["svc".into()],
        reporting,
    });
    controller.register_module(consumer, vec!["svc".into()]);

    // Before either module starts, a publish must not reach the handler.
    svc.element.set(&1);
    assert_eq!(received.load(Ordering::SeqCst), 0);

    let shutdown = controller.clone();
    let runner = std::thread::spawn(move || shutdown.run());
    std::thread::sleep(Duration::from_millis(400));
    svc.element.set(&7);
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(received.load(Ordering::SeqCst), 7);

    controller.initiate_shutdown();
    runner.join().unwrap();
}

#[test]
fn runnables_across_modules_execute_in_registered_order() {
    let logger = LoggerSingleton::create_logger("test.lifecycle", "ordering");
    let executor = Arc::new(Executor::new(Duration::from_millis(5), logger));
    let order = Arc::new(Mutex::new(Vec::new()));

    let o1 = order.clone();
    let first = executor.register(RunnableSpec {
        name: "first".into(),
        owner: "m1".into(),
        period_ticks: 1,
        offset_ticks: 0,
        budget: None,
        run_after_modules: Vec::new(),
        run_after_runnables_in_same_module: Vec::new(),
        func: Box::new(move || o1.lock().unwrap().push("first")),
    });
    let o2 = order.clone();
    let second = executor.register(RunnableSpec {
        name: "second".into(),
        owner: "m2".into(),
        period_ticks: 1,
        offset_ticks: 0,
        budget: None,
        run_after_modules: vec!["m1".into()],
        run_after_runnables_in_same_module: Vec::new(),
        func: Box::new(move || o2.lock().unwrap().push("second")),
    });
    first.start();
    second.start();
    executor.start();
    std::thread::sleep(Duration::from_millis(30));
    executor.stop();

    let recorded = order.lock().unwrap();
    assert!(!recorded.is_empty());
    for pair in recorded.chunks(2) {
        if pair.len() == 2 {
            assert_eq!(pair, ["first", "second"]);
        }
    }
}
