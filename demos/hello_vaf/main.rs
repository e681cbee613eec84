//! A minimal two-module application wired through a Service Module: a provider publishes a
//! message on a timer, a consumer logs every message it receives and periodically calls an
//! operation on the provider to bump a counter.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use vaf_runtime::{
    ControllerReporting, DataElement, ExecutableController, Executor, LogLevel, Logger,
    LoggerSingleton, ModuleController, NoopUserController, Operation, RunnableHandle,
    RunnableSpec, Sample, ServiceModuleCore,
};

const TICK_PERIOD: Duration = Duration::from_millis(100);

/// The Service Module mediating the `message` data element and the `SetMsgId` operation between
/// the provider and the consumer.
struct MessageService {
    core: ServiceModuleCore,
    message: DataElement<String>,
    set_msg_id: Operation<u32, ()>,
    logger: Arc<dyn Logger>,
    reporting: Arc<dyn ControllerReporting>,
}

impl MessageService {
    fn new(logger: Arc<dyn Logger>, reporting: Arc<dyn ControllerReporting>) -> Arc<Self> {
        Arc::new(Self {
            core: ServiceModuleCore::new(),
            message: DataElement::new(),
            set_msg_id: Operation::new(),
            logger,
            reporting,
        })
    }
}

impl ModuleController for MessageService {
    fn name(&self) -> &str {
        "message_service"
    }

    fn start(&self) {
        self.logger.info("message_service starting");
        self.reporting.report_operational(self.name());
    }

    fn start_event_handlers_for_module(&self, owner: &str) {
        self.core.start_for_module(owner);
        self.message.start_for_owner(owner);
    }

    fn stop_event_handlers_for_module(&self, owner: &str) {
        self.core.stop_for_module(owner);
        self.message.stop_for_owner(owner);
    }
}

/// Publishes `message` every 500 ms (5 ticks at a 100 ms tick period) and exposes `SetMsgId` for
/// the consumer to call.
struct AppModule1 {
    name: String,
    dependencies: Vec<String>,
    reporting: Arc<dyn ControllerReporting>,
    msg_id: Arc<AtomicU32>,
    runnable: OnceLock<RunnableHandle>,
}

impl AppModule1 {
    fn new(reporting: Arc<dyn ControllerReporting>, service: Arc<MessageService>, executor: &Executor) -> Arc<Self> {
        let msg_id = Arc::new(AtomicU32::new(0));

        let for_handler = msg_id.clone();
        service
            .set_msg_id
            .register_handler(move |id| for_handler.store(id, Ordering::SeqCst));

        let module = Arc::new(Self {
            name: "app_module1".into(),
            dependencies: vec!["message_service".into()],
            reporting,
            msg_id: msg_id.clone(),
            runnable: OnceLock::new(),
        });

        let handle = executor.register(RunnableSpec {
            name: "publish_message".into(),
            owner: module.name.clone(),
            period_ticks: 5,
            offset_ticks: 0,
            budget: Some(Duration::from_millis(5)),
            run_after_modules: Vec::new(),
            run_after_runnables_in_same_module: Vec::new(),
            func: Box::new(move || {
                let id = msg_id.load(Ordering::SeqCst);
                service.message.set(&format!("Hello, VAF! - MsgID: {id}"));
            }),
        });
        let _ = module.runnable.set(handle);
        module
    }
}

impl ModuleController for AppModule1 {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn start(&self) {
        self.reporting.report_operational(&self.name);
    }

    fn start_executor(&self) {
        self.runnable.get().unwrap().start();
    }

    fn stop_executor(&self) {
        self.runnable.get().unwrap().stop();
    }
}

/// Logs every message it receives and calls `SetMsgId` with an incrementing counter every
/// second (10 ticks at a 100 ms tick period).
struct AppModule2 {
    name: String,
    dependencies: Vec<String>,
    reporting: Arc<dyn ControllerReporting>,
    runnable: OnceLock<RunnableHandle>,
}

impl AppModule2 {
    fn new(
        reporting: Arc<dyn ControllerReporting>,
        service: Arc<MessageService>,
        executor: &Executor,
        logger: Arc<dyn Logger>,
    ) -> Arc<Self> {
        let module = Arc::new(Self {
            name: "app_module2".into(),
            dependencies: vec!["message_service".into()],
            reporting,
            runnable: OnceLock::new(),
        });

        let handler_logger = logger.clone();
        service.message.register_handler(
            &service.core,
            &module.name,
            Arc::new(move |sample: Sample<String>| {
                handler_logger.info(&format!("received: {sample}"));
            }),
        );

        let next_id = Arc::new(AtomicU32::new(0));
        let handle = executor.register(RunnableSpec {
            name: "bump_msg_id".into(),
            owner: module.name.clone(),
            period_ticks: 10,
            offset_ticks: 0,
            budget: None,
            run_after_modules: Vec::new(),
            run_after_runnables_in_same_module: Vec::new(),
            func: Box::new(move || {
                let id = next_id.fetch_add(1, Ordering::SeqCst);
                let _ = service.set_msg_id.call(id);
            }),
        });
        let _ = module.runnable.set(handle);
        module
    }
}

impl ModuleController for AppModule2 {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    fn start(&self) {
        self.reporting.report_operational(&self.name);
    }

    fn start_executor(&self) {
        self.runnable.get().unwrap().start();
    }

    fn stop_executor(&self) {
        self.runnable.get().unwrap().stop();
    }
}

fn main() {
    LoggerSingleton::set_log_level(LogLevel::Info);
    let logger = LoggerSingleton::create_logger("hello_vaf", "demo executable");

    let executor = Arc::new(Executor::new(TICK_PERIOD, logger.clone()));
    let controller = ExecutableController::new(executor.clone(), logger.clone(), Arc::new(NoopUserController));
    let reporting = controller.reporting_handle();

    let service = MessageService::new(logger.clone(), reporting.clone());
    controller.register_module(service.clone(), vec![]);

    let provider = AppModule1::new(reporting.clone(), service.clone(), &executor);
    controller.register_module(provider, vec!["message_service".into()]);

    let consumer = AppModule2::new(reporting, service, &executor, logger);
    controller.register_module(consumer, vec!["message_service".into()]);

    let shutdown = controller.clone();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_secs(3));
        shutdown.initiate_shutdown();
    });

    controller.run();
}
