use crate::error::Error;

/// The lifecycle states a module moves through under the Executable Controller.
///
/// `Starting -> NotOperational` is the only backward edge a module reaches on its own (a startup
/// deadline); every other backward edge is driven by a critical error or the shutdown sequence.
/// Any transition not listed on [`crate::executable::ExecutableController`] is a programming error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleState {
    NotInitialized,
    NotOperational,
    Starting,
    Operational,
    Shutdown,
}

impl ModuleState {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleState::NotInitialized => "NotInitialized",
            ModuleState::NotOperational => "NotOperational",
            ModuleState::Starting => "Starting",
            ModuleState::Operational => "Operational",
            ModuleState::Shutdown => "Shutdown",
        }
    }
}

/// The narrow surface a module uses to call back into its owning controller.
///
/// Modules hold this instead of a reference to the Executable Controller itself, which keeps the
/// module <-> controller relationship from becoming a reference cycle: the controller implements
/// this trait and hands a trait object down to each module at registration time.
pub trait ControllerReporting: Send + Sync {
    fn report_operational(&self, module_name: &str);
    fn report_error(&self, module_name: &str, err: Error, critical: bool);
}

/// The contract every registered module implements, whether it is ordinary application logic or a
/// Service Module mediating a typed interface.
///
/// All methods have a default no-op so a plain application module only needs to override the ones
/// that matter to it; `start`/`stop` are the exception since every module does *something* when it
/// starts.
pub trait ModuleController: Send + Sync {
    fn name(&self) -> &str;

    fn dependencies(&self) -> &[String] {
        &[]
    }

    fn init(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Called on entering `Starting`. Implementations that become operational immediately should
    /// call `ControllerReporting::report_operational` before returning; implementations with an
    /// asynchronous startup may call it later, from a runnable.
    fn start(&self);

    fn stop(&self) {}

    fn deinit(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Invoked when a module this one depends on reports a critical error. The base policy is to
    /// do nothing; Service Modules and application modules override it to react (e.g. treat a
    /// producer's failure as their own `ServiceLost`).
    fn on_error(&self, _err: &Error) {}

    /// Activates the handlers this module's Service Module surface owns on behalf of `owner`.
    /// No-op for plain application modules.
    fn start_event_handlers_for_module(&self, _owner: &str) {}

    fn stop_event_handlers_for_module(&self, _owner: &str) {}

    /// Starts every periodic runnable this module registered with the executor.
    fn start_executor(&self) {}

    fn stop_executor(&self) {}
}
