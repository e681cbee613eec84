use crate::error::Error;

/// The hooks a host application plugs into the Executable Controller's lifecycle.
///
/// Every hook has a default no-op except [`UserController::on_error`], whose default matches the
/// documented baseline policy: abort on a critical error, log otherwise.
pub trait UserController: Send + Sync {
    fn pre_initialize(&self) {}
    fn post_initialize(&self) {}
    fn pre_start(&self) {}
    fn post_start(&self) {}
    fn pre_shutdown(&self) {}
    fn post_shutdown(&self) {}

    /// Called for every error reported by a module, after the Executable Controller has already
    /// applied its own state-machine consequences (demotion on critical, propagation to
    /// dependents). `critical` mirrors what the reporting module passed to `report_error`.
    fn on_error(&self, module_name: &str, err: &Error, critical: bool) {
        if critical {
            eprintln!("[fatal] module '{module_name}' reported a critical error: {err}");
            std::process::abort();
        } else {
            eprintln!("[error] module '{module_name}': {err}");
        }
    }
}

/// A `UserController` that only logs; useful for tests and small demos that don't need custom
/// startup/shutdown behavior.
pub struct NoopUserController;

impl UserController for NoopUserController {}
