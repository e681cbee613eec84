use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Error;
use crate::future::{self, Future};
use crate::handler::{Callback, HandlerList};
use crate::sample::{DataPtr, Sample, SampleCell};

/// Tracks which consumer modules are currently `Operational` against one Service Module.
///
/// A Service Module embeds one `ServiceModuleCore` and one [`DataElement`] per data element (plus
/// one [`Operation`] per RPC). `ServiceModuleCore` is the single source of truth for "is this
/// consumer currently allowed to receive callbacks", which every data element's handler list
/// consults when a handler is registered.
pub struct ServiceModuleCore {
    active_modules: Mutex<HashSet<String>>,
}

impl ServiceModuleCore {
    pub fn new() -> Self {
        Self {
            active_modules: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_active(&self, owner: &str) -> bool {
        self.active_modules.lock().contains(owner)
    }

    pub fn start_for_module(&self, owner: &str) {
        self.active_modules.lock().insert(owner.to_string());
    }

    pub fn stop_for_module(&self, owner: &str) {
        self.active_modules.lock().remove(owner);
    }
}

impl Default for ServiceModuleCore {
    fn default() -> Self {
        Self::new()
    }
}

/// One data element of a Service Module: a cached sample plus the consumers registered against it.
pub struct DataElement<T> {
    cell: SampleCell<T>,
    handlers: HandlerList<T>,
}

impl<T> DataElement<T> {
    pub fn new() -> Self {
        Self {
            cell: SampleCell::new(),
            handlers: HandlerList::new(),
        }
    }

    pub fn allocate(&self) -> DataPtr<T>
    where
        T: Default,
    {
        self.cell.allocate()
    }

    /// Publishes an owned allocation and fans it out to every active handler.
    pub fn set_allocated(&self, value: DataPtr<T>) {
        self.cell.set_allocated(value);
        if let Ok(sample) = self.cell.get_allocated() {
            self.handlers.publish(&sample);
        }
    }

    /// Publishes by cloning `value` and fans it out to every active handler.
    pub fn set(&self, value: &T)
    where
        T: Clone,
    {
        self.cell.set(value);
        if let Ok(sample) = self.cell.get_allocated() {
            self.handlers.publish(&sample);
        }
    }

    pub fn get_allocated(&self) -> Result<Sample<T>, Error> {
        self.cell.get_allocated()
    }

    pub fn get(&self) -> T
    where
        T: Clone + Default,
    {
        self.cell.get()
    }

    /// Registers `callback` on behalf of `owner`, inheriting `owner`'s current activation state
    /// from the Service Module's shared [`ServiceModuleCore`].
    pub fn register_handler(&self, core: &ServiceModuleCore, owner: &str, callback: Callback<T>) {
        self.handlers.register(owner, core.is_active(owner), callback);
    }

    pub fn start_for_owner(&self, owner: &str) {
        self.handlers.start_for_owner(owner);
    }

    pub fn stop_for_owner(&self, owner: &str) {
        self.handlers.stop_for_owner(owner);
    }
}

impl<T> Default for DataElement<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// One operation (RPC) of a Service Module: a single provider-side handler slot.
///
/// Only one handler may be registered at a time, matching a Service Module having exactly one
/// provider. Consumer calls are dispatched synchronously against whatever handler is registered at
/// call time; with none registered the returned future resolves to `NoOperationHandlerRegistered`.
pub struct Operation<Req, Resp> {
    handler: Mutex<Option<Arc<dyn Fn(Req) -> Resp + Send + Sync>>>,
}

impl<Req, Resp> Operation<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    pub fn new() -> Self {
        Self {
            handler: Mutex::new(None),
        }
    }

    pub fn register_handler(&self, handler: impl Fn(Req) -> Resp + Send + Sync + 'static) {
        *self.handler.lock() = Some(Arc::new(handler));
    }

    pub fn call(&self, request: Req) -> Future<Resp> {
        let (promise, future) = future::channel();
        match self.handler.lock().clone() {
            Some(handler) => promise.set_value(handler(request)),
            None => promise.set_error(Error::no_operation_handler()),
        }
        future
    }
}

impl<Req, Resp> Default for Operation<Req, Resp>
where
    Req: Send + 'static,
    Resp: Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
