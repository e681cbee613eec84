#![doc = "vaf-runtime: a single-process runtime for vehicle applications."]
#![doc = ""]
#![doc = "Hosts a set of modules behind a dependency-aware lifecycle controller, drives them with a"]
#![doc = "single-threaded periodic executor, and connects them through typed publish/subscribe data"]
#![doc = "elements and request/response operations. See [`executable::ExecutableController`] for the"]
#![doc = "entry point a host application drives."]

pub mod bridge;
pub mod config;
pub mod error;
pub mod executable;
pub mod executor;
pub mod future;
pub mod handler;
pub mod logging;
pub mod module;
pub mod runnable;
pub mod sample;
pub mod service;
pub mod user_controller;

pub use config::ExecutorConfig;
pub use error::{Error, ErrorKind, Result};
pub use executable::{ExecutableController, STARTING_DEADLINE_TICKS};
pub use executor::Executor;
pub use future::{Future, Promise, channel, is_future_ready};
pub use handler::{Callback, HandlerEntry, HandlerList};
pub use logging::{LogLevel, Logger, LoggerSingleton};
pub use module::{ControllerReporting, ModuleController, ModuleState};
pub use runnable::{RunnableHandle, RunnableSpec};
pub use sample::{ConstDataPtr, DataPtr, Sample, SampleCell};
pub use service::{DataElement, Operation, ServiceModuleCore};
pub use user_controller::{NoopUserController, UserController};
