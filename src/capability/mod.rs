pub mod args;
pub mod error;
pub mod registry;

pub use error::{io_error, CapabilityError};
pub use registry::{CapabilityEntry, CapabilityRegistry, Handler, HandlerFn, RegistryBuilder};
