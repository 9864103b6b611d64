// Gateway module for the per-context conversation cache

mod registry;
mod types;

pub use registry::ContextRegistry;
pub use types::{ContextEntry, ContextId, LoadTicket};
