/// Runtime orchestrator module - Gateway

mod guard;
mod orchestrator;
mod request;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{Listing, SessionOrchestrator};
pub use request::{Delivery, PreparedSend, SendDraft, SendOutcome, SendTarget};
