/// Auth-interruption recovery - Gateway

mod descriptor;
mod navigator;
mod queue;
mod replay;

pub use descriptor::PendingSendDescriptor;
pub use navigator::{CliNavigator, ReauthNavigator};
#[cfg(test)]
pub use navigator::MockReauthNavigator;
pub use queue::{FileQueue, MemoryQueue, PendingSendQueue};
#[cfg(test)]
pub use queue::MockPendingSendQueue;
pub use replay::AuthRecovery;
