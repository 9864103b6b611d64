// Gateway module for models - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod factory;
mod traits;
mod unified;

// Public re-exports - the ONLY way to access provider functionality
pub use factory::ProviderRegistry;
pub use traits::Provider;
pub use unified::UnifiedProvider;
