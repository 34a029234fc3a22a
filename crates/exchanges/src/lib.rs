pub mod backpack;

// Convenience re-exports
pub use backpack::{BackpackClient, ClientOptions};
pub use interface::ExchangeError;
