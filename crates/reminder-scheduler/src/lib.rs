pub mod emails;
pub mod notifier;
pub mod scheduler;

pub use emails::*;
pub use notifier::*;
pub use scheduler::*;
