//! Platform abstraction layer
//!
//! Hardware access for the flight-control core. All board-specific code lives
//! behind these traits; the core itself never touches a register, which is what
//! keeps the receiver pipeline and the configuration store testable on the host.

pub mod error;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export commonly used types
pub use error::{AdcError, FlashError, PlatformError, Result};
pub use traits::{AdcChannel, AdcInterface, FlashInterface};
