//! Platform abstraction traits
//!
//! This module defines the traits that platform implementations must provide.

pub mod adc;
pub mod flash;

// Re-export trait interfaces
pub use adc::{AdcChannel, AdcInterface};
pub use flash::FlashInterface;
