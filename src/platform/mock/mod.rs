//! Mock platform implementations for host testing

pub mod adc;
pub mod flash;

pub use adc::MockAdc;
pub use flash::MockFlash;
