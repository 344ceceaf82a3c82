//! Interrupt-facing device layers

pub mod timer_capture;

pub use timer_capture::{CaptureChannel, CaptureTable, TimerId, TimerIrq};
