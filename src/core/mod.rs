//! Core infrastructure
//!
//! Cross-cutting pieces shared by the receiver pipeline and the configuration
//! store.

pub mod logging;
