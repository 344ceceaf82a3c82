#![cfg_attr(not(test), no_std)]

//! microflight - multirotor flight-control core
//!
//! This library provides the receiver pipeline (timer capture, pulse/serial
//! decode, channel aggregation, failsafe) and the checksummed EEPROM
//! configuration store. Hardware is reached through platform traits with mock
//! implementations for host testing.

// Platform abstraction layer
pub mod platform;

// Interrupt-facing device layers
pub mod devices;

// Core infrastructure
pub mod core;

// RC receiver pipeline
pub mod rx;

// Configuration store
pub mod config;
