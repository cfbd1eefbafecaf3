//! Device implementations.
//!
//! Real graphics APIs are wrapped by the host application. This crate ships a
//! single in-process device, [`dummy::DummyDevice`], which records every call it
//! receives for tests and headless runs.

pub mod dummy;

pub use dummy::{DeviceCall, DummyDevice};
