//! pixelsmear - real-time pixel sorting
//!
//! Repeatedly scans an RGBA buffer and blends adjacent pixels toward each
//! other when their brightness difference crosses a signed threshold. The
//! library exposes the effect core and its glue for the binary and for
//! integration tests.

pub mod app;
pub mod command;
pub mod config;
pub mod control;
pub mod display;
pub mod effect;
pub mod image_source;
pub mod mqtt;
