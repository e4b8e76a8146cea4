// vasurf/src/platform/va/mod.rs
//
//! The `libva` backend.

pub mod driver;
pub mod ffi;

mod error;

pub use self::driver::VaDriver;
